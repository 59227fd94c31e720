/// Occluder geometry: shared immutable meshes and per-frame instances
///
/// Meshes are content-hashed so identical source meshes share one allocation.
/// The registry only holds weak references; a mesh dies with its last instance.
use crate::error::CullingError;
use glam::{Affine3A, Vec3};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

/// Triangle soup plus a fixed local-to-parent transform
#[derive(Debug)]
pub struct OccluderMesh {
    vertices: Vec<Vec3>,
    indices: Vec<u32>,
    local: Affine3A,
    aabb_min: Vec3,
    aabb_max: Vec3,
    hash: u64,
}

impl OccluderMesh {
    pub fn new(vertices: Vec<Vec3>, indices: Vec<u32>, local: Affine3A) -> Result<Self, CullingError> {
        validate(&vertices, &indices)?;
        let (aabb_min, aabb_max) = vertices
            .iter()
            .fold(None, |acc: Option<(Vec3, Vec3)>, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
            .unwrap_or((Vec3::ZERO, Vec3::ZERO));
        let hash = content_hash(&vertices, &indices, &local);
        Ok(Self {
            vertices,
            indices,
            local,
            aabb_min,
            aabb_max,
            hash,
        })
    }

    #[inline]
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    #[inline]
    pub fn local_transform(&self) -> Affine3A {
        self.local
    }

    /// Local-space bounds of the vertices (before `local_transform`)
    #[inline]
    pub fn aabb(&self) -> (Vec3, Vec3) {
        (self.aabb_min, self.aabb_max)
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[inline]
    pub fn content_hash(&self) -> u64 {
        self.hash
    }

    fn same_content(&self, vertices: &[Vec3], indices: &[u32], local: &Affine3A) -> bool {
        self.indices == indices
            && self.local.to_cols_array() == local.to_cols_array()
            && self.vertices.len() == vertices.len()
            && self
                .vertices
                .iter()
                .zip(vertices)
                .all(|(a, b)| a.to_array().map(f32::to_bits) == b.to_array().map(f32::to_bits))
    }
}

fn validate(vertices: &[Vec3], indices: &[u32]) -> Result<(), CullingError> {
    if indices.len() % 3 != 0 {
        return Err(CullingError::IndexCountNotMultipleOfThree(indices.len()));
    }
    if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
        return Err(CullingError::IndexOutOfRange {
            index,
            vertex_count: vertices.len(),
        });
    }
    Ok(())
}

fn content_hash(vertices: &[Vec3], indices: &[u32], local: &Affine3A) -> u64 {
    let mut hasher = DefaultHasher::new();
    vertices.len().hash(&mut hasher);
    for v in vertices {
        v.to_array().map(f32::to_bits).hash(&mut hasher);
    }
    indices.hash(&mut hasher);
    local.to_cols_array().map(f32::to_bits).hash(&mut hasher);
    hasher.finish()
}

/// Deduplicating mesh store
#[derive(Default)]
pub struct OccluderMeshRegistry {
    meshes: HashMap<u64, Vec<Weak<OccluderMesh>>>,
}

impl OccluderMeshRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the shared mesh for this content, creating it on first use
    pub fn register(
        &mut self,
        vertices: &[Vec3],
        indices: &[u32],
        local: Affine3A,
    ) -> Result<Arc<OccluderMesh>, CullingError> {
        validate(vertices, indices)?;
        let hash = content_hash(vertices, indices, &local);
        let bucket = self.meshes.entry(hash).or_default();
        bucket.retain(|weak| weak.strong_count() > 0);

        if let Some(mesh) = bucket
            .iter()
            .filter_map(Weak::upgrade)
            .find(|mesh| mesh.same_content(vertices, indices, &local))
        {
            return Ok(mesh);
        }

        let mesh = Arc::new(OccluderMesh::new(vertices.to_vec(), indices.to_vec(), local)?);
        bucket.push(Arc::downgrade(&mesh));
        log::trace!(
            "registered occluder mesh {hash:016x}: {} vertices, {} triangles",
            vertices.len(),
            mesh.triangle_count()
        );
        Ok(mesh)
    }

    /// Drop entries whose meshes are no longer referenced; returns how many went away
    pub fn purge(&mut self) -> usize {
        let mut removed = 0;
        self.meshes.retain(|_, bucket| {
            let before = bucket.len();
            bucket.retain(|weak| weak.strong_count() > 0);
            removed += before - bucket.len();
            !bucket.is_empty()
        });
        removed
    }

    /// Meshes still alive
    pub fn len(&self) -> usize {
        self.meshes
            .values()
            .flatten()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One occluder placed in the world for the current frame
#[derive(Debug, Clone)]
pub struct OccluderInstance {
    pub mesh: Arc<OccluderMesh>,
    pub world: Affine3A,
}

impl OccluderInstance {
    pub fn new(mesh: Arc<OccluderMesh>, world: Affine3A) -> Self {
        Self { mesh, world }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> (Vec<Vec3>, Vec<u32>) {
        (
            vec![
                Vec3::new(-1.0, -1.0, 0.0),
                Vec3::new(1.0, -1.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(-1.0, 1.0, 0.0),
            ],
            vec![0, 1, 2, 0, 2, 3],
        )
    }

    #[test]
    fn identical_content_is_shared() {
        let mut registry = OccluderMeshRegistry::new();
        let (v, i) = quad();
        let a = registry.register(&v, &i, Affine3A::IDENTITY).unwrap();
        let b = registry.register(&v, &i, Affine3A::IDENTITY).unwrap();
        assert!(Arc::ptr_eq(&a, &b), "same content must map to the same mesh");

        let c = registry
            .register(&v, &i, Affine3A::from_translation(Vec3::X))
            .unwrap();
        assert!(!Arc::ptr_eq(&a, &c), "different local transform is different content");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn meshes_die_with_their_last_reference() {
        let mut registry = OccluderMeshRegistry::new();
        let (v, i) = quad();
        let mesh = registry.register(&v, &i, Affine3A::IDENTITY).unwrap();
        let instance = OccluderInstance::new(mesh.clone(), Affine3A::IDENTITY);
        drop(mesh);
        assert_eq!(registry.purge(), 0, "instance still holds the mesh");

        drop(instance);
        assert_eq!(registry.purge(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn rejects_malformed_index_buffers() {
        let mut registry = OccluderMeshRegistry::new();
        let (v, _) = quad();
        assert_eq!(
            registry.register(&v, &[0, 1], Affine3A::IDENTITY).unwrap_err(),
            CullingError::IndexCountNotMultipleOfThree(2)
        );
        assert_eq!(
            registry.register(&v, &[0, 1, 9], Affine3A::IDENTITY).unwrap_err(),
            CullingError::IndexOutOfRange { index: 9, vertex_count: 4 }
        );
    }

    #[test]
    fn aabb_covers_all_vertices() {
        let (v, i) = quad();
        let mesh = OccluderMesh::new(v, i, Affine3A::IDENTITY).unwrap();
        assert_eq!(mesh.aabb(), (Vec3::new(-1.0, -1.0, 0.0), Vec3::new(1.0, 1.0, 0.0)));
        assert_eq!(mesh.triangle_count(), 2);
    }
}

/// Per-view frame orchestration
///
/// Views are keyed by a caller-supplied `ViewKey` and keep their tile buffers
/// across frames. One `cull` call runs the whole job graph for one view:
/// clear -> (clip + sort || occludee bounds) -> rasterize -> merge -> test.
use super::buffer_group::BufferGroup;
use super::clip::{clip_scene, ClipContext, ClippedScene};
use super::merge::merge_buffers;
use super::occludee::{BoundsProjector, ChunkVerdicts, OccludeeChunk};
use super::rasterizer::rasterize;
use super::sort::sort_front_to_back;
use super::view::{ViewKey, ViewParams};
use crate::config::CullingConfig;
use crate::occluder::OccluderInstance;
use crate::perf_scope;
use rayon::prelude::*;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Summary of one `cull` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CullStats {
    pub occluders_submitted: usize,
    /// Occluders with at least one triangle left after clipping
    pub occluders_clipped: usize,
    pub triangles_emitted: usize,
    pub occludees_visible: usize,
    pub occludees_occluded: usize,
    pub occludees_view_culled: usize,
    /// The depth buffer was reused from an earlier frame
    pub frozen: bool,
    /// The view parameters were rejected and nothing was touched
    pub skipped: bool,
}

impl CullStats {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

#[derive(Default)]
pub struct OcclusionCulling {
    config: CullingConfig,
    views: HashMap<ViewKey, BufferGroup>,
    /// Clip output, shared by every view culled through this instance
    scene: ClippedScene,
}

impl OcclusionCulling {
    pub fn new(config: CullingConfig) -> Self {
        Self {
            config,
            views: HashMap::new(),
            scene: ClippedScene::default(),
        }
    }

    #[inline]
    pub fn config(&self) -> &CullingConfig {
        &self.config
    }

    /// Changes to the buffer layout take effect at each view's next `cull`
    #[inline]
    pub fn config_mut(&mut self) -> &mut CullingConfig {
        &mut self.config
    }

    /// Cull one view: rasterize `occluders`, then clear the visibility bits of
    /// every chunk instance that is hidden or outside the view.
    ///
    /// Invalid view parameters skip the frame and leave every bit untouched.
    pub fn cull(
        &mut self,
        params: &ViewParams,
        occluders: &[OccluderInstance],
        chunks: &mut [OccludeeChunk],
    ) -> CullStats {
        perf_scope!("cull");
        if let Err(err) = params.validate() {
            log::warn!("skipping view {:?}: {err}", params.key);
            return CullStats::skipped();
        }

        let Self { config, views, scene } = self;
        let group = match views.entry(params.key) {
            Entry::Occupied(entry) => {
                let group = entry.into_mut();
                if group.needs_resize(params, config) {
                    log::debug!("view {:?} changed layout, rebuilding buffers", params.key);
                    *group = BufferGroup::new(params, config);
                }
                group
            }
            Entry::Vacant(entry) => entry.insert(BufferGroup::new(params, config)),
        };

        let mut stats = CullStats {
            occluders_submitted: occluders.len(),
            ..CullStats::default()
        };

        if config.freeze && group.has_depth {
            stats.frozen = true;
            let projector = BoundsProjector::new(group);
            chunks
                .par_iter_mut()
                .for_each(|chunk| chunk.compute_bounds(&projector));
        } else {
            group.update_view(params, config);
            {
                perf_scope!("clear");
                group.clear();
            }

            let clip = ClipContext::new(group, config);
            let projector = BoundsProjector::new(group);
            rayon::join(
                || {
                    perf_scope!("clip + sort");
                    clip_scene(&clip, occluders, scene);
                    sort_front_to_back(&mut scene.occluders);
                },
                || {
                    perf_scope!("occludee bounds");
                    chunks
                        .par_iter_mut()
                        .for_each(|chunk| chunk.compute_bounds(&projector));
                },
            );
            stats.occluders_clipped = scene.occluders.len();
            stats.triangles_emitted = scene.triangle_count();

            {
                perf_scope!("rasterize");
                rasterize(group, scene);
            }
            {
                perf_scope!("merge");
                merge_buffers(group);
            }
            group.has_depth = true;
        }

        let verdicts = {
            perf_scope!("visibility");
            let group: &BufferGroup = group;
            let invert = config.display_only_occluded;
            chunks
                .par_iter_mut()
                .map(|chunk| chunk.apply_visibility(group, invert))
                .reduce(ChunkVerdicts::default, |mut acc, v| {
                    acc += v;
                    acc
                })
        };
        stats.occludees_visible = verdicts.visible;
        stats.occludees_occluded = verdicts.occluded;
        stats.occludees_view_culled = verdicts.view_culled;

        log::debug!("view {:?}: {:?}", params.key, stats);
        stats
    }

    /// Buffers of a view culled earlier, read-only
    #[inline]
    pub fn view(&self, key: ViewKey) -> Option<&BufferGroup> {
        self.views.get(&key)
    }

    /// Free the buffers of a view that stopped being culled
    pub fn remove_view(&mut self, key: ViewKey) -> bool {
        let removed = self.views.remove(&key).is_some();
        if removed {
            log::debug!("removed view {key:?}");
        }
        removed
    }

    /// Keep only the views for which `keep` returns true
    pub fn retain_views(&mut self, mut keep: impl FnMut(&ViewKey) -> bool) {
        self.views.retain(|key, _| {
            let kept = keep(key);
            if !kept {
                log::debug!("removed view {key:?}");
            }
            kept
        });
    }

    #[inline]
    pub fn view_count(&self) -> usize {
        self.views.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::culling::occludee::Occludee;
    use crate::culling::view::Projection;
    use crate::occluder::OccluderMesh;
    use glam::{Affine3A, Mat4, Vec3};
    use std::sync::Arc;

    /// Looking down -Z from the origin, w = distance
    fn params(key: u64) -> ViewParams {
        ViewParams {
            key: ViewKey::new(key),
            view_projection: Mat4::perspective_rh(90f32.to_radians(), 2.0, 0.1, 100.0),
            near_clip: 0.1,
            projection: Projection::Perspective,
            width: 128,
            height: 64,
        }
    }

    /// A wall far larger than the view at distance `d`, facing the camera
    fn wall(d: f32) -> OccluderInstance {
        let s = 1000.0;
        let mesh = OccluderMesh::new(
            vec![
                Vec3::new(-s, -s, -d),
                Vec3::new(s, -s, -d),
                Vec3::new(s, s, -d),
                Vec3::new(-s, s, -d),
            ],
            vec![0, 1, 2, 0, 2, 3],
            Affine3A::IDENTITY,
        )
        .unwrap();
        OccluderInstance::new(Arc::new(mesh), Affine3A::IDENTITY)
    }

    fn chunk_at(depths: &[f32]) -> OccludeeChunk {
        let mut chunk = OccludeeChunk::new();
        for &d in depths {
            let world = Affine3A::from_translation(Vec3::new(0.0, 0.0, -d));
            chunk.push(Occludee::new(Vec3::splat(-0.1), Vec3::splat(0.1), world)).unwrap();
        }
        chunk
    }

    fn culling() -> OcclusionCulling {
        OcclusionCulling::new(CullingConfig {
            buffer_count: 2,
            backface: crate::config::BackfaceWinding::None,
            ..CullingConfig::default()
        })
    }

    #[test]
    fn wall_hides_what_is_behind_it() {
        let mut culling = culling();
        let mut chunks = vec![chunk_at(&[2.0, 20.0, 50.0])];
        let stats = culling.cull(&params(1), &[wall(10.0)], &mut chunks);

        assert_eq!(chunks[0].visibility(), 0b001, "only the box in front of the wall survives");
        assert_eq!(stats.occludees_visible, 1);
        assert_eq!(stats.occludees_occluded, 2);
        assert_eq!(stats.occluders_clipped, 1);
        assert!(culling.view(ViewKey::new(1)).is_some_and(|g| g.has_depth));
    }

    #[test]
    fn invalid_view_is_skipped_without_touching_bits() {
        let mut culling = culling();
        let mut chunks = vec![chunk_at(&[20.0])];
        let mut bad = params(2);
        bad.width = 100;
        let stats = culling.cull(&bad, &[wall(10.0)], &mut chunks);
        assert!(stats.skipped);
        assert_eq!(chunks[0].visibility(), 0b1);
        assert_eq!(culling.view_count(), 0);
    }

    #[test]
    fn display_only_occluded_inverts_the_verdict() {
        let mut culling = culling();
        culling.config_mut().display_only_occluded = true;
        let mut chunks = vec![chunk_at(&[2.0, 20.0])];
        culling.cull(&params(3), &[wall(10.0)], &mut chunks);
        assert_eq!(chunks[0].visibility(), 0b10);
    }

    #[test]
    fn freeze_keeps_the_previous_depth() {
        let mut culling = culling();
        let mut chunks = vec![chunk_at(&[20.0])];
        culling.cull(&params(4), &[wall(10.0)], &mut chunks);
        assert_eq!(chunks[0].visibility(), 0);

        culling.config_mut().freeze = true;
        chunks[0].reset_visibility();
        let stats = culling.cull(&params(4), &[], &mut chunks);
        assert!(stats.frozen);
        assert_eq!(chunks[0].visibility(), 0, "frozen wall still hides the box");

        culling.config_mut().freeze = false;
        chunks[0].reset_visibility();
        culling.cull(&params(4), &[], &mut chunks);
        assert_eq!(chunks[0].visibility(), 1, "nothing rasterized once unfrozen");
    }

    #[test]
    fn view_lifecycle() {
        let mut culling = culling();
        let mut chunks: Vec<OccludeeChunk> = Vec::new();
        for key in 0..3 {
            culling.cull(&params(key), &[], &mut chunks);
        }
        assert_eq!(culling.view_count(), 3);
        assert!(culling.remove_view(ViewKey::new(1)));
        assert!(!culling.remove_view(ViewKey::new(1)));
        culling.retain_views(|key| key.id != 2);
        assert_eq!(culling.view_count(), 1);
        assert!(culling.view(ViewKey::new(0)).is_some());
    }
}

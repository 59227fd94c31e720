/// Occluder transform, clipping and triangle setup
///
/// Vertices are kept in a y-flipped clip space `(x, -y, c)` where `c` is clip
/// `w` for perspective and clip `z` for orthographic views. Every instance
/// reserves `6 * index_count` output vertices and `2 * index_count` extents up
/// front, so all write offsets are known before the parallel clip starts.
use super::buffer_group::BufferGroup;
use super::view::Projection;
use super::{EXTENTS_PER_INDEX, MAX_CLIPPED_VERTS, VERTS_PER_INDEX};
use crate::config::{BackfaceWinding, CullingConfig};
use crate::occluder::OccluderInstance;
use crate::perf::CULLING_COUNTERS;
use crate::{count_add, count_call};
use glam::{Mat4, Vec3, Vec4};
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriangleClass {
    /// Every vertex passes every plane
    Inside,
    /// All three vertices fail one plane
    Outside,
    Clipping,
}

/// Per-instance clip output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClippedOccluder {
    /// First vertex in `ClippedScene::vertices`; the first extent is `vertex_offset / 3`
    pub vertex_offset: usize,
    /// Emitted vertices, always a multiple of 3
    pub vertex_count: usize,
    /// Flipped NDC bounds in xy, nearest clip `c` in z
    pub screen_min: Vec3,
    /// Flipped NDC bounds in xy, farthest clip `c` in z
    pub screen_max: Vec3,
}

impl ClippedOccluder {
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.vertex_count / 3
    }

    #[inline]
    pub fn extent_offset(&self) -> usize {
        self.vertex_offset / 3
    }

    fn empty(vertex_offset: usize) -> Self {
        Self {
            vertex_offset,
            vertex_count: 0,
            screen_min: Vec3::ZERO,
            screen_max: Vec3::ZERO,
        }
    }
}

/// Shared clip output for one view and frame
#[derive(Debug, Default, Clone)]
pub struct ClippedScene {
    pub occluders: Vec<ClippedOccluder>,
    pub vertices: Vec<Vec3>,
    /// Per-triangle `(min_x, min_y, max_x, max_y)` in flipped NDC
    pub extents: Vec<Vec4>,
}

impl ClippedScene {
    pub fn triangle_count(&self) -> usize {
        self.occluders.iter().map(ClippedOccluder::triangle_count).sum()
    }
}

/// Convex polygon produced by clipping one triangle
#[derive(Debug, Clone, Copy)]
pub struct ClipPolygon {
    verts: [Vec3; MAX_CLIPPED_VERTS],
    len: usize,
}

impl ClipPolygon {
    pub fn triangle(tri: [Vec3; 3]) -> Self {
        let mut poly = Self::empty();
        for v in tri {
            poly.push(v);
        }
        poly
    }

    fn empty() -> Self {
        Self {
            verts: [Vec3::ZERO; MAX_CLIPPED_VERTS],
            len: 0,
        }
    }

    #[inline]
    fn push(&mut self, v: Vec3) {
        debug_assert!(self.len < MAX_CLIPPED_VERTS, "clipped polygon overflow");
        if self.len < MAX_CLIPPED_VERTS {
            self.verts[self.len] = v;
            self.len += 1;
        }
    }

    #[inline]
    pub fn vertices(&self) -> &[Vec3] {
        &self.verts[..self.len]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len < 3
    }

    /// Fan triangulation around vertex 0
    pub fn fan(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        (1..self.len.saturating_sub(1)).map(move |i| [self.verts[0], self.verts[i], self.verts[i + 1]])
    }
}

/// View constants needed by the clip stage
#[derive(Debug, Clone, Copy)]
pub struct ClipContext {
    pub view_projection: Mat4,
    pub planes: [Vec4; 5],
    pub projection: Projection,
    pub epsilon: f32,
    pub backface: BackfaceWinding,
}

impl ClipContext {
    pub fn new(group: &BufferGroup, config: &CullingConfig) -> Self {
        Self {
            view_projection: group.culling_matrix,
            planes: group.planes,
            projection: group.projection,
            epsilon: config.plane_epsilon,
            backface: config.backface,
        }
    }

    /// `(x, -y, c)` of a point under `mvp`
    #[inline]
    pub fn transform(&self, mvp: &Mat4, p: Vec3) -> Vec3 {
        let clip = *mvp * p.extend(1.0);
        let c = match self.projection {
            Projection::Perspective => clip.w,
            Projection::Orthographic => clip.z,
        };
        Vec3::new(clip.x, -clip.y, c)
    }

    #[inline]
    fn distance(&self, plane: usize, v: Vec3) -> f32 {
        self.planes[plane].dot(v.extend(1.0))
    }

    #[inline]
    fn inside(&self, plane: usize, v: Vec3) -> bool {
        self.distance(plane, v) >= -self.epsilon
    }

    /// Flipped NDC xy of a clip-space vertex
    #[inline]
    pub fn ndc(&self, v: Vec3) -> (f32, f32) {
        match self.projection {
            Projection::Perspective => (v.x / v.z, v.y / v.z),
            Projection::Orthographic => (v.x, v.y),
        }
    }

    #[inline]
    fn homogeneous_w(&self, v: Vec3) -> f32 {
        match self.projection {
            Projection::Perspective => v.z,
            Projection::Orthographic => 1.0,
        }
    }

    pub fn classify(&self, tri: &[Vec3; 3]) -> TriangleClass {
        let mut straddles = false;
        for plane in 0..self.planes.len() {
            let inside = tri.map(|v| self.inside(plane, v));
            match inside {
                [false, false, false] => return TriangleClass::Outside,
                [true, true, true] => {}
                _ => straddles = true,
            }
        }
        if straddles {
            TriangleClass::Clipping
        } else {
            TriangleClass::Inside
        }
    }

    /// Sutherland-Hodgman against all planes, double buffered
    pub fn clip_polygon(&self, poly: &ClipPolygon) -> ClipPolygon {
        let mut src = *poly;
        let mut dst = ClipPolygon::empty();
        for plane in 0..self.planes.len() {
            dst.len = 0;
            self.clip_against_plane(&src, &mut dst, plane);
            if dst.is_empty() {
                return ClipPolygon::empty();
            }
            std::mem::swap(&mut src, &mut dst);
        }
        src
    }

    fn clip_against_plane(&self, input: &ClipPolygon, output: &mut ClipPolygon, plane: usize) {
        let verts = input.vertices();
        let Some(&last) = verts.last() else {
            return;
        };

        let mut prev = last;
        let mut prev_dist = self.distance(plane, prev);
        let mut prev_inside = prev_dist >= -self.epsilon;

        for &curr in verts {
            let curr_dist = self.distance(plane, curr);
            let curr_inside = curr_dist >= -self.epsilon;
            // Intersections are always computed from the inside vertex so shared
            // edges clip to the same point from both triangles
            match (prev_inside, curr_inside) {
                (true, true) => output.push(curr),
                (true, false) => output.push(intersect(prev, prev_dist, curr, curr_dist)),
                (false, true) => {
                    output.push(intersect(curr, curr_dist, prev, prev_dist));
                    output.push(curr);
                }
                (false, false) => {}
            }
            prev = curr;
            prev_dist = curr_dist;
            prev_inside = curr_inside;
        }
    }

    /// Screen-space signed area, positive for counter-clockwise triangles in NDC.
    ///
    /// Homogeneous determinant of `(x, -y, w)`, so it holds before the divide.
    #[inline]
    pub fn signed_area(&self, tri: &[Vec3; 3]) -> f32 {
        let [a, b, c] = tri.map(|v| Vec3::new(v.x, v.y, self.homogeneous_w(v)));
        -a.dot(b.cross(c))
    }

    /// Backface and degenerate test; survivors come back wound counter-clockwise
    #[inline]
    pub fn cull_backface(&self, tri: [Vec3; 3]) -> Option<[Vec3; 3]> {
        let area = self.signed_area(&tri);
        let keep_ccw = area > self.epsilon;
        let keep_cw = area < -self.epsilon;
        match self.backface {
            BackfaceWinding::Cw if keep_ccw => Some(tri),
            BackfaceWinding::Ccw if keep_cw => Some([tri[0], tri[2], tri[1]]),
            BackfaceWinding::None if keep_ccw => Some(tri),
            BackfaceWinding::None if keep_cw => Some([tri[0], tri[2], tri[1]]),
            _ => None,
        }
    }

    /// Clip one occluder instance into its reserved output slices
    pub fn clip_occluder(
        &self,
        instance: &OccluderInstance,
        vertex_offset: usize,
        scratch: &mut Vec<Vec3>,
        out_vertices: &mut [Vec3],
        out_extents: &mut [Vec4],
    ) -> ClippedOccluder {
        count_call!(CULLING_COUNTERS.occluders_submitted);
        let mesh = &instance.mesh;
        if mesh.triangle_count() == 0 {
            return ClippedOccluder::empty(vertex_offset);
        }

        let mvp = self.view_projection
            * Mat4::from(instance.world)
            * Mat4::from(mesh.local_transform());

        // Whole-instance test on the transformed local bounds
        let (lo, hi) = mesh.aabb();
        let corners = aabb_corners(lo, hi).map(|p| self.transform(&mvp, p));
        let mut all_inside = true;
        for plane in 0..self.planes.len() {
            let inside = corners.iter().filter(|&&c| self.inside(plane, c)).count();
            if inside == 0 {
                count_call!(CULLING_COUNTERS.occluders_rejected);
                return ClippedOccluder::empty(vertex_offset);
            }
            all_inside &= inside == corners.len();
        }

        scratch.clear();
        scratch.extend(mesh.vertices().iter().map(|&p| self.transform(&mvp, p)));
        if !all_inside && scratch.iter().all(|&v| !self.inside(0, v)) {
            count_call!(CULLING_COUNTERS.occluders_rejected);
            return ClippedOccluder::empty(vertex_offset);
        }

        let mut emitter = Emitter {
            ctx: self,
            vertices: out_vertices,
            extents: out_extents,
            written: 0,
            min: Vec3::splat(f32::MAX),
            max: Vec3::splat(f32::MIN),
        };

        for tri in mesh.indices().chunks_exact(3) {
            let tri = [
                scratch[tri[0] as usize],
                scratch[tri[1] as usize],
                scratch[tri[2] as usize],
            ];
            let class = if all_inside {
                TriangleClass::Inside
            } else {
                self.classify(&tri)
            };
            match class {
                TriangleClass::Outside => {}
                TriangleClass::Inside => emitter.emit(tri),
                TriangleClass::Clipping => {
                    count_call!(CULLING_COUNTERS.triangles_clipped);
                    let poly = self.clip_polygon(&ClipPolygon::triangle(tri));
                    for fan_tri in poly.fan() {
                        emitter.emit(fan_tri);
                    }
                }
            }
        }

        let written = emitter.written;
        if written == 0 {
            return ClippedOccluder::empty(vertex_offset);
        }
        count_add!(CULLING_COUNTERS.triangles_emitted, written / 3);

        // Fast path: unclipped instances take their extent from the projected box
        let (screen_min, screen_max) = if all_inside {
            corners.iter().fold(
                (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
                |(lo, hi), &c| {
                    let (x, y) = self.ndc(c);
                    let p = Vec3::new(x, y, c.z);
                    (lo.min(p), hi.max(p))
                },
            )
        } else {
            (emitter.min, emitter.max)
        };

        ClippedOccluder {
            vertex_offset,
            vertex_count: written,
            screen_min,
            screen_max,
        }
    }
}

/// Point on the segment `a -> b` where the plane distance crosses zero
#[inline]
fn intersect(a: Vec3, da: f32, b: Vec3, db: f32) -> Vec3 {
    let t = da / (da - db);
    a + (b - a) * t
}

fn aabb_corners(lo: Vec3, hi: Vec3) -> [Vec3; 8] {
    [
        Vec3::new(lo.x, lo.y, lo.z),
        Vec3::new(hi.x, lo.y, lo.z),
        Vec3::new(lo.x, hi.y, lo.z),
        Vec3::new(hi.x, hi.y, lo.z),
        Vec3::new(lo.x, lo.y, hi.z),
        Vec3::new(hi.x, lo.y, hi.z),
        Vec3::new(lo.x, hi.y, hi.z),
        Vec3::new(hi.x, hi.y, hi.z),
    ]
}

/// Writes surviving triangles and their extents into an instance's reserved slices
struct Emitter<'a> {
    ctx: &'a ClipContext,
    vertices: &'a mut [Vec3],
    extents: &'a mut [Vec4],
    written: usize,
    min: Vec3,
    max: Vec3,
}

impl Emitter<'_> {
    #[inline]
    fn emit(&mut self, tri: [Vec3; 3]) {
        let Some(tri) = self.ctx.cull_backface(tri) else {
            count_call!(CULLING_COUNTERS.triangles_backface);
            return;
        };
        debug_assert!(
            self.written + 3 <= self.vertices.len(),
            "clip output exceeded its reservation"
        );
        if self.written + 3 > self.vertices.len() {
            return;
        }

        let mut lo = Vec3::splat(f32::MAX);
        let mut hi = Vec3::splat(f32::MIN);
        for v in tri {
            let (x, y) = self.ctx.ndc(v);
            let p = Vec3::new(x, y, v.z);
            lo = lo.min(p);
            hi = hi.max(p);
        }

        self.vertices[self.written..self.written + 3].copy_from_slice(&tri);
        self.extents[self.written / 3] = Vec4::new(lo.x, lo.y, hi.x, hi.y);
        self.written += 3;
        self.min = self.min.min(lo);
        self.max = self.max.max(hi);
    }
}

/// Split `slice` into consecutive disjoint pieces of the given lengths
fn split_by_lengths<'a, T>(
    mut rest: &'a mut [T],
    lengths: impl IntoIterator<Item = usize>,
) -> Vec<&'a mut [T]> {
    lengths
        .into_iter()
        .map(|len| {
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(len);
            rest = tail;
            head
        })
        .collect()
}

/// Clip every instance in parallel into `scene`, reusing its allocations
pub fn clip_scene(ctx: &ClipContext, instances: &[OccluderInstance], scene: &mut ClippedScene) {
    let index_counts: Vec<usize> = instances.iter().map(|i| i.mesh.indices().len()).collect();
    let total: usize = index_counts.iter().sum();

    scene.vertices.clear();
    scene.vertices.resize(total * VERTS_PER_INDEX, Vec3::ZERO);
    scene.extents.clear();
    scene.extents.resize(total * EXTENTS_PER_INDEX, Vec4::ZERO);

    let offsets: Vec<usize> = index_counts
        .iter()
        .scan(0, |acc, &n| {
            let offset = *acc;
            *acc += n * VERTS_PER_INDEX;
            Some(offset)
        })
        .collect();
    let vertex_slices = split_by_lengths(
        &mut scene.vertices,
        index_counts.iter().map(|n| n * VERTS_PER_INDEX),
    );
    let extent_slices = split_by_lengths(
        &mut scene.extents,
        index_counts.iter().map(|n| n * EXTENTS_PER_INDEX),
    );

    scene.occluders = instances
        .par_iter()
        .zip(offsets.into_par_iter())
        .zip(vertex_slices.into_par_iter())
        .zip(extent_slices.into_par_iter())
        .map_init(Vec::new, |scratch, (((instance, offset), verts), extents)| {
            ctx.clip_occluder(instance, offset, scratch, verts, extents)
        })
        .collect();
}

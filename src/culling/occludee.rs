/// Occludee bounds and the visibility test against the merged buffer
///
/// Every occludee AABB is projected to a flipped-NDC rectangle plus the
/// nearest clip `c` it can reach. Chunks of up to 128 instances carry the union
/// of their members' rectangles so a whole chunk can be rejected with one test.
use super::buffer_group::BufferGroup;
use super::view::Projection;
use super::{INSTANCES_PER_CHUNK, SUB_TILE_WIDTH, TILE_HEIGHT, TILE_HEIGHT_SHIFT, TILE_WIDTH, TILE_WIDTH_SHIFT};
use crate::camera::Frustum;
use crate::error::CullingError;
use crate::perf::CULLING_COUNTERS;
use crate::simd::{F32x4, I32x4};
use crate::count_call;
use glam::{Affine3A, Mat4, Vec2, Vec3, Vec4};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullingResult {
    /// Outside the view rectangle or entirely behind the near plane
    ViewCulled,
    /// Every sub-tile it touches is nearer than it can be
    Occluded,
    Visible,
}

/// Screen-space bounds of one occludee for the current view
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OcclusionTest {
    /// Flipped NDC
    pub screen_min: Vec2,
    pub screen_max: Vec2,
    /// Nearest clip `c` (`w` for perspective, `z` for orthographic)
    pub near: f32,
    pub empty: bool,
}

impl Default for OcclusionTest {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl OcclusionTest {
    pub const EMPTY: Self = Self {
        screen_min: Vec2::splat(f32::MAX),
        screen_max: Vec2::splat(f32::MIN),
        near: f32::MAX,
        empty: true,
    };

    /// Project the eight corners of a box, clipping its twelve edges against the near plane
    pub fn from_corners(projector: &BoundsProjector, mvp: &Mat4, min: Vec3, max: Vec3) -> Self {
        let corners = box_corners(min, max).map(|p| {
            let clip = *mvp * p.extend(1.0);
            let c = match projector.projection {
                Projection::Perspective => clip.w,
                Projection::Orthographic => clip.z,
            };
            Vec4::new(clip.x, -clip.y, c, 0.0)
        });
        let threshold = projector.near_threshold();
        let front = corners.map(|v| v.z >= threshold);

        let mut test = Self::EMPTY;
        let mut clipped = false;
        for (v, &in_front) in corners.iter().zip(&front) {
            if in_front {
                test.include(projector.ndc(*v), v.z);
            }
        }
        for &(a, b) in &BOX_EDGES {
            if front[a] != front[b] {
                let (inside, outside) = if front[a] { (corners[a], corners[b]) } else { (corners[b], corners[a]) };
                let t = (inside.z - threshold) / (inside.z - outside.z);
                let mut p = inside + (outside - inside) * t;
                p.z = threshold;
                test.include(projector.ndc(p), threshold);
                clipped = true;
            }
        }
        if clipped {
            test.near = threshold;
        }
        test
    }

    #[inline]
    fn include(&mut self, ndc: Vec2, c: f32) {
        self.screen_min = self.screen_min.min(ndc);
        self.screen_max = self.screen_max.max(ndc);
        self.near = self.near.min(c);
        self.empty = false;
    }

    /// Smallest test enclosing both
    pub fn union(&self, other: &Self) -> Self {
        match (self.empty, other.empty) {
            (true, _) => *other,
            (_, true) => *self,
            _ => Self {
                screen_min: self.screen_min.min(other.screen_min),
                screen_max: self.screen_max.max(other.screen_max),
                near: self.near.min(other.near),
                empty: false,
            },
        }
    }

    /// Nearest reversed depth the occludee can present
    #[inline]
    pub fn max_depth(&self, projection: Projection) -> f32 {
        match projection {
            Projection::Perspective => 1.0 / self.near,
            Projection::Orthographic => (1.0 - self.near).max(0.0),
        }
    }
}

/// Union of the member tests of one chunk
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChunkOcclusionTest {
    pub bounds: OcclusionTest,
}

impl ChunkOcclusionTest {
    pub fn from_tests<'a>(tests: impl IntoIterator<Item = &'a OcclusionTest>) -> Self {
        let bounds = tests
            .into_iter()
            .fold(OcclusionTest::EMPTY, |acc, t| acc.union(t));
        Self { bounds }
    }
}

/// View constants for projecting occludee boxes
#[derive(Debug, Clone, Copy)]
pub struct BoundsProjector {
    pub view_projection: Mat4,
    pub projection: Projection,
    pub near_clip: f32,
    pub frustum: Frustum,
}

impl BoundsProjector {
    pub fn new(group: &BufferGroup) -> Self {
        Self {
            view_projection: group.culling_matrix,
            projection: group.projection,
            near_clip: group.near_clip,
            frustum: Frustum::from_view(&group.culling_matrix, group.projection, group.near_clip),
        }
    }

    #[inline]
    fn near_threshold(&self) -> f32 {
        match self.projection {
            Projection::Perspective => self.near_clip,
            Projection::Orthographic => 0.0,
        }
    }

    #[inline]
    fn ndc(&self, v: Vec4) -> Vec2 {
        match self.projection {
            Projection::Perspective => Vec2::new(v.x / v.z, v.y / v.z),
            Projection::Orthographic => Vec2::new(v.x, v.y),
        }
    }
}

/// Test a screen rectangle against the merged buffer of `group`.
///
/// Returns `Visible` at the first sub-tile whose effective minimum is not
/// nearer than the rectangle's nearest depth.
pub fn test_rect(group: &BufferGroup, rect: &OcclusionTest) -> CullingResult {
    if rect.empty
        || rect.screen_max.x < -1.0
        || rect.screen_min.x > 1.0
        || rect.screen_max.y < -1.0
        || rect.screen_min.y > 1.0
    {
        return CullingResult::ViewCulled;
    }

    let grid = &group.grid;
    let screen = &group.screen;
    let width = grid.width as i32;
    let height = grid.height as i32;

    // Pixel bbox, max exclusive: the pixel holding the max corner is included
    let px_min = (screen.to_pixel_x(rect.screen_min.x).floor() as i32).clamp(0, width);
    let py_min = (screen.to_pixel_y(rect.screen_min.y).floor() as i32).clamp(0, height);
    let px_max = (screen.to_pixel_x(rect.screen_max.x).floor() as i32 + 1).clamp(0, width);
    let py_max = (screen.to_pixel_y(rect.screen_max.y).floor() as i32 + 1).clamp(0, height);
    if px_min >= px_max || py_min >= py_max {
        return CullingResult::ViewCulled;
    }

    let tx_min = (px_min >> TILE_WIDTH_SHIFT) as usize;
    let tx_max = ((px_max + TILE_WIDTH as i32 - 1) >> TILE_WIDTH_SHIFT) as usize;
    let ty_min = (py_min >> TILE_HEIGHT_SHIFT) as usize;
    let ty_max = ((py_max + TILE_HEIGHT as i32 - 1) >> TILE_HEIGHT_SHIFT) as usize;

    let z_max = F32x4::splat(rect.max_depth(group.projection));
    let lane_x = I32x4::new(0, SUB_TILE_WIDTH as i32, 2 * SUB_TILE_WIDTH as i32, 3 * SUB_TILE_WIDTH as i32);
    // Sub-tile [x, x + 8) overlaps [px_min, px_max)
    let lo = I32x4::splat(px_min - SUB_TILE_WIDTH as i32);
    let hi = I32x4::splat(px_max);
    let tiles = group.merged();

    for ty in ty_min..ty_max {
        for tx in tx_min..tx_max {
            let pixel_x = lane_x + I32x4::splat((tx * TILE_WIDTH) as i32);
            let in_box = pixel_x.cmp_gt(lo) & hi.cmp_gt(pixel_x);
            let tile = &tiles[grid.tile_index(tx, ty)];
            let pass = z_max.cmp_ge(tile.effective_min()) & in_box;
            if pass.any() {
                return CullingResult::Visible;
            }
        }
    }
    CullingResult::Occluded
}

/// An occludee: local bounds under a world transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Occludee {
    pub aabb_min: Vec3,
    pub aabb_max: Vec3,
    pub world: Affine3A,
}

impl Occludee {
    pub fn new(aabb_min: Vec3, aabb_max: Vec3, world: Affine3A) -> Self {
        Self {
            aabb_min,
            aabb_max,
            world,
        }
    }

    /// World-space bounds of the transformed box
    pub fn world_aabb(&self) -> (Vec3, Vec3) {
        let center = (self.aabb_min + self.aabb_max) * 0.5;
        let extent = (self.aabb_max - self.aabb_min) * 0.5;
        let world_center = self.world.transform_point3(center);
        let m = self.world.matrix3;
        let world_extent = m.x_axis.abs() * extent.x + m.y_axis.abs() * extent.y + m.z_axis.abs() * extent.z;
        let world_extent = Vec3::from(world_extent);
        (world_center - world_extent, world_center + world_extent)
    }
}

/// Per-chunk tally of one visibility pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkVerdicts {
    pub visible: usize,
    pub occluded: usize,
    pub view_culled: usize,
}

impl std::ops::AddAssign for ChunkVerdicts {
    fn add_assign(&mut self, rhs: Self) {
        self.visible += rhs.visible;
        self.occluded += rhs.occluded;
        self.view_culled += rhs.view_culled;
    }
}

/// Up to 128 occludees sharing one coarse test and one visibility bitset.
///
/// Bit `i` of the bitset is instance `i`. Culling only ever clears bits, so
/// verdicts of earlier stages (frustum, LOD) survive.
#[derive(Debug, Clone, Default)]
pub struct OccludeeChunk {
    instances: Vec<Occludee>,
    visible: u128,
    chunk_test: ChunkOcclusionTest,
    tests: Vec<OcclusionTest>,
}

impl OccludeeChunk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an instance, initially visible; returns its bit index
    pub fn push(&mut self, occludee: Occludee) -> Result<usize, CullingError> {
        let index = self.instances.len();
        if index >= INSTANCES_PER_CHUNK {
            return Err(CullingError::TooManyInstances { count: index + 1 });
        }
        self.instances.push(occludee);
        self.visible |= 1u128 << index;
        Ok(index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    #[inline]
    pub fn instances(&self) -> &[Occludee] {
        &self.instances
    }

    #[inline]
    pub fn instances_mut(&mut self) -> &mut [Occludee] {
        &mut self.instances
    }

    #[inline]
    pub fn visibility(&self) -> u128 {
        self.visible
    }

    /// Overwrite the bitset with an upstream verdict; bits past `len` are dropped
    #[inline]
    pub fn set_visibility(&mut self, bits: u128) {
        self.visible = bits & self.occupied();
    }

    /// Mark every instance visible again, ready for the next frame
    #[inline]
    pub fn reset_visibility(&mut self) {
        self.visible = self.occupied();
    }

    #[inline]
    pub fn is_visible(&self, index: usize) -> bool {
        index < self.instances.len() && self.visible & (1u128 << index) != 0
    }

    #[inline]
    pub fn chunk_test(&self) -> &ChunkOcclusionTest {
        &self.chunk_test
    }

    #[inline]
    pub fn tests(&self) -> &[OcclusionTest] {
        &self.tests
    }

    #[inline]
    fn occupied(&self) -> u128 {
        match self.instances.len() {
            0 => 0,
            INSTANCES_PER_CHUNK => u128::MAX,
            n => (1u128 << n) - 1,
        }
    }

    /// Recompute per-instance and chunk bounds for the current view
    pub fn compute_bounds(&mut self, projector: &BoundsProjector) {
        self.tests.clear();
        self.tests.resize(self.instances.len(), OcclusionTest::EMPTY);

        let chunk_aabb = self
            .instances
            .iter()
            .map(Occludee::world_aabb)
            .reduce(|(lo, hi), (a, b)| (lo.min(a), hi.max(b)));
        let Some((lo, hi)) = chunk_aabb else {
            self.chunk_test = ChunkOcclusionTest::default();
            return;
        };
        if !projector.frustum.intersects_aabb(lo, hi) {
            self.chunk_test = ChunkOcclusionTest::default();
            return;
        }

        for (test, occludee) in self.tests.iter_mut().zip(&self.instances) {
            let mvp = projector.view_projection * Mat4::from(occludee.world);
            *test = OcclusionTest::from_corners(projector, &mvp, occludee.aabb_min, occludee.aabb_max);
        }
        self.chunk_test = ChunkOcclusionTest::from_tests(&self.tests);
    }

    /// Clear the bits of instances that are not visible in `group`.
    ///
    /// With `display_only_occluded` the occlusion verdict is inverted, keeping
    /// only occluded instances; view-culled instances are dropped either way.
    pub fn apply_visibility(&mut self, group: &BufferGroup, display_only_occluded: bool) -> ChunkVerdicts {
        let mut verdicts = ChunkVerdicts::default();
        if self.visible == 0 {
            return verdicts;
        }

        let chunk = test_rect(group, &self.chunk_test.bounds);
        if chunk != CullingResult::Visible && !display_only_occluded {
            let survivors = self.visible.count_ones() as usize;
            match chunk {
                CullingResult::Occluded => verdicts.occluded = survivors,
                _ => verdicts.view_culled = survivors,
            }
            self.visible = 0;
            return verdicts;
        }

        for (index, test) in self.tests.iter().enumerate() {
            let bit = 1u128 << index;
            if self.visible & bit == 0 {
                continue;
            }
            count_call!(CULLING_COUNTERS.occludees_tested);
            let result = test_rect(group, test);
            let keep = match result {
                CullingResult::ViewCulled => {
                    verdicts.view_culled += 1;
                    false
                }
                CullingResult::Occluded => {
                    count_call!(CULLING_COUNTERS.occludees_occluded);
                    verdicts.occluded += 1;
                    display_only_occluded
                }
                CullingResult::Visible => {
                    verdicts.visible += 1;
                    !display_only_occluded
                }
            };
            if !keep {
                self.visible &= !bit;
            }
        }
        verdicts
    }
}

fn box_corners(lo: Vec3, hi: Vec3) -> [Vec3; 8] {
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

/// Corner index pairs differing in exactly one axis bit
const BOX_EDGES: [(usize, usize); 12] = [
    (0, 1),
    (2, 3),
    (4, 5),
    (6, 7),
    (0, 2),
    (1, 3),
    (4, 6),
    (5, 7),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

/// Masked software occlusion culling
///
/// Pipeline per view and frame:
/// clear -> clip + sort occluders (parallel with occludee bounds) -> rasterize
/// bins into worker-local buffers -> merge into buffer 0 -> visibility test.
pub mod buffer_group;
pub mod clip;
pub mod debug;
pub mod frame;
pub mod merge;
pub mod occludee;
pub mod rasterizer;
pub mod sort;
pub mod tile;
pub mod view;

pub use buffer_group::{BufferGroup, ScreenConstants, TileGrid, TileRect};
pub use clip::{ClipContext, ClippedOccluder, ClippedScene, TriangleClass};
pub use frame::{CullStats, OcclusionCulling};
pub use occludee::{ChunkOcclusionTest, CullingResult, OccludeeChunk, OcclusionTest};
pub use tile::Tile;
pub use view::{Projection, ViewKey, ViewParams};

pub const TILE_WIDTH_SHIFT: u32 = 5;
pub const TILE_HEIGHT_SHIFT: u32 = 2;
/// Tile size in pixels (32x4)
pub const TILE_WIDTH: usize = 1 << TILE_WIDTH_SHIFT;
pub const TILE_HEIGHT: usize = 1 << TILE_HEIGHT_SHIFT;
/// Sub-tile size in pixels (8x4), one SIMD lane
pub const SUB_TILE_WIDTH: usize = 8;
pub const SUB_TILE_HEIGHT: usize = 4;

/// Fractional bits of fixed-point screen coordinates
pub const FP_BITS: u32 = 8;
pub const FP_ONE: i32 = 1 << FP_BITS;

/// Triangles whose bounding box spans more tiles than this per axis get a
/// tight per-row tile span
pub const BIG_TRIANGLE: i32 = 3;

/// A triangle clipped by 5 planes has at most 8 vertices, fanned into 6 triangles
pub const MAX_CLIPPED_VERTS: usize = 8;
pub const MAX_FAN_TRIANGLES: usize = MAX_CLIPPED_VERTS - 2;

/// Reserved clip output per index: 6 vertices and 2 extents
pub const VERTS_PER_INDEX: usize = 6;
pub const EXTENTS_PER_INDEX: usize = 2;

// Three indices reserve room for the largest fan of one clipped triangle
const _: () = assert!(3 * VERTS_PER_INDEX >= 3 * MAX_FAN_TRIANGLES && 3 * EXTENTS_PER_INDEX >= MAX_FAN_TRIANGLES);

/// Instances per occludee chunk (one bit each in a `u128`)
pub const INSTANCES_PER_CHUNK: usize = 128;

pub const DEFAULT_GUARD_BAND_PIXELS: f32 = 1.0;
pub const DEFAULT_PLANE_EPSILON: f32 = 1e-12;

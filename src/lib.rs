/// Masked Occlusion - CPU software occlusion culling
/// Occluders are rasterized into a conservative two-layer masked depth
/// buffer; occludee bounding boxes are tested against it every frame.
pub mod camera;
pub mod config;
pub mod culling;
pub mod error;
pub mod occluder;
pub mod perf;
pub mod simd;

pub use camera::{Camera, Frustum};
pub use config::{BackfaceWinding, CullingConfig};
pub use culling::occludee::Occludee;
pub use culling::{
    BufferGroup, CullStats, CullingResult, OccludeeChunk, OcclusionCulling, Projection, ViewKey,
    ViewParams,
};
pub use error::CullingError;
pub use occluder::{OccluderInstance, OccluderMesh, OccluderMeshRegistry};
pub use perf::{CounterSnapshot, CullingCounters, CULLING_COUNTERS};

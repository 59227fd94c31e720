/// Culling configuration parameters
use crate::culling::{DEFAULT_GUARD_BAND_PIXELS, DEFAULT_PLANE_EPSILON};

/// Triangle winding dropped by the backface test, as seen on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackfaceWinding {
    /// Keep both windings
    None,
    /// Drop clockwise triangles
    #[default]
    Cw,
    /// Drop counter-clockwise triangles
    Ccw,
}

#[derive(Debug, Clone)]
pub struct CullingConfig {
    /// Worker-local tile buffers per view, merged into buffer 0 every frame
    pub buffer_count: usize,
    /// Bin width in tiles (one rasterization job per bin and buffer)
    pub tiles_per_bin_x: usize,
    /// Bin height in tiles
    pub tiles_per_bin_y: usize,
    /// Side clip planes are pushed out by this many pixels
    pub guard_band_pixels: f32,
    /// Plane classification epsilon used while clipping
    pub plane_epsilon: f32,
    pub backface: BackfaceWinding,
    /// Debug: invert the verdict so only occluded instances survive
    pub display_only_occluded: bool,
    /// Debug: keep the last depth buffers and matrix, only re-run the visibility test
    pub freeze: bool,
}

impl Default for CullingConfig {
    fn default() -> Self {
        Self {
            buffer_count: rayon::current_num_threads().clamp(1, 8),
            tiles_per_bin_x: 2,
            tiles_per_bin_y: 4,
            guard_band_pixels: DEFAULT_GUARD_BAND_PIXELS,
            plane_epsilon: DEFAULT_PLANE_EPSILON,
            backface: BackfaceWinding::Cw,
            display_only_occluded: false,
            freeze: false,
        }
    }
}

impl CullingConfig {
    /// Single buffer, useful for deterministic tests and single-threaded hosts
    pub fn single_buffer() -> Self {
        Self {
            buffer_count: 1,
            ..Self::default()
        }
    }
}

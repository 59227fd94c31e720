/// Per-view depth buffer state: tile grid, worker-local buffer copies, screen
/// mapping and clip planes.
///
/// Tiles are stored bin-major: all tiles of bin 0, then bin 1, and so on, with
/// every bin padded to `tiles_per_bin_x * tiles_per_bin_y` entries. A bin is
/// then one contiguous slice, so each (buffer, bin) rasterization job owns a
/// disjoint `&mut [Tile]`.
use super::tile::Tile;
use super::view::{Projection, ViewParams};
use super::{TILE_HEIGHT, TILE_HEIGHT_SHIFT, TILE_WIDTH, TILE_WIDTH_SHIFT};
use crate::config::CullingConfig;
use glam::{Mat4, Vec4};
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    pub width: u32,
    pub height: u32,
    pub tiles_x: usize,
    pub tiles_y: usize,
    pub tiles_per_bin_x: usize,
    pub tiles_per_bin_y: usize,
    pub bins_x: usize,
    pub bins_y: usize,
}

/// Tile-space rectangle, `min` inclusive and `max` exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRect {
    pub min_x: usize,
    pub min_y: usize,
    pub max_x: usize,
    pub max_y: usize,
}

impl TileGrid {
    pub fn new(width: u32, height: u32, tiles_per_bin_x: usize, tiles_per_bin_y: usize) -> Self {
        let tiles_per_bin_x = tiles_per_bin_x.max(1);
        let tiles_per_bin_y = tiles_per_bin_y.max(1);
        let tiles_x = (width as usize).div_ceil(TILE_WIDTH);
        let tiles_y = (height as usize).div_ceil(TILE_HEIGHT);
        Self {
            width,
            height,
            tiles_x,
            tiles_y,
            tiles_per_bin_x,
            tiles_per_bin_y,
            bins_x: tiles_x.div_ceil(tiles_per_bin_x),
            bins_y: tiles_y.div_ceil(tiles_per_bin_y),
        }
    }

    #[inline]
    pub fn tiles_per_bin(&self) -> usize {
        self.tiles_per_bin_x * self.tiles_per_bin_y
    }

    #[inline]
    pub fn bin_count(&self) -> usize {
        self.bins_x * self.bins_y
    }

    /// Stored tiles per buffer, including bin padding
    #[inline]
    pub fn tile_count(&self) -> usize {
        self.bin_count() * self.tiles_per_bin()
    }

    /// Storage index of tile (tx, ty)
    #[inline]
    pub fn tile_index(&self, tx: usize, ty: usize) -> usize {
        let bin = (ty / self.tiles_per_bin_y) * self.bins_x + tx / self.tiles_per_bin_x;
        bin * self.tiles_per_bin() + self.local_index(tx, ty)
    }

    /// Index of tile (tx, ty) inside its own bin slice
    #[inline]
    pub fn local_index(&self, tx: usize, ty: usize) -> usize {
        (ty % self.tiles_per_bin_y) * self.tiles_per_bin_x + tx % self.tiles_per_bin_x
    }

    /// Tiles of `bin` that lie on screen
    pub fn bin_rect(&self, bin: usize) -> TileRect {
        let bx = bin % self.bins_x;
        let by = bin / self.bins_x;
        let min_x = bx * self.tiles_per_bin_x;
        let min_y = by * self.tiles_per_bin_y;
        TileRect {
            min_x,
            min_y,
            max_x: (min_x + self.tiles_per_bin_x).min(self.tiles_x),
            max_y: (min_y + self.tiles_per_bin_y).min(self.tiles_y),
        }
    }
}

impl TileRect {
    /// Pixel rectangle (exclusive max) clamped to the screen
    pub fn pixel_rect(&self, grid: &TileGrid) -> [u32; 4] {
        [
            (self.min_x << TILE_WIDTH_SHIFT) as u32,
            (self.min_y << TILE_HEIGHT_SHIFT) as u32,
            ((self.max_x << TILE_WIDTH_SHIFT) as u32).min(grid.width),
            ((self.max_y << TILE_HEIGHT_SHIFT) as u32).min(grid.height),
        ]
    }
}

/// Mapping between y-flipped NDC and pixels: `px = x * half_width + center_x`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenConstants {
    pub half_width: f32,
    pub half_height: f32,
    pub center_x: f32,
    pub center_y: f32,
    /// Last valid pixel column / row
    pub max_x: i32,
    pub max_y: i32,
}

impl ScreenConstants {
    pub fn new(width: u32, height: u32) -> Self {
        let half_width = width as f32 * 0.5;
        let half_height = height as f32 * 0.5;
        Self {
            half_width,
            half_height,
            center_x: half_width,
            center_y: half_height,
            max_x: width as i32 - 1,
            max_y: height as i32 - 1,
        }
    }

    #[inline]
    pub fn to_pixel_x(&self, x: f32) -> f32 {
        x * self.half_width + self.center_x
    }

    #[inline]
    pub fn to_pixel_y(&self, y: f32) -> f32 {
        y * self.half_height + self.center_y
    }

    #[inline]
    pub fn to_ndc_x(&self, px: f32) -> f32 {
        (px - self.center_x) / self.half_width
    }

    #[inline]
    pub fn to_ndc_y(&self, py: f32) -> f32 {
        (py - self.center_y) / self.half_height
    }
}

/// Near plane followed by the four side planes, each pushed out by the guard band.
///
/// Planes are dotted with `(x, -y, c, 1)` where `c` is clip `w` for perspective
/// and clip `z` for orthographic views.
pub fn clip_planes(
    projection: Projection,
    width: u32,
    height: u32,
    near_clip: f32,
    guard_band_pixels: f32,
) -> [Vec4; 5] {
    let gx = 1.0 - 2.0 / width as f32 * guard_band_pixels;
    let gy = 1.0 - 2.0 / height as f32 * guard_band_pixels;
    match projection {
        Projection::Perspective => [
            Vec4::new(0.0, 0.0, 1.0, -near_clip),
            Vec4::new(gx, 0.0, 1.0, 0.0),
            Vec4::new(-gx, 0.0, 1.0, 0.0),
            Vec4::new(0.0, gy, 1.0, 0.0),
            Vec4::new(0.0, -gy, 1.0, 0.0),
        ],
        Projection::Orthographic => [
            Vec4::new(0.0, 0.0, 1.0, 0.0),
            Vec4::new(gx, 0.0, 0.0, 1.0),
            Vec4::new(-gx, 0.0, 0.0, 1.0),
            Vec4::new(0.0, gy, 0.0, 1.0),
            Vec4::new(0.0, -gy, 0.0, 1.0),
        ],
    }
}

pub struct BufferGroup {
    pub grid: TileGrid,
    /// Worker-local copies; buffer 0 holds the merged result after a frame
    pub buffers: Vec<Vec<Tile>>,
    pub screen: ScreenConstants,
    pub planes: [Vec4; 5],
    /// Matrix the current buffers were rasterized with
    pub culling_matrix: Mat4,
    pub near_clip: f32,
    pub projection: Projection,
    /// False until a frame has been rasterized into the buffers
    pub has_depth: bool,
}

impl BufferGroup {
    pub fn new(params: &ViewParams, config: &CullingConfig) -> Self {
        let grid = TileGrid::new(
            params.width,
            params.height,
            config.tiles_per_bin_x,
            config.tiles_per_bin_y,
        );
        let buffer_count = config.buffer_count.max(1);
        log::debug!(
            "creating buffer group for view {:?}: {}x{} px, {}x{} tiles, {} bins, {} buffers",
            params.key,
            params.width,
            params.height,
            grid.tiles_x,
            grid.tiles_y,
            grid.bin_count(),
            buffer_count
        );
        Self {
            grid,
            buffers: vec![vec![Tile::cleared(); grid.tile_count()]; buffer_count],
            screen: ScreenConstants::new(params.width, params.height),
            planes: clip_planes(
                params.projection,
                params.width,
                params.height,
                params.near_clip,
                config.guard_band_pixels,
            ),
            culling_matrix: params.view_projection,
            near_clip: params.near_clip,
            projection: params.projection,
            has_depth: false,
        }
    }

    /// Tile storage only has to be rebuilt when the layout changes
    pub fn needs_resize(&self, params: &ViewParams, config: &CullingConfig) -> bool {
        self.grid.width != params.width
            || self.grid.height != params.height
            || self.projection != params.projection
            || self.grid.tiles_per_bin_x != config.tiles_per_bin_x.max(1)
            || self.grid.tiles_per_bin_y != config.tiles_per_bin_y.max(1)
            || self.buffers.len() != config.buffer_count.max(1)
    }

    /// Refresh per-frame view state without touching tile storage
    pub fn update_view(&mut self, params: &ViewParams, config: &CullingConfig) {
        self.culling_matrix = params.view_projection;
        self.near_clip = params.near_clip;
        self.planes = clip_planes(
            params.projection,
            params.width,
            params.height,
            params.near_clip,
            config.guard_band_pixels,
        );
    }

    pub fn clear(&mut self) {
        self.buffers
            .par_iter_mut()
            .for_each(|buffer| buffer.fill(Tile::cleared()));
        self.has_depth = false;
    }

    /// The merged buffer read by the visibility test
    #[inline]
    pub fn merged(&self) -> &[Tile] {
        &self.buffers[0]
    }

    #[inline]
    pub fn tile(&self, tx: usize, ty: usize) -> &Tile {
        &self.buffers[0][self.grid.tile_index(tx, ty)]
    }
}

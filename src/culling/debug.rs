/// Read-only views of a merged depth buffer
use super::buffer_group::BufferGroup;
use super::{SUB_TILE_WIDTH, TILE_HEIGHT, TILE_WIDTH};

/// Per-pixel reversed depth of buffer 0, row-major `width * height`.
///
/// Uncovered pixels read the cleared value (-1).
pub fn decode_depth(group: &BufferGroup) -> Vec<f32> {
    let grid = &group.grid;
    let width = grid.width as usize;
    let height = grid.height as usize;
    let mut out = vec![0.0; width * height];

    for (y, row) in out.chunks_exact_mut(width).enumerate() {
        let ty = y / TILE_HEIGHT;
        let sub_row = y % TILE_HEIGHT;
        for (x, depth) in row.iter_mut().enumerate() {
            let tile = group.tile(x / TILE_WIDTH, ty);
            let lane = (x % TILE_WIDTH) / SUB_TILE_WIDTH;
            *depth = tile.pixel_depth(lane, sub_row, x % SUB_TILE_WIDTH);
        }
    }
    out
}

/// Fraction of pixels holding rasterized depth
pub fn coverage(group: &BufferGroup) -> f32 {
    let depth = decode_depth(group);
    if depth.is_empty() {
        return 0.0;
    }
    depth.iter().filter(|&&z| z >= 0.0).count() as f32 / depth.len() as f32
}

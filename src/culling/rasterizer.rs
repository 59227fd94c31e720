/// Binning rasterizer for the masked depth buffer
///
/// One job per (buffer, bin). Each job walks the occluders assigned to its
/// buffer, keeps the triangles whose extent touches the bin, and rasterizes
/// them four at a time:
/// 1. SIMD setup: projection to 8-bit fixed point, depth plane, tile bbox
/// 2. per triangle: exact integer edge DDA at pixel-row centers, one
///    32-bit scanline mask per row, transposed into 8x4 sub-tile masks
/// 3. conservative per-sub-tile depth fed to `Tile::update`
///
/// Coverage uses pixel centers. A pixel whose center lies exactly on an edge
/// belongs to the triangle for which that edge is a right edge, and rows are
/// half-open in y, so triangles sharing an edge never leave gaps.
use super::buffer_group::{BufferGroup, ScreenConstants, TileGrid, TileRect};
use super::clip::{ClippedOccluder, ClippedScene};
use super::tile::Tile;
use super::view::Projection;
use super::{BIG_TRIANGLE, FP_BITS, FP_ONE, SUB_TILE_HEIGHT, SUB_TILE_WIDTH, TILE_HEIGHT, TILE_HEIGHT_SHIFT, TILE_WIDTH, TILE_WIDTH_SHIFT};
use crate::perf::CULLING_COUNTERS;
use crate::simd::{F32x4, I32x4, LANES};
use crate::count_call;
use glam::Vec4;
use rayon::prelude::*;

/// Column events are clamped into this range before going SIMD
const COLUMN_LIMIT: i64 = 1 << 24;

/// Shared read-only inputs of every rasterization job of a view
#[derive(Clone, Copy)]
pub struct RasterContext<'a> {
    pub grid: &'a TileGrid,
    pub screen: &'a ScreenConstants,
    pub projection: Projection,
    pub scene: &'a ClippedScene,
}

/// Rasterize the sorted occluders of `scene` into every buffer of `group`.
///
/// Occluders are split into contiguous runs, one per buffer; every buffer is
/// then rasterized bin by bin in parallel.
pub fn rasterize(group: &mut BufferGroup, scene: &ClippedScene) {
    let BufferGroup {
        grid,
        buffers,
        screen,
        projection,
        ..
    } = group;
    let occluders = &scene.occluders;
    if occluders.is_empty() || buffers.is_empty() {
        return;
    }

    let per_buffer = occluders.len().div_ceil(buffers.len());
    let ctx = RasterContext {
        grid,
        screen,
        projection: *projection,
        scene,
    };
    let tiles_per_bin = grid.tiles_per_bin();

    buffers.par_iter_mut().enumerate().for_each(|(b, buffer)| {
        let start = (b * per_buffer).min(occluders.len());
        let end = (start + per_buffer).min(occluders.len());
        let assigned = &occluders[start..end];
        if assigned.is_empty() {
            return;
        }
        buffer
            .par_chunks_mut(tiles_per_bin)
            .enumerate()
            .for_each(|(bin, tiles)| rasterize_bin(&ctx, bin, assigned, tiles));
    });
}

/// Rasterize `occluders` into the tile slice of one bin
pub fn rasterize_bin(ctx: &RasterContext, bin: usize, occluders: &[ClippedOccluder], tiles: &mut [Tile]) {
    let rect = ctx.grid.bin_rect(bin);
    if rect.min_x >= rect.max_x || rect.min_y >= rect.max_y {
        return;
    }

    // Bin rectangle in flipped NDC, padded by a pixel
    let [px0, py0, px1, py1] = rect.pixel_rect(ctx.grid);
    let bounds = Vec4::new(
        ctx.screen.to_ndc_x(px0 as f32 - 1.0),
        ctx.screen.to_ndc_y(py0 as f32 - 1.0),
        ctx.screen.to_ndc_x(px1 as f32 + 1.0),
        ctx.screen.to_ndc_y(py1 as f32 + 1.0),
    );

    let mut raster = BinRasterizer {
        ctx,
        rect,
        tiles,
        batch: TriangleBatch::default(),
    };

    for occluder in occluders {
        if occluder.screen_max.x < bounds.x
            || occluder.screen_min.x > bounds.z
            || occluder.screen_max.y < bounds.y
            || occluder.screen_min.y > bounds.w
        {
            continue;
        }

        let verts = &ctx.scene.vertices[occluder.vertex_offset..occluder.vertex_offset + occluder.vertex_count];
        let extents = &ctx.scene.extents[occluder.extent_offset()..occluder.extent_offset() + occluder.triangle_count()];
        for (tri, extent) in verts.chunks_exact(3).zip(extents) {
            if extent.z < bounds.x || extent.x > bounds.z || extent.w < bounds.y || extent.y > bounds.w {
                continue;
            }
            raster.batch.push([tri[0], tri[1], tri[2]]);
            if raster.batch.is_full() {
                raster.flush();
            }
        }
    }
    raster.flush();
}

/// Up to four triangles in SoA layout, one per SIMD lane
#[derive(Clone, Copy)]
struct TriangleBatch {
    x: [[f32; LANES]; 3],
    y: [[f32; LANES]; 3],
    c: [[f32; LANES]; 3],
    len: usize,
}

impl Default for TriangleBatch {
    fn default() -> Self {
        // Unused lanes stay a degenerate point at c = 1
        Self {
            x: [[0.0; LANES]; 3],
            y: [[0.0; LANES]; 3],
            c: [[1.0; LANES]; 3],
            len: 0,
        }
    }
}

impl TriangleBatch {
    #[inline]
    fn push(&mut self, tri: [glam::Vec3; 3]) {
        let lane = self.len;
        for (v, p) in tri.iter().enumerate() {
            self.x[v][lane] = p.x;
            self.y[v][lane] = p.y;
            self.c[v][lane] = p.z;
        }
        self.len += 1;
    }

    #[inline]
    fn is_full(&self) -> bool {
        self.len == LANES
    }
}

/// One triangle after setup, in pixel space
#[derive(Debug, Clone, Copy)]
struct TriangleSetup {
    /// Fixed-point vertex positions
    fx: [i64; 3],
    fy: [i64; 3],
    /// Depth plane `z = z0 + zdx * x + zdy * y` in pixels
    z0: f32,
    zdx: f32,
    zdy: f32,
    z_min: f32,
    z_max: f32,
    /// Tile bbox clamped to the bin
    tiles: TileRect,
}

struct BinRasterizer<'a, 'b> {
    ctx: &'b RasterContext<'a>,
    rect: TileRect,
    tiles: &'b mut [Tile],
    batch: TriangleBatch,
}

impl BinRasterizer<'_, '_> {
    fn flush(&mut self) {
        let count = self.batch.len;
        if count == 0 {
            return;
        }
        let batch = std::mem::take(&mut self.batch);
        let screen = self.ctx.screen;

        let half_w = F32x4::splat(screen.half_width);
        let half_h = F32x4::splat(screen.half_height);
        let center_x = F32x4::splat(screen.center_x);
        let center_y = F32x4::splat(screen.center_y);
        let fp_one = F32x4::splat(FP_ONE as f32);
        let fp_inv = F32x4::splat(1.0 / FP_ONE as f32);
        let one = F32x4::splat(1.0);

        let mut fx = [I32x4::zero(); 3];
        let mut fy = [I32x4::zero(); 3];
        let mut px = [F32x4::zero(); 3];
        let mut py = [F32x4::zero(); 3];
        let mut z = [F32x4::zero(); 3];

        for v in 0..3 {
            let x = F32x4::from_array(batch.x[v]);
            let y = F32x4::from_array(batch.y[v]);
            let c = F32x4::from_array(batch.c[v]);
            let (ndc_x, ndc_y, depth) = match self.ctx.projection {
                Projection::Perspective => {
                    let inv_w = one / c;
                    (x * inv_w, y * inv_w, inv_w)
                }
                Projection::Orthographic => (x, y, (one - c).max(F32x4::zero())),
            };
            fx[v] = (ndc_x.mul_add(half_w, center_x) * fp_one).to_i32_round();
            fy[v] = (ndc_y.mul_add(half_h, center_y) * fp_one).to_i32_round();
            px[v] = fx[v].to_f32() * fp_inv;
            py[v] = fy[v].to_f32() * fp_inv;
            z[v] = depth;
        }

        // Depth plane through the snapped vertices
        let x1 = px[1] - px[0];
        let x2 = px[2] - px[0];
        let y1 = py[1] - py[0];
        let y2 = py[2] - py[0];
        let a1 = z[1] - z[0];
        let a2 = z[2] - z[0];
        let d = one / (x1 * y2 - y1 * x2);
        let zdx = (a1 * y2 - y1 * a2) * d;
        let zdy = (x1 * a2 - a1 * x2) * d;
        let z0 = z[0] - zdx.mul_add(px[0], zdy * py[0]);
        let z_min = z[0].min(z[1]).min(z[2]);
        let z_max = z[0].max(z[1]).max(z[2]);

        // Conservative tile bbox, clamped to the bin
        let round_up = I32x4::splat(FP_ONE - 1);
        let pix_min_x = fx[0].min(fx[1]).min(fx[2]).shr_arith(FP_BITS);
        let pix_min_y = fy[0].min(fy[1]).min(fy[2]).shr_arith(FP_BITS);
        let pix_max_x = (fx[0].max(fx[1]).max(fx[2]) + round_up).shr_arith(FP_BITS);
        let pix_max_y = (fy[0].max(fy[1]).max(fy[2]) + round_up).shr_arith(FP_BITS);

        let rect = self.rect;
        let tile_min_x = pix_min_x
            .shr_arith(TILE_WIDTH_SHIFT)
            .max(I32x4::splat(rect.min_x as i32));
        let tile_min_y = pix_min_y
            .shr_arith(TILE_HEIGHT_SHIFT)
            .max(I32x4::splat(rect.min_y as i32));
        let tile_max_x = (pix_max_x + I32x4::splat(TILE_WIDTH as i32 - 1))
            .shr_arith(TILE_WIDTH_SHIFT)
            .min(I32x4::splat(rect.max_x as i32));
        let tile_max_y = (pix_max_y + I32x4::splat(TILE_HEIGHT as i32 - 1))
            .shr_arith(TILE_HEIGHT_SHIFT)
            .min(I32x4::splat(rect.max_y as i32));

        // Lanes whose bbox still covers a tile of this bin
        let live = tile_max_x.cmp_gt(tile_min_x) & tile_max_y.cmp_gt(tile_min_y);

        let fx = fx.map(I32x4::to_array);
        let fy = fy.map(I32x4::to_array);
        let (z0, zdx, zdy) = (z0.to_array(), zdx.to_array(), zdy.to_array());
        let (z_min, z_max) = (z_min.to_array(), z_max.to_array());
        let (tmin_x, tmin_y) = (tile_min_x.to_array(), tile_min_y.to_array());
        let (tmax_x, tmax_y) = (tile_max_x.to_array(), tile_max_y.to_array());
        let live = live.to_array();

        for lane in 0..count {
            if live[lane] == 0 {
                continue;
            }
            let setup = TriangleSetup {
                fx: [fx[0][lane] as i64, fx[1][lane] as i64, fx[2][lane] as i64],
                fy: [fy[0][lane] as i64, fy[1][lane] as i64, fy[2][lane] as i64],
                z0: z0[lane],
                zdx: zdx[lane],
                zdy: zdy[lane],
                z_min: z_min[lane],
                z_max: z_max[lane],
                tiles: TileRect {
                    min_x: tmin_x[lane] as usize,
                    min_y: tmin_y[lane] as usize,
                    max_x: tmax_x[lane] as usize,
                    max_y: tmax_y[lane] as usize,
                },
            };
            self.rasterize_triangle(&setup);
        }
    }

    fn rasterize_triangle(&mut self, tri: &TriangleSetup) {
        // Winding-preserving rotation so vertex 0 is the topmost
        let top_index = (0..3)
            .min_by_key(|&i| tri.fy[i])
            .unwrap_or(0);
        let vertex = |i: usize| (tri.fx[(top_index + i) % 3], tri.fy[(top_index + i) % 3]);
        let top = vertex(0);
        let (mid, bot) = if vertex(1).1 <= vertex(2).1 {
            (vertex(1), vertex(2))
        } else {
            (vertex(2), vertex(1))
        };

        let cross = (mid.0 - top.0) * (bot.1 - top.1) - (mid.1 - top.1) * (bot.0 - top.0);
        if cross == 0 {
            return;
        }
        count_call!(CULLING_COUNTERS.triangles_rasterized);
        // Middle vertex right of the long edge: long edge bounds the left side
        let mid_right = cross > 0;

        let first_row = (tri.tiles.min_y * TILE_HEIGHT) as i64;
        let mut long = EdgeWalker::new(top, bot, first_row);
        let mut upper = EdgeWalker::new(top, mid, first_row);
        let mut lower = EdgeWalker::new(mid, bot, first_row);

        let row_min = first_covered_row(top.1);
        let row_mid = first_covered_row(mid.1);
        let row_end = first_covered_row(bot.1);

        let big = (tri.tiles.max_x - tri.tiles.min_x) as i32 > BIG_TRIANGLE;
        let z_min = F32x4::splat(tri.z_min);
        let z_max = F32x4::splat(tri.z_max);
        // Farthest depth over an 8x4 sub-tile relative to its top-left corner
        let corner_bias = (tri.zdx * SUB_TILE_WIDTH as f32).min(0.0) + (tri.zdy * SUB_TILE_HEIGHT as f32).min(0.0);
        let lane_step = tri.zdx * SUB_TILE_WIDTH as f32;
        let lane_offsets = F32x4::new(0.0, lane_step, 2.0 * lane_step, 3.0 * lane_step);

        for ty in tri.tiles.min_y..tri.tiles.max_y {
            let row0 = (ty * TILE_HEIGHT) as i64;

            let mut left = [-COLUMN_LIMIT; LANES];
            let mut right = [COLUMN_LIMIT; LANES];
            let mut apply = |edge: &Option<EdgeWalker>, is_left: bool| {
                if let Some(edge) = edge {
                    let cols = edge.columns();
                    for l in 0..LANES {
                        if is_left {
                            left[l] = left[l].max(cols[l]);
                        } else {
                            right[l] = right[l].min(cols[l]);
                        }
                    }
                }
            };
            apply(&long, mid_right);
            if row0 < row_mid {
                apply(&upper, !mid_right);
            }
            if row0 + TILE_HEIGHT as i64 > row_mid {
                apply(&lower, !mid_right);
            }

            let mut valid = [0i32; LANES];
            let mut span: Option<(i64, i64)> = None;
            for l in 0..LANES {
                let row = row0 + l as i64;
                if row >= row_min && row < row_end && left[l] < right[l] {
                    valid[l] = -1;
                    span = Some(match span {
                        None => (left[l], right[l]),
                        Some((lo, hi)) => (lo.min(left[l]), hi.max(right[l])),
                    });
                }
            }

            if let Some((span_lo, span_hi)) = span {
                let (tx_start, tx_end) = if big {
                    let lo = (span_lo.max(0) >> TILE_WIDTH_SHIFT) as usize;
                    let hi = ((span_hi.max(0) + TILE_WIDTH as i64 - 1) >> TILE_WIDTH_SHIFT) as usize;
                    (lo.max(tri.tiles.min_x), hi.min(tri.tiles.max_x))
                } else {
                    (tri.tiles.min_x, tri.tiles.max_x)
                };

                let row_mask = I32x4::from_array(valid);
                let left_v = I32x4::from_array(left.map(clamp_column));
                let right_v = I32x4::from_array(right.map(clamp_column));
                let z_row = tri.z0 + tri.zdy * (ty * TILE_HEIGHT) as f32 + corner_bias;

                for tx in tx_start..tx_end {
                    self.update_tile(tx, ty, row_mask, left_v, right_v, z_row, tri.zdx, lane_offsets, z_min, z_max);
                }
            }

            for edge in [&mut long, &mut upper, &mut lower].into_iter().flatten() {
                edge.step();
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    #[inline]
    fn update_tile(
        &mut self,
        tx: usize,
        ty: usize,
        row_mask: I32x4,
        left: I32x4,
        right: I32x4,
        z_row: f32,
        zdx: f32,
        lane_offsets: F32x4,
        z_min: F32x4,
        z_max: F32x4,
    ) {
        count_call!(CULLING_COUNTERS.tiles_traversed);
        let tile = &mut self.tiles[self.ctx.grid.local_index(tx, ty)];
        if !z_max.cmp_ge(tile.effective_min()).any() {
            return;
        }

        let x0 = I32x4::splat((tx * TILE_WIDTH) as i32);
        let scanlines = (left - x0).sllv_ones().and_not((right - x0).sllv_ones()) & row_mask;
        let coverage = scanlines.transpose_bytes();
        if coverage.is_zero() {
            return;
        }

        let z_tile = z_row + zdx * (tx * TILE_WIDTH) as f32;
        let z = (F32x4::splat(z_tile) + lane_offsets).max(z_min).min(z_max);
        if tile.update(coverage, z) {
            count_call!(CULLING_COUNTERS.tiles_updated);
        }
    }
}

/// First pixel row whose center `r * 256 + 128` is at or below fixed-point `y`
#[inline]
fn first_covered_row(y: i64) -> i64 {
    (y - FP_ONE as i64 / 2 + FP_ONE as i64 - 1) >> FP_BITS
}

#[inline]
fn clamp_column(c: i64) -> i32 {
    c.clamp(-COLUMN_LIMIT, COLUMN_LIMIT) as i32
}

/// Exact fixed-point edge walk, one lane per pixel row of a tile row.
///
/// The crossing `x0 + (yc - y0) * dx / dy` is tracked as quotient plus
/// remainder, so stepping a whole tile row never accumulates rounding error.
#[derive(Debug, Clone, Copy)]
struct EdgeWalker {
    x: [i64; LANES],
    rem: [i64; LANES],
    step_q: i64,
    step_r: i64,
    dy: i64,
}

impl EdgeWalker {
    /// Edge from `top` down to `bot`; `None` for horizontal edges
    fn new(top: (i64, i64), bot: (i64, i64), first_row: i64) -> Option<Self> {
        let dy = bot.1 - top.1;
        if dy <= 0 {
            return None;
        }
        let dx = bot.0 - top.0;
        let mut x = [0i64; LANES];
        let mut rem = [0i64; LANES];
        for l in 0..LANES {
            let yc = (first_row + l as i64) * FP_ONE as i64 + FP_ONE as i64 / 2;
            let num = (yc - top.1) * dx;
            x[l] = top.0 + num.div_euclid(dy);
            rem[l] = num.rem_euclid(dy);
        }
        let tile_num = (TILE_HEIGHT as i64 * FP_ONE as i64) * dx;
        Some(Self {
            x,
            rem,
            step_q: tile_num.div_euclid(dy),
            step_r: tile_num.rem_euclid(dy),
            dy,
        })
    }

    /// Advance one tile row (four pixel rows)
    #[inline]
    fn step(&mut self) {
        for l in 0..LANES {
            self.x[l] += self.step_q;
            self.rem[l] += self.step_r;
            if self.rem[l] >= self.dy {
                self.x[l] += 1;
                self.rem[l] -= self.dy;
            }
        }
    }

    /// First pixel column whose center lies strictly right of the edge
    #[inline]
    fn columns(&self) -> [i64; LANES] {
        self.x.map(|e| ((e - FP_ONE as i64 / 2) >> FP_BITS) + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::culling::clip::ClippedOccluder;
    use crate::culling::tile::CLEARED_DEPTH;
    use crate::culling::view::{ViewKey, ViewParams};
    use crate::config::CullingConfig;
    use glam::{Mat4, Vec3};

    fn group(width: u32, height: u32, projection: Projection) -> BufferGroup {
        let params = ViewParams {
            key: ViewKey::new(0),
            view_projection: Mat4::IDENTITY,
            near_clip: 0.1,
            projection,
            width,
            height,
        };
        BufferGroup::new(&params, &CullingConfig::single_buffer())
    }

    /// Scene of already-clipped triangles stored as `(x, -y, c)`
    fn scene(projection: Projection, tris: &[[Vec3; 3]]) -> ClippedScene {
        let mut s = ClippedScene::default();
        let mut lo = Vec3::splat(f32::MAX);
        let mut hi = Vec3::splat(f32::MIN);
        for tri in tris {
            let mut tlo = Vec3::splat(f32::MAX);
            let mut thi = Vec3::splat(f32::MIN);
            for v in tri {
                let p = match projection {
                    Projection::Perspective => Vec3::new(v.x / v.z, v.y / v.z, v.z),
                    Projection::Orthographic => *v,
                };
                tlo = tlo.min(p);
                thi = thi.max(p);
                s.vertices.push(*v);
            }
            s.extents.push(Vec4::new(tlo.x, tlo.y, thi.x, thi.y));
            lo = lo.min(tlo);
            hi = hi.max(thi);
        }
        s.occluders.push(ClippedOccluder {
            vertex_offset: 0,
            vertex_count: tris.len() * 3,
            screen_min: lo,
            screen_max: hi,
        });
        s
    }

    fn fullscreen_quad(w: f32) -> [[Vec3; 3]; 2] {
        let a = Vec3::new(-w, -w, w);
        let b = Vec3::new(w, -w, w);
        let c = Vec3::new(w, w, w);
        let d = Vec3::new(-w, w, w);
        [[a, b, c], [a, c, d]]
    }

    #[test]
    fn edge_walker_matches_direct_division() {
        let top = (37 * 256 + 91, 5 * 256 + 17);
        let bot = (-3 * 256 + 200, 61 * 256 + 3);
        let mut walker = EdgeWalker::new(top, bot, 4).unwrap();
        for tile_row in 0..12 {
            for l in 0..LANES {
                let yc = (4 + tile_row * 4 + l as i64) * 256 + 128;
                let expected = top.0 + ((yc - top.1) * (bot.0 - top.0)).div_euclid(bot.1 - top.1);
                assert_eq!(walker.x[l], expected, "tile row {tile_row} lane {l}");
            }
            walker.step();
        }
        assert!(EdgeWalker::new(top, (0, top.1), 0).is_none(), "horizontal edge");
    }

    #[test]
    fn fullscreen_quad_covers_every_tile() {
        let mut g = group(128, 64, Projection::Perspective);
        let s = scene(Projection::Perspective, &fullscreen_quad(1.0));
        rasterize(&mut g, &s);

        for ty in 0..g.grid.tiles_y {
            for tx in 0..g.grid.tiles_x {
                let min = g.tile(tx, ty).effective_min().to_array();
                for (lane, z) in min.iter().enumerate() {
                    assert!((z - 1.0).abs() < 1e-5, "tile ({tx},{ty}) lane {lane} has depth {z}");
                }
            }
        }
    }

    #[test]
    fn shared_diagonal_leaves_no_gaps() {
        // Quad at an awkward depth so the diagonal crosses pixel centers unevenly
        let mut g = group(96, 48, Projection::Perspective);
        let s = scene(Projection::Perspective, &fullscreen_quad(3.7));
        rasterize(&mut g, &s);
        for ty in 0..g.grid.tiles_y {
            for tx in 0..g.grid.tiles_x {
                let tile = g.tile(tx, ty);
                for lane in 0..LANES {
                    for row in 0..4 {
                        for col in 0..8 {
                            let z = tile.pixel_depth(lane, row, col);
                            assert!(z > 0.0, "pixel gap at tile ({tx},{ty}) lane {lane} row {row} col {col}");
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn small_triangle_touches_only_its_tiles() {
        let mut g = group(128, 64, Projection::Orthographic);
        // Triangle inside the top-left tile (pixels 0..32, rows 0..4)
        let to_ndc = |px: f32, py: f32| Vec3::new(px / 64.0 - 1.0, py / 32.0 - 1.0, 0.25);
        let tri = [to_ndc(2.0, 0.5), to_ndc(20.0, 0.5), to_ndc(2.0, 3.5)];
        let s = scene(Projection::Orthographic, &[tri]);
        // Orthographic: vertices are used as-is, depth is 1 - c
        rasterize(&mut g, &s);

        let first = g.tile(0, 0);
        assert!(first.pixel_depth(0, 1, 4) > 0.7, "inside pixel must be covered");
        assert_eq!(first.pixel_depth(3, 0, 7), CLEARED_DEPTH, "pixel x=31 is outside");
        for ty in 0..g.grid.tiles_y {
            for tx in 0..g.grid.tiles_x {
                if (tx, ty) != (0, 0) {
                    assert!(g.tile(tx, ty).is_cleared(), "tile ({tx},{ty}) was touched");
                }
            }
        }
    }

    #[test]
    fn farther_occluder_does_not_overwrite_nearer() {
        let mut g = group(64, 32, Projection::Perspective);
        let mut s = scene(Projection::Perspective, &fullscreen_quad(1.0));
        let far = scene(Projection::Perspective, &fullscreen_quad(4.0));
        let offset = s.vertices.len();
        s.vertices.extend_from_slice(&far.vertices);
        s.extents.extend_from_slice(&far.extents);
        s.occluders.push(ClippedOccluder {
            vertex_offset: offset,
            ..far.occluders[0]
        });
        rasterize(&mut g, &s);

        let min = g.tile(1, 3).effective_min().to_array();
        assert!(min.iter().all(|z| (z - 1.0).abs() < 1e-5), "got {min:?}");
    }

    #[test]
    fn column_rule_splits_shared_vertical_edge() {
        // Two triangles meeting on the line x = 10.5 px
        let mut g = group(64, 32, Projection::Orthographic);
        let p = |px: f32, py: f32| Vec3::new(px / 32.0 - 1.0, py / 16.0 - 1.0, 0.5);
        let left = [p(0.0, 0.0), p(10.5, 0.0), p(10.5, 4.0)];
        let right = [p(10.5, 0.0), p(20.0, 0.0), p(10.5, 4.0)];
        let s = scene(Projection::Orthographic, &[left, right]);
        rasterize(&mut g, &s);
        let tile = g.tile(0, 0);
        // Pixel 10 has its center on the shared edge
        assert!(tile.pixel_depth(1, 0, 2) > 0.0);
        assert!(tile.pixel_depth(1, 1, 2) > 0.0);
    }
}

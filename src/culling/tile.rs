/// Masked hierarchical depth tile
///
/// A tile covers 32x4 pixels, split into four 8x4 sub-tiles, one per SIMD lane.
/// Each lane stores two depth layers plus a 32-bit coverage mask: byte `r` of the
/// mask is pixel row `r` of the sub-tile, bit `c` of that byte is column `c`.
/// A pixel reads `z_min[0]` when its bit is clear and `z_min[1]` when set.
///
/// Depth is reversed (larger is nearer), so every depth test is "greater passes".
use crate::simd::{F32x4, I32x4};

/// Layer 0 value of a tile nothing has been rasterized into
pub const CLEARED_DEPTH: f32 = -1.0;

#[derive(Copy, Clone, Debug)]
#[repr(C, align(16))]
pub struct Tile {
    pub z_min: [F32x4; 2],
    pub mask: I32x4,
}

impl Default for Tile {
    #[inline]
    fn default() -> Self {
        Self::cleared()
    }
}

impl Tile {
    #[inline]
    pub fn cleared() -> Self {
        Self {
            z_min: [F32x4::splat(CLEARED_DEPTH), F32x4::zero()],
            mask: I32x4::zero(),
        }
    }

    /// Still in the cleared sentinel state in every lane
    #[inline]
    pub fn is_cleared(&self) -> bool {
        self.mask.is_zero() && self.z_min[0].movemask() == 0xF
    }

    /// Lanes whose layer 0 holds rasterized depth
    #[inline]
    pub fn covered_lanes(&self) -> I32x4 {
        self.z_min[0].cmp_ge(F32x4::zero())
    }

    /// Conservative per-lane minimum over the layers actually referenced by the mask
    #[inline]
    pub fn effective_min(&self) -> F32x4 {
        let [z0, z1] = self.z_min;
        let full = self.mask.cmp_eq(I32x4::splat(!0));
        let empty = self.mask.cmp_eq(I32x4::zero());
        let layer0 = F32x4::blendv(z0, z1, full);
        let layer1 = F32x4::blendv(z1, z0, empty);
        layer0.min(layer1)
    }

    /// Per-pixel depth at sub-tile `lane`, row `row`, column `col`
    #[inline]
    pub fn pixel_depth(&self, lane: usize, row: usize, col: usize) -> f32 {
        let bit = (self.mask.lane(lane) as u32 >> (row * 8 + col)) & 1;
        self.z_min[bit as usize].lane(lane)
    }

    /// Merge an incoming coverage mask at conservative depth `z_tri` into the tile.
    ///
    /// Pixels failing the depth test are dropped first. The survivors either
    /// overwrite a layer they fully cover or merge into the layer at minimum
    /// distance (`c01`/`c02`/`c12` sign pattern); merges always land in layer 0.
    /// Returns false when no pixel passed and the tile was left untouched.
    #[inline]
    pub fn update(&mut self, coverage: I32x4, z_tri: F32x4) -> bool {
        let [z_min0, z_min1] = self.z_min;
        let mask = self.mask;

        let sign0 = (z_min0 - z_tri).to_bits().shr_arith(31);
        let sign1 = (z_min1 - z_tri).to_bits().shr_arith(31);
        let tri_mask = coverage & (sign0.and_not(mask) | (mask & sign1));

        let t0 = tri_mask.cmp_eq(I32x4::zero());
        if t0.all() {
            return false;
        }

        let z_tri = F32x4::blendv(z_tri, z_min0, t0);

        // Does the triangle cover every pixel of layer 0 / layer 1?
        let layer_mask0 = (!mask).and_not(tri_mask);
        let layer_mask1 = mask.and_not(tri_mask);
        let lm0 = layer_mask0.cmp_eq(I32x4::zero());
        let lm1 = layer_mask1.cmp_eq(I32x4::zero());
        let z0 = F32x4::blendv(z_min0, z_tri, lm0);
        let z1 = F32x4::blendv(z_min1, z_tri, lm1);

        let d0 = (z0 - z_tri).abs();
        let d1 = (z1 - z_tri).abs();
        let d2 = (z0 - z1).abs();

        let c01 = (d0 - d1).to_bits();
        let c02 = (d0 - d2).to_bits();
        let c12 = (d1 - d2).to_bits();

        // d0min: triangle lands in layer 0. d1min: layer 1 is swapped into 0 first.
        let d0min = (c01 & c02) | lm0 | t0;
        let d1min = (c12 | lm1).and_not(d0min);

        let inner = I32x4::blendv(tri_mask, layer_mask1, d0min);
        self.mask = I32x4::blendv(inner, layer_mask0, d1min);

        let e0 = F32x4::blendv(z0, z1, d1min);
        let e1 = F32x4::blendv(z1, z_tri, d1min | d0min);
        self.z_min[0] = e0.min(e1);

        let z1t = F32x4::blendv(z_tri, z1, d0min);
        self.z_min[1] = F32x4::blendv(z1t, z0, d1min);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: i32 = !0;

    #[test]
    fn cleared_tile_is_farther_than_everything() {
        let tile = Tile::cleared();
        assert!(tile.is_cleared());
        assert_eq!(tile.effective_min().to_array(), [CLEARED_DEPTH; 4]);
        assert_eq!(tile.covered_lanes().movemask(), 0);
    }

    #[test]
    fn full_coverage_overwrites_both_layers() {
        let mut tile = Tile::cleared();
        assert!(tile.update(I32x4::splat(FULL), F32x4::splat(0.5)));
        assert_eq!(tile.z_min[0].to_array(), [0.5; 4]);
        assert_eq!(tile.mask.to_array(), [0; 4]);
        assert_eq!(tile.effective_min().to_array(), [0.5; 4]);
        assert!(!tile.is_cleared());
    }

    #[test]
    fn partial_coverage_keeps_cleared_pixels_in_layer_one() {
        let m = 0x0000_FFFF;
        let mut tile = Tile::cleared();
        tile.update(I32x4::splat(m), F32x4::splat(1.0));

        assert_eq!(tile.z_min[0].to_array(), [1.0; 4]);
        assert_eq!(tile.z_min[1].to_array(), [CLEARED_DEPTH; 4]);
        assert_eq!(tile.mask.to_array(), [!m; 4]);
        assert_eq!(tile.pixel_depth(0, 0, 0), 1.0, "covered pixel reads layer 0");
        assert_eq!(tile.pixel_depth(0, 3, 7), CLEARED_DEPTH, "uncovered pixel reads layer 1");
        assert_eq!(tile.effective_min().to_array(), [CLEARED_DEPTH; 4]);
    }

    #[test]
    fn farther_triangle_is_rejected() {
        let mut tile = Tile::cleared();
        tile.update(I32x4::splat(FULL), F32x4::splat(0.5));
        let before = tile;
        assert!(!tile.update(I32x4::splat(FULL), F32x4::splat(0.25)));
        assert_eq!(tile.z_min[0].to_array(), before.z_min[0].to_array());
        assert_eq!(tile.mask.to_array(), before.mask.to_array());
    }

    #[test]
    fn nearer_full_coverage_raises_minimum() {
        let mut tile = Tile::cleared();
        tile.update(I32x4::splat(FULL), F32x4::splat(0.5));
        tile.update(I32x4::splat(FULL), F32x4::splat(0.75));
        assert_eq!(tile.effective_min().to_array(), [0.75; 4]);
    }

    #[test]
    fn complementary_halves_close_the_tile() {
        let m = 0x0F0F_0F0F;
        let mut tile = Tile::cleared();
        tile.update(I32x4::splat(m), F32x4::splat(0.5));
        tile.update(I32x4::splat(!m), F32x4::splat(0.8));

        let min = tile.effective_min().to_array();
        for (lane, z) in min.iter().enumerate() {
            assert!(*z >= 0.5 - 1e-6, "lane {lane}: min {z} lost the farther half");
            assert!(*z <= 0.5 + 1e-6, "lane {lane}: min {z} claims more than the farther half");
        }
    }

    #[test]
    fn lanes_update_independently() {
        let mut tile = Tile::cleared();
        tile.update(I32x4::new(FULL, 0, FULL, 0), F32x4::splat(0.3));
        let min = tile.effective_min().to_array();
        assert_eq!(min, [0.3, CLEARED_DEPTH, 0.3, CLEARED_DEPTH]);
    }
}

/// 4-wide SIMD primitives used by the rasterizer and the tile buffer
///
/// One interface, three implementations:
/// - SSE2 on x86_64 (always available, no runtime detection)
/// - NEON on aarch64
/// - scalar arrays everywhere else
///
/// Callers only see `F32x4` / `I32x4` and never branch on the instruction set.
/// Masks follow the x86 convention: a lane is "set" when its sign bit is set,
/// comparisons produce all-ones / all-zeros lanes.

#[cfg(target_arch = "x86_64")]
mod x86;
#[cfg(target_arch = "x86_64")]
pub use x86::{F32x4, I32x4};

#[cfg(target_arch = "aarch64")]
mod neon;
#[cfg(target_arch = "aarch64")]
pub use neon::{F32x4, I32x4};

// Always built so the native backends can be checked against it
#[cfg_attr(any(target_arch = "x86_64", target_arch = "aarch64"), allow(dead_code))]
pub(crate) mod scalar;
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
pub use scalar::{F32x4, I32x4};

/// Lanes per vector
pub const LANES: usize = 4;

impl F32x4 {
    #[inline(always)]
    pub fn lane(self, i: usize) -> f32 {
        self.to_array()[i]
    }
}

impl I32x4 {
    #[inline(always)]
    pub fn lane(self, i: usize) -> i32 {
        self.to_array()[i]
    }

    /// `!0 << s` per lane, with `s` clamped to `[0, 32]` (32 yields 0)
    #[inline]
    pub fn sllv_ones(self) -> Self {
        Self::from_array(self.to_array().map(|s| {
            let s = s.clamp(0, 32) as u32;
            (!0u32).checked_shl(s).unwrap_or(0) as i32
        }))
    }

    /// 4x4 byte transpose: byte `k` of lane `r` moves to byte `r` of lane `k`.
    ///
    /// Turns four 32-pixel scanline masks into four 8x4 sub-tile masks.
    #[inline]
    pub fn transpose_bytes(self) -> Self {
        let rows = self.to_array().map(i32::to_le_bytes);
        let mut out = [[0u8; 4]; 4];
        for (r, row) in rows.iter().enumerate() {
            for (k, &byte) in row.iter().enumerate() {
                out[k][r] = byte;
            }
        }
        Self::from_array(out.map(i32::from_le_bytes))
    }

    /// True when any lane has its sign bit set
    #[inline(always)]
    pub fn any(self) -> bool {
        self.movemask() != 0
    }

    /// True when every lane has its sign bit set
    #[inline(always)]
    pub fn all(self) -> bool {
        self.movemask() == 0xF
    }
}

#[cfg(test)]
mod tests {
    use super::scalar;
    use super::*;

    fn f(a: [f32; 4]) -> (F32x4, scalar::F32x4) {
        (F32x4::from_array(a), scalar::F32x4::from_array(a))
    }

    fn i(a: [i32; 4]) -> (I32x4, scalar::I32x4) {
        (I32x4::from_array(a), scalar::I32x4::from_array(a))
    }

    #[test]
    fn native_float_ops_match_scalar() {
        let (a, sa) = f([1.5, -2.0, 0.25, -0.0]);
        let (b, sb) = f([0.5, 3.0, -0.25, 7.0]);
        let (c, sc) = f([-1.0, 1.0, 2.0, 0.5]);

        assert_eq!((a + b).to_array(), (sa + sb).to_array());
        assert_eq!((a - b).to_array(), (sa - sb).to_array());
        assert_eq!((a * b).to_array(), (sa * sb).to_array());
        assert_eq!((a / b).to_array(), (sa / sb).to_array());
        assert_eq!(a.mul_add(b, c).to_array(), sa.mul_add(sb, sc).to_array());
        assert_eq!(a.min(b).to_array(), sa.min(sb).to_array());
        assert_eq!(a.max(b).to_array(), sa.max(sb).to_array());
        assert_eq!(a.abs().to_array(), sa.abs().to_array());
        assert_eq!(a.cmp_ge(b).to_array(), sa.cmp_ge(sb).to_array());
        assert_eq!(a.cmp_lt(b).to_array(), sa.cmp_lt(sb).to_array());
        assert_eq!(a.movemask(), sa.movemask(), "sign of -0.0 must count");
    }

    #[test]
    fn native_rounding_matches_scalar() {
        let (a, sa) = f([0.5, 1.5, -2.5, 255.75]);
        assert_eq!(a.to_i32_round().to_array(), sa.to_i32_round().to_array());
        assert_eq!(a.to_i32_round().to_array(), [0, 2, -2, 256], "ties round to even");
        assert_eq!(a.to_i32_trunc().to_array(), [0, 1, -2, 255]);
    }

    #[test]
    fn native_int_ops_match_scalar() {
        let (a, sa) = i([-7, 12, i32::MIN, 1 << 20]);
        let (b, sb) = i([3, 12, -1, -5]);

        assert_eq!((a & b).to_array(), (sa & sb).to_array());
        assert_eq!((a | b).to_array(), (sa | sb).to_array());
        assert_eq!((a ^ b).to_array(), (sa ^ sb).to_array());
        assert_eq!((!a).to_array(), (!sa).to_array());
        assert_eq!(a.and_not(b).to_array(), sa.and_not(sb).to_array());
        assert_eq!(a.min(b).to_array(), sa.min(sb).to_array());
        assert_eq!(a.max(b).to_array(), sa.max(sb).to_array());
        assert_eq!(a.cmp_eq(b).to_array(), sa.cmp_eq(sb).to_array());
        assert_eq!(a.cmp_gt(b).to_array(), sa.cmp_gt(sb).to_array());
        for n in [0, 1, 5, 31] {
            assert_eq!(a.shl(n).to_array(), sa.shl(n).to_array(), "shl {n}");
            assert_eq!(a.shr_arith(n).to_array(), sa.shr_arith(n).to_array(), "sra {n}");
            assert_eq!(a.shr_logical(n).to_array(), sa.shr_logical(n).to_array(), "srl {n}");
        }
        assert_eq!(a.movemask(), sa.movemask());
        assert_eq!(a.to_f32().to_array(), sa.to_f32().to_array());
    }

    #[test]
    fn blend_reads_only_sign_bit() {
        let a = F32x4::splat(1.0);
        let b = F32x4::splat(2.0);
        let mask = I32x4::new(-1, 1, i32::MIN, 0x7FFF_FFFF);
        assert_eq!(F32x4::blendv(a, b, mask).to_array(), [2.0, 1.0, 2.0, 1.0]);

        let ia = I32x4::splat(10);
        let ib = I32x4::splat(20);
        assert_eq!(I32x4::blendv(ia, ib, mask).to_array(), [20, 10, 20, 10]);
    }

    #[test]
    fn sllv_ones_clamps_shift() {
        let s = I32x4::new(-3, 0, 8, 32).sllv_ones();
        assert_eq!(s.to_array(), [-1, -1, (!0u32 << 8) as i32, 0]);
        assert!(I32x4::zero().is_zero());
        assert!(!I32x4::new(0, 0, 0, 1).is_zero());
    }

    #[test]
    fn transpose_moves_bytes_between_lanes() {
        let m = I32x4::new(0x0403_0201, 0x0807_0605, 0x0C0B_0A09, 0x100F_0E0D);
        let t = m.transpose_bytes();
        assert_eq!(
            t.to_array(),
            [0x0D09_0501, 0x0E0A_0602, 0x0F0B_0703, 0x100C_0804]
        );
        assert_eq!(t.transpose_bytes().to_array(), m.to_array(), "transpose is an involution");
    }
}

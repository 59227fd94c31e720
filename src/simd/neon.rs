/// NEON backend (aarch64 baseline)
use core::arch::aarch64::*;
use core::fmt::{Debug, Formatter};
use core::ops::{Add, BitAnd, BitOr, BitXor, Div, Mul, Not, Sub};

#[derive(Copy, Clone)]
#[repr(transparent)]
pub struct F32x4(float32x4_t);

#[derive(Copy, Clone)]
#[repr(transparent)]
pub struct I32x4(int32x4_t);

impl Debug for F32x4 {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "F32x4({:?})", self.to_array())
    }
}

impl Debug for I32x4 {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "I32x4({:?})", self.to_array())
    }
}

impl Default for F32x4 {
    #[inline(always)]
    fn default() -> Self {
        Self::zero()
    }
}

impl Default for I32x4 {
    #[inline(always)]
    fn default() -> Self {
        Self::zero()
    }
}

/// Sign bit broadcast to a full-lane select mask
#[inline(always)]
fn select_mask(mask: I32x4) -> uint32x4_t {
    unsafe { vreinterpretq_u32_s32(vshrq_n_s32::<31>(mask.0)) }
}

impl F32x4 {
    #[inline(always)]
    pub fn zero() -> Self {
        Self::splat(0.0)
    }

    #[inline(always)]
    pub fn splat(v: f32) -> Self {
        unsafe { Self(vdupq_n_f32(v)) }
    }

    #[inline(always)]
    pub fn new(a: f32, b: f32, c: f32, d: f32) -> Self {
        Self::from_array([a, b, c, d])
    }

    #[inline(always)]
    pub fn from_array(a: [f32; 4]) -> Self {
        unsafe { Self(vld1q_f32(a.as_ptr())) }
    }

    #[inline(always)]
    pub fn to_array(self) -> [f32; 4] {
        let mut out = [0.0f32; 4];
        unsafe { vst1q_f32(out.as_mut_ptr(), self.0) };
        out
    }

    /// `self * b + c`, not fused
    #[inline(always)]
    pub fn mul_add(self, b: Self, c: Self) -> Self {
        unsafe { Self(vmlaq_f32(c.0, self.0, b.0)) }
    }

    #[inline(always)]
    pub fn min(self, rhs: Self) -> Self {
        unsafe { Self(vminq_f32(self.0, rhs.0)) }
    }

    #[inline(always)]
    pub fn max(self, rhs: Self) -> Self {
        unsafe { Self(vmaxq_f32(self.0, rhs.0)) }
    }

    #[inline(always)]
    pub fn abs(self) -> Self {
        unsafe { Self(vabsq_f32(self.0)) }
    }

    #[inline(always)]
    pub fn cmp_ge(self, rhs: Self) -> I32x4 {
        unsafe { I32x4(vreinterpretq_s32_u32(vcgeq_f32(self.0, rhs.0))) }
    }

    #[inline(always)]
    pub fn cmp_gt(self, rhs: Self) -> I32x4 {
        unsafe { I32x4(vreinterpretq_s32_u32(vcgtq_f32(self.0, rhs.0))) }
    }

    #[inline(always)]
    pub fn cmp_lt(self, rhs: Self) -> I32x4 {
        unsafe { I32x4(vreinterpretq_s32_u32(vcltq_f32(self.0, rhs.0))) }
    }

    #[inline(always)]
    pub fn cmp_le(self, rhs: Self) -> I32x4 {
        unsafe { I32x4(vreinterpretq_s32_u32(vcleq_f32(self.0, rhs.0))) }
    }

    /// Lane-wise `mask < 0 ? b : a`; only the sign bit of `mask` is read
    #[inline(always)]
    pub fn blendv(a: Self, b: Self, mask: I32x4) -> Self {
        unsafe { Self(vbslq_f32(select_mask(mask), b.0, a.0)) }
    }

    #[inline(always)]
    pub fn to_bits(self) -> I32x4 {
        unsafe { I32x4(vreinterpretq_s32_f32(self.0)) }
    }

    #[inline(always)]
    pub fn from_bits(bits: I32x4) -> Self {
        unsafe { Self(vreinterpretq_f32_s32(bits.0)) }
    }

    /// Round to nearest, ties to even
    #[inline(always)]
    pub fn to_i32_round(self) -> I32x4 {
        unsafe { I32x4(vcvtnq_s32_f32(self.0)) }
    }

    #[inline(always)]
    pub fn to_i32_trunc(self) -> I32x4 {
        unsafe { I32x4(vcvtq_s32_f32(self.0)) }
    }

    #[inline(always)]
    pub fn movemask(self) -> u32 {
        self.to_bits().movemask()
    }
}

impl Add for F32x4 {
    type Output = Self;
    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        unsafe { Self(vaddq_f32(self.0, rhs.0)) }
    }
}

impl Sub for F32x4 {
    type Output = Self;
    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        unsafe { Self(vsubq_f32(self.0, rhs.0)) }
    }
}

impl Mul for F32x4 {
    type Output = Self;
    #[inline(always)]
    fn mul(self, rhs: Self) -> Self {
        unsafe { Self(vmulq_f32(self.0, rhs.0)) }
    }
}

impl Div for F32x4 {
    type Output = Self;
    #[inline(always)]
    fn div(self, rhs: Self) -> Self {
        unsafe { Self(vdivq_f32(self.0, rhs.0)) }
    }
}

impl I32x4 {
    #[inline(always)]
    pub fn zero() -> Self {
        Self::splat(0)
    }

    #[inline(always)]
    pub fn splat(v: i32) -> Self {
        unsafe { Self(vdupq_n_s32(v)) }
    }

    #[inline(always)]
    pub fn new(a: i32, b: i32, c: i32, d: i32) -> Self {
        Self::from_array([a, b, c, d])
    }

    #[inline(always)]
    pub fn from_array(a: [i32; 4]) -> Self {
        unsafe { Self(vld1q_s32(a.as_ptr())) }
    }

    #[inline(always)]
    pub fn to_array(self) -> [i32; 4] {
        let mut out = [0i32; 4];
        unsafe { vst1q_s32(out.as_mut_ptr(), self.0) };
        out
    }

    /// `self & !rhs`
    #[inline(always)]
    pub fn and_not(self, rhs: Self) -> Self {
        unsafe { Self(vbicq_s32(self.0, rhs.0)) }
    }

    #[inline(always)]
    pub fn shl(self, count: u32) -> Self {
        unsafe { Self(vshlq_s32(self.0, vdupq_n_s32(count as i32))) }
    }

    // NEON shifts right with a negative left-shift count
    #[inline(always)]
    pub fn shr_arith(self, count: u32) -> Self {
        unsafe { Self(vshlq_s32(self.0, vdupq_n_s32(-(count as i32)))) }
    }

    #[inline(always)]
    pub fn shr_logical(self, count: u32) -> Self {
        unsafe {
            let v = vshlq_u32(vreinterpretq_u32_s32(self.0), vdupq_n_s32(-(count as i32)));
            Self(vreinterpretq_s32_u32(v))
        }
    }

    #[inline(always)]
    pub fn cmp_eq(self, rhs: Self) -> Self {
        unsafe { Self(vreinterpretq_s32_u32(vceqq_s32(self.0, rhs.0))) }
    }

    #[inline(always)]
    pub fn cmp_gt(self, rhs: Self) -> Self {
        unsafe { Self(vreinterpretq_s32_u32(vcgtq_s32(self.0, rhs.0))) }
    }

    #[inline(always)]
    pub fn min(self, rhs: Self) -> Self {
        unsafe { Self(vminq_s32(self.0, rhs.0)) }
    }

    #[inline(always)]
    pub fn max(self, rhs: Self) -> Self {
        unsafe { Self(vmaxq_s32(self.0, rhs.0)) }
    }

    /// Lane-wise `mask < 0 ? b : a`
    #[inline(always)]
    pub fn blendv(a: Self, b: Self, mask: Self) -> Self {
        unsafe { Self(vbslq_s32(select_mask(mask), b.0, a.0)) }
    }

    #[inline(always)]
    pub fn to_f32(self) -> F32x4 {
        unsafe { F32x4(vcvtq_f32_s32(self.0)) }
    }

    #[inline(always)]
    pub fn movemask(self) -> u32 {
        unsafe {
            let signs = vshrq_n_u32::<31>(vreinterpretq_u32_s32(self.0));
            let weights = vld1q_u32([1u32, 2, 4, 8].as_ptr());
            vaddvq_u32(vmulq_u32(signs, weights))
        }
    }

    #[inline(always)]
    pub fn is_zero(self) -> bool {
        unsafe { vmaxvq_u32(vreinterpretq_u32_s32(self.0)) == 0 }
    }
}

impl Add for I32x4 {
    type Output = Self;
    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        unsafe { Self(vaddq_s32(self.0, rhs.0)) }
    }
}

impl Sub for I32x4 {
    type Output = Self;
    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        unsafe { Self(vsubq_s32(self.0, rhs.0)) }
    }
}

impl BitAnd for I32x4 {
    type Output = Self;
    #[inline(always)]
    fn bitand(self, rhs: Self) -> Self {
        unsafe { Self(vandq_s32(self.0, rhs.0)) }
    }
}

impl BitOr for I32x4 {
    type Output = Self;
    #[inline(always)]
    fn bitor(self, rhs: Self) -> Self {
        unsafe { Self(vorrq_s32(self.0, rhs.0)) }
    }
}

impl BitXor for I32x4 {
    type Output = Self;
    #[inline(always)]
    fn bitxor(self, rhs: Self) -> Self {
        unsafe { Self(veorq_s32(self.0, rhs.0)) }
    }
}

impl Not for I32x4 {
    type Output = Self;
    #[inline(always)]
    fn not(self) -> Self {
        unsafe { Self(vmvnq_s32(self.0)) }
    }
}

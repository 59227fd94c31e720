/// SSE2 backend (x86_64 baseline, no runtime detection needed)
use core::arch::x86_64::*;
use core::fmt::{Debug, Formatter};
use core::ops::{Add, BitAnd, BitOr, BitXor, Div, Mul, Not, Sub};

/// 4 lanes of f32 in an `__m128`
#[derive(Copy, Clone)]
#[repr(transparent)]
pub struct F32x4(__m128);

/// 4 lanes of i32 in an `__m128i`
#[derive(Copy, Clone)]
#[repr(transparent)]
pub struct I32x4(__m128i);

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

impl F32x4 {
    #[inline(always)]
    pub fn zero() -> Self {
        unsafe { Self(_mm_setzero_ps()) }
    }

    #[inline(always)]
    pub fn splat(v: f32) -> Self {
        unsafe { Self(_mm_set1_ps(v)) }
    }

    #[inline(always)]
    pub fn new(a: f32, b: f32, c: f32, d: f32) -> Self {
        unsafe { Self(_mm_setr_ps(a, b, c, d)) }
    }

    #[inline(always)]
    pub fn from_array(a: [f32; 4]) -> Self {
        unsafe { Self(_mm_loadu_ps(a.as_ptr())) }
    }

    #[inline(always)]
    pub fn to_array(self) -> [f32; 4] {
        let mut out = [0.0f32; 4];
        unsafe { _mm_storeu_ps(out.as_mut_ptr(), self.0) };
        out
    }

    /// `self * b + c`, not fused
    #[inline(always)]
    pub fn mul_add(self, b: Self, c: Self) -> Self {
        unsafe { Self(_mm_add_ps(_mm_mul_ps(self.0, b.0), c.0)) }
    }

    #[inline(always)]
    pub fn min(self, rhs: Self) -> Self {
        unsafe { Self(_mm_min_ps(self.0, rhs.0)) }
    }

    #[inline(always)]
    pub fn max(self, rhs: Self) -> Self {
        unsafe { Self(_mm_max_ps(self.0, rhs.0)) }
    }

    #[inline(always)]
    pub fn abs(self) -> Self {
        unsafe {
            let sign = _mm_castsi128_ps(_mm_set1_epi32(i32::MIN));
            Self(_mm_andnot_ps(sign, self.0))
        }
    }

    #[inline(always)]
    pub fn cmp_ge(self, rhs: Self) -> I32x4 {
        unsafe { I32x4(_mm_castps_si128(_mm_cmpge_ps(self.0, rhs.0))) }
    }

    #[inline(always)]
    pub fn cmp_gt(self, rhs: Self) -> I32x4 {
        unsafe { I32x4(_mm_castps_si128(_mm_cmpgt_ps(self.0, rhs.0))) }
    }

    #[inline(always)]
    pub fn cmp_lt(self, rhs: Self) -> I32x4 {
        unsafe { I32x4(_mm_castps_si128(_mm_cmplt_ps(self.0, rhs.0))) }
    }

    #[inline(always)]
    pub fn cmp_le(self, rhs: Self) -> I32x4 {
        unsafe { I32x4(_mm_castps_si128(_mm_cmple_ps(self.0, rhs.0))) }
    }

    /// Lane-wise `mask < 0 ? b : a`; only the sign bit of `mask` is read
    #[inline(always)]
    pub fn blendv(a: Self, b: Self, mask: I32x4) -> Self {
        unsafe {
            let m = _mm_castsi128_ps(_mm_srai_epi32(mask.0, 31));
            Self(_mm_or_ps(_mm_and_ps(m, b.0), _mm_andnot_ps(m, a.0)))
        }
    }

    #[inline(always)]
    pub fn to_bits(self) -> I32x4 {
        unsafe { I32x4(_mm_castps_si128(self.0)) }
    }

    #[inline(always)]
    pub fn from_bits(bits: I32x4) -> Self {
        unsafe { Self(_mm_castsi128_ps(bits.0)) }
    }

    /// Round to nearest, ties to even
    #[inline(always)]
    pub fn to_i32_round(self) -> I32x4 {
        unsafe { I32x4(_mm_cvtps_epi32(self.0)) }
    }

    #[inline(always)]
    pub fn to_i32_trunc(self) -> I32x4 {
        unsafe { I32x4(_mm_cvttps_epi32(self.0)) }
    }

    /// One bit per lane, taken from the sign bit
    #[inline(always)]
    pub fn movemask(self) -> u32 {
        unsafe { _mm_movemask_ps(self.0) as u32 }
    }
}

impl Add for F32x4 {
    type Output = Self;
    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        unsafe { Self(_mm_add_ps(self.0, rhs.0)) }
    }
}

impl Sub for F32x4 {
    type Output = Self;
    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        unsafe { Self(_mm_sub_ps(self.0, rhs.0)) }
    }
}

impl Mul for F32x4 {
    type Output = Self;
    #[inline(always)]
    fn mul(self, rhs: Self) -> Self {
        unsafe { Self(_mm_mul_ps(self.0, rhs.0)) }
    }
}

impl Div for F32x4 {
    type Output = Self;
    #[inline(always)]
    fn div(self, rhs: Self) -> Self {
        unsafe { Self(_mm_div_ps(self.0, rhs.0)) }
    }
}

impl I32x4 {
    #[inline(always)]
    pub fn zero() -> Self {
        unsafe { Self(_mm_setzero_si128()) }
    }

    #[inline(always)]
    pub fn splat(v: i32) -> Self {
        unsafe { Self(_mm_set1_epi32(v)) }
    }

    #[inline(always)]
    pub fn new(a: i32, b: i32, c: i32, d: i32) -> Self {
        unsafe { Self(_mm_setr_epi32(a, b, c, d)) }
    }

    #[inline(always)]
    pub fn from_array(a: [i32; 4]) -> Self {
        unsafe { Self(_mm_loadu_si128(a.as_ptr() as *const __m128i)) }
    }

    #[inline(always)]
    pub fn to_array(self) -> [i32; 4] {
        let mut out = [0i32; 4];
        unsafe { _mm_storeu_si128(out.as_mut_ptr() as *mut __m128i, self.0) };
        out
    }

    /// `self & !rhs`
    #[inline(always)]
    pub fn and_not(self, rhs: Self) -> Self {
        unsafe { Self(_mm_andnot_si128(rhs.0, self.0)) }
    }

    #[inline(always)]
    pub fn shl(self, count: u32) -> Self {
        unsafe { Self(_mm_sll_epi32(self.0, _mm_cvtsi32_si128(count as i32))) }
    }

    #[inline(always)]
    pub fn shr_arith(self, count: u32) -> Self {
        unsafe { Self(_mm_sra_epi32(self.0, _mm_cvtsi32_si128(count as i32))) }
    }

    #[inline(always)]
    pub fn shr_logical(self, count: u32) -> Self {
        unsafe { Self(_mm_srl_epi32(self.0, _mm_cvtsi32_si128(count as i32))) }
    }

    #[inline(always)]
    pub fn cmp_eq(self, rhs: Self) -> Self {
        unsafe { Self(_mm_cmpeq_epi32(self.0, rhs.0)) }
    }

    #[inline(always)]
    pub fn cmp_gt(self, rhs: Self) -> Self {
        unsafe { Self(_mm_cmpgt_epi32(self.0, rhs.0)) }
    }

    // SSE2 has no packed 32-bit min/max
    #[inline(always)]
    pub fn min(self, rhs: Self) -> Self {
        Self::blendv(self, rhs, self.cmp_gt(rhs))
    }

    #[inline(always)]
    pub fn max(self, rhs: Self) -> Self {
        Self::blendv(rhs, self, self.cmp_gt(rhs))
    }

    /// Lane-wise `mask < 0 ? b : a`
    #[inline(always)]
    pub fn blendv(a: Self, b: Self, mask: Self) -> Self {
        unsafe {
            let m = _mm_srai_epi32(mask.0, 31);
            Self(_mm_or_si128(_mm_and_si128(m, b.0), _mm_andnot_si128(m, a.0)))
        }
    }

    #[inline(always)]
    pub fn to_f32(self) -> F32x4 {
        unsafe { F32x4(_mm_cvtepi32_ps(self.0)) }
    }

    #[inline(always)]
    pub fn movemask(self) -> u32 {
        unsafe { _mm_movemask_ps(_mm_castsi128_ps(self.0)) as u32 }
    }

    #[inline(always)]
    pub fn is_zero(self) -> bool {
        unsafe { _mm_movemask_epi8(_mm_cmpeq_epi32(self.0, _mm_setzero_si128())) == 0xFFFF }
    }
}

impl Add for I32x4 {
    type Output = Self;
    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        unsafe { Self(_mm_add_epi32(self.0, rhs.0)) }
    }
}

impl Sub for I32x4 {
    type Output = Self;
    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        unsafe { Self(_mm_sub_epi32(self.0, rhs.0)) }
    }
}

impl BitAnd for I32x4 {
    type Output = Self;
    #[inline(always)]
    fn bitand(self, rhs: Self) -> Self {
        unsafe { Self(_mm_and_si128(self.0, rhs.0)) }
    }
}

impl BitOr for I32x4 {
    type Output = Self;
    #[inline(always)]
    fn bitor(self, rhs: Self) -> Self {
        unsafe { Self(_mm_or_si128(self.0, rhs.0)) }
    }
}

impl BitXor for I32x4 {
    type Output = Self;
    #[inline(always)]
    fn bitxor(self, rhs: Self) -> Self {
        unsafe { Self(_mm_xor_si128(self.0, rhs.0)) }
    }
}

impl Not for I32x4 {
    type Output = Self;
    #[inline(always)]
    fn not(self) -> Self {
        unsafe { Self(_mm_xor_si128(self.0, _mm_set1_epi32(-1))) }
    }
}

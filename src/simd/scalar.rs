/// Portable scalar backend with the same lane semantics as the SIMD ones
use core::ops::{Add, BitAnd, BitOr, BitXor, Div, Mul, Not, Sub};

#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[repr(C, align(16))]
pub struct F32x4([f32; 4]);

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[repr(C, align(16))]
pub struct I32x4([i32; 4]);

#[inline(always)]
fn map_f(a: [f32; 4], f: impl Fn(f32) -> f32) -> [f32; 4] {
    [f(a[0]), f(a[1]), f(a[2]), f(a[3])]
}

#[inline(always)]
fn zip_f(a: [f32; 4], b: [f32; 4], f: impl Fn(f32, f32) -> f32) -> [f32; 4] {
    [f(a[0], b[0]), f(a[1], b[1]), f(a[2], b[2]), f(a[3], b[3])]
}

#[inline(always)]
fn map_i(a: [i32; 4], f: impl Fn(i32) -> i32) -> [i32; 4] {
    [f(a[0]), f(a[1]), f(a[2]), f(a[3])]
}

#[inline(always)]
fn zip_i(a: [i32; 4], b: [i32; 4], f: impl Fn(i32, i32) -> i32) -> [i32; 4] {
    [f(a[0], b[0]), f(a[1], b[1]), f(a[2], b[2]), f(a[3], b[3])]
}

#[inline(always)]
fn lane_mask(b: bool) -> i32 {
    if b {
        -1
    } else {
        0
    }
}

#[inline(always)]
fn cmp_f(a: [f32; 4], b: [f32; 4], f: impl Fn(f32, f32) -> bool) -> I32x4 {
    I32x4([
        lane_mask(f(a[0], b[0])),
        lane_mask(f(a[1], b[1])),
        lane_mask(f(a[2], b[2])),
        lane_mask(f(a[3], b[3])),
    ])
}

impl F32x4 {
    #[inline(always)]
    pub fn zero() -> Self {
        Self([0.0; 4])
    }

    #[inline(always)]
    pub fn splat(v: f32) -> Self {
        Self([v; 4])
    }

    #[inline(always)]
    pub fn new(a: f32, b: f32, c: f32, d: f32) -> Self {
        Self([a, b, c, d])
    }

    #[inline(always)]
    pub fn from_array(a: [f32; 4]) -> Self {
        Self(a)
    }

    #[inline(always)]
    pub fn to_array(self) -> [f32; 4] {
        self.0
    }

    #[inline(always)]
    pub fn mul_add(self, b: Self, c: Self) -> Self {
        self * b + c
    }

    // Same operand order as minps/maxps: the second operand wins on NaN
    #[inline(always)]
    pub fn min(self, rhs: Self) -> Self {
        Self(zip_f(self.0, rhs.0, |a, b| if a < b { a } else { b }))
    }

    #[inline(always)]
    pub fn max(self, rhs: Self) -> Self {
        Self(zip_f(self.0, rhs.0, |a, b| if a > b { a } else { b }))
    }

    #[inline(always)]
    pub fn abs(self) -> Self {
        Self(map_f(self.0, f32::abs))
    }

    #[inline(always)]
    pub fn cmp_ge(self, rhs: Self) -> I32x4 {
        cmp_f(self.0, rhs.0, |a, b| a >= b)
    }

    #[inline(always)]
    pub fn cmp_gt(self, rhs: Self) -> I32x4 {
        cmp_f(self.0, rhs.0, |a, b| a > b)
    }

    #[inline(always)]
    pub fn cmp_lt(self, rhs: Self) -> I32x4 {
        cmp_f(self.0, rhs.0, |a, b| a < b)
    }

    #[inline(always)]
    pub fn cmp_le(self, rhs: Self) -> I32x4 {
        cmp_f(self.0, rhs.0, |a, b| a <= b)
    }

    #[inline(always)]
    pub fn blendv(a: Self, b: Self, mask: I32x4) -> Self {
        Self::from_bits(I32x4::blendv(a.to_bits(), b.to_bits(), mask))
    }

    #[inline(always)]
    pub fn to_bits(self) -> I32x4 {
        I32x4(self.0.map(|v| v.to_bits() as i32))
    }

    #[inline(always)]
    pub fn from_bits(bits: I32x4) -> Self {
        Self(bits.0.map(|v| f32::from_bits(v as u32)))
    }

    #[inline(always)]
    pub fn to_i32_round(self) -> I32x4 {
        I32x4(self.0.map(|v| v.round_ties_even() as i32))
    }

    #[inline(always)]
    pub fn to_i32_trunc(self) -> I32x4 {
        I32x4(self.0.map(|v| v as i32))
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
        Self(zip_f(self.0, rhs.0, |a, b| a + b))
    }
}

impl Sub for F32x4 {
    type Output = Self;
    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        Self(zip_f(self.0, rhs.0, |a, b| a - b))
    }
}

impl Mul for F32x4 {
    type Output = Self;
    #[inline(always)]
    fn mul(self, rhs: Self) -> Self {
        Self(zip_f(self.0, rhs.0, |a, b| a * b))
    }
}

impl Div for F32x4 {
    type Output = Self;
    #[inline(always)]
    fn div(self, rhs: Self) -> Self {
        Self(zip_f(self.0, rhs.0, |a, b| a / b))
    }
}

impl I32x4 {
    #[inline(always)]
    pub fn zero() -> Self {
        Self([0; 4])
    }

    #[inline(always)]
    pub fn splat(v: i32) -> Self {
        Self([v; 4])
    }

    #[inline(always)]
    pub fn new(a: i32, b: i32, c: i32, d: i32) -> Self {
        Self([a, b, c, d])
    }

    #[inline(always)]
    pub fn from_array(a: [i32; 4]) -> Self {
        Self(a)
    }

    #[inline(always)]
    pub fn to_array(self) -> [i32; 4] {
        self.0
    }

    #[inline(always)]
    pub fn and_not(self, rhs: Self) -> Self {
        Self(zip_i(self.0, rhs.0, |a, b| a & !b))
    }

    #[inline(always)]
    pub fn shl(self, count: u32) -> Self {
        Self(map_i(self.0, |a| if count >= 32 { 0 } else { a << count }))
    }

    #[inline(always)]
    pub fn shr_arith(self, count: u32) -> Self {
        Self(map_i(self.0, |a| a >> count.min(31)))
    }

    #[inline(always)]
    pub fn shr_logical(self, count: u32) -> Self {
        Self(map_i(self.0, |a| {
            if count >= 32 {
                0
            } else {
                ((a as u32) >> count) as i32
            }
        }))
    }

    #[inline(always)]
    pub fn cmp_eq(self, rhs: Self) -> Self {
        Self(zip_i(self.0, rhs.0, |a, b| lane_mask(a == b)))
    }

    #[inline(always)]
    pub fn cmp_gt(self, rhs: Self) -> Self {
        Self(zip_i(self.0, rhs.0, |a, b| lane_mask(a > b)))
    }

    #[inline(always)]
    pub fn min(self, rhs: Self) -> Self {
        Self(zip_i(self.0, rhs.0, i32::min))
    }

    #[inline(always)]
    pub fn max(self, rhs: Self) -> Self {
        Self(zip_i(self.0, rhs.0, i32::max))
    }

    #[inline(always)]
    pub fn blendv(a: Self, b: Self, mask: Self) -> Self {
        let m = mask.0;
        Self([
            if m[0] < 0 { b.0[0] } else { a.0[0] },
            if m[1] < 0 { b.0[1] } else { a.0[1] },
            if m[2] < 0 { b.0[2] } else { a.0[2] },
            if m[3] < 0 { b.0[3] } else { a.0[3] },
        ])
    }

    #[inline(always)]
    pub fn to_f32(self) -> F32x4 {
        F32x4(self.0.map(|v| v as f32))
    }

    #[inline(always)]
    pub fn movemask(self) -> u32 {
        self.0
            .iter()
            .enumerate()
            .fold(0, |acc, (i, &v)| acc | (((v as u32) >> 31) << i))
    }

    #[inline(always)]
    pub fn is_zero(self) -> bool {
        self.0 == [0; 4]
    }
}

impl Add for I32x4 {
    type Output = Self;
    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        Self(zip_i(self.0, rhs.0, i32::wrapping_add))
    }
}

impl Sub for I32x4 {
    type Output = Self;
    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        Self(zip_i(self.0, rhs.0, i32::wrapping_sub))
    }
}

impl BitAnd for I32x4 {
    type Output = Self;
    #[inline(always)]
    fn bitand(self, rhs: Self) -> Self {
        Self(zip_i(self.0, rhs.0, |a, b| a & b))
    }
}

impl BitOr for I32x4 {
    type Output = Self;
    #[inline(always)]
    fn bitor(self, rhs: Self) -> Self {
        Self(zip_i(self.0, rhs.0, |a, b| a | b))
    }
}

impl BitXor for I32x4 {
    type Output = Self;
    #[inline(always)]
    fn bitxor(self, rhs: Self) -> Self {
        Self(zip_i(self.0, rhs.0, |a, b| a ^ b))
    }
}

impl Not for I32x4 {
    type Output = Self;
    #[inline(always)]
    fn not(self) -> Self {
        Self(map_i(self.0, |a| !a))
    }
}

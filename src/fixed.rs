//! Fixed-point arithmetic
//!
//! Every radix used by the demo gets its own newtype so a Q15 tilt value can
//! never be added to a Q16.16 velocity by accident:
//! - `Q8`: perspective interpolation factors (256 = 1.0)
//! - `Q14`: unit vectors and shading terms (16384 = 1.0)
//! - `Q15`: normalized accelerometer response (32768 = 1.0, saturates at 32767)
//! - `Q16`: positions (px), velocities (px/s), time (s), z-scale (65536 = 1.0)
//!
//! Multiplication truncates with an arithmetic shift, matching the integer
//! pipeline the tuning constants were chosen against.

use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

macro_rules! fixed_type {
    ($(#[$meta:meta])* $name:ident, $frac:expr) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i32);

        impl $name {
            /// Number of fractional bits
            pub const FRAC_BITS: u32 = $frac;
            pub const ONE: Self = Self(1 << $frac);
            pub const ZERO: Self = Self(0);

            #[inline]
            pub const fn from_int(v: i32) -> Self {
                Self(v << $frac)
            }

            /// Integer part, rounded toward negative infinity
            #[inline]
            pub const fn to_int(self) -> i32 {
                self.0 >> $frac
            }

            /// `num / den` in this radix. `den` must be non-zero.
            #[inline]
            pub const fn from_ratio(num: i32, den: i32) -> Self {
                Self((((num as i64) << $frac) / den as i64) as i32)
            }

            #[inline]
            pub const fn mul(self, rhs: Self) -> Self {
                Self(((self.0 as i64 * rhs.0 as i64) >> $frac) as i32)
            }

            /// Multiply by a plain integer without changing radix
            #[inline]
            pub const fn scale(self, k: i32) -> Self {
                Self((self.0 as i64 * k as i64) as i32)
            }

            #[inline]
            pub fn clamp(self, lo: Self, hi: Self) -> Self {
                Self(self.0.clamp(lo.0, hi.0))
            }

            #[inline]
            pub fn abs(self) -> Self {
                Self(self.0.abs())
            }

            /// Lossy conversion for logs and tests
            #[inline]
            pub fn to_f32(self) -> f32 {
                self.0 as f32 / (1i64 << $frac) as f32
            }

            /// Nearest representable value, for values resolved before the hot loop
            #[inline]
            pub fn from_f32(v: f32) -> Self {
                Self((v * (1i64 << $frac) as f32).round() as i32)
            }
        }

        impl Add for $name {
            type Output = Self;
            #[inline]
            fn add(self, rhs: Self) -> Self {
                Self(self.0.wrapping_add(rhs.0))
            }
        }

        impl Sub for $name {
            type Output = Self;
            #[inline]
            fn sub(self, rhs: Self) -> Self {
                Self(self.0.wrapping_sub(rhs.0))
            }
        }

        impl Neg for $name {
            type Output = Self;
            #[inline]
            fn neg(self) -> Self {
                Self(self.0.wrapping_neg())
            }
        }

        impl AddAssign for $name {
            #[inline]
            fn add_assign(&mut self, rhs: Self) {
                *self = *self + rhs;
            }
        }

        impl SubAssign for $name {
            #[inline]
            fn sub_assign(&mut self, rhs: Self) {
                *self = *self - rhs;
            }
        }
    };
}

fixed_type!(
    /// Q8 fixed point (8 fractional bits)
    Q8,
    8
);
fixed_type!(
    /// Q14 fixed point (14 fractional bits), used for normals and shading
    Q14,
    14
);
fixed_type!(
    /// Q15 fixed point (15 fractional bits), nominally within [-1, 1)
    Q15,
    15
);
fixed_type!(
    /// Q16.16 fixed point
    Q16,
    16
);

impl Q15 {
    /// Largest representable magnitude (just under 1.0)
    pub const MAX: Self = Self(32767);

    /// Saturate to [-MAX, MAX]
    #[inline]
    pub fn saturate(self) -> Self {
        Self(clamp_sym(self.0, Self::MAX.0))
    }

    /// Widen to Q16.16
    #[inline]
    pub const fn to_q16(self) -> Q16 {
        Q16(self.0 << 1)
    }
}

impl Q16 {
    /// Narrow to Q15 (drops one bit of precision)
    #[inline]
    pub const fn to_q15(self) -> Q15 {
        Q15(self.0 >> 1)
    }
}

impl Q14 {
    /// Widen to Q16.16
    #[inline]
    pub const fn to_q16(self) -> Q16 {
        Q16(self.0 << 2)
    }
}

/// Symmetric clamp to [-lim, lim]
#[inline]
pub fn clamp_sym(v: i32, lim: i32) -> i32 {
    v.clamp(-lim, lim)
}

/// Floor integer square root (digit-by-digit, no division)
pub fn isqrt_u32(x: u32) -> u32 {
    let mut op = x;
    let mut res: u32 = 0;
    let mut one: u32 = 1 << 30;
    while one > op {
        one >>= 2;
    }
    while one != 0 {
        if op >= res + one {
            op -= res + one;
            res += 2 * one;
        }
        res >>= 1;
        one >>= 2;
    }
    res
}

/// Sine in Q14 for 0..=90 degrees in 64 steps
static SIN_Q14_QUARTER: [i16; 65] = [
    0, 402, 804, 1205, 1606, 2006, 2404, 2801, 3196, 3590, 3981, 4370, 4756, 5139, 5520, 5897,
    6270, 6639, 7005, 7366, 7723, 8076, 8423, 8765, 9102, 9434, 9760, 10080, 10394, 10702, 11003,
    11297, 11585, 11866, 12140, 12406, 12665, 12916, 13160, 13395, 13623, 13842, 14053, 14256,
    14449, 14635, 14811, 14978, 15137, 15286, 15426, 15557, 15679, 15791, 15893, 15986, 16069,
    16143, 16207, 16261, 16305, 16340, 16364, 16379, 16384,
];

/// Sine and cosine of an 8-bit angle (256 steps per turn), both Q14
pub fn sincos_q14(angle: u8) -> (Q14, Q14) {
    let quadrant = angle >> 6;
    let off = (angle & 63) as usize;
    let a = SIN_Q14_QUARTER[off] as i32;
    let b = SIN_Q14_QUARTER[64 - off] as i32;
    let (s, c) = match quadrant {
        0 => (a, b),
        1 => (b, -a),
        2 => (-a, -b),
        _ => (-b, a),
    };
    (Q14(s), Q14(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isqrt_floor() {
        for x in [0u32, 1, 2, 3, 4, 15, 16, 17, 1155, 1156, 65535, 1 << 20, u32::MAX] {
            let r = isqrt_u32(x) as u64;
            assert!(r * r <= x as u64, "isqrt({x}) = {r} too large");
            assert!((r + 1) * (r + 1) > x as u64, "isqrt({x}) = {r} too small");
        }
    }

    #[test]
    fn test_sincos_cardinal_angles() {
        assert_eq!(sincos_q14(0), (Q14(0), Q14(16384)));
        assert_eq!(sincos_q14(64), (Q14(16384), Q14(0)));
        assert_eq!(sincos_q14(128), (Q14(0), Q14(-16384)));
        assert_eq!(sincos_q14(192), (Q14(-16384), Q14(0)));
    }

    #[test]
    fn test_sincos_unit_length() {
        for a in 0..=255u8 {
            let (s, c) = sincos_q14(a);
            let len2 = s.0 as i64 * s.0 as i64 + c.0 as i64 * c.0 as i64;
            let one = 16384i64 * 16384;
            assert!((len2 - one).abs() < one / 500, "angle {a} off unit circle");
        }
    }

    #[test]
    fn test_radix_conversions() {
        assert_eq!(Q15::ONE.to_q16(), Q16::ONE);
        assert_eq!(Q16::ONE.to_q15(), Q15::ONE);
        assert_eq!(Q14::ONE.to_q16(), Q16::ONE);
        assert_eq!(Q16::from_int(3).to_int(), 3);
        assert_eq!(Q16::from_int(-3).to_int(), -3);
        assert_eq!(Q16::from_ratio(1, 120), Q16(546));
    }

    #[test]
    fn test_mul_truncates_toward_negative_infinity() {
        let half = Q16(1 << 15);
        assert_eq!(Q16(3).mul(half), Q16(1));
        assert_eq!(Q16(-3).mul(half), Q16(-2));
    }

    #[test]
    fn test_q15_saturate() {
        assert_eq!(Q15(40000).saturate(), Q15::MAX);
        assert_eq!(Q15(-40000).saturate(), Q15(-32767));
        assert_eq!(Q15(123).saturate(), Q15(123));
    }
}

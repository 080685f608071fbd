//! 8-bit floating point numbers.
//!
//! ```text
//!   7   6 5 4   3 2 1 0
//! +---+-------+---------+
//! | s |  exp  |  mant   |
//! +---+-------+---------+
//! ```
//!
//! The exponent is biased by 3 and the mantissa has an implicit leading one.
//! `0x00` is zero; there are no infinities, NaNs or subnormals.
//!
//! Arithmetic goes through a signed fixed point form in which every value is
//! scaled by `2^7`, so addition is a plain integer add. Results are truncated,
//! never rounded.

use std::fmt;

use crate::memory::Byte;

pub const SIGN_MASK: Byte = 0b1000_0000;
pub const EXPONENT_MASK: Byte = 0b0111_0000;
pub const MANTISSA_MASK: Byte = 0b0000_1111;
pub const EXPONENT_BIAS: i32 = 3;

const IMPLICIT_ONE: i32 = 0b1_0000;
/// Fractional headroom of the fixed point form
const FIXED_SHIFT: u32 = 3;
/// Leading bit of a normalized fixed point magnitude
const NORMAL_BIT: i32 = 1 << 11;
/// Shifts needed to normalize the smallest encodable magnitude
const MAX_NORMALIZE_SHIFT: u32 = 7;

/// A packed 8-bit float
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Minifloat(pub Byte);

impl Minifloat {
    pub const ZERO: Self = Self(0);
    /// Largest finite magnitude, `31`
    pub const MAX: Self = Self(0x7F);

    pub fn bits(self) -> Byte {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(self) -> bool {
        self.0 & SIGN_MASK != 0
    }

    /// Unbiased exponent
    pub fn exponent(self) -> i32 {
        ((self.0 & EXPONENT_MASK) >> 4) as i32 - EXPONENT_BIAS
    }

    /// Stored mantissa bits, without the implicit one
    pub fn mantissa(self) -> Byte {
        self.0 & MANTISSA_MASK
    }

    /// Converts to the signed fixed point form
    pub fn widen(self) -> i32 {
        if self.is_zero() {
            return 0;
        }

        let significand = (self.mantissa() as i32 | IMPLICIT_ONE) << FIXED_SHIFT;
        let exponent = self.exponent();
        let magnitude = if exponent > 0 {
            significand << exponent
        } else {
            significand >> -exponent
        };

        if self.is_negative() {
            -magnitude
        } else {
            magnitude
        }
    }

    /// Converts from the signed fixed point form, truncating low bits.
    /// Magnitudes too small to encode become zero, magnitudes too large
    /// saturate to [`Minifloat::MAX`] with the sign kept.
    pub fn narrow(value: i32) -> Self {
        if value == 0 {
            return Self::ZERO;
        }

        let sign = if value < 0 { SIGN_MASK } else { 0 };
        let mut magnitude = value.unsigned_abs();

        if magnitude >= (NORMAL_BIT as u32) << 1 {
            return Self(sign | Self::MAX.0);
        }

        let mut shifts = 0;
        while magnitude & NORMAL_BIT as u32 == 0 {
            magnitude <<= 1;
            shifts += 1;
        }
        if shifts > MAX_NORMALIZE_SHIFT {
            return Self::ZERO;
        }

        magnitude = (magnitude << 1) >> 8;
        let exponent = ((MAX_NORMALIZE_SHIFT - shifts) as Byte) << 4;
        Self(sign | exponent | (magnitude as Byte & MANTISSA_MASK))
    }

    /// Adds two minifloats. Zero operands are returned as is; everything
    /// else is summed in fixed point and narrowed again.
    pub fn add(self, other: Self) -> Self {
        match (self.is_zero(), other.is_zero()) {
            (true, _) => other,
            (_, true) => self,
            _ => Self::narrow(self.widen() + other.widen()),
        }
    }

    /// Exact value as a host float
    pub fn to_f32(self) -> f32 {
        self.widen() as f32 / (1 << 7) as f32
    }
}

impl std::ops::Add for Minifloat {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Minifloat::add(self, other)
    }
}

impl From<Byte> for Minifloat {
    fn from(bits: Byte) -> Self {
        Self(bits)
    }
}

impl From<Minifloat> for Byte {
    fn from(value: Minifloat) -> Self {
        value.0
    }
}

impl fmt::Display for Minifloat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f32())
    }
}

/// Adds two raw minifloat bytes
pub fn add(a: Byte, b: Byte) -> Byte {
    Minifloat(a).add(Minifloat(b)).0
}

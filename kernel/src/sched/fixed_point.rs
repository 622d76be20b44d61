//! Fixed-point 17.14
//!
//! Знаковое 32-битное число, 14 дробных бит. Нужна только MLFQS.
//! Signed 32-bit value with 14 fraction bits. Used only by MLFQS.
//!
//! Умножение и деление расширяются до 64 бит.
//! Multiplication and division widen to 64 bits.

use core::fmt;
use core::ops::{Add, Div, Mul, Neg, Sub};

const FRACTION_BITS: u32 = 14;
const F: i32 = 1 << FRACTION_BITS;

/// Предел модуля целого, которое можно представить / Largest representable integer magnitude
const INT_LIMIT: i32 = 1 << (31 - FRACTION_BITS);

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Fixed(i32);

impl Fixed {
    pub const ZERO: Fixed = Fixed(0);
    pub const ONE: Fixed = Fixed(F);

    /// Паника, если `|n| >= 131072`.
    /// Panics if `|n| >= 131072`.
    pub const fn from_int(n: i32) -> Fixed {
        assert!(n < INT_LIMIT && n > -INT_LIMIT, "fixed point: integer out of range");
        Fixed(n * F)
    }

    pub const fn from_raw(raw: i32) -> Fixed {
        Fixed(raw)
    }

    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Отбросить дробь (к нулю) / Drop the fraction (toward zero)
    pub const fn trunc(self) -> i32 {
        self.0 / F
    }

    /// К ближайшему, половины от нуля / To nearest, halves away from zero
    pub const fn round(self) -> i32 {
        if self.0 >= 0 {
            (self.0 + F / 2) / F
        } else {
            (self.0 - F / 2) / F
        }
    }

    pub const fn add_int(self, n: i32) -> Fixed {
        Fixed(self.0 + n * F)
    }

    /// Произведение считается в 64 битах и насыщается на границах i32.
    /// The product is taken in 64 bits and saturates at the i32 bounds.
    pub const fn mul_int(self, n: i32) -> Fixed {
        Fixed(saturate(self.0 as i64 * n as i64))
    }

    /// `round(self * n)` целиком в 64 битах, для вывода вида `× 100`.
    /// `round(self * n)` done entirely in 64 bits, for `× 100` style reports.
    pub const fn round_scaled(self, n: i32) -> i32 {
        let scaled = self.0 as i64 * n as i64;
        let half = (F / 2) as i64;
        let rounded = if scaled >= 0 {
            (scaled + half) / F as i64
        } else {
            (scaled - half) / F as i64
        };
        saturate(rounded)
    }

    pub const fn div_int(self, n: i32) -> Fixed {
        Fixed(self.0 / n)
    }
}

const fn saturate(v: i64) -> i32 {
    if v > i32::MAX as i64 {
        i32::MAX
    } else if v < i32::MIN as i64 {
        i32::MIN
    } else {
        v as i32
    }
}

impl Add for Fixed {
    type Output = Fixed;
    fn add(self, rhs: Fixed) -> Fixed {
        Fixed(self.0 + rhs.0)
    }
}

impl Sub for Fixed {
    type Output = Fixed;
    fn sub(self, rhs: Fixed) -> Fixed {
        Fixed(self.0 - rhs.0)
    }
}

impl Neg for Fixed {
    type Output = Fixed;
    fn neg(self) -> Fixed {
        Fixed(-self.0)
    }
}

impl Mul for Fixed {
    type Output = Fixed;
    fn mul(self, rhs: Fixed) -> Fixed {
        Fixed((self.0 as i64 * rhs.0 as i64 / F as i64) as i32)
    }
}

impl Div for Fixed {
    type Output = Fixed;
    fn div(self, rhs: Fixed) -> Fixed {
        Fixed((self.0 as i64 * F as i64 / rhs.0 as i64) as i32)
    }
}

impl fmt::Debug for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fixed({}/{})", self.0, F)
    }
}

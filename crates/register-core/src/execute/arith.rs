//! Width-aware integer arithmetic with carry, overflow and division rules.

use crate::encoding::Width;

/// Result of an add or subtract at a given width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArithResult {
    /// Result truncated to the operand width.
    pub value: u32,
    /// Carry out of an add, or borrow out of a subtract.
    pub carry: bool,
    /// Signed overflow.
    pub overflow: bool,
}

/// `a + b + carry_in` at `width`.
#[must_use]
pub fn add_with_carry(width: Width, a: u32, b: u32, carry_in: bool) -> ArithResult {
    let mask = width.mask();
    let wide = u64::from(a & mask) + u64::from(b & mask) + u64::from(carry_in);
    let value = (wide & u64::from(mask)) as u32;
    ArithResult {
        value,
        carry: wide > u64::from(mask),
        overflow: (a ^ value) & (b ^ value) & width.sign_bit() != 0,
    }
}

/// `minuend - subtrahend - borrow_in` at `width`; `carry` reports a borrow.
#[must_use]
pub fn subtract_with_borrow(
    width: Width,
    minuend: u32,
    subtrahend: u32,
    borrow_in: bool,
) -> ArithResult {
    let mask = width.mask();
    let top = u64::from(minuend & mask);
    let taken = u64::from(subtrahend & mask) + u64::from(borrow_in);
    let value = (top.wrapping_sub(taken) & u64::from(mask)) as u32;
    ArithResult {
        value,
        carry: taken > top,
        overflow: (minuend ^ subtrahend) & (minuend ^ value) & width.sign_bit() != 0,
    }
}

/// Flags set by a comparison of `first` against `second`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Comparison {
    pub(crate) equal: bool,
    pub(crate) greater: bool,
    pub(crate) higher: bool,
}

pub(crate) const fn compare(width: Width, first: u32, second: u32) -> Comparison {
    let mask = width.mask();
    Comparison {
        equal: first & mask == second & mask,
        greater: width.sign_extend(first) > width.sign_extend(second),
        higher: first & mask > second & mask,
    }
}

/// Integer division flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DivideOp {
    /// Quotient rounded toward zero.
    Quo,
    /// Remainder with the sign of the dividend.
    Rem,
    /// Quotient rounded toward negative infinity.
    Div,
    /// Remainder with the sign of the divisor.
    Mod,
}

/// Signed division at `width`, or `None` for a zero divisor.
///
/// The most negative value divided by -1 wraps to itself.
#[must_use]
pub const fn divide(op: DivideOp, width: Width, dividend: u32, divisor: u32) -> Option<u32> {
    let n = width.sign_extend(dividend) as i64;
    let d = width.sign_extend(divisor) as i64;
    if d == 0 {
        return None;
    }
    let quotient = n / d;
    let remainder = n % d;
    let adjust = remainder != 0 && (remainder < 0) != (d < 0);
    let value = match op {
        DivideOp::Quo => quotient,
        DivideOp::Rem => remainder,
        DivideOp::Div => {
            if adjust {
                quotient - 1
            } else {
                quotient
            }
        }
        DivideOp::Mod => {
            if adjust {
                remainder + d
            } else {
                remainder
            }
        }
    };
    Some((value as u32) & width.mask())
}

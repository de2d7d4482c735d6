//! Exact frequency ratios for the harmony pages.
//!
//! Fifths are stacked with exact `i64` rationals; after a dozen chained
//! multiplications a float would no longer print as the fraction a reader
//! expects (531441/524288 for the Pythagorean comma).

use std::fmt;

use num_rational::Ratio;
use num_traits::{CheckedDiv, CheckedMul, One, Zero};

use crate::error::IntervalError;

pub type Rational = Ratio<i64>;

/// An octave-reduced ratio in `[1, 2)` with the number of fifths it was
/// stacked from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RationalInterval {
    ratio: Rational,
    distance: i32,
}

impl RationalInterval {
    #[inline]
    pub fn ratio(&self) -> Rational {
        self.ratio
    }

    #[inline]
    pub fn numer(&self) -> i64 {
        *self.ratio.numer()
    }

    #[inline]
    pub fn denom(&self) -> i64 {
        *self.ratio.denom()
    }

    /// Signed number of fifths stacked on the base.
    #[inline]
    pub fn distance(&self) -> i32 {
        self.distance
    }

    /// Decimal value of the ratio.
    #[inline]
    pub fn value(&self) -> f64 {
        to_f64(self.ratio)
    }

    #[inline]
    pub fn cents(&self) -> f64 {
        cents(self.ratio)
    }

    /// Oscillator frequency for this interval above `base_hz`.
    #[inline]
    pub fn frequency(&self, base_hz: f64) -> f64 {
        base_hz * self.value()
    }
}

impl fmt::Display for RationalInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ratio)
    }
}

#[inline]
pub fn to_f64(r: Rational) -> f64 {
    *r.numer() as f64 / *r.denom() as f64
}

/// Size of a ratio in cents, `1200 * log2(ratio)`.
pub fn cents(r: Rational) -> f64 {
    to_f64(r).log2() * 1200.0
}

/// Double or halve `r` until it lies in `[1, 2)`.
pub fn octave_reduce(r: Rational) -> Result<Rational, IntervalError> {
    if r <= Rational::zero() {
        return Err(IntervalError::NonPositive {
            numer: *r.numer(),
            denom: *r.denom(),
        });
    }
    let one = Rational::one();
    let two = Rational::from_integer(2);
    let mut r = r;
    while r < one {
        r = r
            .checked_mul(&two)
            .ok_or(IntervalError::Overflow { distance: 0 })?;
    }
    while r >= two {
        r = r
            .checked_div(&two)
            .ok_or(IntervalError::Overflow { distance: 0 })?;
    }
    Ok(r)
}

/// Stack `distance` pure fifths (3/2) on `base` (downwards when negative)
/// and octave-reduce the result.
pub fn fifth_from_base(base: Rational, distance: i32) -> Result<RationalInterval, IntervalError> {
    let fifth = Rational::new(3, 2);
    let overflow = IntervalError::Overflow { distance };
    let mut ratio = base;
    for _ in 0..distance.unsigned_abs() {
        ratio = if distance > 0 {
            ratio.checked_mul(&fifth)
        } else {
            ratio.checked_div(&fifth)
        }
        .ok_or_else(|| overflow.clone())?;
    }
    let ratio = octave_reduce(ratio).map_err(|e| match e {
        IntervalError::Overflow { .. } => overflow.clone(),
        other => other,
    })?;
    Ok(RationalInterval { ratio, distance })
}

/// Octave-reduced interval from `lower` up to `upper`.
pub fn interval_between(upper: Rational, lower: Rational) -> Result<Rational, IntervalError> {
    let quotient = upper
        .checked_div(&lower)
        .ok_or(IntervalError::NonPositive {
            numer: *lower.numer(),
            denom: *lower.denom(),
        })?;
    octave_reduce(quotient)
}

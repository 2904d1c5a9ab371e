//! The cost-function scalar (`CFtype`) and its tolerance-based comparisons.
//!
//! Integer and floating cost types share one algorithmic layer: every
//! runner, cost structure, and neighborhood operation in this crate is
//! generic over [`Scalar`] rather than hardcoding `f64` or `i64`.

use std::fmt::Debug;
use std::ops::{Add, Neg, Sub};

/// A scalar cost-function value.
///
/// Implementors support arithmetic and a tolerance-scaled equality so
/// that `f64` rounding error never breaks the total ordering the rest
/// of the crate relies on (`spec.md` §8 property 3).
pub trait Scalar:
    Copy + Default + Debug + PartialOrd + Send + Sync + 'static + Add<Output = Self> + Sub<Output = Self> + Neg<Output = Self>
{
    /// The additive identity, used as the implicit "zero cost" baseline.
    fn zero() -> Self {
        Self::default()
    }

    /// Converts to `f64` for magnitude-scaled tolerance comparisons and
    /// for combining with `f64` component weights.
    fn to_f64(self) -> f64;

    /// Converts back from `f64`, used when applying a `f64` weight to a
    /// component's raw (unweighted) cost.
    fn from_f64(value: f64) -> Self;

    /// `self * weight`, expressed through the `f64` round-trip so a
    /// single algorithmic layer serves both integral and floating kinds.
    fn scale(self, weight: f64) -> Self {
        Self::from_f64(self.to_f64() * weight)
    }
}

impl Scalar for f64 {
    fn to_f64(self) -> f64 {
        self
    }

    fn from_f64(value: f64) -> Self {
        value
    }
}

impl Scalar for i64 {
    fn to_f64(self) -> f64 {
        self as f64
    }

    fn from_f64(value: f64) -> Self {
        value.round() as i64
    }
}

/// Machine-epsilon-scaled tolerance, per Design Note (d): the magnitude
/// of the larger operand scales the epsilon rather than using a bare
/// `f64::EPSILON` comparison.
fn tolerance(a: f64, b: f64) -> f64 {
    let magnitude = a.abs().max(b.abs()).max(1.0);
    f64::EPSILON * magnitude * 1024.0
}

/// `a == b` within scaled machine tolerance.
pub fn equal_to<T: Scalar>(a: T, b: T) -> bool {
    let (a, b) = (a.to_f64(), b.to_f64());
    (a - b).abs() <= tolerance(a, b)
}

/// `a < b`, strictly outside tolerance.
pub fn less_than<T: Scalar>(a: T, b: T) -> bool {
    let (af, bf) = (a.to_f64(), b.to_f64());
    af < bf && !equal_to(a, b)
}

/// `a <= b` (i.e. `a < b || a == b`).
pub fn less_than_or_equal<T: Scalar>(a: T, b: T) -> bool {
    less_than(a, b) || equal_to(a, b)
}

/// `a > b`, strictly outside tolerance.
pub fn greater_than<T: Scalar>(a: T, b: T) -> bool {
    less_than(b, a)
}

/// `a >= b`.
pub fn greater_than_or_equal<T: Scalar>(a: T, b: T) -> bool {
    less_than_or_equal(b, a)
}

//! Core types for floating-point sound polyhedral bound analysis.
//!
//! This crate provides the numeric foundation shared by the propagation
//! engine:
//! - [`rounding`]: upward-rounded scalar primitives and the scoped
//!   [`RoundingGuard`] for transcendental endpoint evaluation
//! - [`Interval`]: sound interval kernel in the negated-lower-bound convention
//! - [`RoundingConfig`]: the `ulp` / `min_denormal` compensation constants
//! - [`AffineExpr`]: dense and sparse linear forms with interval coefficients

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use thiserror::Error;

pub mod config;
pub mod expr;
pub mod interval;
pub mod rounding;

pub use config::RoundingConfig;
pub use expr::{AffineExpr, Terms};
pub use interval::{Interval, Sign};
pub use rounding::{Direction, RoundingGuard};

/// A bound on a scalar value in true (non-negated) form: `[lower, upper]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bound {
    pub lower: f64,
    pub upper: f64,
}

impl Bound {
    /// Create a new bound.
    #[inline]
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Create a concrete (point) bound.
    #[inline]
    pub fn concrete(value: f64) -> Self {
        Self {
            lower: value,
            upper: value,
        }
    }

    /// Check if this bound contains a value.
    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }

    /// Check if this bound contains a value, allowing `tolerance` slack.
    #[inline]
    pub fn contains_approx(&self, value: f64, tolerance: f64) -> bool {
        self.lower - tolerance <= value && value <= self.upper + tolerance
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Check if bounds have exploded to infinity.
    #[inline]
    pub fn is_unbounded(&self) -> bool {
        self.lower.is_infinite() || self.upper.is_infinite()
    }

    /// Intersect two bounds.
    #[inline]
    pub fn intersect(&self, other: &Bound) -> Option<Bound> {
        let lower = self.lower.max(other.lower);
        let upper = self.upper.min(other.upper);
        (lower <= upper).then_some(Bound { lower, upper })
    }
}

impl From<Interval> for Bound {
    fn from(i: Interval) -> Self {
        Self {
            lower: i.lower(),
            upper: i.upper(),
        }
    }
}

impl From<Bound> for Interval {
    fn from(b: Bound) -> Self {
        Interval::from_bounds(b.lower, b.upper)
    }
}

impl From<RangeInclusive<f64>> for Bound {
    fn from(range: RangeInclusive<f64>) -> Self {
        Self::new(*range.start(), *range.end())
    }
}

/// Errors returned at the analysis boundary.
///
/// Internal contract violations (mismatched dense sizes inside the algebra,
/// malformed relaxations) are assertions, not variants here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FppolyError {
    #[error("layer {layer} out of range ({num_layers} layers)")]
    InvalidLayer { layer: usize, num_layers: usize },

    #[error("neuron {neuron} out of range for layer {layer} ({size} neurons)")]
    InvalidNeuron {
        layer: usize,
        neuron: usize,
        size: usize,
    },

    #[error("dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        expected: usize,
        actual: usize,
        context: String,
    },

    #[error("invalid specification: {0}")]
    InvalidSpec(String),

    #[error("thread pool error: {0}")]
    ThreadPool(String),
}

pub type Result<T> = std::result::Result<T, FppolyError>;

#[cfg(test)]
mod tests;

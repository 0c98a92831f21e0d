//! Witness type for confidence values bounded to [0.0, 1.0].
//!
//! # What Confidence Means Here
//!
//! Upstream detectors compute confidence in fundamentally different ways,
//! and the raw numbers are not directly comparable:
//!
//! - A pattern detector's 0.95 means "the regex matched": certainty about
//!   format, not probability of being PHI.
//! - A dictionary detector's 0.6 means "surface form is in a name list",
//!   ambiguous by construction (many names are also words).
//! - A context signal's 0.7 is a heuristic blend of window features.
//!
//! The fusion stages in this crate exist precisely to reconcile those
//! scales. What this type guarantees is only the *bounds* invariant: once a
//! value is parsed into `Confidence`, downstream code never re-checks range.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A confidence score guaranteed to be in the range [0.0, 1.0].
///
/// This is a witness type: its existence proves the value is valid.
///
/// # Construction
///
/// - [`Confidence::new`]: returns `None` if out of range (strict parsing)
/// - [`Confidence::saturating`]: clamps to [0, 1] (lenient, never fails)
/// - [`Confidence::try_from`]: returns `Err` if out of range
///
/// `Confidence` is `#[repr(transparent)]` over `f64`, so there is no
/// runtime overhead.
#[derive(Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct Confidence(f64);

impl Confidence {
    /// The minimum valid confidence value.
    pub const MIN: Self = Self(0.0);

    /// The maximum valid confidence value.
    pub const MAX: Self = Self(1.0);

    /// Create a confidence score, returning `None` if out of range.
    #[must_use]
    #[inline]
    pub fn new(value: f64) -> Option<Self> {
        if (0.0..=1.0).contains(&value) && !value.is_nan() {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Create a confidence score, clamping to [0.0, 1.0]. NaN becomes 0.0.
    #[must_use]
    #[inline]
    pub fn saturating(value: f64) -> Self {
        if value.is_nan() {
            Self(0.0)
        } else {
            Self(value.clamp(0.0, 1.0))
        }
    }

    /// Get the inner value (guaranteed to be in [0.0, 1.0]).
    #[must_use]
    #[inline]
    pub const fn get(self) -> f64 {
        self.0
    }

    /// Check if this is "high confidence" (>= 0.9), the bar the arbitration
    /// replace-on-containment branch uses.
    #[must_use]
    #[inline]
    pub fn is_high(self) -> bool {
        self.0 >= 0.9
    }

    /// Check if this is "low confidence" (< 0.5).
    #[must_use]
    #[inline]
    pub fn is_low(self) -> bool {
        self.0 < 0.5
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Self(0.5)
    }
}

impl fmt::Debug for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Confidence({:.4})", self.0)
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}%", self.0 * 100.0)
    }
}

/// Error when trying to create a Confidence from an invalid value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceError {
    /// The invalid value that was provided.
    pub value: f64,
}

impl fmt::Display for ConfidenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "confidence value {} is outside valid range [0.0, 1.0]",
            self.value
        )
    }
}

impl std::error::Error for ConfidenceError {}

impl TryFrom<f64> for Confidence {
    type Error = ConfidenceError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(ConfidenceError { value })
    }
}

impl From<Confidence> for f64 {
    #[inline]
    fn from(conf: Confidence) -> Self {
        conf.0
    }
}

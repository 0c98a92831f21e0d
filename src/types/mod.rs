//! Witness types and extension traits.
//!
//! Confidence values cross this engine's boundaries constantly: raw detector
//! confidences, fused vote scores, rule strengths, thresholds. Instead of
//! re-validating `[0, 1]` bounds at every call site, values are parsed once
//! into [`Confidence`] and the type carries the invariant from there.
//!
//! # Bounded Value Types
//!
//! | Type | Precision | Domain | When to Use |
//! |------|-----------|--------|-------------|
//! | [`Confidence`] | f64 | [0, 1] | Span confidence, vote scores, rule strengths |
//!
//! `Span.confidence` stays a raw `f64` for API stability (clamped on every
//! write); `Confidence` is used where strict parsing is wanted, e.g. rule
//! strengths loaded from configuration.
//!
//! # Extension Traits
//!
//! | Trait | Extends | Purpose |
//! |-------|---------|---------|
//! | [`SpanSliceExt`] | `[Span]` | Filter, sort, and overlap-check span collections |

mod confidence;
mod ext;

pub use confidence::{Confidence, ConfidenceError};
pub use ext::SpanSliceExt;

/// Static assertions for struct layouts and invariants.
#[doc(hidden)]
pub mod static_checks {
    use super::*;

    // Confidence is zero-cost (same size as f64)
    const _: () = assert!(std::mem::size_of::<Confidence>() == std::mem::size_of::<f64>());
    const _: () = assert!(std::mem::align_of::<Confidence>() == std::mem::align_of::<f64>());
}

//! # scrub
//!
//! Span scoring and arbitration for clinical PHI redaction.
//!
//! Upstream detectors (pattern, dictionary, NER) propose candidate spans:
//! text ranges tagged with a PHI category and a raw confidence. The noisy,
//! overlapping, sometimes contradictory candidate set then flows through
//! this engine:
//!
//! 1. **Score**: [`EnsembleVoter`] fuses discrete evidence signals;
//!    [`WeightedPhiScorer`] scores a raw span against its surrounding text
//!    window using pattern-tier weights, context bonuses, and
//!    medical-vocabulary whitelist penalties.
//! 2. **Reason**: [`DatalogReasoner`] adjusts confidences from pairwise
//!    category relationships (conflicting or mutually supportive nearby
//!    spans, repeated-text consistency across the document).
//! 3. **Arbitrate**: [`SpanArbiter`] resolves geometric overlaps into a
//!    final non-overlapping, position-sorted span set over an interval
//!    index.
//!
//! ## Quick Start
//!
//! ```rust
//! use scrub::{PhiCategory, RedactionEngine, Span};
//!
//! let engine = RedactionEngine::new();
//! let text = "Patient: Jane Doe, SSN 123-45-6789.";
//! let spans = vec![
//!     Span::new("Jane Doe", PhiCategory::Name, 9, 17, 0.7)
//!         .with_pattern("patient_label_name"),
//!     Span::new("123-45-6789", PhiCategory::Ssn, 23, 34, 0.95)
//!         .with_pattern("ssn_dashed"),
//! ];
//!
//! let accepted = engine.process(text, spans);
//! assert_eq!(accepted.len(), 2);
//! ```
//!
//! ## Signal Fusion
//!
//! ```rust
//! use scrub::{EnsembleVoter, Recommendation, SignalSource, VoteSignal};
//!
//! let voter = EnsembleVoter::new();
//! let vote = voter.vote(&[
//!     VoteSignal::new(SignalSource::Pattern, 1.0, 0.95, "SSN format matched"),
//!     VoteSignal::new(SignalSource::Label, 0.9, 0.85, "preceded by 'SSN:'"),
//! ]);
//! assert_eq!(vote.recommendation, Recommendation::Redact);
//! ```
//!
//! ## Design
//!
//! - **Deterministic**: identical spans, text, and configuration always
//!   produce identical output; all sort keys are total orders.
//! - **Degrade, don't abort**: bad config falls back to defaults, a failed
//!   reasoning pass leaves spans unmodified, invalid spans are dropped;
//!   abandoning a document mid-pipeline is worse than a conservative
//!   result.
//! - **Rules are data**: cross-span relationships live in a declarative
//!   table, addable at runtime without touching engine logic.
//! - **Synchronous and CPU-bound**: the unit of concurrency is the
//!   document; batch scoring inside one call fans out across threads.

#![warn(missing_docs)]

mod config;
mod engine;
mod error;
mod index;
mod reasoner;
mod scorer;
mod signal;
mod span;
mod voter;

pub mod types;

pub mod prelude {
    //! Commonly used items, re-exported for convenience.
    //!
    //! ```rust
    //! use scrub::prelude::*;
    //!
    //! let engine = RedactionEngine::new();
    //! let accepted = engine.process("MRN 1234567", vec![
    //!     Span::new("1234567", PhiCategory::Mrn, 4, 11, 0.9),
    //! ]);
    //! assert_eq!(accepted.len(), 1);
    //! ```
    pub use crate::config::EngineConfig;
    pub use crate::engine::RedactionEngine;
    pub use crate::error::{Error, Result};
    pub use crate::signal::{SignalSource, VoteSignal};
    pub use crate::span::{PhiCategory, Span};
    pub use crate::types::{Confidence, SpanSliceExt};
    pub use crate::voter::{EnsembleVoter, Recommendation};
}

// Re-exports
pub use config::{EngineConfig, RuleSpec};
pub use engine::{RedactionEngine, RedactionEngineBuilder};
pub use error::{Error, Result};
pub use index::{
    arbitration_score, IndexBackend, IntervalTree, OverlapIndex, SortedVecIndex, SpanArbiter,
};
pub use reasoner::{default_rules, DatalogReasoner, Relationship, Rule, RuleFiring};
pub use scorer::{
    PhiScore, ScoreBand, ScoreTerm, ScoringWeights, WeightedPhiScorer, Window, WINDOW_RADIUS,
};
pub use signal::{SignalSource, VoteSignal};
pub use span::{NameTier, PhiCategory, Span};
pub use voter::{
    EnsembleVoter, FusionMode, Recommendation, SourceWeights, Vote, VotingConfig,
};

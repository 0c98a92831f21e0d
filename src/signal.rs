//! Vote signals: independent pieces of evidence about a candidate span.

use serde::{Deserialize, Serialize};

use crate::span::clamp01;

/// Where a signal came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalSource {
    /// Regex/format pattern matched
    Pattern,
    /// Dictionary/gazetteer hit
    Dictionary,
    /// Linguistic context around the span
    Context,
    /// Structural position in the document (header, form field)
    Structure,
    /// Proximity to an explicit field label ("Name:", "MRN:")
    Label,
    /// Confidence re-weighted for OCR noise
    ChaosAdjusted,
}

impl SignalSource {
    /// All sources, in default-weight order.
    pub const ALL: [SignalSource; 6] = [
        SignalSource::Pattern,
        SignalSource::Dictionary,
        SignalSource::Context,
        SignalSource::Structure,
        SignalSource::Label,
        SignalSource::ChaosAdjusted,
    ];
}

impl std::fmt::Display for SignalSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SignalSource::Pattern => "PATTERN",
            SignalSource::Dictionary => "DICTIONARY",
            SignalSource::Context => "CONTEXT",
            SignalSource::Structure => "STRUCTURE",
            SignalSource::Label => "LABEL",
            SignalSource::ChaosAdjusted => "CHAOS_ADJUSTED",
        };
        write!(f, "{s}")
    }
}

/// One independent piece of evidence about whether a span is PHI.
///
/// Ephemeral: produced per evaluation by upstream signal producers, consumed
/// by [`crate::EnsembleVoter::vote`], never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteSignal {
    /// Producer category.
    pub source: SignalSource,
    /// Producer's own weighting of this evidence, in [0, 1].
    pub weight: f64,
    /// Evidence strength, in [0, 1].
    pub confidence: f64,
    /// Human-readable justification, surfaced in vote explanations.
    pub reason: String,
}

impl VoteSignal {
    /// Create a signal. Weight and confidence are clamped to [0, 1].
    #[must_use]
    pub fn new(
        source: SignalSource,
        weight: f64,
        confidence: f64,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            source,
            weight: clamp01(weight),
            confidence: clamp01(confidence),
            reason: reason.into(),
        }
    }

    /// Whether this signal argues for redaction (confidence above 0.5).
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.confidence > 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_on_construction() {
        let s = VoteSignal::new(SignalSource::Pattern, 1.5, -0.2, "ssn format");
        assert_eq!(s.weight, 1.0);
        assert_eq!(s.confidence, 0.0);
    }

    #[test]
    fn positivity_threshold() {
        assert!(VoteSignal::new(SignalSource::Context, 1.0, 0.51, "x").is_positive());
        assert!(!VoteSignal::new(SignalSource::Context, 1.0, 0.5, "x").is_positive());
    }

    #[test]
    fn source_serde_uses_screaming_snake() {
        let json = serde_json::to_string(&SignalSource::ChaosAdjusted).unwrap();
        assert_eq!(json, "\"CHAOS_ADJUSTED\"");
        let back: SignalSource = serde_json::from_str("\"PATTERN\"").unwrap();
        assert_eq!(back, SignalSource::Pattern);
    }
}

//! Ensemble voting: fuse a span's signals into one combined confidence.
//!
//! Two fusion modes are supported. The default is a weighted geometric mean:
//! it punishes strong disagreement (one near-zero signal drags the combined
//! score down hard), which is the right bias for a redaction system that
//! would rather over-redact than leak. The alternative is Bayesian log-odds
//! pooling with a configurable PHI prior, useful when upstream confidences
//! are reasonably calibrated probabilities.
//!
//! On top of the fused base score, an agreement adjustment nudges the result
//! by how unanimous the signals are: the normalized binary entropy of the
//! positive/negative split scales a multiplier, with a small bonus when
//! enough signals agree.

use serde::{Deserialize, Serialize};

use crate::signal::{SignalSource, VoteSignal};
use crate::span::clamp01;

const LN_EPSILON: f64 = 1e-10;
const LOGIT_EPSILON: f64 = 1e-10;

/// Categorical outcome of a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    /// Combined score cleared the redact threshold.
    Redact,
    /// Combined score fell at or below the skip threshold.
    Skip,
    /// Between the thresholds; caller decides (usually: redact anyway).
    Uncertain,
}

/// Fusion mode for combining signal confidences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionMode {
    /// Weighted geometric mean (default).
    #[default]
    GeometricMean,
    /// Bayesian log-odds pooling with a PHI prior.
    Bayesian,
}

/// Configuration for [`EnsembleVoter`]. Immutable per voter instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VotingConfig {
    /// Per-source weights in [0, 1].
    pub signal_weights: SourceWeights,
    /// Score at or above which the recommendation is `Redact`.
    pub redact_threshold: f64,
    /// Score at or below which the recommendation is `Skip`.
    pub skip_threshold: f64,
    /// Positive-signal count that earns the agreement bonus.
    pub minimum_agreement: usize,
    /// Fusion mode.
    pub fusion: FusionMode,
    /// Prior probability that an arbitrary candidate span is PHI
    /// (Bayesian mode only).
    pub phi_prior: f64,
}

/// Per-source weight table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceWeights {
    /// Weight for `PATTERN` signals.
    pub pattern: f64,
    /// Weight for `DICTIONARY` signals.
    pub dictionary: f64,
    /// Weight for `CONTEXT` signals.
    pub context: f64,
    /// Weight for `STRUCTURE` signals.
    pub structure: f64,
    /// Weight for `LABEL` signals.
    pub label: f64,
    /// Weight for `CHAOS_ADJUSTED` signals.
    pub chaos_adjusted: f64,
}

impl Default for SourceWeights {
    fn default() -> Self {
        Self {
            pattern: 0.30,
            dictionary: 0.25,
            context: 0.20,
            structure: 0.10,
            label: 0.10,
            chaos_adjusted: 0.05,
        }
    }
}

impl SourceWeights {
    /// Look up the weight for a source.
    #[must_use]
    pub fn get(&self, source: SignalSource) -> f64 {
        let w = match source {
            SignalSource::Pattern => self.pattern,
            SignalSource::Dictionary => self.dictionary,
            SignalSource::Context => self.context,
            SignalSource::Structure => self.structure,
            SignalSource::Label => self.label,
            SignalSource::ChaosAdjusted => self.chaos_adjusted,
        };
        clamp01(w)
    }
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            signal_weights: SourceWeights::default(),
            redact_threshold: 0.65,
            skip_threshold: 0.35,
            minimum_agreement: 2,
            fusion: FusionMode::GeometricMean,
            phi_prior: 0.15,
        }
    }
}

/// Result of fusing one span's signals.
#[derive(Debug, Clone)]
pub struct Vote {
    /// Fused confidence in [0, 1].
    pub combined_score: f64,
    /// Categorical recommendation.
    pub recommendation: Recommendation,
    /// The signal with the largest weighted contribution, if any.
    /// Used for the explanation only; it does not affect the score.
    pub dominant_signal: Option<VoteSignal>,
    /// Human-readable summary of how the vote was reached.
    pub explanation: String,
}

/// Fuses vote signals into one combined confidence and recommendation.
///
/// Pure: `vote` has no side effects and is a function only of its input and
/// the construction-time config. Instances are cheap and `Send + Sync`, so
/// one voter may be shared across a batch of spans.
#[derive(Debug, Clone, Default)]
pub struct EnsembleVoter {
    config: VotingConfig,
}

impl EnsembleVoter {
    /// Create a voter with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a voter with explicit configuration.
    #[must_use]
    pub fn with_config(config: VotingConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &VotingConfig {
        &self.config
    }

    /// Fuse signals into a combined score and recommendation.
    ///
    /// An empty signal list yields score 0.0 and `Skip`, not an error.
    #[must_use]
    pub fn vote(&self, signals: &[VoteSignal]) -> Vote {
        if signals.is_empty() {
            return Vote {
                combined_score: 0.0,
                recommendation: Recommendation::Skip,
                dominant_signal: None,
                explanation: "no signals".to_string(),
            };
        }

        let base = match self.config.fusion {
            FusionMode::GeometricMean => self.geometric_mean(signals),
            FusionMode::Bayesian => self.bayesian(signals),
        };

        let positives = signals.iter().filter(|s| s.is_positive()).count();
        let multiplier = self.agreement_multiplier(positives, signals.len());
        let combined_score = clamp01(base * multiplier);

        let recommendation = if combined_score >= self.config.redact_threshold {
            Recommendation::Redact
        } else if combined_score <= self.config.skip_threshold {
            Recommendation::Skip
        } else {
            Recommendation::Uncertain
        };

        let dominant_signal = self.dominant(signals);
        let explanation = match &dominant_signal {
            Some(d) => format!(
                "{:?} at {:.3} ({} of {} positive; led by {} \"{}\")",
                recommendation,
                combined_score,
                positives,
                signals.len(),
                d.source,
                d.reason
            ),
            None => format!("{recommendation:?} at {combined_score:.3}"),
        };

        Vote {
            combined_score,
            recommendation,
            dominant_signal,
            explanation,
        }
    }

    /// Weighted geometric mean: `exp(Σ wᵢ·ln(max(cᵢ, ε)) / Σ wᵢ)`.
    fn geometric_mean(&self, signals: &[VoteSignal]) -> f64 {
        let mut weighted_log_sum = 0.0;
        let mut weight_sum = 0.0;
        for s in signals {
            let w = self.config.signal_weights.get(s.source) * s.weight;
            if w <= 0.0 {
                continue;
            }
            weighted_log_sum += w * s.confidence.max(LN_EPSILON).ln();
            weight_sum += w;
        }
        if weight_sum <= 0.0 {
            return 0.0;
        }
        clamp01((weighted_log_sum / weight_sum).exp())
    }

    /// Bayesian log-odds pooling:
    /// `sigmoid(Σ wᵢ·logit(cᵢ)/Σwᵢ + logit(prior))`.
    fn bayesian(&self, signals: &[VoteSignal]) -> f64 {
        let mut weighted_logit_sum = 0.0;
        let mut weight_sum = 0.0;
        for s in signals {
            let w = self.config.signal_weights.get(s.source) * s.weight;
            if w <= 0.0 {
                continue;
            }
            weighted_logit_sum += w * logit(s.confidence);
            weight_sum += w;
        }
        if weight_sum <= 0.0 {
            return 0.0;
        }
        let pooled = weighted_logit_sum / weight_sum + logit(self.config.phi_prior);
        clamp01(sigmoid(pooled))
    }

    /// Agreement multiplier from the positive/negative split.
    ///
    /// `H` is the normalized binary Shannon entropy of the split. With one
    /// signal there is no split and no adjustment (multiplier 1.0).
    /// Unanimity (`H = 0`) scales the base by 1.15; maximal disagreement
    /// (`H = 1`) by 0.85. Meeting `minimum_agreement` positive signals adds
    /// 0.05, capped at 1.20 total.
    fn agreement_multiplier(&self, positives: usize, total: usize) -> f64 {
        if total <= 1 {
            return 1.0;
        }
        let entropy = binary_entropy(positives as f64 / total as f64);
        let mut multiplier = (1.15 - 0.30 * entropy).clamp(0.85, 1.15);
        if positives >= self.config.minimum_agreement {
            multiplier = (multiplier + 0.05).min(1.20);
        }
        multiplier
    }

    /// Signal with the largest individual weighted contribution
    /// (`weight × confidence × source_weight`).
    fn dominant(&self, signals: &[VoteSignal]) -> Option<VoteSignal> {
        signals
            .iter()
            .max_by(|a, b| {
                let ca = a.weight * a.confidence * self.config.signal_weights.get(a.source);
                let cb = b.weight * b.confidence * self.config.signal_weights.get(b.source);
                ca.partial_cmp(&cb).unwrap_or(std::cmp::Ordering::Equal)
            })
            .cloned()
    }
}

/// Normalized binary Shannon entropy: `-p·log2(p) - q·log2(q)`.
fn binary_entropy(p: f64) -> f64 {
    if p <= 0.0 || p >= 1.0 {
        return 0.0;
    }
    let q = 1.0 - p;
    -(p * p.log2() + q * q.log2())
}

/// Logit with the argument clamped away from 0 and 1.
fn logit(p: f64) -> f64 {
    let p = p.clamp(LOGIT_EPSILON, 1.0 - LOGIT_EPSILON);
    (p / (1.0 - p)).ln()
}

/// Numerically stable sigmoid: branch on the sign of the argument so the
/// exponent never overflows.
fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::SignalSource::*;

    fn sig(source: crate::signal::SignalSource, conf: f64) -> VoteSignal {
        VoteSignal::new(source, 1.0, conf, "test")
    }

    #[test]
    fn empty_signals_skip_without_error() {
        let voter = EnsembleVoter::new();
        let vote = voter.vote(&[]);
        assert_eq!(vote.combined_score, 0.0);
        assert_eq!(vote.recommendation, Recommendation::Skip);
        assert!(vote.dominant_signal.is_none());
    }

    #[test]
    fn single_strong_pattern_signal_redacts_near_raw_confidence() {
        let voter = EnsembleVoter::new();
        let vote = voter.vote(&[sig(Pattern, 0.95)]);
        // No agreement adjustment is possible with a single signal; the
        // geometric mean of one signal is the signal itself.
        assert_eq!(vote.recommendation, Recommendation::Redact);
        assert!((vote.combined_score - 0.95).abs() < 0.01);
        assert!(vote.dominant_signal.is_some());
    }

    #[test]
    fn geometric_mean_punishes_disagreement() {
        let voter = EnsembleVoter::new();
        let agree = voter.vote(&[sig(Pattern, 0.9), sig(Dictionary, 0.9)]);
        let disagree = voter.vote(&[sig(Pattern, 0.9), sig(Dictionary, 0.05)]);
        assert!(disagree.combined_score < agree.combined_score);
        // A near-zero signal should drag hard, not average out.
        assert!(disagree.combined_score < 0.5);
    }

    #[test]
    fn zero_confidence_does_not_panic() {
        let voter = EnsembleVoter::new();
        let vote = voter.vote(&[sig(Pattern, 0.0)]);
        assert!(vote.combined_score >= 0.0);
        assert_eq!(vote.recommendation, Recommendation::Skip);
    }

    #[test]
    fn agreement_bonus_fires_at_minimum() {
        let voter = EnsembleVoter::new();
        // Unanimous positives: H=0, multiplier 1.15 + 0.05 capped at 1.20.
        assert!((voter.agreement_multiplier(3, 3) - 1.20).abs() < 1e-12);
        // Single signal: no split, no adjustment.
        assert!((voter.agreement_multiplier(1, 1) - 1.0).abs() < 1e-12);
        // Even split: H=1, multiplier 0.85 + bonus.
        assert!((voter.agreement_multiplier(2, 4) - 0.90).abs() < 1e-12);
        // Even split below agreement: 0.85 flat.
        assert!((voter.agreement_multiplier(1, 2) - 0.85).abs() < 1e-12);
    }

    #[test]
    fn monotonic_agreement_around_minimum() {
        let voter = EnsembleVoter::new();
        // One positive (below minimum_agreement) vs two positives (at it),
        // holding individual confidences fixed.
        let below = voter.vote(&[sig(Pattern, 0.8)]);
        let at = voter.vote(&[sig(Pattern, 0.8), sig(Dictionary, 0.8)]);
        assert!(at.combined_score >= below.combined_score - 1e-12);
    }

    #[test]
    fn bayesian_prior_pulls_down_weak_evidence() {
        let voter = EnsembleVoter::with_config(VotingConfig {
            fusion: FusionMode::Bayesian,
            ..VotingConfig::default()
        });
        // A 0.5 signal carries no evidence; the 0.15 prior dominates.
        let vote = voter.vote(&[sig(Pattern, 0.5)]);
        assert!(vote.combined_score < 0.35);
    }

    #[test]
    fn bayesian_strong_evidence_overcomes_prior() {
        let voter = EnsembleVoter::with_config(VotingConfig {
            fusion: FusionMode::Bayesian,
            ..VotingConfig::default()
        });
        let vote = voter.vote(&[sig(Pattern, 0.99), sig(Label, 0.97)]);
        assert_eq!(vote.recommendation, Recommendation::Redact);
    }

    #[test]
    fn bayesian_extremes_are_stable() {
        let voter = EnsembleVoter::with_config(VotingConfig {
            fusion: FusionMode::Bayesian,
            ..VotingConfig::default()
        });
        for conf in [0.0, 1.0] {
            let vote = voter.vote(&[sig(Pattern, conf)]);
            assert!(vote.combined_score.is_finite());
            assert!((0.0..=1.0).contains(&vote.combined_score));
        }
    }

    #[test]
    fn dominant_signal_reflects_source_weight() {
        let voter = EnsembleVoter::new();
        // Same raw confidence; PATTERN outweighs CHAOS_ADJUSTED 0.30 to 0.05.
        let vote = voter.vote(&[sig(ChaosAdjusted, 0.9), sig(Pattern, 0.9)]);
        assert_eq!(vote.dominant_signal.unwrap().source, Pattern);
    }

    #[test]
    fn vote_is_deterministic() {
        let voter = EnsembleVoter::new();
        let signals = vec![sig(Pattern, 0.8), sig(Context, 0.4), sig(Label, 0.7)];
        let a = voter.vote(&signals);
        let b = voter.vote(&signals);
        assert_eq!(a.combined_score, b.combined_score);
        assert_eq!(a.recommendation, b.recommendation);
    }

    #[test]
    fn sigmoid_stable_at_extremes() {
        assert!((sigmoid(1000.0) - 1.0).abs() < 1e-12);
        assert!(sigmoid(-1000.0).abs() < 1e-12);
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn entropy_bounds() {
        assert_eq!(binary_entropy(0.0), 0.0);
        assert_eq!(binary_entropy(1.0), 0.0);
        assert!((binary_entropy(0.5) - 1.0).abs() < 1e-12);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_signal() -> impl Strategy<Value = VoteSignal> {
        (0usize..6, 0.0f64..=1.0, 0.0f64..=1.0).prop_map(|(idx, w, c)| {
            VoteSignal::new(SignalSource::ALL[idx], w, c, "gen")
        })
    }

    proptest! {
        #[test]
        fn combined_score_always_bounded(signals in prop::collection::vec(arb_signal(), 0..12)) {
            let voter = EnsembleVoter::new();
            let vote = voter.vote(&signals);
            prop_assert!(vote.combined_score >= 0.0);
            prop_assert!(vote.combined_score <= 1.0);
        }

        #[test]
        fn bayesian_always_bounded(signals in prop::collection::vec(arb_signal(), 0..12)) {
            let voter = EnsembleVoter::with_config(VotingConfig {
                fusion: FusionMode::Bayesian,
                ..VotingConfig::default()
            });
            let vote = voter.vote(&signals);
            prop_assert!(vote.combined_score.is_finite());
            prop_assert!(vote.combined_score >= 0.0);
            prop_assert!(vote.combined_score <= 1.0);
        }
    }
}

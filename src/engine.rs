//! The redaction engine facade: score → reason → arbitrate.
//!
//! An explicit, constructed service object. All configuration is passed at
//! construction; there is no process-wide shared state, so one engine per
//! document-processing task (or one shared engine, read-only) are both fine.

use rayon::prelude::*;

use crate::config::EngineConfig;
use crate::index::{dedup_exact, IndexBackend, SpanArbiter};
use crate::reasoner::DatalogReasoner;
use crate::scorer::WeightedPhiScorer;
use crate::signal::VoteSignal;
use crate::span::Span;
use crate::voter::{EnsembleVoter, FusionMode, Vote};

/// Fluent builder for [`RedactionEngine`].
#[derive(Debug)]
pub struct RedactionEngineBuilder {
    config: EngineConfig,
    backend: IndexBackend,
    reasoner_enabled: bool,
    fusion: Option<FusionMode>,
}

impl Default for RedactionEngineBuilder {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            backend: IndexBackend::default(),
            reasoner_enabled: true,
            fusion: None,
        }
    }
}

impl RedactionEngineBuilder {
    /// Use the given configuration (weights, voting, rules).
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Select the overlap-index backend.
    #[must_use]
    pub fn index_backend(mut self, backend: IndexBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Enable or bypass the reasoning pass.
    #[must_use]
    pub fn reasoner(mut self, enabled: bool) -> Self {
        self.reasoner_enabled = enabled;
        self
    }

    /// Override the fusion mode from the voting config.
    #[must_use]
    pub fn fusion(mut self, fusion: FusionMode) -> Self {
        self.fusion = Some(fusion);
        self
    }

    /// Build the engine.
    #[must_use]
    pub fn build(self) -> RedactionEngine {
        let mut voting = self.config.voting.clone();
        if let Some(fusion) = self.fusion {
            voting.fusion = fusion;
        }
        RedactionEngine {
            scorer: WeightedPhiScorer::with_weights(self.config.scoring.clone()),
            voter: EnsembleVoter::with_config(voting),
            reasoner: DatalogReasoner::with_rules(self.config.compiled_rules()),
            arbiter: SpanArbiter::with_backend(self.backend),
            reasoner_enabled: self.reasoner_enabled,
        }
    }
}

/// Span scoring and arbitration engine.
///
/// Synchronous and CPU-bound: no call suspends or blocks, so there is no
/// cancellation to define. The unit of concurrency is the document: run
/// one `process` call per document task. Batch scoring inside a call fans
/// out across threads; the reasoner and arbiter run single-threaded.
#[derive(Debug)]
pub struct RedactionEngine {
    scorer: WeightedPhiScorer,
    voter: EnsembleVoter,
    reasoner: DatalogReasoner,
    arbiter: SpanArbiter,
    reasoner_enabled: bool,
}

impl Default for RedactionEngine {
    fn default() -> Self {
        Self::builder().reasoner(true).build()
    }
}

impl RedactionEngine {
    /// Create an engine with built-in defaults (reasoner on, reference
    /// index backend).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine from a configuration, defaults elsewhere.
    #[must_use]
    pub fn from_config(config: EngineConfig) -> Self {
        Self::builder().config(config).reasoner(true).build()
    }

    /// Create a builder.
    #[must_use]
    pub fn builder() -> RedactionEngineBuilder {
        RedactionEngineBuilder::default()
    }

    /// The scorer in use.
    #[must_use]
    pub fn scorer(&self) -> &WeightedPhiScorer {
        &self.scorer
    }

    /// The reasoner in use.
    #[must_use]
    pub fn reasoner(&self) -> &DatalogReasoner {
        &self.reasoner
    }

    /// Fuse a span's signals into a vote (pass-through to the configured
    /// [`EnsembleVoter`]).
    #[must_use]
    pub fn vote(&self, signals: &[VoteSignal]) -> Vote {
        self.voter.vote(signals)
    }

    /// Run the full pipeline over one document's candidate spans.
    ///
    /// Returns the accepted spans: confidences updated in place, filtered
    /// to a non-overlapping, position-sorted subset. Invalid spans (empty
    /// range, positions past the end of the document) are dropped with a
    /// warning, since they cannot be scored or indexed.
    #[must_use]
    pub fn process(&self, text: &str, spans: Vec<Span>) -> Vec<Span> {
        let doc_len = text.chars().count();

        let mut spans: Vec<Span> = spans
            .into_iter()
            .filter(|s| {
                let valid = s.is_valid_in(doc_len);
                if !valid {
                    log::warn!(
                        "dropping invalid span [{}, {}) {} in document of {} chars",
                        s.start,
                        s.end,
                        s.category,
                        doc_len
                    );
                }
                valid
            })
            .collect();

        spans = dedup_exact(spans);

        // Scoring is pure per span; the weight tables are read-only for the
        // duration of the batch.
        spans.par_iter_mut().for_each(|span| {
            let score = self.scorer.score_in_document(span, text);
            span.set_confidence(score.final_score);
        });

        if self.reasoner_enabled {
            self.reasoner.reason(text, &mut spans);
        }

        self.arbiter.drop_overlapping(spans)
    }
}

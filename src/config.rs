//! Externally loadable engine configuration.
//!
//! Weight tables and the rule table are data, not code: deployments ship
//! ML-optimized weight sets as JSON and the engine picks them up without a
//! rebuild. A missing or malformed configuration file is never fatal: the
//! engine falls back to built-in defaults and logs a warning, because
//! aborting document processing over a bad config is worse than running
//! with conservative defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::reasoner::{default_rules, Relationship, Rule};
use crate::scorer::ScoringWeights;
use crate::span::PhiCategory;
use crate::voter::VotingConfig;

/// Serde-visible rule specification, compiled into a [`Rule`] on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Rule identifier.
    pub name: String,
    /// First category label ("SSN", "PHONE", ...).
    pub type1: String,
    /// Second category label.
    pub type2: String,
    /// Conflict or support.
    pub relationship: Relationship,
    /// Effect strength in [0, 1].
    pub strength: f64,
    /// Optional regex that must match the pair's context windows.
    #[serde(default)]
    pub context_pattern: Option<String>,
    /// Human-readable rationale.
    #[serde(default)]
    pub description: String,
}

impl RuleSpec {
    /// Compile into a validated [`Rule`].
    pub fn compile(&self) -> Result<Rule> {
        Rule::new(
            &self.name,
            PhiCategory::from_label(&self.type1),
            PhiCategory::from_label(&self.type2),
            self.relationship,
            self.strength,
            self.context_pattern.as_deref(),
            &self.description,
        )
    }
}

/// Full engine configuration: scorer weights, voting config, rule table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Weights for [`crate::WeightedPhiScorer`].
    pub scoring: ScoringWeights,
    /// Config for [`crate::EnsembleVoter`].
    pub voting: VotingConfig,
    /// Rule table; `None` means the built-in [`default_rules`].
    pub rules: Option<Vec<RuleSpec>>,
}

impl EngineConfig {
    /// Load configuration from a JSON file.
    ///
    /// Never fails: a missing or malformed file yields the built-in
    /// defaults with a logged warning. Use [`EngineConfig::from_json`] for
    /// strict parsing.
    #[must_use]
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(config) => config,
                Err(e) => {
                    log::warn!(
                        "malformed config {}, using defaults: {e}",
                        path.display()
                    );
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!(
                    "unreadable config {}, using defaults: {e}",
                    path.display()
                );
                Self::default()
            }
        }
    }

    /// Parse configuration from a JSON string. Strict: errors propagate.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Compile the rule table.
    ///
    /// With no `rules` section the built-in table is used. Individual
    /// malformed rules are skipped with a warning; the valid remainder is
    /// kept.
    #[must_use]
    pub fn compiled_rules(&self) -> Vec<Rule> {
        match &self.rules {
            None => default_rules(),
            Some(specs) => specs
                .iter()
                .filter_map(|spec| match spec.compile() {
                    Ok(rule) => Some(rule),
                    Err(e) => {
                        log::warn!("skipping rule: {e}");
                        None
                    }
                })
                .collect(),
        }
    }
}

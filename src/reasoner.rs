//! Declarative cross-span consistency reasoning.
//!
//! A one-shot pipeline: **facts → rules → adjustments → adjusted spans**.
//! Facts are tuples derived from the span set (`Detected`, `Nearby`,
//! `SameText`, `Context`); rules are pure data joined against those facts.
//! No fixpoint iteration is needed: the adjustment graph has no cycles
//! through confidence, and all deltas are commutative sums applied once.
//!
//! Rules stay data (not code) so new PHI categories can be covered by adding
//! table entries at runtime instead of touching engine logic.
//!
//! The pairwise fact pass is O(n²) over the document's spans, which is fine
//! for per-document span counts in the low hundreds. This stage needs the
//! full span set before it can run; it is not incrementally updatable.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::scorer::{Window, WINDOW_RADIUS};
use crate::span::{PhiCategory, Span};
use crate::types::Confidence;

/// How two categories relate when their spans appear near each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relationship {
    /// The categories are mutually incompatible readings of the same kind of
    /// surface form (SSN vs PHONE); the weaker detection is penalized.
    Exclusive,
    /// The categories reinforce each other in context (NAME near a birth
    /// DATE); both detections are boosted.
    Supportive,
}

/// Penalty factor applied to `strength` for exclusive pairs.
const EXCLUSIVE_FACTOR: f64 = 0.25;
/// Boost factor applied to `strength` for supportive pairs.
const SUPPORTIVE_FACTOR: f64 = 0.10;
/// Boost for spans matching their text group's majority category.
const CONSISTENCY_BOOST: f64 = 0.10;
/// Penalty for spans contradicting their text group's majority category
/// (half the conflict penalty).
const CONSISTENCY_PENALTY: f64 = -0.125;
/// Maximum character gap for two spans to count as `Nearby`.
const DEFAULT_PROXIMITY_WINDOW: usize = 200;

/// A declarative cross-span rule.
///
/// Rules are data: constructing one validates the strength bound and
/// compiles the optional context pattern, after which evaluation cannot
/// fail on this rule.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Identifier, surfaced in provenance.
    pub name: String,
    /// First category of the pair (order-insensitive at match time).
    pub type1: PhiCategory,
    /// Second category of the pair.
    pub type2: PhiCategory,
    /// Conflict or support.
    pub relationship: Relationship,
    /// Effect strength in [0, 1].
    pub strength: f64,
    /// Optional pattern that must match the concatenated context windows of
    /// both spans for the rule to fire.
    context_pattern: Option<Regex>,
    /// Human-readable rationale.
    pub description: String,
}

impl Rule {
    /// Create a rule, validating the strength bound and compiling the
    /// optional context pattern.
    pub fn new(
        name: impl Into<String>,
        type1: PhiCategory,
        type2: PhiCategory,
        relationship: Relationship,
        strength: f64,
        context_pattern: Option<&str>,
        description: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        let strength = Confidence::new(strength)
            .ok_or_else(|| {
                Error::invalid_rule(&name, format!("strength {strength} outside [0, 1]"))
            })?
            .get();
        let context_pattern = match context_pattern {
            Some(p) => Some(
                Regex::new(p)
                    .map_err(|e| Error::invalid_rule(&name, format!("bad context pattern: {e}")))?,
            ),
            None => None,
        };
        Ok(Self {
            name,
            type1,
            type2,
            relationship,
            strength,
            context_pattern,
            description: description.into(),
        })
    }

    /// Whether this rule covers the given category pair, in either order.
    #[must_use]
    pub fn matches_pair(&self, a: &PhiCategory, b: &PhiCategory) -> bool {
        (self.type1 == *a && self.type2 == *b) || (self.type1 == *b && self.type2 == *a)
    }

    fn context_matches(&self, joined_windows: &str) -> bool {
        match &self.context_pattern {
            Some(re) => re.is_match(joined_windows),
            None => true,
        }
    }
}

/// The built-in rule table.
///
/// Exclusive rules pair categories that share surface form; supportive rules
/// pair categories that co-occur in identifying context.
#[must_use]
pub fn default_rules() -> Vec<Rule> {
    // Literal data. Patterns here are fixed and known-good, so construction
    // cannot fail; an error would be a bug in this table.
    let specs: [(&str, PhiCategory, PhiCategory, Relationship, f64, Option<&str>, &str); 8] = [
        (
            "SSN_PHONE_EXCLUSIVE",
            PhiCategory::Ssn,
            PhiCategory::Phone,
            Relationship::Exclusive,
            0.8,
            None,
            "Nine-digit groups read as either SSN or phone, not both",
        ),
        (
            "DATE_AGE_EXCLUSIVE",
            PhiCategory::Date,
            PhiCategory::Age,
            Relationship::Exclusive,
            0.6,
            None,
            "Small integers near dates are usually the date's parts, not ages",
        ),
        (
            "MRN_ZIP_EXCLUSIVE",
            PhiCategory::Mrn,
            PhiCategory::Zipcode,
            Relationship::Exclusive,
            0.7,
            None,
            "Five-to-eight digit runs read as either MRN or ZIP",
        ),
        (
            "ACCOUNT_PHONE_EXCLUSIVE",
            PhiCategory::Account,
            PhiCategory::Phone,
            Relationship::Exclusive,
            0.5,
            None,
            "Long digit runs read as either account number or phone",
        ),
        (
            "NAME_DATE_BIRTH_SUPPORTIVE",
            PhiCategory::Name,
            PhiCategory::Date,
            Relationship::Supportive,
            0.7,
            Some(r"(?i)\b(?:born|birth|dob)\b"),
            "A name near a birth-marked date is almost certainly a patient",
        ),
        (
            "NAME_MRN_SUPPORTIVE",
            PhiCategory::Name,
            PhiCategory::Mrn,
            Relationship::Supportive,
            0.5,
            None,
            "Names co-occurring with record numbers identify patients",
        ),
        (
            "ADDRESS_ZIP_SUPPORTIVE",
            PhiCategory::Address,
            PhiCategory::Zipcode,
            Relationship::Supportive,
            0.6,
            None,
            "Street addresses and ZIP codes corroborate each other",
        ),
        (
            "PROVIDER_ROLE_SUPPORTIVE",
            PhiCategory::ProviderName,
            PhiCategory::Name,
            Relationship::Supportive,
            0.4,
            Some(r"(?i)\b(?:attending|physician|surgeon|provider)\b"),
            "Provider and patient names cluster in signature blocks",
        ),
    ];

    specs
        .into_iter()
        .filter_map(|(name, t1, t2, rel, strength, pattern, desc)| {
            match Rule::new(name, t1, t2, rel, strength, pattern, desc) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    log::warn!("skipping built-in rule: {e}");
                    None
                }
            }
        })
        .collect()
}

/// One rule application, retained for audit.
#[derive(Debug, Clone)]
pub struct RuleFiring {
    /// Rule (or pass) that fired.
    pub rule: String,
    /// Index of the adjusted span in the input slice.
    pub span_index: usize,
    /// Signed confidence delta contributed.
    pub delta: f64,
}

// Derived facts, kept as plain tuples over span indices.
struct NearbyFact {
    a: usize,
    b: usize,
}

struct ContextFact {
    window: Window,
}

/// Declarative rule engine adjusting scored spans' confidences based on
/// pairwise relationships and document-level text consistency.
#[derive(Debug)]
pub struct DatalogReasoner {
    rules: Vec<Rule>,
    proximity_window: usize,
}

impl Default for DatalogReasoner {
    fn default() -> Self {
        Self {
            rules: default_rules(),
            proximity_window: DEFAULT_PROXIMITY_WINDOW,
        }
    }
}

impl DatalogReasoner {
    /// Create a reasoner with the built-in rule table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a reasoner with an explicit rule table.
    #[must_use]
    pub fn with_rules(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            proximity_window: DEFAULT_PROXIMITY_WINDOW,
        }
    }

    /// Override the `Nearby` proximity window (characters).
    #[must_use]
    pub fn with_proximity_window(mut self, window: usize) -> Self {
        self.proximity_window = window;
        self
    }

    /// Add a rule at runtime.
    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// The active rule table.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Adjust span confidences in place; returns the rule firings in
    /// application order.
    ///
    /// This stage is a confidence refinement, not a correctness step: if
    /// evaluation fails the span set is returned unmodified and a warning is
    /// logged. Never fatal.
    pub fn reason(&self, text: &str, spans: &mut [Span]) -> Vec<RuleFiring> {
        // Compute all deltas before mutating anything so a failure cannot
        // leave the span set half-adjusted.
        match self.evaluate(text, spans) {
            Ok(firings) => {
                let mut deltas = vec![0.0; spans.len()];
                for f in &firings {
                    deltas[f.span_index] += f.delta;
                }
                for (span, delta) in spans.iter_mut().zip(deltas) {
                    if delta != 0.0 {
                        span.adjust_confidence(delta);
                        span.annotate_pattern(";reasoned");
                    }
                }
                firings
            }
            Err(e) => {
                log::warn!("reasoning pass failed, spans left unmodified: {e}");
                Vec::new()
            }
        }
    }

    /// Build facts and join the rule table against them. Pure with respect
    /// to the span set.
    fn evaluate(&self, text: &str, spans: &[Span]) -> Result<Vec<RuleFiring>> {
        let mut firings = Vec::new();

        // Context(id, before, after)
        let contexts: Vec<ContextFact> = spans
            .iter()
            .map(|s| ContextFact {
                window: Window::around(text, s.start, s.end, WINDOW_RADIUS),
            })
            .collect();

        // Nearby(id1, id2): symmetric, gap within the proximity window.
        let mut nearby = Vec::new();
        for i in 0..spans.len() {
            for j in (i + 1)..spans.len() {
                if spans[i].gap_to(&spans[j]) <= self.proximity_window {
                    nearby.push(NearbyFact { a: i, b: j });
                }
            }
        }

        // Join rules against Nearby pairs.
        for pair in &nearby {
            let (a, b) = (pair.a, pair.b);
            for rule in &self.rules {
                if !rule.matches_pair(&spans[a].category, &spans[b].category) {
                    continue;
                }
                if rule.context_pattern.is_some() {
                    let joined = format!(
                        "{} {} {} {}",
                        contexts[a].window.before,
                        contexts[a].window.after,
                        contexts[b].window.before,
                        contexts[b].window.after
                    );
                    if !rule.context_matches(&joined) {
                        continue;
                    }
                }

                match rule.relationship {
                    Relationship::Exclusive => {
                        let delta = -(rule.strength * EXCLUSIVE_FACTOR);
                        if !delta.is_finite() {
                            return Err(Error::reasoning(format!(
                                "non-finite delta from rule {}",
                                rule.name
                            )));
                        }
                        // Penalize the lower-confidence member of the pair.
                        let loser = if spans[a].confidence() <= spans[b].confidence() {
                            a
                        } else {
                            b
                        };
                        log::debug!("{} fired on span {loser} ({delta:+.3})", rule.name);
                        firings.push(RuleFiring {
                            rule: rule.name.clone(),
                            span_index: loser,
                            delta,
                        });
                    }
                    Relationship::Supportive => {
                        let delta = rule.strength * SUPPORTIVE_FACTOR;
                        if !delta.is_finite() {
                            return Err(Error::reasoning(format!(
                                "non-finite delta from rule {}",
                                rule.name
                            )));
                        }
                        for idx in [a, b] {
                            log::debug!("{} fired on span {idx} ({delta:+.3})", rule.name);
                            firings.push(RuleFiring {
                                rule: rule.name.clone(),
                                span_index: idx,
                                delta,
                            });
                        }
                    }
                }
            }
        }

        // Document-level consistency: SameText groups with a majority
        // category reward agreement and penalize contradiction, so one
        // recurring surface string is not typed inconsistently across the
        // document.
        firings.extend(self.text_consistency(spans));

        Ok(firings)
    }

    fn text_consistency(&self, spans: &[Span]) -> Vec<RuleFiring> {
        use std::collections::HashMap;

        let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, span) in spans.iter().enumerate() {
            groups.entry(span.normalized_text()).or_default().push(i);
        }

        let mut firings = Vec::new();
        // Deterministic order: iterate groups by their first member index,
        // not map order.
        let mut group_list: Vec<(String, Vec<usize>)> = groups.into_iter().collect();
        group_list.sort_by_key(|(_, members)| members[0]);

        for (_, members) in group_list {
            if members.len() < 2 {
                continue;
            }

            // Majority category; ties broken by specificity then label so
            // the outcome never depends on map iteration order.
            let mut counts: HashMap<&PhiCategory, usize> = HashMap::new();
            for &i in &members {
                *counts.entry(&spans[i].category).or_default() += 1;
            }
            let majority = counts
                .iter()
                .max_by(|(ca, na), (cb, nb)| {
                    na.cmp(nb)
                        .then_with(|| ca.specificity().cmp(&cb.specificity()))
                        .then_with(|| cb.as_label().cmp(ca.as_label()))
                })
                .map(|(c, _)| (*c).clone());

            let Some(majority) = majority else { continue };

            for &i in &members {
                let (rule, delta) = if spans[i].category == majority {
                    ("TEXT_CONSISTENCY_MATCH", CONSISTENCY_BOOST)
                } else {
                    ("TEXT_CONSISTENCY_CONFLICT", CONSISTENCY_PENALTY)
                };
                firings.push(RuleFiring {
                    rule: rule.to_string(),
                    span_index: i,
                    delta,
                });
            }
        }

        firings
    }
}

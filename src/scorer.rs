//! Weighted PHI scoring: pattern-tier weights, context bonuses, and
//! medical-vocabulary whitelist penalties.
//!
//! This is the fusion path used when a raw span plus its surrounding text
//! window is available rather than a discrete signal list. The score is a
//! sum of three parts:
//!
//! 1. A base weight from the span's category or name-pattern tier.
//! 2. Additive context bonuses from four independent regex classes over the
//!    ±100-character window.
//! 3. At most one whitelist penalty for NAME spans whose surface form is
//!    medical vocabulary rather than a person (checked in strict priority
//!    order; the first match returns).
//!
//! Every contributing term is recorded in a breakdown list so false
//! positives and negatives can be debugged from the audit trail alone.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::span::{clamp01, NameTier, PhiCategory, Span};

/// Categorical band of a scoring result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScoreBand {
    /// Above `threshold + 0.15`: treat as PHI.
    Phi,
    /// Below `threshold - 0.15`: treat as not PHI.
    NotPhi,
    /// In between; caller decides.
    Uncertain,
}

/// One contributing term in a score breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreTerm {
    /// Which table or regex class produced the term.
    pub source: String,
    /// Signed contribution to the final score.
    pub value: f64,
}

/// Result of scoring one span against its context window.
#[derive(Debug, Clone)]
pub struct PhiScore {
    /// `clamp01(base + context_bonus + whitelist_penalty)`.
    pub final_score: f64,
    /// Category/tier base weight.
    pub base_score: f64,
    /// Sum of context bonuses (≥ 0).
    pub context_bonus: f64,
    /// Whitelist penalty (≤ 0; at most one table fires).
    pub whitelist_penalty: f64,
    /// Banded recommendation.
    pub recommendation: ScoreBand,
    /// Every contributing term, for audit.
    pub breakdown: Vec<ScoreTerm>,
}

/// Flat weight table for [`WeightedPhiScorer`]. All fields are serde-visible
/// so externally optimized weight sets can be loaded at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Base weight for "Last, First" formatted names.
    pub name_last_comma_first: f64,
    /// Base weight for names adjacent to a patient label.
    pub name_patient_label: f64,
    /// Base weight for title-prefixed names.
    pub name_titled: f64,
    /// Base weight for names introduced by a family-relation term.
    pub name_family_relation: f64,
    /// Base weight for generic capitalized full names.
    pub name_full: f64,
    /// Base weight for structured/high-precision categories.
    pub structured: f64,

    /// Bonus when a title immediately precedes the span.
    pub ctx_title_prefix: f64,
    /// Bonus when family-relationship terms appear in the window.
    pub ctx_family_terms: f64,
    /// Bonus when a PHI field label appears in the window.
    pub ctx_phi_label: f64,
    /// Bonus when a clinical-role marker appears in the window.
    pub ctx_clinical_role: f64,

    /// Penalty for exact disease-eponym matches ("parkinson's").
    pub wl_disease_eponym: f64,
    /// Penalty for disease-name substrings.
    pub wl_disease_name: f64,
    /// Penalty for medication substrings.
    pub wl_medication: f64,
    /// Penalty for procedure substrings.
    pub wl_procedure: f64,
    /// Penalty for exact anatomical terms.
    pub wl_anatomical: f64,
    /// Penalty for section-header substrings.
    pub wl_section_header: f64,
    /// Penalty for organization substrings.
    pub wl_organization: f64,

    /// Center of the recommendation bands (bands are ± 0.15).
    pub threshold: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            name_last_comma_first: 0.95,
            name_patient_label: 0.92,
            name_titled: 0.90,
            name_family_relation: 0.80,
            name_full: 0.70,
            structured: 0.90,

            ctx_title_prefix: 0.10,
            ctx_family_terms: 0.08,
            ctx_phi_label: 0.15,
            ctx_clinical_role: 0.12,

            wl_disease_eponym: -0.60,
            wl_disease_name: -0.40,
            wl_medication: -0.45,
            wl_procedure: -0.35,
            wl_anatomical: -0.50,
            wl_section_header: -0.30,
            wl_organization: -0.25,

            threshold: 0.50,
        }
    }
}

/// The ±N-character text window around a span.
#[derive(Debug, Clone, Default)]
pub struct Window {
    /// Up to N characters before the span start.
    pub before: String,
    /// Up to N characters after the span end.
    pub after: String,
}

/// Window radius used throughout the engine.
pub const WINDOW_RADIUS: usize = 100;

impl Window {
    /// Extract the ±`radius`-character window around `[start, end)` in
    /// `text`. Positions are character offsets; out-of-range positions
    /// produce empty sides rather than panicking.
    #[must_use]
    pub fn around(text: &str, start: usize, end: usize, radius: usize) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let start = start.min(chars.len());
        let end = end.min(chars.len());
        let before_from = start.saturating_sub(radius);
        let after_to = (end + radius).min(chars.len());
        Self {
            before: chars[before_from..start].iter().collect(),
            after: chars[end..after_to].iter().collect(),
        }
    }

    /// Both sides concatenated, for patterns that may match anywhere.
    #[must_use]
    pub fn joined(&self) -> String {
        format!("{} {}", self.before, self.after)
    }
}

// Context regex classes. Four independent signals; bonuses are additive,
// not mutually exclusive.
static TITLE_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:mr|mrs|ms|dr|prof)\.?\s*$").unwrap()
});
static FAMILY_TERMS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:mother|father|sister|brother|daughter|son|wife|husband|spouse|aunt|uncle|cousin|grandmother|grandfather|guardian|next of kin)\b",
    )
    .unwrap()
});
static PHI_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:name|patient|pt|dob|mrn|ssn|acct|account)\s*[:#]").unwrap()
});
static CLINICAL_ROLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:performed by|dictated by|signed by|reviewed by|attending|surgeon|physician|provider)\b",
    )
    .unwrap()
});

// Medical-vocabulary whitelists. Surface forms that look like names but are
// clinical vocabulary. Checked against the normalized span text; tables are
// ordered by check priority and only the first match penalizes.
const DISEASE_EPONYMS: &[&str] = &[
    "parkinson's",
    "parkinsons",
    "alzheimer's",
    "alzheimers",
    "hodgkin's",
    "crohn's",
    "addison's",
    "cushing's",
    "graves'",
    "huntington's",
    "wilson's",
    "bell's palsy",
    "raynaud's",
    "sjogren's",
    "tourette's",
    "down syndrome",
    "marfan syndrome",
    "barrett's",
    "wernicke's",
    "broca's",
];

const DISEASE_NAMES: &[&str] = &[
    "diabetes",
    "hypertension",
    "asthma",
    "pneumonia",
    "anemia",
    "carcinoma",
    "melanoma",
    "lymphoma",
    "leukemia",
    "sepsis",
    "arthritis",
    "hepatitis",
    "nephritis",
    "dementia",
    "epilepsy",
    "migraine",
    "fibrosis",
    "stenosis",
    "embolism",
    "infarction",
];

const MEDICATIONS: &[&str] = &[
    "aspirin",
    "metformin",
    "lisinopril",
    "atorvastatin",
    "insulin",
    "warfarin",
    "ibuprofen",
    "acetaminophen",
    "prednisone",
    "amoxicillin",
    "omeprazole",
    "metoprolol",
    "amlodipine",
    "gabapentin",
    "hydrochlorothiazide",
    "levothyroxine",
    "albuterol",
    "furosemide",
];

const PROCEDURES: &[&str] = &[
    "biopsy",
    "endoscopy",
    "colonoscopy",
    "angioplasty",
    "appendectomy",
    "catheterization",
    "intubation",
    "dialysis",
    "transfusion",
    "resection",
    "laparoscopy",
    "bypass",
    "arthroplasty",
    "thoracotomy",
];

const ANATOMICAL_TERMS: &[&str] = &[
    "femur",
    "tibia",
    "fibula",
    "patella",
    "humerus",
    "aorta",
    "ventricle",
    "atrium",
    "cornea",
    "retina",
    "duodenum",
    "esophagus",
    "pancreas",
    "thyroid",
    "trachea",
    "clavicle",
    "sternum",
];

const SECTION_HEADERS: &[&str] = &[
    "history of present illness",
    "past medical history",
    "review of systems",
    "chief complaint",
    "assessment and plan",
    "physical exam",
    "discharge summary",
    "hospital course",
    "family history",
    "social history",
    "medications on admission",
];

const ORGANIZATIONS: &[&str] = &[
    "hospital",
    "clinic",
    "medical center",
    "health system",
    "department",
    "laboratory",
    "pharmacy",
    "radiology",
    "cardiology",
    "oncology",
    "university",
    "institute",
];

/// Weighted scorer for raw spans plus their surrounding text windows.
///
/// Weights are swappable at runtime ([`WeightedPhiScorer::set_weights`],
/// [`WeightedPhiScorer::set_threshold`]) to support externally optimized
/// weight sets. `score` itself is pure and safe to fan out across threads
/// while the weight tables are not being swapped.
#[derive(Debug, Clone, Default)]
pub struct WeightedPhiScorer {
    weights: ScoringWeights,
}

impl WeightedPhiScorer {
    /// Create a scorer with the built-in default weights.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scorer with explicit weights.
    #[must_use]
    pub fn with_weights(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    /// The active weight table.
    #[must_use]
    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Replace the full weight table.
    pub fn set_weights(&mut self, weights: ScoringWeights) {
        self.weights = weights;
    }

    /// Replace only the recommendation threshold.
    pub fn set_threshold(&mut self, threshold: f64) {
        self.weights.threshold = clamp01(threshold);
    }

    /// Score a span against its context window.
    #[must_use]
    pub fn score(&self, span: &Span, window: &Window) -> PhiScore {
        let mut breakdown = Vec::new();

        let base_score = self.base_score(span, &mut breakdown);
        let context_bonus = self.context_bonus(window, &mut breakdown);
        let whitelist_penalty = self.whitelist_penalty(span, &mut breakdown);

        let final_score = clamp01(base_score + context_bonus + whitelist_penalty);

        let recommendation = if final_score > self.weights.threshold + 0.15 {
            ScoreBand::Phi
        } else if final_score < self.weights.threshold - 0.15 {
            ScoreBand::NotPhi
        } else {
            ScoreBand::Uncertain
        };

        PhiScore {
            final_score,
            base_score,
            context_bonus,
            whitelist_penalty,
            recommendation,
            breakdown,
        }
    }

    /// Convenience: extract the ±100-character window from the document and
    /// score against it.
    #[must_use]
    pub fn score_in_document(&self, span: &Span, text: &str) -> PhiScore {
        let window = Window::around(text, span.start, span.end, WINDOW_RADIUS);
        self.score(span, &window)
    }

    fn base_score(&self, span: &Span, breakdown: &mut Vec<ScoreTerm>) -> f64 {
        if span.category.is_structured() {
            breakdown.push(ScoreTerm {
                source: format!("base:structured:{}", span.category),
                value: self.weights.structured,
            });
            return self.weights.structured;
        }

        if matches!(span.category, PhiCategory::Name | PhiCategory::ProviderName) {
            let tier = span.name_tier.or_else(|| {
                span.pattern
                    .as_deref()
                    .and_then(NameTier::from_pattern_id)
            });
            if let Some(tier) = tier {
                let (label, weight) = match tier {
                    NameTier::LastCommaFirst => {
                        ("base:name:last_comma_first", self.weights.name_last_comma_first)
                    }
                    NameTier::Titled => ("base:name:titled", self.weights.name_titled),
                    NameTier::PatientLabel => {
                        ("base:name:patient_label", self.weights.name_patient_label)
                    }
                    NameTier::FamilyRelation => {
                        ("base:name:family_relation", self.weights.name_family_relation)
                    }
                    NameTier::FullName => ("base:name:full", self.weights.name_full),
                };
                breakdown.push(ScoreTerm {
                    source: label.to_string(),
                    value: weight,
                });
                return weight;
            }
        }

        // No special case: fall back to the span's own prior confidence.
        let prior = span.confidence();
        breakdown.push(ScoreTerm {
            source: "base:prior".to_string(),
            value: prior,
        });
        prior
    }

    fn context_bonus(&self, window: &Window, breakdown: &mut Vec<ScoreTerm>) -> f64 {
        let mut bonus = 0.0;
        let joined = window.joined();

        if TITLE_PREFIX.is_match(&window.before) {
            bonus += self.weights.ctx_title_prefix;
            breakdown.push(ScoreTerm {
                source: "context:title_prefix".to_string(),
                value: self.weights.ctx_title_prefix,
            });
        }
        if FAMILY_TERMS.is_match(&joined) {
            bonus += self.weights.ctx_family_terms;
            breakdown.push(ScoreTerm {
                source: "context:family_terms".to_string(),
                value: self.weights.ctx_family_terms,
            });
        }
        if PHI_LABEL.is_match(&joined) {
            bonus += self.weights.ctx_phi_label;
            breakdown.push(ScoreTerm {
                source: "context:phi_label".to_string(),
                value: self.weights.ctx_phi_label,
            });
        }
        if CLINICAL_ROLE.is_match(&joined) {
            bonus += self.weights.ctx_clinical_role;
            breakdown.push(ScoreTerm {
                source: "context:clinical_role".to_string(),
                value: self.weights.ctx_clinical_role,
            });
        }

        bonus
    }

    /// Whitelist checks in strict priority order. Only the first matching
    /// table penalizes: a name that is both a disease eponym and happens to
    /// contain a medication substring is penalized once, at the eponym
    /// weight.
    fn whitelist_penalty(&self, span: &Span, breakdown: &mut Vec<ScoreTerm>) -> f64 {
        if !matches!(span.category, PhiCategory::Name | PhiCategory::ProviderName) {
            return 0.0;
        }
        let normalized = span.normalized_text();

        let tables: [(&str, &[&str], bool, f64); 7] = [
            ("whitelist:disease_eponym", DISEASE_EPONYMS, true, self.weights.wl_disease_eponym),
            ("whitelist:disease_name", DISEASE_NAMES, false, self.weights.wl_disease_name),
            ("whitelist:medication", MEDICATIONS, false, self.weights.wl_medication),
            ("whitelist:procedure", PROCEDURES, false, self.weights.wl_procedure),
            ("whitelist:anatomical", ANATOMICAL_TERMS, true, self.weights.wl_anatomical),
            ("whitelist:section_header", SECTION_HEADERS, false, self.weights.wl_section_header),
            ("whitelist:organization", ORGANIZATIONS, false, self.weights.wl_organization),
        ];

        for (label, table, exact, weight) in tables {
            let hit = if exact {
                table.contains(&normalized.as_str())
            } else {
                table.iter().any(|term| normalized.contains(term))
            };
            if hit {
                breakdown.push(ScoreTerm {
                    source: label.to_string(),
                    value: weight,
                });
                return weight;
            }
        }

        0.0
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn final_score_always_bounded(
            conf in 0.0f64..=1.0,
            text in "[A-Za-z' ]{1,30}",
        ) {
            let scorer = WeightedPhiScorer::new();
            let len = text.chars().count().max(1);
            let span = Span::new(text, PhiCategory::Name, 0, len, conf)
                .with_pattern("full_name");
            let score = scorer.score(&span, &Window::default());
            prop_assert!(score.final_score >= 0.0);
            prop_assert!(score.final_score <= 1.0);
        }

        #[test]
        fn at_most_one_whitelist_term(text in "[a-z' ]{1,40}") {
            let scorer = WeightedPhiScorer::new();
            let len = text.chars().count().max(1);
            let span = Span::new(text, PhiCategory::Name, 0, len, 0.5)
                .with_pattern("full_name");
            let score = scorer.score(&span, &Window::default());
            let penalties = score
                .breakdown
                .iter()
                .filter(|t| t.source.starts_with("whitelist:"))
                .count();
            prop_assert!(penalties <= 1);
        }
    }
}

//! Candidate span types and the PHI category table.

use serde::{Deserialize, Serialize};

/// PHI category classification.
///
/// Closed category set shared with upstream detectors. Adding a new category
/// here requires updating [`PhiCategory::specificity`] and
/// [`PhiCategory::default_priority`] as well, or the new category receives
/// the low default specificity (25).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhiCategory {
    /// Patient or other person name
    Name,
    /// Clinician/provider name
    ProviderName,
    /// Social Security number
    Ssn,
    /// Date (admission, birth, service)
    Date,
    /// Phone number
    Phone,
    /// Fax number
    Fax,
    /// Email address
    Email,
    /// Street address
    Address,
    /// Medical record number
    Mrn,
    /// National Provider Identifier
    Npi,
    /// ZIP code
    Zipcode,
    /// City
    City,
    /// State
    State,
    /// Age (over-89 ages are PHI under Safe Harbor)
    Age,
    /// Credit card number
    CreditCard,
    /// Account number
    Account,
    /// IP address
    Ip,
    /// URL
    Url,
    /// Device identifier/serial
    Device,
    /// Occupation
    Occupation,
    /// Site-defined category
    Custom(String),
}

impl PhiCategory {
    /// Convert to canonical label string.
    #[must_use]
    pub fn as_label(&self) -> &str {
        match self {
            PhiCategory::Name => "NAME",
            PhiCategory::ProviderName => "PROVIDER_NAME",
            PhiCategory::Ssn => "SSN",
            PhiCategory::Date => "DATE",
            PhiCategory::Phone => "PHONE",
            PhiCategory::Fax => "FAX",
            PhiCategory::Email => "EMAIL",
            PhiCategory::Address => "ADDRESS",
            PhiCategory::Mrn => "MRN",
            PhiCategory::Npi => "NPI",
            PhiCategory::Zipcode => "ZIPCODE",
            PhiCategory::City => "CITY",
            PhiCategory::State => "STATE",
            PhiCategory::Age => "AGE",
            PhiCategory::CreditCard => "CREDIT_CARD",
            PhiCategory::Account => "ACCOUNT",
            PhiCategory::Ip => "IP",
            PhiCategory::Url => "URL",
            PhiCategory::Device => "DEVICE",
            PhiCategory::Occupation => "OCCUPATION",
            PhiCategory::Custom(s) => s.as_str(),
        }
    }

    /// Parse from label string.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.to_uppercase().as_str() {
            "NAME" | "PATIENT" | "PATIENT_NAME" => PhiCategory::Name,
            "PROVIDER_NAME" | "PROVIDER" | "PHYSICIAN" => PhiCategory::ProviderName,
            "SSN" => PhiCategory::Ssn,
            "DATE" | "DOB" => PhiCategory::Date,
            "PHONE" | "TELEPHONE" => PhiCategory::Phone,
            "FAX" => PhiCategory::Fax,
            "EMAIL" => PhiCategory::Email,
            "ADDRESS" | "STREET" => PhiCategory::Address,
            "MRN" | "MEDICAL_RECORD" => PhiCategory::Mrn,
            "NPI" => PhiCategory::Npi,
            "ZIPCODE" | "ZIP" => PhiCategory::Zipcode,
            "CITY" => PhiCategory::City,
            "STATE" => PhiCategory::State,
            "AGE" => PhiCategory::Age,
            "CREDIT_CARD" | "CC" => PhiCategory::CreditCard,
            "ACCOUNT" => PhiCategory::Account,
            "IP" | "IP_ADDRESS" => PhiCategory::Ip,
            "URL" => PhiCategory::Url,
            "DEVICE" => PhiCategory::Device,
            "OCCUPATION" => PhiCategory::Occupation,
            other => PhiCategory::Custom(other.to_string()),
        }
    }

    /// Static trustworthiness rank used when two spans compete for the same
    /// text. Structured identifiers outrank free-text categories.
    #[must_use]
    pub fn specificity(&self) -> u32 {
        match self {
            PhiCategory::Ssn => 100,
            PhiCategory::Mrn => 95,
            PhiCategory::Npi => 92,
            PhiCategory::CreditCard => 90,
            PhiCategory::Account => 88,
            PhiCategory::Email => 85,
            PhiCategory::Phone => 82,
            PhiCategory::Fax => 80,
            PhiCategory::Ip => 78,
            PhiCategory::Url => 75,
            PhiCategory::Zipcode => 70,
            PhiCategory::Date => 60,
            PhiCategory::Age => 55,
            PhiCategory::Device => 50,
            PhiCategory::Address => 45,
            PhiCategory::City => 42,
            PhiCategory::State => 40,
            PhiCategory::ProviderName => 38,
            PhiCategory::Name => 35,
            PhiCategory::Occupation => 30,
            PhiCategory::Custom(_) => 25,
        }
    }

    /// Default redaction priority for spans that arrive without one.
    #[must_use]
    pub fn default_priority(&self) -> u32 {
        match self {
            PhiCategory::Ssn | PhiCategory::CreditCard => 100,
            PhiCategory::Mrn | PhiCategory::Npi | PhiCategory::Account => 95,
            PhiCategory::Email | PhiCategory::Phone | PhiCategory::Fax => 90,
            PhiCategory::Name | PhiCategory::ProviderName => 75,
            PhiCategory::Date | PhiCategory::Age => 60,
            PhiCategory::Address | PhiCategory::Zipcode => 55,
            PhiCategory::City | PhiCategory::State => 45,
            PhiCategory::Ip | PhiCategory::Url | PhiCategory::Device => 40,
            PhiCategory::Occupation => 30,
            PhiCategory::Custom(_) => 25,
        }
    }

    /// Whether the category is identified by format alone (regex-detectable)
    /// rather than by linguistic context.
    #[must_use]
    pub fn is_structured(&self) -> bool {
        matches!(
            self,
            PhiCategory::Ssn
                | PhiCategory::Email
                | PhiCategory::Phone
                | PhiCategory::Fax
                | PhiCategory::Mrn
                | PhiCategory::Npi
                | PhiCategory::CreditCard
                | PhiCategory::Account
                | PhiCategory::Ip
                | PhiCategory::Url
        )
    }
}

impl std::fmt::Display for PhiCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_label())
    }
}

/// Name-pattern tier, assigned once when a span is constructed.
///
/// Upstream name detectors tag spans with a pattern id; the tier is derived
/// from that id here so scoring dispatches on a closed enum instead of
/// re-parsing the string on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NameTier {
    /// "Doe, Jane" format
    LastCommaFirst,
    /// Title-prefixed name ("Dr. Jane Doe")
    Titled,
    /// Name adjacent to a patient label ("Patient: Jane Doe")
    PatientLabel,
    /// Name introduced by a family-relation term ("her mother, Jane Doe")
    FamilyRelation,
    /// Generic capitalized full name
    FullName,
}

impl NameTier {
    /// Derive the tier from a detector pattern id.
    ///
    /// Checks are case-insensitive substring matches in fixed priority
    /// order; the first match wins.
    #[must_use]
    pub fn from_pattern_id(pattern: &str) -> Option<Self> {
        let p = pattern.to_lowercase();
        if p.contains("last,first") || p.contains("last_first") || p.contains("lastfirst") {
            Some(NameTier::LastCommaFirst)
        } else if p.contains("title") {
            Some(NameTier::Titled)
        } else if p.contains("patient") {
            Some(NameTier::PatientLabel)
        } else if p.contains("family") || p.contains("relation") {
            Some(NameTier::FamilyRelation)
        } else if p.contains("name") {
            Some(NameTier::FullName)
        } else {
            None
        }
    }
}

/// A candidate PHI span: a scored, categorized character range.
///
/// Positions are character offsets, half-open `[start, end)`. The engine
/// mutates `confidence` in place as spans move through scoring, reasoning,
/// and arbitration; all writes go through [`Span::set_confidence`] or
/// [`Span::adjust_confidence`], which re-clamp to `[0, 1]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Span {
    /// Start position (character offset, inclusive)
    pub start: usize,
    /// End position (character offset, exclusive)
    pub end: usize,
    /// PHI category
    pub category: PhiCategory,
    /// Matched surface text
    pub text: String,
    /// Confidence score in [0, 1]
    confidence: f64,
    /// Redaction priority (upstream contract; higher = more urgent)
    pub priority: u32,
    /// Identifier of the rule/regex that produced this span
    pub pattern: Option<String>,
    /// Name-pattern tier, derived from `pattern` at construction
    pub name_tier: Option<NameTier>,
    /// Whether the span has been applied to output text
    pub applied: bool,
    /// Whether the span was explicitly suppressed
    pub ignored: bool,
}

impl Span {
    /// Create a new span. Confidence is clamped to [0, 1]; the priority
    /// defaults from the category table.
    #[must_use]
    pub fn new(
        text: impl Into<String>,
        category: PhiCategory,
        start: usize,
        end: usize,
        confidence: f64,
    ) -> Self {
        let priority = category.default_priority();
        Self {
            start,
            end,
            category,
            text: text.into(),
            confidence: clamp01(confidence),
            priority,
            pattern: None,
            name_tier: None,
            applied: false,
            ignored: false,
        }
    }

    /// Attach the producing pattern id, deriving the name tier for NAME and
    /// PROVIDER_NAME spans.
    #[must_use]
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        if matches!(
            self.category,
            PhiCategory::Name | PhiCategory::ProviderName
        ) {
            self.name_tier = NameTier::from_pattern_id(&pattern);
        }
        self.pattern = Some(pattern);
        self
    }

    /// Override the redaction priority.
    #[must_use]
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Current confidence, guaranteed in [0, 1].
    #[must_use]
    #[inline]
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Set confidence, clamping to [0, 1].
    #[inline]
    pub fn set_confidence(&mut self, confidence: f64) {
        self.confidence = clamp01(confidence);
    }

    /// Add a (possibly negative) delta to confidence, clamping to [0, 1].
    #[inline]
    pub fn adjust_confidence(&mut self, delta: f64) {
        self.confidence = clamp01(self.confidence + delta);
    }

    /// Span length in characters.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// True when the range is degenerate.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Range validity: non-empty and inside the document.
    #[must_use]
    pub fn is_valid_in(&self, doc_len: usize) -> bool {
        self.start < self.end && self.end <= doc_len
    }

    /// Check if this span overlaps another.
    #[must_use]
    pub fn overlaps(&self, other: &Span) -> bool {
        !(self.end <= other.start || other.end <= self.start)
    }

    /// Check if this span fully contains another.
    #[must_use]
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Character gap to another span: `min(|end1 - start2|, |end2 - start1|)`.
    /// Overlapping spans have gap 0.
    #[must_use]
    pub fn gap_to(&self, other: &Span) -> usize {
        if self.overlaps(other) {
            return 0;
        }
        let d1 = self.end.abs_diff(other.start);
        let d2 = other.end.abs_diff(self.start);
        d1.min(d2)
    }

    /// Surface text lower-cased with whitespace runs collapsed to one space.
    #[must_use]
    pub fn normalized_text(&self) -> String {
        self.text
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }

    /// Append a trace suffix to the pattern id (reasoner provenance).
    pub fn annotate_pattern(&mut self, suffix: &str) {
        match &mut self.pattern {
            Some(p) if !p.ends_with(suffix) => p.push_str(suffix),
            None => self.pattern = Some(suffix.trim_start_matches(';').to_string()),
            _ => {}
        }
    }
}

#[inline]
pub(crate) fn clamp01(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn confidence_always_clamped(conf in -10.0f64..10.0) {
            let s = Span::new("test", PhiCategory::Name, 0, 4, conf);
            prop_assert!(s.confidence() >= 0.0);
            prop_assert!(s.confidence() <= 1.0);
        }

        #[test]
        fn adjust_stays_in_bounds(start in 0.0f64..=1.0, delta in -5.0f64..5.0) {
            let mut s = Span::new("test", PhiCategory::Name, 0, 4, start);
            s.adjust_confidence(delta);
            prop_assert!(s.confidence() >= 0.0);
            prop_assert!(s.confidence() <= 1.0);
        }

        #[test]
        fn overlap_is_symmetric(
            s1 in 0usize..100, len1 in 1usize..50,
            s2 in 0usize..100, len2 in 1usize..50,
        ) {
            let a = Span::new("a", PhiCategory::Name, s1, s1 + len1, 1.0);
            let b = Span::new("b", PhiCategory::Date, s2, s2 + len2, 1.0);
            prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
        }
    }
}

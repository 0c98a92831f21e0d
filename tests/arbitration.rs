//! Arbitration behavior: the documented overlap-resolution policy.
//!
//! Covers the containment branches in both processing orders, category
//! specificity tie-breaking, and the global guarantees (no residual
//! overlaps, idempotence, determinism).

use scrub::types::SpanSliceExt;
use scrub::{
    DatalogReasoner, IndexBackend, PhiCategory, Span, SpanArbiter,
};

fn positions(spans: &[Span]) -> Vec<(usize, usize, String)> {
    spans
        .iter()
        .map(|s| (s.start, s.end, s.category.as_label().to_string()))
        .collect()
}

// =============================================================================
// Exclusive-category conflict, end to end through reason + arbitrate
// =============================================================================

mod exclusive_conflict {
    use super::*;

    #[test]
    fn ssn_phone_conflict_resolves_to_phone() {
        // The same digit run read as PHONE (0.8) and SSN (0.6) at the same
        // position. The exclusive rule penalizes the weaker SSN reading,
        // and arbitration keeps only the PHONE span.
        let text = "Contact: 555-1234 today.";
        let mut spans = vec![
            Span::new("555-1234", PhiCategory::Phone, 9, 17, 0.8),
            Span::new("555-1234", PhiCategory::Ssn, 9, 17, 0.6),
        ];

        let reasoner = DatalogReasoner::new();
        reasoner.reason(text, &mut spans);

        let ssn = spans
            .iter()
            .find(|s| s.category == PhiCategory::Ssn)
            .unwrap();
        assert!(ssn.confidence() < 0.6, "weaker SSN reading must be penalized");

        let out = SpanArbiter::new().drop_overlapping(spans);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].category, PhiCategory::Phone);
    }
}

// =============================================================================
// Specificity tie-breaking
// =============================================================================

mod specificity {
    use super::*;

    #[test]
    fn name_beats_custom_all_else_equal() {
        let spans = vec![
            Span::new("John Smith", PhiCategory::Name, 0, 10, 0.7),
            Span::new("John Smith", PhiCategory::Custom("CUSTOM".into()), 0, 10, 0.7),
        ];
        let out = SpanArbiter::new().drop_overlapping(spans);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].category, PhiCategory::Name);
    }
}

// =============================================================================
// Containment policy, both processing orders
// =============================================================================

mod containment {
    use super::*;

    #[test]
    fn contained_span_accepted_first_larger_rejected() {
        // The contained span's confidence wins the score ordering; the
        // larger span then swallows an accepted span and is rejected,
        // regardless of equal category.
        let spans = vec![
            Span::new("Dr. John Smith", PhiCategory::Name, 0, 14, 0.6),
            Span::new("John Smith", PhiCategory::Name, 4, 14, 0.95),
        ];
        let out = SpanArbiter::new().drop_overlapping(spans);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "John Smith");
        assert_eq!((out[0].start, out[0].end), (4, 14));
    }

    #[test]
    fn larger_span_accepted_first_contained_rejected() {
        // Flipped confidences: the larger span is accepted first. The
        // contained span is equal-specificity, so even at high confidence
        // it cannot replace the accepted span.
        let spans = vec![
            Span::new("Dr. John Smith", PhiCategory::Name, 0, 14, 0.95),
            Span::new("John Smith", PhiCategory::Name, 4, 14, 0.9),
        ];
        let out = SpanArbiter::new().drop_overlapping(spans);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "Dr. John Smith");
    }

    #[test]
    fn strictly_more_specific_contained_span_replaces() {
        // An accepted ADDRESS containing an SSN detection: the SSN is
        // strictly more specific and clears the 0.9 confidence bar, so it
        // replaces the accepted span.
        let spans = vec![
            Span::new(
                "Apt 4, SSN 123-45-6789, Springfield",
                PhiCategory::Address,
                0,
                35,
                0.85,
            ),
            Span::new("123-45-6789", PhiCategory::Ssn, 11, 22, 0.95),
        ];
        let out = SpanArbiter::new().drop_overlapping(spans);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].category, PhiCategory::Ssn);
    }

    #[test]
    fn specific_contained_span_below_bar_rejected() {
        let spans = vec![
            Span::new(
                "Apt 4, SSN 123-45-6789, Springfield",
                PhiCategory::Address,
                0,
                35,
                0.85,
            ),
            Span::new("123-45-6789", PhiCategory::Ssn, 11, 22, 0.89),
        ];
        let out = SpanArbiter::new().drop_overlapping(spans);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].category, PhiCategory::Address);
    }
}

// =============================================================================
// Global guarantees
// =============================================================================

mod guarantees {
    use super::*;

    fn messy_span_set() -> Vec<Span> {
        vec![
            Span::new("Jane Doe", PhiCategory::Name, 0, 8, 0.7),
            Span::new("Doe", PhiCategory::Name, 5, 8, 0.9),
            Span::new("01/02/1960", PhiCategory::Date, 10, 20, 0.8),
            Span::new("1960", PhiCategory::Age, 16, 20, 0.4),
            Span::new("123-45-6789", PhiCategory::Ssn, 25, 36, 0.95),
            Span::new("123-45-6789", PhiCategory::Phone, 25, 36, 0.5),
            Span::new("45-6789", PhiCategory::Zipcode, 29, 36, 0.3),
            Span::new("Springfield General Hospital", PhiCategory::Address, 40, 68, 0.6),
            Span::new("Springfield", PhiCategory::City, 40, 51, 0.75),
        ]
    }

    #[test]
    fn no_residual_overlaps_brute_force() {
        let out = SpanArbiter::new().drop_overlapping(messy_span_set());
        // Verify by brute force even though production uses the index.
        for i in 0..out.len() {
            for j in (i + 1)..out.len() {
                assert!(
                    !out[i].overlaps(&out[j]),
                    "residual overlap between {:?} and {:?}",
                    (out[i].start, out[i].end),
                    (out[j].start, out[j].end)
                );
            }
        }
    }

    #[test]
    fn output_is_position_sorted() {
        let out = SpanArbiter::new().drop_overlapping(messy_span_set());
        for pair in out.windows(2) {
            assert!(pair[0].start <= pair[1].start);
        }
    }

    #[test]
    fn arbitration_is_idempotent() {
        let arbiter = SpanArbiter::new();
        let once = arbiter.drop_overlapping(messy_span_set());
        let twice = arbiter.drop_overlapping(once.clone());
        assert_eq!(positions(&once), positions(&twice));
    }

    #[test]
    fn arbitration_is_deterministic() {
        let arbiter = SpanArbiter::new();
        let a = arbiter.drop_overlapping(messy_span_set());
        let b = arbiter.drop_overlapping(messy_span_set());
        assert_eq!(positions(&a), positions(&b));

        // Input order must not matter either.
        let mut reversed = messy_span_set();
        reversed.reverse();
        let c = arbiter.drop_overlapping(reversed);
        assert_eq!(positions(&a), positions(&c));
    }

    #[test]
    fn backends_agree_on_messy_input() {
        let reference =
            SpanArbiter::with_backend(IndexBackend::Reference).drop_overlapping(messy_span_set());
        let accelerated =
            SpanArbiter::with_backend(IndexBackend::Accelerated).drop_overlapping(messy_span_set());
        assert_eq!(positions(&reference), positions(&accelerated));
    }

    #[test]
    fn duplicates_collapse_to_higher_confidence() {
        let spans = vec![
            Span::new("Jane", PhiCategory::Name, 0, 4, 0.6),
            Span::new("Jane", PhiCategory::Name, 0, 4, 0.8),
        ];
        let out = SpanArbiter::new().drop_overlapping(spans);
        assert_eq!(out.len(), 1);
        assert!((out[0].confidence() - 0.8).abs() < 1e-12);
    }

    #[test]
    fn output_confidences_stay_bounded() {
        let out = SpanArbiter::new().drop_overlapping(messy_span_set());
        assert!(out
            .iter()
            .all(|s| (0.0..=1.0).contains(&s.confidence())));
        assert!(!out.has_overlaps());
    }
}

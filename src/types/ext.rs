//! Extension traits for span collections.

use crate::{PhiCategory, Span};
use std::collections::HashMap;

/// Extension methods for slices of spans.
///
/// Adds useful operations to `[Span]` and `Vec<Span>` without wrapping them
/// in a newtype.
///
/// # Example
///
/// ```rust
/// use scrub::{PhiCategory, Span};
/// use scrub::types::SpanSliceExt;
///
/// let spans = vec![
///     Span::new("Jane Doe", PhiCategory::Name, 0, 8, 0.9),
///     Span::new("123-45-6789", PhiCategory::Ssn, 20, 31, 0.97),
/// ];
///
/// let high: Vec<_> = spans.above_confidence(0.95).collect();
/// assert_eq!(high.len(), 1);
/// assert!(!spans.has_overlaps());
/// ```
pub trait SpanSliceExt {
    /// Filter spans by minimum confidence threshold.
    fn above_confidence(&self, min: f64) -> impl Iterator<Item = &Span>;

    /// Filter spans by category.
    fn of_category(&self, category: &PhiCategory) -> impl Iterator<Item = &Span>;

    /// Check if any spans overlap with each other (brute force, O(n²)).
    fn has_overlaps(&self) -> bool;

    /// Find all overlapping pairs of spans.
    fn overlapping_pairs(&self) -> Vec<(&Span, &Span)>;

    /// Get spans sorted by position (ascending start, then end).
    fn sorted_by_position(&self) -> Vec<&Span>;

    /// Calculate average confidence across all spans.
    fn mean_confidence(&self) -> Option<f64>;

    /// Group spans by category label.
    fn group_by_category(&self) -> HashMap<String, Vec<&Span>>;

    /// Get span covering a specific position (if any).
    fn at_position(&self, pos: usize) -> Option<&Span>;
}

impl SpanSliceExt for [Span] {
    fn above_confidence(&self, min: f64) -> impl Iterator<Item = &Span> {
        self.iter().filter(move |s| s.confidence() >= min)
    }

    fn of_category(&self, category: &PhiCategory) -> impl Iterator<Item = &Span> {
        let category = category.clone();
        self.iter().filter(move |s| s.category == category)
    }

    fn has_overlaps(&self) -> bool {
        for i in 0..self.len() {
            for j in (i + 1)..self.len() {
                if self[i].overlaps(&self[j]) {
                    return true;
                }
            }
        }
        false
    }

    fn overlapping_pairs(&self) -> Vec<(&Span, &Span)> {
        let mut pairs = Vec::new();
        for i in 0..self.len() {
            for j in (i + 1)..self.len() {
                if self[i].overlaps(&self[j]) {
                    pairs.push((&self[i], &self[j]));
                }
            }
        }
        pairs
    }

    fn sorted_by_position(&self) -> Vec<&Span> {
        let mut sorted: Vec<_> = self.iter().collect();
        sorted.sort_by_key(|s| (s.start, s.end));
        sorted
    }

    fn mean_confidence(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        let sum: f64 = self.iter().map(|s| s.confidence()).sum();
        Some(sum / self.len() as f64)
    }

    fn group_by_category(&self) -> HashMap<String, Vec<&Span>> {
        let mut groups: HashMap<String, Vec<&Span>> = HashMap::new();
        for span in self {
            groups
                .entry(span.category.as_label().to_string())
                .or_default()
                .push(span);
        }
        groups
    }

    fn at_position(&self, pos: usize) -> Option<&Span> {
        self.iter().find(|s| pos >= s.start && pos < s.end)
    }
}

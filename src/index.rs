//! Interval-indexed overlap resolution.
//!
//! Two pieces live here: an interval index abstraction with a reference
//! interval-tree implementation and a behaviorally identical sorted-vector
//! substitute, and the greedy arbitration algorithm that reduces a scored,
//! possibly-overlapping span set to a non-overlapping, position-sorted
//! subset.
//!
//! The arbitration is intentionally greedy rather than globally optimal: it
//! does not solve weighted interval scheduling exactly. The heuristic favors
//! precision (fewer, well-scored spans) and determinism (total-order sort
//! keys) over a provably maximum-score independent set, because a missed
//! redaction costs more than a slightly suboptimal span selection.

use serde::{Deserialize, Serialize};

use crate::span::{PhiCategory, Span};

/// Index over `(start, end)` intervals with opaque payload ids.
///
/// Implementations must be behaviorally identical: for any call sequence,
/// `find_overlaps` returns the same id set (order may differ; callers must
/// not depend on it). One instance per document-processing task; instances
/// are not safe for concurrent mutation.
pub trait OverlapIndex {
    /// Insert an interval with its payload id.
    fn insert(&mut self, start: usize, end: usize, id: usize);

    /// Remove a previously inserted interval. Returns false if absent.
    fn remove(&mut self, start: usize, end: usize, id: usize) -> bool;

    /// Ids of all stored intervals overlapping `[start, end)`.
    fn find_overlaps(&self, start: usize, end: usize) -> Vec<usize>;

    /// Number of stored intervals.
    fn len(&self) -> usize;

    /// Whether the index is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove all intervals.
    fn clear(&mut self);
}

// =============================================================================
// Reference backend: augmented AVL interval tree
// =============================================================================

struct Node {
    start: usize,
    end: usize,
    id: usize,
    max_end: usize,
    height: i32,
    left: Option<Box<Node>>,
    right: Option<Box<Node>>,
}

impl Node {
    fn new(start: usize, end: usize, id: usize) -> Box<Self> {
        Box::new(Self {
            start,
            end,
            id,
            max_end: end,
            height: 1,
            left: None,
            right: None,
        })
    }

    fn key(&self) -> (usize, usize, usize) {
        (self.start, self.end, self.id)
    }
}

fn height(node: &Option<Box<Node>>) -> i32 {
    node.as_ref().map_or(0, |n| n.height)
}

fn max_end(node: &Option<Box<Node>>) -> usize {
    node.as_ref().map_or(0, |n| n.max_end)
}

fn update(node: &mut Box<Node>) {
    node.height = 1 + height(&node.left).max(height(&node.right));
    node.max_end = node
        .end
        .max(max_end(&node.left))
        .max(max_end(&node.right));
}

fn balance_factor(node: &Node) -> i32 {
    height(&node.left) - height(&node.right)
}

fn rotate_right(mut node: Box<Node>) -> Box<Node> {
    let mut new_root = node.left.take().expect("rotate_right requires left child");
    node.left = new_root.right.take();
    update(&mut node);
    new_root.right = Some(node);
    update(&mut new_root);
    new_root
}

fn rotate_left(mut node: Box<Node>) -> Box<Node> {
    let mut new_root = node.right.take().expect("rotate_left requires right child");
    node.right = new_root.left.take();
    update(&mut node);
    new_root.left = Some(node);
    update(&mut new_root);
    new_root
}

fn rebalance(mut node: Box<Node>) -> Box<Node> {
    update(&mut node);
    let bf = balance_factor(&node);
    if bf > 1 {
        if balance_factor(node.left.as_ref().expect("left-heavy node has left child")) < 0 {
            node.left = node.left.take().map(rotate_left);
        }
        rotate_right(node)
    } else if bf < -1 {
        if balance_factor(node.right.as_ref().expect("right-heavy node has right child")) > 0 {
            node.right = node.right.take().map(rotate_right);
        }
        rotate_left(node)
    } else {
        node
    }
}

fn insert_node(node: Option<Box<Node>>, start: usize, end: usize, id: usize) -> Box<Node> {
    let Some(mut node) = node else {
        return Node::new(start, end, id);
    };
    if (start, end, id) < node.key() {
        node.left = Some(insert_node(node.left.take(), start, end, id));
    } else {
        node.right = Some(insert_node(node.right.take(), start, end, id));
    }
    rebalance(node)
}

fn take_min(mut node: Box<Node>) -> (Box<Node>, Option<Box<Node>>) {
    if node.left.is_none() {
        let right = node.right.take();
        return (node, right);
    }
    let (min, rest) = take_min(node.left.take().expect("checked above"));
    node.left = rest;
    (min, Some(rebalance(node)))
}

fn remove_node(
    node: Option<Box<Node>>,
    start: usize,
    end: usize,
    id: usize,
    removed: &mut bool,
) -> Option<Box<Node>> {
    let mut node = node?;
    let key = (start, end, id);
    if key < node.key() {
        node.left = remove_node(node.left.take(), start, end, id, removed);
    } else if key > node.key() {
        node.right = remove_node(node.right.take(), start, end, id, removed);
    } else {
        *removed = true;
        return match (node.left.take(), node.right.take()) {
            (None, None) => None,
            (Some(child), None) | (None, Some(child)) => Some(child),
            (Some(left), Some(right)) => {
                let (mut successor, rest) = take_min(right);
                successor.left = Some(left);
                successor.right = rest;
                Some(rebalance(successor))
            }
        };
    }
    Some(rebalance(node))
}

fn collect_overlaps(node: &Option<Box<Node>>, start: usize, end: usize, out: &mut Vec<usize>) {
    let Some(node) = node else { return };
    // Subtree pruning on the max-end augmentation.
    if node.max_end <= start {
        return;
    }
    collect_overlaps(&node.left, start, end, out);
    if node.start < end && node.end > start {
        out.push(node.id);
    }
    // Everything right of here starts at or after node.start; once that
    // reaches the query end there is nothing left to find.
    if node.start < end {
        collect_overlaps(&node.right, start, end, out);
    }
}

/// Augmented AVL interval tree: O(log n) insert/remove, O(log n + k)
/// overlap queries. The reference [`OverlapIndex`] backend.
#[derive(Default)]
pub struct IntervalTree {
    root: Option<Box<Node>>,
    size: usize,
}

impl IntervalTree {
    /// Create an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl OverlapIndex for IntervalTree {
    fn insert(&mut self, start: usize, end: usize, id: usize) {
        self.root = Some(insert_node(self.root.take(), start, end, id));
        self.size += 1;
    }

    fn remove(&mut self, start: usize, end: usize, id: usize) -> bool {
        let mut removed = false;
        self.root = remove_node(self.root.take(), start, end, id, &mut removed);
        if removed {
            self.size -= 1;
        }
        removed
    }

    fn find_overlaps(&self, start: usize, end: usize) -> Vec<usize> {
        let mut out = Vec::new();
        collect_overlaps(&self.root, start, end, &mut out);
        out
    }

    fn len(&self) -> usize {
        self.size
    }

    fn clear(&mut self) {
        self.root = None;
        self.size = 0;
    }
}

// =============================================================================
// Substitute backend: sorted vector
// =============================================================================

/// Sorted-vector [`OverlapIndex`] substitute.
///
/// Keeps entries ordered by `(start, end, id)`; overlap queries binary-search
/// the start bound then scan. Wins on small span sets where tree pointer
/// chasing dominates; must remain behaviorally identical to
/// [`IntervalTree`] (contract-tested).
#[derive(Default)]
pub struct SortedVecIndex {
    entries: Vec<(usize, usize, usize)>,
}

impl SortedVecIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl OverlapIndex for SortedVecIndex {
    fn insert(&mut self, start: usize, end: usize, id: usize) {
        let entry = (start, end, id);
        let pos = self.entries.partition_point(|e| *e < entry);
        self.entries.insert(pos, entry);
    }

    fn remove(&mut self, start: usize, end: usize, id: usize) -> bool {
        match self.entries.binary_search(&(start, end, id)) {
            Ok(pos) => {
                self.entries.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    fn find_overlaps(&self, start: usize, end: usize) -> Vec<usize> {
        // All candidates have entry.start < end; among those keep
        // entry.end > start.
        let upper = self.entries.partition_point(|e| e.0 < end);
        self.entries[..upper]
            .iter()
            .filter(|e| e.1 > start)
            .map(|e| e.2)
            .collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Which [`OverlapIndex`] implementation arbitration uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexBackend {
    /// [`IntervalTree`] (default).
    #[default]
    Reference,
    /// [`SortedVecIndex`]; must produce identical arbitration outcomes.
    Accelerated,
}

// =============================================================================
// Arbitration
// =============================================================================

// Field-label words that a NAME span sometimes swallows from an adjacent
// label. A NAME containing one of these must not win a scoring contest on
// length.
const STRUCTURE_WORDS: &[&str] = &[
    "date",
    "record",
    "number",
    "id",
    "account",
    "phone",
    "chart",
    "room",
    "unit",
    "visit",
    "admission",
    "discharge",
    "dob",
    "mrn",
    "ssn",
];

/// Composite priority score used to order spans for arbitration.
///
/// `40%·min(len/50, 1) + 30%·confidence + 20%·(specificity/100) +
/// 10%·min(priority/100, 1)`. NAME spans whose text contains a structure
/// word have their length component forced to 0.
#[must_use]
pub fn arbitration_score(span: &Span) -> f64 {
    let mut length_component = (span.len() as f64 / 50.0).min(1.0);
    if matches!(span.category, PhiCategory::Name | PhiCategory::ProviderName)
        && contains_structure_word(&span.text)
    {
        length_component = 0.0;
    }
    0.4 * length_component
        + 0.3 * span.confidence()
        + 0.2 * (span.category.specificity() as f64 / 100.0)
        + 0.1 * (span.priority as f64 / 100.0).min(1.0)
}

fn contains_structure_word(text: &str) -> bool {
    text.split_whitespace()
        .any(|w| STRUCTURE_WORDS.contains(&w.to_lowercase().as_str()))
}

/// Resolves geometric overlaps in a scored span set.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpanArbiter {
    backend: IndexBackend,
}

impl SpanArbiter {
    /// Create an arbiter using the reference interval tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an arbiter with an explicit index backend.
    #[must_use]
    pub fn with_backend(backend: IndexBackend) -> Self {
        Self { backend }
    }

    /// The configured backend.
    #[must_use]
    pub fn backend(&self) -> IndexBackend {
        self.backend
    }

    /// Reduce a possibly-overlapping span set to a non-overlapping,
    /// position-sorted subset.
    ///
    /// Deterministic: identical inputs produce identical outputs, and
    /// re-running on an already non-overlapping set is the identity.
    #[must_use]
    pub fn drop_overlapping(&self, spans: Vec<Span>) -> Vec<Span> {
        match self.backend {
            IndexBackend::Reference => drop_overlapping_with(&mut IntervalTree::new(), spans),
            IndexBackend::Accelerated => drop_overlapping_with(&mut SortedVecIndex::new(), spans),
        }
    }
}

fn drop_overlapping_with<I: OverlapIndex>(index: &mut I, spans: Vec<Span>) -> Vec<Span> {
    let mut spans = dedup_exact(spans);

    // Total order: score desc, start asc, length desc, then specificity and
    // label so equal-scored spans never depend on input order.
    let mut order: Vec<usize> = (0..spans.len()).collect();
    let scores: Vec<f64> = spans.iter().map(arbitration_score).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| spans[a].start.cmp(&spans[b].start))
            .then_with(|| spans[b].len().cmp(&spans[a].len()))
            .then_with(|| {
                spans[b]
                    .category
                    .specificity()
                    .cmp(&spans[a].category.specificity())
            })
            .then_with(|| spans[a].category.as_label().cmp(spans[b].category.as_label()))
    });

    // Accepted spans live in slots; the index payload is the slot number so
    // a replaced span can be swapped without renumbering.
    let mut slots: Vec<Option<Span>> = Vec::with_capacity(spans.len());

    for idx in order {
        let candidate = &spans[idx];
        let overlap_slots = index.find_overlaps(candidate.start, candidate.end);

        if overlap_slots.is_empty() {
            index.insert(candidate.start, candidate.end, slots.len());
            slots.push(Some(spans[idx].clone()));
            continue;
        }

        // Candidate swallows an already-accepted span: rejected regardless
        // of specificity or confidence. The smaller accepted span was
        // processed in score order and keeps its claim.
        let swallows_accepted = overlap_slots.iter().any(|&s| {
            slots[s]
                .as_ref()
                .is_some_and(|accepted| candidate.contains(accepted))
        });
        if swallows_accepted {
            continue;
        }

        // Accepted span contains the candidate: replace only when the
        // candidate's category is strictly more specific and its own
        // confidence clears the high bar.
        if overlap_slots.len() == 1 {
            let slot = overlap_slots[0];
            let accepted = slots[slot].as_ref().expect("live slot");
            if accepted.contains(candidate) {
                let more_specific =
                    candidate.category.specificity() > accepted.category.specificity();
                if more_specific && candidate.confidence() >= 0.9 {
                    index.remove(accepted.start, accepted.end, slot);
                    index.insert(candidate.start, candidate.end, slot);
                    slots[slot] = Some(spans[idx].clone());
                }
                continue;
            }
        }

        // Partial overlap: the accepted span wins.
    }

    let mut accepted: Vec<Span> = slots.into_iter().flatten().collect();
    accepted.sort_by_key(|s| (s.start, s.end));
    accepted
}

/// Deduplicate exact `(start, end, category)` triples, keeping the
/// higher-confidence instance.
pub(crate) fn dedup_exact(spans: Vec<Span>) -> Vec<Span> {
    use std::collections::HashMap;

    let mut best: HashMap<(usize, usize, String), usize> = HashMap::new();
    let mut keep: Vec<Option<Span>> = Vec::with_capacity(spans.len());

    for span in spans {
        let key = (span.start, span.end, span.category.as_label().to_string());
        match best.get(&key) {
            Some(&i) => {
                let existing = keep[i].as_ref().expect("live entry");
                if span.confidence() > existing.confidence() {
                    keep[i] = Some(span);
                }
            }
            None => {
                best.insert(key, keep.len());
                keep.push(Some(span));
            }
        }
    }

    keep.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str, category: PhiCategory, start: usize, end: usize, conf: f64) -> Span {
        Span::new(text, category, start, end, conf)
    }

    mod tree {
        use super::*;

        #[test]
        fn insert_query_remove() {
            let mut tree = IntervalTree::new();
            tree.insert(0, 10, 1);
            tree.insert(5, 15, 2);
            tree.insert(20, 30, 3);
            assert_eq!(tree.len(), 3);

            let mut hits = tree.find_overlaps(8, 12);
            hits.sort_unstable();
            assert_eq!(hits, vec![1, 2]);

            assert!(tree.remove(5, 15, 2));
            assert!(!tree.remove(5, 15, 2));
            assert_eq!(tree.len(), 2);
            assert_eq!(tree.find_overlaps(12, 14), Vec::<usize>::new());
        }

        #[test]
        fn adjacent_intervals_do_not_overlap() {
            let mut tree = IntervalTree::new();
            tree.insert(0, 5, 1);
            tree.insert(5, 10, 2);
            assert_eq!(tree.find_overlaps(0, 5), vec![1]);
            assert_eq!(tree.find_overlaps(5, 10), vec![2]);
        }

        #[test]
        fn clear_empties() {
            let mut tree = IntervalTree::new();
            tree.insert(0, 5, 1);
            tree.clear();
            assert!(tree.is_empty());
            assert!(tree.find_overlaps(0, 100).is_empty());
        }

        #[test]
        fn survives_sequential_inserts_in_order() {
            // Degenerate insert order would break an unbalanced BST's
            // O(log n) bound; the AVL should stay shallow and correct.
            let mut tree = IntervalTree::new();
            for i in 0..1000 {
                tree.insert(i, i + 1, i);
            }
            assert_eq!(tree.len(), 1000);
            assert_eq!(tree.find_overlaps(500, 501), vec![500]);
            for i in 0..1000 {
                assert!(tree.remove(i, i + 1, i));
            }
            assert!(tree.is_empty());
        }

        #[test]
        fn duplicate_ranges_with_distinct_ids() {
            let mut tree = IntervalTree::new();
            tree.insert(0, 10, 1);
            tree.insert(0, 10, 2);
            let mut hits = tree.find_overlaps(0, 10);
            hits.sort_unstable();
            assert_eq!(hits, vec![1, 2]);
            assert!(tree.remove(0, 10, 1));
            assert_eq!(tree.find_overlaps(0, 10), vec![2]);
        }
    }

    mod backends_agree {
        use super::*;

        #[test]
        fn same_overlap_sets() {
            let intervals = [(0, 10, 0), (5, 15, 1), (10, 20, 2), (0, 3, 3), (18, 40, 4)];
            let mut tree = IntervalTree::new();
            let mut vec_index = SortedVecIndex::new();
            for (s, e, id) in intervals {
                tree.insert(s, e, id);
                vec_index.insert(s, e, id);
            }
            for (qs, qe) in [(0, 1), (4, 11), (15, 18), (0, 100), (40, 50)] {
                let mut a = tree.find_overlaps(qs, qe);
                let mut b = vec_index.find_overlaps(qs, qe);
                a.sort_unstable();
                b.sort_unstable();
                assert_eq!(a, b, "query [{qs}, {qe})");
            }
        }
    }

    mod scoring {
        use super::*;

        #[test]
        fn score_components() {
            let s = span("123-45-6789", PhiCategory::Ssn, 0, 11, 1.0);
            // len 11 → 0.4*0.22; conf 1.0 → 0.3; spec 100 → 0.2; pri 100 → 0.1
            let expected = 0.4 * (11.0 / 50.0) + 0.3 + 0.2 + 0.1;
            assert!((arbitration_score(&s) - expected).abs() < 1e-12);
        }

        #[test]
        fn name_with_structure_word_loses_length_component() {
            let clean = span("Johnathan Smithfield Born", PhiCategory::Name, 0, 25, 0.8);
            let swallowed = span("Johnathan Smithfield Date", PhiCategory::Name, 0, 25, 0.8);
            assert!(arbitration_score(&swallowed) < arbitration_score(&clean));
            let delta = arbitration_score(&clean) - arbitration_score(&swallowed);
            assert!((delta - 0.4 * (25.0 / 50.0)).abs() < 1e-12);
        }

        #[test]
        fn structure_word_is_case_insensitive_and_word_bounded() {
            assert!(contains_structure_word("Jane DATE"));
            assert!(contains_structure_word("record keeper"));
            // Substring inside a longer word does not count.
            assert!(!contains_structure_word("Recordson"));
        }
    }

    mod dedup {
        use super::*;

        #[test]
        fn keeps_higher_confidence_instance() {
            let spans = vec![
                span("Jane", PhiCategory::Name, 0, 4, 0.6),
                span("Jane", PhiCategory::Name, 0, 4, 0.9),
                span("Jane", PhiCategory::Name, 0, 4, 0.7),
            ];
            let out = dedup_exact(spans);
            assert_eq!(out.len(), 1);
            assert!((out[0].confidence() - 0.9).abs() < 1e-12);
        }

        #[test]
        fn different_categories_are_distinct() {
            let spans = vec![
                span("Jane", PhiCategory::Name, 0, 4, 0.6),
                span("Jane", PhiCategory::ProviderName, 0, 4, 0.6),
            ];
            assert_eq!(dedup_exact(spans).len(), 2);
        }
    }

    mod arbitration {
        use super::*;
        use crate::types::SpanSliceExt;

        #[test]
        fn non_overlapping_pass_through() {
            let arbiter = SpanArbiter::new();
            let spans = vec![
                span("Jane Doe", PhiCategory::Name, 0, 8, 0.9),
                span("123-45-6789", PhiCategory::Ssn, 20, 31, 0.95),
            ];
            let out = arbiter.drop_overlapping(spans);
            assert_eq!(out.len(), 2);
            assert_eq!(out[0].start, 0);
            assert_eq!(out[1].start, 20);
        }

        #[test]
        fn identical_position_higher_specificity_wins() {
            let arbiter = SpanArbiter::new();
            let spans = vec![
                span("John Smith", PhiCategory::Custom("CUSTOM".into()), 0, 10, 0.7),
                span("John Smith", PhiCategory::Name, 0, 10, 0.7),
            ];
            let out = arbiter.drop_overlapping(spans);
            assert_eq!(out.len(), 1);
            assert_eq!(out[0].category, PhiCategory::Name);
        }

        #[test]
        fn partial_overlap_keeps_higher_scored() {
            let arbiter = SpanArbiter::new();
            let spans = vec![
                span("555-12-1234", PhiCategory::Ssn, 0, 11, 0.9),
                span("1234 Elm", PhiCategory::Address, 7, 15, 0.5),
            ];
            let out = arbiter.drop_overlapping(spans);
            assert_eq!(out.len(), 1);
            assert_eq!(out[0].category, PhiCategory::Ssn);
        }

        #[test]
        fn contained_span_replaced_by_specific_high_confidence() {
            let arbiter = SpanArbiter::new();
            // The ADDRESS span outscores on length and gets accepted first;
            // the contained SSN is strictly more specific with conf ≥ 0.9,
            // so it replaces the ADDRESS.
            let spans = vec![
                span(
                    "Apt 4, SSN 123-45-6789, Springfield",
                    PhiCategory::Address,
                    0,
                    35,
                    0.85,
                ),
                span("123-45-6789", PhiCategory::Ssn, 11, 22, 0.95),
            ];
            let out = arbiter.drop_overlapping(spans);
            assert_eq!(out.len(), 1);
            assert_eq!(out[0].category, PhiCategory::Ssn);
            assert_eq!(out[0].start, 11);
        }

        #[test]
        fn contained_span_not_replaced_below_confidence_bar() {
            let arbiter = SpanArbiter::new();
            let spans = vec![
                span(
                    "Apt 4, SSN 123-45-6789, Springfield",
                    PhiCategory::Address,
                    0,
                    35,
                    0.85,
                ),
                span("123-45-6789", PhiCategory::Ssn, 11, 22, 0.7),
            ];
            let out = arbiter.drop_overlapping(spans);
            assert_eq!(out.len(), 1);
            assert_eq!(out[0].category, PhiCategory::Address);
        }

        #[test]
        fn larger_span_rejected_when_it_swallows_accepted() {
            let arbiter = SpanArbiter::new();
            // Equal category; the smaller span's higher confidence wins the
            // score ordering, then the larger span swallows it and is
            // rejected.
            let spans = vec![
                span("Dr. John Smith", PhiCategory::Name, 0, 14, 0.6),
                span("John Smith", PhiCategory::Name, 4, 14, 0.95),
            ];
            let out = arbiter.drop_overlapping(spans);
            assert_eq!(out.len(), 1);
            assert_eq!(out[0].text, "John Smith");
        }

        #[test]
        fn contained_span_rejected_when_larger_accepted_first() {
            let arbiter = SpanArbiter::new();
            // Flip the confidences so the larger span is accepted first; the
            // contained span is equal-specificity and (despite high
            // confidence) cannot replace it.
            let spans = vec![
                span("Dr. John Smith", PhiCategory::Name, 0, 14, 0.95),
                span("John Smith", PhiCategory::Name, 4, 14, 0.6),
            ];
            let out = arbiter.drop_overlapping(spans);
            assert_eq!(out.len(), 1);
            assert_eq!(out[0].text, "Dr. John Smith");
        }

        #[test]
        fn output_never_overlaps() {
            let arbiter = SpanArbiter::new();
            let spans = vec![
                span("a", PhiCategory::Name, 0, 10, 0.7),
                span("b", PhiCategory::Date, 5, 15, 0.8),
                span("c", PhiCategory::Ssn, 12, 25, 0.9),
                span("d", PhiCategory::Phone, 24, 30, 0.6),
                span("e", PhiCategory::Mrn, 2, 28, 0.5),
            ];
            let out = arbiter.drop_overlapping(spans);
            assert!(!out.has_overlaps());
        }

        #[test]
        fn arbitration_is_idempotent() {
            let arbiter = SpanArbiter::new();
            let spans = vec![
                span("a", PhiCategory::Name, 0, 10, 0.7),
                span("b", PhiCategory::Date, 5, 15, 0.8),
                span("c", PhiCategory::Ssn, 20, 31, 0.9),
            ];
            let once = arbiter.drop_overlapping(spans);
            let twice = arbiter.drop_overlapping(once.clone());
            assert_eq!(once.len(), twice.len());
            for (a, b) in once.iter().zip(&twice) {
                assert_eq!((a.start, a.end), (b.start, b.end));
                assert_eq!(a.category, b.category);
            }
        }

        #[test]
        fn input_order_does_not_matter() {
            let arbiter = SpanArbiter::new();
            let mut spans = vec![
                span("a", PhiCategory::Name, 0, 10, 0.7),
                span("b", PhiCategory::Date, 5, 15, 0.8),
                span("c", PhiCategory::Ssn, 12, 25, 0.9),
            ];
            let forward = arbiter.drop_overlapping(spans.clone());
            spans.reverse();
            let backward = arbiter.drop_overlapping(spans);
            assert_eq!(forward.len(), backward.len());
            for (a, b) in forward.iter().zip(&backward) {
                assert_eq!((a.start, a.end), (b.start, b.end));
            }
        }

        #[test]
        fn backends_produce_identical_outcomes() {
            let spans = vec![
                span("a", PhiCategory::Name, 0, 10, 0.7),
                span("b", PhiCategory::Date, 5, 15, 0.8),
                span("c", PhiCategory::Ssn, 12, 25, 0.9),
                span("d", PhiCategory::Phone, 24, 30, 0.6),
            ];
            let reference = SpanArbiter::with_backend(IndexBackend::Reference)
                .drop_overlapping(spans.clone());
            let accelerated = SpanArbiter::with_backend(IndexBackend::Accelerated)
                .drop_overlapping(spans);
            assert_eq!(reference.len(), accelerated.len());
            for (a, b) in reference.iter().zip(&accelerated) {
                assert_eq!((a.start, a.end), (b.start, b.end));
                assert_eq!(a.category, b.category);
            }
        }

        #[test]
        fn empty_input_empty_output() {
            let arbiter = SpanArbiter::new();
            assert!(arbiter.drop_overlapping(vec![]).is_empty());
        }
    }
}

//! Tree similarity scores.
//!
//! - [`simple_tree_match`]: ordered, tag-exact count of matched node pairs.
//! - [`ClusteredMatcher`]: normalized similarity in `[0, 1]` used to build the
//!   similarity matrix for clustering. It ignores child order, is symmetric,
//!   and a tree always scores at least as high against itself as against any
//!   other tree.

use rd_core::{Fingerprints, NodeId, NodeRef, Tree};
use serde::{Deserialize, Serialize};

use crate::lcs::weighted_lcs;

/// Attributes whose equal, non-empty values earn a bonus when two nodes match.
pub const BONUS_ATTRIBUTES: [&str; 2] = ["class", "itemprop"];

/// Count of `node` plus all of its descendants.
pub fn subtree_size(node: NodeRef<'_>) -> usize {
    node.subtree_size()
}

/// Maximum number of tag-equal node pairs in an order-preserving
/// correspondence between `a` and `b`. Roots with different tags score 0.
pub fn simple_tree_match(a: NodeRef<'_>, b: NodeRef<'_>) -> usize {
    if a.tag() != b.tag() {
        return 0;
    }
    let left: Vec<NodeRef<'_>> = a.children().collect();
    let right: Vec<NodeRef<'_>> = b.children().collect();
    let table = weighted_lcs(left.len(), right.len(), |i, j| {
        simple_tree_match(left[i], right[j])
    });
    1 + table.score()
}

/// +1 for each attribute of [`BONUS_ATTRIBUTES`] that both nodes carry with
/// the same non-empty value.
pub fn attribute_bonus(a: NodeRef<'_>, b: NodeRef<'_>) -> u32 {
    BONUS_ATTRIBUTES
        .iter()
        .filter(|name| match (a.attribute(name), b.attribute(name)) {
            (Some(x), Some(y)) => !x.is_empty() && x == y,
            _ => false,
        })
        .count() as u32
}

// ---------------------------------------------------------------------------
// Clustered tree match
// ---------------------------------------------------------------------------

/// Relative weight of tag matches (`c1`) and attribute bonuses (`c2`) in the
/// clustered score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchWeights {
    pub tag: f64,
    pub attribute: f64,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            tag: 1.0,
            attribute: 1.0,
        }
    }
}

/// Clustered tree match between nodes of a `left` and a `right` tree (which
/// may be the same tree).
///
/// For two nodes `a`, `b` with the same tag:
///
/// ```text
/// local = (c1 + c2 * bonus(a, b)) / (c1 + c2 * max(bonus(a, a), bonus(b, b)))
/// score = local * M / max(t(a), t(b))     if both have children
///       = local / max(t(a), t(b))         otherwise
/// ```
///
/// where `M` is the weighted LCS of the two children lists scored
/// recursively, and `t(x)` is the number of siblings of `x` including itself
/// (1 at the comparison root). Children are compared in a canonical order,
/// sorted by tag and structural fingerprint, so permuting children does not
/// change the score.
pub struct ClusteredMatcher<'a> {
    left: &'a Tree,
    right: &'a Tree,
    left_prints: Fingerprints,
    right_prints: Fingerprints,
    weights: MatchWeights,
}

impl<'a> ClusteredMatcher<'a> {
    pub fn new(left: &'a Tree, right: &'a Tree, weights: MatchWeights) -> Self {
        Self {
            left,
            right,
            left_prints: Fingerprints::compute(left),
            right_prints: Fingerprints::compute(right),
            weights,
        }
    }

    /// Matcher comparing nodes of a single tree.
    pub fn within(tree: &'a Tree, weights: MatchWeights) -> Self {
        let prints = Fingerprints::compute(tree);
        Self {
            left: tree,
            right: tree,
            left_prints: prints.clone(),
            right_prints: prints,
            weights,
        }
    }

    /// Score `a` (of the left tree) against `b` (of the right tree).
    pub fn score(&self, a: NodeId, b: NodeId) -> f64 {
        self.score_nodes(a, 1, b, 1)
    }

    fn score_nodes(&self, a: NodeId, siblings_a: usize, b: NodeId, siblings_b: usize) -> f64 {
        let (left, right) = (self.left.get(a), self.right.get(b));
        if left.tag() != right.tag() {
            return 0.0;
        }
        let local = self.local_weight(left, right);
        let norm = siblings_a.max(siblings_b) as f64;

        let left_children = canonical_children(self.left, &self.left_prints, a);
        let right_children = canonical_children(self.right, &self.right_prints, b);
        if left_children.is_empty() || right_children.is_empty() {
            return local / norm;
        }

        let (m, n) = (left_children.len(), right_children.len());
        let table = weighted_lcs(m, n, |i, j| {
            self.score_nodes(left_children[i], m, right_children[j], n)
        });
        local * table.score() / norm
    }

    fn local_weight(&self, a: NodeRef<'_>, b: NodeRef<'_>) -> f64 {
        let MatchWeights { tag: c1, attribute: c2 } = self.weights;
        let own = attribute_bonus(a, a).max(attribute_bonus(b, b));
        let denominator = c1 + c2 * f64::from(own);
        if denominator <= 0.0 {
            return 1.0;
        }
        (c1 + c2 * f64::from(attribute_bonus(a, b))) / denominator
    }
}

fn canonical_children(tree: &Tree, prints: &Fingerprints, id: NodeId) -> Vec<NodeId> {
    let mut children = tree.children(id).to_vec();
    children.sort_by(|x, y| {
        tree.tag(*x)
            .cmp(tree.tag(*y))
            .then_with(|| prints.get(*x).cmp(prints.get(*y)))
    });
    children
}

/// One-off clustered match of two nodes with weights `c1`, `c2`.
///
/// Computes fingerprints for both trees on every call; use
/// [`ClusteredMatcher`] when scoring many pairs.
pub fn clustered_tree_match(a: NodeRef<'_>, b: NodeRef<'_>, c1: f64, c2: f64) -> f64 {
    let weights = MatchWeights {
        tag: c1,
        attribute: c2,
    };
    ClusteredMatcher::new(a.tree(), b.tree(), weights).score(a.id(), b.id())
}

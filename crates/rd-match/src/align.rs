//! Simple tree alignment.
//!
//! Same recurrence as [`crate::matcher::simple_tree_match`], but the table
//! keeps its trace so the matched node pairs can be recovered, and matched
//! nodes earn the attribute bonus of [`crate::matcher::attribute_bonus`].

use std::collections::HashMap;

use rd_core::{NodeId, NodeRef, Tree};

use crate::lcs::weighted_lcs;
use crate::matcher::attribute_bonus;

// ---------------------------------------------------------------------------
// Alignment
// ---------------------------------------------------------------------------

/// Recursive correspondence between two trees.
///
/// `pair` is the matched (first, second) node pair, or `None` for an empty
/// alignment and for the virtual root built by
/// [`SimpleTreeAligner::align_records`]. `children` holds the alignments of
/// the matched child pairs, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Alignment {
    pub pair: Option<(NodeId, NodeId)>,
    pub score: u32,
    pub children: Vec<Alignment>,
}

impl Alignment {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every matched pair in the alignment tree, in pre-order.
    pub fn pairs(&self) -> Vec<(NodeId, NodeId)> {
        let mut out = Vec::new();
        self.collect_pairs(&mut out);
        out
    }

    fn collect_pairs(&self, out: &mut Vec<(NodeId, NodeId)>) {
        if let Some(pair) = self.pair {
            out.push(pair);
        }
        for child in &self.children {
            child.collect_pairs(out);
        }
    }

    /// Matched pairs as a first → second map.
    pub fn to_map(&self) -> HashMap<NodeId, NodeId> {
        self.pairs().into_iter().collect()
    }
}

// ---------------------------------------------------------------------------
// SimpleTreeAligner
// ---------------------------------------------------------------------------

/// Ordered, tag-exact tree aligner.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleTreeAligner;

impl SimpleTreeAligner {
    pub fn new() -> Self {
        Self
    }

    /// Align two records (element lists) as if they were the children of a
    /// common virtual root. The returned alignment has no `pair` of its own.
    pub fn align_records(
        &self,
        left: &Tree,
        first: &[NodeId],
        right: &Tree,
        second: &[NodeId],
    ) -> Alignment {
        let (score, children) = self.align_sequences(left, first, right, second);
        Alignment {
            pair: None,
            score,
            children,
        }
    }

    /// Align two trees. A missing side or differing tags give an empty,
    /// zero-score alignment.
    pub fn align_tree(&self, a: Option<NodeRef<'_>>, b: Option<NodeRef<'_>>) -> Alignment {
        let (Some(a), Some(b)) = (a, b) else {
            return Alignment::empty();
        };
        if a.tag() != b.tag() {
            return Alignment::empty();
        }

        let (child_score, children) = self.align_sequences(
            a.tree(),
            a.tree().children(a.id()),
            b.tree(),
            b.tree().children(b.id()),
        );

        Alignment {
            pair: Some((a.id(), b.id())),
            score: 1 + child_score + attribute_bonus(a, b),
            children,
        }
    }

    fn align_sequences(
        &self,
        left: &Tree,
        first: &[NodeId],
        right: &Tree,
        second: &[NodeId],
    ) -> (u32, Vec<Alignment>) {
        let mut cells: Vec<Vec<Alignment>> = vec![Vec::with_capacity(second.len()); first.len()];
        let table = weighted_lcs(first.len(), second.len(), |i, j| {
            let alignment = self.align_tree(Some(left.get(first[i])), Some(right.get(second[j])));
            let score = alignment.score;
            cells[i].push(alignment);
            score
        });

        let children = table
            .backtrace()
            .into_iter()
            .map(|(i, j)| std::mem::take(&mut cells[i][j]))
            .collect();
        (table.score(), children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rd_core::html::parse_fragment;

    fn roots(tree: &Tree) -> Vec<NodeId> {
        vec![tree.root().expect("root")]
    }

    fn tags(tree: &Tree, ids: impl IntoIterator<Item = NodeId>) -> Vec<String> {
        let mut out: Vec<String> = ids.into_iter().map(|id| tree.tag(id).to_string()).collect();
        out.sort();
        out
    }

    #[test]
    fn identical_trees_align_fully() {
        let t1 = parse_fragment("<div><h1></h1><h2></h2><h5></h5></div>");
        let t2 = parse_fragment("<div><h1></h1><h2></h2><h5></h5></div>");
        let alignment = SimpleTreeAligner.align_records(&t1, &roots(&t1), &t2, &roots(&t2));
        assert_eq!(alignment.pair, None);
        assert_eq!(alignment.score, 4);
        assert_eq!(alignment.pairs().len(), 4);
        for (a, b) in alignment.pairs() {
            assert_eq!(t1.tag(a), t2.tag(b));
        }
    }

    #[test]
    fn unmatched_children_are_left_out() {
        let t1 = parse_fragment("<div><h1></h1><h2></h2><h5></h5></div>");
        let t2 = parse_fragment("<div><h2></h2><h3></h3><h4></h4><h5></h5><h6></h6></div>");
        let alignment = SimpleTreeAligner.align_tree(
            Some(t1.get(t1.root().expect("root"))),
            Some(t2.get(t2.root().expect("root"))),
        );
        let matched = alignment.to_map();
        assert_eq!(tags(&t2, matched.values().copied()), vec!["div", "h2", "h5"]);
        assert_eq!(alignment.score, 3);
    }

    #[test]
    fn root_tag_mismatch_is_empty() {
        let t1 = parse_fragment("<ul><li></li></ul>");
        let t2 = parse_fragment("<ol><li></li></ol>");
        let alignment = SimpleTreeAligner.align_tree(
            Some(t1.get(t1.root().expect("root"))),
            Some(t2.get(t2.root().expect("root"))),
        );
        assert_eq!(alignment, Alignment::empty());
        assert!(SimpleTreeAligner.align_tree(None, Some(t2.get(t2.root().expect("root")))).pairs().is_empty());
    }

    #[test]
    fn attribute_bonus_raises_score_and_steers_choice() {
        // Both <span>s of t2 could match the single <span> of t1; the one
        // sharing the class wins.
        let t1 = parse_fragment(r#"<div><span class="price"></span></div>"#);
        let t2 = parse_fragment(r#"<div><span class="title"></span><span class="price"></span></div>"#);
        let alignment = SimpleTreeAligner.align_records(&t1, &roots(&t1), &t2, &roots(&t2));
        assert_eq!(alignment.score, 3);
        let span = t1.find_first("span").expect("span");
        let matched = alignment.to_map()[&span];
        assert_eq!(t2.attribute(matched, "class"), Some("price"));
    }

    #[test]
    fn records_with_several_elements() {
        let t1 = parse_fragment("<div><hr><p><a></a></p><hr><p><a></a></p></div>");
        let t2 = parse_fragment("<div><hr><p><a></a><a></a></p></div>");
        let k1 = t1.children(t1.root().expect("root")).to_vec();
        let k2 = t2.children(t2.root().expect("root")).to_vec();
        let alignment = SimpleTreeAligner.align_records(&t1, &k1[..2], &t2, &k2);
        // hr-hr, p-p, a-a
        assert_eq!(alignment.children.len(), 2);
        assert_eq!(alignment.pairs().len(), 3);
        assert_eq!(alignment.score, 3);
    }
}

//! Partial tree alignment.
//!
//! Aligns a candidate record against the seed with [`SimpleTreeAligner`],
//! then tries to place every maximal run of unmatched candidate siblings into
//! the seed so that later records can match them:
//!
//! - **leftmost**: the run opens its parent and is followed by a matched
//!   sibling; clones go to the front of that sibling's counterpart's parent.
//! - **rightmost**: the run closes its parent and follows a matched sibling;
//!   clones go right after that sibling's counterpart.
//! - **flanked**: matched siblings on both sides; clones go between their
//!   counterparts only if those are adjacent in the seed. Otherwise the gap
//!   is ambiguous and the run stays unresolved.
//!
//! A run with no sibling on either side has no anchor and is left alone.

use std::collections::HashMap;

use rd_core::{NodeId, Tree};

use crate::align::SimpleTreeAligner;

/// Outcome of aligning one record against the seed.
#[derive(Debug, Clone, Default)]
pub struct PartialAlignment {
    /// The seed grew during this alignment.
    pub modified: bool,
    /// The candidate had at least one run of unmatched siblings, resolved or
    /// not.
    pub had_unaligned_runs: bool,
    /// Seed node → candidate node, including the clones inserted into the
    /// seed (mapped to the nodes they were copied from).
    pub mapping: HashMap<NodeId, NodeId>,
}

/// Where a run of clones goes in the seed.
struct Placement {
    parent: NodeId,
    index: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PartialTreeAligner {
    sta: SimpleTreeAligner,
}

impl PartialTreeAligner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Align `elements` of `candidate` against `seed_elements` of `seed`,
    /// inserting clones of unmatched runs into `seed` where the insertion
    /// point is unique.
    pub fn align_records(
        &self,
        seed: &mut Tree,
        seed_elements: &[NodeId],
        candidate: &Tree,
        elements: &[NodeId],
    ) -> PartialAlignment {
        let alignment = self.sta.align_records(seed, seed_elements, candidate, elements);
        let mut mapping = alignment.to_map();
        let reverse: HashMap<NodeId, NodeId> = mapping.iter().map(|(s, c)| (*c, *s)).collect();

        let runs = find_unaligned_runs(candidate, elements, &reverse);
        let mut modified = false;

        for run in &runs {
            let Some(placement) = placement(seed, candidate, run, &reverse) else {
                continue;
            };
            for (offset, element) in run.iter().enumerate() {
                let (copy, provenance) = seed.import_subtree(candidate, *element);
                seed.insert_child(placement.parent, placement.index + offset, copy);
                mapping.extend(provenance);
            }
            modified = true;
        }

        PartialAlignment {
            modified,
            had_unaligned_runs: !runs.is_empty(),
            mapping,
        }
    }
}

/// Decide the insertion point of `run` in the seed, or `None` when the run
/// has no anchor or the gap between its anchors is not unique.
fn placement(
    seed: &Tree,
    candidate: &Tree,
    run: &[NodeId],
    reverse: &HashMap<NodeId, NodeId>,
) -> Option<Placement> {
    let previous = candidate.previous_sibling(*run.first()?);
    let next = candidate.next_sibling(*run.last()?);

    match (previous, next) {
        (None, Some(next)) => {
            let anchor = *reverse.get(&next)?;
            Some(Placement {
                parent: seed.parent(anchor)?,
                index: 0,
            })
        }
        (Some(previous), None) => {
            let anchor = *reverse.get(&previous)?;
            Some(Placement {
                parent: seed.parent(anchor)?,
                index: seed.index_in_parent(anchor)? + 1,
            })
        }
        (Some(previous), Some(next)) => {
            let left = *reverse.get(&previous)?;
            let right = *reverse.get(&next)?;
            let parent = seed.parent(left)?;
            if seed.parent(right)? != parent {
                return None;
            }
            let left_index = seed.index_in_parent(left)?;
            let right_index = seed.index_in_parent(right)?;
            (right_index == left_index + 1).then_some(Placement {
                parent,
                index: left_index + 1,
            })
        }
        (None, None) => None,
    }
}

/// Maximal runs of unmatched siblings among the children of matched nodes,
/// starting from the matched record roots and descending through matched
/// children only.
pub fn find_unaligned_runs(
    candidate: &Tree,
    roots: &[NodeId],
    matched: &HashMap<NodeId, NodeId>,
) -> Vec<Vec<NodeId>> {
    let mut runs = Vec::new();
    for root in roots {
        if matched.contains_key(root) {
            collect_runs(candidate, *root, matched, &mut runs);
        }
    }
    runs
}

fn collect_runs(
    candidate: &Tree,
    node: NodeId,
    matched: &HashMap<NodeId, NodeId>,
    runs: &mut Vec<Vec<NodeId>>,
) {
    let mut current: Vec<NodeId> = Vec::new();
    for child in candidate.children(node) {
        if matched.contains_key(child) {
            if !current.is_empty() {
                runs.push(std::mem::take(&mut current));
            }
            collect_runs(candidate, *child, matched, runs);
        } else {
            current.push(*child);
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rd_core::html::parse_fragment;

    struct Case {
        seed: Tree,
        candidate: Tree,
        result: PartialAlignment,
    }

    fn run(seed: &str, candidate: &str) -> Case {
        let mut seed = parse_fragment(seed);
        let candidate = parse_fragment(candidate);
        let seed_roots = vec![seed.root().expect("seed root")];
        let candidate_roots = vec![candidate.root().expect("candidate root")];
        let result = PartialTreeAligner::new().align_records(&mut seed, &seed_roots, &candidate, &candidate_roots);
        Case { seed, candidate, result }
    }

    impl Case {
        fn seed_child_tags(&self) -> Vec<&str> {
            let root = self.seed.root().expect("seed root");
            self.seed.children(root).iter().map(|c| self.seed.tag(*c)).collect()
        }

        fn mapped_tags(&self) -> Vec<&str> {
            let mut tags: Vec<&str> = self.result.mapping.values().map(|c| self.candidate.tag(*c)).collect();
            tags.sort_unstable();
            tags
        }
    }

    #[test]
    fn flanked_insertion() {
        let case = run("<p><a></a><b></b><e></e></p>", "<p><b></b><c></c><d></d><e></e></p>");
        assert_eq!(case.seed_child_tags(), vec!["a", "b", "c", "d", "e"]);
        assert_eq!(case.mapped_tags(), vec!["b", "c", "d", "e", "p"]);
        assert!(case.result.modified);
        assert!(case.result.had_unaligned_runs);
    }

    #[test]
    fn rightmost_insertion() {
        let case = run("<p><a></a><b></b><e></e></p>", "<p><e></e><f></f><g></g></p>");
        assert_eq!(case.seed_child_tags(), vec!["a", "b", "e", "f", "g"]);
        assert_eq!(case.mapped_tags(), vec!["e", "f", "g", "p"]);
        assert!(case.result.modified);
    }

    #[test]
    fn leftmost_insertion() {
        let case = run("<p><a></a><b></b><e></e></p>", "<p><f></f><g></g><a></a></p>");
        assert_eq!(case.seed_child_tags(), vec!["f", "g", "a", "b", "e"]);
        assert_eq!(case.mapped_tags(), vec!["a", "f", "g", "p"]);
        assert!(case.result.modified);
    }

    #[test]
    fn no_unique_insertion_point() {
        let case = run("<p><a></a><b></b><e></e></p>", "<p><a></a><g></g><e></e></p>");
        assert_eq!(case.seed_child_tags(), vec!["a", "b", "e"]);
        assert_eq!(case.mapped_tags(), vec!["a", "e", "p"]);
        assert!(!case.result.modified);
        assert!(case.result.had_unaligned_runs);
    }

    #[test]
    fn swapped_children_keep_the_later_pair() {
        // a-a and b-b score the same; the alignment keeps b-b and the
        // candidate's trailing <a> is appended after the seed's <b>.
        let case = run("<p><a></a><b></b></p>", "<p><b></b><a></a></p>");
        assert_eq!(case.seed_child_tags(), vec!["a", "b", "a"]);
        assert_eq!(case.mapped_tags(), vec!["a", "b", "p"]);
        assert!(case.result.modified);
        let seed_root = case.seed.root().expect("seed root");
        let b = case.seed.children(seed_root)[1];
        let candidate_b = case.result.mapping[&b];
        assert_eq!(case.candidate.index_in_parent(candidate_b), Some(0));
    }

    #[test]
    fn multiple_unaligned_runs() {
        let case = run(
            "<p><x></x><b></b><d></d></p>",
            "<p><b></b><c></c><d></d><h></h><k></k></p>",
        );
        assert_eq!(case.seed_child_tags(), vec!["x", "b", "c", "d", "h", "k"]);
        assert_eq!(case.mapped_tags(), vec!["b", "c", "d", "h", "k", "p"]);
    }

    #[test]
    fn clones_map_their_whole_subtree() {
        let case = run("<div><a></a></div>", "<div><a></a><q><s></s><u></u></q></div>");
        assert_eq!(case.seed_child_tags(), vec!["a", "q"]);
        assert_eq!(case.mapped_tags(), vec!["a", "div", "q", "s", "u"]);
        for (seed_node, candidate_node) in &case.result.mapping {
            assert_eq!(case.seed.tag(*seed_node), case.candidate.tag(*candidate_node));
        }
    }

    #[test]
    fn fully_matched_record_reports_nothing() {
        let case = run("<p><a></a><b></b></p>", "<p><a></a><b></b></p>");
        assert!(!case.result.modified);
        assert!(!case.result.had_unaligned_runs);
        assert_eq!(case.result.mapping.len(), 3);
    }

    #[test]
    fn runs_are_found_at_every_matched_level() {
        let t1 = parse_fragment("<div><h1></h1><h2></h2><h5></h5></div>");
        let t2 = parse_fragment("<div><h2></h2><h3></h3><h4></h4><h5></h5><h6></h6></div>");
        let alignment = SimpleTreeAligner.align_records(
            &t1,
            &[t1.root().expect("root")],
            &t2,
            &[t2.root().expect("root")],
        );
        let matched: HashMap<NodeId, NodeId> = alignment.pairs().into_iter().map(|(a, b)| (b, a)).collect();
        let runs = find_unaligned_runs(&t2, &[t2.root().expect("root")], &matched);
        let tags: Vec<Vec<&str>> = runs
            .iter()
            .map(|run| run.iter().map(|id| t2.tag(*id)).collect())
            .collect();
        assert_eq!(tags, vec![vec!["h3", "h4"], vec!["h6"]]);
    }
}

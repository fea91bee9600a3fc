//! Ranking of record-container candidates.
//!
//! Every element carrying text is addressed by its structural path. Paths
//! that differ only in their positional predicates (`li[1]/b`, `li[2]/b`)
//! describe the same field repeated across records, and their deepest common
//! ancestor is where the records live. An ancestor that several such fields
//! agree on is a strong candidate.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use rd_core::{NodeId, Tree};

/// Candidate containers of `tree`, most corroborated first.
///
/// Elements with fewer than `min_children` children are left out. Candidates
/// with the same count keep the order in which their first field appears in
/// the document.
pub fn list_candidates(tree: &Tree, min_children: usize) -> Vec<NodeId> {
    let Some(root) = tree.root() else {
        return Vec::new();
    };

    // shape key -> full paths; `order` keeps the keys in first-seen order
    let mut groups: HashMap<String, Vec<String>> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for id in tree.descendants(root) {
        if tree.text(id).is_none() {
            continue;
        }
        let path = tree.path(id);
        let key = shape_key(&path);
        match groups.entry(key) {
            Entry::Occupied(mut entry) => entry.get_mut().push(path),
            Entry::Vacant(entry) => {
                order.push(entry.key().clone());
                entry.insert(vec![path]);
            }
        }
    }

    // ancestor path -> its slot in `counts`
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();
    for key in &order {
        let ancestor = common_prefix(&groups[key]);
        match slots.get(&ancestor).copied() {
            Some(slot) => counts[slot].1 += 1,
            None => {
                slots.insert(ancestor.clone(), counts.len());
                counts.push((ancestor, 1));
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    log::debug!("{} field groups converge on {} ancestors", groups.len(), counts.len());

    counts
        .iter()
        .filter_map(|(path, _)| tree.find_by_path(path))
        .filter(|id| tree.children(*id).len() >= min_children)
        .collect()
}

/// `path` with every `[k]` predicate removed.
pub fn shape_key(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut depth = 0usize;
    for c in path.chars() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

/// Longest shared run of leading `/`-separated segments.
fn common_prefix(paths: &[String]) -> String {
    let mut split = paths.iter().map(|p| p.split('/').collect::<Vec<_>>());
    let Some(mut prefix) = split.next() else {
        return String::new();
    };
    for segments in split {
        let shared = prefix
            .iter()
            .zip(&segments)
            .take_while(|(a, b)| a == b)
            .count();
        prefix.truncate(shared);
    }
    prefix.join("/")
}

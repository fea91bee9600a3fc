//! Records and record division.
//!
//! A [`Record`] is one instance of the repeated pattern: a contiguous run of
//! sibling elements. [`RecordFinder`] splits a labelled sibling sequence into
//! records by choosing the cluster label that works best as a separator.

use std::collections::{BTreeSet, HashMap};

use rd_core::{NodeId, RdError, Result, Tree};
use rd_match::lcs::try_weighted_lcs;

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// Ordered tuple of sibling elements forming one record instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record {
    elements: Vec<NodeId>,
}

impl Record {
    pub fn new(elements: Vec<NodeId>) -> Self {
        Self { elements }
    }

    pub fn elements(&self) -> &[NodeId] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Sum of the subtree sizes of the record's elements.
    pub fn size(&self, tree: &Tree) -> usize {
        self.elements.iter().map(|e| tree.subtree_size(*e)).sum()
    }
}

impl FromIterator<NodeId> for Record {
    fn from_iter<I: IntoIterator<Item = NodeId>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// SimilarityCache
// ---------------------------------------------------------------------------

/// Pairwise element similarities computed for one extraction.
///
/// Filled while building the similarity matrix and read back when scoring
/// record divisions. A missing pair is a programming error and surfaces as
/// [`RdError::SimilarityCacheMiss`].
#[derive(Debug, Clone, Default)]
pub struct SimilarityCache {
    values: HashMap<(NodeId, NodeId), f64>,
}

impl SimilarityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `similarity` for both orientations of the pair.
    pub fn insert(&mut self, a: NodeId, b: NodeId, similarity: f64) {
        self.values.insert((a, b), similarity);
        self.values.insert((b, a), similarity);
    }

    pub fn get(&self, a: NodeId, b: NodeId) -> Result<f64> {
        self.values
            .get(&(a, b))
            .copied()
            .ok_or(RdError::SimilarityCacheMiss { left: a, right: b })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ---------------------------------------------------------------------------
// RecordFinder
// ---------------------------------------------------------------------------

pub struct RecordFinder<'c> {
    cache: &'c SimilarityCache,
}

impl<'c> RecordFinder<'c> {
    pub fn new(cache: &'c SimilarityCache) -> Self {
        Self { cache }
    }

    /// Try every distinct label as the record separator and keep the division
    /// whose records are most alike.
    ///
    /// The score of a division is the sum of pairwise record similarities
    /// divided by `pairs + 1`, which pushes single-record divisions towards
    /// zero. Labels are tried in ascending order and only a strictly better
    /// score replaces the current best.
    ///
    /// Returns `Ok(None)` when no label repeats (there is nothing to divide)
    /// or no label yields a proper division.
    pub fn find_best_division(
        &self,
        elements: &[NodeId],
        labels: &[usize],
    ) -> Result<Option<Vec<Record>>> {
        check_lengths(elements, labels)?;
        if all_unique(labels) {
            return Ok(None);
        }

        let mut best: Option<(f64, Vec<Record>)> = None;
        for label in labels.iter().copied().collect::<BTreeSet<_>>() {
            let records = split_at_label(elements, labels, label);
            if records.is_empty() {
                continue;
            }

            let mut total = 0.0;
            let mut pairs = 0usize;
            for (i, first) in records.iter().enumerate() {
                for second in &records[i + 1..] {
                    total += self.align_record_similarity(first, second)?;
                    pairs += 1;
                }
            }
            let average = total / (pairs + 1) as f64;
            log::trace!("separator label {label}: {} records, score {average:.4}", records.len());

            if best.as_ref().map_or(true, |(score, _)| average > *score) {
                best = Some((average, records));
            }
        }

        Ok(best.map(|(_, records)| records))
    }

    /// Divide `elements` using a known separator `label`.
    pub fn find_division(
        &self,
        elements: &[NodeId],
        labels: &[usize],
        label: usize,
    ) -> Result<Option<Vec<Record>>> {
        check_lengths(elements, labels)?;
        if all_unique(labels) {
            return Ok(None);
        }
        let records = split_at_label(elements, labels, label);
        Ok((!records.is_empty()).then_some(records))
    }

    /// Sequence alignment of the two records' element lists using the cached
    /// element similarities, normalized by `max(len) + 1`.
    pub fn align_record_similarity(&self, first: &Record, second: &Record) -> Result<f64> {
        let (a, b) = (first.elements(), second.elements());
        let table = try_weighted_lcs(a.len(), b.len(), |i, j| self.cache.get(a[i], b[j]))?;
        Ok(table.score() / (a.len().max(b.len()) + 1) as f64)
    }
}

fn check_lengths(elements: &[NodeId], labels: &[usize]) -> Result<()> {
    if elements.len() != labels.len() {
        return Err(RdError::InvalidInput(format!(
            "{} elements but {} cluster labels",
            elements.len(),
            labels.len()
        )));
    }
    Ok(())
}

fn all_unique(labels: &[usize]) -> bool {
    labels.iter().collect::<BTreeSet<_>>().len() == labels.len()
}

/// Split at every element carrying `label`; each such element opens a new
/// run. Runs covering the whole sequence are not records.
fn split_at_label(elements: &[NodeId], labels: &[usize], label: usize) -> Vec<Record> {
    let mut runs: Vec<Vec<NodeId>> = Vec::new();
    let mut current: Vec<NodeId> = Vec::new();
    for (element, l) in elements.iter().zip(labels) {
        if *l == label && !current.is_empty() {
            runs.push(std::mem::take(&mut current));
        }
        current.push(*element);
    }
    if !current.is_empty() {
        runs.push(current);
    }

    runs.into_iter()
        .filter(|run| run.len() < elements.len())
        .map(Record::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Elements named like `b1`, `c2`: identical names are 1.0 similar, same
    /// first letter 0.9, anything else 0.
    fn fixture(names: &[&str]) -> (Vec<NodeId>, SimilarityCache, HashMap<NodeId, String>) {
        let ids: Vec<NodeId> = (0..names.len()).map(|i| NodeId::new(i as u32)).collect();
        let mut cache = SimilarityCache::new();
        for i in 0..names.len() {
            for j in i..names.len() {
                let sim = if names[i] == names[j] {
                    1.0
                } else if names[i][..1] == names[j][..1] {
                    0.9
                } else {
                    0.0
                };
                cache.insert(ids[i], ids[j], sim);
            }
        }
        let by_id = ids.iter().copied().zip(names.iter().map(|s| s.to_string())).collect();
        (ids, cache, by_id)
    }

    fn names(records: &[Record], by_id: &HashMap<NodeId, String>) -> Vec<Vec<String>> {
        records
            .iter()
            .map(|r| r.elements().iter().map(|id| by_id[id].clone()).collect())
            .collect()
    }

    #[test]
    fn leading_element_becomes_its_own_record() {
        let (ids, cache, by_id) = fixture(&["a", "b1", "c1", "b2", "c2"]);
        let records = RecordFinder::new(&cache)
            .find_best_division(&ids, &[0, 1, 2, 1, 2])
            .expect("cache is complete")
            .expect("division");
        assert_eq!(names(&records, &by_id), vec![vec!["a"], vec!["b1", "c1"], vec!["b2", "c2"]]);
    }

    #[test]
    fn two_element_records() {
        let (ids, cache, by_id) = fixture(&["b1", "c1", "b2", "c2"]);
        let records = RecordFinder::new(&cache)
            .find_best_division(&ids, &[1, 2, 1, 2])
            .expect("cache is complete")
            .expect("division");
        assert_eq!(names(&records, &by_id), vec![vec!["b1", "c1"], vec!["b2", "c2"]]);
    }

    #[test]
    fn single_cluster_gives_single_element_records() {
        let (ids, cache, _) = fixture(&["b1", "b2", "b3", "b4"]);
        let records = RecordFinder::new(&cache)
            .find_best_division(&ids, &[1, 1, 1, 1])
            .expect("cache is complete")
            .expect("division");
        assert_eq!(records.len(), 4);
        assert!(records.iter().all(|r| r.len() == 1));
    }

    #[test]
    fn trailing_odd_element_joins_last_record() {
        let (ids, cache, by_id) = fixture(&["b1", "b2", "b3", "b4"]);
        let records = RecordFinder::new(&cache)
            .find_best_division(&ids, &[1, 1, 1, 2])
            .expect("cache is complete")
            .expect("division");
        assert_eq!(names(&records, &by_id), vec![vec!["b1"], vec!["b2"], vec!["b3", "b4"]]);
    }

    #[test]
    fn no_repetition_no_records() {
        let (ids, cache, _) = fixture(&["a", "b", "c", "d"]);
        let finder = RecordFinder::new(&cache);
        assert!(finder.find_best_division(&ids, &[1, 2, 3, 4]).expect("ok").is_none());
        assert!(finder.find_best_division(&[], &[]).expect("ok").is_none());
        assert!(finder.find_best_division(&ids[..1], &[7]).expect("ok").is_none());
    }

    #[test]
    fn given_separator_label() {
        let (ids, cache, by_id) = fixture(&["b1", "c1", "b2", "c2"]);
        let finder = RecordFinder::new(&cache);
        let records = finder
            .find_division(&ids, &[0, 1, 0, 1], 0)
            .expect("ok")
            .expect("division");
        assert_eq!(names(&records, &by_id), vec![vec!["b1", "c1"], vec!["b2", "c2"]]);
        // A label that never occurs splits nothing.
        assert!(finder.find_division(&ids, &[0, 1, 0, 1], 5).expect("ok").is_none());
    }

    #[test]
    fn cache_miss_is_an_error() {
        let (ids, _, _) = fixture(&["b1", "c1", "b2", "c2"]);
        let empty = SimilarityCache::new();
        let result = RecordFinder::new(&empty).find_best_division(&ids, &[1, 2, 1, 2]);
        assert!(matches!(result, Err(RdError::SimilarityCacheMiss { .. })));
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let (ids, cache, _) = fixture(&["b1", "b2"]);
        let result = RecordFinder::new(&cache).find_best_division(&ids, &[1]);
        assert!(matches!(result, Err(RdError::InvalidInput(_))));
    }

    #[test]
    fn record_similarity_is_normalized() {
        let (ids, cache, _) = fixture(&["b1", "c1", "b2", "c2"]);
        let finder = RecordFinder::new(&cache);
        let r1 = Record::new(vec![ids[0], ids[1]]);
        let r2 = Record::new(vec![ids[2], ids[3]]);
        let sim = finder.align_record_similarity(&r1, &r2).expect("cached");
        assert!((sim - 0.6).abs() < 1e-9, "got {sim}");
    }
}

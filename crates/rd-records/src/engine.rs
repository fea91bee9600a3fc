//! Record mining engine.
//!
//! [`RecordMiner`] is the primary entry point. It ranks candidate containers
//! in a document and, for a chosen container, clusters its children by
//! clustered tree match, divides them into records and aligns the records
//! into one template.

use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use rd_core::html::{decode, parse_document};
use rd_core::{NodeId, Result, Tree};
use rd_match::{ClusteredMatcher, MatchWeights};

use crate::aligner::RecordAligner;
use crate::candidates::list_candidates;
use crate::cluster::{hierarchical_cluster, SimilarityMatrix};
use crate::record::{RecordFinder, SimilarityCache};
use crate::result::Extraction;
use crate::seed::SeedTemplate;

// ---------------------------------------------------------------------------
// MinerConfig
// ---------------------------------------------------------------------------

/// Runtime configuration for the record miner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinerConfig {
    /// Distance (`1 - similarity`) at which the clustering dendrogram is
    /// cut. Children whose cluster stays within this distance share a label.
    /// Default: 0.9.
    pub threshold: f64,
    /// Weight of a tag match in the clustered score (`c1`).
    /// Default: 1.0.
    pub tag_weight: f64,
    /// Weight of a shared `class` / `itemprop` in the clustered score (`c2`).
    /// Default: 1.0.
    pub attribute_weight: f64,
    /// Minimum number of children for a candidate container.
    /// Default: 2.
    pub min_children: usize,
    /// Score the children pairs of a container on the rayon pool.
    /// Default: true.
    pub parallel_similarity: bool,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            threshold: 0.9,
            tag_weight: 1.0,
            attribute_weight: 1.0,
            min_children: 2,
            parallel_similarity: true,
        }
    }
}

impl MinerConfig {
    pub fn weights(&self) -> MatchWeights {
        MatchWeights {
            tag: self.tag_weight,
            attribute: self.attribute_weight,
        }
    }
}

// ---------------------------------------------------------------------------
// RecordMiner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct RecordMiner {
    config: MinerConfig,
    aligner: RecordAligner,
}

impl RecordMiner {
    pub fn new(config: MinerConfig) -> Self {
        Self {
            config,
            aligner: RecordAligner::new(),
        }
    }

    pub fn config(&self) -> &MinerConfig {
        &self.config
    }

    /// Parse `markup` and rank its candidate containers.
    pub fn list_candidates(&self, markup: &str) -> (Vec<NodeId>, Tree) {
        let tree = parse_document(markup);
        (self.candidates_in(&tree), tree)
    }

    /// [`RecordMiner::list_candidates`] on raw bytes in the given encoding.
    pub fn list_candidates_bytes(&self, bytes: &[u8], encoding: &str) -> Result<(Vec<NodeId>, Tree)> {
        let markup = decode(bytes, encoding)?;
        Ok(self.list_candidates(&markup))
    }

    /// Rank the candidate containers of an already parsed document.
    pub fn candidates_in(&self, tree: &Tree) -> Vec<NodeId> {
        list_candidates(tree, self.config.min_children)
    }

    /// Clustered tree match between every pair of children of `element`.
    ///
    /// The returned cache holds the same values, for both orientations of
    /// every pair, keyed by node id.
    pub fn calculate_similarity_matrix(
        &self,
        tree: &Tree,
        element: NodeId,
    ) -> (SimilarityMatrix, SimilarityCache) {
        let children = tree.children(element);
        let n = children.len();
        let matcher = ClusteredMatcher::within(tree, self.config.weights());

        let pairs: Vec<(usize, usize)> = (0..n).flat_map(|i| (i..n).map(move |j| (i, j))).collect();
        let score = |(i, j): (usize, usize)| (i, j, matcher.score(children[i], children[j]));
        let scores: Vec<(usize, usize, f64)> = if self.config.parallel_similarity {
            pairs.into_par_iter().map(score).collect()
        } else {
            pairs.into_iter().map(score).collect()
        };

        let mut matrix = SimilarityMatrix::new(n);
        let mut cache = SimilarityCache::new();
        for (i, j, similarity) in scores {
            matrix.set(i, j, similarity);
            cache.insert(children[i], children[j], similarity);
        }
        (matrix, cache)
    }

    /// Flat cluster labels for the rows of `matrix`, cut at distance
    /// `threshold`.
    pub fn hierarchical_cluster(&self, matrix: &SimilarityMatrix, threshold: f64) -> Vec<usize> {
        hierarchical_cluster(matrix, threshold)
    }

    /// Discover the records under `element` and align them.
    ///
    /// With a `prior` template each child is labelled with the index of the
    /// template element it resembles most, and the children are divided at
    /// the ones resembling the first template element. The prior template
    /// itself is not modified.
    ///
    /// A container with fewer than two children, or without a repeated
    /// structure, gives an empty [`Extraction`].
    pub fn extract(
        &self,
        tree: &Tree,
        element: NodeId,
        prior: Option<&SeedTemplate>,
    ) -> Result<Extraction> {
        let start = Instant::now();
        let children = tree.children(element);
        if children.len() < 2 {
            log::debug!("{element} has {} children, nothing to extract", children.len());
            return Ok(Extraction::empty());
        }

        let records = match prior {
            Some(seed) => {
                let labels = self.label_by_seed(tree, children, seed);
                let cache = SimilarityCache::new();
                RecordFinder::new(&cache).find_division(children, &labels, 0)?
            }
            None => {
                let (matrix, cache) = self.calculate_similarity_matrix(tree, element);
                let labels = self.hierarchical_cluster(&matrix, self.config.threshold);
                log::debug!(
                    "{element}: {} children in {} clusters",
                    children.len(),
                    labels.iter().max().map_or(0, |l| l + 1)
                );
                RecordFinder::new(&cache).find_best_division(children, &labels)?
            }
        };

        let Some(records) = records else {
            log::debug!("{element}: no repeated structure");
            return Ok(Extraction::empty());
        };
        log::debug!("{element}: {} records", records.len());

        let extraction = self
            .aligner
            .align(tree, records, prior)
            .map(Extraction::from)
            .unwrap_or_default();
        log::debug!(
            "{element}: extracted in {} ms",
            start.elapsed().as_millis()
        );
        Ok(extraction)
    }

    /// [`RecordMiner::extract`] on several containers of the same document,
    /// in parallel. Results are in the order of `elements`.
    pub fn extract_all(&self, tree: &Tree, elements: &[NodeId]) -> Vec<Result<Extraction>> {
        elements
            .par_iter()
            .map(|element| self.extract(tree, *element, None))
            .collect()
    }

    /// Index of the most similar template element for every child; the first
    /// one wins on ties.
    fn label_by_seed(&self, tree: &Tree, children: &[NodeId], seed: &SeedTemplate) -> Vec<usize> {
        let matcher = ClusteredMatcher::new(tree, seed.tree(), self.config.weights());
        children
            .iter()
            .map(|child| {
                let mut best = (0usize, f64::NEG_INFINITY);
                for (index, element) in seed.elements().iter().enumerate() {
                    let similarity = matcher.score(*child, *element);
                    if similarity > best.1 {
                        best = (index, similarity);
                    }
                }
                best.0
            })
            .collect()
    }
}

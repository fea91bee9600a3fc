//! Complete-linkage hierarchical clustering over a similarity matrix.
//!
//! Similarities are turned into distances with `1 - similarity`. The
//! dendrogram follows the usual linkage layout: leaves are clusters
//! `0..n`, and the cluster formed by the `k`-th merge has id `n + k`.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SimilarityMatrix
// ---------------------------------------------------------------------------

/// Dense symmetric `n × n` similarity matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatrix {
    size: usize,
    values: Vec<f64>,
}

impl SimilarityMatrix {
    /// All-zero matrix.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            values: vec![0.0; size * size],
        }
    }

    /// Build from a uniform value (handy for degenerate inputs).
    pub fn filled(size: usize, value: f64) -> Self {
        Self {
            size,
            values: vec![value; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.size + j]
    }

    /// Set both `(i, j)` and `(j, i)`.
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        self.values[i * self.size + j] = value;
        self.values[j * self.size + i] = value;
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.values[i * self.size..(i + 1) * self.size]
    }
}

// ---------------------------------------------------------------------------
// Dendrogram
// ---------------------------------------------------------------------------

/// One agglomeration step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Merge {
    pub left: usize,
    pub right: usize,
    /// Complete-linkage distance between the two merged clusters.
    pub distance: f64,
    /// Number of leaves in the new cluster.
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dendrogram {
    leaves: usize,
    merges: Vec<Merge>,
}

impl Dendrogram {
    pub fn leaves(&self) -> usize {
        self.leaves
    }

    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }

    /// Flat cluster labels, one per leaf in input order, joining every merge
    /// whose distance is at most `max_distance`. Labels are numbered in order
    /// of first appearance.
    pub fn cut(&self, max_distance: f64) -> Vec<usize> {
        let n = self.leaves;
        let mut parent: Vec<usize> = (0..n).collect();
        // Any leaf of each cluster id, leaves first then merged clusters.
        let mut representative: Vec<usize> = (0..n).collect();

        for merge in &self.merges {
            let left = representative[merge.left];
            let right = representative[merge.right];
            if merge.distance <= max_distance {
                let (a, b) = (find(&mut parent, left), find(&mut parent, right));
                if a != b {
                    parent[b] = a;
                }
            }
            representative.push(left);
        }

        let mut labels = Vec::with_capacity(n);
        let mut seen: Vec<(usize, usize)> = Vec::new();
        for leaf in 0..n {
            let root = find(&mut parent, leaf);
            let label = match seen.iter().find(|(r, _)| *r == root) {
                Some((_, label)) => *label,
                None => {
                    let label = seen.len();
                    seen.push((root, label));
                    label
                }
            };
            labels.push(label);
        }
        labels
    }
}

fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}

/// Complete-linkage agglomeration of the rows of `matrix`.
///
/// At every step the two active clusters with the smallest distance are
/// merged (lowest index pair on ties); the distance from the new cluster to
/// any other is the larger of the two old distances.
pub fn linkage(matrix: &SimilarityMatrix) -> Dendrogram {
    let n = matrix.size();
    let mut distance: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| 1.0 - matrix.get(i, j)).collect())
        .collect();
    let mut active = vec![true; n];
    let mut cluster_id: Vec<usize> = (0..n).collect();
    let mut cluster_size = vec![1usize; n];
    let mut merges = Vec::with_capacity(n.saturating_sub(1));

    for step in 0..n.saturating_sub(1) {
        let mut best: Option<(usize, usize, f64)> = None;
        for i in (0..n).filter(|i| active[*i]) {
            for j in (i + 1..n).filter(|j| active[*j]) {
                if best.map_or(true, |(_, _, d)| distance[i][j] < d) {
                    best = Some((i, j, distance[i][j]));
                }
            }
        }
        let Some((i, j, d)) = best else {
            break;
        };

        merges.push(Merge {
            left: cluster_id[i],
            right: cluster_id[j],
            distance: d,
            size: cluster_size[i] + cluster_size[j],
        });

        for k in (0..n).filter(|k| active[*k] && *k != i && *k != j) {
            let merged = distance[i][k].max(distance[j][k]);
            distance[i][k] = merged;
            distance[k][i] = merged;
        }
        active[j] = false;
        cluster_id[i] = n + step;
        cluster_size[i] += cluster_size[j];
    }

    Dendrogram { leaves: n, merges }
}

/// Cluster the rows of `matrix` by cutting the complete-linkage dendrogram
/// at distance `threshold`: two elements share a label when every pair in
/// their cluster is at most `threshold` apart (similarity at least
/// `1 - threshold`).
pub fn hierarchical_cluster(matrix: &SimilarityMatrix, threshold: f64) -> Vec<usize> {
    linkage(matrix).cut(threshold)
}

//! Weighted longest-common-subsequence table.
//!
//! The one sequence-alignment primitive of the workspace. Tree matching,
//! clustered matching, record similarity and tree alignment all align two
//! ordered sequences (children lists or record element lists) with
//!
//! ```text
//! cell(i, j) = max(cell(i, j-1), cell(i-1, j), cell(i-1, j-1) + weight(i-1, j-1))
//! ```
//!
//! and differ only in the weight they plug in.

use std::convert::Infallible;
use std::ops::Add;

/// Move recorded for one table cell, used to recover the matched pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Skip an element of the second sequence.
    Left,
    /// Skip an element of the first sequence.
    Up,
    /// Pair the two elements.
    Diag,
}

/// Filled DP table for two sequences of length `rows` and `cols`.
#[derive(Debug, Clone)]
pub struct LcsTable<S> {
    scores: Vec<Vec<S>>,
    trace: Vec<Vec<Step>>,
}

impl<S: Copy> LcsTable<S> {
    /// Score of the full alignment (bottom-right cell).
    pub fn score(&self) -> S {
        let last = &self.scores[self.scores.len() - 1];
        last[last.len() - 1]
    }

    /// Index pairs taken on the diagonal, in ascending order.
    ///
    /// Walks back from the bottom-right cell following the recorded steps.
    pub fn backtrace(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        let mut row = self.trace.len();
        let mut col = self.trace.first().map_or(0, Vec::len);
        while row > 0 && col > 0 {
            match self.trace[row - 1][col - 1] {
                Step::Diag => {
                    pairs.push((row - 1, col - 1));
                    row -= 1;
                    col -= 1;
                }
                Step::Up => row -= 1,
                Step::Left => col -= 1,
            }
        }
        pairs.reverse();
        pairs
    }
}

/// Fill the table with an infallible weight function.
pub fn weighted_lcs<S, W>(rows: usize, cols: usize, mut weight: W) -> LcsTable<S>
where
    S: Copy + Default + PartialOrd + Add<Output = S>,
    W: FnMut(usize, usize) -> S,
{
    match try_weighted_lcs::<S, Infallible, _>(rows, cols, |i, j| Ok(weight(i, j))) {
        Ok(table) => table,
        Err(never) => match never {},
    }
}

/// Fill the table, stopping at the first weight error.
///
/// Ties: a vertical move is taken only when it is strictly better than the
/// horizontal one, and the diagonal only when it is strictly better than both.
pub fn try_weighted_lcs<S, E, W>(rows: usize, cols: usize, mut weight: W) -> Result<LcsTable<S>, E>
where
    S: Copy + Default + PartialOrd + Add<Output = S>,
    W: FnMut(usize, usize) -> Result<S, E>,
{
    let mut scores = vec![vec![S::default(); cols + 1]; rows + 1];
    let mut trace = vec![vec![Step::Left; cols]; rows];

    for i in 1..=rows {
        for j in 1..=cols {
            let (mut best, mut step) = if scores[i - 1][j] > scores[i][j - 1] {
                (scores[i - 1][j], Step::Up)
            } else {
                (scores[i][j - 1], Step::Left)
            };
            let diagonal = scores[i - 1][j - 1] + weight(i - 1, j - 1)?;
            if diagonal > best {
                best = diagonal;
                step = Step::Diag;
            }
            scores[i][j] = best;
            trace[i - 1][j - 1] = step;
        }
    }

    Ok(LcsTable { scores, trace })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn equal_weight(a: &str, b: &str) -> LcsTable<u32> {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        weighted_lcs(a.len(), b.len(), |i, j| u32::from(a[i] == b[j]))
    }

    #[test]
    fn classic_lcs_length_and_pairs() {
        let table = equal_weight("abcbdab", "bdcaba");
        assert_eq!(table.score(), 4);
        let pairs = table.backtrace();
        assert_eq!(pairs.len(), 4);
        assert!(pairs.windows(2).all(|w| w[0].0 < w[1].0 && w[0].1 < w[1].1));
    }

    #[test]
    fn empty_sequences_score_zero() {
        let table = equal_weight("", "abc");
        assert_eq!(table.score(), 0);
        assert!(table.backtrace().is_empty());
        let table = equal_weight("abc", "");
        assert_eq!(table.score(), 0);
        assert!(table.backtrace().is_empty());
    }

    #[test]
    fn float_weights() {
        let table = weighted_lcs(2, 2, |i, j| if i == j { 0.5 } else { 0.9 });
        // Both diagonals (0.5 + 0.5) beat a single cross pair (0.9).
        assert!((table.score() - 1.0f64).abs() < 1e-12);
        assert_eq!(table.backtrace(), vec![(0, 0), (1, 1)]);
    }

    #[test]
    fn skip_ties_go_left() {
        // "ab" against "ba": pairing a-a or b-b both score 1. Walking back,
        // the tie skips the last column first, so b-b is kept.
        let table = equal_weight("ab", "ba");
        assert_eq!(table.score(), 1);
        assert_eq!(table.backtrace(), vec![(1, 0)]);

        let table = equal_weight("ba", "ab");
        assert_eq!(table.backtrace(), vec![(1, 0)]);
    }

    #[test]
    fn strictly_better_up_wins() {
        // Skipping the last row keeps the a-a pair worth 3.
        let a = ["a", "x"];
        let b = ["a"];
        let table = weighted_lcs(a.len(), b.len(), |i, j| if a[i] == b[j] { 3u32 } else { 0 });
        assert_eq!(table.score(), 3);
        assert_eq!(table.backtrace(), vec![(0, 0)]);
    }

    #[test]
    fn errors_propagate() {
        let result: Result<LcsTable<u32>, &str> =
            try_weighted_lcs(2, 2, |i, j| if i == 1 && j == 1 { Err("miss") } else { Ok(1) });
        assert_eq!(result.err(), Some("miss"));
    }

    #[test]
    fn transposed_tables_agree() {
        let w = [[0.2, 0.7, 0.1], [0.4, 0.0, 0.9]];
        let a = weighted_lcs(2, 3, |i, j| w[i][j]);
        let b = weighted_lcs(3, 2, |i, j| w[j][i]);
        assert_eq!(a.score(), b.score());
    }
}

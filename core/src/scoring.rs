//! Weights, bounds and the top-k collector.
//!
//! Weights are quantized to fixed point so sums are exact and independent of the order
//! in which a strategy visits terms. Pruning comparisons can therefore be strict without
//! any rounding slack.

use crate::descriptor::Representation;
use crate::document::DocId;
use crate::index::PostingList;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Fixed-point score, `SCALE` units per 1.0.
pub type Score = u64;

const SCALE: f64 = 1_048_576.0;

pub fn to_f32(score: Score) -> f32 { (score as f64 / SCALE) as f32 }

/// Per-posting weight under a representation.
#[derive(Debug, Clone, Copy)]
pub struct Scorer {
    representation: Representation,
    num_docs: f64,
}

impl Scorer {
    pub fn new(representation: Representation, num_docs: u32) -> Self {
        Self { representation, num_docs: num_docs.max(1) as f64 }
    }

    pub fn weight(&self, tf: u32, df: usize) -> Score {
        let w = match self.representation {
            Representation::Boolean => 0.0,
            Representation::WordCount => tf as f64,
            Representation::TfIdf if tf == 0 => 0.0,
            Representation::TfIdf => {
                let idf = (1.0 + self.num_docs / df.max(1) as f64).ln();
                (1.0 + (tf as f64).ln()) * idf
            }
        };
        (w * SCALE).round() as Score
    }

    /// Largest weight any posting of `list` can contribute.
    pub fn upper_bound(&self, list: &PostingList) -> Score {
        self.weight(list.max_tf(), list.len())
    }
}

/// True when a document whose score is at most `bound` can never enter the top k.
pub fn cannot_beat(bound: Score, threshold: Option<Score>) -> bool {
    threshold.is_some_and(|t| bound < t)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ranked {
    pub doc: DocId,
    pub score: Score,
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for Ranked {
    /// Greater is better: higher score, then lower doc id.
    fn cmp(&self, other: &Self) -> Ordering {
        self.score.cmp(&other.score).then_with(|| other.doc.cmp(&self.doc))
    }
}

/// Bounded min-heap holding the k best documents seen so far.
#[derive(Debug)]
pub struct TopK {
    k: usize,
    heap: BinaryHeap<Reverse<Ranked>>,
}

impl TopK {
    pub fn new(k: usize) -> Self { Self { k, heap: BinaryHeap::with_capacity(k + 1) } }

    /// Score of the k-th best document once k are held.
    pub fn threshold(&self) -> Option<Score> {
        if self.heap.len() < self.k {
            return None;
        }
        self.heap.peek().map(|r| r.0.score)
    }

    pub fn offer(&mut self, doc: DocId, score: Score) {
        if self.k == 0 {
            return;
        }
        let candidate = Ranked { doc, score };
        if self.heap.len() < self.k {
            self.heap.push(Reverse(candidate));
        } else if self.heap.peek().is_some_and(|worst| candidate > worst.0) {
            self.heap.pop();
            self.heap.push(Reverse(candidate));
        }
    }

    /// Best first.
    pub fn into_sorted(self) -> Vec<Ranked> {
        self.heap.into_sorted_vec().into_iter().map(|r| r.0).collect()
    }
}

// Decision Forest Core
// Copyright (C) 2023 Krzysztof Piwoński <piwonski.kris@gmail.com>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! The packed, immutable forest (§3, §4.8). Grounded on
//! `original_source/ArboristCore/dectree.h` for the parallel-array shape
//! (`pred[]`/`split[]`/`score[]`/`bump[]`/`origin[]`/`facOff[]`/`facSplits[]`)
//! that the prediction walker (§4.9) runs against directly, rather than a
//! pointer tree -- kept verbatim here because prediction throughput depends
//! on it, while everything upstream of consumption (PreTree) is a normal
//! owned, typed tree.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::pretree::PreTree;

/// Sentinel `pred[]` value for a leaf node (no real predictor index is negative).
pub const LEAF_PRED: i32 = -1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leaf {
    pub score: f64,
    /// Number of distinct bagged sample indices reaching this leaf.
    pub extent: u32,
    /// Per-category probability, classification only (empty for regression).
    /// The decided home for prediction-tie jitter (§4.8), kept out of `score`'s bits.
    pub category_prob: Vec<f32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BagSample {
    pub leaf_idx: u32,
    pub s_count: u32,
}

/// Per-leaf response aggregate handed in by the training loop when a node
/// stops splitting, before its `IndexSet` is discarded.
#[derive(Debug, Clone)]
pub struct LeafStats {
    pub sum: f64,
    pub s_count: u32,
    pub ctg_sum: Vec<f64>,
    /// `(sample index, raw response value)` for every bagged sample reaching this leaf.
    pub samples: Vec<(u32, f64)>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Forest {
    pub n_pred: usize,
    pub n_ctg: usize,
    pub pred: Vec<i32>,
    /// Numeric cut value, or (for factor nodes) the node-local bit offset
    /// into this tree's factor-bit region.
    pub split: Vec<f64>,
    pub score: Vec<f64>,
    /// `0` marks a leaf; otherwise the right child is `node + bump`, the
    /// left child is always `node + 1` (the PreTree breadth-first invariant).
    pub bump: Vec<u32>,
    /// Per-tree start offset into `pred`/`split`/`score`/`bump`.
    pub origin: Vec<usize>,
    /// Per-tree bit-address base into `fac_bits`.
    pub fac_offset: Vec<usize>,
    pub fac_bits: Vec<u32>,
    /// Per-node factor cardinality (0 for numeric/leaf nodes), so
    /// prediction can bound-check an observed code against the subset the
    /// tree was actually trained on (§7).
    pub fac_cardinality: Vec<u32>,
    pub leaves: Vec<Leaf>,
    pub leaf_origin: Vec<usize>,
    pub bag_samples: Vec<BagSample>,
    /// Response value of each `bag_samples` entry, parallel array. The
    /// quantile walk (§4.10) pools these per leaf instead of re-deriving
    /// them from a separate rank-origin/rank-count table.
    pub bag_values: Vec<f64>,
    pub bag_origin: Vec<usize>,
    /// Per-tree in-bag bitset over training rows, word-packed LSB-first.
    pub in_bag: Vec<Vec<u32>>,
    pub n_row: usize,
}

#[inline]
fn fac_bit(words: &[u32], bit_idx: usize) -> bool {
    (words[bit_idx / 32] >> (bit_idx % 32)) & 1 == 1
}

impl Forest {
    pub fn new(n_pred: usize, n_ctg: usize, n_row: usize) -> Self {
        Forest { n_pred, n_ctg, n_row, ..Default::default() }
    }

    pub fn n_tree(&self) -> usize {
        self.origin.len()
    }

    #[inline]
    pub fn in_bag(&self, tree: usize, row: usize) -> bool {
        fac_bit(&self.in_bag[tree], row)
    }

    /// Routes a factor code to a branch. A code at or past the node's
    /// trained cardinality (an unseen level at predict time) has no bit
    /// recorded for it; §7 routes it to the false branch with a warning
    /// rather than indexing past the node's packed bit region.
    #[inline]
    pub fn factor_branch_left(&self, tree: usize, node: usize, code: usize) -> bool {
        let cardinality = self.fac_cardinality[node] as usize;
        if code >= cardinality {
            log::warn!(
                "tree {tree} node {node}: factor code {code} exceeds trained cardinality {cardinality}; routing to false branch"
            );
            return false;
        }
        let bit_idx = self.fac_offset[tree] + self.split[node] as usize + code;
        fac_bit(&self.fac_bits, bit_idx)
    }

    /// Appends one tree's `PreTree` in flattened form, returning its tree
    /// index. `sample_s_count[sIdx]` gives each bagged sample's draw
    /// multiplicity, for the `BagSample` export.
    pub fn consume_tree(&mut self, pt: &PreTree, leaf_stats: &HashMap<u32, LeafStats>, sample_s_count: &[u32]) -> usize {
        let tree_idx = self.origin.len();
        let origin = self.pred.len();
        self.origin.push(origin);

        let fac_word_base = self.fac_bits.len();
        self.fac_offset.push(fac_word_base * 32);
        self.fac_bits.extend_from_slice(&pt.fac_bits);

        let leaf_origin = self.leaves.len();
        self.leaf_origin.push(leaf_origin);
        let bag_origin = self.bag_samples.len();
        self.bag_origin.push(bag_origin);

        // pt_id -> flattened leaf slot, assigned in pt_id order.
        let mut leaf_slot: HashMap<u32, u32> = HashMap::new();

        for (pt_id, node) in pt.nodes.iter().enumerate() {
            if node.is_leaf() {
                let stats = leaf_stats.get(&(pt_id as u32));
                let (score, category_prob, extent) = score_leaf(stats, self.n_ctg);
                let slot = self.leaves.len() as u32;
                leaf_slot.insert(pt_id as u32, slot - leaf_origin as u32);
                self.leaves.push(Leaf { score, extent, category_prob });
                self.pred.push(LEAF_PRED);
                self.split.push(0.0);
                self.score.push(score);
                self.bump.push(0);
                self.fac_cardinality.push(0);
            } else {
                self.pred.push(node.pred_idx as i32);
                self.bump.push(1); // overwritten once the right child's position is known
                self.score.push(0.0);
                if node.fac_offset.is_some() {
                    self.split.push((node.fac_offset.unwrap() * 32) as f64);
                    self.fac_cardinality.push(node.fac_cardinality as u32);
                } else {
                    self.split.push(node.split_val);
                    self.fac_cardinality.push(0);
                }
            }
        }

        // Right-child bump: PreTree assigns ids breadth-first so left = lhId
        // and right = lhId + 1; both already sit at `origin + lhId` and
        // `origin + lhId + 1` in the flattened array. The bump recorded here
        // is measured from the *parent's* own flattened position.
        for (pt_id, node) in pt.nodes.iter().enumerate() {
            if let Some(left_id) = node.lh_id {
                let parent_flat = origin + pt_id;
                let right_flat = origin + left_id as usize + 1;
                self.bump[parent_flat] = (right_flat - parent_flat) as u32;
            }
        }

        for (&pt_id, stats) in leaf_stats {
            for &(s_idx, value) in &stats.samples {
                let s_count = sample_s_count.get(s_idx as usize).copied().unwrap_or(1);
                self.bag_samples.push(BagSample { leaf_idx: leaf_slot[&pt_id], s_count });
                self.bag_values.push(value);
            }
        }

        tree_idx
    }

    pub fn push_in_bag(&mut self, in_bag: &[bool]) {
        let mut words = vec![0u32; (self.n_row + 31) / 32];
        for (row, &b) in in_bag.iter().enumerate() {
            if b {
                words[row / 32] |= 1 << (row % 32);
            }
        }
        self.in_bag.push(words);
    }
}

fn score_leaf(stats: Option<&LeafStats>, n_ctg: usize) -> (f64, Vec<f32>, u32) {
    match stats {
        None => (0.0, Vec::new(), 0),
        Some(stats) => {
            if n_ctg == 0 {
                let score = if stats.s_count > 0 { stats.sum / stats.s_count as f64 } else { 0.0 };
                (score, Vec::new(), stats.samples.len() as u32)
            } else {
                let total: f64 = stats.ctg_sum.iter().sum();
                let probs: Vec<f32> = if total > 0.0 {
                    stats.ctg_sum.iter().map(|&s| (s / total) as f32).collect()
                } else {
                    vec![0.0; n_ctg]
                };
                let (best, _) = probs
                    .iter()
                    .enumerate()
                    .fold((0usize, f32::MIN), |acc, (i, &p)| if p > acc.1 { (i, p) } else { acc });
                (best as f64, probs, stats.samples.len() as u32)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_split_tree_flattens_with_adjacent_children() {
        let mut pt = PreTree::new(4);
        pt.split_numeric(0, 0, 2.5, 1.0);

        let mut stats = HashMap::new();
        stats.insert(1, LeafStats { sum: 2.0, s_count: 2, ctg_sum: vec![], samples: vec![(0, 1.0), (1, 1.0)] });
        stats.insert(2, LeafStats { sum: 8.0, s_count: 2, ctg_sum: vec![], samples: vec![(2, 4.0), (3, 4.0)] });

        let mut forest = Forest::new(1, 0, 4);
        forest.consume_tree(&pt, &stats, &[1, 1, 1, 1]);

        assert_eq!(forest.n_tree(), 1);
        assert_eq!(forest.pred[0], 0);
        assert_eq!(forest.bump[0], 1);
        assert_eq!(forest.pred[1], LEAF_PRED);
        assert_eq!(forest.pred[2], LEAF_PRED);
        assert_eq!(forest.score[1], 1.0);
        assert_eq!(forest.score[2], 4.0);
    }
}

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

//! Growable pre-tree built during training, flattened into a `DecTree` once
//! the frontier empties (§3 PreTree, §4.8). Grounded on
//! `original_source/ArboristCore/pretree.cc`/`pretree.h`: node ids are assigned
//! breadth-first so a non-leaf's right child is always `lhId + 1`, and
//! factor splits are encoded against a shared, growable bit pool rather than
//! one bitset per node.

use crate::bitset::BitSet;
use crate::predictor_frame::Rank;

#[derive(Debug, Clone)]
pub struct PreTreeNode {
    /// `Some(leftId)` for a non-terminal; the right child is always `leftId + 1`.
    pub lh_id: Option<u32>,
    pub pred_idx: usize,
    /// Numeric cut value; unused for factor splits.
    pub split_val: f64,
    /// Word offset into the tree's `fac_bits` pool, for factor splits.
    pub fac_offset: Option<usize>,
    pub fac_cardinality: usize,
    pub info: f64,
}

impl PreTreeNode {
    fn leaf() -> Self {
        PreTreeNode { lh_id: None, pred_idx: 0, split_val: 0.0, fac_offset: None, fac_cardinality: 0, info: 0.0 }
    }

    pub fn is_leaf(&self) -> bool {
        self.lh_id.is_none()
    }
}

pub struct PreTree {
    pub nodes: Vec<PreTreeNode>,
    pub fac_bits: Vec<u32>,
    /// Current pre-tree node id for every bagged sample.
    pub sample2pt: Vec<u32>,
}

impl PreTree {
    pub fn new(bag_count: usize) -> Self {
        PreTree { nodes: vec![PreTreeNode::leaf()], fac_bits: Vec::new(), sample2pt: vec![0; bag_count] }
    }

    pub fn is_leaf(&self, pt_id: u32) -> bool {
        self.nodes[pt_id as usize].is_leaf()
    }

    /// Splits leaf `pt_id` on a numeric cut, returning the new `(leftId, rightId)`.
    pub fn split_numeric(&mut self, pt_id: u32, pred_idx: usize, split_val: f64, info: f64) -> (u32, u32) {
        let left_id = self.nodes.len() as u32;
        let right_id = left_id + 1;
        self.nodes.push(PreTreeNode::leaf());
        self.nodes.push(PreTreeNode::leaf());
        let node = &mut self.nodes[pt_id as usize];
        node.lh_id = Some(left_id);
        node.pred_idx = pred_idx;
        node.split_val = split_val;
        node.info = info;
        (left_id, right_id)
    }

    /// Splits leaf `pt_id` on a factor set, appending `lh_ranks` (the codes
    /// routed left) to the shared bit pool.
    pub fn split_factor(&mut self, pt_id: u32, pred_idx: usize, cardinality: usize, lh_ranks: &[Rank], info: f64) -> (u32, u32) {
        let mut bits = BitSet::with_len(cardinality);
        for &r in lh_ranks {
            bits.set(r as usize);
        }
        let fac_offset = bits.consume(&mut self.fac_bits);

        let left_id = self.nodes.len() as u32;
        let right_id = left_id + 1;
        self.nodes.push(PreTreeNode::leaf());
        self.nodes.push(PreTreeNode::leaf());
        let node = &mut self.nodes[pt_id as usize];
        node.lh_id = Some(left_id);
        node.pred_idx = pred_idx;
        node.fac_offset = Some(fac_offset);
        node.fac_cardinality = cardinality;
        node.info = info;
        (left_id, right_id)
    }

    /// Re-homes a set of bagged samples to the given child id.
    pub fn reassign(&mut self, samples: &[u32], new_id: u32) {
        for &s_idx in samples {
            self.sample2pt[s_idx as usize] = new_id;
        }
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_assigns_right_sibling_adjacent_to_left() {
        let mut pt = PreTree::new(4);
        let (left, right) = pt.split_numeric(0, 0, 2.5, 1.0);
        assert_eq!(right, left + 1);
        assert!(!pt.is_leaf(0));
        assert!(pt.is_leaf(left));
        assert!(pt.is_leaf(right));
    }

    #[test]
    fn factor_split_records_bits_in_shared_pool() {
        let mut pt = PreTree::new(4);
        let (left, _right) = pt.split_factor(0, 0, 3, &[0, 2], 1.0);
        let offset = pt.nodes[0].fac_offset.unwrap();
        let bits = BitSet::from_words(pt.fac_bits[offset..offset + 1].to_vec(), 3);
        assert!(bits.test(0));
        assert!(!bits.test(1));
        assert!(bits.test(2));
        assert!(pt.is_leaf(left));
    }

    #[test]
    fn reassign_moves_samples_to_new_leaf() {
        let mut pt = PreTree::new(4);
        let (left, right) = pt.split_numeric(0, 0, 1.0, 1.0);
        pt.reassign(&[0, 1], left);
        pt.reassign(&[2, 3], right);
        assert_eq!(pt.sample2pt, vec![left, left, right, right]);
    }
}

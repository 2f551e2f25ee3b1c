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

//! The frontier: the current level's node table (§3 IndexSet). Grounded on
//! `original_source/partition/indexset.h`.

/// One live node of the current level.
#[derive(Debug, Clone)]
pub struct IndexSet {
    /// This node's position in the current level's `Frontier::nodes`.
    pub split_idx: u32,
    /// The PreTree node id this IndexSet corresponds to.
    pub pt_id: u32,
    pub depth: usize,
    pub s_count: u32,
    pub sum: f64,
    pub ctg_sum: Vec<f64>,
    /// Node-local impurity baseline a candidate's information must beat.
    pub pre_bias: f64,
    /// `minRatio` times the parent split's accepted information (zero at
    /// the root); a candidate must clear `pre_bias + min_info` (§4.7).
    pub min_info: f64,
    pub does_split: bool,
    pub lh_extent: usize,
    pub lh_s_count: u32,
    /// Which branch absorbed the implicit blob of the winning predictor, if any.
    pub left_impl: bool,
    /// Sample indices (sIdx into the tree's Sample array) belonging to this node.
    pub samples: Vec<u32>,
}

impl IndexSet {
    pub fn is_leaf_candidate(&self, min_node: usize, max_depth: usize) -> bool {
        self.s_count < min_node as u32 || self.samples.len() <= 1 || self.depth >= max_depth
    }
}

#[derive(Debug, Default)]
pub struct Frontier {
    pub nodes: Vec<IndexSet>,
}

impl Frontier {
    pub fn new() -> Self {
        Frontier { nodes: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

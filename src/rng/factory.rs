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

use crate::rng::Rng;

/// Derives independent, reproducible RNG streams for every purpose the
/// training session needs: per-tree bagging, per-level candidate selection,
/// per-candidate wide-factor downsampling and argmax inversion, shadow
/// columns and permutation importance. Each stream is a distinct PCG32
/// increment combined from a purpose tag and the relevant indices, so two
/// calls with different arguments never collide and the same arguments
/// always reproduce the same stream given the same seed.
#[derive(Clone)]
pub struct RngFactory {
    seed: u64,
}

const TAG_BAG: u64 = 1;
const TAG_TREE: u64 = 2;
const TAG_BERNOULLI: u64 = 3;
const TAG_FIXED: u64 = 4;
const TAG_WIDE_FACTOR: u64 = 5;
const TAG_ARGMAX_INVERT: u64 = 6;
const TAG_SHADOW: u64 = 7;
const TAG_PERMUTATION: u64 = 8;
const TAG_TIE_BREAK: u64 = 9;

impl RngFactory {
    pub fn new(seed: u64) -> RngFactory {
        RngFactory { seed }
    }

    fn stream(&self, tag: u64, a: u64, b: u64, c: u64) -> Rng {
        let mut incr = tag.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        incr = incr.wrapping_add(a.wrapping_mul(0xBF58_476D_1CE4_E5B9));
        incr = incr.wrapping_add(b.wrapping_mul(0x94D0_49BB_1331_11EB));
        incr = incr.wrapping_add(c.wrapping_mul(0xD6E8_FEB8_6659_FD93));
        incr |= 1;
        Rng::new(self.seed, incr)
    }

    /// Bag/sample draw for tree `ith_tree`.
    pub fn new_rng_bag(&self, ith_tree: usize) -> Rng {
        self.stream(TAG_BAG, ith_tree as u64, 0, 0)
    }

    /// General per-tree stream (reserved for tree-level randomness beyond bagging).
    pub fn new_rng_tree(&self, ith_tree: usize) -> Rng {
        self.stream(TAG_TREE, ith_tree as u64, 0, 0)
    }

    /// Bernoulli predictor-selection draw for (tree, level, node).
    pub fn new_rng_bernoulli(&self, ith_tree: usize, level: usize, node_idx: usize) -> Rng {
        self.stream(TAG_BERNOULLI, ith_tree as u64, level as u64, node_idx as u64)
    }

    /// Fixed-count predictor-selection draw for (tree, level, node).
    pub fn new_rng_fixed(&self, ith_tree: usize, level: usize, node_idx: usize) -> Rng {
        self.stream(TAG_FIXED, ith_tree as u64, level as u64, node_idx as u64)
    }

    /// Wide-factor downsampling draw for a specific (tree, node, predictor) candidate.
    pub fn new_rng_wide_factor(&self, ith_tree: usize, node_idx: usize, pred_idx: usize) -> Rng {
        self.stream(TAG_WIDE_FACTOR, ith_tree as u64, node_idx as u64, pred_idx as u64)
    }

    /// Argmax-inversion coin flip for a specific (tree, node, predictor) candidate.
    pub fn new_rng_argmax_invert(&self, ith_tree: usize, node_idx: usize, pred_idx: usize) -> Rng {
        self.stream(TAG_ARGMAX_INVERT, ith_tree as u64, node_idx as u64, pred_idx as u64)
    }

    /// Shadow-column permutation draw (Boruta).
    pub fn new_rng_shadow(&self, col_id: usize) -> Rng {
        self.stream(TAG_SHADOW, col_id as u64, 0, 0)
    }

    /// Permutation-importance draw for (tree, predictor).
    pub fn new_rng_permutation(&self, ith_tree: usize, col_id: usize) -> Rng {
        self.stream(TAG_PERMUTATION, ith_tree as u64, col_id as u64, 0)
    }

    /// Info-tie coin flip between two candidates at the same node, distinct
    /// from the per-accepted-split argmax inversion (§4.7 vs §4.6.2).
    pub fn new_rng_tie_break(&self, ith_tree: usize, node_idx: usize, pred_idx: usize) -> Rng {
        self.stream(TAG_TIE_BREAK, ith_tree as u64, node_idx as u64, pred_idx as u64)
    }
}

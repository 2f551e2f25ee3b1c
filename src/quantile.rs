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

//! Quantile regression (§4.10, supplemented). Grounded on
//! `original_source/rf/quant.cc`: pool every non-OOB-excluded tree's leaf
//! samples for a row, then take the weighted order statistic at each
//! requested quantile level. Unlike the source's binned histogram (`binSize
//! = 0x1000`), this walks the pooled `(value, sCount)` list directly --
//! the forests this crate trains don't approach the row counts that make
//! binning worthwhile, so the exact weighted order statistic is simpler and
//! just as fast.

use crate::forest::Forest;
use crate::predict::{walk_to_leaf, Cell};

/// Pools `(value, weight)` pairs from every OOB-eligible tree's leaf for one
/// row, then reports the weighted order statistic at each of `levels`.
pub fn predict_quantiles(forest: &Forest, row: &[Cell], row_idx: Option<usize>, levels: &[f64]) -> Vec<f64> {
    let mut pooled: Vec<(f64, u32)> = Vec::new();
    let mut total = 0u32;

    for tree in 0..forest.n_tree() {
        if let Some(row_idx) = row_idx {
            if forest.in_bag(tree, row_idx) {
                continue;
            }
        }
        let leaf_node = walk_to_leaf(forest, tree, row);
        let leaf_idx = (leaf_node - forest.origin[tree]) as u32;
        let bag_start = forest.bag_origin[tree];
        let bag_end = forest.bag_origin.get(tree + 1).copied().unwrap_or(forest.bag_samples.len());
        for i in bag_start..bag_end {
            let sample = &forest.bag_samples[i];
            if sample.leaf_idx == leaf_idx {
                pooled.push((forest.bag_values[i], sample.s_count));
                total += sample.s_count;
            }
        }
    }

    if pooled.is_empty() {
        return vec![f64::NAN; levels.len()];
    }

    pooled.sort_by(|a, b| a.0.total_cmp(&b.0));

    levels
        .iter()
        .map(|&q| {
            let threshold = total as f64 * q;
            let mut seen = 0u32;
            for &(value, weight) in &pooled {
                seen += weight;
                if seen as f64 >= threshold {
                    return value;
                }
            }
            pooled.last().unwrap().0
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::LeafStats;
    use crate::pretree::PreTree;
    use std::collections::HashMap;

    fn toy_forest() -> Forest {
        let mut pt = PreTree::new(4);
        pt.split_numeric(0, 0, 2.5, 1.0);
        let mut stats = HashMap::new();
        stats.insert(1, LeafStats { sum: 3.0, s_count: 2, ctg_sum: vec![], samples: vec![(0, 1.0), (1, 2.0)] });
        stats.insert(2, LeafStats { sum: 7.0, s_count: 2, ctg_sum: vec![], samples: vec![(2, 3.0), (3, 4.0)] });
        let mut forest = Forest::new(1, 0, 4);
        forest.consume_tree(&pt, &stats, &[1, 1, 1, 1]);
        forest.push_in_bag(&[true, true, true, true]);
        forest
    }

    #[test]
    fn median_falls_within_pooled_leaf_values() {
        let forest = toy_forest();
        let q = predict_quantiles(&forest, &[Cell::Numeric(1.0)], None, &[0.5]);
        assert!(q[0] == 1.0 || q[0] == 2.0);
    }

    #[test]
    fn empty_pool_returns_nan() {
        let forest = Forest::new(1, 0, 4);
        let q = predict_quantiles(&forest, &[Cell::Numeric(1.0)], None, &[0.5]);
        assert!(q[0].is_nan());
    }
}

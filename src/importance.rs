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

//! Permutation variable importance (§4.11, supplemented). Grounded on
//! `tree::importance`/`random_forest::importance_per_tree`: per tree, permute
//! one predictor's values across that tree's OOB rows, re-walk those rows,
//! and compare the permuted error against the tree's own unpermuted OOB
//! error. `tree::importance` caches node-level predictions keyed by mask and
//! permuted column to avoid re-walking untouched subtrees; this crate's
//! packed `Forest` has no such cache, so the re-walk here is a direct
//! `walk_tree` call per row -- correct and considerably simpler, at the cost
//! of one full walk per (tree, predictor, OOB row) instead of a cached one.

use crate::forest::Forest;
use crate::predict::Cell;
use crate::response::Response;
use crate::rng::factory::RngFactory;

/// One predictor column's full-row values, column-major so a single
/// predictor can be permuted without touching the others. Doubles as
/// Boruta's (§4.12) storage for shadow copies, since both consumers need
/// owned, clonable column data outside of `PredictorFrame`'s rank tables.
#[derive(Debug, Clone)]
pub enum Column {
    Numeric(Vec<f64>),
    Factor(Vec<usize>, usize),
}

fn row_at(columns: &[Column], row: usize) -> Vec<Cell> {
    columns
        .iter()
        .map(|c| match c {
            Column::Numeric(v) => Cell::Numeric(v[row]),
            Column::Factor(v, _) => Cell::Factor(v[row]),
        })
        .collect()
}

fn walk_tree_err(forest: &Forest, tree: usize, row: &[Cell], response: &Response, row_idx: usize) -> f64 {
    let pred = crate::predict::walk_to_leaf(forest, tree, row);
    let score = forest.score[pred];
    if response.is_classification() {
        if score as u32 == response.category(row_idx).unwrap() { 0.0 } else { 1.0 }
    } else {
        let err = score - response.value(row_idx);
        err * err
    }
}

/// Per-(predictor, tree) permutation deltas (`permuted error - baseline
/// error`), one inner vector per predictor over every tree that had at
/// least one OOB row. Mirrors `random_forest::importance_per_tree`'s
/// `HashMap<Col, Vec<i64>>`, indexed by predictor position instead of a
/// column identifier.
pub fn importance_per_tree(forest: &Forest, columns: &[Column], response: &Response, factory: &RngFactory) -> Vec<Vec<f64>> {
    let n_pred = forest.n_pred;
    let mut per_tree: Vec<Vec<f64>> = vec![Vec::new(); n_pred];

    for tree in 0..forest.n_tree() {
        let oob_rows: Vec<usize> = (0..forest.n_row).filter(|&r| !forest.in_bag(tree, r)).collect();
        if oob_rows.is_empty() {
            continue;
        }

        let baseline_err: f64 = oob_rows
            .iter()
            .map(|&r| walk_tree_err(forest, tree, &row_at(columns, r), response, r))
            .sum();

        for pred_idx in 0..n_pred {
            let mut rng = factory.new_rng_permutation(tree, pred_idx);
            let perm_err: f64 = match &columns[pred_idx] {
                Column::Numeric(values) => {
                    let mut permuted = values.clone();
                    rng.shuffle_subset(&mut permuted, &oob_rows);
                    oob_rows
                        .iter()
                        .map(|&r| {
                            let mut row = row_at(columns, r);
                            row[pred_idx] = Cell::Numeric(permuted[r]);
                            walk_tree_err(forest, tree, &row, response, r)
                        })
                        .sum()
                }
                Column::Factor(values, _) => {
                    let mut permuted = values.clone();
                    rng.shuffle_subset(&mut permuted, &oob_rows);
                    oob_rows
                        .iter()
                        .map(|&r| {
                            let mut row = row_at(columns, r);
                            row[pred_idx] = Cell::Factor(permuted[r]);
                            walk_tree_err(forest, tree, &row, response, r)
                        })
                        .sum()
                }
            };
            per_tree[pred_idx].push(perm_err - baseline_err);
        }
    }

    per_tree
}

/// Per-predictor permutation importance, normalised by OOB row count exactly
/// as the teacher's `RandomForest::importance` does: mean per-tree delta
/// divided by the expected OOB row count (`n_row` minus the bag draw).
pub fn permutation_importance(forest: &Forest, columns: &[Column], response: &Response, factory: &RngFactory) -> Vec<f64> {
    let per_tree = importance_per_tree(forest, columns, response, factory);
    let oob_n = (0..forest.n_tree())
        .map(|t| (0..forest.n_row).filter(|&r| !forest.in_bag(t, r)).count())
        .sum::<usize>() as f64
        / forest.n_tree().max(1) as f64;

    per_tree
        .iter()
        .map(|deltas| if deltas.is_empty() || oob_n == 0.0 { 0.0 } else { deltas.iter().sum::<f64>() / deltas.len() as f64 / oob_n })
        .collect()
}

/// Per-predictor z-score: mean per-tree delta divided by its standard
/// deviation across trees, exactly as `RandomForest::zscore` computes it.
/// Used by Boruta to rank real predictors against the shadow columns.
pub fn zscore(forest: &Forest, columns: &[Column], response: &Response, factory: &RngFactory) -> Vec<f64> {
    let per_tree = importance_per_tree(forest, columns, response, factory);
    per_tree
        .iter()
        .map(|deltas| {
            if deltas.is_empty() {
                return 0.0;
            }
            let mean = deltas.iter().sum::<f64>() / deltas.len() as f64;
            let var = deltas.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / deltas.len() as f64;
            if var == 0.0 { 0.0 } else { mean / var.sqrt() }
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
        stats.insert(1, LeafStats { sum: 2.0, s_count: 2, ctg_sum: vec![], samples: vec![(0, 1.0), (1, 1.0)] });
        stats.insert(2, LeafStats { sum: 8.0, s_count: 2, ctg_sum: vec![], samples: vec![(2, 4.0), (3, 4.0)] });
        let mut forest = Forest::new(1, 0, 4);
        forest.consume_tree(&pt, &stats, &[1, 1, 1, 1]);
        forest.push_in_bag(&[true, true, false, false]);
        forest
    }

    #[test]
    fn informative_predictor_has_nonnegative_importance() {
        let forest = toy_forest();
        let columns = vec![Column::Numeric(vec![1.0, 1.5, 9.0, 9.5])];
        let response = Response::Regression(vec![1.0, 1.0, 4.0, 4.0]);
        let factory = RngFactory::new(1);
        let importance = permutation_importance(&forest, &columns, &response, &factory);
        assert_eq!(importance.len(), 1);
        assert!(importance[0] >= 0.0);
    }

    #[test]
    fn forest_with_no_oob_rows_yields_zero_importance() {
        let mut pt = PreTree::new(4);
        pt.split_numeric(0, 0, 2.5, 1.0);
        let mut stats = HashMap::new();
        stats.insert(1, LeafStats { sum: 2.0, s_count: 2, ctg_sum: vec![], samples: vec![(0, 1.0), (1, 1.0)] });
        stats.insert(2, LeafStats { sum: 8.0, s_count: 2, ctg_sum: vec![], samples: vec![(2, 4.0), (3, 4.0)] });
        let mut forest = Forest::new(1, 0, 4);
        forest.consume_tree(&pt, &stats, &[1, 1, 1, 1]);
        forest.push_in_bag(&[true, true, true, true]);

        let columns = vec![Column::Numeric(vec![1.0, 1.5, 9.0, 9.5])];
        let response = Response::Regression(vec![1.0, 1.0, 4.0, 4.0]);
        let factory = RngFactory::new(1);
        let importance = permutation_importance(&forest, &columns, &response, &factory);
        assert_eq!(importance[0], 0.0);
    }
}

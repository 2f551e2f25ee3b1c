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

//! Row-at-a-time prediction walker (§4.9). Grounded on
//! `original_source/ArboristCore/dectree.cc`'s `PredictRowNumReg`/
//! `PredictRowFacReg` family: walk `origin[tree]`, branch on `bump`, emit
//! `score` at a leaf (`bump == 0`).

use crate::error::{ForestError, Result};
use crate::forest::{Forest, LEAF_PRED};

/// One row's predictor values: either a numeric value or a factor code per column.
pub enum Cell {
    Numeric(f64),
    Factor(usize),
}

/// Walks one row through one tree, returning the leaf's score.
fn walk_tree(forest: &Forest, tree: usize, row: &[Cell]) -> f64 {
    let mut node = forest.origin[tree];
    loop {
        let bump = forest.bump[node];
        if bump == 0 {
            return forest.score[node];
        }
        let pred_idx = forest.pred[node] as usize;
        let goes_left = match &row[pred_idx] {
            Cell::Numeric(v) => *v <= forest.split[node],
            Cell::Factor(code) => forest.factor_branch_left(tree, node, *code),
        };
        node = if goes_left { node + 1 } else { node + bump as usize };
    }
}

/// A classification row's plurality winner plus the raw per-category vote
/// counts it was computed from (§6); regression has no analogue since a
/// single averaged score carries no internal distribution to expose.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryVotes {
    pub best: usize,
    pub votes: Vec<u32>,
}

fn tally_votes(n_ctg: usize, trees: impl Iterator<Item = usize>) -> CategoryVotes {
    let mut votes = vec![0u32; n_ctg];
    for ctg in trees {
        votes[ctg] += 1;
    }
    let (best, _) = votes.iter().enumerate().fold((0usize, 0u32), |acc, (i, &v)| if v > acc.1 { (i, v) } else { acc });
    CategoryVotes { best, votes }
}

/// Predicts one row by averaging (regression) or plurality-voting
/// (classification) every tree's leaf score.
pub fn predict_row(forest: &Forest, row: &[Cell]) -> Result<f64> {
    if row.len() != forest.n_pred {
        return Err(ForestError::PredictorCountMismatch { given: row.len(), expected: forest.n_pred });
    }
    if forest.n_tree() == 0 {
        return Err(ForestError::EmptyForest);
    }

    if forest.n_ctg == 0 {
        let sum: f64 = (0..forest.n_tree()).map(|t| walk_tree(forest, t, row)).sum();
        Ok(sum / forest.n_tree() as f64)
    } else {
        let tallied = tally_votes(forest.n_ctg, (0..forest.n_tree()).map(|t| walk_tree(forest, t, row) as usize));
        Ok(tallied.best as f64)
    }
}

/// Like [`predict_row`], but for classification forests also returns the
/// per-category vote counts the plurality winner was drawn from. `None`
/// for regression forests, which have no categories to tally.
pub fn predict_row_ctg(forest: &Forest, row: &[Cell]) -> Result<Option<CategoryVotes>> {
    if row.len() != forest.n_pred {
        return Err(ForestError::PredictorCountMismatch { given: row.len(), expected: forest.n_pred });
    }
    if forest.n_tree() == 0 {
        return Err(ForestError::EmptyForest);
    }
    if forest.n_ctg == 0 {
        return Ok(None);
    }
    Ok(Some(tally_votes(forest.n_ctg, (0..forest.n_tree()).map(|t| walk_tree(forest, t, row) as usize))))
}

/// Out-of-bag prediction for one training row: averages/votes only over
/// trees that did not draw `row` into their bag. Returns `None` if every
/// tree bagged the row (no OOB trees available).
pub fn predict_row_oob(forest: &Forest, row: &[Cell], row_idx: usize) -> Result<Option<f64>> {
    if row.len() != forest.n_pred {
        return Err(ForestError::PredictorCountMismatch { given: row.len(), expected: forest.n_pred });
    }

    let oob_trees: Vec<usize> = (0..forest.n_tree()).filter(|&t| !forest.in_bag(t, row_idx)).collect();
    if oob_trees.is_empty() {
        return Ok(None);
    }

    if forest.n_ctg == 0 {
        let sum: f64 = oob_trees.iter().map(|&t| walk_tree(forest, t, row)).sum();
        Ok(Some(sum / oob_trees.len() as f64))
    } else {
        let tallied = tally_votes(forest.n_ctg, oob_trees.iter().map(|&t| walk_tree(forest, t, row) as usize));
        Ok(Some(tallied.best as f64))
    }
}

/// Like [`predict_row_oob`], but for classification forests also returns
/// the per-category vote counts, tallied over the same OOB tree subset.
pub fn predict_row_oob_ctg(forest: &Forest, row: &[Cell], row_idx: usize) -> Result<Option<CategoryVotes>> {
    if row.len() != forest.n_pred {
        return Err(ForestError::PredictorCountMismatch { given: row.len(), expected: forest.n_pred });
    }
    if forest.n_ctg == 0 {
        return Ok(None);
    }

    let oob_trees: Vec<usize> = (0..forest.n_tree()).filter(|&t| !forest.in_bag(t, row_idx)).collect();
    if oob_trees.is_empty() {
        return Ok(None);
    }
    Ok(Some(tally_votes(forest.n_ctg, oob_trees.iter().map(|&t| walk_tree(forest, t, row) as usize))))
}

/// Walks a row down one tree, returning the leaf's node index (for
/// quantile/importance consumers that need `BagSample` bookkeeping, not
/// just the score).
pub fn walk_to_leaf(forest: &Forest, tree: usize, row: &[Cell]) -> usize {
    let mut node = forest.origin[tree];
    loop {
        let bump = forest.bump[node];
        if bump == 0 {
            return node;
        }
        let pred_idx = forest.pred[node] as usize;
        let goes_left = match &row[pred_idx] {
            Cell::Numeric(v) => *v <= forest.split[node],
            Cell::Factor(code) => forest.factor_branch_left(tree, node, *code),
        };
        node = if goes_left { node + 1 } else { node + bump as usize };
    }
}

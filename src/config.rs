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

use crate::error::{ForestError, Result};

/// How a level's candidate (node, predictor) pairs are chosen.
#[derive(Debug, Clone)]
pub enum PredSelect {
    /// Each predictor is included independently with probability `predProb[predIdx]`.
    Bernoulli,
    /// Exactly `predFixed` predictors are chosen per node, weighted by `predProb`.
    Fixed(usize),
}

/// Training-session configuration. Shared, read-only across trees.
#[derive(Debug, Clone)]
pub struct Config {
    pub n_samp: usize,
    pub n_tree: usize,
    pub min_node: usize,
    pub max_depth: usize,
    pub min_ratio: f64,
    pub pred_select: PredSelect,
    /// Per-predictor inclusion probability; used directly under `Bernoulli`
    /// and as sampling weights under `Fixed`.
    pub pred_prob: Vec<f64>,
    /// Per-predictor interpolation fraction for numeric cut splits.
    /// `0.5` reproduces the plain midpoint rule.
    pub split_quant: Vec<f64>,
    /// Optional per-predictor monotone sign constraint (regression only):
    /// `Some(1)` / `Some(-1)` / `None`.
    pub monotone_sign: Vec<Option<i8>>,
    pub replace: bool,
    pub quantile: bool,
    /// Number of trees trained concurrently; `None` uses the available parallelism.
    pub tree_block: Option<usize>,
    pub seed: u64,
}

impl Config {
    pub fn new(n_pred: usize, n_samp: usize, n_tree: usize) -> Self {
        Config {
            n_samp,
            n_tree,
            min_node: 1,
            max_depth: usize::MAX,
            min_ratio: 0.0,
            pred_select: PredSelect::Bernoulli,
            pred_prob: vec![1.0; n_pred],
            split_quant: vec![0.5; n_pred],
            monotone_sign: vec![None; n_pred],
            replace: false,
            quantile: false,
            tree_block: None,
            seed: 0,
        }
    }

    pub fn validate(&self, n_row: usize, n_pred: usize) -> Result<()> {
        if n_row == 0 {
            return Err(ForestError::ZeroRows);
        }
        if n_pred == 0 {
            return Err(ForestError::ZeroPredictors);
        }
        if self.n_samp == 0 {
            return Err(ForestError::ZeroSampleCount);
        }
        if self.max_depth < 1 {
            return Err(ForestError::InvalidMaxDepth(self.max_depth));
        }
        if self.min_node < 1 {
            return Err(ForestError::InvalidMinNode(self.min_node));
        }
        if !(0.0..=1.0).contains(&self.min_ratio) {
            return Err(ForestError::InvalidMinRatio(self.min_ratio));
        }
        for (col, &prob) in self.pred_prob.iter().enumerate() {
            if !(0.0..=1.0).contains(&prob) {
                return Err(ForestError::InvalidPredictorProbability { col, prob });
            }
        }
        for (col, &quant) in self.split_quant.iter().enumerate() {
            if !(0.0..=1.0).contains(&quant) {
                return Err(ForestError::InvalidSplitQuant { col, quant });
            }
        }
        Ok(())
    }
}

/// Narrow-vs-wide threshold for factor-run subset enumeration (RunAccum).
/// The same constant gates both "enumerate all subsets" and "how many runs
/// a wide factor is downsampled to" -- the source's `maxWidthDirect` and
/// `maxWidth = 10` are the same quantity.
pub const MAX_WIDTH: usize = 10;

/// Guard below which a side's response sum is considered degenerate and the
/// candidate split is silently rejected (not an error).
pub const EPS: f64 = 1e-5;

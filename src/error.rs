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

use thiserror::Error;

/// Failures the core can report to a caller. Arithmetic degeneracy and
/// "no splittable candidate" are not represented here: both are expected
/// outcomes handled inline by the split/consume logic, not errors.
#[derive(Error, Debug, PartialEq)]
pub enum ForestError {
    #[error("predictor frame has zero rows")]
    ZeroRows,

    #[error("predictor frame has zero predictors")]
    ZeroPredictors,

    #[error("nSamp must be > 0")]
    ZeroSampleCount,

    #[error("predictor probability for column {col} is {prob}, must lie in [0,1]")]
    InvalidPredictorProbability { col: usize, prob: f64 },

    #[error("maxDepth must be >= 1, got {0}")]
    InvalidMaxDepth(usize),

    #[error("minNode must be >= 1, got {0}")]
    InvalidMinNode(usize),

    #[error("minRatio must lie in [0,1], got {0}")]
    InvalidMinRatio(f64),

    #[error("splitQuant for column {col} is {quant}, must lie in [0,1]")]
    InvalidSplitQuant { col: usize, quant: f64 },

    #[error("response length {y_len} does not match row count {n_row}")]
    ResponseLengthMismatch { y_len: usize, n_row: usize },

    #[error("forest is empty: no trees were trained")]
    EmptyForest,

    #[error("prediction row has {given} predictors, forest expects {expected}")]
    PredictorCountMismatch { given: usize, expected: usize },
}

pub type Result<T> = std::result::Result<T, ForestError>;

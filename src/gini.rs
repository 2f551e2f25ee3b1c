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

//! Two-way split information, generalized from the teacher's
//! `gini_x_bool_y_bool`/`gini_x_threeval_y_bool` (which hardcoded a boolean
//! predictor against a boolean response) to an arbitrary number of
//! categories and to the regression variance-reduction formula.

use crate::config::EPS;

/// Regression split information: `sumL^2/sCountL + sumR^2/sCountR`.
/// `None` if either side's count is zero.
pub fn regression_info(sum_l: f64, s_count_l: f64, sum_r: f64, s_count_r: f64) -> Option<f64> {
    if s_count_l <= 0.0 || s_count_r <= 0.0 {
        return None;
    }
    Some(sum_l * sum_l / s_count_l + sum_r * sum_r / s_count_r)
}

/// Classification (Gini) split information over `nCtg` categories:
/// `sum_c sumL[c]^2/sumL + sum_c sumR[c]^2/sumR`, guarded by `sumL, sumR > EPS`.
pub fn gini_info(sum_l_by_ctg: &[f64], sum_r_by_ctg: &[f64]) -> Option<f64> {
    let sum_l: f64 = sum_l_by_ctg.iter().sum();
    let sum_r: f64 = sum_r_by_ctg.iter().sum();
    if sum_l <= EPS || sum_r <= EPS {
        return None;
    }
    let left: f64 = sum_l_by_ctg.iter().map(|&s| s * s).sum::<f64>() / sum_l;
    let right: f64 = sum_r_by_ctg.iter().map(|&s| s * s).sum::<f64>() / sum_r;
    Some(left + right)
}

/// Node-local impurity baseline ("pre-bias"): the same two-way formula
/// evaluated with the whole node as the "left" side and an empty right side
/// is undefined, so pre-bias instead uses the single-sided sum-of-squares
/// form `sum^2/sCount` (regression) or `sum_c sum[c]^2/sum` (classification)
/// that the frontier subtracts candidate information against.
pub fn regression_pre_bias(sum: f64, s_count: f64) -> f64 {
    if s_count <= 0.0 {
        0.0
    } else {
        sum * sum / s_count
    }
}

pub fn gini_pre_bias(sum_by_ctg: &[f64]) -> f64 {
    let sum: f64 = sum_by_ctg.iter().sum();
    if sum <= EPS {
        0.0
    } else {
        sum_by_ctg.iter().map(|&s| s * s).sum::<f64>() / sum
    }
}

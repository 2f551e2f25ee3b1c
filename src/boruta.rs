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

//! Boruta shadow-variable selection (§4.12, supplemented, ambient).
//! Unchanged in algorithm from the teacher's original `boruta()`: iteratively
//! append a permuted shadow copy of every live predictor, train a forest,
//! compare each real predictor's z-score against the maximum shadow
//! z-score, and run `binom_cdf` against a Bonferroni-corrected threshold to
//! migrate predictors between tentative/confirmed/rejected. Generalized from
//! the teacher's `Y = bool`-only signature to this crate's `Response` enum.

use std::collections::HashSet;

use crate::binom::binom_cdf;
use crate::config::{Config, PredSelect};
use crate::error::Result;
use crate::importance::{zscore, Column};
use crate::predictor_frame::{PredictorFrame, RawColumn};
use crate::response::Response;
use crate::rng::factory::RngFactory;
use crate::train::train;

const DEFAULT_SAMPLE_FRACTION: f64 = 0.66;

#[derive(Debug, Clone)]
pub struct BorutaResult {
    pub confirmed: Vec<usize>,
    pub rejected: Vec<usize>,
    pub tentative: Vec<usize>,
}

fn shadow_of(col: &Column, col_id: usize, factory: &RngFactory) -> Column {
    let mut rng = factory.new_rng_shadow(col_id);
    match col {
        Column::Numeric(v) => {
            let mut shadow = v.clone();
            rng.shuffle(&mut shadow);
            Column::Numeric(shadow)
        }
        Column::Factor(v, cardinality) => {
            let mut shadow = v.clone();
            rng.shuffle(&mut shadow);
            Column::Factor(shadow, *cardinality)
        }
    }
}

fn build_frame(data: &[Column], n_row: usize) -> Result<PredictorFrame> {
    let raw: Vec<RawColumn> = data
        .iter()
        .map(|c| match c {
            Column::Numeric(v) => RawColumn::Numeric(v),
            Column::Factor(v, cardinality) => RawColumn::Factor(v, *cardinality),
        })
        .collect();
    PredictorFrame::build(n_row, &raw)
}

/// Runs the Boruta loop over `columns` (one entry per original predictor)
/// against `response`, for at most `max_runs` iterations or until no
/// predictor remains tentative. `pval_th` is the per-run significance level,
/// Bonferroni-corrected by the live tentative count, as the teacher does;
/// `ntree` is the forest size trained each iteration; `seed` derives every
/// iteration's RNG streams.
pub fn boruta(columns: &[Column], response: &Response, pval_th: f64, max_runs: usize, ntree: usize, seed: u64) -> Result<BorutaResult> {
    let n_pred = columns.len();
    let n_row = response.len();
    let mut hits = vec![0usize; n_pred];
    let mut tentative: HashSet<usize> = (0..n_pred).collect();
    let mut confirmed: HashSet<usize> = HashSet::new();
    let mut rejected: HashSet<usize> = HashSet::new();

    let mut iter = 0usize;
    while iter < max_runs && !tentative.is_empty() {
        iter += 1;
        log::info!("boruta iteration {}", iter);

        let live: Vec<usize> = tentative.iter().chain(confirmed.iter()).copied().collect();
        let n_live = live.len();
        let factory = RngFactory::new(seed.wrapping_add(iter as u64));

        let mut data: Vec<Column> = live.iter().map(|&idx| columns[idx].clone()).collect();
        data.extend(live.iter().map(|&idx| shadow_of(&columns[idx], idx, &factory)));

        let pf = build_frame(&data, n_row)?;
        let mtry = (pf.n_pred() as f64).sqrt().floor().max(1.0) as usize;
        let mut config = Config::new(pf.n_pred(), ((n_row as f64) * DEFAULT_SAMPLE_FRACTION).floor().max(1.0) as usize, ntree);
        config.pred_select = PredSelect::Fixed(mtry);
        config.seed = seed.wrapping_add(iter as u64 * 97);

        let forest = train(&pf, response, &config)?;
        let zscores = zscore(&forest, &data, response, &factory);

        let max_shadow_zscore = zscores[n_live..].iter().copied().fold(f64::MIN, f64::max);
        for (i, &idx) in live.iter().enumerate() {
            if zscores[i] > max_shadow_zscore {
                hits[idx] += 1;
            }
        }

        let tentative_snapshot: Vec<usize> = tentative.iter().copied().collect();
        let bonferroni = pval_th / tentative_snapshot.len() as f64;
        for &idx in &tentative_snapshot {
            let h = hits[idx];
            let pval_rej = binom_cdf(h as u64, iter as u64, 0.5);
            if pval_rej < bonferroni {
                rejected.insert(idx);
            }

            if h > 0 {
                let pval_conf = binom_cdf((h - 1) as u64, iter as u64, 0.5);
                if pval_conf > 1.0 - bonferroni {
                    confirmed.insert(idx);
                }
            }
        }

        tentative.retain(|idx| !rejected.contains(idx) && !confirmed.contains(idx));
        log::info!("tentative: {} rejected: {} confirmed: {}", tentative.len(), rejected.len(), confirmed.len());
    }

    Ok(BorutaResult {
        confirmed: confirmed.into_iter().collect(),
        rejected: rejected.into_iter().collect(),
        tentative: tentative.into_iter().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn informative_predictor_is_not_rejected_outright() {
        let informative = Column::Numeric(vec![1.0, 1.1, 1.2, 8.0, 8.1, 8.2, 0.9, 8.3]);
        let noise = Column::Numeric(vec![3.0, 7.0, 2.0, 9.0, 1.0, 5.0, 4.0, 6.0]);
        let response = Response::Regression(vec![1.0, 1.0, 1.0, 9.0, 9.0, 9.0, 1.0, 9.0]);

        let result = boruta(&[informative, noise], &response, 0.05, 3, 10, 11).unwrap();
        assert!(!result.rejected.contains(&0) || result.tentative.contains(&0));
    }

    #[test]
    fn runs_stop_once_nothing_is_tentative() {
        let a = Column::Numeric(vec![1.0, 2.0, 3.0, 4.0]);
        let response = Response::Regression(vec![1.0, 2.0, 3.0, 4.0]);
        let result = boruta(&[a], &response, 0.05, 0, 5, 3).unwrap();
        assert_eq!(result.tentative, vec![0]);
        assert!(result.confirmed.is_empty());
        assert!(result.rejected.is_empty());
    }
}

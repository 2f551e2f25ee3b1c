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

//! Double-buffered, per-predictor partition of sample indices, by rank
//! (§4.3), and the `StagedCell` table tracking live (node, predictor) cells.
//! Grounded on `original_source/obs/stagedcell.h`/`obs/obsfrontier.h` for
//! the cell shape, generalized from the source's raw-pointer arena (§9
//! design notes) to owned, typed buffers indexed by `{ bufIdx, predIdx }`.

use crate::predictor_frame::{PredictorFrame, Rank, NO_RANK};
use crate::response::Response;
use crate::sampler::Bag;

/// One partitioned sample record within a predictor's ObsPart segment.
#[derive(Debug, Clone, Copy)]
pub struct ObsRec {
    pub s_idx: u32,
    pub rank: Rank,
    pub s_count: u32,
    pub y_sum: f64,
    pub ctg: Option<u32>,
}

/// Half-open `[start, start+extent)` range within one predictor's ObsPart buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObsRange {
    pub start: usize,
    pub extent: usize,
}

impl ObsRange {
    pub fn end(&self) -> usize {
        self.start + self.extent
    }

    pub fn is_empty(&self) -> bool {
        self.extent == 0
    }
}

/// `{ nodeIdx, predIdx }` cell metadata (§3 StagedCell).
#[derive(Debug, Clone)]
pub struct StagedCell {
    pub node_idx: u32,
    pub pred_idx: usize,
    pub obs_range: ObsRange,
    pub buf_idx: usize,
    /// Number of distinct ranks within `obs_range` (computed by the last
    /// scan that touched this cell). `1` marks a singleton.
    pub run_count: usize,
    pub implicit_rank: Option<Rank>,
    /// Count/sum of the residual blob withheld from ObsPart, if any.
    pub obs_implicit: u32,
    pub implicit_sum: f64,
    pub implicit_ctg_sum: Vec<f64>,
    /// `false` once delisted (singleton or explicitly excluded); sticky
    /// across all descendants of this (node, predictor) pair.
    pub live: bool,
}

impl StagedCell {
    pub fn is_singleton(&self) -> bool {
        self.run_count <= 1
    }
}

/// Two parallel buffers of size `bagCount` per predictor.
pub struct ObsPart {
    pub bag_count: usize,
    pub n_pred: usize,
    buf: [Vec<Vec<ObsRec>>; 2],
}

impl ObsPart {
    pub fn new(bag_count: usize, n_pred: usize) -> Self {
        ObsPart {
            bag_count,
            n_pred,
            buf: [
                vec![Vec::with_capacity(bag_count); n_pred],
                vec![Vec::with_capacity(bag_count); n_pred],
            ],
        }
    }

    pub fn slice(&self, buf_idx: usize, pred_idx: usize, range: ObsRange) -> &[ObsRec] {
        &self.buf[buf_idx][pred_idx][range.start..range.end()]
    }

    pub fn slice_mut(&mut self, buf_idx: usize, pred_idx: usize, range: ObsRange) -> &mut [ObsRec] {
        &mut self.buf[buf_idx][pred_idx][range.start..range.end()]
    }

    /// Resets a predictor's target buffer to a sentinel-filled, `bagCount`-length
    /// scratch area ahead of a restage pass (§4.4).
    pub fn reset_target(&mut self, buf_idx: usize, pred_idx: usize) {
        self.buf[buf_idx][pred_idx] = vec![
            ObsRec { s_idx: 0, rank: NO_RANK, s_count: 0, y_sum: 0.0, ctg: None };
            self.bag_count
        ];
    }

    /// Stages the root cell (§4.3): walks the predictor's full presort once,
    /// emitting a record for every bagged row not absorbed by the implicit
    /// blob, in rank-monotone order.
    pub fn stage_root(&mut self, pf: &PredictorFrame, bag: &Bag, response: &Response, pred_idx: usize) -> StagedCell {
        let col = &pf.columns[pred_idx];
        let n_ctg = response.n_ctg();

        let mut obs_implicit = 0u32;
        let mut implicit_sum = 0.0;
        let mut implicit_ctg_sum = vec![0.0; n_ctg];
        let mut distinct_ranks = std::collections::BTreeSet::new();
        let buf0 = &mut self.buf[0][pred_idx];
        buf0.clear();

        for &row in &col.r2r {
            let s_idx = bag.s_idx_row[row];
            if s_idx < 0 {
                continue;
            }
            let rank = col.rank[row];
            let sample = &bag.samples[s_idx as usize];

            if Some(rank) == col.implicit_rank {
                obs_implicit += sample.s_count;
                implicit_sum += sample.val;
                if let Some(ctg) = sample.ctg {
                    implicit_ctg_sum[ctg as usize] += sample.val;
                }
                continue;
            }

            distinct_ranks.insert(rank);
            buf0.push(ObsRec {
                s_idx: s_idx as u32,
                rank,
                s_count: sample.s_count,
                y_sum: sample.val,
                ctg: sample.ctg,
            });
        }

        let extent = buf0.len();
        self.buf[1][pred_idx] = vec![
            ObsRec { s_idx: 0, rank: NO_RANK, s_count: 0, y_sum: 0.0, ctg: None };
            self.bag_count
        ];

        StagedCell {
            node_idx: 0,
            pred_idx,
            obs_range: ObsRange { start: 0, extent },
            buf_idx: 0,
            run_count: distinct_ranks.len() + if obs_implicit > 0 { 1 } else { 0 },
            implicit_rank: col.implicit_rank,
            obs_implicit,
            implicit_sum,
            implicit_ctg_sum,
            live: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor_frame::RawColumn;

    fn setup() -> (PredictorFrame, Bag) {
        let pf = PredictorFrame::build(4, &[RawColumn::Numeric(&[4.0, 2.0, 3.0, 1.0])]).unwrap();
        let response = Response::Regression(vec![4.0, 2.0, 3.0, 1.0]);
        let mut rng = crate::rng::Rng::new(1, 1);
        let bag = crate::sampler::draw_bag(4, 4, false, &response, &mut rng);
        (pf, bag)
    }

    #[test]
    fn stage_root_is_rank_monotone_and_conserves_bag_count() {
        let (pf, bag) = setup();
        let response = Response::Regression(vec![4.0, 2.0, 3.0, 1.0]);
        let mut op = ObsPart::new(bag.bag_count, 1);
        let cell = op.stage_root(&pf, &bag, &response, 0);
        let recs = op.slice(0, 0, cell.obs_range);
        assert_eq!(recs.len() + cell.obs_implicit as usize, bag.bag_count);
        for w in recs.windows(2) {
            assert!(w[0].rank <= w[1].rank);
        }
    }
}

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

//! Restages a splitting node's cells into its two children (§4.4). Grounded
//! on `original_source/frontier/interlevel.h` for the two-buffer ping-pong
//! shape; the residual-partitioning step itself
//! departs from the source's explicit three-pass row scan (§4.4 point 3) in
//! favor of subtracting each child's already-known node-wide sum/count/ctg-sum
//! (available from the accepted split, since they come from the response and
//! so are the same for every predictor) from that child's explicitly-scanned
//! subtotal -- this is an equivalent way to read off the implicit residual
//! without ever materialising which bagged rows it covers.

use crate::obs_part::{ObsPart, ObsRange, StagedCell};
use crate::predictor_frame::Rank;
use std::collections::HashMap;

/// Per-sample left/right assignment for one splitting node, keyed by the
/// bag-local sample index (`ObsRec::s_idx`).
pub struct SampleSides {
    sides: HashMap<u32, bool>,
    default_left: bool,
}

impl SampleSides {
    /// `default_left` is the side the winning predictor's implicit blob (if
    /// any) was assigned to; every sample not explicitly listed inherits it.
    pub fn new(default_left: bool) -> Self {
        SampleSides { sides: HashMap::new(), default_left }
    }

    pub fn set(&mut self, s_idx: u32, left: bool) {
        self.sides.insert(s_idx, left);
    }

    pub fn is_left(&self, s_idx: u32) -> bool {
        *self.sides.get(&s_idx).unwrap_or(&self.default_left)
    }
}

/// Builds the sample->side map for a splitting node from the winning
/// predictor's own staged cell: explicit records are assigned by comparing
/// rank against the cut (numeric) or testing set membership (factor); the
/// implicit blob, if any, takes `left_impl` as a whole.
pub fn sides_from_numeric(recs: &[crate::obs_part::ObsRec], rank_lh: Rank, left_impl: bool) -> SampleSides {
    let mut sides = SampleSides::new(left_impl);
    for rec in recs {
        sides.set(rec.s_idx, rec.rank <= rank_lh);
    }
    sides
}

pub fn sides_from_factor(recs: &[crate::obs_part::ObsRec], lh_ranks: &[Rank], left_impl: bool) -> SampleSides {
    let lh_set: std::collections::HashSet<Rank> = lh_ranks.iter().copied().collect();
    let mut sides = SampleSides::new(left_impl);
    for rec in recs {
        sides.set(rec.s_idx, lh_set.contains(&rec.rank));
    }
    sides
}

/// The codes not in `lh_ranks`, out of the factor's full `cardinality` --
/// the branch's argmax-inversion complement (§4.6.2).
pub fn complement_ranks(lh_ranks: &[Rank], cardinality: usize) -> Vec<Rank> {
    let lh_set: std::collections::HashSet<Rank> = lh_ranks.iter().copied().collect();
    (0..cardinality as Rank).filter(|c| !lh_set.contains(c)).collect()
}

/// Child cell produced by restaging one predictor's parent cell.
pub struct ChildCell {
    pub obs_range: ObsRange,
    pub run_count: usize,
    pub implicit_rank: Option<Rank>,
    pub obs_implicit: u32,
    pub implicit_sum: f64,
    pub implicit_ctg_sum: Vec<f64>,
}

/// Totals a child node carries regardless of which predictor asks --
/// response-derived, so identical across every (node, predictor) cell.
pub struct ChildTotals<'a> {
    pub sum: f64,
    pub s_count: u32,
    pub ctg_sum: &'a [f64],
}

/// Restages one (node, predictor) cell into its two children's target
/// buffer, scattering explicit records by side and recovering each side's
/// implicit residual by subtraction from the child's node-wide totals.
/// `left_off`/`right_off` are the running write cursors into the target
/// buffer for this predictor, shared across every node restaged this level.
pub fn restage_cell(
    obs_part: &mut ObsPart,
    pred_idx: usize,
    parent: &StagedCell,
    sides: &SampleSides,
    target_buf_idx: usize,
    left_off: &mut usize,
    right_off: &mut usize,
    left_totals: &ChildTotals,
    right_totals: &ChildTotals,
) -> (ChildCell, ChildCell) {
    let n_ctg = left_totals.ctg_sum.len();
    let recs: Vec<_> = obs_part.slice(parent.buf_idx, pred_idx, parent.obs_range).to_vec();

    let mut left_explicit_sum = 0.0;
    let mut left_explicit_s_count = 0u32;
    let mut left_explicit_ctg_sum = vec![0.0; n_ctg];
    let mut right_explicit_sum = 0.0;
    let mut right_explicit_s_count = 0u32;
    let mut right_explicit_ctg_sum = vec![0.0; n_ctg];

    let left_start = *left_off;
    let right_start = *right_off;
    let mut left_distinct = std::collections::BTreeSet::new();
    let mut right_distinct = std::collections::BTreeSet::new();

    for rec in &recs {
        if sides.is_left(rec.s_idx) {
            left_explicit_sum += rec.y_sum;
            left_explicit_s_count += rec.s_count;
            if let Some(ctg) = rec.ctg {
                left_explicit_ctg_sum[ctg as usize] += rec.y_sum;
            }
            left_distinct.insert(rec.rank);
            let slot = &mut obs_part.slice_mut(target_buf_idx, pred_idx, ObsRange { start: *left_off, extent: 1 })[0];
            *slot = *rec;
            *left_off += 1;
        } else {
            right_explicit_sum += rec.y_sum;
            right_explicit_s_count += rec.s_count;
            if let Some(ctg) = rec.ctg {
                right_explicit_ctg_sum[ctg as usize] += rec.y_sum;
            }
            right_distinct.insert(rec.rank);
            let slot = &mut obs_part.slice_mut(target_buf_idx, pred_idx, ObsRange { start: *right_off, extent: 1 })[0];
            *slot = *rec;
            *right_off += 1;
        }
    }

    let left_obs_implicit = (left_totals.s_count as i64 - left_explicit_s_count as i64).max(0) as u32;
    let right_obs_implicit = (right_totals.s_count as i64 - right_explicit_s_count as i64).max(0) as u32;
    let left_implicit_sum = left_totals.sum - left_explicit_sum;
    let right_implicit_sum = right_totals.sum - right_explicit_sum;
    let left_implicit_ctg_sum: Vec<f64> = (0..n_ctg).map(|c| left_totals.ctg_sum[c] - left_explicit_ctg_sum[c]).collect();
    let right_implicit_ctg_sum: Vec<f64> = (0..n_ctg).map(|c| right_totals.ctg_sum[c] - right_explicit_ctg_sum[c]).collect();

    let implicit_rank = parent.implicit_rank;
    let left_run_count = left_distinct.len() + if left_obs_implicit > 0 { 1 } else { 0 };
    let right_run_count = right_distinct.len() + if right_obs_implicit > 0 { 1 } else { 0 };

    let left = ChildCell {
        obs_range: ObsRange { start: left_start, extent: *left_off - left_start },
        run_count: left_run_count,
        implicit_rank,
        obs_implicit: left_obs_implicit,
        implicit_sum: left_implicit_sum,
        implicit_ctg_sum: left_implicit_ctg_sum,
    };
    let right = ChildCell {
        obs_range: ObsRange { start: right_start, extent: *right_off - right_start },
        run_count: right_run_count,
        implicit_rank,
        obs_implicit: right_obs_implicit,
        implicit_sum: right_implicit_sum,
        implicit_ctg_sum: right_implicit_ctg_sum,
    };
    (left, right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obs_part::ObsRec;

    #[test]
    fn restage_conserves_explicit_records_across_children() {
        let mut op = ObsPart::new(4, 1);
        op.reset_target(0, 0);
        // Manually populate buffer 0 with 4 explicit records, rank-sorted.
        for (i, rank) in [0u32, 1, 2, 3].iter().enumerate() {
            let slot = &mut op.slice_mut(0, 0, ObsRange { start: i, extent: 1 })[0];
            *slot = ObsRec { s_idx: i as u32, rank: *rank, s_count: 1, y_sum: *rank as f64, ctg: None };
        }
        op.reset_target(1, 0);

        let parent = StagedCell {
            node_idx: 0,
            pred_idx: 0,
            obs_range: ObsRange { start: 0, extent: 4 },
            buf_idx: 0,
            run_count: 4,
            implicit_rank: None,
            obs_implicit: 0,
            implicit_sum: 0.0,
            implicit_ctg_sum: vec![],
            live: true,
        };
        let mut sides = SampleSides::new(false);
        sides.set(0, true);
        sides.set(1, true);
        sides.set(2, false);
        sides.set(3, false);

        let left_totals = ChildTotals { sum: 1.0, s_count: 2, ctg_sum: &[] };
        let right_totals = ChildTotals { sum: 5.0, s_count: 2, ctg_sum: &[] };
        let mut left_off = 0;
        let mut right_off = 2;
        let (left, right) =
            restage_cell(&mut op, 0, &parent, &sides, 1, &mut left_off, &mut right_off, &left_totals, &right_totals);

        assert_eq!(left.obs_range.extent, 2);
        assert_eq!(right.obs_range.extent, 2);
        assert_eq!(left.obs_implicit, 0);
        assert_eq!(right.obs_implicit, 0);
    }
}

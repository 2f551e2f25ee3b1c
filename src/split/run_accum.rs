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

//! Unordered-factor split accumulator (§4.6.2). Grounded on
//! `original_source/split/runset.cc`/`runset.h`: collapse a factor cell's
//! rows into per-code runs, order the runs, then search over the ordering
//! for the best left/right partition of run codes.
//!
//! Three regimes, same as the source's `RunSet`:
//! - regression / binary categorical: runs are totally ordered by a scalar
//!   key (mean response, or category-1 concentration) and the search
//!   degenerates to a CutAccum-style scan over the ordering.
//! - narrow multi-class (run count <= `MAX_WIDTH`): every non-trivial subset
//!   of runs is tried directly.
//! - wide multi-class: runs are downsampled to `MAX_WIDTH` by the run
//!   factory's per-(tree, node, predictor) stream before the narrow search,
//!   per §4.6.2's decided reading of `maxWidth`/`maxWidthDirect`.
//!
//! `lh_ranks` here is always the search's literal argmax subset; §4.6.2's
//! argmax-inversion coin flip (subset vs. complement as the recorded true
//! branch) happens once per accepted split in `train::grow_tree`, since only
//! then is the full factor cardinality and the node's total stats on hand
//! to build the complement.

use crate::bheap::BHeap;
use crate::config::MAX_WIDTH;
use crate::gini::{gini_info, regression_info};
use crate::obs_part::ObsRec;
use crate::predictor_frame::Rank;
use crate::rng::Rng;

pub struct Run {
    pub rank: Rank,
    pub s_count: u32,
    pub sum: f64,
    pub ctg_sum: Vec<f64>,
    pub is_implicit: bool,
}

pub struct RunSplitResult {
    pub info: f64,
    /// Category codes (ranks) assigned to the left branch.
    pub lh_ranks: Vec<Rank>,
    pub left_impl: bool,
    pub lh_s_count: u32,
    pub lh_sum: f64,
    pub lh_ctg_sum: Vec<f64>,
}

/// Collapses a factor cell's explicit records (one code per row already
/// sorted by rank == code, §4.1) into per-code runs, plus one synthetic run
/// for the withheld implicit code, if any.
pub fn build_runs(
    recs: &[ObsRec],
    implicit_rank: Option<Rank>,
    obs_implicit: u32,
    implicit_sum: f64,
    implicit_ctg_sum: &[f64],
    n_ctg: usize,
) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for rec in recs {
        if let Some(last) = runs.last_mut() {
            if last.rank == rec.rank {
                last.s_count += rec.s_count;
                last.sum += rec.y_sum;
                if let Some(ctg) = rec.ctg {
                    last.ctg_sum[ctg as usize] += rec.y_sum;
                }
                continue;
            }
        }
        let mut ctg_sum = vec![0.0; n_ctg];
        if let Some(ctg) = rec.ctg {
            ctg_sum[ctg as usize] = rec.y_sum;
        }
        runs.push(Run { rank: rec.rank, s_count: rec.s_count, sum: rec.y_sum, ctg_sum, is_implicit: false });
    }

    if obs_implicit > 0 {
        if let Some(rank) = implicit_rank {
            runs.push(Run {
                rank,
                s_count: obs_implicit,
                sum: implicit_sum,
                ctg_sum: implicit_ctg_sum.to_vec(),
                is_implicit: true,
            });
        }
    }

    runs
}

/// Orders runs by a scalar key and scans the ordering for the best cut,
/// exactly as CutAccum does over numeric ranks (§4.6.1 applied to runs).
fn scalar_scan(runs: &[Run], n_ctg: usize) -> Option<RunSplitResult> {
    let mut heap = BHeap::new();
    for (i, run) in runs.iter().enumerate() {
        let key = if n_ctg == 2 {
            run.ctg_sum[1] / run.sum.max(f64::MIN_POSITIVE)
        } else {
            run.sum / run.s_count.max(1) as f64
        };
        heap.insert(key, i);
    }
    let order = heap.depopulate();

    let total_s_count: u32 = runs.iter().map(|r| r.s_count).sum();
    let total_sum: f64 = runs.iter().map(|r| r.sum).sum();
    let mut total_ctg_sum = vec![0.0; n_ctg];
    for r in runs {
        for c in 0..n_ctg {
            total_ctg_sum[c] += r.ctg_sum[c];
        }
    }

    let mut best: Option<RunSplitResult> = None;
    let mut l_s_count = 0u32;
    let mut l_sum = 0.0;
    let mut l_ctg_sum = vec![0.0; n_ctg];
    let mut lh_ranks = Vec::new();
    let mut left_impl = false;

    for i in 0..order.len() - 1 {
        let (_, slot) = order[i];
        let run = &runs[slot];
        l_s_count += run.s_count;
        l_sum += run.sum;
        for c in 0..n_ctg {
            l_ctg_sum[c] += run.ctg_sum[c];
        }
        lh_ranks.push(run.rank);
        if run.is_implicit {
            left_impl = true;
        }

        let r_s_count = total_s_count - l_s_count;
        let r_sum = total_sum - l_sum;
        let info = if n_ctg > 0 {
            let r_ctg_sum: Vec<f64> = (0..n_ctg).map(|c| total_ctg_sum[c] - l_ctg_sum[c]).collect();
            gini_info(&l_ctg_sum, &r_ctg_sum)
        } else {
            regression_info(l_sum, l_s_count as f64, r_sum, r_s_count as f64)
        };

        if let Some(info) = info {
            if best.as_ref().map_or(true, |b| info > b.info) {
                best = Some(RunSplitResult {
                    info,
                    lh_ranks: lh_ranks.clone(),
                    left_impl,
                    lh_s_count: l_s_count,
                    lh_sum: l_sum,
                    lh_ctg_sum: l_ctg_sum.clone(),
                });
            }
        }
    }

    best
}

/// Exhaustive search over non-trivial subsets of `runs`, encoded as a
/// bitmask (§4.6.2, `MAX_WIDTH` bound on run count).
fn subset_scan(runs: &[Run], n_ctg: usize) -> Option<RunSplitResult> {
    let k = runs.len();
    debug_assert!(k <= MAX_WIDTH);
    if k < 2 {
        return None;
    }

    let total_s_count: u32 = runs.iter().map(|r| r.s_count).sum();
    let total_sum: f64 = runs.iter().map(|r| r.sum).sum();
    let mut total_ctg_sum = vec![0.0; n_ctg];
    for r in runs {
        for c in 0..n_ctg {
            total_ctg_sum[c] += r.ctg_sum[c];
        }
    }

    let mut best: Option<RunSplitResult> = None;
    // Every nonempty proper subset; fixing bit 0 out of the mask avoids
    // trying each partition and its complement twice.
    for mask in 1u32..(1u32 << (k - 1)) {
        let mut l_s_count = 0u32;
        let mut l_sum = 0.0;
        let mut l_ctg_sum = vec![0.0; n_ctg];
        let mut lh_ranks = Vec::new();
        let mut left_impl = false;
        for slot in 0..k {
            if mask & (1 << slot) != 0 {
                let run = &runs[slot];
                l_s_count += run.s_count;
                l_sum += run.sum;
                for c in 0..n_ctg {
                    l_ctg_sum[c] += run.ctg_sum[c];
                }
                lh_ranks.push(run.rank);
                if run.is_implicit {
                    left_impl = true;
                }
            }
        }

        let r_s_count = total_s_count - l_s_count;
        let r_sum = total_sum - l_sum;
        let info = if n_ctg > 0 {
            let r_ctg_sum: Vec<f64> = (0..n_ctg).map(|c| total_ctg_sum[c] - l_ctg_sum[c]).collect();
            gini_info(&l_ctg_sum, &r_ctg_sum)
        } else {
            regression_info(l_sum, l_s_count as f64, r_sum, r_s_count as f64)
        };

        if let Some(info) = info {
            if best.as_ref().map_or(true, |b| info > b.info) {
                best = Some(RunSplitResult {
                    info,
                    lh_ranks: lh_ranks.clone(),
                    left_impl,
                    lh_s_count: l_s_count,
                    lh_sum: l_sum,
                    lh_ctg_sum: l_ctg_sum.clone(),
                });
            }
        }
    }

    best
}

/// Downsamples a wide run list to `MAX_WIDTH` entries via a per-candidate
/// RNG stream, keeping runs with the largest random key (mirrors the
/// source's `deWide`: heap-random then depopulate).
fn downsample(runs: Vec<Run>, rng: &mut Rng) -> Vec<Run> {
    let mut heap = BHeap::new();
    for (i, _) in runs.iter().enumerate() {
        heap.insert(rng.rand_uni(), i);
    }
    let mut kept: Vec<(f64, usize)> = heap.depopulate();
    kept.sort_by(|a, b| b.0.total_cmp(&a.0));
    kept.truncate(MAX_WIDTH);
    let mut kept_idx: Vec<usize> = kept.into_iter().map(|(_, i)| i).collect();
    kept_idx.sort_unstable();
    let mut runs = runs;
    let mut out = Vec::with_capacity(kept_idx.len());
    for i in kept_idx.drain(..).rev() {
        out.push(runs.swap_remove(i));
    }
    out.reverse();
    out
}

/// Evaluates the best factor split for one cell. `n_ctg == 0` selects the
/// regression path; `n_ctg == 2` the binary-concentration heap path;
/// `n_ctg > 2` the multi-class subset search, downsampling first if the
/// run count exceeds `MAX_WIDTH`.
pub fn eval_factor_split(runs: Vec<Run>, n_ctg: usize, rng: &mut Rng) -> Option<RunSplitResult> {
    if runs.len() < 2 {
        return None;
    }
    if n_ctg <= 2 {
        return scalar_scan(&runs, n_ctg);
    }
    if runs.len() <= MAX_WIDTH {
        subset_scan(&runs, n_ctg)
    } else {
        let narrowed = downsample(runs, rng);
        subset_scan(&narrowed, n_ctg)
    }
}

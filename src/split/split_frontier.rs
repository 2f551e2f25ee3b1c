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

//! Per-level candidate pre-schedule and argmax (§4.5, §4.7). Grounded on
//! `original_source/rf/candrf.cc`/`candrf.h` (candidate scheduling by
//! predictor probability) and `original_source/split/splitfrontier.h`
//! (per-node argmax across the level's evaluated candidates).

use crate::bheap::BHeap;
use crate::config::Config;
use crate::frontier::{Frontier, IndexSet};
use crate::obs_part::{ObsPart, StagedCell};
use crate::predictor_frame::{PredictorFrame, Rank};
use crate::response::Response;
use crate::rng::factory::RngFactory;
use crate::split::cut_accum::eval_cut;
use crate::split::run_accum::{build_runs, eval_factor_split};

#[derive(Debug, Clone)]
pub enum SplitKind {
    Numeric { rank_lh: Rank, rank_rh: Rank, split_val: f64 },
    Factor { lh_ranks: Vec<Rank> },
}

#[derive(Debug, Clone)]
pub struct SplitOutcome {
    pub node_idx: u32,
    pub pred_idx: usize,
    pub info: f64,
    pub lh_s_count: u32,
    pub lh_sum: f64,
    pub lh_ctg_sum: Vec<f64>,
    pub left_impl: bool,
    pub kind: SplitKind,
}

/// One (node, predictor) pair scheduled for evaluation this level.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub node_idx: u32,
    pub pred_idx: usize,
}

/// Schedules candidates for a single node, per `config.pred_select` (§4.5).
fn schedule_node(node_idx: u32, n_pred: usize, config: &Config, factory: &RngFactory, ith_tree: usize, level: usize) -> Vec<Candidate> {
    match &config.pred_select {
        crate::config::PredSelect::Bernoulli => {
            let mut rng = factory.new_rng_bernoulli(ith_tree, level, node_idx as usize);
            (0..n_pred)
                .filter(|&pred_idx| rng.rand_uni() < config.pred_prob[pred_idx])
                .map(|pred_idx| Candidate { node_idx, pred_idx })
                .collect()
        }
        crate::config::PredSelect::Fixed(k) => {
            let mut rng = factory.new_rng_fixed(ith_tree, level, node_idx as usize);
            let k = (*k).min(n_pred);
            let mut heap = BHeap::new();
            for pred_idx in 0..n_pred {
                let weight = config.pred_prob[pred_idx].max(f64::MIN_POSITIVE);
                // Efraimidis-Spirakis weighted reservoir: largest key wins,
                // so a min-heap keeps the smallest (n_pred - k) out.
                let key = rng.rand_uni().powf(1.0 / weight);
                heap.insert(key, pred_idx);
            }
            let ordered = heap.depopulate();
            ordered.into_iter().rev().take(k).map(|(_, pred_idx)| Candidate { node_idx, pred_idx }).collect()
        }
    }
}

/// Schedules every live cell's candidate across the whole frontier.
pub fn select_candidates(
    frontier: &Frontier,
    cells: &[StagedCell],
    n_pred: usize,
    config: &Config,
    factory: &RngFactory,
    ith_tree: usize,
    level: usize,
) -> Vec<Candidate> {
    let live_preds: std::collections::HashSet<(u32, usize)> =
        cells.iter().filter(|c| c.live).map(|c| (c.node_idx, c.pred_idx)).collect();

    frontier
        .nodes
        .iter()
        .flat_map(|node| schedule_node(node.split_idx, n_pred, config, factory, ith_tree, level))
        .filter(|cand| live_preds.contains(&(cand.node_idx, cand.pred_idx)))
        .collect()
}

/// Evaluates one scheduled candidate against its staged cell, producing the
/// best split this (node, predictor) pair offers, if any.
pub fn evaluate_candidate(
    cell: &StagedCell,
    obs_part: &ObsPart,
    pf: &PredictorFrame,
    response: &Response,
    config: &Config,
    factory: &RngFactory,
    ith_tree: usize,
) -> Option<SplitOutcome> {
    if !cell.live || cell.is_singleton() {
        return None;
    }
    let col = &pf.columns[cell.pred_idx];
    let recs = obs_part.slice(cell.buf_idx, cell.pred_idx, cell.obs_range);
    let n_ctg = response.n_ctg();

    if col.is_factor() {
        let runs = build_runs(recs, cell.implicit_rank, cell.obs_implicit, cell.implicit_sum, &cell.implicit_ctg_sum, n_ctg);
        let mut rng = factory.new_rng_wide_factor(ith_tree, cell.node_idx as usize, cell.pred_idx);
        let result = eval_factor_split(runs, n_ctg, &mut rng)?;
        Some(SplitOutcome {
            node_idx: cell.node_idx,
            pred_idx: cell.pred_idx,
            info: result.info,
            lh_s_count: result.lh_s_count,
            lh_sum: result.lh_sum,
            lh_ctg_sum: result.lh_ctg_sum,
            left_impl: result.left_impl,
            kind: SplitKind::Factor { lh_ranks: result.lh_ranks },
        })
    } else {
        let monotone = config.monotone_sign.get(cell.pred_idx).copied().flatten();
        let quant = config.split_quant.get(cell.pred_idx).copied().unwrap_or(0.5);
        let result = eval_cut(
            recs,
            cell.implicit_rank,
            cell.obs_implicit,
            cell.implicit_sum,
            &cell.implicit_ctg_sum,
            n_ctg,
            monotone,
            col,
            quant,
        )?;
        Some(SplitOutcome {
            node_idx: cell.node_idx,
            pred_idx: cell.pred_idx,
            info: result.info,
            lh_s_count: result.lh_s_count,
            lh_sum: result.lh_sum,
            lh_ctg_sum: result.lh_ctg_sum,
            left_impl: result.left_impl,
            kind: SplitKind::Numeric { rank_lh: result.rank_lh, rank_rh: result.rank_rh, split_val: result.split_val },
        })
    }
}

/// Picks, per node, the best outcome among its evaluated candidates and
/// tests it against the node's necessity bar (§4.7): the candidate's
/// information must exceed `preBias + minInfo`, where `minInfo` was set
/// when the node was staged to `minRatio` times its parent's accepted
/// split information (zero at the root, which has no parent split).
/// Ties are broken by a per-(tree, node, predictor) coin flip so that
/// re-running the same data reproduces the same tree.
pub fn accept_splits<'a>(
    outcomes: &'a [SplitOutcome],
    frontier: &Frontier,
    factory: &RngFactory,
    ith_tree: usize,
) -> Vec<&'a SplitOutcome> {
    let mut best_by_node: std::collections::HashMap<u32, &SplitOutcome> = std::collections::HashMap::new();
    for outcome in outcomes {
        match best_by_node.get(&outcome.node_idx) {
            None => {
                best_by_node.insert(outcome.node_idx, outcome);
            }
            Some(cur) => {
                if outcome.info > cur.info {
                    best_by_node.insert(outcome.node_idx, outcome);
                } else if outcome.info == cur.info {
                    let mut rng = factory.new_rng_tie_break(ith_tree, outcome.node_idx as usize, outcome.pred_idx);
                    if rng.next_bool() {
                        best_by_node.insert(outcome.node_idx, outcome);
                    }
                }
            }
        }
    }

    frontier
        .nodes
        .iter()
        .filter_map(|node: &IndexSet| {
            let outcome = best_by_node.get(&node.split_idx)?;
            if outcome.info > node.pre_bias + node.min_info {
                Some(*outcome)
            } else {
                None
            }
        })
        .collect()
}

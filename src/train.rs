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

//! Top-level training entry (§5). Per tree: draw a bag, stage the root cell
//! for every predictor, then loop { select_candidates -> evaluate_candidate
//! -> accept_splits -> InterLevel::restage } until the frontier empties, and
//! consume the finished `PreTree` into the shared `Forest`. Trees are
//! parallelized across `config.tree_block` worker threads with a shared
//! work-counter and result channel, grounded on the teacher's
//! `random_forest::importance_per_tree` threading (`thread::scope` +
//! `Arc<Mutex<usize>>` + `mpsc::channel`), generalized since training doesn't
//! need the teacher's `Arc`-wrapped trait-object data source: plain shared
//! references suffice here because `thread::scope` lets borrows outlive the
//! spawned threads.

use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::Mutex;
use std::thread;

use crate::config::Config;
use crate::error::{ForestError, Result};
use crate::forest::{Forest, LeafStats};
use crate::frontier::{Frontier, IndexSet};
use crate::gini::{gini_pre_bias, regression_pre_bias};
use crate::interlevel::{complement_ranks, restage_cell, sides_from_factor, sides_from_numeric, ChildTotals};
use crate::obs_part::{ObsPart, StagedCell};
use crate::predictor_frame::PredictorFrame;
use crate::pretree::PreTree;
use crate::response::Response;
use crate::rng::factory::RngFactory;
use crate::sampler::{draw_bag, Bag};
use crate::split::{accept_splits, evaluate_candidate, select_candidates, SplitKind, SplitOutcome};

fn finalize_leaf(node: &IndexSet, row_of_sample: &[usize], response: &Response, leaf_stats: &mut HashMap<u32, LeafStats>) {
    let samples = node.samples.iter().map(|&s_idx| (s_idx, response.value(row_of_sample[s_idx as usize]))).collect();
    leaf_stats.insert(node.pt_id, LeafStats { sum: node.sum, s_count: node.s_count, ctg_sum: node.ctg_sum.clone(), samples });
}

/// Grows one tree, returning its `PreTree`, per-leaf stats and bag, or
/// `None` if the bag draw came up empty (possible under small `nSamp`/`nRow`
/// combinations; the caller logs and moves on rather than failing the run).
fn grow_tree(
    pf: &PredictorFrame,
    response: &Response,
    config: &Config,
    factory: &RngFactory,
    ith_tree: usize,
) -> Option<(PreTree, HashMap<u32, LeafStats>, Bag)> {
    let mut rng_bag = factory.new_rng_bag(ith_tree);
    let bag = draw_bag(pf.n_row, config.n_samp, config.replace, response, &mut rng_bag);
    if bag.bag_count == 0 {
        log::warn!("tree {} drew an empty bag (nSamp/nRow too small?), skipping", ith_tree);
        return None;
    }

    let n_pred = pf.n_pred();
    let n_ctg = response.n_ctg();

    let mut row_of_sample = vec![0usize; bag.bag_count];
    for row in 0..pf.n_row {
        if bag.s_idx_row[row] >= 0 {
            row_of_sample[bag.s_idx_row[row] as usize] = row;
        }
    }

    let mut obs_part = ObsPart::new(bag.bag_count, n_pred);
    let mut cells: Vec<StagedCell> = (0..n_pred).map(|pred_idx| obs_part.stage_root(pf, &bag, response, pred_idx)).collect();
    let mut cur_buf = 0usize;

    let mut pretree = PreTree::new(bag.bag_count);
    let mut leaf_stats: HashMap<u32, LeafStats> = HashMap::new();

    let root_sum: f64 = bag.samples.iter().map(|s| s.val).sum();
    let root_s_count = bag.n_samp();
    let mut root_ctg_sum = vec![0.0; n_ctg];
    for sample in &bag.samples {
        if let Some(ctg) = sample.ctg {
            root_ctg_sum[ctg as usize] += sample.val;
        }
    }
    let root_pre_bias =
        if n_ctg == 0 { regression_pre_bias(root_sum, root_s_count as f64) } else { gini_pre_bias(&root_ctg_sum) };

    let root = IndexSet {
        split_idx: 0,
        pt_id: 0,
        depth: 0,
        s_count: root_s_count,
        sum: root_sum,
        ctg_sum: root_ctg_sum,
        pre_bias: root_pre_bias,
        min_info: 0.0,
        does_split: false,
        lh_extent: 0,
        lh_s_count: 0,
        left_impl: false,
        samples: (0..bag.bag_count as u32).collect(),
    };
    let mut frontier = Frontier { nodes: vec![root] };
    let mut level = 0usize;

    while !frontier.is_empty() {
        let candidates = select_candidates(&frontier, &cells, n_pred, config, factory, ith_tree, level);
        let mut outcomes = Vec::new();
        for cand in &candidates {
            if let Some(cell) = cells.iter().find(|c| c.node_idx == cand.node_idx && c.pred_idx == cand.pred_idx && c.live) {
                if let Some(outcome) = evaluate_candidate(cell, &obs_part, pf, response, config, factory, ith_tree) {
                    outcomes.push(outcome);
                }
            }
        }
        let accepted = accept_splits(&outcomes, &frontier, factory, ith_tree);
        let accepted_by_node: HashMap<u32, &SplitOutcome> = accepted.into_iter().map(|o| (o.node_idx, o)).collect();

        let target_buf = 1 - cur_buf;
        for pred_idx in 0..n_pred {
            obs_part.reset_target(target_buf, pred_idx);
        }

        let mut next_nodes: Vec<IndexSet> = Vec::new();
        let mut next_cells: Vec<StagedCell> = Vec::new();

        for node in &frontier.nodes {
            let outcome = match accepted_by_node.get(&node.split_idx) {
                None => {
                    finalize_leaf(node, &row_of_sample, response, &mut leaf_stats);
                    continue;
                }
                Some(outcome) => outcome,
            };

            // §4.6.2 argmax inversion: for factor splits, a per-(tree, node,
            // predictor) coin flip decides whether the branch recorded as
            // "true" is the search's literal argmax subset (`lh_ranks`) or
            // its complement over the factor's full cardinality, so replays
            // don't consistently favor whichever side the search happened
            // to emit.
            let factor_invert = match &outcome.kind {
                SplitKind::Factor { .. } => {
                    let mut rng = factory.new_rng_argmax_invert(ith_tree, node.split_idx as usize, outcome.pred_idx);
                    rng.next_bool()
                }
                SplitKind::Numeric { .. } => false,
            };

            let (left_pt, right_pt) = match &outcome.kind {
                SplitKind::Numeric { split_val, .. } => pretree.split_numeric(node.pt_id, outcome.pred_idx, *split_val, outcome.info),
                SplitKind::Factor { lh_ranks } => {
                    let cardinality = pf.columns[outcome.pred_idx].distinct_values();
                    let true_ranks = if factor_invert { complement_ranks(lh_ranks, cardinality) } else { lh_ranks.clone() };
                    pretree.split_factor(node.pt_id, outcome.pred_idx, cardinality, &true_ranks, outcome.info)
                }
            };

            let winning_cell = cells
                .iter()
                .find(|c| c.node_idx == node.split_idx && c.pred_idx == outcome.pred_idx)
                .expect("winning predictor must have a live staged cell");
            let winning_recs = obs_part.slice(cur_buf, outcome.pred_idx, winning_cell.obs_range);
            let true_left_impl = if factor_invert { !outcome.left_impl } else { outcome.left_impl };
            let sides = match &outcome.kind {
                SplitKind::Numeric { rank_lh, .. } => sides_from_numeric(winning_recs, *rank_lh, true_left_impl),
                SplitKind::Factor { lh_ranks } => {
                    let cardinality = pf.columns[outcome.pred_idx].distinct_values();
                    let true_ranks = if factor_invert { complement_ranks(lh_ranks, cardinality) } else { lh_ranks.clone() };
                    sides_from_factor(winning_recs, &true_ranks, true_left_impl)
                }
            };

            let mut left_samples = Vec::new();
            let mut right_samples = Vec::new();
            for &s_idx in &node.samples {
                if sides.is_left(s_idx) {
                    left_samples.push(s_idx);
                } else {
                    right_samples.push(s_idx);
                }
            }
            pretree.reassign(&left_samples, left_pt);
            pretree.reassign(&right_samples, right_pt);

            // The left/right stats must track whichever side ended up
            // recorded as "true" above, not always `outcome`'s own lh_*.
            let (lh_sum, lh_s_count, lh_ctg_sum): (f64, u32, Vec<f64>) = if factor_invert {
                (
                    node.sum - outcome.lh_sum,
                    node.s_count - outcome.lh_s_count,
                    node.ctg_sum.iter().zip(outcome.lh_ctg_sum.iter()).map(|(t, l)| t - l).collect(),
                )
            } else {
                (outcome.lh_sum, outcome.lh_s_count, outcome.lh_ctg_sum.clone())
            };
            let left_sum = lh_sum;
            let right_sum = node.sum - lh_sum;
            let left_s_count = lh_s_count;
            let right_s_count = node.s_count - lh_s_count;
            let left_ctg_sum = lh_ctg_sum;
            let right_ctg_sum: Vec<f64> =
                node.ctg_sum.iter().zip(left_ctg_sum.iter()).map(|(total, left)| total - left).collect();
            let left_pre_bias =
                if n_ctg == 0 { regression_pre_bias(left_sum, left_s_count as f64) } else { gini_pre_bias(&left_ctg_sum) };
            let right_pre_bias =
                if n_ctg == 0 { regression_pre_bias(right_sum, right_s_count as f64) } else { gini_pre_bias(&right_ctg_sum) };

            let left_node = IndexSet {
                split_idx: left_pt,
                pt_id: left_pt,
                depth: node.depth + 1,
                s_count: left_s_count,
                sum: left_sum,
                ctg_sum: left_ctg_sum,
                pre_bias: left_pre_bias,
                min_info: config.min_ratio * outcome.info,
                does_split: false,
                lh_extent: 0,
                lh_s_count: 0,
                left_impl: false,
                samples: left_samples,
            };
            let right_node = IndexSet {
                split_idx: right_pt,
                pt_id: right_pt,
                depth: node.depth + 1,
                s_count: right_s_count,
                sum: right_sum,
                ctg_sum: right_ctg_sum,
                pre_bias: right_pre_bias,
                min_info: config.min_ratio * outcome.info,
                does_split: false,
                lh_extent: 0,
                lh_s_count: 0,
                left_impl: false,
                samples: right_samples,
            };
            let left_is_leaf = left_node.is_leaf_candidate(config.min_node, config.max_depth);
            let right_is_leaf = right_node.is_leaf_candidate(config.min_node, config.max_depth);

            let left_totals = ChildTotals { sum: left_node.sum, s_count: left_node.s_count, ctg_sum: &left_node.ctg_sum };
            let right_totals = ChildTotals { sum: right_node.sum, s_count: right_node.s_count, ctg_sum: &right_node.ctg_sum };

            for cell in cells.iter().filter(|c| c.node_idx == node.split_idx && c.live) {
                let parent_recs = obs_part.slice(cur_buf, cell.pred_idx, cell.obs_range).to_vec();
                let left_count = parent_recs.iter().filter(|r| sides.is_left(r.s_idx)).count();
                let mut left_off = cell.obs_range.start;
                let mut right_off = cell.obs_range.start + left_count;
                let (left_child, right_child) = restage_cell(
                    &mut obs_part,
                    cell.pred_idx,
                    cell,
                    &sides,
                    target_buf,
                    &mut left_off,
                    &mut right_off,
                    &left_totals,
                    &right_totals,
                );

                if !left_is_leaf {
                    next_cells.push(StagedCell {
                        node_idx: left_pt,
                        pred_idx: cell.pred_idx,
                        obs_range: left_child.obs_range,
                        buf_idx: target_buf,
                        run_count: left_child.run_count,
                        implicit_rank: left_child.implicit_rank,
                        obs_implicit: left_child.obs_implicit,
                        implicit_sum: left_child.implicit_sum,
                        implicit_ctg_sum: left_child.implicit_ctg_sum,
                        live: left_child.run_count > 1,
                    });
                }
                if !right_is_leaf {
                    next_cells.push(StagedCell {
                        node_idx: right_pt,
                        pred_idx: cell.pred_idx,
                        obs_range: right_child.obs_range,
                        buf_idx: target_buf,
                        run_count: right_child.run_count,
                        implicit_rank: right_child.implicit_rank,
                        obs_implicit: right_child.obs_implicit,
                        implicit_sum: right_child.implicit_sum,
                        implicit_ctg_sum: right_child.implicit_ctg_sum,
                        live: right_child.run_count > 1,
                    });
                }
            }

            if left_is_leaf {
                finalize_leaf(&left_node, &row_of_sample, response, &mut leaf_stats);
            } else {
                next_nodes.push(left_node);
            }
            if right_is_leaf {
                finalize_leaf(&right_node, &row_of_sample, response, &mut leaf_stats);
            } else {
                next_nodes.push(right_node);
            }
        }

        frontier = Frontier { nodes: next_nodes };
        cells = next_cells;
        cur_buf = target_buf;
        level += 1;
    }

    Some((pretree, leaf_stats, bag))
}

/// Trains a forest of `config.n_tree` trees over `pf`/`response`, distributing
/// trees across `config.tree_block` worker threads (default: available
/// parallelism). Returns `ForestError::EmptyForest` if every tree's bag came
/// up empty.
pub fn train(pf: &PredictorFrame, response: &Response, config: &Config) -> Result<Forest> {
    config.validate(pf.n_row, pf.n_pred())?;
    response.validate(pf.n_row)?;

    let factory = RngFactory::new(config.seed);
    let n_tree = config.n_tree;
    let threads = config
        .tree_block
        .unwrap_or_else(|| thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
        .max(1)
        .min(n_tree.max(1));

    let counter = Mutex::new(0usize);
    let (tx, rx) = mpsc::channel();

    thread::scope(|scope| {
        for _ in 0..threads {
            let tx = tx.clone();
            let counter = &counter;
            let pf = &*pf;
            let response = &*response;
            let config = &*config;
            let factory = &factory;
            scope.spawn(move || loop {
                let ith_tree = {
                    let mut guard = counter.lock().unwrap();
                    if *guard >= n_tree {
                        break;
                    }
                    let t = *guard;
                    *guard += 1;
                    t
                };
                let grown = grow_tree(pf, response, config, factory, ith_tree);
                tx.send(grown).expect("training result channel closed early");
            });
        }
        drop(tx);
    });

    let mut forest = Forest::new(pf.n_pred(), response.n_ctg(), pf.n_row);
    for _ in 0..n_tree {
        match rx.recv() {
            Ok(Some((pretree, leaf_stats, bag))) => {
                let sample_s_count: Vec<u32> = bag.samples.iter().map(|s| s.s_count).collect();
                forest.consume_tree(&pretree, &leaf_stats, &sample_s_count);
                forest.push_in_bag(&bag.in_bag);
            }
            Ok(None) => {}
            Err(_) => break,
        }
    }

    if forest.n_tree() == 0 {
        return Err(ForestError::EmptyForest);
    }
    Ok(forest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::{predict_row, Cell};
    use crate::predictor_frame::RawColumn;

    fn toy_frame() -> PredictorFrame {
        let values = vec![1.0, 1.2, 1.4, 8.0, 8.2, 8.4, 0.9, 8.6];
        PredictorFrame::build(values.len(), &[RawColumn::Numeric(&values)]).unwrap()
    }

    #[test]
    fn train_produces_requested_tree_count_and_sane_predictions() {
        let pf = toy_frame();
        let response = Response::Regression(vec![1.0, 1.0, 1.0, 9.0, 9.0, 9.0, 1.0, 9.0]);
        let mut config = Config::new(pf.n_pred(), pf.n_row, pf.n_row);
        config.replace = true;
        config.min_node = 1;
        config.tree_block = Some(1);
        config.seed = 7;

        let forest = train(&pf, &response, &config).unwrap();
        assert_eq!(forest.n_tree(), config.n_tree);

        let low = predict_row(&forest, &[Cell::Numeric(1.1)]).unwrap();
        let high = predict_row(&forest, &[Cell::Numeric(8.3)]).unwrap();
        assert!(low < high);
    }

    #[test]
    fn invalid_config_is_rejected_before_training() {
        let pf = toy_frame();
        let response = Response::Regression(vec![1.0; 8]);
        let mut config = Config::new(pf.n_pred(), pf.n_row, pf.n_row);
        config.n_samp = 0;
        assert!(train(&pf, &response, &config).is_err());
    }

    #[test]
    fn factor_split_predicts_correctly_under_either_argmax_inversion_outcome() {
        // Two-level factor perfectly separating the response; tried across
        // seeds so both the literal argmax subset and its complement get
        // exercised as the recorded true branch at least once.
        let x = vec![0usize, 0, 0, 1, 1, 1, 0, 1];
        let pf = PredictorFrame::build(x.len(), &[RawColumn::Factor(&x, 2)]).unwrap();
        let response = Response::Regression(vec![1.0, 1.0, 1.0, 9.0, 9.0, 9.0, 1.0, 9.0]);

        for seed in 0..8u64 {
            let mut config = Config::new(pf.n_pred(), pf.n_row, pf.n_row);
            config.replace = true;
            config.min_node = 1;
            config.tree_block = Some(1);
            config.n_tree = 1;
            config.seed = seed;

            let forest = train(&pf, &response, &config).unwrap();
            let low = predict_row(&forest, &[Cell::Factor(0)]).unwrap();
            let high = predict_row(&forest, &[Cell::Factor(1)]).unwrap();
            assert!(low < high, "seed {seed}: expected code 0 below code 1, got {low} >= {high}");
        }
    }

    #[test]
    fn classification_forest_predicts_matching_category() {
        let pf = toy_frame();
        let response = Response::Classification { y: vec![0, 0, 0, 1, 1, 1, 0, 1], n_ctg: 2 };
        let mut config = Config::new(pf.n_pred(), pf.n_row, 5);
        config.replace = true;
        config.min_node = 1;
        config.tree_block = Some(1);
        config.seed = 3;

        let forest = train(&pf, &response, &config).unwrap();
        let pred = predict_row(&forest, &[Cell::Numeric(8.5)]).unwrap();
        assert_eq!(pred, 1.0);
    }
}

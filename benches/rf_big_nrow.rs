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

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use decforest::config::{Config, PredSelect};
use decforest::importance::{permutation_importance, Column};
use decforest::predictor_frame::{PredictorFrame, RawColumn};
use decforest::response::Response;
use decforest::rng::factory::RngFactory;
use decforest::rng::Rng;
use decforest::train::train;

const SEED: u64 = 139547392210478;

fn sample_0_1(rng: &mut Rng, k: usize) -> Vec<usize> {
    (0..k).map(|_| (rng.rand_uni() > 0.5) as usize).collect()
}

fn setup(nrow: usize, ncol: usize) -> (Vec<Column>, Response) {
    let mut rng = Rng::new(SEED, 1);
    let xp1 = sample_0_1(&mut rng, nrow);
    let xp2 = sample_0_1(&mut rng, nrow);

    let y_vec: Vec<u32> = xp1.iter().zip(xp2.iter()).map(|(&a, &b)| (a == 1 && b == 1) as u32).collect();
    let response = Response::Classification { y: y_vec, n_ctg: 2 };

    let mut columns = vec![Column::Factor(xp1, 2), Column::Factor(xp2, 2)];
    for _ in 2..ncol {
        columns.push(Column::Factor(sample_0_1(&mut rng, nrow), 2));
    }

    (columns, response)
}

fn importance_performance_big_nrow(columns: &[Column], response: &Response, n_tree: usize, tree_block: Option<usize>) {
    let raw: Vec<RawColumn> = columns
        .iter()
        .map(|c| match c {
            Column::Numeric(v) => RawColumn::Numeric(v),
            Column::Factor(v, cardinality) => RawColumn::Factor(v, *cardinality),
        })
        .collect();
    let pf = PredictorFrame::build(response.len(), &raw).unwrap();
    let mut config = Config::new(pf.n_pred(), response.len(), n_tree);
    config.replace = true;
    config.pred_select = PredSelect::Fixed(31);
    config.tree_block = tree_block;
    config.seed = SEED;

    let forest = train(&pf, response, &config).unwrap();
    let factory = RngFactory::new(SEED);
    let _ = permutation_importance(&forest, columns, response, &factory);
}

fn bench_tree_block(c: &mut Criterion) {
    let mut group = c.benchmark_group("rf big tree_block");

    group.sample_size(10);

    const NTREE_BASE: usize = 50;
    let benches: Vec<(usize, usize)> = vec![(4000, 10_000), (8000, 10_000), (16_000, 50_000), (32_000, 50_000), (64_000, 100_000)];

    for threads in [None, Some(1), Some(12), Some(24), Some(48), Some(96)] {
        for &bench in &benches {
            let (columns, response) = setup(bench.0, bench.1);
            let thr = threads.unwrap_or(1);
            let thr_name = threads.unwrap_or(0);
            group.bench_with_input(BenchmarkId::new(format!("tree_block {thr_name}"), bench.0), &NTREE_BASE, |b, &ntree| {
                b.iter(|| importance_performance_big_nrow(&columns, &response, ntree * thr, threads))
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_tree_block);
criterion_main!(benches);

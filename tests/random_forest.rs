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

use float_cmp::assert_approx_eq;

use decforest::config::{Config, PredSelect};
use decforest::importance::{permutation_importance, Column};
use decforest::predictor_frame::{PredictorFrame, RawColumn};
use decforest::response::Response;
use decforest::rng::Rng;
use decforest::rng::factory::RngFactory;
use decforest::train::train;

const SEED: u64 = 139547392210478;

fn sample_0_1(rng: &mut Rng, k: usize) -> Vec<usize> {
    (0..k).map(|_| (rng.rand_uni() > 0.5) as usize).collect()
}

fn frame_of(columns: &[Column], n_row: usize) -> PredictorFrame {
    let raw: Vec<RawColumn> = columns
        .iter()
        .map(|c| match c {
            Column::Numeric(v) => RawColumn::Numeric(v),
            Column::Factor(v, cardinality) => RawColumn::Factor(v, *cardinality),
        })
        .collect();
    PredictorFrame::build(n_row, &raw).unwrap()
}

fn importance_of(columns: &[Column], response: &Response, mtry: usize, n_tree: usize, max_depth: Option<usize>, seed: u64) -> Vec<f64> {
    let n_row = response.len();
    let pf = frame_of(columns, n_row);
    let mut config = Config::new(pf.n_pred(), n_row, n_tree);
    config.replace = true;
    config.pred_select = PredSelect::Fixed(mtry);
    config.seed = seed;
    if let Some(depth) = max_depth {
        config.max_depth = depth;
    }
    let forest = train(&pf, response, &config).unwrap();
    let factory = RngFactory::new(seed);
    permutation_importance(&forest, columns, response, &factory)
}

#[test]
fn rf_importance_mtry_1() {
    let mut rng = Rng::new(SEED, 1);
    let xp1 = sample_0_1(&mut rng, 100);
    let xp2 = sample_0_1(&mut rng, 100);
    let xp3 = sample_0_1(&mut rng, 100);

    let y = Response::Classification { y: xp1.iter().map(|&v| v as u32).collect(), n_ctg: 2 };
    let columns = vec![Column::Factor(xp1, 2), Column::Factor(xp2, 2), Column::Factor(xp3, 2)];

    let res = importance_of(&columns, &y, 1, 1000, None, 0);
    assert!(res[0] > 0.30);
    assert_approx_eq!(f64, res[1], 0., epsilon = 0.02);
    assert_approx_eq!(f64, res[2], 0., epsilon = 0.02);
}

#[test]
fn rf_importance_interactions() {
    let mut rng = Rng::new(SEED, 1);
    let xp1 = sample_0_1(&mut rng, 100);
    let xp2 = sample_0_1(&mut rng, 100);

    let y_vec: Vec<u32> = xp1.iter().zip(xp2.iter()).map(|(&a, &b)| (a == 1 && b == 1) as u32).collect();
    let y = Response::Classification { y: y_vec, n_ctg: 2 };

    let mut columns = vec![Column::Factor(xp1, 2), Column::Factor(xp2, 2)];
    for _ in 2..100 {
        columns.push(Column::Factor(sample_0_1(&mut rng, 100), 2));
    }

    let res = importance_of(&columns, &y, 10, 1000, None, 0);
    assert!(res[0] > 0.04);
    assert!(res[1] > 0.04);
    for &r in &res[2..] {
        assert_approx_eq!(f64, r, 0., epsilon = 0.02);
    }
}

fn json_col(v: &serde_json::Value) -> Vec<usize> {
    v.as_array().unwrap().iter().map(|x| x.as_i64().unwrap() as usize - 1).collect()
}

#[test]
fn rf_importance_srx() {
    let data_str = "{\"A\":[2,1,2,1,2,1,2,1,2,1,2,1,2,1,2,1,2,1,2,1,2,1,2,1,2,1,2,1,2,1,2,1],\"B\":[2,2,1,1,2,2,1,1,2,2,1,1,2,2,1,1,2,2,1,1,2,2,1,1,2,2,1,1,2,2,1,1],\"N1\":[2,2,2,2,1,1,1,1,2,2,2,2,1,1,1,1,2,2,2,2,1,1,1,1,2,2,2,2,1,1,1,1],\"N2\":[2,2,2,2,2,2,2,2,1,1,1,1,1,1,1,1,2,2,2,2,2,2,2,2,1,1,1,1,1,1,1,1],\"N3\":[2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1],\"AoB\":[2,2,2,1,2,2,2,1,2,2,2,1,2,2,2,1,2,2,2,1,2,2,2,1,2,2,2,1,2,2,2,1],\"AnB\":[2,1,1,1,2,1,1,1,2,1,1,1,2,1,1,1,2,1,1,1,2,1,1,1,2,1,1,1,2,1,1,1],\"nA\":[1,2,1,2,1,2,1,2,1,2,1,2,1,2,1,2,1,2,1,2,1,2,1,2,1,2,1,2,1,2,1,2],\"Y\":[false,true,true,false,false,true,true,false,false,true,true,false,false,true,true,false,false,true,true,false,false,true,true,false,false,true,true,false,false,true,true,false]}";
    let df_json: serde_json::Value = serde_json::from_str(data_str).unwrap();
    let y_vec: Vec<u32> = df_json["Y"].as_array().unwrap().iter().map(|x| x.as_bool().unwrap() as u32).collect();
    let y = Response::Classification { y: y_vec, n_ctg: 2 };

    let columns = vec![
        Column::Factor(json_col(&df_json["A"]), 2),
        Column::Factor(json_col(&df_json["B"]), 2),
        Column::Factor(json_col(&df_json["N1"]), 2),
        Column::Factor(json_col(&df_json["N2"]), 2),
        Column::Factor(json_col(&df_json["N3"]), 2),
        Column::Factor(json_col(&df_json["AoB"]), 2),
        Column::Factor(json_col(&df_json["AnB"]), 2),
        Column::Factor(json_col(&df_json["nA"]), 2),
    ];

    let res = importance_of(&columns, &y, 3, 1000, None, 0);
    assert_approx_eq!(f64, res[2], 0., epsilon = 0.06);
    assert_approx_eq!(f64, res[3], 0., epsilon = 0.06);
    assert_approx_eq!(f64, res[4], 0., epsilon = 0.06);

    assert!(res[0] > 0.1);
    assert!(res[1] > 0.1);
    assert!(res[5] > 0.1);
    assert!(res[6] > 0.1);
    assert!(res[7] > 0.1);
}

#[test]
fn it_does_not_predict_xor_with_max_tree_depth_1() {
    let mut rng = Rng::new(SEED, 1);
    let xp1 = sample_0_1(&mut rng, 100);
    let xp2 = sample_0_1(&mut rng, 100);
    let xp3 = sample_0_1(&mut rng, 100);

    let y_vec: Vec<u32> = xp1.iter().zip(xp2.iter()).map(|(&a, &b)| ((a == 0) ^ (b == 0)) as u32).collect();
    let y = Response::Classification { y: y_vec, n_ctg: 2 };
    let columns = vec![Column::Factor(xp1, 2), Column::Factor(xp2, 2), Column::Factor(xp3, 2)];

    let res = importance_of(&columns, &y, 1, 1000, Some(1), 0);
    assert!(res[0] < 0.05);

    let res = importance_of(&columns, &y, 1, 1000, Some(2), 0);
    assert!(res[0] > 0.1);
}

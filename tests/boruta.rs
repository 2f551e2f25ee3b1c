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

use decforest::boruta::boruta;
use decforest::importance::Column;
use decforest::response::Response;
use decforest::rng::Rng;

const SEED: u64 = 139547392210478;

fn sample_0_1(rng: &mut Rng, k: usize) -> Vec<usize> {
    (0..k).map(|_| (rng.rand_uni() > 0.5) as usize).collect()
}

#[test]
fn boruta_interactions() {
    let mut rng = Rng::new(SEED, 1);
    let xp1 = sample_0_1(&mut rng, 1000);
    let xp2 = sample_0_1(&mut rng, 1000);

    let y_vec: Vec<u32> = xp1.iter().zip(xp2.iter()).map(|(&a, &b)| (a == 1 && b == 1) as u32).collect();
    let response = Response::Classification { y: y_vec, n_ctg: 2 };

    let mut columns = vec![Column::Factor(xp1, 2), Column::Factor(xp2, 2)];
    for _ in 1..100 {
        columns.push(Column::Factor(sample_0_1(&mut rng, 1000), 2));
    }

    let result = boruta(&columns, &response, 0.01, 100, 500, SEED).unwrap();

    let mut confirmed = result.confirmed.clone();
    confirmed.sort();
    assert_eq!(confirmed, [0, 1]);

    assert!(result.rejected.len() > 95);
}

fn json_col(v: &serde_json::Value) -> Vec<usize> {
    v.as_array().unwrap().iter().map(|x| x.as_i64().unwrap() as usize - 1).collect()
}

#[test]
fn boruta_srx() {
    let data_str = "{\"A\":[2,1,2,1,2,1,2,1,2,1,2,1,2,1,2,1,2,1,2,1,2,1,2,1,2,1,2,1,2,1,2,1],\"B\":[2,2,1,1,2,2,1,1,2,2,1,1,2,2,1,1,2,2,1,1,2,2,1,1,2,2,1,1,2,2,1,1],\"N1\":[2,2,2,2,1,1,1,1,2,2,2,2,1,1,1,1,2,2,2,2,1,1,1,1,2,2,2,2,1,1,1,1],\"N2\":[2,2,2,2,2,2,2,2,1,1,1,1,1,1,1,1,2,2,2,2,2,2,2,2,1,1,1,1,1,1,1,1],\"N3\":[2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1],\"AoB\":[2,2,2,1,2,2,2,1,2,2,2,1,2,2,2,1,2,2,2,1,2,2,2,1,2,2,2,1,2,2,2,1],\"AnB\":[2,1,1,1,2,1,1,1,2,1,1,1,2,1,1,1,2,1,1,1,2,1,1,1,2,1,1,1,2,1,1,1],\"nA\":[1,2,1,2,1,2,1,2,1,2,1,2,1,2,1,2,1,2,1,2,1,2,1,2,1,2,1,2,1,2,1,2],\"Y\":[false,true,true,false,false,true,true,false,false,true,true,false,false,true,true,false,false,true,true,false,false,true,true,false,false,true,true,false,false,true,true,false]}";
    let df_json: serde_json::Value = serde_json::from_str(data_str).unwrap();
    let y_vec: Vec<u32> = df_json["Y"].as_array().unwrap().iter().map(|x| x.as_bool().unwrap() as u32).collect();
    let response = Response::Classification { y: y_vec, n_ctg: 2 };

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

    let result = boruta(&columns, &response, 0.05, 100, 1000, SEED).unwrap();

    let mut confirmed = result.confirmed.clone();
    confirmed.sort();
    assert_eq!(confirmed, [0, 1, 5, 6, 7]);

    let mut rejected = result.rejected.clone();
    rejected.sort();
    assert_eq!(rejected, [2, 3, 4]);
}

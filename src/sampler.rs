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

//! Per-tree bagging. Grounded on `original_source/ArboristCore/dataord.cc`
//! (`DataOrd::SampleRows`/`CountRows`) for the row->sample-count->sIdx
//! bookkeeping, and on the teacher's `Mask::random_mask` for the draw
//! itself (generalized here to support with-replacement bootstrap draws,
//! not just the teacher's fixed-fraction without-replacement mask).

use crate::response::Response;
use crate::rng::Rng;

#[derive(Debug, Clone, Copy)]
pub struct SampleRec {
    /// Weighted response sum `sCount * y[row]`.
    pub val: f64,
    pub s_count: u32,
    pub ctg: Option<u32>,
}

/// A single tree's bag: which rows are in, how many times, and the packed
/// per-sample response records.
#[derive(Debug, Clone)]
pub struct Bag {
    pub in_bag: Vec<bool>,
    pub s_count_row: Vec<u32>,
    /// sIdxRow[row]: index into `samples`, or -1 if OOB.
    pub s_idx_row: Vec<i64>,
    pub samples: Vec<SampleRec>,
    pub bag_count: usize,
}

impl Bag {
    pub fn n_samp(&self) -> u32 {
        self.s_count_row.iter().sum()
    }

    pub fn is_oob(&self, row: usize) -> bool {
        !self.in_bag[row]
    }
}

pub fn draw_bag(n_row: usize, n_samp: usize, replace: bool, response: &Response, rng: &mut Rng) -> Bag {
    let mut s_count_row = vec![0u32; n_row];

    if replace {
        for _ in 0..n_samp {
            let row = rng.next_usize(n_row as u32);
            s_count_row[row] += 1;
        }
    } else {
        let k = n_samp.min(n_row);
        for row in rng.sample_indices(n_row, k) {
            s_count_row[row] += 1;
        }
    }

    let mut in_bag = vec![false; n_row];
    let mut s_idx_row = vec![-1i64; n_row];
    let mut samples = Vec::new();

    let mut idx = 0usize;
    for row in 0..n_row {
        let sc = s_count_row[row];
        if sc > 0 {
            let val = sc as f64 * response.value(row);
            samples.push(SampleRec { val, s_count: sc, ctg: response.category(row) });
            s_idx_row[row] = idx as i64;
            in_bag[row] = true;
            idx += 1;
        }
    }

    Bag { in_bag, s_count_row, s_idx_row, samples, bag_count: idx }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bag_closure_without_replacement() {
        let response = Response::Regression(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let mut rng = Rng::new(7, 1);
        let bag = draw_bag(5, 3, false, &response, &mut rng);
        let n_samp: u32 = bag.s_count_row.iter().sum();
        assert_eq!(n_samp, 3);
        assert_eq!(bag.bag_count, bag.s_count_row.iter().filter(|&&c| c > 0).count());
        for row in 0..5 {
            if bag.in_bag[row] {
                assert!(bag.s_idx_row[row] >= 0);
            } else {
                assert_eq!(bag.s_idx_row[row], -1);
            }
        }
    }

    #[test]
    fn bag_closure_with_replacement_can_repeat() {
        let response = Response::Regression(vec![1.0, 2.0]);
        let mut rng = Rng::new(3, 1);
        let bag = draw_bag(2, 10, true, &response, &mut rng);
        let n_samp: u32 = bag.s_count_row.iter().sum();
        assert_eq!(n_samp, 10);
        assert!(bag.bag_count <= 2);
    }

    #[test]
    fn sample_records_carry_category_for_classification() {
        let response = Response::Classification { y: vec![0, 1, 0, 1], n_ctg: 2 };
        let mut rng = Rng::new(9, 1);
        let bag = draw_bag(4, 4, false, &response, &mut rng);
        assert!(bag.samples.iter().all(|s| s.ctg.is_some()));
    }
}

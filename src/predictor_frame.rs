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

//! Per-column rank/tie table, built once per training session and shared,
//! read-only, by every tree. Grounded on `original_source/ArboristCore/dataord.cc`
//! (`UniqueRank`/`SetSortAndTies`) for the rank/presort contract, generalized
//! to carry both numeric and factor columns in one frame.

use crate::error::{ForestError, Result};

pub type Rank = u32;
pub const NO_RANK: Rank = Rank::MAX;

/// A single predictor column: either numeric (sorted, tie-collapsed) or an
/// unordered factor (rank == code).
#[derive(Debug, Clone)]
pub enum Column {
    Numeric,
    Factor { cardinality: usize },
}

/// Fraction of rows a single rank must cover to be marked implicit (the
/// "dense rank" optimisation, §4.1).
const IMPLICIT_THRESHOLD: f64 = 0.25;

#[derive(Debug, Clone)]
pub struct PredictorColumn {
    pub column: Column,
    /// rank[row] for every row.
    pub rank: Vec<Rank>,
    /// The full per-predictor presort: `r2r[pos] = row`, for `pos` in
    /// `[0, nRow)`, sorted by value with ties adjacent in an
    /// unspecified-but-stable sub-order. This is the array ObsPart's
    /// initial staging (§4.3) walks; it is *not* indexed by rank (multiple
    /// consecutive positions may share a rank under ties).
    pub r2r: Vec<usize>,
    /// Representative value at each distinct rank, for `split_val`.
    rank_value: Vec<f64>,
    /// The rank covering >= IMPLICIT_THRESHOLD of rows, if any.
    pub implicit_rank: Option<Rank>,
}

impl PredictorColumn {
    pub fn distinct_values(&self) -> usize {
        match &self.column {
            Column::Numeric { .. } => self.rank_value.len(),
            Column::Factor { cardinality } => *cardinality,
        }
    }

    /// Numeric split value, interpolating between the two rank boundaries
    /// by `quant` (0.5 reproduces the classic midpoint rule). Panics if
    /// called on a factor column; the frontier never does so because
    /// numeric/factor dispatch happens at registration (§9 design notes).
    pub fn split_val(&self, rank_low: Rank, rank_high: Rank, quant: f64) -> f64 {
        match &self.column {
            Column::Numeric { .. } => {
                let val_low = self.rank_value[rank_low as usize];
                let val_high = self.rank_value[rank_high as usize];
                val_low + quant * (val_high - val_low)
            }
            Column::Factor { .. } => panic!("split_val is not defined for factor columns"),
        }
    }

    pub fn is_factor(&self) -> bool {
        matches!(self.column, Column::Factor { .. })
    }

    fn numeric(raw: &[f64]) -> PredictorColumn {
        let n = raw.len();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| raw[a].partial_cmp(&raw[b]).unwrap());

        let mut rank = vec![0 as Rank; n];
        let mut rank_value = Vec::new();
        let mut counts: Vec<usize> = Vec::new();
        let mut cur_rank: Rank = 0;
        for (i, &row) in order.iter().enumerate() {
            if i > 0 && raw[row] != raw[order[i - 1]] {
                cur_rank += 1;
            }
            if rank_value.len() == cur_rank as usize {
                rank_value.push(raw[row]);
                counts.push(0);
            }
            rank[row] = cur_rank;
            counts[cur_rank as usize] += 1;
        }

        let implicit_rank = Self::find_implicit(&counts, n);

        PredictorColumn {
            column: Column::Numeric,
            rank,
            r2r: order,
            rank_value,
            implicit_rank,
        }
    }

    fn factor(codes: &[usize], cardinality: usize) -> PredictorColumn {
        let n = codes.len();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by_key(|&row| codes[row]);

        let rank: Vec<Rank> = codes.iter().map(|&c| c as Rank).collect();
        let mut counts = vec![0usize; cardinality];
        for &c in codes {
            counts[c] += 1;
        }
        let implicit_rank = Self::find_implicit(&counts, n);
        PredictorColumn {
            column: Column::Factor { cardinality },
            rank,
            r2r: order,
            rank_value: Vec::new(),
            implicit_rank,
        }
    }

    fn find_implicit(counts: &[usize], n: usize) -> Option<Rank> {
        if n == 0 {
            return None;
        }
        counts
            .iter()
            .enumerate()
            .find(|&(_, &c)| c as f64 / n as f64 >= IMPLICIT_THRESHOLD)
            .map(|(r, _)| r as Rank)
    }
}

/// The full per-session rank table: one `PredictorColumn` per predictor.
#[derive(Debug, Clone)]
pub struct PredictorFrame {
    pub n_row: usize,
    pub columns: Vec<PredictorColumn>,
}

pub enum RawColumn<'a> {
    Numeric(&'a [f64]),
    /// 0-based codes plus the column's cardinality.
    Factor(&'a [usize], usize),
}

impl PredictorFrame {
    pub fn build(n_row: usize, raw: &[RawColumn]) -> Result<PredictorFrame> {
        if n_row == 0 {
            return Err(ForestError::ZeroRows);
        }
        if raw.is_empty() {
            return Err(ForestError::ZeroPredictors);
        }
        let columns = raw
            .iter()
            .map(|col| match col {
                RawColumn::Numeric(values) => PredictorColumn::numeric(values),
                RawColumn::Factor(codes, cardinality) => PredictorColumn::factor(codes, *cardinality),
            })
            .collect();
        Ok(PredictorFrame { n_row, columns })
    }

    pub fn n_pred(&self) -> usize {
        self.columns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_ranks_are_dense_and_ties_share_rank() {
        let col = PredictorColumn::numeric(&[3.0, 1.0, 1.0, 2.0]);
        assert_eq!(col.rank[1], col.rank[2]);
        assert_ne!(col.rank[0], col.rank[1]);
        let max_rank = *col.rank.iter().max().unwrap();
        assert_eq!(max_rank as usize, col.distinct_values() - 1);
        for &r in &col.rank {
            assert!((r as usize) < col.distinct_values());
        }
    }

    #[test]
    fn r2r_is_monotone_in_rank_with_ties_adjacent() {
        let col = PredictorColumn::numeric(&[5.0, 2.0, 8.0, 2.0]);
        assert_eq!(col.r2r.len(), 4);
        let ranks: Vec<Rank> = col.r2r.iter().map(|&row| col.rank[row]).collect();
        for w in ranks.windows(2) {
            assert!(w[0] <= w[1]);
        }
        // rows 1 and 3 are tied (both value 2.0) and must be rank-adjacent.
        let pos1 = col.r2r.iter().position(|&r| r == 1).unwrap();
        let pos3 = col.r2r.iter().position(|&r| r == 3).unwrap();
        assert!((pos1 as i64 - pos3 as i64).abs() == 1);
    }

    #[test]
    fn factor_rank_equals_code() {
        let col = PredictorColumn::factor(&[0, 1, 2, 1, 0], 3);
        assert_eq!(col.rank, vec![0, 1, 2, 1, 0]);
        assert!(col.is_factor());
    }

    #[test]
    fn split_val_interpolates_by_quant() {
        let col = PredictorColumn::numeric(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(col.split_val(0, 1, 0.5), 1.5);
        assert_eq!(col.split_val(1, 2, 0.0), 2.0);
        assert_eq!(col.split_val(1, 2, 1.0), 3.0);
    }

    #[test]
    fn build_rejects_zero_rows_or_predictors() {
        assert!(PredictorFrame::build(0, &[RawColumn::Numeric(&[])]).is_err());
        assert!(PredictorFrame::build(3, &[]).is_err());
    }

    #[test]
    fn dense_rank_is_marked_implicit() {
        // 8 of 10 rows share value 0.0 -> should be flagged implicit.
        let mut values = vec![0.0; 8];
        values.push(1.0);
        values.push(2.0);
        let col = PredictorColumn::numeric(&values);
        assert!(col.implicit_rank.is_some());
    }
}

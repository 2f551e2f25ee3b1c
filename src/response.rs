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

//! The response vector's variant capability, replacing the source's virtual
//! dispatch on response type (§9 design notes) with a plain enum the data
//! model branches on.

use crate::error::{ForestError, Result};

#[derive(Debug, Clone)]
pub enum Response {
    Regression(Vec<f64>),
    Classification { y: Vec<u32>, n_ctg: usize },
}

impl Response {
    pub fn len(&self) -> usize {
        match self {
            Response::Regression(y) => y.len(),
            Response::Classification { y, .. } => y.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn validate(&self, n_row: usize) -> Result<()> {
        if self.len() != n_row {
            return Err(ForestError::ResponseLengthMismatch { y_len: self.len(), n_row });
        }
        Ok(())
    }

    pub fn is_classification(&self) -> bool {
        matches!(self, Response::Classification { .. })
    }

    pub fn n_ctg(&self) -> usize {
        match self {
            Response::Regression(_) => 0,
            Response::Classification { n_ctg, .. } => *n_ctg,
        }
    }

    /// The numeric value contributing to weighted sums: the raw response for
    /// regression, `1.0` for classification (category membership is tracked
    /// separately via `category`).
    #[inline]
    pub fn value(&self, row: usize) -> f64 {
        match self {
            Response::Regression(y) => y[row],
            Response::Classification { .. } => 1.0,
        }
    }

    #[inline]
    pub fn category(&self, row: usize) -> Option<u32> {
        match self {
            Response::Regression(_) => None,
            Response::Classification { y, .. } => Some(y[row]),
        }
    }
}

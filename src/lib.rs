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

//! Rank-based CART forest training and prediction: presort once per
//! session (`predictor_frame`), bag and partition per tree (`sampler`,
//! `obs_part`, `frontier`, `interlevel`), evaluate and accept splits level
//! by level (`gini`, `split`), flatten into a packed immutable forest
//! (`forest`), then predict (`predict`), pool leaf samples into quantiles
//! (`quantile`), and score predictors by permutation importance (`importance`)
//! or Boruta shadow selection (`boruta`).

pub mod bheap;
pub mod binom;
pub mod bitset;
pub mod boruta;
pub mod config;
pub mod error;
pub mod forest;
pub mod frontier;
pub mod gini;
pub mod importance;
pub mod interlevel;
pub mod obs_part;
pub mod predict;
pub mod predictor_frame;
pub mod pretree;
pub mod quantile;
pub mod response;
pub mod rng;
pub mod sampler;
pub mod split;
pub mod train;

pub use config::{Config, PredSelect};
pub use error::{ForestError, Result};
pub use forest::Forest;
pub use predictor_frame::{PredictorFrame, RawColumn};
pub use response::Response;
pub use train::train;

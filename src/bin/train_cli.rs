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

//! Dev CLI for exercising training end-to-end against a CSV: the last
//! column is the response, every other column is a predictor. Not part of
//! the core; glue for manual testing during development (§6).

use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Parser;
use decforest::config::{Config, PredSelect};
use decforest::predictor_frame::{PredictorFrame, RawColumn};
use decforest::response::Response;
use decforest::train::train;

#[derive(Parser, Debug)]
#[command(name = "train_cli", about = "Train a decision forest from a CSV file")]
struct Args {
    /// Path to a CSV file; the last column is the response, the rest are predictors.
    csv: PathBuf,

    /// Comma-separated 0-based indices (among predictor columns) that are factors.
    #[arg(long, value_delimiter = ',')]
    factor_cols: Vec<usize>,

    /// Train a classification forest instead of regression.
    #[arg(long)]
    classify: bool,

    #[arg(long, default_value_t = 500)]
    n_tree: usize,

    #[arg(long)]
    n_samp: Option<usize>,

    #[arg(long, default_value_t = 1)]
    min_node: usize,

    #[arg(long)]
    max_depth: Option<usize>,

    #[arg(long)]
    mtry: Option<usize>,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Write the trained forest as JSON to this path.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn parse_csv(path: &PathBuf) -> Result<(Vec<Vec<f64>>, Vec<f64>), Box<dyn Error>> {
    let text = fs::read_to_string(path)?;
    let mut rows: Vec<Vec<f64>> = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Result<Vec<f64>, _> = line.split(',').map(|f| f.trim().parse::<f64>()).collect();
        rows.push(fields?);
    }
    let n_col = rows.first().map(|r| r.len()).unwrap_or(0);
    let mut columns = vec![Vec::with_capacity(rows.len()); n_col];
    for row in &rows {
        for (c, &v) in row.iter().enumerate() {
            columns[c].push(v);
        }
    }
    let response = columns.pop().ok_or("CSV has no columns")?;
    Ok((columns, response))
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    let (raw_columns, response_col) = parse_csv(&args.csv)?;
    let n_row = response_col.len();
    let n_pred = raw_columns.len();

    // factor codes (stored as integral f64s in the CSV) are materialised up
    // front so `raw` below can borrow from them alongside the numeric columns.
    let factor_codes: Vec<Option<(Vec<usize>, usize)>> = raw_columns
        .iter()
        .enumerate()
        .map(|(i, col)| {
            if !args.factor_cols.contains(&i) {
                return None;
            }
            let codes: Vec<usize> = col.iter().map(|&v| v as usize).collect();
            let cardinality = codes.iter().max().map(|&m| m + 1).unwrap_or(0);
            Some((codes, cardinality))
        })
        .collect();

    let raw: Vec<RawColumn> = raw_columns
        .iter()
        .zip(factor_codes.iter())
        .map(|(values, factor)| match factor {
            Some((codes, cardinality)) => RawColumn::Factor(codes, *cardinality),
            None => RawColumn::Numeric(values),
        })
        .collect();

    let pf = PredictorFrame::build(n_row, &raw)?;

    let response = if args.classify {
        let n_ctg = response_col.iter().map(|&v| v as usize).max().map(|m| m + 1).unwrap_or(0);
        Response::Classification { y: response_col.iter().map(|&v| v as u32).collect(), n_ctg }
    } else {
        Response::Regression(response_col)
    };

    let mut config = Config::new(n_pred, args.n_samp.unwrap_or(n_row), args.n_tree);
    config.min_node = args.min_node;
    if let Some(depth) = args.max_depth {
        config.max_depth = depth;
    }
    if let Some(mtry) = args.mtry {
        config.pred_select = PredSelect::Fixed(mtry);
    }
    config.seed = args.seed;

    let forest = train(&pf, &response, &config)?;
    log::info!("trained {} trees over {} rows, {} predictors", forest.n_tree(), n_row, n_pred);

    if let Some(out) = &args.out {
        let json = serde_json::to_string(&forest)?;
        fs::write(out, json)?;
        log::info!("wrote forest to {}", out.display());
    }

    Ok(())
}

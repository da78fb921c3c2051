pub mod holdings;
pub mod report;
pub mod validate;

use crate::fifo::{calculate_gains, GainsReport};
use crate::fy::FinancialYear;
use crate::splits::SplitTable;
use crate::trades::{self, FeeColumn, TradeColumns};
use anyhow::Context;
use clap::Args;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

/// Inputs shared by every command
#[derive(Args, Debug)]
pub struct EngineArgs {
    /// Trade CSV file
    #[arg(default_value = "Confirmation.csv")]
    input: PathBuf,

    /// Financial year end year (e.g. 2023 for FY2022-23; defaults to current year)
    #[arg(short = 'y', long)]
    fy_end: Option<i32>,

    /// CSV file with stock splits (format: Date,Ticker,Ratio)
    #[arg(short, long, default_value = "stock_splits.csv")]
    splits: PathBuf,

    /// Ignore stock splits entirely
    #[arg(long)]
    no_splits: bool,

    /// Fee columns summed into each sale's fees
    #[arg(long, value_enum, value_delimiter = ',', default_values_t = FeeColumn::ALL)]
    fees: Vec<FeeColumn>,
}

impl EngineArgs {
    pub fn financial_year(&self) -> anyhow::Result<FinancialYear> {
        let fy = match self.fy_end {
            Some(year) => FinancialYear::new(year)?,
            None => FinancialYear::current()?,
        };
        Ok(fy)
    }

    /// Read trades and splits, then match the financial year's sales.
    /// Any problem with the trade file is fatal.
    pub fn run(&self) -> anyhow::Result<GainsReport> {
        let fy = self.financial_year()?;

        let file = File::open(&self.input)
            .with_context(|| format!("cannot open trade file {}", self.input.display()))?;
        let columns = TradeColumns::with_fees(self.fees.clone());
        let trades = trades::read_csv(BufReader::new(file), &columns)
            .with_context(|| format!("cannot read trades from {}", self.input.display()))?;

        let splits = if self.no_splits {
            SplitTable::default()
        } else {
            SplitTable::load(Some(&self.splits))
        };
        if splits.is_empty() {
            log::debug!("No stock splits known, purchases used as recorded");
        }

        let report = calculate_gains(&trades, &splits, fy)
            .with_context(|| format!("cannot read trades from {}", self.input.display()))?;
        Ok(report)
    }
}

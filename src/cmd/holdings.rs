//! Holdings command - lots still open after the financial year's sales are matched

use super::EngineArgs;
use crate::fifo::Lot;
use crate::utils::{format_money, format_quantity, write_csv};
use clap::Args;
use serde::Serialize;
use std::io;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct HoldingsCommand {
    #[command(flatten)]
    engine: EngineArgs,

    /// Filter by ticker (e.g., BHP, CBA)
    #[arg(short, long)]
    ticker: Option<String>,

    /// Output as JSON instead of formatted table
    #[arg(long, conflicts_with = "csv")]
    json: bool,

    /// Output as CSV instead of formatted table
    #[arg(long)]
    csv: bool,
}

#[derive(Debug, Clone, Tabled, Serialize)]
struct LotRow {
    #[tabled(rename = "Ticker")]
    #[serde(rename = "Ticker")]
    ticker: String,
    #[tabled(rename = "Buy Date")]
    #[serde(rename = "Buy Date")]
    buy_date: String,
    #[tabled(rename = "Quantity")]
    #[serde(rename = "Quantity")]
    quantity: String,
    #[tabled(rename = "Buy Price")]
    #[serde(rename = "Buy Price")]
    buy_price: String,
    #[tabled(rename = "Cost Base")]
    #[serde(rename = "Cost Base")]
    cost_base: String,
}

impl HoldingsCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let report = self.engine.run()?;
        let lots: Vec<&Lot> = report
            .open_lots
            .open_lots()
            .filter(|lot| {
                self.ticker
                    .as_deref()
                    .is_none_or(|t| lot.ticker.eq_ignore_ascii_case(t))
            })
            .collect();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&lots)?);
            return Ok(());
        }

        let rows: Vec<LotRow> = lots
            .iter()
            .map(|lot| LotRow {
                ticker: lot.ticker.clone(),
                buy_date: lot.date.format("%Y-%m-%d").to_string(),
                quantity: format_quantity(lot.quantity),
                buy_price: lot.price.normalize().to_string(),
                cost_base: lot
                    .price
                    .checked_mul(lot.quantity)
                    .map(format_money)
                    .unwrap_or_else(|| "out of range".to_string()),
            })
            .collect();

        if self.csv {
            return write_csv(rows, io::stdout());
        }

        if rows.is_empty() {
            println!(
                "No open lots after financial year {}",
                report.financial_year
            );
            return Ok(());
        }

        println!();
        println!("OPEN LOTS (after FY {})", report.financial_year);
        println!();
        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
        Ok(())
    }
}

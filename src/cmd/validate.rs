//! Validate command - list sales that could not be matched against purchases

use super::EngineArgs;
use crate::fifo::{RejectedSale, Rejection};
use crate::utils::{format_money, format_quantity};
use clap::Args;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct ValidateCommand {
    #[command(flatten)]
    engine: EngineArgs,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

/// A validation issue for output
#[derive(Debug, Serialize)]
struct ValidationIssue<'a> {
    date: String,
    ticker: &'a str,
    quantity: String,
    price: String,
    fees: String,
    reason: &'a Rejection,
    message: String,
}

/// JSON output structure
#[derive(Debug, Serialize)]
struct ValidationOutput<'a> {
    financial_year: String,
    issue_count: usize,
    issues: Vec<ValidationIssue<'a>>,
}

impl ValidateCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let report = self.engine.run()?;
        let issues: Vec<ValidationIssue> = report.rejected.iter().map(issue).collect();

        if self.json {
            let output = ValidationOutput {
                financial_year: report.financial_year.display(),
                issue_count: issues.len(),
                issues,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
            if output.issue_count > 0 {
                std::process::exit(1);
            }
            return Ok(());
        }

        if issues.is_empty() {
            println!(
                "No issues found: all {} sales in FY {} matched",
                report.sales_processed, report.financial_year
            );
            return Ok(());
        }

        println!(
            "Found {} unmatched sales in FY {}:",
            issues.len(),
            report.financial_year
        );
        println!();
        for issue in &issues {
            println!(
                "  {} {} x{} @ {} (fees {})",
                issue.date, issue.ticker, issue.quantity, issue.price, issue.fees
            );
            println!("    {}", issue.message);
        }

        // Exit with code 1 if issues found
        std::process::exit(1);
    }
}

fn issue(rejected: &RejectedSale) -> ValidationIssue<'_> {
    let sale = &rejected.sale;
    ValidationIssue {
        date: sale.date.format("%Y-%m-%d").to_string(),
        ticker: &sale.ticker,
        quantity: format_quantity(sale.quantity),
        price: sale.price.normalize().to_string(),
        fees: format_money(sale.fees),
        reason: &rejected.reason,
        message: rejected.reason.to_string(),
    }
}

//! Report command - per-sale gains CSV and headline totals

use super::EngineArgs;
use crate::fifo::GainsReport;
use crate::utils::format_money;
use anyhow::Context;
use clap::Args;
use serde::Serialize;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ReportCommand {
    #[command(flatten)]
    engine: EngineArgs,

    /// Output CSV for per-sale gains ("-" for stdout, which moves the
    /// summary to stderr)
    #[arg(short, long, default_value = "gains.csv")]
    output: PathBuf,

    /// Print the summary as JSON instead of text
    #[arg(long)]
    json: bool,
}

/// Summary data for JSON output
#[derive(Debug, Serialize)]
struct SummaryData {
    financial_year: String,
    fy_end: i32,
    sales_processed: usize,
    sales_matched: usize,
    sales_rejected: usize,
    gain_records: usize,
    total_gain: String,
    total_fees: String,
    net_gain: String,
    output: String,
}

impl ReportCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let report = self.engine.run()?;

        // stdout carries only the csv when it is the output
        let mut summary: Box<dyn Write> = if self.output.as_os_str() == "-" {
            report.write_csv(io::stdout())?;
            Box::new(io::stderr())
        } else {
            let file = File::create(&self.output)
                .with_context(|| format!("cannot create {}", self.output.display()))?;
            report.write_csv(file)?;
            Box::new(io::stdout())
        };

        if self.json {
            self.print_json(&report, &mut summary)
        } else {
            self.print_summary(&report, &mut summary)
        }
    }

    fn print_summary(&self, report: &GainsReport, out: &mut dyn Write) -> anyhow::Result<()> {
        writeln!(out, "Total capital gain: {}", format_money(report.total_gain))?;
        writeln!(
            out,
            "Total net capital gain (minus fees): {}",
            format_money(report.net_gain())
        )?;
        if !report.rejected.is_empty() {
            writeln!(
                out,
                "Skipped {} of {} sales, see `validate` for details",
                report.rejected.len(),
                report.sales_processed
            )?;
        }
        writeln!(out, "Saved capital gains to {}", self.output.display())?;
        Ok(())
    }

    fn print_json(&self, report: &GainsReport, out: &mut dyn Write) -> anyhow::Result<()> {
        let summary = SummaryData {
            financial_year: report.financial_year.display(),
            fy_end: report.financial_year.end_year(),
            sales_processed: report.sales_processed,
            sales_matched: report.sales_matched(),
            sales_rejected: report.rejected.len(),
            gain_records: report.gains.len(),
            total_gain: format!("{:.2}", report.total_gain),
            total_fees: format!("{:.2}", report.total_fees),
            net_gain: format!("{:.2}", report.net_gain()),
            output: self.output.display().to_string(),
        };

        writeln!(out, "{}", serde_json::to_string_pretty(&summary)?)?;
        Ok(())
    }
}

use super::lots::LotQueues;
use super::matcher::RejectedSale;
use crate::fy::FinancialYear;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

/// Gain on one fragment of a sale matched against one purchase lot
#[derive(Debug, Clone, PartialEq)]
pub struct GainRecord {
    pub ticker: String,
    pub sell_date: NaiveDate,
    pub sell_price: Decimal,
    pub buy_date: NaiveDate,
    pub buy_price: Decimal,
    pub quantity: Decimal,
    pub gain: Decimal,
}

impl GainRecord {
    /// `None` if the gain cannot be represented
    pub fn new(
        ticker: String,
        sell_date: NaiveDate,
        sell_price: Decimal,
        buy_date: NaiveDate,
        buy_price: Decimal,
        quantity: Decimal,
    ) -> Option<Self> {
        let gain = sell_price.checked_sub(buy_price)?.checked_mul(quantity)?;
        Some(GainRecord {
            ticker,
            sell_date,
            sell_price,
            buy_date,
            buy_price,
            quantity,
            gain,
        })
    }
}

/// CSV record for gain output
#[derive(Debug, Serialize)]
pub struct GainCsvRecord {
    #[serde(rename = "Ticker")]
    pub ticker: String,
    #[serde(rename = "Sell Date")]
    pub sell_date: String,
    #[serde(rename = "Sell Price")]
    pub sell_price: String,
    #[serde(rename = "Buy Date")]
    pub buy_date: String,
    #[serde(rename = "Buy Price")]
    pub buy_price: String,
    #[serde(rename = "Quantity")]
    pub quantity: String,
    #[serde(rename = "Gain")]
    pub gain: String,
}

const CSV_HEADERS: [&str; 7] = [
    "Ticker",
    "Sell Date",
    "Sell Price",
    "Buy Date",
    "Buy Price",
    "Quantity",
    "Gain",
];

impl From<&GainRecord> for GainCsvRecord {
    fn from(g: &GainRecord) -> Self {
        GainCsvRecord {
            ticker: g.ticker.clone(),
            sell_date: g.sell_date.format("%Y-%m-%d").to_string(),
            sell_price: g.sell_price.normalize().to_string(),
            buy_date: g.buy_date.format("%Y-%m-%d").to_string(),
            buy_price: g.buy_price.normalize().to_string(),
            quantity: g.quantity.normalize().to_string(),
            gain: g.gain.normalize().to_string(),
        }
    }
}

/// Outcome of matching a financial year's sales
#[derive(Debug)]
pub struct GainsReport {
    pub financial_year: FinancialYear,
    /// Gain records in sale order, then FIFO order within a sale
    pub gains: Vec<GainRecord>,
    /// Sales skipped for lack of inventory
    pub rejected: Vec<RejectedSale>,
    /// Number of sales in the window, matched or rejected
    pub sales_processed: usize,
    /// Sum of all gain records
    pub total_gain: Decimal,
    /// Fees of every processed sale, matched or rejected
    pub total_fees: Decimal,
    /// Lots left open after matching
    pub open_lots: LotQueues,
}

impl GainsReport {
    /// Total gain less all sale fees. Sales that would take this out of
    /// range are rejected during matching, so it never saturates there.
    pub fn net_gain(&self) -> Decimal {
        self.total_gain.saturating_sub(self.total_fees)
    }

    pub fn sales_matched(&self) -> usize {
        self.sales_processed - self.rejected.len()
    }

    /// Write gain records to CSV. The header row is written even when there
    /// are no records.
    pub fn write_csv<W: Write>(&self, writer: W) -> anyhow::Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        wtr.write_record(CSV_HEADERS)?;
        for gain in &self.gains {
            let record: GainCsvRecord = gain.into();
            wtr.serialize(record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

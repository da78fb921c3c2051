use crate::utils::{parse_date, parse_decimal};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum SplitError {
    #[error("cannot open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed split csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: invalid date '{value}'")]
    InvalidDate { row: usize, value: String },
    #[error("row {row}: ratio must be a positive number, got '{value}'")]
    InvalidRatio { row: usize, value: String },
}

/// A share split: every unit held before `date` becomes `ratio` units
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub ticker: String,
    pub date: NaiveDate,
    pub ratio: Decimal,
}

#[derive(Debug, Deserialize)]
struct SplitRecord {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Ticker")]
    ticker: String,
    #[serde(rename = "Ratio")]
    ratio: String,
}

/// Declared splits keyed by ticker, each list in ascending effective date
#[derive(Debug, Clone, Default)]
pub struct SplitTable {
    splits: HashMap<String, Vec<Split>>,
}

impl SplitTable {
    pub fn new(splits: impl IntoIterator<Item = Split>) -> Self {
        let mut table: HashMap<String, Vec<Split>> = HashMap::new();
        for split in splits {
            table.entry(split.ticker.clone()).or_default().push(split);
        }
        for list in table.values_mut() {
            list.sort_by_key(|s| s.date);
        }
        SplitTable { splits: table }
    }

    /// Read splits from a csv with `Date,Ticker,Ratio` columns
    pub fn read_csv<R: Read>(reader: R) -> Result<Self, SplitError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut splits = Vec::new();
        for (i, record) in rdr.deserialize::<SplitRecord>().enumerate() {
            let record = record?;
            let row = i + 2;
            let date = parse_date(&record.date).ok_or_else(|| SplitError::InvalidDate {
                row,
                value: record.date.clone(),
            })?;
            let ratio = parse_decimal(&record.ratio)
                .filter(|r| *r > Decimal::ZERO)
                .ok_or_else(|| SplitError::InvalidRatio {
                    row,
                    value: record.ratio.clone(),
                })?;
            splits.push(Split {
                ticker: record.ticker,
                date,
                ratio,
            });
        }
        Ok(Self::new(splits))
    }

    /// Load the split source, degrading to an empty table if it is missing or malformed
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            log::debug!("No split source configured");
            return Self::default();
        };
        let table = File::open(path)
            .map_err(|source| SplitError::Open {
                path: path.display().to_string(),
                source,
            })
            .and_then(Self::read_csv);
        match table {
            Ok(table) => {
                log::info!(
                    "Loaded {} splits for {} tickers from {}",
                    table.len(),
                    table.splits.len(),
                    path.display()
                );
                table
            }
            Err(e) => {
                log::warn!("Error reading stock splits, assuming no splits: {}", e);
                Self::default()
            }
        }
    }

    pub fn for_ticker(&self, ticker: &str) -> &[Split] {
        self.splits.get(ticker).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.splits.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Restate a purchase in today's units.
    ///
    /// Every split of the ticker effective strictly after the purchase date is
    /// applied in date order: quantity is multiplied and price divided by the
    /// ratio. Splits on or before the purchase date are already reflected.
    /// `None` if the restated quantity or price cannot be represented.
    pub fn adjust(
        &self,
        ticker: &str,
        purchase_date: NaiveDate,
        quantity: Decimal,
        price: Decimal,
    ) -> Option<(Decimal, Decimal)> {
        self.for_ticker(ticker)
            .iter()
            .filter(|split| purchase_date < split.date)
            .try_fold((quantity, price), |(qty, price), split| {
                log::debug!(
                    "Applying {} split of {} on {} to purchase on {}",
                    split.ratio,
                    ticker,
                    split.date,
                    purchase_date
                );
                Some((qty.checked_mul(split.ratio)?, price.checked_div(split.ratio)?))
            })
    }
}

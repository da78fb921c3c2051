use crate::utils::{parse_date, parse_decimal};
use chrono::NaiveDate;
use clap::ValueEnum;
use rust_decimal::Decimal;
use std::io::Read;

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("failed to read trade csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("trade csv is missing required column '{0}'")]
    MissingColumn(String),
    #[error("row {row}: invalid {column} '{value}'")]
    InvalidField {
        row: usize,
        column: String,
        value: String,
    },
    #[error("row {row}: {column} must not be negative, got {value}")]
    NegativeField {
        row: usize,
        column: String,
        value: Decimal,
    },
    #[error("row {row}: {column} is out of range")]
    OutOfRange { row: usize, column: String },
}

/// Side of a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    Buy,
    Sell,
}

impl OrderType {
    /// Case-insensitive parse, `None` for anything other than BUY or SELL
    pub fn parse(s: &str) -> Option<OrderType> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Some(OrderType::Buy),
            "SELL" => Some(OrderType::Sell),
            _ => None,
        }
    }
}

/// Broker charge columns that may contribute to a trade's fees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum FeeColumn {
    Brokerage,
    Gst,
    StampDuty,
    ApplicationFee,
    OtherCharge,
    Fee,
}

impl FeeColumn {
    pub const ALL: [FeeColumn; 6] = [
        FeeColumn::Brokerage,
        FeeColumn::Gst,
        FeeColumn::StampDuty,
        FeeColumn::ApplicationFee,
        FeeColumn::OtherCharge,
        FeeColumn::Fee,
    ];

    /// Header name in broker confirmation exports
    pub fn header(&self) -> &'static str {
        match self {
            FeeColumn::Brokerage => "Brokerage",
            FeeColumn::Gst => "GST",
            FeeColumn::StampDuty => "Stampduty",
            FeeColumn::ApplicationFee => "Application Fee",
            FeeColumn::OtherCharge => "OtherCharge",
            FeeColumn::Fee => "Fee",
        }
    }
}

/// Header names of the trade csv
#[derive(Debug, Clone)]
pub struct TradeColumns {
    pub ticker: String,
    pub order_type: String,
    pub date: String,
    pub price: String,
    pub quantity: String,
    pub fees: Vec<FeeColumn>,
}

impl Default for TradeColumns {
    fn default() -> Self {
        TradeColumns {
            ticker: "AsxCode".to_string(),
            order_type: "Order Type".to_string(),
            date: "Settlement Date".to_string(),
            price: "Price".to_string(),
            quantity: "Quantity".to_string(),
            fees: FeeColumn::ALL.to_vec(),
        }
    }
}

impl TradeColumns {
    pub fn with_fees(fees: Vec<FeeColumn>) -> Self {
        TradeColumns {
            fees,
            ..Default::default()
        }
    }
}

/// A buy or sell of a security
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    /// Row in the source csv, the header being row 1
    pub row: usize,
    pub ticker: String,
    pub order_type: OrderType,
    pub date: NaiveDate,
    pub price: Decimal,
    pub quantity: Decimal,
    /// Sum of the configured fee columns
    pub fees: Decimal,
}

impl Trade {
    pub fn is_buy(&self) -> bool {
        self.order_type == OrderType::Buy
    }

    pub fn is_sell(&self) -> bool {
        self.order_type == OrderType::Sell
    }
}

struct ColumnIndex {
    ticker: usize,
    order_type: usize,
    date: usize,
    price: usize,
    quantity: usize,
    fees: Vec<(FeeColumn, usize)>,
}

impl ColumnIndex {
    fn resolve(headers: &csv::StringRecord, columns: &TradeColumns) -> Result<Self, InputError> {
        let find = |name: &str| headers.iter().position(|h| h == name);
        let required = |name: &str| find(name).ok_or_else(|| InputError::MissingColumn(name.to_string()));

        let mut fees = Vec::new();
        for fee in &columns.fees {
            match find(fee.header()) {
                Some(idx) => fees.push((*fee, idx)),
                None => log::debug!("Fee column '{}' not present, counted as zero", fee.header()),
            }
        }

        Ok(ColumnIndex {
            ticker: required(&columns.ticker)?,
            order_type: required(&columns.order_type)?,
            date: required(&columns.date)?,
            price: required(&columns.price)?,
            quantity: required(&columns.quantity)?,
            fees,
        })
    }
}

/// Read BUY and SELL trades from a broker csv export, in file order.
///
/// Rows with any other order type are skipped. Any unparsable or negative
/// value on a BUY/SELL row is an error for the whole file.
pub fn read_csv<R: Read>(reader: R, columns: &TradeColumns) -> Result<Vec<Trade>, InputError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();
    let index = ColumnIndex::resolve(&headers, columns)?;

    let mut trades = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        // header is row 1
        let row = i + 2;
        let field = |idx: usize| record.get(idx).unwrap_or("");

        let Some(order_type) = OrderType::parse(field(index.order_type)) else {
            log::debug!(
                "Skipping row {} with order type '{}'",
                row,
                field(index.order_type)
            );
            continue;
        };

        let invalid = |column: &str, value: &str| InputError::InvalidField {
            row,
            column: column.to_string(),
            value: value.to_string(),
        };
        let number = |column: &str, idx: usize| -> Result<Decimal, InputError> {
            let value = field(idx);
            let parsed = parse_decimal(value).ok_or_else(|| invalid(column, value))?;
            if parsed.is_sign_negative() && !parsed.is_zero() {
                return Err(InputError::NegativeField {
                    row,
                    column: column.to_string(),
                    value: parsed,
                });
            }
            Ok(parsed)
        };

        let ticker = field(index.ticker);
        if ticker.is_empty() {
            return Err(invalid(&columns.ticker, ticker));
        }
        let date_value = field(index.date);
        let date = parse_date(date_value).ok_or_else(|| invalid(&columns.date, date_value))?;
        let price = number(&columns.price, index.price)?;
        let quantity = number(&columns.quantity, index.quantity)?;

        let mut fees = Decimal::ZERO;
        for (fee, idx) in &index.fees {
            if field(*idx).is_empty() {
                continue;
            }
            fees = fees
                .checked_add(number(fee.header(), *idx)?)
                .ok_or_else(|| InputError::OutOfRange {
                    row,
                    column: "total fees".to_string(),
                })?;
        }

        trades.push(Trade {
            row,
            ticker: ticker.to_string(),
            order_type,
            date,
            price,
            quantity,
            fees,
        });
    }

    log::debug!("Read {} trades", trades.len());
    Ok(trades)
}

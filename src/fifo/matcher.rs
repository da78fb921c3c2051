use super::gains::{GainRecord, GainsReport};
use super::lots::LotQueues;
use crate::fy::FinancialYear;
use crate::splits::SplitTable;
use crate::trades::{InputError, Trade};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

/// Why a sale could not be matched. The sale produces no gain records and
/// leaves the lot queues untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "type")]
pub enum Rejection {
    #[error("No FIFO buy data available for {ticker} before sell on {date}")]
    NoLots { ticker: String, date: NaiveDate },
    #[error("Trying to sell {requested} units of {ticker}, but have only bought {available}")]
    InsufficientInventory {
        ticker: String,
        available: Decimal,
        requested: Decimal,
    },
    #[error("Gain or fees of {ticker} sale on {date} are too large to total")]
    OutOfRange { ticker: String, date: NaiveDate },
}

impl Rejection {
    fn out_of_range(sale: &Trade) -> Self {
        Rejection::OutOfRange {
            ticker: sale.ticker.clone(),
            date: sale.date,
        }
    }
}

/// A sale that was skipped, with the reason
#[derive(Debug, Clone)]
pub struct RejectedSale {
    pub sale: Trade,
    pub reason: Rejection,
}

/// Matches sales against the lot queues, consuming lots in FIFO order.
///
/// Keeps running totals of gains and fees. Both totals, and their
/// difference, always stay representable.
pub struct SaleMatcher {
    queues: LotQueues,
    total_gain: Decimal,
    total_fees: Decimal,
}

impl SaleMatcher {
    pub fn new(queues: LotQueues) -> Self {
        SaleMatcher {
            queues,
            total_gain: Decimal::ZERO,
            total_fees: Decimal::ZERO,
        }
    }

    #[cfg(test)]
    pub fn queues(&self) -> &LotQueues {
        &self.queues
    }

    /// Add a sale's fees to the running total. Nothing is added if the
    /// totals would go out of range.
    pub fn add_fees(&mut self, sale: &Trade) -> Result<(), Rejection> {
        let total_fees = self
            .total_fees
            .checked_add(sale.fees)
            .filter(|fees| self.total_gain.checked_sub(*fees).is_some())
            .ok_or_else(|| Rejection::out_of_range(sale))?;
        self.total_fees = total_fees;
        Ok(())
    }

    /// Match one sale.
    ///
    /// Inventory is checked against lots bought strictly before the sale
    /// date, rescanning the queue each time. Lots are then drawn from the
    /// front of the queue without a date filter. Gains are worked out before
    /// anything is consumed.
    pub fn match_sale(&mut self, sale: &Trade) -> Result<Vec<GainRecord>, Rejection> {
        let queue = match self.queues.get_mut(&sale.ticker) {
            Some(queue) if !queue.is_empty() => queue,
            _ => {
                return Err(Rejection::NoLots {
                    ticker: sale.ticker.clone(),
                    date: sale.date,
                })
            }
        };

        let available = queue.available_before(sale.date);
        if sale.quantity > available {
            return Err(Rejection::InsufficientInventory {
                ticker: sale.ticker.clone(),
                available,
                requested: sale.quantity,
            });
        }

        let gains: Option<Vec<GainRecord>> = queue
            .plan(sale.quantity)
            .into_iter()
            .map(|draw| {
                GainRecord::new(
                    sale.ticker.clone(),
                    sale.date,
                    sale.price,
                    draw.date,
                    draw.price,
                    draw.quantity,
                )
            })
            .collect();
        let total_gain = gains
            .as_ref()
            .and_then(|gains| {
                gains
                    .iter()
                    .try_fold(self.total_gain, |total, g| total.checked_add(g.gain))
            })
            .filter(|total| total.checked_sub(self.total_fees).is_some());
        let (Some(gains), Some(total_gain)) = (gains, total_gain) else {
            return Err(Rejection::out_of_range(sale));
        };

        queue.draw(sale.quantity);
        self.total_gain = total_gain;

        log::debug!(
            "Matched sale of {} {} on {} against {} lots",
            sale.quantity,
            sale.ticker,
            sale.date,
            gains.len()
        );
        Ok(gains)
    }
}

/// Calculate realised gains for the sales in a financial year.
///
/// Purchases from any date build the lot queues. Sales inside the window are
/// processed in date order (stable on ties); every processed sale's fees are
/// accumulated whether or not it could be matched. Only a purchase that
/// cannot be restated for splits is an error.
pub fn calculate_gains(
    trades: &[Trade],
    splits: &SplitTable,
    fy: FinancialYear,
) -> Result<GainsReport, InputError> {
    let queues = LotQueues::build(trades.iter().filter(|t| t.is_buy()), splits)?;

    let mut sales: Vec<&Trade> = trades
        .iter()
        .filter(|t| t.is_sell() && fy.contains(t.date))
        .collect();
    sales.sort_by_key(|t| t.date);
    log::info!(
        "Processing {} sales in financial year {} ({} to {})",
        sales.len(),
        fy,
        fy.start_date(),
        fy.end_date()
    );

    let mut matcher = SaleMatcher::new(queues);
    let mut gains = Vec::new();
    let mut rejected = Vec::new();

    for sale in &sales {
        match matcher
            .add_fees(sale)
            .and_then(|()| matcher.match_sale(sale))
        {
            Ok(records) => gains.extend(records),
            Err(reason) => {
                log::warn!("{}", reason);
                rejected.push(RejectedSale {
                    sale: (*sale).clone(),
                    reason,
                });
            }
        }
    }

    Ok(GainsReport {
        financial_year: fy,
        gains,
        rejected,
        sales_processed: sales.len(),
        total_gain: matcher.total_gain,
        total_fees: matcher.total_fees,
        open_lots: matcher.queues,
    })
}

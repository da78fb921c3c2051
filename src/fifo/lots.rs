use crate::splits::SplitTable;
use crate::trades::{InputError, Trade};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};

/// An open (possibly partially consumed) purchase, restated for all later splits
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lot {
    pub ticker: String,
    pub date: NaiveDate,
    pub quantity: Decimal,
    pub price: Decimal,
}

/// Part of a lot drawn to satisfy a sale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LotDraw {
    pub date: NaiveDate,
    pub price: Decimal,
    pub quantity: Decimal,
}

/// Open lots of one ticker in FIFO (purchase date) order
#[derive(Debug, Clone, Default)]
pub struct LotQueue {
    lots: VecDeque<Lot>,
}

impl LotQueue {
    pub fn push(&mut self, lot: Lot) {
        debug_assert!(self.lots.back().is_none_or(|last| last.date <= lot.date));
        self.lots.push_back(lot);
    }

    pub fn is_empty(&self) -> bool {
        self.lots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lots.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Lot> {
        self.lots.iter()
    }

    /// Saturates at `Decimal::MAX`
    pub fn total_quantity(&self) -> Decimal {
        self.lots
            .iter()
            .fold(Decimal::ZERO, |total, l| total.saturating_add(l.quantity))
    }

    /// Quantity remaining in lots bought strictly before `date`.
    /// Scans the whole queue on every call. Saturates at `Decimal::MAX`,
    /// which still covers any sale quantity.
    pub fn available_before(&self, date: NaiveDate) -> Decimal {
        self.lots
            .iter()
            .filter(|l| l.date < date)
            .fold(Decimal::ZERO, |total, l| total.saturating_add(l.quantity))
    }

    /// The draws `draw` would make for `quantity`, without consuming anything
    pub fn plan(&self, quantity: Decimal) -> Vec<LotDraw> {
        let mut remaining = quantity;
        let mut draws = Vec::new();

        for lot in &self.lots {
            if remaining <= Decimal::ZERO {
                break;
            }
            let used = remaining.min(lot.quantity);
            if !used.is_zero() {
                draws.push(LotDraw {
                    date: lot.date,
                    price: lot.price,
                    quantity: used,
                });
            }
            remaining -= used;
        }

        draws
    }

    /// Consume up to `quantity` from the front of the queue.
    ///
    /// Lots are drawn strictly in queue order with no regard to their date,
    /// and each lot is removed once exhausted. Stops early only if the queue
    /// runs dry.
    pub fn draw(&mut self, quantity: Decimal) -> Vec<LotDraw> {
        let mut remaining = quantity;
        let mut draws = Vec::new();

        while remaining > Decimal::ZERO {
            let Some(front) = self.lots.front_mut() else {
                break;
            };
            let used = remaining.min(front.quantity);
            if !used.is_zero() {
                draws.push(LotDraw {
                    date: front.date,
                    price: front.price,
                    quantity: used,
                });
            }
            remaining -= used;
            front.quantity -= used;
            log::debug!(
                "Drew {} {} from lot of {} @ {}, {} left in lot",
                used,
                front.ticker,
                front.date,
                front.price,
                front.quantity
            );
            if front.quantity.is_zero() {
                self.lots.pop_front();
            }
        }

        draws
    }
}

/// One lot queue per ticker
#[derive(Debug, Clone, Default)]
pub struct LotQueues {
    queues: BTreeMap<String, LotQueue>,
}

impl LotQueues {
    /// Build FIFO queues from purchases in any order.
    ///
    /// Purchases are ordered by date (stable, so same-day purchases keep
    /// their input order) and restated for splits. Nothing is filtered out.
    /// A purchase whose restated quantity or price is out of range is an
    /// input error.
    pub fn build<'a>(
        purchases: impl IntoIterator<Item = &'a Trade>,
        splits: &SplitTable,
    ) -> Result<Self, InputError> {
        let mut purchases: Vec<&Trade> = purchases.into_iter().collect();
        purchases.sort_by_key(|t| t.date);

        let mut queues: BTreeMap<String, LotQueue> = BTreeMap::new();
        for buy in purchases {
            let (quantity, price) = splits
                .adjust(&buy.ticker, buy.date, buy.quantity, buy.price)
                .ok_or_else(|| InputError::OutOfRange {
                    row: buy.row,
                    column: "split-adjusted quantity or price".to_string(),
                })?;
            queues.entry(buy.ticker.clone()).or_default().push(Lot {
                ticker: buy.ticker.clone(),
                date: buy.date,
                quantity,
                price,
            });
        }

        for (ticker, queue) in &queues {
            log::debug!(
                "Queue {}: {} lots, {} units",
                ticker,
                queue.len(),
                queue.total_quantity()
            );
        }

        Ok(LotQueues { queues })
    }

    #[cfg(test)]
    pub fn get(&self, ticker: &str) -> Option<&LotQueue> {
        self.queues.get(ticker)
    }

    pub fn get_mut(&mut self, ticker: &str) -> Option<&mut LotQueue> {
        self.queues.get_mut(ticker)
    }

    /// All open lots, by ticker then FIFO order
    pub fn open_lots(&self) -> impl Iterator<Item = &Lot> {
        self.queues.values().flat_map(LotQueue::iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::splits::Split;
    use crate::trades::OrderType;
    use rust_decimal_macros::dec;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn buy(ticker: &str, d: &str, qty: Decimal, price: Decimal) -> Trade {
        Trade {
            row: 2,
            ticker: ticker.to_string(),
            order_type: OrderType::Buy,
            date: date(d),
            price,
            quantity: qty,
            fees: Decimal::ZERO,
        }
    }

    fn prices(queue: &LotQueue) -> Vec<Decimal> {
        queue.iter().map(|l| l.price).collect()
    }

    #[test]
    fn queues_are_date_ordered_per_ticker() {
        let buys = vec![
            buy("XYZ", "2022-03-01", dec!(10), dec!(12)),
            buy("ABC", "2022-02-01", dec!(5), dec!(1)),
            buy("XYZ", "2022-01-01", dec!(10), dec!(10)),
        ];
        let queues = LotQueues::build(&buys, &SplitTable::default()).unwrap();

        assert_eq!(prices(queues.get("XYZ").unwrap()), vec![dec!(10), dec!(12)]);
        assert_eq!(queues.get("ABC").unwrap().len(), 1);
        assert!(queues.get("DEF").is_none());
    }

    #[test]
    fn same_day_purchases_keep_input_order() {
        let buys = vec![
            buy("XYZ", "2022-02-01", dec!(10), dec!(3)),
            buy("XYZ", "2022-01-01", dec!(10), dec!(1)),
            buy("XYZ", "2022-02-01", dec!(10), dec!(4)),
            buy("XYZ", "2022-02-01", dec!(10), dec!(2)),
        ];
        let queues = LotQueues::build(&buys, &SplitTable::default()).unwrap();
        assert_eq!(
            prices(queues.get("XYZ").unwrap()),
            vec![dec!(1), dec!(3), dec!(4), dec!(2)]
        );
    }

    #[test]
    fn lots_are_split_adjusted() {
        let splits = SplitTable::new(vec![Split {
            ticker: "XYZ".to_string(),
            date: date("2022-06-01"),
            ratio: dec!(2),
        }]);
        let buys = vec![
            buy("XYZ", "2022-01-01", dec!(100), dec!(10)),
            buy("XYZ", "2022-07-01", dec!(100), dec!(6)),
        ];
        let queues = LotQueues::build(&buys, &splits).unwrap();
        let lots: Vec<_> = queues.get("XYZ").unwrap().iter().cloned().collect();

        assert_eq!((lots[0].quantity, lots[0].price), (dec!(200), dec!(5)));
        assert_eq!((lots[1].quantity, lots[1].price), (dec!(100), dec!(6)));
    }

    #[test]
    fn available_before_excludes_same_day_and_later() {
        let buys = vec![
            buy("XYZ", "2022-01-01", dec!(100), dec!(10)),
            buy("XYZ", "2022-02-01", dec!(50), dec!(10)),
            buy("XYZ", "2022-03-01", dec!(25), dec!(10)),
        ];
        let queues = LotQueues::build(&buys, &SplitTable::default()).unwrap();
        let queue = queues.get("XYZ").unwrap();

        assert_eq!(queue.available_before(date("2022-02-01")), dec!(100));
        assert_eq!(queue.available_before(date("2022-02-02")), dec!(150));
        assert_eq!(queue.available_before(date("2021-12-31")), Decimal::ZERO);
        assert_eq!(queue.total_quantity(), dec!(175));
    }

    #[test]
    fn draw_consumes_front_and_removes_exhausted_lots() {
        let buys = vec![
            buy("XYZ", "2022-01-01", dec!(100), dec!(10)),
            buy("XYZ", "2022-02-01", dec!(100), dec!(12)),
        ];
        let mut queues = LotQueues::build(&buys, &SplitTable::default()).unwrap();
        let queue = queues.get_mut("XYZ").unwrap();

        let draws = queue.draw(dec!(150));
        assert_eq!(draws.len(), 2);
        assert_eq!((draws[0].quantity, draws[0].price), (dec!(100), dec!(10)));
        assert_eq!((draws[1].quantity, draws[1].price), (dec!(50), dec!(12)));

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.total_quantity(), dec!(50));
    }

    #[test]
    fn draw_skips_empty_lots_without_emitting() {
        let buys = vec![
            buy("XYZ", "2022-01-01", dec!(0), dec!(10)),
            buy("XYZ", "2022-02-01", dec!(10), dec!(12)),
        ];
        let mut queues = LotQueues::build(&buys, &SplitTable::default()).unwrap();
        let queue = queues.get_mut("XYZ").unwrap();

        let draws = queue.draw(dec!(5));
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].price, dec!(12));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn draw_stops_when_queue_runs_dry() {
        let buys = vec![buy("XYZ", "2022-01-01", dec!(10), dec!(10))];
        let mut queues = LotQueues::build(&buys, &SplitTable::default()).unwrap();
        let queue = queues.get_mut("XYZ").unwrap();

        let draws = queue.draw(dec!(25));
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].quantity, dec!(10));
        assert!(queue.is_empty());
    }

    #[test]
    fn plan_matches_draw_without_consuming() {
        let buys = vec![
            buy("XYZ", "2022-01-01", dec!(0), dec!(9)),
            buy("XYZ", "2022-02-01", dec!(100), dec!(10)),
            buy("XYZ", "2022-03-01", dec!(100), dec!(12)),
        ];
        let mut queues = LotQueues::build(&buys, &SplitTable::default()).unwrap();
        let queue = queues.get_mut("XYZ").unwrap();

        let planned = queue.plan(dec!(150));
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.total_quantity(), dec!(200));
        assert_eq!(queue.draw(dec!(150)), planned);
    }

    #[test]
    fn available_quantity_saturates() {
        let buys = vec![
            buy("XYZ", "2022-01-01", Decimal::MAX, dec!(1)),
            buy("XYZ", "2022-02-01", Decimal::MAX, dec!(1)),
        ];
        let queues = LotQueues::build(&buys, &SplitTable::default()).unwrap();
        let queue = queues.get("XYZ").unwrap();
        assert_eq!(queue.available_before(date("2022-03-01")), Decimal::MAX);
        assert_eq!(queue.total_quantity(), Decimal::MAX);
    }

    #[test]
    fn unrepresentable_split_adjustment_names_the_row() {
        let splits = SplitTable::new(vec![Split {
            ticker: "XYZ".to_string(),
            date: date("2022-06-01"),
            ratio: dec!(0.0000000000000000000000000001),
        }]);
        let buys = vec![Trade {
            row: 7,
            ..buy("XYZ", "2022-01-01", dec!(100), dec!(60))
        }];
        let err = LotQueues::build(&buys, &splits).unwrap_err();
        assert_eq!(
            err.to_string(),
            "row 7: split-adjusted quantity or price is out of range"
        );
    }
}

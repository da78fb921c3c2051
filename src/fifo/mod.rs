//! FIFO lot matching: split-adjusted purchase queues, sale matching and gain totals

pub mod gains;
pub mod lots;
pub mod matcher;

pub use gains::GainsReport;
pub use lots::Lot;
pub use matcher::{calculate_gains, RejectedSale, Rejection};

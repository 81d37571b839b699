mod account;
pub mod metrics;
mod txn;

pub use account::{format_amount, Account, MonetaryAmount};
pub use metrics::{AccountSnapshot, Health, Snapshot};
pub use txn::{Direction, Party, Status, Transaction};

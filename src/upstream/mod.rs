pub mod erste;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::core::{Account, MonetaryAmount, Transaction};
use crate::error::Error;

#[async_trait]
pub trait AccountSource {
    async fn accounts(&self, token: &str) -> Result<Vec<Account>, Error>;

    async fn balance(&self, token: &str, account_id: &str) -> Result<MonetaryAmount, Error>;
}

#[async_trait]
pub trait TransactionSource {
    /// Transactions from `from` through today, first page only.
    async fn transactions(
        &self,
        token: &str,
        account_id: &str,
        from: NaiveDate,
    ) -> Result<Vec<Transaction>, Error>;
}

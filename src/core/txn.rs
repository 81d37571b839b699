use chrono::naive::NaiveDate;
use serde::Deserialize;

use super::MonetaryAmount;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Direction {
    #[serde(rename = "CRDT")]
    Credit,
    #[serde(rename = "DBIT")]
    Debit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Status {
    /// Does not affect the balance, e.g. rate changes or failed payments.
    #[serde(rename = "INFO")]
    Info,
    #[serde(rename = "BOOK")]
    Book,
}

/// The other side of a transaction, when the bank reports one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Party {
    pub iban: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub reference: String,
    pub amount: MonetaryAmount,
    pub direction: Direction,
    pub status: Status,
    pub booking_date: NaiveDate,
    pub value_date: NaiveDate,
    pub creditor: Option<Party>,
    pub debitor: Option<Party>,
}

impl Transaction {
    /// The counterparty whose IBAN decides whether this is an internal transfer.
    pub fn counterparty(&self) -> Option<&Party> {
        match self.direction {
            Direction::Debit => self.creditor.as_ref(),
            Direction::Credit => self.debitor.as_ref(),
        }
    }
}

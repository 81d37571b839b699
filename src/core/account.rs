use std::fmt;

use rust_decimal::Decimal;
use rusty_money::{iso, Money};

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub iban: Option<String>,
    pub display_name: String,
    pub product_name: String,
    pub currency: String,
}

impl Account {
    pub fn friendly_name(&self) -> String {
        format!("{} {}", self.display_name, self.product_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonetaryAmount {
    pub amount: Decimal,
    /// ISO 4217 alpha code, validated against the ISO currency table.
    pub currency: String,
}

impl MonetaryAmount {
    pub fn new(amount: Decimal, currency: &str) -> Result<Self, Error> {
        match iso::find(currency) {
            Some(c) => Ok(Self {
                amount,
                currency: c.iso_alpha_code.to_string(),
            }),
            None => Err(Error::UnknownCurrency(currency.to_string())),
        }
    }
}

impl fmt::Display for MonetaryAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_amount(self.amount, &self.currency))
    }
}

/// Formats an amount in the conventions of its currency, rounded to cents.
pub fn format_amount(amount: Decimal, currency: &str) -> String {
    let amount = amount.round_dp(2);
    match iso::find(currency) {
        Some(c) => Money::from_decimal(amount, c).to_string(),
        None => format!("{} {}", amount, currency),
    }
}

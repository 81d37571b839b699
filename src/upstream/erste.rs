//! Erste Group "my accounts" API.
//!
//! Responses are parsed once into the wire structs below and converted into
//! the crate's account and transaction types; a field the conversion needs
//! and the bank left out fails the whole response.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::core::{Account, Direction, MonetaryAmount, Party, Status, Transaction};
use crate::error::Error;
use crate::upstream::{AccountSource, TransactionSource};

/// Transactions requested per call. Only the first page is read.
pub const PAGE_SIZE: u32 = 100;

const API_KEY_HEADER: &str = "WEB-API-key";

pub struct Source {
    http: Client,
    api_base: String,
    api_key: String,
}

impl Source {
    pub fn new(http: Client, api_base: &str, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        token: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, Error> {
        let resp = self
            .http
            .get(format!("{}{}", self.api_base, path))
            .header(API_KEY_HEADER, &self.api_key)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|source| Error::Parse { endpoint, source })
    }
}

#[async_trait]
impl AccountSource for Source {
    #[tracing::instrument(skip_all)]
    async fn accounts(&self, token: &str) -> Result<Vec<Account>, Error> {
        let page: AccountsPage = self.get("accounts", token, "/my/accounts", &[]).await?;
        debug!(count = page.accounts.len(), "fetched accounts");

        Ok(page.accounts.into_iter().map(Account::from).collect())
    }

    #[tracing::instrument(skip(self, token))]
    async fn balance(&self, token: &str, account_id: &str) -> Result<MonetaryAmount, Error> {
        let page: BalancesPage = self
            .get(
                "balance",
                token,
                &format!("/my/accounts/{}/balance", account_id),
                &[],
            )
            .await?;

        // Accounts in this product tier carry a single meaningful balance.
        match page.balances.into_iter().next() {
            Some(entry) => entry.amount.try_into(),
            None => Err(Error::NoBalance(account_id.to_string())),
        }
    }
}

#[async_trait]
impl TransactionSource for Source {
    #[tracing::instrument(skip(self, token))]
    async fn transactions(
        &self,
        token: &str,
        account_id: &str,
        from: NaiveDate,
    ) -> Result<Vec<Transaction>, Error> {
        let query = [
            ("fromDate", from.format("%Y-%m-%d").to_string()),
            ("size", PAGE_SIZE.to_string()),
        ];
        let page: TransactionsPage = self
            .get(
                "transactions",
                token,
                &format!("/my/accounts/{}/transactions", account_id),
                &query,
            )
            .await?;
        debug!(count = page.transactions.len(), "fetched transactions");

        page.transactions
            .into_iter()
            .map(Transaction::try_from)
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct AccountsPage {
    #[serde(default)]
    accounts: Vec<WireAccount>,
}

#[derive(Debug, Deserialize)]
struct WireAccount {
    id: String,
    currency: String,
    #[serde(rename = "nameI18N")]
    name: String,
    #[serde(rename = "productI18N")]
    product: String,
    #[serde(default)]
    identification: Identification,
}

#[derive(Debug, Default, Deserialize)]
struct Identification {
    iban: Option<String>,
}

impl Identification {
    /// Blank IBANs are reported for some counterparties; they identify nothing.
    fn iban(self) -> Option<String> {
        self.iban.filter(|iban| !iban.trim().is_empty())
    }
}

impl From<WireAccount> for Account {
    fn from(wire: WireAccount) -> Self {
        Self {
            id: wire.id,
            iban: wire.identification.iban(),
            display_name: wire.name,
            product_name: wire.product,
            currency: wire.currency,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BalancesPage {
    balances: Vec<WireBalance>,
}

#[derive(Debug, Deserialize)]
struct WireBalance {
    amount: WireAmount,
}

#[derive(Debug, Deserialize)]
struct WireAmount {
    value: Decimal,
    currency: String,
}

impl TryFrom<WireAmount> for MonetaryAmount {
    type Error = Error;

    fn try_from(wire: WireAmount) -> Result<Self, Error> {
        MonetaryAmount::new(wire.value, &wire.currency)
    }
}

#[derive(Debug, Deserialize)]
struct TransactionsPage {
    transactions: Vec<WireTransaction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTransaction {
    entry_reference: String,
    amount: WireAmount,
    credit_debit_indicator: Direction,
    status: Status,
    booking_date: WireDate,
    value_date: WireDate,
    #[serde(default)]
    entry_details: Option<EntryDetails>,
}

/// Dates arrive either bare or wrapped as `{"date": ...}`, sometimes with a time.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireDate {
    Plain(String),
    Wrapped { date: String },
}

impl TryFrom<WireDate> for NaiveDate {
    type Error = Error;

    fn try_from(wire: WireDate) -> Result<Self, Error> {
        let raw = match wire {
            WireDate::Plain(s) | WireDate::Wrapped { date: s } => s,
        };
        raw.get(..10)
            .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
            .ok_or(Error::InvalidDate(raw))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryDetails {
    #[serde(default)]
    transaction_details: Option<TransactionDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionDetails {
    #[serde(default)]
    related_parties: Option<RelatedParties>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelatedParties {
    #[serde(default)]
    creditor: Option<Named>,
    #[serde(default)]
    debitor: Option<Named>,
    #[serde(default)]
    creditor_account: Option<PartyAccount>,
    #[serde(default)]
    debitor_account: Option<PartyAccount>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PartyAccount {
    #[serde(default)]
    identification: Identification,
}

fn to_party(account: Option<PartyAccount>, named: Option<Named>) -> Option<Party> {
    let iban = account?.identification.iban()?;
    Some(Party {
        iban,
        name: named.and_then(|n| n.name),
    })
}

impl TryFrom<WireTransaction> for Transaction {
    type Error = Error;

    fn try_from(wire: WireTransaction) -> Result<Self, Error> {
        let parties = wire
            .entry_details
            .and_then(|e| e.transaction_details)
            .and_then(|d| d.related_parties)
            .unwrap_or_default();

        Ok(Transaction {
            reference: wire.entry_reference,
            amount: wire.amount.try_into()?,
            direction: wire.credit_debit_indicator,
            status: wire.status,
            booking_date: wire.booking_date.try_into()?,
            value_date: wire.value_date.try_into()?,
            creditor: to_party(parties.creditor_account, parties.creditor),
            debitor: to_party(parties.debitor_account, parties.debitor),
        })
    }
}

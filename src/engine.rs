use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::{Datelike, NaiveDate};
use tracing::{debug, info};

use crate::core::metrics::{self, AccountData, TRAILING_WINDOW_DAYS};
use crate::core::{Account, AccountSnapshot, Snapshot};
use crate::error::Error;
use crate::settings::{Conf, ConfigFile};
use crate::token::{Credentials, TokenManager};
use crate::upstream::{erste::Source, AccountSource, TransactionSource};

/// Fetches everything for one credential set and derives its snapshot.
///
/// Calls are made one after another: the own-IBAN set used to spot internal
/// transfers needs the complete account listing before any transaction is
/// classified. Any failure aborts the poll and nothing is returned.
pub struct Engine<S> {
    tokens: TokenManager,
    source: S,
    payday: u32,
}

impl<S: AccountSource + TransactionSource + Send + Sync> Engine<S> {
    pub fn new(tokens: TokenManager, source: S, payday: u32) -> Self {
        Self {
            tokens,
            source,
            payday,
        }
    }

    pub fn tokens_mut(&mut self) -> &mut TokenManager {
        &mut self.tokens
    }

    pub async fn accounts(&mut self) -> Result<Vec<Account>, Error> {
        let token = self.tokens.access_token().await?;
        let accounts = self.source.accounts(&token).await;
        self.check(accounts)
    }

    #[tracing::instrument(skip(self))]
    pub async fn poll(&mut self, today: NaiveDate) -> Result<Snapshot, Error> {
        let token = self.tokens.access_token().await?;

        let accounts = self.source.accounts(&token).await;
        let accounts = self.check(accounts)?;
        let own = metrics::own_ibans(&accounts);

        let month_start = today.with_day(1).unwrap_or(today);
        let window_start = today - chrono::Duration::days(TRAILING_WINDOW_DAYS);

        let mut snapshot = Snapshot::new();
        for account in accounts {
            let balance = self.source.balance(&token, &account.id).await;
            let balance = self.check(balance)?;

            let month_to_date = self.source.transactions(&token, &account.id, month_start).await;
            let month_to_date = self.check(month_to_date)?;

            let trailing_30d = self.source.transactions(&token, &account.id, window_start).await;
            let trailing_30d = self.check(trailing_30d)?;

            let entry = AccountSnapshot::derive(
                AccountData {
                    account,
                    balance,
                    month_to_date: &month_to_date,
                    trailing_30d: &trailing_30d,
                },
                &own,
                self.payday,
                today,
            );
            debug!(account = %entry.account.id, health = entry.health.label(), "derived snapshot");
            snapshot.insert(entry.account.id.clone(), entry);
        }

        info!(accounts = snapshot.len(), "poll complete");
        Ok(snapshot)
    }

    /// Drops the cached access token when the bank rejects it.
    fn check<T>(&mut self, result: Result<T, Error>) -> Result<T, Error> {
        if let Err(err) = &result {
            if err.is_unauthorized() {
                self.tokens.invalidate();
            }
        }
        result
    }
}

pub(crate) fn http_client(conf: &Conf) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(conf.timeout_secs))
        .build()
}

pub(crate) fn default_engine(conf: &ConfigFile) -> Result<Engine<Source>> {
    let c = conf.config();
    if c.refresh_token.is_empty() {
        return Err(anyhow!(
            "no refresh token in {}, run `{} link` first",
            conf.path().display(),
            crate::CLIENT_NAME
        ));
    }

    let http = http_client(c)?;
    let credentials = Credentials::from(c);
    let source = Source::new(http.clone(), &credentials.api_base_url, credentials.api_key.clone());

    Ok(Engine::new(TokenManager::new(http, credentials), source, c.payday))
}

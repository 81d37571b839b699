use std::fmt;

use oauth_link::{TokenClient, TokenError};
use tracing::{info, warn};

use crate::settings::Conf;

/// Everything needed to talk to the bank on behalf of one user.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    /// Cached for the session only, never persisted.
    pub access_token: Option<String>,
    pub api_base_url: String,
    pub idp_base_url: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url)
            .field("idp_base_url", &self.idp_base_url)
            .finish_non_exhaustive()
    }
}

impl From<&Conf> for Credentials {
    fn from(conf: &Conf) -> Self {
        Self {
            api_key: conf.api_key.clone(),
            client_id: conf.client_id.clone(),
            client_secret: conf.client_secret.clone(),
            refresh_token: conf.refresh_token.clone(),
            access_token: None,
            api_base_url: conf.api_base_url.clone(),
            idp_base_url: conf.idp_base_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    NoToken,
    Authorizing,
    Authorized,
    /// The refresh token was rejected; a new authorization is required.
    Expired,
    /// The last refresh failed for a reason the next poll may not hit.
    RefreshFailed,
}

/// Owns the refresh token and the session's cached access token.
///
/// Access tokens are used until a protected call rejects them, there is no
/// expiry tracking. Rotated refresh tokens are handed out through
/// [`TokenManager::take_rotated_refresh_token`] so the caller can persist them.
pub struct TokenManager {
    client: TokenClient,
    credentials: Credentials,
    state: TokenState,
    rotated: Option<String>,
}

impl TokenManager {
    pub fn new(http: reqwest::Client, credentials: Credentials) -> Self {
        let client = TokenClient::new(
            http,
            &credentials.idp_base_url,
            credentials.client_id.clone(),
            credentials.client_secret.clone(),
        );
        let state = match credentials.access_token {
            Some(_) => TokenState::Authorized,
            None => TokenState::NoToken,
        };

        Self {
            client,
            credentials,
            state,
            rotated: None,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn state(&self) -> TokenState {
        self.state
    }

    /// Trades an authorization code for a fresh refresh token.
    pub async fn exchange_code(&mut self, code: &str) -> Result<&Credentials, TokenError> {
        self.state = TokenState::Authorizing;

        let exchanged = self.client.exchange_code(code).await;
        let grant = match exchanged {
            Ok(grant) => grant,
            Err(err) => {
                self.state = TokenState::NoToken;
                return Err(err);
            }
        };

        self.adopt_refresh_token(grant.refresh_token);
        self.credentials.access_token = grant.access_token;
        self.state = match self.credentials.access_token {
            Some(_) => TokenState::Authorized,
            None => TokenState::NoToken,
        };

        Ok(&self.credentials)
    }

    /// Returns the cached access token, refreshing first if there is none.
    pub async fn access_token(&mut self) -> Result<String, TokenError> {
        if let Some(token) = &self.credentials.access_token {
            return Ok(token.clone());
        }

        let refreshed = self.client.refresh(&self.credentials.refresh_token).await;
        match refreshed {
            Ok(refreshed) => {
                if let Some(next) = refreshed.refresh_token {
                    self.adopt_refresh_token(next);
                }
                self.credentials.access_token = Some(refreshed.access_token.clone());
                self.state = TokenState::Authorized;

                Ok(refreshed.access_token)
            }
            Err(err) => {
                self.state = match err {
                    TokenError::AuthExpired => TokenState::Expired,
                    _ => TokenState::RefreshFailed,
                };
                warn!(error = %err, "failed to refresh access token");

                Err(err)
            }
        }
    }

    /// Drops the cached access token so the next request refreshes it.
    pub fn invalidate(&mut self) {
        if self.credentials.access_token.take().is_some() {
            info!("access token rejected, refreshing on next poll");
        }
        self.state = TokenState::NoToken;
    }

    /// A refresh token issued but not yet taken, if any.
    pub fn rotated_refresh_token(&self) -> Option<&str> {
        self.rotated.as_deref()
    }

    /// A refresh token issued since the last call, if any.
    pub fn take_rotated_refresh_token(&mut self) -> Option<String> {
        self.rotated.take()
    }

    fn adopt_refresh_token(&mut self, token: String) {
        if token != self.credentials.refresh_token {
            info!("new refresh token received");
            self.credentials.refresh_token = token.clone();
            self.rotated = Some(token);
        }
    }
}

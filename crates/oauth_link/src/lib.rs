use lazy_static::lazy_static;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// The redirect URI registered for the application. The identity provider
/// never calls it; the user copies the resulting URL back by hand.
pub static REDIRECT_URI: &str = "https://example.com";

lazy_static! {
    // HACK: users paste anything from a full URL to a bare `?code=...` query,
    // only the query part of a Url parsed against this base is meaningful.
    static ref BASE_URL: Url = {
        Url::parse(REDIRECT_URI).unwrap()
    };
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("no redirect url provided")]
    NoRedirectUrl,
    #[error("redirect url is not a valid url")]
    InvalidUrl,
    #[error("redirect url has no authorization code")]
    NoCode,
    #[error("authorization was denied: {0}")]
    Denied(String),
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token exchange failed with status {status}: {body}")]
    Exchange { status: u16, body: String },
    #[error("token response did not include a refresh token")]
    MissingRefreshToken,
    #[error("refresh token expired, the account must be linked again")]
    AuthExpired,
    #[error("token refresh failed with status {status}: {body}")]
    Refresh { status: u16, body: String },
    #[error("malformed token response: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("identity provider request failed")]
    Transport(#[from] reqwest::Error),
}

impl TokenError {
    /// Whether retrying on the next poll may succeed without user action.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TokenError::Refresh { .. } | TokenError::Transport(_) | TokenError::Malformed(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
    Create,
    Reauth,
}

impl LinkMode {
    fn state(self) -> &'static str {
        match self {
            LinkMode::Create => "burnrate-setup",
            LinkMode::Reauth => "burnrate-reauth",
        }
    }
}

/// Builds the interactive login URL the user opens in a browser.
pub fn authorize_url(
    idp_base: &str,
    client_id: &str,
    scopes: &[String],
    mode: LinkMode,
) -> Result<Url, LinkError> {
    let mut url = Url::parse(&format!("{}/auth", idp_base.trim_end_matches('/')))
        .map_err(|e| LinkError::InvalidArgument(format!("invalid identity provider url: {}", e)))?;

    url.query_pairs_mut()
        .append_pair("client_id", client_id)
        .append_pair("response_type", "code")
        .append_pair("access_type", "offline")
        .append_pair("scope", &scopes.join(" "))
        .append_pair("redirect_uri", REDIRECT_URI)
        .append_pair("prompt", "consent")
        .append_pair("state", mode.state());

    Ok(url)
}

/// Extracts the authorization code from the URL the browser was redirected to.
pub fn code_from_redirect(input: &str) -> Result<String, LinkError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(LinkError::NoRedirectUrl);
    }

    let url = Url::options()
        .base_url(Some(&BASE_URL))
        .parse(input)
        .map_err(|_| LinkError::InvalidUrl)?;

    if let Some((_, reason)) = url.query_pairs().find(|(key, _)| key == "error") {
        return Err(LinkError::Denied(reason.into_owned()));
    }

    match url.query_pairs().find(|(key, _)| key == "code") {
        Some((_, code)) if !code.is_empty() => Ok(code.into_owned()),
        _ => Err(LinkError::NoCode),
    }
}

/// Tokens granted by an authorization-code exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub access_token: Option<String>,
    pub refresh_token: String,
}

/// Tokens granted by a refresh. `refresh_token` is set when the provider rotates it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Refreshed {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Deserialize)]
struct ExchangeResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Client for the identity provider's token endpoint.
pub struct TokenClient {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl TokenClient {
    pub fn new(
        http: reqwest::Client,
        idp_base: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            token_url: format!("{}/token", idp_base.trim_end_matches('/')),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    #[tracing::instrument(skip_all)]
    pub async fn exchange_code(&self, code: &str) -> Result<Grant, TokenError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", REDIRECT_URI),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        let resp = self.http.post(&self.token_url).form(&params).send().await?;

        let status = resp.status();
        let body = resp.text().await?;
        if status != reqwest::StatusCode::OK {
            return Err(TokenError::Exchange {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ExchangeResponse = serde_json::from_str(&body)?;
        match parsed.refresh_token {
            Some(refresh_token) if !refresh_token.is_empty() => {
                debug!("authorization code exchanged");
                Ok(Grant {
                    access_token: parsed.access_token,
                    refresh_token,
                })
            }
            _ => Err(TokenError::MissingRefreshToken),
        }
    }

    #[tracing::instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<Refreshed, TokenError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        let resp = self.http.post(&self.token_url).form(&params).send().await?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(TokenError::AuthExpired);
        }

        let body = resp.text().await?;
        if !status.is_success() {
            return Err(TokenError::Refresh {
                status: status.as_u16(),
                body,
            });
        }

        let mut refreshed: Refreshed = serde_json::from_str(&body)?;
        // Some providers echo an empty string when they do not rotate.
        if refreshed.refresh_token.as_deref() == Some("") {
            refreshed.refresh_token = None;
        }
        debug!(rotated = refreshed.refresh_token.is_some(), "access token refreshed");

        Ok(refreshed)
    }
}

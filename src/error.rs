use oauth_link::TokenError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("bank api returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("account {0} reported no balance")]
    NoBalance(String),
    #[error("unable to parse {endpoint} response: {source}")]
    Parse {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid date {0:?}")]
    InvalidDate(String),
    #[error("unknown currency code {0:?}")]
    UnknownCurrency(String),
    #[error("bank api request failed")]
    Transport(#[from] reqwest::Error),
}

impl Error {
    /// The refresh token is dead; only a new authorization-code exchange helps.
    pub fn requires_reauth(&self) -> bool {
        matches!(self, Error::Token(TokenError::AuthExpired))
    }

    pub(crate) fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Api { status: 401, .. })
    }

    /// Converts into a report for the user, telling them how to re-link
    /// when the refresh token expired.
    pub(crate) fn into_report(self) -> anyhow::Error {
        if self.requires_reauth() {
            anyhow::Error::new(self).context(format!(
                "authorization expired, run `{} link --reauth`",
                crate::CLIENT_NAME
            ))
        } else {
            self.into()
        }
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Error) -> bool {
        self.to_string() == other.to_string()
    }
}

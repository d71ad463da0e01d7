use thiserror::Error;

/// A month label that is not `YYYY-MM`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MonthError {
    #[error("invalid month label {0:?}, expected YYYY-MM")]
    Invalid(String),
}

/// Why a single GET produced no usable payload.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("HTTP status {0}")]
    Status(u16),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => FetchError::Status(status.as_u16()),
            None => FetchError::Transport(err.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Month(#[from] MonthError),

    #[error("URL template {0:?} has no {{month}} placeholder")]
    Template(String),

    #[error("timeout must be at least one second")]
    Timeout,
}

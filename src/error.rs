//! Custom error types for transparencia

use thiserror::Error;

/// Main error type for transparencia operations
///
/// Extraction misses and unparseable amounts are not errors: they surface as
/// `None` fields on the parsed records. Only failures the caller has to act on
/// live here.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Not initialized: run 'transparencia init' first")]
    NotInitialized,

    #[error("{0}")]
    Other(String),
}

/// Result type alias for transparencia
pub type Result<T> = std::result::Result<T, Error>;

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Other(format!("Background task failed: {}", err))
    }
}

// src/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("rate limited by upstream; not reconnecting this run")]
    RateLimited,

    #[error("giving up after {0} consecutive connection failures")]
    DegradedExit(u32),
}

impl Error {
    /// Fatal errors end the run; everything else is recoverable via backoff.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Auth(_) | Error::Config(_) | Error::RateLimited | Error::DegradedExit(_)
        )
    }
}

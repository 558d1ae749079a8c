//! Errors of the tickets bot.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure of an outbound call to the chat platform.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlatformError {
    /// The platform asked to slow down. `retry_after` is the wait it dictated, if any.
    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<std::time::Duration> },
    #[error("unknown resource")]
    NotFound,
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("{0} timed out")]
    Timeout(&'static str),
    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),
    #[error("max retries exceeded ({0} attempts)")]
    RetryBudgetExceeded(u32),
    #[error("permission denied")]
    PermissionDenied,
    #[error("panel request failed: {0}")]
    PanelRequest(#[from] reqwest::Error),
    #[error("panel request returned status {0}")]
    PanelStatus(u16),
    #[error("discord client error: {0}")]
    Discord(#[from] serenity::Error),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Rate limits and deadlines: worth logging and moving on.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Timeout(_)
                | Error::RetryBudgetExceeded(_)
                | Error::Platform(PlatformError::RateLimited { .. })
        )
    }
}

//! Application-wide error types.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortalError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The backend answered with a non-success status.
    #[error("{context}: backend returned {status}")]
    Status { status: StatusCode, context: String },

    #[error("Unknown {kind} filter value: {value:?}")]
    UnknownTier { kind: &'static str, value: String },

    #[error("Scholarships unavailable: {0}")]
    NotLoaded(String),
}

pub type Result<T> = std::result::Result<T, PortalError>;

//! Error types for the copy-trade analytics engine.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Config store unavailable: {message}")]
    ConfigUnavailable { message: String },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration file error: {0}")]
    ConfigFile(#[from] config::ConfigError),

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl Error {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Error::InvalidInput(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Reject empty or padded trader identifiers before they reach storage.
pub fn validate_trader_id(trader_id: &str) -> Result<()> {
    if trader_id.is_empty() {
        return Err(Error::invalid_input("trader id is required"));
    }
    if trader_id.trim() != trader_id {
        return Err(Error::invalid_input(format!(
            "trader id {:?} has surrounding whitespace",
            trader_id
        )));
    }
    Ok(())
}

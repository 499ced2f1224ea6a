//! Error types for SorticNav

use thiserror::Error;

/// SorticNav error type
#[derive(Error, Debug)]
pub enum NavError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Payload error: {0}")]
    Payload(String),

    #[error("Invalid position: {0}")]
    InvalidPosition(String),
}

impl From<toml::de::Error> for NavError {
    fn from(e: toml::de::Error) -> Self {
        NavError::Config(e.to_string())
    }
}

impl From<serde_json::Error> for NavError {
    fn from(e: serde_json::Error) -> Self {
        NavError::Payload(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NavError>;

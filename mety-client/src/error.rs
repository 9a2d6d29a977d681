//! Error types for the client.

use crate::config::ConfigError;
use crate::persistence::PersistenceError;
use mety_core::{ServiceError, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("Logging setup failed: {0}")]
    Telemetry(String),
    #[error("No active user. Set a user id first.")]
    NoActiveUser,
    #[error("Usage: {0}")]
    Usage(String),
}

impl ClientError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Service(err) if err.is_timeout())
    }
}

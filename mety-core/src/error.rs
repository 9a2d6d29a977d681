//! Error types shared by the services and the client.

use thiserror::Error;

/// Failures of a remote call to the plan, chat or prediction service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{service} returned HTTP {status}: {body}")]
    Http {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{service} request failed: {reason}")]
    Transport { service: &'static str, reason: String },

    #[error(
        "Prediction request timed out after {after_secs} seconds. The prediction service may be slow or unavailable. Please try again."
    )]
    Timeout { after_secs: u64 },

    #[error("Invalid response from {service}: {reason}")]
    Decode { service: &'static str, reason: String },

    #[error("{service} rejected the request")]
    Rejected { service: &'static str },
}

impl ServiceError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ServiceError::Timeout { .. })
    }
}

/// Input problems detected before any network call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: &'static str },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

pub type ServiceResult<T> = Result<T, ServiceError>;

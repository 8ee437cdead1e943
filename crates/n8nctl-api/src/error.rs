//! Remote client error taxonomy.
//!
//! Errors are classified into kinds, not transport details: each kind maps
//! to a stable code and a `sysexits` class, and drives the retry decision.

use std::time::Duration;

use thiserror::Error;

use n8nctl_core::ErrorClass;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The instance rejected the API key.
    #[error("authentication failed: {message}")]
    Unauthorized { message: String },

    /// The addressed resource does not exist.
    #[error("{resource} '{id}' not found")]
    NotFound { resource: String, id: String },

    /// The instance rejected the payload.
    #[error("remote validation failed: {message}")]
    Validation { message: String },

    /// HTTP 429; holds the server-requested delay when one was sent.
    #[error("rate limited by the instance")]
    RateLimited { retry_after: Option<Duration> },

    /// HTTP 5xx.
    #[error("instance error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    /// Connection-level failure.
    #[error("cannot reach the instance: {message}")]
    Network { message: String },

    /// The response did not match the API contract.
    #[error("unexpected response from the instance: {message}")]
    Protocol { message: String },

    /// The webhook URL was rejected by the SSRF guard.
    #[error("webhook URL refused: {message}")]
    UrlBlocked { message: String },

    /// The operation was cancelled by a signal.
    #[error("operation cancelled")]
    Cancelled,
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized { .. } => "UNAUTHORIZED",
            ApiError::NotFound { .. } => "NOT_FOUND",
            ApiError::Validation { .. } => "REMOTE_VALIDATION_FAILED",
            ApiError::RateLimited { .. } => "RATE_LIMITED",
            ApiError::Server { .. } => "SERVER_ERROR",
            ApiError::Network { .. } => "HOST_UNREACHABLE",
            ApiError::Protocol { .. } => "API_PROTOCOL_ERROR",
            ApiError::UrlBlocked { .. } => "WEBHOOK_URL_BLOCKED",
            ApiError::Cancelled => "CANCELLED",
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            ApiError::Unauthorized { .. } => ErrorClass::Permission,
            ApiError::NotFound { .. } | ApiError::Validation { .. } => ErrorClass::Data,
            ApiError::RateLimited { .. } => ErrorClass::Temporary,
            ApiError::Server { .. } | ApiError::Network { .. } => ErrorClass::Unavailable,
            ApiError::Protocol { .. } => ErrorClass::Protocol,
            ApiError::UrlBlocked { .. } => ErrorClass::Permission,
            ApiError::Cancelled => ErrorClass::Cancelled,
        }
    }

    /// Network errors and 5xx retry; 4xx never does except 408/429.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::Network { .. } | ApiError::Server { .. } | ApiError::RateLimited { .. }
        )
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            ApiError::Network {
                message: err.to_string(),
            }
        } else if err.is_decode() {
            ApiError::Protocol {
                message: err.to_string(),
            }
        } else {
            ApiError::Network {
                message: err.to_string(),
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_exit_classes() {
        assert_eq!(
            ApiError::Unauthorized {
                message: "bad key".into()
            }
            .class()
            .exit_code(),
            77
        );
        assert_eq!(
            ApiError::RateLimited { retry_after: None }.class().exit_code(),
            71
        );
        assert_eq!(
            ApiError::Protocol {
                message: "x".into()
            }
            .class()
            .exit_code(),
            72
        );
        assert_eq!(
            ApiError::Network {
                message: "x".into()
            }
            .class()
            .exit_code(),
            69
        );
    }

    #[test]
    fn only_transient_kinds_retry() {
        assert!(ApiError::Server {
            status: 503,
            message: String::new()
        }
        .is_retryable());
        assert!(ApiError::Network {
            message: String::new()
        }
        .is_retryable());
        assert!(!ApiError::Unauthorized {
            message: String::new()
        }
        .is_retryable());
        assert!(!ApiError::NotFound {
            resource: "workflow".into(),
            id: "w1".into()
        }
        .is_retryable());
        assert!(!ApiError::Validation {
            message: String::new()
        }
        .is_retryable());
    }
}

//! Application error types

use std::time::Duration;

use fleetgate_domain::{DomainError, ErrorClassification, StatusCode};
use thiserror::Error;

use crate::ports::StorageError;

/// Why a session could not be kept alive.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionExpiry {
    /// No refresh token is stored.
    #[error("no refresh token is stored")]
    MissingRefreshToken,

    /// The renewal endpoint failed or rejected the refresh token.
    #[error("token renewal failed: {0}")]
    RenewalFailed(String),

    /// The request was rejected again after its one retry.
    #[error("request was rejected again after a token refresh")]
    RetryRejected,

    /// The renewal was abandoned before it settled.
    #[error("token renewal was abandoned before it settled")]
    Abandoned,

    /// The session was ended while the renewal was in flight.
    #[error("session ended while the token was being renewed")]
    Ended,
}

/// Errors returned to callers of the request pipeline.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The request could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] DomainError),

    /// The transport could not encode or address the request.
    #[error("request could not be sent: {0}")]
    Unsendable(String),

    /// The client is offline.
    #[error("no network connection")]
    NoConnectivity,

    /// The backend refused the connection or the network path failed.
    #[error("backend unreachable: {0}")]
    BackendUnreachable(String),

    /// No response was received and nothing better explains it.
    #[error("DNS resolution failed: {0}")]
    DnsFailure(String),

    /// The request exceeded its deadline.
    #[error("request timed out after {timeout:?}")]
    Timeout {
        /// The deadline that was exceeded.
        timeout: Duration,
    },

    /// The session is over; the user must log in again.
    #[error("session expired: {0}")]
    SessionExpired(SessionExpiry),

    /// 403.
    #[error("forbidden: {message}")]
    Forbidden {
        /// Server-provided or default message.
        message: String,
    },

    /// 400.
    #[error("validation failed: {message}")]
    Validation {
        /// Server-provided or default message.
        message: String,
    },

    /// 500.
    #[error("server error ({status}): {message}")]
    Server {
        /// Status code.
        status: StatusCode,
        /// Server-provided or default message.
        message: String,
    },

    /// Any other non-success status, passed through unchanged.
    #[error("unexpected status {status}")]
    Http {
        /// Status code.
        status: StatusCode,
        /// Raw response body.
        body: String,
    },

    /// Credential persistence failed.
    #[error("credential storage failed: {0}")]
    Storage(String),
}

impl ApiError {
    /// The taxonomy member this error was derived from, if any.
    #[must_use]
    pub const fn classification(&self) -> Option<ErrorClassification> {
        match self {
            Self::InvalidRequest(_) | Self::Unsendable(_) | Self::Storage(_) => None,
            Self::NoConnectivity => Some(ErrorClassification::NoConnectivity),
            Self::BackendUnreachable(_) => Some(ErrorClassification::BackendUnreachable),
            Self::DnsFailure(_) => Some(ErrorClassification::DnsFailure),
            Self::Timeout { .. } => Some(ErrorClassification::Timeout),
            Self::SessionExpired(_) => Some(ErrorClassification::Unauthorized),
            Self::Forbidden { .. } => Some(ErrorClassification::Forbidden),
            Self::Validation { .. } => Some(ErrorClassification::ValidationError),
            Self::Server { .. } => Some(ErrorClassification::ServerError),
            Self::Http { .. } => Some(ErrorClassification::Unknown),
        }
    }

    /// Returns true if the user has to log in again.
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        matches!(self, Self::SessionExpired(_))
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Result type alias for pipeline operations.
pub type ApiResult<T> = Result<T, ApiError>;

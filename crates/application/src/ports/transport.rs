//! HTTP transport port

use async_trait::async_trait;
use fleetgate_domain::{ApiRequest, ApiResponse, TransportFailureKind};
use thiserror::Error;

/// Errors raised before a response was received.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The request URL could not be built.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The request body could not be encoded.
    #[error("invalid body: {0}")]
    InvalidBody(String),

    /// The client-side deadline fired.
    #[error("request timed out after {timeout_ms}ms")]
    Timeout {
        /// The deadline in milliseconds.
        timeout_ms: u64,
    },

    /// DNS resolution failed.
    #[error("DNS resolution failed for {host}: {message}")]
    Dns {
        /// Host that failed to resolve.
        host: String,
        /// Resolver error.
        message: String,
    },

    /// The connection was refused.
    #[error("connection refused: {host}:{port}")]
    ConnectionRefused {
        /// Target host.
        host: String,
        /// Target port.
        port: u16,
    },

    /// The connection failed for another network reason.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Anything else (TLS, protocol, body read).
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Maps the error to the failure kind the classifier understands.
    ///
    /// Returns `None` when the request never left the client.
    #[must_use]
    pub const fn failure_kind(&self) -> Option<TransportFailureKind> {
        match self {
            Self::InvalidUrl(_) | Self::InvalidBody(_) => None,
            Self::Timeout { .. } => Some(TransportFailureKind::Timeout),
            Self::Dns { .. } => Some(TransportFailureKind::Dns),
            Self::ConnectionRefused { .. } => Some(TransportFailureKind::ConnectionRefused),
            Self::ConnectionFailed(_) => Some(TransportFailureKind::Network),
            Self::Other(_) => Some(TransportFailureKind::Other),
        }
    }
}

/// Port for sending requests to the backend.
///
/// Implementations resolve the request path against the API base URL,
/// attach `Authorization: Bearer <token>` when a token is given, and
/// return any response the server produced, including non-2xx ones.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends a request.
    ///
    /// # Errors
    ///
    /// Returns an error only if no response was received.
    async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<ApiResponse, TransportError>;
}

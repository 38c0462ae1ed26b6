//! Failure taxonomy for outbound requests.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::response::ApiResponse;

/// Category of a failed exchange. Closed and total: every failure maps to
/// exactly one member, with `Unknown` as the explicit catch-all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClassification {
    /// The client itself is offline.
    NoConnectivity,
    /// The backend refused the connection or the network path failed.
    BackendUnreachable,
    /// No response and no better explanation; typically name resolution.
    DnsFailure,
    /// The request exceeded its deadline.
    Timeout,
    /// 401.
    Unauthorized,
    /// 403.
    Forbidden,
    /// 500.
    ServerError,
    /// 400.
    ValidationError,
    /// Anything else.
    Unknown,
}

impl ErrorClassification {
    /// Returns true for failures where no response was received and the
    /// user is sent to an offline screen.
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(
            self,
            Self::NoConnectivity | Self::BackendUnreachable | Self::DnsFailure
        )
    }

    /// Returns a human-readable title for this classification.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::NoConnectivity => "No Network Connection",
            Self::BackendUnreachable => "Backend Unreachable",
            Self::DnsFailure => "DNS Resolution Failed",
            Self::Timeout => "Request Timeout",
            Self::Unauthorized => "Unauthorized",
            Self::Forbidden => "Permission Denied",
            Self::ServerError => "Server Error",
            Self::ValidationError => "Validation Error",
            Self::Unknown => "Unknown Error",
        }
    }
}

impl fmt::Display for ErrorClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Why no response was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportFailureKind {
    /// The client-side deadline fired.
    Timeout,
    /// The connection was actively refused.
    ConnectionRefused,
    /// The connection could not be established or dropped mid-flight.
    Network,
    /// The host name did not resolve.
    Dns,
    /// Any other failure before a response arrived (TLS, protocol).
    Other,
}

/// A failed exchange, as handed to the classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailedExchange {
    /// No response was received at all.
    NoResponse {
        /// What went wrong.
        kind: TransportFailureKind,
        /// Transport-level description for logs.
        message: String,
        /// Time spent before giving up.
        elapsed: Duration,
    },
    /// A non-2xx response, or one that arrived after the deadline.
    Response(ApiResponse),
}

impl FailedExchange {
    /// Time spent on the exchange.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        match self {
            Self::NoResponse { elapsed, .. } => *elapsed,
            Self::Response(response) => response.elapsed,
        }
    }

    /// The response, if one was received.
    #[must_use]
    pub const fn response(&self) -> Option<&ApiResponse> {
        match self {
            Self::NoResponse { .. } => None,
            Self::Response(response) => Some(response),
        }
    }
}

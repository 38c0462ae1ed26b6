//! Failure classification.

use std::time::Duration;

use fleetgate_domain::{ErrorClassification, FailedExchange, StatusCode, TransportFailureKind};

/// Maps a failed exchange to exactly one [`ErrorClassification`].
///
/// Rules, first match wins:
/// 1. No response: deadline overrun → `Timeout`; offline →
///    `NoConnectivity`; refused or network-level → `BackendUnreachable`;
///    anything else → `DnsFailure`.
/// 2. Response after the deadline → `Timeout`.
/// 3. Status: 401, 403, 400, 500 map to their members; the rest is `Unknown`.
///
/// The timeout check runs before the connectivity check so a deadline
/// overrun is never reported as an offline client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureClassifier {
    deadline: Duration,
}

impl FailureClassifier {
    /// Creates a classifier for the given request deadline.
    #[must_use]
    pub const fn new(deadline: Duration) -> Self {
        Self { deadline }
    }

    /// The configured deadline.
    #[must_use]
    pub const fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Classifies a failed exchange. `online` is the client's connectivity
    /// at the time of the failure.
    #[must_use]
    pub fn classify(&self, exchange: &FailedExchange, online: bool) -> ErrorClassification {
        let overran = exchange.elapsed() > self.deadline;

        match exchange {
            FailedExchange::NoResponse { kind, .. } => {
                if *kind == TransportFailureKind::Timeout || overran {
                    ErrorClassification::Timeout
                } else if !online {
                    ErrorClassification::NoConnectivity
                } else if matches!(
                    kind,
                    TransportFailureKind::ConnectionRefused | TransportFailureKind::Network
                ) {
                    ErrorClassification::BackendUnreachable
                } else {
                    ErrorClassification::DnsFailure
                }
            }
            FailedExchange::Response(_) if overran => ErrorClassification::Timeout,
            FailedExchange::Response(response) => match response.status {
                StatusCode::UNAUTHORIZED => ErrorClassification::Unauthorized,
                StatusCode::FORBIDDEN => ErrorClassification::Forbidden,
                StatusCode::BAD_REQUEST => ErrorClassification::ValidationError,
                StatusCode::INTERNAL_SERVER_ERROR => ErrorClassification::ServerError,
                _ => ErrorClassification::Unknown,
            },
        }
    }
}

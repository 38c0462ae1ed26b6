//! Navigation destinations for network failures.

use serde::{Deserialize, Serialize};

use crate::classification::ErrorClassification;

/// Screen the console is sent to when the backend cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationTarget {
    /// The client has no network connection.
    NoNetwork,
    /// The network works but the backend does not answer.
    BackendOffline,
}

impl NavigationTarget {
    /// Picks the destination for a network-level classification.
    #[must_use]
    pub const fn for_classification(classification: ErrorClassification) -> Option<Self> {
        match classification {
            ErrorClassification::NoConnectivity => Some(Self::NoNetwork),
            ErrorClassification::BackendUnreachable | ErrorClassification::DnsFailure => {
                Some(Self::BackendOffline)
            }
            _ => None,
        }
    }
}

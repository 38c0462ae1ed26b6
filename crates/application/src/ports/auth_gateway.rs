//! Authentication endpoint port

use async_trait::async_trait;
use fleetgate_domain::TokenPair;
use thiserror::Error;

/// Errors from the login and renewal endpoints.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthGatewayError {
    /// The endpoint did not answer within the deadline.
    #[error("token endpoint timed out")]
    Timeout,

    /// The endpoint answered with a non-2xx status.
    #[error("token endpoint rejected the request ({status}){}", message_suffix(.message))]
    Rejected {
        /// Status code.
        status: u16,
        /// Server-provided message, if any.
        message: Option<String>,
    },

    /// No response was received.
    #[error("network error: {0}")]
    Network(String),

    /// The endpoint URL could not be built from the settings.
    #[error("invalid token endpoint: {0}")]
    InvalidEndpoint(String),

    /// The success body did not contain a token pair.
    #[error("invalid token response: {0}")]
    InvalidResponse(String),
}

fn message_suffix(message: &Option<String>) -> String {
    message.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
}

/// Port for the backend's authentication endpoints.
///
/// Calls made through this port bypass the request pipeline: they carry no
/// bearer token and their failures never re-enter the refresh coordinator.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Exchanges user credentials for a token pair.
    ///
    /// # Errors
    ///
    /// Returns an error on any non-2xx answer or transport failure.
    async fn login(&self, email: &str, password: &str) -> Result<TokenPair, AuthGatewayError>;

    /// Exchanges a refresh token for a new token pair.
    ///
    /// # Errors
    ///
    /// Returns an error on any non-2xx answer or transport failure.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthGatewayError>;
}

//! Login and logout.

use std::sync::Arc;

use fleetgate_domain::{Credential, CredentialTier};
use thiserror::Error;
use tracing::{info, instrument, warn};

use super::CredentialStore;
use crate::ports::{AuthGateway, AuthGatewayError, StorageError};

/// Errors from [`SessionService`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// Email or password was empty.
    #[error("email and password are required")]
    MissingCredentials,

    /// The login endpoint failed.
    #[error(transparent)]
    Gateway(#[from] AuthGatewayError),

    /// The credential could not be persisted.
    #[error("failed to persist credential: {0}")]
    Storage(#[from] StorageError),
}

/// Starts and ends sessions.
///
/// Login goes straight to the gateway: a wrong password is a 401 that must
/// not trigger a token refresh.
pub struct SessionService {
    gateway: Arc<dyn AuthGateway>,
    credentials: Arc<CredentialStore>,
}

impl SessionService {
    /// Creates a new `SessionService`.
    #[must_use]
    pub fn new(gateway: Arc<dyn AuthGateway>, credentials: Arc<CredentialStore>) -> Self {
        Self {
            gateway,
            credentials,
        }
    }

    /// Logs in and stores the returned pair.
    ///
    /// `remember_me` selects the durable tier; otherwise the credential is
    /// kept in the ephemeral tier and any durable copy is cleared.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint rejects the login or the credential
    /// cannot be persisted. On a persistence error the credential is still
    /// active in memory.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<Credential, SessionError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(SessionError::MissingCredentials);
        }

        let pair = self.gateway.login(email, password).await.inspect_err(|e| {
            warn!(error = %e, "Login failed");
        })?;

        let credential = Credential::from_pair(pair, CredentialTier::from_remember_me(remember_me));
        self.credentials.set(credential.clone()).await?;

        info!(tier = %credential.tier, "Logged in");
        Ok(credential)
    }

    /// Clears the credential from memory and both tiers.
    ///
    /// # Errors
    ///
    /// Returns the first persistence error.
    pub async fn logout(&self) -> Result<(), SessionError> {
        if self.credentials.clear().await? {
            info!("Logged out");
        }
        Ok(())
    }

    /// Returns true if a credential is present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_present()
    }
}

//! Single-flight bearer-token renewal.
//!
//! Any number of requests may fail with 401 at the same time. The first one
//! to reach the coordinator while it is idle becomes the leader and performs
//! the one renewal call; every request that fails while the renewal is in
//! flight parks a [`PendingWaiter`] and is settled with the leader's outcome,
//! in arrival order.
//!
//! The idle → refreshing check-and-set happens inside a synchronous critical
//! section that never spans an `.await`, so no interleaving of tasks can
//! start a second renewal.

use std::collections::VecDeque;
use std::sync::Arc;

use fleetgate_domain::{ApiEvent, RequestDescriptor, RequestId};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, trace, warn};

use super::CredentialStore;
use crate::error::{ApiError, SessionExpiry};
use crate::events::EventDispatcher;
use crate::ports::AuthGateway;

/// Outcome delivered to every request waiting on a renewal.
type Outcome = Result<String, SessionExpiry>;

/// Whether a renewal is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshState {
    /// No renewal in flight.
    #[default]
    Idle,
    /// A renewal call is in flight.
    Refreshing,
}

/// A request parked until the in-flight renewal settles.
#[derive(Debug)]
struct PendingWaiter {
    request_id: RequestId,
    tx: oneshot::Sender<Outcome>,
}

#[derive(Debug, Default)]
struct Inner {
    state: RefreshState,
    waiters: VecDeque<PendingWaiter>,
}

/// What a caller of `handle_unauthorized` has to do.
enum Role {
    /// Perform the renewal.
    Leader,
    /// Wait for the leader.
    Waiter(oneshot::Receiver<Outcome>),
    /// The credential changed since the request was sent; retry with it.
    Reuse(String),
}

/// Coordinates token renewal for every request in the process.
pub struct RefreshCoordinator {
    inner: Mutex<Inner>,
    credentials: Arc<CredentialStore>,
    gateway: Arc<dyn AuthGateway>,
    events: EventDispatcher,
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("RefreshCoordinator")
            .field("state", &inner.state)
            .field("waiters", &inner.waiters.len())
            .finish_non_exhaustive()
    }
}

impl RefreshCoordinator {
    /// Creates an idle coordinator.
    #[must_use]
    pub fn new(
        credentials: Arc<CredentialStore>,
        gateway: Arc<dyn AuthGateway>,
        events: EventDispatcher,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            credentials,
            gateway,
            events,
        }
    }

    /// The credential store this coordinator renews into.
    #[must_use]
    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    /// The dispatcher `session-expired` is published on.
    #[must_use]
    pub const fn events(&self) -> &EventDispatcher {
        &self.events
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> RefreshState {
        self.inner.lock().state
    }

    /// Number of requests parked on the in-flight renewal.
    #[must_use]
    pub fn pending_waiters(&self) -> usize {
        self.inner.lock().waiters.len()
    }

    /// Handles a 401 for `descriptor` and returns the access token to retry
    /// it with.
    ///
    /// A descriptor that was already retried is not retried again: the
    /// session is ended instead.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::SessionExpired` when no token can be obtained.
    #[instrument(skip_all, fields(request_id = %descriptor.id()))]
    pub async fn handle_unauthorized(&self, descriptor: &RequestDescriptor) -> Result<String, ApiError> {
        if descriptor.is_retried() {
            warn!("Request rejected again after a token refresh");
            return Err(self.expire_after_retry().await);
        }

        match self.claim(descriptor) {
            Role::Reuse(token) => {
                debug!("Credential already renewed since dispatch, reusing it");
                Ok(token)
            }
            Role::Waiter(rx) => {
                debug!("Renewal in flight, waiting");
                match rx.await {
                    Ok(outcome) => outcome.map_err(ApiError::SessionExpired),
                    Err(_) => Err(ApiError::SessionExpired(SessionExpiry::Abandoned)),
                }
            }
            Role::Leader => {
                let mut guard = SettleGuard {
                    coordinator: self,
                    settled: false,
                };
                let outcome = self.renew(descriptor.bearer().is_some()).await;
                guard.settle(outcome.clone());
                outcome.map_err(ApiError::SessionExpired)
            }
        }
    }

    /// Decides the caller's role. Runs entirely under the state lock.
    fn claim(&self, descriptor: &RequestDescriptor) -> Role {
        let mut inner = self.inner.lock();
        match inner.state {
            RefreshState::Refreshing => {
                let (tx, rx) = oneshot::channel();
                inner.waiters.push_back(PendingWaiter {
                    request_id: descriptor.id(),
                    tx,
                });
                trace!(waiters = inner.waiters.len(), "Queued behind renewal");
                Role::Waiter(rx)
            }
            RefreshState::Idle => {
                let renewed_since_dispatch = self
                    .credentials
                    .access_token()
                    .filter(|current| descriptor.bearer() != Some(current.as_str()));
                if let Some(current) = renewed_since_dispatch {
                    return Role::Reuse(current);
                }
                inner.state = RefreshState::Refreshing;
                Role::Leader
            }
        }
    }

    /// Performs the renewal call and updates the credential store.
    ///
    /// `sent_authenticated` tells whether the failing request carried a
    /// bearer token.
    async fn renew(&self, sent_authenticated: bool) -> Outcome {
        let (credential, generation) = self.credentials.snapshot();
        let refresh_token = credential
            .as_ref()
            .and_then(|c| c.refresh_token.clone())
            .filter(|t| !t.is_empty());

        let (Some(credential), Some(refresh_token)) = (credential, refresh_token) else {
            warn!("No refresh token stored, ending session");
            self.end_session(sent_authenticated).await;
            return Err(SessionExpiry::MissingRefreshToken);
        };

        info!(tier = %credential.tier, "Renewing access token");
        match self.gateway.refresh(&refresh_token).await {
            Ok(pair) => {
                let renewed = credential.renewed(pair);
                let access_token = renewed.access_token.clone();
                match self.credentials.set_if_unchanged(renewed, generation).await {
                    Ok(true) => {}
                    Ok(false) => return self.superseded(),
                    Err(e) => warn!(error = %e, "Renewed credential is in memory only"),
                }
                info!("Access token renewed");
                Ok(access_token)
            }
            Err(e) => {
                warn!(error = %e, "Token renewal failed, ending session");
                self.end_session(true).await;
                Err(SessionExpiry::RenewalFailed(e.to_string()))
            }
        }
    }

    /// The store was cleared or replaced while the renewal was in flight.
    /// A fresh login wins; an ended session stays ended.
    fn superseded(&self) -> Outcome {
        match self.credentials.access_token() {
            Some(current) => {
                debug!("Credential replaced during renewal, discarding renewed token");
                Ok(current)
            }
            None => {
                warn!("Session ended during renewal, discarding renewed token");
                Err(SessionExpiry::Ended)
            }
        }
    }

    /// Resolves or rejects every waiter with `outcome` and returns to idle.
    fn settle(&self, outcome: &Outcome) {
        let waiters = {
            let mut inner = self.inner.lock();
            inner.state = RefreshState::Idle;
            std::mem::take(&mut inner.waiters)
        };

        debug!(waiters = waiters.len(), renewed = outcome.is_ok(), "Renewal settled");
        for waiter in waiters {
            if waiter.tx.send(outcome.clone()).is_err() {
                trace!(request_id = %waiter.request_id, "Waiter went away before settlement");
            }
        }
    }

    /// Clears the store and announces the expiry.
    ///
    /// An authenticated request that finds the store already empty stays
    /// silent: whoever emptied it already announced it.
    async fn end_session(&self, sent_authenticated: bool) {
        match self.credentials.clear().await {
            Ok(false) if sent_authenticated => debug!("Session already ended"),
            Ok(_) => {
                self.events.emit(&ApiEvent::SessionExpired);
            }
            Err(e) => {
                warn!(error = %e, "Failed to clear credentials");
                self.events.emit(&ApiEvent::SessionExpired);
            }
        }
    }

    /// Ends the session after a retried request was rejected again.
    ///
    /// Several retried requests can fail together; only the one that
    /// actually removes the credential announces the expiry.
    async fn expire_after_retry(&self) -> ApiError {
        match self.credentials.clear().await {
            Ok(true) => {
                self.events.emit(&ApiEvent::SessionExpired);
            }
            Ok(false) => debug!("Session already ended"),
            Err(e) => {
                warn!(error = %e, "Failed to clear credentials");
                self.events.emit(&ApiEvent::SessionExpired);
            }
        }
        ApiError::SessionExpired(SessionExpiry::RetryRejected)
    }
}

/// Settles the waiters even if the leader's future is dropped mid-renewal.
struct SettleGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl SettleGuard<'_> {
    fn settle(&mut self, outcome: Outcome) {
        self.settled = true;
        self.coordinator.settle(&outcome);
    }
}

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("Renewal dropped before it settled");
            self.coordinator.settle(&Err(SessionExpiry::Abandoned));
        }
    }
}

//! Credential store with tiered persistence.
//!
//! The store is the single source of truth for the active [`Credential`].
//! Readers get an in-memory snapshot that is swapped in one step; writers are
//! serialized and persist the pair into exactly one backing store, chosen by
//! the credential's tier, while clearing the other.
//!
//! Every replacement bumps a generation counter. A writer that read the store
//! before a slow operation can use [`CredentialStore::set_if_unchanged`] to
//! avoid resurrecting a session that was ended or replaced meanwhile.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use fleetgate_domain::{AUTH_TOKEN_KEY, Credential, CredentialTier, REFRESH_TOKEN_KEY};
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::ports::{CredentialBackend, StorageError};

/// Thread-safe credential store over a durable and an ephemeral backend.
pub struct CredentialStore {
    current: RwLock<Option<Credential>>,
    /// Bumped under the `current` write lock on every replacement.
    generation: AtomicU64,
    durable: Arc<dyn CredentialBackend>,
    ephemeral: Arc<dyn CredentialBackend>,
    /// Serializes persistence so two writers never interleave their keys.
    writes: Mutex<()>,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("current", &*self.current.read())
            .finish_non_exhaustive()
    }
}

impl CredentialStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(durable: Arc<dyn CredentialBackend>, ephemeral: Arc<dyn CredentialBackend>) -> Self {
        Self {
            current: RwLock::new(None),
            generation: AtomicU64::new(0),
            durable,
            ephemeral,
            writes: Mutex::new(()),
        }
    }

    /// Creates a store hydrated from whatever the backends hold.
    ///
    /// The ephemeral tier is checked first: a live session wins over a
    /// remembered one.
    ///
    /// # Errors
    ///
    /// Returns an error if a backend cannot be read.
    pub async fn restore(
        durable: Arc<dyn CredentialBackend>,
        ephemeral: Arc<dyn CredentialBackend>,
    ) -> Result<Self, StorageError> {
        let store = Self::new(durable, ephemeral);

        for tier in [CredentialTier::Ephemeral, CredentialTier::Durable] {
            let backend = store.backend(tier);
            let Some(access_token) = backend.get(AUTH_TOKEN_KEY).await? else {
                continue;
            };
            let refresh_token = backend.get(REFRESH_TOKEN_KEY).await?;

            debug!(%tier, has_refresh_token = refresh_token.is_some(), "Restored credential");
            *store.current.write() = Some(Credential {
                access_token,
                refresh_token,
                tier,
            });
            break;
        }

        Ok(store)
    }

    /// Returns the active credential, if any.
    #[must_use]
    pub fn get(&self) -> Option<Credential> {
        self.current.read().clone()
    }

    /// Returns the active credential together with the generation it
    /// belongs to.
    #[must_use]
    pub fn snapshot(&self) -> (Option<Credential>, u64) {
        let current = self.current.read();
        (current.clone(), self.generation.load(Ordering::Acquire))
    }

    /// Returns the active access token, if any.
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.current.read().as_ref().map(|c| c.access_token.clone())
    }

    /// Returns true if a credential is present.
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.current.read().is_some()
    }

    /// Replaces the active credential.
    ///
    /// The in-memory snapshot is swapped before persistence starts, so a
    /// renewed token is usable even if the disk write fails.
    ///
    /// # Errors
    ///
    /// Returns the first persistence error.
    pub async fn set(&self, credential: Credential) -> Result<(), StorageError> {
        let _guard = self.writes.lock().await;
        self.store(credential).await
    }

    /// Replaces the active credential only if nothing replaced or cleared it
    /// since `generation` was read through [`CredentialStore::snapshot`].
    ///
    /// Returns whether the credential was stored.
    ///
    /// # Errors
    ///
    /// Returns the first persistence error.
    pub async fn set_if_unchanged(
        &self,
        credential: Credential,
        generation: u64,
    ) -> Result<bool, StorageError> {
        let _guard = self.writes.lock().await;
        if self.generation.load(Ordering::Acquire) != generation {
            debug!(generation, "Store changed since snapshot, not storing");
            return Ok(false);
        }
        self.store(credential).await?;
        Ok(true)
    }

    /// Caller holds `writes`.
    async fn store(&self, credential: Credential) -> Result<(), StorageError> {
        let tier = credential.tier;
        self.replace(Some(credential.clone()));

        let selected = self.backend(tier);
        selected.set(AUTH_TOKEN_KEY, &credential.access_token).await?;
        match credential.refresh_token.as_deref() {
            Some(refresh_token) => selected.set(REFRESH_TOKEN_KEY, refresh_token).await?,
            None => selected.remove(REFRESH_TOKEN_KEY).await?,
        }

        let other = self.backend(tier.other());
        other.remove(AUTH_TOKEN_KEY).await?;
        other.remove(REFRESH_TOKEN_KEY).await?;

        debug!(%tier, "Stored credential");
        Ok(())
    }

    /// Removes the credential from memory and from both backends.
    ///
    /// Every key removal is attempted even if an earlier one fails.
    /// Returns whether a credential was present.
    ///
    /// # Errors
    ///
    /// Returns the first persistence error.
    pub async fn clear(&self) -> Result<bool, StorageError> {
        let _guard = self.writes.lock().await;

        let had_credential = self.replace(None).is_some();

        let mut first_error = None;
        for backend in [&self.durable, &self.ephemeral] {
            for key in [AUTH_TOKEN_KEY, REFRESH_TOKEN_KEY] {
                if let Err(e) = backend.remove(key).await {
                    warn!(key, error = %e, "Failed to remove credential key");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                debug!(had_credential, "Cleared credentials");
                Ok(had_credential)
            }
        }
    }

    fn replace(&self, credential: Option<Credential>) -> Option<Credential> {
        let mut current = self.current.write();
        self.generation.fetch_add(1, Ordering::AcqRel);
        std::mem::replace(&mut *current, credential)
    }

    fn backend(&self, tier: CredentialTier) -> &dyn CredentialBackend {
        match tier {
            CredentialTier::Durable => self.durable.as_ref(),
            CredentialTier::Ephemeral => self.ephemeral.as_ref(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::test_support::MemoryBackend;
    use fleetgate_domain::TokenPair;
    use pretty_assertions::assert_eq;

    fn backends() -> (Arc<MemoryBackend>, Arc<MemoryBackend>) {
        (Arc::new(MemoryBackend::default()), Arc::new(MemoryBackend::default()))
    }

    #[tokio::test]
    async fn test_set_writes_only_selected_tier() {
        let (durable, ephemeral) = backends();
        let store = CredentialStore::new(durable.clone(), ephemeral.clone());

        store
            .set(Credential::from_pair(TokenPair::new("T1", "R1"), CredentialTier::Durable))
            .await
            .unwrap();

        assert_eq!(durable.value(AUTH_TOKEN_KEY).as_deref(), Some("T1"));
        assert_eq!(durable.value(REFRESH_TOKEN_KEY).as_deref(), Some("R1"));
        assert!(ephemeral.is_empty());
        assert_eq!(store.access_token().as_deref(), Some("T1"));
    }

    #[tokio::test]
    async fn test_switching_tier_clears_the_other_store() {
        let (durable, ephemeral) = backends();
        let store = CredentialStore::new(durable.clone(), ephemeral.clone());

        store
            .set(Credential::from_pair(TokenPair::new("T1", "R1"), CredentialTier::Durable))
            .await
            .unwrap();
        store
            .set(Credential::from_pair(TokenPair::new("T2", "R2"), CredentialTier::Ephemeral))
            .await
            .unwrap();

        assert!(durable.is_empty());
        assert_eq!(ephemeral.value(AUTH_TOKEN_KEY).as_deref(), Some("T2"));
        assert_eq!(store.get().unwrap().tier, CredentialTier::Ephemeral);
    }

    #[tokio::test]
    async fn test_access_only_credential_removes_stale_refresh_token() {
        let (durable, ephemeral) = backends();
        let store = CredentialStore::new(durable.clone(), ephemeral.clone());

        store
            .set(Credential::from_pair(TokenPair::new("T1", "R1"), CredentialTier::Durable))
            .await
            .unwrap();
        store
            .set(Credential::access_only("T2", CredentialTier::Durable))
            .await
            .unwrap();

        assert_eq!(durable.value(AUTH_TOKEN_KEY).as_deref(), Some("T2"));
        assert_eq!(durable.value(REFRESH_TOKEN_KEY), None);
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let (durable, ephemeral) = backends();
        durable.insert(AUTH_TOKEN_KEY, "stale");
        let store = CredentialStore::new(durable.clone(), ephemeral.clone());
        store
            .set(Credential::from_pair(TokenPair::new("T1", "R1"), CredentialTier::Ephemeral))
            .await
            .unwrap();

        assert!(store.clear().await.unwrap());
        assert!(store.get().is_none());
        assert!(durable.is_empty());
        assert!(ephemeral.is_empty());

        assert!(!store.clear().await.unwrap());
    }

    #[tokio::test]
    async fn test_restore_prefers_ephemeral() {
        let (durable, ephemeral) = backends();
        durable.insert(AUTH_TOKEN_KEY, "remembered");
        durable.insert(REFRESH_TOKEN_KEY, "R-remembered");
        ephemeral.insert(AUTH_TOKEN_KEY, "live");

        let store = CredentialStore::restore(durable, ephemeral).await.unwrap();
        let credential = store.get().expect("credential restored");

        assert_eq!(credential.access_token, "live");
        assert_eq!(credential.tier, CredentialTier::Ephemeral);
        assert_eq!(credential.refresh_token, None);
    }

    #[tokio::test]
    async fn test_restore_durable_pair() {
        let (durable, ephemeral) = backends();
        durable.insert(AUTH_TOKEN_KEY, "T1");
        durable.insert(REFRESH_TOKEN_KEY, "R1");

        let store = CredentialStore::restore(durable, ephemeral).await.unwrap();
        let credential = store.get().unwrap();

        assert_eq!(credential.tier, CredentialTier::Durable);
        assert!(credential.can_refresh());
    }

    #[tokio::test]
    async fn test_restore_empty() {
        let (durable, ephemeral) = backends();
        let store = CredentialStore::restore(durable, ephemeral).await.unwrap();
        assert!(!store.is_present());
    }

    #[tokio::test]
    async fn test_set_if_unchanged_refuses_after_clear() {
        let (durable, ephemeral) = backends();
        let store = CredentialStore::new(durable.clone(), ephemeral);
        store
            .set(Credential::from_pair(TokenPair::new("T1", "R1"), CredentialTier::Durable))
            .await
            .unwrap();

        let (_, generation) = store.snapshot();
        assert!(store.clear().await.unwrap());

        let stored = store
            .set_if_unchanged(
                Credential::from_pair(TokenPair::new("T2", "R2"), CredentialTier::Durable),
                generation,
            )
            .await
            .unwrap();

        assert!(!stored);
        assert!(!store.is_present());
        assert!(durable.is_empty());
    }

    #[tokio::test]
    async fn test_set_if_unchanged_stores_when_untouched() {
        let (durable, ephemeral) = backends();
        let store = CredentialStore::new(durable.clone(), ephemeral);
        store
            .set(Credential::from_pair(TokenPair::new("T1", "R1"), CredentialTier::Durable))
            .await
            .unwrap();

        let (_, generation) = store.snapshot();
        let stored = store
            .set_if_unchanged(
                Credential::from_pair(TokenPair::new("T2", "R2"), CredentialTier::Durable),
                generation,
            )
            .await
            .unwrap();

        assert!(stored);
        assert_eq!(durable.value(AUTH_TOKEN_KEY).as_deref(), Some("T2"));
        assert_ne!(store.snapshot().1, generation);
    }
}

//! Process-lifetime credential backend.

use std::collections::HashMap;

use async_trait::async_trait;
use fleetgate_application::ports::{CredentialBackend, StorageError};
use parking_lot::RwLock;

/// Key/value store that lives as long as the process.
///
/// Used for the ephemeral tier: the session ends with the process the way a
/// browser's session storage ends with the tab.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

#[async_trait]
impl CredentialBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_remove() {
        let backend = MemoryBackend::new();
        backend.set("auth_token", "T1").await.unwrap();

        assert_eq!(backend.get("auth_token").await.unwrap().as_deref(), Some("T1"));
        assert_eq!(backend.len(), 1);

        backend.remove("auth_token").await.unwrap();
        backend.remove("never-set").await.unwrap();
        assert!(backend.is_empty());
    }
}

//! Credential backing-store port
//!
//! A backing store is a flat string key/value store, like a browser's
//! `localStorage` (durable) or `sessionStorage` (ephemeral). The
//! `CredentialStore` owns two of them and decides which one to write.

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur in a backing store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The store has no usable location (e.g. no data directory).
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Key/value persistence for one credential tier.
#[async_trait]
pub trait CredentialBackend: Send + Sync {
    /// Reads a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Writes a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes a value. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

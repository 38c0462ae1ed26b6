//! Durable credential backend.
//!
//! Keys are stored in one JSON object in the platform data directory:
//! - Linux: ~/.local/share/fleetgate/credentials.json
//! - macOS: ~/Library/Application Support/fleetgate/credentials.json
//! - Windows: %APPDATA%/fleetgate/credentials.json

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fleetgate_application::ports::{CredentialBackend, StorageError};
use fleetgate_domain::ClientSettings;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::serialization::{from_json_bytes, to_json_stable_bytes};

const FILE_NAME: &str = "credentials.json";

/// JSON file holding the durable tier.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    /// Serializes read-modify-write cycles.
    lock: Mutex<()>,
}

impl FileBackend {
    /// Stores credentials in `dir/credentials.json`.
    #[must_use]
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(FILE_NAME),
            lock: Mutex::new(()),
        }
    }

    /// Uses `storage_dir` from the settings, or the platform data directory.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Unavailable` if no directory can be determined.
    pub fn from_settings(settings: &ClientSettings) -> Result<Self, StorageError> {
        match &settings.storage_dir {
            Some(dir) => Ok(Self::in_dir(dir)),
            None => Self::default_dir()
                .map(Self::in_dir)
                .ok_or_else(|| StorageError::Unavailable("no platform data directory".to_string())),
        }
    }

    /// The platform data directory for the client.
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|p| p.join("fleetgate"))
    }

    /// Path of the credential file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let content = match fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        from_json_bytes(&content).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn save(&self, values: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if values.is_empty() {
            return match fs::remove_file(&self.path).await {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            };
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content =
            to_json_stable_bytes(values).map_err(|e| StorageError::Serialization(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        write_private(&tmp, &content).await?;
        fs::rename(&tmp, &self.path).await?;

        debug!(path = %self.path.display(), keys = values.len(), "Saved credential file");
        Ok(())
    }
}

/// Writes `content` to a new file that only the owner can read.
///
/// A leftover file at `path` is removed first so the mode applies at
/// creation and the tokens are never readable by others.
async fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    match fs::remove_file(path).await {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e),
        _ => {}
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(content).await?;
    file.sync_all().await
}

#[async_trait]
impl CredentialBackend for FileBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut values = self.load().await?;
        values.insert(key.to_string(), value.to_string());
        self.save(&values).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut values = self.load().await?;
        if values.remove(key).is_none() {
            return Ok(());
        }
        self.save(&values).await
    }
}

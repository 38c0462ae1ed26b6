//! Settings loading.
//!
//! Sources, lowest priority first:
//! 1. Built-in defaults
//! 2. A configuration file (TOML, JSON or YAML, chosen by extension)
//! 3. `FLEETGATE_*` environment variables, `__` separating nested keys
//!    (`FLEETGATE_ROUTES__NO_NETWORK=/offline`)

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, Map};
use fleetgate_domain::{ClientSettings, DomainError};
use thiserror::Error;
use tracing::debug;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "FLEETGATE";

/// Errors that can occur while loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or did not match the settings shape.
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// The merged settings are invalid.
    #[error("invalid configuration: {0}")]
    Invalid(#[from] DomainError),
}

/// Builds [`ClientSettings`] from a file and the environment.
#[derive(Debug, Clone)]
pub struct SettingsLoader {
    file: Option<PathBuf>,
    file_required: bool,
    env_source: Option<Map<String, String>>,
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsLoader {
    /// Loads from the default config file, if present, and the environment.
    #[must_use]
    pub fn new() -> Self {
        Self {
            file: Self::default_path(),
            file_required: false,
            env_source: None,
        }
    }

    /// Loads from `path`, which must exist.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self.file_required = true;
        self
    }

    /// Reads environment overrides from `vars` instead of the process
    /// environment.
    #[must_use]
    pub fn with_env_source(mut self, vars: Map<String, String>) -> Self {
        self.env_source = Some(vars);
        self
    }

    /// `<config dir>/fleetgate/config.toml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("fleetgate").join("config.toml"))
    }

    /// The file this loader reads, if any.
    #[must_use]
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Merges every source and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if a source is malformed, a required file is
    /// missing, or a value is out of range.
    pub fn load(&self) -> Result<ClientSettings, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = &self.file {
            debug!(path = %path.display(), required = self.file_required, "Reading configuration file");
            builder = builder.add_source(File::from(path.as_path()).required(self.file_required));
        }

        let mut environment = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true);
        if let Some(vars) = &self.env_source {
            environment = environment.source(Some(vars.clone()));
        }

        let settings: ClientSettings = builder.add_source(environment).build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tempfile::TempDir;

    fn no_env() -> Map<String, String> {
        Map::new()
    }

    /// A loader that ignores the user's config file and environment.
    fn isolated() -> SettingsLoader {
        SettingsLoader {
            file: None,
            file_required: false,
            env_source: Some(no_env()),
        }
    }

    fn env(pairs: &[(&str, &str)]) -> Map<String, String> {
        let mut vars = Map::new();
        for (key, value) in pairs {
            vars.insert((*key).to_string(), (*value).to_string());
        }
        vars
    }

    #[test]
    fn test_defaults_without_sources() {
        let dir = TempDir::new().unwrap();
        let loader = SettingsLoader {
            file: Some(dir.path().join("absent.toml")),
            file_required: false,
            env_source: Some(no_env()),
        };

        assert_eq!(loader.load().unwrap(), ClientSettings::default());
    }

    #[test]
    fn test_file_then_environment() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fleetgate.toml");
        std::fs::write(
            &path,
            "base_url = \"https://fleet.example.com/api\"\n\
             request_timeout_ms = 5000\n\
             \n\
             [routes]\n\
             no_network = \"/offline\"\n",
        )
        .unwrap();

        let settings = isolated()
            .with_file(&path)
            .with_env_source(env(&[
                ("FLEETGATE_REQUEST_TIMEOUT_MS", "1500"),
                ("FLEETGATE_ROUTES__BACKEND_OFFLINE", "/maintenance"),
            ]))
            .load()
            .unwrap();

        assert_eq!(settings.base_url, "https://fleet.example.com/api");
        assert_eq!(settings.request_timeout(), Duration::from_millis(1500));
        assert_eq!(settings.routes.no_network, "/offline");
        assert_eq!(settings.routes.backend_offline, "/maintenance");
        assert_eq!(settings.refresh_path, "/auth/refresh");
    }

    #[test]
    fn test_required_file_must_exist() {
        let dir = TempDir::new().unwrap();
        let err = isolated()
            .with_file(dir.path().join("missing.toml"))
            .load()
            .unwrap_err();

        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = isolated()
            .with_env_source(env(&[("FLEETGATE_REQUEST_TIMEOUT_MS", "0")]))
            .load()
            .unwrap_err();

        assert!(matches!(
            err,
            ConfigError::Invalid(DomainError::InvalidSetting {
                field: "request_timeout_ms",
                ..
            })
        ));

        let err = isolated()
            .with_env_source(env(&[("FLEETGATE_BASE_URL", "ftp://fleet.example.com")]))
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(DomainError::InvalidUrl(_))));
    }
}

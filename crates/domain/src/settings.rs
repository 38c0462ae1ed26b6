//! Client settings for the API access layer.
//!
//! Every field has a default so a partial configuration file (or none at
//! all) still yields a usable client.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{DomainError, DomainResult};
use crate::navigation::NavigationTarget;

/// Routes the console navigates to on network failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteSettings {
    /// Shown when the client is offline.
    pub no_network: String,
    /// Shown when the backend cannot be reached.
    pub backend_offline: String,
}

impl Default for RouteSettings {
    fn default() -> Self {
        Self {
            no_network: "/no-network".to_string(),
            backend_offline: "/backend-offline".to_string(),
        }
    }
}

impl RouteSettings {
    /// Returns the route for a navigation target.
    #[must_use]
    pub fn route_for(&self, target: NavigationTarget) -> &str {
        match target {
            NavigationTarget::NoNetwork => &self.no_network,
            NavigationTarget::BackendOffline => &self.backend_offline,
        }
    }
}

/// Settings for the API client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Base URL every request path is appended to.
    pub base_url: String,
    /// Per-request deadline in milliseconds.
    pub request_timeout_ms: u64,
    /// Renewal endpoint, relative to `base_url`.
    pub refresh_path: String,
    /// Login endpoint, relative to `base_url`.
    pub login_path: String,
    /// User-Agent header value.
    pub user_agent: String,
    /// Directory for the durable credential file. Platform data dir if unset.
    pub storage_dir: Option<PathBuf>,
    /// Tracing filter directive used when `RUST_LOG` is not set.
    pub log_filter: String,
    /// Failure screens.
    pub routes: RouteSettings,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            request_timeout_ms: 30_000,
            refresh_path: "/auth/refresh".to_string(),
            login_path: "/auth/login".to_string(),
            user_agent: concat!("fleetgate/", env!("CARGO_PKG_VERSION")).to_string(),
            storage_dir: None,
            log_filter: "info".to_string(),
            routes: RouteSettings::default(),
        }
    }
}

impl ClientSettings {
    /// Parses the base URL.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl` if the base URL does not parse or is not http(s).
    pub fn base_url(&self) -> DomainResult<Url> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| DomainError::InvalidUrl(format!("{e}: {}", self.base_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(DomainError::InvalidUrl(format!(
                "base URL must use http or https: {}",
                self.base_url
            )));
        }
        Ok(url)
    }

    /// Per-request deadline.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Checks every field that can be wrong.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn validate(&self) -> DomainResult<()> {
        self.base_url()?;

        if self.request_timeout_ms == 0 {
            return Err(DomainError::InvalidSetting {
                field: "request_timeout_ms",
                message: "must be greater than zero".to_string(),
            });
        }

        for (field, path) in [
            ("refresh_path", &self.refresh_path),
            ("login_path", &self.login_path),
            ("routes.no_network", &self.routes.no_network),
            ("routes.backend_offline", &self.routes.backend_offline),
        ] {
            if !path.starts_with('/') {
                return Err(DomainError::InvalidSetting {
                    field,
                    message: format!("must start with '/': {path}"),
                });
            }
        }

        Ok(())
    }
}

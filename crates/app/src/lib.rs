//! Fleetgate - composition root
//!
//! Wires the reqwest adapters, the credential backends and the host
//! environment adapters into one [`FleetClient`].

use std::sync::Arc;

use anyhow::Context;
use fleetgate_application::{
    ApiResult, CredentialBackend, CredentialStore, EventDispatcher, RefreshCoordinator,
    RequestPipeline, SessionService,
};
use fleetgate_domain::{ApiEvent, ApiRequest, ApiResponse, ClientSettings};
use fleetgate_infrastructure::{
    ConnectivityMonitor, FileBackend, MemoryBackend, ReqwestAuthGateway, ReqwestTransport,
    RouteHistory, build_client,
};
use tracing::{error, info, warn};

/// A fully wired API client.
pub struct FleetClient {
    settings: ClientSettings,
    pipeline: Arc<RequestPipeline>,
    session: SessionService,
    connectivity: Arc<ConnectivityMonitor>,
    router: Arc<RouteHistory>,
}

impl std::fmt::Debug for FleetClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FleetClient")
            .field("base_url", &self.settings.base_url)
            .field("authenticated", &self.session.is_authenticated())
            .finish_non_exhaustive()
    }
}

impl FleetClient {
    /// Builds a client with the durable tier on disk and the ephemeral tier
    /// in memory, restoring any stored credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid or stored credentials
    /// cannot be read.
    pub async fn connect(settings: ClientSettings) -> anyhow::Result<Self> {
        let durable = FileBackend::from_settings(&settings).context("no durable credential store")?;
        info!(path = %durable.path().display(), "Using durable credential file");
        Self::with_backends(settings, Arc::new(durable), Arc::new(MemoryBackend::new())).await
    }

    /// Builds a client over the given backends.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid or stored credentials
    /// cannot be read.
    pub async fn with_backends(
        settings: ClientSettings,
        durable: Arc<dyn CredentialBackend>,
        ephemeral: Arc<dyn CredentialBackend>,
    ) -> anyhow::Result<Self> {
        settings.validate().context("invalid settings")?;

        let http = build_client(&settings).context("failed to build HTTP client")?;
        let transport = Arc::new(ReqwestTransport::with_client(
            http.clone(),
            settings.base_url()?,
            settings.request_timeout(),
        ));
        let gateway = Arc::new(ReqwestAuthGateway::with_client(http, &settings)?);

        let credentials = Arc::new(
            CredentialStore::restore(durable, ephemeral)
                .await
                .context("failed to read stored credentials")?,
        );
        let events = EventDispatcher::new();
        let coordinator = Arc::new(RefreshCoordinator::new(
            Arc::clone(&credentials),
            gateway.clone(),
            events,
        ));

        let connectivity = Arc::new(ConnectivityMonitor::default());
        let router = Arc::new(RouteHistory::default());
        let pipeline = RequestPipeline::new(
            &settings,
            transport,
            coordinator,
            connectivity.clone(),
            router.clone(),
        )?;

        Ok(Self {
            session: SessionService::new(gateway, credentials),
            pipeline: Arc::new(pipeline),
            settings,
            connectivity,
            router,
        })
    }

    /// Sends a request through the pipeline.
    ///
    /// # Errors
    ///
    /// Returns the classified failure.
    pub async fn request(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        self.pipeline.execute(request).await
    }

    /// The shared pipeline, for concurrent callers.
    #[must_use]
    pub const fn pipeline(&self) -> &Arc<RequestPipeline> {
        &self.pipeline
    }

    /// Login and logout.
    #[must_use]
    pub const fn session(&self) -> &SessionService {
        &self.session
    }

    /// Events emitted by the pipeline.
    #[must_use]
    pub fn events(&self) -> &EventDispatcher {
        self.pipeline.events()
    }

    /// The online flag consulted on network failures.
    #[must_use]
    pub const fn connectivity(&self) -> &Arc<ConnectivityMonitor> {
        &self.connectivity
    }

    /// The router failure screens are shown on.
    #[must_use]
    pub const fn router(&self) -> &Arc<RouteHistory> {
        &self.router
    }

    /// The settings the client was built with.
    #[must_use]
    pub const fn settings(&self) -> &ClientSettings {
        &self.settings
    }
}

/// Logs every event at a level matching its severity.
pub fn log_event(event: &ApiEvent) {
    match event {
        ApiEvent::SessionExpired => warn!(event = event.name(), "Session expired, log in again"),
        ApiEvent::PermissionDenied { message, url } => {
            warn!(event = event.name(), %url, "{message}");
        }
        ApiEvent::ApiError { kind, message } => {
            error!(event = event.name(), kind = kind.as_str(), "{message}");
        }
    }
}

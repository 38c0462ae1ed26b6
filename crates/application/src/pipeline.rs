//! Request pipeline.
//!
//! Every backend call goes through [`RequestPipeline::execute`]:
//!
//! 1. The current access token, if any, is attached as a bearer token.
//! 2. The call is raced against the configured deadline.
//! 3. Any failure is classified exactly once, then handled:
//!    - network failures redirect to a failure screen,
//!    - 401 goes to the [`RefreshCoordinator`] and is retried once,
//!    - 403 on a mutating call, 400, 500 and timeouts emit an event,
//!    - everything else is returned unchanged.
//!
//! Successful responses are returned untouched.

use std::sync::Arc;

use fleetgate_domain::{
    ApiErrorKind, ApiEvent, ApiRequest, ApiResponse, ClientSettings, DomainResult,
    ErrorClassification, FailedExchange, NavigationTarget, RequestDescriptor, RouteSettings,
    StatusCode, TransportFailureKind,
};
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::auth::{CredentialStore, RefreshCoordinator};
use crate::classifier::FailureClassifier;
use crate::error::{ApiError, ApiResult, SessionExpiry};
use crate::events::EventDispatcher;
use crate::ports::{Connectivity, HttpTransport, Navigator};

/// Result of a single dispatch.
enum Dispatch {
    Success(ApiResponse),
    Failed(FailedExchange),
}

/// The resilient request path shared by every caller.
pub struct RequestPipeline {
    transport: Arc<dyn HttpTransport>,
    coordinator: Arc<RefreshCoordinator>,
    connectivity: Arc<dyn Connectivity>,
    navigator: Arc<dyn Navigator>,
    classifier: FailureClassifier,
    routes: RouteSettings,
    base_url: Url,
    /// Makes the "already there?" check and the navigation one step.
    redirect: Mutex<()>,
}

impl std::fmt::Debug for RequestPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPipeline")
            .field("base_url", &self.base_url.as_str())
            .field("deadline", &self.classifier.deadline())
            .finish_non_exhaustive()
    }
}

impl RequestPipeline {
    /// Creates a pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured base URL is invalid.
    pub fn new(
        settings: &ClientSettings,
        transport: Arc<dyn HttpTransport>,
        coordinator: Arc<RefreshCoordinator>,
        connectivity: Arc<dyn Connectivity>,
        navigator: Arc<dyn Navigator>,
    ) -> DomainResult<Self> {
        Ok(Self {
            transport,
            coordinator,
            connectivity,
            navigator,
            classifier: FailureClassifier::new(settings.request_timeout()),
            routes: settings.routes.clone(),
            base_url: settings.base_url()?,
            redirect: Mutex::new(()),
        })
    }

    /// The credential store requests are authenticated from.
    #[must_use]
    pub fn credentials(&self) -> &Arc<CredentialStore> {
        self.coordinator.credentials()
    }

    /// The dispatcher events are published on.
    #[must_use]
    pub fn events(&self) -> &EventDispatcher {
        self.coordinator.events()
    }

    /// The refresh coordinator.
    #[must_use]
    pub const fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    /// Sends a request and applies the failure policy.
    ///
    /// # Errors
    ///
    /// Returns the classified failure after its side effects have run.
    #[instrument(skip_all, fields(method = %request.method, path = %request.path))]
    pub async fn execute(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        request.validate()?;

        let mut descriptor = RequestDescriptor::new(request);
        let mut bearer = self.credentials().access_token();

        loop {
            descriptor = descriptor.sent_with(bearer.take());

            let exchange = match self.dispatch(&descriptor).await? {
                Dispatch::Success(response) => {
                    debug!(
                        request_id = %descriptor.id(),
                        status = response.status.as_u16(),
                        elapsed_ms = response.elapsed.as_millis(),
                        "Request succeeded"
                    );
                    return Ok(response);
                }
                Dispatch::Failed(exchange) => exchange,
            };

            let classification = self
                .classifier
                .classify(&exchange, self.connectivity.is_online());
            debug!(
                request_id = %descriptor.id(),
                ?classification,
                retried = descriptor.is_retried(),
                "Request failed"
            );

            if classification == ErrorClassification::Unauthorized {
                bearer = Some(self.coordinator.handle_unauthorized(&descriptor).await?);
                descriptor = descriptor.into_retried();
                continue;
            }

            return Err(self.react(classification, &descriptor, exchange));
        }
    }

    /// Sends `descriptor` once, bounded by the deadline.
    async fn dispatch(&self, descriptor: &RequestDescriptor) -> ApiResult<Dispatch> {
        let deadline = self.classifier.deadline();
        let started = Instant::now();
        let send = self.transport.send(descriptor.request(), descriptor.bearer());

        let exchange = match tokio::time::timeout(deadline, send).await {
            Err(_) => FailedExchange::NoResponse {
                kind: TransportFailureKind::Timeout,
                message: format!("no response within {}ms", deadline.as_millis()),
                elapsed: started.elapsed(),
            },
            Ok(Err(e)) => {
                let Some(kind) = e.failure_kind() else {
                    return Err(ApiError::Unsendable(e.to_string()));
                };
                FailedExchange::NoResponse {
                    kind,
                    message: e.to_string(),
                    elapsed: started.elapsed(),
                }
            }
            Ok(Ok(mut response)) => {
                response.elapsed = response.elapsed.max(started.elapsed());
                if response.is_success() && response.elapsed <= deadline {
                    return Ok(Dispatch::Success(response));
                }
                FailedExchange::Response(response)
            }
        };

        Ok(Dispatch::Failed(exchange))
    }

    /// Runs the side effects for a classified failure and builds the error.
    fn react(
        &self,
        classification: ErrorClassification,
        descriptor: &RequestDescriptor,
        exchange: FailedExchange,
    ) -> ApiError {
        let (transport_message, response) = match exchange {
            FailedExchange::NoResponse { message, .. } => (message, None),
            FailedExchange::Response(response) => (String::new(), Some(response)),
        };
        let server_message = response.as_ref().and_then(ApiResponse::server_message);

        match classification {
            ErrorClassification::NoConnectivity => {
                self.redirect_to(NavigationTarget::NoNetwork);
                ApiError::NoConnectivity
            }
            ErrorClassification::BackendUnreachable => {
                self.redirect_to(NavigationTarget::BackendOffline);
                ApiError::BackendUnreachable(transport_message)
            }
            ErrorClassification::DnsFailure => {
                self.redirect_to(NavigationTarget::BackendOffline);
                ApiError::DnsFailure(transport_message)
            }
            ErrorClassification::Timeout => {
                self.events().emit(&ApiEvent::api_error(ApiErrorKind::Timeout, None));
                ApiError::Timeout {
                    timeout: self.classifier.deadline(),
                }
            }
            ErrorClassification::Forbidden => {
                let message = server_message
                    .unwrap_or_else(|| ApiEvent::PERMISSION_DENIED_MESSAGE.to_string());
                if descriptor.request().method.is_read_only() {
                    debug!("Read rejected with 403, staying silent");
                } else {
                    warn!(request_id = %descriptor.id(), "Permission denied");
                    self.events().emit(&ApiEvent::PermissionDenied {
                        message: message.clone(),
                        url: self.request_url(descriptor.request()),
                    });
                }
                ApiError::Forbidden { message }
            }
            ErrorClassification::ValidationError => {
                let event = ApiEvent::api_error(ApiErrorKind::Validation, server_message);
                self.events().emit(&event);
                ApiError::Validation {
                    message: event_message(event),
                }
            }
            ErrorClassification::ServerError => {
                let event = ApiEvent::api_error(ApiErrorKind::Server, server_message);
                self.events().emit(&event);
                ApiError::Server {
                    status: response.map_or(StatusCode::INTERNAL_SERVER_ERROR, |r| r.status),
                    message: event_message(event),
                }
            }
            // Handled by the retry loop in `execute`.
            ErrorClassification::Unauthorized => ApiError::SessionExpired(SessionExpiry::RetryRejected),
            ErrorClassification::Unknown => match response {
                Some(response) => ApiError::Http {
                    status: response.status,
                    body: response.text(),
                },
                None => ApiError::Unsendable(transport_message),
            },
        }
    }

    /// Navigates to the failure screen unless the user is already there.
    fn redirect_to(&self, target: NavigationTarget) {
        let destination = self.routes.route_for(target);

        let _guard = self.redirect.lock();
        let current = self.navigator.current_route();
        if current == destination {
            debug!(route = destination, "Already on failure screen");
            return;
        }

        let on_failure_screen =
            current == self.routes.no_network || current == self.routes.backend_offline;
        if !on_failure_screen {
            self.navigator.save_return_route(&current);
        }

        info!(from = %current, to = destination, "Redirecting to failure screen");
        self.navigator.navigate(destination);
    }

    fn request_url(&self, request: &ApiRequest) -> String {
        request
            .url(&self.base_url)
            .map_or_else(|_| request.path.clone(), String::from)
    }
}

fn event_message(event: ApiEvent) -> String {
    match event {
        ApiEvent::ApiError { message, .. } | ApiEvent::PermissionDenied { message, .. } => message,
        ApiEvent::SessionExpired => String::new(),
    }
}

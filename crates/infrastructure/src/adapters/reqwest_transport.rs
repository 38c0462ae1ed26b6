//! HTTP transport implementation using reqwest.
//!
//! This adapter implements the `HttpTransport` port. It resolves request
//! paths against the API base URL, attaches the bearer token and returns
//! every response the server produced, successful or not.

use std::collections::HashMap;
use std::error::Error as _;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use fleetgate_application::ports::{HttpTransport, TransportError};
use fleetgate_domain::{ApiRequest, ApiResponse, ClientSettings, HttpMethod};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method};
use tracing::trace;
use url::Url;

/// Builds the reqwest client shared by the transport and the auth gateway.
///
/// Redirects are not followed: a redirect from the API is an answer, not
/// something to chase with the bearer token attached.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialised.
pub fn build_client(settings: &ClientSettings) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(settings.user_agent.as_str())
        .redirect(reqwest::redirect::Policy::none())
        .timeout(settings.request_timeout())
        .build()
}

/// HTTP transport over `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Creates a transport from settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the client cannot be
    /// built.
    pub fn new(settings: &ClientSettings) -> Result<Self, TransportError> {
        let base_url = settings
            .base_url()
            .map_err(|e| TransportError::InvalidUrl(e.to_string()))?;
        let client = build_client(settings).map_err(|e| TransportError::Other(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            timeout: settings.request_timeout(),
        })
    }

    /// Creates a transport around an existing client.
    #[must_use]
    pub const fn with_client(client: Client, base_url: Url, timeout: Duration) -> Self {
        Self {
            client,
            base_url,
            timeout,
        }
    }

    /// The API base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    const fn to_reqwest_method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

/// Maps reqwest errors to `TransportError`.
pub(crate) fn map_error(error: &reqwest::Error, timeout: Duration) -> TransportError {
    if error.is_timeout() {
        return TransportError::Timeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        };
    }

    let host = error
        .url()
        .and_then(Url::host_str)
        .unwrap_or("unknown")
        .to_string();

    if error.is_connect() {
        let message = error_chain(error);
        let lower = message.to_lowercase();
        if lower.contains("dns") || lower.contains("resolve") || lower.contains("lookup") {
            return TransportError::Dns { host, message };
        }
        if is_connection_refused(error) || lower.contains("refused") {
            return TransportError::ConnectionRefused {
                host,
                port: error
                    .url()
                    .and_then(Url::port_or_known_default)
                    .unwrap_or(80),
            };
        }
        return TransportError::ConnectionFailed(message);
    }

    if error.is_request() {
        return TransportError::ConnectionFailed(error_chain(error));
    }

    TransportError::Other(error_chain(error))
}

/// Joins an error and its sources; reqwest keeps the useful part in the chain.
fn error_chain(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn is_connection_refused(error: &reqwest::Error) -> bool {
    let mut source = error.source();
    while let Some(cause) = source {
        if cause
            .downcast_ref::<std::io::Error>()
            .is_some_and(|io| io.kind() == std::io::ErrorKind::ConnectionRefused)
        {
            return true;
        }
        source = cause.source();
    }
    false
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<ApiResponse, TransportError> {
        let url = request
            .url(&self.base_url)
            .map_err(|e| TransportError::InvalidUrl(e.to_string()))?;

        let start = Instant::now();

        let mut builder = self
            .client
            .request(Self::to_reqwest_method(request.method), url)
            .header(ACCEPT, "application/json");

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(token) = bearer {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| map_error(&e, self.timeout))?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("<binary>").to_string()))
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Other(format!("failed to read body: {}", error_chain(&e))))?
            .to_vec();

        let elapsed = start.elapsed();
        trace!(status, elapsed_ms = elapsed.as_millis(), "Response received");

        Ok(ApiResponse::new(status, headers, body, elapsed))
    }
}

//! Login and renewal endpoints over reqwest.
//!
//! These calls do not go through the request pipeline: they carry no bearer
//! token, and a 401 from them is a final answer.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use fleetgate_application::ports::{AuthGateway, AuthGatewayError, TransportError};
use fleetgate_domain::{ApiRequest, ApiResponse, ClientSettings, HttpMethod, TokenPair};
use reqwest::Client;
use serde_json::json;
use tracing::{debug, instrument};
use url::Url;

use crate::adapters::{build_client, map_error};

/// Token endpoints of the backend.
#[derive(Debug, Clone)]
pub struct ReqwestAuthGateway {
    client: Client,
    login_url: Url,
    refresh_url: Url,
    timeout: Duration,
}

impl ReqwestAuthGateway {
    /// Creates a gateway from settings.
    ///
    /// # Errors
    ///
    /// Returns an error if an endpoint URL is invalid or the client cannot
    /// be built.
    pub fn new(settings: &ClientSettings) -> Result<Self, AuthGatewayError> {
        let client = build_client(settings).map_err(|e| AuthGatewayError::Network(e.to_string()))?;
        Self::with_client(client, settings)
    }

    /// Creates a gateway around an existing client.
    ///
    /// # Errors
    ///
    /// Returns an error if an endpoint URL is invalid.
    pub fn with_client(client: Client, settings: &ClientSettings) -> Result<Self, AuthGatewayError> {
        let base = settings
            .base_url()
            .map_err(|e| AuthGatewayError::InvalidEndpoint(e.to_string()))?;
        let endpoint = |path: &str| {
            ApiRequest::new(HttpMethod::Post, path)
                .url(&base)
                .map_err(|e| AuthGatewayError::InvalidEndpoint(e.to_string()))
        };

        Ok(Self {
            login_url: endpoint(&settings.login_path)?,
            refresh_url: endpoint(&settings.refresh_path)?,
            client,
            timeout: settings.request_timeout(),
        })
    }

    async fn exchange(&self, url: &Url, body: serde_json::Value) -> Result<TokenPair, AuthGatewayError> {
        let response = self
            .client
            .post(url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| match map_error(&e, self.timeout) {
                TransportError::Timeout { .. } => AuthGatewayError::Timeout,
                other => AuthGatewayError::Network(other.to_string()),
            })?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| AuthGatewayError::Network(format!("failed to read body: {e}")))?;
        let response = ApiResponse::new(status, HashMap::new(), body.to_vec(), Duration::ZERO);

        if !response.is_success() {
            return Err(AuthGatewayError::Rejected {
                status,
                message: response.server_message(),
            });
        }

        response
            .json::<TokenPair>()
            .map_err(|e| AuthGatewayError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl AuthGateway for ReqwestAuthGateway {
    #[instrument(skip(self, password))]
    async fn login(&self, email: &str, password: &str) -> Result<TokenPair, AuthGatewayError> {
        let pair = self
            .exchange(&self.login_url, json!({ "email": email, "password": password }))
            .await?;
        debug!("Login endpoint issued a token pair");
        Ok(pair)
    }

    #[instrument(skip_all)]
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthGatewayError> {
        let pair = self
            .exchange(&self.refresh_url, json!({ "refreshToken": refresh_token }))
            .await?;
        debug!("Renewal endpoint issued a token pair");
        Ok(pair)
    }
}

//! Test doubles for the ports.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use fleetgate_domain::{ApiRequest, ApiResponse, TokenPair};
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::ports::{
    AuthGateway, AuthGatewayError, Connectivity, CredentialBackend, HttpTransport, Navigator,
    StorageError, TransportError,
};

/// Polls `condition` between scheduler yields until it holds.
pub async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..10_000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never became true");
}

/// In-memory key/value backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn value(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.values.lock().insert(key.to_string(), value.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }
}

#[async_trait]
impl CredentialBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.insert(key, value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values.lock().remove(key);
        Ok(())
    }
}

/// Token endpoint with a fixed answer.
#[derive(Debug)]
pub struct ScriptedGateway {
    outcome: Result<TokenPair, AuthGatewayError>,
    delay: Option<Duration>,
    gate: Option<Arc<Notify>>,
    refresh_calls: AtomicUsize,
    login_calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    fn with_outcome(outcome: Result<TokenPair, AuthGatewayError>) -> Self {
        Self {
            outcome,
            delay: None,
            gate: None,
            refresh_calls: AtomicUsize::new(0),
            login_calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Answers every call with the given pair.
    pub fn renewing(access_token: &str, refresh_token: &str) -> Self {
        Self::with_outcome(Ok(TokenPair::new(access_token, refresh_token)))
    }

    /// Rejects every call with the given status.
    pub fn rejecting(status: u16) -> Self {
        Self::with_outcome(Err(AuthGatewayError::Rejected {
            status,
            message: None,
        }))
    }

    /// Answers after `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Holds every refresh call until the gate is notified.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Notify::new()));
        self
    }

    pub fn gate(&self) -> Arc<Notify> {
        Arc::clone(self.gate.as_ref().expect("gateway is not gated"))
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_tokens_seen(&self) -> Vec<String> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl AuthGateway for ScriptedGateway {
    async fn login(&self, _email: &str, _password: &str) -> Result<TokenPair, AuthGatewayError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthGatewayError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(refresh_token.to_string());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.clone()
    }
}

type Responder = Box<dyn Fn(&ApiRequest, Option<&str>) -> Result<ApiResponse, TransportError> + Send + Sync>;

/// A call observed by [`ScriptedTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentRequest {
    pub path: String,
    pub bearer: Option<String>,
}

/// Transport that answers from a closure.
pub struct ScriptedTransport {
    responder: Responder,
    delay: Option<Duration>,
    sent: Mutex<Vec<SentRequest>>,
}

impl ScriptedTransport {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&ApiRequest, Option<&str>) -> Result<ApiResponse, TransportError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            delay: None,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Answers 200 to `valid` and 401 to anything else.
    pub fn accepting(valid: &str) -> Self {
        let valid = valid.to_string();
        Self::new(move |_, bearer| {
            let status = if bearer == Some(valid.as_str()) { 200 } else { 401 };
            Ok(ApiResponse::json_body(status, &serde_json::json!({ "ok": status == 200 })))
        })
    }

    /// Always answers with `status` and `body`.
    pub fn answering(status: u16, body: serde_json::Value) -> Self {
        Self::new(move |_, _| Ok(ApiResponse::json_body(status, &body)))
    }

    /// Always fails with `error`.
    pub fn failing(error: TransportError) -> Self {
        Self::new(move |_, _| Err(error.clone()))
    }

    /// Answers after `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn sent(&self) -> Vec<SentRequest> {
        self.sent.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<ApiResponse, TransportError> {
        self.sent.lock().push(SentRequest {
            path: request.path.clone(),
            bearer: bearer.map(str::to_string),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.responder)(request, bearer)
    }
}

/// Connectivity flag flipped by the test.
#[derive(Debug)]
pub struct StaticConnectivity(AtomicBool);

impl StaticConnectivity {
    pub const fn online() -> Self {
        Self(AtomicBool::new(true))
    }

    pub const fn offline() -> Self {
        Self(AtomicBool::new(false))
    }
}

impl Connectivity for StaticConnectivity {
    fn is_online(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
struct NavigatorState {
    current: String,
    navigations: Vec<String>,
    return_route: Option<String>,
}

/// Router that records every move.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    state: Mutex<NavigatorState>,
}

impl RecordingNavigator {
    pub fn at(route: &str) -> Self {
        Self {
            state: Mutex::new(NavigatorState {
                current: route.to_string(),
                ..NavigatorState::default()
            }),
        }
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().navigations.clone()
    }

    pub fn return_route(&self) -> Option<String> {
        self.state.lock().return_route.clone()
    }
}

impl Navigator for RecordingNavigator {
    fn current_route(&self) -> String {
        self.state.lock().current.clone()
    }

    fn navigate(&self, route: &str) {
        let mut state = self.state.lock();
        state.current = route.to_string();
        state.navigations.push(route.to_string());
    }

    fn save_return_route(&self, route: &str) {
        self.state.lock().return_route = Some(route.to_string());
    }
}

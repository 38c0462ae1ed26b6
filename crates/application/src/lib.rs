//! Fleetgate Application - Request pipeline, session handling and ports
//!
//! This crate defines the application layer with:
//! - Port traits (transport, token endpoint, storage, host environment)
//! - The request pipeline and its failure policy
//! - Single-flight token renewal and the credential store
//! - The event dispatcher the console subscribes to

pub mod auth;
pub mod classifier;
pub mod error;
pub mod events;
pub mod pipeline;
pub mod ports;

#[cfg(test)]
mod test_support;

pub use auth::{
    CredentialStore, RefreshCoordinator, RefreshState, SessionError, SessionService,
};
pub use classifier::FailureClassifier;
pub use error::{ApiError, ApiResult, SessionExpiry};
pub use events::{EventDispatcher, SubscriptionId};
pub use pipeline::RequestPipeline;
pub use ports::{
    AuthGateway, AuthGatewayError, Connectivity, CredentialBackend, HttpTransport, Navigator,
    StorageError, TransportError,
};

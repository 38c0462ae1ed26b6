//! Fleetgate Domain - Core types of the API access layer
//!
//! This crate defines credentials, requests, responses, the failure
//! taxonomy, events and settings. All types here are pure Rust with no
//! I/O dependencies.

pub mod classification;
pub mod credential;
pub mod error;
pub mod event;
pub mod id;
pub mod navigation;
pub mod request;
pub mod response;
pub mod settings;

pub use classification::{ErrorClassification, FailedExchange, TransportFailureKind};
pub use credential::{
    AUTH_TOKEN_KEY, Credential, CredentialTier, REFRESH_TOKEN_KEY, TokenPair, token_preview,
};
pub use error::{DomainError, DomainResult};
pub use event::{ApiErrorKind, ApiEvent};
pub use id::RequestId;
pub use navigation::NavigationTarget;
pub use request::{ApiRequest, HttpMethod, RequestDescriptor};
pub use response::{ApiResponse, StatusCode};
pub use settings::{ClientSettings, RouteSettings};

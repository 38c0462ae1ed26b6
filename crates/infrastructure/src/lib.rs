//! Fleetgate Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports
//! defined in the application layer, plus settings loading and
//! tracing setup.

pub mod adapters;
pub mod auth;
pub mod environment;
pub mod persistence;
pub mod serialization;
pub mod settings;
pub mod telemetry;

pub use adapters::{ReqwestTransport, build_client};
pub use auth::ReqwestAuthGateway;
pub use environment::{ConnectivityMonitor, RouteHistory};
pub use persistence::{FileBackend, MemoryBackend};
pub use serialization::{SerializationError, from_json_bytes, to_json_stable_bytes};
pub use settings::{ConfigError, SettingsLoader};
pub use telemetry::{TelemetryError, init_tracing};

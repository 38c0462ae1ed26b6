//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the API access layer and the outside
//! world. Each port is a trait implemented by an adapter in the
//! infrastructure layer, or by a test double.

mod auth_gateway;
mod environment;
mod storage;
mod transport;

pub use auth_gateway::{AuthGateway, AuthGatewayError};
pub use environment::{Connectivity, Navigator};
pub use storage::{CredentialBackend, StorageError};
pub use transport::{HttpTransport, TransportError};

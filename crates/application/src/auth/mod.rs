//! Session and credential management.
//!
//! This module provides:
//! - The tiered credential store
//! - Single-flight token renewal
//! - Login and logout

mod credential_store;
mod refresh;
mod session;

pub use credential_store::CredentialStore;
pub use refresh::{RefreshCoordinator, RefreshState};
pub use session::{SessionError, SessionService};

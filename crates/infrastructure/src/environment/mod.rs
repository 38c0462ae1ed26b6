//! Host environment adapters: connectivity and navigation.

mod connectivity;
mod route_history;

pub use connectivity::ConnectivityMonitor;
pub use route_history::RouteHistory;

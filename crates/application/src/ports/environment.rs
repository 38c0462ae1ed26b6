//! Host environment ports: connectivity and navigation.

/// Port reporting whether the client has a network connection.
pub trait Connectivity: Send + Sync {
    /// Returns true while the client is online.
    fn is_online(&self) -> bool;
}

/// Port for the console's router.
///
/// Navigation is a side effect owned by the host; the pipeline only asks
/// where the user is and where to send them.
pub trait Navigator: Send + Sync {
    /// Current route, e.g. `/buses`.
    fn current_route(&self) -> String;

    /// Moves to another route.
    fn navigate(&self, route: &str);

    /// Remembers the route to restore once the failure clears.
    fn save_return_route(&self, route: &str);
}

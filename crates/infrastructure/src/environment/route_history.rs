//! In-memory router.

use fleetgate_application::ports::Navigator;
use parking_lot::Mutex;
use tracing::debug;

#[derive(Debug)]
struct State {
    current: String,
    history: Vec<String>,
    return_route: Option<String>,
}

/// Navigator that keeps the current route, every move, and the route to
/// restore once a failure clears.
#[derive(Debug)]
pub struct RouteHistory {
    state: Mutex<State>,
}

impl Default for RouteHistory {
    fn default() -> Self {
        Self::new("/")
    }
}

impl RouteHistory {
    /// Starts at `route`.
    #[must_use]
    pub fn new(route: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(State {
                current: route.into(),
                history: Vec::new(),
                return_route: None,
            }),
        }
    }

    /// Every route navigated to, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.state.lock().history.clone()
    }

    /// The saved return route, if any.
    #[must_use]
    pub fn return_route(&self) -> Option<String> {
        self.state.lock().return_route.clone()
    }

    /// Removes and returns the saved return route.
    pub fn take_return_route(&self) -> Option<String> {
        self.state.lock().return_route.take()
    }

    /// Navigates back to the saved return route, if any.
    pub fn restore(&self) -> Option<String> {
        let route = self.take_return_route()?;
        self.navigate(&route);
        Some(route)
    }
}

impl Navigator for RouteHistory {
    fn current_route(&self) -> String {
        self.state.lock().current.clone()
    }

    fn navigate(&self, route: &str) {
        let mut state = self.state.lock();
        debug!(from = %state.current, to = route, "Navigating");
        state.current = route.to_string();
        state.history.push(route.to_string());
    }

    fn save_return_route(&self, route: &str) {
        self.state.lock().return_route = Some(route.to_string());
    }
}

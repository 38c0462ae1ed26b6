//! Online/offline flag.

use std::sync::atomic::{AtomicBool, Ordering};

use fleetgate_application::ports::Connectivity;
use tracing::info;

/// Connectivity flag flipped by the host when the network changes.
#[derive(Debug)]
pub struct ConnectivityMonitor {
    online: AtomicBool,
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ConnectivityMonitor {
    /// Creates a monitor with the given initial state.
    #[must_use]
    pub const fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    /// Records a network change. Returns true if the state changed.
    pub fn set_online(&self, online: bool) -> bool {
        let previous = self.online.swap(online, Ordering::SeqCst);
        if previous != online {
            info!(online, "Connectivity changed");
        }
        previous != online
    }
}

impl Connectivity for ConnectivityMonitor {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        let monitor = ConnectivityMonitor::default();
        assert!(monitor.is_online());

        assert!(monitor.set_online(false));
        assert!(!monitor.set_online(false));
        assert!(!monitor.is_online());

        assert!(monitor.set_online(true));
        assert!(monitor.is_online());
    }
}

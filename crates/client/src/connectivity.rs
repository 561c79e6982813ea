//! Connectivity tracking and the sync-state indicator.

use std::sync::{Arc, Mutex};

pub use crate::types::Connectivity;

#[derive(Debug)]
struct Inner {
    state: Connectivity,
    /// State to restore when the active sync guard drops. Only meaningful
    /// while `state == Syncing`.
    resume: Connectivity,
}

/// Shared connectivity state.
///
/// Exposes one current state and a scoped acquisition-and-release pattern
/// for the `Syncing` indicator: `begin_sync` flips to `Syncing` and the
/// returned guard restores `Online`/`Offline` on drop, so the indicator
/// can never be left stuck at `Syncing` when a sync operation errors.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    inner: Arc<Mutex<Inner>>,
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectivityMonitor {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: Connectivity::Online,
                resume: Connectivity::Online,
            })),
        }
    }

    /// Current indicator state, including `Syncing`.
    pub fn indicator(&self) -> Connectivity {
        self.inner.lock().unwrap().state
    }

    fn effective(&self) -> Connectivity {
        let inner = self.inner.lock().unwrap();
        match inner.state {
            Connectivity::Syncing => inner.resume,
            state => state,
        }
    }

    pub fn is_offline(&self) -> bool {
        self.effective() == Connectivity::Offline
    }

    /// Mark the client online. During a sync run this updates the state
    /// the guard will restore, not the visible indicator.
    pub fn set_online(&self) {
        self.set(Connectivity::Online);
    }

    pub fn set_offline(&self) {
        self.set(Connectivity::Offline);
    }

    fn set(&self, value: Connectivity) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state == Connectivity::Syncing {
            inner.resume = value;
        } else {
            inner.state = value;
        }
    }

    /// Enter the `Syncing` state.
    ///
    /// Returns `None` when a sync is already in progress: this doubles as
    /// the re-entrancy guard for reconciliation, so a rapid connectivity
    /// flap can never run two reconcile loops in parallel.
    pub fn begin_sync(&self) -> Option<SyncGuard> {
        let mut inner = self.inner.lock().unwrap();
        if inner.state == Connectivity::Syncing {
            return None;
        }
        inner.resume = inner.state;
        inner.state = Connectivity::Syncing;
        Some(SyncGuard {
            monitor: self.clone(),
        })
    }
}

/// Live `Syncing` claim; restores the prior state on drop.
#[derive(Debug)]
pub struct SyncGuard {
    monitor: ConnectivityMonitor,
}

impl Drop for SyncGuard {
    fn drop(&mut self) {
        let mut inner = self.monitor.inner.lock().unwrap();
        inner.state = inner.resume;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_restores_prior_state_on_drop() {
        let monitor = ConnectivityMonitor::new();
        monitor.set_offline();

        {
            let _guard = monitor.begin_sync().unwrap();
            assert_eq!(monitor.indicator(), Connectivity::Syncing);
        }

        assert_eq!(monitor.indicator(), Connectivity::Offline);
    }

    #[test]
    fn guard_restores_even_when_the_operation_bails_early() {
        let monitor = ConnectivityMonitor::new();

        fn failing_sync(monitor: &ConnectivityMonitor) -> Result<(), &'static str> {
            let _guard = monitor.begin_sync().ok_or("busy")?;
            Err("remote exploded")
        }

        assert!(failing_sync(&monitor).is_err());
        assert_eq!(monitor.indicator(), Connectivity::Online);
    }

    #[test]
    fn begin_sync_is_not_reentrant() {
        let monitor = ConnectivityMonitor::new();

        let guard = monitor.begin_sync().unwrap();
        assert!(monitor.begin_sync().is_none());
        drop(guard);
        assert!(monitor.begin_sync().is_some());
    }

    #[test]
    fn transitions_during_sync_land_in_the_resume_state() {
        let monitor = ConnectivityMonitor::new();

        let guard = monitor.begin_sync().unwrap();
        monitor.set_offline();
        // Indicator still shows the run in progress.
        assert_eq!(monitor.indicator(), Connectivity::Syncing);
        assert!(monitor.is_offline());
        drop(guard);

        assert_eq!(monitor.indicator(), Connectivity::Offline);
    }
}

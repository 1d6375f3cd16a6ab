//! Server lifecycle state machine.
//!
//! # States
//! ```text
//! Starting → Running → Draining → Stopped
//! ```
//! Stopped is terminal; no transition leaves it. Draining may also be
//! entered straight from Starting when a signal arrives during startup.

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Starting,
    Running,
    Draining,
    Stopped,
}

impl ServerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerState::Starting => "starting",
            ServerState::Running => "running",
            ServerState::Draining => "draining",
            ServerState::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn allowed(from: ServerState, to: ServerState) -> bool {
    matches!(
        (from, to),
        (ServerState::Starting, ServerState::Running)
            | (ServerState::Starting, ServerState::Draining)
            | (ServerState::Running, ServerState::Draining)
            | (ServerState::Draining, ServerState::Stopped)
    )
}

/// Handle to the process-wide lifecycle state.
///
/// Built on a watch channel so tasks can both read the current state and
/// await changes.
pub struct StateHandle {
    tx: watch::Sender<ServerState>,
}

impl StateHandle {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ServerState::Starting);
        Self { tx }
    }

    pub fn current(&self) -> ServerState {
        *self.tx.borrow()
    }

    /// Apply a transition; illegal transitions are refused, not panicked on.
    pub fn transition(&self, next: ServerState) -> bool {
        let changed = self.tx.send_if_modified(|state| {
            if allowed(*state, next) {
                *state = next;
                true
            } else {
                false
            }
        });
        if changed {
            tracing::info!(state = %next, "Lifecycle state changed");
        }
        changed
    }

    pub fn subscribe(&self) -> watch::Receiver<ServerState> {
        self.tx.subscribe()
    }
}

impl Default for StateHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_lifecycle_walk() {
        let handle = StateHandle::new();
        assert_eq!(handle.current(), ServerState::Starting);

        assert!(handle.transition(ServerState::Running));
        assert!(handle.transition(ServerState::Draining));
        assert!(handle.transition(ServerState::Stopped));
        assert_eq!(handle.current(), ServerState::Stopped);
    }

    #[test]
    fn stopped_is_terminal() {
        let handle = StateHandle::new();
        handle.transition(ServerState::Running);
        handle.transition(ServerState::Draining);
        handle.transition(ServerState::Stopped);

        assert!(!handle.transition(ServerState::Running));
        assert!(!handle.transition(ServerState::Draining));
        assert_eq!(handle.current(), ServerState::Stopped);
    }

    #[test]
    fn cannot_skip_draining() {
        let handle = StateHandle::new();
        handle.transition(ServerState::Running);
        assert!(!handle.transition(ServerState::Stopped));
        assert_eq!(handle.current(), ServerState::Running);
    }

    #[test]
    fn signal_during_startup_drains() {
        let handle = StateHandle::new();
        assert!(handle.transition(ServerState::Draining));
    }
}

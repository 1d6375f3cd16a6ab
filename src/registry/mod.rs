//! Connection registry: the authoritative table of live connections.
//!
//! # Responsibilities
//! - Allocate unique, monotonically increasing connection ids
//! - Track per-connection state (source, user agent, message count)
//! - Hold the process-wide admission counters
//! - Fan frames out to sessions and close them on demand
//!
//! # Design Decisions
//! - One mutex guards the connection map together with its counters, so
//!   every invariant between them is enforced under a single lock
//! - Outbound delivery goes through each session's channel; the registry
//!   never performs socket I/O and never holds its lock across an await
//! - `retire` is idempotent and is the only removal path, whatever the
//!   close cause

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::observability::metrics;
use crate::server::frames::{self, ServerFrame};

/// Command delivered to a session's writer task.
#[derive(Debug)]
pub enum SessionCommand {
    /// Serialize and send a frame.
    Frame(ServerFrame),
    /// Send a close frame and stop writing.
    Close { code: u16, reason: &'static str },
}

/// Sending half of a session's outbound channel.
pub type SessionSender = mpsc::UnboundedSender<SessionCommand>;

struct ConnectionEntry {
    source_address: String,
    user_agent: String,
    connected_at: u64,
    message_count: u64,
    sender: SessionSender,
    expiry: Option<AbortHandle>,
}

#[derive(Default)]
struct RegistryInner {
    connections: HashMap<u64, ConnectionEntry>,
    next_id: u64,
    total_attempts: u64,
    rejected: u64,
}

/// Read-only view of the registry counters.
#[derive(Debug, Clone, Copy)]
pub struct RegistrySnapshot {
    pub active: usize,
    pub total_attempts: u64,
    pub rejected: u64,
    pub uptime: Duration,
}

/// Per-connection details for the admin surface.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    pub id: u64,
    pub source_address: String,
    pub user_agent: String,
    pub connected_at: u64,
    pub message_count: u64,
}

pub struct ConnectionRegistry {
    inner: Mutex<RegistryInner>,
    started_at: Instant,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner::default()),
            started_at: Instant::now(),
        }
    }

    fn locked(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().expect("registry mutex poisoned")
    }

    /// Record an admission decision being made.
    pub fn record_attempt(&self) {
        self.locked().total_attempts += 1;
    }

    /// Record a rejected admission decision.
    pub fn record_rejection(&self) {
        self.locked().rejected += 1;
    }

    /// Store a new connection and return its id.
    ///
    /// Id allocation and insertion happen under one lock, so no two callers
    /// can observe the same id. The caller arms the expiry timer afterwards
    /// and attaches the handle via [`attach_expiry`](Self::attach_expiry).
    pub fn register(&self, source_address: &str, user_agent: &str, sender: SessionSender) -> u64 {
        let mut inner = self.locked();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.connections.insert(
            id,
            ConnectionEntry {
                source_address: source_address.to_string(),
                user_agent: user_agent.to_string(),
                connected_at: frames::now_millis(),
                message_count: 0,
                sender,
                expiry: None,
            },
        );
        let active = inner.connections.len();
        drop(inner);

        metrics::set_active_connections(active);
        tracing::info!(
            connection_id = id,
            source = %source_address,
            active = active,
            "Connection registered"
        );
        id
    }

    /// Attach the expiry timer handle for a registered connection.
    ///
    /// If the connection already retired, the timer is cancelled instead of
    /// left orphaned.
    pub fn attach_expiry(&self, id: u64, handle: AbortHandle) {
        let mut inner = self.locked();
        match inner.connections.get_mut(&id) {
            Some(entry) => entry.expiry = Some(handle),
            None => handle.abort(),
        }
    }

    /// Count one processed message; `None` if the id is absent.
    ///
    /// Never creates a record: a message racing a retirement is dropped.
    pub fn touch_message(&self, id: u64) -> Option<u64> {
        let mut inner = self.locked();
        let entry = inner.connections.get_mut(&id)?;
        entry.message_count += 1;
        Some(entry.message_count)
    }

    /// Remove a connection and cancel its expiry timer. Idempotent.
    pub fn retire(&self, id: u64) -> bool {
        let mut inner = self.locked();
        let Some(entry) = inner.connections.remove(&id) else {
            return false;
        };
        if let Some(handle) = entry.expiry {
            handle.abort();
        }
        let active = inner.connections.len();
        drop(inner);

        metrics::set_active_connections(active);
        tracing::info!(
            connection_id = id,
            messages = entry.message_count,
            active = active,
            "Connection retired"
        );
        true
    }

    /// Ask one session to close with the given code.
    pub fn close(&self, id: u64, code: u16, reason: &'static str) {
        let inner = self.locked();
        if let Some(entry) = inner.connections.get(&id) {
            let _ = entry.sender.send(SessionCommand::Close { code, reason });
        }
    }

    /// Queue a close frame on every open connection.
    pub fn close_all(&self, code: u16, reason: &'static str) -> usize {
        let inner = self.locked();
        let mut closed = 0;
        for entry in inner.connections.values() {
            if entry
                .sender
                .send(SessionCommand::Close { code, reason })
                .is_ok()
            {
                closed += 1;
            }
        }
        closed
    }

    /// Fan a frame out to every open connection.
    ///
    /// Sessions whose writer has gone away are skipped, not treated as an
    /// error; their retirement is already in flight.
    pub fn broadcast(&self, frame: &ServerFrame) -> usize {
        let inner = self.locked();
        let mut delivered = 0;
        for entry in inner.connections.values() {
            if entry
                .sender
                .send(SessionCommand::Frame(frame.clone()))
                .is_ok()
            {
                delivered += 1;
            }
        }
        delivered
    }

    pub fn active_count(&self) -> usize {
        self.locked().connections.len()
    }

    /// Read-only counter snapshot for the stats surfaces.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let inner = self.locked();
        RegistrySnapshot {
            active: inner.connections.len(),
            total_attempts: inner.total_attempts,
            rejected: inner.rejected,
            uptime: self.started_at.elapsed(),
        }
    }

    /// Per-connection details, ordered by id.
    pub fn connection_details(&self) -> Vec<ConnectionInfo> {
        let inner = self.locked();
        let mut details: Vec<ConnectionInfo> = inner
            .connections
            .iter()
            .map(|(id, entry)| ConnectionInfo {
                id: *id,
                source_address: entry.source_address.clone(),
                user_agent: entry.user_agent.clone(),
                connected_at: entry.connected_at,
                message_count: entry.message_count,
            })
            .collect();
        details.sort_by_key(|info| info.id);
        details
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> (SessionSender, mpsc::UnboundedReceiver<SessionCommand>) {
        mpsc::unbounded_channel()
    }

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = channel();

        let a = registry.register("10.0.0.1", "test", tx.clone());
        let b = registry.register("10.0.0.2", "test", tx.clone());
        assert!(b > a);

        registry.retire(a);
        let c = registry.register("10.0.0.3", "test", tx);
        assert!(c > b);
    }

    #[test]
    fn active_count_tracks_registrations() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = channel();

        assert_eq!(registry.active_count(), 0);
        let a = registry.register("10.0.0.1", "test", tx.clone());
        let b = registry.register("10.0.0.2", "test", tx);
        assert_eq!(registry.active_count(), 2);

        registry.retire(a);
        assert_eq!(registry.active_count(), 1);
        registry.retire(b);
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn retire_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = channel();

        let id = registry.register("10.0.0.1", "test", tx);
        assert!(registry.retire(id));
        assert!(!registry.retire(id));
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn touch_message_counts_and_ignores_unknown_ids() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = channel();

        let id = registry.register("10.0.0.1", "test", tx);
        assert_eq!(registry.touch_message(id), Some(1));
        assert_eq!(registry.touch_message(id), Some(2));

        registry.retire(id);
        assert_eq!(registry.touch_message(id), None);
        // must never create a record as a side effect
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn counters_account_for_every_decision() {
        let registry = ConnectionRegistry::new();
        registry.record_attempt();
        registry.record_attempt();
        registry.record_rejection();

        let snap = registry.snapshot();
        assert_eq!(snap.total_attempts, 2);
        assert_eq!(snap.rejected, 1);
        assert!(snap.total_attempts >= snap.active as u64 + snap.rejected);
    }

    #[test]
    fn broadcast_skips_closed_sessions() {
        let registry = ConnectionRegistry::new();
        let (tx_live, mut rx_live) = channel();
        let (tx_dead, rx_dead) = channel();

        registry.register("10.0.0.1", "test", tx_live);
        registry.register("10.0.0.2", "test", tx_dead);
        drop(rx_dead);

        let delivered = registry.broadcast(&ServerFrame::heartbeat(2, 1));
        assert_eq!(delivered, 1);
        assert!(matches!(
            rx_live.try_recv(),
            Ok(SessionCommand::Frame(ServerFrame::Heartbeat { .. }))
        ));
    }

    #[test]
    fn close_all_queues_close_commands() {
        let registry = ConnectionRegistry::new();
        let (tx, mut rx) = channel();

        registry.register("10.0.0.1", "test", tx);
        let closed = registry.close_all(4001, "server shutting down");
        assert_eq!(closed, 1);
        assert!(matches!(
            rx.try_recv(),
            Ok(SessionCommand::Close { code: 4001, .. })
        ));
    }

    #[test]
    fn connection_details_are_ordered() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = channel();

        registry.register("10.0.0.1", "agent-a", tx.clone());
        registry.register("10.0.0.2", "agent-b", tx);

        let details = registry.connection_details();
        assert_eq!(details.len(), 2);
        assert!(details[0].id < details[1].id);
        assert_eq!(details[1].source_address, "10.0.0.2");
    }
}

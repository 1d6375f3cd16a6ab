//! Connection admission control.
//!
//! The gatekeeper applied at handshake time, before any application frame
//! is exchanged. Checks run in a fixed order (capacity, whitelist, token)
//! and the first failure short-circuits.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::observability::metrics;
use crate::registry::ConnectionRegistry;

/// A pending handshake awaiting an admission decision.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub source_address: String,
    pub presented_token: String,
}

/// Why a candidate was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Capacity,
    NotWhitelisted,
    BadToken,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::Capacity => "capacity",
            RejectReason::NotWhitelisted => "not_whitelisted",
            RejectReason::BadToken => "bad_token",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct AdmissionController {
    config: Arc<ServerConfig>,
    registry: Arc<ConnectionRegistry>,
}

impl AdmissionController {
    pub fn new(config: Arc<ServerConfig>, registry: Arc<ConnectionRegistry>) -> Self {
        Self { config, registry }
    }

    /// Decide whether a candidate may proceed to the upgrade.
    ///
    /// Every call counts one admission attempt; every rejection counts once
    /// against the rejection counter. Acceptance mutates nothing else:
    /// registration happens separately once the handshake completes, so a
    /// passing token check never reserves a slot that is never consumed.
    pub fn evaluate(&self, candidate: &Candidate) -> Result<(), RejectReason> {
        self.registry.record_attempt();
        metrics::record_admission();

        let decision = self.decide(candidate);
        if let Err(reason) = decision {
            self.registry.record_rejection();
            metrics::record_rejection(reason.as_str());
            tracing::warn!(
                source = %candidate.source_address,
                reason = %reason,
                "Connection rejected"
            );
        }
        decision
    }

    fn decide(&self, candidate: &Candidate) -> Result<(), RejectReason> {
        if self.registry.active_count() >= self.config.limits.max_connections {
            return Err(RejectReason::Capacity);
        }
        if self.config.ip_whitelist.enabled
            && !self
                .config
                .ip_whitelist
                .addresses
                .contains(&candidate.source_address)
        {
            return Err(RejectReason::NotWhitelisted);
        }
        if candidate.presented_token != self.config.auth.token {
            return Err(RejectReason::BadToken);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn setup(configure: impl FnOnce(&mut ServerConfig)) -> (AdmissionController, Arc<ConnectionRegistry>) {
        let mut config = ServerConfig::default();
        config.auth.token = "secret".to_string();
        configure(&mut config);
        let registry = Arc::new(ConnectionRegistry::new());
        (
            AdmissionController::new(Arc::new(config), Arc::clone(&registry)),
            registry,
        )
    }

    fn candidate(source: &str, token: &str) -> Candidate {
        Candidate {
            source_address: source.to_string(),
            presented_token: token.to_string(),
        }
    }

    #[test]
    fn every_call_counts_one_attempt() {
        let (admission, registry) = setup(|_| {});

        assert!(admission.evaluate(&candidate("10.0.0.1", "secret")).is_ok());
        assert!(admission.evaluate(&candidate("10.0.0.1", "wrong")).is_err());
        assert!(admission.evaluate(&candidate("10.0.0.1", "secret")).is_ok());

        let snap = registry.snapshot();
        assert_eq!(snap.total_attempts, 3);
        assert_eq!(snap.rejected, 1);
    }

    #[test]
    fn bad_token_is_rejected_exactly() {
        let (admission, _registry) = setup(|_| {});
        assert_eq!(
            admission.evaluate(&candidate("10.0.0.1", "Secret")),
            Err(RejectReason::BadToken)
        );
        assert_eq!(
            admission.evaluate(&candidate("10.0.0.1", "")),
            Err(RejectReason::BadToken)
        );
    }

    #[test]
    fn capacity_rejects_even_with_valid_token() {
        let (admission, registry) = setup(|c| c.limits.max_connections = 1);
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = registry.register("10.0.0.1", "test", tx);

        assert_eq!(
            admission.evaluate(&candidate("10.0.0.2", "secret")),
            Err(RejectReason::Capacity)
        );

        registry.retire(id);
        assert!(admission.evaluate(&candidate("10.0.0.2", "secret")).is_ok());
    }

    #[test]
    fn whitelist_rejects_regardless_of_token() {
        let (admission, _registry) = setup(|c| {
            c.ip_whitelist.enabled = true;
            c.ip_whitelist.addresses.insert("10.0.0.1".to_string());
            c.ip_whitelist.addresses.insert("10.0.0.2".to_string());
        });

        assert_eq!(
            admission.evaluate(&candidate("10.0.0.3", "secret")),
            Err(RejectReason::NotWhitelisted)
        );
        assert!(admission.evaluate(&candidate("10.0.0.1", "secret")).is_ok());
    }

    #[test]
    fn capacity_check_runs_before_token_check() {
        let (admission, registry) = setup(|c| c.limits.max_connections = 1);
        let (tx, _rx) = mpsc::unbounded_channel();
        registry.register("10.0.0.1", "test", tx);

        // both capacity and token would fail; capacity wins
        assert_eq!(
            admission.evaluate(&candidate("10.0.0.2", "wrong")),
            Err(RejectReason::Capacity)
        );
    }
}

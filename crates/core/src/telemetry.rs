//! Fire-and-forget governance counters.
//!
//! The orchestrator records these on the hot paths; nothing in the
//! lifecycle ever depends on them. A snapshot is exposed on the ops
//! surface and each increment is mirrored as a `tracing` event.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::metric_names;

/// Governance counters. Cheap to share behind an `Arc`.
#[derive(Debug, Default)]
pub struct Telemetry {
    execution_attempts: AtomicU64,
    policy_denials: AtomicU64,
    catalog_denials: AtomicU64,
    throttled: AtomicU64,
    replay_conflicts: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    pub execution_attempts: u64,
    pub policy_denials: u64,
    pub catalog_denials: u64,
    pub throttled: u64,
    pub replay_conflicts: u64,
}

impl Telemetry {
    pub fn record_execution_attempt(&self) {
        self.execution_attempts.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = metric_names::COUNTER_EXECUTION_ATTEMPTS, "counter incremented");
    }

    pub fn record_policy_denial(&self) {
        self.policy_denials.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = metric_names::COUNTER_POLICY_DENIALS, "counter incremented");
    }

    pub fn record_catalog_denial(&self) {
        self.catalog_denials.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = metric_names::COUNTER_CATALOG_DENIALS, "counter incremented");
    }

    pub fn record_throttled(&self) {
        self.throttled.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = metric_names::COUNTER_THROTTLED, "counter incremented");
    }

    pub fn record_replay_conflict(&self) {
        self.replay_conflicts.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = metric_names::COUNTER_REPLAY_CONFLICTS, "counter incremented");
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            execution_attempts: self.execution_attempts.load(Ordering::Relaxed),
            policy_denials: self.policy_denials.load(Ordering::Relaxed),
            catalog_denials: self.catalog_denials.load(Ordering::Relaxed),
            throttled: self.throttled.load(Ordering::Relaxed),
            replay_conflicts: self.replay_conflicts.load(Ordering::Relaxed),
        }
    }
}

//! Well-known governance counter name constants.
//!
//! These are the canonical names used in telemetry snapshots and in
//! structured log events emitted on the denial/throttle/conflict paths.

/// An execution or rollback-execution attempt reached the orchestrator.
pub const COUNTER_EXECUTION_ATTEMPTS: &str = "execution_attempts";

/// A propose-time or execution-time policy gate denied the request.
pub const COUNTER_POLICY_DENIALS: &str = "policy_denials";

/// The catalog allowlist denied a propose request.
pub const COUNTER_CATALOG_DENIALS: &str = "catalog_denials";

/// The fixed-window throttle denied an attempt.
pub const COUNTER_THROTTLED: &str = "throttled";

/// The replay guard (or the optimistic version check) rejected a
/// duplicate execution.
pub const COUNTER_REPLAY_CONFLICTS: &str = "replay_conflicts";

//! Executor routing: first-match-wins dispatch over flag-gated routes,
//! falling back to the deterministic dry-run executor.
//!
//! Executors never return errors. Every distinguishable failure mode is
//! mapped to a stable machine-readable reason code inside the response
//! envelope, so the orchestrator can always write exactly one execution
//! log row and never has to catch anything. The router additionally bounds
//! every dispatch with a timeout; a timed-out call is a failure with
//! reason `executor_timeout`, not a lost attempt.

mod dry_run;
mod http_probe;

use std::time::{Duration, Instant};

pub use dry_run::DryRunExecutor;
pub use http_probe::HttpProbeExecutor;

/// Result of one execution attempt, as recorded in the execution log.
#[derive(Debug, Clone)]
pub struct ActionExecutionResult {
    pub success: bool,
    pub response: serde_json::Value,
    pub duration_ms: i64,
}

/// Executor-internal outcome, before the router attaches timing.
#[derive(Debug, Clone)]
pub struct ExecutorOutcome {
    pub success: bool,
    pub response: serde_json::Value,
}

impl ExecutorOutcome {
    pub fn success(response: serde_json::Value) -> Self {
        Self {
            success: true,
            response,
        }
    }

    pub fn failure(mode: &str, reason_code: &str, detail: impl Into<String>) -> Self {
        Self {
            success: false,
            response: serde_json::json!({
                "mode": mode,
                "reasonCode": reason_code,
                "detail": detail.into(),
            }),
        }
    }
}

/// A concrete executor variant.
///
/// Modeled as a tagged enum rather than a trait object so the dispatch
/// table stays an explicit, inspectable value.
#[derive(Debug, Clone)]
pub enum Executor {
    DryRun(DryRunExecutor),
    HttpProbe(HttpProbeExecutor),
}

impl Executor {
    async fn run(&self, action_type: &str, payload: &serde_json::Value) -> ExecutorOutcome {
        match self {
            Executor::DryRun(exec) => exec.run(action_type, payload),
            Executor::HttpProbe(exec) => exec.run(action_type, payload).await,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Executor::DryRun(_) => "dry_run",
            Executor::HttpProbe(_) => "http_probe",
        }
    }
}

/// One row of the dispatch table: an action type, its feature flag, and
/// the executor that handles it when the flag is enabled.
#[derive(Debug, Clone)]
pub struct ExecutorRoute {
    pub action_type: String,
    pub enabled: bool,
    pub executor: Executor,
}

/// Default bound on a single executor dispatch.
pub const DEFAULT_EXECUTOR_TIMEOUT: Duration = Duration::from_secs(30);

/// Routes execution requests to concrete executors.
///
/// Routing is first-match-wins over the ordered route list; a route only
/// matches when its action type matches *and* its flag is enabled. When
/// nothing matches, the dry-run executor runs. All flags default off, so a
/// fresh deployment executes nothing destructive.
#[derive(Debug, Clone)]
pub struct ExecutorRouter {
    routes: Vec<ExecutorRoute>,
    fallback: DryRunExecutor,
    timeout: Duration,
}

impl ExecutorRouter {
    pub fn new(routes: Vec<ExecutorRoute>, timeout: Duration) -> Self {
        Self {
            routes,
            fallback: DryRunExecutor,
            timeout,
        }
    }

    /// A router with no real routes: everything dry-runs.
    pub fn dry_run_only() -> Self {
        Self::new(Vec::new(), DEFAULT_EXECUTOR_TIMEOUT)
    }

    /// Execute an action payload.
    pub async fn execute(
        &self,
        action_type: &str,
        payload: &serde_json::Value,
    ) -> ActionExecutionResult {
        self.dispatch(action_type, payload, "execute").await
    }

    /// Execute a rollback payload. Same routing, same contract.
    pub async fn rollback(
        &self,
        action_type: &str,
        rollback_payload: &serde_json::Value,
    ) -> ActionExecutionResult {
        self.dispatch(action_type, rollback_payload, "rollback").await
    }

    async fn dispatch(
        &self,
        action_type: &str,
        payload: &serde_json::Value,
        operation: &'static str,
    ) -> ActionExecutionResult {
        let executor = self
            .routes
            .iter()
            .find(|route| route.enabled && route.action_type == action_type)
            .map(|route| &route.executor);

        let name = executor.map(Executor::name).unwrap_or("dry_run");
        tracing::debug!(action_type, operation, executor = name, "Dispatching to executor");

        let started = Instant::now();
        let outcome = match executor {
            Some(executor) => {
                match tokio::time::timeout(self.timeout, executor.run(action_type, payload)).await
                {
                    Ok(outcome) => outcome,
                    Err(_) => ExecutorOutcome::failure(
                        name,
                        "executor_timeout",
                        format!(
                            "Executor did not complete within {}s",
                            self.timeout.as_secs()
                        ),
                    ),
                }
            }
            // The dry-run fallback performs no I/O and cannot hang.
            None => self.fallback.run(action_type, payload),
        };

        ActionExecutionResult {
            success: outcome.success,
            response: outcome.response,
            duration_ms: started.elapsed().as_millis() as i64,
        }
    }
}

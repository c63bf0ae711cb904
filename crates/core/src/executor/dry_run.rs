//! The deterministic dry-run executor.
//!
//! This is the default for every action type until a real executor flag is
//! enabled, and a testing/safety primitive in its own right: it performs
//! no I/O, validates the request shape, and supports an explicit
//! failure-path hook via `simulateFailure: true` in the payload.

use super::ExecutorOutcome;

/// Payload key that forces a simulated failure.
const SIMULATE_FAILURE_KEY: &str = "simulateFailure";

#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunExecutor;

impl DryRunExecutor {
    pub fn run(&self, action_type: &str, payload: &serde_json::Value) -> ExecutorOutcome {
        if action_type.trim().is_empty() {
            return ExecutorOutcome::failure(
                "dry-run",
                "invalid_action_type",
                "Action type must not be empty",
            );
        }

        let Some(fields) = payload.as_object() else {
            return ExecutorOutcome::failure(
                "dry-run",
                "invalid_payload",
                "Payload must be a JSON object",
            );
        };

        if fields
            .get(SIMULATE_FAILURE_KEY)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
        {
            return ExecutorOutcome::failure(
                "dry-run",
                "simulated_failure",
                format!("Payload requested a simulated failure for {action_type}"),
            );
        }

        ExecutorOutcome::success(serde_json::json!({
            "mode": "dry-run",
            "actionType": action_type,
            "echo": payload,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_payload_succeeds_with_dry_run_envelope() {
        let result = DryRunExecutor.run("restart_pod", &json!({"pod": "api-1"}));
        assert!(result.success);
        assert_eq!(result.response["mode"], "dry-run");
        assert_eq!(result.response["actionType"], "restart_pod");
        assert_eq!(result.response["echo"]["pod"], "api-1");
    }

    #[test]
    fn simulate_failure_flag_fails_with_stable_reason() {
        let result = DryRunExecutor.run("restart_pod", &json!({"simulateFailure": true}));
        assert!(!result.success);
        assert_eq!(result.response["reasonCode"], "simulated_failure");
    }

    #[test]
    fn simulate_failure_false_still_succeeds() {
        let result = DryRunExecutor.run("restart_pod", &json!({"simulateFailure": false}));
        assert!(result.success);
    }

    #[test]
    fn non_object_payload_is_invalid() {
        let result = DryRunExecutor.run("restart_pod", &json!([1, 2, 3]));
        assert!(!result.success);
        assert_eq!(result.response["reasonCode"], "invalid_payload");
    }

    #[test]
    fn empty_action_type_is_invalid() {
        let result = DryRunExecutor.run("  ", &json!({}));
        assert!(!result.success);
        assert_eq!(result.response["reasonCode"], "invalid_action_type");
    }
}

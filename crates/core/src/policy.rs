//! Policy evaluator contracts and the configuration-driven rule policy.
//!
//! Two decision points share the same shape but are evaluated
//! independently: the propose-time policy (coarse allow/deny before any
//! persistence) and the tenant execution policy (re-evaluated at execute
//! time, because tenant state can change between propose and execute).
//! The two gates are never collapsed; when they disagree, the execution
//! gate simply wins at execute time.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

/// Outcome of a policy evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDecision {
    pub allowed: bool,
    pub reason_code: Option<String>,
    pub message: Option<String>,
}

impl PolicyDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason_code: None,
            message: None,
        }
    }

    pub fn deny(reason_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason_code: Some(reason_code.into()),
            message: Some(message.into()),
        }
    }
}

/// Propose-time policy gate. Denials here never create a record.
#[async_trait]
pub trait ProposePolicy: Send + Sync {
    async fn evaluate(&self, tenant_id: &str, action_type: &str) -> PolicyDecision;
}

/// Per-execution tenant policy gate, independent of the propose-time gate.
#[async_trait]
pub trait ExecutionPolicy: Send + Sync {
    async fn evaluate_execution(&self, tenant_id: &str, action_type: &str) -> PolicyDecision;
}

/// Deny rules keyed by tenant. The wildcard action type `*` denies every
/// action for that tenant.
pub type DenyRules = HashMap<String, HashSet<String>>;

/// Configuration-driven policy: suspended tenants plus per-tenant denied
/// action types, with independent rule sets for the propose and execution
/// gates.
#[derive(Debug, Clone, Default)]
pub struct RulePolicy {
    suspended_tenants: HashSet<String>,
    propose_denied: DenyRules,
    execution_denied: DenyRules,
}

impl RulePolicy {
    pub fn new(
        suspended_tenants: HashSet<String>,
        propose_denied: DenyRules,
        execution_denied: DenyRules,
    ) -> Self {
        Self {
            suspended_tenants,
            propose_denied,
            execution_denied,
        }
    }

    /// Parse deny rules from a `tenant:action_type` comma-separated list,
    /// e.g. `t1:restart_pod,t2:*`. Malformed items are skipped with a
    /// warning rather than failing startup.
    pub fn parse_deny_rules(raw: &str) -> DenyRules {
        let mut rules: DenyRules = HashMap::new();
        for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match item.split_once(':') {
                Some((tenant, action)) if !tenant.is_empty() && !action.is_empty() => {
                    rules
                        .entry(tenant.to_string())
                        .or_default()
                        .insert(action.to_string());
                }
                _ => {
                    tracing::warn!(rule = item, "Skipping malformed policy deny rule");
                }
            }
        }
        rules
    }

    fn check(&self, rules: &DenyRules, tenant_id: &str, action_type: &str) -> PolicyDecision {
        if self.suspended_tenants.contains(tenant_id) {
            return PolicyDecision::deny(
                "tenant_suspended",
                format!("Tenant {tenant_id} is suspended"),
            );
        }
        if let Some(denied) = rules.get(tenant_id) {
            if denied.contains("*") || denied.contains(action_type) {
                return PolicyDecision::deny(
                    "action_denied_for_tenant",
                    format!("Action {action_type} is denied for tenant {tenant_id}"),
                );
            }
        }
        PolicyDecision::allow()
    }
}

#[async_trait]
impl ProposePolicy for RulePolicy {
    async fn evaluate(&self, tenant_id: &str, action_type: &str) -> PolicyDecision {
        self.check(&self.propose_denied, tenant_id, action_type)
    }
}

#[async_trait]
impl ExecutionPolicy for RulePolicy {
    async fn evaluate_execution(&self, tenant_id: &str, action_type: &str) -> PolicyDecision {
        self.check(&self.execution_denied, tenant_id, action_type)
    }
}

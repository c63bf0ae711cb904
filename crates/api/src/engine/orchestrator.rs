//! Safe action orchestrator.
//!
//! Every lifecycle operation follows the same guarded discipline:
//! gates first (catalog/policy/throttle), then the replay guard, then a
//! version-checked transition persisted *before* any dispatch, then an
//! unconditional execution log append, then the terminal transition.
//! The terminal write is keyed on the in-flight state rather than the
//! version, so writes on the other status track (a rollback request
//! arriving mid-execution) cannot strand the record. Executor failures
//! never escape as errors; they become a failed result with an audit row.

use std::sync::Arc;
use std::time::Duration;

use remedian_core::audit::{
    self, ApprovalEvent, AuditSummary, ExecutionEvent, DECISION_APPROVED, DECISION_REJECTED,
    EXECUTION_FAILED, EXECUTION_SUCCESS, EXECUTION_TYPE_EXECUTE, EXECUTION_TYPE_ROLLBACK,
    TARGET_ACTION, TARGET_ROLLBACK,
};
use remedian_core::catalog::ActionCatalog;
use remedian_core::error::{reason, CoreError};
use remedian_core::executor::{
    ActionExecutionResult, DryRunExecutor, Executor, ExecutorRoute, ExecutorRouter,
    HttpProbeExecutor,
};
use remedian_core::lifecycle::{self, ActionStatus, RollbackStatus, TransitionError};
use remedian_core::policy::{ExecutionPolicy, PolicyDecision, ProposePolicy, RulePolicy};
use remedian_core::telemetry::Telemetry;
use remedian_core::throttle::{ExecutionThrottle, ThrottleDecision};
use remedian_core::types::DbId;
use remedian_db::models::action_record::{ActionRecord, ActionRecordQuery, CreateActionRecord};
use remedian_db::models::approval::{ApprovalRecord, CreateApproval};
use remedian_db::models::execution_log::{CreateExecutionLog, ExecutionLog};
use remedian_db::repositories::{ActionRecordRepo, ApprovalRepo, ExecutionLogRepo};
use remedian_db::DbPool;
use serde::Serialize;
use uuid::Uuid;

use crate::config::GovernanceConfig;
use crate::error::{AppError, AppResult};

/// Throttle operation kinds; "execute" and "rollback_execute" never share
/// a counter.
const OP_EXECUTE: &str = "execute";
const OP_ROLLBACK_EXECUTE: &str = "rollback_execute";

/// Input to [`SafeActionEngine::propose`].
#[derive(Debug, Clone)]
pub struct ProposeAction {
    pub run_id: Uuid,
    pub action_type: String,
    pub proposed_payload: serde_json::Value,
    pub rollback_payload: Option<serde_json::Value>,
    pub manual_rollback_guidance: Option<String>,
}

/// Audit summary row for the batch endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSummaryRow {
    pub action_record_id: DbId,
    #[serde(flatten)]
    pub summary: AuditSummary,
}

/// The orchestrator. Cheap to share behind an `Arc`; holds no per-record
/// locks — the version check on save is the serialization point.
pub struct SafeActionEngine {
    pool: DbPool,
    catalog: ActionCatalog,
    propose_policy: Arc<dyn ProposePolicy>,
    execution_policy: Arc<dyn ExecutionPolicy>,
    router: ExecutorRouter,
    throttle: ExecutionThrottle,
    telemetry: Arc<Telemetry>,
}

impl SafeActionEngine {
    /// Wire the engine from governance configuration: rule policies on
    /// both gates, flag-gated executor routes over the built-in catalog,
    /// and the fixed-window throttle.
    pub fn from_config(pool: DbPool, governance: &GovernanceConfig) -> Self {
        let policy = Arc::new(RulePolicy::new(
            governance.suspended_tenants.clone(),
            governance.propose_deny_rules.clone(),
            governance.execution_deny_rules.clone(),
        ));

        let timeout = Duration::from_secs(governance.executor_timeout_secs);
        let routes = governance
            .executor_flags
            .iter()
            .map(|(action_type, enabled)| ExecutorRoute {
                action_type: action_type.clone(),
                enabled: *enabled,
                executor: match action_type.as_str() {
                    "http_probe" => Executor::HttpProbe(HttpProbeExecutor::new(timeout)),
                    _ => Executor::DryRun(DryRunExecutor),
                },
            })
            .collect();

        Self::new(
            pool,
            ActionCatalog::builtin(),
            policy.clone(),
            policy,
            ExecutorRouter::new(routes, timeout),
            ExecutionThrottle::new(governance.throttle.clone()),
            Arc::new(Telemetry::default()),
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: DbPool,
        catalog: ActionCatalog,
        propose_policy: Arc<dyn ProposePolicy>,
        execution_policy: Arc<dyn ExecutionPolicy>,
        router: ExecutorRouter,
        throttle: ExecutionThrottle,
        telemetry: Arc<Telemetry>,
    ) -> Self {
        Self {
            pool,
            catalog,
            propose_policy,
            execution_policy,
            router,
            throttle,
            telemetry,
        }
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    // -----------------------------------------------------------------
    // Lifecycle: propose / approve / reject
    // -----------------------------------------------------------------

    /// Propose a new safe action. Catalog and policy gates run before any
    /// persistence; a denial never creates a row.
    pub async fn propose(&self, tenant_id: &str, input: ProposeAction) -> AppResult<ActionRecord> {
        if !self.catalog.is_allowed(&input.action_type) {
            self.telemetry.record_catalog_denial();
            return Err(denied(
                reason::ACTION_TYPE_NOT_ALLOWED,
                format!("Action type '{}' is not allowlisted", input.action_type),
            ));
        }

        let decision = self
            .propose_policy
            .evaluate(tenant_id, &input.action_type)
            .await;
        self.check_policy(decision)?;

        // Rollback starts Available only when the proposal carries a way
        // to undo itself.
        let rollback_status =
            if input.rollback_payload.is_some() || input.manual_rollback_guidance.is_some() {
                RollbackStatus::Available
            } else {
                RollbackStatus::None
            };

        let record = ActionRecordRepo::insert(
            &self.pool,
            &CreateActionRecord {
                tenant_id: tenant_id.to_string(),
                run_id: input.run_id,
                action_type: input.action_type,
                proposed_payload: input.proposed_payload,
                rollback_payload: input.rollback_payload,
                manual_rollback_guidance: input.manual_rollback_guidance,
                rollback_status_id: rollback_status.id(),
            },
        )
        .await?;

        tracing::info!(
            action_record_id = record.id,
            tenant_id = %record.tenant_id,
            action_type = %record.action_type,
            "Safe action proposed"
        );
        Ok(record)
    }

    /// Record an approval decision on a proposed action.
    pub async fn approve(
        &self,
        id: DbId,
        approver: &str,
        reason_text: Option<String>,
    ) -> AppResult<ActionRecord> {
        self.decide(id, approver, reason_text, DECISION_APPROVED).await
    }

    /// Record a rejection decision on a proposed action.
    pub async fn reject(
        &self,
        id: DbId,
        approver: &str,
        reason_text: Option<String>,
    ) -> AppResult<ActionRecord> {
        self.decide(id, approver, reason_text, DECISION_REJECTED).await
    }

    async fn decide(
        &self,
        id: DbId,
        approver: &str,
        reason_text: Option<String>,
        decision: &str,
    ) -> AppResult<ActionRecord> {
        let record = self.load(id).await?;
        let status = action_status(&record)?;

        let next = if decision == DECISION_APPROVED {
            lifecycle::approve(status).map_err(conflict)?
        } else {
            lifecycle::reject(status).map_err(conflict)?
        };

        // Status transition and approval row land atomically.
        let mut tx = self.pool.begin().await?;
        let updated = ActionRecordRepo::set_status(&mut *tx, id, record.version, next.id())
            .await?
            .ok_or_else(|| self.replay_conflict("decision", id))?;

        ApprovalRepo::insert(
            &mut *tx,
            &CreateApproval {
                action_record_id: id,
                approver_identity: approver.to_string(),
                decision: decision.to_string(),
                reason: reason_text,
                target: TARGET_ACTION.to_string(),
            },
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            action_record_id = id,
            approver = approver,
            decision = decision,
            "Safe action decision recorded"
        );
        Ok(updated)
    }

    // -----------------------------------------------------------------
    // Lifecycle: execute
    // -----------------------------------------------------------------

    /// Execute an approved action.
    ///
    /// Gate order: execution policy, throttle, replay guard. The
    /// `Executing` transition persists before dispatch; exactly one
    /// execution log is appended regardless of the executor outcome.
    pub async fn execute(&self, id: DbId) -> AppResult<ActionRecord> {
        let record = self.load(id).await?;
        self.telemetry.record_execution_attempt();

        let decision = self
            .execution_policy
            .evaluate_execution(&record.tenant_id, &record.action_type)
            .await;
        self.check_policy(decision)?;

        self.check_throttle(&record, OP_EXECUTE)?;

        // Replay guard: only an Approved record may start executing.
        let status = action_status(&record)?;
        let executing = lifecycle::begin_execute(status).map_err(|err| {
            self.telemetry.record_replay_conflict();
            conflict(err)
        })?;

        let request_payload = record.proposed_payload.clone();
        ActionRecordRepo::begin_execution(
            &self.pool,
            id,
            record.version,
            executing.id(),
            &request_payload,
        )
        .await?
        .ok_or_else(|| self.replay_conflict(OP_EXECUTE, id))?;

        let result = self.router.execute(&record.action_type, &request_payload).await;

        self.append_log(id, EXECUTION_TYPE_EXECUTE, &request_payload, &result)
            .await?;

        // Keyed on Executing, which only this caller could have entered;
        // rollback-track writes in the meantime do not invalidate it.
        let terminal = lifecycle::finish_execute(executing, result.success).map_err(conflict)?;
        let updated = ActionRecordRepo::finish_execution(
            &self.pool,
            id,
            executing.id(),
            terminal.id(),
            &result.response,
        )
        .await?
        .ok_or_else(|| {
            AppError::InternalError(format!("Record {id} left Executing before its outcome landed"))
        })?;

        tracing::info!(
            action_record_id = id,
            action_type = %record.action_type,
            success = result.success,
            duration_ms = result.duration_ms,
            "Safe action executed"
        );
        Ok(updated)
    }

    // -----------------------------------------------------------------
    // Lifecycle: rollback
    // -----------------------------------------------------------------

    /// Request a rollback of an action that was cleared to run.
    pub async fn request_rollback(&self, id: DbId) -> AppResult<ActionRecord> {
        let record = self.load(id).await?;
        let next = lifecycle::request_rollback(action_status(&record)?, rollback_status(&record)?)
            .map_err(conflict)?;

        let updated =
            ActionRecordRepo::set_rollback_status(&self.pool, id, record.version, next.id())
                .await?
                .ok_or_else(|| self.replay_conflict("rollback request", id))?;

        tracing::info!(action_record_id = id, "Rollback requested");
        Ok(updated)
    }

    /// Record an approval of a requested rollback.
    pub async fn approve_rollback(
        &self,
        id: DbId,
        approver: &str,
        reason_text: Option<String>,
    ) -> AppResult<ActionRecord> {
        let record = self.load(id).await?;
        let next = lifecycle::approve_rollback(rollback_status(&record)?).map_err(conflict)?;

        let mut tx = self.pool.begin().await?;
        let updated =
            ActionRecordRepo::set_rollback_status(&mut *tx, id, record.version, next.id())
                .await?
                .ok_or_else(|| self.replay_conflict("rollback approval", id))?;

        ApprovalRepo::insert(
            &mut *tx,
            &CreateApproval {
                action_record_id: id,
                approver_identity: approver.to_string(),
                decision: DECISION_APPROVED.to_string(),
                reason: reason_text,
                target: TARGET_ROLLBACK.to_string(),
            },
        )
        .await?;
        tx.commit().await?;

        tracing::info!(action_record_id = id, approver = approver, "Rollback approved");
        Ok(updated)
    }

    /// Execute an approved rollback.
    ///
    /// A missing rollback payload is a hard precondition failure checked
    /// before any gate is consulted.
    pub async fn execute_rollback(&self, id: DbId) -> AppResult<ActionRecord> {
        let record = self.load(id).await?;

        let Some(rollback_payload) = record.rollback_payload.clone() else {
            return Err(AppError::Core(CoreError::Precondition {
                reason_code: reason::ROLLBACK_PAYLOAD_MISSING,
                message: match &record.manual_rollback_guidance {
                    Some(guidance) => {
                        format!("No automated rollback; manual guidance: {guidance}")
                    }
                    None => "Record has no rollback payload".to_string(),
                },
            }));
        };

        self.telemetry.record_execution_attempt();

        let decision = self
            .execution_policy
            .evaluate_execution(&record.tenant_id, &record.action_type)
            .await;
        self.check_policy(decision)?;

        self.check_throttle(&record, OP_ROLLBACK_EXECUTE)?;

        let rolling = lifecycle::begin_rollback_execute(rollback_status(&record)?).map_err(
            |err| {
                self.telemetry.record_replay_conflict();
                conflict(err)
            },
        )?;

        ActionRecordRepo::set_rollback_status(&self.pool, id, record.version, rolling.id())
            .await?
            .ok_or_else(|| self.replay_conflict(OP_ROLLBACK_EXECUTE, id))?;

        let result = self
            .router
            .rollback(&record.action_type, &rollback_payload)
            .await;

        self.append_log(id, EXECUTION_TYPE_ROLLBACK, &rollback_payload, &result)
            .await?;

        let terminal =
            lifecycle::finish_rollback_execute(rolling, result.success).map_err(conflict)?;
        let updated = ActionRecordRepo::finish_rollback(
            &self.pool,
            id,
            rolling.id(),
            terminal.id(),
            &result.response,
        )
        .await?
        .ok_or_else(|| {
            AppError::InternalError(format!(
                "Record {id} left RollingBack before its outcome landed"
            ))
        })?;

        tracing::info!(
            action_record_id = id,
            success = result.success,
            "Rollback executed"
        );
        Ok(updated)
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    /// Load one record. Pure read.
    pub async fn get(&self, id: DbId) -> AppResult<ActionRecord> {
        self.load(id).await
    }

    /// A tenant's records, newest first.
    pub async fn list_by_tenant(
        &self,
        tenant_id: &str,
        limit: Option<i64>,
    ) -> AppResult<Vec<ActionRecord>> {
        Ok(ActionRecordRepo::list_by_tenant(&self.pool, tenant_id, limit).await?)
    }

    /// All records correlated to one agent run.
    pub async fn list_by_run(&self, tenant_id: &str, run_id: Uuid) -> AppResult<Vec<ActionRecord>> {
        Ok(ActionRecordRepo::list_by_run(&self.pool, tenant_id, run_id).await?)
    }

    /// Filtered tenant-scoped query.
    pub async fn query_by_tenant(
        &self,
        tenant_id: &str,
        params: &ActionRecordQuery,
    ) -> AppResult<Vec<ActionRecord>> {
        Ok(ActionRecordRepo::query(&self.pool, tenant_id, params).await?)
    }

    /// Approvals for one record, oldest first.
    pub async fn approvals_for_action(&self, id: DbId) -> AppResult<Vec<ApprovalRecord>> {
        self.load(id).await?;
        Ok(ApprovalRepo::list_for_action(&self.pool, id).await?)
    }

    /// Execution logs for one record, oldest first.
    pub async fn execution_logs_for_action(&self, id: DbId) -> AppResult<Vec<ExecutionLog>> {
        self.load(id).await?;
        Ok(ExecutionLogRepo::list_for_action(&self.pool, id).await?)
    }

    /// Audit summary for one record.
    pub async fn audit_summary(&self, id: DbId) -> AppResult<AuditSummary> {
        let approvals = ApprovalRepo::list_for_action(&self.pool, id).await?;
        let logs = ExecutionLogRepo::list_for_action(&self.pool, id).await?;
        Ok(audit::summarize(
            &approvals.iter().map(approval_event).collect::<Vec<_>>(),
            &logs.iter().map(execution_event).collect::<Vec<_>>(),
        ))
    }

    /// Batch audit summaries for a tenant's most recent records.
    pub async fn audit_summaries(
        &self,
        tenant_id: &str,
        limit: Option<i64>,
    ) -> AppResult<Vec<AuditSummaryRow>> {
        let records = ActionRecordRepo::list_by_tenant(&self.pool, tenant_id, limit).await?;
        let ids: Vec<DbId> = records.iter().map(|r| r.id).collect();

        let approvals = ApprovalRepo::list_for_actions(&self.pool, &ids).await?;
        let logs = ExecutionLogRepo::list_for_actions(&self.pool, &ids).await?;

        Ok(records
            .iter()
            .map(|record| {
                let record_approvals: Vec<ApprovalEvent> = approvals
                    .iter()
                    .filter(|a| a.action_record_id == record.id)
                    .map(approval_event)
                    .collect();
                let record_logs: Vec<ExecutionEvent> = logs
                    .iter()
                    .filter(|l| l.action_record_id == record.id)
                    .map(execution_event)
                    .collect();
                AuditSummaryRow {
                    action_record_id: record.id,
                    summary: audit::summarize(&record_approvals, &record_logs),
                }
            })
            .collect())
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    async fn load(&self, id: DbId) -> AppResult<ActionRecord> {
        ActionRecordRepo::find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::Core(CoreError::NotFound {
                entity: "ActionRecord",
                id,
            }))
    }

    fn check_policy(&self, decision: PolicyDecision) -> AppResult<()> {
        if decision.allowed {
            return Ok(());
        }
        self.telemetry.record_policy_denial();
        Err(denied(
            decision
                .reason_code
                .unwrap_or_else(|| "policy_denied".to_string()),
            decision
                .message
                .unwrap_or_else(|| "Denied by policy".to_string()),
        ))
    }

    fn check_throttle(&self, record: &ActionRecord, operation: &str) -> AppResult<()> {
        match self
            .throttle
            .allow(&record.tenant_id, &record.action_type, operation)
        {
            ThrottleDecision::Allowed => Ok(()),
            ThrottleDecision::Denied { retry_after_secs } => {
                self.telemetry.record_throttled();
                tracing::warn!(
                    action_record_id = record.id,
                    tenant_id = %record.tenant_id,
                    operation = operation,
                    retry_after_secs,
                    "Execution throttled"
                );
                Err(AppError::Core(CoreError::Throttled { retry_after_secs }))
            }
        }
    }

    /// The version check on save lost: another caller transitioned the
    /// record between our read and our write.
    fn replay_conflict(&self, operation: &str, id: DbId) -> AppError {
        self.telemetry.record_replay_conflict();
        tracing::warn!(action_record_id = id, operation, "Concurrent transition detected");
        AppError::Core(CoreError::Conflict(format!(
            "Record {id} was modified concurrently during {operation}"
        )))
    }

    async fn append_log(
        &self,
        id: DbId,
        execution_type: &str,
        request_payload: &serde_json::Value,
        result: &ActionExecutionResult,
    ) -> AppResult<()> {
        ExecutionLogRepo::insert(
            &self.pool,
            &CreateExecutionLog {
                action_record_id: id,
                execution_type: execution_type.to_string(),
                request_payload: request_payload.clone(),
                response_payload: Some(result.response.clone()),
                status: if result.success {
                    EXECUTION_SUCCESS.to_string()
                } else {
                    EXECUTION_FAILED.to_string()
                },
                duration_ms: result.duration_ms,
            },
        )
        .await?;
        Ok(())
    }
}

fn denied(reason_code: impl Into<String>, message: impl Into<String>) -> AppError {
    AppError::Core(CoreError::Denied {
        reason_code: reason_code.into(),
        message: message.into(),
    })
}

fn conflict(err: TransitionError) -> AppError {
    AppError::Core(CoreError::Conflict(err.to_string()))
}

/// Decode the stored status ID; a value outside the enum is data
/// corruption, not a client error.
fn action_status(record: &ActionRecord) -> AppResult<ActionStatus> {
    ActionStatus::from_id(record.status_id).ok_or_else(|| {
        AppError::InternalError(format!(
            "Record {} has invalid status_id {}",
            record.id, record.status_id
        ))
    })
}

fn rollback_status(record: &ActionRecord) -> AppResult<RollbackStatus> {
    RollbackStatus::from_id(record.rollback_status_id).ok_or_else(|| {
        AppError::InternalError(format!(
            "Record {} has invalid rollback_status_id {}",
            record.id, record.rollback_status_id
        ))
    })
}

fn approval_event(record: &ApprovalRecord) -> ApprovalEvent {
    ApprovalEvent {
        decision: record.decision.clone(),
        at: record.created_at,
    }
}

fn execution_event(record: &ExecutionLog) -> ExecutionEvent {
    ExecutionEvent {
        success: record.status == EXECUTION_SUCCESS,
        at: record.executed_at,
    }
}

//! Integration tests for the safe action lifecycle endpoints.
//!
//! These exercise the full stack: router, identity extractors, the
//! orchestrator, and the Postgres repositories.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, build_test_app, build_test_app_with, execution_enabled_config, get_as, post_empty,
    post_json, propose_action, propose_and_approve, ACTOR, TENANT,
};
use remedian_core::lifecycle::ActionStatus;
use remedian_db::repositories::ActionRecordRepo;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

// Status lookup IDs as seeded by the migrations.
const STATUS_PROPOSED: i64 = 1;
const STATUS_APPROVED: i64 = 2;
const STATUS_REJECTED: i64 = 3;
const STATUS_COMPLETED: i64 = 5;
const STATUS_FAILED: i64 = 6;
const ROLLBACK_NONE: i64 = 1;
const ROLLBACK_AVAILABLE: i64 = 2;
const ROLLBACK_REQUESTED: i64 = 3;

// ---------------------------------------------------------------------------
// Propose
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn propose_creates_proposed_record(pool: PgPool) {
    let app = build_test_app(pool);

    let response = post_json(
        app.clone(),
        "/api/v1/safe-actions",
        TENANT,
        None,
        json!({
            "runId": Uuid::new_v4(),
            "actionType": "restart_pod",
            "proposedPayload": {"namespace": "prod", "pod": "api-0"},
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["statusId"], STATUS_PROPOSED);
    assert_eq!(json["data"]["rollbackStatusId"], ROLLBACK_NONE);
    assert_eq!(json["data"]["version"], 1);
    assert_eq!(json["data"]["tenantId"], TENANT);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn propose_with_rollback_payload_starts_available(pool: PgPool) {
    let app = build_test_app(pool);

    let response = post_json(
        app.clone(),
        "/api/v1/safe-actions",
        TENANT,
        None,
        json!({
            "runId": Uuid::new_v4(),
            "actionType": "scale_deployment",
            "proposedPayload": {"deployment": "api", "replicas": 5},
            "rollbackPayload": {"deployment": "api", "replicas": 3},
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["rollbackStatusId"], ROLLBACK_AVAILABLE);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn propose_unknown_action_type_creates_nothing(pool: PgPool) {
    let app = build_test_app(pool);

    let response = post_json(
        app.clone(),
        "/api/v1/safe-actions",
        TENANT,
        None,
        json!({
            "runId": Uuid::new_v4(),
            "actionType": "drop_database",
            "proposedPayload": {},
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "action_type_not_allowed");

    // The denial must not have persisted a record.
    let response = get_as(app, "/api/v1/safe-actions", TENANT).await;
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn propose_without_tenant_header_is_rejected(pool: PgPool) {
    let app = build_test_app(pool);

    let response = post_json(
        app,
        "/api/v1/safe-actions",
        "", // empty header value counts as missing
        None,
        json!({
            "runId": Uuid::new_v4(),
            "actionType": "restart_pod",
            "proposedPayload": {},
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn propose_denied_tenant_creates_nothing(pool: PgPool) {
    let mut config = common::test_config();
    config
        .governance
        .suspended_tenants
        .insert(TENANT.to_string());
    let app = build_test_app_with(pool, config);

    let response = post_json(
        app,
        "/api/v1/safe-actions",
        TENANT,
        None,
        json!({
            "runId": Uuid::new_v4(),
            "actionType": "restart_pod",
            "proposedPayload": {},
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "tenant_suspended");
}

// ---------------------------------------------------------------------------
// Approve / reject
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn approve_requires_actor_identity(pool: PgPool) {
    let app = build_test_app(pool);
    let id = propose_action(&app, TENANT).await;

    let response = post_empty(
        app,
        &format!("/api/v1/safe-actions/{id}/approve"),
        TENANT,
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn approve_transitions_and_records_approval(pool: PgPool) {
    let app = build_test_app(pool);
    let id = propose_action(&app, TENANT).await;

    let response = post_json(
        app.clone(),
        &format!("/api/v1/safe-actions/{id}/approve"),
        TENANT,
        Some(ACTOR),
        json!({"reason": "looks safe"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["statusId"], STATUS_APPROVED);
    assert_eq!(json["data"]["version"], 2);

    let response = get_as(
        app,
        &format!("/api/v1/safe-actions/{id}/approvals"),
        TENANT,
    )
    .await;
    let json = body_json(response).await;
    let approvals = json["data"].as_array().unwrap();
    assert_eq!(approvals.len(), 1);
    assert_eq!(approvals[0]["decision"], "approved");
    assert_eq!(approvals[0]["approverIdentity"], ACTOR);
    assert_eq!(approvals[0]["reason"], "looks safe");
    assert_eq!(approvals[0]["target"], "action");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn decisions_are_monotonic(pool: PgPool) {
    let app = build_test_app(pool);
    let id = propose_action(&app, TENANT).await;

    let response = post_empty(
        app.clone(),
        &format!("/api/v1/safe-actions/{id}/reject"),
        TENANT,
        Some(ACTOR),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["statusId"], STATUS_REJECTED);

    // A rejected record cannot be approved afterwards.
    let response = post_empty(
        app,
        &format!("/api/v1/safe-actions/{id}/approve"),
        TENANT,
        Some(ACTOR),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

// ---------------------------------------------------------------------------
// Execute
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn execute_disabled_returns_501_without_mutation(pool: PgPool) {
    let app = build_test_app(pool); // execution off by default
    let id = propose_and_approve(&app, TENANT).await;

    let response = post_empty(
        app.clone(),
        &format!("/api/v1/safe-actions/{id}/execute"),
        TENANT,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);

    // Record untouched, no log rows.
    let response = get_as(app.clone(), &format!("/api/v1/safe-actions/{id}"), TENANT).await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["statusId"], STATUS_APPROVED);
    assert_eq!(json["data"]["executionLogs"].as_array().unwrap().len(), 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn execute_dry_run_completes_and_logs(pool: PgPool) {
    let app = build_test_app_with(pool, execution_enabled_config());
    let id = propose_and_approve(&app, TENANT).await;

    let response = post_empty(
        app.clone(),
        &format!("/api/v1/safe-actions/{id}/execute"),
        TENANT,
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["statusId"], STATUS_COMPLETED);
    assert_eq!(json["data"]["outcome"]["mode"], "dry-run");
    // The execution payload snapshots the proposed payload.
    assert_eq!(
        json["data"]["executionPayload"],
        json["data"]["proposedPayload"]
    );

    let response = get_as(
        app,
        &format!("/api/v1/safe-actions/{id}/executions"),
        TENANT,
    )
    .await;
    let json = body_json(response).await;
    let logs = json["data"].as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["executionType"], "execute");
    assert_eq!(logs[0]["status"], "success");
    assert_eq!(logs[0]["responsePayload"]["mode"], "dry-run");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn execute_simulated_failure_marks_failed_and_logs(pool: PgPool) {
    let app = build_test_app_with(pool, execution_enabled_config());

    let response = post_json(
        app.clone(),
        "/api/v1/safe-actions",
        TENANT,
        None,
        json!({
            "runId": Uuid::new_v4(),
            "actionType": "restart_pod",
            "proposedPayload": {"simulateFailure": true},
        }),
    )
    .await;
    let id = body_json(response).await["data"]["id"].as_i64().unwrap();

    post_empty(
        app.clone(),
        &format!("/api/v1/safe-actions/{id}/approve"),
        TENANT,
        Some(ACTOR),
    )
    .await;

    let response = post_empty(
        app.clone(),
        &format!("/api/v1/safe-actions/{id}/execute"),
        TENANT,
        None,
    )
    .await;

    // Executor failures are not transport errors: the request succeeds and
    // the record lands in Failed.
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["statusId"], STATUS_FAILED);
    assert_eq!(json["data"]["outcome"]["reasonCode"], "simulated_failure");

    let response = get_as(
        app,
        &format!("/api/v1/safe-actions/{id}/executions"),
        TENANT,
    )
    .await;
    let logs_json = body_json(response).await;
    let logs = logs_json["data"].as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["status"], "failed");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn execute_unapproved_record_conflicts(pool: PgPool) {
    let app = build_test_app_with(pool, execution_enabled_config());
    let id = propose_action(&app, TENANT).await;

    let response = post_empty(
        app,
        &format!("/api/v1/safe-actions/{id}/execute"),
        TENANT,
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn execute_twice_conflicts(pool: PgPool) {
    let app = build_test_app_with(pool, execution_enabled_config());
    let id = propose_and_approve(&app, TENANT).await;

    let response = post_empty(
        app.clone(),
        &format!("/api/v1/safe-actions/{id}/execute"),
        TENANT,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Replaying the execute request must not run the executor again.
    let response = post_empty(
        app.clone(),
        &format!("/api/v1/safe-actions/{id}/execute"),
        TENANT,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = get_as(
        app,
        &format!("/api/v1/safe-actions/{id}/executions"),
        TENANT,
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn concurrent_executes_have_exactly_one_winner(pool: PgPool) {
    let app = build_test_app_with(pool, execution_enabled_config());
    let id = propose_and_approve(&app, TENANT).await;

    // Both requests read the Approved record; the version check on the
    // Executing write decides who dispatches.
    let uri = format!("/api/v1/safe-actions/{id}/execute");
    let (first, second) = tokio::join!(
        post_empty(app.clone(), &uri, TENANT, None),
        post_empty(app.clone(), &uri, TENANT, None),
    );

    let mut statuses = [first.status(), second.status()];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::CONFLICT]);

    let response = get_as(
        app.clone(),
        &format!("/api/v1/safe-actions/{id}/executions"),
        TENANT,
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    let response = get_as(app, &format!("/api/v1/safe-actions/{id}"), TENANT).await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["statusId"], STATUS_COMPLETED);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn rollback_request_mid_execution_does_not_strand_the_record(pool: PgPool) {
    let app = build_test_app_with(pool.clone(), execution_enabled_config());

    let response = post_json(
        app.clone(),
        "/api/v1/safe-actions",
        TENANT,
        None,
        json!({
            "runId": Uuid::new_v4(),
            "actionType": "scale_deployment",
            "proposedPayload": {"deployment": "api", "replicas": 5},
            "rollbackPayload": {"deployment": "api", "replicas": 3},
        }),
    )
    .await;
    let id = body_json(response).await["data"]["id"].as_i64().unwrap();
    post_empty(
        app.clone(),
        &format!("/api/v1/safe-actions/{id}/approve"),
        TENANT,
        Some(ACTOR),
    )
    .await;

    // Hold the record in the in-flight state, as a long-running executor
    // dispatch would.
    let record = ActionRecordRepo::find_by_id(&pool, id)
        .await
        .unwrap()
        .unwrap();
    ActionRecordRepo::begin_execution(
        &pool,
        id,
        record.version,
        ActionStatus::Executing.id(),
        &record.proposed_payload,
    )
    .await
    .unwrap()
    .unwrap();

    // A rollback request lands while the executor is still running.
    let response = post_empty(
        app.clone(),
        &format!("/api/v1/safe-actions/{id}/rollback"),
        TENANT,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // The terminal write is keyed on Executing, so the rollback-track
    // version bump must not orphan the outcome.
    let finished = ActionRecordRepo::finish_execution(
        &pool,
        id,
        ActionStatus::Executing.id(),
        ActionStatus::Completed.id(),
        &json!({"status": "ok"}),
    )
    .await
    .unwrap()
    .expect("terminal write landed");
    assert_eq!(finished.status_id, ActionStatus::Completed.id());

    let response = get_as(app, &format!("/api/v1/safe-actions/{id}"), TENANT).await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["statusId"], STATUS_COMPLETED);
    assert_eq!(json["data"]["rollbackStatusId"], ROLLBACK_REQUESTED);
    assert_eq!(json["data"]["outcome"]["status"], "ok");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn execution_policy_denies_independently_of_propose(pool: PgPool) {
    let mut config = execution_enabled_config();
    // Allowed at propose time, denied at execute time.
    config
        .governance
        .execution_deny_rules
        .entry(TENANT.to_string())
        .or_default()
        .insert("restart_pod".to_string());
    let app = build_test_app_with(pool, config);

    let id = propose_and_approve(&app, TENANT).await;

    let response = post_empty(
        app,
        &format!("/api/v1/safe-actions/{id}/execute"),
        TENANT,
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "action_denied_for_tenant");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn throttled_execute_returns_429_with_retry_after(pool: PgPool) {
    let mut config = execution_enabled_config();
    config.governance.throttle.enabled = true;
    config.governance.throttle.window_secs = 60;
    config.governance.throttle.max_attempts = 1;
    let app = build_test_app_with(pool, config);

    let first = propose_and_approve(&app, TENANT).await;
    let second = propose_and_approve(&app, TENANT).await;

    let response = post_empty(
        app.clone(),
        &format!("/api/v1/safe-actions/{first}/execute"),
        TENANT,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Same tenant, action type, and operation kind within the window.
    let response = post_empty(
        app.clone(),
        &format!("/api/v1/safe-actions/{second}/execute"),
        TENANT,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().get("retry-after").is_some());

    // The throttled record is untouched and still executable later.
    let response = get_as(app, &format!("/api/v1/safe-actions/{second}"), TENANT).await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["statusId"], STATUS_APPROVED);
}

// ---------------------------------------------------------------------------
// Tenant scoping and queries
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn records_are_invisible_across_tenants(pool: PgPool) {
    let app = build_test_app(pool);
    let id = propose_action(&app, TENANT).await;

    let response = get_as(
        app.clone(),
        &format!("/api/v1/safe-actions/{id}"),
        "tenant-b",
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get_as(app, "/api/v1/safe-actions", "tenant-b").await;
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn list_filters_by_status_label(pool: PgPool) {
    let app = build_test_app(pool);
    let _proposed = propose_action(&app, TENANT).await;
    let approved = propose_and_approve(&app, TENANT).await;

    let response = get_as(app.clone(), "/api/v1/safe-actions?status=approved", TENANT).await;
    let json = body_json(response).await;
    let records = json["data"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["id"], approved);

    let response = get_as(app, "/api/v1/safe-actions?status=nonsense", TENANT).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn list_rejects_inverted_date_range(pool: PgPool) {
    let app = build_test_app(pool);

    let response = get_as(
        app,
        "/api/v1/safe-actions?fromUtc=2026-08-02T00:00:00Z&toUtc=2026-08-01T00:00:00Z",
        TENANT,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn list_filters_by_run_id(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let run_id = Uuid::new_v4();

    post_json(
        app.clone(),
        "/api/v1/safe-actions",
        TENANT,
        None,
        json!({
            "runId": run_id,
            "actionType": "restart_pod",
            "proposedPayload": {},
        }),
    )
    .await;
    propose_action(&app, TENANT).await;

    let response = get_as(
        app.clone(),
        &format!("/api/v1/safe-actions?runId={run_id}"),
        TENANT,
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    // The run-scoped endpoint returns the same record.
    let response = get_as(
        app,
        &format!("/api/v1/safe-actions/runs/{run_id}"),
        TENANT,
    )
    .await;
    let json = body_json(response).await;
    let records = json["data"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["runId"], run_id.to_string());
}

// ---------------------------------------------------------------------------
// Detail and audit summary
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn detail_includes_history_and_audit_summary(pool: PgPool) {
    let app = build_test_app_with(pool, execution_enabled_config());
    let id = propose_and_approve(&app, TENANT).await;

    post_empty(
        app.clone(),
        &format!("/api/v1/safe-actions/{id}/execute"),
        TENANT,
        None,
    )
    .await;

    let response = get_as(app, &format!("/api/v1/safe-actions/{id}"), TENANT).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    assert_eq!(json["data"]["approvals"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"]["executionLogs"].as_array().unwrap().len(), 1);

    let summary = &json["data"]["auditSummary"];
    assert_eq!(summary["approvalCount"], 1);
    assert_eq!(summary["executionLogCount"], 1);
    assert_eq!(summary["lastExecutionSuccess"], true);
    assert_eq!(summary["lastApprovalDecision"], "approved");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn audit_summaries_cover_the_tenant(pool: PgPool) {
    let app = build_test_app(pool);
    let first = propose_and_approve(&app, TENANT).await;
    let second = propose_action(&app, TENANT).await;

    let response = get_as(app, "/api/v1/safe-actions/audit-summaries", TENANT).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let rows = json["data"].as_array().unwrap();
    assert_eq!(rows.len(), 2);

    let first_row = rows
        .iter()
        .find(|row| row["actionRecordId"] == first)
        .unwrap();
    assert_eq!(first_row["approvalCount"], 1);

    let second_row = rows
        .iter()
        .find(|row| row["actionRecordId"] == second)
        .unwrap();
    assert_eq!(second_row["approvalCount"], 0);
}

// ---------------------------------------------------------------------------
// Telemetry
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn telemetry_counts_denials_and_attempts(pool: PgPool) {
    let app = build_test_app_with(pool, execution_enabled_config());

    // One catalog denial.
    post_json(
        app.clone(),
        "/api/v1/safe-actions",
        TENANT,
        None,
        json!({
            "runId": Uuid::new_v4(),
            "actionType": "drop_database",
            "proposedPayload": {},
        }),
    )
    .await;

    // One successful execution attempt.
    let id = propose_and_approve(&app, TENANT).await;
    post_empty(
        app.clone(),
        &format!("/api/v1/safe-actions/{id}/execute"),
        TENANT,
        None,
    )
    .await;

    let response = get_as(app, "/api/v1/ops/telemetry", TENANT).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["catalogDenials"], 1);
    assert_eq!(json["data"]["executionAttempts"], 1);
}

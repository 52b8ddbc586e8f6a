use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{
    Actor, ApplicationKey, ApplicationType, ApprovalStatus, TransitionAction,
};
use super::engine::WorkflowError;
use super::repository::{AlarmStore, ApplicationStore, ApproverDirectory, RejectionLedger};
use super::service::ApprovalService;

/// Decision request carrying the upstream-resolved actor claims.
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionRequest {
    pub actor: Actor,
    pub action: TransitionAction,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResubmitRequest {
    pub actor: Actor,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PendingRequest {
    pub actor: Actor,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransitionResponse {
    pub application_type: ApplicationType,
    pub seq: u64,
    pub status: ApprovalStatus,
}

/// Router builder exposing the approval workflow over HTTP.
pub fn approval_router<S, L, A, D>(service: Arc<ApprovalService<S, L, A, D>>) -> Router
where
    S: ApplicationStore + 'static,
    L: RejectionLedger + 'static,
    A: AlarmStore + 'static,
    D: ApproverDirectory + 'static,
{
    Router::new()
        .route(
            "/api/v1/approvals/:application_type/:seq/decision",
            post(decision_handler::<S, L, A, D>),
        )
        .route(
            "/api/v1/approvals/:application_type/:seq/resubmit",
            post(resubmit_handler::<S, L, A, D>),
        )
        .route(
            "/api/v1/approvals/:application_type/:seq/rejections",
            get(rejections_handler::<S, L, A, D>),
        )
        .route(
            "/api/v1/approvals/pending",
            post(pending_handler::<S, L, A, D>),
        )
        .route(
            "/api/v1/alarms/:user_id",
            get(all_alarms_handler::<S, L, A, D>),
        )
        .route(
            "/api/v1/alarms/:user_id/unread",
            get(unread_alarms_handler::<S, L, A, D>),
        )
        .route(
            "/api/v1/alarms/:user_id/read-all",
            post(mark_all_read_handler::<S, L, A, D>),
        )
        .route(
            "/api/v1/alarms/read/:alarm_seq",
            post(mark_read_handler::<S, L, A, D>),
        )
        .with_state(service)
}

pub(crate) async fn decision_handler<S, L, A, D>(
    State(service): State<Arc<ApprovalService<S, L, A, D>>>,
    Path((application_type, seq)): Path<(String, u64)>,
    axum::Json(request): axum::Json<DecisionRequest>,
) -> Response
where
    S: ApplicationStore + 'static,
    L: RejectionLedger + 'static,
    A: AlarmStore + 'static,
    D: ApproverDirectory + 'static,
{
    let key = match parse_key(&application_type, seq) {
        Ok(key) => key,
        Err(response) => return response,
    };

    match service.transition(&key, &request.actor, request.action, request.reason.as_deref()) {
        Ok(status) => (
            StatusCode::OK,
            axum::Json(TransitionResponse {
                application_type: key.application_type,
                seq: key.seq,
                status,
            }),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn resubmit_handler<S, L, A, D>(
    State(service): State<Arc<ApprovalService<S, L, A, D>>>,
    Path((application_type, seq)): Path<(String, u64)>,
    axum::Json(request): axum::Json<ResubmitRequest>,
) -> Response
where
    S: ApplicationStore + 'static,
    L: RejectionLedger + 'static,
    A: AlarmStore + 'static,
    D: ApproverDirectory + 'static,
{
    let key = match parse_key(&application_type, seq) {
        Ok(key) => key,
        Err(response) => return response,
    };

    match service.resubmit(&key, &request.actor) {
        Ok(status) => (
            StatusCode::OK,
            axum::Json(TransitionResponse {
                application_type: key.application_type,
                seq: key.seq,
                status,
            }),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn rejections_handler<S, L, A, D>(
    State(service): State<Arc<ApprovalService<S, L, A, D>>>,
    Path((application_type, seq)): Path<(String, u64)>,
) -> Response
where
    S: ApplicationStore + 'static,
    L: RejectionLedger + 'static,
    A: AlarmStore + 'static,
    D: ApproverDirectory + 'static,
{
    let key = match parse_key(&application_type, seq) {
        Ok(key) => key,
        Err(response) => return response,
    };

    match service.rejection_history(&key) {
        Ok(history) => (StatusCode::OK, axum::Json(history)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn pending_handler<S, L, A, D>(
    State(service): State<Arc<ApprovalService<S, L, A, D>>>,
    axum::Json(request): axum::Json<PendingRequest>,
) -> Response
where
    S: ApplicationStore + 'static,
    L: RejectionLedger + 'static,
    A: AlarmStore + 'static,
    D: ApproverDirectory + 'static,
{
    match service.pending(&request.actor) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn all_alarms_handler<S, L, A, D>(
    State(service): State<Arc<ApprovalService<S, L, A, D>>>,
    Path(user_id): Path<String>,
) -> Response
where
    S: ApplicationStore + 'static,
    L: RejectionLedger + 'static,
    A: AlarmStore + 'static,
    D: ApproverDirectory + 'static,
{
    match service.list_all_alarms(&user_id) {
        Ok(alarms) => (StatusCode::OK, axum::Json(alarms)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn unread_alarms_handler<S, L, A, D>(
    State(service): State<Arc<ApprovalService<S, L, A, D>>>,
    Path(user_id): Path<String>,
) -> Response
where
    S: ApplicationStore + 'static,
    L: RejectionLedger + 'static,
    A: AlarmStore + 'static,
    D: ApproverDirectory + 'static,
{
    match service.list_unread_alarms(&user_id) {
        Ok(alarms) => (StatusCode::OK, axum::Json(alarms)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn mark_read_handler<S, L, A, D>(
    State(service): State<Arc<ApprovalService<S, L, A, D>>>,
    Path(alarm_seq): Path<u64>,
) -> Response
where
    S: ApplicationStore + 'static,
    L: RejectionLedger + 'static,
    A: AlarmStore + 'static,
    D: ApproverDirectory + 'static,
{
    match service.mark_alarm_read(alarm_seq) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn mark_all_read_handler<S, L, A, D>(
    State(service): State<Arc<ApprovalService<S, L, A, D>>>,
    Path(user_id): Path<String>,
) -> Response
where
    S: ApplicationStore + 'static,
    L: RejectionLedger + 'static,
    A: AlarmStore + 'static,
    D: ApproverDirectory + 'static,
{
    match service.mark_all_alarms_read(&user_id) {
        Ok(marked) => (StatusCode::OK, axum::Json(json!({ "marked_read": marked }))).into_response(),
        Err(err) => error_response(err),
    }
}

fn parse_key(application_type: &str, seq: u64) -> Result<ApplicationKey, Response> {
    match ApplicationType::parse(application_type) {
        Some(parsed) => Ok(ApplicationKey::new(parsed, seq)),
        None => {
            let payload = json!({
                "error": format!("unknown application type '{application_type}'"),
            });
            Err((StatusCode::BAD_REQUEST, axum::Json(payload)).into_response())
        }
    }
}

/// Maps workflow errors to response codes. `InvalidState` bodies carry the
/// observed status code so callers can render "already processed" instead of
/// a generic failure.
fn error_response(err: WorkflowError) -> Response {
    let status = match &err {
        WorkflowError::NotFound => StatusCode::NOT_FOUND,
        WorkflowError::InvalidState { .. } => StatusCode::CONFLICT,
        WorkflowError::Forbidden(_) => StatusCode::FORBIDDEN,
        WorkflowError::MissingReason => StatusCode::UNPROCESSABLE_ENTITY,
        WorkflowError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = match &err {
        WorkflowError::InvalidState { status } => json!({
            "error": err.to_string(),
            "status": status.code(),
        }),
        _ => json!({ "error": err.to_string() }),
    };

    (status, axum::Json(payload)).into_response()
}

//! JSON API for the claim lifecycle.
//!
//! Endpoints:
//! - `POST /api/v1/documents?file_name=…`  — upload a supporting document (Lecturer)
//! - `POST /api/v1/claims`                 — submit a monthly claim (Lecturer)
//! - `GET  /api/v1/claims/mine`            — the caller's claims, newest first (Lecturer)
//! - `GET  /api/v1/claims/{id}`            — claim detail (owner or any reviewing role)
//! - `GET  /api/v1/claims/{id}/approvals`  — the claim's decision ledger, oldest first
//! - `GET  /api/v1/approvals/queue`        — claims awaiting the caller's decision
//! - `POST /api/v1/claims/{id}/decision`   — approve or reject (Coordinator | Manager)
//! - `GET  /api/v1/payments/queue`         — claims cleared for settlement (HR)
//! - `POST /api/v1/claims/{id}/payment`    — settle a claim (HR)
//!
//! Every caller arrives through [`RequirePrincipal`]; endpoints gate on the
//! role before the engine runs, so a wrong-role request is a 403 while a
//! wrong-status decision stays a 409 from the lifecycle itself. Errors are
//! `{kind, message}` with kind one of `validation`, `transition`,
//! `not_found`, `storage`, `unauthorized`, `forbidden`.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use claimflow_core::documents::{DocumentAcceptError, DocumentRef, DocumentResolver};
use claimflow_core::domain::approval::ApprovalEntry;
use claimflow_core::domain::claim::{ClaimId, ClaimSubmission, MonthlyClaim};
use claimflow_core::domain::lecturer::LecturerId;
use claimflow_core::domain::principal::{Principal, Role};
use claimflow_db::repositories::{
    ApprovalLedger, ClaimRepository, RepositoryError, SqlApprovalRepository, SqlClaimRepository,
};
use claimflow_db::{
    ClaimWorkflow, DbPool, DecisionCommand, PaymentQueueEntry, RoleScopedViews, WorkflowError,
};

use crate::documents::LocalDiskStore;
use crate::principal::{forbidden, require_role, RequirePrincipal};

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub file_name: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub document_ref: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitClaimRequest {
    pub module_name: String,
    pub hours_worked: Decimal,
    pub hourly_rate: Decimal,
    pub document_ref: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MineQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub id: i64,
    pub lecturer_id: String,
    pub module_name: String,
    pub hours_worked: Decimal,
    pub hourly_rate: Decimal,
    pub total_amount: Decimal,
    pub document_ref: Option<String>,
    pub status: String,
    pub submitted_at: String,
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub approved: bool,
    pub comments: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ApprovalResponse {
    pub id: i64,
    pub claim_id: i64,
    pub approver_id: String,
    pub role: String,
    pub decision: String,
    pub comments: String,
    pub decided_at: String,
}

#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    pub claim: ClaimResponse,
    pub entry: ApprovalResponse,
}

#[derive(Debug, Serialize)]
pub struct PaymentQueueItem {
    pub claim: ClaimResponse,
    pub lecturer_display_name: String,
}

impl From<MonthlyClaim> for ClaimResponse {
    fn from(claim: MonthlyClaim) -> Self {
        Self {
            id: claim.id.0,
            lecturer_id: claim.lecturer_id.0,
            module_name: claim.module_name,
            hours_worked: claim.hours_worked,
            hourly_rate: claim.hourly_rate,
            total_amount: claim.total_amount,
            document_ref: claim.document.map(|document| document.0),
            status: claim.status.as_str().to_string(),
            submitted_at: claim.submitted_at.to_rfc3339(),
        }
    }
}

impl From<ApprovalEntry> for ApprovalResponse {
    fn from(entry: ApprovalEntry) -> Self {
        Self {
            id: entry.id.0,
            claim_id: entry.claim_id.0,
            approver_id: entry.approver_id,
            role: entry.role.as_str().to_string(),
            decision: entry.decision.as_str().to_string(),
            comments: entry.comments,
            decided_at: entry.decided_at.to_rfc3339(),
        }
    }
}

impl From<PaymentQueueEntry> for PaymentQueueItem {
    fn from(entry: PaymentQueueEntry) -> Self {
        Self { claim: entry.claim.into(), lecturer_display_name: entry.lecturer_display_name }
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct ApiState {
    db_pool: DbPool,
    documents: Arc<DocumentResolver<LocalDiskStore>>,
}

impl ApiState {
    fn workflow(&self) -> ClaimWorkflow {
        ClaimWorkflow::new(self.db_pool.clone())
    }

    fn views(&self) -> RoleScopedViews {
        RoleScopedViews::new(self.db_pool.clone())
    }

    fn claims(&self) -> SqlClaimRepository {
        SqlClaimRepository::new(self.db_pool.clone())
    }

    fn ledger(&self) -> SqlApprovalRepository {
        SqlApprovalRepository::new(self.db_pool.clone())
    }
}

pub fn router(db_pool: DbPool, uploads_dir: impl Into<PathBuf>) -> Router {
    let documents = Arc::new(DocumentResolver::new(LocalDiskStore::new(uploads_dir)));

    Router::new()
        .route("/api/v1/documents", post(upload_document))
        .route("/api/v1/claims", post(submit_claim))
        .route("/api/v1/claims/mine", get(my_claims))
        .route("/api/v1/claims/{id}", get(claim_detail))
        .route("/api/v1/claims/{id}/approvals", get(claim_approvals))
        .route("/api/v1/approvals/queue", get(approvals_queue))
        .route("/api/v1/claims/{id}/decision", post(decide_claim))
        .route("/api/v1/payments/queue", get(payments_queue))
        .route("/api/v1/claims/{id}/payment", post(settle_claim))
        .with_state(ApiState { db_pool, documents })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn upload_document(
    State(state): State<ApiState>,
    RequirePrincipal(principal): RequirePrincipal,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadResponse>), (StatusCode, Json<ApiError>)> {
    require_role(&principal, Role::Lecturer)?;

    let document = state.documents.accept(&query.file_name, &body).await.map_err(accept_error)?;

    info!(
        event_name = "document.accepted",
        user_id = %principal.user_id,
        file_name = %query.file_name,
        size_bytes = body.len(),
        "supporting document stored"
    );
    Ok((StatusCode::CREATED, Json(UploadResponse { document_ref: document.0 })))
}

pub async fn submit_claim(
    State(state): State<ApiState>,
    RequirePrincipal(principal): RequirePrincipal,
    Json(request): Json<SubmitClaimRequest>,
) -> Result<(StatusCode, Json<ClaimResponse>), (StatusCode, Json<ApiError>)> {
    require_role(&principal, Role::Lecturer)?;

    let submission = ClaimSubmission {
        module_name: request.module_name,
        hours_worked: request.hours_worked,
        hourly_rate: request.hourly_rate,
        document: request.document_ref.map(DocumentRef),
    };
    let claim = state
        .workflow()
        .submit(&LecturerId(principal.user_id.clone()), submission)
        .await
        .map_err(workflow_error)?;

    info!(
        event_name = "claim.submitted",
        claim_id = claim.id.0,
        lecturer_id = %claim.lecturer_id.0,
        module_name = %claim.module_name,
        total_amount = %claim.total_amount,
        "claim submitted"
    );
    Ok((StatusCode::CREATED, Json(claim.into())))
}

pub async fn my_claims(
    State(state): State<ApiState>,
    RequirePrincipal(principal): RequirePrincipal,
    Query(query): Query<MineQuery>,
) -> Result<Json<Vec<ClaimResponse>>, (StatusCode, Json<ApiError>)> {
    require_role(&principal, Role::Lecturer)?;

    let lecturer_id = LecturerId(principal.user_id.clone());
    let claims = match query.limit {
        Some(limit) if limit < 1 => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ApiError {
                    kind: "validation".to_string(),
                    message: "limit must be at least 1".to_string(),
                }),
            ));
        }
        Some(limit) => state.views().recent_for_lecturer(&lecturer_id, limit).await,
        None => state.views().status_for_lecturer(&lecturer_id).await,
    }
    .map_err(db_error)?;

    Ok(Json(claims.into_iter().map(ClaimResponse::from).collect()))
}

pub async fn claim_detail(
    Path(id): Path<i64>,
    State(state): State<ApiState>,
    RequirePrincipal(principal): RequirePrincipal,
) -> Result<Json<ClaimResponse>, (StatusCode, Json<ApiError>)> {
    let claim = load_claim(&state, id).await?;
    ensure_can_view(&principal, &claim)?;
    Ok(Json(claim.into()))
}

pub async fn claim_approvals(
    Path(id): Path<i64>,
    State(state): State<ApiState>,
    RequirePrincipal(principal): RequirePrincipal,
) -> Result<Json<Vec<ApprovalResponse>>, (StatusCode, Json<ApiError>)> {
    let claim = load_claim(&state, id).await?;
    ensure_can_view(&principal, &claim)?;

    let entries = state.ledger().list_for_claim(ClaimId(id)).await.map_err(db_error)?;
    Ok(Json(entries.into_iter().map(ApprovalResponse::from).collect()))
}

pub async fn approvals_queue(
    State(state): State<ApiState>,
    RequirePrincipal(principal): RequirePrincipal,
) -> Result<Json<Vec<ClaimResponse>>, (StatusCode, Json<ApiError>)> {
    let claims = match principal.role {
        Role::Coordinator => state.views().pending_for_coordinator().await,
        Role::Manager => state.views().pending_for_manager().await,
        Role::Lecturer | Role::Hr => {
            return Err(forbidden(format!(
                "role `{}` has no approval queue",
                principal.role.as_str()
            )));
        }
    }
    .map_err(db_error)?;

    Ok(Json(claims.into_iter().map(ClaimResponse::from).collect()))
}

pub async fn decide_claim(
    Path(id): Path<i64>,
    State(state): State<ApiState>,
    RequirePrincipal(principal): RequirePrincipal,
    Json(request): Json<DecisionRequest>,
) -> Result<Json<DecisionResponse>, (StatusCode, Json<ApiError>)> {
    let Some(role) = principal.role.approver_role() else {
        return Err(forbidden(format!(
            "role `{}` may not decide claims",
            principal.role.as_str()
        )));
    };

    let command = DecisionCommand {
        approver_id: principal.user_id.clone(),
        role,
        approved: request.approved,
        comments: request.comments.unwrap_or_default(),
    };
    let outcome = state.workflow().decide(ClaimId(id), command).await.map_err(workflow_error)?;

    info!(
        event_name = "claim.decision.recorded",
        claim_id = id,
        approver_id = %principal.user_id,
        role = outcome.entry.role.as_str(),
        decision = outcome.entry.decision.as_str(),
        status = outcome.claim.status.as_str(),
        "decision recorded"
    );
    Ok(Json(DecisionResponse { claim: outcome.claim.into(), entry: outcome.entry.into() }))
}

pub async fn payments_queue(
    State(state): State<ApiState>,
    RequirePrincipal(principal): RequirePrincipal,
) -> Result<Json<Vec<PaymentQueueItem>>, (StatusCode, Json<ApiError>)> {
    require_role(&principal, Role::Hr)?;

    let queue = state.views().approved_for_hr().await.map_err(db_error)?;
    Ok(Json(queue.into_iter().map(PaymentQueueItem::from).collect()))
}

pub async fn settle_claim(
    Path(id): Path<i64>,
    State(state): State<ApiState>,
    RequirePrincipal(principal): RequirePrincipal,
) -> Result<Json<ClaimResponse>, (StatusCode, Json<ApiError>)> {
    require_role(&principal, Role::Hr)?;

    let claim = state.workflow().mark_paid(ClaimId(id)).await.map_err(workflow_error)?;

    info!(
        event_name = "claim.paid",
        claim_id = id,
        settled_by = %principal.user_id,
        total_amount = %claim.total_amount,
        "claim settled"
    );
    Ok(Json(claim.into()))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn load_claim(
    state: &ApiState,
    id: i64,
) -> Result<MonthlyClaim, (StatusCode, Json<ApiError>)> {
    state
        .claims()
        .find_by_id(ClaimId(id))
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found(format!("claim {id} was not found")))
}

/// Lecturers see their own claims only; every reviewing role sees all of
/// them.
fn ensure_can_view(
    principal: &Principal,
    claim: &MonthlyClaim,
) -> Result<(), (StatusCode, Json<ApiError>)> {
    match principal.role {
        Role::Lecturer if claim.lecturer_id.0 == principal.user_id => Ok(()),
        Role::Lecturer => Err(forbidden("lecturers may only view their own claims".to_string())),
        Role::Coordinator | Role::Manager | Role::Hr => Ok(()),
    }
}

fn workflow_error(error: WorkflowError) -> (StatusCode, Json<ApiError>) {
    let (status, kind) = match &error {
        WorkflowError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
        WorkflowError::Transition(_) => (StatusCode::CONFLICT, "transition"),
        WorkflowError::ClaimNotFound(_) | WorkflowError::UnknownLecturer(_) => {
            (StatusCode::NOT_FOUND, "not_found")
        }
        WorkflowError::Storage(storage) => {
            error!(error = %storage, "api database error");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiError {
                    kind: "storage".to_string(),
                    message: "storage is unavailable".to_string(),
                }),
            );
        }
    };
    (status, Json(ApiError { kind: kind.to_string(), message: error.to_string() }))
}

fn db_error(error: RepositoryError) -> (StatusCode, Json<ApiError>) {
    error!(error = %error, "api database error");
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ApiError { kind: "storage".to_string(), message: "storage is unavailable".to_string() }),
    )
}

fn accept_error(error: DocumentAcceptError) -> (StatusCode, Json<ApiError>) {
    match error {
        DocumentAcceptError::Validation(validation) => (
            StatusCode::BAD_REQUEST,
            Json(ApiError { kind: "validation".to_string(), message: validation.to_string() }),
        ),
        DocumentAcceptError::Store(store) => {
            error!(error = %store, "document store failure");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiError {
                    kind: "storage".to_string(),
                    message: "document storage is unavailable".to_string(),
                }),
            )
        }
    }
}

fn not_found(message: String) -> (StatusCode, Json<ApiError>) {
    (StatusCode::NOT_FOUND, Json(ApiError { kind: "not_found".to_string(), message }))
}

//! RPC request handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use credscore_types::{Amount, Identity, Score, ScoreDelta, Timestamp, TokenId};
use serde::{Deserialize, Serialize};

use crate::caller::Caller;
use crate::error::RpcError;
use crate::server::AppState;

type RpcResult<T> = Result<Json<T>, RpcError>;

fn parse_identity(raw: &str) -> Result<Identity, RpcError> {
    raw.parse()
        .map_err(|e: credscore_types::TypesError| RpcError::InvalidRequest(e.to_string()))
}

fn parse_token(raw: &str) -> Result<TokenId, RpcError> {
    raw.parse()
        .map_err(|e: credscore_types::TypesError| RpcError::InvalidRequest(e.to_string()))
}

// ── Health ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub records: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        records: state.service.record_count(),
    })
}

// ── Records ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRecordRequest {
    pub payment: Amount,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRecordResponse {
    pub token: TokenId,
    pub owner: Identity,
}

pub async fn create_record(
    State(state): State<AppState>,
    Caller(owner): Caller,
    Json(req): Json<CreateRecordRequest>,
) -> Result<(StatusCode, Json<CreateRecordResponse>), RpcError> {
    let token = state.service.create_record(&owner, req.payment)?;
    Ok((StatusCode::CREATED, Json(CreateRecordResponse { token, owner })))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub owner: Identity,
    pub score: Score,
    pub last_updated: Timestamp,
}

pub async fn get_score(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> RpcResult<ScoreResponse> {
    let owner = parse_identity(&owner)?;
    let (score, last_updated) = state.service.get_score(&owner)?;
    Ok(Json(ScoreResponse {
        owner,
        score,
        last_updated,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LastChangeResponse {
    pub owner: Identity,
    pub delta: ScoreDelta,
    pub integration: Option<Identity>,
}

pub async fn get_last_change(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> RpcResult<LastChangeResponse> {
    let owner = parse_identity(&owner)?;
    let (delta, integration) = state.service.get_last_change(&owner)?;
    Ok(Json(LastChangeResponse {
        owner,
        delta,
        integration,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransferRequest {
    pub to: Identity,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransferResponse {
    pub token: TokenId,
    pub from: Identity,
    pub to: Identity,
}

pub async fn transfer(
    State(state): State<AppState>,
    Caller(from): Caller,
    Path(token): Path<String>,
    Json(req): Json<TransferRequest>,
) -> RpcResult<TransferResponse> {
    let token = parse_token(&token)?;
    state.service.transfer(&from, &req.to, token)?;
    Ok(Json(TransferResponse {
        token,
        from,
        to: req.to,
    }))
}

// ── Approvals ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ApprovalListResponse {
    pub owner: Identity,
    pub integrations: Vec<Identity>,
}

pub async fn list_approvals(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> RpcResult<ApprovalListResponse> {
    let owner = parse_identity(&owner)?;
    let integrations = state.service.list_approvals(&owner);
    Ok(Json(ApprovalListResponse {
        owner,
        integrations,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub integration: Identity,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApprovalStatusResponse {
    pub owner: Identity,
    pub integration: Identity,
    pub approved: bool,
}

pub async fn is_approved(
    State(state): State<AppState>,
    Path((owner, integration)): Path<(String, String)>,
) -> RpcResult<ApprovalStatusResponse> {
    let owner = parse_identity(&owner)?;
    let integration = parse_identity(&integration)?;
    let approved = state.service.is_approved(&owner, &integration);
    Ok(Json(ApprovalStatusResponse {
        owner,
        integration,
        approved,
    }))
}

pub async fn grant_approval(
    State(state): State<AppState>,
    Caller(owner): Caller,
    Json(req): Json<ApprovalRequest>,
) -> RpcResult<ApprovalStatusResponse> {
    state.service.grant_approval(&owner, &req.integration)?;
    Ok(Json(ApprovalStatusResponse {
        owner,
        integration: req.integration,
        approved: true,
    }))
}

pub async fn revoke_approval(
    State(state): State<AppState>,
    Caller(owner): Caller,
    Json(req): Json<ApprovalRequest>,
) -> RpcResult<ApprovalStatusResponse> {
    state.service.revoke_approval(&owner, &req.integration)?;
    Ok(Json(ApprovalStatusResponse {
        owner,
        integration: req.integration,
        approved: false,
    }))
}

// ── Scores ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct AdjustRequest {
    pub delta: ScoreDelta,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdjustResponse {
    pub token: TokenId,
    pub score: Score,
}

/// Adjust at the server's clock; integrations cannot supply their own time.
pub async fn adjust_score(
    State(state): State<AppState>,
    Caller(integration): Caller,
    Path(token): Path<String>,
    Json(req): Json<AdjustRequest>,
) -> RpcResult<AdjustResponse> {
    let token = parse_token(&token)?;
    let score = state
        .service
        .adjust_score_now(token, &integration, req.delta)?;
    Ok(Json(AdjustResponse { token, score }))
}

// ── Locks ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct LockResponse {
    pub token: TokenId,
    pub locked: bool,
}

pub async fn lock(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(token): Path<String>,
) -> RpcResult<LockResponse> {
    let token = parse_token(&token)?;
    state.service.lock(token, &caller)?;
    Ok(Json(LockResponse {
        token,
        locked: true,
    }))
}

pub async fn unlock(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(token): Path<String>,
) -> RpcResult<LockResponse> {
    let token = parse_token(&token)?;
    state.service.unlock(token, &caller)?;
    Ok(Json(LockResponse {
        token,
        locked: false,
    }))
}

pub async fn lock_status(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> RpcResult<LockResponse> {
    let token = parse_token(&token)?;
    let locked = state.service.is_locked(token)?;
    Ok(Json(LockResponse { token, locked }))
}

// ── Treasury ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct WithdrawResponse {
    pub to: Identity,
    pub amount: Amount,
}

pub async fn withdraw(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> RpcResult<WithdrawResponse> {
    let amount = state.service.withdraw(&caller)?;
    Ok(Json(WithdrawResponse { to: caller, amount }))
}

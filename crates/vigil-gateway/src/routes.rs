//! HTTP routes and their wire DTOs.
//!
//! Wire field names are camelCase; domain enums keep their snake_case
//! encodings. Request validation lives here, at the edge; the engine below
//! assumes well-formed input.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use vigil_core::{
    Agent, AgentId, ApprovalId, ApprovalRequest, ApprovalStatus, SpendingPolicy, Timestamp,
    TxKind, TxMetadata,
};
use vigil_engine::{IngestReport, NewApprovalRequest, RawTxEvent};

use crate::auth::{generate_credential, hash_credential, require_token, AuthedAgent};
use crate::error::ApiError;
use crate::state::AppState;

/// Build the gateway router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/agents", post(register_agent))
        .route("/api/agents/:id/approvals", get(pending_approvals))
        .route("/api/approvals", post(create_approval))
        .route("/api/approvals/:id", get(poll_approval))
        .route("/api/approvals/:id/respond", post(respond_approval))
        .route("/api/policy", get(read_policy).put(write_policy))
        .route("/api/ingest/transactions", post(ingest_transactions))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    name: String,
    wallet_address: String,
    owner_id: String,
    description: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterResponse {
    agent_id: String,
    /// Returned exactly once; only its digest is stored.
    credential: String,
}

async fn register_agent(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("agent name must not be empty".into()));
    }
    if body.owner_id.trim().is_empty() {
        return Err(ApiError::BadRequest("ownerId must not be empty".into()));
    }
    let wallet = body
        .wallet_address
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("invalid wallet address: {e}")))?;

    let credential = generate_credential();
    let mut agent = Agent::register(name, wallet, body.owner_id.trim(), hash_credential(&credential));
    if let Some(description) = body.description {
        agent = agent.with_description(description);
    }
    let agent_id = agent.id;
    state.agents.insert(agent).await?;

    tracing::info!(agent = %agent_id, "agent registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            agent_id: agent_id.to_string(),
            credential,
        }),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateApprovalRequest {
    description: String,
    tx_type: String,
    estimated_cost: f64,
    target_program: Option<String>,
    target_address: Option<String>,
    amount: Option<f64>,
    token_symbol: Option<String>,
    ttl_minutes: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateApprovalResponse {
    approval_id: String,
    status: ApprovalStatus,
    auto_approved: bool,
    reason: String,
}

fn parse_tx_kind(raw: &str) -> Result<TxKind, ApiError> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|_| ApiError::BadRequest(format!("unknown transaction type: {raw}")))
}

async fn create_approval(
    State(state): State<AppState>,
    agent: AuthedAgent,
    Json(body): Json<CreateApprovalRequest>,
) -> Result<(StatusCode, Json<CreateApprovalResponse>), ApiError> {
    if !body.estimated_cost.is_finite() || body.estimated_cost < 0.0 {
        return Err(ApiError::BadRequest(
            "estimatedCost must be a non-negative number".into(),
        ));
    }
    if body.ttl_minutes == Some(0) {
        return Err(ApiError::BadRequest("ttlMinutes must be positive".into()));
    }
    let kind = parse_tx_kind(&body.tx_type)?;

    let mut tx = TxMetadata::new(kind, body.estimated_cost);
    tx.target_program = body.target_program;
    tx.target_address = body.target_address;
    tx.amount = body.amount;
    tx.token_symbol = body.token_symbol;

    let request = state
        .manager
        .create(
            &agent.0,
            NewApprovalRequest {
                description: body.description,
                tx,
                ttl_minutes: body.ttl_minutes.or(Some(state.default_ttl_minutes)),
            },
        )
        .await?;

    let auto_approved = request.status == ApprovalStatus::Approved;
    Ok((
        StatusCode::CREATED,
        Json(CreateApprovalResponse {
            approval_id: request.id.to_string(),
            status: request.status,
            auto_approved,
            reason: request.policy_reason,
        }),
    ))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApprovalView {
    approval_id: String,
    status: ApprovalStatus,
    description: String,
    created_at: Timestamp,
    expires_at: Timestamp,
    responded_at: Option<Timestamp>,
    reason: String,
}

impl From<ApprovalRequest> for ApprovalView {
    fn from(request: ApprovalRequest) -> Self {
        Self {
            approval_id: request.id.to_string(),
            status: request.status,
            description: request.description,
            created_at: request.created_at,
            expires_at: request.expires_at,
            responded_at: request.responded_at,
            reason: request.policy_reason,
        }
    }
}

fn parse_approval_id(raw: &str) -> Result<ApprovalId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid approval id: {raw}")))
}

async fn poll_approval(
    State(state): State<AppState>,
    agent: AuthedAgent,
    Path(id): Path<String>,
) -> Result<Json<ApprovalView>, ApiError> {
    let id = parse_approval_id(&id)?;
    let request = state.manager.poll(&id).await?;
    // Cross-agent reads 404 rather than 403: no existence leak
    if request.agent_id != agent.0.id {
        return Err(ApiError::NotFound);
    }
    Ok(Json(request.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RespondRequest {
    approve: bool,
}

async fn respond_approval(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<RespondRequest>,
) -> Result<Json<ApprovalView>, ApiError> {
    // Decisions belong to the supervising human. An agent's own bearer
    // credential never matches the decision token, so a governed agent
    // cannot approve its own escalated requests.
    require_token(&headers, state.admin_token.as_deref())?;
    let id = parse_approval_id(&id)?;
    let decided = state.manager.respond(&id, body.approve).await?;
    Ok(Json(decided.into()))
}

async fn pending_approvals(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Vec<ApprovalView>>, ApiError> {
    require_token(&headers, state.admin_token.as_deref())?;
    let agent_id: AgentId = id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid agent id: {id}")))?;
    if state.agents.get(&agent_id).await?.is_none() {
        return Err(ApiError::NotFound);
    }
    let pending = state.manager.pending_for_agent(&agent_id).await?;
    Ok(Json(pending.into_iter().map(ApprovalView::from).collect()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PolicyView {
    agent_id: String,
    daily_limit: f64,
    per_tx_limit: f64,
    require_approval_above: f64,
    allowlist: Vec<String>,
    updated_at: Timestamp,
}

impl From<SpendingPolicy> for PolicyView {
    fn from(policy: SpendingPolicy) -> Self {
        let mut allowlist: Vec<String> = policy.allowlist.into_iter().collect();
        allowlist.sort();
        Self {
            agent_id: policy.agent_id.to_string(),
            daily_limit: policy.daily_limit,
            per_tx_limit: policy.per_tx_limit,
            require_approval_above: policy.require_approval_above,
            allowlist,
            updated_at: policy.updated_at,
        }
    }
}

async fn read_policy(
    State(state): State<AppState>,
    agent: AuthedAgent,
) -> Result<Json<PolicyView>, ApiError> {
    let policy = state
        .policies
        .active_for(&agent.0.id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(policy.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WritePolicyRequest {
    agent_id: String,
    daily_limit: f64,
    per_tx_limit: f64,
    require_approval_above: f64,
    allowlist: Option<Vec<String>>,
}

async fn write_policy(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<WritePolicyRequest>,
) -> Result<Json<PolicyView>, ApiError> {
    require_token(&headers, state.admin_token.as_deref())?;

    let agent_id = body
        .agent_id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid agent id: {}", body.agent_id)))?;
    if state.agents.get(&agent_id).await?.is_none() {
        return Err(ApiError::NotFound);
    }
    for (label, value) in [
        ("dailyLimit", body.daily_limit),
        ("perTxLimit", body.per_tx_limit),
        ("requireApprovalAbove", body.require_approval_above),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(ApiError::BadRequest(format!(
                "{label} must be a non-negative number"
            )));
        }
    }

    let mut policy = SpendingPolicy::new(
        agent_id,
        body.daily_limit,
        body.per_tx_limit,
        body.require_approval_above,
    );
    if let Some(allowlist) = body.allowlist {
        policy = policy.with_allowlist(allowlist);
    }
    state.policies.set_active(policy.clone()).await?;

    tracing::info!(agent = %agent_id, "active policy replaced");
    Ok(Json(policy.into()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IngestResponse {
    processed: usize,
    matched: usize,
    skipped: usize,
}

impl From<IngestReport> for IngestResponse {
    fn from(report: IngestReport) -> Self {
        Self {
            processed: report.processed,
            matched: report.matched,
            skipped: report.skipped,
        }
    }
}

async fn ingest_transactions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(events): Json<Vec<RawTxEvent>>,
) -> Result<Json<IngestResponse>, ApiError> {
    require_token(&headers, state.ingest_token.as_deref())?;
    let report = state.pipeline.ingest(events).await?;
    Ok(Json(report.into()))
}

//! End-to-end tests for the HTTP surface, over in-memory stores.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use vigil_engine::Dispatcher;
use vigil_gateway::{router, AppState, Stores};
use vigil_storage::{
    MemoryAgentStore, MemoryApprovalStore, MemoryLedgerStore, MemoryPolicyStore,
};

const WALLET: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";
const STRANGER: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";
const INGEST_TOKEN: &str = "indexer-secret";
const ADMIN_TOKEN: &str = "admin-secret";

fn app() -> Router {
    let stores = Stores {
        agents: Arc::new(MemoryAgentStore::new()),
        policies: Arc::new(MemoryPolicyStore::new()),
        approvals: Arc::new(MemoryApprovalStore::new()),
        ledger: Arc::new(MemoryLedgerStore::new()),
    };
    let state = AppState::new(stores, Arc::new(Dispatcher::new()))
        .with_ingest_token(Some(INGEST_TOKEN.to_string()))
        .with_admin_token(Some(ADMIN_TOKEN.to_string()));
    router(state)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Register an agent, returning (agentId, credential).
async fn register(app: &Router, name: &str, wallet: &str) -> (String, String) {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/agents",
        None,
        Some(json!({ "name": name, "walletAddress": wallet, "ownerId": "owner-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    (
        body["agentId"].as_str().unwrap().to_string(),
        body["credential"].as_str().unwrap().to_string(),
    )
}

/// Install a policy through the admin surface.
/// daily 1.0 / per-tx 0.5 / approval above 0.1
async fn install_policy(app: &Router, agent_id: &str) {
    let (status, body) = send(
        app,
        Method::PUT,
        "/api/policy",
        Some(ADMIN_TOKEN),
        Some(json!({
            "agentId": agent_id,
            "dailyLimit": 1.0,
            "perTxLimit": 0.5,
            "requireApprovalAbove": 0.1,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "policy install failed: {body}");
}

async fn create_approval(app: &Router, credential: &str, cost: f64) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/api/approvals",
        Some(credential),
        Some(json!({
            "description": "rebalance position",
            "txType": "transfer",
            "estimatedCost": cost,
        })),
    )
    .await
}

#[tokio::test]
async fn test_register_and_authenticate() {
    let app = app();
    let (_, credential) = register(&app, "trader-1", WALLET).await;

    // The fresh credential authenticates
    let (status, body) = create_approval(&app, &credential, 0.05).await;
    assert_eq!(status, StatusCode::CREATED);
    // No policy installed yet: fail closed
    assert_eq!(body["autoApproved"], json!(false));
    assert_eq!(body["status"], json!("pending"));
    assert!(body["reason"]
        .as_str()
        .unwrap()
        .contains("no active spending policy"));
}

#[tokio::test]
async fn test_register_validation() {
    let app = app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/agents",
        None,
        Some(json!({ "name": "x", "walletAddress": "tooshort", "ownerId": "o" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("wallet address"));

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/agents",
        None,
        Some(json!({ "name": "  ", "walletAddress": WALLET, "ownerId": "o" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_credential_rejected() {
    let app = app();
    let (status, _) = create_approval(&app, "deadbeef", 0.05).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // No Authorization header at all
    let (status, _) = send(
        &app,
        Method::GET,
        "/api/policy",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_policy_lifecycle_and_auto_approval() {
    let app = app();
    let (agent_id, credential) = register(&app, "trader-1", WALLET).await;

    // No policy yet
    let (status, _) = send(&app, Method::GET, "/api/policy", Some(&credential), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    install_policy(&app, &agent_id).await;

    let (status, body) = send(&app, Method::GET, "/api/policy", Some(&credential), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dailyLimit"], json!(1.0));
    assert_eq!(body["perTxLimit"], json!(0.5));

    // Small spend auto-approves
    let (status, body) = create_approval(&app, &credential, 0.05).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["autoApproved"], json!(true));
    assert_eq!(body["status"], json!("approved"));
    assert_eq!(body["reason"], json!("within policy limits"));

    // Over the per-tx limit escalates
    let (status, body) = create_approval(&app, &credential, 0.6).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], json!("pending"));
    assert!(body["reason"].as_str().unwrap().contains("per-tx limit"));
}

#[tokio::test]
async fn test_policy_admin_guarded() {
    let app = app();
    let (agent_id, _) = register(&app, "trader-1", WALLET).await;

    let payload = json!({
        "agentId": agent_id,
        "dailyLimit": 1.0,
        "perTxLimit": 0.5,
        "requireApprovalAbove": 0.1,
    });
    let (status, _) = send(&app, Method::PUT, "/api/policy", None, Some(payload.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/policy",
        Some("wrong-token"),
        Some(payload),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_respond_flow_and_conflict() {
    let app = app();
    let (agent_id, credential) = register(&app, "trader-1", WALLET).await;
    install_policy(&app, &agent_id).await;

    let (_, body) = create_approval(&app, &credential, 0.3).await;
    let approval_id = body["approvalId"].as_str().unwrap().to_string();

    // Poll sees it pending
    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/approvals/{approval_id}"),
        Some(&credential),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("pending"));
    assert!(body["respondedAt"].is_null());

    // The supervising human approves it
    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/approvals/{approval_id}/respond"),
        Some(ADMIN_TOKEN),
        Some(json!({ "approve": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("approved"));
    assert!(!body["respondedAt"].is_null());

    // A second decision conflicts
    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/approvals/{approval_id}/respond"),
        Some(ADMIN_TOKEN),
        Some(json!({ "approve": false })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_agent_cannot_decide_own_request() {
    let app = app();
    let (agent_id, credential) = register(&app, "trader-1", WALLET).await;
    install_policy(&app, &agent_id).await;

    let (_, body) = create_approval(&app, &credential, 0.3).await;
    let approval_id = body["approvalId"].as_str().unwrap().to_string();

    // The agent's own credential is not a decision token
    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/approvals/{approval_id}/respond"),
        Some(&credential),
        Some(json!({ "approve": true })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Neither is an absent one
    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/approvals/{approval_id}/respond"),
        None,
        Some(json!({ "approve": true })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The request is still awaiting a human
    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/approvals/{approval_id}"),
        Some(&credential),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("pending"));

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/approvals/{approval_id}/respond"),
        Some(ADMIN_TOKEN),
        Some(json!({ "approve": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("denied"));
}

#[tokio::test]
async fn test_pending_list_for_agent() {
    let app = app();
    let (agent_id, credential) = register(&app, "trader-1", WALLET).await;
    install_policy(&app, &agent_id).await;

    let (_, first) = create_approval(&app, &credential, 0.2).await;
    let (_, second) = create_approval(&app, &credential, 0.3).await;
    let first_id = first["approvalId"].as_str().unwrap();
    let second_id = second["approvalId"].as_str().unwrap();

    // Admin token required; the agent's credential is rejected
    let uri = format!("/api/agents/{agent_id}/approvals");
    let (status, _) = send(&app, Method::GET, &uri, Some(&credential), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Oldest first
    let (status, body) = send(&app, Method::GET, &uri, Some(ADMIN_TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    let listed = body.as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["approvalId"], json!(first_id));
    assert_eq!(listed[1]["approvalId"], json!(second_id));

    // Decided requests drop out of the queue
    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/approvals/{first_id}/respond"),
        Some(ADMIN_TOKEN),
        Some(json!({ "approve": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, Method::GET, &uri, Some(ADMIN_TOKEN), None).await;
    let listed = body.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["approvalId"], json!(second_id));

    // Unknown agents 404
    let (status, _) = send(
        &app,
        Method::GET,
        "/api/agents/agt:00000000-0000-0000-0000-000000000000/approvals",
        Some(ADMIN_TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cross_agent_poll_is_not_found() {
    let app = app();
    let (agent_id, credential) = register(&app, "trader-1", WALLET).await;
    install_policy(&app, &agent_id).await;
    let (_, other_credential) = register(&app, "trader-2", STRANGER).await;

    let (_, body) = create_approval(&app, &credential, 0.3).await;
    let approval_id = body["approvalId"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/approvals/{approval_id}"),
        Some(&other_credential),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_approval_request_validation() {
    let app = app();
    let (_, credential) = register(&app, "trader-1", WALLET).await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/approvals",
        Some(&credential),
        Some(json!({ "description": "d", "txType": "transfer", "estimatedCost": -1.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/approvals",
        Some(&credential),
        Some(json!({ "description": "d", "txType": "teleport", "estimatedCost": 0.1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("transaction type"));

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/approvals",
        Some(&credential),
        Some(json!({
            "description": "d",
            "txType": "transfer",
            "estimatedCost": 0.1,
            "ttlMinutes": 0,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ingest_webhook() {
    let app = app();
    let (agent_id, credential) = register(&app, "trader-1", WALLET).await;
    install_policy(&app, &agent_id).await;

    let events = json!([
        {
            "signature": "sig-1",
            "type": "TRANSFER",
            "fromAddress": WALLET,
            "toAddress": STRANGER,
            "amount": 0.8,
            "fee": 5000,
            "success": true,
        },
        // Unmatched counter-parties still get persisted
        {
            "signature": "sig-2",
            "type": "SWAP",
            "fromAddress": STRANGER,
            "amount": 3.0,
        },
        // Malformed: no signature; skipped without aborting the batch
        { "type": "TRANSFER", "amount": 1.0 },
    ]);

    // Token required
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/ingest/transactions",
        None,
        Some(events.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/ingest/transactions",
        Some(INGEST_TOKEN),
        Some(events),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["processed"], json!(2));
    assert_eq!(body["matched"], json!(1));
    assert_eq!(body["skipped"], json!(1));

    // The ingested 0.8 spend now counts against the 1.0 daily limit
    let (status, body) = create_approval(&app, &credential, 0.3).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], json!("pending"));
    assert!(body["reason"].as_str().unwrap().contains("Daily"));
}

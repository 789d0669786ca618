//! Challenge Rewards Server
//!
//! HTTP surface for the surrounding application: award points, administer
//! budgets, drive issuances, and ingest provider webhooks.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::RewardError;
use crate::issuance::{AwardRequest, IssuanceService};
use crate::models::{BudgetScope, NewIssuance, ProviderConfig};
use crate::provider::WebhookSubscription;
use crate::reconcile::{Reconciler, WebhookEvent};
use crate::store::RewardStore;

pub struct AppState {
    pub service: Arc<IssuanceService>,
    pub reconciler: Arc<Reconciler>,
    pub store: Arc<dyn RewardStore>,
    pub started_at: std::time::Instant,
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/budgets", post(set_budget_handler))
        .route("/budgets/:workspace", get(get_budget_handler))
        .route("/awards", post(award_handler))
        .route("/balances/:workspace/:user", get(balance_handler))
        .route("/ledger/:workspace", get(ledger_handler))
        .route("/issuances", post(create_issuance_handler))
        .route("/issuances/:id", get(get_issuance_handler))
        .route("/issuances/:id/submit", post(submit_handler))
        .route("/issuances/:id/retry", post(retry_handler))
        .route("/reconcile", post(reconcile_handler))
        .route("/sync", post(bulk_sync_handler))
        .route("/provider-configs", post(set_provider_config_handler))
        .route(
            "/workspaces/:workspace/webhook-subscription",
            post(subscribe_webhook_handler),
        )
        .route(
            "/workspaces/:workspace/participants/:user/sso-link",
            post(sso_link_handler),
        )
        .route("/webhooks/provider", post(webhook_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn status_for(err: &RewardError) -> StatusCode {
    match err {
        RewardError::InvalidAmount
        | RewardError::ValidationError(_)
        | RewardError::Unsupported(_)
        | RewardError::InvalidState(_)
        | RewardError::NotConfigured(_) => StatusCode::BAD_REQUEST,
        RewardError::NotFound => StatusCode::NOT_FOUND,
        RewardError::Conflict(_) => StatusCode::CONFLICT,
        RewardError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        // Provider-side trouble: the request was fine, upstream was not.
        _ => StatusCode::BAD_GATEWAY,
    }
}

fn error_response(err: RewardError) -> (StatusCode, Json<serde_json::Value>) {
    (status_for(&err), Json(json!({ "error": err.to_string() })))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    healthy: bool,
    uptime_secs: u64,
    version: String,
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        healthy: true,
        uptime_secs: state.started_at.elapsed().as_secs(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Debug, Deserialize)]
struct SetBudgetRequest {
    workspace_id: String,
    challenge_id: Option<String>,
    total_budget: i64,
}

async fn set_budget_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SetBudgetRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let scope = BudgetScope {
        workspace_id: request.workspace_id,
        challenge_id: request.challenge_id,
    };
    let budget = state
        .service
        .ledger()
        .set_budget(&scope, request.total_budget)
        .await
        .map_err(error_response)?;
    Ok(Json(json!({ "budget": budget })))
}

#[derive(Debug, Deserialize)]
struct ScopeQuery {
    challenge_id: Option<String>,
}

async fn get_budget_handler(
    State(state): State<Arc<AppState>>,
    Path(workspace): Path<String>,
    Query(query): Query<ScopeQuery>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let scope = BudgetScope {
        workspace_id: workspace,
        challenge_id: query.challenge_id,
    };
    let budget = state
        .service
        .ledger()
        .get_budget(&scope)
        .await
        .map_err(error_response)?
        .ok_or_else(|| error_response(RewardError::NotFound))?;
    Ok(Json(json!({ "budget": budget })))
}

async fn award_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AwardRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let outcome = state
        .service
        .award(&request)
        .await
        .map_err(error_response)?;
    Ok(Json(json!({
        "entry": outcome.entry,
        "issuance": outcome.issuance,
    })))
}

async fn balance_handler(
    State(state): State<Arc<AppState>>,
    Path((workspace, user)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let balance = state
        .service
        .ledger()
        .get_balance(&user, &workspace)
        .await
        .map_err(error_response)?
        .ok_or_else(|| error_response(RewardError::NotFound))?;
    Ok(Json(json!({ "balance": balance })))
}

#[derive(Debug, Deserialize)]
struct LedgerQuery {
    limit: Option<i64>,
}

async fn ledger_handler(
    State(state): State<Arc<AppState>>,
    Path(workspace): Path<String>,
    Query(query): Query<LedgerQuery>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let entries = state
        .service
        .ledger()
        .ledger_entries(&workspace, query.limit.unwrap_or(100))
        .await
        .map_err(error_response)?;
    Ok(Json(json!({ "entries": entries })))
}

async fn create_issuance_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewIssuance>,
) -> Result<(StatusCode, Json<serde_json::Value>), (StatusCode, Json<serde_json::Value>)> {
    let issuance = state
        .service
        .create(&request)
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(json!({ "issuance": issuance }))))
}

async fn get_issuance_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let issuance = state
        .service
        .get(id)
        .await
        .map_err(error_response)?
        .ok_or_else(|| error_response(RewardError::NotFound))?;
    Ok(Json(json!({ "issuance": issuance })))
}

async fn submit_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let issuance = state.service.submit(id).await.map_err(error_response)?;
    Ok(Json(json!({ "issuance": issuance })))
}

async fn retry_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let issuance = state.service.retry(id).await.map_err(error_response)?;
    Ok(Json(json!({ "issuance": issuance })))
}

#[derive(Debug, Deserialize)]
struct BulkSyncRequest {
    workspace_id: String,
    user_ids: Vec<String>,
}

async fn bulk_sync_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BulkSyncRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let report = state
        .service
        .bulk_sync(&request.workspace_id, &request.user_ids)
        .await
        .map_err(error_response)?;
    Ok(Json(json!({ "report": report })))
}

async fn set_provider_config_handler(
    State(state): State<Arc<AppState>>,
    Json(config): Json<ProviderConfig>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    state
        .store
        .set_provider_config(&config)
        .await
        .map_err(|e| error_response(RewardError::storage(e)))?;
    info!(
        "Provider configuration updated for workspace {}",
        config.workspace_id
    );
    Ok(Json(json!({ "workspace_id": config.workspace_id })))
}

async fn subscribe_webhook_handler(
    State(state): State<Arc<AppState>>,
    Path(workspace): Path<String>,
    Json(subscription): Json<WebhookSubscription>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let subscription_id = state
        .service
        .subscribe_webhook(&workspace, &subscription)
        .await
        .map_err(error_response)?;
    Ok(Json(json!({ "subscription_id": subscription_id })))
}

async fn sso_link_handler(
    State(state): State<Arc<AppState>>,
    Path((workspace, user)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let url = state
        .service
        .sso_link(&workspace, &user)
        .await
        .map_err(error_response)?;
    Ok(Json(json!({ "url": url })))
}

async fn reconcile_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let summary = state.reconciler.run_once().await;
    Json(json!({ "summary": summary }))
}

async fn webhook_handler(
    State(state): State<Arc<AppState>>,
    Json(event): Json<WebhookEvent>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    match state.reconciler.apply_webhook(&event).await {
        Ok(changed) => Ok(Json(json!({ "applied": changed }))),
        // An event for an unknown resource is acknowledged, not retried
        // forever by the provider.
        Err(RewardError::NotFound) => Ok(Json(json!({ "applied": false }))),
        Err(err) => {
            error!("Webhook processing failed: {}", err);
            Err(error_response(err))
        }
    }
}

/// Run the server
pub async fn run_server(host: &str, port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);
    let addr = format!("{}:{}", host, port);

    info!("Starting Challenge Rewards server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

//! Split payment endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use orchestrator::registry::StartedOperation;
use orchestrator::split::{RecipientSpec, SplitConfig, SplitPayment, SplitRequest};

use crate::error::ApiResult;
use crate::routes::CallbackBody;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSplitBody {
    pub sender_wallet_url: String,
    #[serde(default)]
    pub total_amount: Option<u64>,
    pub recipients: Vec<RecipientSpec>,
    #[serde(default)]
    pub config: SplitConfig,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RetryBody {
    /// Recipient indices to retry; omitted means every failed recipient.
    #[serde(default)]
    pub indices: Option<Vec<usize>>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub status: Option<String>,
}

/// POST /split-payments
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateSplitBody>,
) -> ApiResult<(StatusCode, Json<StartedOperation>)> {
    let started = state
        .registry
        .start_split(SplitRequest {
            sender_wallet_url: body.sender_wallet_url,
            total_amount: body.total_amount,
            recipients: body.recipients,
            config: body.config,
            description: body.description,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(started)))
}

/// POST /split-payments/{id}/callback
///
/// A split executes as soon as its grant is active; the response carries the
/// execution outcome.
pub async fn callback(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<CallbackBody>,
) -> ApiResult<Json<SplitPayment>> {
    let split = state.registry.split();
    split
        .complete_authorization(&id, &body.interact_ref, body.hash.as_deref())
        .await?;
    Ok(Json(split.execute(&id).await?))
}

/// POST /split-payments/{id}/retry
pub async fn retry(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<RetryBody>,
) -> ApiResult<Json<SplitPayment>> {
    let split = state
        .registry
        .split()
        .retry_failed(&id, body.indices.as_deref())
        .await?;
    Ok(Json(split))
}

/// GET /split-payments
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<SplitPayment>> {
    let all = state.registry.split().list(None).await;
    let filtered = match query.status {
        Some(status) => all
            .into_iter()
            .filter(|s| s.phase.as_str() == status)
            .collect(),
        None => all,
    };
    Json(filtered)
}

/// GET /split-payments/{id}
pub async fn status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SplitPayment>> {
    Ok(Json(state.registry.split().status(&id).await?))
}

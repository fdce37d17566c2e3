//! Recurring payment endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use orchestrator::recurring::{RecurringPayment, RecurringRequest, DEFAULT_MONITOR_PERIOD};
use orchestrator::registry::StartedOperation;

use crate::error::ApiResult;
use crate::routes::CallbackBody;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecurringBody {
    pub sender_wallet_url: String,
    pub receiver_wallet_url: String,
    /// Minor units per cycle.
    pub amount: u64,
    /// Minor units across the whole series.
    pub total_budget: u64,
    /// ISO-8601 duration between cycles, e.g. `P1M`.
    pub interval: String,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub max_payments: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteQuery {
    /// Run the cycle even if the next payment date has not arrived.
    #[serde(default)]
    pub force: bool,
}

/// POST /recurring-payments
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateRecurringBody>,
) -> ApiResult<(StatusCode, Json<StartedOperation>)> {
    let started = state
        .registry
        .start_recurring(RecurringRequest {
            sender_wallet_url: body.sender_wallet_url,
            receiver_wallet_url: body.receiver_wallet_url,
            amount: body.amount,
            total_budget: body.total_budget,
            interval: body.interval,
            start_date: body.start_date,
            end_date: body.end_date,
            max_payments: body.max_payments,
            description: body.description,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(started)))
}

/// POST /recurring-payments/{id}/callback
///
/// Activation also starts the series monitor, which executes due cycles in
/// the background.
pub async fn callback(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<CallbackBody>,
) -> ApiResult<Json<RecurringPayment>> {
    let recurring = state.registry.recurring().clone();
    let series = recurring
        .complete_authorization(&id, &body.interact_ref, body.hash.as_deref())
        .await?;
    recurring
        .start_automatic_execution(&id, DEFAULT_MONITOR_PERIOD)
        .await?;
    Ok(Json(series))
}

/// POST /recurring-payments/{id}/execute
pub async fn execute(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ExecuteQuery>,
) -> ApiResult<Json<RecurringPayment>> {
    let series = state
        .registry
        .recurring()
        .execute(&id, query.force)
        .await?;
    Ok(Json(series))
}

/// POST /recurring-payments/{id}/pause
pub async fn pause(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<RecurringPayment>> {
    Ok(Json(state.registry.recurring().pause(&id).await?))
}

/// POST /recurring-payments/{id}/resume
pub async fn resume(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<RecurringPayment>> {
    let recurring = state.registry.recurring().clone();
    Ok(Json(recurring.resume(&id).await?))
}

/// GET /recurring-payments
pub async fn list(State(state): State<AppState>) -> Json<Vec<RecurringPayment>> {
    Json(state.registry.recurring().list(None).await)
}

/// GET /recurring-payments/{id}
pub async fn status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<RecurringPayment>> {
    Ok(Json(state.registry.recurring().status(&id).await?))
}

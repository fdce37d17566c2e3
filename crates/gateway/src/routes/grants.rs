//! Wallet grant and scheduled payment endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orchestrator::future::{ScheduledPayment, WalletGrant, WalletGrantRequest};
use orchestrator::registry::StartedOperation;
use orchestrator::PaymentLeg;

use crate::error::ApiResult;
use crate::routes::CallbackBody;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGrantBody {
    pub sender_wallet_url: String,
    /// Total allowance in minor units of the sender's asset.
    pub total_allowance: u64,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantPaymentBody {
    pub receiver_wallet_url: String,
    pub value: u64,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleBody {
    pub receiver_wallet_url: String,
    pub value: u64,
    pub fire_at: DateTime<Utc>,
    /// ISO-8601 duration; set to chain a successor after each execution.
    #[serde(default)]
    pub recurring_interval: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantPaymentResponse {
    pub leg: PaymentLeg,
    pub grant: WalletGrant,
}

/// POST /wallet-grants
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateGrantBody>,
) -> ApiResult<(StatusCode, Json<StartedOperation>)> {
    let started = state
        .registry
        .start_wallet_grant(WalletGrantRequest {
            sender_wallet_url: body.sender_wallet_url,
            total_allowance: body.total_allowance,
            description: body.description,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(started)))
}

/// POST /wallet-grants/{id}/callback
pub async fn callback(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<CallbackBody>,
) -> ApiResult<Json<WalletGrant>> {
    let grant = state
        .registry
        .future()
        .finalize(&id, &body.interact_ref, body.hash.as_deref())
        .await?;
    Ok(Json(grant))
}

/// POST /wallet-grants/{id}/payments
pub async fn execute_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<GrantPaymentBody>,
) -> ApiResult<Json<GrantPaymentResponse>> {
    let (leg, grant) = state
        .registry
        .future()
        .execute_payment(
            &id,
            &body.receiver_wallet_url,
            body.value,
            body.description.as_deref(),
        )
        .await?;
    Ok(Json(GrantPaymentResponse { leg, grant }))
}

/// POST /wallet-grants/{id}/schedule
pub async fn schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ScheduleBody>,
) -> ApiResult<(StatusCode, Json<ScheduledPayment>)> {
    let scheduled = state
        .registry
        .future()
        .schedule_payment(
            &id,
            &body.receiver_wallet_url,
            body.value,
            body.fire_at,
            body.recurring_interval.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(scheduled)))
}

/// GET /wallet-grants/{id}
pub async fn status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<WalletGrant>> {
    Ok(Json(state.registry.future().status(&id).await?))
}

/// GET /wallet-grants/{id}/scheduled
pub async fn list_scheduled(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<Vec<ScheduledPayment>> {
    Json(state.registry.future().list_scheduled(Some(&id)).await)
}

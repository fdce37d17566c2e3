//! One-time payment endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use orchestrator::one_time::{OneTimePayment, PaymentRequest};
use orchestrator::registry::StartedOperation;

use crate::error::ApiResult;
use crate::routes::CallbackBody;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentBody {
    pub sender_wallet_url: String,
    pub receiver_wallet_url: String,
    /// Minor units in the receiver's asset.
    pub value: u64,
    #[serde(default)]
    pub description: Option<String>,
}

/// POST /payments
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreatePaymentBody>,
) -> ApiResult<(StatusCode, Json<StartedOperation>)> {
    let started = state
        .registry
        .start_one_time(PaymentRequest {
            sender_wallet_url: body.sender_wallet_url,
            receiver_wallet_url: body.receiver_wallet_url,
            value: body.value,
            description: body.description,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(started)))
}

/// POST /payments/{id}/callback
pub async fn callback(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<CallbackBody>,
) -> ApiResult<Json<OneTimePayment>> {
    let payment = state
        .registry
        .one_time()
        .complete(&id, &body.interact_ref, body.hash.as_deref())
        .await?;
    Ok(Json(payment))
}

/// GET /payments/{id}
pub async fn status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<OneTimePayment>> {
    Ok(Json(state.registry.one_time().status(&id).await?))
}

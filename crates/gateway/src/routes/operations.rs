//! Unified operation endpoints.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use common::PaymentError;
use orchestrator::registry::OperationRecord;
use orchestrator::OperationKind;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

fn parse_kind(kind: &str) -> Result<OperationKind, PaymentError> {
    match kind {
        "one_time" => Ok(OperationKind::OneTime),
        "split" => Ok(OperationKind::Split),
        "recurring" => Ok(OperationKind::Recurring),
        "wallet_grant" => Ok(OperationKind::WalletGrant),
        other => Err(PaymentError::Validation(format!(
            "unknown operation kind {other:?}"
        ))),
    }
}

/// GET /operations
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<OperationRecord>>> {
    let kind = query.kind.as_deref().map(parse_kind).transpose()?;
    let records = state.registry.list(kind, query.status.as_deref()).await;
    Ok(Json(records))
}

/// GET /operations/{id}
pub async fn status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<OperationRecord>> {
    Ok(Json(state.registry.status(&id).await?))
}

/// DELETE /operations/{id}
pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<OperationRecord>> {
    Ok(Json(state.registry.cancel(&id).await?))
}

/// POST /operations/cleanup
pub async fn cleanup(State(state): State<AppState>) -> Json<serde_json::Value> {
    let removed = state.registry.cleanup().await;
    Json(json!({ "removed": removed }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert_eq!(parse_kind("split").unwrap(), OperationKind::Split);
        assert_eq!(
            parse_kind("wallet_grant").unwrap(),
            OperationKind::WalletGrant
        );
        assert!(parse_kind("bogus").is_err());
    }
}

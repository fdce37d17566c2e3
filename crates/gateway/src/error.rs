//! Error-to-status mapping for the HTTP surface.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use common::PaymentError;

pub type ApiResult<T> = Result<T, ApiError>;

/// A [`PaymentError`] at the HTTP boundary.
#[derive(Debug)]
pub struct ApiError(pub PaymentError);

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            PaymentError::Validation(_) => StatusCode::BAD_REQUEST,
            PaymentError::NotFound(_) => StatusCode::NOT_FOUND,
            PaymentError::InvalidState(_) | PaymentError::BudgetExceeded(_) => {
                StatusCode::CONFLICT
            }
            PaymentError::Protocol { .. }
            | PaymentError::ProtocolViolation(_)
            | PaymentError::Transport(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match &self.0 {
            PaymentError::Validation(_) => "validation",
            PaymentError::NotFound(_) => "not_found",
            PaymentError::InvalidState(_) => "invalid_state",
            PaymentError::BudgetExceeded(_) => "budget_exceeded",
            PaymentError::Protocol { .. } => "protocol",
            PaymentError::ProtocolViolation(_) => "protocol_violation",
            PaymentError::Transport(_) => "transport",
        }
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": {
                "type": self.error_type(),
                "message": self.0.to_string(),
            }
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (PaymentError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (PaymentError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (PaymentError::InvalidState("x".into()), StatusCode::CONFLICT),
            (PaymentError::BudgetExceeded("x".into()), StatusCode::CONFLICT),
            (
                PaymentError::Protocol {
                    status: 403,
                    body: "denied".into(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                PaymentError::ProtocolViolation("x".into()),
                StatusCode::BAD_GATEWAY,
            ),
            (
                PaymentError::Transport("refused".into()),
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError(err).status_code(), expected);
        }
    }

    #[test]
    fn test_error_type_strings() {
        assert_eq!(
            ApiError(PaymentError::BudgetExceeded("x".into())).error_type(),
            "budget_exceeded"
        );
        assert_eq!(
            ApiError(PaymentError::Transport("x".into())).error_type(),
            "transport"
        );
    }
}

//! Unified error taxonomy for the orchestration engine.

use serde::Serialize;

/// Errors surfaced by any orchestrator or protocol call.
///
/// Validation and budget errors are raised before any network call and never
/// mutate state. `Protocol` carries the server's verdict verbatim so callers
/// can diagnose without re-deriving state.
#[derive(Debug, Clone, thiserror::Error, Serialize)]
pub enum PaymentError {
    /// Malformed request, rejected client-side before any network call.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A protocol call returned a non-success HTTP outcome.
    #[error("protocol error (status {status}): {body}")]
    Protocol { status: u16, body: String },

    /// A protocol call succeeded but returned a shape inconsistent with the
    /// expected state (e.g. a grant that should be pending is not).
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// A reservation or spend check failed against a grant's ceiling.
    #[error("budget exceeded: {0}")]
    BudgetExceeded(String),

    /// Unknown operation, grant, or scheduled-payment id.
    #[error("not found: {0}")]
    NotFound(String),

    /// Operation invoked outside its legal phase.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The server could not be reached at all (no HTTP status available).
    #[error("transport error: {0}")]
    Transport(String),
}

impl PaymentError {
    /// True for errors raised by client-side checks that never touched the
    /// network.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            PaymentError::Validation(_)
                | PaymentError::BudgetExceeded(_)
                | PaymentError::NotFound(_)
                | PaymentError::InvalidState(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_context() {
        let err = PaymentError::Protocol {
            status: 403,
            body: "invalid access token".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("403"));
        assert!(msg.contains("invalid access token"));
    }

    #[test]
    fn test_local_classification() {
        assert!(PaymentError::Validation("x".into()).is_local());
        assert!(PaymentError::BudgetExceeded("x".into()).is_local());
        assert!(!PaymentError::Transport("refused".into()).is_local());
        assert!(!PaymentError::Protocol {
            status: 500,
            body: String::new()
        }
        .is_local());
    }
}

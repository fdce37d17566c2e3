//! Shared application state passed to all handlers.

use std::sync::Arc;

use orchestrator::UnifiedRegistry;

#[derive(Clone)]
pub struct AppState {
    /// The operation registry composing all four payment orchestrators.
    pub registry: Arc<UnifiedRegistry>,
}

impl AppState {
    pub fn new(registry: Arc<UnifiedRegistry>) -> Self {
        Self { registry }
    }
}

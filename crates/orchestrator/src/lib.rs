//! Payment pattern orchestration.
//!
//! Four orchestrators build reusable payment patterns out of the interactive
//! authorization flow and the settlement choreography: one-time payments,
//! multi-recipient splits, recurring series, and long-lived wallet grants
//! with scheduled future payments. The [`registry::UnifiedRegistry`]
//! composes all four behind opaque operation ids.

pub mod auth;
pub mod future;
pub mod one_time;
pub mod recurring;
pub mod registry;
pub mod settlement;
pub mod split;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::{AuthController, AuthFlow, GrantLimits};
pub use registry::{OperationKind, UnifiedRegistry};
pub use settlement::{Choreographer, PaymentLeg, SettlementConfig};

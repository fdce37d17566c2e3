//! Shared value types for the payment orchestration engine.
//!
//! Everything here is protocol-adjacent but network-free: amounts in minor
//! units, wallet address metadata, the interactive grant state machine,
//! ISO-8601 durations for recurring schedules, retry policies for bounded
//! polling, and the clock abstraction monitors are tested against.

pub mod amount;
pub mod clock;
pub mod duration;
pub mod error;
pub mod grant;
pub mod retry;
pub mod wallet;

pub use amount::Amount;
pub use clock::{Clock, ManualClock, SystemClock};
pub use duration::IsoDuration;
pub use error::PaymentError;
pub use grant::{FinalizedGrant, GrantState, InteractiveGrant, PendingGrant};
pub use retry::RetryPolicy;
pub use wallet::WalletAddress;

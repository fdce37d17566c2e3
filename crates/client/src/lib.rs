//! Open Payments protocol client.
//!
//! Speaks to three kinds of counterparties: wallet address servers (public
//! metadata), authorization servers (GNAP grants), and resource servers
//! (incoming payments, quotes, outgoing payments). All resource-server and
//! grant traffic is signed with the client's ed25519 key.
//!
//! Orchestrators depend on the [`PaymentsApi`] trait, not the concrete
//! [`OpenPaymentsClient`], so they can be exercised against an in-memory
//! implementation.

pub mod api;
pub mod cache;
pub mod client;
pub mod signing;
pub mod types;

pub use api::PaymentsApi;
pub use cache::WalletCache;
pub use client::{ClientConfig, OpenPaymentsClient};
pub use signing::RequestSigner;

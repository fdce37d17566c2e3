//! The protocol surface orchestrators program against.

use async_trait::async_trait;

use common::{FinalizedGrant, PaymentError, PendingGrant, WalletAddress};

use crate::types::{
    AccessItem, IncomingPayment, IncomingPaymentRequest, OutgoingPayment, OutgoingPaymentRequest,
    Quote, QuoteRequest,
};

/// Every protocol operation the orchestrators need, as an object-safe trait.
/// Production uses [`crate::OpenPaymentsClient`]; tests substitute an
/// in-memory implementation.
#[async_trait]
pub trait PaymentsApi: Send + Sync {
    /// Resolve a wallet address URL to its public metadata.
    async fn get_wallet_address(&self, url: &str) -> Result<WalletAddress, PaymentError>;

    /// Request a non-interactive grant (incoming payments, quotes) from the
    /// wallet's authorization server.
    async fn request_resource_grant(
        &self,
        wallet: &WalletAddress,
        access: Vec<AccessItem>,
    ) -> Result<FinalizedGrant, PaymentError>;

    /// Request an interactive grant (outgoing payments). The response is
    /// pending until the payer approves and the grant is continued.
    async fn request_interactive_grant(
        &self,
        wallet: &WalletAddress,
        access: Vec<AccessItem>,
        finish_uri: &str,
        nonce: &str,
    ) -> Result<PendingGrant, PaymentError>;

    /// Exchange an interaction reference for the grant's access token.
    async fn continue_grant(
        &self,
        continue_uri: &str,
        continue_token: &str,
        interact_ref: &str,
    ) -> Result<FinalizedGrant, PaymentError>;

    /// Revoke a finalized grant at its management URL.
    async fn revoke_grant(&self, manage_url: &str, access_token: &str)
        -> Result<(), PaymentError>;

    async fn create_incoming_payment(
        &self,
        wallet: &WalletAddress,
        access_token: &str,
        request: &IncomingPaymentRequest,
    ) -> Result<IncomingPayment, PaymentError>;

    async fn get_incoming_payment(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<IncomingPayment, PaymentError>;

    /// Mark an incoming payment complete so the receiver stops waiting for
    /// further funds.
    async fn complete_incoming_payment(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<IncomingPayment, PaymentError>;

    async fn create_quote(
        &self,
        wallet: &WalletAddress,
        access_token: &str,
        request: &QuoteRequest,
    ) -> Result<Quote, PaymentError>;

    async fn create_outgoing_payment(
        &self,
        wallet: &WalletAddress,
        access_token: &str,
        request: &OutgoingPaymentRequest,
    ) -> Result<OutgoingPayment, PaymentError>;

    async fn get_outgoing_payment(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<OutgoingPayment, PaymentError>;
}

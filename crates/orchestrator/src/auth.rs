//! Interactive authorization flow.
//!
//! Drives a grant through `requested -> pending -> finalized`: build the
//! outgoing-payment grant request with a finish nonce, hand the payer the
//! redirect URL, and later exchange the interaction reference for a usable
//! token. State prechecks run before any network call, so a repeated
//! `complete` fails locally without spending the interaction reference.

use std::sync::Arc;

use tracing::{info, warn};

use client::types::{AccessItem, AccessLimits};
use client::PaymentsApi;
use common::grant::{generate_nonce, verify_callback_hash};
use common::{Amount, FinalizedGrant, InteractiveGrant, PaymentError, WalletAddress};

/// Spending limits carried in the grant request.
#[derive(Debug, Clone)]
pub struct GrantLimits {
    /// Ceiling on what the grant may debit, in the sender's asset.
    pub debit_amount: Amount,
    /// ISO-8601 repeating interval (`R/<start>/<duration>`) for recurring
    /// authorizations.
    pub interval: Option<String>,
}

impl GrantLimits {
    pub fn ceiling(debit_amount: Amount) -> Self {
        Self {
            debit_amount,
            interval: None,
        }
    }
}

/// Outcome of [`AuthController::initiate`]: the pending grant plus what the
/// caller needs to send the payer off to approve it.
#[derive(Debug, Clone)]
pub struct AuthFlow {
    pub grant: InteractiveGrant,
    pub redirect_url: String,
    pub nonce: String,
}

/// Runs the interactive grant protocol against authorization servers.
#[derive(Clone)]
pub struct AuthController {
    api: Arc<dyn PaymentsApi>,
}

impl AuthController {
    pub fn new(api: Arc<dyn PaymentsApi>) -> Self {
        Self { api }
    }

    /// Request an interactive outgoing-payment grant scoped to `wallet` with
    /// the given limits. Returns the pending grant and redirect URL.
    pub async fn initiate(
        &self,
        wallet: &WalletAddress,
        limits: GrantLimits,
        finish_uri: &str,
        nonce: Option<String>,
    ) -> Result<AuthFlow, PaymentError> {
        let nonce = nonce.unwrap_or_else(generate_nonce);
        let access = vec![AccessItem::outgoing_payment(
            &wallet.id,
            AccessLimits {
                debit_amount: Some(limits.debit_amount),
                receive_amount: None,
                interval: limits.interval,
            },
        )];

        let mut grant = InteractiveGrant::requested();
        match self
            .api
            .request_interactive_grant(wallet, access, finish_uri, &nonce)
            .await
        {
            Ok(pending) => {
                let redirect_url = pending.redirect_url.clone();
                grant.mark_pending(pending)?;
                info!(wallet = %wallet.id, "interactive grant pending");
                Ok(AuthFlow {
                    grant,
                    redirect_url,
                    nonce,
                })
            }
            Err(e) => {
                warn!(wallet = %wallet.id, error = %e, "interactive grant request failed");
                let _ = grant.mark_failed();
                Err(e)
            }
        }
    }

    /// Exchange the interaction reference for the grant's token. The state
    /// precheck makes a second call fail without touching the network.
    pub async fn complete(
        &self,
        grant: &mut InteractiveGrant,
        interact_ref: &str,
    ) -> Result<FinalizedGrant, PaymentError> {
        let pending = grant.require_pending()?.clone();
        let finalized = self
            .api
            .continue_grant(&pending.continue_uri, &pending.continue_token, interact_ref)
            .await?;
        grant.mark_finalized(finalized.clone())?;
        info!("grant finalized");
        Ok(finalized)
    }

    /// Check an authorization callback's hash before spending its
    /// interaction reference.
    pub fn verify_callback(received_hash: &str, nonce: &str, interact_ref: &str) -> bool {
        verify_callback_hash(received_hash, nonce, interact_ref)
    }

    /// Revoke a finalized grant at its management URL. Errors propagate; the
    /// local state moves to `Revoked` only after the server accepts.
    pub async fn revoke(&self, grant: &mut InteractiveGrant) -> Result<(), PaymentError> {
        let finalized = grant.require_finalized()?.clone();
        let manage_url = finalized.manage_url.ok_or_else(|| {
            PaymentError::InvalidState("grant has no management URL to revoke at".to_string())
        })?;
        self.api
            .revoke_grant(&manage_url, &finalized.access_token)
            .await?;
        grant.mark_revoked()?;
        info!("grant revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockApi;

    fn wallet(api: &MockApi) -> WalletAddress {
        api.add_wallet("https://ilp.example.com/alice", "USD", 2)
    }

    #[tokio::test]
    async fn test_initiate_then_complete() {
        let api = Arc::new(MockApi::new());
        let sender = wallet(&api);
        let auth = AuthController::new(api.clone());

        let mut flow = auth
            .initiate(
                &sender,
                GrantLimits::ceiling(Amount::new("USD", 2, 5000)),
                "https://engine.example.com/payments/p1/callback",
                None,
            )
            .await
            .unwrap();
        assert!(flow.redirect_url.starts_with("https://auth.example.com/interact/"));

        let finalized = auth.complete(&mut flow.grant, "ref-1").await.unwrap();
        assert!(!finalized.access_token.is_empty());
        assert_eq!(api.continue_calls(), 1);
    }

    #[tokio::test]
    async fn test_double_complete_fails_without_network() {
        let api = Arc::new(MockApi::new());
        let sender = wallet(&api);
        let auth = AuthController::new(api.clone());

        let mut flow = auth
            .initiate(
                &sender,
                GrantLimits::ceiling(Amount::new("USD", 2, 5000)),
                "https://engine.example.com/cb",
                None,
            )
            .await
            .unwrap();
        auth.complete(&mut flow.grant, "ref-1").await.unwrap();

        let second = auth.complete(&mut flow.grant, "ref-1").await;
        assert!(matches!(second, Err(PaymentError::InvalidState(_))));
        // The continuation endpoint saw exactly one call.
        assert_eq!(api.continue_calls(), 1);
    }

    #[tokio::test]
    async fn test_revoke_requires_finalized_grant() {
        let api = Arc::new(MockApi::new());
        let sender = wallet(&api);
        let auth = AuthController::new(api.clone());

        let mut flow = auth
            .initiate(
                &sender,
                GrantLimits::ceiling(Amount::new("USD", 2, 100)),
                "https://engine.example.com/cb",
                None,
            )
            .await
            .unwrap();
        assert!(auth.revoke(&mut flow.grant).await.is_err());

        auth.complete(&mut flow.grant, "ref").await.unwrap();
        auth.revoke(&mut flow.grant).await.unwrap();
        assert_eq!(flow.grant.state(), common::GrantState::Revoked);
    }

    #[test]
    fn test_callback_verification_delegates_to_hash() {
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;
        use base64::Engine;
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(b"nonce");
        hasher.update(b"ref");
        let hash = URL_SAFE_NO_PAD.encode(hasher.finalize());
        assert!(AuthController::verify_callback(&hash, "nonce", "ref"));
        assert!(!AuthController::verify_callback(&hash, "nonce", "other"));
    }
}

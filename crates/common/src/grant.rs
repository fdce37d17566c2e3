//! Interactive grant state machine and callback verification.
//!
//! A grant moves through `Requested -> Pending -> Finalized`, optionally
//! `Finalized -> Revoked`, or `Requested -> Failed`. No other transitions
//! exist; the state machine is enforced here so orchestrators cannot, for
//! example, continue an already-finalized grant.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::PaymentError;

/// Artifacts of a grant awaiting end-user interaction. Carries no spending
/// authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingGrant {
    /// Where to send the payer for approval.
    pub redirect_url: String,
    /// Continuation endpoint to exchange the interaction reference at.
    pub continue_uri: String,
    /// Bearer token for the continuation call.
    pub continue_token: String,
    /// Nonce bound into the finish redirect for callback verification.
    pub nonce: String,
}

/// A usable grant. The authorized ceiling is fixed at issuance; exhaustion
/// requires a new grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedGrant {
    pub access_token: String,
    /// Management URL for revocation, when the server issued one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manage_url: Option<String>,
}

/// Lifecycle states of an interactive grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantState {
    Requested,
    Pending,
    Finalized,
    Revoked,
    Failed,
}

impl GrantState {
    fn can_transition_to(self, next: GrantState) -> bool {
        use GrantState::*;
        matches!(
            (self, next),
            (Requested, Pending) | (Requested, Failed) | (Pending, Finalized) | (Finalized, Revoked)
        )
    }
}

/// An interactive grant with its state machine and artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractiveGrant {
    state: GrantState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pending: Option<PendingGrant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    finalized: Option<FinalizedGrant>,
}

impl InteractiveGrant {
    /// A freshly requested grant with no server response yet.
    pub fn requested() -> Self {
        Self {
            state: GrantState::Requested,
            pending: None,
            finalized: None,
        }
    }

    pub fn state(&self) -> GrantState {
        self.state
    }

    pub fn pending(&self) -> Option<&PendingGrant> {
        self.pending.as_ref()
    }

    pub fn finalized(&self) -> Option<&FinalizedGrant> {
        self.finalized.as_ref()
    }

    fn transition(&mut self, next: GrantState) -> Result<(), PaymentError> {
        if !self.state.can_transition_to(next) {
            return Err(PaymentError::InvalidState(format!(
                "grant transition {:?} -> {:?} is not allowed",
                self.state, next
            )));
        }
        self.state = next;
        Ok(())
    }

    /// Record the server's pending response.
    pub fn mark_pending(&mut self, pending: PendingGrant) -> Result<(), PaymentError> {
        self.transition(GrantState::Pending)?;
        self.pending = Some(pending);
        Ok(())
    }

    /// Record finalization. Only legal from `Pending`.
    pub fn mark_finalized(&mut self, finalized: FinalizedGrant) -> Result<(), PaymentError> {
        self.transition(GrantState::Finalized)?;
        self.finalized = Some(finalized);
        Ok(())
    }

    /// Record a failed grant request.
    pub fn mark_failed(&mut self) -> Result<(), PaymentError> {
        self.transition(GrantState::Failed)
    }

    /// Record local revocation of a finalized grant.
    pub fn mark_revoked(&mut self) -> Result<(), PaymentError> {
        self.transition(GrantState::Revoked)
    }

    /// The pending artifacts, or `InvalidState` if the grant is not pending.
    pub fn require_pending(&self) -> Result<&PendingGrant, PaymentError> {
        if self.state != GrantState::Pending {
            return Err(PaymentError::InvalidState(format!(
                "expected pending grant, state is {:?}",
                self.state
            )));
        }
        self.pending
            .as_ref()
            .ok_or_else(|| PaymentError::InvalidState("pending grant has no artifacts".into()))
    }

    /// The finalized token, or `InvalidState` if the grant is not finalized.
    pub fn require_finalized(&self) -> Result<&FinalizedGrant, PaymentError> {
        if self.state != GrantState::Finalized {
            return Err(PaymentError::InvalidState(format!(
                "expected finalized grant, state is {:?}",
                self.state
            )));
        }
        self.finalized
            .as_ref()
            .ok_or_else(|| PaymentError::InvalidState("finalized grant has no token".into()))
    }
}

/// Generate an interaction nonce: 32 random bytes, base64url without padding.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Verify an authorization-callback hash: base64url(sha256(nonce || interact_ref)).
///
/// Rejecting a forged callback here is what keeps an attacker from spending
/// someone else's interaction reference.
pub fn verify_callback_hash(received_hash: &str, nonce: &str, interact_ref: &str) -> bool {
    let mut hasher = Sha256::new();
    hasher.update(nonce.as_bytes());
    hasher.update(interact_ref.as_bytes());
    let expected = URL_SAFE_NO_PAD.encode(hasher.finalize());
    expected == received_hash
}

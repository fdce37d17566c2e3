//! One-time payment orchestration.
//!
//! Two-call contract around the grant's two legs: `prepare` builds the
//! incoming payment and quote, then requests an interactive grant with the
//! quote's debit amount as the ceiling and hands back a redirect URL.
//! `complete` exchanges the interaction reference and runs the outgoing
//! side of the already-created quote.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use client::types::Quote;
use client::{PaymentsApi, WalletCache};
use common::{Amount, Clock, InteractiveGrant, PaymentError, WalletAddress};

use crate::auth::{AuthController, GrantLimits};
use crate::settlement::{Choreographer, IncomingLeg, PaymentLeg};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OneTimePhase {
    Initiated,
    AuthorizationPending,
    Completed,
    Failed,
    Cancelled,
}

impl OneTimePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            OneTimePhase::Initiated => "initiated",
            OneTimePhase::AuthorizationPending => "authorization_pending",
            OneTimePhase::Completed => "completed",
            OneTimePhase::Failed => "failed",
            OneTimePhase::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OneTimePhase::Completed | OneTimePhase::Failed | OneTimePhase::Cancelled
        )
    }
}

/// Caller-facing snapshot of a one-time payment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OneTimePayment {
    pub id: String,
    pub sender: String,
    pub receiver: String,
    /// The requested amount, in the receiver's asset.
    pub amount: Amount,
    /// What the sender will be debited, per the quote.
    pub debit_amount: Amount,
    pub phase: OneTimePhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leg: Option<PaymentLeg>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub sender_wallet_url: String,
    pub receiver_wallet_url: String,
    /// Minor units in the receiver's asset.
    pub value: u64,
    pub description: Option<String>,
}

struct Session {
    payment: OneTimePayment,
    grant: InteractiveGrant,
    nonce: String,
    sender: WalletAddress,
    receiver: WalletAddress,
    quote: Quote,
    incoming: IncomingLeg,
}

pub struct OneTimeOrchestrator {
    api: Arc<dyn PaymentsApi>,
    auth: AuthController,
    choreographer: Choreographer,
    wallets: Arc<WalletCache>,
    clock: Arc<dyn Clock>,
    callback_base: String,
    sessions: RwLock<HashMap<String, Session>>,
}

impl OneTimeOrchestrator {
    pub fn new(
        api: Arc<dyn PaymentsApi>,
        wallets: Arc<WalletCache>,
        clock: Arc<dyn Clock>,
        callback_base: String,
    ) -> Self {
        Self {
            auth: AuthController::new(api.clone()),
            choreographer: Choreographer::new(api.clone()),
            api,
            wallets,
            clock,
            callback_base,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve wallets, create the incoming payment and quote, and request
    /// the interactive grant. The quote's debit amount becomes the grant
    /// ceiling, so the payer approves exactly what will leave their account.
    pub async fn prepare(&self, request: PaymentRequest) -> Result<OneTimePayment, PaymentError> {
        if request.value == 0 {
            return Err(PaymentError::Validation(
                "payment amount must be positive".to_string(),
            ));
        }
        let sender = self
            .wallets
            .resolve(self.api.as_ref(), &request.sender_wallet_url)
            .await?;
        let receiver = self
            .wallets
            .resolve(self.api.as_ref(), &request.receiver_wallet_url)
            .await?;

        let incoming = self
            .choreographer
            .create_incoming(&receiver, request.value, request.description.as_deref())
            .await?;
        let quote = self
            .choreographer
            .create_quote(&sender, &receiver, &incoming.payment.id, request.value)
            .await?;

        let id = format!("pay-{}", uuid::Uuid::new_v4());
        let finish_uri = format!("{}/payments/{}/callback", self.callback_base, id);
        let flow = self
            .auth
            .initiate(
                &sender,
                GrantLimits::ceiling(quote.debit_amount.clone()),
                &finish_uri,
                None,
            )
            .await?;

        let now = self.clock.now();
        let payment = OneTimePayment {
            id: id.clone(),
            sender: sender.id.clone(),
            receiver: receiver.id.clone(),
            amount: receiver.amount(request.value),
            debit_amount: quote.debit_amount.clone(),
            phase: OneTimePhase::AuthorizationPending,
            redirect_url: Some(flow.redirect_url.clone()),
            leg: None,
            error: None,
            description: request.description,
            created_at: now,
            updated_at: now,
        };
        info!(payment = %id, debit = %payment.debit_amount, "one-time payment prepared");

        let session = Session {
            payment: payment.clone(),
            grant: flow.grant,
            nonce: flow.nonce,
            sender,
            receiver,
            quote,
            incoming,
        };
        self.sessions.write().await.insert(id, session);
        Ok(payment)
    }

    /// Finalize the grant with the interaction reference and execute the
    /// outgoing side of the prepared quote. When a callback hash is
    /// supplied it is verified before the reference is spent.
    pub async fn complete(
        &self,
        id: &str,
        interact_ref: &str,
        callback_hash: Option<&str>,
    ) -> Result<OneTimePayment, PaymentError> {
        let (mut grant, sender, quote, incoming, description) = {
            let sessions = self.sessions.read().await;
            let session = sessions
                .get(id)
                .ok_or_else(|| PaymentError::NotFound(format!("unknown payment {id}")))?;
            if session.payment.phase != OneTimePhase::AuthorizationPending {
                return Err(PaymentError::InvalidState(format!(
                    "payment {id} is {}, not awaiting authorization",
                    session.payment.phase.as_str()
                )));
            }
            if let Some(hash) = callback_hash {
                if !AuthController::verify_callback(hash, &session.nonce, interact_ref) {
                    return Err(PaymentError::Validation(
                        "callback hash verification failed".to_string(),
                    ));
                }
            }
            (
                session.grant.clone(),
                session.sender.clone(),
                session.quote.clone(),
                session.incoming.clone(),
                session.payment.description.clone(),
            )
        };

        let result = async {
            let finalized = self.auth.complete(&mut grant, interact_ref).await?;
            self.choreographer
                .settle(&sender, &finalized, &quote, &incoming, description.as_deref())
                .await
        }
        .await;

        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| PaymentError::NotFound(format!("unknown payment {id}")))?;
        session.grant = grant;
        session.payment.updated_at = self.clock.now();
        match result {
            Ok(leg) => {
                session.payment.phase = OneTimePhase::Completed;
                session.payment.redirect_url = None;
                session.payment.leg = Some(leg);
                info!(payment = %id, "one-time payment completed");
                Ok(session.payment.clone())
            }
            Err(e) => {
                session.payment.phase = OneTimePhase::Failed;
                session.payment.error = Some(e.to_string());
                warn!(payment = %id, error = %e, "one-time payment failed");
                Err(e)
            }
        }
    }

    /// Prepare, hand the redirect URL to `authorize`, and complete with the
    /// interaction reference it resolves to. Lets a caller that controls
    /// authorization out-of-band run the whole flow in one call.
    pub async fn send_payment<F, Fut>(
        &self,
        request: PaymentRequest,
        authorize: F,
    ) -> Result<OneTimePayment, PaymentError>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<String, PaymentError>>,
    {
        let prepared = self.prepare(request).await?;
        let redirect = prepared
            .redirect_url
            .clone()
            .unwrap_or_default();
        let interact_ref = authorize(redirect).await?;
        self.complete(&prepared.id, &interact_ref, None).await
    }

    pub async fn status(&self, id: &str) -> Result<OneTimePayment, PaymentError> {
        self.sessions
            .read()
            .await
            .get(id)
            .map(|s| s.payment.clone())
            .ok_or_else(|| PaymentError::NotFound(format!("unknown payment {id}")))
    }

    /// Cancel a payment that has not completed. Revokes the grant remotely
    /// when one was finalized.
    pub async fn cancel(&self, id: &str) -> Result<OneTimePayment, PaymentError> {
        let mut grant = {
            let sessions = self.sessions.read().await;
            let session = sessions
                .get(id)
                .ok_or_else(|| PaymentError::NotFound(format!("unknown payment {id}")))?;
            if session.payment.phase.is_terminal() {
                return Err(PaymentError::InvalidState(format!(
                    "payment {id} is already {}",
                    session.payment.phase.as_str()
                )));
            }
            session.grant.clone()
        };

        if grant.finalized().is_some() {
            self.auth.revoke(&mut grant).await?;
        }

        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| PaymentError::NotFound(format!("unknown payment {id}")))?;
        session.grant = grant;
        session.payment.phase = OneTimePhase::Cancelled;
        session.payment.updated_at = self.clock.now();
        info!(payment = %id, "one-time payment cancelled");
        Ok(session.payment.clone())
    }

    /// Drop non-completed sessions older than `max_age`. Returns how many
    /// were removed.
    pub async fn cleanup_expired(&self, max_age: Duration) -> usize {
        let cutoff = self.clock.now() - max_age;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| {
            s.payment.phase == OneTimePhase::Completed || s.payment.created_at >= cutoff
        });
        before - sessions.len()
    }
}

//! Settlement choreography: one payer-to-payee transfer.
//!
//! A leg is five protocol steps: receiver-side incoming payment, quote,
//! outgoing payment against the finalized grant, then bounded polling to
//! observe receipt and completion. The first three steps fail the whole leg;
//! the polling steps never do, because the transfer itself already succeeded
//! at the protocol level by then.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use client::types::{
    AccessItem, IncomingPayment, IncomingPaymentRequest, OutgoingPaymentRequest, Quote,
    QuoteRequest,
};
use client::PaymentsApi;
use common::{Amount, FinalizedGrant, PaymentError, RetryPolicy, WalletAddress};

/// The resource triad produced by one choreography run, plus the amounts the
/// quote bound and whether settlement was observed before the polling budget
/// ran out.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLeg {
    pub incoming_payment_id: String,
    pub quote_id: String,
    pub outgoing_payment_id: String,
    /// What the sender was debited, per the quote.
    pub debited: Amount,
    /// What the receiver was credited, per the quote.
    pub received: Amount,
    /// False when the polling budget ran out before receipt and completion
    /// were both observed. The transfer itself still executed.
    pub settlement_confirmed: bool,
}

/// Polling budgets for settlement confirmation.
#[derive(Debug, Clone, Copy)]
pub struct SettlementConfig {
    /// Probes for `received_amount > 0` on the incoming payment.
    pub receipt_poll: RetryPolicy,
    /// Probes for the completed flag after the complete call.
    pub completion_poll: RetryPolicy,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            receipt_poll: RetryPolicy::fixed(3, Duration::from_secs(1)),
            completion_poll: RetryPolicy::linear(
                10,
                Duration::from_secs(1),
                Duration::from_secs(1),
            ),
        }
    }
}

/// An incoming payment plus the receiver-side token that can read and
/// complete it.
#[derive(Debug, Clone)]
pub struct IncomingLeg {
    pub payment: IncomingPayment,
    pub receiver_token: String,
}

/// Executes settlement legs against the protocol.
#[derive(Clone)]
pub struct Choreographer {
    api: Arc<dyn PaymentsApi>,
    config: SettlementConfig,
}

impl Choreographer {
    pub fn new(api: Arc<dyn PaymentsApi>) -> Self {
        Self {
            api,
            config: SettlementConfig::default(),
        }
    }

    pub fn with_config(api: Arc<dyn PaymentsApi>, config: SettlementConfig) -> Self {
        Self { api, config }
    }

    /// Steps 1-2: short-lived receiver grant, then the incoming payment for
    /// `value` in the receiver's asset.
    pub async fn create_incoming(
        &self,
        receiver: &WalletAddress,
        value: u64,
        description: Option<&str>,
    ) -> Result<IncomingLeg, PaymentError> {
        let grant = self
            .api
            .request_resource_grant(receiver, vec![AccessItem::incoming_payment()])
            .await?;
        let request = IncomingPaymentRequest {
            wallet_address: receiver.id.clone(),
            incoming_amount: receiver.amount(value),
            expires_at: None,
            metadata: description.map(|d| serde_json::json!({ "description": d })),
        };
        let payment = self
            .api
            .create_incoming_payment(receiver, &grant.access_token, &request)
            .await?;
        debug!(incoming = %payment.id, "incoming payment created");
        Ok(IncomingLeg {
            payment,
            receiver_token: grant.access_token,
        })
    }

    /// Step 3: short-lived quote grant against the sender, quote created at
    /// the receiver's resource server. Cross-asset sends pin the debit in
    /// the sender's asset so the protocol computes the exchange.
    pub async fn create_quote(
        &self,
        sender: &WalletAddress,
        receiver: &WalletAddress,
        incoming_payment_id: &str,
        value: u64,
    ) -> Result<Quote, PaymentError> {
        let grant = self
            .api
            .request_resource_grant(sender, vec![AccessItem::quote()])
            .await?;
        let mut request = QuoteRequest::ilp(&sender.id, incoming_payment_id);
        if sender.is_cross_asset(receiver) {
            request.debit_amount = Some(sender.amount(value));
        }
        let quote = self
            .api
            .create_quote(receiver, &grant.access_token, &request)
            .await?;
        debug!(quote = %quote.id, debit = %quote.debit_amount, "quote created");
        Ok(quote)
    }

    /// Steps 4-5: outgoing payment at the sender's resource server, then
    /// bounded receipt and completion polling.
    pub async fn settle(
        &self,
        sender: &WalletAddress,
        grant: &FinalizedGrant,
        quote: &Quote,
        incoming: &IncomingLeg,
        description: Option<&str>,
    ) -> Result<PaymentLeg, PaymentError> {
        let request = OutgoingPaymentRequest {
            wallet_address: sender.id.clone(),
            quote_id: quote.id.clone(),
            metadata: description.map(|d| serde_json::json!({ "description": d })),
        };
        let outgoing = self
            .api
            .create_outgoing_payment(sender, &grant.access_token, &request)
            .await?;

        let settlement_confirmed = self.confirm(incoming).await?;
        if settlement_confirmed {
            info!(outgoing = %outgoing.id, "leg settled and confirmed");
        } else {
            warn!(outgoing = %outgoing.id, "leg executed, settlement unconfirmed");
        }

        Ok(PaymentLeg {
            incoming_payment_id: incoming.payment.id.clone(),
            quote_id: quote.id.clone(),
            outgoing_payment_id: outgoing.id,
            debited: quote.debit_amount.clone(),
            received: quote.receive_amount.clone(),
            settlement_confirmed,
        })
    }

    /// The full choreography for one transfer.
    pub async fn execute(
        &self,
        sender: &WalletAddress,
        grant: &FinalizedGrant,
        receiver: &WalletAddress,
        value: u64,
        description: Option<&str>,
    ) -> Result<PaymentLeg, PaymentError> {
        let incoming = self.create_incoming(receiver, value, description).await?;
        let quote = self
            .create_quote(sender, receiver, &incoming.payment.id, value)
            .await?;
        self.settle(sender, grant, &quote, &incoming, description)
            .await
    }

    /// Wait for receipt, mark the incoming payment complete, then wait for
    /// the completed flag. Exhausted budgets report `false`, never an error.
    async fn confirm(&self, incoming: &IncomingLeg) -> Result<bool, PaymentError> {
        let receipt = self
            .config
            .receipt_poll
            .poll_until("receipt", || async {
                let payment = self
                    .api
                    .get_incoming_payment(&incoming.payment.id, &incoming.receiver_token)
                    .await?;
                Ok((payment.received_amount.value > 0).then_some(()))
            })
            .await?;

        // Complete regardless; completion is idempotent server-side and
        // stops the receiver waiting for further funds.
        self.api
            .complete_incoming_payment(&incoming.payment.id, &incoming.receiver_token)
            .await?;

        let completed = self
            .config
            .completion_poll
            .poll_until("completion", || async {
                let payment = self
                    .api
                    .get_incoming_payment(&incoming.payment.id, &incoming.receiver_token)
                    .await?;
                Ok(payment.completed.then_some(()))
            })
            .await?;

        Ok(receipt.is_some() && completed.is_some())
    }
}

//! In-memory protocol server for orchestrator tests.
//!
//! Implements [`PaymentsApi`] over a mutex-guarded state map: grants
//! finalize on continuation, outgoing payments fund their incoming payment
//! instantly, and failures can be injected per receiving wallet. Call
//! counters let tests assert which endpoints were actually hit.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use client::types::{
    IncomingPayment, IncomingPaymentRequest, OutgoingPayment, OutgoingPaymentRequest, Quote,
    QuoteRequest,
};
use client::PaymentsApi;
use common::{Amount, FinalizedGrant, PaymentError, PendingGrant, WalletAddress};

#[derive(Default)]
struct MockState {
    next_id: u64,
    wallets: HashMap<String, WalletAddress>,
    incoming: HashMap<String, IncomingPayment>,
    quotes: HashMap<String, Quote>,
    outgoing: HashMap<String, OutgoingPayment>,
    /// Receiving wallet URL -> remaining outgoing-payment failures.
    outgoing_failures: HashMap<String, u32>,
    /// Added to every quote's debit value, simulating sender-side fees.
    quote_markup: u64,
    /// When set, incoming payments never observe received funds.
    never_fund: bool,
    continue_calls: u32,
    revoke_calls: u32,
    outgoing_calls: u32,
}

#[derive(Default)]
pub struct MockApi {
    state: Mutex<MockState>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_wallet(&self, url: &str, asset_code: &str, asset_scale: u8) -> WalletAddress {
        let wallet = WalletAddress {
            id: url.to_string(),
            auth_server: "https://auth.example.com".to_string(),
            resource_server: "https://ilp.example.com".to_string(),
            asset_code: asset_code.to_string(),
            asset_scale,
            public_name: None,
        };
        self.state
            .lock()
            .unwrap()
            .wallets
            .insert(url.to_string(), wallet.clone());
        wallet
    }

    /// Make the next `times` outgoing payments toward `wallet_url` fail.
    pub fn fail_outgoing_to(&self, wallet_url: &str, times: u32) {
        self.state
            .lock()
            .unwrap()
            .outgoing_failures
            .insert(wallet_url.to_string(), times);
    }

    /// Quotes will report a debit `markup` minor units above the requested
    /// value, like a sender-side fee would.
    pub fn set_quote_markup(&self, markup: u64) {
        self.state.lock().unwrap().quote_markup = markup;
    }

    /// Incoming payments never show received funds, so receipt polling
    /// exhausts its budget.
    pub fn set_never_fund(&self, never: bool) {
        self.state.lock().unwrap().never_fund = never;
    }

    pub fn continue_calls(&self) -> u32 {
        self.state.lock().unwrap().continue_calls
    }

    pub fn revoke_calls(&self) -> u32 {
        self.state.lock().unwrap().revoke_calls
    }

    pub fn outgoing_calls(&self) -> u32 {
        self.state.lock().unwrap().outgoing_calls
    }

    fn next(state: &mut MockState) -> u64 {
        state.next_id += 1;
        state.next_id
    }
}

#[async_trait]
impl PaymentsApi for MockApi {
    async fn get_wallet_address(&self, url: &str) -> Result<WalletAddress, PaymentError> {
        self.state
            .lock()
            .unwrap()
            .wallets
            .get(url)
            .cloned()
            .ok_or_else(|| PaymentError::Protocol {
                status: 404,
                body: format!("no wallet address at {url}"),
            })
    }

    async fn request_resource_grant(
        &self,
        _wallet: &WalletAddress,
        _access: Vec<client::types::AccessItem>,
    ) -> Result<FinalizedGrant, PaymentError> {
        let mut state = self.state.lock().unwrap();
        let n = Self::next(&mut state);
        Ok(FinalizedGrant {
            access_token: format!("rs-token-{n}"),
            manage_url: None,
        })
    }

    async fn request_interactive_grant(
        &self,
        _wallet: &WalletAddress,
        _access: Vec<client::types::AccessItem>,
        _finish_uri: &str,
        nonce: &str,
    ) -> Result<PendingGrant, PaymentError> {
        let mut state = self.state.lock().unwrap();
        let n = Self::next(&mut state);
        Ok(PendingGrant {
            redirect_url: format!("https://auth.example.com/interact/{n}"),
            continue_uri: format!("https://auth.example.com/continue/{n}"),
            continue_token: format!("cont-{n}"),
            nonce: nonce.to_string(),
        })
    }

    async fn continue_grant(
        &self,
        continue_uri: &str,
        _continue_token: &str,
        _interact_ref: &str,
    ) -> Result<FinalizedGrant, PaymentError> {
        let mut state = self.state.lock().unwrap();
        state.continue_calls += 1;
        let n = Self::next(&mut state);
        Ok(FinalizedGrant {
            access_token: format!("token-{n}"),
            manage_url: Some(format!("{continue_uri}/token")),
        })
    }

    async fn revoke_grant(&self, _manage_url: &str, _token: &str) -> Result<(), PaymentError> {
        self.state.lock().unwrap().revoke_calls += 1;
        Ok(())
    }

    async fn create_incoming_payment(
        &self,
        _wallet: &WalletAddress,
        _token: &str,
        request: &IncomingPaymentRequest,
    ) -> Result<IncomingPayment, PaymentError> {
        let mut state = self.state.lock().unwrap();
        let n = Self::next(&mut state);
        let id = format!("https://ilp.example.com/incoming-payments/{n}");
        let payment = IncomingPayment {
            id: id.clone(),
            wallet_address: request.wallet_address.clone(),
            incoming_amount: Some(request.incoming_amount.clone()),
            received_amount: request.incoming_amount.with_value(0),
            completed: false,
            expires_at: request.expires_at,
            metadata: request.metadata.clone(),
        };
        state.incoming.insert(id, payment.clone());
        Ok(payment)
    }

    async fn get_incoming_payment(
        &self,
        url: &str,
        _token: &str,
    ) -> Result<IncomingPayment, PaymentError> {
        self.state
            .lock()
            .unwrap()
            .incoming
            .get(url)
            .cloned()
            .ok_or_else(|| PaymentError::Protocol {
                status: 404,
                body: format!("no incoming payment at {url}"),
            })
    }

    async fn complete_incoming_payment(
        &self,
        url: &str,
        _token: &str,
    ) -> Result<IncomingPayment, PaymentError> {
        let mut state = self.state.lock().unwrap();
        let payment = state
            .incoming
            .get_mut(url)
            .ok_or_else(|| PaymentError::Protocol {
                status: 404,
                body: format!("no incoming payment at {url}"),
            })?;
        payment.completed = true;
        Ok(payment.clone())
    }

    async fn create_quote(
        &self,
        _wallet: &WalletAddress,
        _token: &str,
        request: &QuoteRequest,
    ) -> Result<Quote, PaymentError> {
        let mut state = self.state.lock().unwrap();
        let receive_amount = state
            .incoming
            .get(&request.receiver)
            .and_then(|p| p.incoming_amount.clone())
            .ok_or_else(|| PaymentError::Protocol {
                status: 404,
                body: format!("quote receiver {} not found", request.receiver),
            })?;
        let sender = state
            .wallets
            .get(&request.wallet_address)
            .cloned()
            .ok_or_else(|| PaymentError::Protocol {
                status: 404,
                body: format!("unknown quoting wallet {}", request.wallet_address),
            })?;
        let base = match &request.debit_amount {
            Some(explicit) => explicit.clone(),
            None => Amount::new(sender.asset_code, sender.asset_scale, receive_amount.value),
        };
        let debit_amount = base.with_value(base.value + state.quote_markup);
        let n = Self::next(&mut state);
        let quote = Quote {
            id: format!("https://ilp.example.com/quotes/{n}"),
            wallet_address: request.wallet_address.clone(),
            receiver: request.receiver.clone(),
            debit_amount,
            receive_amount,
            expires_at: None,
        };
        state.quotes.insert(quote.id.clone(), quote.clone());
        Ok(quote)
    }

    async fn create_outgoing_payment(
        &self,
        _wallet: &WalletAddress,
        _token: &str,
        request: &OutgoingPaymentRequest,
    ) -> Result<OutgoingPayment, PaymentError> {
        let mut state = self.state.lock().unwrap();
        state.outgoing_calls += 1;
        let quote = state
            .quotes
            .get(&request.quote_id)
            .cloned()
            .ok_or_else(|| PaymentError::Protocol {
                status: 404,
                body: format!("unknown quote {}", request.quote_id),
            })?;
        let receiving_wallet = state
            .incoming
            .get(&quote.receiver)
            .map(|p| p.wallet_address.clone())
            .unwrap_or_default();
        if let Some(remaining) = state.outgoing_failures.get_mut(&receiving_wallet) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(PaymentError::Protocol {
                    status: 403,
                    body: format!("outgoing payment to {receiving_wallet} rejected"),
                });
            }
        }
        // The transfer settles instantly unless funding is suppressed.
        if !state.never_fund {
            if let Some(incoming) = state.incoming.get_mut(&quote.receiver) {
                incoming.received_amount = quote.receive_amount.clone();
            }
        }
        let n = Self::next(&mut state);
        let payment = OutgoingPayment {
            id: format!("https://ilp.example.com/outgoing-payments/{n}"),
            wallet_address: request.wallet_address.clone(),
            quote_id: Some(request.quote_id.clone()),
            receiver: quote.receiver.clone(),
            debit_amount: quote.debit_amount.clone(),
            receive_amount: quote.receive_amount.clone(),
            sent_amount: quote.debit_amount.clone(),
            failed: false,
            metadata: request.metadata.clone(),
        };
        state.outgoing.insert(payment.id.clone(), payment.clone());
        Ok(payment)
    }

    async fn get_outgoing_payment(
        &self,
        url: &str,
        _token: &str,
    ) -> Result<OutgoingPayment, PaymentError> {
        self.state
            .lock()
            .unwrap()
            .outgoing
            .get(url)
            .cloned()
            .ok_or_else(|| PaymentError::Protocol {
                status: 404,
                body: format!("no outgoing payment at {url}"),
            })
    }
}

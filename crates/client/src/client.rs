//! Signed HTTP client for the three protocol surfaces.

use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use common::{FinalizedGrant, PaymentError, PendingGrant, WalletAddress};

use crate::signing::RequestSigner;
use crate::types::{
    AccessItem, ContinueRequest, GrantAccessRequest, GrantRequest, GrantResponse, IncomingPayment,
    IncomingPaymentRequest, InteractRequest, OutgoingPayment, OutgoingPaymentRequest, Quote,
    QuoteRequest,
};

/// Identity and key material for the engine's own wallet address.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Wallet address URL presented as the GNAP `client`.
    pub wallet_address_url: String,
    /// Key id published in the wallet's JWKS.
    pub key_id: String,
    /// Base64-encoded 32-byte ed25519 seed.
    pub private_key: String,
}

/// Production [`crate::PaymentsApi`] implementation over reqwest.
#[derive(Clone)]
pub struct OpenPaymentsClient {
    http: reqwest::Client,
    signer: RequestSigner,
    client_wallet: String,
}

impl OpenPaymentsClient {
    pub fn new(config: &ClientConfig) -> Result<Self, PaymentError> {
        let signer = RequestSigner::from_base64_seed(&config.private_key, &config.key_id)?;
        Ok(Self {
            http: reqwest::Client::new(),
            signer,
            client_wallet: config.wallet_address_url.clone(),
        })
    }

    /// One signed protocol call. Non-2xx responses become
    /// [`PaymentError::Protocol`] with the server's body preserved verbatim;
    /// requests that never reach a server become [`PaymentError::Transport`].
    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        auth_token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> Result<T, PaymentError> {
        let body_bytes = match &body {
            Some(value) => Some(
                serde_json::to_vec(value)
                    .map_err(|e| PaymentError::Validation(format!("unserializable body: {e}")))?,
            ),
            None => None,
        };
        let headers = self
            .signer
            .sign(method.as_str(), url, body_bytes.as_deref());

        let mut request = self
            .http
            .request(method.clone(), url)
            .header("Accept", "application/json")
            .header("Signature-Input", &headers.signature_input)
            .header("Signature", &headers.signature);
        if let Some(digest) = &headers.content_digest {
            request = request.header("Content-Digest", digest);
        }
        if let Some(token) = auth_token {
            request = request.header("Authorization", format!("GNAP {token}"));
        }
        if let Some(bytes) = body_bytes {
            request = request.header("Content-Type", "application/json").body(bytes);
        }

        debug!(%method, url, "protocol request");
        let response = request
            .send()
            .await
            .map_err(|e| PaymentError::Transport(format!("{method} {url}: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PaymentError::Transport(format!("{method} {url}: reading body: {e}")))?;
        if !status.is_success() {
            return Err(PaymentError::Protocol {
                status: status.as_u16(),
                body: text,
            });
        }
        serde_json::from_str(&text).map_err(|e| {
            PaymentError::ProtocolViolation(format!("{method} {url}: malformed response: {e}"))
        })
    }

    async fn request_grant(
        &self,
        wallet: &WalletAddress,
        access: Vec<AccessItem>,
        interact: Option<InteractRequest>,
    ) -> Result<GrantResponse, PaymentError> {
        let request = GrantRequest {
            access_token: GrantAccessRequest { access },
            client: self.client_wallet.clone(),
            interact,
        };
        let body = serde_json::to_value(&request)
            .map_err(|e| PaymentError::Validation(format!("unserializable grant request: {e}")))?;
        self.send(Method::POST, &wallet.auth_server, None, Some(body))
            .await
    }
}

/// Join a resource collection path onto a resource server base URL.
fn resource_url(resource_server: &str, collection: &str) -> String {
    format!("{}/{collection}", resource_server.trim_end_matches('/'))
}

#[async_trait::async_trait]
impl crate::PaymentsApi for OpenPaymentsClient {
    #[instrument(skip(self))]
    async fn get_wallet_address(&self, url: &str) -> Result<WalletAddress, PaymentError> {
        self.send(Method::GET, url, None, None).await
    }

    async fn request_resource_grant(
        &self,
        wallet: &WalletAddress,
        access: Vec<AccessItem>,
    ) -> Result<FinalizedGrant, PaymentError> {
        let response = self.request_grant(wallet, access, None).await?;
        let token = response.access_token.ok_or_else(|| {
            PaymentError::ProtocolViolation(
                "non-interactive grant response carried no access token".to_string(),
            )
        })?;
        Ok(FinalizedGrant {
            access_token: token.value,
            manage_url: token.manage,
        })
    }

    async fn request_interactive_grant(
        &self,
        wallet: &WalletAddress,
        access: Vec<AccessItem>,
        finish_uri: &str,
        nonce: &str,
    ) -> Result<PendingGrant, PaymentError> {
        let interact = InteractRequest::redirect(finish_uri, nonce);
        let response = self.request_grant(wallet, access, Some(interact)).await?;

        let interact = response.interact.ok_or_else(|| {
            PaymentError::ProtocolViolation(
                "interactive grant response carried no interact section".to_string(),
            )
        })?;
        let continuation = response.continuation.ok_or_else(|| {
            PaymentError::ProtocolViolation(
                "interactive grant response carried no continue section".to_string(),
            )
        })?;
        Ok(PendingGrant {
            redirect_url: interact.redirect,
            continue_uri: continuation.uri,
            continue_token: continuation.access_token.value,
            nonce: nonce.to_string(),
        })
    }

    async fn continue_grant(
        &self,
        continue_uri: &str,
        continue_token: &str,
        interact_ref: &str,
    ) -> Result<FinalizedGrant, PaymentError> {
        let body = serde_json::to_value(ContinueRequest {
            interact_ref: interact_ref.to_string(),
        })
        .map_err(|e| PaymentError::Validation(format!("unserializable continuation: {e}")))?;
        let response: GrantResponse = self
            .send(Method::POST, continue_uri, Some(continue_token), Some(body))
            .await?;
        let token = response.access_token.ok_or_else(|| {
            PaymentError::ProtocolViolation(
                "grant continuation returned no access token; interaction not approved".to_string(),
            )
        })?;
        Ok(FinalizedGrant {
            access_token: token.value,
            manage_url: token.manage,
        })
    }

    async fn revoke_grant(
        &self,
        manage_url: &str,
        access_token: &str,
    ) -> Result<(), PaymentError> {
        // Revocation returns 204 with no body.
        let headers = self.signer.sign("DELETE", manage_url, None);
        let response = self
            .http
            .delete(manage_url)
            .header("Authorization", format!("GNAP {access_token}"))
            .header("Signature-Input", &headers.signature_input)
            .header("Signature", &headers.signature)
            .send()
            .await
            .map_err(|e| PaymentError::Transport(format!("DELETE {manage_url}: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PaymentError::Protocol {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    async fn create_incoming_payment(
        &self,
        wallet: &WalletAddress,
        access_token: &str,
        request: &IncomingPaymentRequest,
    ) -> Result<IncomingPayment, PaymentError> {
        let url = resource_url(&wallet.resource_server, "incoming-payments");
        let body = serde_json::to_value(request)
            .map_err(|e| PaymentError::Validation(format!("unserializable request: {e}")))?;
        self.send(Method::POST, &url, Some(access_token), Some(body))
            .await
    }

    async fn get_incoming_payment(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<IncomingPayment, PaymentError> {
        self.send(Method::GET, url, Some(access_token), None).await
    }

    async fn complete_incoming_payment(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<IncomingPayment, PaymentError> {
        let complete_url = format!("{}/complete", url.trim_end_matches('/'));
        self.send(Method::POST, &complete_url, Some(access_token), None)
            .await
    }

    async fn create_quote(
        &self,
        wallet: &WalletAddress,
        access_token: &str,
        request: &QuoteRequest,
    ) -> Result<Quote, PaymentError> {
        let url = resource_url(&wallet.resource_server, "quotes");
        let body = serde_json::to_value(request)
            .map_err(|e| PaymentError::Validation(format!("unserializable request: {e}")))?;
        self.send(Method::POST, &url, Some(access_token), Some(body))
            .await
    }

    async fn create_outgoing_payment(
        &self,
        wallet: &WalletAddress,
        access_token: &str,
        request: &OutgoingPaymentRequest,
    ) -> Result<OutgoingPayment, PaymentError> {
        let url = resource_url(&wallet.resource_server, "outgoing-payments");
        let body = serde_json::to_value(request)
            .map_err(|e| PaymentError::Validation(format!("unserializable request: {e}")))?;
        self.send(Method::POST, &url, Some(access_token), Some(body))
            .await
    }

    async fn get_outgoing_payment(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<OutgoingPayment, PaymentError> {
        self.send(Method::GET, url, Some(access_token), None).await
    }
}

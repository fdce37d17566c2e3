//! Wire types for the Open Payments and GNAP surfaces.
//!
//! Field names follow the JSON wire format (camelCase). Resources carry
//! their canonical `id` URL; follow-up reads and mutations go to that URL,
//! not to a path the client reconstructs.

use chrono::{DateTime, Utc};
use common::Amount;
use serde::{Deserialize, Serialize};

// ============================================================================
// GNAP grant requests and responses
// ============================================================================

/// One entry of a grant request's `access_token.access` array.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessItem {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub actions: Vec<String>,
    /// Wallet address the access is scoped to, required for outgoing
    /// payments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<AccessLimits>,
}

impl AccessItem {
    pub fn incoming_payment() -> Self {
        Self {
            resource_type: "incoming-payment".to_string(),
            actions: vec![
                "create".to_string(),
                "read".to_string(),
                "complete".to_string(),
            ],
            identifier: None,
            limits: None,
        }
    }

    pub fn quote() -> Self {
        Self {
            resource_type: "quote".to_string(),
            actions: vec!["create".to_string(), "read".to_string()],
            identifier: None,
            limits: None,
        }
    }

    pub fn outgoing_payment(identifier: &str, limits: AccessLimits) -> Self {
        Self {
            resource_type: "outgoing-payment".to_string(),
            actions: ["list", "list-all", "read", "read-all", "create"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            identifier: Some(identifier.to_string()),
            limits: Some(limits),
        }
    }
}

/// Spending limits attached to an outgoing-payment access item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessLimits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debit_amount: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receive_amount: Option<Amount>,
    /// ISO-8601 repeating interval for recurring authorizations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
}

// GNAP envelope fields are snake_case on the wire, unlike the camelCase
// resource layer below.
#[derive(Debug, Clone, Serialize)]
pub struct GrantRequest {
    pub access_token: GrantAccessRequest,
    /// The requesting client's wallet address URL.
    pub client: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interact: Option<InteractRequest>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GrantAccessRequest {
    pub access: Vec<AccessItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InteractRequest {
    pub start: Vec<String>,
    pub finish: InteractFinish,
}

#[derive(Debug, Clone, Serialize)]
pub struct InteractFinish {
    pub method: String,
    pub uri: String,
    pub nonce: String,
}

impl InteractRequest {
    /// The redirect interaction flow with a finish callback.
    pub fn redirect(finish_uri: &str, nonce: &str) -> Self {
        Self {
            start: vec!["redirect".to_string()],
            finish: InteractFinish {
                method: "redirect".to_string(),
                uri: finish_uri.to_string(),
                nonce: nonce.to_string(),
            },
        }
    }
}

/// A grant response. Non-interactive grants carry `access_token` directly;
/// interactive ones carry `interact` + `continue` and no token yet.
#[derive(Debug, Clone, Deserialize)]
pub struct GrantResponse {
    #[serde(default)]
    pub access_token: Option<AccessTokenBody>,
    #[serde(default)]
    pub interact: Option<InteractResponse>,
    #[serde(default, rename = "continue")]
    pub continuation: Option<ContinuationBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessTokenBody {
    pub value: String,
    #[serde(default)]
    pub manage: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractResponse {
    pub redirect: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContinuationBody {
    pub access_token: AccessTokenBody,
    pub uri: String,
}

/// Body of a grant continuation call.
#[derive(Debug, Clone, Serialize)]
pub struct ContinueRequest {
    pub interact_ref: String,
}

// ============================================================================
// Resource-server resources
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingPaymentRequest {
    /// The receiving wallet address URL.
    pub wallet_address: String,
    pub incoming_amount: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingPayment {
    /// Canonical URL of this incoming payment.
    pub id: String,
    pub wallet_address: String,
    #[serde(default)]
    pub incoming_amount: Option<Amount>,
    pub received_amount: Amount,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    /// The sending wallet address URL.
    pub wallet_address: String,
    /// The incoming payment URL the quote targets.
    pub receiver: String,
    pub method: String,
    /// Set only for cross-asset sends, where the debit is fixed in the
    /// sender's asset and the receive side floats with the exchange rate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debit_amount: Option<Amount>,
}

impl QuoteRequest {
    pub fn ilp(wallet_address: &str, receiver: &str) -> Self {
        Self {
            wallet_address: wallet_address.to_string(),
            receiver: receiver.to_string(),
            method: "ilp".to_string(),
            debit_amount: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: String,
    pub wallet_address: String,
    pub receiver: String,
    /// What the sender will be debited, in the sender's asset.
    pub debit_amount: Amount,
    /// What the receiver will get, in the receiver's asset.
    pub receive_amount: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingPaymentRequest {
    /// The sending wallet address URL.
    pub wallet_address: String,
    /// The quote this payment executes.
    pub quote_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingPayment {
    pub id: String,
    pub wallet_address: String,
    #[serde(default)]
    pub quote_id: Option<String>,
    pub receiver: String,
    pub debit_amount: Amount,
    pub receive_amount: Amount,
    /// What has actually left the sender's account so far.
    pub sent_amount: Amount,
    #[serde(default)]
    pub failed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_request_serializes_gnap_shape() {
        let req = GrantRequest {
            access_token: GrantAccessRequest {
                access: vec![AccessItem::outgoing_payment(
                    "https://ilp.example.com/alice",
                    AccessLimits {
                        debit_amount: Some(Amount::new("USD", 2, 15000)),
                        receive_amount: None,
                        interval: Some("R/2026-01-01T00:00:00Z/P1M".to_string()),
                    },
                )],
            },
            client: "https://ilp.example.com/engine".to_string(),
            interact: Some(InteractRequest::redirect(
                "https://engine.example.com/callback",
                "nonce-1",
            )),
        };
        let json = serde_json::to_value(&req).unwrap();
        let item = &json["access_token"]["access"][0];
        assert_eq!(item["type"], "outgoing-payment");
        assert_eq!(item["identifier"], "https://ilp.example.com/alice");
        assert_eq!(item["limits"]["debitAmount"]["value"], "15000");
        assert_eq!(json["interact"]["start"][0], "redirect");
        assert_eq!(json["interact"]["finish"]["nonce"], "nonce-1");
        // Quote access omits identifier and limits entirely.
        let quote = serde_json::to_value(AccessItem::quote()).unwrap();
        assert!(quote.get("identifier").is_none());
        assert!(quote.get("limits").is_none());
    }

    #[test]
    fn test_interactive_grant_response_parses() {
        let json = r#"{
            "interact": { "redirect": "https://auth.example.com/interact/xyz" },
            "continue": {
                "access_token": { "value": "cont-token" },
                "uri": "https://auth.example.com/continue/xyz"
            }
        }"#;
        let parsed: GrantResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.access_token.is_none());
        assert_eq!(
            parsed.interact.unwrap().redirect,
            "https://auth.example.com/interact/xyz"
        );
        let cont = parsed.continuation.unwrap();
        assert_eq!(cont.access_token.value, "cont-token");
        assert_eq!(cont.uri, "https://auth.example.com/continue/xyz");
    }

    #[test]
    fn test_incoming_payment_defaults() {
        let json = r#"{
            "id": "https://ilp.example.com/incoming-payments/1",
            "walletAddress": "https://ilp.example.com/bob",
            "receivedAmount": { "assetCode": "USD", "assetScale": 2, "value": "0" }
        }"#;
        let parsed: IncomingPayment = serde_json::from_str(json).unwrap();
        assert!(!parsed.completed);
        assert!(parsed.incoming_amount.is_none());
        assert_eq!(parsed.received_amount.value, 0);
    }
}

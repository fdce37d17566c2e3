//! Read-through cache for wallet address metadata.
//!
//! Wallet addresses are fetched once per URL and reused; their asset
//! denomination and server locations do not change over a process lifetime.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::debug;

use common::{PaymentError, WalletAddress};

use crate::api::PaymentsApi;

#[derive(Default)]
pub struct WalletCache {
    entries: RwLock<HashMap<String, WalletAddress>>,
}

impl WalletCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch `url` through `api`, serving repeats from the cache.
    pub async fn resolve(
        &self,
        api: &dyn PaymentsApi,
        url: &str,
    ) -> Result<WalletAddress, PaymentError> {
        let key = url.trim_end_matches('/').to_string();
        if let Some(hit) = self.entries.read().await.get(&key) {
            return Ok(hit.clone());
        }
        let wallet = api.get_wallet_address(&key).await?;
        debug!(url = %key, asset = %wallet.asset_code, "cached wallet address");
        self.entries
            .write()
            .await
            .insert(key, wallet.clone());
        Ok(wallet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use common::{FinalizedGrant, PendingGrant};

    use crate::types::*;

    /// Serves wallet lookups and counts them; every other operation is out
    /// of scope for these tests.
    struct CountingResolver {
        fetches: AtomicU32,
    }

    #[async_trait]
    impl PaymentsApi for CountingResolver {
        async fn get_wallet_address(&self, url: &str) -> Result<WalletAddress, PaymentError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(WalletAddress {
                id: url.to_string(),
                auth_server: "https://auth.example.com".to_string(),
                resource_server: "https://ilp.example.com".to_string(),
                asset_code: "USD".to_string(),
                asset_scale: 2,
                public_name: None,
            })
        }

        async fn request_resource_grant(
            &self,
            _: &WalletAddress,
            _: Vec<AccessItem>,
        ) -> Result<FinalizedGrant, PaymentError> {
            unreachable!()
        }

        async fn request_interactive_grant(
            &self,
            _: &WalletAddress,
            _: Vec<AccessItem>,
            _: &str,
            _: &str,
        ) -> Result<PendingGrant, PaymentError> {
            unreachable!()
        }

        async fn continue_grant(
            &self,
            _: &str,
            _: &str,
            _: &str,
        ) -> Result<FinalizedGrant, PaymentError> {
            unreachable!()
        }

        async fn revoke_grant(&self, _: &str, _: &str) -> Result<(), PaymentError> {
            unreachable!()
        }

        async fn create_incoming_payment(
            &self,
            _: &WalletAddress,
            _: &str,
            _: &IncomingPaymentRequest,
        ) -> Result<IncomingPayment, PaymentError> {
            unreachable!()
        }

        async fn get_incoming_payment(
            &self,
            _: &str,
            _: &str,
        ) -> Result<IncomingPayment, PaymentError> {
            unreachable!()
        }

        async fn complete_incoming_payment(
            &self,
            _: &str,
            _: &str,
        ) -> Result<IncomingPayment, PaymentError> {
            unreachable!()
        }

        async fn create_quote(
            &self,
            _: &WalletAddress,
            _: &str,
            _: &QuoteRequest,
        ) -> Result<Quote, PaymentError> {
            unreachable!()
        }

        async fn create_outgoing_payment(
            &self,
            _: &WalletAddress,
            _: &str,
            _: &OutgoingPaymentRequest,
        ) -> Result<OutgoingPayment, PaymentError> {
            unreachable!()
        }

        async fn get_outgoing_payment(
            &self,
            _: &str,
            _: &str,
        ) -> Result<OutgoingPayment, PaymentError> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn test_second_resolve_hits_cache() {
        let resolver = CountingResolver {
            fetches: AtomicU32::new(0),
        };
        let cache = WalletCache::new();

        let first = cache
            .resolve(&resolver, "https://ilp.example.com/alice")
            .await
            .unwrap();
        // Trailing slash normalizes to the same entry.
        let second = cache
            .resolve(&resolver, "https://ilp.example.com/alice/")
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(resolver.fetches.load(Ordering::SeqCst), 1);

        cache
            .resolve(&resolver, "https://ilp.example.com/bob")
            .await
            .unwrap();
        assert_eq!(resolver.fetches.load(Ordering::SeqCst), 2);
    }
}

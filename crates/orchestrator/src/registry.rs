//! Unified operation registry.
//!
//! One façade over the four payment patterns. Every started operation gets
//! an `op-` identifier and a kind-tagged record; callbacks, status reads,
//! cancellation, and cleanup dispatch on the kind so callers never need to
//! know which orchestrator holds the underlying state.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::info;

use client::{PaymentsApi, WalletCache};
use common::{Clock, PaymentError};

use crate::future::{FutureOrchestrator, WalletGrantPhase, WalletGrantRequest};
use crate::one_time::{OneTimeOrchestrator, PaymentRequest};
use crate::recurring::{RecurringOrchestrator, RecurringRequest};
use crate::split::{SplitOrchestrator, SplitPhase, SplitRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    OneTime,
    Split,
    Recurring,
    WalletGrant,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::OneTime => "one_time",
            OperationKind::Split => "split",
            OperationKind::Recurring => "recurring",
            OperationKind::WalletGrant => "wallet_grant",
        }
    }
}

/// Registry view of one operation. `payload_id` is the identifier inside
/// the owning orchestrator.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRecord {
    pub id: String,
    pub kind: OperationKind,
    pub status: String,
    pub payload_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What a caller gets back from a `start_*` entry point.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartedOperation {
    pub operation_id: String,
    pub kind: OperationKind,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_url: Option<String>,
}

pub struct UnifiedRegistry {
    one_time: Arc<OneTimeOrchestrator>,
    split: Arc<SplitOrchestrator>,
    recurring: Arc<RecurringOrchestrator>,
    future: Arc<FutureOrchestrator>,
    clock: Arc<dyn Clock>,
    records: RwLock<HashMap<String, OperationRecord>>,
}

impl UnifiedRegistry {
    pub fn new(
        api: Arc<dyn PaymentsApi>,
        wallets: Arc<WalletCache>,
        clock: Arc<dyn Clock>,
        callback_base: String,
    ) -> Self {
        Self {
            one_time: Arc::new(OneTimeOrchestrator::new(
                api.clone(),
                wallets.clone(),
                clock.clone(),
                callback_base.clone(),
            )),
            split: Arc::new(SplitOrchestrator::new(
                api.clone(),
                wallets.clone(),
                clock.clone(),
                callback_base.clone(),
            )),
            recurring: Arc::new(RecurringOrchestrator::new(
                api.clone(),
                wallets.clone(),
                clock.clone(),
                callback_base.clone(),
            )),
            future: Arc::new(FutureOrchestrator::new(api, wallets, clock.clone(), callback_base)),
            clock,
            records: RwLock::new(HashMap::new()),
        }
    }

    pub fn one_time(&self) -> &Arc<OneTimeOrchestrator> {
        &self.one_time
    }

    pub fn split(&self) -> &Arc<SplitOrchestrator> {
        &self.split
    }

    pub fn recurring(&self) -> &Arc<RecurringOrchestrator> {
        &self.recurring
    }

    pub fn future(&self) -> &Arc<FutureOrchestrator> {
        &self.future
    }

    // ------------------------------------------------------------------
    // Entry points
    // ------------------------------------------------------------------

    pub async fn start_one_time(
        &self,
        request: PaymentRequest,
    ) -> Result<StartedOperation, PaymentError> {
        let payment = self.one_time.prepare(request).await?;
        self.register(
            OperationKind::OneTime,
            &payment.id,
            payment.phase.as_str(),
            payment.redirect_url.clone(),
        )
        .await
    }

    pub async fn start_split(
        &self,
        request: SplitRequest,
    ) -> Result<StartedOperation, PaymentError> {
        let split = self.split.create(request).await?;
        self.register(
            OperationKind::Split,
            &split.id,
            split.phase.as_str(),
            split.redirect_url.clone(),
        )
        .await
    }

    pub async fn start_recurring(
        &self,
        request: RecurringRequest,
    ) -> Result<StartedOperation, PaymentError> {
        let series = self.recurring.create(request).await?;
        self.register(
            OperationKind::Recurring,
            &series.id,
            series.phase.as_str(),
            series.redirect_url.clone(),
        )
        .await
    }

    pub async fn start_wallet_grant(
        &self,
        request: WalletGrantRequest,
    ) -> Result<StartedOperation, PaymentError> {
        let grant = self.future.create_grant(request).await?;
        self.register(
            OperationKind::WalletGrant,
            &grant.id,
            grant.phase.as_str(),
            grant.redirect_url.clone(),
        )
        .await
    }

    /// Finish the authorization leg for any operation. A split payment
    /// executes immediately once its grant is active; the other kinds wait
    /// for their own triggers.
    pub async fn complete_authorization(
        &self,
        operation_id: &str,
        interact_ref: &str,
        callback_hash: Option<&str>,
    ) -> Result<OperationRecord, PaymentError> {
        let (kind, payload_id) = self.locate(operation_id).await?;
        let status = match kind {
            OperationKind::OneTime => {
                let payment = self
                    .one_time
                    .complete(&payload_id, interact_ref, callback_hash)
                    .await?;
                payment.phase.as_str().to_string()
            }
            OperationKind::Split => {
                self.split
                    .complete_authorization(&payload_id, interact_ref, callback_hash)
                    .await?;
                let executed = self.split.execute(&payload_id).await?;
                executed.phase.as_str().to_string()
            }
            OperationKind::Recurring => {
                let series = self
                    .recurring
                    .complete_authorization(&payload_id, interact_ref, callback_hash)
                    .await?;
                series.phase.as_str().to_string()
            }
            OperationKind::WalletGrant => {
                let grant = self
                    .future
                    .finalize(&payload_id, interact_ref, callback_hash)
                    .await?;
                grant.phase.as_str().to_string()
            }
        };
        info!(operation = %operation_id, kind = kind.as_str(), %status, "authorization completed");
        self.update_status(operation_id, status).await
    }

    /// Current record, with the status re-read from the owning orchestrator
    /// so background work (monitors, scheduled payments) is reflected.
    pub async fn status(&self, operation_id: &str) -> Result<OperationRecord, PaymentError> {
        let (kind, payload_id) = self.locate(operation_id).await?;
        let status = self.fetch_status(kind, &payload_id).await?;
        self.update_status(operation_id, status).await
    }

    pub async fn list(
        &self,
        kind: Option<OperationKind>,
        status: Option<&str>,
    ) -> Vec<OperationRecord> {
        let ids: Vec<String> = {
            let records = self.records.read().await;
            records.keys().cloned().collect()
        };
        let mut out = Vec::new();
        for id in ids {
            if let Ok(record) = self.status(&id).await {
                let kind_ok = kind.map_or(true, |k| record.kind == k);
                let status_ok = status.map_or(true, |s| record.status == s);
                if kind_ok && status_ok {
                    out.push(record);
                }
            }
        }
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        out
    }

    /// Cancel an operation; wallet grants are revoked.
    pub async fn cancel(&self, operation_id: &str) -> Result<OperationRecord, PaymentError> {
        let (kind, payload_id) = self.locate(operation_id).await?;
        let status = match kind {
            OperationKind::OneTime => self
                .one_time
                .cancel(&payload_id)
                .await?
                .phase
                .as_str()
                .to_string(),
            OperationKind::Split => self
                .split
                .cancel(&payload_id)
                .await?
                .phase
                .as_str()
                .to_string(),
            OperationKind::Recurring => self
                .recurring
                .cancel(&payload_id)
                .await?
                .phase
                .as_str()
                .to_string(),
            OperationKind::WalletGrant => self
                .future
                .revoke(&payload_id)
                .await?
                .phase
                .as_str()
                .to_string(),
        };
        info!(operation = %operation_id, kind = kind.as_str(), "operation cancelled");
        self.update_status(operation_id, status).await
    }

    /// Re-run failed recipients of a split operation.
    pub async fn retry_split(
        &self,
        operation_id: &str,
        indices: Option<&[usize]>,
    ) -> Result<OperationRecord, PaymentError> {
        let (kind, payload_id) = self.locate(operation_id).await?;
        if kind != OperationKind::Split {
            return Err(PaymentError::Validation(format!(
                "operation {operation_id} is {}, retry applies to split payments",
                kind.as_str()
            )));
        }
        let split = self.split.retry_failed(&payload_id, indices).await?;
        self.update_status(operation_id, split.phase.as_str().to_string())
            .await
    }

    /// Drop records whose operations have reached a terminal status.
    /// Orchestrator-side session state stays put; this only trims the index.
    pub async fn cleanup(&self) -> usize {
        let ids: Vec<String> = {
            let records = self.records.read().await;
            records.keys().cloned().collect()
        };
        let mut dropped = 0;
        for id in ids {
            let terminal = match self.status(&id).await {
                Ok(record) => is_terminal(record.kind, &record.status),
                // The payload is gone; the record points at nothing.
                Err(PaymentError::NotFound(_)) => true,
                Err(_) => false,
            };
            if terminal {
                self.records.write().await.remove(&id);
                dropped += 1;
            }
        }
        dropped
    }

    // ------------------------------------------------------------------

    async fn register(
        &self,
        kind: OperationKind,
        payload_id: &str,
        status: &str,
        authorization_url: Option<String>,
    ) -> Result<StartedOperation, PaymentError> {
        let now = self.clock.now();
        let record = OperationRecord {
            id: format!("op-{}", uuid::Uuid::new_v4()),
            kind,
            status: status.to_string(),
            payload_id: payload_id.to_string(),
            created_at: now,
            updated_at: now,
        };
        let started = StartedOperation {
            operation_id: record.id.clone(),
            kind,
            status: record.status.clone(),
            authorization_url,
        };
        info!(operation = %record.id, kind = kind.as_str(), payload = %payload_id, "operation registered");
        self.records.write().await.insert(record.id.clone(), record);
        Ok(started)
    }

    async fn locate(&self, operation_id: &str) -> Result<(OperationKind, String), PaymentError> {
        let records = self.records.read().await;
        let record = records
            .get(operation_id)
            .ok_or_else(|| PaymentError::NotFound(format!("unknown operation {operation_id}")))?;
        Ok((record.kind, record.payload_id.clone()))
    }

    async fn update_status(
        &self,
        operation_id: &str,
        status: String,
    ) -> Result<OperationRecord, PaymentError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(operation_id)
            .ok_or_else(|| PaymentError::NotFound(format!("unknown operation {operation_id}")))?;
        if record.status != status {
            record.status = status;
            record.updated_at = self.clock.now();
        }
        Ok(record.clone())
    }

    async fn fetch_status(
        &self,
        kind: OperationKind,
        payload_id: &str,
    ) -> Result<String, PaymentError> {
        let status = match kind {
            OperationKind::OneTime => {
                self.one_time.status(payload_id).await?.phase.as_str().to_string()
            }
            OperationKind::Split => {
                self.split.status(payload_id).await?.phase.as_str().to_string()
            }
            OperationKind::Recurring => {
                self.recurring.status(payload_id).await?.phase.as_str().to_string()
            }
            OperationKind::WalletGrant => {
                self.future.status(payload_id).await?.phase.as_str().to_string()
            }
        };
        Ok(status)
    }
}

fn is_terminal(kind: OperationKind, status: &str) -> bool {
    match kind {
        OperationKind::OneTime => {
            matches!(status, "completed" | "failed" | "cancelled")
        }
        OperationKind::Split => matches!(
            status,
            s if s == SplitPhase::Completed.as_str()
                || s == SplitPhase::PartiallyCompleted.as_str()
                || s == SplitPhase::Failed.as_str()
                || s == SplitPhase::Cancelled.as_str()
        ),
        OperationKind::Recurring => {
            matches!(status, "completed" | "failed" | "cancelled" | "error")
        }
        OperationKind::WalletGrant => matches!(
            status,
            s if s == WalletGrantPhase::Exhausted.as_str()
                || s == WalletGrantPhase::Revoked.as_str()
                || s == WalletGrantPhase::Failed.as_str()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split::{AllocationKind, RecipientSpec, SplitConfig};
    use crate::testing::MockApi;
    use common::ManualClock;

    fn setup() -> (Arc<MockApi>, Arc<ManualClock>, UnifiedRegistry) {
        let api = Arc::new(MockApi::new());
        api.add_wallet("https://ilp.example.com/alice", "USD", 2);
        api.add_wallet("https://ilp.example.com/bob", "USD", 2);
        api.add_wallet("https://ilp.example.com/carol", "USD", 2);
        let clock = Arc::new(ManualClock::at("2026-06-01T00:00:00Z".parse().unwrap()));
        let registry = UnifiedRegistry::new(
            api.clone(),
            Arc::new(WalletCache::new()),
            clock.clone(),
            "https://engine.example.com".to_string(),
        );
        (api, clock, registry)
    }

    fn one_time_request() -> PaymentRequest {
        PaymentRequest {
            sender_wallet_url: "https://ilp.example.com/alice".to_string(),
            receiver_wallet_url: "https://ilp.example.com/bob".to_string(),
            value: 2500,
            description: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_time_operation_round_trip() {
        let (_, _, registry) = setup();
        let started = registry.start_one_time(one_time_request()).await.unwrap();
        assert!(started.operation_id.starts_with("op-"));
        assert_eq!(started.kind, OperationKind::OneTime);
        assert_eq!(started.status, "authorization_pending");
        assert!(started.authorization_url.is_some());

        let record = registry
            .complete_authorization(&started.operation_id, "ref", None)
            .await
            .unwrap();
        assert_eq!(record.status, "completed");
        assert_eq!(
            registry.status(&started.operation_id).await.unwrap().status,
            "completed"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_split_executes_on_authorization() {
        let (_, _, registry) = setup();
        let started = registry
            .start_split(SplitRequest {
                sender_wallet_url: "https://ilp.example.com/alice".to_string(),
                total_amount: Some(10_000),
                recipients: vec![
                    RecipientSpec {
                        wallet_url: "https://ilp.example.com/bob".to_string(),
                        kind: AllocationKind::Fixed,
                        value: 4000,
                        priority: None,
                    },
                    RecipientSpec {
                        wallet_url: "https://ilp.example.com/carol".to_string(),
                        kind: AllocationKind::Remaining,
                        value: 0,
                        priority: None,
                    },
                ],
                config: SplitConfig::default(),
                description: None,
            })
            .await
            .unwrap();

        let record = registry
            .complete_authorization(&started.operation_id, "ref", None)
            .await
            .unwrap();
        assert_eq!(record.status, "completed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_filters_by_kind_and_status() {
        let (_, _, registry) = setup();
        let one = registry.start_one_time(one_time_request()).await.unwrap();
        registry
            .start_wallet_grant(WalletGrantRequest {
                sender_wallet_url: "https://ilp.example.com/alice".to_string(),
                total_allowance: 10_000,
                description: None,
            })
            .await
            .unwrap();

        assert_eq!(registry.list(None, None).await.len(), 2);
        let one_time_only = registry.list(Some(OperationKind::OneTime), None).await;
        assert_eq!(one_time_only.len(), 1);
        assert_eq!(one_time_only[0].id, one.operation_id);

        registry
            .complete_authorization(&one.operation_id, "ref", None)
            .await
            .unwrap();
        let pending = registry.list(None, Some("authorization_pending")).await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].kind, OperationKind::WalletGrant);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_dispatches_by_kind() {
        let (api, _, registry) = setup();
        let grant = registry
            .start_wallet_grant(WalletGrantRequest {
                sender_wallet_url: "https://ilp.example.com/alice".to_string(),
                total_allowance: 10_000,
                description: None,
            })
            .await
            .unwrap();
        registry
            .complete_authorization(&grant.operation_id, "ref", None)
            .await
            .unwrap();

        let record = registry.cancel(&grant.operation_id).await.unwrap();
        assert_eq!(record.status, "revoked");
        assert_eq!(api.revoke_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_rejected_for_non_split() {
        let (_, _, registry) = setup();
        let one = registry.start_one_time(one_time_request()).await.unwrap();
        let result = registry.retry_split(&one.operation_id, None).await;
        assert!(matches!(result, Err(PaymentError::Validation(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_drops_terminal_records() {
        let (_, _, registry) = setup();
        let done = registry.start_one_time(one_time_request()).await.unwrap();
        registry
            .complete_authorization(&done.operation_id, "ref", None)
            .await
            .unwrap();
        let pending = registry.start_one_time(one_time_request()).await.unwrap();

        assert_eq!(registry.cleanup().await, 1);
        let remaining = registry.list(None, None).await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, pending.operation_id);
        assert!(matches!(
            registry.status(&done.operation_id).await,
            Err(PaymentError::NotFound(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_operation_is_not_found() {
        let (_, _, registry) = setup();
        assert!(matches!(
            registry.status("op-missing").await,
            Err(PaymentError::NotFound(_))
        ));
    }
}

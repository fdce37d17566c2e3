//! Multi-recipient split payments.
//!
//! One grant covers the whole disbursement: recipient allocations resolve
//! deterministically (fixed, then percentage off the original total, then
//! at most one remainder-taker), the grant ceiling is their sum, and
//! execution runs priority-ordered batches with per-recipient failure
//! isolation.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use client::{PaymentsApi, WalletCache};
use common::{Amount, Clock, FinalizedGrant, InteractiveGrant, PaymentError, WalletAddress};

use crate::auth::{AuthController, GrantLimits};
use crate::settlement::{Choreographer, PaymentLeg};

pub const DEFAULT_PRIORITY: u8 = 5;
pub const DEFAULT_MAX_CONCURRENT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationKind {
    /// Declared value in minor units.
    Fixed,
    /// Declared value as a percentage of the original total.
    Percentage,
    /// Takes whatever the others left. At most one per split.
    Remaining,
}

/// A recipient as declared by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientSpec {
    pub wallet_url: String,
    pub kind: AllocationKind,
    /// Minor units for `fixed`, percent for `percentage`, ignored for
    /// `remaining`.
    #[serde(default)]
    pub value: u64,
    /// 1 executes first, 10 last.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
}

/// A recipient with its allocation settled.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRecipient {
    pub wallet_url: String,
    pub kind: AllocationKind,
    pub priority: u8,
    /// Resolved minor units.
    pub amount: u64,
}

/// Resolve recipient allocations in the fixed order fixed -> percentage ->
/// remaining, independent of input order. Output preserves input order.
pub fn resolve_recipients(
    total_amount: Option<u64>,
    specs: &[RecipientSpec],
) -> Result<Vec<ResolvedRecipient>, PaymentError> {
    if specs.is_empty() {
        return Err(PaymentError::Validation(
            "a split payment needs at least one recipient".to_string(),
        ));
    }
    for spec in specs {
        if let Some(priority) = spec.priority {
            if !(1..=10).contains(&priority) {
                return Err(PaymentError::Validation(format!(
                    "priority {priority} for {} is outside 1-10",
                    spec.wallet_url
                )));
            }
        }
    }

    let remaining_count = specs
        .iter()
        .filter(|s| s.kind == AllocationKind::Remaining)
        .count();
    if remaining_count > 1 {
        return Err(PaymentError::Validation(
            "at most one recipient may take the remaining amount".to_string(),
        ));
    }
    let needs_total = specs
        .iter()
        .any(|s| matches!(s.kind, AllocationKind::Percentage | AllocationKind::Remaining));
    let base = match (needs_total, total_amount) {
        (true, None) => {
            return Err(PaymentError::Validation(
                "total amount is required for percentage or remaining allocations".to_string(),
            ))
        }
        (_, total) => total.unwrap_or(0),
    };

    let percentage_sum: u64 = specs
        .iter()
        .filter(|s| s.kind == AllocationKind::Percentage)
        .map(|s| s.value)
        .sum();
    if percentage_sum > 100 {
        return Err(PaymentError::Validation(format!(
            "percentage allocations sum to {percentage_sum}, above 100"
        )));
    }

    // Two passes: settle fixed and percentage amounts against the original
    // total, then hand the remainder to the remaining-taker.
    let mut remainder = i128::from(base);
    let mut amounts: Vec<Option<u64>> = vec![None; specs.len()];
    for (i, spec) in specs.iter().enumerate() {
        let amount = match spec.kind {
            AllocationKind::Fixed => spec.value,
            AllocationKind::Percentage => {
                (u128::from(base) * u128::from(spec.value) / 100) as u64
            }
            AllocationKind::Remaining => continue,
        };
        remainder -= i128::from(amount);
        amounts[i] = Some(amount);
    }
    for (i, spec) in specs.iter().enumerate() {
        if spec.kind == AllocationKind::Remaining {
            amounts[i] = Some(remainder.max(0) as u64);
        }
    }
    if total_amount.is_some() && remainder < 0 {
        return Err(PaymentError::Validation(format!(
            "allocations exceed the total amount by {}",
            -remainder
        )));
    }

    specs
        .iter()
        .zip(amounts)
        .map(|(spec, amount)| {
            let amount = amount.unwrap_or(0);
            if amount == 0 {
                return Err(PaymentError::Validation(format!(
                    "recipient {} resolves to a zero amount",
                    spec.wallet_url
                )));
            }
            Ok(ResolvedRecipient {
                wallet_url: spec.wallet_url.clone(),
                kind: spec.kind,
                priority: spec.priority.unwrap_or(DEFAULT_PRIORITY),
                amount,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SplitConfig {
    pub parallel: bool,
    pub stop_on_error: bool,
    pub max_concurrent: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            stop_on_error: false,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SplitRequest {
    pub sender_wallet_url: String,
    pub total_amount: Option<u64>,
    pub recipients: Vec<RecipientSpec>,
    pub config: SplitConfig,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitPhase {
    AuthorizationPending,
    Ready,
    Executing,
    Completed,
    PartiallyCompleted,
    Failed,
    Cancelled,
}

impl SplitPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SplitPhase::AuthorizationPending => "authorization_pending",
            SplitPhase::Ready => "ready",
            SplitPhase::Executing => "executing",
            SplitPhase::Completed => "completed",
            SplitPhase::PartiallyCompleted => "partially_completed",
            SplitPhase::Failed => "failed",
            SplitPhase::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientStatus {
    Pending,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientResult {
    pub wallet_url: String,
    pub amount: u64,
    pub status: RecipientStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leg: Option<PaymentLeg>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub attempts: u32,
}

/// Caller-facing snapshot of a split payment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitPayment {
    pub id: String,
    pub sender: String,
    pub grant_ceiling: Amount,
    pub phase: SplitPhase,
    pub recipients: Vec<ResolvedRecipient>,
    pub results: Vec<RecipientResult>,
    pub successful: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

struct Session {
    payment: SplitPayment,
    grant: InteractiveGrant,
    nonce: String,
    sender: WalletAddress,
    config: SplitConfig,
}

pub struct SplitOrchestrator {
    api: Arc<dyn PaymentsApi>,
    auth: AuthController,
    choreographer: Choreographer,
    wallets: Arc<WalletCache>,
    clock: Arc<dyn Clock>,
    callback_base: String,
    sessions: RwLock<HashMap<String, Session>>,
}

impl SplitOrchestrator {
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

    /// Validate and resolve the split, then request one grant whose ceiling
    /// is the sum of all resolved amounts.
    pub async fn create(&self, request: SplitRequest) -> Result<SplitPayment, PaymentError> {
        let recipients = resolve_recipients(request.total_amount, &request.recipients)?;
        let ceiling: u64 = recipients.iter().try_fold(0u64, |acc, r| {
            acc.checked_add(r.amount).ok_or_else(|| {
                PaymentError::Validation("split total overflows u64".to_string())
            })
        })?;

        let sender = self
            .wallets
            .resolve(self.api.as_ref(), &request.sender_wallet_url)
            .await?;
        let id = format!("split-{}", uuid::Uuid::new_v4());
        let finish_uri = format!("{}/split-payments/{}/callback", self.callback_base, id);
        let flow = self
            .auth
            .initiate(
                &sender,
                GrantLimits::ceiling(sender.amount(ceiling)),
                &finish_uri,
                None,
            )
            .await?;

        let now = self.clock.now();
        let results = recipients
            .iter()
            .map(|r| RecipientResult {
                wallet_url: r.wallet_url.clone(),
                amount: r.amount,
                status: RecipientStatus::Pending,
                leg: None,
                error: None,
                attempts: 0,
            })
            .collect();
        let payment = SplitPayment {
            id: id.clone(),
            sender: sender.id.clone(),
            grant_ceiling: sender.amount(ceiling),
            phase: SplitPhase::AuthorizationPending,
            recipients,
            results,
            successful: 0,
            failed: 0,
            redirect_url: Some(flow.redirect_url.clone()),
            description: request.description,
            created_at: now,
            updated_at: now,
        };
        info!(split = %id, ceiling, recipients = payment.recipients.len(), "split payment created");

        self.sessions.write().await.insert(
            id,
            Session {
                payment: payment.clone(),
                grant: flow.grant,
                nonce: flow.nonce,
                sender,
                config: request.config,
            },
        );
        Ok(payment)
    }

    /// Finalize the grant; the split becomes `ready` for execution.
    pub async fn complete_authorization(
        &self,
        id: &str,
        interact_ref: &str,
        callback_hash: Option<&str>,
    ) -> Result<SplitPayment, PaymentError> {
        let mut grant = {
            let sessions = self.sessions.read().await;
            let session = self.require(&sessions, id)?;
            if session.payment.phase != SplitPhase::AuthorizationPending {
                return Err(PaymentError::InvalidState(format!(
                    "split {id} is {}, not awaiting authorization",
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
            session.grant.clone()
        };

        let result = self.auth.complete(&mut grant, interact_ref).await;

        let mut sessions = self.sessions.write().await;
        let session = self.require_mut(&mut sessions, id)?;
        session.grant = grant;
        session.payment.updated_at = self.clock.now();
        match result {
            Ok(_) => {
                session.payment.phase = SplitPhase::Ready;
                session.payment.redirect_url = None;
                info!(split = %id, "split authorization complete");
                Ok(session.payment.clone())
            }
            Err(e) => {
                session.payment.phase = SplitPhase::Failed;
                warn!(split = %id, error = %e, "split authorization failed");
                Err(e)
            }
        }
    }

    /// Run every pending recipient in priority order.
    pub async fn execute(&self, id: &str) -> Result<SplitPayment, PaymentError> {
        let (grant, sender, config, description, targets) = {
            let mut sessions = self.sessions.write().await;
            let session = self.require_mut(&mut sessions, id)?;
            if session.payment.phase != SplitPhase::Ready {
                return Err(PaymentError::InvalidState(format!(
                    "split {id} is {}, not ready to execute",
                    session.payment.phase.as_str()
                )));
            }
            let grant = session.grant.require_finalized()?.clone();
            session.payment.phase = SplitPhase::Executing;
            let targets: Vec<usize> = (0..session.payment.recipients.len()).collect();
            (
                grant,
                session.sender.clone(),
                session.config.clone(),
                session.payment.description.clone(),
                self.in_priority_order(&session.payment, targets),
            )
        };

        let outcomes = self
            .run_batches(id, &grant, &sender, &config, description.as_deref(), &targets)
            .await;
        self.record_outcomes(id, outcomes).await
    }

    /// Re-run failed recipients, optionally restricted to the given indices,
    /// patching their results in place. Succeeded legs are never re-touched.
    pub async fn retry_failed(
        &self,
        id: &str,
        indices: Option<&[usize]>,
    ) -> Result<SplitPayment, PaymentError> {
        let (grant, sender, config, description, targets) = {
            let mut sessions = self.sessions.write().await;
            let session = self.require_mut(&mut sessions, id)?;
            if !matches!(
                session.payment.phase,
                SplitPhase::PartiallyCompleted | SplitPhase::Failed
            ) {
                return Err(PaymentError::InvalidState(format!(
                    "split {id} is {}, nothing to retry",
                    session.payment.phase.as_str()
                )));
            }
            if let Some(indices) = indices {
                if let Some(&bad) = indices
                    .iter()
                    .find(|&&i| i >= session.payment.results.len())
                {
                    return Err(PaymentError::Validation(format!(
                        "recipient index {bad} out of range"
                    )));
                }
            }
            let targets: Vec<usize> = session
                .payment
                .results
                .iter()
                .enumerate()
                .filter(|(i, r)| {
                    r.status == RecipientStatus::Failed
                        && indices.map_or(true, |sel| sel.contains(i))
                })
                .map(|(i, _)| i)
                .collect();
            if targets.is_empty() {
                return Err(PaymentError::Validation(
                    "no failed recipients match the retry selection".to_string(),
                ));
            }
            let grant = session.grant.require_finalized()?.clone();
            session.payment.phase = SplitPhase::Executing;
            (
                grant,
                session.sender.clone(),
                session.config.clone(),
                session.payment.description.clone(),
                self.in_priority_order(&session.payment, targets),
            )
        };

        info!(split = %id, retrying = targets.len(), "retrying failed recipients");
        let outcomes = self
            .run_batches(id, &grant, &sender, &config, description.as_deref(), &targets)
            .await;
        self.record_outcomes(id, outcomes).await
    }

    pub async fn status(&self, id: &str) -> Result<SplitPayment, PaymentError> {
        let sessions = self.sessions.read().await;
        Ok(self.require(&sessions, id)?.payment.clone())
    }

    pub async fn list(&self, phase: Option<SplitPhase>) -> Vec<SplitPayment> {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| phase.map_or(true, |p| s.payment.phase == p))
            .map(|s| s.payment.clone())
            .collect()
    }

    /// Cancel a split that is not mid-execution and not completed. Revokes
    /// the grant when one was finalized.
    pub async fn cancel(&self, id: &str) -> Result<SplitPayment, PaymentError> {
        let mut grant = {
            let sessions = self.sessions.read().await;
            let session = self.require(&sessions, id)?;
            match session.payment.phase {
                SplitPhase::Executing => {
                    return Err(PaymentError::InvalidState(format!(
                        "split {id} is executing and cannot be cancelled"
                    )))
                }
                SplitPhase::Completed | SplitPhase::Cancelled => {
                    return Err(PaymentError::InvalidState(format!(
                        "split {id} is already {}",
                        session.payment.phase.as_str()
                    )))
                }
                _ => {}
            }
            session.grant.clone()
        };

        if grant.finalized().is_some() {
            self.auth.revoke(&mut grant).await?;
        }

        let mut sessions = self.sessions.write().await;
        let session = self.require_mut(&mut sessions, id)?;
        session.grant = grant;
        session.payment.phase = SplitPhase::Cancelled;
        session.payment.updated_at = self.clock.now();
        info!(split = %id, "split payment cancelled");
        Ok(session.payment.clone())
    }

    fn require<'a>(
        &self,
        sessions: &'a HashMap<String, Session>,
        id: &str,
    ) -> Result<&'a Session, PaymentError> {
        sessions
            .get(id)
            .ok_or_else(|| PaymentError::NotFound(format!("unknown split payment {id}")))
    }

    fn require_mut<'a>(
        &self,
        sessions: &'a mut HashMap<String, Session>,
        id: &str,
    ) -> Result<&'a mut Session, PaymentError> {
        sessions
            .get_mut(id)
            .ok_or_else(|| PaymentError::NotFound(format!("unknown split payment {id}")))
    }

    /// Stable-sort target indices by recipient priority, 1 first.
    fn in_priority_order(&self, payment: &SplitPayment, mut targets: Vec<usize>) -> Vec<usize> {
        targets.sort_by_key(|&i| payment.recipients[i].priority);
        targets
    }

    /// Run the selected recipients in batches of `max_concurrent` (or one at
    /// a time). With `stop_on_error`, no further batch starts after one
    /// containing a failure; siblings already started still finish.
    async fn run_batches(
        &self,
        id: &str,
        grant: &FinalizedGrant,
        sender: &WalletAddress,
        config: &SplitConfig,
        description: Option<&str>,
        targets: &[usize],
    ) -> Vec<(usize, Result<PaymentLeg, PaymentError>)> {
        let batch_size = if config.parallel {
            config.max_concurrent.max(1)
        } else {
            1
        };
        let recipients: Vec<(usize, String, u64)> = {
            let sessions = self.sessions.read().await;
            match sessions.get(id) {
                Some(session) => targets
                    .iter()
                    .map(|&i| {
                        let r = &session.payment.recipients[i];
                        (i, r.wallet_url.clone(), r.amount)
                    })
                    .collect(),
                None => return Vec::new(),
            }
        };

        let mut outcomes = Vec::with_capacity(recipients.len());
        for batch in recipients.chunks(batch_size) {
            let legs = join_all(batch.iter().map(|(i, wallet_url, amount)| async move {
                (*i, self.run_leg(grant, sender, wallet_url, *amount, description).await)
            }))
            .await;
            let batch_failed = legs.iter().any(|(_, r)| r.is_err());
            outcomes.extend(legs);
            if config.stop_on_error && batch_failed {
                break;
            }
        }
        outcomes
    }

    async fn run_leg(
        &self,
        grant: &FinalizedGrant,
        sender: &WalletAddress,
        receiver_url: &str,
        amount: u64,
        description: Option<&str>,
    ) -> Result<PaymentLeg, PaymentError> {
        let receiver = self.wallets.resolve(self.api.as_ref(), receiver_url).await?;
        self.choreographer
            .execute(sender, grant, &receiver, amount, description)
            .await
    }

    /// Patch per-recipient outcomes into the stored results and derive the
    /// final phase from the overall success and failure counts.
    async fn record_outcomes(
        &self,
        id: &str,
        outcomes: Vec<(usize, Result<PaymentLeg, PaymentError>)>,
    ) -> Result<SplitPayment, PaymentError> {
        let mut sessions = self.sessions.write().await;
        let session = self.require_mut(&mut sessions, id)?;
        for (i, outcome) in outcomes {
            let result = &mut session.payment.results[i];
            result.attempts += 1;
            match outcome {
                Ok(leg) => {
                    result.status = RecipientStatus::Succeeded;
                    result.leg = Some(leg);
                    result.error = None;
                }
                Err(e) => {
                    result.status = RecipientStatus::Failed;
                    result.error = Some(e.to_string());
                }
            }
        }
        // Recipients selected but never started (stop_on_error) count as
        // failed so a later retry can pick them up.
        for result in session.payment.results.iter_mut() {
            if result.status == RecipientStatus::Pending {
                result.status = RecipientStatus::Failed;
                result.error = Some("not executed: stopped after earlier failure".to_string());
            }
        }

        let successful = session
            .payment
            .results
            .iter()
            .filter(|r| r.status == RecipientStatus::Succeeded)
            .count();
        let failed = session
            .payment
            .results
            .iter()
            .filter(|r| r.status == RecipientStatus::Failed)
            .count();
        session.payment.successful = successful;
        session.payment.failed = failed;
        session.payment.phase = if failed == 0 {
            SplitPhase::Completed
        } else if successful > 0 {
            SplitPhase::PartiallyCompleted
        } else {
            SplitPhase::Failed
        };
        session.payment.updated_at = self.clock.now();
        info!(
            split = %id,
            successful,
            failed,
            phase = session.payment.phase.as_str(),
            "split execution recorded"
        );
        Ok(session.payment.clone())
    }
}

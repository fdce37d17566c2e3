//! Long-lived wallet grants and scheduled future payments.
//!
//! A wallet grant authorizes a total allowance with no recipient known at
//! grant time. Spending is gated by a reserve-then-attempt ledger so
//! concurrent scheduling can never oversubscribe the ceiling: scheduling
//! reserves immediately, execution releases the reservation and books the
//! actual debit, and `used + reserved <= total` holds at every instant.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use client::{PaymentsApi, WalletCache};
use common::{Clock, InteractiveGrant, IsoDuration, PaymentError, WalletAddress};

use crate::auth::{AuthController, GrantLimits};
use crate::settlement::{Choreographer, PaymentLeg};

pub const SCHEDULED_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_MONITOR_PERIOD: StdDuration = StdDuration::from_secs(30);

fn retry_delay() -> Duration {
    Duration::minutes(5)
}

// ============================================================================
// Budget ledger
// ============================================================================

/// Reserve/release/book ledger against a fixed ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    total: u64,
    used: u64,
    reserved: u64,
}

impl Budget {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            used: 0,
            reserved: 0,
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn reserved(&self) -> u64 {
        self.reserved
    }

    pub fn headroom(&self) -> u64 {
        self.total - self.used - self.reserved
    }

    pub fn exhausted(&self) -> bool {
        self.used >= self.total
    }

    /// Commit `amount` of headroom to a not-yet-executed payment.
    pub fn reserve(&mut self, amount: u64) -> Result<(), PaymentError> {
        if amount > self.headroom() {
            return Err(PaymentError::BudgetExceeded(format!(
                "cannot reserve {amount}: used {} + reserved {} + {amount} exceeds ceiling {}",
                self.used, self.reserved, self.total
            )));
        }
        self.reserved += amount;
        Ok(())
    }

    /// Return a reservation to headroom.
    pub fn release(&mut self, amount: u64) {
        self.reserved = self.reserved.saturating_sub(amount);
    }

    /// Book an actual debit. Returns true when the debit had to be clamped
    /// to the remaining headroom to preserve the ceiling invariant.
    pub fn book(&mut self, amount: u64) -> bool {
        let clamped = amount > self.headroom();
        self.used += amount.min(self.headroom());
        clamped
    }
}

// ============================================================================
// Snapshots
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletGrantPhase {
    AuthorizationPending,
    Active,
    Exhausted,
    Revoked,
    Failed,
}

impl WalletGrantPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletGrantPhase::AuthorizationPending => "authorization_pending",
            WalletGrantPhase::Active => "active",
            WalletGrantPhase::Exhausted => "exhausted",
            WalletGrantPhase::Revoked => "revoked",
            WalletGrantPhase::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduledPhase {
    Scheduled,
    Executing,
    Completed,
    Cancelled,
    Failed,
}

impl ScheduledPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduledPhase::Scheduled => "scheduled",
            ScheduledPhase::Executing => "executing",
            ScheduledPhase::Completed => "completed",
            ScheduledPhase::Cancelled => "cancelled",
            ScheduledPhase::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct WalletGrantRequest {
    pub sender_wallet_url: String,
    /// Total allowance in minor units of the sender's asset.
    pub total_allowance: u64,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantPaymentRecord {
    pub executed_at: DateTime<Utc>,
    pub receiver: String,
    pub leg: PaymentLeg,
}

/// Caller-facing snapshot of a wallet grant.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletGrant {
    pub id: String,
    pub sender: String,
    pub total_allowance: u64,
    pub used: u64,
    pub reserved: u64,
    pub phase: WalletGrantPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledPayment {
    pub id: String,
    pub grant_id: String,
    pub receiver: String,
    pub amount: u64,
    pub fire_at: DateTime<Utc>,
    pub attempts: u32,
    pub max_attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurring_interval: Option<String>,
    pub phase: ScheduledPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leg: Option<PaymentLeg>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Orchestrator
// ============================================================================

struct GrantSession {
    snapshot: WalletGrant,
    grant: InteractiveGrant,
    nonce: String,
    sender: WalletAddress,
    budget: Budget,
    history: Vec<GrantPaymentRecord>,
}

struct ScheduledRecord {
    snapshot: ScheduledPayment,
    interval: Option<IsoDuration>,
}

pub struct FutureOrchestrator {
    api: Arc<dyn PaymentsApi>,
    auth: AuthController,
    choreographer: Choreographer,
    wallets: Arc<WalletCache>,
    clock: Arc<dyn Clock>,
    callback_base: String,
    grants: RwLock<HashMap<String, GrantSession>>,
    scheduled: RwLock<HashMap<String, ScheduledRecord>>,
}

impl FutureOrchestrator {
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
            grants: RwLock::new(HashMap::new()),
            scheduled: RwLock::new(HashMap::new()),
        }
    }

    /// Request an interactive grant whose ceiling is the declared total
    /// allowance. No recipient is named; that is the point.
    pub async fn create_grant(
        &self,
        request: WalletGrantRequest,
    ) -> Result<WalletGrant, PaymentError> {
        if request.total_allowance == 0 {
            return Err(PaymentError::Validation(
                "total allowance must be positive".to_string(),
            ));
        }
        let sender = self
            .wallets
            .resolve(self.api.as_ref(), &request.sender_wallet_url)
            .await?;

        let id = format!("wg-{}", uuid::Uuid::new_v4());
        let finish_uri = format!("{}/wallet-grants/{}/callback", self.callback_base, id);
        let flow = self
            .auth
            .initiate(
                &sender,
                GrantLimits::ceiling(sender.amount(request.total_allowance)),
                &finish_uri,
                None,
            )
            .await?;

        let now = self.clock.now();
        let snapshot = WalletGrant {
            id: id.clone(),
            sender: sender.id.clone(),
            total_allowance: request.total_allowance,
            used: 0,
            reserved: 0,
            phase: WalletGrantPhase::AuthorizationPending,
            redirect_url: Some(flow.redirect_url.clone()),
            error: None,
            description: request.description,
            created_at: now,
            updated_at: now,
        };
        info!(grant = %id, allowance = request.total_allowance, "wallet grant requested");

        self.grants.write().await.insert(
            id,
            GrantSession {
                snapshot: snapshot.clone(),
                grant: flow.grant,
                nonce: flow.nonce,
                sender,
                budget: Budget::new(request.total_allowance),
                history: Vec::new(),
            },
        );
        Ok(snapshot)
    }

    /// Finalize the grant and make the allowance spendable.
    pub async fn finalize(
        &self,
        id: &str,
        interact_ref: &str,
        callback_hash: Option<&str>,
    ) -> Result<WalletGrant, PaymentError> {
        let mut grant = {
            let grants = self.grants.read().await;
            let session = require(&grants, id)?;
            if session.snapshot.phase != WalletGrantPhase::AuthorizationPending {
                return Err(PaymentError::InvalidState(format!(
                    "wallet grant {id} is {}, not awaiting authorization",
                    session.snapshot.phase.as_str()
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

        let mut grants = self.grants.write().await;
        let session = require_mut(&mut grants, id)?;
        session.grant = grant;
        session.snapshot.updated_at = self.clock.now();
        match result {
            Ok(_) => {
                session.snapshot.phase = WalletGrantPhase::Active;
                session.snapshot.redirect_url = None;
                info!(grant = %id, "wallet grant active");
                Ok(session.snapshot.clone())
            }
            Err(e) => {
                session.snapshot.phase = WalletGrantPhase::Failed;
                session.snapshot.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Execute an immediate payment against the grant: reserve, run the
    /// leg, then book the actual debit.
    pub async fn execute_payment(
        &self,
        id: &str,
        receiver_wallet_url: &str,
        value: u64,
        description: Option<&str>,
    ) -> Result<(PaymentLeg, WalletGrant), PaymentError> {
        let (grant, sender) = self.claim(id, value).await?;

        let result = self
            .run_leg(&grant, &sender, receiver_wallet_url, value, description)
            .await;

        let mut grants = self.grants.write().await;
        let session = require_mut(&mut grants, id)?;
        session.budget.release(value);
        match result {
            Ok(leg) => {
                self.book_leg(session, receiver_wallet_url, &leg);
                self.sync_snapshot(session);
                Ok((leg, session.snapshot.clone()))
            }
            Err(e) => {
                session.snapshot.error = Some(e.to_string());
                self.sync_snapshot(session);
                Err(e)
            }
        }
    }

    /// Reserve headroom for a future payment. The scheduled time must be in
    /// the future; the reservation is released at execution or cancellation.
    pub async fn schedule_payment(
        &self,
        grant_id: &str,
        receiver_wallet_url: &str,
        value: u64,
        fire_at: DateTime<Utc>,
        recurring_interval: Option<&str>,
    ) -> Result<ScheduledPayment, PaymentError> {
        let now = self.clock.now();
        if fire_at <= now {
            return Err(PaymentError::Validation(
                "scheduled time must be in the future".to_string(),
            ));
        }
        let interval = recurring_interval.map(IsoDuration::parse).transpose()?;

        {
            let mut grants = self.grants.write().await;
            let session = require_mut(&mut grants, grant_id)?;
            if session.snapshot.phase != WalletGrantPhase::Active {
                return Err(PaymentError::InvalidState(format!(
                    "wallet grant {grant_id} is {}, not active",
                    session.snapshot.phase.as_str()
                )));
            }
            session.budget.reserve(value)?;
            self.sync_snapshot(session);
        }

        let snapshot = ScheduledPayment {
            id: format!("sched-{}", uuid::Uuid::new_v4()),
            grant_id: grant_id.to_string(),
            receiver: receiver_wallet_url.to_string(),
            amount: value,
            fire_at,
            attempts: 0,
            max_attempts: SCHEDULED_MAX_ATTEMPTS,
            recurring_interval: recurring_interval.map(str::to_string),
            phase: ScheduledPhase::Scheduled,
            error: None,
            leg: None,
            created_at: now,
            updated_at: now,
        };
        info!(scheduled = %snapshot.id, grant = %grant_id, value, "payment scheduled");
        self.scheduled.write().await.insert(
            snapshot.id.clone(),
            ScheduledRecord {
                snapshot: snapshot.clone(),
                interval,
            },
        );
        Ok(snapshot)
    }

    /// Cancel a scheduled payment and return its reservation to headroom.
    pub async fn cancel_scheduled(&self, id: &str) -> Result<ScheduledPayment, PaymentError> {
        let snapshot = {
            let mut scheduled = self.scheduled.write().await;
            let record = scheduled
                .get_mut(id)
                .ok_or_else(|| PaymentError::NotFound(format!("unknown scheduled payment {id}")))?;
            if record.snapshot.phase != ScheduledPhase::Scheduled {
                return Err(PaymentError::InvalidState(format!(
                    "scheduled payment {id} is {}, not cancellable",
                    record.snapshot.phase.as_str()
                )));
            }
            record.snapshot.phase = ScheduledPhase::Cancelled;
            record.snapshot.updated_at = self.clock.now();
            record.snapshot.clone()
        };

        let mut grants = self.grants.write().await;
        if let Ok(session) = require_mut(&mut grants, &snapshot.grant_id) {
            session.budget.release(snapshot.amount);
            self.sync_snapshot(session);
        }
        Ok(snapshot)
    }

    /// Execute every scheduled payment whose time has come. Failed attempts
    /// re-reserve and reschedule with a fixed delay up to the attempt cap;
    /// recurring schedules chain their successor on success.
    pub async fn execute_due(&self) -> Vec<ScheduledPayment> {
        let now = self.clock.now();
        let due: Vec<String> = {
            let scheduled = self.scheduled.read().await;
            scheduled
                .values()
                .filter(|r| {
                    r.snapshot.phase == ScheduledPhase::Scheduled && r.snapshot.fire_at <= now
                })
                .map(|r| r.snapshot.id.clone())
                .collect()
        };

        let mut processed = Vec::with_capacity(due.len());
        for id in due {
            if let Some(snapshot) = self.execute_scheduled(&id).await {
                processed.push(snapshot);
            }
        }
        processed
    }

    /// Cancel outstanding scheduled payments, then revoke the grant remotely
    /// and locally.
    pub async fn revoke(&self, id: &str) -> Result<WalletGrant, PaymentError> {
        let pending: Vec<String> = {
            let scheduled = self.scheduled.read().await;
            scheduled
                .values()
                .filter(|r| {
                    r.snapshot.grant_id == id && r.snapshot.phase == ScheduledPhase::Scheduled
                })
                .map(|r| r.snapshot.id.clone())
                .collect()
        };
        for sched_id in pending {
            let _ = self.cancel_scheduled(&sched_id).await;
        }

        let mut grant = {
            let grants = self.grants.read().await;
            let session = require(&grants, id)?;
            if matches!(
                session.snapshot.phase,
                WalletGrantPhase::Revoked | WalletGrantPhase::Failed
            ) {
                return Err(PaymentError::InvalidState(format!(
                    "wallet grant {id} is already {}",
                    session.snapshot.phase.as_str()
                )));
            }
            session.grant.clone()
        };
        if grant.finalized().is_some() {
            self.auth.revoke(&mut grant).await?;
        }

        let mut grants = self.grants.write().await;
        let session = require_mut(&mut grants, id)?;
        session.grant = grant;
        session.snapshot.phase = WalletGrantPhase::Revoked;
        session.snapshot.updated_at = self.clock.now();
        info!(grant = %id, "wallet grant revoked");
        Ok(session.snapshot.clone())
    }

    pub async fn status(&self, id: &str) -> Result<WalletGrant, PaymentError> {
        let grants = self.grants.read().await;
        Ok(require(&grants, id)?.snapshot.clone())
    }

    pub async fn history(&self, id: &str) -> Result<Vec<GrantPaymentRecord>, PaymentError> {
        let grants = self.grants.read().await;
        Ok(require(&grants, id)?.history.clone())
    }

    pub async fn list_scheduled(&self, grant_id: Option<&str>) -> Vec<ScheduledPayment> {
        self.scheduled
            .read()
            .await
            .values()
            .filter(|r| grant_id.map_or(true, |g| r.snapshot.grant_id == g))
            .map(|r| r.snapshot.clone())
            .collect()
    }

    pub async fn list_active(&self) -> Vec<WalletGrant> {
        self.grants
            .read()
            .await
            .values()
            .filter(|s| s.snapshot.phase == WalletGrantPhase::Active)
            .map(|s| s.snapshot.clone())
            .collect()
    }

    /// Global monitor over all scheduled payments. The returned handle is
    /// aborted on shutdown.
    pub fn start_monitor(self: Arc<Self>, period: StdDuration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let processed = self.execute_due().await;
                if !processed.is_empty() {
                    info!(count = processed.len(), "scheduled payments processed");
                }
            }
        })
    }

    // ------------------------------------------------------------------

    /// Reserve `value` and clone out what a leg needs, under one lock.
    async fn claim(
        &self,
        id: &str,
        value: u64,
    ) -> Result<(common::FinalizedGrant, WalletAddress), PaymentError> {
        let mut grants = self.grants.write().await;
        let session = require_mut(&mut grants, id)?;
        match session.snapshot.phase {
            WalletGrantPhase::Active => {}
            WalletGrantPhase::Exhausted => {
                return Err(PaymentError::BudgetExceeded(format!(
                    "wallet grant {id} is exhausted"
                )))
            }
            other => {
                return Err(PaymentError::InvalidState(format!(
                    "wallet grant {id} is {}, not active",
                    other.as_str()
                )))
            }
        }
        session.budget.reserve(value)?;
        self.sync_snapshot(session);
        let grant = session.grant.require_finalized()?.clone();
        Ok((grant, session.sender.clone()))
    }

    async fn run_leg(
        &self,
        grant: &common::FinalizedGrant,
        sender: &WalletAddress,
        receiver_url: &str,
        value: u64,
        description: Option<&str>,
    ) -> Result<PaymentLeg, PaymentError> {
        let receiver = self.wallets.resolve(self.api.as_ref(), receiver_url).await?;
        self.choreographer
            .execute(sender, grant, &receiver, value, description)
            .await
    }

    fn book_leg(&self, session: &mut GrantSession, receiver: &str, leg: &PaymentLeg) {
        if session.budget.book(leg.debited.value) {
            warn!(
                grant = %session.snapshot.id,
                debit = leg.debited.value,
                "actual debit exceeded remaining allowance, booked clamped"
            );
        }
        session.history.push(GrantPaymentRecord {
            executed_at: self.clock.now(),
            receiver: receiver.to_string(),
            leg: leg.clone(),
        });
        session.snapshot.error = None;
    }

    fn sync_snapshot(&self, session: &mut GrantSession) {
        session.snapshot.used = session.budget.used();
        session.snapshot.reserved = session.budget.reserved();
        if session.snapshot.phase == WalletGrantPhase::Active && session.budget.exhausted() {
            info!(grant = %session.snapshot.id, "wallet grant exhausted");
            session.snapshot.phase = WalletGrantPhase::Exhausted;
        }
        session.snapshot.updated_at = self.clock.now();
    }

    /// One scheduled payment: release its reservation, attempt the leg,
    /// book or reschedule.
    async fn execute_scheduled(&self, id: &str) -> Option<ScheduledPayment> {
        let now = self.clock.now();
        let (grant_id, receiver, amount, interval, fire_at) = {
            let mut scheduled = self.scheduled.write().await;
            let record = scheduled.get_mut(id)?;
            if record.snapshot.phase != ScheduledPhase::Scheduled {
                return None;
            }
            record.snapshot.phase = ScheduledPhase::Executing;
            record.snapshot.updated_at = now;
            (
                record.snapshot.grant_id.clone(),
                record.snapshot.receiver.clone(),
                record.snapshot.amount,
                record.interval,
                record.snapshot.fire_at,
            )
        };

        // The reservation becomes live spend (or is re-taken on retry).
        let claim = {
            let mut grants = self.grants.write().await;
            match require_mut(&mut grants, &grant_id) {
                Ok(session) if session.snapshot.phase == WalletGrantPhase::Active => {
                    session.budget.release(amount);
                    self.sync_snapshot(session);
                    session
                        .grant
                        .require_finalized()
                        .map(|g| (g.clone(), session.sender.clone()))
                }
                Ok(session) => {
                    session.budget.release(amount);
                    self.sync_snapshot(session);
                    Err(PaymentError::InvalidState(format!(
                        "wallet grant {grant_id} is {}",
                        session.snapshot.phase.as_str()
                    )))
                }
                Err(e) => Err(e),
            }
        };

        let result = match claim {
            Ok((grant, sender)) => {
                self.run_leg(&grant, &sender, &receiver, amount, None).await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(leg) => {
                {
                    let mut grants = self.grants.write().await;
                    if let Ok(session) = require_mut(&mut grants, &grant_id) {
                        self.book_leg(session, &receiver, &leg);
                        self.sync_snapshot(session);
                    }
                }
                let successor_error = if interval.is_some() {
                    self.chain_successor(&grant_id, &receiver, amount, interval, fire_at)
                        .await
                        .err()
                } else {
                    None
                };
                let mut scheduled = self.scheduled.write().await;
                let record = scheduled.get_mut(id)?;
                record.snapshot.phase = ScheduledPhase::Completed;
                record.snapshot.attempts += 1;
                record.snapshot.leg = Some(leg);
                record.snapshot.error = successor_error.map(|e| format!("successor not scheduled: {e}"));
                record.snapshot.updated_at = self.clock.now();
                info!(scheduled = %id, "scheduled payment completed");
                Some(record.snapshot.clone())
            }
            Err(e) => {
                let retryable = {
                    let mut grants = self.grants.write().await;
                    match require_mut(&mut grants, &grant_id) {
                        Ok(session) => {
                            let ok = session.budget.reserve(amount).is_ok();
                            self.sync_snapshot(session);
                            ok
                        }
                        Err(_) => false,
                    }
                };
                let mut scheduled = self.scheduled.write().await;
                let record = scheduled.get_mut(id)?;
                record.snapshot.attempts += 1;
                record.snapshot.error = Some(e.to_string());
                record.snapshot.updated_at = self.clock.now();
                if retryable && record.snapshot.attempts < record.snapshot.max_attempts {
                    record.snapshot.phase = ScheduledPhase::Scheduled;
                    record.snapshot.fire_at = self.clock.now() + retry_delay();
                    warn!(
                        scheduled = %id,
                        attempt = record.snapshot.attempts,
                        "scheduled payment failed, rescheduled"
                    );
                } else {
                    // Retries are over; give the reservation back.
                    if retryable {
                        let mut grants = self.grants.write().await;
                        if let Ok(session) = require_mut(&mut grants, &grant_id) {
                            session.budget.release(amount);
                            self.sync_snapshot(session);
                        }
                    }
                    record.snapshot.phase = ScheduledPhase::Failed;
                    warn!(scheduled = %id, "scheduled payment failed permanently");
                }
                Some(record.snapshot.clone())
            }
        }
    }

    /// A successful recurring scheduled payment schedules its successor one
    /// interval after its own fire time, with a fresh reservation.
    async fn chain_successor(
        &self,
        grant_id: &str,
        receiver: &str,
        amount: u64,
        interval: Option<IsoDuration>,
        fire_at: DateTime<Utc>,
    ) -> Result<(), PaymentError> {
        let interval = match interval {
            Some(interval) => interval,
            None => return Ok(()),
        };
        let next_fire = interval.add_to(fire_at)?;
        let interval_text = interval.to_string();
        self.schedule_payment(grant_id, receiver, amount, next_fire, Some(&interval_text))
            .await?;
        Ok(())
    }
}

fn require<'a>(
    grants: &'a HashMap<String, GrantSession>,
    id: &str,
) -> Result<&'a GrantSession, PaymentError> {
    grants
        .get(id)
        .ok_or_else(|| PaymentError::NotFound(format!("unknown wallet grant {id}")))
}

fn require_mut<'a>(
    grants: &'a mut HashMap<String, GrantSession>,
    id: &str,
) -> Result<&'a mut GrantSession, PaymentError> {
    grants
        .get_mut(id)
        .ok_or_else(|| PaymentError::NotFound(format!("unknown wallet grant {id}")))
}

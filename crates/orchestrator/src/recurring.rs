//! Recurring payment series.
//!
//! One long-lived grant covers the whole series: its ceiling is the total
//! budget and its limits carry the ISO-8601 interval so the authorization
//! server knows the cadence. Each cycle runs one settlement leg; spent grows
//! by the quote's actual debit, never the requested amount. A per-series
//! monitor executes due cycles and self-disables after three consecutive
//! failures.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use client::{PaymentsApi, WalletCache};
use common::{Clock, InteractiveGrant, IsoDuration, PaymentError, WalletAddress};

use crate::auth::{AuthController, GrantLimits};
use crate::settlement::{Choreographer, PaymentLeg};

/// Consecutive execution failures before the series disables itself.
pub const MAX_CONSECUTIVE_ERRORS: u32 = 3;
pub const DEFAULT_MONITOR_PERIOD: StdDuration = StdDuration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurringPhase {
    AuthorizationPending,
    Active,
    Paused,
    Completed,
    Failed,
    Cancelled,
    Error,
}

impl RecurringPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurringPhase::AuthorizationPending => "authorization_pending",
            RecurringPhase::Active => "active",
            RecurringPhase::Paused => "paused",
            RecurringPhase::Completed => "completed",
            RecurringPhase::Failed => "failed",
            RecurringPhase::Cancelled => "cancelled",
            RecurringPhase::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RecurringPhase::Completed
                | RecurringPhase::Failed
                | RecurringPhase::Cancelled
                | RecurringPhase::Error
        )
    }
}

#[derive(Debug, Clone)]
pub struct RecurringRequest {
    pub sender_wallet_url: String,
    pub receiver_wallet_url: String,
    /// Minor units per cycle.
    pub amount: u64,
    /// Minor units across the whole series; the grant ceiling.
    pub total_budget: u64,
    /// ISO-8601 duration between cycles, e.g. `P1M`.
    pub interval: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub max_payments: Option<u32>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleRecord {
    pub cycle: u32,
    pub executed_at: DateTime<Utc>,
    pub leg: PaymentLeg,
}

/// Caller-facing snapshot of a recurring series.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringPayment {
    pub id: String,
    pub sender: String,
    pub receiver: String,
    /// Minor units per cycle.
    pub amount: u64,
    pub total_budget: u64,
    /// Actual debits booked so far.
    pub spent: u64,
    pub interval: String,
    pub cycles: u32,
    pub next_payment_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_payments: Option<u32>,
    pub consecutive_errors: u32,
    pub phase: RecurringPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

struct Session {
    payment: RecurringPayment,
    grant: InteractiveGrant,
    nonce: String,
    sender: WalletAddress,
    receiver: WalletAddress,
    interval: IsoDuration,
    history: Vec<CycleRecord>,
    monitor: Option<JoinHandle<()>>,
    /// Resume restarts the monitor when it was running before pause.
    auto: bool,
    in_flight: bool,
}

pub struct RecurringOrchestrator {
    api: Arc<dyn PaymentsApi>,
    auth: AuthController,
    choreographer: Choreographer,
    wallets: Arc<WalletCache>,
    clock: Arc<dyn Clock>,
    callback_base: String,
    sessions: RwLock<HashMap<String, Session>>,
}

impl RecurringOrchestrator {
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

    /// Validate the series and request the interactive grant. The ceiling is
    /// the total budget, with the interval in the grant limits.
    pub async fn create(&self, request: RecurringRequest) -> Result<RecurringPayment, PaymentError> {
        let now = self.clock.now();
        if request.amount == 0 {
            return Err(PaymentError::Validation(
                "per-cycle amount must be positive".to_string(),
            ));
        }
        if request.amount > request.total_budget {
            return Err(PaymentError::Validation(format!(
                "per-cycle amount {} exceeds total budget {}",
                request.amount, request.total_budget
            )));
        }
        let interval = IsoDuration::parse(&request.interval)?;
        if interval.is_zero() {
            return Err(PaymentError::Validation(
                "interval must be a non-zero duration".to_string(),
            ));
        }
        let start = request.start_date.unwrap_or(now);
        if start < now {
            return Err(PaymentError::Validation(
                "start date may not be in the past".to_string(),
            ));
        }
        if let Some(end) = request.end_date {
            if end <= start {
                return Err(PaymentError::Validation(
                    "end date must follow the start date".to_string(),
                ));
            }
        }

        let sender = self
            .wallets
            .resolve(self.api.as_ref(), &request.sender_wallet_url)
            .await?;
        let receiver = self
            .wallets
            .resolve(self.api.as_ref(), &request.receiver_wallet_url)
            .await?;

        let id = format!("rec-{}", uuid::Uuid::new_v4());
        let finish_uri = format!("{}/recurring-payments/{}/callback", self.callback_base, id);
        let limits = GrantLimits {
            debit_amount: sender.amount(request.total_budget),
            interval: Some(format!(
                "R/{}/{}",
                start.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
                request.interval
            )),
        };
        let flow = self.auth.initiate(&sender, limits, &finish_uri, None).await?;

        let payment = RecurringPayment {
            id: id.clone(),
            sender: sender.id.clone(),
            receiver: receiver.id.clone(),
            amount: request.amount,
            total_budget: request.total_budget,
            spent: 0,
            interval: request.interval,
            cycles: 0,
            next_payment_at: start,
            end_date: request.end_date,
            max_payments: request.max_payments,
            consecutive_errors: 0,
            phase: RecurringPhase::AuthorizationPending,
            redirect_url: Some(flow.redirect_url.clone()),
            error: None,
            description: request.description,
            created_at: now,
            updated_at: now,
        };
        info!(series = %id, budget = payment.total_budget, "recurring payment created");

        self.sessions.write().await.insert(
            id,
            Session {
                payment: payment.clone(),
                grant: flow.grant,
                nonce: flow.nonce,
                sender,
                receiver,
                interval,
                history: Vec::new(),
                monitor: None,
                auto: false,
                in_flight: false,
            },
        );
        Ok(payment)
    }

    /// Finalize the grant and activate the series.
    pub async fn complete_authorization(
        &self,
        id: &str,
        interact_ref: &str,
        callback_hash: Option<&str>,
    ) -> Result<RecurringPayment, PaymentError> {
        let mut grant = {
            let sessions = self.sessions.read().await;
            let session = require(&sessions, id)?;
            if session.payment.phase != RecurringPhase::AuthorizationPending {
                return Err(PaymentError::InvalidState(format!(
                    "series {id} is {}, not awaiting authorization",
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
        let session = require_mut(&mut sessions, id)?;
        session.grant = grant;
        session.payment.updated_at = self.clock.now();
        match result {
            Ok(_) => {
                session.payment.phase = RecurringPhase::Active;
                session.payment.redirect_url = None;
                info!(series = %id, "recurring payment active");
                Ok(session.payment.clone())
            }
            Err(e) => {
                session.payment.phase = RecurringPhase::Failed;
                session.payment.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Run one cycle. Gates: active, due (unless forced), budget headroom,
    /// cycle count, end date. Spent grows by the quote's actual debit.
    pub async fn execute(&self, id: &str, force: bool) -> Result<RecurringPayment, PaymentError> {
        let now = self.clock.now();
        let (grant, sender, receiver, amount, description) = {
            let mut sessions = self.sessions.write().await;
            let session = require_mut(&mut sessions, id)?;
            if session.payment.phase != RecurringPhase::Active {
                return Err(PaymentError::InvalidState(format!(
                    "series {id} is {}, not active",
                    session.payment.phase.as_str()
                )));
            }
            if session.in_flight {
                return Err(PaymentError::InvalidState(format!(
                    "series {id} already has a cycle in flight"
                )));
            }
            if !force && now < session.payment.next_payment_at {
                return Err(PaymentError::InvalidState(format!(
                    "series {id} is not due until {}",
                    session.payment.next_payment_at
                )));
            }
            if let Some(reason) = limit_reached(&session.payment, now) {
                session.payment.phase = RecurringPhase::Completed;
                session.payment.updated_at = now;
                abort_monitor(session);
                return Err(PaymentError::InvalidState(format!(
                    "series {id} is complete: {reason}"
                )));
            }
            let grant = session.grant.require_finalized()?.clone();
            session.in_flight = true;
            (
                grant,
                session.sender.clone(),
                session.receiver.clone(),
                session.payment.amount,
                session.payment.description.clone(),
            )
        };

        let result = self
            .choreographer
            .execute(&sender, &grant, &receiver, amount, description.as_deref())
            .await;

        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;
        let session = require_mut(&mut sessions, id)?;
        session.in_flight = false;
        session.payment.updated_at = now;
        match result {
            Ok(leg) => {
                session.payment.spent += leg.debited.value;
                session.payment.cycles += 1;
                session.payment.consecutive_errors = 0;
                session.payment.error = None;
                session.payment.next_payment_at = session.interval.add_to(now)?;
                session.history.push(CycleRecord {
                    cycle: session.payment.cycles,
                    executed_at: now,
                    leg,
                });
                if let Some(reason) = limit_reached(&session.payment, now) {
                    info!(series = %id, reason, "recurring payment completed");
                    session.payment.phase = RecurringPhase::Completed;
                    abort_monitor(session);
                }
                Ok(session.payment.clone())
            }
            Err(e) => {
                session.payment.consecutive_errors += 1;
                session.payment.error = Some(e.to_string());
                if session.payment.consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                    warn!(series = %id, "recurring payment disabled after repeated failures");
                    session.payment.phase = RecurringPhase::Error;
                    abort_monitor(session);
                }
                Err(e)
            }
        }
    }

    /// Poll the series on a fixed period and execute when due. The task
    /// exits once the series reaches a terminal phase.
    pub async fn start_automatic_execution(
        self: Arc<Self>,
        id: &str,
        period: StdDuration,
    ) -> Result<(), PaymentError> {
        {
            let sessions = self.sessions.read().await;
            let session = require(&sessions, id)?;
            if session.payment.phase.is_terminal() {
                return Err(PaymentError::InvalidState(format!(
                    "series {id} is {}",
                    session.payment.phase.as_str()
                )));
            }
        }
        let orchestrator = self.clone();
        let series_id = id.to_string();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let phase = match orchestrator.status(&series_id).await {
                    Ok(snapshot) => snapshot.phase,
                    Err(_) => break,
                };
                match phase {
                    RecurringPhase::Active => {
                        // Not-due and completion outcomes are ordinary here;
                        // leg failures are already tracked in the session.
                        let _ = orchestrator.execute(&series_id, false).await;
                    }
                    RecurringPhase::Paused | RecurringPhase::AuthorizationPending => continue,
                    _ => break,
                }
            }
        });

        let mut sessions = self.sessions.write().await;
        let session = require_mut(&mut sessions, id)?;
        abort_monitor(session);
        session.monitor = Some(handle);
        session.auto = true;
        Ok(())
    }

    pub async fn pause(&self, id: &str) -> Result<RecurringPayment, PaymentError> {
        let mut sessions = self.sessions.write().await;
        let session = require_mut(&mut sessions, id)?;
        if session.payment.phase != RecurringPhase::Active {
            return Err(PaymentError::InvalidState(format!(
                "series {id} is {}, only active series pause",
                session.payment.phase.as_str()
            )));
        }
        session.payment.phase = RecurringPhase::Paused;
        session.payment.updated_at = self.clock.now();
        abort_monitor(session);
        info!(series = %id, "recurring payment paused");
        Ok(session.payment.clone())
    }

    pub async fn resume(self: Arc<Self>, id: &str) -> Result<RecurringPayment, PaymentError> {
        let (snapshot, auto) = {
            let mut sessions = self.sessions.write().await;
            let session = require_mut(&mut sessions, id)?;
            if session.payment.phase != RecurringPhase::Paused {
                return Err(PaymentError::InvalidState(format!(
                    "series {id} is {}, only paused series resume",
                    session.payment.phase.as_str()
                )));
            }
            session.payment.phase = RecurringPhase::Active;
            session.payment.updated_at = self.clock.now();
            (session.payment.clone(), session.auto)
        };
        if auto {
            self.start_automatic_execution(id, DEFAULT_MONITOR_PERIOD)
                .await?;
        }
        info!(series = %id, "recurring payment resumed");
        Ok(snapshot)
    }

    /// Stop the monitor, revoke the grant when finalized, and cancel.
    pub async fn cancel(&self, id: &str) -> Result<RecurringPayment, PaymentError> {
        let mut grant = {
            let mut sessions = self.sessions.write().await;
            let session = require_mut(&mut sessions, id)?;
            if session.payment.phase.is_terminal() {
                return Err(PaymentError::InvalidState(format!(
                    "series {id} is already {}",
                    session.payment.phase.as_str()
                )));
            }
            abort_monitor(session);
            session.grant.clone()
        };

        if grant.finalized().is_some() {
            self.auth.revoke(&mut grant).await?;
        }

        let mut sessions = self.sessions.write().await;
        let session = require_mut(&mut sessions, id)?;
        session.grant = grant;
        session.payment.phase = RecurringPhase::Cancelled;
        session.payment.updated_at = self.clock.now();
        info!(series = %id, "recurring payment cancelled");
        Ok(session.payment.clone())
    }

    pub async fn status(&self, id: &str) -> Result<RecurringPayment, PaymentError> {
        let sessions = self.sessions.read().await;
        Ok(require(&sessions, id)?.payment.clone())
    }

    pub async fn list(&self, phase: Option<RecurringPhase>) -> Vec<RecurringPayment> {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| phase.map_or(true, |p| s.payment.phase == p))
            .map(|s| s.payment.clone())
            .collect()
    }

    /// The most recent `limit` cycle records, newest last.
    pub async fn history(&self, id: &str, limit: usize) -> Result<Vec<CycleRecord>, PaymentError> {
        let sessions = self.sessions.read().await;
        let session = require(&sessions, id)?;
        let skip = session.history.len().saturating_sub(limit);
        Ok(session.history[skip..].to_vec())
    }
}

fn require<'a>(
    sessions: &'a HashMap<String, Session>,
    id: &str,
) -> Result<&'a Session, PaymentError> {
    sessions
        .get(id)
        .ok_or_else(|| PaymentError::NotFound(format!("unknown recurring payment {id}")))
}

fn require_mut<'a>(
    sessions: &'a mut HashMap<String, Session>,
    id: &str,
) -> Result<&'a mut Session, PaymentError> {
    sessions
        .get_mut(id)
        .ok_or_else(|| PaymentError::NotFound(format!("unknown recurring payment {id}")))
}

fn abort_monitor(session: &mut Session) {
    if let Some(handle) = session.monitor.take() {
        handle.abort();
    }
}

/// The first exhausted limit, if any.
fn limit_reached(payment: &RecurringPayment, now: DateTime<Utc>) -> Option<&'static str> {
    if payment.spent + payment.amount > payment.total_budget {
        return Some("budget exhausted");
    }
    if payment.max_payments.is_some_and(|max| payment.cycles >= max) {
        return Some("cycle limit reached");
    }
    if payment.end_date.is_some_and(|end| now > end) {
        return Some("end date passed");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockApi;
    use common::ManualClock;

    fn request(amount: u64, budget: u64, interval: &str) -> RecurringRequest {
        RecurringRequest {
            sender_wallet_url: "https://ilp.example.com/alice".to_string(),
            receiver_wallet_url: "https://ilp.example.com/bob".to_string(),
            amount,
            total_budget: budget,
            interval: interval.to_string(),
            start_date: None,
            end_date: None,
            max_payments: None,
            description: None,
        }
    }

    fn setup() -> (Arc<MockApi>, Arc<ManualClock>, RecurringOrchestrator) {
        let api = Arc::new(MockApi::new());
        api.add_wallet("https://ilp.example.com/alice", "USD", 2);
        api.add_wallet("https://ilp.example.com/bob", "USD", 2);
        let clock = Arc::new(ManualClock::at("2026-06-01T00:00:00Z".parse().unwrap()));
        let orch = RecurringOrchestrator::new(
            api.clone(),
            Arc::new(WalletCache::new()),
            clock.clone(),
            "https://engine.example.com".to_string(),
        );
        (api, clock, orch)
    }

    #[tokio::test(start_paused = true)]
    async fn test_validation_rejections() {
        let (_, _, orch) = setup();
        assert!(orch.create(request(0, 750, "P1D")).await.is_err());
        assert!(orch.create(request(800, 750, "P1D")).await.is_err());
        assert!(orch.create(request(150, 750, "yearly")).await.is_err());

        let mut past = request(150, 750, "P1D");
        past.start_date = Some("2026-01-01T00:00:00Z".parse().unwrap());
        assert!(orch.create(past).await.is_err());

        let mut bad_end = request(150, 750, "P1D");
        bad_end.start_date = Some("2026-07-01T00:00:00Z".parse().unwrap());
        bad_end.end_date = Some("2026-06-15T00:00:00Z".parse().unwrap());
        assert!(orch.create(bad_end).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_exhaustion_completes_on_fifth_cycle() {
        let (_, _, orch) = setup();
        let created = orch.create(request(150, 750, "P1D")).await.unwrap();
        orch.complete_authorization(&created.id, "ref", None)
            .await
            .unwrap();

        for cycle in 1..=4u32 {
            let snapshot = orch.execute(&created.id, true).await.unwrap();
            assert_eq!(snapshot.cycles, cycle);
            assert_eq!(snapshot.phase, RecurringPhase::Active);
        }
        let fifth = orch.execute(&created.id, true).await.unwrap();
        assert_eq!(fifth.cycles, 5);
        assert_eq!(fifth.spent, 750);
        assert_eq!(fifth.phase, RecurringPhase::Completed);

        assert!(matches!(
            orch.execute(&created.id, true).await,
            Err(PaymentError::InvalidState(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spent_tracks_actual_quote_debit() {
        let (api, _, orch) = setup();
        api.set_quote_markup(10);
        let created = orch.create(request(150, 750, "P1D")).await.unwrap();
        orch.complete_authorization(&created.id, "ref", None)
            .await
            .unwrap();

        let snapshot = orch.execute(&created.id, true).await.unwrap();
        assert_eq!(snapshot.spent, 160);
    }

    #[tokio::test(start_paused = true)]
    async fn test_due_gate_and_interval_advance() {
        let (_, clock, orch) = setup();
        let created = orch.create(request(100, 1000, "P1D")).await.unwrap();
        orch.complete_authorization(&created.id, "ref", None)
            .await
            .unwrap();

        // Due immediately (start defaulted to now).
        let first = orch.execute(&created.id, false).await.unwrap();
        assert_eq!(
            first.next_payment_at,
            clock.now() + chrono::Duration::days(1)
        );

        // Not due yet.
        assert!(matches!(
            orch.execute(&created.id, false).await,
            Err(PaymentError::InvalidState(_))
        ));

        clock.advance(chrono::Duration::days(1));
        assert!(orch.execute(&created.id, false).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_consecutive_failures_disable_series() {
        let (api, _, orch) = setup();
        let created = orch.create(request(100, 1000, "P1D")).await.unwrap();
        orch.complete_authorization(&created.id, "ref", None)
            .await
            .unwrap();
        api.fail_outgoing_to("https://ilp.example.com/bob", 3);

        for _ in 0..2 {
            assert!(orch.execute(&created.id, true).await.is_err());
            let status = orch.status(&created.id).await.unwrap();
            assert_eq!(status.phase, RecurringPhase::Active);
        }
        assert!(orch.execute(&created.id, true).await.is_err());
        let status = orch.status(&created.id).await.unwrap();
        assert_eq!(status.phase, RecurringPhase::Error);
        assert_eq!(status.consecutive_errors, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_consecutive_errors() {
        let (api, _, orch) = setup();
        let created = orch.create(request(100, 1000, "P1D")).await.unwrap();
        orch.complete_authorization(&created.id, "ref", None)
            .await
            .unwrap();
        api.fail_outgoing_to("https://ilp.example.com/bob", 2);

        assert!(orch.execute(&created.id, true).await.is_err());
        assert!(orch.execute(&created.id, true).await.is_err());
        let recovered = orch.execute(&created.id, true).await.unwrap();
        assert_eq!(recovered.consecutive_errors, 0);
        assert_eq!(recovered.phase, RecurringPhase::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_resume_and_cancel() {
        let (api, _, orch) = setup();
        let orch = Arc::new(orch);
        let created = orch.create(request(100, 1000, "P1D")).await.unwrap();
        orch.complete_authorization(&created.id, "ref", None)
            .await
            .unwrap();

        let paused = orch.pause(&created.id).await.unwrap();
        assert_eq!(paused.phase, RecurringPhase::Paused);
        assert!(matches!(
            orch.execute(&created.id, true).await,
            Err(PaymentError::InvalidState(_))
        ));

        let resumed = orch.clone().resume(&created.id).await.unwrap();
        assert_eq!(resumed.phase, RecurringPhase::Active);

        let cancelled = orch.cancel(&created.id).await.unwrap();
        assert_eq!(cancelled.phase, RecurringPhase::Cancelled);
        assert_eq!(api.revoke_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_returns_recent_cycles() {
        let (_, _, orch) = setup();
        let created = orch.create(request(100, 1000, "P1D")).await.unwrap();
        orch.complete_authorization(&created.id, "ref", None)
            .await
            .unwrap();
        for _ in 0..3 {
            orch.execute(&created.id, true).await.unwrap();
        }
        let recent = orch.history(&created.id, 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].cycle, 2);
        assert_eq!(recent[1].cycle, 3);
    }
}

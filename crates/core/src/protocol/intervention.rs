use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use super::notifier::{build_notice, CrisisNotifier, NotifyError};
use super::state_machine::{next_state, plan_for};
use super::store::StateStore;
use crate::audit::{AuditEvent, AuditSink};
use crate::config::VeluriaCfg;
use crate::types::{InterventionRecord, ProtocolContext, SafetyStatus, VeluriaState};

pub const NOTIFICATION_SENT: &str = "crisis_team_notification_sent";
pub const NOTIFICATION_FAILED: &str = "crisis_team_notification_failed";
const MANUAL_TRIGGER: &str = "manual_intervention";
const MANUAL_ACTION: &str = "manual_intervention_recorded";
const MANUAL_RISK_SCORE: f32 = 1.0;

/// Per-user hysteretic intervention protocol.
pub struct InterventionProtocol {
    store: Arc<StateStore>,
    notifier: Option<Arc<dyn CrisisNotifier>>,
    cfg: Arc<VeluriaCfg>,
    audit: Arc<dyn AuditSink>,
}

impl InterventionProtocol {
    pub fn new(
        store: Arc<StateStore>,
        notifier: Option<Arc<dyn CrisisNotifier>>,
        cfg: Arc<VeluriaCfg>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self { store, notifier, cfg, audit }
    }

    /// Apply one evaluation to the user's state and dispatch the actions of
    /// the resulting state. Always returns a record; notifier trouble shows
    /// up only as an action tag.
    pub async fn execute_protocol(
        &self,
        user_id: &str,
        status: &SafetyStatus,
        context: Option<&ProtocolContext>,
    ) -> InterventionRecord {
        let slot = self.store.slot(user_id);
        // held through the notifier call so the next evaluation for this user
        // sees a completed transition
        let mut ledger = slot.lock().await;

        let before = ledger.state();
        let after = next_state(before, status.level);
        let plan = plan_for(after);

        let record_id = Uuid::new_v4();
        let mut record = InterventionRecord {
            id: record_id,
            user_id: user_id.to_owned(),
            timestamp: Utc::now(),
            level: after.as_u8(),
            triggers: status.triggers.clone(),
            risk_score: status.risk_score,
            actions_taken: plan.actions.iter().map(|a| (*a).to_owned()).collect(),
            resources_provided: plan.resources.iter().map(|r| (*r).to_owned()).collect(),
            state_before: before,
            state_after: after,
            intervener_id: None,
            outcome: None,
            notes: None,
        };
        // persisted before dispatch: a caller that stops waiting on the
        // notifier still leaves the transition and its record behind
        ledger.append(record.clone());

        let mut delivered = None;
        if after == VeluriaState::Level3 {
            let ok = self.notify(user_id, record_id, status, context).await;
            let tag = if ok { NOTIFICATION_SENT } else { NOTIFICATION_FAILED };
            if let Some(updated) = ledger.tag_action(record_id, tag) {
                record = updated.clone();
            }
            delivered = Some(ok);
        }
        drop(ledger);

        self.audit.record(&AuditEvent::StateTransition {
            user_id: user_id.to_owned(),
            record_id,
            before,
            after,
            requested_level: status.level,
        });
        if let Some(delivered) = delivered {
            self.audit.record(&AuditEvent::CrisisNotification { user_id: user_id.to_owned(), record_id, delivered });
        }

        record
    }

    /// Single attempt, bounded by `notifier_timeout_ms`. Runs on its own task
    /// so a panicking notifier is contained like any other failure.
    async fn notify(
        &self,
        user_id: &str,
        record_id: Uuid,
        status: &SafetyStatus,
        context: Option<&ProtocolContext>,
    ) -> bool {
        let Some(notifier) = self.notifier.clone() else {
            tracing::error!(user_id, %record_id, "level 3 reached with no crisis notifier configured");
            return false;
        };

        let notice = build_notice(user_id, status, context);
        let timeout_ms = self.cfg.notifier_timeout_ms;
        let mut task = tokio::spawn(async move { notifier.notify(&notice).await });

        let outcome = match tokio::time::timeout(Duration::from_millis(timeout_ms), &mut task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(NotifyError::Aborted(join_err.to_string())),
            Err(_) => {
                task.abort();
                Err(NotifyError::Timeout(timeout_ms))
            }
        };

        match outcome {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(user_id, %record_id, error = %e, "crisis notification failed");
                false
            }
        }
    }

    /// Human responder override: state becomes MONITORING whatever it was.
    /// `notes` are stored on the record and never logged.
    pub async fn record_manual_intervention(
        &self,
        user_id: &str,
        intervener_id: &str,
        notes: &str,
        outcome: &str,
    ) -> InterventionRecord {
        let slot = self.store.slot(user_id);
        let mut ledger = slot.lock().await;

        let record = InterventionRecord {
            id: Uuid::new_v4(),
            user_id: user_id.to_owned(),
            timestamp: Utc::now(),
            level: VeluriaState::Monitoring.as_u8(),
            triggers: vec![MANUAL_TRIGGER.to_owned()],
            risk_score: MANUAL_RISK_SCORE,
            actions_taken: vec![MANUAL_ACTION.to_owned()],
            resources_provided: Vec::new(),
            state_before: ledger.state(),
            state_after: VeluriaState::Monitoring,
            intervener_id: Some(intervener_id.to_owned()),
            outcome: Some(outcome.to_owned()),
            notes: (!notes.is_empty()).then(|| notes.to_owned()),
        };
        ledger.append(record.clone());
        drop(ledger);

        self.audit.record(&AuditEvent::ManualIntervention {
            user_id: user_id.to_owned(),
            record_id: record.id,
            intervener_id: intervener_id.to_owned(),
        });
        record
    }

    /// Current state; SAFE for users never seen.
    pub async fn get_user_state(&self, user_id: &str) -> VeluriaState {
        match self.store.existing(user_id) {
            Some(slot) => slot.lock().await.state(),
            None => VeluriaState::Safe,
        }
    }

    /// Snapshot of the user's records, oldest first.
    pub async fn get_intervention_history(&self, user_id: &str) -> Vec<InterventionRecord> {
        match self.store.existing(user_id) {
            Some(slot) => slot.lock().await.history().to_vec(),
            None => Vec::new(),
        }
    }

    /// Operational recovery: force SAFE outside the clinical transition rules.
    /// Returns the state that was replaced. History is kept.
    pub async fn reset_user_state(&self, user_id: &str) -> VeluriaState {
        let previous = match self.store.existing(user_id) {
            Some(slot) => slot.lock().await.force_state(VeluriaState::Safe),
            None => VeluriaState::Safe,
        };
        self.audit.record(&AuditEvent::StateReset { user_id: user_id.to_owned(), previous });
        previous
    }
}

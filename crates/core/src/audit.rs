//! Audit events emitted by the core.
//!
//! Events carry only non-identifying metadata: ids, tags, levels, scores.
//! Raw text, manual-intervention notes and free-form context never appear here.

use std::sync::Mutex;

use serde::Serialize;
use uuid::Uuid;

use crate::types::{Archetype, MappingSource, RiskLevel, VeluriaState};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    MappingExtracted {
        source: MappingSource,
        archetype: Archetype,
        confidence: f32,
    },
    RiskEvaluated {
        level: RiskLevel,
        risk_score: f32,
        trigger_count: usize,
    },
    StateTransition {
        user_id: String,
        record_id: Uuid,
        before: VeluriaState,
        after: VeluriaState,
        requested_level: RiskLevel,
    },
    CrisisNotification {
        user_id: String,
        record_id: Uuid,
        delivered: bool,
    },
    ManualIntervention {
        user_id: String,
        record_id: Uuid,
        intervener_id: String,
    },
    StateReset {
        user_id: String,
        previous: VeluriaState,
    },
}

/// Destination for audit events. Storage and retention belong to the sink.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AuditEvent);
}

/// Writes each event as a structured `tracing` record under `veluria::audit`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &AuditEvent) {
        match event {
            AuditEvent::MappingExtracted { source, archetype, confidence } => {
                tracing::info!(
                    target: "veluria::audit",
                    source = ?source,
                    archetype = archetype.as_str(),
                    confidence,
                    "symbolic mapping extracted"
                );
            }
            AuditEvent::RiskEvaluated { level, risk_score, trigger_count } => {
                tracing::info!(
                    target: "veluria::audit",
                    level = level.as_u8(),
                    risk_score,
                    trigger_count,
                    "risk evaluated"
                );
            }
            AuditEvent::StateTransition { user_id, record_id, before, after, requested_level } => {
                tracing::info!(
                    target: "veluria::audit",
                    user_id = %user_id,
                    record_id = %record_id,
                    before = before.as_str(),
                    after = after.as_str(),
                    requested_level = requested_level.as_u8(),
                    "protocol state transition"
                );
            }
            AuditEvent::CrisisNotification { user_id, record_id, delivered } => {
                if *delivered {
                    tracing::info!(
                        target: "veluria::audit",
                        user_id = %user_id,
                        record_id = %record_id,
                        "crisis team notified"
                    );
                } else {
                    tracing::error!(
                        target: "veluria::audit",
                        user_id = %user_id,
                        record_id = %record_id,
                        "crisis team notification failed"
                    );
                }
            }
            AuditEvent::ManualIntervention { user_id, record_id, intervener_id } => {
                tracing::warn!(
                    target: "veluria::audit",
                    user_id = %user_id,
                    record_id = %record_id,
                    intervener_id = %intervener_id,
                    "manual intervention recorded"
                );
            }
            AuditEvent::StateReset { user_id, previous } => {
                tracing::warn!(
                    target: "veluria::audit",
                    user_id = %user_id,
                    previous = previous.as_str(),
                    "user state reset"
                );
            }
        }
    }
}

/// Keeps events in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: &AuditEvent) {
        // a poisoned lock only means another recorder panicked mid-push
        let mut events = match self.events.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push(event.clone());
    }
}

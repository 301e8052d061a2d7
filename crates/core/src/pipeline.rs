//! End-to-end composition: text → mapping → drift + risk → protocol.
//!
//! Owns the per-user emotional-state history that drift is measured against.
//! Everything else is borrowed from the components it wires together.

use std::sync::Arc;

use dashmap::DashMap;
use veluria_llm::provider::LlmProvider;

use crate::audit::AuditSink;
use crate::config::VeluriaCfg;
use crate::protocol::{CrisisNotifier, InterventionProtocol, StateStore};
use crate::risk::RiskEvaluator;
use crate::symbolic::{calculate_drift, SymbolicExtractor};
use crate::types::{
    Biomarkers, InterventionRecord, MappingSource, ProtocolContext, SafetyStatus, SymbolicMapping,
};

/// In-memory, bounded mapping history per user (oldest first).
#[derive(Debug)]
pub struct MappingHistory {
    entries: DashMap<String, Vec<SymbolicMapping>>,
    cap: usize,
}

impl MappingHistory {
    pub fn new(cap: usize) -> Self {
        Self { entries: DashMap::new(), cap: cap.max(1) }
    }

    /// Drift of `mapping` against the user's history, then append it.
    /// Both happen under the user's map entry, so concurrent calls for one
    /// user each see a complete history.
    pub fn record(&self, user_id: &str, mapping: SymbolicMapping) -> f32 {
        let mut entry = self.entries.entry(user_id.to_owned()).or_default();
        let drift = calculate_drift(&mapping, entry.as_slice());
        entry.push(mapping);
        if entry.len() > self.cap {
            let excess = entry.len() - self.cap;
            entry.drain(..excess);
        }
        drift
    }

    pub fn recent(&self, user_id: &str) -> Vec<SymbolicMapping> {
        self.entries.get(user_id).map(|e| e.value().clone()).unwrap_or_default()
    }

    pub fn len(&self, user_id: &str) -> usize {
        self.entries.get(user_id).map(|e| e.len()).unwrap_or(0)
    }

    pub fn clear(&self, user_id: &str) {
        self.entries.remove(user_id);
    }
}

/// One user submission.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub text: String,
    pub biomarkers: Option<Biomarkers>,
    pub context: Option<ProtocolContext>,
}

impl Submission {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Self::default() }
    }
}

/// Everything one submission produced.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub mapping: SymbolicMapping,
    pub source: MappingSource,
    pub drift: f32,
    pub status: SafetyStatus,
    pub record: InterventionRecord,
}

pub struct Pipeline {
    extractor: SymbolicExtractor,
    evaluator: RiskEvaluator,
    protocol: InterventionProtocol,
    history: MappingHistory,
}

impl Pipeline {
    pub fn new(
        extractor: SymbolicExtractor,
        evaluator: RiskEvaluator,
        protocol: InterventionProtocol,
        history: MappingHistory,
    ) -> Self {
        Self { extractor, evaluator, protocol, history }
    }

    /// Construct every component from one config, provider, notifier and sink.
    pub fn build(
        cfg: Arc<VeluriaCfg>,
        provider: Option<Arc<dyn LlmProvider>>,
        notifier: Option<Arc<dyn CrisisNotifier>>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let history = MappingHistory::new(cfg.mapping_history_cap);
        Self {
            extractor: SymbolicExtractor::new(provider, cfg.clone(), audit.clone()),
            evaluator: RiskEvaluator::new(cfg.clone(), audit.clone()),
            protocol: InterventionProtocol::new(Arc::new(StateStore::new()), notifier, cfg, audit),
            history,
        }
    }

    pub fn extractor(&self) -> &SymbolicExtractor {
        &self.extractor
    }

    pub fn evaluator(&self) -> &RiskEvaluator {
        &self.evaluator
    }

    pub fn protocol(&self) -> &InterventionProtocol {
        &self.protocol
    }

    pub fn history(&self) -> &MappingHistory {
        &self.history
    }

    pub async fn process(&self, user_id: &str, submission: &Submission) -> PipelineOutcome {
        let biomarkers = submission.biomarkers.as_ref().filter(|b| !b.is_empty());
        let context = submission.context.as_ref();
        let text = Some(submission.text.as_str()).filter(|t| !t.trim().is_empty());

        let (mapping, source) =
            self.extractor.extract_with_source(&submission.text, biomarkers, context).await;
        let drift = self.history.record(user_id, mapping.clone());
        let status = self.evaluator.evaluate(&mapping, text, biomarkers);
        let record = self.protocol.execute_protocol(user_id, &status, context).await;

        tracing::debug!(
            user_id,
            drift,
            level = status.level.as_u8(),
            state = record.state_after.as_str(),
            "submission processed"
        );

        PipelineOutcome { mapping, source, drift, status, record }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;
    use crate::protocol::LoggingNotifier;
    use crate::types::{RiskLevel, VeluriaState};

    fn pipeline() -> Pipeline {
        Pipeline::build(
            Arc::new(VeluriaCfg::default()),
            None,
            Some(Arc::new(LoggingNotifier)),
            Arc::new(MemoryAuditSink::new()),
        )
    }

    #[test]
    fn history_is_bounded() {
        let h = MappingHistory::new(2);
        let cfg = VeluriaCfg::default();
        for text in ["rain", "fire", "road"] {
            h.record("u", crate::symbolic::fallback_mapping(text, None, &cfg));
        }
        let recent = h.recent("u");
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].primary_symbol, "fire");
        h.clear("u");
        assert_eq!(h.len("u"), 0);
    }

    #[tokio::test]
    async fn first_submission_has_zero_drift_then_floor() {
        let p = pipeline();
        let first = p.process("u", &Submission::text("Everything is fine")).await;
        assert_eq!(first.drift, 0.0);
        assert_eq!(first.source, MappingSource::Fallback);
        let second = p.process("u", &Submission::text("Everything is fine")).await;
        assert_eq!(second.drift, 0.3);
        assert_eq!(p.history().len("u"), 2);
    }

    #[tokio::test]
    async fn crisis_text_escalates_then_steps_down() {
        let p = pipeline();
        let out = p.process("u", &Submission::text("I'm drowning and I want to kill myself")).await;
        assert_eq!(out.status.level, RiskLevel::Critical);
        assert_eq!(out.record.state_after, VeluriaState::Level3);

        let calm = p.process("u", &Submission::text("Everything is fine")).await;
        assert_eq!(calm.status.level, RiskLevel::None);
        assert_eq!(calm.record.state_after, VeluriaState::Level2);
    }

    #[tokio::test]
    async fn empty_text_with_no_biomarkers_still_completes() {
        let p = pipeline();
        let out = p.process("u", &Submission::default()).await;
        assert_eq!(out.status.level, RiskLevel::None);
        assert_eq!(out.record.state_after, VeluriaState::Safe);
    }
}

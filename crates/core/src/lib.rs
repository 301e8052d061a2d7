//! VELURIA crisis-detection core.
//!
//! Free text (plus optional biomarkers) is read into a symbolic mapping,
//! scored for risk, and fed to a per-user intervention state machine that
//! escalates immediately and steps down one rung at a time.

pub mod audit;
pub mod config;
pub mod pipeline;
pub mod protocol;
pub mod risk;
pub mod symbolic;
pub mod text;
pub mod types;

pub use audit::{AuditEvent, AuditSink, MemoryAuditSink, TracingAuditSink};
pub use config::VeluriaCfg;
pub use pipeline::{MappingHistory, Pipeline, PipelineOutcome, Submission};
pub use protocol::{CrisisNotifier, InterventionProtocol, LoggingNotifier, NoopNotifier, NotifyError, StateStore};
pub use risk::RiskEvaluator;
pub use symbolic::{calculate_drift, ExtractionError, SymbolicExtractor};
pub use types::{
    Archetype, Biomarkers, CrisisNotice, InterventionRecord, InvalidRiskLevel, MappingSource, Metaphor,
    ProtocolContext, RiskLevel, SafetyStatus, SymbolicMapping, VeluriaState,
};

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use veluria_llm::provider::{ChatMessage, CompletionRequest, LlmError, LlmProvider};

use super::fallback::fallback_mapping;
use super::prompt::{build_extraction_prompt, SYSTEM_PROMPT};
use crate::audit::{AuditEvent, AuditSink, TracingAuditSink};
use crate::config::VeluriaCfg;
use crate::types::{Archetype, Biomarkers, MappingSource, Metaphor, ProtocolContext, SymbolicMapping};

const MAX_ALTERNATES: usize = 3;
/// Confidence assumed when the collaborator omits it.
const DEFAULT_PAYLOAD_CONFIDENCE: f32 = 0.5;

/// Why the collaborator path did not produce a mapping.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("no text-generation provider configured")]
    Unavailable,
    #[error("no text to read")]
    EmptyText,
    #[error("provider timed out after {0} ms")]
    Timeout(u64),
    #[error(transparent)]
    Provider(#[from] LlmError),
    #[error("response contained no structured block")]
    NoStructuredBlock,
    #[error("malformed mapping: {0}")]
    Malformed(MalformedReason),
}

/// What was wrong with a collaborator payload. Never carries payload text,
/// since the payload is derived from what the user wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MalformedReason {
    #[error("{category} error at line {line} column {column}")]
    Json { category: &'static str, line: usize, column: usize },
    #[error("unknown archetype")]
    UnknownArchetype,
    #[error("empty primary_symbol")]
    EmptySymbol,
}

impl From<&serde_json::Error> for MalformedReason {
    fn from(e: &serde_json::Error) -> Self {
        let category = match e.classify() {
            serde_json::error::Category::Io => "io",
            serde_json::error::Category::Syntax => "syntax",
            serde_json::error::Category::Data => "data",
            serde_json::error::Category::Eof => "eof",
        };
        Self::Json { category, line: e.line(), column: e.column() }
    }
}

/// Text → symbolic mapping. Stateless across calls.
pub struct SymbolicExtractor {
    provider: Option<Arc<dyn LlmProvider>>,
    cfg: Arc<VeluriaCfg>,
    audit: Arc<dyn AuditSink>,
}

impl SymbolicExtractor {
    pub fn new(provider: Option<Arc<dyn LlmProvider>>, cfg: Arc<VeluriaCfg>, audit: Arc<dyn AuditSink>) -> Self {
        Self { provider, cfg, audit }
    }

    /// Keyword-only extractor with tracing audit output.
    pub fn offline(cfg: Arc<VeluriaCfg>) -> Self {
        Self::new(None, cfg, Arc::new(TracingAuditSink))
    }

    /// Always yields a valid mapping: collaborator first, keyword fallback on any failure.
    pub async fn extract(
        &self,
        text: &str,
        biomarkers: Option<&Biomarkers>,
        context: Option<&ProtocolContext>,
    ) -> SymbolicMapping {
        self.extract_with_source(text, biomarkers, context).await.0
    }

    /// Like [`extract`](Self::extract), also reporting which path produced the mapping.
    pub async fn extract_with_source(
        &self,
        text: &str,
        biomarkers: Option<&Biomarkers>,
        context: Option<&ProtocolContext>,
    ) -> (SymbolicMapping, MappingSource) {
        let (mapping, source) = match self.extract_primary(text, biomarkers, context).await {
            Ok(mapping) => (mapping, MappingSource::Collaborator),
            Err(e) => {
                if !matches!(e, ExtractionError::Unavailable | ExtractionError::EmptyText) {
                    tracing::warn!(error = %e, text_len = text.len(), "symbolic extraction fell back to keywords");
                }
                (self.extract_fallback(text, biomarkers), MappingSource::Fallback)
            }
        };

        self.audit.record(&AuditEvent::MappingExtracted {
            source,
            archetype: mapping.archetype,
            confidence: mapping.confidence,
        });
        (mapping, source)
    }

    /// Deterministic keyword path.
    pub fn extract_fallback(&self, text: &str, biomarkers: Option<&Biomarkers>) -> SymbolicMapping {
        fallback_mapping(text, biomarkers, &self.cfg)
    }

    async fn extract_primary(
        &self,
        text: &str,
        biomarkers: Option<&Biomarkers>,
        context: Option<&ProtocolContext>,
    ) -> Result<SymbolicMapping, ExtractionError> {
        let provider = self.provider.as_ref().ok_or(ExtractionError::Unavailable)?;
        if text.trim().is_empty() {
            return Err(ExtractionError::EmptyText);
        }

        let request = CompletionRequest {
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(build_extraction_prompt(text, biomarkers, context)),
            ],
            max_tokens: self.cfg.llm_max_tokens,
            temperature: self.cfg.llm_temperature,
        };

        let timeout_ms = self.cfg.llm_timeout_ms;
        let response = tokio::time::timeout(Duration::from_millis(timeout_ms), provider.complete(request))
            .await
            .map_err(|_| ExtractionError::Timeout(timeout_ms))??;

        tracing::debug!(
            provider = provider.name(),
            response_len = response.content.len(),
            output_tokens = response.output_tokens,
            "extraction response received"
        );

        parse_mapping(&response.content)
    }
}

#[derive(Deserialize)]
struct MappingPayload {
    primary_symbol: String,
    archetype: String,
    #[serde(default, alias = "alternatives", alias = "alternates")]
    alternative_symbols: Vec<String>,
    valence: f32,
    arousal: f32,
    #[serde(default)]
    metaphors: Vec<MetaphorPayload>,
    #[serde(default)]
    confidence: Option<f32>,
}

#[derive(Deserialize)]
struct MetaphorPayload {
    #[serde(alias = "text", alias = "source_text")]
    source: String,
    symbol: String,
    #[serde(default)]
    confidence: Option<f32>,
}

/// Parse a collaborator response into a mapping.
/// Reads the first balanced `{...}` block; everything around it is ignored.
pub fn parse_mapping(raw: &str) -> Result<SymbolicMapping, ExtractionError> {
    let block = first_balanced_block(raw).ok_or(ExtractionError::NoStructuredBlock)?;
    let payload: MappingPayload =
        serde_json::from_str(block).map_err(|e| ExtractionError::Malformed(MalformedReason::from(&e)))?;

    let archetype = Archetype::from_name(&payload.archetype)
        .ok_or(ExtractionError::Malformed(MalformedReason::UnknownArchetype))?;

    let primary_symbol = payload.primary_symbol.trim().to_lowercase();
    if primary_symbol.is_empty() {
        return Err(ExtractionError::Malformed(MalformedReason::EmptySymbol));
    }

    let alternative_symbols: Vec<String> = payload
        .alternative_symbols
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .take(MAX_ALTERNATES)
        .collect();

    let metaphors = payload
        .metaphors
        .into_iter()
        .map(|m| Metaphor {
            source: m.source,
            symbol: m.symbol.trim().to_lowercase(),
            confidence: m.confidence.unwrap_or(DEFAULT_PAYLOAD_CONFIDENCE).clamp(0.0, 1.0),
        })
        .collect();

    Ok(SymbolicMapping {
        primary_symbol,
        archetype,
        alternative_symbols,
        valence: payload.valence.clamp(-1.0, 1.0),
        arousal: payload.arousal.clamp(0.0, 1.0),
        metaphors,
        confidence: payload.confidence.unwrap_or(DEFAULT_PAYLOAD_CONFIDENCE).clamp(0.0, 1.0),
        timestamp: Utc::now(),
    })
}

/// First `{...}` block whose braces balance, skipping braces inside JSON strings.
fn first_balanced_block(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in raw[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

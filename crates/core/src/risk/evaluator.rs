use std::sync::Arc;

use chrono::Utc;

use super::lexicon::{self, Tier};
use crate::audit::{AuditEvent, AuditSink, TracingAuditSink};
use crate::config::VeluriaCfg;
use crate::text::tokenize;
use crate::types::{Biomarkers, RiskLevel, SafetyStatus, SymbolicMapping};

const METAPHOR_CAP: f32 = 1.0;
const LEXICAL_CAP: f32 = 0.8;
const BIOMARKER_CAP: f32 = 0.6;

const HIGH_TERM_WEIGHT: f32 = 0.5;
const MEDIUM_TERM_WEIGHT: f32 = 0.1;
const MEDIUM_TERM_MAX: usize = 3;
const CONCERNING_TERM_WEIGHT: f32 = 0.05;
const CONCERNING_TERM_MAX: usize = 5;

const BIOMARKER_CRITICAL: f32 = 0.3;
const BIOMARKER_CONCERNING: f32 = 0.15;

const LEVEL_3_THRESHOLD: f32 = 0.7;
const LEVEL_2_THRESHOLD: f32 = 0.5;
const LEVEL_1_THRESHOLD: f32 = 0.3;

/// One additive component of the risk score.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Component {
    pub score: f32,
    pub triggers: Vec<String>,
}

impl Component {
    fn add(&mut self, amount: f32, trigger: &str) {
        self.score += amount;
        self.triggers.push(trigger.to_owned());
    }

    fn capped(mut self, cap: f32) -> Self {
        self.score = self.score.min(cap);
        self
    }
}

/// Mapping + raw signals → bounded risk score and level. Stateless across calls.
pub struct RiskEvaluator {
    cfg: Arc<VeluriaCfg>,
    audit: Arc<dyn AuditSink>,
}

impl RiskEvaluator {
    pub fn new(cfg: Arc<VeluriaCfg>, audit: Arc<dyn AuditSink>) -> Self {
        Self { cfg, audit }
    }

    pub fn with_defaults() -> Self {
        Self::new(Arc::new(VeluriaCfg::default()), Arc::new(TracingAuditSink))
    }

    /// Never fails; absent text or biomarkers contribute nothing.
    pub fn evaluate(
        &self,
        mapping: &SymbolicMapping,
        text: Option<&str>,
        biomarkers: Option<&Biomarkers>,
    ) -> SafetyStatus {
        let metaphor = metaphor_risk(mapping);
        let lexical = text.map(lexical_risk).unwrap_or_default();
        let biomarker = biomarkers.map(|b| biomarker_risk(b, &self.cfg)).unwrap_or_default();

        let risk_score = metaphor.score + lexical.score + biomarker.score;
        let level = level_for(risk_score);

        let mut triggers = metaphor.triggers;
        triggers.extend(lexical.triggers);
        triggers.extend(biomarker.triggers);

        tracing::debug!(
            metaphor_risk = metaphor.score,
            lexical_risk = lexical.score,
            biomarker_risk = biomarker.score,
            risk_score,
            level = level.as_u8(),
            "risk components summed"
        );
        self.audit.record(&AuditEvent::RiskEvaluated { level, risk_score, trigger_count: triggers.len() });

        SafetyStatus {
            level,
            risk_score,
            metaphor_risk: metaphor.score,
            lexical_risk: lexical.score,
            biomarker_risk: biomarker.score,
            triggers,
            recommended_actions: recommended_actions(level).iter().map(|a| (*a).to_owned()).collect(),
            timestamp: Utc::now(),
        }
    }
}

/// Risk carried by the symbolic reading alone, capped at 1.0.
pub fn metaphor_risk(mapping: &SymbolicMapping) -> Component {
    let mut c = Component::default();

    match lexicon::archetype_tier(mapping.archetype) {
        Tier::High => c.add(0.3, "archetype_high_risk"),
        Tier::Medium => c.add(0.1, "archetype_medium_risk"),
        Tier::Neutral => {}
    }

    match lexicon::symbol_tier(&mapping.primary_symbol) {
        Tier::High => c.add(0.3, "symbol_high_risk"),
        Tier::Medium => c.add(0.1, "symbol_medium_risk"),
        Tier::Neutral => {}
    }

    let alternates: f32 = mapping
        .alternative_symbols
        .iter()
        .map(|s| match lexicon::symbol_tier(s) {
            Tier::High => 0.2,
            Tier::Medium => 0.1,
            Tier::Neutral => 0.0,
        })
        .sum();
    if alternates > 0.0 {
        c.add(alternates, "alternative_symbol_risk");
    }

    if mapping.valence < -0.5 && mapping.arousal > 0.7 {
        c.add(0.2, "affect_distress");
    } else if mapping.valence < -0.3 && mapping.arousal > 0.5 {
        c.add(0.1, "affect_distress");
    }

    c.capped(METAPHOR_CAP)
}

/// Whole-word lexicon scan, capped at 0.8.
pub fn lexical_risk(text: &str) -> Component {
    let tokens = tokenize(text);
    let mut c = Component::default();

    // one high-risk hit is enough
    if lexicon::HIGH_RISK_TERMS.iter().any(|t| crate::text::contains_phrase(&tokens, t)) {
        c.add(HIGH_TERM_WEIGHT, "high_risk_term");
    }

    let medium = lexicon::matches(&tokens, lexicon::MEDIUM_RISK_TERMS).len();
    if medium > 0 {
        c.add(medium.min(MEDIUM_TERM_MAX) as f32 * MEDIUM_TERM_WEIGHT, "medium_risk_term");
    }

    let concerning = lexicon::matches(&tokens, lexicon::CONCERNING_TERMS).len();
    if concerning > 0 {
        c.add(concerning.min(CONCERNING_TERM_MAX) as f32 * CONCERNING_TERM_WEIGHT, "concerning_term");
    }

    c.capped(LEXICAL_CAP)
}

/// Physiological signals against configured thresholds, capped at 0.6.
pub fn biomarker_risk(b: &Biomarkers, cfg: &VeluriaCfg) -> Component {
    let mut c = Component::default();

    if let Some(hrv) = b.heart_rate_variability {
        if hrv < cfg.hrv_min {
            c.add(BIOMARKER_CRITICAL, "hrv_critical");
        } else if hrv < cfg.hrv_concerning {
            c.add(BIOMARKER_CONCERNING, "hrv_concerning");
        }
    }

    if let Some(gsr) = b.galvanic_skin_response {
        if gsr > cfg.gsr_max {
            c.add(BIOMARKER_CRITICAL, "gsr_critical");
        } else if gsr > cfg.gsr_concerning {
            c.add(BIOMARKER_CONCERNING, "gsr_concerning");
        }
    }

    if let Some(tremor) = b.voice_tremor {
        if tremor > cfg.voice_tremor_max {
            c.add(BIOMARKER_CRITICAL, "voice_critical");
        } else if tremor > cfg.voice_tremor_concerning {
            c.add(BIOMARKER_CONCERNING, "voice_concerning");
        }
    }

    c.capped(BIOMARKER_CAP)
}

/// Threshold the summed score. Non-decreasing in `score`.
pub fn level_for(score: f32) -> RiskLevel {
    if score >= LEVEL_3_THRESHOLD {
        RiskLevel::Critical
    } else if score >= LEVEL_2_THRESHOLD {
        RiskLevel::Elevated
    } else if score >= LEVEL_1_THRESHOLD {
        RiskLevel::Low
    } else {
        RiskLevel::None
    }
}

pub fn recommended_actions(level: RiskLevel) -> &'static [&'static str] {
    match level {
        RiskLevel::Critical => &["human_intervention", "provide_resources", "crisis_protocol"],
        RiskLevel::Elevated => &["safety_resources", "grounding_techniques", "support_options"],
        RiskLevel::Low => &["symbolic_grounding", "emotional_acknowledgment"],
        RiskLevel::None => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;
    use crate::symbolic::fallback_mapping;
    use crate::types::Archetype;

    fn neutral() -> SymbolicMapping {
        fallback_mapping("Everything is fine", None, &VeluriaCfg::default())
    }

    #[test]
    fn calm_text_is_level_zero() {
        let ev = RiskEvaluator::with_defaults();
        let status = ev.evaluate(&neutral(), Some("Everything is fine"), None);
        assert_eq!(status.level, RiskLevel::None);
        assert_eq!(status.metaphor_risk, 0.0);
        assert_eq!(status.lexical_risk, 0.0);
        assert!(status.recommended_actions.is_empty());
        assert!(status.triggers.is_empty());
    }

    #[test]
    fn single_high_term_is_exactly_half() {
        let c = lexical_risk("I want to kill myself");
        assert_eq!(c.score, 0.5);
        assert_eq!(c.triggers, vec!["high_risk_term"]);
    }

    #[test]
    fn many_high_terms_still_count_once() {
        let c = lexical_risk("suicidal, I want to die, end it all");
        assert_eq!(c.score, 0.5);
        assert_eq!(c.triggers.iter().filter(|t| *t == "high_risk_term").count(), 1);
    }

    #[test]
    fn medium_and_concerning_counts_are_capped() {
        let c = lexical_risk("hopeless worthless trapped empty numb");
        assert!((c.score - 0.3).abs() < 1e-6);
        assert_eq!(c.triggers, vec!["medium_risk_term"]);

        let c = lexical_risk("sad tired lonely anxious stressed overwhelmed scared");
        assert!((c.score - 0.25).abs() < 1e-6);
        assert_eq!(c.triggers, vec!["concerning_term"]);
    }

    #[test]
    fn lexical_cap_applies() {
        let c = lexical_risk(
            "suicide hopeless worthless trapped sad tired lonely anxious stressed",
        );
        assert_eq!(c.score, LEXICAL_CAP);
        assert_eq!(c.triggers.len(), 3);
    }

    #[test]
    fn metaphor_components_add_up() {
        let m = SymbolicMapping {
            primary_symbol: "abyss".into(),
            archetype: Archetype::Shadow,
            alternative_symbols: vec!["void".into(), "fog".into(), "light".into()],
            valence: -0.9,
            arousal: 0.9,
            metaphors: vec![],
            confidence: 0.8,
            timestamp: Utc::now(),
        };
        let c = metaphor_risk(&m);
        // 0.3 + 0.3 + (0.2 + 0.1) + 0.2 = 1.1, capped
        assert_eq!(c.score, 1.0);
        assert_eq!(
            c.triggers,
            vec!["archetype_high_risk", "symbol_high_risk", "alternative_symbol_risk", "affect_distress"]
        );
    }

    #[test]
    fn calm_fire_imagery_stays_below_level_one() {
        let text = "sitting by a warm fire feeling sad and tired";
        let mapping = fallback_mapping(text, None, &VeluriaCfg::default());
        let status = RiskEvaluator::with_defaults().evaluate(&mapping, Some(text), None);
        assert!((status.metaphor_risk - 0.1).abs() < 1e-6);
        assert!(!status.triggers.iter().any(|t| t == "alternative_symbol_risk"));
        assert_eq!(status.level, RiskLevel::None);
    }

    #[test]
    fn milder_affect_adds_tenth() {
        let mut m = neutral();
        m.valence = -0.4;
        m.arousal = 0.6;
        assert!((metaphor_risk(&m).score - 0.1).abs() < 1e-6);
    }

    #[test]
    fn biomarker_thresholds_and_cap() {
        let cfg = VeluriaCfg::default();
        let b = Biomarkers { heart_rate_variability: Some(30.0), galvanic_skin_response: None, voice_tremor: Some(0.6) };
        let c = biomarker_risk(&b, &cfg);
        assert!((c.score - 0.3).abs() < 1e-6);
        assert_eq!(c.triggers, vec!["hrv_concerning", "voice_concerning"]);

        let all = Biomarkers {
            heart_rate_variability: Some(10.0),
            galvanic_skin_response: Some(20.0),
            voice_tremor: Some(0.95),
        };
        let c = biomarker_risk(&all, &cfg);
        assert_eq!(c.score, BIOMARKER_CAP);
        assert_eq!(c.triggers, vec!["hrv_critical", "gsr_critical", "voice_critical"]);
    }

    #[test]
    fn drowning_and_high_term_reach_level_three() {
        let cfg = VeluriaCfg::default();
        let text = "I'm drowning and I want to kill myself";
        let m = fallback_mapping(text, None, &cfg);
        let sink = Arc::new(MemoryAuditSink::new());
        let ev = RiskEvaluator::new(Arc::new(cfg), sink.clone());
        let status = ev.evaluate(&m, Some(text), None);
        assert_eq!(status.level, RiskLevel::Critical);
        assert_eq!(status.recommended_actions, vec!["human_intervention", "provide_resources", "crisis_protocol"]);
        assert!(matches!(sink.events()[0], AuditEvent::RiskEvaluated { level: RiskLevel::Critical, .. }));
    }

    #[test]
    fn score_is_not_capped_at_one() {
        let cfg = VeluriaCfg::default();
        let m = SymbolicMapping {
            primary_symbol: "void".into(),
            archetype: Archetype::Destroyer,
            alternative_symbols: vec![],
            valence: -1.0,
            arousal: 1.0,
            metaphors: vec![],
            confidence: 0.9,
            timestamp: Utc::now(),
        };
        let b = Biomarkers { heart_rate_variability: Some(5.0), ..Default::default() };
        let status = RiskEvaluator::new(Arc::new(cfg), Arc::new(TracingAuditSink)).evaluate(
            &m,
            Some("suicide"),
            Some(&b),
        );
        assert!(status.risk_score > 1.0);
        assert_eq!(status.level, RiskLevel::Critical);
    }

    #[test]
    fn missing_inputs_score_metaphor_only() {
        let ev = RiskEvaluator::with_defaults();
        let status = ev.evaluate(&neutral(), None, None);
        assert_eq!(status.risk_score, 0.0);
        assert_eq!(status.lexical_risk, 0.0);
        assert_eq!(status.biomarker_risk, 0.0);
    }

    #[test]
    fn level_is_monotonic_in_score() {
        let mut last = RiskLevel::None;
        for step in 0..=300 {
            let level = level_for(step as f32 * 0.005);
            assert!(level >= last);
            last = level;
        }
        assert_eq!(level_for(0.29), RiskLevel::None);
        assert_eq!(level_for(0.3), RiskLevel::Low);
        assert_eq!(level_for(0.5), RiskLevel::Elevated);
        assert_eq!(level_for(0.7), RiskLevel::Critical);
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Symbolic types ─────────────────────────────────────────────

/// Fixed archetype vocabulary used to frame emotional text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    #[serde(rename = "self")]
    SelfArchetype,
    Shadow,
    Persona,
    Anima,
    Animus,
    Hero,
    Mentor,
    Trickster,
    Caregiver,
    Orphan,
    Explorer,
    Destroyer,
}

impl Archetype {
    pub const ALL: [Archetype; 12] = [
        Self::SelfArchetype,
        Self::Shadow,
        Self::Persona,
        Self::Anima,
        Self::Animus,
        Self::Hero,
        Self::Mentor,
        Self::Trickster,
        Self::Caregiver,
        Self::Orphan,
        Self::Explorer,
        Self::Destroyer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SelfArchetype => "self",
            Self::Shadow => "shadow",
            Self::Persona => "persona",
            Self::Anima => "anima",
            Self::Animus => "animus",
            Self::Hero => "hero",
            Self::Mentor => "mentor",
            Self::Trickster => "trickster",
            Self::Caregiver => "caregiver",
            Self::Orphan => "orphan",
            Self::Explorer => "explorer",
            Self::Destroyer => "destroyer",
        }
    }

    /// Case-insensitive lookup. Names outside the vocabulary return `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        Self::ALL.into_iter().find(|a| a.as_str() == name)
    }
}

/// One metaphor spotted in the source text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metaphor {
    /// Fragment of the input the metaphor was read from.
    pub source: String,
    pub symbol: String,
    pub confidence: f32,
}

/// Structured metaphor/archetype reading of one piece of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolicMapping {
    pub primary_symbol: String,
    pub archetype: Archetype,
    /// At most three entries, most relevant first.
    pub alternative_symbols: Vec<String>,
    /// -1.0 ..= 1.0
    pub valence: f32,
    /// 0.0 ..= 1.0
    pub arousal: f32,
    pub metaphors: Vec<Metaphor>,
    /// 0.0 ..= 1.0
    pub confidence: f32,
    pub timestamp: DateTime<Utc>,
}

/// Which path produced a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingSource {
    Collaborator,
    Fallback,
}

/// Optional physiological readings accompanying a submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Biomarkers {
    /// Heart-rate variability (RMSSD, ms).
    pub heart_rate_variability: Option<f32>,
    /// Galvanic skin response (microsiemens).
    pub galvanic_skin_response: Option<f32>,
    /// Voice tremor index, 0.0 ..= 1.0.
    pub voice_tremor: Option<f32>,
}

impl Biomarkers {
    pub fn is_empty(&self) -> bool {
        self.heart_rate_variability.is_none()
            && self.galvanic_skin_response.is_none()
            && self.voice_tremor.is_none()
    }
}

// ── Risk types ─────────────────────────────────────────────────

/// Discrete safety level emitted by the risk evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum RiskLevel {
    None = 0,
    Low = 1,
    Elevated = 2,
    Critical = 3,
}

impl RiskLevel {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// A risk level integer outside 0..=3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("risk level {0} is outside 0..=3")]
pub struct InvalidRiskLevel(pub u8);

impl TryFrom<u8> for RiskLevel {
    type Error = InvalidRiskLevel;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Low),
            2 => Ok(Self::Elevated),
            3 => Ok(Self::Critical),
            other => Err(InvalidRiskLevel(other)),
        }
    }
}

impl From<RiskLevel> for u8 {
    fn from(level: RiskLevel) -> Self {
        level.as_u8()
    }
}

/// Result of one risk evaluation. Immutable once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyStatus {
    pub level: RiskLevel,
    /// Sum of the three capped components; may exceed 1.0.
    pub risk_score: f32,
    pub metaphor_risk: f32,
    pub lexical_risk: f32,
    pub biomarker_risk: f32,
    pub triggers: Vec<String>,
    pub recommended_actions: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

// ── Protocol types ─────────────────────────────────────────────

/// Per-user intervention state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum VeluriaState {
    #[default]
    Safe = 0,
    Level1 = 1,
    Level2 = 2,
    Level3 = 3,
    Monitoring = 4,
}

impl VeluriaState {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "SAFE",
            Self::Level1 => "LEVEL_1",
            Self::Level2 => "LEVEL_2",
            Self::Level3 => "LEVEL_3",
            Self::Monitoring => "MONITORING",
        }
    }
}

impl From<VeluriaState> for u8 {
    fn from(state: VeluriaState) -> Self {
        state.as_u8()
    }
}

impl TryFrom<u8> for VeluriaState {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Safe),
            1 => Ok(Self::Level1),
            2 => Ok(Self::Level2),
            3 => Ok(Self::Level3),
            4 => Ok(Self::Monitoring),
            other => Err(format!("state value {other} is outside 0..=4")),
        }
    }
}

/// Append-only log entry of one protocol execution or manual intervention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionRecord {
    pub id: Uuid,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    /// State value at completion, 0..=4.
    pub level: u8,
    pub triggers: Vec<String>,
    pub risk_score: f32,
    pub actions_taken: Vec<String>,
    pub resources_provided: Vec<String>,
    pub state_before: VeluriaState,
    pub state_after: VeluriaState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intervener_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Caller-supplied context for a protocol call. Only allow-listed scalar
/// keys ever leave the core.
pub type ProtocolContext = serde_json::Map<String, serde_json::Value>;

/// Context keys that may leave the core (notifier payloads, prompts).
pub const CONTEXT_ALLOW_LIST: [&str; 4] = ["session_id", "platform", "location_type", "has_support_contact"];

/// Keep only allow-listed keys whose values are scalars.
pub fn sanitize_context(context: &ProtocolContext) -> serde_json::Map<String, serde_json::Value> {
    CONTEXT_ALLOW_LIST
        .iter()
        .filter_map(|key| {
            let value = context.get(*key)?;
            match value {
                serde_json::Value::String(_) | serde_json::Value::Bool(_) | serde_json::Value::Number(_) => {
                    Some(((*key).to_owned(), value.clone()))
                }
                _ => None,
            }
        })
        .collect()
}

/// Sanitized payload handed to the crisis-notification collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrisisNotice {
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub risk_level: u8,
    pub risk_score: f32,
    pub triggers: Vec<String>,
    #[serde(flatten)]
    pub context: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archetype_lookup_is_case_insensitive() {
        assert_eq!(Archetype::from_name("Shadow"), Some(Archetype::Shadow));
        assert_eq!(Archetype::from_name(" self "), Some(Archetype::SelfArchetype));
        assert_eq!(Archetype::from_name("wizard"), None);
    }

    #[test]
    fn archetype_serializes_as_name() {
        let json = serde_json::to_string(&Archetype::SelfArchetype).unwrap();
        assert_eq!(json, "\"self\"");
        let back: Archetype = serde_json::from_str("\"destroyer\"").unwrap();
        assert_eq!(back, Archetype::Destroyer);
    }

    #[test]
    fn risk_level_rejects_out_of_range() {
        assert_eq!(RiskLevel::try_from(3), Ok(RiskLevel::Critical));
        assert_eq!(RiskLevel::try_from(4), Err(InvalidRiskLevel(4)));
        assert!(serde_json::from_str::<RiskLevel>("7").is_err());
        assert_eq!(serde_json::to_string(&RiskLevel::Elevated).unwrap(), "2");
    }

    #[test]
    fn state_round_trips_as_integer() {
        assert_eq!(serde_json::to_string(&VeluriaState::Monitoring).unwrap(), "4");
        let s: VeluriaState = serde_json::from_str("3").unwrap();
        assert_eq!(s, VeluriaState::Level3);
        assert_eq!(VeluriaState::default(), VeluriaState::Safe);
    }

    #[test]
    fn sanitize_drops_unlisted_and_nested_values() {
        let context: ProtocolContext = serde_json::from_value(serde_json::json!({
            "session_id": "s-42",
            "has_support_contact": true,
            "text": "raw user words",
            "notes": "free-form",
            "platform": {"os": "android"},
        }))
        .unwrap();
        let clean = sanitize_context(&context);
        assert_eq!(clean.len(), 2);
        assert_eq!(clean["session_id"], "s-42");
        assert_eq!(clean["has_support_contact"], true);
        assert!(!clean.contains_key("text"));
        assert!(!clean.contains_key("platform"));
    }

    #[test]
    fn crisis_notice_is_flat() {
        let mut context = serde_json::Map::new();
        context.insert("platform".into(), serde_json::json!("ios"));
        let notice = CrisisNotice {
            user_id: "u1".into(),
            timestamp: Utc::now(),
            risk_level: 3,
            risk_score: 0.9,
            triggers: vec!["high_risk_term".into()],
            context,
        };
        let value = serde_json::to_value(&notice).unwrap();
        assert_eq!(value["platform"], "ios");
        assert_eq!(value["risk_level"], 3);
    }
}

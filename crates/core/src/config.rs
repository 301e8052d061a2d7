use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Prefix for environment overrides, e.g. `VELURIA_LLM_TIMEOUT_MS`.
const ENV_PREFIX: &str = "VELURIA_";

/// All veluria tuning parameters.
/// Built from defaults, overridden key by key from a string map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VeluriaCfg {
    // text-generation collaborator
    pub llm_timeout_ms: u64,
    pub llm_max_tokens: u32,
    pub llm_temperature: f32,

    // crisis notifier
    pub notifier_timeout_ms: u64,

    // biomarker thresholds
    pub hrv_min: f32,
    pub hrv_concerning: f32,
    pub gsr_max: f32,
    pub gsr_concerning: f32,
    pub voice_tremor_max: f32,
    pub voice_tremor_concerning: f32,

    // per-user mapping history kept by the pipeline
    pub mapping_history_cap: usize,
}

impl Default for VeluriaCfg {
    fn default() -> Self {
        Self {
            llm_timeout_ms: 4000,
            llm_max_tokens: 400,
            llm_temperature: 0.2,
            notifier_timeout_ms: 5000,
            hrv_min: 20.0,
            hrv_concerning: 35.0,
            gsr_max: 15.0,
            gsr_concerning: 10.0,
            voice_tremor_max: 0.7,
            voice_tremor_concerning: 0.5,
            mapping_history_cap: 64,
        }
    }
}

impl VeluriaCfg {
    /// Load overrides from `VELURIA_*` environment variables.
    /// Unset or unparsable values keep their defaults.
    pub fn from_env() -> Self {
        let map: HashMap<String, String> = std::env::vars()
            .filter_map(|(k, v)| k.strip_prefix(ENV_PREFIX).map(|key| (key.to_lowercase(), v)))
            .collect();
        Self::from_map(&map)
    }

    pub fn from_map(m: &HashMap<String, String>) -> Self {
        let d = Self::default();
        Self {
            llm_timeout_ms: get_or(m, "llm_timeout_ms", d.llm_timeout_ms),
            llm_max_tokens: get_or(m, "llm_max_tokens", d.llm_max_tokens),
            llm_temperature: get_or(m, "llm_temperature", d.llm_temperature),
            notifier_timeout_ms: get_or(m, "notifier_timeout_ms", d.notifier_timeout_ms),
            hrv_min: get_or(m, "hrv_min", d.hrv_min),
            hrv_concerning: get_or(m, "hrv_concerning", d.hrv_concerning),
            gsr_max: get_or(m, "gsr_max", d.gsr_max),
            gsr_concerning: get_or(m, "gsr_concerning", d.gsr_concerning),
            voice_tremor_max: get_or(m, "voice_tremor_max", d.voice_tremor_max),
            voice_tremor_concerning: get_or(m, "voice_tremor_concerning", d.voice_tremor_concerning),
            mapping_history_cap: get_or(m, "mapping_history_cap", d.mapping_history_cap),
        }
    }

    /// `(key, value, description)` triples for display.
    pub fn to_entries(&self) -> Vec<(&'static str, String, &'static str)> {
        vec![
            ("llm_timeout_ms", self.llm_timeout_ms.to_string(), "Symbolic extraction LLM timeout ms"),
            ("llm_max_tokens", self.llm_max_tokens.to_string(), "Max tokens for extraction response"),
            ("llm_temperature", self.llm_temperature.to_string(), "Extraction sampling temperature"),
            ("notifier_timeout_ms", self.notifier_timeout_ms.to_string(), "Crisis notifier timeout ms"),
            ("hrv_min", self.hrv_min.to_string(), "HRV critical floor (ms)"),
            ("hrv_concerning", self.hrv_concerning.to_string(), "HRV concerning floor (ms)"),
            ("gsr_max", self.gsr_max.to_string(), "GSR critical ceiling (uS)"),
            ("gsr_concerning", self.gsr_concerning.to_string(), "GSR concerning ceiling (uS)"),
            ("voice_tremor_max", self.voice_tremor_max.to_string(), "Voice tremor critical ceiling"),
            ("voice_tremor_concerning", self.voice_tremor_concerning.to_string(), "Voice tremor concerning ceiling"),
            ("mapping_history_cap", self.mapping_history_cap.to_string(), "Mappings kept per user for drift"),
        ]
    }
}

fn get_or<T: std::str::FromStr>(map: &HashMap<String, String>, key: &str, default: T) -> T {
    map.get(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_map_yields_defaults() {
        let cfg = VeluriaCfg::from_map(&HashMap::new());
        assert_eq!(cfg.llm_timeout_ms, 4000);
        assert_eq!(cfg.mapping_history_cap, 64);
        assert!((cfg.hrv_min - 20.0).abs() < f32::EPSILON);
    }

    #[test]
    fn overrides_parse_and_bad_values_fall_back() {
        let mut m = HashMap::new();
        m.insert("llm_timeout_ms".to_string(), "250".to_string());
        m.insert("gsr_max".to_string(), "not-a-number".to_string());
        let cfg = VeluriaCfg::from_map(&m);
        assert_eq!(cfg.llm_timeout_ms, 250);
        assert!((cfg.gsr_max - 15.0).abs() < f32::EPSILON);
    }

    #[test]
    fn entries_cover_every_field() {
        let cfg = VeluriaCfg::default();
        let entries = cfg.to_entries();
        assert_eq!(entries.len(), 11);
        assert!(entries.iter().any(|(k, v, _)| *k == "notifier_timeout_ms" && v == "5000"));
    }
}

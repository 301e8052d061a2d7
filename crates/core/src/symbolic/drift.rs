use crate::types::SymbolicMapping;

/// Base drift when the primary symbol moved somewhere unrelated.
const SYMBOL_SHIFT: f32 = 0.7;
/// Base drift otherwise. Identical consecutive mappings land here, not at 0.
const SYMBOL_FLOOR: f32 = 0.3;
const ARCHETYPE_SHIFT: f32 = 0.2;
const VALENCE_WEIGHT: f32 = 0.5;
const AROUSAL_WEIGHT: f32 = 0.3;

/// Drift of `current` against the most recent entry of `previous`
/// (chronological order, newest last). 0.0 with no history, capped at 1.0.
pub fn calculate_drift(current: &SymbolicMapping, previous: &[SymbolicMapping]) -> f32 {
    let Some(latest) = previous.last() else {
        return 0.0;
    };

    let unrelated = current.primary_symbol != latest.primary_symbol
        && !latest.alternative_symbols.contains(&current.primary_symbol)
        && !current.alternative_symbols.contains(&latest.primary_symbol);
    let base = if unrelated { SYMBOL_SHIFT } else { SYMBOL_FLOOR };

    let archetype_drift = if current.archetype != latest.archetype { ARCHETYPE_SHIFT } else { 0.0 };

    let emotion_drift = VALENCE_WEIGHT * (current.valence - latest.valence).abs()
        + AROUSAL_WEIGHT * (current.arousal - latest.arousal).abs();

    (base + archetype_drift + emotion_drift).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Archetype;
    use chrono::Utc;

    fn mapping(symbol: &str, alts: &[&str], archetype: Archetype, valence: f32, arousal: f32) -> SymbolicMapping {
        SymbolicMapping {
            primary_symbol: symbol.into(),
            archetype,
            alternative_symbols: alts.iter().map(|s| (*s).to_owned()).collect(),
            valence,
            arousal,
            metaphors: vec![],
            confidence: 0.7,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn empty_history_is_zero() {
        let m = mapping("water", &[], Archetype::SelfArchetype, 0.0, 0.5);
        assert_eq!(calculate_drift(&m, &[]), 0.0);
    }

    #[test]
    fn identical_mapping_hits_floor() {
        let m = mapping("water", &["river"], Archetype::Shadow, -0.4, 0.6);
        assert_eq!(calculate_drift(&m, std::slice::from_ref(&m)), 0.3);
    }

    #[test]
    fn unrelated_symbol_and_archetype() {
        let prev = mapping("water", &["river"], Archetype::SelfArchetype, 0.0, 0.5);
        let cur = mapping("fire", &["ash"], Archetype::Destroyer, 0.0, 0.5);
        assert!((calculate_drift(&cur, &[prev]) - 0.9).abs() < 1e-6);
    }

    #[test]
    fn alternate_overlap_keeps_floor() {
        let prev = mapping("water", &["light"], Archetype::SelfArchetype, 0.0, 0.5);
        let cur = mapping("light", &[], Archetype::SelfArchetype, 0.0, 0.5);
        assert_eq!(calculate_drift(&cur, &[prev.clone()]), 0.3);
        // and the other direction
        let cur = mapping("fire", &["water"], Archetype::SelfArchetype, 0.0, 0.5);
        assert_eq!(calculate_drift(&cur, &[prev]), 0.3);
    }

    #[test]
    fn uses_latest_entry_only() {
        let old = mapping("fire", &[], Archetype::Hero, 0.9, 0.1);
        let latest = mapping("water", &[], Archetype::SelfArchetype, 0.0, 0.5);
        let cur = latest.clone();
        assert_eq!(calculate_drift(&cur, &[old, latest]), 0.3);
    }

    #[test]
    fn emotion_terms_and_cap() {
        let prev = mapping("water", &[], Archetype::SelfArchetype, 0.0, 0.5);
        let cur = mapping("water", &[], Archetype::SelfArchetype, -0.4, 0.7);
        // 0.3 + 0.5*0.4 + 0.3*0.2
        assert!((calculate_drift(&cur, &[prev.clone()]) - 0.56).abs() < 1e-6);
        let wild = mapping("abyss", &[], Archetype::Shadow, -1.0, 1.0);
        assert_eq!(calculate_drift(&wild, &[prev]), 1.0);
    }
}

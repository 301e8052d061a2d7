//! Deterministic keyword reading used when the collaborator is unavailable.
//!
//! Three symbol families are tested in fixed order (water, fire, path); the
//! first family with any whole-word hit fixes the primary symbol. Inside the
//! family, the first matching shift table adjusts archetype and affect.

use chrono::Utc;

use crate::config::VeluriaCfg;
use crate::text::tokenize;
use crate::types::{Archetype, Biomarkers, Metaphor, SymbolicMapping};

/// Alternates carried by every fallback reading, matched or not.
pub const DEFAULT_ALTERNATES: [&str; 3] = ["path", "light", "container"];
pub const DEFAULT_SYMBOL: &str = "water";
pub const DEFAULT_CONFIDENCE: f32 = 0.6;
pub const MATCHED_CONFIDENCE: f32 = 0.7;
const METAPHOR_CONFIDENCE: f32 = 0.6;
/// Arousal added per elevated biomarker reading.
const BIOMARKER_AROUSAL_NUDGE: f32 = 0.1;

#[derive(Debug, Clone, Copy)]
struct Reading {
    archetype: Archetype,
    valence: f32,
    arousal: f32,
}

struct Shift {
    words: &'static [&'static str],
    reading: Reading,
}

struct Family {
    symbol: &'static str,
    words: &'static [&'static str],
    base: Reading,
    shifts: &'static [Shift],
}

const FAMILIES: &[Family] = &[
    Family {
        symbol: "water",
        words: &[
            "water", "ocean", "sea", "river", "rain", "wave", "waves", "tide", "flood", "flooding",
            "drown", "drowning", "drowned", "sinking", "underwater", "flow", "flowing", "tears",
            "current",
        ],
        base: Reading { archetype: Archetype::SelfArchetype, valence: -0.1, arousal: 0.5 },
        shifts: &[
            Shift {
                words: &["drown", "drowning", "drowned", "sinking", "underwater", "flood", "flooding"],
                reading: Reading { archetype: Archetype::Shadow, valence: -0.8, arousal: 0.85 },
            },
            Shift {
                words: &["flow", "flowing", "current"],
                reading: Reading { archetype: Archetype::SelfArchetype, valence: 0.3, arousal: 0.4 },
            },
        ],
    },
    Family {
        symbol: "fire",
        words: &[
            "fire", "flame", "flames", "burn", "burning", "burned", "burnt", "blaze", "ash", "ashes",
            "smoke", "spark", "sparks", "ember", "embers", "inferno",
        ],
        base: Reading { archetype: Archetype::SelfArchetype, valence: 0.0, arousal: 0.7 },
        shifts: &[
            Shift {
                words: &["burn", "burning", "burned", "burnt", "inferno", "ash", "ashes"],
                reading: Reading { archetype: Archetype::Destroyer, valence: -0.6, arousal: 0.85 },
            },
            Shift {
                words: &["spark", "sparks", "ember", "embers"],
                reading: Reading { archetype: Archetype::Hero, valence: 0.4, arousal: 0.6 },
            },
        ],
    },
    Family {
        symbol: "path",
        words: &[
            "path", "road", "journey", "way", "lost", "maze", "bridge", "crossroads", "walk",
            "walking", "direction", "forward", "stuck",
        ],
        base: Reading { archetype: Archetype::Explorer, valence: 0.1, arousal: 0.4 },
        shifts: &[
            Shift {
                words: &["lost", "maze", "stuck", "crossroads"],
                reading: Reading { archetype: Archetype::Orphan, valence: -0.5, arousal: 0.6 },
            },
            Shift {
                words: &["journey", "forward", "bridge"],
                reading: Reading { archetype: Archetype::Explorer, valence: 0.4, arousal: 0.5 },
            },
        ],
    },
];

/// Build a mapping from keywords alone. Same inputs give the same fields
/// (the timestamp aside).
pub fn fallback_mapping(text: &str, biomarkers: Option<&Biomarkers>, cfg: &VeluriaCfg) -> SymbolicMapping {
    let tokens = tokenize(text);

    let matched = FAMILIES
        .iter()
        .find(|f| tokens.iter().any(|t| f.words.contains(&t.as_str())));

    let (primary_symbol, reading, metaphors, confidence) = match matched {
        Some(family) => {
            let reading = family
                .shifts
                .iter()
                .find(|s| tokens.iter().any(|t| s.words.contains(&t.as_str())))
                .map(|s| s.reading)
                .unwrap_or(family.base);
            let mut metaphors: Vec<Metaphor> = Vec::new();
            for token in tokens.iter().filter(|t| family.words.contains(&t.as_str())) {
                if metaphors.iter().all(|m| &m.source != token) {
                    metaphors.push(Metaphor {
                        source: token.clone(),
                        symbol: family.symbol.to_owned(),
                        confidence: METAPHOR_CONFIDENCE,
                    });
                }
            }
            (family.symbol, reading, metaphors, MATCHED_CONFIDENCE)
        }
        None => (
            DEFAULT_SYMBOL,
            Reading { archetype: Archetype::SelfArchetype, valence: 0.0, arousal: 0.5 },
            Vec::new(),
            DEFAULT_CONFIDENCE,
        ),
    };

    SymbolicMapping {
        primary_symbol: primary_symbol.to_owned(),
        archetype: reading.archetype,
        alternative_symbols: DEFAULT_ALTERNATES.iter().map(|s| (*s).to_owned()).collect(),
        valence: reading.valence,
        arousal: nudge_arousal(reading.arousal, biomarkers, cfg),
        metaphors,
        confidence,
        timestamp: Utc::now(),
    }
}

fn nudge_arousal(arousal: f32, biomarkers: Option<&Biomarkers>, cfg: &VeluriaCfg) -> f32 {
    let Some(b) = biomarkers else {
        return arousal;
    };
    let mut out = arousal;
    if b.galvanic_skin_response.is_some_and(|v| v > cfg.gsr_concerning) {
        out += BIOMARKER_AROUSAL_NUDGE;
    }
    if b.voice_tremor.is_some_and(|v| v > cfg.voice_tremor_concerning) {
        out += BIOMARKER_AROUSAL_NUDGE;
    }
    out.clamp(0.0, 1.0)
}

//! Fixed crisis lexicon and symbolic risk sets.

use crate::text::contains_phrase;
use crate::types::Archetype;

pub const HIGH_RISK_TERMS: &[&str] = &[
    "suicide",
    "suicidal",
    "kill myself",
    "end my life",
    "end it all",
    "want to die",
    "better off dead",
    "no reason to live",
    "self harm",
    "hurt myself",
    "take my own life",
];

pub const MEDIUM_RISK_TERMS: &[&str] = &[
    "hopeless",
    "worthless",
    "trapped",
    "unbearable",
    "can't go on",
    "give up",
    "empty",
    "burden",
    "numb",
    "pointless",
    "no way out",
];

/// Low-risk, "concerning" vocabulary.
pub const CONCERNING_TERMS: &[&str] = &[
    "sad",
    "tired",
    "lonely",
    "anxious",
    "stressed",
    "overwhelmed",
    "lost",
    "scared",
    "hurt",
    "crying",
    "exhausted",
    "alone",
];

pub const HIGH_RISK_ARCHETYPES: &[Archetype] = &[Archetype::Shadow, Archetype::Destroyer];
pub const MEDIUM_RISK_ARCHETYPES: &[Archetype] = &[Archetype::Orphan, Archetype::Trickster];

pub const HIGH_RISK_SYMBOLS: &[&str] = &["abyss", "void", "darkness", "drowning", "noose", "grave", "blade"];
pub const MEDIUM_RISK_SYMBOLS: &[&str] = &["storm", "flood", "fire", "cage", "maze", "wall", "ash", "fog"];

/// Severity of a symbol or archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    High,
    Medium,
    Neutral,
}

pub fn archetype_tier(archetype: Archetype) -> Tier {
    if HIGH_RISK_ARCHETYPES.contains(&archetype) {
        Tier::High
    } else if MEDIUM_RISK_ARCHETYPES.contains(&archetype) {
        Tier::Medium
    } else {
        Tier::Neutral
    }
}

pub fn symbol_tier(symbol: &str) -> Tier {
    let symbol = symbol.trim().to_lowercase();
    if HIGH_RISK_SYMBOLS.contains(&symbol.as_str()) {
        Tier::High
    } else if MEDIUM_RISK_SYMBOLS.contains(&symbol.as_str()) {
        Tier::Medium
    } else {
        Tier::Neutral
    }
}

/// Terms from `terms` present in `tokens` as whole words, in table order.
pub fn matches<'a>(tokens: &[String], terms: &[&'a str]) -> Vec<&'a str> {
    terms.iter().copied().filter(|t| contains_phrase(tokens, t)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::tokenize;

    #[test]
    fn tiers() {
        assert_eq!(archetype_tier(Archetype::Shadow), Tier::High);
        assert_eq!(archetype_tier(Archetype::Orphan), Tier::Medium);
        assert_eq!(archetype_tier(Archetype::Hero), Tier::Neutral);
        assert_eq!(symbol_tier("Abyss"), Tier::High);
        assert_eq!(symbol_tier("fire"), Tier::Medium);
        assert_eq!(symbol_tier("water"), Tier::Neutral);
    }

    #[test]
    fn hyphenated_terms_match_split_text() {
        let tokens = tokenize("thinking about self-harm again");
        assert_eq!(matches(&tokens, HIGH_RISK_TERMS), vec!["self harm"]);
    }

    #[test]
    fn sets_do_not_overlap_on_plain_phrases() {
        let tokens = tokenize("I want to kill myself");
        assert_eq!(matches(&tokens, HIGH_RISK_TERMS).len(), 1);
        assert_eq!(matches(&tokens, MEDIUM_RISK_TERMS).len(), 0);
        assert_eq!(matches(&tokens, CONCERNING_TERMS).len(), 0);
    }
}

//! Symbolic extraction: raw text to a metaphor/archetype mapping, and drift
//! between successive mappings of one user.

pub mod drift;
pub mod extractor;
pub mod fallback;
pub mod prompt;

pub use drift::calculate_drift;
pub use extractor::{parse_mapping, ExtractionError, MalformedReason, SymbolicExtractor};
pub use fallback::fallback_mapping;

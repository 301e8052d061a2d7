//! Risk evaluation: symbolic, lexical and biomarker components summed into a
//! score and thresholded into a discrete level.

pub mod evaluator;
pub mod lexicon;

pub use evaluator::{biomarker_risk, level_for, lexical_risk, metaphor_risk, recommended_actions, RiskEvaluator};

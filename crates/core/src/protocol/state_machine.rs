use crate::types::{InvalidRiskLevel, RiskLevel, VeluriaState};

/// Escalate immediately, de-escalate one rung per evaluation.
///
/// - level 3 → LEVEL_3 from anywhere
/// - level 2 → LEVEL_2, unless already LEVEL_3
/// - level 1 → LEVEL_1, unless already LEVEL_2 or LEVEL_3
/// - level 0 → one rung down; SAFE and MONITORING go to SAFE
pub fn next_state(current: VeluriaState, requested: RiskLevel) -> VeluriaState {
    use VeluriaState::*;
    match requested {
        RiskLevel::Critical => Level3,
        RiskLevel::Elevated => match current {
            Level3 => Level3,
            _ => Level2,
        },
        RiskLevel::Low => match current {
            Level2 | Level3 => current,
            _ => Level1,
        },
        RiskLevel::None => match current {
            Level3 => Level2,
            Level2 => Level1,
            Level1 | Safe | Monitoring => Safe,
        },
    }
}

/// [`next_state`] for callers holding a raw level integer.
/// Values outside 0..=3 are rejected rather than guessed at.
pub fn next_state_checked(current: VeluriaState, requested: u8) -> Result<VeluriaState, InvalidRiskLevel> {
    let level = RiskLevel::try_from(requested)?;
    Ok(next_state(current, level))
}

/// Actions and resources dispatched for a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionPlan {
    pub actions: &'static [&'static str],
    pub resources: &'static [&'static str],
}

pub fn plan_for(state: VeluriaState) -> ActionPlan {
    match state {
        VeluriaState::Level1 => ActionPlan {
            actions: &["symbolic_grounding", "emotional_acknowledgment"],
            resources: &["grounding_techniques", "alternative_perspectives", "symbolic_reflection"],
        },
        VeluriaState::Level2 => ActionPlan {
            actions: &[
                "safety_resources_provided",
                "grounding_techniques_suggested",
                "support_options_presented",
            ],
            resources: &["crisis_text_line", "breathing_exercises", "local_support_options", "self_care_strategies"],
        },
        VeluriaState::Level3 => ActionPlan {
            actions: &[
                "crisis_team_notification",
                "emergency_resources_provided",
                "continued_support_during_transition",
            ],
            resources: &[
                "crisis_hotline_information",
                "emergency_services_contact",
                "immediate_professional_support_options",
                "safety_planning_resources",
            ],
        },
        VeluriaState::Safe | VeluriaState::Monitoring => ActionPlan { actions: &[], resources: &[] },
    }
}

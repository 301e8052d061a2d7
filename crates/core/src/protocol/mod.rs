//! Per-user intervention protocol: a hysteretic state machine over
//! [`VeluriaState`](crate::types::VeluriaState) with graduated actions and a
//! fallible crisis-notification side effect.

pub mod intervention;
pub mod notifier;
pub mod state_machine;
pub mod store;

pub use intervention::{InterventionProtocol, NOTIFICATION_FAILED, NOTIFICATION_SENT};
pub use notifier::{build_notice, CrisisNotifier, LoggingNotifier, NoopNotifier, NotifyError};
pub use state_machine::{next_state, next_state_checked, plan_for, ActionPlan};
pub use store::{StateStore, UserLedger};

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::types::{InterventionRecord, VeluriaState};

/// One user's current state plus append-only history.
#[derive(Debug, Default)]
pub struct UserLedger {
    state: VeluriaState,
    history: Vec<InterventionRecord>,
}

impl UserLedger {
    pub fn state(&self) -> VeluriaState {
        self.state
    }

    pub fn history(&self) -> &[InterventionRecord] {
        &self.history
    }

    /// Append a record and adopt its `state_after` as the current state.
    pub fn append(&mut self, record: InterventionRecord) {
        self.state = record.state_after;
        self.history.push(record);
    }

    /// Add an action tag to an already-appended record. Returns the updated
    /// record, or `None` if no record has that id.
    pub fn tag_action(&mut self, record_id: Uuid, action: &str) -> Option<&InterventionRecord> {
        let record = self.history.iter_mut().rev().find(|r| r.id == record_id)?;
        record.actions_taken.push(action.to_owned());
        Some(record)
    }

    /// Administrative override. History is kept.
    pub fn force_state(&mut self, state: VeluriaState) -> VeluriaState {
        std::mem::replace(&mut self.state, state)
    }
}

pub type LedgerSlot = Arc<Mutex<UserLedger>>;

/// Keyed per-user ledgers. Each user has their own FIFO async lock, so
/// updates for one user apply in arrival order while other users proceed
/// in parallel. Map shard guards are never held across an await.
#[derive(Debug, Default)]
pub struct StateStore {
    users: DashMap<String, LedgerSlot>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger for `user_id`, created at SAFE on first use.
    pub fn slot(&self, user_id: &str) -> LedgerSlot {
        if let Some(slot) = self.users.get(user_id) {
            return slot.value().clone();
        }
        self.users.entry(user_id.to_owned()).or_default().value().clone()
    }

    /// Ledger for `user_id` if one exists; never creates.
    pub fn existing(&self, user_id: &str) -> Option<LedgerSlot> {
        self.users.get(user_id).map(|slot| slot.value().clone())
    }

    /// Number of users with a ledger.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

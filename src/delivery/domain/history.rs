//! Append-only status history records.

use super::{Actor, DeliveryRequestId, DeliveryState, HistoryEntryId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded status change of a delivery request.
///
/// Entries are never mutated once recorded. The creation event carries no
/// previous state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    id: HistoryEntryId,
    request_id: DeliveryRequestId,
    previous_state: Option<DeliveryState>,
    new_state: DeliveryState,
    actor: Actor,
    reason: Option<String>,
    recorded_at: DateTime<Utc>,
}

impl StatusHistoryEntry {
    /// Records a status change with a fresh identifier.
    #[must_use]
    pub fn record(
        request_id: DeliveryRequestId,
        previous_state: Option<DeliveryState>,
        new_state: DeliveryState,
        actor: Actor,
        reason: Option<String>,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: HistoryEntryId::new(),
            request_id,
            previous_state,
            new_state,
            actor,
            reason: reason.filter(|text| !text.trim().is_empty()),
            recorded_at,
        }
    }

    /// Replaces the identifier; used when reconstructing stored rows.
    #[must_use]
    pub const fn with_id(mut self, id: HistoryEntryId) -> Self {
        self.id = id;
        self
    }

    /// Returns the entry identifier.
    #[must_use]
    pub const fn id(&self) -> HistoryEntryId {
        self.id
    }

    /// Returns the owning request.
    #[must_use]
    pub const fn request_id(&self) -> DeliveryRequestId {
        self.request_id
    }

    /// Returns the state before the change; `None` for creation.
    #[must_use]
    pub const fn previous_state(&self) -> Option<DeliveryState> {
        self.previous_state
    }

    /// Returns the state after the change.
    #[must_use]
    pub const fn new_state(&self) -> DeliveryState {
        self.new_state
    }

    /// Returns who made the change.
    #[must_use]
    pub const fn actor(&self) -> &Actor {
        &self.actor
    }

    /// Returns the recorded reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Returns when the change was recorded.
    #[must_use]
    pub const fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
}

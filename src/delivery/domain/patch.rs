//! Partial field set written by a single transition.

use super::{
    DeliveryConfirmation, DeliveryPreferences, DeliveryState, Destination, FailureReason, FileRef,
    PrintBatchId, StaffMember,
};
use chrono::{DateTime, Utc};

/// Fields a transition changes; `None` leaves the stored value untouched.
///
/// Nested `Option`s distinguish "leave as is" (`None`) from "clear"
/// (`Some(None)`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryPatch {
    /// New lifecycle state.
    pub state: DeliveryState,
    /// Failure reason to store or clear.
    pub failure_reason: Option<Option<FailureReason>>,
    /// New failed-attempt count.
    pub failed_attempts: Option<u32>,
    /// Print batch to link.
    pub print_batch_id: Option<PrintBatchId>,
    /// Replacement destination.
    pub destination: Option<Destination>,
    /// Replacement scheduling preferences.
    pub preferences: Option<DeliveryPreferences>,
    /// Replacement photo.
    pub updated_photo: Option<FileRef>,
    /// Staff assignment.
    pub assigned_staff: Option<StaffMember>,
    /// Self-confirmation evidence.
    pub confirmation: Option<DeliveryConfirmation>,
    /// Sent-to-print milestone.
    pub sent_to_print_at: Option<DateTime<Utc>>,
    /// Printed milestone.
    pub printed_at: Option<DateTime<Utc>>,
    /// Dispatch milestone to stamp or clear.
    pub out_for_delivery_at: Option<Option<DateTime<Utc>>>,
    /// Delivered milestone.
    pub delivered_at: Option<DateTime<Utc>>,
    /// Update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl DeliveryPatch {
    /// Creates a patch that only moves the state and touches `updated_at`.
    #[must_use]
    pub const fn new(state: DeliveryState, at: DateTime<Utc>) -> Self {
        Self {
            state,
            failure_reason: None,
            failed_attempts: None,
            print_batch_id: None,
            destination: None,
            preferences: None,
            updated_photo: None,
            assigned_staff: None,
            confirmation: None,
            sent_to_print_at: None,
            printed_at: None,
            out_for_delivery_at: None,
            delivered_at: None,
            updated_at: at,
        }
    }

    /// Clears the failure reason and the previous dispatch stamp so the
    /// request re-enters the dispatch queue.
    #[must_use]
    pub const fn rolled_back_to_dispatch_queue(mut self) -> Self {
        self.failure_reason = Some(None);
        self.out_for_delivery_at = Some(None);
        self
    }
}

//! Delivery request aggregate root.

use super::{
    CardId, DeliveryConfirmation, DeliveryPatch, DeliveryPreferences, DeliveryRequestId,
    DeliveryState, DeliveryType, Destination, FailureReason, FileRef, PrintBatchId, ResidentId,
    Revision, ServiceAreaCode, StaffMember,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Transition timestamps, each stamped when its milestone is reached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestones {
    /// When the request was queued for printing.
    pub sent_to_print_at: Option<DateTime<Utc>>,
    /// When the card came off the printer.
    pub printed_at: Option<DateTime<Utc>>,
    /// When the latest courier run left with the card.
    pub out_for_delivery_at: Option<DateTime<Utc>>,
    /// When the card was delivered.
    pub delivered_at: Option<DateTime<Utc>>,
}

/// Validated input for a new delivery request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryRequestDraft {
    /// Card being delivered.
    pub card_id: CardId,
    /// Owning resident.
    pub owner_id: ResidentId,
    /// Routing key.
    pub service_area_code: ServiceAreaCode,
    /// Courier address or office pickup.
    pub destination: Destination,
    /// Scheduling preferences.
    pub preferences: DeliveryPreferences,
    /// Replacement photo supplied with the request.
    pub updated_photo: Option<FileRef>,
}

/// One physical-card delivery job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRequest {
    id: DeliveryRequestId,
    card_id: CardId,
    owner_id: ResidentId,
    service_area_code: ServiceAreaCode,
    destination: Destination,
    preferences: DeliveryPreferences,
    state: DeliveryState,
    failure_reason: Option<FailureReason>,
    failed_attempts: u32,
    updated_photo: Option<FileRef>,
    confirmation: Option<DeliveryConfirmation>,
    assigned_staff: Option<StaffMember>,
    print_batch_id: Option<PrintBatchId>,
    milestones: Milestones,
    revision: Revision,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted delivery request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedDeliveryData {
    /// Persisted identifier.
    pub id: DeliveryRequestId,
    /// Persisted card reference.
    pub card_id: CardId,
    /// Persisted owner reference.
    pub owner_id: ResidentId,
    /// Persisted service-area code.
    pub service_area_code: ServiceAreaCode,
    /// Persisted destination.
    pub destination: Destination,
    /// Persisted preferences.
    pub preferences: DeliveryPreferences,
    /// Persisted lifecycle state.
    pub state: DeliveryState,
    /// Persisted latest failure reason.
    pub failure_reason: Option<FailureReason>,
    /// Persisted failed courier attempt count.
    pub failed_attempts: u32,
    /// Persisted replacement photo.
    pub updated_photo: Option<FileRef>,
    /// Persisted confirmation evidence.
    pub confirmation: Option<DeliveryConfirmation>,
    /// Persisted staff assignment.
    pub assigned_staff: Option<StaffMember>,
    /// Persisted print batch link.
    pub print_batch_id: Option<PrintBatchId>,
    /// Persisted milestone timestamps.
    pub milestones: Milestones,
    /// Persisted row revision.
    pub revision: Revision,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl DeliveryRequest {
    /// Creates a new request in state [`DeliveryState::Requested`].
    #[must_use]
    pub fn new(draft: DeliveryRequestDraft, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: DeliveryRequestId::new(),
            card_id: draft.card_id,
            owner_id: draft.owner_id,
            service_area_code: draft.service_area_code,
            destination: draft.destination,
            preferences: draft.preferences,
            state: DeliveryState::Requested,
            failure_reason: None,
            failed_attempts: 0,
            updated_photo: draft.updated_photo,
            confirmation: None,
            assigned_staff: None,
            print_batch_id: None,
            milestones: Milestones::default(),
            revision: Revision::INITIAL,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Reconstructs a request from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedDeliveryData) -> Self {
        Self {
            id: data.id,
            card_id: data.card_id,
            owner_id: data.owner_id,
            service_area_code: data.service_area_code,
            destination: data.destination,
            preferences: data.preferences,
            state: data.state,
            failure_reason: data.failure_reason,
            failed_attempts: data.failed_attempts,
            updated_photo: data.updated_photo,
            confirmation: data.confirmation,
            assigned_staff: data.assigned_staff,
            print_batch_id: data.print_batch_id,
            milestones: data.milestones,
            revision: data.revision,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the request identifier.
    #[must_use]
    pub const fn id(&self) -> DeliveryRequestId {
        self.id
    }

    /// Returns the card identifier.
    #[must_use]
    pub const fn card_id(&self) -> CardId {
        self.card_id
    }

    /// Returns the owning resident.
    #[must_use]
    pub const fn owner_id(&self) -> ResidentId {
        self.owner_id
    }

    /// Returns the service-area code.
    #[must_use]
    pub const fn service_area_code(&self) -> &ServiceAreaCode {
        &self.service_area_code
    }

    /// Returns the destination.
    #[must_use]
    pub const fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Returns the delivery type.
    #[must_use]
    pub const fn delivery_type(&self) -> DeliveryType {
        self.destination.delivery_type()
    }

    /// Returns the scheduling preferences.
    #[must_use]
    pub const fn preferences(&self) -> &DeliveryPreferences {
        &self.preferences
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> DeliveryState {
        self.state
    }

    /// Returns the latest failure reason.
    #[must_use]
    pub const fn failure_reason(&self) -> Option<FailureReason> {
        self.failure_reason
    }

    /// Returns how many courier attempts have failed.
    #[must_use]
    pub const fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    /// Returns the replacement photo, if any.
    #[must_use]
    pub const fn updated_photo(&self) -> Option<&FileRef> {
        self.updated_photo.as_ref()
    }

    /// Returns the self-confirmation evidence, if any.
    #[must_use]
    pub const fn confirmation(&self) -> Option<&DeliveryConfirmation> {
        self.confirmation.as_ref()
    }

    /// Returns the assigned staff member, if any.
    #[must_use]
    pub const fn assigned_staff(&self) -> Option<&StaffMember> {
        self.assigned_staff.as_ref()
    }

    /// Returns the print batch link, if any.
    #[must_use]
    pub const fn print_batch_id(&self) -> Option<PrintBatchId> {
        self.print_batch_id
    }

    /// Returns the milestone timestamps.
    #[must_use]
    pub const fn milestones(&self) -> &Milestones {
        &self.milestones
    }

    /// Returns the row revision.
    #[must_use]
    pub const fn revision(&self) -> Revision {
        self.revision
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns a copy with `patch` applied and the revision advanced.
    ///
    /// Gateways call this after their conditional check passes so that
    /// every adapter materializes updates identically.
    #[must_use]
    pub fn patched(&self, patch: &DeliveryPatch) -> Self {
        let mut next = self.clone();
        next.state = patch.state;
        if let Some(reason) = patch.failure_reason {
            next.failure_reason = reason;
        }
        if let Some(attempts) = patch.failed_attempts {
            next.failed_attempts = attempts;
        }
        if let Some(batch_id) = patch.print_batch_id {
            next.print_batch_id = Some(batch_id);
        }
        if let Some(destination) = &patch.destination {
            next.destination = destination.clone();
        }
        if let Some(preferences) = &patch.preferences {
            next.preferences = preferences.clone();
        }
        if let Some(photo) = &patch.updated_photo {
            next.updated_photo = Some(photo.clone());
        }
        if let Some(staff) = &patch.assigned_staff {
            next.assigned_staff = Some(staff.clone());
        }
        if let Some(confirmation) = &patch.confirmation {
            next.confirmation = Some(confirmation.clone());
        }
        stamp_once(&mut next.milestones.sent_to_print_at, patch.sent_to_print_at);
        stamp_once(&mut next.milestones.printed_at, patch.printed_at);
        stamp_once(&mut next.milestones.delivered_at, patch.delivered_at);
        if let Some(dispatched) = patch.out_for_delivery_at {
            next.milestones.out_for_delivery_at = dispatched;
        }
        next.revision = self.revision.next();
        next.updated_at = patch.updated_at;
        next
    }
}

/// Sets a milestone only if it has not been reached before.
fn stamp_once(field: &mut Option<DateTime<Utc>>, value: Option<DateTime<Utc>>) {
    if field.is_none() {
        *field = value;
    }
}

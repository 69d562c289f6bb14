//! Domain model for ID-card delivery.
//!
//! Everything here is pure: the request aggregate, the value types it is
//! built from, the audit record, and the lifecycle engine that decides
//! transitions. Storage and clocks stay outside this boundary except for
//! the [`mockable::Clock`] used to stamp creation.

mod actor;
mod destination;
mod engine;
mod error;
mod history;
mod ids;
mod patch;
mod request;
mod state;

pub use actor::{Actor, StaffMember};
pub use destination::{
    Address, AddressInput, DeliveryConfirmation, DeliveryEvidence, DeliveryPreferences,
    Destination, FileRef, StreetCorrection,
};
pub use engine::{
    DeliveryStateMachine, EscalationPolicy, Planned, TransitionCommand, TransitionPlan, Trigger,
    TriggerKind,
};
pub use error::{
    DeliveryDomainError, DeliveryValidationError, InvalidTransition, ParseDeliveryValueError,
    TransitionGuard,
};
pub use history::StatusHistoryEntry;
pub use ids::{
    CardId, DeliveryRequestId, HistoryEntryId, PrintBatchId, ResidentId, Revision,
    ServiceAreaCode,
};
pub use patch::DeliveryPatch;
pub use request::{DeliveryRequest, DeliveryRequestDraft, Milestones, PersistedDeliveryData};
pub use state::{DeliveryState, DeliveryType, FailureReason, TimeSlot};

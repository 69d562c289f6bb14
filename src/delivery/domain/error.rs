//! Error types for delivery domain validation, parsing, and transitions.

use super::{DeliveryRequestId, DeliveryState, TriggerKind};
use thiserror::Error;

/// Caller-supplied input that is incomplete or inconsistent.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryValidationError {
    /// A courier delivery is missing a required address field.
    #[error("courier delivery requires a non-empty {0}")]
    MissingAddressField(&'static str),

    /// A courier delivery was requested without any address.
    #[error("courier delivery requires a destination address")]
    MissingAddress,

    /// The service-area code is empty after trimming.
    #[error("service area code must not be empty")]
    EmptyServiceAreaCode,

    /// The staff identity is empty after trimming.
    #[error("staff identity must not be empty")]
    MissingActor,

    /// An evidence or photo reference is empty after trimming.
    #[error("{0} reference must not be empty")]
    EmptyReference(&'static str),

    /// A reschedule did not name a new preferred date.
    #[error("reschedule requires a preferred date")]
    MissingPreferredDate,

    /// The actor may not perform the requested trigger.
    #[error("{actor} may not {trigger}")]
    ActorNotPermitted {
        /// Actor role in canonical form.
        actor: &'static str,
        /// Rejected trigger.
        trigger: TriggerKind,
    },
}

/// Guard condition that blocked an otherwise reachable transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionGuard {
    /// Rescheduling requires the stored failure reason to be `not_home`.
    RescheduleRequiresNotHome,
    /// Address correction requires the stored failure reason to be
    /// `wrong_address`.
    AddressUpdateRequiresWrongAddress,
    /// Office-pickup requests never leave with a courier.
    PickupNotDispatchable,
}

impl std::fmt::Display for TransitionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::RescheduleRequiresNotHome => "reschedule requires failure reason not_home",
            Self::AddressUpdateRequiresWrongAddress => {
                "address update requires failure reason wrong_address"
            }
            Self::PickupNotDispatchable => "office pickup requests cannot be dispatched",
        };
        f.write_str(text)
    }
}

/// The trigger is not legal from the request's current state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot {trigger} delivery request {request_id} in state {from}{}", guard_suffix(.guard))]
pub struct InvalidTransition {
    /// Request the trigger was applied to.
    pub request_id: DeliveryRequestId,
    /// State the request was in.
    pub from: DeliveryState,
    /// Rejected trigger.
    pub trigger: TriggerKind,
    /// Guard that failed, when the state alone would have allowed it.
    pub guard: Option<TransitionGuard>,
}

fn guard_suffix(guard: &Option<TransitionGuard>) -> String {
    guard.map(|g| format!(" ({g})")).unwrap_or_default()
}

/// Errors produced by the pure delivery domain.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryDomainError {
    /// Input validation failed.
    #[error(transparent)]
    Validation(#[from] DeliveryValidationError),

    /// The requested transition is not legal.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

/// Error returned while parsing persisted enum values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct ParseDeliveryValueError {
    /// Kind of value being parsed.
    pub kind: &'static str,
    /// Raw input.
    pub value: String,
}

impl ParseDeliveryValueError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

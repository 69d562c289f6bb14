//! Closed enumerations for delivery lifecycle state and its qualifiers.

use super::ParseDeliveryValueError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a physical card delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    /// The resident has requested the card.
    Requested,
    /// The card has been queued for a print run.
    Printing,
    /// The card is printed and waiting for dispatch.
    Printed,
    /// A courier is carrying the card.
    OutForDelivery,
    /// The card reached the resident.
    Delivered,
    /// The latest courier attempt failed.
    DeliveryFailed,
    /// Courier attempts are exhausted; the resident must collect in person.
    PickupRequired,
}

impl DeliveryState {
    /// Every state, in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::Requested,
        Self::Printing,
        Self::Printed,
        Self::OutForDelivery,
        Self::Delivered,
        Self::DeliveryFailed,
        Self::PickupRequired,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Printing => "printing",
            Self::Printed => "printed",
            Self::OutForDelivery => "out_for_delivery",
            Self::Delivered => "delivered",
            Self::DeliveryFailed => "delivery_failed",
            Self::PickupRequired => "pickup_required",
        }
    }

    /// Returns whether the engine offers no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered)
    }

    /// Returns whether a failure reason is carried in this state.
    #[must_use]
    pub const fn carries_failure(self) -> bool {
        matches!(self, Self::DeliveryFailed | Self::PickupRequired)
    }

    /// Returns whether the lifecycle graph has an edge to `target`.
    ///
    /// Guards (failure reason, actor, destination type) are evaluated by
    /// the state machine on top of this graph.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Requested, Self::Printing)
                | (Self::Printing, Self::Printed)
                | (Self::Printed, Self::OutForDelivery)
                | (
                    Self::OutForDelivery,
                    Self::Delivered | Self::DeliveryFailed | Self::PickupRequired
                )
                | (Self::DeliveryFailed | Self::PickupRequired, Self::Printed)
        )
    }
}

impl fmt::Display for DeliveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for DeliveryState {
    type Error = ParseDeliveryValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == normalized)
            .ok_or_else(|| ParseDeliveryValueError::new("delivery state", value))
    }
}

/// Reason a courier attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Nobody was present to receive the card.
    NotHome,
    /// The address could not be found or was incorrect.
    WrongAddress,
    /// The recipient refused the delivery.
    Refused,
}

impl FailureReason {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotHome => "not_home",
            Self::WrongAddress => "wrong_address",
            Self::Refused => "refused",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for FailureReason {
    type Error = ParseDeliveryValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "not_home" => Ok(Self::NotHome),
            "wrong_address" => Ok(Self::WrongAddress),
            "refused" => Ok(Self::Refused),
            _ => Err(ParseDeliveryValueError::new("failure reason", value)),
        }
    }
}

/// Preferred delivery window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSlot {
    /// Morning window.
    Morning,
    /// Afternoon window.
    Afternoon,
    /// Evening window.
    Evening,
}

impl TimeSlot {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
        }
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TimeSlot {
    type Error = ParseDeliveryValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "morning" => Ok(Self::Morning),
            "afternoon" => Ok(Self::Afternoon),
            "evening" => Ok(Self::Evening),
            _ => Err(ParseDeliveryValueError::new("time slot", value)),
        }
    }
}

/// How the card reaches the resident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryType {
    /// A courier brings the card to an address.
    Delivery,
    /// The resident collects the card at the office.
    Pickup,
}

impl DeliveryType {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Delivery => "delivery",
            Self::Pickup => "pickup",
        }
    }
}

impl fmt::Display for DeliveryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for DeliveryType {
    type Error = ParseDeliveryValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "delivery" => Ok(Self::Delivery),
            "pickup" => Ok(Self::Pickup),
            _ => Err(ParseDeliveryValueError::new("delivery type", value)),
        }
    }
}

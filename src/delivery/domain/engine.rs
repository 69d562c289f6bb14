//! Pure transition logic for the delivery lifecycle.
//!
//! ```text
//! requested -> printing -> printed -> out_for_delivery -> delivered
//!                             ^              |
//!                             |              v
//!                             +---- delivery_failed / pickup_required
//! ```
//!
//! The engine never touches storage. Given a request snapshot and a
//! command it either rejects the command or returns the patch and audit
//! entry the caller must persist together.

use super::{
    Actor, DeliveryDomainError, DeliveryEvidence, DeliveryPatch, DeliveryPreferences,
    DeliveryRequest, DeliveryState, DeliveryType, DeliveryValidationError, Destination,
    FailureReason, FileRef, InvalidTransition, PrintBatchId, ResidentId, StaffMember,
    StatusHistoryEntry, StreetCorrection, TransitionGuard,
};
use chrono::{DateTime, Utc};
use std::fmt;

/// A requested lifecycle change together with its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Queue the card for printing, optionally as part of a batch.
    SendToPrint {
        /// Print run the request joins.
        batch_id: Option<PrintBatchId>,
    },
    /// The card came off the printer.
    MarkPrinted,
    /// A courier left with the card.
    Dispatch,
    /// Staff record the handover.
    MarkDelivered,
    /// The resident confirms receipt with evidence.
    ConfirmDelivery(DeliveryEvidence),
    /// The courier could not complete the handover.
    MarkFailed(FailureReason),
    /// The resident picks a new date after a `not_home` failure.
    Reschedule(DeliveryPreferences),
    /// The resident corrects the street after a `wrong_address` failure.
    UpdateAddress(StreetCorrection),
    /// Staff put an escalated request back into the dispatch queue.
    RetryFromPickup,
    /// Staff take ownership of the request.
    AssignStaff(StaffMember),
    /// The resident supplies a new photo before printing.
    UpdatePhoto(FileRef),
}

impl Trigger {
    /// Returns the payload-free discriminator.
    #[must_use]
    pub const fn kind(&self) -> TriggerKind {
        match self {
            Self::SendToPrint { .. } => TriggerKind::SendToPrint,
            Self::MarkPrinted => TriggerKind::MarkPrinted,
            Self::Dispatch => TriggerKind::Dispatch,
            Self::MarkDelivered => TriggerKind::MarkDelivered,
            Self::ConfirmDelivery(_) => TriggerKind::ConfirmDelivery,
            Self::MarkFailed(_) => TriggerKind::MarkFailed,
            Self::Reschedule(_) => TriggerKind::Reschedule,
            Self::UpdateAddress(_) => TriggerKind::UpdateAddress,
            Self::RetryFromPickup => TriggerKind::RetryFromPickup,
            Self::AssignStaff(_) => TriggerKind::AssignStaff,
            Self::UpdatePhoto(_) => TriggerKind::UpdatePhoto,
        }
    }
}

/// Payload-free trigger discriminator used in errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    /// See [`Trigger::SendToPrint`].
    SendToPrint,
    /// See [`Trigger::MarkPrinted`].
    MarkPrinted,
    /// See [`Trigger::Dispatch`].
    Dispatch,
    /// See [`Trigger::MarkDelivered`].
    MarkDelivered,
    /// See [`Trigger::ConfirmDelivery`].
    ConfirmDelivery,
    /// See [`Trigger::MarkFailed`].
    MarkFailed,
    /// See [`Trigger::Reschedule`].
    Reschedule,
    /// See [`Trigger::UpdateAddress`].
    UpdateAddress,
    /// See [`Trigger::RetryFromPickup`].
    RetryFromPickup,
    /// See [`Trigger::AssignStaff`].
    AssignStaff,
    /// See [`Trigger::UpdatePhoto`].
    UpdatePhoto,
}

impl TriggerKind {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SendToPrint => "send_to_print",
            Self::MarkPrinted => "mark_printed",
            Self::Dispatch => "dispatch",
            Self::MarkDelivered => "mark_delivered",
            Self::ConfirmDelivery => "confirm_delivery",
            Self::MarkFailed => "mark_failed",
            Self::Reschedule => "reschedule",
            Self::UpdateAddress => "update_address",
            Self::RetryFromPickup => "retry_from_pickup",
            Self::AssignStaff => "assign_staff",
            Self::UpdatePhoto => "update_photo",
        }
    }

    /// Returns whether `actor` may fire this trigger on a request owned by
    /// `owner`.
    ///
    /// Receipt confirmation belongs to the owner alone; schedule, address,
    /// and photo changes may also be entered by staff on the owner's
    /// behalf; everything else is staff-only.
    #[must_use]
    pub fn permits(self, actor: &Actor, owner: ResidentId) -> bool {
        match self {
            Self::ConfirmDelivery => actor.is_resident(owner),
            Self::Reschedule | Self::UpdateAddress | Self::UpdatePhoto => {
                actor.is_staff() || actor.is_resident(owner)
            }
            Self::SendToPrint
            | Self::MarkPrinted
            | Self::Dispatch
            | Self::MarkDelivered
            | Self::MarkFailed
            | Self::RetryFromPickup
            | Self::AssignStaff => actor.is_staff(),
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A trigger as submitted by a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionCommand {
    /// Requested change.
    pub trigger: Trigger,
    /// Who requested it.
    pub actor: Actor,
    /// Free-text note recorded in the audit entry.
    pub note: Option<String>,
}

impl TransitionCommand {
    /// Creates a command without a note.
    #[must_use]
    pub const fn new(trigger: Trigger, actor: Actor) -> Self {
        Self {
            trigger,
            actor,
            note: None,
        }
    }

    /// Attaches a note for the audit trail.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Courier-attempt limit after which office pickup is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscalationPolicy {
    /// Failed attempts at which the request escalates to pickup.
    pub max_courier_attempts: u32,
}

impl EscalationPolicy {
    /// Returns the state a failure lands in once the count reaches
    /// `attempts_after_failure`.
    #[must_use]
    pub const fn state_after_failure(self, attempts_after_failure: u32) -> DeliveryState {
        if attempts_after_failure >= self.max_courier_attempts {
            DeliveryState::PickupRequired
        } else {
            DeliveryState::DeliveryFailed
        }
    }
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            max_courier_attempts: 2,
        }
    }
}

/// Everything the caller must persist for an accepted command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPlan {
    /// Trigger that produced the plan.
    pub trigger: TriggerKind,
    /// State before the change.
    pub from: DeliveryState,
    /// State after the change.
    pub to: DeliveryState,
    /// Field updates to write.
    pub patch: DeliveryPatch,
    /// Audit entry to append alongside the update.
    pub audit: StatusHistoryEntry,
}

/// Result of planning a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Planned {
    /// The command changes the request.
    Transition(Box<TransitionPlan>),
    /// Receipt was already confirmed; nothing to write.
    AlreadyConfirmed,
}

/// Stateless delivery lifecycle engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStateMachine {
    policy: EscalationPolicy,
}

struct Step {
    to: DeliveryState,
    patch: DeliveryPatch,
    reason: Option<String>,
}

impl DeliveryStateMachine {
    /// Creates an engine with the given escalation policy.
    #[must_use]
    pub const fn new(policy: EscalationPolicy) -> Self {
        Self { policy }
    }

    /// Returns the escalation policy.
    #[must_use]
    pub const fn policy(&self) -> EscalationPolicy {
        self.policy
    }

    /// Decides the outcome of `command` against `request`.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryDomainError::Validation`] when the actor may not
    /// fire the trigger or its payload is incomplete, and
    /// [`DeliveryDomainError::InvalidTransition`] when the current state or
    /// a guard condition forbids it.
    pub fn plan(
        &self,
        request: &DeliveryRequest,
        command: &TransitionCommand,
        at: DateTime<Utc>,
    ) -> Result<Planned, DeliveryDomainError> {
        let kind = command.trigger.kind();
        if !kind.permits(&command.actor, request.owner_id()) {
            return Err(DeliveryValidationError::ActorNotPermitted {
                actor: command.actor.role(),
                trigger: kind,
            }
            .into());
        }

        if request.state() == DeliveryState::Delivered
            && matches!(command.trigger, Trigger::ConfirmDelivery(_))
        {
            return Ok(Planned::AlreadyConfirmed);
        }

        let step = self.step(request, &command.trigger, at)?;
        debug_assert!(
            step.to == request.state() || request.state().can_transition_to(step.to),
            "engine produced an edge missing from the lifecycle graph"
        );

        let reason = match (command.note.as_deref(), step.reason) {
            (Some(note), Some(derived)) => Some(format!("{derived}: {note}")),
            (Some(note), None) => Some(note.to_owned()),
            (None, derived) => derived,
        };
        let audit = StatusHistoryEntry::record(
            request.id(),
            Some(request.state()),
            step.to,
            command.actor.clone(),
            reason,
            at,
        );

        Ok(Planned::Transition(Box::new(TransitionPlan {
            trigger: kind,
            from: request.state(),
            to: step.to,
            patch: step.patch,
            audit,
        })))
    }

    fn step(
        &self,
        request: &DeliveryRequest,
        trigger: &Trigger,
        at: DateTime<Utc>,
    ) -> Result<Step, DeliveryDomainError> {
        let from = request.state();
        let reject = |guard: Option<TransitionGuard>| {
            DeliveryDomainError::from(InvalidTransition {
                request_id: request.id(),
                from,
                trigger: trigger.kind(),
                guard,
            })
        };

        match (from, trigger) {
            (DeliveryState::Requested, Trigger::SendToPrint { batch_id }) => {
                let mut patch = DeliveryPatch::new(DeliveryState::Printing, at);
                patch.sent_to_print_at = Some(at);
                patch.print_batch_id = *batch_id;
                Ok(Step {
                    to: DeliveryState::Printing,
                    reason: batch_id.map(|id| format!("print batch {id}")),
                    patch,
                })
            }
            (DeliveryState::Printing, Trigger::MarkPrinted) => {
                let mut patch = DeliveryPatch::new(DeliveryState::Printed, at);
                patch.printed_at = Some(at);
                Ok(plain(DeliveryState::Printed, patch))
            }
            (DeliveryState::Printed, Trigger::Dispatch) => {
                if request.delivery_type() == DeliveryType::Pickup {
                    return Err(reject(Some(TransitionGuard::PickupNotDispatchable)));
                }
                let mut patch = DeliveryPatch::new(DeliveryState::OutForDelivery, at);
                patch.out_for_delivery_at = Some(Some(at));
                Ok(plain(DeliveryState::OutForDelivery, patch))
            }
            (DeliveryState::OutForDelivery, Trigger::MarkDelivered) => {
                let mut patch = DeliveryPatch::new(DeliveryState::Delivered, at);
                patch.delivered_at = Some(at);
                Ok(plain(DeliveryState::Delivered, patch))
            }
            (DeliveryState::OutForDelivery, Trigger::ConfirmDelivery(evidence)) => {
                let mut patch = DeliveryPatch::new(DeliveryState::Delivered, at);
                patch.delivered_at = Some(at);
                patch.confirmation = Some(evidence.confirm_at(at));
                Ok(Step {
                    to: DeliveryState::Delivered,
                    patch,
                    reason: Some("confirmed by resident".to_owned()),
                })
            }
            (DeliveryState::OutForDelivery, Trigger::MarkFailed(reason)) => {
                Ok(self.failure_step(request, *reason, at))
            }
            (DeliveryState::DeliveryFailed, Trigger::Reschedule(preferences)) => {
                if request.failure_reason() != Some(FailureReason::NotHome) {
                    return Err(reject(Some(TransitionGuard::RescheduleRequiresNotHome)));
                }
                let Some(date) = preferences.preferred_date else {
                    return Err(DeliveryValidationError::MissingPreferredDate.into());
                };
                let mut patch = DeliveryPatch::new(DeliveryState::Printed, at)
                    .rolled_back_to_dispatch_queue();
                patch.preferences = Some(preferences.clone());
                Ok(Step {
                    to: DeliveryState::Printed,
                    patch,
                    reason: Some(format!("rescheduled for {date}")),
                })
            }
            (DeliveryState::DeliveryFailed, Trigger::UpdateAddress(correction)) => {
                if request.failure_reason() != Some(FailureReason::WrongAddress) {
                    return Err(reject(Some(
                        TransitionGuard::AddressUpdateRequiresWrongAddress,
                    )));
                }
                let Some(address) = request.destination().address() else {
                    return Err(reject(Some(TransitionGuard::PickupNotDispatchable)));
                };
                let corrected = address.with_corrected_street(correction.clone())?;
                let mut patch = DeliveryPatch::new(DeliveryState::Printed, at)
                    .rolled_back_to_dispatch_queue();
                patch.destination = Some(Destination::Delivery { address: corrected });
                Ok(Step {
                    to: DeliveryState::Printed,
                    patch,
                    reason: Some("address corrected".to_owned()),
                })
            }
            (DeliveryState::PickupRequired, Trigger::RetryFromPickup) => {
                let patch = DeliveryPatch::new(DeliveryState::Printed, at)
                    .rolled_back_to_dispatch_queue();
                Ok(Step {
                    to: DeliveryState::Printed,
                    patch,
                    reason: Some("courier retry after escalation".to_owned()),
                })
            }
            (state, Trigger::AssignStaff(member)) if !state.is_terminal() => {
                let mut patch = DeliveryPatch::new(state, at);
                patch.assigned_staff = Some(member.clone());
                Ok(Step {
                    to: state,
                    patch,
                    reason: Some(format!("assigned to {}", member.id())),
                })
            }
            (DeliveryState::Requested, Trigger::UpdatePhoto(photo)) => {
                let mut patch = DeliveryPatch::new(DeliveryState::Requested, at);
                patch.updated_photo = Some(photo.clone());
                Ok(Step {
                    to: DeliveryState::Requested,
                    patch,
                    reason: Some("photo updated".to_owned()),
                })
            }
            _ => Err(reject(None)),
        }
    }

    fn failure_step(
        &self,
        request: &DeliveryRequest,
        reason: FailureReason,
        at: DateTime<Utc>,
    ) -> Step {
        let attempts = request.failed_attempts().saturating_add(1);
        let to = self.policy.state_after_failure(attempts);
        let mut patch = DeliveryPatch::new(to, at);
        patch.failure_reason = Some(Some(reason));
        patch.failed_attempts = Some(attempts);
        let audit_reason = if to == DeliveryState::PickupRequired {
            format!("{reason}; escalated to office pickup after {attempts} failed attempts")
        } else {
            reason.as_str().to_owned()
        };
        Step {
            to,
            patch,
            reason: Some(audit_reason),
        }
    }
}

const fn plain(to: DeliveryState, patch: DeliveryPatch) -> Step {
    Step {
        to,
        patch,
        reason: None,
    }
}

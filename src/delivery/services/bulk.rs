//! Staff bulk operations on print queues.

use super::{
    BulkFailureMode, DeliveryRequestRepository,
    error::{DeliveryServiceError, DeliveryServiceResult},
};
use crate::delivery::{
    domain::{
        Actor, DeliveryRequest, DeliveryRequestId, DeliveryState, DeliveryValidationError,
        Planned, PrintBatchId, TransitionCommand, Trigger,
    },
    ports::{BulkItemOutcome, ConditionalUpdate, DeliveryGateway},
};
use mockable::Clock;
use std::collections::HashSet;

/// Why one row of a bulk operation was not updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkItemFailure {
    /// The row changed between planning and writing.
    Conflict,
    /// The row disappeared from storage.
    NotFound,
}

/// Per-row outcome map of a bulk operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    /// Print batch the rows joined, for `send_to_print`.
    pub batch_id: Option<PrintBatchId>,
    /// Rows that moved to the target state.
    pub transitioned: Vec<DeliveryRequestId>,
    /// Rows left alone because they were unknown or in another state.
    pub skipped: Vec<DeliveryRequestId>,
    /// Rows the gateway refused.
    pub failed: Vec<(DeliveryRequestId, BulkItemFailure)>,
}

impl BulkOutcome {
    /// Returns whether no row failed at the gateway.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    /// Returns the number of rows submitted to the gateway.
    #[must_use]
    pub const fn attempted(&self) -> usize {
        self.transitioned.len() + self.failed.len()
    }
}

impl<G, C> DeliveryRequestRepository<G, C>
where
    G: DeliveryGateway,
    C: Clock + Send + Sync,
{
    /// Moves every listed `requested` row to `printing` in one batch.
    ///
    /// Rows in any other state are skipped. Rows older than the view
    /// window are read from storage. A batch identifier is generated when
    /// none is given and stamped on every transitioned row.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryServiceError::Validation`] for non-staff actors,
    /// [`DeliveryServiceError::TransientStorage`] when the gateway call
    /// fails as a whole, and [`DeliveryServiceError::PartialBatch`] in
    /// fail-fast mode when any row fails.
    pub async fn send_to_print(
        &self,
        ids: &[DeliveryRequestId],
        requested_batch: Option<PrintBatchId>,
        actor: Actor,
    ) -> DeliveryServiceResult<BulkOutcome> {
        let batch_id = requested_batch.unwrap_or_default();
        let trigger = Trigger::SendToPrint {
            batch_id: Some(batch_id),
        };
        let mut outcome = self
            .run_batch(ids, trigger, DeliveryState::Requested, actor)
            .await?;
        outcome.batch_id = Some(batch_id);
        self.finish_batch("send_to_print", outcome)
    }

    /// Moves every listed `printing` row to `printed` in one batch.
    ///
    /// # Errors
    ///
    /// Same as [`Self::send_to_print`].
    pub async fn mark_printed(
        &self,
        ids: &[DeliveryRequestId],
        actor: Actor,
    ) -> DeliveryServiceResult<BulkOutcome> {
        let outcome = self
            .run_batch(ids, Trigger::MarkPrinted, DeliveryState::Printing, actor)
            .await?;
        self.finish_batch("mark_printed", outcome)
    }

    async fn run_batch(
        &self,
        ids: &[DeliveryRequestId],
        trigger: Trigger,
        expected: DeliveryState,
        actor: Actor,
    ) -> DeliveryServiceResult<BulkOutcome> {
        if !actor.is_staff() {
            return Err(DeliveryValidationError::ActorNotPermitted {
                actor: actor.role(),
                trigger: trigger.kind(),
            }
            .into());
        }

        let candidates = self.bulk_candidates(ids).await?;
        let command = TransitionCommand::new(trigger, actor);
        let at = self.clock().utc();
        let mut outcome = BulkOutcome::default();
        let mut updates = Vec::new();
        for (id, found) in candidates {
            let Some(request) = found.filter(|request| request.state() == expected) else {
                tracing::debug!(request_id = %id, expected = %expected, "bulk row skipped");
                outcome.skipped.push(id);
                continue;
            };
            let Planned::Transition(boxed) = self.engine().plan(&request, &command, at)? else {
                outcome.skipped.push(id);
                continue;
            };
            let plan = *boxed;
            updates.push(ConditionalUpdate {
                request_id: id,
                expected_revision: request.revision(),
                expected_state: plan.from,
                patch: plan.patch,
                audit: plan.audit,
            });
        }

        if updates.is_empty() {
            return Ok(outcome);
        }

        let results = self
            .call("update_many", self.gateway().update_many(&updates))
            .await
            .map_err(|failure| DeliveryServiceError::storage("update_many", failure))?;

        let mut view = self.write_view();
        for (update, result) in updates.iter().zip(results) {
            match result {
                BulkItemOutcome::Updated(stored) => {
                    outcome.transitioned.push(update.request_id);
                    view.upsert(*stored);
                }
                BulkItemOutcome::Conflict => {
                    outcome
                        .failed
                        .push((update.request_id, BulkItemFailure::Conflict));
                }
                BulkItemOutcome::NotFound => {
                    outcome
                        .failed
                        .push((update.request_id, BulkItemFailure::NotFound));
                }
            }
        }
        drop(view);
        Ok(outcome)
    }

    /// Resolves each distinct id from the view, falling back to storage
    /// for rows outside the view window. Unknown ids resolve to `None`.
    async fn bulk_candidates(
        &self,
        ids: &[DeliveryRequestId],
    ) -> DeliveryServiceResult<Vec<(DeliveryRequestId, Option<DeliveryRequest>)>> {
        let mut seen = HashSet::with_capacity(ids.len());
        let cached: Vec<_> = {
            let view = self.read_view();
            ids.iter()
                .copied()
                .filter(|id| seen.insert(*id))
                .map(|id| (id, view.get(id).cloned()))
                .collect()
        };
        let mut candidates = Vec::with_capacity(cached.len());
        for (id, row) in cached {
            let found = match row {
                Some(request) => Some(request),
                None => self.fetch(id).await?,
            };
            candidates.push((id, found));
        }
        Ok(candidates)
    }

    fn finish_batch(
        &self,
        operation: &'static str,
        outcome: BulkOutcome,
    ) -> DeliveryServiceResult<BulkOutcome> {
        tracing::info!(
            operation,
            batch_id = ?outcome.batch_id,
            transitioned = outcome.transitioned.len(),
            skipped = outcome.skipped.len(),
            failed = outcome.failed.len(),
            "delivery bulk operation finished"
        );
        if !outcome.failed.is_empty() {
            tracing::warn!(operation, failed = ?outcome.failed, "bulk rows rejected by storage");
            if self.config().bulk_failure_mode == BulkFailureMode::FailFast {
                return Err(DeliveryServiceError::PartialBatch(Box::new(outcome)));
            }
        }
        Ok(outcome)
    }
}

//! Audit trail access for delivery requests.

use super::error::{DeliveryServiceError, DeliveryServiceResult, bounded};
use crate::delivery::{
    domain::{Actor, DeliveryRequestId, DeliveryState, StatusHistoryEntry},
    ports::DeliveryGateway,
};
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;

/// Writes and reads status history entries.
///
/// Transitions applied through the repository record their entry in the
/// same gateway call as the row update. This recorder covers standalone
/// entries and history reads.
pub struct AuditRecorder<G, C>
where
    G: DeliveryGateway,
    C: Clock + Send + Sync,
{
    gateway: Arc<G>,
    clock: Arc<C>,
    timeout: Duration,
}

impl<G, C> AuditRecorder<G, C>
where
    G: DeliveryGateway,
    C: Clock + Send + Sync,
{
    /// Creates a recorder bounded by `timeout` per gateway call.
    #[must_use]
    pub const fn new(gateway: Arc<G>, clock: Arc<C>, timeout: Duration) -> Self {
        Self {
            gateway,
            clock,
            timeout,
        }
    }

    /// Appends one history entry stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryServiceError::TransientStorage`] when the append
    /// fails or times out.
    pub async fn record(
        &self,
        request_id: DeliveryRequestId,
        previous_state: Option<DeliveryState>,
        new_state: DeliveryState,
        actor: Actor,
        reason: Option<String>,
    ) -> DeliveryServiceResult<StatusHistoryEntry> {
        let entry = StatusHistoryEntry::record(
            request_id,
            previous_state,
            new_state,
            actor,
            reason,
            self.clock.utc(),
        );
        bounded(
            self.timeout,
            "append_history",
            self.gateway.append_history(&entry),
        )
        .await
        .map_err(|failure| DeliveryServiceError::storage("append_history", failure))?;
        tracing::debug!(
            request_id = %request_id,
            new_state = %new_state,
            "delivery history entry recorded"
        );
        Ok(entry)
    }

    /// Returns a request's history in ascending time order.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryServiceError::TransientStorage`] when the read
    /// fails or times out.
    pub async fn history(
        &self,
        request_id: DeliveryRequestId,
    ) -> DeliveryServiceResult<Vec<StatusHistoryEntry>> {
        bounded(self.timeout, "history", self.gateway.history(request_id))
            .await
            .map_err(|failure| DeliveryServiceError::storage("history", failure))
    }
}

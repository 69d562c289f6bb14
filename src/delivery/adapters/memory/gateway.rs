//! In-memory gateway for delivery tests and local runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::delivery::{
    domain::{DeliveryRequest, DeliveryRequestId, StatusHistoryEntry},
    ports::{
        BulkItemOutcome, ConditionalUpdate, DeliveryGateway, DeliveryGatewayError,
        DeliveryGatewayResult, DeliveryQuery,
    },
};

/// Thread-safe in-memory delivery store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDeliveryGateway {
    state: Arc<RwLock<InMemoryDeliveryState>>,
}

#[derive(Debug, Default)]
struct InMemoryDeliveryState {
    requests: HashMap<DeliveryRequestId, DeliveryRequest>,
    history: HashMap<DeliveryRequestId, Vec<StatusHistoryEntry>>,
}

impl InMemoryDeliveryGateway {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(err: impl std::fmt::Display) -> DeliveryGatewayError {
    DeliveryGatewayError::persistence(std::io::Error::other(err.to_string()))
}

/// Applies one conditional update against locked state.
fn apply_conditional(
    state: &mut InMemoryDeliveryState,
    update: &ConditionalUpdate,
) -> DeliveryGatewayResult<DeliveryRequest> {
    let current = state
        .requests
        .get(&update.request_id)
        .ok_or(DeliveryGatewayError::NotFound(update.request_id))?;

    if current.revision() != update.expected_revision
        || current.state() != update.expected_state
    {
        return Err(DeliveryGatewayError::Conflict {
            request_id: update.request_id,
            expected: update.expected_revision,
        });
    }

    let next = current.patched(&update.patch);
    state.requests.insert(next.id(), next.clone());
    state
        .history
        .entry(update.request_id)
        .or_default()
        .push(update.audit.clone());
    Ok(next)
}

#[async_trait]
impl DeliveryGateway for InMemoryDeliveryGateway {
    async fn insert(
        &self,
        request: &DeliveryRequest,
        created: &StatusHistoryEntry,
    ) -> DeliveryGatewayResult<DeliveryRequest> {
        let mut state = self.state.write().map_err(lock_error)?;
        if state.requests.contains_key(&request.id()) {
            return Err(DeliveryGatewayError::DuplicateRequest(request.id()));
        }
        state.requests.insert(request.id(), request.clone());
        state
            .history
            .entry(request.id())
            .or_default()
            .push(created.clone());
        Ok(request.clone())
    }

    async fn find_by_id(
        &self,
        id: DeliveryRequestId,
    ) -> DeliveryGatewayResult<Option<DeliveryRequest>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.requests.get(&id).cloned())
    }

    async fn update(&self, update: &ConditionalUpdate) -> DeliveryGatewayResult<DeliveryRequest> {
        let mut state = self.state.write().map_err(lock_error)?;
        apply_conditional(&mut state, update)
    }

    async fn update_many(
        &self,
        updates: &[ConditionalUpdate],
    ) -> DeliveryGatewayResult<Vec<BulkItemOutcome>> {
        let mut state = self.state.write().map_err(lock_error)?;
        let outcomes = updates
            .iter()
            .map(|update| match apply_conditional(&mut state, update) {
                Ok(stored) => BulkItemOutcome::Updated(Box::new(stored)),
                Err(DeliveryGatewayError::NotFound(_)) => BulkItemOutcome::NotFound,
                Err(_) => BulkItemOutcome::Conflict,
            })
            .collect();
        Ok(outcomes)
    }

    async fn select(&self, query: &DeliveryQuery) -> DeliveryGatewayResult<Vec<DeliveryRequest>> {
        let state = self.state.read().map_err(lock_error)?;
        let mut rows: Vec<DeliveryRequest> = state
            .requests
            .values()
            .filter(|request| query.filter.matches(request))
            .filter(|request| query.cursor.is_none_or(|cursor| cursor.admits(request)))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(&a.id()))
        });
        rows.truncate(query.limit);
        Ok(rows)
    }

    async fn append_history(&self, entry: &StatusHistoryEntry) -> DeliveryGatewayResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        if !state.requests.contains_key(&entry.request_id()) {
            return Err(DeliveryGatewayError::NotFound(entry.request_id()));
        }
        state
            .history
            .entry(entry.request_id())
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    async fn history(
        &self,
        id: DeliveryRequestId,
    ) -> DeliveryGatewayResult<Vec<StatusHistoryEntry>> {
        let state = self.state.read().map_err(lock_error)?;
        let mut entries = state.history.get(&id).cloned().unwrap_or_default();
        entries.sort_by_key(StatusHistoryEntry::recorded_at);
        Ok(entries)
    }
}

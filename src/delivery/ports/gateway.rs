//! Persistence gateway port for delivery requests and their history.

use crate::delivery::domain::{
    DeliveryPatch, DeliveryRequest, DeliveryRequestId, DeliveryState, ResidentId, Revision,
    ServiceAreaCode, StatusHistoryEntry,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for gateway operations.
pub type DeliveryGatewayResult<T> = Result<T, DeliveryGatewayError>;

/// Update applied only while the stored row still matches what the caller
/// planned against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionalUpdate {
    /// Row to update.
    pub request_id: DeliveryRequestId,
    /// Revision the caller read.
    pub expected_revision: Revision,
    /// State the caller read.
    pub expected_state: DeliveryState,
    /// Fields to write.
    pub patch: DeliveryPatch,
    /// History row appended in the same unit of work.
    pub audit: StatusHistoryEntry,
}

/// Per-row result of a bulk update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkItemOutcome {
    /// The row was updated; carries the stored record.
    Updated(Box<DeliveryRequest>),
    /// The row no longer matched the expected revision or state.
    Conflict,
    /// The row does not exist.
    NotFound,
}

/// Row predicate for selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryFilter {
    /// Every request.
    All,
    /// Requests owned by a resident.
    Owner(ResidentId),
    /// Requests routed to a service area.
    ServiceArea(ServiceAreaCode),
    /// Requests in a lifecycle state.
    State(DeliveryState),
}

impl DeliveryFilter {
    /// Returns whether `request` satisfies the predicate.
    #[must_use]
    pub fn matches(&self, request: &DeliveryRequest) -> bool {
        match self {
            Self::All => true,
            Self::Owner(owner) => request.owner_id() == *owner,
            Self::ServiceArea(code) => request.service_area_code() == code,
            Self::State(state) => request.state() == *state,
        }
    }
}

/// Position of the last row of a page in `(created_at, id)` order.
///
/// Rows created in the same instant are ordered by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    /// Creation time of the last row seen.
    pub created_at: DateTime<Utc>,
    /// Identifier of the last row seen.
    pub id: DeliveryRequestId,
}

impl PageCursor {
    /// Returns the cursor positioned at `request`.
    #[must_use]
    pub const fn at(request: &DeliveryRequest) -> Self {
        Self {
            created_at: request.created_at(),
            id: request.id(),
        }
    }

    /// Returns whether `request` sorts strictly after the cursor in
    /// newest-first order.
    #[must_use]
    pub fn admits(&self, request: &DeliveryRequest) -> bool {
        (request.created_at(), request.id()) < (self.created_at, self.id)
    }
}

/// Select-by-predicate query, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryQuery {
    /// Row predicate.
    pub filter: DeliveryFilter,
    /// Only rows that follow this cursor.
    pub cursor: Option<PageCursor>,
    /// Maximum number of rows returned.
    pub limit: usize,
}

impl DeliveryQuery {
    /// Creates a query for the newest `limit` rows matching `filter`.
    #[must_use]
    pub const fn newest(filter: DeliveryFilter, limit: usize) -> Self {
        Self {
            filter,
            cursor: None,
            limit,
        }
    }

    /// Continues the query after `cursor`.
    #[must_use]
    pub const fn after(mut self, cursor: Option<PageCursor>) -> Self {
        self.cursor = cursor;
        self
    }
}

/// Persistence contract for delivery requests.
///
/// Implementations must keep a row update and its history append atomic,
/// and must reject conditional updates whose expectations no longer hold.
#[async_trait]
pub trait DeliveryGateway: Send + Sync {
    /// Inserts a new request together with its creation history entry.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryGatewayError::DuplicateRequest`] when the identifier
    /// already exists.
    async fn insert(
        &self,
        request: &DeliveryRequest,
        created: &StatusHistoryEntry,
    ) -> DeliveryGatewayResult<DeliveryRequest>;

    /// Reads one request.
    async fn find_by_id(
        &self,
        id: DeliveryRequestId,
    ) -> DeliveryGatewayResult<Option<DeliveryRequest>>;

    /// Applies a conditional update and appends its history entry.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryGatewayError::Conflict`] when the stored revision or
    /// state differs from the expectation and
    /// [`DeliveryGatewayError::NotFound`] when the row is missing.
    async fn update(&self, update: &ConditionalUpdate) -> DeliveryGatewayResult<DeliveryRequest>;

    /// Applies many conditional updates in one call.
    ///
    /// Each row succeeds or fails on its own; the returned outcomes are in
    /// input order. An `Err` means the call as a whole failed and nothing
    /// was written.
    async fn update_many(
        &self,
        updates: &[ConditionalUpdate],
    ) -> DeliveryGatewayResult<Vec<BulkItemOutcome>>;

    /// Selects requests newest first.
    async fn select(&self, query: &DeliveryQuery) -> DeliveryGatewayResult<Vec<DeliveryRequest>>;

    /// Appends a standalone history entry.
    async fn append_history(&self, entry: &StatusHistoryEntry) -> DeliveryGatewayResult<()>;

    /// Returns a request's history in ascending time order.
    async fn history(
        &self,
        id: DeliveryRequestId,
    ) -> DeliveryGatewayResult<Vec<StatusHistoryEntry>>;
}

/// Errors returned by gateway implementations.
#[derive(Debug, Clone, Error)]
pub enum DeliveryGatewayError {
    /// A request with the same identifier already exists.
    #[error("duplicate delivery request identifier: {0}")]
    DuplicateRequest(DeliveryRequestId),

    /// The request was not found.
    #[error("delivery request not found: {0}")]
    NotFound(DeliveryRequestId),

    /// The stored row changed since it was read.
    #[error("delivery request {request_id} changed since {expected}")]
    Conflict {
        /// Request whose update was rejected.
        request_id: DeliveryRequestId,
        /// Revision the writer expected.
        expected: Revision,
    },

    /// Persisted data could not be reconstructed into domain types.
    #[error("invalid persisted delivery data: {0}")]
    InvalidPersistedData(Arc<dyn std::error::Error + Send + Sync>),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl DeliveryGatewayError {
    /// Wraps persisted-data decoding or validation failures.
    pub fn invalid_persisted_data(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::InvalidPersistedData(Arc::new(err))
    }

    /// Wraps a persistence-layer failure.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}

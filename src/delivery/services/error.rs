//! Service-level errors and bounded gateway calls.

use super::BulkOutcome;
use crate::delivery::{
    domain::{DeliveryDomainError, DeliveryRequestId, DeliveryValidationError, InvalidTransition},
    ports::{DeliveryGatewayError, DeliveryGatewayResult},
};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Why a gateway call did not produce a result.
#[derive(Debug, Clone, Error)]
pub enum StorageFailure {
    /// The gateway returned an error.
    #[error(transparent)]
    Gateway(#[from] DeliveryGatewayError),
    /// The gateway did not answer in time.
    #[error("gateway call timed out after {0:?}")]
    TimedOut(Duration),
}

/// Errors surfaced to delivery service callers.
#[derive(Debug, Error)]
pub enum DeliveryServiceError {
    /// Caller input was incomplete or inconsistent.
    #[error(transparent)]
    Validation(#[from] DeliveryValidationError),

    /// The transition is not legal from the current state.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    /// The request is not in the view; refresh and retry once.
    #[error("delivery request {0} not found")]
    NotFound(DeliveryRequestId),

    /// Concurrent writers kept winning the race for this request.
    #[error("delivery request {request_id} changed concurrently {attempts} times")]
    Conflict {
        /// Contended request.
        request_id: DeliveryRequestId,
        /// Attempts made before giving up.
        attempts: u32,
    },

    /// Storage failed or timed out; nothing was committed.
    #[error("storage unavailable during {operation}: {source}")]
    TransientStorage {
        /// Gateway operation that failed.
        operation: &'static str,
        /// Underlying failure.
        source: StorageFailure,
    },

    /// Fail-fast bulk mode saw per-row failures.
    #[error("{} of {} batch rows could not be updated", .0.failed.len(), .0.attempted())]
    PartialBatch(Box<BulkOutcome>),
}

impl DeliveryServiceError {
    /// Returns whether retrying the same call may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientStorage { .. } | Self::Conflict { .. })
    }

    /// Converts a storage failure, logging the underlying cause.
    pub(crate) fn storage(operation: &'static str, failure: StorageFailure) -> Self {
        match failure {
            StorageFailure::Gateway(DeliveryGatewayError::NotFound(id)) => Self::NotFound(id),
            StorageFailure::Gateway(DeliveryGatewayError::Conflict { request_id, .. }) => {
                Self::Conflict {
                    request_id,
                    attempts: 1,
                }
            }
            source => {
                tracing::error!(operation, error = %source, "delivery gateway call failed");
                Self::TransientStorage { operation, source }
            }
        }
    }
}

impl From<DeliveryDomainError> for DeliveryServiceError {
    fn from(err: DeliveryDomainError) -> Self {
        match err {
            DeliveryDomainError::Validation(inner) => Self::Validation(inner),
            DeliveryDomainError::InvalidTransition(inner) => Self::InvalidTransition(inner),
        }
    }
}

/// Result type for delivery service operations.
pub type DeliveryServiceResult<T> = Result<T, DeliveryServiceError>;

/// Runs a gateway call under the configured timeout.
pub(crate) async fn bounded<T>(
    limit: Duration,
    operation: &'static str,
    call: impl Future<Output = DeliveryGatewayResult<T>>,
) -> Result<T, StorageFailure> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(StorageFailure::from),
        Err(_) => {
            tracing::warn!(
                operation,
                timeout_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                "delivery gateway call timed out"
            );
            Err(StorageFailure::TimedOut(limit))
        }
    }
}

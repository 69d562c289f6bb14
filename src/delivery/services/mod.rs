//! Delivery services: the materialized-view repository, staff bulk
//! operations, and audit trail access.

mod audit;
mod bulk;
mod config;
mod error;
mod repository;
mod view;

pub use audit::AuditRecorder;
pub use bulk::{BulkItemFailure, BulkOutcome};
pub use config::{BulkFailureMode, DeliveryConfig};
pub use error::{DeliveryServiceError, DeliveryServiceResult, StorageFailure};
pub use repository::{CreateDeliveryRequest, DeliveryRequestRepository, TransitionOutcome};

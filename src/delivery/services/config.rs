//! Tunables for the delivery repository.

use crate::delivery::domain::EscalationPolicy;
use std::time::Duration;

/// How bulk operations report rows that failed at the gateway.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BulkFailureMode {
    /// Return the outcome map; the caller inspects `failed`.
    #[default]
    BestEffort,
    /// Turn any per-row failure into an error carrying the outcome map.
    FailFast,
}

/// Delivery repository configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryConfig {
    /// Maximum rows returned by a list read.
    pub page_size: usize,
    /// Number of most recent rows `refresh` pulls into the view.
    pub view_window: usize,
    /// Upper bound on every gateway call.
    pub gateway_timeout: Duration,
    /// Re-read-and-retry budget after an optimistic-concurrency conflict.
    pub max_conflict_retries: u32,
    /// Bulk failure reporting.
    pub bulk_failure_mode: BulkFailureMode,
    /// Courier-attempt escalation policy.
    pub escalation: EscalationPolicy,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            view_window: 1000,
            gateway_timeout: Duration::from_secs(5),
            max_conflict_retries: 3,
            bulk_failure_mode: BulkFailureMode::default(),
            escalation: EscalationPolicy::default(),
        }
    }
}

impl DeliveryConfig {
    /// Sets the list page size.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sets the refresh window.
    #[must_use]
    pub const fn with_view_window(mut self, view_window: usize) -> Self {
        self.view_window = view_window;
        self
    }

    /// Sets the gateway timeout.
    #[must_use]
    pub const fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = timeout;
        self
    }

    /// Sets the conflict retry budget.
    #[must_use]
    pub const fn with_max_conflict_retries(mut self, retries: u32) -> Self {
        self.max_conflict_retries = retries;
        self
    }

    /// Sets the bulk failure mode.
    #[must_use]
    pub const fn with_bulk_failure_mode(mut self, mode: BulkFailureMode) -> Self {
        self.bulk_failure_mode = mode;
        self
    }

    /// Sets the escalation policy.
    #[must_use]
    pub const fn with_escalation(mut self, escalation: EscalationPolicy) -> Self {
        self.escalation = escalation;
        self
    }
}

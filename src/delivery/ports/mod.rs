//! Port contracts for delivery persistence.
//!
//! Ports define infrastructure-agnostic interfaces used by delivery services.

pub mod gateway;

pub use gateway::{
    BulkItemOutcome, ConditionalUpdate, DeliveryFilter, DeliveryGateway, DeliveryGatewayError,
    DeliveryGatewayResult, DeliveryQuery, PageCursor,
};

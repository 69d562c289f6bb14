//! In-memory adapters for delivery persistence.

mod gateway;

pub use gateway::InMemoryDeliveryGateway;

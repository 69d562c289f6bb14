//! `PostgreSQL` adapters for delivery persistence.

mod gateway;
mod models;
mod schema;

pub use gateway::{DeliveryPgPool, PostgresDeliveryGateway};

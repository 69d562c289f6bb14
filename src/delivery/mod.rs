//! ID-card delivery lifecycle.
//!
//! A delivery request follows a card from the print queue to the resident.
//! Staff drive printing and dispatch, couriers report outcomes, and the
//! resident may confirm receipt, reschedule, or correct the address. Two
//! failed courier attempts escalate the request to office pickup. The
//! module follows hexagonal architecture:
//!
//! - Domain types and the lifecycle engine in [`domain`]
//! - The persistence gateway contract in [`ports`]
//! - In-memory and `PostgreSQL` gateways in [`adapters`]
//! - The materialized-view repository and bulk operations in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;

//! Card delivery: lifecycle tracking for printed ID cards.
//!
//! This crate tracks each card from the print queue through courier
//! dispatch to a confirmed handover, including failed attempts, resident
//! reschedules and address corrections, and escalation to office pickup.
//!
//! # Architecture
//!
//! The crate follows hexagonal architecture principles:
//!
//! - **Domain**: Pure lifecycle rules with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for persistence
//! - **Adapters**: Concrete implementations of ports (in-memory, `PostgreSQL`)
//! - **Services**: The cached repository callers use for reads and writes
//!
//! # Modules
//!
//! - [`delivery`]: Delivery requests, the lifecycle engine, and history

pub mod delivery;

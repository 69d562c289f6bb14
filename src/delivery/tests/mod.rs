//! Unit tests for the delivery module.
//!
//! Engine tests exercise the pure lifecycle rules; repository and bulk
//! tests run the service layer against the in-memory gateway, a mocked
//! gateway for storage failures, and a stalling gateway for timeouts.

mod fixtures;

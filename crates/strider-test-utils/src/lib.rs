//! Shared test fixtures and utilities for strider crates.
//!
//! Deterministic RNG setup, stub capability models, and tracing output for
//! tests.

pub mod logging;
pub mod mocks;
pub mod rng;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use logging::init_test_tracing;
pub use mocks::{ConstantTrajectory, FixedContactFlags, SwitchingContactFlags};
pub use rng::{deterministic_vec, seeded_rng};

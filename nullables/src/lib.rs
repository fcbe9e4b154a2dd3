//! Nullable infrastructure for deterministic testing.
//!
//! The engine reaches the outside world through two traits: [`Clock`] for
//! time and [`OwnershipRegistry`] for token ownership. This crate provides
//! test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Can be told to fail on demand
//!
//! Usage: swap real implementations for nullables in tests.
//!
//! [`Clock`]: credscore_engine::Clock
//! [`OwnershipRegistry`]: credscore_ownership::OwnershipRegistry

pub mod clock;
pub mod ownership;

pub use clock::NullClock;
pub use ownership::NullOwnership;

//! Ownership registry for credit-record tokens.
//!
//! The engine never tracks who owns a token on its own: it asks an
//! [`OwnershipRegistry`]. Any backend (an on-chain token contract bridge,
//! a database, the in-memory [`TokenLedger`]) implements the trait and the
//! rest of the workspace depends only on the trait.

pub mod error;
pub mod ledger;
pub mod registry;

pub use error::OwnershipError;
pub use ledger::{TokenLedger, TokenLedgerSnapshot};
pub use registry::OwnershipRegistry;

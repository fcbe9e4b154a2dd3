//! Fundamental types for the credscore service.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! identities, token ids, scores, amounts, timestamps and the tunable score parameters.

pub mod amount;
pub mod error;
pub mod identity;
pub mod params;
pub mod score;
pub mod time;
pub mod token;

pub use amount::Amount;
pub use error::TypesError;
pub use identity::Identity;
pub use params::CreditParams;
pub use score::{Score, ScoreDelta};
pub use time::Timestamp;
pub use token::TokenId;

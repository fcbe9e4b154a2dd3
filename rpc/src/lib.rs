//! JSON HTTP API for the credit-score engine.
//!
//! Provides endpoints for:
//! - Record creation, score and last-change queries, token transfer
//! - Approval grant, revoke and listing
//! - Score adjustments by integrations
//! - Record locks
//! - Treasury withdrawal
//! - Liveness
//!
//! The acting identity comes from the `x-credscore-caller` header;
//! authenticating it is the fronting gateway's job.

pub mod caller;
pub mod error;
pub mod handlers;
pub mod server;

pub use caller::{Caller, CALLER_HEADER};
pub use error::RpcError;
pub use server::{router, AppState, RpcServer};

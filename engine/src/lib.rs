//! The credit-score engine.
//!
//! Owners acquire a single credit record (a token issued by an
//! [`OwnershipRegistry`](credscore_ownership::OwnershipRegistry)), approve
//! third-party integrations, and those integrations nudge the score within a
//! bounded step and no more than once per cooldown window. A record can be
//! locked by an approved integration so the owner cannot pull its approval
//! while, say, a loan is outstanding.
//!
//! [`CreditService`] is the entry point; the component types are public so
//! they can be tested and reasoned about in isolation.

pub mod approvals;
pub mod clock;
pub mod error;
pub mod event;
pub mod lock;
pub mod payment;
pub mod protocol;
pub mod rate_limit;
pub mod record;
pub mod service;
pub mod snapshot;

pub use approvals::ApprovalRegistry;
pub use clock::{Clock, SystemClock};
pub use error::{CreditError, ErrorKind, RecordRef};
pub use event::{CreditEvent, EventBus};
pub use lock::{LockHold, LockState};
pub use payment::Treasury;
pub use rate_limit::RateLimitTracker;
pub use record::{CreditRecord, RecordStore};
pub use service::CreditService;
pub use snapshot::{CreditSnapshot, RateLimitEntry, RecordSnapshot, SnapshotBody};

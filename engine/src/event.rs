//! Events emitted by the credit service for subscribers.

use credscore_types::{Amount, Identity, Score, ScoreDelta, TokenId};
use serde::Serialize;

/// State changes observers can subscribe to via the [`EventBus`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CreditEvent {
    /// A record was created for a new owner.
    RecordCreated { token: TokenId, owner: Identity },
    /// A record token changed hands.
    Transfer {
        from: Identity,
        to: Identity,
        token: TokenId,
    },
    ApprovalGranted { owner: Identity, integration: Identity },
    ApprovalRevoked { owner: Identity, integration: Identity },
    RecordLocked { token: TokenId, by: Identity },
    RecordUnlocked { token: TokenId, by: Identity },
    /// An integration adjusted a score.
    ScoreUpdated {
        token: TokenId,
        new_score: Score,
        delta: ScoreDelta,
        integration: Identity,
    },
    PaymentReceived { from: Identity, amount: Amount },
    FundsWithdrawn { to: Identity, amount: Amount },
}

type Listener = Box<dyn Fn(&CreditEvent) + Send + Sync>;

/// Synchronous fan-out event bus.
///
/// Listeners run inline on the emitting thread while the affected record is
/// still held, so they observe events in commit order. They must stay fast
/// and must not call back into the service.
pub struct EventBus {
    listeners: Vec<Listener>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &CreditEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

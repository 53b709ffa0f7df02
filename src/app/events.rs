//! Event fan-out on top of the ledger's append-only stream.
//!
//! Every emitted event is appended to the ledger first, then handed to
//! in-process subscribers (status surfaces, tests). A failed append is
//! logged and the tournament keeps running; the ledger row is an audit
//! record, not a control signal.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use crate::domain::event::LedgerEvent;
use crate::port::outbound::ledger::ExperimentLedger;

type Subscriber = Box<dyn Fn(&LedgerEvent) + Send + Sync>;

pub struct EventBroadcaster {
    ledger: Arc<dyn ExperimentLedger>,
    subscribers: RwLock<Vec<Subscriber>>,
}

impl EventBroadcaster {
    #[must_use]
    pub fn new(ledger: Arc<dyn ExperimentLedger>) -> Self {
        Self {
            ledger,
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Register an in-process observer. Subscribers see events after the
    /// ledger write, in emit order.
    pub fn subscribe(&self, subscriber: impl Fn(&LedgerEvent) + Send + Sync + 'static) {
        self.subscribers.write().push(Box::new(subscriber));
    }

    /// Append the event to the ledger and notify subscribers.
    pub fn emit(&self, event: LedgerEvent) {
        if let Err(e) = self.ledger.append_event(&event) {
            warn!(error = %e, scope = %event.scope, "Failed to append event");
        }
        for subscriber in self.subscribers.read().iter() {
            subscriber(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::sqlite::ledger::SqliteLedger;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn emit_persists_then_fans_out() {
        let ledger = Arc::new(SqliteLedger::open(":memory:").unwrap());
        let broadcaster = EventBroadcaster::new(ledger.clone());

        let seen = Arc::new(AtomicUsize::new(0));
        let observed = seen.clone();
        broadcaster.subscribe(move |event| {
            assert_eq!(event.scope, "cycle");
            observed.fetch_add(1, Ordering::SeqCst);
        });

        broadcaster.emit(LedgerEvent::info("cycle", "cycle opened"));
        broadcaster.emit(LedgerEvent::info("cycle", "cycle closed"));

        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert_eq!(ledger.events_tail(10).unwrap().len(), 2);
    }
}

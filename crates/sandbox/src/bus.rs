//! Automation command bus
//!
//! Carries [`ActionEvent`]s from the mock automation API to the active
//! environment and the trace recorder. Delivery is synchronous and follows
//! subscription order, so by the time `publish` returns every subscriber has
//! seen the event.
//!
//! Each run holds a [`RunToken`]. Starting a new run bumps the generation and
//! any event published with an older token is dropped.

use autolab_common::ActionEvent;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Receiver of action events
pub trait Subscriber: Send + Sync {
    fn on_action(&self, event: &ActionEvent);
}

/// Listener slot. At most one subscriber per role is alive at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Environment,
    Recorder,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Environment => write!(f, "environment"),
            Role::Recorder => write!(f, "recorder"),
        }
    }
}

/// Permission to publish on behalf of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunToken(u64);

impl RunToken {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

struct BusState {
    generation: u64,
    subscribers: Vec<(Role, Arc<dyn Subscriber>)>,
}

/// In-process publish/subscribe channel
#[derive(Clone)]
pub struct CommandBus {
    inner: Arc<Mutex<BusState>>,
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(BusState {
                generation: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Install `subscriber` for `role`, replacing the previous one in place.
    /// Returns the subscriber that was swapped out.
    pub fn subscribe(&self, role: Role, subscriber: Arc<dyn Subscriber>) -> Option<Arc<dyn Subscriber>> {
        let mut state = self.inner.lock();
        if let Some(slot) = state.subscribers.iter_mut().find(|(r, _)| *r == role) {
            debug!("Swapping {} subscriber", role);
            return Some(std::mem::replace(&mut slot.1, subscriber));
        }
        debug!("Subscribing {}", role);
        state.subscribers.push((role, subscriber));
        None
    }

    pub fn unsubscribe(&self, role: Role) -> bool {
        let mut state = self.inner.lock();
        let before = state.subscribers.len();
        state.subscribers.retain(|(r, _)| *r != role);
        before != state.subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }

    pub fn has_subscriber(&self, role: Role) -> bool {
        self.inner.lock().subscribers.iter().any(|(r, _)| *r == role)
    }

    /// Start a new run, superseding any earlier token
    pub fn begin_run(&self) -> RunToken {
        let mut state = self.inner.lock();
        state.generation += 1;
        RunToken(state.generation)
    }

    /// Token of the run currently allowed to publish
    pub fn current(&self) -> RunToken {
        RunToken(self.inner.lock().generation)
    }

    pub fn is_current(&self, token: RunToken) -> bool {
        self.inner.lock().generation == token.0
    }

    /// Deliver `event` to every subscriber. Returns false when the token is
    /// stale and the event was dropped.
    pub fn publish(&self, token: RunToken, event: &ActionEvent) -> bool {
        let subscribers: Vec<Arc<dyn Subscriber>> = {
            let state = self.inner.lock();
            if state.generation != token.0 {
                warn!(
                    "Dropping {} event from superseded run {} (current {})",
                    event.kind, token.0, state.generation
                );
                return false;
            }
            state.subscribers.iter().map(|(_, s)| Arc::clone(s)).collect()
        };

        debug!("Dispatching {} to {} subscriber(s)", event.kind, subscribers.len());
        for subscriber in subscribers {
            subscriber.on_action(event);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autolab_common::ActionKind;

    struct Collect {
        tag: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Subscriber for Collect {
        fn on_action(&self, event: &ActionEvent) {
            self.log.lock().push(format!("{}:{}", self.tag, event.kind));
        }
    }

    fn collector(tag: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Arc<dyn Subscriber> {
        Arc::new(Collect {
            tag,
            log: Arc::clone(log),
        })
    }

    #[test]
    fn test_delivers_in_subscription_order() {
        let bus = CommandBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(Role::Environment, collector("env", &log));
        bus.subscribe(Role::Recorder, collector("rec", &log));

        let token = bus.begin_run();
        assert!(bus.publish(token, &ActionEvent::new(ActionKind::Click)));

        assert_eq!(*log.lock(), vec!["env:CLICK", "rec:CLICK"]);
    }

    #[test]
    fn test_subscribe_swaps_rather_than_stacks() {
        let bus = CommandBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        assert!(bus.subscribe(Role::Environment, collector("old", &log)).is_none());
        assert!(bus.subscribe(Role::Environment, collector("new", &log)).is_some());
        assert_eq!(bus.subscriber_count(), 1);

        let token = bus.begin_run();
        bus.publish(token, &ActionEvent::new(ActionKind::Navigate));
        assert_eq!(*log.lock(), vec!["new:NAVIGATE"]);
    }

    #[test]
    fn test_stale_token_is_dropped() {
        let bus = CommandBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(Role::Recorder, collector("rec", &log));

        let first = bus.begin_run();
        let second = bus.begin_run();
        assert!(!bus.is_current(first));
        assert!(!bus.publish(first, &ActionEvent::new(ActionKind::Click)));
        assert!(bus.publish(second, &ActionEvent::new(ActionKind::Fill)));
        assert_eq!(*log.lock(), vec!["rec:FILL"]);
    }

    #[test]
    fn test_unsubscribe() {
        let bus = CommandBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(Role::Recorder, collector("rec", &log));
        assert!(bus.unsubscribe(Role::Recorder));
        assert!(!bus.unsubscribe(Role::Recorder));
        assert!(!bus.has_subscriber(Role::Recorder));
    }
}

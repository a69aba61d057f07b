//! Cooperative lifecycle event bus
//!
//! Callbacks are registered per [`LifecycleEvent`] and invoked synchronously,
//! in registration order, on the thread that calls [`Scheduler::raise`].
//! Each callback runs to completion before the next one starts, which is the
//! only ordering the cache layer relies on.

use std::collections::HashMap;
use std::fmt;

use procmirror_domain::{LifecycleEvent, LifecycleState};
use tracing::trace;

/// What a callback learns about the event being delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventContext {
    /// Event being delivered.
    pub event: LifecycleEvent,
    /// Lifecycle state at the moment the event was raised.
    pub state: LifecycleState,
    /// Frames ticked so far, including this one for `PerFrameTick`.
    pub frame: u64,
}

/// Handle returned by [`Scheduler::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type EventCallback = Box<dyn FnMut(&EventContext) + Send>;

/// Event bus driving per-frame and lifecycle notifications.
#[derive(Default)]
pub struct Scheduler {
    subscribers: HashMap<LifecycleEvent, Vec<(SubscriptionId, EventCallback)>>,
    next_id: u64,
    frame: u64,
}

impl Scheduler {
    /// Create a scheduler with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `callback` every time `event` is raised.
    pub fn subscribe<F>(&mut self, event: LifecycleEvent, callback: F) -> SubscriptionId
    where
        F: FnMut(&EventContext) + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.entry(event).or_default().push((id, Box::new(callback)));
        id
    }

    /// Drop a subscription. Returns `false` if it was unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        for callbacks in self.subscribers.values_mut() {
            if let Some(position) = callbacks.iter().position(|(sid, _)| *sid == id) {
                callbacks.remove(position);
                return true;
            }
        }
        false
    }

    /// Deliver `event` to its subscribers and return how many ran.
    pub fn raise(&mut self, event: LifecycleEvent, state: LifecycleState) -> usize {
        if event == LifecycleEvent::PerFrameTick {
            self.frame += 1;
        }
        let context = EventContext { event, state, frame: self.frame };

        let Some(callbacks) = self.subscribers.get_mut(&event) else {
            return 0;
        };
        for (_, callback) in callbacks.iter_mut() {
            callback(&context);
        }
        trace!(event = %event, %state, delivered = callbacks.len(), "lifecycle event raised");
        callbacks.len()
    }

    /// Number of callbacks subscribed to `event`.
    #[must_use]
    pub fn subscriber_count(&self, event: LifecycleEvent) -> usize {
        self.subscribers.get(&event).map_or(0, Vec::len)
    }

    /// Frames ticked so far.
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: Vec<(&'static str, usize)> = LifecycleEvent::ALL
            .iter()
            .map(|event| (event.name(), self.subscriber_count(*event)))
            .collect();
        f.debug_struct("Scheduler").field("subscribers", &counts).field("frame", &self.frame).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn callbacks_run_in_registration_order() {
        let mut scheduler = Scheduler::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second", "third"] {
            let log = Arc::clone(&log);
            scheduler.subscribe(LifecycleEvent::LogicalAreaChanged, move |_| {
                log.lock().unwrap().push(label);
            });
        }

        let ran = scheduler.raise(LifecycleEvent::LogicalAreaChanged, LifecycleState::InArea);
        assert_eq!(ran, 3);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn events_are_routed_by_kind() {
        let mut scheduler = Scheduler::new();
        let closed = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&closed);
        scheduler.subscribe(LifecycleEvent::ProcessClosed, move |_| {
            *counter.lock().unwrap() += 1;
        });

        assert_eq!(scheduler.raise(LifecycleEvent::PerFrameTick, LifecycleState::InArea), 0);
        assert_eq!(scheduler.raise(LifecycleEvent::ProcessClosed, LifecycleState::Detached), 1);
        assert_eq!(*closed.lock().unwrap(), 1);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut scheduler = Scheduler::new();
        let id = scheduler.subscribe(LifecycleEvent::PerFrameTick, |_| {});
        assert_eq!(scheduler.subscriber_count(LifecycleEvent::PerFrameTick), 1);

        assert!(scheduler.unsubscribe(id));
        assert!(!scheduler.unsubscribe(id));
        assert_eq!(scheduler.raise(LifecycleEvent::PerFrameTick, LifecycleState::InArea), 0);
    }

    #[test]
    fn context_carries_state_and_frame() {
        let mut scheduler = Scheduler::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        scheduler.subscribe(LifecycleEvent::PerFrameTick, move |ctx| {
            sink.lock().unwrap().push((ctx.frame, ctx.state));
        });

        scheduler.raise(LifecycleEvent::PerFrameTick, LifecycleState::Loading);
        scheduler.raise(LifecycleEvent::PerFrameTick, LifecycleState::InArea);

        assert_eq!(scheduler.frame(), 2);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(1, LifecycleState::Loading), (2, LifecycleState::InArea)]
        );
    }
}

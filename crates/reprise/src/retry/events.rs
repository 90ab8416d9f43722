//! Failure and retry notifications
//!
//! A session keeps one ordered subscriber list per [`EventKind`]. Each
//! subscriber is either persistent (`on`) or single-shot (`once`). Emitting an
//! event runs every subscriber registered for that kind, in registration
//! order, then drops the single-shot ones.

use std::fmt;
use std::time::Duration;

/// Name of a session event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// An attempt failed
    Failure,
    /// A failed attempt is about to be followed by another one
    Retry,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Failure => "failure",
            EventKind::Retry => "retry",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload delivered to subscribers
#[derive(Debug)]
pub enum RetryEvent<'a, E> {
    /// Fired for every failed attempt, before any delay
    Failure {
        /// The attempt's error
        error: &'a E,
        /// Attempts remaining, including the one that just failed
        countdown: u32,
        /// Interval in effect when the attempt failed
        interval: Duration,
    },

    /// Fired when a failure will be followed by another attempt
    Retry {
        /// Attempts remaining before the decrement
        countdown: u32,
        /// Interval about to be waited, before it is grown
        interval: Duration,
    },
}

impl<E> RetryEvent<'_, E> {
    pub fn kind(&self) -> EventKind {
        match self {
            RetryEvent::Failure { .. } => EventKind::Failure,
            RetryEvent::Retry { .. } => EventKind::Retry,
        }
    }

    pub fn countdown(&self) -> u32 {
        match self {
            RetryEvent::Failure { countdown, .. } | RetryEvent::Retry { countdown, .. } => {
                *countdown
            }
        }
    }

    pub fn interval(&self) -> Duration {
        match self {
            RetryEvent::Failure { interval, .. } | RetryEvent::Retry { interval, .. } => *interval,
        }
    }
}

/// Boxed subscriber callback
pub(crate) type Handler<E> = Box<dyn FnMut(&RetryEvent<'_, E>) + Send>;

struct Subscriber<E> {
    handler: Handler<E>,
    once: bool,
}

/// Per-kind subscriber lists
pub(crate) struct Listeners<E> {
    failure: Vec<Subscriber<E>>,
    retry: Vec<Subscriber<E>>,
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self {
            failure: Vec::new(),
            retry: Vec::new(),
        }
    }
}

impl<E> Listeners<E> {
    fn list(&self, kind: EventKind) -> &Vec<Subscriber<E>> {
        match kind {
            EventKind::Failure => &self.failure,
            EventKind::Retry => &self.retry,
        }
    }

    fn list_mut(&mut self, kind: EventKind) -> &mut Vec<Subscriber<E>> {
        match kind {
            EventKind::Failure => &mut self.failure,
            EventKind::Retry => &mut self.retry,
        }
    }

    pub(crate) fn add(&mut self, kind: EventKind, handler: Handler<E>, once: bool) {
        self.list_mut(kind).push(Subscriber { handler, once });
    }

    pub(crate) fn count(&self, kind: EventKind) -> usize {
        self.list(kind).len()
    }

    pub(crate) fn clear(&mut self, kind: EventKind) {
        self.list_mut(kind).clear();
    }

    /// Run every subscriber for the event's kind, then drop single-shot ones
    pub(crate) fn emit(&mut self, event: &RetryEvent<'_, E>) {
        let subscribers = self.list_mut(event.kind());
        for subscriber in subscribers.iter_mut() {
            (subscriber.handler)(event);
        }
        subscribers.retain(|s| !s.once);
    }
}

impl<E> fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("failure", &self.failure.len())
            .field("retry", &self.retry.len())
            .finish()
    }
}

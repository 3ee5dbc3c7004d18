//! Global Event Bus
//!
//! Components reach the application-wide publish/subscribe channel through
//! the [`GlobalBus`] trait. [`Vent`] is a minimal in-process implementation.

use std::cell::RefCell;
use std::fmt;

use serde_json::Value;

use crate::handler::{same_handler, Handler, Signal};

/// Publish/subscribe channel shared across components
pub trait GlobalBus {
    /// Register `handler` for `event`
    fn subscribe(&self, event: &str, handler: Handler);

    /// Remove one registration of `handler` for `event`.
    /// Returns `false` if there was none.
    fn unsubscribe(&self, event: &str, handler: &Handler) -> bool;
}

/// In-process event bus
#[derive(Default)]
pub struct Vent {
    subscribers: RefCell<Vec<(String, Handler)>>,
}

impl Vent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `payload` to every subscriber of `event`, in subscription
    /// order. Returns the number of handlers invoked.
    pub fn publish(&self, event: &str, payload: &Value) -> usize {
        let targets: Vec<Handler> = self
            .subscribers
            .borrow()
            .iter()
            .filter(|(name, _)| name == event)
            .map(|(_, handler)| handler.clone())
            .collect();

        for handler in &targets {
            handler(Signal::Global { event, payload });
        }
        targets.len()
    }

    /// Subscribers registered for `event`
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.subscribers.borrow().iter().filter(|(name, _)| name == event).count()
    }

    pub fn len(&self) -> usize {
        self.subscribers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.borrow().is_empty()
    }
}

impl GlobalBus for Vent {
    fn subscribe(&self, event: &str, handler: Handler) {
        self.subscribers.borrow_mut().push((event.to_string(), handler));
    }

    fn unsubscribe(&self, event: &str, handler: &Handler) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        match subscribers.iter().position(|(name, h)| name == event && same_handler(h, handler)) {
            Some(index) => {
                subscribers.remove(index);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for Vent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vent").field("subscribers", &self.len()).finish()
    }
}

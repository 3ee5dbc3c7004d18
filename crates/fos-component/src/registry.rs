//! Subscription Registry
//!
//! Per-component index of every binding it has made, keyed by a
//! deterministic id so teardown can be driven without knowing how each
//! binding was attached.

use std::collections::HashMap;
use std::fmt;

use fos_dom::Listener;

use crate::descriptor::Scope;
use crate::handler::Handler;

/// How a subscriber was attached, and so how it must be detached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriberKind {
    Event,
    GlobalEvent,
    DelegatedEvent,
}

impl SubscriberKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SubscriberKind::Event => "event",
            SubscriberKind::GlobalEvent => "globalEvent",
            SubscriberKind::DelegatedEvent => "delegatedEvent",
        }
    }
}

impl From<Scope> for SubscriberKind {
    fn from(scope: Scope) -> Self {
        match scope {
            Scope::Local => SubscriberKind::Event,
            Scope::Delegated => SubscriberKind::DelegatedEvent,
            Scope::Global => SubscriberKind::GlobalEvent,
        }
    }
}

/// One active binding owned by a component
#[derive(Clone)]
pub struct Subscriber {
    pub id: String,
    pub kind: SubscriberKind,
    /// Resolved event token
    pub event: String,
    /// Resolved delegate selector
    pub delegate: Option<String>,
    /// Declared method name
    pub method: String,
    pub handler: Handler,
    /// Wrappers attached to the DOM for this binding alone; empty for
    /// global subscribers
    pub listeners: Vec<Listener>,
}

impl Subscriber {
    /// Build the registry id from the kind, the resolved tokens in order and
    /// the method name. Same inputs always give the same id.
    pub fn make_id(kind: SubscriberKind, event: &str, delegate: Option<&str>, method: &str) -> String {
        match delegate {
            Some(selector) => format!("{}|{} {}|{}", kind.as_str(), event, selector, method),
            None => format!("{}|{}|{}", kind.as_str(), event, method),
        }
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("event", &self.event)
            .field("delegate", &self.delegate)
            .field("method", &self.method)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

/// Subscribers keyed by id
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    entries: HashMap<String, Subscriber>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite by id, returning the displaced subscriber
    pub fn add(&mut self, subscriber: Subscriber) -> Option<Subscriber> {
        self.entries.insert(subscriber.id.clone(), subscriber)
    }

    pub fn get(&self, id: &str) -> Option<&Subscriber> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Subscriber> {
        self.entries.remove(id)
    }

    /// Snapshot of every subscriber, in no particular order
    pub fn all(&self) -> Vec<Subscriber> {
        self.entries.values().cloned().collect()
    }

    /// Subscribers of one kind
    pub fn of_kind(&self, kind: SubscriberKind) -> impl Iterator<Item = &Subscriber> + '_ {
        self.entries.values().filter(move |s| s.kind == kind)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

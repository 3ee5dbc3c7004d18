//! Event Listener Storage
//!
//! Low-level `addEventListener` / `removeEventListener` bookkeeping.
//! Listener identity is the `Rc` allocation, as with JS function identity.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::{Document, DomEvent, NodeId};

/// Listener callback. Receives the owning document so it can run selector
/// queries against the live tree while the event is in flight.
pub type Listener = Rc<dyn Fn(&Document, &mut DomEvent)>;

struct RegisteredListener {
    event_type: String,
    listener: Listener,
    capture: bool,
}

impl RegisteredListener {
    fn is(&self, event_type: &str, listener: &Listener, capture: bool) -> bool {
        self.event_type == event_type
            && self.capture == capture
            && std::ptr::addr_eq(Rc::as_ptr(&self.listener), Rc::as_ptr(listener))
    }
}

/// Listeners keyed by node, in registration order
#[derive(Default)]
pub struct EventListenerRegistry {
    listeners: HashMap<NodeId, Vec<RegisteredListener>>,
}

impl EventListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event listener. Returns `false` if the exact
    /// (type, listener, capture) triple is already registered on the node.
    pub fn add_listener(&mut self, node: NodeId, event_type: &str, listener: Listener, capture: bool) -> bool {
        let entries = self.listeners.entry(node).or_default();
        if entries.iter().any(|l| l.is(event_type, &listener, capture)) {
            return false;
        }
        entries.push(RegisteredListener {
            event_type: event_type.to_string(),
            listener,
            capture,
        });
        true
    }

    /// Remove an event listener
    pub fn remove_listener(&mut self, node: NodeId, event_type: &str, listener: &Listener, capture: bool) -> bool {
        let Some(entries) = self.listeners.get_mut(&node) else {
            return false;
        };
        let Some(pos) = entries.iter().position(|l| l.is(event_type, listener, capture)) else {
            return false;
        };
        entries.remove(pos);
        if entries.is_empty() {
            self.listeners.remove(&node);
        }
        true
    }

    /// Check whether a listener is still registered
    pub fn contains(&self, node: NodeId, event_type: &str, listener: &Listener, capture: bool) -> bool {
        self.listeners
            .get(&node)
            .is_some_and(|entries| entries.iter().any(|l| l.is(event_type, listener, capture)))
    }

    /// Snapshot of the listeners for a node and event type.
    ///
    /// `capture` selects one phase; `None` returns both (at-target dispatch).
    pub fn get_listeners(&self, node: NodeId, event_type: &str, capture: Option<bool>) -> Vec<(Listener, bool)> {
        self.listeners
            .get(&node)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|l| l.event_type == event_type)
                    .filter(|l| capture.is_none_or(|c| l.capture == c))
                    .map(|l| (l.listener.clone(), l.capture))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Clear all listeners for a node
    pub fn clear_node(&mut self, node: NodeId) {
        self.listeners.remove(&node);
    }

    /// Listeners registered on one node
    pub fn node_count(&self, node: NodeId) -> usize {
        self.listeners.get(&node).map_or(0, Vec::len)
    }

    /// Listeners registered across the whole document
    pub fn len(&self) -> usize {
        self.listeners.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl fmt::Debug for EventListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListenerRegistry")
            .field("nodes", &self.listeners.len())
            .field("listeners", &self.len())
            .finish()
    }
}

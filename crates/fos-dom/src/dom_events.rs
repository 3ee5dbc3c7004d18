//! DOM Events
//!
//! Interaction events routed through the tree by `Document::dispatch_event`.

use crate::NodeId;

/// Dispatch phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventPhase {
    #[default]
    None,
    Capturing,
    AtTarget,
    Bubbling,
}

/// DOM event
#[derive(Debug, Clone)]
pub struct DomEvent {
    /// Event name, e.g. `click`
    pub event_type: String,
    /// Physical target the event was dispatched at
    pub target: NodeId,
    /// Node whose listeners are currently running
    pub current_target: Option<NodeId>,
    pub phase: EventPhase,
    pub bubbles: bool,
    pub cancelable: bool,
    pub timestamp: f64,
    default_prevented: bool,
    propagation_stopped: bool,
    immediate_propagation_stopped: bool,
}

impl DomEvent {
    /// Create a bubbling, cancelable event
    pub fn new(event_type: &str, target: NodeId) -> Self {
        Self {
            event_type: event_type.to_string(),
            target,
            current_target: None,
            phase: EventPhase::None,
            bubbles: true,
            cancelable: true,
            timestamp: 0.0,
            default_prevented: false,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
        }
    }

    /// Create an event that only visits capture listeners and the target
    pub fn non_bubbling(event_type: &str, target: NodeId) -> Self {
        Self { bubbles: false, ..Self::new(event_type, target) }
    }

    /// Prevent default action
    pub fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }

    /// Stop propagation to further nodes
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Stop propagation and skip the remaining listeners on this node
    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_propagation_stopped = true;
    }

    /// Check if default was prevented
    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub fn is_immediate_propagation_stopped(&self) -> bool {
        self.immediate_propagation_stopped
    }
}

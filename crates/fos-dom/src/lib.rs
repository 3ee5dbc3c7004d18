//! fOS DOM - Document Object Model
//!
//! Arena-backed DOM tree with the pieces components need to wire up
//! interaction events: simple selector matching (`matches`, `closest`),
//! per-node event listeners and capture/bubble dispatch.

mod node;
mod tree;
mod element;
mod dom_events;
mod event_target;
mod document;

pub use node::{Node, NodeData, ElementData, Attribute};
pub use tree::{DomTree, DomError, DomResult};
pub use element::{ElementQuery, SimpleSelector, CompoundSelector, SelectorList};
pub use dom_events::{DomEvent, EventPhase};
pub use event_target::{Listener, EventListenerRegistry};
pub use document::{Document, ElementRef};

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root node ID
    pub const ROOT: NodeId = NodeId(0);
    /// Sentinel for "no node"
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Check that this is not the `NONE` sentinel
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    /// Raw arena index
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

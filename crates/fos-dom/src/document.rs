//! Document - High-level document API
//!
//! `Document` is a cheap, clonable handle over the shared tree and its
//! listener table. Nothing stays borrowed while listeners run, so a listener
//! may query or mutate the document it was invoked for.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::{
    DomEvent, DomResult, DomTree, ElementQuery, EventListenerRegistry, EventPhase, Listener, NodeId,
};

struct DocumentState {
    tree: DomTree,
    listeners: EventListenerRegistry,
}

/// HTML Document
#[derive(Clone)]
pub struct Document {
    inner: Rc<RefCell<DocumentState>>,
    url: Rc<str>,
    body_element: NodeId,
}

impl Document {
    /// Create a document with `<html><head/><body/></html>`
    pub fn new(url: &str) -> Self {
        let mut tree = DomTree::new();

        let html = tree.create_element("html");
        let head = tree.create_element("head");
        let body = tree.create_element("body");

        // Freshly created nodes under the root cannot violate hierarchy rules
        let _ = tree.append_child(tree.root(), html);
        let _ = tree.append_child(html, head);
        let _ = tree.append_child(html, body);

        Self::from_tree(url, tree, body)
    }

    /// Create an empty document (no structure)
    pub fn empty(url: &str) -> Self {
        Self::from_tree(url, DomTree::new(), NodeId::NONE)
    }

    fn from_tree(url: &str, tree: DomTree, body_element: NodeId) -> Self {
        Self {
            inner: Rc::new(RefCell::new(DocumentState {
                tree,
                listeners: EventListenerRegistry::new(),
            })),
            url: url.into(),
            body_element,
        }
    }

    /// Get document URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Document node
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get `<body>` element (NONE for empty documents)
    pub fn body(&self) -> NodeId {
        self.body_element
    }

    /// Borrow the DOM tree
    pub fn tree(&self) -> Ref<'_, DomTree> {
        Ref::map(self.inner.borrow(), |s| &s.tree)
    }

    /// Run a mutation against the DOM tree
    pub fn with_tree_mut<R>(&self, f: impl FnOnce(&mut DomTree) -> R) -> R {
        f(&mut self.inner.borrow_mut().tree)
    }

    /// Create a detached element
    pub fn create_element(&self, tag: &str) -> NodeId {
        self.with_tree_mut(|tree| tree.create_element(tag))
    }

    /// Append `child` under `parent`
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        self.with_tree_mut(|tree| tree.append_child(parent, child))
    }

    /// Set an attribute on an element
    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> DomResult<()> {
        self.with_tree_mut(|tree| tree.set_attribute(node, name, value))
    }

    /// Closest ancestor-or-self matching `selector`
    pub fn closest(&self, node: NodeId, selector: &str) -> Option<NodeId> {
        self.tree().closest(node, selector)
    }

    /// Check if `node` matches `selector`
    pub fn matches(&self, node: NodeId, selector: &str) -> bool {
        self.tree().matches(node, selector)
    }

    /// Handle to an element of this document
    pub fn element(&self, node: NodeId) -> ElementRef {
        ElementRef { document: self.clone(), node }
    }

    /// Check whether two handles point at the same document
    pub fn ptr_eq(&self, other: &Document) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Register a listener. Returns `false` for an unknown node or an
    /// already registered (type, listener, capture) triple.
    pub fn add_event_listener(&self, node: NodeId, event_type: &str, listener: Listener, capture: bool) -> bool {
        let mut state = self.inner.borrow_mut();
        if state.tree.get(node).is_none() {
            tracing::debug!("addEventListener on unknown node {:?}", node);
            return false;
        }
        state.listeners.add_listener(node, event_type, listener, capture)
    }

    /// Unregister a listener
    pub fn remove_event_listener(&self, node: NodeId, event_type: &str, listener: &Listener, capture: bool) -> bool {
        self.inner.borrow_mut().listeners.remove_listener(node, event_type, listener, capture)
    }

    /// Listeners attached to one node
    pub fn listener_count(&self, node: NodeId) -> usize {
        self.inner.borrow().listeners.node_count(node)
    }

    /// Listeners attached anywhere in the document
    pub fn total_listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    /// Dispatch an event through capture, target and bubble phases.
    ///
    /// Returns `false` if a listener called `prevent_default`.
    pub fn dispatch_event(&self, mut event: DomEvent) -> bool {
        let path: Vec<NodeId> = self.tree().ancestors(event.target).collect();
        let Some((&target, ancestors)) = path.split_first() else {
            tracing::debug!("dispatch to unknown node {:?} dropped", event.target);
            return true;
        };

        event.phase = EventPhase::Capturing;
        for &node in ancestors.iter().rev() {
            self.invoke(node, &mut event, Some(true));
            if event.is_propagation_stopped() {
                return !event.is_default_prevented();
            }
        }

        event.phase = EventPhase::AtTarget;
        self.invoke(target, &mut event, None);

        if event.bubbles {
            event.phase = EventPhase::Bubbling;
            for &node in ancestors {
                if event.is_propagation_stopped() {
                    break;
                }
                self.invoke(node, &mut event, Some(false));
            }
        }

        event.current_target = None;
        event.phase = EventPhase::None;
        !event.is_default_prevented()
    }

    fn invoke(&self, node: NodeId, event: &mut DomEvent, capture: Option<bool>) {
        let listeners = self.inner.borrow().listeners.get_listeners(node, &event.event_type, capture);
        event.current_target = Some(node);

        for (listener, listener_capture) in listeners {
            if event.is_immediate_propagation_stopped() {
                break;
            }
            // Skip listeners removed by an earlier listener of this dispatch
            let live = self.inner.borrow().listeners.contains(node, &event.event_type, &listener, listener_capture);
            if live {
                listener(self, event);
            }
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new("about:blank")
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("url", &self.url)
            .field("listeners", &self.total_listener_count())
            .finish()
    }
}

/// A node paired with the document it lives in
#[derive(Clone)]
pub struct ElementRef {
    document: Document,
    node: NodeId,
}

impl ElementRef {
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn node(&self) -> NodeId {
        self.node
    }
}

impl PartialEq for ElementRef {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node && self.document.ptr_eq(&other.document)
    }
}

impl Eq for ElementRef {}

impl fmt::Debug for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementRef({}, {:?})", self.document.url(), self.node)
    }
}

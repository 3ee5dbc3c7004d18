//! Bound handlers and the method table
//!
//! Components expose their callable methods by name through a
//! [`MethodTable`]. Names are resolved once per binding pass; the resulting
//! [`Handler`] is shared by the subscriber record and the listener wrapper,
//! and its allocation address is its identity.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use fos_dom::{Document, DomEvent, NodeId};
use serde_json::Value;

/// What a bound handler is invoked with
pub enum Signal<'a> {
    /// A local or delegated DOM event. `element` is the matched delegate
    /// for delegated bindings, the current target otherwise.
    Dom {
        document: &'a Document,
        event: &'a mut DomEvent,
        element: NodeId,
    },
    /// A message published on the global bus
    Global {
        event: &'a str,
        payload: &'a Value,
    },
}

impl Signal<'_> {
    /// Event name for either variant
    pub fn event_name(&self) -> &str {
        match self {
            Signal::Dom { event, .. } => &event.event_type,
            Signal::Global { event, .. } => event,
        }
    }
}

/// A component method bound for dispatch
pub type Handler = Rc<dyn Fn(Signal<'_>)>;

/// Identity comparison for handlers
#[inline]
pub fn same_handler(a: &Handler, b: &Handler) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// Method name to handler mapping
#[derive(Default, Clone)]
pub struct MethodTable {
    methods: HashMap<String, Handler>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`MethodTable::insert`]
    pub fn method(mut self, name: &str, f: impl Fn(Signal<'_>) + 'static) -> Self {
        self.insert(name, Rc::new(f));
        self
    }

    /// Register an already shared handler under `name`
    pub fn insert(&mut self, name: &str, handler: Handler) -> Option<Handler> {
        self.methods.insert(name.to_string(), handler)
    }

    pub fn get(&self, name: &str) -> Option<&Handler> {
        self.methods.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.methods.keys().collect();
        names.sort();
        f.debug_struct("MethodTable").field("methods", &names).finish()
    }
}

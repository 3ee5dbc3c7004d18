//! DOM Event Tracker
//!
//! Process-wide table of every listener attached on behalf of components.
//! Each record keeps the wrapper actually registered with the document and
//! the component handler it forwards to, so a binding can be detached by
//! node, event, namespace, selector and handler identity.
//!
//! The tracker is an explicit service object: share one `Rc<DomEventTracker>`
//! between every component that should see the same table.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use fos_dom::{Document, DomEvent, ElementRef, Listener};

use crate::descriptor::split_event_name;
use crate::handler::{same_handler, Handler, Signal};

/// Tracker errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackerError {
    #[error("No event name given")]
    MissingEventName,

    #[error("Event name `{0}` has an empty event part")]
    EmptyEventPart(String),

    #[error("Node {0:?} does not exist in its document")]
    UnknownNode(ElementRef),
}

/// One attached listener
#[derive(Clone)]
pub struct EventRecord {
    pub node: ElementRef,
    pub event: String,
    pub namespace: Option<String>,
    /// Wrapper registered with the document
    pub handler: Listener,
    /// Component handler the wrapper forwards to
    pub origin_handler: Handler,
    pub selector: Option<String>,
    pub use_capture: bool,
}

impl EventRecord {
    fn matches(
        &self,
        node: &ElementRef,
        event: &str,
        namespace: Option<&str>,
        selector: Option<&str>,
        filter: Option<&HandlerFilter<'_>>,
    ) -> bool {
        self.node == *node
            && self.event == event
            && self.namespace.as_deref() == namespace
            && self.selector.as_deref() == selector
            && filter.is_none_or(|f| f.accepts(self))
    }
}

impl fmt::Debug for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRecord")
            .field("node", &self.node)
            .field("event", &self.event)
            .field("namespace", &self.namespace)
            .field("selector", &self.selector)
            .field("use_capture", &self.use_capture)
            .finish_non_exhaustive()
    }
}

/// Restricts `off` to records carrying a particular handler
#[derive(Clone, Copy)]
pub enum HandlerFilter<'a> {
    /// The component handler passed to `on`
    Origin(&'a Handler),
    /// A wrapper returned by `on`
    Wrapper(&'a Listener),
}

impl HandlerFilter<'_> {
    fn accepts(&self, record: &EventRecord) -> bool {
        match self {
            HandlerFilter::Origin(handler) => same_handler(&record.origin_handler, handler),
            HandlerFilter::Wrapper(listener) => {
                std::ptr::addr_eq(Rc::as_ptr(&record.handler), Rc::as_ptr(listener))
            }
        }
    }
}

/// Split and validate a space separated list of `event[.namespace]` names.
/// Either every name is usable or the whole list is rejected.
fn parse_event_names(event_names: &str) -> Result<Vec<(&str, Option<&str>)>, TrackerError> {
    let names: Vec<_> = event_names.split_whitespace().map(|name| (name, split_event_name(name))).collect();
    if names.is_empty() {
        return Err(TrackerError::MissingEventName);
    }
    if let Some((name, _)) = names.iter().find(|(_, (event, _))| event.is_empty()) {
        return Err(TrackerError::EmptyEventPart(name.to_string()));
    }
    Ok(names.into_iter().map(|(_, split)| split).collect())
}

/// Shared listener table
#[derive(Default)]
pub struct DomEventTracker {
    records: RefCell<Vec<EventRecord>>,
}

impl DomEventTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience for the common shared form
    pub fn shared() -> Rc<Self> {
        Rc::new(Self::new())
    }

    /// Attach `handler` to `node` for every name in `event_names`.
    ///
    /// With a `selector`, the handler runs only when the closest
    /// ancestor-or-self of the event target matches, and receives that
    /// element; without one it receives the current target. Returns the
    /// wrappers in registration order.
    pub fn on(
        &self,
        node: &ElementRef,
        event_names: &str,
        selector: Option<&str>,
        handler: &Handler,
        use_capture: bool,
    ) -> Result<Vec<Listener>, TrackerError> {
        let names = parse_event_names(event_names).inspect_err(|err| {
            tracing::warn!("Rejected listener on {:?}: {}", node, err);
        })?;
        if node.document().tree().get(node.node()).is_none() {
            tracing::warn!("Rejected listener on unknown node {:?}", node);
            return Err(TrackerError::UnknownNode(node.clone()));
        }

        let mut wrappers = Vec::with_capacity(names.len());
        for (event, namespace) in names {
            let wrapper = Self::wrap(selector, handler);
            if !node.document().add_event_listener(node.node(), event, wrapper.clone(), use_capture) {
                tracing::debug!("Document refused {} listener on {:?}; not recorded", event, node);
                continue;
            }

            self.records.borrow_mut().push(EventRecord {
                node: node.clone(),
                event: event.to_string(),
                namespace: namespace.map(str::to_string),
                handler: wrapper.clone(),
                origin_handler: handler.clone(),
                selector: selector.map(str::to_string),
                use_capture,
            });
            tracing::debug!("Attached {}{} on {:?}", event, selector.map(|s| format!(" ({s})")).unwrap_or_default(), node);
            wrappers.push(wrapper);
        }

        Ok(wrappers)
    }

    fn wrap(selector: Option<&str>, handler: &Handler) -> Listener {
        let origin = handler.clone();
        match selector {
            Some(selector) => {
                let selector = selector.to_string();
                Rc::new(move |document: &Document, event: &mut DomEvent| {
                    if let Some(element) = document.closest(event.target, &selector) {
                        origin(Signal::Dom { document, event, element });
                    }
                })
            }
            None => Rc::new(move |document: &Document, event: &mut DomEvent| {
                let element = event.current_target.unwrap_or(event.target);
                origin(Signal::Dom { document, event, element });
            }),
        }
    }

    /// Detach every record on `node` matching each name in `event_names`
    /// together with `selector`, and `filter` when given.
    ///
    /// Scans newest first. Returns the number of records removed; zero
    /// matches is not an error.
    pub fn off(
        &self,
        node: &ElementRef,
        event_names: &str,
        selector: Option<&str>,
        filter: Option<HandlerFilter<'_>>,
    ) -> Result<usize, TrackerError> {
        let names = parse_event_names(event_names).inspect_err(|err| {
            tracing::warn!("Rejected listener removal on {:?}: {}", node, err);
        })?;

        let removed = {
            let mut records = self.records.borrow_mut();
            let mut removed = Vec::new();
            for (event, namespace) in names {
                for index in (0..records.len()).rev() {
                    if records[index].matches(node, event, namespace, selector, filter.as_ref()) {
                        removed.push(records.remove(index));
                    }
                }
            }
            removed
        };

        // Listeners are detached after the table borrow ends
        for record in &removed {
            record.node.document().remove_event_listener(
                record.node.node(),
                &record.event,
                &record.handler,
                record.use_capture,
            );
        }
        if !removed.is_empty() {
            tracing::debug!("Detached {} listener(s) for `{}` on {:?}", removed.len(), event_names, node);
        }

        Ok(removed.len())
    }

    /// Records attached to `node`
    pub fn records_for(&self, node: &ElementRef) -> Vec<EventRecord> {
        self.records.borrow().iter().filter(|r| r.node == *node).cloned().collect()
    }

    /// Detach everything and empty the table
    pub fn reset(&self) {
        let records = std::mem::take(&mut *self.records.borrow_mut());
        for record in &records {
            record.node.document().remove_event_listener(
                record.node.node(),
                &record.event,
                &record.handler,
                record.use_capture,
            );
        }
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }
}

impl fmt::Debug for DomEventTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomEventTracker").field("records", &self.len()).finish()
    }
}

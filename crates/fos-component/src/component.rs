//! Component binding lifecycle
//!
//! A [`Component`] declares two tables: `events` (DOM events on its root,
//! optionally delegated with a selector) and `subscriptions` (global bus
//! events). [`ComponentInstance`] walks both tables when it mounts, records
//! each binding in its [`SubscriptionRegistry`], and reverses every one of
//! them when destroyed.
//!
//! ```text
//! Uninitialized --mount--> Bound --destroy--> Unbound
//!                            ^  |
//!                            +--+ bind_events
//! ```

use std::rc::Rc;

use fos_dom::ElementRef;
use serde_json::Value;

use crate::config::BindingConfig;
use crate::context::Context;
use crate::descriptor::{parse_key, Binding, EventDescriptor, ParseError};
use crate::expression::{ExpressionResolver, NamedScope};
use crate::handler::{Handler, MethodTable};
use crate::registry::{Subscriber, SubscriberKind, SubscriptionRegistry};
use crate::tracker::{DomEventTracker, HandlerFilter};

/// Ordered `(key, method)` declarations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventTable {
    entries: Vec<(String, String)>,
}

impl EventTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: declare `key` handled by `method`
    pub fn on(mut self, key: &str, method: &str) -> Self {
        self.entries.push((key.to_string(), method.to_string()));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.entries.iter().map(|(k, m)| (k.as_str(), m.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, M: Into<String>> FromIterator<(K, M)> for EventTable {
    fn from_iter<I: IntoIterator<Item = (K, M)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, m)| (k.into(), m.into())).collect(),
        }
    }
}

/// A UI component with declarative event bindings.
///
/// Only `methods` is required. Lifecycle hooks default to no-ops.
pub trait Component {
    /// DOM event declarations: `"<event>[.ns] [<selector>]"` → method
    fn events(&self) -> EventTable {
        EventTable::new()
    }

    /// Global bus declarations: `"<event>"` → method
    fn subscriptions(&self) -> EventTable {
        EventTable::new()
    }

    /// Methods available to the declarations
    fn methods(&self) -> MethodTable;

    /// Values reachable as `{{this.…}}` in event-name tokens
    fn expression_scope(&self) -> Value {
        Value::Null
    }

    fn will_mount(&mut self) {}

    fn did_mount(&mut self) {}

    fn will_unmount(&mut self) {}

    fn did_unmount(&mut self) {}
}

/// Binding state of a component instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Bound,
    /// Terminal
    Unbound,
}

/// Binding errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Method `{method}` declared for `{key}` does not exist")]
    UnknownMethod { key: String, method: String },

    #[error("Component is not bound")]
    NotBound,

    #[error("Component has been destroyed")]
    Destroyed,
}

/// A binding that passed validation and is ready to attach
struct PlannedBinding {
    method: String,
    descriptor: EventDescriptor,
    handler: Handler,
}

/// A component together with its bindings
pub struct ComponentInstance<C: Component> {
    component: C,
    root: ElementRef,
    context: Context,
    tracker: Rc<DomEventTracker>,
    config: BindingConfig,
    resolver: ExpressionResolver,
    registry: SubscriptionRegistry,
    state: LifecycleState,
}

impl<C: Component> ComponentInstance<C> {
    /// Wrap a component without binding anything
    pub fn new(component: C, root: ElementRef, context: Context, tracker: Rc<DomEventTracker>) -> Self {
        Self::with_config(component, root, context, tracker, BindingConfig::default())
    }

    pub fn with_config(
        component: C,
        root: ElementRef,
        context: Context,
        tracker: Rc<DomEventTracker>,
        config: BindingConfig,
    ) -> Self {
        Self {
            component,
            root,
            context,
            tracker,
            resolver: ExpressionResolver::from_config(&config),
            config,
            registry: SubscriptionRegistry::new(),
            state: LifecycleState::Uninitialized,
        }
    }

    /// Construct and mount in one step
    pub fn create(component: C, root: ElementRef, context: Context, tracker: Rc<DomEventTracker>) -> Result<Self, BindError> {
        let mut instance = Self::new(component, root, context, tracker);
        instance.mount()?;
        Ok(instance)
    }

    /// Run the creation sequence: `will_mount`, the binding pass, `did_mount`.
    ///
    /// On a fatal declaration error nothing is attached and the instance
    /// stays uninitialized.
    pub fn mount(&mut self) -> Result<usize, BindError> {
        match self.state {
            LifecycleState::Uninitialized => {}
            LifecycleState::Bound => return Ok(0),
            LifecycleState::Unbound => return Err(BindError::Destroyed),
        }

        self.component.will_mount();
        let bound = self.bind_all()?;
        self.state = LifecycleState::Bound;
        self.component.did_mount();

        tracing::debug!("Mounted component on {:?} with {} binding(s)", self.root, bound);
        Ok(bound)
    }

    /// Re-run the binding pass against the current declarations.
    ///
    /// Entries whose id is already registered are detached and replaced.
    pub fn bind_events(&mut self) -> Result<usize, BindError> {
        match self.state {
            LifecycleState::Bound => self.bind_all(),
            LifecycleState::Uninitialized => Err(BindError::NotBound),
            LifecycleState::Unbound => Err(BindError::Destroyed),
        }
    }

    fn bind_all(&mut self) -> Result<usize, BindError> {
        let methods = self.component.methods();
        let instance_scope = self.component.expression_scope();
        let events = self.component.events();
        let subscriptions = self.component.subscriptions();

        // Validate everything before attaching anything
        let mut plans = Vec::with_capacity(events.len() + subscriptions.len());
        for (table, binding) in [(&events, Binding::Local), (&subscriptions, Binding::Global)] {
            for (key, method) in table.iter() {
                if let Some(plan) = self.plan(key, method, binding, &methods, &instance_scope)? {
                    plans.push(plan);
                }
            }
        }

        let mut bound = 0;
        for plan in plans {
            if self.attach(plan) {
                bound += 1;
            }
        }
        Ok(bound)
    }

    fn parse(&self, key: &str, binding: Binding, instance_scope: &Value) -> Result<EventDescriptor, ParseError> {
        let context_scope = NamedScope::new(&self.config.context_scope, self.context.values());
        let event_scopes = [context_scope, NamedScope::new(&self.config.instance_scope, instance_scope)];
        parse_key(key, binding, &self.resolver, &event_scopes, &[context_scope])
    }

    fn plan(
        &self,
        key: &str,
        method: &str,
        binding: Binding,
        methods: &MethodTable,
        instance_scope: &Value,
    ) -> Result<Option<PlannedBinding>, BindError> {
        // A malformed key aborts the pass even when its method is missing
        let descriptor = match self.parse(key, binding, instance_scope) {
            Ok(descriptor) => descriptor,
            Err(err) if err.is_fatal() => {
                tracing::error!("Aborting binding pass on {:?}: {}", self.root, err);
                return Err(err.into());
            }
            Err(err) => {
                tracing::warn!("Skipping `{}` -> `{}`: {}", key, method, err);
                return Ok(None);
            }
        };

        if method.trim().is_empty() {
            tracing::warn!("Skipping `{}`: no method name", key);
            return Ok(None);
        }

        let Some(handler) = methods.get(method) else {
            tracing::error!("Aborting binding pass on {:?}: unknown method `{}` for `{}`", self.root, method, key);
            return Err(BindError::UnknownMethod {
                key: key.to_string(),
                method: method.to_string(),
            });
        };

        Ok(Some(PlannedBinding {
            method: method.to_string(),
            descriptor,
            handler: handler.clone(),
        }))
    }

    fn attach(&mut self, plan: PlannedBinding) -> bool {
        let PlannedBinding { method, descriptor, handler } = plan;
        let kind = SubscriberKind::from(descriptor.scope);
        let delegate = descriptor.delegate_selector;
        let id = Subscriber::make_id(kind, &descriptor.event, delegate.as_deref(), &method);

        if kind == SubscriberKind::GlobalEvent && self.context.vent().is_none() {
            tracing::warn!("No global bus in context; `{}` -> `{}` not subscribed", descriptor.event, method);
            return false;
        }

        // Same id means same binding: retire the old one before replacing it
        if let Some(previous) = self.registry.remove(&id) {
            tracing::debug!("Replacing subscriber {}", id);
            self.detach(&previous);
        }

        let listeners = match kind {
            SubscriberKind::GlobalEvent => {
                if let Some(vent) = self.context.vent() {
                    vent.subscribe(&descriptor.event, handler.clone());
                }
                Vec::new()
            }
            SubscriberKind::Event | SubscriberKind::DelegatedEvent => {
                let attached = self.tracker.on(
                    &self.root,
                    &descriptor.event,
                    delegate.as_deref(),
                    &handler,
                    self.config.use_capture,
                );
                match attached {
                    Ok(listeners) => listeners,
                    Err(err) => {
                        tracing::warn!("Skipping `{}` -> `{}`: {}", descriptor.event, method, err);
                        return false;
                    }
                }
            }
        };

        self.registry.add(Subscriber {
            id,
            kind,
            event: descriptor.event,
            delegate,
            method,
            handler,
            listeners,
        });
        true
    }

    /// Reverse one binding. DOM bindings are matched by their own wrappers,
    /// since several subscribers may share a method handler.
    fn detach(&self, subscriber: &Subscriber) {
        if subscriber.kind == SubscriberKind::GlobalEvent {
            match self.context.vent() {
                Some(vent) => {
                    vent.unsubscribe(&subscriber.event, &subscriber.handler);
                }
                None => tracing::warn!("No global bus in context; `{}` not unsubscribed", subscriber.event),
            }
            return;
        }

        for listener in &subscriber.listeners {
            let filter = Some(HandlerFilter::Wrapper(listener));
            let result = self.tracker.off(&self.root, &subscriber.event, subscriber.delegate.as_deref(), filter);
            if let Err(err) = result {
                tracing::warn!("Could not detach {}: {}", subscriber.id, err);
            }
        }
    }

    fn unregister(&mut self, key: &str, method: &str, binding: Binding) -> Result<bool, BindError> {
        match self.state {
            LifecycleState::Bound => {}
            LifecycleState::Uninitialized => return Err(BindError::NotBound),
            LifecycleState::Unbound => return Err(BindError::Destroyed),
        }

        let instance_scope = self.component.expression_scope();
        let descriptor = self.parse(key, binding, &instance_scope)?;
        let kind = SubscriberKind::from(descriptor.scope);
        let id = Subscriber::make_id(kind, &descriptor.event, descriptor.delegate_selector.as_deref(), method);

        match self.registry.remove(&id) {
            Some(subscriber) => {
                self.detach(&subscriber);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Detach one `events` declaration. Returns `false` if it was not bound.
    pub fn unregister_event(&mut self, key: &str, method: &str) -> Result<bool, BindError> {
        self.unregister(key, method, Binding::Local)
    }

    /// Detach one `subscriptions` declaration. Returns `false` if it was not bound.
    pub fn unregister_subscription(&mut self, key: &str, method: &str) -> Result<bool, BindError> {
        self.unregister(key, method, Binding::Global)
    }

    /// Tear down every binding. Terminal: the registry keeps its entries but
    /// no further detach is ever issued for them.
    pub fn destroy(&mut self) -> Result<(), BindError> {
        if self.state == LifecycleState::Unbound {
            return Err(BindError::Destroyed);
        }

        self.component.will_unmount();
        let subscribers = self.registry.all();
        for subscriber in &subscribers {
            self.detach(subscriber);
        }
        self.state = LifecycleState::Unbound;
        self.component.did_unmount();

        tracing::debug!("Destroyed component on {:?}; {} binding(s) released", self.root, subscribers.len());
        Ok(())
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    pub fn root(&self) -> &ElementRef {
        &self.root
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn component(&self) -> &C {
        &self.component
    }

    pub fn component_mut(&mut self) -> &mut C {
        &mut self.component
    }
}

impl<C: Component> Drop for ComponentInstance<C> {
    fn drop(&mut self) {
        if self.state == LifecycleState::Bound {
            tracing::warn!("Component on {:?} dropped while bound; tearing down", self.root);
            let _ = self.destroy();
        }
    }
}

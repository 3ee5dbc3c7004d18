//! Component binding lifecycle tests
//!
//! Binding, delegation, teardown and failure handling end to end, against a
//! real document and a shared tracker.

use std::cell::{Cell, RefCell};
use std::io;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use fos_component::{
    BindError, Component, ComponentInstance, Context, DomEventTracker, EventTable, GlobalBus, Handler,
    LifecycleState, MethodTable, ParseError, Signal, SubscriberKind, Vent,
};
use fos_dom::{Document, DomEvent, NodeId};
use serde_json::{json, Value};

// ============================================================================
// FIXTURES
// ============================================================================

/// Bus that counts calls and forwards to a real `Vent`
#[derive(Default)]
struct CountingBus {
    vent: Vent,
    subscribed: RefCell<Vec<String>>,
    unsubscribed: RefCell<Vec<String>>,
}

impl GlobalBus for CountingBus {
    fn subscribe(&self, event: &str, handler: Handler) {
        self.subscribed.borrow_mut().push(event.to_string());
        self.vent.subscribe(event, handler);
    }

    fn unsubscribe(&self, event: &str, handler: &Handler) -> bool {
        self.unsubscribed.borrow_mut().push(event.to_string());
        self.vent.unsubscribe(event, handler)
    }
}

type Log = Rc<RefCell<Vec<String>>>;

struct Declared {
    events: EventTable,
    subscriptions: EventTable,
    log: Log,
}

impl Declared {
    fn new(events: EventTable, subscriptions: EventTable) -> (Self, Log) {
        let log: Log = Rc::default();
        (Self { events, subscriptions, log: log.clone() }, log)
    }
}

impl Component for Declared {
    fn events(&self) -> EventTable {
        self.events.clone()
    }

    fn subscriptions(&self) -> EventTable {
        self.subscriptions.clone()
    }

    fn methods(&self) -> MethodTable {
        let mut table = MethodTable::new();
        for name in ["onClick", "onRow", "onResize", "onKey"] {
            let log = self.log.clone();
            table.insert(name, Rc::new(move |signal: Signal<'_>| {
                let entry = match signal {
                    Signal::Dom { element, .. } => format!("{name}:{element:?}"),
                    Signal::Global { event, .. } => format!("{name}:{event}"),
                };
                log.borrow_mut().push(entry);
            }));
        }
        table
    }

    fn expression_scope(&self) -> Value {
        json!({ "kind": "menu" })
    }
}

/// `div#app > ul.a > li.b > span.c`, plus `p#outside` next to the app root
struct Page {
    doc: Document,
    app: NodeId,
    a: NodeId,
    b: NodeId,
    c: NodeId,
    outside: NodeId,
}

fn page() -> Page {
    let doc = Document::default();
    let app = doc.create_element("div");
    let a = doc.create_element("ul");
    let b = doc.create_element("li");
    let c = doc.create_element("span");
    let outside = doc.create_element("p");

    doc.append_child(doc.body(), app).unwrap();
    doc.append_child(app, a).unwrap();
    doc.append_child(a, b).unwrap();
    doc.append_child(b, c).unwrap();
    doc.append_child(doc.body(), outside).unwrap();

    doc.set_attribute(app, "id", "app").unwrap();
    doc.set_attribute(a, "class", "a").unwrap();
    doc.set_attribute(b, "class", "b row").unwrap();
    doc.set_attribute(c, "class", "c").unwrap();
    doc.set_attribute(outside, "id", "outside").unwrap();

    Page { doc, app, a, b, c, outside }
}

fn context_with(bus: &Rc<CountingBus>) -> Context {
    Context::new(json!({ "EVENTS": { "toggle": "click", "resize": "app:resize" }, "rows": ".row" }))
        .with_vent(bus.clone())
}

/// Collects formatted log output for the duration of a closure
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f)
    }
}

// ============================================================================
// TRACKER NET ZERO
// ============================================================================

#[test]
fn test_on_off_same_arguments_is_net_zero() {
    let page = page();
    let tracker = DomEventTracker::new();
    let handler: Handler = Rc::new(|_: Signal<'_>| {});
    let node = page.doc.element(page.app);

    for key in ["click", "keyup.form", "focus blur", "mouseenter.menu.sub"] {
        let before = tracker.len();
        tracker.on(&node, key, None, &handler, false).unwrap();
        tracker.off(&node, key, None, None).unwrap();
        assert_eq!(tracker.len(), before, "net change for `{}`", key);
    }
    assert_eq!(page.doc.total_listener_count(), 0);
}

// ============================================================================
// DELEGATION
// ============================================================================

#[test]
fn test_delegation_matches_nearest_ancestor_of_target() {
    let page = page();
    let tracker = DomEventTracker::shared();
    let bus = Rc::new(CountingBus::default());
    let (component, log) = Declared::new(EventTable::new().on("click .b", "onRow"), EventTable::new());

    let _instance = ComponentInstance::create(component, page.doc.element(page.a), context_with(&bus), tracker)
        .unwrap();

    page.doc.dispatch_event(DomEvent::new("click", page.c));
    assert_eq!(*log.borrow(), vec![format!("onRow:{:?}", page.b)]);

    page.doc.dispatch_event(DomEvent::new("click", page.outside));
    page.doc.dispatch_event(DomEvent::new("click", page.app));
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn test_local_binding_receives_root_as_element() {
    let page = page();
    let bus = Rc::new(CountingBus::default());
    let (component, log) = Declared::new(EventTable::new().on("click", "onClick"), EventTable::new());

    let _instance = ComponentInstance::create(
        component,
        page.doc.element(page.app),
        context_with(&bus),
        DomEventTracker::shared(),
    )
    .unwrap();

    page.doc.dispatch_event(DomEvent::new("click", page.c));
    assert_eq!(*log.borrow(), vec![format!("onClick:{:?}", page.app)]);
}

#[test]
fn test_placeholders_resolve_from_context_and_instance() {
    let page = page();
    let tracker = DomEventTracker::shared();
    let bus = Rc::new(CountingBus::default());
    let (component, log) = Declared::new(
        EventTable::new().on("{{ctx.EVENTS.toggle}}.{{this.kind}} {{ctx.rows}}", "onRow"),
        EventTable::new().on("{{ctx.EVENTS.resize}}", "onResize"),
    );

    let instance = ComponentInstance::create(component, page.doc.element(page.app), context_with(&bus), tracker.clone())
        .unwrap();

    let records = tracker.records_for(instance.root());
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].event, "click");
    assert_eq!(records[0].namespace.as_deref(), Some("menu"));
    assert_eq!(records[0].selector.as_deref(), Some(".row"));
    assert_eq!(*bus.subscribed.borrow(), vec!["app:resize".to_string()]);

    page.doc.dispatch_event(DomEvent::new("click", page.c));
    bus.vent.publish("app:resize", &json!({ "width": 1024 }));
    assert_eq!(*log.borrow(), vec![format!("onRow:{:?}", page.b), "onResize:app:resize".to_string()]);
}

// ============================================================================
// SUBSCRIBER IDS
// ============================================================================

#[test]
fn test_same_key_and_method_registers_once() {
    let page = page();
    let tracker = DomEventTracker::shared();
    let bus = Rc::new(CountingBus::default());
    let (component, log) = Declared::new(EventTable::new().on("click", "onClick"), EventTable::new());

    let mut instance = ComponentInstance::create(component, page.doc.element(page.app), context_with(&bus), tracker.clone())
        .unwrap();
    instance.bind_events().unwrap();

    assert_eq!(instance.registry().len(), 1);
    // The displaced binding was detached, not leaked
    assert_eq!(tracker.len(), 1);
    page.doc.dispatch_event(DomEvent::new("click", page.app));
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn test_duplicate_declaration_in_one_table_collapses() {
    let page = page();
    let tracker = DomEventTracker::shared();
    let bus = Rc::new(CountingBus::default());
    let (component, _) = Declared::new(
        EventTable::new().on("click", "onClick").on("click", "onClick"),
        EventTable::new(),
    );

    let instance = ComponentInstance::create(component, page.doc.element(page.app), context_with(&bus), tracker.clone())
        .unwrap();
    assert_eq!(instance.registry().len(), 1);
    assert_eq!(tracker.len(), 1);
}

#[test]
fn test_different_keys_same_method_are_independent() {
    let page = page();
    let tracker = DomEventTracker::shared();
    let bus = Rc::new(CountingBus::default());
    let (component, _) = Declared::new(
        EventTable::new().on("click", "onClick").on("click .btn", "onClick").on("click", "onKey"),
        EventTable::new(),
    );

    let instance = ComponentInstance::create(component, page.doc.element(page.app), context_with(&bus), tracker.clone())
        .unwrap();

    assert_eq!(instance.registry().len(), 3);
    assert_eq!(instance.registry().of_kind(SubscriberKind::Event).count(), 2);
    assert_eq!(instance.registry().of_kind(SubscriberKind::DelegatedEvent).count(), 1);
    assert_eq!(tracker.len(), 3);
}

// ============================================================================
// TEARDOWN
// ============================================================================

#[test]
fn test_destroy_restores_baseline_and_unsubscribes_once_per_key() {
    let page = page();
    let tracker = DomEventTracker::shared();
    let bus = Rc::new(CountingBus::default());

    // Unrelated listener owned by someone else
    let other: Handler = Rc::new(|_: Signal<'_>| {});
    tracker.on(&page.doc.element(page.outside), "click", None, &other, false).unwrap();
    let baseline = tracker.len();

    let (component, _) = Declared::new(
        EventTable::new().on("click", "onClick").on("click .b", "onRow").on("keydown.form", "onKey"),
        EventTable::new().on("app:resize", "onResize").on("app:theme", "onClick"),
    );
    let mut instance = ComponentInstance::create(component, page.doc.element(page.app), context_with(&bus), tracker.clone())
        .unwrap();
    assert_eq!(tracker.len(), baseline + 3);
    assert_eq!(bus.vent.len(), 2);

    instance.destroy().unwrap();

    assert_eq!(tracker.len(), baseline);
    assert_eq!(page.doc.total_listener_count(), baseline);
    let mut unsubscribed = bus.unsubscribed.borrow().clone();
    unsubscribed.sort();
    assert_eq!(unsubscribed, vec!["app:resize".to_string(), "app:theme".to_string()]);
    assert!(bus.vent.is_empty());

    // Entries stay behind but are inert
    assert_eq!(instance.state(), LifecycleState::Unbound);
    assert_eq!(instance.registry().len(), 5);
    assert_eq!(instance.destroy(), Err(BindError::Destroyed));
    assert_eq!(bus.unsubscribed.borrow().len(), 2);
}

#[test]
fn test_unregister_single_event_leaves_others() {
    let page = page();
    let tracker = DomEventTracker::shared();
    let bus = Rc::new(CountingBus::default());
    let (component, log) = Declared::new(
        EventTable::new().on("click", "onClick").on("click .b", "onRow"),
        EventTable::new().on("app:resize", "onResize"),
    );
    let mut instance = ComponentInstance::create(component, page.doc.element(page.app), context_with(&bus), tracker.clone())
        .unwrap();

    assert_eq!(instance.unregister_event("click .b", "onRow"), Ok(true));
    assert_eq!(instance.unregister_event("click .b", "onRow"), Ok(false));
    assert_eq!(instance.unregister_event("click", "onOther"), Ok(false));
    assert_eq!(instance.unregister_subscription("app:resize", "onResize"), Ok(true));

    assert_eq!(instance.registry().len(), 1);
    assert_eq!(tracker.len(), 1);
    assert!(bus.vent.is_empty());

    page.doc.dispatch_event(DomEvent::new("click", page.c));
    assert_eq!(*log.borrow(), vec![format!("onClick:{:?}", page.app)]);

    assert!(matches!(
        instance.unregister_event("a b c", "onClick"),
        Err(BindError::Parse(ParseError::TooManyTokens { .. }))
    ));
}

#[test]
fn test_handler_subscribing_during_teardown_does_not_disturb_it() {
    struct Reentrant {
        vent: Rc<Vent>,
        late: Rc<Cell<bool>>,
    }

    impl Component for Reentrant {
        fn subscriptions(&self) -> EventTable {
            EventTable::new().on("app:bye", "onBye")
        }

        fn methods(&self) -> MethodTable {
            let vent = self.vent.clone();
            let late = self.late.clone();
            MethodTable::new().method("onBye", move |_| {
                vent.subscribe("app:late", Rc::new(|_: Signal<'_>| {}));
                late.set(true);
            })
        }

        fn will_unmount(&mut self) {
            self.vent.publish("app:bye", &Value::Null);
        }
    }

    let page = page();
    let vent = Rc::new(Vent::new());
    let late = Rc::new(Cell::new(false));
    let mut instance = ComponentInstance::create(
        Reentrant { vent: vent.clone(), late: late.clone() },
        page.doc.element(page.app),
        Context::default().with_vent(vent.clone()),
        DomEventTracker::shared(),
    )
    .unwrap();

    instance.destroy().unwrap();
    assert!(late.get());
    assert_eq!(vent.subscriber_count("app:bye"), 0);
    assert_eq!(vent.subscriber_count("app:late"), 1);
}

// ============================================================================
// SHARED HANDLERS
// ============================================================================

/// Two method names backed by one handler
struct Aliased {
    hits: Rc<Cell<usize>>,
}

impl Component for Aliased {
    fn events(&self) -> EventTable {
        EventTable::new().on("click", "onClick").on("click", "handleClick")
    }

    fn methods(&self) -> MethodTable {
        let hits = self.hits.clone();
        let handler: Handler = Rc::new(move |_: Signal<'_>| hits.set(hits.get() + 1));
        let mut table = MethodTable::new();
        table.insert("onClick", handler.clone());
        table.insert("handleClick", handler);
        table
    }
}

#[test]
fn test_unregister_keeps_listener_of_alias_sharing_the_handler() {
    let page = page();
    let tracker = DomEventTracker::shared();
    let hits = Rc::new(Cell::new(0));
    let mut instance = ComponentInstance::create(
        Aliased { hits: hits.clone() },
        page.doc.element(page.app),
        Context::default(),
        tracker.clone(),
    )
    .unwrap();
    assert_eq!(tracker.len(), 2);

    assert_eq!(instance.unregister_event("click", "onClick"), Ok(true));
    assert_eq!(instance.registry().len(), 1);
    assert_eq!(tracker.len(), 1);

    page.doc.dispatch_event(DomEvent::new("click", page.app));
    assert_eq!(hits.get(), 1);

    instance.destroy().unwrap();
    assert!(tracker.is_empty());
    assert_eq!(page.doc.total_listener_count(), 0);
}

#[test]
fn test_unregister_leaves_overlapping_multi_name_binding_intact() {
    let page = page();
    let tracker = DomEventTracker::shared();
    let (component, log) = Declared::new(
        EventTable::new().on("{{ctx.both}}", "onClick").on("click", "onClick"),
        EventTable::new(),
    );
    let mut instance = ComponentInstance::create(
        component,
        page.doc.element(page.app),
        Context::new(json!({ "both": "click keyup" })),
        tracker.clone(),
    )
    .unwrap();
    assert_eq!(tracker.len(), 3);

    assert_eq!(instance.unregister_event("click", "onClick"), Ok(true));
    assert_eq!(instance.registry().len(), 1);
    assert_eq!(tracker.len(), 2);

    page.doc.dispatch_event(DomEvent::new("click", page.app));
    page.doc.dispatch_event(DomEvent::new("keyup", page.app));
    assert_eq!(log.borrow().len(), 2);

    instance.destroy().unwrap();
    assert!(tracker.is_empty());
}

// ============================================================================
// FAILURES
// ============================================================================

#[test]
fn test_three_token_key_rejects_whole_pass() {
    let page = page();
    let tracker = DomEventTracker::shared();
    let bus = Rc::new(CountingBus::default());
    let (component, _) = Declared::new(
        EventTable::new().on("keyup", "onKey").on("click .a .b", "onClick"),
        EventTable::new().on("app:resize", "onResize"),
    );

    let mut instance = ComponentInstance::new(component, page.doc.element(page.app), context_with(&bus), tracker.clone());
    let err = instance.mount().unwrap_err();

    assert_eq!(err, BindError::Parse(ParseError::TooManyTokens { key: "click .a .b".to_string(), count: 3 }));
    assert_eq!(instance.state(), LifecycleState::Uninitialized);
    assert!(instance.registry().is_empty());
    assert!(tracker.is_empty());
    assert!(bus.subscribed.borrow().is_empty());
}

#[test]
fn test_two_token_key_is_delegated() {
    let page = page();
    let bus = Rc::new(CountingBus::default());
    let (component, _) = Declared::new(EventTable::new().on("click .btn", "onClick"), EventTable::new());

    let instance = ComponentInstance::create(
        component,
        page.doc.element(page.app),
        context_with(&bus),
        DomEventTracker::shared(),
    )
    .unwrap();

    let subscribers = instance.registry().all();
    assert_eq!(subscribers.len(), 1);
    assert_eq!(subscribers[0].kind, SubscriberKind::DelegatedEvent);
    assert_eq!(subscribers[0].delegate.as_deref(), Some(".btn"));
}

#[test]
fn test_unknown_method_fails_loudly() {
    let page = page();
    let tracker = DomEventTracker::shared();
    let bus = Rc::new(CountingBus::default());
    let (component, _) = Declared::new(
        EventTable::new().on("click", "onClick").on("keyup", "onMissing"),
        EventTable::new(),
    );

    let result = ComponentInstance::create(component, page.doc.element(page.app), context_with(&bus), tracker.clone());
    assert!(matches!(result, Err(BindError::UnknownMethod { ref method, .. }) if method == "onMissing"));
    assert!(tracker.is_empty());
}

#[test]
fn test_missing_bus_warns_and_skips_only_global_bindings() {
    let page = page();
    let tracker = DomEventTracker::shared();
    let captured = Captured::default();
    let (component, _) = Declared::new(
        EventTable::new().on("click", "onClick"),
        EventTable::new().on("resize", "onResize"),
    );

    let instance = captured.run(|| {
        ComponentInstance::create(
            component,
            page.doc.element(page.app),
            Context::new(json!({})),
            tracker.clone(),
        )
    })
    .unwrap();

    assert!(captured.text().contains("WARN"));
    assert!(captured.text().contains("No global bus"));
    assert_eq!(instance.registry().len(), 1);
    assert_eq!(instance.registry().of_kind(SubscriberKind::GlobalEvent).count(), 0);
    assert_eq!(tracker.len(), 1);
}

#[test]
fn test_recoverable_declarations_are_skipped() {
    let page = page();
    let tracker = DomEventTracker::shared();
    let bus = Rc::new(CountingBus::default());
    let (component, _) = Declared::new(
        EventTable::new()
            .on("", "onClick")
            .on("click", "")
            .on("{{ctx.EVENTS.unknown}}", "onClick")
            .on("keyup", "onKey"),
        EventTable::new().on("app:resize .sel", "onResize"),
    );

    let instance = ComponentInstance::create(component, page.doc.element(page.app), context_with(&bus), tracker.clone())
        .unwrap();

    assert_eq!(instance.state(), LifecycleState::Bound);
    assert_eq!(instance.registry().len(), 1);
    assert_eq!(tracker.len(), 1);
    assert!(bus.subscribed.borrow().is_empty());
}

#[test]
fn test_three_token_key_is_fatal_even_without_method() {
    let page = page();
    let tracker = DomEventTracker::shared();
    let bus = Rc::new(CountingBus::default());
    let (component, _) = Declared::new(
        EventTable::new().on("click", "onClick").on("click .a .b", ""),
        EventTable::new(),
    );

    let result = ComponentInstance::create(component, page.doc.element(page.app), context_with(&bus), tracker.clone());
    assert!(matches!(
        result,
        Err(BindError::Parse(ParseError::TooManyTokens { count: 3, .. }))
    ));
    assert!(tracker.is_empty());
    assert_eq!(page.doc.total_listener_count(), 0);
}

//! Example: a todo list bound through declarative event tables
//!
//! Run with `RUST_LOG=fos_component=debug` to watch bindings attach and
//! detach.

use std::cell::RefCell;
use std::rc::Rc;

use fos_component::{
    BindingConfig, Component, ComponentInstance, Context, DomEventTracker, EventTable, MethodTable, Signal, Vent,
};
use fos_dom::{Document, DomEvent};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Default)]
struct TodoList {
    done: Rc<RefCell<Vec<String>>>,
}

impl Component for TodoList {
    fn events(&self) -> EventTable {
        EventTable::new()
            .on("{{ctx.EVENTS.toggle}}.todo {{ctx.selectors.item}}", "onToggle")
            .on("keyup.todo", "onKey")
    }

    fn subscriptions(&self) -> EventTable {
        EventTable::new().on("{{ctx.EVENTS.reset}}", "onReset")
    }

    fn methods(&self) -> MethodTable {
        let toggled = self.done.clone();
        let reset = self.done.clone();
        MethodTable::new()
            .method("onToggle", move |signal| {
                if let Signal::Dom { document, element, .. } = signal {
                    let label = document
                        .tree()
                        .element(element)
                        .and_then(|e| e.get_attr("data-label").map(str::to_string))
                        .unwrap_or_default();
                    println!("toggled {label}");
                    toggled.borrow_mut().push(label);
                }
            })
            .method("onKey", |signal| println!("key event: {}", signal.event_name()))
            .method("onReset", move |signal| {
                if let Signal::Global { payload, .. } = signal {
                    println!("reset requested: {payload}");
                }
                reset.borrow_mut().clear();
            })
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let doc = Document::new("about:todo");
    let list = doc.create_element("ul");
    doc.append_child(doc.body(), list)?;

    let mut items = Vec::new();
    for label in ["milk", "bread", "eggs"] {
        let item = doc.create_element("li");
        let text = doc.create_element("span");
        doc.append_child(list, item)?;
        doc.append_child(item, text)?;
        doc.set_attribute(item, "class", "item")?;
        doc.set_attribute(item, "data-label", label)?;
        items.push(text);
    }

    let vent = Rc::new(Vent::new());
    let context = Context::new(json!({
        "EVENTS": { "toggle": "click", "reset": "todo:reset" },
        "selectors": { "item": ".item" },
    }))
    .with_vent(vent.clone());

    let config = BindingConfig::from_json(r#"{ "use_capture": false }"#)?;
    let tracker = DomEventTracker::shared();
    let component = TodoList::default();
    let done = component.done.clone();

    let mut instance = ComponentInstance::with_config(component, doc.element(list), context, tracker.clone(), config);
    let bound = instance.mount()?;
    println!("fos-component v{}: {} binding(s), {} listener(s)", fos_component::VERSION, bound, tracker.len());

    for &text in &items[..2] {
        doc.dispatch_event(DomEvent::new("click", text));
    }
    doc.dispatch_event(DomEvent::new("keyup", items[2]));
    println!("done: {:?}", done.borrow());

    vent.publish("todo:reset", &json!({ "source": "demo" }));
    println!("after reset: {:?}", done.borrow());

    instance.destroy()?;
    println!("after destroy: {} listener(s), {} bus subscriber(s)", doc.total_listener_count(), vent.len());

    Ok(())
}

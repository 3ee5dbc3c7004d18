//! fOS Components - declarative event binding
//!
//! Components declare the events they react to as string-keyed tables:
//!
//! - `"click"` binds a listener on the component root,
//! - `"click .btn"` delegates from the root to descendants matching `.btn`,
//! - subscription keys such as `"app:resize"` go through the global bus.
//!
//! Keys may embed `{{path}}` placeholders resolved against the host context.
//! Every binding is recorded so the component can release all of them when
//! it is destroyed.

mod bus;
mod component;
mod config;
mod context;
mod descriptor;
mod expression;
mod handler;
mod registry;
mod tracker;

pub use bus::{GlobalBus, Vent};
pub use component::{BindError, Component, ComponentInstance, EventTable, LifecycleState};
pub use config::BindingConfig;
pub use context::Context;
pub use descriptor::{parse_key, split_event_name, Binding, EventDescriptor, ParseError, Scope};
pub use expression::{ExpressionResolver, NamedScope};
pub use handler::{same_handler, Handler, MethodTable, Signal};
pub use registry::{Subscriber, SubscriberKind, SubscriptionRegistry};
pub use tracker::{DomEventTracker, EventRecord, HandlerFilter, TrackerError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

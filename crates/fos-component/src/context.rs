//! Host context handed to components
//!
//! Carries the configuration values placeholders resolve against and,
//! optionally, the global bus (`Vent`).

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::bus::GlobalBus;

/// Application context
#[derive(Clone, Default)]
pub struct Context {
    values: Value,
    vent: Option<Rc<dyn GlobalBus>>,
}

impl Context {
    pub fn new(values: Value) -> Self {
        Self { values, vent: None }
    }

    /// Attach the global bus
    pub fn with_vent(mut self, vent: Rc<dyn GlobalBus>) -> Self {
        self.vent = Some(vent);
        self
    }

    /// Values reachable from placeholders
    pub fn values(&self) -> &Value {
        &self.values
    }

    /// The global bus, if the host provides one
    pub fn vent(&self) -> Option<&Rc<dyn GlobalBus>> {
        self.vent.as_ref()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("values", &self.values)
            .field("vent", &self.vent.is_some())
            .finish()
    }
}

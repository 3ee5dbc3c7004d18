//! Binding Configuration

use serde::Deserialize;

/// Options controlling how declared event keys are resolved and attached
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BindingConfig {
    /// Opening delimiter of an embedded expression
    pub placeholder_open: String,

    /// Closing delimiter of an embedded expression
    pub placeholder_close: String,

    /// Attach DOM listeners in the capture phase
    pub use_capture: bool,

    /// Path root naming the host context, e.g. `{{ctx.EVENTS.resize}}`
    pub context_scope: String,

    /// Path root naming the component instance, e.g. `{{this.kind}}`
    pub instance_scope: String,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            placeholder_open: "{{".to_string(),
            placeholder_close: "}}".to_string(),
            use_capture: false,
            context_scope: "ctx".to_string(),
            instance_scope: "this".to_string(),
        }
    }
}

impl BindingConfig {
    /// Load from JSON; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

//! Expression Placeholders
//!
//! Resolves `{{dotted.path}}` placeholders embedded in event keys against
//! named JSON scopes. Resolution never fails: a path that cannot be followed
//! yields an empty string.

use std::borrow::Cow;

use serde_json::Value;

use crate::BindingConfig;

/// A JSON value reachable under a path root such as `ctx` or `this`
#[derive(Debug, Clone, Copy)]
pub struct NamedScope<'a> {
    pub name: &'a str,
    pub value: &'a Value,
}

impl<'a> NamedScope<'a> {
    pub fn new(name: &'a str, value: &'a Value) -> Self {
        Self { name, value }
    }
}

/// Placeholder resolver
#[derive(Debug, Clone)]
pub struct ExpressionResolver {
    open: String,
    close: String,
}

impl Default for ExpressionResolver {
    fn default() -> Self {
        Self::from_config(&BindingConfig::default())
    }
}

impl ExpressionResolver {
    pub fn new(open: &str, close: &str) -> Self {
        Self { open: open.to_string(), close: close.to_string() }
    }

    pub fn from_config(config: &BindingConfig) -> Self {
        Self::new(&config.placeholder_open, &config.placeholder_close)
    }

    /// Check whether `token` holds at least one complete placeholder
    pub fn is_placeholder(&self, token: &str) -> bool {
        token
            .find(self.open.as_str())
            .is_some_and(|start| token[start + self.open.len()..].contains(self.close.as_str()))
    }

    /// Substitute every placeholder in `token`. Literal tokens are returned
    /// borrowed and unchanged; an unterminated opener is kept as text.
    pub fn resolve<'t>(&self, token: &'t str, scopes: &[NamedScope<'_>]) -> Cow<'t, str> {
        if self.open.is_empty() || self.close.is_empty() || !self.is_placeholder(token) {
            return Cow::Borrowed(token);
        }

        let mut out = String::with_capacity(token.len());
        let mut rest = token;
        while let Some(start) = rest.find(self.open.as_str()) {
            let after_open = &rest[start + self.open.len()..];
            let Some(end) = after_open.find(self.close.as_str()) else {
                break;
            };
            out.push_str(&rest[..start]);

            let expr = after_open[..end].trim();
            match self.evaluate(expr, scopes) {
                Some(value) => out.push_str(&coerce(value)),
                None => tracing::debug!("Unresolved expression `{}` in `{}`", expr, token),
            }
            rest = &after_open[end + self.close.len()..];
        }
        out.push_str(rest);

        Cow::Owned(out)
    }

    /// Evaluate a dotted path. A leading segment naming a scope selects it;
    /// otherwise the whole path is tried against each scope in order.
    pub fn evaluate<'v>(&self, expr: &str, scopes: &[NamedScope<'v>]) -> Option<&'v Value> {
        if expr.is_empty() {
            return None;
        }
        let segments: Vec<&str> = expr.split('.').map(str::trim).collect();

        if let Some(scope) = scopes.iter().find(|s| s.name == segments[0]) {
            return lookup(scope.value, &segments[1..]);
        }
        scopes.iter().find_map(|scope| lookup(scope.value, &segments))
    }
}

fn lookup<'v>(mut value: &'v Value, segments: &[&str]) -> Option<&'v Value> {
    for segment in segments {
        value = match value {
            Value::Object(map) => map.get(*segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(value)
}

/// String form used in event names and selectors
fn coerce(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => {
            tracing::debug!("Expression resolved to a non-scalar value: {}", value);
            String::new()
        }
    }
}

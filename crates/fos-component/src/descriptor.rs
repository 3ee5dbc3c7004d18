//! Event Key Parsing
//!
//! Turns a declared key such as `"click .btn"` or `"{{ctx.EVENTS.resize}}"`
//! into an [`EventDescriptor`].

use crate::expression::{ExpressionResolver, NamedScope};

/// Which declaration table a key came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// `events` table: DOM listeners on the component root
    Local,
    /// `subscribe` table: global bus subscriptions
    Global,
}

/// Binding strategy of a parsed key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Local,
    Delegated,
    Global,
}

/// Parsed binding intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDescriptor {
    /// Resolved first token, handed to the tracker or bus as-is. May name
    /// several space separated events if an expression resolved that way.
    pub event: String,
    /// `event` up to the first dot
    pub event_type: String,
    /// `event` after the first dot
    pub namespace: Option<String>,
    /// Resolved second token
    pub delegate_selector: Option<String>,
    pub scope: Scope,
}

/// Key parsing errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Event key is empty")]
    Empty,

    #[error("Event key `{key}` has {count} tokens; expected `<event> [<selector>]`")]
    TooManyTokens { key: String, count: usize },

    #[error("Global event key `{key}` cannot carry a delegate selector")]
    DelegatedGlobal { key: String },
}

impl ParseError {
    /// Fatal errors abort the whole binding pass; the rest skip one entry
    pub fn is_fatal(&self) -> bool {
        matches!(self, ParseError::TooManyTokens { .. })
    }
}

/// Split `name` into `(event, namespace)` on the first dot
pub fn split_event_name(name: &str) -> (&str, Option<&str>) {
    match name.split_once('.') {
        Some((event, ns)) if !ns.is_empty() => (event, Some(ns)),
        Some((event, _)) => (event, None),
        None => (name, None),
    }
}

/// Parse and resolve a declared key.
///
/// `event_scopes` apply to the event-name token; `selector_scopes` to the
/// delegate selector token.
pub fn parse_key(
    key: &str,
    binding: Binding,
    resolver: &ExpressionResolver,
    event_scopes: &[NamedScope<'_>],
    selector_scopes: &[NamedScope<'_>],
) -> Result<EventDescriptor, ParseError> {
    let tokens: Vec<&str> = key.split_whitespace().collect();

    let (event_token, selector_token) = match tokens.as_slice() {
        [] => return Err(ParseError::Empty),
        [event] => (*event, None),
        [event, selector] => (*event, Some(*selector)),
        _ => {
            return Err(ParseError::TooManyTokens {
                key: key.to_string(),
                count: tokens.len(),
            })
        }
    };

    let scope = match (binding, selector_token) {
        (Binding::Local, None) => Scope::Local,
        (Binding::Global, None) => Scope::Global,
        (Binding::Local, Some(_)) => Scope::Delegated,
        (Binding::Global, Some(_)) => {
            return Err(ParseError::DelegatedGlobal { key: key.to_string() })
        }
    };

    let event = resolver.resolve(event_token, event_scopes).into_owned();
    let delegate_selector = selector_token
        .map(|token| resolver.resolve(token, selector_scopes).into_owned());

    let (event_type, namespace) = {
        let first = event.split_whitespace().next().unwrap_or("");
        let (event_type, namespace) = split_event_name(first);
        (event_type.to_string(), namespace.map(str::to_string))
    };

    Ok(EventDescriptor {
        event,
        event_type,
        namespace,
        delegate_selector,
        scope,
    })
}

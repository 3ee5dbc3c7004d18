//! Element Query and Methods
//!
//! querySelector, closest, matches over compound selectors.
//!
//! Supported grammar: a comma separated list of compound selectors, each a
//! run of `tag`, `*`, `.class`, `#id`, `[attr]` and `[attr=value]` parts.
//! Combinators are not supported; a selector containing one never matches.

use crate::{DomTree, ElementData, NodeId};

/// Element query trait
pub trait ElementQuery {
    /// Query first element in document order under `root` matching `selector`
    fn query_selector(&self, root: NodeId, selector: &str) -> Option<NodeId>;

    /// Query all elements under `root` matching `selector`
    fn query_selector_all(&self, root: NodeId, selector: &str) -> Vec<NodeId>;

    /// Find closest ancestor-or-self matching selector
    fn closest(&self, element: NodeId, selector: &str) -> Option<NodeId>;

    /// Check if element matches selector
    fn matches(&self, element: NodeId, selector: &str) -> bool;
}

/// Simple selector for matching
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleSelector {
    Tag(String),
    Class(String),
    Id(String),
    Attribute { name: String, value: Option<String> },
    Universal,
}

impl SimpleSelector {
    /// Match against a single element
    pub fn matches(&self, elem: &ElementData) -> bool {
        match self {
            Self::Universal => true,
            Self::Tag(tag) => elem.tag.eq_ignore_ascii_case(tag),
            Self::Id(id) => elem.id.as_deref() == Some(id.as_str()),
            Self::Class(class) => elem.has_class(class),
            Self::Attribute { name, value: None } => elem.get_attr(name).is_some(),
            Self::Attribute { name, value: Some(v) } => elem.get_attr(name) == Some(v.as_str()),
        }
    }
}

/// A run of simple selectors that must all match one element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundSelector {
    parts: Vec<SimpleSelector>,
}

impl CompoundSelector {
    /// Parse a compound selector such as `button.primary[data-role=tab]`
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() || s.contains(|c: char| c.is_whitespace() || matches!(c, '>' | '+' | '~')) {
            return None;
        }

        let mut parts = Vec::new();
        let mut rest = s;

        // Leading type selector
        let tag_len = rest.find(['.', '#', '[']).unwrap_or(rest.len());
        if tag_len > 0 {
            let tag = &rest[..tag_len];
            if tag == "*" {
                parts.push(SimpleSelector::Universal);
            } else if is_ident(tag) {
                parts.push(SimpleSelector::Tag(tag.to_ascii_lowercase()));
            } else {
                return None;
            }
            rest = &rest[tag_len..];
        }

        while let Some(c) = rest.chars().next() {
            match c {
                '.' | '#' => {
                    let body = &rest[1..];
                    let len = body.find(['.', '#', '[']).unwrap_or(body.len());
                    let name = &body[..len];
                    if !is_ident(name) {
                        return None;
                    }
                    parts.push(if c == '.' {
                        SimpleSelector::Class(name.to_string())
                    } else {
                        SimpleSelector::Id(name.to_string())
                    });
                    rest = &body[len..];
                }
                '[' => {
                    let close = rest.find(']')?;
                    let inner = &rest[1..close];
                    let part = match inner.split_once('=') {
                        Some((name, value)) => SimpleSelector::Attribute {
                            name: name.trim().to_ascii_lowercase(),
                            value: Some(unquote(value.trim()).to_string()),
                        },
                        None => SimpleSelector::Attribute {
                            name: inner.trim().to_ascii_lowercase(),
                            value: None,
                        },
                    };
                    if let SimpleSelector::Attribute { name, .. } = &part {
                        if !is_ident(name) {
                            return None;
                        }
                    }
                    parts.push(part);
                    rest = &rest[close + 1..];
                }
                _ => return None,
            }
        }

        Some(Self { parts })
    }

    /// Match against a single element
    pub fn matches(&self, elem: &ElementData) -> bool {
        self.parts.iter().all(|p| p.matches(elem))
    }

    /// Parsed parts
    pub fn parts(&self) -> &[SimpleSelector] {
        &self.parts
    }
}

/// Comma separated selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    selectors: Vec<CompoundSelector>,
}

impl SelectorList {
    /// Parse a selector list; any invalid member invalidates the whole list
    pub fn parse(s: &str) -> Option<Self> {
        let selectors = s
            .split(',')
            .map(CompoundSelector::parse)
            .collect::<Option<Vec<_>>>()?;
        if selectors.is_empty() {
            return None;
        }
        Some(Self { selectors })
    }

    /// Match against a single element
    pub fn matches(&self, elem: &ElementData) -> bool {
        self.selectors.iter().any(|s| s.matches(elem))
    }
}

fn is_ident(s: &str) -> bool {
    !s.is_empty()
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"').and_then(|v| v.strip_suffix('"'))
        .or_else(|| s.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(s)
}

impl DomTree {
    fn matches_parsed(&self, element: NodeId, selector: &SelectorList) -> bool {
        self.element(element).is_some_and(|e| selector.matches(e))
    }

    fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(root).map(|(id, _)| id).collect();
        stack.reverse();
        while let Some(id) = stack.pop() {
            out.push(id);
            let mut kids: Vec<NodeId> = self.children(id).map(|(id, _)| id).collect();
            kids.reverse();
            stack.extend(kids);
        }
        out
    }
}

impl ElementQuery for DomTree {
    fn query_selector(&self, root: NodeId, selector: &str) -> Option<NodeId> {
        let list = SelectorList::parse(selector)?;
        self.descendants(root)
            .into_iter()
            .find(|&id| self.matches_parsed(id, &list))
    }

    fn query_selector_all(&self, root: NodeId, selector: &str) -> Vec<NodeId> {
        let Some(list) = SelectorList::parse(selector) else {
            return Vec::new();
        };
        self.descendants(root)
            .into_iter()
            .filter(|&id| self.matches_parsed(id, &list))
            .collect()
    }

    fn closest(&self, element: NodeId, selector: &str) -> Option<NodeId> {
        let list = SelectorList::parse(selector)?;
        self.ancestors(element).find(|&id| self.matches_parsed(id, &list))
    }

    fn matches(&self, element: NodeId, selector: &str) -> bool {
        SelectorList::parse(selector).is_some_and(|list| self.matches_parsed(element, &list))
    }
}

//! DOM Tree (arena-based allocation)

use crate::{Node, NodeData, ElementData, NodeId};

/// Result type for DOM operations
pub type DomResult<T> = Result<T, DomError>;

/// DOM operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    /// Node not found in this tree
    #[error("Node not found: {0:?}")]
    NotFound(NodeId),
    /// Hierarchy error (e.g., inserting an ancestor into its descendant)
    #[error("Hierarchy request error")]
    HierarchyRequest,
    /// Operation requires an element
    #[error("Node {0:?} is not an element")]
    NotAnElement(NodeId),
}

/// Arena-based DOM tree for memory efficiency
#[derive(Debug)]
pub struct DomTree {
    nodes: Vec<Node>,
}

impl DomTree {
    /// Create a new tree holding only the document node
    pub fn new() -> Self {
        Self { nodes: vec![Node::document()] }
    }

    /// Document node
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Element data for a node, if it is an element
    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(Node::as_element)
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(Node::element(tag))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.push(Node::text(content))
    }

    /// Create a detached comment node
    pub fn create_comment(&mut self, content: &str) -> NodeId {
        self.push(Node { data: NodeData::Comment(content.to_string()), ..Node::document() })
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Append `child` as the last child of `parent`.
    ///
    /// A child that already has a parent is moved.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        if self.get(parent).is_none() {
            return Err(DomError::NotFound(parent));
        }
        if self.get(child).is_none() {
            return Err(DomError::NotFound(child));
        }
        if child == NodeId::ROOT || self.ancestors(parent).any(|a| a == child) {
            return Err(DomError::HierarchyRequest);
        }

        self.detach(child);

        let prev_last = self.nodes[parent.index()].last_child;
        {
            let node = &mut self.nodes[child.index()];
            node.parent = parent;
            node.prev_sibling = prev_last;
            node.next_sibling = NodeId::NONE;
        }
        if prev_last.is_valid() {
            self.nodes[prev_last.index()].next_sibling = child;
        } else {
            self.nodes[parent.index()].first_child = child;
        }
        self.nodes[parent.index()].last_child = child;

        Ok(child)
    }

    /// Remove `child` from `parent`
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        match self.get(child) {
            Some(node) if node.parent == parent => {
                self.detach(child);
                Ok(child)
            }
            Some(_) => Err(DomError::HierarchyRequest),
            None => Err(DomError::NotFound(child)),
        }
    }

    fn detach(&mut self, child: NodeId) {
        let (parent, prev, next) = {
            let node = &self.nodes[child.index()];
            (node.parent, node.prev_sibling, node.next_sibling)
        };
        if !parent.is_valid() {
            return;
        }

        if prev.is_valid() {
            self.nodes[prev.index()].next_sibling = next;
        } else {
            self.nodes[parent.index()].first_child = next;
        }
        if next.is_valid() {
            self.nodes[next.index()].prev_sibling = prev;
        } else {
            self.nodes[parent.index()].last_child = prev;
        }

        let node = &mut self.nodes[child.index()];
        node.parent = NodeId::NONE;
        node.prev_sibling = NodeId::NONE;
        node.next_sibling = NodeId::NONE;
    }

    /// Set an attribute on an element
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> DomResult<()> {
        let node = self.get_mut(id).ok_or(DomError::NotFound(id))?;
        let elem = node.as_element_mut().ok_or(DomError::NotAnElement(id))?;
        elem.set_attr(name, value);
        Ok(())
    }

    /// Parent of a node
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).map(|n| n.parent).filter(|p| p.is_valid())
    }

    /// Iterate over direct children
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        let mut current = self.get(id).map(|n| n.first_child).unwrap_or(NodeId::NONE);
        std::iter::from_fn(move || {
            if !current.is_valid() {
                return None;
            }
            let id = current;
            let node = self.get(id)?;
            current = node.next_sibling;
            Some((id, node))
        })
    }

    /// Iterate from `id` up to the document node, starting with `id` itself
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut current = if self.get(id).is_some() { id } else { NodeId::NONE };
        std::iter::from_fn(move || {
            if !current.is_valid() {
                return None;
            }
            let id = current;
            current = self.get(id).map(|n| n.parent).unwrap_or(NodeId::NONE);
            Some(id)
        })
    }

    /// Check whether `node` is `ancestor` or lives inside it
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|a| a == ancestor)
    }

    /// Number of nodes in the tree
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if tree is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

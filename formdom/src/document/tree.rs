//! Node storage for a document.

use crate::element::Element;
use crate::error::DomError;

/// Handle to a node inside a [`Document`](crate::Document).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in allocation order.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub value: String,
    pub checked: bool,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl NodeData {
    fn detached(el: &Element) -> Self {
        Self {
            tag: el.tag.clone(),
            attributes: el.attributes.clone(),
            text: el.text.clone(),
            value: el.value.clone(),
            checked: el.checked,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Arena of nodes. Nodes are never freed; detached nodes keep their id and
/// can be appended again.
#[derive(Debug)]
pub(crate) struct Tree {
    nodes: Vec<NodeData>,
}

impl Tree {
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData::detached(&Element::new("body"))],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn get(&self, id: NodeId) -> Result<&NodeData, DomError> {
        self.nodes.get(id.0).ok_or(DomError::UnknownNode(id))
    }

    pub fn get_mut(&mut self, id: NodeId) -> Result<&mut NodeData, DomError> {
        self.nodes.get_mut(id.0).ok_or(DomError::UnknownNode(id))
    }

    /// Allocate `el` and its children as a detached subtree.
    pub fn alloc(&mut self, el: &Element) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData::detached(el));

        for child in &el.children {
            let child_id = self.alloc(child);
            self.nodes[child_id.0].parent = Some(id);
            self.nodes[id.0].children.push(child_id);
        }

        id
    }

    /// Append `child` as the last child of `parent`, moving it if attached.
    ///
    /// Returns the previous parent, if any.
    pub fn append(&mut self, parent: NodeId, child: NodeId) -> Result<Option<NodeId>, DomError> {
        self.get(parent)?;
        self.get(child)?;

        if child == self.root() {
            return Err(DomError::DetachRoot);
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::Cycle { parent, child });
        }

        let previous = self.detach(child)?;
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        Ok(previous)
    }

    /// Remove `node` from its parent. Returns the previous parent, if any.
    pub fn detach(&mut self, node: NodeId) -> Result<Option<NodeId>, DomError> {
        if node == self.root() {
            return Err(DomError::DetachRoot);
        }

        let parent = self.get(node)?.parent;
        if let Some(parent) = parent {
            self.nodes[parent.0].children.retain(|c| *c != node);
            self.nodes[node.0].parent = None;
        }
        Ok(parent)
    }

    /// Whether `ancestor` is `node` or one of its ancestors.
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(id.0).and_then(|n| n.parent);
        }
        false
    }

    /// `node` followed by its ancestors, closest first.
    pub fn inclusive_ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = Some(node);
        while let Some(id) = current {
            out.push(id);
            current = self.nodes.get(id.0).and_then(|n| n.parent);
        }
        out
    }

    /// Descendants of `node` in document (pre-)order, excluding `node`.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = match self.nodes.get(node.0) {
            Some(data) => data.children.iter().rev().copied().collect(),
            None => return out,
        };

        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id.0].children.iter().rev().copied());
        }
        out
    }

    pub fn text_content(&self, node: NodeId) -> String {
        let Some(data) = self.nodes.get(node.0) else {
            return String::new();
        };

        let mut text = data.text.clone();
        for child in &data.children {
            text.push_str(&self.text_content(*child));
        }
        text
    }
}

//! Arena node storage.

use std::collections::BTreeMap;

use super::{Attribute, NodeKind};

/// Stable handle to a node inside a [`SqlTree`](super::SqlTree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the arena index of this node.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A single structural unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) text: String,
    pub(crate) attributes: BTreeMap<Attribute, String>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            attributes: BTreeMap::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    /// The grammar tag.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Captured text; empty for containers.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The containing node, `None` for the root.
    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child handles in source order.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Looks up an attribute value.
    #[must_use]
    pub fn attribute(&self, key: Attribute) -> Option<&str> {
        self.attributes.get(&key).map(String::as_str)
    }

    /// All attributes, ordered by key.
    #[must_use]
    pub const fn attributes(&self) -> &BTreeMap<Attribute, String> {
        &self.attributes
    }
}

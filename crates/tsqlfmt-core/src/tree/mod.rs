//! Structural tree
//!
//! An arena of [`Node`]s addressed by [`NodeId`] handles. Children are stored
//! as handle lists and parents as handles, so upward navigation is cheap and
//! there are no ownership cycles. The parser is the only writer; formatters
//! only read.

mod kind;
mod node;

use serde::ser::{SerializeMap, SerializeSeq, SerializeStruct};
use serde::{Serialize, Serializer};

pub use kind::{Attribute, NodeKind};
pub use node::{Node, NodeId};

use crate::lexer::contains_line_break;
use crate::parser::{self, ParseError};

/// A single-rooted, ordered, attributed tree of grammar nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlTree {
    nodes: Vec<Node>,
}

impl Default for SqlTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlTree {
    /// Creates a tree holding only the root node.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeKind::Root, "")],
        }
    }

    /// The root node handle.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId::new(0)
    }

    /// Number of nodes ever created, including detached ones.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the node behind a handle.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    #[must_use]
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind
    }

    #[must_use]
    pub fn text(&self, id: NodeId) -> &str {
        &self.node(id).text
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    #[must_use]
    pub fn attribute(&self, id: NodeId, key: Attribute) -> Option<&str> {
        self.node(id).attribute(key)
    }

    pub fn set_attribute(&mut self, id: NodeId, key: Attribute, value: impl Into<String>) {
        self.node_mut(id).attributes.insert(key, value.into());
    }

    /// True when parsing this document required error recovery.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.attribute(self.root(), Attribute::ErrorFound) == Some("1")
    }

    /// Creates a detached node.
    pub(crate) fn create(&mut self, kind: NodeKind, text: impl Into<String>) -> NodeId {
        let index = u32::try_from(self.nodes.len()).unwrap_or(u32::MAX);
        self.nodes.push(Node::new(kind, text));
        NodeId::new(index)
    }

    /// Creates a node and appends it as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, kind: NodeKind, text: impl Into<String>) -> NodeId {
        let id = self.create(kind, text);
        self.attach(parent, id);
        id
    }

    /// Appends a detached node as the last child of `parent`.
    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
    }

    /// Inserts a detached node immediately before `sibling`.
    pub(crate) fn insert_before(&mut self, node: NodeId, sibling: NodeId) -> parser::Result<()> {
        let detached = ParseError::DetachedSibling {
            sibling: self.kind(sibling),
        };
        let Some(parent) = self.parent(sibling) else {
            return Err(detached);
        };
        let position = self
            .children(parent)
            .iter()
            .position(|&c| c == sibling)
            .ok_or(detached)?;
        self.node_mut(node).parent = Some(parent);
        self.node_mut(parent).children.insert(position, node);
        Ok(())
    }

    /// Removes a node from its parent's child list.
    pub(crate) fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node_mut(id).parent.take() {
            self.node_mut(parent).children.retain(|&c| c != id);
        }
    }

    /// Returns true if the node's ancestry chain reaches the root.
    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        for _ in 0..self.nodes.len() {
            if current == self.root() {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
        false
    }

    /// Walks `levels` parents up from `id`.
    #[must_use]
    pub fn ancestor(&self, id: NodeId, levels: usize) -> Option<NodeId> {
        let mut current = id;
        for _ in 0..levels {
            current = self.parent(current)?;
        }
        Some(current)
    }

    /// True if the node `levels` up from `id` exists and has the given kind.
    #[must_use]
    pub fn ancestor_is(&self, id: NodeId, levels: usize, kind: NodeKind) -> bool {
        self.ancestor(id, levels)
            .is_some_and(|ancestor| self.kind(ancestor) == kind)
    }

    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    fn sibling_offset(&self, id: NodeId, forward: bool) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let position = siblings.iter().position(|&c| c == id)?;
        if forward {
            siblings.get(position + 1).copied()
        } else {
            position.checked_sub(1).map(|p| siblings[p])
        }
    }

    #[must_use]
    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.sibling_offset(id, false)
    }

    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.sibling_offset(id, true)
    }

    /// Children with the given kind, in order.
    pub fn children_of_kind(&self, id: NodeId, kind: NodeKind) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |&c| self.kind(c) == kind)
    }

    /// First child with the given kind.
    #[must_use]
    pub fn child_of_kind(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.children_of_kind(id, kind).next()
    }

    /// Children that are neither whitespace nor comments.
    pub fn content_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |&c| !self.kind(c).is_non_content())
    }

    /// True if any child is neither whitespace nor a comment.
    #[must_use]
    pub fn has_content(&self, id: NodeId) -> bool {
        self.content_children(id).next().is_some()
    }

    /// True if any child is meaningful for statement separation: anything
    /// but whitespace and single-line comments, where a block comment only
    /// counts when it spans a line break.
    #[must_use]
    pub fn has_meaningful_content(&self, id: NodeId) -> bool {
        self.children(id).iter().any(|&c| match self.kind(c) {
            NodeKind::WhiteSpace
            | NodeKind::SingleLineComment
            | NodeKind::SingleLineCommentCStyle => false,
            NodeKind::MultiLineComment => contains_line_break(self.text(c)),
            _ => true,
        })
    }

    /// Returns the first content child of `id`, descending through clauses
    /// and DDL wrapper blocks.
    #[must_use]
    pub fn first_semantic_element(&self, id: NodeId) -> Option<NodeId> {
        let mut container = id;
        loop {
            let first = self.content_children(container).next()?;
            if self.kind(first).is_non_semantic_wrapper() {
                container = first;
            } else {
                return Some(first);
            }
        }
    }

    /// Iterates over enter/leave events for the whole tree in document order.
    #[must_use]
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            tree: self,
            pending: vec![WalkEvent::Enter(self.root())],
        }
    }

    /// Returns a serializable view of the subtree under `id`.
    #[must_use]
    pub const fn view(&self, id: NodeId) -> NodeView<'_> {
        NodeView { tree: self, id }
    }
}

/// A document-order traversal event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkEvent {
    Enter(NodeId),
    Leave(NodeId),
}

/// Depth-first iterator produced by [`SqlTree::walk`].
pub struct Walk<'a> {
    tree: &'a SqlTree,
    /// Pending events, next one last.
    pending: Vec<WalkEvent>,
}

impl Iterator for Walk<'_> {
    type Item = WalkEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let event = self.pending.pop()?;
        if let WalkEvent::Enter(id) = event {
            self.pending.push(WalkEvent::Leave(id));
            self.pending
                .extend(self.tree.children(id).iter().rev().map(|&c| WalkEvent::Enter(c)));
        }
        Some(event)
    }
}

/// Serializable view of a subtree.
pub struct NodeView<'a> {
    tree: &'a SqlTree,
    id: NodeId,
}

struct ChildrenView<'a> {
    tree: &'a SqlTree,
    id: NodeId,
}

struct AttributesView<'a> {
    node: &'a Node,
}

impl Serialize for NodeView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let node = self.tree.node(self.id);
        let mut state = serializer.serialize_struct("Node", 4)?;
        state.serialize_field("name", &node.kind)?;
        state.serialize_field("text", &node.text)?;
        state.serialize_field("attributes", &AttributesView { node })?;
        state.serialize_field(
            "children",
            &ChildrenView {
                tree: self.tree,
                id: self.id,
            },
        )?;
        state.end()
    }
}

impl Serialize for ChildrenView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let children = self.tree.children(self.id);
        let mut seq = serializer.serialize_seq(Some(children.len()))?;
        for &child in children {
            seq.serialize_element(&self.tree.view(child))?;
        }
        seq.end()
    }
}

impl Serialize for AttributesView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.node.attributes.len()))?;
        for (key, value) in &self.node.attributes {
            map.serialize_entry(key.as_str(), value)?;
        }
        map.end()
    }
}

impl Serialize for SqlTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.view(self.root()).serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (SqlTree, NodeId, NodeId, NodeId) {
        let mut tree = SqlTree::new();
        let statement = tree.append(tree.root(), NodeKind::Statement, "");
        let clause = tree.append(statement, NodeKind::Clause, "");
        let keyword = tree.append(clause, NodeKind::OtherKeyword, "SELECT");
        (tree, statement, clause, keyword)
    }

    #[test]
    fn test_append_sets_parent() {
        let (tree, statement, clause, keyword) = sample();
        assert_eq!(tree.parent(statement), Some(tree.root()));
        assert_eq!(tree.parent(keyword), Some(clause));
        assert_eq!(tree.children(clause), &[keyword]);
        assert!(tree.is_attached(keyword));
    }

    #[test]
    fn test_detach_and_insert_before() {
        let (mut tree, statement, clause, keyword) = sample();
        let ws = tree.append(clause, NodeKind::WhiteSpace, " ");
        tree.detach(ws);
        assert!(!tree.is_attached(ws));
        assert_eq!(tree.children(clause), &[keyword]);

        tree.insert_before(ws, statement).unwrap();
        assert_eq!(tree.children(tree.root()), &[ws, statement]);
        assert_eq!(tree.parent(ws), Some(tree.root()));
    }

    #[test]
    fn test_insert_before_detached_sibling() {
        let (mut tree, _, clause, keyword) = sample();
        let ws = tree.create(NodeKind::WhiteSpace, " ");
        tree.detach(keyword);

        let error = tree.insert_before(ws, keyword).unwrap_err();
        assert_eq!(
            error,
            ParseError::DetachedSibling {
                sibling: NodeKind::OtherKeyword
            }
        );
        assert!(tree.children(clause).is_empty());
        assert_eq!(tree.parent(ws), None);
    }

    #[test]
    fn test_siblings() {
        let (mut tree, _, clause, keyword) = sample();
        let ws = tree.append(clause, NodeKind::WhiteSpace, " ");
        assert_eq!(tree.next_sibling(keyword), Some(ws));
        assert_eq!(tree.previous_sibling(ws), Some(keyword));
        assert_eq!(tree.previous_sibling(keyword), None);
        assert_eq!(tree.next_sibling(ws), None);
    }

    #[test]
    fn test_ancestor_checks() {
        let (tree, _, _, keyword) = sample();
        assert!(tree.ancestor_is(keyword, 1, NodeKind::Clause));
        assert!(tree.ancestor_is(keyword, 2, NodeKind::Statement));
        assert!(tree.ancestor_is(keyword, 3, NodeKind::Root));
        assert!(!tree.ancestor_is(keyword, 4, NodeKind::Root));
    }

    #[test]
    fn test_content_checks() {
        let mut tree = SqlTree::new();
        let clause = tree.append(tree.root(), NodeKind::Clause, "");
        tree.append(clause, NodeKind::WhiteSpace, "\n");
        tree.append(clause, NodeKind::SingleLineComment, " x\n");
        assert!(!tree.has_content(clause));
        assert!(!tree.has_meaningful_content(clause));

        tree.append(clause, NodeKind::MultiLineComment, " a\nb ");
        assert!(!tree.has_content(clause));
        assert!(tree.has_meaningful_content(clause));
    }

    #[test]
    fn test_first_semantic_element() {
        let mut tree = SqlTree::new();
        let statement = tree.append(tree.root(), NodeKind::Statement, "");
        tree.append(statement, NodeKind::WhiteSpace, "\n");
        let clause = tree.append(statement, NodeKind::Clause, "");
        let block = tree.append(clause, NodeKind::DdlOtherBlock, "");
        tree.append(block, NodeKind::MultiLineComment, "x");
        let keyword = tree.append(block, NodeKind::OtherKeyword, "CREATE");
        assert_eq!(tree.first_semantic_element(statement), Some(keyword));
        assert_eq!(tree.first_semantic_element(keyword), None);
    }

    #[test]
    fn test_walk_order() {
        let (tree, statement, clause, keyword) = sample();
        let events: Vec<_> = tree.walk().collect();
        assert_eq!(
            events,
            vec![
                WalkEvent::Enter(tree.root()),
                WalkEvent::Enter(statement),
                WalkEvent::Enter(clause),
                WalkEvent::Enter(keyword),
                WalkEvent::Leave(keyword),
                WalkEvent::Leave(clause),
                WalkEvent::Leave(statement),
                WalkEvent::Leave(tree.root()),
            ]
        );
    }

    #[test]
    fn test_error_flag() {
        let mut tree = SqlTree::new();
        assert!(!tree.has_error());
        tree.set_attribute(tree.root(), Attribute::ErrorFound, "1");
        assert!(tree.has_error());
    }

    #[test]
    fn test_serialize() {
        let (tree, _, _, _) = sample();
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json["name"], "root");
        assert_eq!(json["children"][0]["name"], "statement");
        assert_eq!(json["children"][0]["children"][0]["children"][0]["text"], "SELECT");
    }
}

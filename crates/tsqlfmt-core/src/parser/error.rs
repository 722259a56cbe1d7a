//! Parser error types.
//!
//! Malformed SQL never produces an error here: it sets the tree's error flag
//! and parsing continues. These variants are internal-consistency failures,
//! where the tree builder tried to navigate to a container that does not
//! have the shape it expects.

use thiserror::Error;

use crate::tree::NodeKind;

/// An internal-consistency failure while building the tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// An ancestor navigation landed on an unexpected container.
    #[error("ancestor {levels} levels up is {found:?}, expected {expected}")]
    AncestorMismatch {
        levels: usize,
        expected: NodeKind,
        found: Option<NodeKind>,
    },

    /// An ancestor navigation walked past the root.
    #[error("cannot move {levels} levels up from {from}: not enough ancestors")]
    NoSuchAncestor { levels: usize, from: NodeKind },

    /// The cursor was reassigned to a node that is not part of the document.
    #[error("current container can only be set to a node in the current document")]
    CursorOutsideTree,

    /// A node was to be inserted next to a sibling that has no parent.
    #[error("cannot insert before a detached {sibling} node")]
    DetachedSibling { sibling: NodeKind },
}

/// Result type for tree building.
pub type Result<T> = std::result::Result<T, ParseError>;

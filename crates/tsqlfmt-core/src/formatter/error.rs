//! Formatter error types.

use thiserror::Error;

use crate::tree::{Attribute, NodeKind};

/// A tree shape the formatter cannot render.
///
/// The parser never builds these shapes, so an error here means the tree
/// and the renderer disagree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("{container} node has no {expected} child")]
    MissingChild {
        container: NodeKind,
        expected: NodeKind,
    },

    #[error("{node} node has no {} attribute", .attribute.as_str())]
    MissingAttribute { node: NodeKind, attribute: Attribute },
}

/// Result type for formatting.
pub type Result<T> = std::result::Result<T, FormatError>;

//! Formatting engine.
//!
//! Renders a [`SqlTree`] back into text. [`StandardFormatter`] applies the
//! style rules configured through [`FormatOptions`]; [`IdentityFormatter`]
//! reproduces the source unchanged.

mod error;
mod identity;
mod options;
mod standard;
mod state;

pub use error::{FormatError, Result};
pub use identity::{IdentityFormatter, render_subtree};
pub use options::FormatOptions;
pub use standard::StandardFormatter;

use crate::tree::SqlTree;

/// Warning line written before the output of a tree that needed error
/// recovery while parsing.
pub const DEFAULT_ERROR_OUTPUT_PREFIX: &str = "--WARNING! ERRORS ENCOUNTERED DURING SQL PARSING!";

/// Renders a parsed tree to text.
pub trait TreeFormatter {
    /// Renders `tree`. The tree is never modified.
    ///
    /// # Errors
    ///
    /// Returns a [`FormatError`] if the tree has a shape the formatter
    /// cannot render.
    fn format_tree(&self, tree: &SqlTree) -> Result<String>;
}

//! Tokenize, parse and render pipeline.

use thiserror::Error;
use tracing::{debug, warn};

use crate::formatter::{FormatError, StandardFormatter, TreeFormatter};
use crate::lexer::Lexer;
use crate::parser::{self, ParseError};
use crate::tree::SqlTree;

/// Errors from the formatting pipeline.
///
/// Malformed SQL is not an error: it is reported through
/// [`FormatOutcome::parse_error`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("parser error: {0}")]
    Parse(#[from] ParseError),

    #[error("formatter error: {0}")]
    Format(#[from] FormatError),
}

/// Result type for the formatting pipeline.
pub type Result<T> = std::result::Result<T, Error>;

/// Formatted text, and whether parsing needed error recovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOutcome {
    pub text: String,
    pub parse_error: bool,
}

/// Runs SQL text through the lexer, parser and a [`TreeFormatter`].
#[derive(Debug, Clone, Default)]
pub struct FormattingManager<F = StandardFormatter> {
    formatter: F,
}

impl<F: TreeFormatter> FormattingManager<F> {
    pub const fn new(formatter: F) -> Self {
        Self { formatter }
    }

    pub const fn formatter(&self) -> &F {
        &self.formatter
    }

    /// Formats `input`.
    pub fn format(&self, input: &str) -> Result<FormatOutcome> {
        let tree = Self::parse(input)?;
        let text = self.formatter.format_tree(&tree)?;
        Ok(FormatOutcome {
            text,
            parse_error: tree.has_error(),
        })
    }

    /// Tokenizes and parses `input` without rendering it.
    pub fn parse(input: &str) -> Result<SqlTree> {
        let tokens = Lexer::new(input).tokenize();
        debug!(tokens = tokens.len(), "tokenized input");
        let tree = parser::parse(&tokens)?;
        if tree.has_error() {
            warn!("errors encountered while parsing, output may not be as expected");
        }
        debug!(nodes = tree.node_count(), "parsed input");
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::{FormatOptions, IdentityFormatter};

    #[test]
    fn test_standard_pipeline() {
        let manager: FormattingManager = FormattingManager::default();
        let outcome = manager.format("select a from t").unwrap();
        assert_eq!(outcome.text, "SELECT\n\ta\nFROM\n\tt\n");
        assert!(!outcome.parse_error);
    }

    #[test]
    fn test_identity_pipeline() {
        let manager = FormattingManager::new(IdentityFormatter::new());
        let input = "select  a\n  from t -- done\n";
        let outcome = manager.format(input).unwrap();
        assert_eq!(outcome.text, input);
    }

    #[test]
    fn test_parse_error_is_reported() {
        let manager = FormattingManager::new(StandardFormatter::new(FormatOptions::default()));
        let outcome = manager.format("select 'unterminated").unwrap();
        assert!(outcome.parse_error);
        assert!(outcome.text.starts_with("--WARNING!"));
    }

    #[test]
    fn test_parse_only() {
        let tree = FormattingManager::<StandardFormatter>::parse("select 1; select 2").unwrap();
        assert!(!tree.has_error());
        assert_eq!(tree.content_children(tree.root()).count(), 2);
    }
}

//! Structural parser.
//!
//! Turns a [`TokenList`] into a [`SqlTree`], deciding token by token which
//! grammar container is open and when containers close. Parsing is
//! error-tolerant: malformed SQL is flagged on the tree rather than rejected.

mod builder;
mod error;
mod parser;

pub use error::{ParseError, Result};
pub use parser::Parser;

use crate::lexer::TokenList;
use crate::tree::SqlTree;

/// Parses a token list into a structural tree.
///
/// # Errors
///
/// Returns a `ParseError` only on internal-consistency failures.
pub fn parse(tokens: &TokenList) -> Result<SqlTree> {
    Parser::new(tokens).parse()
}

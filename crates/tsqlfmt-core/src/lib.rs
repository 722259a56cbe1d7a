//! # tsqlfmt-core
//!
//! An error-tolerant T-SQL structural parser and a configurable formatter.
//!
//! This crate provides:
//! - A lexer producing a flat, classified token stream
//! - A structural parser that groups tokens into statements, clauses,
//!   parenthesis groups and control blocks, recovering from malformed input
//! - A rule-driven formatter with configurable indentation, wrapping and
//!   keyword casing, plus a verbatim renderer
//!
//! ## Formatting
//!
//! ```rust
//! use tsqlfmt_core::FormattingManager;
//!
//! let manager: FormattingManager = FormattingManager::default();
//! let outcome = manager.format("select a,b from t where a=1").unwrap();
//!
//! assert_eq!(outcome.text, "SELECT\n\ta\n\t,b\nFROM\n\tt\nWHERE\n\ta = 1\n");
//! assert!(!outcome.parse_error);
//! ```
//!
//! ## Options
//!
//! ```rust
//! use tsqlfmt_core::{FormatOptions, FormattingManager, StandardFormatter};
//!
//! let options = FormatOptions {
//!     uppercase_keywords: false,
//!     expand_comma_lists: false,
//!     ..FormatOptions::default()
//! };
//! let manager = FormattingManager::new(StandardFormatter::new(options));
//! let outcome = manager.format("SELECT a, b FROM t").unwrap();
//!
//! assert_eq!(outcome.text, "select\n\ta, b\nfrom\n\tt\n");
//! ```
//!
//! ## Malformed input
//!
//! Parsing never rejects SQL. Input that needed recovery is flagged, and the
//! formatter writes a warning line ahead of its best-effort output:
//!
//! ```rust
//! use tsqlfmt_core::FormattingManager;
//!
//! let manager: FormattingManager = FormattingManager::default();
//! let outcome = manager.format("select 'unterminated").unwrap();
//!
//! assert!(outcome.parse_error);
//! assert!(outcome.text.starts_with("--WARNING! ERRORS ENCOUNTERED DURING SQL PARSING!\n"));
//! ```

mod keywords;
mod manager;

pub mod formatter;
pub mod lexer;
pub mod parser;
pub mod tree;

pub use formatter::{
    FormatError, FormatOptions, IdentityFormatter, StandardFormatter, TreeFormatter,
};
pub use lexer::{Lexer, Token, TokenKind, TokenList};
pub use manager::{Error, FormatOutcome, FormattingManager, Result};
pub use parser::{ParseError, Parser};
pub use tree::{NodeId, NodeKind, SqlTree};

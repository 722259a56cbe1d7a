//! T-SQL lexer.
//!
//! Produces the flat, classified token stream consumed by the structural
//! parser. Every byte of the input ends up in exactly one token, so the
//! identity renderer can reproduce the source from the token list.

mod span;
mod token;
mod tokenizer;

pub use span::Span;
pub use token::{Token, TokenKind, TokenList};
pub use tokenizer::Lexer;
pub(crate) use token::contains_line_break;

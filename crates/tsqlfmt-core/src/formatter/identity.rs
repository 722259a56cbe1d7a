//! Verbatim renderer.
//!
//! Reproduces exactly the text that was tokenized, from either a token list
//! or a parsed tree. The standard formatter uses it for `[noformat]` and
//! `[minify]` regions.

use std::borrow::Cow;

use crate::lexer::{TokenKind, TokenList};
use crate::tree::{NodeId, NodeKind, SqlTree, WalkEvent};

use super::{DEFAULT_ERROR_OUTPUT_PREFIX, Result, TreeFormatter};

/// Renders trees and token lists unchanged.
#[derive(Debug, Clone)]
pub struct IdentityFormatter {
    error_output_prefix: String,
}

impl Default for IdentityFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityFormatter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            error_output_prefix: DEFAULT_ERROR_OUTPUT_PREFIX.to_string(),
        }
    }

    /// Replaces the warning line written before output that needed error
    /// recovery. An empty prefix disables the warning.
    #[must_use]
    pub fn with_error_output_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.error_output_prefix = prefix.into();
        self
    }

    /// Reassembles the source text of a token list.
    #[must_use]
    pub fn format_tokens(&self, tokens: &TokenList) -> String {
        let mut output = String::new();
        if tokens.has_unfinished_token() {
            push_prefix(&mut output, &self.error_output_prefix);
        }
        for token in tokens {
            let text = match token.kind {
                TokenKind::SingleLineComment => Cow::Owned(format!("--{}", token.value)),
                TokenKind::SingleLineCommentCStyle => Cow::Owned(format!("//{}", token.value)),
                TokenKind::MultiLineComment => Cow::Owned(format!("/*{}*/", token.value)),
                TokenKind::String => Cow::Owned(quote(&token.value, "'", '\'')),
                TokenKind::NationalString => Cow::Owned(quote(&token.value, "N'", '\'')),
                TokenKind::QuotedString => Cow::Owned(quote(&token.value, "\"", '"')),
                TokenKind::BracketQuotedName => Cow::Owned(bracket_quote(&token.value)),
                _ => Cow::Borrowed(token.value.as_str()),
            };
            output.push_str(&text);
        }
        output
    }
}

impl TreeFormatter for IdentityFormatter {
    fn format_tree(&self, tree: &SqlTree) -> Result<String> {
        let mut output = String::new();
        if tree.has_error() {
            push_prefix(&mut output, &self.error_output_prefix);
        }
        output.push_str(&render_events(tree, tree.walk()));
        Ok(output)
    }
}

fn push_prefix(output: &mut String, prefix: &str) {
    if !prefix.is_empty() {
        output.push_str(prefix);
        output.push('\n');
    }
}

/// Wraps `body` in quotes, doubling any embedded closing quote.
pub(crate) fn quote(body: &str, open: &str, close: char) -> String {
    let mut doubled = String::with_capacity(2);
    doubled.push(close);
    doubled.push(close);
    format!("{open}{}{close}", body.replace(close, &doubled))
}

pub(crate) fn bracket_quote(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// The source text a node contributes on its own, excluding children.
fn own_text(tree: &SqlTree, id: NodeId) -> Cow<'_, str> {
    let text = tree.text(id);
    match tree.kind(id) {
        NodeKind::SingleLineComment => Cow::Owned(format!("--{text}")),
        NodeKind::SingleLineCommentCStyle => Cow::Owned(format!("//{text}")),
        NodeKind::MultiLineComment => Cow::Owned(format!("/*{text}*/")),
        NodeKind::String => Cow::Owned(quote(text, "'", '\'')),
        NodeKind::NationalString => Cow::Owned(quote(text, "N'", '\'')),
        NodeKind::QuotedString => Cow::Owned(quote(text, "\"", '"')),
        NodeKind::BracketQuotedName => Cow::Owned(bracket_quote(text)),
        kind if kind.is_parens() => Cow::Borrowed("("),
        _ => Cow::Borrowed(text),
    }
}

fn render_events(tree: &SqlTree, events: impl Iterator<Item = WalkEvent>) -> String {
    let mut output = String::new();
    for event in events {
        match event {
            WalkEvent::Enter(id) => output.push_str(&own_text(tree, id)),
            WalkEvent::Leave(id) if tree.kind(id).is_parens() => output.push(')'),
            WalkEvent::Leave(_) => {}
        }
    }
    output
}

/// Renders the subtree under `id` verbatim.
#[must_use]
pub fn render_subtree(tree: &SqlTree, id: NodeId) -> String {
    let mut depth = 0usize;
    let events = tree
        .walk()
        .skip_while(move |event| *event != WalkEvent::Enter(id))
        .take_while(move |event| {
            // stop after the matching leave event
            let inside = depth > 0 || *event == WalkEvent::Enter(id);
            match event {
                WalkEvent::Enter(_) => depth += 1,
                WalkEvent::Leave(_) => depth = depth.saturating_sub(1),
            }
            inside
        });
    render_events(tree, events)
}

/// Renders everything after the node `start` in document order, up to but
/// excluding `end`, or to the end of the document if `end` is `None`.
///
/// `start` and `end` are leaves, so the range never splits them.
pub(crate) fn render_between(tree: &SqlTree, start: NodeId, end: Option<NodeId>) -> String {
    let events = tree
        .walk()
        .skip_while(move |event| *event != WalkEvent::Leave(start))
        .skip(1)
        .take_while(move |event| Some(*event) != end.map(WalkEvent::Enter));
    render_events(tree, events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::parse;

    fn roundtrip(input: &str) -> String {
        let tokens = Lexer::new(input).tokenize();
        let tree = parse(&tokens).unwrap();
        IdentityFormatter::new().format_tree(&tree).unwrap()
    }

    #[test]
    fn test_tree_roundtrip() {
        for input in [
            "select a, b from t where a = 1",
            "SELECT N'it''s', \"q\"\"x\", [a]]b] -- note\n/* block */ FROM t;",
            "IF @x > 0 BEGIN PRINT 'y' END ELSE PRINT 'n'\nGO\n",
            "select count(*) from t where x in (1, 2) and y between 3 and 4",
        ] {
            assert_eq!(roundtrip(input), input);
        }
    }

    #[test]
    fn test_tokens_roundtrip() {
        let input = "select 'a''b' // c\n, 0x1F, $1.50 from [t]";
        let tokens = Lexer::new(input).tokenize();
        assert_eq!(IdentityFormatter::new().format_tokens(&tokens), input);
    }

    #[test]
    fn test_error_prefix() {
        let tokens = Lexer::new("select 'open").tokenize();
        let formatter = IdentityFormatter::new().with_error_output_prefix("--oops");
        assert!(formatter.format_tokens(&tokens).starts_with("--oops\n"));

        let tree = parse(&tokens).unwrap();
        let output = formatter.format_tree(&tree).unwrap();
        assert!(output.starts_with("--oops\nselect"));
    }

    #[test]
    fn test_render_subtree() {
        let tokens = Lexer::new("select f(a, b) from t").tokenize();
        let tree = parse(&tokens).unwrap();
        let parens = tree
            .walk()
            .find_map(|event| match event {
                WalkEvent::Enter(id) if tree.kind(id) == NodeKind::FunctionParens => Some(id),
                _ => None,
            })
            .unwrap();
        assert_eq!(render_subtree(&tree, parens), "(a, b)");
    }

    #[test]
    fn test_render_between() {
        let tokens = Lexer::new("select 1 /*a*/ x (y) /*b*/ z").tokenize();
        let tree = parse(&tokens).unwrap();
        let comments: Vec<_> = tree
            .walk()
            .filter_map(|event| match event {
                WalkEvent::Enter(id) if tree.kind(id) == NodeKind::MultiLineComment => Some(id),
                _ => None,
            })
            .collect();
        assert_eq!(render_between(&tree, comments[0], Some(comments[1])), " x (y) ");
        assert_eq!(render_between(&tree, comments[1], None), " z");
    }
}

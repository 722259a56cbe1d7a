//! Token types for the T-SQL lexer.

use std::ops::Index;

use super::Span;

/// Lexical classification of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// A run of spaces, tabs and line breaks.
    WhiteSpace,
    /// Any word: keywords, unquoted names, `@variables`, `#temp` tables.
    OtherNode,
    /// `-- comment`, body includes the terminating line break.
    SingleLineComment,
    /// `// comment`, body includes the terminating line break.
    SingleLineCommentCStyle,
    /// `/* comment */`, body excludes the delimiters.
    MultiLineComment,
    /// `'text'`
    String,
    /// `N'text'`
    NationalString,
    /// `"text"`
    QuotedString,
    /// `[name]`
    BracketQuotedName,
    OpenParens,
    CloseParens,
    Comma,
    Period,
    Semicolon,
    Colon,
    Asterisk,
    EqualsSign,
    /// Any other operator: `+`, `<>`, `>=`, `+=`, `%`, ...
    OtherOperator,
    Number,
    /// `0x1F`
    BinaryValue,
    /// `$12.50`
    MonetaryValue,
    /// `$action`, `$IDENTITY`
    PseudoName,
}

impl TokenKind {
    /// Returns true for comment tokens of any style.
    #[must_use]
    pub const fn is_comment(self) -> bool {
        matches!(
            self,
            Self::SingleLineComment | Self::SingleLineCommentCStyle | Self::MultiLineComment
        )
    }

    /// Returns true for whitespace and comments.
    #[must_use]
    pub const fn is_non_content(self) -> bool {
        matches!(self, Self::WhiteSpace) || self.is_comment()
    }
}

/// A classified token with its captured value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The token classification.
    pub kind: TokenKind,
    /// The captured value; see [`TokenKind`] for what each kind stores.
    pub value: String,
    /// The source location of the whole token, delimiters included.
    pub span: Span,
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub fn new(kind: TokenKind, value: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            value: value.into(),
            span,
        }
    }

    /// Returns true if this token is whitespace containing a line break.
    #[must_use]
    pub fn is_line_breaking_whitespace(&self) -> bool {
        self.kind == TokenKind::WhiteSpace && contains_line_break(&self.value)
    }

    /// Returns true if this token ends a line: line-breaking whitespace or a
    /// single-line comment.
    #[must_use]
    pub fn ends_line(&self) -> bool {
        self.is_line_breaking_whitespace()
            || matches!(
                self.kind,
                TokenKind::SingleLineComment | TokenKind::SingleLineCommentCStyle
            )
    }
}

/// Returns true if `text` contains a carriage return or line feed.
#[must_use]
pub(crate) fn contains_line_break(text: &str) -> bool {
    text.contains(['\r', '\n'])
}

/// An ordered sequence of tokens produced from one source text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenList {
    tokens: Vec<Token>,
    unfinished: bool,
}

impl TokenList {
    /// Creates a token list.
    #[must_use]
    pub const fn new(tokens: Vec<Token>, unfinished: bool) -> Self {
        Self { tokens, unfinished }
    }

    /// True when the final token was left unterminated (an unclosed string,
    /// quoted name or block comment).
    #[must_use]
    pub const fn has_unfinished_token(&self) -> bool {
        self.unfinished
    }

    /// Number of tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns true if there are no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Returns the token at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    /// Iterates over the tokens in source order.
    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    /// Returns the tokens as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Token] {
        &self.tokens
    }
}

impl Index<usize> for TokenList {
    type Output = Token;

    fn index(&self, index: usize) -> &Self::Output {
        &self.tokens[index]
    }
}

impl<'a> IntoIterator for &'a TokenList {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}

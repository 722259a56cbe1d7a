//! T-SQL tokenizer implementation.

use tracing::trace;

use super::{Span, Token, TokenKind, TokenList};

/// A lexer that splits T-SQL source into classified tokens.
///
/// Unlike a compiler front end, the lexer keeps whitespace and comments as
/// tokens and never fails: unterminated strings, names and comments run to
/// the end of the input and are reported through
/// [`TokenList::has_unfinished_token`].
pub struct Lexer<'a> {
    /// The input source code.
    input: &'a str,
    /// The current byte position.
    pos: usize,
    /// The byte position of the start of the current token.
    start: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    #[must_use]
    pub const fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            start: 0,
        }
    }

    /// Returns the current character without advancing.
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    /// Returns the next character without advancing.
    fn peek_next(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    /// Advances to the next character and returns it.
    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Advances while `predicate` holds.
    fn advance_while(&mut self, predicate: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&predicate) {
            self.advance();
        }
    }

    /// Creates a span from start to current position.
    const fn make_span(&self) -> Span {
        Span::new(self.start, self.pos)
    }

    /// Creates a token whose value is the raw text of the current span.
    fn make_raw_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, &self.input[self.start..self.pos], self.make_span())
    }

    /// Creates a token with an explicit value.
    fn make_token(&self, kind: TokenKind, value: impl Into<String>) -> Token {
        Token::new(kind, value, self.make_span())
    }

    /// Scans a run of whitespace.
    fn scan_whitespace(&mut self) -> Token {
        self.advance_while(char::is_whitespace);
        self.make_raw_token(TokenKind::WhiteSpace)
    }

    /// Scans a `--` or `//` comment, up to and including the line break.
    fn scan_line_comment(&mut self, kind: TokenKind) -> Token {
        self.advance();
        self.advance();
        let body_start = self.pos;
        while let Some(c) = self.advance() {
            if c == '\n' {
                break;
            }
            if c == '\r' {
                if self.peek() == Some('\n') {
                    self.advance();
                }
                break;
            }
        }
        self.make_token(kind, &self.input[body_start..self.pos])
    }

    /// Scans a `/* */` comment, honoring nested comments.
    ///
    /// Returns the token and whether it was terminated.
    fn scan_block_comment(&mut self) -> (Token, bool) {
        self.advance(); // /
        self.advance(); // *
        let body_start = self.pos;
        let mut depth = 1usize;

        loop {
            match self.peek() {
                Some('/') if self.peek_next() == Some('*') => {
                    self.advance();
                    self.advance();
                    depth += 1;
                }
                Some('*') if self.peek_next() == Some('/') => {
                    let body_end = self.pos;
                    self.advance();
                    self.advance();
                    depth -= 1;
                    if depth == 0 {
                        let token = self.make_token(
                            TokenKind::MultiLineComment,
                            &self.input[body_start..body_end],
                        );
                        return (token, true);
                    }
                }
                Some(_) => {
                    self.advance();
                }
                None => {
                    let token =
                        self.make_token(TokenKind::MultiLineComment, &self.input[body_start..]);
                    return (token, false);
                }
            }
        }
    }

    /// Scans a delimited literal whose closing delimiter is escaped by doubling
    /// (`'it''s'`, `"a""b"`, `[a]]b]`).
    ///
    /// The opening delimiter (and `N` prefix) must already be consumed.
    /// Returns the token and whether it was terminated.
    fn scan_delimited(&mut self, kind: TokenKind, close: char) -> (Token, bool) {
        let mut value = String::new();

        loop {
            match self.advance() {
                Some(c) if c == close => {
                    if self.peek() == Some(close) {
                        value.push(close);
                        self.advance();
                    } else {
                        return (self.make_token(kind, value), true);
                    }
                }
                Some(c) => value.push(c),
                None => return (self.make_token(kind, value), false),
            }
        }
    }

    /// Scans a number (integer, decimal or scientific notation).
    fn scan_number(&mut self) -> Token {
        self.advance_while(|c| c.is_ascii_digit());

        if self.peek() == Some('.') {
            self.advance();
            self.advance_while(|c| c.is_ascii_digit());
        }

        if self.peek().is_some_and(|c| c == 'e' || c == 'E') {
            let exponent_follows = match self.peek_next() {
                Some(c) if c.is_ascii_digit() => true,
                Some('+' | '-') => {
                    let mut chars = self.input[self.pos..].chars().skip(2);
                    chars.next().is_some_and(|c| c.is_ascii_digit())
                }
                _ => false,
            };
            if exponent_follows {
                self.advance(); // e/E
                if self.peek().is_some_and(|c| c == '+' || c == '-') {
                    self.advance();
                }
                self.advance_while(|c| c.is_ascii_digit());
            }
        }

        self.make_raw_token(TokenKind::Number)
    }

    /// Scans a `0x` binary literal.
    fn scan_binary(&mut self) -> Token {
        self.advance(); // 0
        self.advance(); // x
        self.advance_while(|c| c.is_ascii_hexdigit());
        self.make_raw_token(TokenKind::BinaryValue)
    }

    /// Scans a monetary literal: a currency symbol followed by a number.
    fn scan_money(&mut self) -> Token {
        self.advance(); // currency symbol
        self.advance_while(|c| c.is_ascii_digit() || c == '.');
        self.make_raw_token(TokenKind::MonetaryValue)
    }

    /// Scans a word: keyword, name, variable or temp table.
    fn scan_word(&mut self, kind: TokenKind) -> Token {
        self.advance();
        self.advance_while(is_word_char);
        self.make_raw_token(kind)
    }

    /// Scans an operator, combining the two-character forms.
    fn scan_operator(&mut self, first: char) -> Token {
        let second = self.peek();
        let combines = match first {
            '+' | '-' | '/' | '%' | '&' | '|' | '^' | '*' => second == Some('='),
            '<' => matches!(second, Some('=' | '>')),
            '>' => second == Some('='),
            '!' => matches!(second, Some('=' | '<' | '>')),
            _ => false,
        };
        if combines {
            self.advance();
        }
        self.make_raw_token(TokenKind::OtherOperator)
    }

    /// Scans the next token, returning it with a flag telling whether it was
    /// properly terminated.
    fn next_token(&mut self) -> Option<(Token, bool)> {
        self.start = self.pos;
        let c = self.peek()?;
        let next = self.peek_next();

        let scanned = match c {
            c if c.is_whitespace() => (self.scan_whitespace(), true),
            '-' if next == Some('-') => (self.scan_line_comment(TokenKind::SingleLineComment), true),
            '/' if next == Some('/') => (
                self.scan_line_comment(TokenKind::SingleLineCommentCStyle),
                true,
            ),
            '/' if next == Some('*') => self.scan_block_comment(),
            '\'' => {
                self.advance();
                self.scan_delimited(TokenKind::String, '\'')
            }
            'N' | 'n' if next == Some('\'') => {
                self.advance();
                self.advance();
                self.scan_delimited(TokenKind::NationalString, '\'')
            }
            '"' => {
                self.advance();
                self.scan_delimited(TokenKind::QuotedString, '"')
            }
            '[' => {
                self.advance();
                self.scan_delimited(TokenKind::BracketQuotedName, ']')
            }
            '0' if matches!(next, Some('x' | 'X')) => (self.scan_binary(), true),
            c if c.is_ascii_digit() => (self.scan_number(), true),
            '.' if next.is_some_and(|n| n.is_ascii_digit()) => (self.scan_number(), true),
            '$' if next.is_some_and(|n| n.is_alphabetic() || n == '_') => {
                (self.scan_word(TokenKind::PseudoName), true)
            }
            '$' | '£' | '€' | '¥' if next.is_some_and(|n| n.is_ascii_digit() || n == '.') => {
                (self.scan_money(), true)
            }
            c if c.is_alphabetic() || matches!(c, '_' | '@' | '#') => {
                (self.scan_word(TokenKind::OtherNode), true)
            }
            _ => {
                self.advance();
                let kind = match c {
                    '(' => Some(TokenKind::OpenParens),
                    ')' => Some(TokenKind::CloseParens),
                    ',' => Some(TokenKind::Comma),
                    '.' => Some(TokenKind::Period),
                    ';' => Some(TokenKind::Semicolon),
                    ':' => Some(TokenKind::Colon),
                    '=' => Some(TokenKind::EqualsSign),
                    '*' if self.peek() != Some('=') => Some(TokenKind::Asterisk),
                    _ => None,
                };
                match kind {
                    Some(kind) => (self.make_raw_token(kind), true),
                    None if is_operator_char(c) => (self.scan_operator(c), true),
                    None => (self.make_raw_token(TokenKind::OtherNode), true),
                }
            }
        };

        Some(scanned)
    }

    /// Tokenizes the entire input.
    #[must_use]
    pub fn tokenize(mut self) -> TokenList {
        let mut tokens = Vec::new();
        let mut unfinished = false;

        while let Some((token, terminated)) = self.next_token() {
            tokens.push(token);
            if !terminated {
                unfinished = true;
            }
        }

        trace!(count = tokens.len(), unfinished, "tokenized input");
        TokenList::new(tokens, unfinished)
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '@' | '#' | '$')
}

fn is_operator_char(c: char) -> bool {
    matches!(
        c,
        '+' | '-' | '*' | '/' | '%' | '&' | '|' | '^' | '~' | '<' | '>' | '!'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(input: &str) -> TokenList {
        Lexer::new(input).tokenize()
    }

    fn token_kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).iter().map(|t| t.kind).collect()
    }

    fn token_values(input: &str) -> Vec<String> {
        tokenize(input).iter().map(|t| t.value.clone()).collect()
    }

    #[test]
    fn test_empty_input() {
        let tokens = tokenize("");
        assert!(tokens.is_empty());
        assert!(!tokens.has_unfinished_token());
    }

    #[test]
    fn test_whitespace_only() {
        assert_eq!(token_kinds("   \n\t  "), vec![TokenKind::WhiteSpace]);
    }

    #[test]
    fn test_words_and_whitespace() {
        assert_eq!(
            token_kinds("select @a, #t"),
            vec![
                TokenKind::OtherNode,
                TokenKind::WhiteSpace,
                TokenKind::OtherNode,
                TokenKind::Comma,
                TokenKind::WhiteSpace,
                TokenKind::OtherNode,
            ]
        );
        assert_eq!(token_values("select @a"), vec!["select", " ", "@a"]);
    }

    #[test]
    fn test_single_line_comment_keeps_line_break() {
        let tokens = tokenize("SELECT -- note\r\nFROM");
        assert_eq!(tokens[2].kind, TokenKind::SingleLineComment);
        assert_eq!(tokens[2].value, " note\r\n");
        assert_eq!(tokens[3].value, "FROM");
    }

    #[test]
    fn test_c_style_comment() {
        let tokens = tokenize("// hi\nx");
        assert_eq!(tokens[0].kind, TokenKind::SingleLineCommentCStyle);
        assert_eq!(tokens[0].value, " hi\n");
    }

    #[test]
    fn test_nested_block_comment() {
        let tokens = tokenize("/* a /* b */ c */x");
        assert_eq!(tokens[0].kind, TokenKind::MultiLineComment);
        assert_eq!(tokens[0].value, " a /* b */ c ");
        assert_eq!(tokens[1].value, "x");
        assert!(!tokens.has_unfinished_token());
    }

    #[test]
    fn test_unterminated_block_comment() {
        let tokens = tokenize("SELECT /* open");
        assert!(tokens.has_unfinished_token());
        assert_eq!(tokens[2].value, " open");
    }

    #[test]
    fn test_strings_unescape_doubled_quotes() {
        let tokens = tokenize("'it''s' N'x' \"a\"\"b\" [c]]d]");
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].value, "it's");
        assert_eq!(tokens[2].kind, TokenKind::NationalString);
        assert_eq!(tokens[2].value, "x");
        assert_eq!(tokens[4].kind, TokenKind::QuotedString);
        assert_eq!(tokens[4].value, "a\"b");
        assert_eq!(tokens[6].kind, TokenKind::BracketQuotedName);
        assert_eq!(tokens[6].value, "c]d");
    }

    #[test]
    fn test_unterminated_string() {
        let tokens = tokenize("SELECT 'abc");
        assert!(tokens.has_unfinished_token());
        assert_eq!(tokens[2].kind, TokenKind::String);
        assert_eq!(tokens[2].value, "abc");
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            token_kinds("1 2.5 1e10 .5 0x1F $3.50"),
            vec![
                TokenKind::Number,
                TokenKind::WhiteSpace,
                TokenKind::Number,
                TokenKind::WhiteSpace,
                TokenKind::Number,
                TokenKind::WhiteSpace,
                TokenKind::Number,
                TokenKind::WhiteSpace,
                TokenKind::BinaryValue,
                TokenKind::WhiteSpace,
                TokenKind::MonetaryValue,
            ]
        );
    }

    #[test]
    fn test_pseudo_name() {
        let tokens = tokenize("$action");
        assert_eq!(tokens[0].kind, TokenKind::PseudoName);
        assert_eq!(tokens[0].value, "$action");
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            token_values("a<>b>=c+=1*d=e"),
            vec!["a", "<>", "b", ">=", "c", "+=", "1", "*", "d", "=", "e"]
        );
        assert_eq!(tokenize("*")[0].kind, TokenKind::Asterisk);
        assert_eq!(tokenize("*=")[0].kind, TokenKind::OtherOperator);
        assert_eq!(tokenize("::")[0].kind, TokenKind::Colon);
    }

    #[test]
    fn test_spans_cover_input() {
        let input = "SELECT [a], 'b' -- c\n/* d */";
        let tokens = tokenize(input);
        let mut expected_start = 0;
        for token in &tokens {
            assert_eq!(token.span.start, expected_start);
            expected_start = token.span.end;
        }
        assert_eq!(expected_start, input.len());
    }
}

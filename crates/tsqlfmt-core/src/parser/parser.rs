//! Token-by-token structural parser.

use tracing::{debug, trace};

use super::builder::TreeBuilder;
use super::error::Result;
use crate::keywords::{
    COMPOUND_KEYWORDS, CURSOR_DETECTOR, JOIN_DETECTOR, KeywordType, TRIGGER_CONDITION_DETECTOR,
    is_clause_starter, is_statement_starter, keyword_type,
};
use crate::lexer::{Token, TokenKind, TokenList};
use crate::tree::{Attribute, NodeId, NodeKind, SqlTree};

/// Maximum number of significant words looked at when matching keyword
/// sequences.
const PHRASE_LENGTH: usize = 7;

/// Builds a structural tree from a token list.
///
/// Parsing never rejects input: malformed SQL sets the tree's error flag
/// and the parser carries on with best-effort recovery. An `Err` means the
/// builder's own navigation failed, which indicates a parser bug.
pub struct Parser<'a> {
    tokens: &'a TokenList,
    position: usize,
    builder: TreeBuilder,
}

/// The upcoming significant words (keywords, names and commas), skipping
/// whitespace and comments.
#[derive(Debug, Default)]
struct Phrase {
    words: Vec<PhraseWord>,
}

#[derive(Debug)]
struct PhraseWord {
    index: usize,
    text: String,
}

impl Phrase {
    fn word(&self, n: usize) -> &str {
        self.words.get(n).map_or("", |w| w.text.as_str())
    }

    /// Space-terminated words, the form the keyword detectors match on.
    fn text(&self) -> String {
        self.words.iter().fold(String::new(), |mut text, word| {
            text.push_str(&word.text);
            text.push(' ');
            text
        })
    }

    fn starts_with(&self, sequence: &[&str]) -> bool {
        sequence.len() <= self.words.len()
            && sequence
                .iter()
                .zip(&self.words)
                .all(|(expected, word)| *expected == word.text)
    }

    fn joined(&self, count: usize) -> String {
        self.words
            .iter()
            .take(count)
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Token index of the `count`-th word.
    fn end_index(&self, count: usize) -> Option<usize> {
        count
            .checked_sub(1)
            .and_then(|last| self.words.get(last))
            .map(|w| w.index)
    }

    fn compound_length(&self) -> Option<usize> {
        COMPOUND_KEYWORDS
            .iter()
            .find(|sequence| self.starts_with(sequence))
            .map(|sequence| sequence.len())
    }

    /// Number of words covered by a detector match on [`text`](Self::text).
    fn matched_words(matched: &str) -> usize {
        matched.split_whitespace().count()
    }
}

impl<'a> Parser<'a> {
    /// Creates a parser over the given tokens.
    #[must_use]
    pub fn new(tokens: &'a TokenList) -> Self {
        Self {
            tokens,
            position: 0,
            builder: TreeBuilder::new(),
        }
    }

    /// Consumes every token and returns the finished tree.
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` if the tree builder reaches an inconsistent
    /// state.
    pub fn parse(mut self) -> Result<SqlTree> {
        while self.position < self.tokens.len() {
            self.advance()?;
        }

        if self.tokens.has_unfinished_token() {
            debug!("token list ends with an unfinished token");
            self.builder.set_error();
        }
        if !self.builder.find_valid_batch_end()? {
            debug!(container = %self.builder.current_kind(), "input ends inside an open construct");
            self.builder.set_error();
        }

        let tree = self.builder.into_tree();
        debug!(
            tokens = self.tokens.len(),
            nodes = tree.node_count(),
            error = tree.has_error(),
            "parsed token list"
        );
        Ok(tree)
    }

    fn token(&self, index: usize) -> Option<&'a Token> {
        self.tokens.get(index)
    }

    fn current_token(&self) -> &'a Token {
        let tokens = self.tokens;
        &tokens[self.position]
    }

    /// Kind of the next token that is not whitespace or a comment.
    fn next_significant_kind(&self) -> Option<TokenKind> {
        self.tokens
            .iter()
            .skip(self.position + 1)
            .find(|t| !t.kind.is_non_content())
            .map(|t| t.kind)
    }

    fn significant_phrase(&self) -> Phrase {
        let mut phrase = Phrase::default();
        for (index, token) in self.tokens.iter().enumerate().skip(self.position) {
            let text = match token.kind {
                TokenKind::OtherNode => token.value.to_uppercase(),
                TokenKind::BracketQuotedName => format!("[{}]", token.value.to_uppercase()),
                TokenKind::Comma => ",".to_string(),
                kind if kind.is_non_content() => continue,
                _ => break,
            };
            phrase.words.push(PhraseWord { index, text });
            if phrase.words.len() == PHRASE_LENGTH {
                break;
            }
        }
        phrase
    }

    /// Processes the token at the current position, then moves past every
    /// token it consumed.
    fn advance(&mut self) -> Result<()> {
        let token = self.current_token();
        trace!(kind = ?token.kind, value = %token.value, "advance");

        match token.kind {
            TokenKind::OpenParens => self.open_parens()?,
            TokenKind::CloseParens => self.close_parens()?,
            TokenKind::OtherNode => self.process_word()?,
            TokenKind::Semicolon => {
                self.builder.save(NodeKind::Semicolon, token.value.clone());
                self.builder.set_new_statement_due(true);
            }
            TokenKind::Colon => self.process_colon(),
            TokenKind::Comma => self.process_comma()?,
            TokenKind::EqualsSign => {
                self.builder.save(NodeKind::EqualsSign, token.value.clone());
                if self.builder.path_is(0, NodeKind::DdlDeclareBlock) {
                    let body = self.builder.save(NodeKind::ContainerContentBody, "");
                    self.builder.set_current(body)?;
                }
            }
            kind if kind.is_non_content() => {
                // leading trivia goes before the clause, not inside it
                if self.builder.path_is(0, NodeKind::Clause)
                    && self.builder.path_is(1, NodeKind::Statement)
                    && self.builder.current_is_empty()
                {
                    let clause = self.builder.current();
                    self.builder
                        .save_before(leaf_kind(kind), token.value.clone(), clause)?;
                } else {
                    self.builder.save(leaf_kind(kind), token.value.clone());
                }
            }
            kind => {
                self.builder.save(leaf_kind(kind), token.value.clone());
            }
        }

        self.position += 1;
        Ok(())
    }

    fn open_parens(&mut self) -> Result<()> {
        use NodeKind::{
            AlphaOperator, BracketQuotedName, Clause, CompoundKeyword, ContainerContentBody,
            CteAlias, CteAsBlock, DataTypeKeyword, DdlDeclareBlock, DdlDetailParens, DdlOtherBlock,
            DdlParens, DdlProceduralBlock, ExpressionParens, FunctionKeyword, FunctionParens,
            InParens, Other, QuotedString, SelectionTarget, SelectionTargetParens,
            SetOperatorClause,
        };

        let first_keyword = self
            .builder
            .first_content_child()
            .and_then(|first| self.builder.keyword_text(first));
        let last = self.builder.last_content_child();
        let tree = self.builder.tree();
        let last_kind = last.map(|id| tree.kind(id));
        let last_text = last.map(|id| tree.text(id).to_uppercase()).unwrap_or_default();
        let last_is_compound_data_type = last.is_some_and(|id| {
            tree.kind(id) == CompoundKeyword
                && tree
                    .attribute(id, Attribute::SimpleText)
                    .and_then(|text| text.rsplit(' ').next())
                    .is_some_and(|word| keyword_type(word) == Some(KeywordType::DataType))
        });
        let current = self.builder.current_kind();

        let kind = if matches!(
            current,
            DdlProceduralBlock | DdlOtherBlock | DdlDeclareBlock | CteAlias
        ) || (current == Clause
            && matches!(
                first_keyword.as_deref(),
                Some("OPTION" | "INSERT" | "INSERT INTO" | "VALUES")
            )) {
            DdlParens
        } else if current == ContainerContentBody && self.builder.path_is(1, CteAsBlock) {
            ExpressionParens
        } else if current == SelectionTarget && !self.builder.current_has_content() {
            SelectionTargetParens
        } else if last_kind == Some(SetOperatorClause) {
            self.builder.consider_starting_new_clause()?;
            SelectionTargetParens
        } else if last_kind == Some(DataTypeKeyword) || last_is_compound_data_type {
            DdlDetailParens
        } else if last_kind == Some(AlphaOperator) && last_text == "IN" {
            InParens
        } else if matches!(
            last_kind,
            Some(Other | BracketQuotedName | FunctionKeyword | QuotedString)
        ) {
            FunctionParens
        } else {
            ExpressionParens
        };

        let parens = self.builder.save(kind, "");
        self.builder.set_current(parens)
    }

    fn close_parens(&mut self) -> Result<()> {
        self.builder
            .escape_any_single_or_partial_statement_containers()?;

        let current = self.builder.current_kind();
        let parent_is_parens = self
            .builder
            .tree()
            .parent(self.builder.current())
            .is_some_and(|p| self.builder.tree().kind(p).is_parens());

        if current.is_parens() {
            self.builder.move_up(1)?;
        } else if current == NodeKind::Clause && parent_is_parens {
            self.builder.move_up(2)?;
        } else {
            self.builder.save_with_error(NodeKind::Other, ")");
            return Ok(());
        }

        // a finished CTE body returns to the list of CTEs
        if self.builder.path_is(0, NodeKind::ContainerContentBody)
            && self.builder.path_is(1, NodeKind::CteAsBlock)
        {
            self.builder.move_up_to(2, NodeKind::ContainerContentBody)?;
        }
        Ok(())
    }

    fn process_colon(&mut self) {
        match self.token(self.position + 1) {
            Some(next) if next.kind == TokenKind::Colon => {
                self.builder.save(NodeKind::ScopeResolutionOperator, "::");
                self.position += 1;
            }
            Some(next) if next.kind == TokenKind::OtherNode => {
                self.builder
                    .save(NodeKind::Other, format!(":{}", next.value));
                self.position += 1;
            }
            _ => {
                self.builder.save_with_error(NodeKind::Other, ":");
            }
        }
    }

    fn process_comma(&mut self) -> Result<()> {
        let value = self.current_token().value.clone();
        self.builder.save(NodeKind::Comma, value);
        if self.builder.path_is(0, NodeKind::ContainerContentBody)
            && self.builder.path_is(1, NodeKind::CteWithClause)
        {
            let alias = self.builder.save(NodeKind::CteAlias, "");
            self.builder.set_current(alias)?;
        }
        Ok(())
    }

    /// Saves a one-word keyword, or a compound keyword spanning the first
    /// `count` words of `phrase` with every token in between.
    fn save_keyword(&mut self, parent: NodeId, phrase: &Phrase, count: usize) -> NodeId {
        let Some(end) = self.phrase_end(phrase, count) else {
            let value = self.current_token().value.clone();
            return self.builder.save_in(parent, NodeKind::OtherKeyword, value);
        };
        let compound = self.builder.save_in(parent, NodeKind::CompoundKeyword, "");
        self.builder
            .set_attribute(compound, Attribute::SimpleText, phrase.joined(count));
        self.save_token_range(compound, end);
        compound
    }

    fn phrase_end(&self, phrase: &Phrase, count: usize) -> Option<usize> {
        if count > 1 {
            phrase.end_index(count)
        } else {
            None
        }
    }

    /// Saves the tokens from the current position through `end` into
    /// `parent`, leaving the position on `end`.
    fn save_token_range(&mut self, parent: NodeId, end: usize) {
        let tokens = self.tokens;
        for token in tokens.iter().take(end + 1).skip(self.position) {
            let kind = match token.kind {
                TokenKind::OtherNode => NodeKind::OtherKeyword,
                other => leaf_kind(other),
            };
            self.builder.save_in(parent, kind, token.value.clone());
        }
        self.position = end;
    }

    /// Saves a single word typed by the keyword tables.
    fn save_typed_word(&mut self) {
        let value = self.current_token().value.clone();
        let kind = match keyword_type(&value.to_uppercase()) {
            Some(KeywordType::Operator) => NodeKind::AlphaOperator,
            Some(KeywordType::Function) => NodeKind::FunctionKeyword,
            Some(KeywordType::DataType) => NodeKind::DataTypeKeyword,
            Some(KeywordType::Other) => NodeKind::OtherKeyword,
            None => NodeKind::Other,
        };
        self.builder.save(kind, value);
    }

    fn save_current_keyword(&mut self) {
        let value = self.current_token().value.clone();
        self.builder.save(NodeKind::OtherKeyword, value);
    }

    fn is_label(&self) -> bool {
        matches!(self.token(self.position + 1), Some(t) if t.kind == TokenKind::Colon)
            && !matches!(self.token(self.position + 2), Some(t) if t.kind == TokenKind::Colon)
    }

    fn process_word(&mut self) -> Result<()> {
        let phrase = self.significant_phrase();
        let matcher = phrase.text();
        let first = phrase.word(0).to_string();

        if self.builder.path_is(0, NodeKind::PermissionsDetail) {
            return self.process_permissions_detail(&first);
        }

        if self.is_label() {
            self.builder.consider_starting_new_statement()?;
            let label = format!("{}:", self.current_token().value);
            self.builder.save(NodeKind::Label, label);
            self.position += 1;
            return Ok(());
        }

        if is_procedural_ddl(&phrase) {
            self.builder.consider_starting_new_statement()?;
            let block = self.builder.save(NodeKind::DdlProceduralBlock, "");
            self.builder.set_current(block)?;
            self.save_current_keyword();
            return Ok(());
        }

        if CURSOR_DETECTOR.is_match(&matcher) {
            self.builder.consider_starting_new_statement()?;
            let declaration = self.builder.save(NodeKind::CursorDeclaration, "");
            self.builder.set_current(declaration)?;
            self.save_current_keyword();
            return Ok(());
        }

        if self.in_procedural_ddl() {
            if let Some(matched) = TRIGGER_CONDITION_DETECTOR.find(&matcher) {
                let words = Phrase::matched_words(matched.as_str());
                return self.process_trigger_condition(&phrase, words);
            }
        }

        if let Some(matched) = JOIN_DETECTOR.find(&matcher) {
            let words = Phrase::matched_words(matched.as_str());
            return self.process_join(&phrase, words);
        }

        match first.as_str() {
            "CASE" => {
                let value = self.current_token().value.clone();
                self.builder
                    .start_new_container(NodeKind::CaseStatement, &value, NodeKind::CaseInput)?;
            }
            "WHEN" => self.process_when()?,
            "THEN" => self.process_then()?,
            "ELSE" => self.process_else()?,
            "END" => self.process_end(&phrase)?,
            "BEGIN" => self.process_begin(&phrase)?,
            "COMMIT" | "ROLLBACK" => self.process_transaction(&phrase, &first)?,
            "SAVE" if phrase.compound_length().is_some() => {
                self.process_transaction(&phrase, &first)?;
            }
            "GO" => self.process_batch_separator()?,
            "IF" | "WHILE" => {
                self.builder.consider_starting_new_statement()?;
                let kind = if first == "IF" {
                    NodeKind::IfStatement
                } else {
                    NodeKind::WhileLoop
                };
                let value = self.current_token().value.clone();
                self.builder
                    .start_new_container(kind, &value, NodeKind::BooleanExpression)?;
            }
            "DECLARE" | "CREATE" | "ALTER" => {
                self.builder.consider_starting_new_statement()?;
                let kind = if first == "DECLARE" {
                    NodeKind::DdlDeclareBlock
                } else {
                    NodeKind::DdlOtherBlock
                };
                let block = self.builder.save(kind, "");
                self.builder.set_current(block)?;
                self.save_current_keyword();
            }
            "GRANT" | "DENY" | "REVOKE" => self.process_permissions(&first)?,
            "TO" | "FROM"
                if self.builder.path_is(0, NodeKind::ContainerContentBody)
                    && self.builder.path_is(1, NodeKind::PermissionsTarget) =>
            {
                self.builder.move_up_to(2, NodeKind::PermissionsBlock)?;
                let value = self.current_token().value.clone();
                self.builder.start_new_container(
                    NodeKind::PermissionsRecipient,
                    &value,
                    NodeKind::ContainerContentBody,
                )?;
            }
            "FROM" => {
                self.builder.consider_starting_new_clause()?;
                self.save_current_keyword();
                let target = self.builder.save(NodeKind::SelectionTarget, "");
                self.builder.set_current(target)?;
            }
            "CASCADE" => self.process_cascade()?,
            "RETURNS" if self.builder.path_is(0, NodeKind::DdlProceduralBlock) => {
                let returns = self.builder.save(NodeKind::DdlReturns, "");
                let value = self.current_token().value.clone();
                self.builder.save_in(returns, NodeKind::OtherKeyword, value);
            }
            "AS" => self.process_as(&phrase)?,
            "FOR" => self.process_for()?,
            "WITH" => self.process_with()?,
            "ON" => self.process_on()?,
            "USING" if self.builder.path_is(0, NodeKind::MergeTarget) => {
                self.builder.move_up_to(1, NodeKind::MergeClause)?;
                let value = self.current_token().value.clone();
                self.builder.start_new_container(
                    NodeKind::MergeUsing,
                    &value,
                    NodeKind::SelectionTarget,
                )?;
            }
            "MERGE" => {
                if !self.after_cte() {
                    self.builder.consider_starting_new_statement()?;
                }
                self.builder.consider_starting_new_clause()?;
                let value = self.current_token().value.clone();
                self.builder
                    .start_new_container(NodeKind::MergeClause, &value, NodeKind::MergeTarget)?;
            }
            "SELECT" => self.process_select()?,
            "UPDATE" => self.process_update()?,
            "SET" => self.process_set()?,
            "EXEC" | "EXECUTE" => self.process_execute(&phrase)?,
            "BETWEEN" => {
                let value = self.current_token().value.clone();
                self.builder
                    .start_new_container(NodeKind::Between, &value, NodeKind::LowerBound)?;
            }
            "AND" => self.process_and()?,
            "OR" => {
                self.builder.escape_any_between_conditions()?;
                let or = self.builder.save(NodeKind::Or, "");
                let value = self.current_token().value.clone();
                self.builder.save_in(or, NodeKind::OtherKeyword, value);
            }
            "UNION" | "INTERSECT" | "EXCEPT" => {
                self.builder.consider_starting_new_clause()?;
                let clause = self.builder.save(NodeKind::SetOperatorClause, "");
                let count = if phrase.starts_with(&["UNION", "ALL"]) { 2 } else { 1 };
                self.save_keyword(clause, &phrase, count);
            }
            _ => self.process_other_word(&phrase)?,
        }
        Ok(())
    }

    fn process_other_word(&mut self, phrase: &Phrase) -> Result<()> {
        let first = phrase.word(0);
        let after_cte = self.after_cte();
        if (is_statement_starter(first) || self.builder.new_statement_due()) && !after_cte {
            self.builder.consider_starting_new_statement()?;
        }
        let module_option = self.builder.path_is(0, NodeKind::ContainerContentBody)
            && self.builder.path_is(1, NodeKind::DdlWithClause);
        if (is_clause_starter(first) && !module_option)
            || (is_statement_starter(first) && after_cte)
        {
            self.builder.consider_starting_new_clause()?;
        }

        let Some(count) = phrase.compound_length() else {
            self.save_typed_word();
            return Ok(());
        };
        if (phrase.starts_with(&["ORDER", "BY"]) || phrase.starts_with(&["GROUP", "BY"]))
            && !self.builder.path_is(0, NodeKind::ExpressionParens)
        {
            self.builder.consider_starting_new_clause()?;
        }
        let current = self.builder.current();
        self.save_keyword(current, phrase, count);
        Ok(())
    }

    /// True right after the body of the last CTE in a WITH list, where the
    /// statement the CTEs belong to begins.
    fn after_cte(&self) -> bool {
        self.builder.path_is(0, NodeKind::ContainerContentBody)
            && self.builder.path_is(1, NodeKind::CteWithClause)
    }

    fn in_procedural_ddl(&self) -> bool {
        self.builder.path_is(0, NodeKind::DdlProceduralBlock)
            || (self.builder.path_is(0, NodeKind::ContainerContentBody)
                && self.builder.path_is(1, NodeKind::DdlWithClause)
                && self.builder.path_is(2, NodeKind::DdlProceduralBlock))
    }

    /// Leaves a procedure's WITH options for its main block.
    fn escape_procedural_options(&mut self) -> Result<()> {
        if self.builder.path_is(0, NodeKind::ContainerContentBody)
            && self.builder.path_is(1, NodeKind::DdlWithClause)
            && self.builder.path_is(2, NodeKind::DdlProceduralBlock)
        {
            self.builder.move_up_to(2, NodeKind::DdlProceduralBlock)?;
        }
        Ok(())
    }

    fn process_trigger_condition(&mut self, phrase: &Phrase, words: usize) -> Result<()> {
        self.escape_procedural_options()?;
        let condition = self.builder.save(NodeKind::TriggerCondition, "");
        let type_words = if phrase.word(0) == "INSTEAD" { 2 } else { 1 };
        self.save_keyword(condition, phrase, type_words);
        if let Some(end) = phrase.end_index(words) {
            self.position += 1;
            self.save_token_range(condition, end);
        }
        Ok(())
    }

    fn process_join(&mut self, phrase: &Phrase, words: usize) -> Result<()> {
        self.builder.escape_any_between_conditions()?;
        self.builder.escape_any_selection_target()?;
        self.builder.escape_join_condition()?;

        let target = self.builder.save(NodeKind::JoinTarget, "");
        let open = self
            .builder
            .save_in(target, NodeKind::ContainerOpen, "");
        if words > 1 {
            self.save_keyword(open, phrase, words);
        } else {
            let compound = self
                .builder
                .save_in(open, NodeKind::CompoundKeyword, "");
            self.builder
                .set_attribute(compound, Attribute::SimpleText, phrase.joined(1));
            let value = self.current_token().value.clone();
            self.builder
                .save_in(compound, NodeKind::OtherKeyword, value);
        }
        self.builder.set_current(target)
    }

    fn process_when(&mut self) -> Result<()> {
        self.builder.escape_any_between_conditions()?;
        let value = self.current_token().value.clone();

        if self.builder.path_is(0, NodeKind::CaseInput) {
            self.builder.move_up_to(1, NodeKind::CaseStatement)?;
        } else if self.builder.path_is(0, NodeKind::ContainerContentBody)
            && self.builder.path_is(1, NodeKind::CaseThen)
        {
            self.builder.move_up_to(3, NodeKind::CaseStatement)?;
        } else {
            self.builder.escape_any_selection_target()?;
            self.builder.escape_merge_action()?;
            if self.builder.path_is(0, NodeKind::MergeWhen) {
                self.builder.move_up_to(1, NodeKind::MergeClause)?;
            } else if self.builder.path_is(0, NodeKind::ContainerContentBody)
                && self.builder.path_is(1, NodeKind::MergeCondition)
            {
                self.builder.move_up_to(2, NodeKind::MergeClause)?;
            }

            if self.builder.path_is(0, NodeKind::MergeClause) {
                self.builder.start_new_container(
                    NodeKind::MergeWhen,
                    &value,
                    NodeKind::ContainerContentBody,
                )?;
            } else {
                self.builder.save_with_error(NodeKind::OtherKeyword, value);
            }
            return Ok(());
        }

        self.builder
            .start_new_container(NodeKind::CaseWhen, &value, NodeKind::ContainerContentBody)?;
        Ok(())
    }

    fn process_then(&mut self) -> Result<()> {
        self.builder.escape_any_between_conditions()?;
        let value = self.current_token().value.clone();

        if self.builder.path_is(0, NodeKind::ContainerContentBody)
            && self.builder.path_is(1, NodeKind::CaseWhen)
        {
            self.builder.move_up_to(1, NodeKind::CaseWhen)?;
            self.builder.start_new_container(
                NodeKind::CaseThen,
                &value,
                NodeKind::ContainerContentBody,
            )?;
        } else if self.builder.path_is(0, NodeKind::ContainerContentBody)
            && self.builder.path_is(1, NodeKind::MergeWhen)
        {
            self.builder.move_up_to(1, NodeKind::MergeWhen)?;
            self.builder
                .start_new_container(NodeKind::MergeThen, &value, NodeKind::MergeAction)?;
            self.builder.start_new_statement();
        } else {
            self.builder.save_with_error(NodeKind::OtherKeyword, value);
        }
        Ok(())
    }

    fn process_else(&mut self) -> Result<()> {
        self.builder.escape_any_between_conditions()?;
        let value = self.current_token().value.clone();

        if self.builder.path_is(0, NodeKind::ContainerContentBody)
            && self.builder.path_is(1, NodeKind::CaseThen)
        {
            self.builder.move_up_to(3, NodeKind::CaseStatement)?;
            self.builder.start_new_container(
                NodeKind::CaseElse,
                &value,
                NodeKind::ContainerContentBody,
            )?;
            return Ok(());
        }

        self.builder.escape_any_selection_target()?;
        self.builder.escape_join_condition()?;
        self.builder.escape_partial_statement_containers()?;

        if let Some(if_statement) = self.find_else_owner() {
            self.builder.set_current(if_statement)?;
            self.builder.start_new_container(
                NodeKind::ElseClause,
                &value,
                NodeKind::ContainerSingleStatementBody,
            )?;
            self.builder.start_new_statement();
            return Ok(());
        }

        self.builder.save_with_error(NodeKind::OtherKeyword, value);
        Ok(())
    }

    /// Finds the IF statement an ELSE at the cursor belongs to: the nearest
    /// enclosing IF whose body has just ended and that has no ELSE yet.
    fn find_else_owner(&self) -> Option<NodeId> {
        if !(self.builder.path_is(0, NodeKind::Clause)
            && self.builder.path_is(1, NodeKind::Statement)
            && self.builder.path_is(2, NodeKind::ContainerSingleStatementBody))
        {
            return None;
        }

        let tree = self.builder.tree();
        let mut single = tree.ancestor(self.builder.current(), 2)?;
        while tree.kind(single) == NodeKind::ContainerSingleStatementBody {
            let owner = tree.parent(single)?;
            single = match tree.kind(owner) {
                NodeKind::IfStatement => return Some(owner),
                // body.else.if.clause.statement.container
                NodeKind::ElseClause => tree.ancestor(single, 5)?,
                // body.while.clause.statement.container
                NodeKind::WhileLoop => tree.ancestor(single, 4)?,
                _ => return None,
            };
        }
        None
    }

    fn process_end(&mut self, phrase: &Phrase) -> Result<()> {
        if phrase.starts_with(&["END", "TRY"]) || phrase.starts_with(&["END", "CATCH"]) {
            let block_kind = if phrase.word(1) == "TRY" {
                NodeKind::TryBlock
            } else {
                NodeKind::CatchBlock
            };
            self.builder
                .escape_any_single_or_partial_statement_containers()?;
            if self.builder.path_is(0, NodeKind::Clause)
                && self.builder.path_is(1, NodeKind::Statement)
                && self.builder.path_is(2, NodeKind::ContainerMultiStatementBody)
                && self.builder.path_is(3, block_kind)
            {
                self.builder.move_up_to(3, block_kind)?;
                let close = self.builder.save(NodeKind::ContainerClose, "");
                self.save_keyword(close, phrase, 2);
                self.builder.move_up(1)?;
                self.builder.set_new_statement_due(true);
            } else {
                let current = self.builder.current();
                self.save_keyword(current, phrase, 2);
                self.builder.set_error();
            }
            return Ok(());
        }

        self.builder.escape_any_between_conditions()?;
        let value = self.current_token().value.clone();

        let case_levels = if self.builder.path_is(0, NodeKind::ContainerContentBody)
            && self.builder.path_is(1, NodeKind::CaseThen)
        {
            Some(3)
        } else if self.builder.path_is(0, NodeKind::ContainerContentBody)
            && self.builder.path_is(1, NodeKind::CaseElse)
        {
            Some(2)
        } else {
            None
        };

        if let Some(levels) = case_levels {
            self.builder.move_up_to(levels, NodeKind::CaseStatement)?;
            let close = self.builder.save(NodeKind::ContainerClose, "");
            self.builder.save_in(close, NodeKind::OtherKeyword, value);
            return self.builder.move_up(1);
        }

        self.builder
            .escape_any_single_or_partial_statement_containers()?;
        if self.builder.path_is(0, NodeKind::Clause)
            && self.builder.path_is(1, NodeKind::Statement)
            && self.builder.path_is(2, NodeKind::ContainerMultiStatementBody)
            && self.builder.path_is(3, NodeKind::BeginEndBlock)
        {
            self.builder.move_up_to(3, NodeKind::BeginEndBlock)?;
            let close = self.builder.save(NodeKind::ContainerClose, "");
            self.builder.save_in(close, NodeKind::OtherKeyword, value);
            self.builder.move_up(1)?;
            self.builder.set_new_statement_due(true);
        } else {
            self.builder.save_with_error(NodeKind::OtherKeyword, value);
        }
        Ok(())
    }

    fn process_begin(&mut self, phrase: &Phrase) -> Result<()> {
        self.builder.consider_starting_new_statement()?;

        let block_kind = match phrase.word(1) {
            "TRY" => Some(NodeKind::TryBlock),
            "CATCH" => Some(NodeKind::CatchBlock),
            _ => None,
        };
        if let Some(kind) = block_kind {
            let block = self.builder.save(kind, "");
            let open = self.builder.save_in(block, NodeKind::ContainerOpen, "");
            self.save_keyword(open, phrase, 2);
            let body = self
                .builder
                .save_in(block, NodeKind::ContainerMultiStatementBody, "");
            self.builder.set_current(body)?;
            self.builder.start_new_statement();
            return Ok(());
        }

        if let Some(count) = phrase.compound_length() {
            let transaction = self.builder.save(NodeKind::BeginTransaction, "");
            self.save_keyword(transaction, phrase, count);
            return Ok(());
        }

        let value = self.current_token().value.clone();
        self.builder.start_new_container(
            NodeKind::BeginEndBlock,
            &value,
            NodeKind::ContainerMultiStatementBody,
        )?;
        self.builder.start_new_statement();
        Ok(())
    }

    fn process_transaction(&mut self, phrase: &Phrase, first: &str) -> Result<()> {
        self.builder.consider_starting_new_statement()?;
        let kind = match first {
            "COMMIT" => NodeKind::CommitTransaction,
            "ROLLBACK" => NodeKind::RollbackTransaction,
            _ => NodeKind::SaveTransaction,
        };
        let transaction = self.builder.save(kind, "");
        let count = phrase.compound_length().unwrap_or(1);
        self.save_keyword(transaction, phrase, count);
        Ok(())
    }

    fn process_batch_separator(&mut self) -> Result<()> {
        self.builder
            .escape_any_single_or_partial_statement_containers()?;
        let value = self.current_token().value.clone();

        let starts_line = self
            .position
            .checked_sub(1)
            .and_then(|previous| self.token(previous))
            .is_none_or(Token::ends_line);
        let ends_line = match self.token(self.position + 1) {
            None => true,
            Some(next) if next.ends_line() => true,
            Some(next) if next.kind == TokenKind::WhiteSpace => self
                .token(self.position + 2)
                .is_none_or(Token::ends_line),
            Some(_) => false,
        };

        if !(starts_line && ends_line) {
            self.builder.save(NodeKind::Other, value);
        } else if self.builder.find_valid_batch_end()? {
            let root = self.builder.tree().root();
            let separator = self.builder.save_in(root, NodeKind::BatchSeparator, "");
            self.builder
                .save_in(separator, NodeKind::OtherKeyword, value);
            self.builder.start_new_statement_in(root);
            trace!("batch separator");
        } else {
            self.builder.save_with_error(NodeKind::Other, value);
        }
        Ok(())
    }

    fn process_permissions_detail(&mut self, first: &str) -> Result<()> {
        let kind = match first {
            "ON" => NodeKind::PermissionsTarget,
            "TO" | "FROM" => NodeKind::PermissionsRecipient,
            _ => {
                self.save_typed_word();
                return Ok(());
            }
        };
        self.builder.move_up_to(1, NodeKind::PermissionsBlock)?;
        let value = self.current_token().value.clone();
        self.builder
            .start_new_container(kind, &value, NodeKind::ContainerContentBody)?;
        Ok(())
    }

    fn process_permissions(&mut self, first: &str) -> Result<()> {
        // WITH GRANT OPTION
        if first == "GRANT"
            && self.builder.path_is(0, NodeKind::ContainerContentBody)
            && self.builder.path_is(1, NodeKind::DdlWithClause)
            && self.builder.path_is(2, NodeKind::PermissionsBlock)
            && !self.builder.current_has_content()
        {
            self.save_current_keyword();
            return Ok(());
        }

        self.builder.consider_starting_new_statement()?;
        let value = self.current_token().value.clone();
        self.builder.start_new_container(
            NodeKind::PermissionsBlock,
            &value,
            NodeKind::PermissionsDetail,
        )?;
        Ok(())
    }

    fn process_cascade(&mut self) -> Result<()> {
        if self.builder.path_is(0, NodeKind::ContainerContentBody)
            && (self.builder.path_is(1, NodeKind::PermissionsRecipient)
                || self.builder.path_is(1, NodeKind::DdlWithClause))
            && self.builder.path_is(2, NodeKind::PermissionsBlock)
        {
            self.builder.move_up_to(2, NodeKind::PermissionsBlock)?;
            let value = self.current_token().value.clone();
            self.builder.start_new_container(
                NodeKind::DdlWithClause,
                &value,
                NodeKind::ContainerContentBody,
            )?;
        } else {
            self.save_current_keyword();
        }
        Ok(())
    }

    fn process_as(&mut self, phrase: &Phrase) -> Result<()> {
        self.escape_procedural_options()?;
        let value = self.current_token().value.clone();

        if self.builder.path_is(0, NodeKind::DdlProceduralBlock) {
            let declares_type = keyword_type(phrase.word(1)) == Some(KeywordType::DataType);
            if declares_type {
                self.save_current_keyword();
            } else {
                self.builder.start_new_container(
                    NodeKind::DdlAsBlock,
                    &value,
                    NodeKind::ContainerContentBody,
                )?;
                self.builder.start_new_statement();
            }
        } else if self.builder.path_is(0, NodeKind::CteAlias) {
            self.builder.move_up(1)?;
            self.builder.start_new_container(
                NodeKind::CteAsBlock,
                &value,
                NodeKind::ContainerContentBody,
            )?;
        } else {
            self.save_current_keyword();
        }
        Ok(())
    }

    fn process_for(&mut self) -> Result<()> {
        let value = self.current_token().value.clone();

        if self.builder.path_is(0, NodeKind::CursorDeclaration) {
            self.builder.start_new_container(
                NodeKind::CursorForBlock,
                &value,
                NodeKind::ContainerContentBody,
            )?;
            self.builder.start_new_statement();
            return Ok(());
        }

        self.builder.escape_any_selection_target()?;
        if self.builder.path_is(0, NodeKind::Clause)
            && self.builder.path_is(1, NodeKind::Statement)
            && self.builder.path_is(2, NodeKind::ContainerContentBody)
            && self.builder.path_is(3, NodeKind::CursorForBlock)
        {
            self.builder.move_up_to(4, NodeKind::CursorDeclaration)?;
            self.builder.start_new_container(
                NodeKind::CursorForOptions,
                &value,
                NodeKind::ContainerContentBody,
            )?;
            return Ok(());
        }

        // FOR XML / FOR BROWSE at clause level, otherwise just a keyword
        if self.builder.path_is(0, NodeKind::Clause) && self.builder.path_is(1, NodeKind::Statement)
        {
            self.builder.consider_starting_new_clause()?;
        }
        self.save_current_keyword();
        Ok(())
    }

    fn process_with(&mut self) -> Result<()> {
        if self.builder.new_statement_due() {
            self.builder.consider_starting_new_statement()?;
        }
        let value = self.current_token().value.clone();

        if self.builder.path_is(0, NodeKind::Clause)
            && self.builder.path_is(1, NodeKind::Statement)
            && !self.builder.current_has_content()
        {
            let (_, open) = self.builder.start_new_container_with_open(
                NodeKind::CteWithClause,
                NodeKind::ContainerContentBody,
            )?;
            self.builder.save_in(open, NodeKind::OtherKeyword, value);
            let alias = self.builder.save(NodeKind::CteAlias, "");
            self.builder.set_current(alias)?;
        } else if self.builder.path_is(0, NodeKind::ContainerContentBody)
            && self.builder.path_is(1, NodeKind::PermissionsRecipient)
        {
            self.builder.move_up_to(2, NodeKind::PermissionsBlock)?;
            self.builder.start_new_container(
                NodeKind::DdlWithClause,
                &value,
                NodeKind::ContainerContentBody,
            )?;
        } else if self.builder.path_is(0, NodeKind::DdlProceduralBlock)
            || self.builder.path_is(0, NodeKind::DdlOtherBlock)
        {
            self.builder.start_new_container(
                NodeKind::DdlWithClause,
                &value,
                NodeKind::ContainerContentBody,
            )?;
        } else if self.builder.path_is(0, NodeKind::SelectionTarget)
            || self.builder.path_is(0, NodeKind::JoinTarget)
        {
            // table hint
            self.save_current_keyword();
        } else {
            self.builder.consider_starting_new_clause()?;
            self.save_current_keyword();
        }
        Ok(())
    }

    fn process_on(&mut self) -> Result<()> {
        let value = self.current_token().value.clone();
        if self.builder.path_is(0, NodeKind::SelectionTarget)
            || self.builder.path_is(0, NodeKind::JoinTarget)
        {
            self.builder.escape_any_selection_target()?;
        }

        let follows_join = self
            .builder
            .last_content_child()
            .is_some_and(|last| self.builder.tree().kind(last) == NodeKind::JoinTarget);

        if self.builder.path_is(0, NodeKind::MergeUsing) {
            self.builder.move_up_to(1, NodeKind::MergeClause)?;
            self.builder.start_new_container(
                NodeKind::MergeCondition,
                &value,
                NodeKind::ContainerContentBody,
            )?;
        } else if follows_join {
            self.builder.start_new_container(
                NodeKind::JoinOn,
                &value,
                NodeKind::ContainerContentBody,
            )?;
        } else {
            self.save_current_keyword();
        }
        Ok(())
    }

    fn process_select(&mut self) -> Result<()> {
        let after_set_operator = self
            .builder
            .last_content_child()
            .is_some_and(|last| self.builder.tree().kind(last) == NodeKind::SetOperatorClause);
        let continues_insert = matches!(
            self.builder.statement_first_keyword().as_deref(),
            Some("INSERT" | "INSERT INTO")
        ) && self.builder.path_is(0, NodeKind::Clause)
            && !self
                .builder
                .statement_has_clause_starting_with(&["SELECT", "VALUES"]);

        if !(after_set_operator || continues_insert || self.after_cte()) {
            self.builder.consider_starting_new_statement()?;
        }
        self.builder.consider_starting_new_clause()?;
        self.save_current_keyword();
        Ok(())
    }

    fn process_update(&mut self) -> Result<()> {
        let cursor_option = self.builder.path_is(0, NodeKind::ContainerContentBody)
            && self.builder.path_is(1, NodeKind::CursorForOptions);
        // UPDATE(column) inside a trigger
        let function_call = self.next_significant_kind() == Some(TokenKind::OpenParens);

        if !(cursor_option || function_call) {
            if !self.after_cte() {
                self.builder.consider_starting_new_statement()?;
            }
            self.builder.consider_starting_new_clause()?;
        }
        self.save_current_keyword();
        Ok(())
    }

    fn process_set(&mut self) -> Result<()> {
        if !self.builder.path_is(0, NodeKind::DdlOtherBlock) {
            let update_assignments = self.builder.statement_first_keyword().as_deref()
                == Some("UPDATE")
                && !self.builder.statement_has_clause_starting_with(&["SET"]);
            if update_assignments {
                self.builder.consider_starting_new_clause()?;
            } else {
                self.builder.consider_starting_new_statement()?;
            }
        }
        self.save_current_keyword();
        Ok(())
    }

    fn process_execute(&mut self, phrase: &Phrase) -> Result<()> {
        if phrase.word(1) == "AS" {
            let module_option = self.builder.path_is(0, NodeKind::ContainerContentBody)
                && self.builder.path_is(1, NodeKind::DdlWithClause);
            if !module_option {
                self.builder.consider_starting_new_statement()?;
                self.builder.consider_starting_new_clause()?;
            }
            let current = self.builder.current();
            self.save_keyword(current, phrase, 2);
            return Ok(());
        }

        let inserts_results = matches!(
            self.builder.statement_first_keyword().as_deref(),
            Some("INSERT" | "INSERT INTO")
        ) && self.builder.path_is(0, NodeKind::Clause);
        if inserts_results {
            self.builder.consider_starting_new_clause()?;
        } else {
            self.builder.consider_starting_new_statement()?;
        }
        self.save_current_keyword();
        Ok(())
    }

    fn process_and(&mut self) -> Result<()> {
        let value = self.current_token().value.clone();
        if self.builder.path_is(0, NodeKind::LowerBound) {
            self.builder.move_up_to(1, NodeKind::Between)?;
            let close = self.builder.save(NodeKind::ContainerClose, "");
            self.builder.save_in(close, NodeKind::OtherKeyword, value);
            let upper = self.builder.save(NodeKind::UpperBound, "");
            self.builder.set_current(upper)?;
        } else {
            self.builder.escape_any_between_conditions()?;
            let and = self.builder.save(NodeKind::And, "");
            self.builder.save_in(and, NodeKind::OtherKeyword, value);
        }
        Ok(())
    }
}

/// `CREATE|ALTER [OR ALTER] PROC|PROCEDURE|FUNCTION|TRIGGER|VIEW`
fn is_procedural_ddl(phrase: &Phrase) -> bool {
    let object = match (phrase.word(0), phrase.word(1), phrase.word(2)) {
        ("CREATE", "OR", "ALTER") => phrase.word(3),
        ("CREATE" | "ALTER", object, _) => object,
        _ => return false,
    };
    matches!(
        object,
        "PROC" | "PROCEDURE" | "FUNCTION" | "TRIGGER" | "VIEW"
    )
}

/// Node kind for a token saved as a plain leaf.
fn leaf_kind(kind: TokenKind) -> NodeKind {
    match kind {
        TokenKind::WhiteSpace => NodeKind::WhiteSpace,
        TokenKind::SingleLineComment => NodeKind::SingleLineComment,
        TokenKind::SingleLineCommentCStyle => NodeKind::SingleLineCommentCStyle,
        TokenKind::MultiLineComment => NodeKind::MultiLineComment,
        TokenKind::String => NodeKind::String,
        TokenKind::NationalString => NodeKind::NationalString,
        TokenKind::QuotedString => NodeKind::QuotedString,
        TokenKind::BracketQuotedName => NodeKind::BracketQuotedName,
        TokenKind::Comma => NodeKind::Comma,
        TokenKind::Period => NodeKind::Period,
        TokenKind::Semicolon => NodeKind::Semicolon,
        TokenKind::Asterisk => NodeKind::Asterisk,
        TokenKind::EqualsSign => NodeKind::EqualsSign,
        TokenKind::OtherOperator => NodeKind::OtherOperator,
        TokenKind::Number => NodeKind::Number,
        TokenKind::BinaryValue => NodeKind::BinaryValue,
        TokenKind::MonetaryValue => NodeKind::MonetaryValue,
        TokenKind::PseudoName => NodeKind::PseudoName,
        TokenKind::OtherNode
        | TokenKind::OpenParens
        | TokenKind::CloseParens
        | TokenKind::Colon => NodeKind::Other,
    }
}

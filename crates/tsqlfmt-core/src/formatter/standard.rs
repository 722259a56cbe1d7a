//! Rule-driven formatter.

use tracing::debug;

use super::identity::{self, bracket_quote, quote};
use super::state::{FormattingState, SpecialRegion};
use super::{DEFAULT_ERROR_OUTPUT_PREFIX, FormatError, FormatOptions, Result, TreeFormatter};
use crate::keywords::standard_keyword;
use crate::lexer::contains_line_break;
use crate::tree::{Attribute, NodeId, NodeKind, SqlTree};

/// Re-renders a tree with canonical whitespace, indentation and keyword
/// case, as configured by [`FormatOptions`].
///
/// Each call to [`format_tree`](TreeFormatter::format_tree) uses its own
/// rendering state, so one formatter can be shared between threads.
#[derive(Debug, Clone)]
pub struct StandardFormatter {
    options: FormatOptions,
    error_output_prefix: String,
}

impl Default for StandardFormatter {
    fn default() -> Self {
        Self::new(FormatOptions::default())
    }
}

impl StandardFormatter {
    #[must_use]
    pub fn new(options: FormatOptions) -> Self {
        Self {
            options,
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

    #[must_use]
    pub const fn options(&self) -> &FormatOptions {
        &self.options
    }
}

impl TreeFormatter for StandardFormatter {
    fn format_tree(&self, tree: &SqlTree) -> Result<String> {
        let mut state = FormattingState::new(&self.options);
        if tree.has_error() && !self.error_output_prefix.is_empty() {
            state.add_output_content(&self.error_output_prefix);
            state.add_output_line_break();
        }

        let renderer = Renderer {
            options: &self.options,
            tree,
        };
        renderer.process_children(tree.root(), &mut state)?;
        state.break_as_expected();

        if let Some((region, start)) = state.special_region.take() {
            debug!(?region, "special region still open at end of input");
            state.add_verbatim(&identity::render_between(tree, start, None));
        }
        Ok(state.into_output())
    }
}

/// One rendering pass over a tree.
struct Renderer<'a> {
    options: &'a FormatOptions,
    tree: &'a SqlTree,
}

impl Renderer<'_> {
    fn process_list(
        &self,
        nodes: impl IntoIterator<Item = NodeId>,
        state: &mut FormattingState<'_>,
    ) -> Result<()> {
        for node in nodes {
            self.process_node(node, state)?;
        }
        Ok(())
    }

    fn process_children(&self, id: NodeId, state: &mut FormattingState<'_>) -> Result<()> {
        self.process_list(self.tree.children(id).iter().copied(), state)
    }

    fn process_children_of_kind(
        &self,
        id: NodeId,
        kind: NodeKind,
        state: &mut FormattingState<'_>,
    ) -> Result<()> {
        self.process_list(self.tree.children_of_kind(id, kind), state)
    }

    #[allow(clippy::too_many_lines)]
    fn process_node(&self, id: NodeId, state: &mut FormattingState<'_>) -> Result<()> {
        use NodeKind::{ContainerClose, ContainerContentBody, ContainerOpen};

        let tree = self.tree;
        let text = tree.text(id);

        match tree.kind(id) {
            NodeKind::Root => self.process_children(id, state)?,

            NodeKind::Statement => {
                self.separate_statements(id, state);
                state.reset_keywords();
                self.process_children(id, state)?;
                state.statement_break_expected = true;
            }

            NodeKind::Clause => {
                state.unindent_initial_break = true;
                self.process_children(id, state.increment_indent())?;
                state.decrement_indent();
                if self.options.new_clause_line_breaks > 0 {
                    state.break_expected = true;
                }
                if self.options.new_clause_line_breaks > 1 {
                    state.additional_breaks_expected = self.options.new_clause_line_breaks - 1;
                }
            }

            NodeKind::SetOperatorClause => {
                state.decrement_indent();
                // the break the clause asked for, plus a blank line
                state.break_to_next_line();
                state.break_to_next_line();
                self.process_children(id, state.increment_indent())?;
                state.break_expected = true;
                state.additional_breaks_expected = 1;
            }

            NodeKind::BatchSeparator => {
                state.break_to_next_line();
                self.process_children(id, state)?;
                state.break_expected = true;
            }

            NodeKind::DdlProceduralBlock
            | NodeKind::DdlOtherBlock
            | NodeKind::DdlDeclareBlock
            | NodeKind::CursorDeclaration
            | NodeKind::BeginTransaction
            | NodeKind::SaveTransaction
            | NodeKind::CommitTransaction
            | NodeKind::RollbackTransaction
            | NodeKind::ContainerOpen
            | NodeKind::ContainerClose
            | NodeKind::ContainerContentBody
            | NodeKind::WhileLoop
            | NodeKind::IfStatement
            | NodeKind::CteWithClause
            | NodeKind::PermissionsBlock
            | NodeKind::PermissionsDetail
            | NodeKind::MergeClause
            | NodeKind::MergeTarget => self.process_children(id, state)?,

            NodeKind::SelectionTarget => {
                state.break_expected = true;
                self.process_children(id, state)?;
            }

            NodeKind::CaseInput
            | NodeKind::BooleanExpression
            | NodeKind::LowerBound
            | NodeKind::UpperBound => {
                if tree.has_content(id) {
                    state.separate_words();
                }
                self.process_children(id, state)?;
            }

            NodeKind::ContainerSingleStatementBody
            | NodeKind::ContainerMultiStatementBody
            | NodeKind::MergeAction => self.process_statement_body(id, state)?,

            NodeKind::PermissionsTarget
            | NodeKind::PermissionsRecipient
            | NodeKind::DdlWithClause
            | NodeKind::MergeCondition
            | NodeKind::MergeThen => {
                state.break_expected = true;
                state.unindent_initial_break = true;
                self.process_children(id, state.increment_indent())?;
                state.decrement_indent();
            }

            NodeKind::JoinTarget => {
                // the join keyword hangs one level out, on its own line
                state.break_expected = true;
                state.unindent_initial_break = true;
                self.process_children(id, state)?;
            }

            NodeKind::JoinOn => {
                if self.options.break_join_on_sections {
                    state.break_expected = true;
                }
                self.process_children_of_kind(id, ContainerOpen, state)?;
                self.process_children_of_kind(id, ContainerContentBody, state)?;
            }

            NodeKind::CteAlias => {
                state.unindent_initial_break = true;
                self.process_children(id, state)?;
            }

            NodeKind::ElseClause => {
                self.process_children_of_kind(id, ContainerOpen, state.decrement_indent())?;
                self.process_children_of_kind(
                    id,
                    NodeKind::ContainerSingleStatementBody,
                    state.increment_indent(),
                )?;
            }

            NodeKind::DdlAsBlock | NodeKind::CursorForBlock => {
                state.break_expected = true;
                self.process_children_of_kind(id, ContainerOpen, state.decrement_indent())?;
                state.break_expected = true;
                self.process_children_of_kind(id, ContainerContentBody, state)?;
                state.increment_indent();
            }

            NodeKind::TriggerCondition => {
                state.decrement_indent();
                state.break_to_next_line();
                self.process_children(id, state.increment_indent())?;
            }

            NodeKind::CursorForOptions | NodeKind::CteAsBlock => {
                state.break_expected = true;
                self.process_children_of_kind(id, ContainerOpen, state.decrement_indent())?;
                self.process_children_of_kind(id, ContainerContentBody, state.increment_indent())?;
            }

            NodeKind::DdlReturns | NodeKind::MergeUsing | NodeKind::MergeWhen => {
                state.break_expected = true;
                state.unindent_initial_break = true;
                self.process_children(id, state)?;
            }

            NodeKind::Between => {
                self.process_children_of_kind(id, ContainerOpen, state)?;
                state.increment_indent();
                self.process_children_of_kind(
                    id,
                    NodeKind::LowerBound,
                    state.increment_indent(),
                )?;
                if self.options.expand_between_conditions {
                    state.break_expected = true;
                }
                self.process_children_of_kind(id, ContainerClose, state.decrement_indent())?;
                self.process_children_of_kind(
                    id,
                    NodeKind::UpperBound,
                    state.increment_indent(),
                )?;
                state.decrement_indent();
                state.decrement_indent();
            }

            NodeKind::DdlDetailParens | NodeKind::FunctionParens => {
                // tight parens: no space before, wrap only when forced
                state.word_separator_expected = false;
                state.break_as_expected();
                state.add_output_content("(");
                self.process_children(id, state.increment_indent())?;
                state.decrement_indent();
                state.break_as_expected();
                state.add_output_content(")");
                state.word_separator_expected = true;
            }

            NodeKind::DdlParens
            | NodeKind::ExpressionParens
            | NodeKind::SelectionTargetParens
            | NodeKind::InParens => self.process_isolated_parens(id, state)?,

            NodeKind::BeginEndBlock | NodeKind::TryBlock | NodeKind::CatchBlock => {
                let sole_statement = self.is_sole_statement_content(id);
                if sole_statement {
                    state.decrement_indent();
                }
                self.process_children_of_kind(id, ContainerOpen, state)?;
                self.process_children_of_kind(id, NodeKind::ContainerMultiStatementBody, state)?;
                state.decrement_indent();
                state.break_expected = true;
                self.process_children_of_kind(id, ContainerClose, state)?;
                state.increment_indent();
                if sole_statement {
                    state.increment_indent();
                }
            }

            NodeKind::CaseStatement => {
                self.process_children_of_kind(id, ContainerOpen, state)?;
                state.increment_indent();
                self.process_children_of_kind(id, NodeKind::CaseInput, state)?;
                self.process_children_of_kind(id, NodeKind::CaseWhen, state)?;
                self.process_children_of_kind(id, NodeKind::CaseElse, state)?;
                if self.options.expand_case_statements {
                    state.break_expected = true;
                }
                self.process_children_of_kind(id, ContainerClose, state)?;
                state.decrement_indent();
            }

            NodeKind::CaseWhen | NodeKind::CaseThen | NodeKind::CaseElse => {
                if self.options.expand_case_statements {
                    state.break_expected = true;
                }
                self.process_children_of_kind(id, ContainerOpen, state)?;
                self.process_children_of_kind(id, ContainerContentBody, state.increment_indent())?;
                self.process_children_of_kind(id, NodeKind::CaseThen, state)?;
                state.decrement_indent();
            }

            kind @ (NodeKind::And | NodeKind::Or) => {
                if self.options.expand_boolean_expressions {
                    state.break_expected = true;
                }
                let keyword = tree.child_of_kind(id, NodeKind::OtherKeyword).ok_or(
                    FormatError::MissingChild {
                        container: kind,
                        expected: NodeKind::OtherKeyword,
                    },
                )?;
                self.process_node(keyword, state)?;
            }

            NodeKind::MultiLineComment => {
                let comment = format!("/*{text}*/");
                if self.close_special_region(id, state) {
                    state.add_verbatim(&comment);
                } else {
                    state.separate_comment();
                    state.add_output_content(&comment);
                }
                let in_statement = tree
                    .parent(id)
                    .is_some_and(|parent| tree.kind(parent) == NodeKind::Statement);
                let followed_by_break = tree.next_sibling(id).is_some_and(|next| {
                    tree.kind(next) == NodeKind::WhiteSpace && contains_line_break(tree.text(next))
                });
                if in_statement || followed_by_break {
                    state.break_expected = true;
                } else {
                    state.word_separator_expected = true;
                }
                self.open_special_region(id, state);
            }

            kind @ (NodeKind::SingleLineComment | NodeKind::SingleLineCommentCStyle) => {
                let marker = if kind == NodeKind::SingleLineComment {
                    "--"
                } else {
                    "//"
                };
                let comment = format!("{marker}{}", text.replace(['\r', '\n'], ""));
                if self.close_special_region(id, state) {
                    state.add_verbatim(&comment);
                } else {
                    state.separate_comment();
                    state.add_output_content(&comment);
                }
                state.break_expected = true;
                state.source_break_pending = true;
                if self.open_special_region(id, state) {
                    // the region starts after the comment's own line break
                    state.add_verbatim("\n");
                }
            }

            NodeKind::String => self.write_word(&quote(text, "'", '\''), state),
            NodeKind::NationalString => self.write_word(&quote(text, "N'", '\''), state),
            NodeKind::QuotedString => self.write_word(&quote(text, "\"", '"'), state),
            NodeKind::BracketQuotedName => self.write_word(&bracket_quote(text), state),

            NodeKind::Comma => self.process_comma(id, state),

            NodeKind::Period | NodeKind::Semicolon | NodeKind::ScopeResolutionOperator => {
                state.word_separator_expected = false;
                state.break_as_expected();
                state.add_output_content(&self.format_operator(text));
            }

            NodeKind::Asterisk
            | NodeKind::EqualsSign
            | NodeKind::AlphaOperator
            | NodeKind::OtherOperator => self.write_word(&self.format_operator(text), state),

            NodeKind::CompoundKeyword => {
                let simple_text = tree.attribute(id, Attribute::SimpleText).ok_or(
                    FormatError::MissingAttribute {
                        node: NodeKind::CompoundKeyword,
                        attribute: Attribute::SimpleText,
                    },
                )?;
                state.separate_words();
                state.set_recent_keyword(simple_text);
                state.add_output_content(&self.format_keyword(simple_text));
                state.word_separator_expected = true;
                let comments = tree
                    .children(id)
                    .iter()
                    .copied()
                    .filter(|&child| tree.kind(child).is_comment());
                self.process_list(comments, state.increment_indent())?;
                state.decrement_indent();
                state.word_separator_expected = true;
            }

            NodeKind::OtherKeyword | NodeKind::DataTypeKeyword => {
                state.separate_words();
                state.set_recent_keyword(text);
                state.add_output_content(&self.format_keyword(text));
                if text.eq_ignore_ascii_case("SELECT") || text.eq_ignore_ascii_case("WHERE") {
                    state.break_expected = true;
                } else {
                    state.word_separator_expected = true;
                }
            }

            NodeKind::PseudoName => self.write_word(&self.format_keyword(text), state),

            NodeKind::FunctionKeyword => {
                state.separate_words();
                state.set_recent_keyword(text);
                state.add_output_content(text);
                state.word_separator_expected = true;
            }

            NodeKind::Other => {
                let is_name = text.chars().next().is_some_and(char::is_alphabetic);
                if self.options.wrap_names_in_brackets && is_name {
                    self.write_word(&bracket_quote(text), state);
                } else {
                    self.write_word(text, state);
                }
            }

            NodeKind::MonetaryValue | NodeKind::Label => self.write_word(text, state),

            NodeKind::Number => self.write_word(&text.to_lowercase(), state),

            NodeKind::BinaryValue => {
                let digits = text.get(2..).unwrap_or_default();
                self.write_word(&format!("0x{}", digits.to_uppercase()), state);
            }

            NodeKind::WhiteSpace => {
                if contains_line_break(text) {
                    state.source_break_pending = true;
                }
            }
        }
        Ok(())
    }

    /// Writes a word-like piece of content with the usual spacing.
    fn write_word(&self, content: &str, state: &mut FormattingState<'_>) {
        state.separate_words();
        state.add_output_content(content);
        state.word_separator_expected = true;
    }

    fn process_statement_body(&self, id: NodeId, state: &mut FormattingState<'_>) -> Result<()> {
        // ELSE IF stays on one line and does not nest
        let else_if = self
            .tree
            .parent(id)
            .is_some_and(|parent| self.tree.kind(parent) == NodeKind::ElseClause)
            && self.contains_if_statement(id);

        if else_if {
            state.decrement_indent();
        } else {
            state.break_expected = true;
        }
        self.process_children(id, state)?;
        if else_if {
            state.increment_indent();
        }

        // the enclosing statement decides what follows the body
        state.statement_break_expected = false;
        state.unindent_initial_break = false;
        Ok(())
    }

    fn contains_if_statement(&self, body: NodeId) -> bool {
        let tree = self.tree;
        tree.children_of_kind(body, NodeKind::Statement).any(|statement| {
            tree.children_of_kind(statement, NodeKind::Clause)
                .any(|clause| tree.child_of_kind(clause, NodeKind::IfStatement).is_some())
        })
    }

    /// True for a block that is the whole statement of an IF/WHILE/ELSE
    /// body.
    fn is_sole_statement_content(&self, id: NodeId) -> bool {
        self.tree.ancestor_is(id, 1, NodeKind::Clause)
            && self.tree.ancestor_is(id, 2, NodeKind::Statement)
            && self
                .tree
                .ancestor_is(id, 3, NodeKind::ContainerSingleStatementBody)
    }

    /// Renders parenthesized content in isolation, then puts the parens on
    /// their own lines if the content spans several lines.
    fn process_isolated_parens(&self, id: NodeId, state: &mut FormattingState<'_>) -> Result<()> {
        let indented = matches!(
            self.tree.kind(id),
            NodeKind::ExpressionParens | NodeKind::InParens
        );

        state.separate_words();
        if indented {
            state.increment_indent();
        }
        state.add_output_content("(");

        // continues the parent's line so width checks see the real column
        let mut inner = state.child();
        self.process_children(id, &mut inner)?;
        if inner.break_expected || inner.output_contains_line_break() {
            if !inner.starts_with_break() {
                state.break_to_next_line();
            }
            state.assimilate(inner);
            state.break_to_next_line();
        } else {
            state.assimilate(inner);
        }

        state.add_output_content(")");
        if indented {
            state.decrement_indent();
        }
        state.word_separator_expected = true;
        Ok(())
    }

    fn process_comma(&self, id: NodeId, state: &mut FormattingState<'_>) {
        let parent = self.tree.parent(id).map(|parent| self.tree.kind(parent));
        let expand = (self.options.expand_comma_lists
            && !matches!(
                parent,
                Some(NodeKind::DdlDetailParens | NodeKind::FunctionParens | NodeKind::InParens)
            ))
            || (self.options.expand_in_lists && parent == Some(NodeKind::InParens));

        if self.options.trailing_commas {
            state.break_as_expected();
            state.add_output_content(",");
            if expand {
                state.break_expected = true;
            } else {
                state.word_separator_expected = true;
            }
        } else if expand {
            state.break_to_next_line();
            state.add_output_content(",");
            if self.options.space_after_expanded_comma {
                state.word_separator_expected = true;
            }
        } else {
            state.break_as_expected();
            state.add_output_content(",");
            state.word_separator_expected = true;
        }
    }

    /// Writes the line breaks between two statements. Runs of `SET`,
    /// `DECLARE` or `PRINT` statements are only separated like clauses.
    fn separate_statements(&self, id: NodeId, state: &mut FormattingState<'_>) {
        if !state.statement_break_expected {
            return;
        }

        let starter = self
            .tree
            .first_semantic_element(id)
            .filter(|&first| self.tree.kind(first) == NodeKind::OtherKeyword)
            .map(|first| self.tree.text(first).to_uppercase());
        let repeats_previous = starter.is_some_and(|keyword| {
            matches!(keyword.as_str(), "SET" | "DECLARE" | "PRINT")
                && state.recent_keyword() == Some(keyword.as_str())
        });

        let breaks = if repeats_previous {
            self.options.new_clause_line_breaks
        } else {
            self.options.new_statement_line_breaks
        };
        for _ in 0..breaks {
            state.add_output_line_break();
        }
        state.indent(state.indent_level);

        state.break_expected = false;
        state.additional_breaks_expected = 0;
        state.source_break_pending = false;
        state.statement_break_expected = false;
        state.word_separator_expected = false;
    }

    /// Ends the active special region if this comment closes it, writing the
    /// region's source text verbatim. Returns true if it did.
    fn close_special_region(&self, id: NodeId, state: &mut FormattingState<'_>) -> bool {
        let Some((region, start)) = state.special_region else {
            return false;
        };
        if !region.is_closed_by(self.tree.text(id)) {
            return false;
        }

        state.special_region = None;
        debug!(?region, "closing special region");
        state.add_verbatim(&identity::render_between(self.tree, start, Some(id)));
        state.break_expected = false;
        state.additional_breaks_expected = 0;
        state.word_separator_expected = false;
        state.source_break_pending = false;
        true
    }

    /// Starts a special region if this comment opens one. Returns true if it
    /// did.
    fn open_special_region(&self, id: NodeId, state: &mut FormattingState<'_>) -> bool {
        if state.in_special_region() {
            return false;
        }
        let Some(region) = SpecialRegion::opened_by(self.tree.text(id)) else {
            return false;
        };
        debug!(?region, "opening special region");
        state.special_region = Some((region, id));
        true
    }

    fn format_keyword(&self, keyword: &str) -> String {
        let standard = if self.options.keyword_standardization {
            standard_keyword(&keyword.to_uppercase())
        } else {
            None
        };
        let keyword = standard.unwrap_or(keyword);
        if self.options.uppercase_keywords {
            keyword.to_uppercase()
        } else {
            keyword.to_lowercase()
        }
    }

    fn format_operator(&self, operator: &str) -> String {
        if self.options.uppercase_keywords {
            operator.to_uppercase()
        } else {
            operator.to_lowercase()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::parse;

    fn format_with(input: &str, options: FormatOptions) -> String {
        let tokens = Lexer::new(input).tokenize();
        let tree = parse(&tokens).unwrap();
        StandardFormatter::new(options).format_tree(&tree).unwrap()
    }

    fn format(input: &str) -> String {
        format_with(input, FormatOptions::default())
    }

    #[test]
    fn test_simple_select() {
        assert_eq!(
            format("select a,b from t where a=1"),
            "SELECT\n\ta\n\t,b\nFROM\n\tt\nWHERE\n\ta = 1\n"
        );
    }

    #[test]
    fn test_trailing_commas() {
        let options = FormatOptions {
            trailing_commas: true,
            ..FormatOptions::default()
        };
        assert_eq!(
            format_with("select a, b from t", options),
            "SELECT\n\ta,\n\tb\nFROM\n\tt\n"
        );
    }

    #[test]
    fn test_function_arguments_stay_inline() {
        assert_eq!(
            format("select coalesce(a,b) from t"),
            "SELECT\n\tcoalesce(a, b)\nFROM\n\tt\n"
        );
    }

    #[test]
    fn test_lowercase_keywords() {
        let options = FormatOptions {
            uppercase_keywords: false,
            ..FormatOptions::default()
        };
        assert_eq!(
            format_with("SELECT X FROM T", options),
            "select\n\tX\nfrom\n\tT\n"
        );
    }

    #[test]
    fn test_keyword_standardization() {
        let options = FormatOptions {
            keyword_standardization: true,
            ..FormatOptions::default()
        };
        let output = format_with("select * from a left outer join b on a.x = b.x", options);
        assert!(output.contains("\nLEFT JOIN b ON a.x = b.x"), "{output}");
    }

    #[test]
    fn test_join_hangs_out() {
        let output = format("select * from a inner join b on a.x = b.x and a.y = b.y");
        assert_eq!(
            output,
            "SELECT\n\t*\nFROM\n\ta\nINNER JOIN b ON a.x = b.x\n\tAND a.y = b.y\n"
        );
    }

    #[test]
    fn test_break_join_on_sections() {
        let options = FormatOptions {
            break_join_on_sections: true,
            ..FormatOptions::default()
        };
        let output = format_with("select * from a join b on a.x = b.x", options);
        assert!(output.ends_with("JOIN b\n\tON a.x = b.x\n"), "{output}");
    }

    #[test]
    fn test_statements_are_separated() {
        assert_eq!(
            format("select 1 select 2"),
            "SELECT\n\t1\n\nSELECT\n\t2\n"
        );
    }

    #[test]
    fn test_consecutive_set_statements_stay_together() {
        assert_eq!(
            format("set @a = 1 set @b = 2"),
            "SET @a = 1\nSET @b = 2\n"
        );
    }

    #[test]
    fn test_consecutive_declare_and_print_statements_stay_together() {
        let output = format("declare @a int\ndeclare @b int\nprint @a\nprint @b");
        assert!(!output.contains("\n\nDECLARE @b"), "{output}");
        assert!(output.contains("\n\nPRINT @a"), "{output}");
        assert!(output.contains("PRINT @a\nPRINT @b\n"), "{output}");
    }

    #[test]
    fn test_else_if_chain_does_not_nest() {
        let output = format("if @a = 1 select 1 else if @a = 2 select 2 else select 3");
        assert!(output.contains("\nELSE IF @a = 2\n"), "{output}");
        assert!(!output.contains("\tIF"), "{output}");
        assert_eq!(output.lines().filter(|line| line.starts_with("ELSE")).count(), 2);
    }

    #[test]
    fn test_if_else() {
        assert_eq!(
            format("if @a = 1 print 'x' else print 'y'"),
            "IF @a = 1\n\tPRINT 'x'\nELSE\n\tPRINT 'y'\n"
        );
    }

    #[test]
    fn test_begin_end_block() {
        assert_eq!(
            format("if @a = 1 begin print 'x' end"),
            "IF @a = 1\nBEGIN\n\tPRINT 'x'\nEND\n"
        );
    }

    #[test]
    fn test_case_expansion() {
        assert_eq!(
            format("select case when a = 1 then 'x' else 'y' end from t"),
            "SELECT\n\tCASE\n\t\tWHEN a = 1\n\t\t\tTHEN 'x'\n\t\tELSE 'y'\n\t\tEND\nFROM\n\tt\n"
        );
    }

    #[test]
    fn test_in_list_expansion() {
        let output = format("select a from t where a in (1,2)");
        assert!(output.contains("IN (\n"), "{output}");
        assert!(output.contains("\n\t\t,2"), "{output}");

        let options = FormatOptions {
            expand_in_lists: false,
            ..FormatOptions::default()
        };
        let output = format_with("select a from t where a in (1,2)", options);
        assert!(output.contains("a IN (1, 2)"), "{output}");
    }

    #[test]
    fn test_between_expansion() {
        let output = format("select a from t where a between 1 and 2");
        assert!(output.contains("a BETWEEN 1\n\t\tAND 2"), "{output}");

        let options = FormatOptions {
            expand_between_conditions: false,
            ..FormatOptions::default()
        };
        let output = format_with("select a from t where a between 1 and 2", options);
        assert!(output.contains("a BETWEEN 1 AND 2"), "{output}");
    }

    #[test]
    fn test_comments_keep_their_lines() {
        assert_eq!(
            format("select a -- first\n, b /* second */ from t"),
            "SELECT\n\ta -- first\n\t,b /* second */\nFROM\n\tt\n"
        );
    }

    #[test]
    fn test_noformat_region() {
        let input = "select 1\n/*[noformat]*/select   x,y   from t/*[/noformat]*/\nselect 2";
        let output = format(input);
        assert!(
            output.contains("/*[noformat]*/select   x,y   from t/*[/noformat]*/"),
            "{output}"
        );
    }

    #[test]
    fn test_closed_minify_region_is_verbatim() {
        let input = "select 1\n/*[minify]*/ select   a ,\n b from t /*[/minify]*/\nselect   2";
        let output = format(input);
        assert!(
            output.contains("/*[minify]*/ select   a ,\n b from t /*[/minify]*/"),
            "{output}"
        );
        assert!(output.trim_end().ends_with("SELECT\n\t2"), "{output}");
    }

    #[test]
    fn test_unclosed_region_runs_to_end() {
        let output = format("select 1 --[minify]\nselect   2");
        assert!(output.ends_with("--[minify]\nselect   2"), "{output}");
    }

    #[test]
    fn test_error_prefix() {
        let tokens = Lexer::new("select 'oops").tokenize();
        let tree = parse(&tokens).unwrap();
        let output = StandardFormatter::default()
            .with_error_output_prefix("--broken")
            .format_tree(&tree)
            .unwrap();
        assert!(output.starts_with("--broken\nSELECT"), "{output}");

        let output = StandardFormatter::default()
            .with_error_output_prefix("")
            .format_tree(&tree)
            .unwrap();
        assert!(output.starts_with("SELECT"), "{output}");
    }

    #[test]
    fn test_max_line_width() {
        let options = FormatOptions {
            max_line_width: 20,
            expand_comma_lists: false,
            ..FormatOptions::default()
        };
        let output = format_with("select aaaaaa, bbbbbb, cccccc, dddddd from t", options);
        for line in output.lines() {
            assert!(line.replace('\t', "    ").len() <= 20, "{output}");
        }
    }

    #[test]
    fn test_and_without_keyword_is_an_error() {
        let mut tree = SqlTree::new();
        let statement = tree.append(tree.root(), NodeKind::Statement, "");
        let clause = tree.append(statement, NodeKind::Clause, "");
        tree.append(clause, NodeKind::And, "");
        let error = StandardFormatter::default().format_tree(&tree).unwrap_err();
        assert_eq!(
            error,
            FormatError::MissingChild {
                container: NodeKind::And,
                expected: NodeKind::OtherKeyword,
            }
        );
    }
}

//! Grammar tags for structural tree nodes.

use std::fmt;

use serde::Serialize;

/// The grammar role of a node.
///
/// This is a closed set: the parser only produces these tags and the
/// formatters match on them exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    // Document structure
    Root,
    Statement,
    Clause,
    SetOperatorClause,
    BatchSeparator,

    // Generic container parts
    ContainerOpen,
    ContainerMultiStatementBody,
    ContainerSingleStatementBody,
    ContainerContentBody,
    ContainerClose,

    // Blocks
    BeginEndBlock,
    TryBlock,
    CatchBlock,
    BeginTransaction,
    CommitTransaction,
    RollbackTransaction,
    SaveTransaction,

    // CASE
    CaseStatement,
    CaseInput,
    CaseWhen,
    CaseThen,
    CaseElse,

    // Control flow
    IfStatement,
    ElseClause,
    BooleanExpression,
    WhileLoop,

    // Cursors and CTEs
    CursorDeclaration,
    CursorForBlock,
    CursorForOptions,
    CteWithClause,
    CteAlias,
    CteAsBlock,

    // DDL
    DdlDeclareBlock,
    DdlProceduralBlock,
    DdlOtherBlock,
    DdlAsBlock,
    DdlParens,
    DdlReturns,
    DdlDetailParens,
    DdlWithClause,
    TriggerCondition,

    // Permissions
    PermissionsBlock,
    PermissionsDetail,
    PermissionsTarget,
    PermissionsRecipient,

    // MERGE
    MergeClause,
    MergeTarget,
    MergeUsing,
    MergeCondition,
    MergeWhen,
    MergeThen,
    MergeAction,

    // Selection and joins
    SelectionTarget,
    SelectionTargetParens,
    JoinTarget,
    JoinOn,

    // Expressions
    ExpressionParens,
    FunctionParens,
    InParens,
    And,
    Or,
    Between,
    LowerBound,
    UpperBound,

    // Keywords
    FunctionKeyword,
    DataTypeKeyword,
    CompoundKeyword,
    OtherKeyword,
    Label,
    PseudoName,

    // Leaves
    WhiteSpace,
    Other,
    SingleLineComment,
    SingleLineCommentCStyle,
    MultiLineComment,
    String,
    NationalString,
    QuotedString,
    BracketQuotedName,
    Comma,
    Period,
    Semicolon,
    ScopeResolutionOperator,
    Asterisk,
    EqualsSign,
    AlphaOperator,
    OtherOperator,
    Number,
    MonetaryValue,
    BinaryValue,
}

impl NodeKind {
    /// Returns the stable snake_case name of this tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Statement => "statement",
            Self::Clause => "clause",
            Self::SetOperatorClause => "set_operator_clause",
            Self::BatchSeparator => "batch_separator",
            Self::ContainerOpen => "container_open",
            Self::ContainerMultiStatementBody => "container_multi_statement_body",
            Self::ContainerSingleStatementBody => "container_single_statement_body",
            Self::ContainerContentBody => "container_content_body",
            Self::ContainerClose => "container_close",
            Self::BeginEndBlock => "begin_end_block",
            Self::TryBlock => "try_block",
            Self::CatchBlock => "catch_block",
            Self::BeginTransaction => "begin_transaction",
            Self::CommitTransaction => "commit_transaction",
            Self::RollbackTransaction => "rollback_transaction",
            Self::SaveTransaction => "save_transaction",
            Self::CaseStatement => "case_statement",
            Self::CaseInput => "case_input",
            Self::CaseWhen => "case_when",
            Self::CaseThen => "case_then",
            Self::CaseElse => "case_else",
            Self::IfStatement => "if_statement",
            Self::ElseClause => "else_clause",
            Self::BooleanExpression => "boolean_expression",
            Self::WhileLoop => "while_loop",
            Self::CursorDeclaration => "cursor_declaration",
            Self::CursorForBlock => "cursor_for_block",
            Self::CursorForOptions => "cursor_for_options",
            Self::CteWithClause => "cte_with_clause",
            Self::CteAlias => "cte_alias",
            Self::CteAsBlock => "cte_as_block",
            Self::DdlDeclareBlock => "ddl_declare_block",
            Self::DdlProceduralBlock => "ddl_procedural_block",
            Self::DdlOtherBlock => "ddl_other_block",
            Self::DdlAsBlock => "ddl_as_block",
            Self::DdlParens => "ddl_parens",
            Self::DdlReturns => "ddl_returns",
            Self::DdlDetailParens => "ddl_detail_parens",
            Self::DdlWithClause => "ddl_with_clause",
            Self::TriggerCondition => "trigger_condition",
            Self::PermissionsBlock => "permissions_block",
            Self::PermissionsDetail => "permissions_detail",
            Self::PermissionsTarget => "permissions_target",
            Self::PermissionsRecipient => "permissions_recipient",
            Self::MergeClause => "merge_clause",
            Self::MergeTarget => "merge_target",
            Self::MergeUsing => "merge_using",
            Self::MergeCondition => "merge_condition",
            Self::MergeWhen => "merge_when",
            Self::MergeThen => "merge_then",
            Self::MergeAction => "merge_action",
            Self::SelectionTarget => "selection_target",
            Self::SelectionTargetParens => "selection_target_parens",
            Self::JoinTarget => "join_target",
            Self::JoinOn => "join_on",
            Self::ExpressionParens => "expression_parens",
            Self::FunctionParens => "function_parens",
            Self::InParens => "in_parens",
            Self::And => "and",
            Self::Or => "or",
            Self::Between => "between",
            Self::LowerBound => "lower_bound",
            Self::UpperBound => "upper_bound",
            Self::FunctionKeyword => "function_keyword",
            Self::DataTypeKeyword => "data_type_keyword",
            Self::CompoundKeyword => "compound_keyword",
            Self::OtherKeyword => "other_keyword",
            Self::Label => "label",
            Self::PseudoName => "pseudo_name",
            Self::WhiteSpace => "white_space",
            Self::Other => "other",
            Self::SingleLineComment => "single_line_comment",
            Self::SingleLineCommentCStyle => "single_line_comment_c_style",
            Self::MultiLineComment => "multi_line_comment",
            Self::String => "string",
            Self::NationalString => "national_string",
            Self::QuotedString => "quoted_string",
            Self::BracketQuotedName => "bracket_quoted_name",
            Self::Comma => "comma",
            Self::Period => "period",
            Self::Semicolon => "semicolon",
            Self::ScopeResolutionOperator => "scope_resolution_operator",
            Self::Asterisk => "asterisk",
            Self::EqualsSign => "equals_sign",
            Self::AlphaOperator => "alpha_operator",
            Self::OtherOperator => "other_operator",
            Self::Number => "number",
            Self::MonetaryValue => "monetary_value",
            Self::BinaryValue => "binary_value",
        }
    }

    /// Returns true for comment leaves of any style.
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

    /// Returns true for the parenthesis group variants.
    #[must_use]
    pub const fn is_parens(self) -> bool {
        matches!(
            self,
            Self::ExpressionParens
                | Self::FunctionParens
                | Self::InParens
                | Self::DdlParens
                | Self::DdlDetailParens
                | Self::SelectionTargetParens
        )
    }

    /// Returns true for containers that may open a statement without being
    /// its semantic first element.
    #[must_use]
    pub const fn is_non_semantic_wrapper(self) -> bool {
        matches!(
            self,
            Self::Clause | Self::DdlProceduralBlock | Self::DdlOtherBlock | Self::DdlDeclareBlock
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attribute keys carried by nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    /// Set to `"1"` on the root once any error recovery happened.
    ErrorFound,
    /// Set to `"1"` on the container where recovery happened.
    HasError,
    /// Normalized text of a compound keyword (`INNER JOIN`).
    SimpleText,
}

impl Attribute {
    /// Returns the stable snake_case name of this attribute.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ErrorFound => "error_found",
            Self::HasError => "has_error",
            Self::SimpleText => "simple_text",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_match_serde() {
        for kind in [
            NodeKind::Root,
            NodeKind::ContainerSingleStatementBody,
            NodeKind::SingleLineCommentCStyle,
            NodeKind::DdlDetailParens,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
        let json = serde_json::to_string(&Attribute::SimpleText).unwrap();
        assert_eq!(json, "\"simple_text\"");
    }

    #[test]
    fn test_classification() {
        assert!(NodeKind::MultiLineComment.is_comment());
        assert!(NodeKind::WhiteSpace.is_non_content());
        assert!(!NodeKind::Other.is_non_content());
        assert!(NodeKind::InParens.is_parens());
        assert!(!NodeKind::JoinOn.is_parens());
        assert!(NodeKind::Clause.is_non_semantic_wrapper());
    }
}

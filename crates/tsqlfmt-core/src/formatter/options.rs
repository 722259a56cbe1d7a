//! Style options for the standard formatter.

use serde::{Deserialize, Serialize};

/// Style settings for [`StandardFormatter`](super::StandardFormatter).
///
/// Every field has a default, so a configuration file only needs to name the
/// settings it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatOptions {
    /// One level of indentation.
    pub indent_string: String,
    /// Width of a tab character when measuring lines.
    pub spaces_per_tab: usize,
    /// Lines are broken before content that would make them wider than this.
    pub max_line_width: usize,
    /// Line breaks between statements.
    pub new_statement_line_breaks: usize,
    /// Line breaks between clauses of a statement.
    pub new_clause_line_breaks: usize,
    /// Put commas at the end of lines rather than the start.
    pub trailing_commas: bool,
    /// Add a space after a comma that starts a line.
    pub space_after_expanded_comma: bool,
    pub expand_between_conditions: bool,
    pub expand_boolean_expressions: bool,
    pub expand_case_statements: bool,
    /// Put each element of a comma-separated list on its own line.
    pub expand_comma_lists: bool,
    /// Put each element of an `IN (...)` list on its own line.
    pub expand_in_lists: bool,
    /// Start `ON` on its own line after a join target.
    pub break_join_on_sections: bool,
    /// Upper-case keywords; lower-case them otherwise.
    pub uppercase_keywords: bool,
    /// Replace keyword synonyms with their preferred spelling (`PROC` becomes
    /// `PROCEDURE`).
    pub keyword_standardization: bool,
    /// Wrap bare names in square brackets.
    pub wrap_names_in_brackets: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            indent_string: "\t".to_string(),
            spaces_per_tab: 4,
            max_line_width: 999,
            new_statement_line_breaks: 2,
            new_clause_line_breaks: 1,
            trailing_commas: false,
            space_after_expanded_comma: false,
            expand_between_conditions: true,
            expand_boolean_expressions: true,
            expand_case_statements: true,
            expand_comma_lists: true,
            expand_in_lists: true,
            break_join_on_sections: false,
            uppercase_keywords: true,
            keyword_standardization: false,
            wrap_names_in_brackets: false,
        }
    }
}

impl FormatOptions {
    /// Display width of one indent level, counting tabs as
    /// [`spaces_per_tab`](Self::spaces_per_tab) columns.
    #[must_use]
    pub fn indent_width(&self) -> usize {
        self.indent_string
            .chars()
            .map(|c| if c == '\t' { self.spaces_per_tab } else { 1 })
            .sum()
    }
}

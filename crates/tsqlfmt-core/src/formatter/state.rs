//! Output buffer and deferred-whitespace state of the standard formatter.

use std::collections::BTreeMap;

use crate::lexer::contains_line_break;
use crate::tree::NodeId;

use super::FormatOptions;

/// Kind of verbatim passthrough region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SpecialRegion {
    NoFormat,
    Minify,
}

impl SpecialRegion {
    /// Detects an opening marker in a comment body.
    pub(crate) fn opened_by(comment: &str) -> Option<Self> {
        let upper = comment.to_uppercase();
        if upper.contains("[NOFORMAT]") {
            Some(Self::NoFormat)
        } else if upper.contains("[MINIFY]") {
            Some(Self::Minify)
        } else {
            None
        }
    }

    /// True if the comment body carries this region's closing marker.
    pub(crate) fn is_closed_by(self, comment: &str) -> bool {
        let marker = match self {
            Self::NoFormat => "[/NOFORMAT]",
            Self::Minify => "[/MINIFY]",
        };
        comment.to_uppercase().contains(marker)
    }
}

/// Rendering state threaded through the standard formatter.
///
/// Whitespace is mostly requested through flags and resolved right before
/// the next piece of content is written. While a special region is active
/// nothing is written, but indentation and flags keep being tracked.
#[derive(Debug)]
pub(crate) struct FormattingState<'o> {
    options: &'o FormatOptions,
    indent_width: usize,
    output: String,

    pub(crate) indent_level: i32,
    pub(crate) statement_break_expected: bool,
    pub(crate) break_expected: bool,
    pub(crate) additional_breaks_expected: usize,
    pub(crate) word_separator_expected: bool,
    pub(crate) source_break_pending: bool,
    pub(crate) unindent_initial_break: bool,

    current_line_length: usize,
    current_line_has_content: bool,

    /// Active passthrough region and the comment that opened it.
    pub(crate) special_region: Option<(SpecialRegion, NodeId)>,

    recent_keywords: BTreeMap<i32, String>,
}

impl<'o> FormattingState<'o> {
    pub(crate) fn new(options: &'o FormatOptions) -> Self {
        Self {
            options,
            indent_width: options.indent_width(),
            output: String::new(),
            indent_level: 0,
            statement_break_expected: false,
            break_expected: false,
            additional_breaks_expected: 0,
            word_separator_expected: false,
            source_break_pending: false,
            unindent_initial_break: false,
            current_line_length: 0,
            current_line_has_content: false,
            special_region: None,
            recent_keywords: BTreeMap::new(),
        }
    }

    /// An isolated state for rendering parenthesized content, continuing the
    /// current line and indentation with an empty buffer and fresh flags.
    pub(crate) fn child(&self) -> Self {
        Self {
            indent_level: self.indent_level,
            current_line_length: self.current_line_length,
            current_line_has_content: self.current_line_has_content,
            special_region: self.special_region,
            ..Self::new(self.options)
        }
    }

    /// Appends the output of a child state and continues from where the
    /// child left off.
    pub(crate) fn assimilate(&mut self, child: Self) {
        self.output.push_str(&child.output);
        self.current_line_length = child.current_line_length;
        self.current_line_has_content = child.current_line_has_content;
        self.special_region = child.special_region;
    }

    pub(crate) const fn in_special_region(&self) -> bool {
        self.special_region.is_some()
    }

    /// Writes content, first breaking the line if the content would not fit.
    pub(crate) fn add_output_content(&mut self, content: &str) {
        if self.in_special_region() {
            return;
        }
        let width = content.chars().count();
        if self.current_line_has_content
            && self.current_line_length + width > self.options.max_line_width
        {
            self.break_to_next_line();
        }
        self.output.push_str(content);
        self.current_line_has_content = true;
        self.current_line_length += width;
    }

    /// Writes text exactly as given, with no wrapping.
    pub(crate) fn add_verbatim(&mut self, text: &str) {
        self.output.push_str(text);
        match text.rfind(['\r', '\n']) {
            Some(position) => {
                let last_line = &text[position + 1..];
                self.current_line_length = last_line.chars().count();
                self.current_line_has_content = !last_line.trim().is_empty();
            }
            None if !text.trim().is_empty() => {
                self.current_line_length += text.chars().count();
                self.current_line_has_content = true;
            }
            None => {}
        }
    }

    pub(crate) fn add_output_line_break(&mut self) {
        if !self.in_special_region() {
            self.output.push('\n');
        }
        self.current_line_length = 0;
        self.current_line_has_content = false;
    }

    pub(crate) fn add_output_space(&mut self) {
        if !self.in_special_region() {
            self.output.push(' ');
            self.current_line_length += 1;
        }
    }

    /// Writes `level` indent units without marking the line as having
    /// content.
    pub(crate) fn indent(&mut self, level: i32) {
        for _ in 0..level.max(0) {
            if !self.in_special_region() {
                self.output.push_str(&self.options.indent_string);
            }
            self.current_line_length += self.indent_width;
        }
    }

    /// Starts a new line at the current indentation, consuming any pending
    /// break or separator request.
    pub(crate) fn break_to_next_line(&mut self) {
        self.add_output_line_break();
        self.indent(self.indent_level);
        self.break_expected = false;
        self.source_break_pending = false;
        self.word_separator_expected = false;
    }

    /// Resolves the pending break requests, if any.
    pub(crate) fn break_as_expected(&mut self) {
        if self.break_expected {
            self.break_to_next_line();
        }
        while self.additional_breaks_expected > 0 {
            self.break_to_next_line();
            self.additional_breaks_expected -= 1;
        }
    }

    /// Resolves pending whitespace before a word: a break if one was
    /// requested, otherwise a space if one was requested.
    pub(crate) fn separate_words(&mut self) {
        if self.break_expected || self.additional_breaks_expected > 0 {
            let unindent = self.unindent_initial_break;
            if unindent {
                self.decrement_indent();
            }
            self.break_as_expected();
            if unindent {
                self.increment_indent();
            }
        } else if self.word_separator_expected {
            self.add_output_space();
        }
        self.unindent_initial_break = false;
        self.source_break_pending = false;
        self.word_separator_expected = false;
    }

    /// Resolves pending whitespace before a comment: a comment that was on
    /// its own line in the source stays on its own line.
    pub(crate) fn separate_comment(&mut self) {
        if self.current_line_has_content && self.source_break_pending {
            self.break_expected = true;
            self.break_as_expected();
        } else if self.word_separator_expected {
            self.add_output_space();
        }
        self.source_break_pending = false;
        self.word_separator_expected = false;
    }

    pub(crate) fn increment_indent(&mut self) -> &mut Self {
        self.indent_level += 1;
        self
    }

    pub(crate) fn decrement_indent(&mut self) -> &mut Self {
        self.indent_level -= 1;
        self
    }

    /// Records the first keyword seen at the current indent level.
    pub(crate) fn set_recent_keyword(&mut self, keyword: &str) {
        self.recent_keywords
            .entry(self.indent_level)
            .or_insert_with(|| keyword.to_uppercase());
    }

    /// The keyword recorded at the shallowest level at or below the current
    /// one.
    pub(crate) fn recent_keyword(&self) -> Option<&str> {
        self.recent_keywords
            .range(self.indent_level..)
            .next()
            .map(|(_, keyword)| keyword.as_str())
    }

    /// Forgets keywords recorded at the current level and deeper.
    pub(crate) fn reset_keywords(&mut self) {
        let level = self.indent_level;
        self.recent_keywords.retain(|&recorded, _| recorded < level);
    }

    pub(crate) fn output_contains_line_break(&self) -> bool {
        contains_line_break(&self.output)
    }

    /// True if the output starts with a line break, ignoring leading
    /// whitespace.
    pub(crate) fn starts_with_break(&self) -> bool {
        self.output
            .trim_start_matches([' ', '\t'])
            .starts_with(['\r', '\n'])
    }

    pub(crate) fn into_output(self) -> String {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn narrow_options() -> FormatOptions {
        FormatOptions {
            max_line_width: 10,
            indent_string: "  ".to_string(),
            ..FormatOptions::default()
        }
    }

    #[test]
    fn test_break_is_deferred_until_content() {
        let options = FormatOptions::default();
        let mut state = FormattingState::new(&options);
        state.add_output_content("SELECT");
        state.break_expected = true;
        state.increment_indent();
        assert_eq!(state.output, "SELECT");

        state.separate_words();
        state.add_output_content("a");
        assert_eq!(state.into_output(), "SELECT\n\ta");
    }

    #[test]
    fn test_unindented_initial_break() {
        let options = FormatOptions::default();
        let mut state = FormattingState::new(&options);
        state.add_output_content("x");
        state.indent_level = 2;
        state.break_expected = true;
        state.unindent_initial_break = true;
        state.separate_words();
        assert_eq!(state.indent_level, 2);
        assert!(!state.unindent_initial_break);
        assert_eq!(state.into_output(), "x\n\t");
    }

    #[test]
    fn test_width_forces_break() {
        let options = narrow_options();
        let mut state = FormattingState::new(&options);
        state.increment_indent();
        state.add_output_content("abcdef");
        state.add_output_space();
        state.add_output_content("ghijk");
        assert_eq!(state.into_output(), "abcdef \n  ghijk");
    }

    #[test]
    fn test_special_region_suppresses_output() {
        let options = FormatOptions::default();
        let mut state = FormattingState::new(&options);
        state.special_region = Some((SpecialRegion::NoFormat, NodeId::new(1)));
        state.add_output_content("hidden");
        state.break_to_next_line();
        state.special_region = None;
        state.add_verbatim("shown\n  x");
        assert_eq!(state.current_line_length, 3);
        assert_eq!(state.into_output(), "shown\n  x");
    }

    #[test]
    fn test_child_state_assimilation() {
        let options = FormatOptions::default();
        let mut parent = FormattingState::new(&options);
        parent.add_output_content("abc(");
        let mut child = parent.child();
        assert!(child.current_line_has_content);
        child.add_output_content("1");
        assert!(!child.output_contains_line_break());
        parent.assimilate(child);
        parent.add_output_content(")");
        assert_eq!(parent.current_line_length, 6);
        assert_eq!(parent.into_output(), "abc(1)");
    }

    #[test]
    fn test_starts_with_break() {
        let options = FormatOptions::default();
        let mut state = FormattingState::new(&options);
        state.break_to_next_line();
        assert!(state.starts_with_break());
        let mut state = FormattingState::new(&options);
        state.add_output_content("a");
        assert!(!state.starts_with_break());
    }

    #[test]
    fn test_recent_keywords_by_level() {
        let options = FormatOptions::default();
        let mut state = FormattingState::new(&options);
        state.increment_indent();
        state.set_recent_keyword("set");
        state.set_recent_keyword("select");
        assert_eq!(state.recent_keyword(), Some("SET"));

        state.decrement_indent();
        assert_eq!(state.recent_keyword(), Some("SET"));
        state.reset_keywords();
        assert_eq!(state.recent_keyword(), None);
    }

    #[test]
    fn test_region_markers() {
        assert_eq!(
            SpecialRegion::opened_by(" [NoFormat] "),
            Some(SpecialRegion::NoFormat)
        );
        assert_eq!(SpecialRegion::opened_by("[minify]"), Some(SpecialRegion::Minify));
        assert_eq!(SpecialRegion::opened_by("plain"), None);
        assert!(SpecialRegion::NoFormat.is_closed_by("[/noformat]"));
        assert!(!SpecialRegion::Minify.is_closed_by("[/noformat]"));
    }
}

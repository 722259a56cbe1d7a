//! Formatting options from a TOML file and command-line overrides.

use std::path::Path;

use clap::Args;
use tracing::debug;
use tsqlfmt_core::FormatOptions;

use crate::error::{CliError, Result};

/// Style options given on the command line. Each one overrides the config
/// file, which overrides the built-in defaults.
#[derive(Debug, Clone, Default, Args)]
pub struct StyleArgs {
    /// One level of indentation (`\t` stands for a tab).
    #[arg(long, value_name = "STRING")]
    pub indent_string: Option<String>,

    /// Width of a tab when measuring lines.
    #[arg(long, value_name = "N")]
    pub spaces_per_tab: Option<usize>,

    /// Maximum line width before content is wrapped.
    #[arg(long, value_name = "N")]
    pub max_line_width: Option<usize>,

    /// Line breaks between statements.
    #[arg(long, value_name = "N")]
    pub statement_breaks: Option<usize>,

    /// Line breaks between clauses.
    #[arg(long, value_name = "N")]
    pub clause_breaks: Option<usize>,

    /// Put commas at the end of lines.
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub trailing_commas: Option<bool>,

    /// Add a space after a comma that starts a line.
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub space_after_expanded_comma: Option<bool>,

    /// Put the AND of BETWEEN conditions on its own line.
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub expand_between_conditions: Option<bool>,

    /// Start each AND/OR on its own line.
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub expand_boolean_expressions: Option<bool>,

    /// Put CASE branches on their own lines.
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub expand_case_statements: Option<bool>,

    /// Put each element of a comma-separated list on its own line.
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub expand_comma_lists: Option<bool>,

    /// Put each element of an IN list on its own line.
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub expand_in_lists: Option<bool>,

    /// Start ON on its own line after a join target.
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub break_join_on_sections: Option<bool>,

    /// Upper-case keywords (lower-case them with `=false`).
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub uppercase_keywords: Option<bool>,

    /// Replace keyword synonyms with their preferred spelling.
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub standardize_keywords: Option<bool>,

    /// Wrap bare names in square brackets.
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub wrap_names_in_brackets: Option<bool>,
}

impl StyleArgs {
    /// Overwrites the options that were given on the command line.
    pub fn apply(&self, options: &mut FormatOptions) {
        if let Some(indent) = &self.indent_string {
            options.indent_string = indent.replace("\\t", "\t");
        }
        set(&mut options.spaces_per_tab, self.spaces_per_tab);
        set(&mut options.max_line_width, self.max_line_width);
        set(&mut options.new_statement_line_breaks, self.statement_breaks);
        set(&mut options.new_clause_line_breaks, self.clause_breaks);
        set(&mut options.trailing_commas, self.trailing_commas);
        set(
            &mut options.space_after_expanded_comma,
            self.space_after_expanded_comma,
        );
        set(
            &mut options.expand_between_conditions,
            self.expand_between_conditions,
        );
        set(
            &mut options.expand_boolean_expressions,
            self.expand_boolean_expressions,
        );
        set(&mut options.expand_case_statements, self.expand_case_statements);
        set(&mut options.expand_comma_lists, self.expand_comma_lists);
        set(&mut options.expand_in_lists, self.expand_in_lists);
        set(&mut options.break_join_on_sections, self.break_join_on_sections);
        set(&mut options.uppercase_keywords, self.uppercase_keywords);
        set(&mut options.keyword_standardization, self.standardize_keywords);
        set(&mut options.wrap_names_in_brackets, self.wrap_names_in_brackets);
    }
}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

/// Reads formatting options from a TOML file. Settings the file does not
/// name keep their defaults.
pub fn load_options(path: &Path) -> Result<FormatOptions> {
    let content = std::fs::read_to_string(path).map_err(|source| CliError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    let options = toml::from_str(&content).map_err(|source| CliError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "loaded config file");
    Ok(options)
}

/// Builds the effective options: defaults, then the config file if any,
/// then command-line overrides.
pub fn resolve_options(config: Option<&Path>, overrides: &StyleArgs) -> Result<FormatOptions> {
    let mut options = match config {
        Some(path) => load_options(path)?,
        None => FormatOptions::default(),
    };
    overrides.apply(&mut options);
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("tsqlfmt.toml");
        std::fs::write(
            &config_path,
            r#"
indent_string = "  "
max_line_width = 80
trailing_commas = true
"#,
        )
        .unwrap();

        let options = load_options(&config_path).unwrap();
        assert_eq!(options.indent_string, "  ");
        assert_eq!(options.max_line_width, 80);
        assert!(options.trailing_commas);
        assert!(options.uppercase_keywords);
    }

    #[test]
    fn test_invalid_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bad.toml");
        std::fs::write(&config_path, "max_line_width = \"wide\"").unwrap();

        let error = load_options(&config_path).unwrap_err();
        assert!(matches!(error, CliError::ConfigParse { .. }));
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn test_missing_config() {
        let error = load_options(Path::new("/nonexistent/tsqlfmt.toml")).unwrap_err();
        assert!(matches!(error, CliError::ConfigRead { .. }));
    }

    #[test]
    fn test_overrides_win_over_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("tsqlfmt.toml");
        std::fs::write(&config_path, "uppercase_keywords = false\nmax_line_width = 80\n").unwrap();

        let overrides = StyleArgs {
            indent_string: Some("\\t\\t".to_string()),
            max_line_width: Some(120),
            trailing_commas: Some(true),
            ..StyleArgs::default()
        };
        let options = resolve_options(Some(&config_path), &overrides).unwrap();
        assert_eq!(options.indent_string, "\t\t");
        assert_eq!(options.max_line_width, 120);
        assert!(options.trailing_commas);
        assert!(!options.uppercase_keywords);
    }
}

//! Formatting standard input or a set of files.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};
use tsqlfmt_core::{FormatOptions, FormattingManager, StandardFormatter};

use crate::discover::find_files;
use crate::error::{CliError, Result};

/// How results are written and which files are considered.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Extensions of the files to format, in `.sql` form.
    pub extensions: Vec<String>,
    /// Search directories recursively.
    pub recursive: bool,
    /// Copy each file to `<file>.bak` before overwriting it.
    pub backups: bool,
    /// Write results here instead of in place: a directory mirrors the input
    /// layout, anything else is a single file receiving all results.
    pub output: Option<PathBuf>,
    /// Write results even if parsing needed error recovery.
    pub allow_parsing_errors: bool,
    /// Print the parsed tree as JSON instead of formatting.
    pub dump_tree: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            extensions: vec![".sql".to_string()],
            recursive: false,
            backups: false,
            output: None,
            allow_parsing_errors: false,
            dump_tree: false,
        }
    }
}

/// Counts from a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub files_found: usize,
    pub files_written: usize,
    /// Files or inputs skipped or only partly handled.
    pub warnings: usize,
}

impl Report {
    /// Process exit code for a run that completed.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        if self.warnings > 0 { 5 } else { 0 }
    }
}

/// Where results go.
enum Target {
    InPlace,
    Mirror { from: PathBuf, to: PathBuf },
    Single(BufWriter<File>),
}

/// Formats input according to [`RunSettings`].
pub struct Runner {
    manager: FormattingManager<StandardFormatter>,
    settings: RunSettings,
}

impl Runner {
    #[must_use]
    pub fn new(options: FormatOptions, settings: RunSettings) -> Self {
        Self {
            manager: FormattingManager::new(StandardFormatter::new(options)),
            settings,
        }
    }

    /// Formats SQL text, writing the result to the output file if one was
    /// configured and to `out` otherwise.
    pub fn run_text(&self, input: &str, out: &mut impl Write) -> Result<Report> {
        let mut report = Report::default();

        if self.settings.dump_tree {
            dump_tree(input, out)?;
            return Ok(report);
        }

        let outcome = self.manager.format(input)?;
        if outcome.parse_error && !self.settings.allow_parsing_errors {
            warn!("Errors encountered while parsing STDIN, no output written");
            report.warnings += 1;
            return Ok(report);
        }

        match &self.settings.output {
            Some(path) => {
                std::fs::write(path, &outcome.text).map_err(|source| CliError::OutputCreate {
                    path: path.clone(),
                    source,
                })?;
                report.files_written += 1;
            }
            None => out.write_all(outcome.text.as_bytes())?,
        }
        Ok(report)
    }

    /// Formats the files selected by `input`.
    pub fn run_files(&self, input: &Path, out: &mut impl Write) -> Result<Report> {
        let set = find_files(input, &self.settings.extensions, self.settings.recursive)?;
        if set.files.is_empty() {
            return Err(CliError::NoFilesFound(input.to_path_buf()));
        }

        let mut report = Report {
            files_found: set.files.len(),
            ..Report::default()
        };

        if self.settings.dump_tree {
            for file in &set.files {
                match std::fs::read_to_string(file) {
                    Ok(content) => dump_tree(&content, out)?,
                    Err(e) => {
                        error!("{}: {e}", file.display());
                        report.warnings += 1;
                    }
                }
            }
            return Ok(report);
        }

        let mut target = self.open_target(&set.base_dir)?;
        for file in &set.files {
            self.format_file(file, &mut target, &mut report);
        }
        if let Target::Single(writer) = &mut target {
            writer.flush()?;
        }

        info!(
            "Formatted {} of {} files",
            report.files_written, report.files_found
        );
        Ok(report)
    }

    fn open_target(&self, base_dir: &Path) -> Result<Target> {
        let Some(output) = &self.settings.output else {
            return Ok(Target::InPlace);
        };
        if output.is_dir() {
            return Ok(Target::Mirror {
                from: base_dir.to_path_buf(),
                to: output.clone(),
            });
        }
        let file = File::create(output).map_err(|source| CliError::OutputCreate {
            path: output.clone(),
            source,
        })?;
        Ok(Target::Single(BufWriter::new(file)))
    }

    fn format_file(&self, file: &Path, target: &mut Target, report: &mut Report) {
        let old_content = match std::fs::read_to_string(file) {
            Ok(content) => content,
            Err(e) => {
                error!("{}: {e}", file.display());
                report.warnings += 1;
                return;
            }
        };
        if old_content.is_empty() {
            debug!(file = %file.display(), "skipping empty file");
            return;
        }

        let outcome = match self.manager.format(&old_content) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("{}: {e}", file.display());
                report.warnings += 1;
                return;
            }
        };
        if outcome.parse_error && !self.settings.allow_parsing_errors {
            warn!("{}: errors encountered while parsing, file skipped", file.display());
            report.warnings += 1;
            return;
        }

        let written = match target {
            Target::InPlace => {
                if outcome.text == old_content {
                    debug!(file = %file.display(), "already formatted");
                    return;
                }
                if self.settings.backups && !backup(file, report) {
                    return;
                }
                write_file(file, &outcome.text, report)
            }
            Target::Mirror { from, to } => {
                let relative = file.strip_prefix(from.as_path()).unwrap_or(file);
                write_file(&to.join(relative), &outcome.text, report)
            }
            Target::Single(writer) => append_batch(writer, &outcome.text, report),
        };
        if written {
            debug!(file = %file.display(), "formatted");
            report.files_written += 1;
        }
    }
}

fn dump_tree(input: &str, out: &mut impl Write) -> Result<()> {
    let tree = FormattingManager::<StandardFormatter>::parse(input)?;
    serde_json::to_writer_pretty(&mut *out, &tree)?;
    writeln!(out)?;
    Ok(())
}

fn backup(file: &Path, report: &mut Report) -> bool {
    let mut backup = file.as_os_str().to_owned();
    backup.push(".bak");
    match std::fs::copy(file, &backup) {
        Ok(_) => true,
        Err(e) => {
            error!("{}: backup failed: {e}", file.display());
            report.warnings += 1;
            false
        }
    }
}

fn write_file(path: &Path, content: &str, report: &mut Report) -> bool {
    let written = path
        .parent()
        .map_or(Ok(()), std::fs::create_dir_all)
        .and_then(|()| std::fs::write(path, content));
    match written {
        Ok(()) => true,
        Err(e) => {
            error!("{}: {e}", path.display());
            report.warnings += 1;
            false
        }
    }
}

/// Appends one file's result to a combined output, as its own batch.
fn append_batch(writer: &mut impl Write, content: &str, report: &mut Report) -> bool {
    let separator = if content.ends_with('\n') { "GO\n" } else { "\nGO\n" };
    match writer
        .write_all(content.as_bytes())
        .and_then(|()| writer.write_all(separator.as_bytes()))
    {
        Ok(()) => true,
        Err(e) => {
            error!("Writing combined output failed: {e}");
            report.warnings += 1;
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const UNFORMATTED: &str = "select a,b from t";
    const FORMATTED: &str = "SELECT\n\ta\n\t,b\nFROM\n\tt\n";

    fn runner(settings: RunSettings) -> Runner {
        Runner::new(FormatOptions::default(), settings)
    }

    #[test]
    fn test_text_to_stdout() {
        let mut out = Vec::new();
        let report = runner(RunSettings::default())
            .run_text(UNFORMATTED, &mut out)
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), FORMATTED);
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_text_with_parse_error() {
        let mut out = Vec::new();
        let report = runner(RunSettings::default())
            .run_text("select 'open", &mut out)
            .unwrap();
        assert!(out.is_empty());
        assert_eq!(report.exit_code(), 5);

        let settings = RunSettings {
            allow_parsing_errors: true,
            ..RunSettings::default()
        };
        let report = runner(settings).run_text("select 'open", &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().starts_with("--WARNING!"));
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_files_in_place_with_backups() {
        let temp_dir = TempDir::new().unwrap();
        let changed = temp_dir.path().join("changed.sql");
        let unchanged = temp_dir.path().join("unchanged.sql");
        std::fs::write(&changed, UNFORMATTED).unwrap();
        std::fs::write(&unchanged, FORMATTED).unwrap();

        let settings = RunSettings {
            backups: true,
            ..RunSettings::default()
        };
        let report = runner(settings)
            .run_files(temp_dir.path(), &mut Vec::new())
            .unwrap();

        assert_eq!(report.files_found, 2);
        assert_eq!(report.files_written, 1);
        assert_eq!(std::fs::read_to_string(&changed).unwrap(), FORMATTED);
        assert_eq!(
            std::fs::read_to_string(temp_dir.path().join("changed.sql.bak")).unwrap(),
            UNFORMATTED
        );
        assert!(!temp_dir.path().join("unchanged.sql.bak").exists());
    }

    #[test]
    fn test_parse_errors_leave_file_alone() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("broken.sql");
        std::fs::write(&file, "select 'open").unwrap();

        let report = runner(RunSettings::default())
            .run_files(&file, &mut Vec::new())
            .unwrap();
        assert_eq!(report.files_written, 0);
        assert_eq!(report.exit_code(), 5);
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "select 'open");
    }

    #[test]
    fn test_mirror_output_directory() {
        let source = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        std::fs::create_dir(source.path().join("sub")).unwrap();
        std::fs::write(source.path().join("sub/q.sql"), UNFORMATTED).unwrap();

        let settings = RunSettings {
            recursive: true,
            output: Some(output.path().to_path_buf()),
            ..RunSettings::default()
        };
        let report = runner(settings)
            .run_files(source.path(), &mut Vec::new())
            .unwrap();

        assert_eq!(report.files_written, 1);
        assert_eq!(
            std::fs::read_to_string(output.path().join("sub/q.sql")).unwrap(),
            FORMATTED
        );
        assert_eq!(
            std::fs::read_to_string(source.path().join("sub/q.sql")).unwrap(),
            UNFORMATTED
        );
    }

    #[test]
    fn test_single_output_file() {
        let source = TempDir::new().unwrap();
        std::fs::write(source.path().join("a.sql"), "select 1").unwrap();
        std::fs::write(source.path().join("b.sql"), "select 2").unwrap();
        let combined = source.path().join("combined.out");

        let settings = RunSettings {
            output: Some(combined.clone()),
            ..RunSettings::default()
        };
        let report = runner(settings)
            .run_files(source.path(), &mut Vec::new())
            .unwrap();

        assert_eq!(report.files_written, 2);
        assert_eq!(
            std::fs::read_to_string(&combined).unwrap(),
            "SELECT\n\t1\nGO\nSELECT\n\t2\nGO\n"
        );
    }

    #[test]
    fn test_no_files_found() {
        let temp_dir = TempDir::new().unwrap();
        let error = runner(RunSettings::default())
            .run_files(temp_dir.path(), &mut Vec::new())
            .unwrap_err();
        assert!(matches!(error, CliError::NoFilesFound(_)));
        assert_eq!(error.exit_code(), 4);
    }

    #[test]
    fn test_dump_tree() {
        let settings = RunSettings {
            dump_tree: true,
            ..RunSettings::default()
        };
        let mut out = Vec::new();
        runner(settings).run_text("select 1", &mut out).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["name"], "root");
    }
}

//! Finding the files to format.

use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{CliError, Result};

/// Files selected by an input path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSet {
    /// Directory the search started from.
    pub base_dir: PathBuf,
    /// Matching files, sorted.
    pub files: Vec<PathBuf>,
}

/// Normalizes an extension to the `.sql` form.
#[must_use]
pub fn normalize_extension(extension: &str) -> String {
    if extension.starts_with('.') {
        extension.to_string()
    } else {
        format!(".{extension}")
    }
}

/// Finds the files an input path refers to.
///
/// The input is a file, a directory, or a file name pattern (`*` and `?`
/// wildcards) inside a directory. Directories are searched one level deep,
/// or all the way down with `recursive`. Only files whose extension is in
/// `extensions` are kept.
pub fn find_files(input: &Path, extensions: &[String], recursive: bool) -> Result<FileSet> {
    let (base_dir, pattern) = if input.is_dir() {
        (input.to_path_buf(), None)
    } else {
        let base = input
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let name = input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        (base, name.map(|name| name_pattern(&name)))
    };

    let metadata = std::fs::metadata(&base_dir).map_err(|source| CliError::Path {
        path: base_dir.clone(),
        source,
    })?;
    if !metadata.is_dir() {
        return Err(CliError::Path {
            path: base_dir,
            source: std::io::Error::new(std::io::ErrorKind::NotADirectory, "not a directory"),
        });
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();
    for entry in WalkDir::new(&base_dir).min_depth(1).max_depth(max_depth) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {e}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if pattern.as_ref().is_some_and(|pattern| !pattern.is_match(&name)) {
            continue;
        }
        if has_extension(entry.path(), extensions) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    debug!(base = %base_dir.display(), count = files.len(), "found files");

    Ok(FileSet { base_dir, files })
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(extension) = path.extension() else {
        return false;
    };
    let extension = format!(".{}", extension.to_string_lossy());
    extensions
        .iter()
        .any(|wanted| wanted.eq_ignore_ascii_case(&extension))
}

/// Compiles a file name with `*`/`?` wildcards into an anchored,
/// case-insensitive regex.
fn name_pattern(name: &str) -> Regex {
    let mut pattern = String::from("(?i)^");
    for c in name.chars() {
        match c {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            c => pattern.push_str(&regex::escape(&c.to_string())),
        }
    }
    pattern.push('$');
    Regex::new(&pattern).expect("Invalid file name pattern regex")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_tree() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        std::fs::create_dir(root.join("nested")).unwrap();
        for file in ["a.sql", "b.SQL", "c.txt", "nested/d.sql", "nested/e.prc"] {
            std::fs::write(root.join(file), "select 1").unwrap();
        }
        temp_dir
    }

    fn names(set: &FileSet) -> Vec<String> {
        set.files
            .iter()
            .map(|file| {
                file.strip_prefix(&set.base_dir)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension("sql"), ".sql");
        assert_eq!(normalize_extension(".prc"), ".prc");
    }

    #[test]
    fn test_directory_search() {
        let temp_dir = sample_tree();
        let sql = vec![".sql".to_string()];

        let set = find_files(temp_dir.path(), &sql, false).unwrap();
        assert_eq!(names(&set), vec!["a.sql", "b.SQL"]);

        let set = find_files(temp_dir.path(), &sql, true).unwrap();
        assert_eq!(names(&set), vec!["a.sql", "b.SQL", "nested/d.sql"]);
    }

    #[test]
    fn test_extensions() {
        let temp_dir = sample_tree();
        let extensions = vec![".prc".to_string(), ".txt".to_string()];
        let set = find_files(temp_dir.path(), &extensions, true).unwrap();
        assert_eq!(names(&set), vec!["c.txt", "nested/e.prc"]);
    }

    #[test]
    fn test_single_file_and_pattern() {
        let temp_dir = sample_tree();
        let sql = vec![".sql".to_string()];

        let set = find_files(&temp_dir.path().join("a.sql"), &sql, false).unwrap();
        assert_eq!(names(&set), vec!["a.sql"]);

        let set = find_files(&temp_dir.path().join("?.sql"), &sql, true).unwrap();
        assert_eq!(names(&set), vec!["a.sql", "b.SQL", "nested/d.sql"]);
    }

    #[test]
    fn test_missing_directory() {
        let error = find_files(Path::new("/nonexistent/dir/*.sql"), &[], false).unwrap_err();
        assert!(matches!(error, CliError::Path { .. }));
        assert_eq!(error.exit_code(), 2);
    }
}

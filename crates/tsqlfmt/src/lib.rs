//! Command-line front end for `tsqlfmt-core`.
//!
//! Formats SQL from standard input or from files found on disk, in place
//! or into an output directory or combined output file.
//!
//! # CLI Usage
//!
//! ```bash
//! # Format standard input to standard output
//! tsqlfmt < query.sql
//!
//! # Format every .sql file under a directory in place, keeping backups
//! tsqlfmt --recursive --backups scripts/
//!
//! # Lower-case keywords, two-space indent, trailing commas
//! tsqlfmt --uppercase-keywords=false --indent-string "  " --trailing-commas query.sql
//!
//! # Use a config file
//! tsqlfmt --config tsqlfmt.toml "scripts/*.sql"
//! ```
//!
//! # Exit codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Success |
//! | 1 | Usage or configuration error |
//! | 2 | Input path could not be searched |
//! | 3 | Output file could not be created |
//! | 4 | No files found |
//! | 5 | Completed with warnings (parse errors, unreadable or unwritable files) |

pub mod config;
pub mod discover;
pub mod error;
pub mod run;

pub use error::{CliError, Result};
pub use run::{Report, RunSettings, Runner};

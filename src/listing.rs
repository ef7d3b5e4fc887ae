//! Data file list builder.
//!
//! Scans a directory (or each of its immediate subdirectories) for files with
//! a given extension and writes their bare names to a text file.

use crate::error::ListError;
use serde::{Deserialize, Serialize};
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use walkdir::WalkDir;

/// What to write after each name in the list file.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Separator {
    /// Names back to back, the historical list format
    #[default]
    None,
    /// One name per line
    Newline,
}

impl Separator {
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            Separator::None => b"",
            Separator::Newline => b"\n",
        }
    }
}

/// Where and how to look for files.
#[derive(Debug, Clone)]
pub struct ListOptions {
    pub input: PathBuf,
    /// Suffix a file name must end with, e.g. `.root`
    pub extension: String,
    /// Scan each immediate subdirectory instead of `input` itself
    pub subdirs: bool,
    /// Log every directory that is scanned
    pub verbose: bool,
    /// Sort the result instead of keeping directory order
    pub sort: bool,
}

#[derive(Debug, Clone)]
pub struct ListArgs {
    pub options: ListOptions,
    pub output: PathBuf,
    pub separator: Separator,
}

/// Outcome of a list builder run.
#[derive(Debug, Clone)]
pub struct ListReport {
    pub files: Vec<OsString>,
    pub elapsed: Duration,
}

/// Collect the names of matching files.
///
/// In flat mode only `options.input` is scanned. With `subdirs` every
/// immediate child directory is scanned (one level, no deeper) and the names
/// are pooled; files directly inside `input` are not listed in that mode.
/// Names are returned as found on disk, including ones that are not UTF-8.
pub fn collect_files(options: &ListOptions) -> Result<Vec<OsString>, ListError> {
    validate_extension(&options.extension)?;
    let input = &options.input;

    match fs::metadata(input) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return Err(ListError::NotADirectory {
                path: input.clone(),
            })
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ListError::InputMissing {
                path: input.clone(),
            })
        }
        Err(source) => {
            return Err(ListError::ReadDirFailed {
                path: input.clone(),
                source,
            })
        }
    }

    // Files sit at depth 1 in flat mode and at depth 2 under subdirectories
    let file_depth = if options.subdirs { 2 } else { 1 };
    let suffix = options.extension.as_bytes();
    let mut names = Vec::new();

    let walker = WalkDir::new(input)
        .min_depth(1)
        .max_depth(file_depth)
        .follow_links(true);
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let dangling = err.depth() > 0
                    && err
                        .io_error()
                        .is_some_and(|e| e.kind() == std::io::ErrorKind::NotFound);
                if dangling {
                    tracing::warn!(path = ?err.path(), "Skipping dangling link");
                    continue;
                }
                let path = err.path().map_or_else(|| input.clone(), Path::to_path_buf);
                return Err(ListError::ReadDirFailed {
                    path,
                    source: err.into(),
                });
            }
        };

        let file_type = entry.file_type();
        if entry.depth() < file_depth {
            if file_type.is_dir() {
                if options.verbose {
                    tracing::info!("Searching for files in {}", entry.path().display());
                } else {
                    tracing::debug!("Searching for files in {}", entry.path().display());
                }
            }
            continue;
        }

        if file_type.is_file() && has_suffix(entry.file_name(), suffix) {
            names.push(entry.file_name().to_os_string());
        }
    }

    if options.sort {
        names.sort();
    }

    tracing::debug!(count = names.len(), input = %input.display(), "Collected files");
    Ok(names)
}

fn validate_extension(extension: &str) -> Result<(), ListError> {
    if extension.is_empty() || extension.contains(['/', '\\']) {
        return Err(ListError::InvalidExtension {
            extension: extension.to_string(),
        });
    }
    Ok(())
}

fn has_suffix(name: &OsStr, suffix: &[u8]) -> bool {
    name.as_encoded_bytes().ends_with(suffix)
}

/// Write `names` to `path`, each followed by `separator`.
///
/// Names are written byte for byte. The file is created (or truncated) even
/// when `names` is empty.
pub fn write_list<P, N>(path: P, names: &[N], separator: Separator) -> Result<(), ListError>
where
    P: AsRef<Path>,
    N: AsRef<OsStr>,
{
    let path = path.as_ref();
    let write_failed = |source| ListError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let file = fs::File::create(path).map_err(write_failed)?;
    let mut out = BufWriter::new(file);
    for name in names {
        out.write_all(name.as_ref().as_encoded_bytes())
            .map_err(write_failed)?;
        out.write_all(separator.as_bytes()).map_err(write_failed)?;
    }
    out.flush().map_err(write_failed)?;
    Ok(())
}

/// Scan, write the list and report how long it took.
pub fn run_list_builder(args: &ListArgs) -> Result<ListReport, ListError> {
    let start = Instant::now();
    tracing::info!(
        input = %args.options.input.display(),
        output = %args.output.display(),
        subdirs = args.options.subdirs,
        "Building file list"
    );

    let files = collect_files(&args.options)?;
    if files.is_empty() {
        tracing::warn!(
            "No '{}' files found in {}",
            args.options.extension,
            args.options.input.display()
        );
    }

    if args.separator == Separator::None && files.len() > 1 {
        tracing::warn!(
            count = files.len(),
            "File names are written without a separator and cannot be split reliably; \
             pass --separator newline for one name per line"
        );
    }
    write_list(&args.output, &files, args.separator)?;

    let elapsed = start.elapsed();
    tracing::info!(count = files.len(), ?elapsed, "File list written");

    Ok(ListReport { files, elapsed })
}

//! Bulk string replacement across generated Markdown files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use harvest_logging::harvest_warn;
use thiserror::Error;

use crate::persist::{AtomicFileWriter, PersistError};

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("{0:?} is not a directory")]
    NotADirectory(PathBuf),
    #[error("search string must not be empty")]
    EmptySource,
    #[error("io error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to rewrite {path:?}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: PersistError,
    },
}

/// `.md` files under `root`, at any depth, whose text contains `needle`.
/// Sorted by path; unreadable files are logged and left out.
pub fn find_markdown_containing(root: &Path, needle: &str) -> Result<Vec<PathBuf>, RewriteError> {
    if needle.is_empty() {
        return Err(RewriteError::EmptySource);
    }
    if !root.is_dir() {
        return Err(RewriteError::NotADirectory(root.to_path_buf()));
    }
    let mut matches = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = fs::read_dir(&dir).map_err(|source| RewriteError::Io {
            path: dir.clone(),
            source,
        })?;
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() && is_markdown(&path) {
                match fs::read_to_string(&path) {
                    Ok(text) if text.contains(needle) => matches.push(path),
                    Ok(_) => {}
                    Err(err) => harvest_warn!("Cannot read {:?}: {}", path, err),
                }
            }
        }
    }
    matches.sort();
    Ok(matches)
}

/// Replace every occurrence of `source` with `target` in `paths`.
/// Returns how many files changed.
pub fn replace_in_files(paths: &[PathBuf], source: &str, target: &str) -> Result<usize, RewriteError> {
    if source.is_empty() {
        return Err(RewriteError::EmptySource);
    }
    let mut changed = 0;
    for path in paths {
        let text = fs::read_to_string(path).map_err(|err| RewriteError::Io {
            path: path.clone(),
            source: err,
        })?;
        if !text.contains(source) {
            continue;
        }
        let (Some(dir), Some(name)) = (path.parent(), path.file_name()) else {
            continue;
        };
        AtomicFileWriter::new(dir.to_path_buf())
            .write(&name.to_string_lossy(), &text.replace(source, target))
            .map_err(|err| RewriteError::Persist {
                path: path.clone(),
                source: err,
            })?;
        changed += 1;
    }
    Ok(changed)
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
}

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use harvest_core::parse_url_list;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("failed to read ledger {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to append to ledger {path:?}: {source}")]
    Append {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Append-only set of URLs that were fully processed.
///
/// Entries are compared as exact strings. A file-backed ledger writes each new
/// entry as its own line as soon as it is recorded.
#[derive(Debug, Default)]
pub struct DedupLedger {
    seen: HashSet<String>,
    backing: Option<PathBuf>,
    needs_newline: bool,
}

impl DedupLedger {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn with_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            seen: entries.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Load `path`; a missing file is an empty ledger.
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
            Err(source) => {
                return Err(LedgerError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Ok(Self {
            seen: parse_url_list(&raw).into_iter().collect(),
            backing: Some(path.to_path_buf()),
            needs_newline: !raw.is_empty() && !raw.ends_with('\n'),
        })
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn path(&self) -> Option<&Path> {
        self.backing.as_deref()
    }

    /// Record `url`. Returns `false` when it was already present, in which
    /// case nothing is written.
    pub fn record(&mut self, url: &str) -> Result<bool, LedgerError> {
        if self.seen.contains(url) {
            return Ok(false);
        }
        if let Some(path) = &self.backing {
            let append = |source| LedgerError::Append {
                path: path.clone(),
                source,
            };
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(append)?;
            let line = if self.needs_newline {
                format!("\n{url}\n")
            } else {
                format!("{url}\n")
            };
            file.write_all(line.as_bytes()).map_err(append)?;
            file.flush().map_err(append)?;
            self.needs_newline = false;
        }
        self.seen.insert(url.to_string());
        Ok(true)
    }
}

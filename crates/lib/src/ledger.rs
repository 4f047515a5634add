//! Install ledger.
//!
//! `installed.txt` in the install root holds one `name:hash` line per
//! successful install, where `hash` is the CRC-32 of the package's source
//! URL in decimal. The file is only ever appended to; a purge of the install
//! root is the only way entries disappear. A package counts as installed
//! when a line matches both its name and the hash of its current URL, so
//! changing the URL triggers a rebuild.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum LedgerError {
  #[error("failed to read ledger '{path}': {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to append to ledger '{path}': {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// One ledger line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
  pub name: String,
  pub hash: u32,
}

impl LedgerEntry {
  fn parse(line: &str) -> Option<Self> {
    let (name, hash) = line.trim().rsplit_once(':')?;
    Some(Self {
      name: name.trim().to_string(),
      hash: hash.trim().parse().ok()?,
    })
  }
}

/// Hash of a source URL as stored in the ledger.
pub fn url_hash(url: &str) -> u32 {
  crc32fast::hash(url.as_bytes())
}

#[derive(Debug)]
pub struct InstallLedger {
  path: PathBuf,
  append_lock: Mutex<()>,
}

impl InstallLedger {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      append_lock: Mutex::new(()),
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// All well-formed entries, in file order. A missing ledger is empty.
  pub fn entries(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
    let content = match fs::read_to_string(&self.path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
      Err(source) => {
        return Err(LedgerError::Read {
          path: self.path.clone(),
          source,
        });
      }
    };

    Ok(
      content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
          let entry = LedgerEntry::parse(line);
          if entry.is_none() {
            debug!(line, "skipping malformed ledger line");
          }
          entry
        })
        .collect(),
    )
  }

  /// Whether `name` was installed from exactly `url`.
  pub fn is_installed(&self, name: &str, url: &str) -> Result<bool, LedgerError> {
    let hash = url_hash(url);
    Ok(self.entries()?.iter().any(|e| e.name == name && e.hash == hash))
  }

  /// Record a successful install. Only call this once the whole package
  /// pipeline, attribution included, has finished.
  pub fn commit(&self, name: &str, url: &str) -> Result<(), LedgerError> {
    let _guard = self.append_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let write_err = |source| LedgerError::Write {
      path: self.path.clone(),
      source,
    };

    if let Some(parent) = self.path.parent() {
      fs::create_dir_all(parent).map_err(write_err)?;
    }
    let mut file = OpenOptions::new()
      .create(true)
      .append(true)
      .open(&self.path)
      .map_err(write_err)?;
    writeln!(file, "{}:{}", name, url_hash(url)).map_err(write_err)?;
    file.flush().map_err(write_err)
  }
}

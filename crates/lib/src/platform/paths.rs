//! Directory layout of a run.
//!
//! Everything lives next to the descriptor files: the install root
//! (`third_party/`) and the download cache (`third_party_cache/`). The root is
//! taken from an explicit override, then `DEPFORGE_ROOT`, then the directory
//! holding the executable.

use std::io;
use std::path::{Path, PathBuf};

use crate::consts::{CACHE_DIR_ENV, CACHE_DIR_NAME, INSTALL_DIR_NAME, LEDGER_FILE, ROOT_ENV};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
  /// Directory holding `deps.txt` / `deps.json`.
  pub root: PathBuf,
  /// Shared install prefix (`include/`, `lib/`, `bin/`, `log/`, ledger).
  pub install_root: PathBuf,
  /// Persistent download cache, kept across purges.
  pub cache_dir: PathBuf,
}

impl Layout {
  /// Layout rooted at `root` with the default directory names.
  pub fn new(root: impl Into<PathBuf>) -> Self {
    let root = root.into();
    Self {
      install_root: root.join(INSTALL_DIR_NAME),
      cache_dir: root.join(CACHE_DIR_NAME),
      root,
    }
  }

  /// Resolve the layout from an optional override and the environment.
  pub fn resolve(root_override: Option<&Path>) -> io::Result<Self> {
    let root = match root_override {
      Some(root) => root.to_path_buf(),
      None => match std::env::var_os(ROOT_ENV) {
        Some(root) => PathBuf::from(root),
        None => executable_dir()?,
      },
    };
    let root = dunce::canonicalize(&root).unwrap_or(root);

    let mut layout = Self::new(root);
    if let Some(cache) = std::env::var_os(CACHE_DIR_ENV) {
      layout.cache_dir = PathBuf::from(cache);
    }
    Ok(layout)
  }

  pub fn include_dir(&self) -> PathBuf {
    self.install_root.join("include")
  }

  pub fn log_dir(&self) -> PathBuf {
    self.install_root.join("log")
  }

  pub fn ledger_path(&self) -> PathBuf {
    self.install_root.join(LEDGER_FILE)
  }
}

fn executable_dir() -> io::Result<PathBuf> {
  let exe = std::env::current_exe()?;
  let exe = dunce::canonicalize(&exe).unwrap_or(exe);
  exe
    .parent()
    .map(Path::to_path_buf)
    .ok_or_else(|| io::Error::other("executable has no parent directory"))
}

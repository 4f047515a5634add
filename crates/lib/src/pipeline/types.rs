//! Run options, reports and errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::attribution::{AttributionWarning, MergeError};
use crate::build::BuildError;
use crate::fetch::{FetchError, UnpackError};
use crate::install_lock::InstallLockError;
use crate::ledger::LedgerError;
use crate::package::{PackageKind, ValidationError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
  /// Rebuild packages even when the ledger says they are installed.
  pub force: bool,
  /// Delete the install root before processing. The download cache is kept.
  pub purge: bool,
  /// Only process the package with this name.
  pub package: Option<String>,
}

/// Why one package failed. Only that package is affected.
#[derive(Debug, Error)]
pub enum PackageError {
  #[error(transparent)]
  Fetch(#[from] FetchError),

  #[error(transparent)]
  Unpack(#[from] UnpackError),

  #[error(transparent)]
  Build(#[from] BuildError),

  #[error(transparent)]
  Ledger(#[from] LedgerError),

  #[error("failed to prepare '{path}': {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

#[derive(Debug)]
pub struct PackageFailure {
  pub name: String,
  pub error: PackageError,
}

/// Outcome of a whole run.
#[derive(Debug, Default)]
pub struct RunReport {
  /// Packages built and committed to the ledger, in processing order.
  pub installed: Vec<String>,
  /// Packages already in the ledger with the same source.
  pub skipped: Vec<String>,
  pub failed: Vec<PackageFailure>,
  pub warnings: Vec<AttributionWarning>,
  /// The regenerated attribution header.
  pub attribution: Option<PathBuf>,
}

impl RunReport {
  pub fn is_success(&self) -> bool {
    self.failed.is_empty()
  }

  pub fn failed_names(&self) -> Vec<&str> {
    self.failed.iter().map(|f| f.name.as_str()).collect()
  }
}

/// What a run would do with one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedPackage {
  pub name: String,
  pub kind: PackageKind,
  pub source_url: String,
  pub options: Vec<String>,
  /// The ledger holds this package with its current source.
  pub installed: bool,
  /// The source archive is already in the download cache.
  pub cached: bool,
}

/// Errors that stop a run before or after the per-package loop.
#[derive(Debug, Error)]
pub enum PipelineError {
  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error("package '{0}' is not declared in the descriptor list")]
  UnknownPackage(String),

  #[error("failed to purge '{path}': {source}")]
  Purge {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error(transparent)]
  Ledger(#[from] LedgerError),

  #[error(transparent)]
  Lock(#[from] InstallLockError),

  #[error(transparent)]
  Merge(#[from] MergeError),
}

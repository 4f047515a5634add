//! Build strategies.
//!
//! Every package kind maps to one strategy that turns an unpacked source tree
//! into files under the install root. Strategies locate their entry point
//! with [`search::find_shortest`] and reach external tools only through a
//! [`CommandRunner`], so they can be driven without real compilers.
//!
//! # Submodules
//!
//! - [`search`] - Shortest-match file search
//! - [`runner`] - Tool commands and the process-backed runner

mod bjam;
mod cmake;
mod configure;
mod header;
pub mod runner;
pub mod search;

pub use runner::{CommandError, CommandRunner, ProcessRunner, ToolCommand, default_jobs, log_file_name};
pub use search::{CaseMatch, SearchError, SearchQuery, find_shortest};

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::package::{KindSpec, PackageRecord};

#[derive(Debug, Error)]
pub enum BuildError {
  #[error("package '{name}' failed at {step}: {source}")]
  Search {
    name: String,
    step: &'static str,
    #[source]
    source: SearchError,
  },

  #[error("package '{name}' failed at {step}: {source}")]
  Command {
    name: String,
    step: &'static str,
    #[source]
    source: CommandError,
  },

  #[error("package '{name}' has option '{option}' with no value (expected 'KEY VALUE' or 'KEY=VALUE')")]
  InvalidOption { name: String, option: String },

  #[error("package '{name}' interface directory '{path}' does not exist")]
  MissingInterface { name: String, path: PathBuf },

  #[error("package '{name}' failed writing '{path}': {source}")]
  Io {
    name: String,
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Everything a strategy needs to build one package.
pub struct BuildContext<'a, R> {
  pub record: &'a PackageRecord,
  pub install_root: &'a Path,
  pub jobs: usize,
  pub runner: &'a R,
  /// Tool output for this build is appended here.
  pub log_file: PathBuf,
}

impl<R: CommandRunner> BuildContext<'_, R> {
  fn name(&self) -> String {
    self.record.name.clone()
  }

  fn prefix(&self) -> String {
    self.install_root.display().to_string()
  }

  fn find(&self, step: &'static str, query: &SearchQuery) -> Result<PathBuf, BuildError> {
    let found = find_shortest(&self.record.paths.unpack_dir, query).map_err(|source| BuildError::Search {
      name: self.name(),
      step,
      source,
    })?;
    info!(package = %self.record.name, path = %found.display(), "found {}", query.pattern);
    Ok(found)
  }

  async fn run(&self, step: &'static str, command: ToolCommand) -> Result<(), BuildError> {
    self
      .runner
      .run(&command, &self.log_file)
      .await
      .map_err(|source| BuildError::Command {
        name: self.name(),
        step,
        source,
      })
  }
}

/// Build and install one package with the strategy matching its kind.
pub async fn dispatch<R: CommandRunner>(ctx: &BuildContext<'_, R>) -> Result<(), BuildError> {
  info!(package = %ctx.record.name, kind = %ctx.record.kind(), "using build strategy");
  match &ctx.record.spec {
    KindSpec::Cmake => cmake::build(ctx).await,
    KindSpec::ConfigureMake { target } => configure::build(ctx, target.as_deref()).await,
    KindSpec::HeaderOnly { interface } => header::install(ctx, interface),
    KindSpec::Bjam => bjam::build(ctx).await,
  }
}

/// Directory holding `file`, for running tools next to their script.
fn parent_dir(file: &Path) -> PathBuf {
  file.parent().map(Path::to_path_buf).unwrap_or_default()
}

//! The install run.
//!
//! Packages are processed one at a time, in descriptor order:
//!
//! ```text
//! ledger check -> fetch -> unpack -> build -> attribution -> commit -> cleanup
//! ```
//!
//! A package found in the ledger with the same source is skipped unless the
//! run is forced. A failure while fetching, unpacking or building removes the
//! package's working directory and moves on to the next package. Whatever
//! happened, the attribution header is regenerated at the end.
//!
//! Every descriptor is validated before anything touches the filesystem, so
//! a bad list never leaves a half-purged install root behind.

mod types;

pub use types::*;

use std::fs;

use chrono::Local;
use tracing::{info, warn};

use crate::attribution::{self, AttributionWarning};
use crate::build::{self, BuildContext, CommandRunner, default_jobs, log_file_name};
use crate::descriptor::RawRecord;
use crate::fetch::{Fetcher, is_cached};
use crate::install_lock::InstallLock;
use crate::ledger::InstallLedger;
use crate::package::{PackageRecord, validate_all};
use crate::platform::PlatformTags;
use crate::platform::paths::Layout;
use crate::util::fs::remove_path;

/// Name recorded in the install lock while a run holds it.
const LOCK_COMMAND: &str = "install";

pub struct Pipeline<F, R> {
  layout: Layout,
  tags: PlatformTags,
  fetcher: F,
  runner: R,
  jobs: usize,
  ledger: InstallLedger,
}

impl<F: Fetcher, R: CommandRunner> Pipeline<F, R> {
  pub fn new(layout: Layout, tags: PlatformTags, fetcher: F, runner: R) -> Self {
    let ledger = InstallLedger::new(layout.ledger_path());
    Self {
      layout,
      tags,
      fetcher,
      runner,
      jobs: default_jobs(),
      ledger,
    }
  }

  /// Override the parallelism passed to make and cmake.
  pub fn with_jobs(mut self, jobs: usize) -> Self {
    self.jobs = jobs.max(1);
    self
  }

  pub fn layout(&self) -> &Layout {
    &self.layout
  }

  pub fn tags(&self) -> &PlatformTags {
    &self.tags
  }

  pub fn ledger(&self) -> &InstallLedger {
    &self.ledger
  }

  pub fn fetcher(&self) -> &F {
    &self.fetcher
  }

  pub fn runner(&self) -> &R {
    &self.runner
  }

  /// Validate every record, then narrow to `package` if given.
  pub fn prepare(&self, raws: &[RawRecord], package: Option<&str>) -> Result<Vec<PackageRecord>, PipelineError> {
    let records = validate_all(raws, &self.tags, &self.layout)?;
    match package {
      None => Ok(records),
      Some(name) => {
        let selected: Vec<_> = records.into_iter().filter(|r| r.name == name).collect();
        if selected.is_empty() {
          return Err(PipelineError::UnknownPackage(name.to_string()));
        }
        Ok(selected)
      }
    }
  }

  /// Report what a run would do, without side effects.
  pub fn plan(&self, raws: &[RawRecord], package: Option<&str>) -> Result<Vec<PlannedPackage>, PipelineError> {
    self
      .prepare(raws, package)?
      .into_iter()
      .map(|record| -> Result<PlannedPackage, PipelineError> {
        Ok(PlannedPackage {
          installed: self.ledger.is_installed(&record.name, &record.source_url)?,
          cached: is_cached(&record.paths.cache_file),
          kind: record.kind(),
          name: record.name,
          source_url: record.source_url,
          options: record.options,
        })
      })
      .collect()
  }

  /// Install every package in `raws`.
  ///
  /// Returns `Err` only for problems that affect the whole run; individual
  /// package failures are collected in the report.
  pub async fn run(&self, raws: &[RawRecord], options: &RunOptions) -> Result<RunReport, PipelineError> {
    let records = self.prepare(raws, options.package.as_deref())?;

    if options.purge {
      info!(path = %self.layout.install_root.display(), "purging install root");
      remove_path(&self.layout.install_root).map_err(|source| PipelineError::Purge {
        path: self.layout.install_root.clone(),
        source,
      })?;
    }

    let _lock = InstallLock::acquire(&self.layout.install_root, LOCK_COMMAND)?;
    let mut report = RunReport::default();

    for record in &records {
      if !options.force && self.ledger.is_installed(&record.name, &record.source_url)? {
        info!(package = %record.name, "already installed, skipping");
        report.skipped.push(record.name.clone());
        continue;
      }

      info!(package = %record.name, kind = %record.kind(), "installing");
      match self.install_one(record).await {
        Ok(warning) => {
          if let Some(warning) = warning {
            warn!("{warning}");
            report.warnings.push(warning);
          }
          info!(package = %record.name, "installed");
          report.installed.push(record.name.clone());
        }
        Err(error) => {
          warn!(package = %record.name, error = %error, "unable to install");
          if let Err(e) = remove_path(&record.paths.package_dir) {
            warn!(path = %record.paths.package_dir.display(), error = %e, "failed to clean up");
          }
          report.failed.push(PackageFailure {
            name: record.name.clone(),
            error,
          });
        }
      }
    }

    report.attribution = Some(attribution::merge(&self.layout.install_root)?);

    if !report.is_success() {
      warn!(packages = ?report.failed_names(), "some packages failed to install");
    }
    Ok(report)
  }

  async fn install_one(&self, record: &PackageRecord) -> Result<Option<AttributionWarning>, PackageError> {
    let paths = &record.paths;
    for dir in [&paths.package_dir, &paths.unpack_dir, &paths.build_dir, &paths.log_dir] {
      create_dir(dir)?;
    }

    self.fetcher.ensure_cached(&record.source_url, &paths.cache_file).await?;

    remove_path(&paths.unpack_dir).map_err(|source| PackageError::Io {
      path: paths.unpack_dir.clone(),
      source,
    })?;
    create_dir(&paths.unpack_dir)?;
    info!(package = %record.name, "unpacking");
    self.fetcher.unpack(&paths.cache_file, &paths.unpack_dir).await?;

    let ctx = BuildContext {
      record,
      install_root: &self.layout.install_root,
      jobs: self.jobs,
      runner: &self.runner,
      log_file: paths.log_dir.join(log_file_name(Local::now())),
    };
    build::dispatch(&ctx).await?;

    let warning = attribution::harvest(record, &self.layout.install_root).err();

    self.ledger.commit(&record.name, &record.source_url)?;

    info!(package = %record.name, "cleaning up");
    if let Err(e) = remove_path(&paths.package_dir) {
      warn!(path = %paths.package_dir.display(), error = %e, "failed to clean up");
    }

    Ok(warning)
  }
}

fn create_dir(path: &std::path::Path) -> Result<(), PackageError> {
  fs::create_dir_all(path).map_err(|source| PackageError::Io {
    path: path.to_path_buf(),
    source,
  })
}

//! Implementation of the `depforge install` command.

use std::time::Instant;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use depforge_lib::build::ProcessRunner;
use depforge_lib::descriptor::load_descriptors;
use depforge_lib::fetch::HttpFetcher;
use depforge_lib::pipeline::{Pipeline, RunOptions};
use depforge_lib::platform::PlatformTags;
use depforge_lib::platform::paths::Layout;

use crate::output::{
  format_duration, print_error, print_info, print_skipped, print_stat, print_success, print_warning,
};

pub struct InstallArgs {
  pub package: Option<String>,
  pub purge: bool,
  pub force: bool,
  pub jobs: Option<usize>,
}

/// Run the install pipeline over the descriptor list in the root directory.
///
/// Fails when the list cannot be loaded or validated, when another run holds
/// the install root, or when any package failed to install.
pub fn cmd_install(layout: &Layout, args: InstallArgs) -> Result<()> {
  let loaded = load_descriptors(&layout.root).context("No usable descriptor file")?;
  let tags = PlatformTags::detect();
  print_info(&format!("Using {} on {}", loaded.source, tags));

  let mut pipeline = Pipeline::new(layout.clone(), tags, HttpFetcher::new(), ProcessRunner);
  if let Some(jobs) = args.jobs {
    pipeline = pipeline.with_jobs(jobs);
  }
  let options = RunOptions {
    force: args.force,
    purge: args.purge,
    package: args.package,
  };
  debug!(
    records = loaded.records.len(),
    force = options.force,
    purge = options.purge,
    package = ?options.package,
    "starting install run"
  );

  let started = Instant::now();
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let report = rt
    .block_on(pipeline.run(&loaded.records, &options))
    .context("Install failed")?;

  if let Some(header) = &report.attribution {
    info!(path = %header.display(), "attribution header written");
  }

  for name in &report.skipped {
    print_skipped(&format!("{name} is already installed"));
  }
  for name in &report.installed {
    print_success(&format!("{name} installed"));
  }
  for warning in &report.warnings {
    print_warning(&warning.to_string());
  }
  for failure in &report.failed {
    print_error(&format!("{}: {}", failure.name, failure.error));
  }

  println!();
  print_stat("Installed", &report.installed.len().to_string());
  print_stat("Skipped", &report.skipped.len().to_string());
  print_stat("Failed", &report.failed.len().to_string());
  if let Some(header) = &report.attribution {
    print_stat("Attribution", &header.display().to_string());
  }
  print_stat("Time", &format_duration(started.elapsed()));

  if !report.is_success() {
    bail!(
      "{} package(s) failed to install: {}",
      report.failed.len(),
      report.failed_names().join(", ")
    );
  }

  Ok(())
}

//! Implementation of the `depforge plan` command.
//!
//! Loads and validates the descriptor list, then shows what `install` would
//! do with each package. Nothing is downloaded or written.

use anyhow::{Context, Result};
use tracing::debug;

use depforge_lib::build::ProcessRunner;
use depforge_lib::descriptor::load_descriptors;
use depforge_lib::fetch::HttpFetcher;
use depforge_lib::pipeline::Pipeline;
use depforge_lib::platform::PlatformTags;
use depforge_lib::platform::paths::Layout;

use crate::output::{OutputFormat, print_info, print_json, print_stat, symbols};

pub fn cmd_plan(layout: &Layout, package: Option<&str>, output: OutputFormat) -> Result<()> {
  let loaded = load_descriptors(&layout.root).context("No usable descriptor file")?;
  let tags = PlatformTags::detect();
  let pipeline = Pipeline::new(layout.clone(), tags, HttpFetcher::new(), ProcessRunner);
  let plan = pipeline
    .plan(&loaded.records, package)
    .context("Invalid descriptor list")?;
  debug!(source = %loaded.source, packages = plan.len(), "resolved plan");

  if output.is_json() {
    let packages: Vec<_> = plan
      .iter()
      .map(|p| {
        serde_json::json!({
          "name": p.name,
          "type": p.kind.as_str(),
          "src": p.source_url,
          "options": p.options,
          "installed": p.installed,
          "cached": p.cached,
        })
      })
      .collect();
    return print_json(&serde_json::json!({
      "source": loaded.source.path(),
      "tags": pipeline.tags().iter().collect::<Vec<_>>(),
      "packages": packages,
    }));
  }

  print_info(&format!("{} package(s) from {}", plan.len(), loaded.source));
  for p in &plan {
    let state = match (p.installed, p.cached) {
      (true, _) => "installed",
      (false, true) => "to build (cached)",
      (false, false) => "to download and build",
    };
    println!();
    println!("{} {} [{}] {} {}", symbols::INFO, p.name, p.kind, symbols::ARROW, state);
    print_stat("src", &p.source_url);
    if !p.options.is_empty() {
      print_stat("options", &p.options.join(" | "));
    }
  }

  Ok(())
}

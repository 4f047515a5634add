//! Implementation of the `depforge info` command.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

use depforge_lib::ledger::InstallLedger;
use depforge_lib::platform::Platform;
use depforge_lib::platform::paths::Layout;

use crate::output::{OutputFormat, format_bytes, print_json, print_stat, print_success};

#[derive(Serialize)]
struct Info {
  version: &'static str,
  platform: String,
  tags: Vec<String>,
  root: String,
  install_root: String,
  cache_dir: String,
  cache_bytes: u64,
  installed: Vec<String>,
}

pub fn cmd_info(layout: &Layout, output: OutputFormat) -> Result<()> {
  let platform = Platform::current();
  debug!(root = %layout.root.display(), platform = %platform, "collecting info");
  let ledger = InstallLedger::new(layout.ledger_path());
  let mut installed: Vec<String> = ledger
    .entries()
    .context("Failed to read the install ledger")?
    .into_iter()
    .map(|e| e.name)
    .collect();
  installed.sort();
  installed.dedup();

  let info = Info {
    version: env!("CARGO_PKG_VERSION"),
    platform: platform.triple(),
    tags: platform.tags().iter().map(str::to_string).collect(),
    root: layout.root.display().to_string(),
    install_root: layout.install_root.display().to_string(),
    cache_dir: layout.cache_dir.display().to_string(),
    cache_bytes: cache_size(&layout.cache_dir),
    installed,
  };

  if output.is_json() {
    return print_json(&info);
  }

  print_success(&format!("depforge v{}", info.version));
  print_stat("Platform", &info.platform);
  print_stat("Tags", &info.tags.join(","));
  print_stat("Root", &info.root);
  print_stat("Install", &info.install_root);
  print_stat("Cache", &format!("{} ({})", info.cache_dir, format_bytes(info.cache_bytes)));
  print_stat(
    "Installed",
    &if info.installed.is_empty() {
      "none".to_string()
    } else {
      info.installed.join(", ")
    },
  );

  Ok(())
}

/// Total size of the cached archives. The cache is flat.
fn cache_size(dir: &Path) -> u64 {
  std::fs::read_dir(dir)
    .map(|entries| {
      entries
        .flatten()
        .filter_map(|e| e.metadata().ok())
        .filter(|m| m.is_file())
        .map(|m| m.len())
        .sum()
    })
    .unwrap_or(0)
}

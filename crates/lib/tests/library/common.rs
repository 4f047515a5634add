//! Shared helpers for pipeline integration tests.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use depforge_lib::build::{CommandError, CommandRunner, ToolCommand};
use depforge_lib::descriptor::{RawRecord, parse_descriptors};
use depforge_lib::fetch::{FetchError, Fetcher, UnpackError, is_cached, unpack_archive};
use depforge_lib::pipeline::Pipeline;
use depforge_lib::platform::PlatformTags;
use depforge_lib::platform::paths::Layout;
use flate2::Compression;
use flate2::write::GzEncoder;
use tempfile::TempDir;

/// Serves in-memory source trees as tar.gz archives, keyed by URL.
#[derive(Default)]
pub struct FakeFetcher {
  trees: HashMap<String, Vec<(String, String)>>,
  pub fetched: Mutex<Vec<String>>,
}

impl FakeFetcher {
  pub fn with_tree(mut self, url: &str, files: &[(&str, &str)]) -> Self {
    self.trees.insert(
      url.to_string(),
      files.iter().map(|(p, c)| (p.to_string(), c.to_string())).collect(),
    );
    self
  }

  pub fn fetch_count(&self) -> usize {
    self.fetched.lock().unwrap().len()
  }
}

impl Fetcher for FakeFetcher {
  async fn ensure_cached(&self, url: &str, cache_path: &Path) -> Result<(), FetchError> {
    self.fetched.lock().unwrap().push(url.to_string());
    if is_cached(cache_path) {
      return Ok(());
    }
    let files = self.trees.get(url).ok_or_else(|| FetchError::Status {
      url: url.to_string(),
      status: 404,
    })?;
    fs::create_dir_all(cache_path.parent().unwrap()).unwrap();
    fs::write(cache_path, tar_gz(files)).unwrap();
    Ok(())
  }

  async fn unpack(&self, archive: &Path, dest: &Path) -> Result<(), UnpackError> {
    unpack_archive(archive, dest)
  }
}

fn tar_gz(files: &[(String, String)]) -> Vec<u8> {
  let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
  for (path, content) in files {
    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, path, content.as_bytes()).unwrap();
  }
  builder.into_inner().unwrap().finish().unwrap()
}

/// Records commands, failing those whose program is in `fail`.
#[derive(Default)]
pub struct FakeRunner {
  pub fail: Vec<String>,
  pub commands: Mutex<Vec<ToolCommand>>,
}

impl FakeRunner {
  pub fn failing(programs: &[&str]) -> Self {
    Self {
      fail: programs.iter().map(|p| p.to_string()).collect(),
      ..Self::default()
    }
  }

  pub fn programs(&self) -> Vec<String> {
    self.commands.lock().unwrap().iter().map(|c| c.program.clone()).collect()
  }
}

impl CommandRunner for FakeRunner {
  async fn run(&self, command: &ToolCommand, _log_file: &Path) -> Result<(), CommandError> {
    self.commands.lock().unwrap().push(command.clone());
    if self.fail.contains(&command.program) {
      return Err(CommandError::Exit {
        command: command.to_string(),
        code: Some(1),
      });
    }
    Ok(())
  }
}

pub fn linux() -> PlatformTags {
  PlatformTags::new(["x86_64", "linux"])
}

pub fn darwin() -> PlatformTags {
  PlatformTags::new(["x86_64", "darwin"])
}

pub fn records(text: &str) -> Vec<RawRecord> {
  parse_descriptors(text).unwrap()
}

/// A scratch root plus a pipeline over it.
pub struct TestEnv {
  pub temp: TempDir,
  pub layout: Layout,
}

impl TestEnv {
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    let layout = Layout::new(temp.path());
    Self { temp, layout }
  }

  pub fn pipeline(&self, fetcher: FakeFetcher, runner: FakeRunner) -> Pipeline<FakeFetcher, FakeRunner> {
    Pipeline::new(self.layout.clone(), linux(), fetcher, runner).with_jobs(2)
  }

  pub fn ledger_text(&self) -> String {
    fs::read_to_string(self.layout.ledger_path()).unwrap_or_default()
  }
}

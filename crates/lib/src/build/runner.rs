//! External tool invocation.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;

use chrono::{DateTime, Local};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

/// A program, its arguments, and the directory to run it in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
  pub program: String,
  pub args: Vec<String>,
  pub cwd: PathBuf,
}

impl ToolCommand {
  pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      cwd: cwd.into(),
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }
}

impl fmt::Display for ToolCommand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.program)?;
    for arg in &self.args {
      write!(f, " {arg}")?;
    }
    Ok(())
  }
}

#[derive(Debug, Error)]
pub enum CommandError {
  #[error("failed to start '{program}': {source}")]
  Spawn {
    program: String,
    #[source]
    source: io::Error,
  },

  #[error("'{command}' exited with {}", .code.map_or_else(|| "a signal".to_string(), |c| format!("code {c}")))]
  Exit { command: String, code: Option<i32> },

  #[error("failed to open log file '{path}': {source}")]
  Log {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Runs build tools to completion. A non-zero exit is an error.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
  async fn run(&self, command: &ToolCommand, log_file: &Path) -> Result<(), CommandError>;
}

/// Spawns real processes, sending their output to the package log.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
  async fn run(&self, command: &ToolCommand, log_file: &Path) -> Result<(), CommandError> {
    info!(cwd = %command.cwd.display(), "running {command}");

    let log_err = |source| CommandError::Log {
      path: log_file.to_path_buf(),
      source,
    };
    if let Some(parent) = log_file.parent() {
      fs::create_dir_all(parent).map_err(log_err)?;
    }
    let mut log = OpenOptions::new().create(true).append(true).open(log_file).map_err(log_err)?;
    writeln!(log, "$ {command}").map_err(log_err)?;
    let stderr = log.try_clone().map_err(log_err)?;

    let status = Command::new(&command.program)
      .args(&command.args)
      .current_dir(&command.cwd)
      .stdin(Stdio::null())
      .stdout(Stdio::from(log))
      .stderr(Stdio::from(stderr))
      .status()
      .await
      .map_err(|source| CommandError::Spawn {
        program: command.program.clone(),
        source,
      })?;

    debug!(status = %status, "{} finished", command.program);
    if status.success() {
      Ok(())
    } else {
      Err(CommandError::Exit {
        command: command.to_string(),
        code: status.code(),
      })
    }
  }
}

/// Log file name for a build started at `at`.
pub fn log_file_name(at: DateTime<Local>) -> String {
  format!("log_{}.txt", at.format("%d-%m-%Y_%H-%M-%S"))
}

/// Number of parallel build jobs to request from make and cmake.
pub fn default_jobs() -> usize {
  std::thread::available_parallelism().map_or(1, |n| n.get())
}

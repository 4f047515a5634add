//! Exclusive lock on an install root.
//!
//! Two runs sharing an install root would interleave unpacking, builds and
//! ledger writes. `install` takes this lock before touching anything and
//! holds it until the run ends; the OS releases it if the process dies.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::LOCK_FILE;

#[derive(Debug, Serialize, Deserialize)]
pub struct LockMetadata {
  pub version: u32,
  pub pid: u32,
  pub started_at: DateTime<Utc>,
  pub command: String,
  pub install_root: PathBuf,
}

#[derive(Debug, Error)]
pub enum InstallLockError {
  #[error(
    "Install root is locked by another process: {command} (PID {pid}, started {started_at})\n\
             If you're sure no depforge process is running, remove the lock file:\n  {lock_path}"
  )]
  Contention {
    command: String,
    pid: u32,
    started_at: DateTime<Utc>,
    lock_path: PathBuf,
  },

  #[error(
    "Install root is locked (could not read lock metadata)\n\
             If you're sure no depforge process is running, remove the lock file:\n  {lock_path}"
  )]
  ContentionUnknown { lock_path: PathBuf },

  #[error("Failed to create install directory: {0}")]
  CreateDir(#[source] io::Error),

  #[error("Failed to open lock file: {0}")]
  OpenFile(#[source] io::Error),

  #[error("Failed to write lock metadata: {0}")]
  WriteMetadata(#[source] io::Error),

  #[error("Failed to acquire lock: {0}")]
  LockFailed(#[source] io::Error),
}

/// Held for the duration of a run; dropping it releases the lock.
pub struct InstallLock {
  file: File,
  lock_path: PathBuf,
}

impl InstallLock {
  /// Take the lock without waiting. Fails with
  /// [`InstallLockError::Contention`] when another process holds it.
  pub fn acquire(install_root: &Path, command: &str) -> Result<Self, InstallLockError> {
    std::fs::create_dir_all(install_root).map_err(InstallLockError::CreateDir)?;
    let lock_path = install_root.join(LOCK_FILE);

    let file = OpenOptions::new()
      .read(true)
      .write(true)
      .create(true)
      .truncate(false)
      .open(&lock_path)
      .map_err(InstallLockError::OpenFile)?;

    if let Err(err) = try_lock_exclusive(&file) {
      if err.kind() == io::ErrorKind::WouldBlock {
        return Err(Self::read_contention_error(&lock_path));
      }
      return Err(InstallLockError::LockFailed(err));
    }

    Self::write_metadata(&file, command, install_root)?;
    debug!(path = %lock_path.display(), "install lock acquired");

    Ok(InstallLock { file, lock_path })
  }

  /// Reads the metadata through the held handle. Opening the file again
  /// would fail on Windows, where the lock is mandatory.
  pub fn read_metadata(&self) -> io::Result<LockMetadata> {
    let mut file = &self.file;
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    serde_json::from_str(&contents).map_err(io::Error::other)
  }

  pub fn lock_path(&self) -> &Path {
    &self.lock_path
  }

  fn write_metadata(file: &File, command: &str, install_root: &Path) -> Result<(), InstallLockError> {
    let metadata = LockMetadata {
      version: 1,
      pid: std::process::id(),
      started_at: Utc::now(),
      command: command.to_string(),
      install_root: install_root.to_path_buf(),
    };

    file.set_len(0).map_err(InstallLockError::WriteMetadata)?;
    let mut writer = io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &metadata)
      .map_err(|e| InstallLockError::WriteMetadata(io::Error::other(e)))?;
    writer.flush().map_err(InstallLockError::WriteMetadata)?;

    Ok(())
  }

  fn read_contention_error(lock_path: &Path) -> InstallLockError {
    if let Ok(mut file) = File::open(lock_path) {
      let mut contents = String::new();
      if file.read_to_string(&mut contents).is_ok()
        && let Ok(metadata) = serde_json::from_str::<LockMetadata>(&contents)
      {
        return InstallLockError::Contention {
          command: metadata.command,
          pid: metadata.pid,
          started_at: metadata.started_at,
          lock_path: lock_path.to_path_buf(),
        };
      }
    }

    InstallLockError::ContentionUnknown {
      lock_path: lock_path.to_path_buf(),
    }
  }
}

#[cfg(unix)]
fn try_lock_exclusive(file: &File) -> io::Result<()> {
  use rustix::fs::{FlockOperation, flock};
  use std::os::unix::io::AsFd;

  flock(file.as_fd(), FlockOperation::NonBlockingLockExclusive).map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))
}

#[cfg(windows)]
fn try_lock_exclusive(file: &File) -> io::Result<()> {
  use std::os::windows::io::AsRawHandle;
  use windows_sys::Win32::Foundation::HANDLE;
  use windows_sys::Win32::Storage::FileSystem::{LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY, LockFileEx};

  let handle = file.as_raw_handle() as HANDLE;

  // SAFETY: OVERLAPPED is a plain data struct that is valid when zero-initialized,
  // and the handle belongs to an open file.
  let result = unsafe {
    let mut overlapped = std::mem::zeroed();
    LockFileEx(
      handle,
      LOCKFILE_FAIL_IMMEDIATELY | LOCKFILE_EXCLUSIVE_LOCK,
      0,
      1,
      0,
      &mut overlapped,
    )
  };

  if result == 0 {
    Err(io::Error::last_os_error())
  } else {
    Ok(())
  }
}

//! Archive downloads into the shared cache.
//!
//! Files are streamed to `<cache file>.part` and renamed into place once
//! complete, so an interrupted download never looks cached.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

use super::Fetcher;
use super::archive::{UnpackError, unpack_archive};

/// Progress is reported in steps of this many percent.
const PROGRESS_STEP: u8 = 5;

#[derive(Debug, Error)]
pub enum FetchError {
  #[error("fetch failed for {url}: {source}")]
  Http {
    url: String,
    #[source]
    source: reqwest::Error,
  },

  #[error("fetch failed for {url}: HTTP {status}")]
  Status { url: String, status: u16 },

  #[error("fetch failed for {url}: downloaded file is empty")]
  Empty { url: String },

  #[error("fetch failed for {url}: not a usable file URL")]
  InvalidFileUrl { url: String },

  #[error("io error at '{path}': {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Whether `path` already holds a usable download.
pub fn is_cached(path: &Path) -> bool {
  std::fs::metadata(path).map(|m| m.is_file() && m.len() > 0).unwrap_or(false)
}

/// Percentage tracking for a download of known size.
#[derive(Debug, Clone)]
pub struct DownloadProgress {
  total: u64,
  downloaded: u64,
  last_reported: u8,
}

impl DownloadProgress {
  pub fn new(total: u64) -> Self {
    Self {
      total,
      downloaded: 0,
      last_reported: 0,
    }
  }

  pub fn downloaded(&self) -> u64 {
    self.downloaded
  }

  pub fn percent(&self) -> u8 {
    if self.total == 0 {
      return 100;
    }
    (self.downloaded.saturating_mul(100) / self.total).min(100) as u8
  }

  /// Account for `bytes` more bytes. Returns the new percentage when it
  /// crossed the next reporting step.
  pub fn advance(&mut self, bytes: u64) -> Option<u8> {
    self.downloaded += bytes;
    let percent = self.percent();
    if percent >= self.last_reported.saturating_add(PROGRESS_STEP) || (percent == 100 && self.last_reported < 100) {
      self.last_reported = percent;
      Some(percent)
    } else {
      None
    }
  }
}

/// Fetcher backed by reqwest, with `file://` support for local mirrors.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
  client: reqwest::Client,
}

impl HttpFetcher {
  pub fn new() -> Self {
    Self::default()
  }

  async fn download(&self, url: &str, dest: &Path) -> Result<(), FetchError> {
    let http_err = |source| FetchError::Http {
      url: url.to_string(),
      source,
    };
    let io_err = |source| FetchError::Io {
      path: dest.to_path_buf(),
      source,
    };

    let mut response = self.client.get(url).send().await.map_err(http_err)?;
    if !response.status().is_success() {
      return Err(FetchError::Status {
        url: url.to_string(),
        status: response.status().as_u16(),
      });
    }

    let mut file = fs::File::create(dest).await.map_err(io_err)?;

    match response.content_length() {
      Some(total) => {
        info!(url = %url, bytes = total, "downloading");
        let mut progress = DownloadProgress::new(total);
        while let Some(chunk) = response.chunk().await.map_err(http_err)? {
          file.write_all(&chunk).await.map_err(io_err)?;
          if let Some(percent) = progress.advance(chunk.len() as u64) {
            info!(url = %url, "download: {percent}% of {total}");
          }
        }
      }
      None => {
        info!(url = %url, "downloading (unknown size)");
        let bytes = response.bytes().await.map_err(http_err)?;
        file.write_all(&bytes).await.map_err(io_err)?;
        debug!(url = %url, bytes = bytes.len(), "download finished");
      }
    }

    file.flush().await.map_err(io_err)
  }

  async fn copy_local(&self, url: &str, dest: &Path) -> Result<(), FetchError> {
    let source = Url::parse(url)
      .ok()
      .and_then(|u| u.to_file_path().ok())
      .ok_or_else(|| FetchError::InvalidFileUrl { url: url.to_string() })?;
    info!(path = %source.display(), "copying local archive");
    fs::copy(&source, dest).await.map_err(|e| FetchError::Io { path: source, source: e })?;
    Ok(())
  }
}

impl Fetcher for HttpFetcher {
  async fn ensure_cached(&self, url: &str, cache_path: &Path) -> Result<(), FetchError> {
    if is_cached(cache_path) {
      info!(path = %cache_path.display(), "using cached archive");
      return Ok(());
    }

    if let Some(parent) = cache_path.parent() {
      fs::create_dir_all(parent).await.map_err(|source| FetchError::Io {
        path: parent.to_path_buf(),
        source,
      })?;
    }

    let part = part_path(cache_path);
    let result = if url.starts_with("file:") {
      self.copy_local(url, &part).await
    } else {
      self.download(url, &part).await
    };
    if let Err(e) = result {
      let _ = fs::remove_file(&part).await;
      return Err(e);
    }

    if !is_cached(&part) {
      let _ = fs::remove_file(&part).await;
      return Err(FetchError::Empty { url: url.to_string() });
    }

    fs::rename(&part, cache_path).await.map_err(|source| FetchError::Io {
      path: cache_path.to_path_buf(),
      source,
    })?;
    info!(path = %cache_path.display(), "archive cached");
    Ok(())
  }

  async fn unpack(&self, archive: &Path, dest: &Path) -> Result<(), UnpackError> {
    let archive_owned = archive.to_path_buf();
    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || unpack_archive(&archive_owned, &dest))
      .await
      .map_err(|e| UnpackError::Io {
        path: archive.to_path_buf(),
        source: io::Error::other(e),
      })?
  }
}

fn part_path(path: &Path) -> PathBuf {
  let mut name = OsString::from(path.as_os_str());
  name.push(".part");
  PathBuf::from(name)
}

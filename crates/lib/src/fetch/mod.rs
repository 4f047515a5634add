//! Download cache and archive unpacking.
//!
//! The pipeline talks to the network and to archive formats only through the
//! [`Fetcher`] trait, so runs can be driven from prepared trees in tests.

mod archive;
mod download;

pub use archive::{ArchiveFormat, UnpackError, unpack_archive};
pub use download::{DownloadProgress, FetchError, HttpFetcher, is_cached};

use std::path::Path;

/// Source of package archives.
#[allow(async_fn_in_trait)]
pub trait Fetcher {
  /// Make sure `cache_path` holds the archive behind `url`. An existing,
  /// non-empty file is reused as is.
  async fn ensure_cached(&self, url: &str, cache_path: &Path) -> Result<(), FetchError>;

  /// Extract `archive` into `dest`.
  async fn unpack(&self, archive: &Path, dest: &Path) -> Result<(), UnpackError>;
}

//! License attribution.
//!
//! After a package is installed its license file is copied out of the
//! unpacked sources into `attrib.<name>.txt` in the install root. Once a run
//! finishes every fragment is merged into `include/attribution.h`, a header
//! exposing all collected license text as one string constant. Fragments of
//! packages installed in earlier runs are picked up too, so the header always
//! covers the whole install root.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::build::{CaseMatch, SearchError, SearchQuery, find_shortest};
use crate::consts::{ATTRIBUTION_FRAGMENT_PREFIX, ATTRIBUTION_HEADER};
use crate::package::PackageRecord;

/// File name pattern for license files.
const LICENSE_PATTERN: &str = "licen?e*";

/// Extensions of source files that merely mention a license in their name.
const LICENSE_SOURCE_EXTENSIONS: [&str; 6] = ["hpp", "h", "cpp", "c", "cc", "cxx"];

const FRAGMENT_SEPARATOR: &str = "\n----\n";

/// Delimiter of the raw string literal in the generated header. License text
/// containing `)"` cannot end a literal opened with `R"depforge(`.
const RAW_DELIMITER: &str = "depforge";

/// A package whose license could not be harvested. Never fatal.
#[derive(Debug, Error)]
pub enum AttributionWarning {
  #[error("no license file for package '{name}': {source}")]
  NotFound {
    name: String,
    #[source]
    source: SearchError,
  },

  #[error("could not read license for package '{name}' at '{path}': {source}")]
  Read {
    name: String,
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("could not write attribution for package '{name}' to '{path}': {source}")]
  Write {
    name: String,
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

#[derive(Debug, Error)]
#[error("failed to write attribution header '{path}': {source}")]
pub struct MergeError {
  pub path: PathBuf,
  #[source]
  pub source: io::Error,
}

/// Path of the attribution fragment for `name`.
pub fn fragment_path(install_root: &Path, name: &str) -> PathBuf {
  install_root.join(format!("{ATTRIBUTION_FRAGMENT_PREFIX}{name}.txt"))
}

/// Find the package's license in its unpacked sources and write its
/// attribution fragment. Returns the fragment path.
pub fn harvest(record: &PackageRecord, install_root: &Path) -> Result<PathBuf, AttributionWarning> {
  let query = SearchQuery::exact(LICENSE_PATTERN)
    .case(CaseMatch::Insensitive)
    .without_extensions(LICENSE_SOURCE_EXTENSIONS);
  let license = find_shortest(&record.paths.unpack_dir, &query).map_err(|source| AttributionWarning::NotFound {
    name: record.name.clone(),
    source,
  })?;
  info!(package = %record.name, path = %license.display(), "found license file");

  let bytes = fs::read(&license).map_err(|source| AttributionWarning::Read {
    name: record.name.clone(),
    path: license.clone(),
    source,
  })?;

  let fragment = format!(
    "This software may include the package {}.\nThis package has the following license:\n{}",
    record.name,
    String::from_utf8_lossy(&bytes)
  );

  let path = fragment_path(install_root, &record.name);
  fs::write(&path, fragment).map_err(|source| AttributionWarning::Write {
    name: record.name.clone(),
    path: path.clone(),
    source,
  })?;
  info!(package = %record.name, path = %path.display(), "wrote attribution");
  Ok(path)
}

/// All fragment files in `install_root`, sorted by file name.
pub fn fragments(install_root: &Path) -> io::Result<Vec<PathBuf>> {
  let entries = match fs::read_dir(install_root) {
    Ok(entries) => entries,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
    Err(e) => return Err(e),
  };

  let mut paths = Vec::new();
  for entry in entries {
    let entry = entry?;
    let name = entry.file_name();
    let name = name.to_string_lossy();
    if name.starts_with(ATTRIBUTION_FRAGMENT_PREFIX) && name.ends_with(".txt") && entry.file_type()?.is_file() {
      paths.push(entry.path());
    }
  }
  paths.sort();
  Ok(paths)
}

/// Render the attribution header around already-joined fragment text.
pub fn render_header(text: &str) -> String {
  format!(
    "#pragma once\n\nnamespace third_party {{\ninline constexpr const char* attribution = R\"{RAW_DELIMITER}(\n\n{text}\n\n){RAW_DELIMITER}\";\n\n}}\n"
  )
}

/// Merge every fragment in `install_root` into the attribution header.
/// Unreadable fragments are skipped with a warning.
pub fn merge(install_root: &Path) -> Result<PathBuf, MergeError> {
  let header = install_root.join(ATTRIBUTION_HEADER);
  let merge_err = |source| MergeError {
    path: header.clone(),
    source,
  };

  let mut texts = Vec::new();
  for path in fragments(install_root).map_err(merge_err)? {
    match fs::read(&path) {
      Ok(bytes) => texts.push(String::from_utf8_lossy(&bytes).into_owned()),
      Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable attribution fragment"),
    }
  }

  if let Some(parent) = header.parent() {
    fs::create_dir_all(parent).map_err(merge_err)?;
  }
  fs::write(&header, render_header(&texts.join(FRAGMENT_SEPARATOR))).map_err(merge_err)?;
  info!(path = %header.display(), fragments = texts.len(), "attribution header updated");
  Ok(header)
}

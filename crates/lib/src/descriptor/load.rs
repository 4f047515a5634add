//! Two-stage descriptor loading: the line format first, JSON as the fallback.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::json::parse_json;
use super::text::parse_descriptors;
use super::types::{DescriptorError, RawRecord};
use crate::consts::{DEPS_JSON_FILE, DEPS_TEXT_FILE};

/// Result of trying one descriptor format.
#[derive(Debug)]
pub enum LoadOutcome {
  ParsedOk(Vec<RawRecord>),
  ParseFailed(DescriptorError),
}

/// Which file the records came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorSource {
  Text(PathBuf),
  Json(PathBuf),
}

impl DescriptorSource {
  pub fn path(&self) -> &Path {
    match self {
      DescriptorSource::Text(path) | DescriptorSource::Json(path) => path,
    }
  }
}

impl fmt::Display for DescriptorSource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.path().display())
  }
}

#[derive(Debug)]
pub struct LoadedDescriptors {
  pub source: DescriptorSource,
  pub records: Vec<RawRecord>,
}

/// Try the line format at `path`.
pub fn load_line_format(path: &Path) -> LoadOutcome {
  let content = match fs::read_to_string(path) {
    Ok(content) => content,
    Err(source) => {
      return LoadOutcome::ParseFailed(DescriptorError::Read {
        path: path.to_path_buf(),
        source,
      });
    }
  };

  match parse_descriptors(&content) {
    Ok(records) => LoadOutcome::ParsedOk(records),
    Err(source) => LoadOutcome::ParseFailed(DescriptorError::Parse {
      path: path.to_path_buf(),
      source,
    }),
  }
}

/// Try the JSON format at `path`.
pub fn load_json_format(path: &Path) -> LoadOutcome {
  let content = match fs::read_to_string(path) {
    Ok(content) => content,
    Err(source) => {
      return LoadOutcome::ParseFailed(DescriptorError::Read {
        path: path.to_path_buf(),
        source,
      });
    }
  };

  match parse_json(&content) {
    Ok(records) => LoadOutcome::ParsedOk(records),
    Err(e) => LoadOutcome::ParseFailed(e),
  }
}

/// Load the descriptor list from `dir`.
///
/// `deps.txt` wins when it parses. Any failure there (missing file included)
/// falls back to `deps.json`; when both fail the error carries both causes.
pub fn load_descriptors(dir: &Path) -> Result<LoadedDescriptors, DescriptorError> {
  let text_path = dir.join(DEPS_TEXT_FILE);
  let text_error = match load_line_format(&text_path) {
    LoadOutcome::ParsedOk(records) => {
      info!(path = %text_path.display(), count = records.len(), "loaded descriptors");
      return Ok(LoadedDescriptors {
        source: DescriptorSource::Text(text_path),
        records,
      });
    }
    LoadOutcome::ParseFailed(e) => e,
  };

  warn!(error = %text_error, "unable to read {DEPS_TEXT_FILE}, looking for {DEPS_JSON_FILE}");

  let json_path = dir.join(DEPS_JSON_FILE);
  match load_json_format(&json_path) {
    LoadOutcome::ParsedOk(records) => {
      info!(path = %json_path.display(), count = records.len(), "loaded descriptors");
      Ok(LoadedDescriptors {
        source: DescriptorSource::Json(json_path),
        records,
      })
    }
    LoadOutcome::ParseFailed(json_error) => Err(DescriptorError::NoUsableDescriptor {
      text: Box::new(text_error),
      json: Box::new(json_error),
    }),
  }
}

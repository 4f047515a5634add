//! Shortest-match file search.
//!
//! Source archives rarely agree on where their build entry point lives: the
//! tree may be wrapped in a versioned directory, and vendored subprojects
//! often carry their own `CMakeLists.txt` or `configure`. Picking the match
//! closest to the unpack root finds the top-level one.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseMatch {
  /// The pattern exactly as written.
  #[default]
  Exact,
  /// The pattern as written, uppercased, or lowercased.
  Variants,
  /// Any casing.
  Insensitive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
  /// Glob matched against file names.
  pub pattern: String,
  pub case: CaseMatch,
  /// Matches whose root-relative path contains any of these are dropped.
  pub excludes: Vec<String>,
  /// Matches with one of these file extensions are dropped. Compared without
  /// the dot, ignoring ASCII case.
  pub excluded_extensions: Vec<String>,
}

impl SearchQuery {
  pub fn exact(pattern: impl Into<String>) -> Self {
    Self {
      pattern: pattern.into(),
      case: CaseMatch::Exact,
      excludes: Vec::new(),
      excluded_extensions: Vec::new(),
    }
  }

  pub fn case(mut self, case: CaseMatch) -> Self {
    self.case = case;
    self
  }

  pub fn excluding<I, S>(mut self, excludes: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.excludes.extend(excludes.into_iter().map(Into::into));
    self
  }

  pub fn without_extensions<I, S>(mut self, extensions: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self
      .excluded_extensions
      .extend(extensions.into_iter().map(Into::into));
    self
  }

  fn excludes_extension(&self, path: &Path) -> bool {
    path
      .extension()
      .map(|ext| ext.to_string_lossy())
      .is_some_and(|ext| self.excluded_extensions.iter().any(|ex| ex.eq_ignore_ascii_case(&ext)))
  }
}

#[derive(Debug, Error)]
pub enum SearchError {
  #[error("no file matching '{pattern}' under '{root}'")]
  NotFound { root: PathBuf, pattern: String },

  #[error("invalid search pattern '{pattern}': {source}")]
  Pattern {
    pattern: String,
    #[source]
    source: glob::PatternError,
  },
}

/// Find the file matching `query` with the fewest path components below
/// `root`. Ties go to the first match in sorted walk order.
pub fn find_shortest(root: &Path, query: &SearchQuery) -> Result<PathBuf, SearchError> {
  let patterns = compile(query)?;
  let options = MatchOptions {
    case_sensitive: query.case != CaseMatch::Insensitive,
    require_literal_separator: true,
    require_literal_leading_dot: false,
  };

  WalkDir::new(root)
    .sort_by_file_name()
    .into_iter()
    .filter_map(|entry| match entry {
      Ok(entry) => Some(entry),
      Err(e) => {
        debug!(root = %root.display(), error = %e, "skipping unreadable entry during search");
        None
      }
    })
    .filter(|entry| entry.file_type().is_file())
    .filter_map(|entry| {
      let name = entry.file_name().to_string_lossy();
      if !patterns.iter().any(|p| p.matches_with(&name, options)) {
        return None;
      }
      let relative = entry.path().strip_prefix(root).ok()?;
      let relative_str = relative.to_string_lossy();
      if query.excludes.iter().any(|ex| relative_str.contains(ex.as_str())) || query.excludes_extension(relative) {
        return None;
      }
      Some((relative.components().count(), entry.into_path()))
    })
    .min_by_key(|(depth, _)| *depth)
    .map(|(_, path)| path)
    .ok_or_else(|| SearchError::NotFound {
      root: root.to_path_buf(),
      pattern: query.pattern.clone(),
    })
}

fn compile(query: &SearchQuery) -> Result<Vec<Pattern>, SearchError> {
  let mut sources = vec![query.pattern.clone()];
  if query.case == CaseMatch::Variants {
    sources.push(query.pattern.to_uppercase());
    sources.push(query.pattern.to_lowercase());
    sources.dedup();
  }
  sources
    .into_iter()
    .map(|pattern| {
      Pattern::new(&pattern).map_err(|source| SearchError::Pattern {
        pattern: pattern.clone(),
        source,
      })
    })
    .collect()
}

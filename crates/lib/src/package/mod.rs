//! Typed package records.
//!
//! A [`PackageRecord`] is built once per run from a [`RawRecord`] and the
//! platform tags, and is never mutated afterwards. Construction only
//! validates and derives values; it performs no I/O.

mod options;

pub use options::{OPTIONS_PREFIX, OptionClause, resolve_options};

use std::collections::HashSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;
use url::Url;

use crate::consts::RESERVED_INSTALL_ENTRIES;
use crate::descriptor::RawRecord;
use crate::platform::PlatformTags;
use crate::platform::paths::Layout;

/// The build convention of a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageKind {
  Cmake,
  ConfigureMake,
  HeaderOnly,
  Bjam,
}

impl PackageKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      PackageKind::Cmake => "cmake",
      PackageKind::ConfigureMake => "config/make",
      PackageKind::HeaderOnly => "header",
      PackageKind::Bjam => "boost",
    }
  }
}

impl fmt::Display for PackageKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for PackageKind {
  type Err = ();

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "cmake" => Ok(PackageKind::Cmake),
      "config/make" | "configure-make" => Ok(PackageKind::ConfigureMake),
      "header" | "header-only" => Ok(PackageKind::HeaderOnly),
      "boost" | "bjam" => Ok(PackageKind::Bjam),
      _ => Err(()),
    }
  }
}

/// Kind-specific payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KindSpec {
  Cmake,
  ConfigureMake {
    /// Make target overriding `all`.
    target: Option<String>,
  },
  HeaderOnly {
    /// Archive-relative directory copied to `include/<name>`.
    interface: String,
  },
  Bjam,
}

impl KindSpec {
  pub fn kind(&self) -> PackageKind {
    match self {
      KindSpec::Cmake => PackageKind::Cmake,
      KindSpec::ConfigureMake { .. } => PackageKind::ConfigureMake,
      KindSpec::HeaderOnly { .. } => PackageKind::HeaderOnly,
      KindSpec::Bjam => PackageKind::Bjam,
    }
  }
}

/// Working paths of one package, all derived from its name and source URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagePaths {
  /// `<install>/<name>`, removed after the package is processed.
  pub package_dir: PathBuf,
  /// `<install>/<name>/src`
  pub unpack_dir: PathBuf,
  /// `<install>/<name>/build`
  pub build_dir: PathBuf,
  /// `<install>/log/<name>`, kept for post-mortems.
  pub log_dir: PathBuf,
  /// `<cache>/<name><url basename>`
  pub cache_file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
  pub name: String,
  pub spec: KindSpec,
  pub source_url: String,
  pub options: Vec<String>,
  pub paths: PackagePaths,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("package '{name}' is missing required attribute '{attribute}'")]
  MissingAttribute { name: String, attribute: &'static str },

  #[error("package '{name}' has unknown type '{kind}' (expected cmake, config/make, header or boost)")]
  UnknownKind { name: String, kind: String },

  #[error("package '{name}' has an invalid src '{url}': {reason}")]
  InvalidSource { name: String, url: String, reason: String },

  #[error("package has an empty name")]
  EmptyName,

  #[error("package name '{name}' is not usable as a directory name: {reason}")]
  InvalidName { name: String, reason: &'static str },

  #[error("package '{0}' is declared more than once")]
  DuplicateName(String),
}

impl PackageRecord {
  /// Validate a raw record and derive everything needed to process it.
  pub fn from_raw(raw: &RawRecord, tags: &PlatformTags, layout: &Layout) -> Result<Self, ValidationError> {
    let name = raw.name.trim().to_string();
    if name.is_empty() {
      return Err(ValidationError::EmptyName);
    }
    check_name(&name)?;

    let required = |attribute: &'static str| {
      raw
        .get_single(attribute)
        .map(str::trim)
        .ok_or_else(|| ValidationError::MissingAttribute {
          name: name.clone(),
          attribute,
        })
    };

    let kind_str = required("type")?;
    let kind = kind_str.parse::<PackageKind>().map_err(|()| ValidationError::UnknownKind {
      name: name.clone(),
      kind: kind_str.to_string(),
    })?;
    let source_url = required("src")?.to_string();

    let spec = match kind {
      PackageKind::Cmake => KindSpec::Cmake,
      PackageKind::ConfigureMake => KindSpec::ConfigureMake {
        target: raw.get_single("target").map(|t| t.trim().to_string()),
      },
      PackageKind::HeaderOnly => KindSpec::HeaderOnly {
        interface: required("interface")?.to_string(),
      },
      PackageKind::Bjam => KindSpec::Bjam,
    };

    let basename = url_basename(&source_url).map_err(|reason| ValidationError::InvalidSource {
      name: name.clone(),
      url: source_url.clone(),
      reason,
    })?;

    let package_dir = layout.install_root.join(&name);
    let paths = PackagePaths {
      unpack_dir: package_dir.join("src"),
      build_dir: package_dir.join("build"),
      log_dir: layout.log_dir().join(&name),
      cache_file: layout.cache_dir.join(format!("{name}{basename}")),
      package_dir,
    };

    Ok(Self {
      options: resolve_options(raw, tags),
      name,
      spec,
      source_url,
      paths,
    })
  }

  pub fn kind(&self) -> PackageKind {
    self.spec.kind()
  }
}

/// Validate a whole descriptor list. Any error rejects the list.
pub fn validate_all(raws: &[RawRecord], tags: &PlatformTags, layout: &Layout) -> Result<Vec<PackageRecord>, ValidationError> {
  let mut seen = HashSet::new();
  raws
    .iter()
    .map(|raw| {
      let record = PackageRecord::from_raw(raw, tags, layout)?;
      if !seen.insert(record.name.clone()) {
        return Err(ValidationError::DuplicateName(record.name));
      }
      Ok(record)
    })
    .collect()
}

/// A name becomes `<install>/<name>`, which is deleted once the package is
/// done, so it must be one plain path segment that names nothing shared.
fn check_name(name: &str) -> Result<(), ValidationError> {
  let invalid = |reason| ValidationError::InvalidName {
    name: name.to_string(),
    reason,
  };

  let mut components = Path::new(name).components();
  match (components.next(), components.next()) {
    (Some(Component::Normal(segment)), None) if segment == name => {}
    _ => return Err(invalid("must be a single path segment")),
  }
  if RESERVED_INSTALL_ENTRIES.iter().any(|r| r.eq_ignore_ascii_case(name)) {
    return Err(invalid("reserved by the install root"));
  }
  Ok(())
}

/// Final path segment of a URL, used to name the cached archive.
fn url_basename(src: &str) -> Result<String, String> {
  let url = Url::parse(src).map_err(|e| e.to_string())?;
  url
    .path_segments()
    .and_then(|mut segments| segments.next_back())
    .filter(|segment| !segment.is_empty())
    .map(str::to_string)
    .ok_or_else(|| "URL path has no file name".to_string())
}

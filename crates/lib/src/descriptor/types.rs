use std::io;
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Value of one descriptor attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
  Single(String),
  List(Vec<String>),
}

impl AttrValue {
  /// The value as a scalar, if it is one.
  pub fn as_single(&self) -> Option<&str> {
    match self {
      AttrValue::Single(value) => Some(value),
      AttrValue::List(_) => None,
    }
  }

  /// The value as a list; a scalar is a one-item list.
  pub fn items(&self) -> &[String] {
    match self {
      AttrValue::Single(value) => std::slice::from_ref(value),
      AttrValue::List(items) => items,
    }
  }
}

/// One untyped descriptor entry: a name plus its attributes in declaration
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
  pub name: String,
  pub attrs: IndexMap<String, AttrValue>,
}

impl RawRecord {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      attrs: IndexMap::new(),
    }
  }

  /// Builder-style attribute insertion, mostly for tests.
  pub fn with(mut self, key: &str, value: AttrValue) -> Self {
    self.attrs.insert(key.to_string(), value);
    self
  }

  pub fn get(&self, key: &str) -> Option<&AttrValue> {
    self.attrs.get(key)
  }

  /// Scalar attribute lookup. A one-item list counts as a scalar.
  pub fn get_single(&self, key: &str) -> Option<&str> {
    match self.attrs.get(key)? {
      AttrValue::Single(value) => Some(value),
      AttrValue::List(items) if items.len() == 1 => Some(&items[0]),
      AttrValue::List(_) => None,
    }
  }
}

/// What made a descriptor line malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
  MissingColon,
  EmptyAttributeName,
  MissingPackageName,
  AttributeOutsidePackage,
  ListValuedName,
}

impl std::fmt::Display for ParseErrorKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let msg = match self {
      ParseErrorKind::MissingColon => "attribute line has no ':'",
      ParseErrorKind::EmptyAttributeName => "attribute name is empty",
      ParseErrorKind::MissingPackageName => "package header has no name",
      ParseErrorKind::AttributeOutsidePackage => "attribute before any '-' package header",
      ParseErrorKind::ListValuedName => "'name' must be a single value",
    };
    f.write_str(msg)
  }
}

/// A malformed line in the line format. Parsing stops at the first one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed descriptor line {line} ({kind}): {text}")]
pub struct ParseError {
  /// 1-based line number.
  pub line: usize,
  /// The raw line.
  pub text: String,
  pub kind: ParseErrorKind,
}

#[derive(Debug, Error)]
pub enum DescriptorError {
  #[error("failed to read descriptor file '{path}': {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("{path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: ParseError,
  },

  #[error("invalid JSON descriptor: {0}")]
  Json(#[from] serde_json::Error),

  #[error("JSON descriptor entry {index} has no string 'name'")]
  MissingName { index: usize },

  #[error("no usable descriptor file\n  line format: {text}\n  json format: {json}")]
  NoUsableDescriptor {
    text: Box<DescriptorError>,
    json: Box<DescriptorError>,
  },
}

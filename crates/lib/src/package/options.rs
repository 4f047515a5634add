//! Platform-conditioned option clauses.
//!
//! An attribute named `options` always applies. `options+linux` applies only
//! when the `linux` tag is present, `options+!windows` only when `windows` is
//! absent, and tags combine: `options+x86_64+!darwin`.

use crate::descriptor::RawRecord;
use crate::platform::{PlatformTags, applies};

pub const OPTIONS_PREFIX: &str = "options";

const TAG_SEPARATOR: char = '+';
const NEGATION: char = '!';

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OptionClause {
  pub required: Vec<String>,
  pub excluded: Vec<String>,
}

impl OptionClause {
  /// Parse an attribute key into a clause. Keys that are not option clauses
  /// return `None`.
  pub fn parse_key(key: &str) -> Option<Self> {
    let suffix = key.strip_prefix(OPTIONS_PREFIX)?;
    if !suffix.is_empty() && !suffix.starts_with(TAG_SEPARATOR) {
      // e.g. `optionsfoo`
      return None;
    }

    let mut clause = OptionClause::default();
    for tag in suffix.split(TAG_SEPARATOR).map(str::trim).filter(|t| !t.is_empty()) {
      match tag.strip_prefix(NEGATION) {
        Some(excluded) => clause.excluded.push(excluded.to_lowercase()),
        None => clause.required.push(tag.to_lowercase()),
      }
    }
    Some(clause)
  }

  pub fn applies_to(&self, tags: &PlatformTags) -> bool {
    applies(&self.required, &self.excluded, tags)
  }
}

/// Collect the values of every applicable clause, clause order first and
/// item order second.
pub fn resolve_options(record: &RawRecord, tags: &PlatformTags) -> Vec<String> {
  record
    .attrs
    .iter()
    .filter_map(|(key, value)| OptionClause::parse_key(key).map(|clause| (clause, value)))
    .filter(|(clause, _)| clause.applies_to(tags))
    .flat_map(|(_, value)| value.items().iter().cloned())
    .collect()
}

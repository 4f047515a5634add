//! Platform tag sets and clause applicability.

use std::collections::BTreeSet;
use std::fmt;

use super::Platform;

/// The set of lowercase tags describing the running machine, usually the
/// architecture and the operating system (`{"x86_64", "linux"}`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformTags(BTreeSet<String>);

impl PlatformTags {
  pub fn new<I, S>(tags: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    Self(tags.into_iter().map(|t| t.as_ref().to_lowercase()).collect())
  }

  /// Tags of the machine this process runs on.
  pub fn detect() -> Self {
    Platform::current().tags()
  }

  pub fn contains(&self, tag: &str) -> bool {
    self.0.contains(tag)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.0.iter().map(String::as_str)
  }

  /// Returns a copy with one more tag.
  pub fn with(&self, tag: &str) -> Self {
    let mut tags = self.0.clone();
    tags.insert(tag.to_lowercase());
    Self(tags)
  }
}

impl fmt::Display for PlatformTags {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let joined: Vec<&str> = self.iter().collect();
    write!(f, "{}", joined.join(","))
  }
}

/// Whether a clause with the given required and excluded tags applies on a
/// platform: no excluded tag may be present and every required tag must be.
pub fn applies<R, E>(required: &[R], excluded: &[E], current: &PlatformTags) -> bool
where
  R: AsRef<str>,
  E: AsRef<str>,
{
  excluded.iter().all(|tag| !current.contains(tag.as_ref())) && required.iter().all(|tag| current.contains(tag.as_ref()))
}

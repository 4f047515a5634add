//! Platform detection.
//!
//! The platform tag set is computed once at startup with
//! [`PlatformTags::detect`] and handed to everything that resolves options.

pub mod arch;
pub mod os;
pub mod paths;
pub mod tags;

pub use tags::{PlatformTags, applies};

use std::fmt;

/// Platform identifier combining architecture and OS tags (e.g., "aarch64-darwin")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
  pub arch: &'static str,
  pub os: &'static str,
}

impl Platform {
  /// Detect the current platform at runtime
  pub fn current() -> Self {
    Self {
      arch: arch::arch_tag(),
      os: os::os_tag(),
    }
  }

  /// Returns the platform triple string (e.g., "aarch64-darwin")
  pub fn triple(&self) -> String {
    format!("{}-{}", self.arch, self.os)
  }

  /// The tag set used to evaluate option clauses on this platform
  pub fn tags(&self) -> PlatformTags {
    PlatformTags::new([self.arch, self.os])
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.triple())
  }
}

//! Well-known names shared across the crate.

pub const APP_NAME: &str = "depforge";

/// Environment variable overriding the root directory.
pub const ROOT_ENV: &str = "DEPFORGE_ROOT";

/// Environment variable overriding the download cache directory.
pub const CACHE_DIR_ENV: &str = "DEPFORGE_CACHE_DIR";

/// Descriptor file in the line format, read first.
pub const DEPS_TEXT_FILE: &str = "deps.txt";

/// Descriptor file in the JSON format, read when the line format fails.
pub const DEPS_JSON_FILE: &str = "deps.json";

pub const INSTALL_DIR_NAME: &str = "third_party";
pub const CACHE_DIR_NAME: &str = "third_party_cache";

/// Ledger of installed packages inside the install root.
pub const LEDGER_FILE: &str = "installed.txt";

/// Lock file guarding the install root against concurrent runs.
pub const LOCK_FILE: &str = ".lock";

/// Entries of the install root shared by every package. A package's working
/// directory is `<install>/<name>` and is deleted afterwards, so no package
/// may be named after one of these.
pub const RESERVED_INSTALL_ENTRIES: [&str; 8] = [
  "include",
  "lib",
  "lib64",
  "bin",
  "share",
  "log",
  LEDGER_FILE,
  LOCK_FILE,
];

/// Generated attribution header, relative to the install root.
pub const ATTRIBUTION_HEADER: &str = "include/attribution.h";

/// Prefix of per-package attribution fragments in the install root.
pub const ATTRIBUTION_FRAGMENT_PREFIX: &str = "attrib.";

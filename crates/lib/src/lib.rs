//! depforge-lib: fetch, build and install third-party source packages.
//!
//! A run reads a descriptor list (`deps.txt`, or `deps.json` as a fallback),
//! validates it into [`package::PackageRecord`]s and drives each one through
//! [`pipeline::Pipeline`]: download into a shared cache, unpack, build with
//! the strategy matching its kind, harvest its license, and record it in the
//! install ledger so the next run can skip it.
//!
//! - [`descriptor`]: the line and JSON descriptor formats
//! - [`package`]: typed package records and option resolution
//! - [`platform`]: platform tags and directory layout
//! - [`fetch`]: downloads and archive extraction
//! - [`build`]: build strategies and the tool runner
//! - [`attribution`]: license fragments and the attribution header
//! - [`ledger`]: the install ledger

pub mod attribution;
pub mod build;
pub mod consts;
pub mod descriptor;
pub mod fetch;
pub mod install_lock;
pub mod ledger;
pub mod package;
pub mod pipeline;
pub mod platform;
pub mod util;

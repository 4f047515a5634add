//! Shared utilities.

pub mod fs;

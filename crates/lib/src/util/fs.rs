//! Filesystem helpers shared by the build strategies and the pipeline.

use std::fs;
use std::io;
use std::path::Path;

use walkdir::WalkDir;

/// Copy the tree under `src` into `dst`, creating `dst` and any missing
/// parents. Symlinks are copied as the files they point to.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> io::Result<()> {
  fs::create_dir_all(dst)?;
  for entry in WalkDir::new(src).min_depth(1).follow_links(true) {
    let entry = entry.map_err(io::Error::other)?;
    let relative = entry.path().strip_prefix(src).map_err(io::Error::other)?;
    let target = dst.join(relative);
    if entry.file_type().is_dir() {
      fs::create_dir_all(&target)?;
    } else {
      fs::copy(entry.path(), &target)?;
    }
  }
  Ok(())
}

/// Remove a file or directory tree. A missing path is not an error.
pub fn remove_path(path: &Path) -> io::Result<()> {
  let metadata = match path.symlink_metadata() {
    Ok(metadata) => metadata,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
    Err(e) => return Err(e),
  };
  if metadata.is_dir() {
    fs::remove_dir_all(path)
  } else {
    fs::remove_file(path)
  }
}

use tracing::info;

use super::{BuildContext, BuildError, CommandRunner};
use crate::util::fs::{copy_dir_recursive, remove_path};

/// Copy `<unpack>/<interface>` to `<install>/include/<name>`, replacing any
/// previous copy.
pub(super) fn install<R: CommandRunner>(ctx: &BuildContext<'_, R>, interface: &str) -> Result<(), BuildError> {
  let record = ctx.record;
  let source = record.paths.unpack_dir.join(interface);
  if !source.is_dir() {
    return Err(BuildError::MissingInterface {
      name: record.name.clone(),
      path: source,
    });
  }

  let dest = ctx.install_root.join("include").join(&record.name);
  let io_err = |source| BuildError::Io {
    name: record.name.clone(),
    path: dest.clone(),
    source,
  };

  remove_path(&dest).map_err(io_err)?;
  info!(package = %record.name, from = %source.display(), to = %dest.display(), "copying headers");
  copy_dir_recursive(&source, &dest).map_err(io_err)
}

use super::{BuildContext, BuildError, CommandRunner, SearchQuery, ToolCommand, parent_dir};

const CMAKE: &str = "cmake";

pub(super) async fn build<R: CommandRunner>(ctx: &BuildContext<'_, R>) -> Result<(), BuildError> {
  let lists = ctx.find("locating CMakeLists.txt", &SearchQuery::exact("CMakeLists.txt"))?;
  let source_dir = parent_dir(&lists);
  let build_dir = ctx.record.paths.build_dir.display().to_string();
  let prefix = ctx.prefix();

  let mut defines: Vec<String> = [
    ("CMAKE_INSTALL_PREFIX", prefix.as_str()),
    ("CMAKE_PREFIX_PATH", prefix.as_str()),
    ("CMAKE_SYSTEM_PREFIX_PATH", prefix.as_str()),
    ("CMAKE_POSITION_INDEPENDENT_CODE", "ON"),
    ("CMAKE_FIND_ROOT_PATH", prefix.as_str()),
    ("CMAKE_BUILD_TYPE", "Release"),
  ]
  .iter()
  .map(|(key, value)| format!("-D{key}={value}"))
  .collect();
  for option in &ctx.record.options {
    defines.push(define(&ctx.record.name, option)?);
  }

  let cwd = ctx.record.paths.build_dir.clone();
  ctx
    .run(
      "cmake configure",
      ToolCommand::new(CMAKE, &cwd)
        .args(["-S".to_string(), source_dir.display().to_string()])
        .args(["-B", build_dir.as_str()])
        .args(defines),
    )
    .await?;

  ctx
    .run(
      "cmake build",
      ToolCommand::new(CMAKE, &cwd).args(["--build".to_string(), build_dir.clone(), "-j".to_string(), ctx.jobs.to_string()]),
    )
    .await?;

  ctx
    .run(
      "cmake install",
      ToolCommand::new(CMAKE, &cwd).args(["--build", build_dir.as_str(), "--target", "install"]),
    )
    .await
}

/// Turn one descriptor option into a cache definition.
///
/// `KEY VALUE` becomes `-DKEY=VALUE`; `KEY=VALUE` and `-DKEY=VALUE` are
/// taken as written.
fn define(package: &str, option: &str) -> Result<String, BuildError> {
  let option = option.trim();
  if option.starts_with("-D") {
    return Ok(option.to_string());
  }
  if let Some((key, _)) = option.split_once('=')
    && !key.trim().is_empty()
    && !key.contains(char::is_whitespace)
  {
    return Ok(format!("-D{option}"));
  }
  match option.split_once(char::is_whitespace) {
    Some((key, value)) if !value.trim().is_empty() => Ok(format!("-D{key}={}", value.trim())),
    _ => Err(BuildError::InvalidOption {
      name: package.to_string(),
      option: option.to_string(),
    }),
  }
}

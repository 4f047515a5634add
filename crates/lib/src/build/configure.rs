use super::{BuildContext, BuildError, CommandRunner, SearchQuery, ToolCommand, parent_dir};

pub(super) async fn build<R: CommandRunner>(ctx: &BuildContext<'_, R>, target: Option<&str>) -> Result<(), BuildError> {
  // OpenSSL ships `Configure` rather than `configure`.
  let script = ctx
    .find("locating configure script", &SearchQuery::exact("configure"))
    .or_else(|_| ctx.find("locating configure script", &SearchQuery::exact("Configure")))?;
  let script_dir = parent_dir(&script);
  let script_name = script
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_else(|| "configure".to_string());

  ctx
    .run(
      "configure",
      ToolCommand::new(format!("./{script_name}"), &script_dir)
        .arg(format!("--prefix={}", ctx.prefix()))
        .args(ctx.record.options.iter().cloned()),
    )
    .await?;

  ctx
    .run(
      "make",
      ToolCommand::new("make", &script_dir).args([format!("-j{}", ctx.jobs), target.unwrap_or("all").to_string()]),
    )
    .await?;

  ctx
    .run("make install", ToolCommand::new("make", &script_dir).arg("install"))
    .await
}

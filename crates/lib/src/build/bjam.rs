use super::{BuildContext, BuildError, CommandRunner, SearchQuery, ToolCommand, parent_dir};

pub(super) async fn build<R: CommandRunner>(ctx: &BuildContext<'_, R>) -> Result<(), BuildError> {
  let bootstrap = ctx.find("locating bootstrap.sh", &SearchQuery::exact("bootstrap.sh"))?;
  let dir = parent_dir(&bootstrap);

  ctx
    .run("bootstrap", ToolCommand::new("sh", &dir).arg("./bootstrap.sh"))
    .await?;

  ctx
    .run(
      "b2 install",
      ToolCommand::new("./b2", &dir)
        .args(ctx.record.options.iter().cloned())
        .args([format!("--prefix={}", ctx.prefix()), "install".to_string()]),
    )
    .await
}

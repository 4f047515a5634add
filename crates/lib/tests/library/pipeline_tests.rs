//! End-to-end runs of the install pipeline with fake fetchers and runners.

use std::fs;

use depforge_lib::descriptor::{AttrValue, RawRecord};
use depforge_lib::ledger::url_hash;
use depforge_lib::package::{PackageKind, ValidationError};
use depforge_lib::pipeline::{PackageError, Pipeline, PipelineError, RunOptions};

use super::common::{FakeFetcher, FakeRunner, TestEnv, darwin, linux, records};

const FOO_URL: &str = "https://example.com/dl/foo-1.0.tar.gz";
const BAR_URL: &str = "https://example.com/dl/bar-2.1.tar.gz";

const FOO_DEPS: &str = "\
- foo
type : header
src : https://example.com/dl/foo-1.0.tar.gz
interface : foo-1.0/include/foo
";

fn foo_fetcher() -> FakeFetcher {
  FakeFetcher::default().with_tree(
    FOO_URL,
    &[
      ("foo-1.0/include/foo/foo.h", "#pragma once\nint foo();\n"),
      ("foo-1.0/LICENSE", "MIT License\n"),
      ("foo-1.0/src/license.cpp", "// not a license\n"),
    ],
  )
}

#[tokio::test]
async fn header_only_package_is_installed_end_to_end() {
  let env = TestEnv::new();
  let pipeline = env.pipeline(foo_fetcher(), FakeRunner::default());

  let report = pipeline.run(&records(FOO_DEPS), &RunOptions::default()).await.unwrap();

  assert!(report.is_success());
  assert_eq!(report.installed, vec!["foo"]);
  assert!(report.warnings.is_empty());

  let install = &env.layout.install_root;
  assert_eq!(
    fs::read_to_string(install.join("include/foo/foo.h")).unwrap(),
    "#pragma once\nint foo();\n"
  );
  assert_eq!(env.ledger_text(), format!("foo:{}\n", url_hash(FOO_URL)));
  assert!(!install.join("foo").exists(), "working directory is cleaned up");
  assert!(env.layout.cache_dir.join("foofoo-1.0.tar.gz").is_file(), "archive stays cached");
  assert!(pipeline.runner().programs().is_empty());

  let header = fs::read_to_string(report.attribution.unwrap()).unwrap();
  assert!(header.contains("This software may include the package foo.\nThis package has the following license:\nMIT License\n"));
}

#[tokio::test]
async fn rerun_skips_installed_packages() {
  let env = TestEnv::new();
  let pipeline = env.pipeline(foo_fetcher(), FakeRunner::default());
  let raws = records(FOO_DEPS);

  let first = pipeline.run(&raws, &RunOptions::default()).await.unwrap();
  let second = pipeline.run(&raws, &RunOptions::default()).await.unwrap();

  assert_eq!(first.installed, vec!["foo"]);
  assert!(second.installed.is_empty());
  assert_eq!(second.skipped, vec!["foo"]);
  assert_eq!(pipeline.fetcher().fetch_count(), 1);
  assert_eq!(env.ledger_text().lines().count(), 1);
  assert!(second.attribution.unwrap().is_file());
}

#[tokio::test]
async fn force_rebuilds_and_appends_to_ledger() {
  let env = TestEnv::new();
  let pipeline = env.pipeline(foo_fetcher(), FakeRunner::default());
  let raws = records(FOO_DEPS);
  let force = RunOptions {
    force: true,
    ..RunOptions::default()
  };

  pipeline.run(&raws, &RunOptions::default()).await.unwrap();
  let report = pipeline.run(&raws, &force).await.unwrap();

  assert_eq!(report.installed, vec!["foo"]);
  assert_eq!(pipeline.fetcher().fetch_count(), 2);
  assert_eq!(env.ledger_text().lines().count(), 2);
}

#[tokio::test]
async fn changed_source_url_triggers_rebuild() {
  let env = TestEnv::new();
  let fetcher = foo_fetcher().with_tree(
    "https://example.com/dl/foo-1.1.tar.gz",
    &[("foo-1.1/include/foo/foo.h", "// 1.1\n")],
  );
  let pipeline = env.pipeline(fetcher, FakeRunner::default());

  pipeline.run(&records(FOO_DEPS), &RunOptions::default()).await.unwrap();
  let updated = FOO_DEPS.replace("1.0", "1.1");
  let report = pipeline.run(&records(&updated), &RunOptions::default()).await.unwrap();

  assert_eq!(report.installed, vec!["foo"]);
  assert_eq!(
    fs::read_to_string(env.layout.install_root.join("include/foo/foo.h")).unwrap(),
    "// 1.1\n"
  );
  assert!(report.warnings.len() == 1, "1.1 ships no license");
}

#[tokio::test]
async fn unsupported_type_aborts_before_side_effects() {
  let env = TestEnv::new();
  let marker = env.layout.install_root.join("keep.txt");
  fs::create_dir_all(&env.layout.install_root).unwrap();
  fs::write(&marker, "previous install").unwrap();

  let deps = format!("{FOO_DEPS}\n- weird\ntype : meson\nsrc : {BAR_URL}\n");
  let pipeline = env.pipeline(foo_fetcher(), FakeRunner::default());
  let purge = RunOptions {
    purge: true,
    ..RunOptions::default()
  };

  let err = pipeline.run(&records(&deps), &purge).await.unwrap_err();

  assert!(matches!(
    err,
    PipelineError::Validation(ValidationError::UnknownKind { ref name, .. }) if name == "weird"
  ));
  assert_eq!(pipeline.fetcher().fetch_count(), 0);
  assert!(marker.exists(), "purge must not run for an invalid list");
  assert!(!env.layout.install_root.join("include").exists());
  assert!(!env.layout.cache_dir.exists());
}

#[tokio::test]
async fn package_named_after_shared_directory_is_rejected_before_side_effects() {
  let env = TestEnv::new();
  let deps = format!(
    "{FOO_DEPS}\n- include\ntype : header\nsrc : {BAR_URL}\ninterface : bar-2.1/include\n"
  );
  let fetcher = foo_fetcher().with_tree(BAR_URL, &[("bar-2.1/include/b.h", "// b\n")]);
  let pipeline = env.pipeline(fetcher, FakeRunner::default());

  let err = pipeline.run(&records(&deps), &RunOptions::default()).await.unwrap_err();

  assert!(matches!(
    err,
    PipelineError::Validation(ValidationError::InvalidName { ref name, .. }) if name == "include"
  ));
  assert_eq!(pipeline.fetcher().fetch_count(), 0);
  assert!(!env.layout.install_root.exists());
}

#[tokio::test]
async fn package_name_cannot_escape_the_install_root() {
  let env = TestEnv::new();
  let victim = env.temp.path().join("precious/data.txt");
  fs::create_dir_all(victim.parent().unwrap()).unwrap();
  fs::write(&victim, "keep me").unwrap();

  let raw = RawRecord::new("../precious")
    .with("type", AttrValue::Single("header".into()))
    .with("src", AttrValue::Single(FOO_URL.into()))
    .with("interface", AttrValue::Single("foo-1.0/include/foo".into()));
  let pipeline = env.pipeline(foo_fetcher(), FakeRunner::default());

  let err = pipeline.run(&[raw], &RunOptions::default()).await.unwrap_err();

  assert!(matches!(err, PipelineError::Validation(ValidationError::InvalidName { .. })));
  assert_eq!(fs::read_to_string(&victim).unwrap(), "keep me");
  assert!(!env.layout.ledger_path().exists());
}

#[tokio::test]
async fn failed_package_does_not_stop_the_run() {
  let env = TestEnv::new();
  let deps = format!("- bar\ntype : cmake\nsrc : {BAR_URL}\n\n{FOO_DEPS}");
  let fetcher = foo_fetcher().with_tree(
    BAR_URL,
    &[("bar-2.1/CMakeLists.txt", "project(bar)\n"), ("bar-2.1/COPYING", "GPL\n")],
  );
  let pipeline = env.pipeline(fetcher, FakeRunner::failing(&["cmake"]));

  let report = pipeline.run(&records(&deps), &RunOptions::default()).await.unwrap();

  assert!(!report.is_success());
  assert_eq!(report.failed_names(), vec!["bar"]);
  assert!(matches!(report.failed[0].error, PackageError::Build(_)));
  assert_eq!(report.installed, vec!["foo"]);
  assert!(!env.layout.install_root.join("bar").exists(), "failed package dir is removed");
  assert!(env.layout.install_root.join("log/bar").is_dir(), "logs are kept");
  assert_eq!(env.ledger_text(), format!("foo:{}\n", url_hash(FOO_URL)));
  assert!(report.attribution.unwrap().is_file(), "header is merged after failures");
}

#[tokio::test]
async fn fetch_failure_is_isolated() {
  let env = TestEnv::new();
  let deps = format!("- bar\ntype : cmake\nsrc : {BAR_URL}\n\n{FOO_DEPS}");
  let pipeline = env.pipeline(foo_fetcher(), FakeRunner::default());

  let report = pipeline.run(&records(&deps), &RunOptions::default()).await.unwrap();

  assert_eq!(report.failed_names(), vec!["bar"]);
  assert!(matches!(report.failed[0].error, PackageError::Fetch(_)));
  assert_eq!(report.installed, vec!["foo"]);
  assert!(pipeline.runner().programs().is_empty());
}

#[tokio::test]
async fn cmake_package_runs_all_three_steps() {
  let env = TestEnv::new();
  let deps = format!("- bar\ntype : cmake\nsrc : {BAR_URL}\noptions :\n    BAR_TESTS OFF\n");
  let fetcher = FakeFetcher::default().with_tree(BAR_URL, &[("bar-2.1/CMakeLists.txt", "project(bar)\n")]);
  let pipeline = env.pipeline(fetcher, FakeRunner::default());

  let report = pipeline.run(&records(&deps), &RunOptions::default()).await.unwrap();

  assert_eq!(report.installed, vec!["bar"]);
  assert_eq!(pipeline.runner().programs(), vec!["cmake", "cmake", "cmake"]);
  let commands = pipeline.runner().commands.lock().unwrap().clone();
  assert!(commands[0].args.contains(&"-DBAR_TESTS=OFF".to_string()));
  assert_eq!(commands[1].args[2..], ["-j".to_string(), "2".to_string()]);
  assert_eq!(report.warnings.len(), 1, "bar ships no license");
}

#[tokio::test]
async fn purge_clears_install_root_but_keeps_cache() {
  let env = TestEnv::new();
  let pipeline = env.pipeline(foo_fetcher(), FakeRunner::default());
  let raws = records(FOO_DEPS);
  pipeline.run(&raws, &RunOptions::default()).await.unwrap();
  let stale = env.layout.install_root.join("lib/libstale.a");
  fs::create_dir_all(stale.parent().unwrap()).unwrap();
  fs::write(&stale, "x").unwrap();

  let purge = RunOptions {
    purge: true,
    ..RunOptions::default()
  };
  let report = pipeline.run(&raws, &purge).await.unwrap();

  assert_eq!(report.installed, vec!["foo"]);
  assert!(!stale.exists());
  assert_eq!(env.ledger_text().lines().count(), 1);
  assert!(env.temp.path().join("third_party_cache").is_dir());
}

#[tokio::test]
async fn package_filter_selects_one_package() {
  let env = TestEnv::new();
  let deps = format!("- bar\ntype : cmake\nsrc : {BAR_URL}\n\n{FOO_DEPS}");
  let pipeline = env.pipeline(foo_fetcher(), FakeRunner::default());

  let only_foo = RunOptions {
    package: Some("foo".into()),
    ..RunOptions::default()
  };
  let report = pipeline.run(&records(&deps), &only_foo).await.unwrap();
  assert_eq!(report.installed, vec!["foo"]);
  assert_eq!(pipeline.fetcher().fetch_count(), 1);

  let unknown = RunOptions {
    package: Some("baz".into()),
    ..RunOptions::default()
  };
  let err = pipeline.run(&records(&deps), &unknown).await.unwrap_err();
  assert!(matches!(err, PipelineError::UnknownPackage(ref name) if name == "baz"));
}

const CLAUSE_DEPS: &str = "\
- lib
type : cmake
src : https://example.com/lib.tar.gz
options :
    COMMON ON
options+linux :
    USE_EPOLL ON
options+darwin :
    USE_KQUEUE ON
options+!darwin :
    NOT_DARWIN ON
options+x86_64+!windows :
    SSE ON
";

#[test]
fn plan_resolves_option_clauses_per_platform() {
  let env = TestEnv::new();

  let on_linux = Pipeline::new(env.layout.clone(), linux(), FakeFetcher::default(), FakeRunner::default());
  let plan = on_linux.plan(&records(CLAUSE_DEPS), None).unwrap();
  assert_eq!(plan[0].options, vec!["COMMON ON", "USE_EPOLL ON", "NOT_DARWIN ON", "SSE ON"]);

  let on_darwin = Pipeline::new(env.layout.clone(), darwin(), FakeFetcher::default(), FakeRunner::default());
  let plan = on_darwin.plan(&records(CLAUSE_DEPS), None).unwrap();
  assert_eq!(plan[0].options, vec!["COMMON ON", "USE_KQUEUE ON", "SSE ON"]);
}

#[tokio::test]
async fn plan_reports_state_without_side_effects() {
  let env = TestEnv::new();
  let pipeline = env.pipeline(foo_fetcher(), FakeRunner::default());
  let raws = records(FOO_DEPS);

  let before = pipeline.plan(&raws, None).unwrap();
  assert_eq!(before[0].kind, PackageKind::HeaderOnly);
  assert!(!before[0].installed);
  assert!(!before[0].cached);
  assert!(!env.layout.install_root.exists());

  pipeline.run(&raws, &RunOptions::default()).await.unwrap();

  let after = pipeline.plan(&raws, None).unwrap();
  assert!(after[0].installed);
  assert!(after[0].cached);
}

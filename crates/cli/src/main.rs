mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use depforge_lib::platform::paths::Layout;

use crate::output::{OutputFormat, print_error};

/// depforge - fetch, build and install third-party dependencies
#[derive(Parser)]
#[command(name = "depforge")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Directory holding deps.txt / deps.json (default: $DEPFORGE_ROOT, then the executable's directory)
  #[arg(long, global = true)]
  root: Option<PathBuf>,

  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Download, build and install every declared package
  Install {
    /// Only install this package
    #[arg(short, long)]
    package: Option<String>,

    /// Delete the install directory before installing (the download cache is kept)
    #[arg(long)]
    purge: bool,

    /// Rebuild packages that are already installed
    #[arg(short, long)]
    force: bool,

    /// Parallel jobs for make and cmake (default: number of CPUs)
    #[arg(short, long)]
    jobs: Option<usize>,
  },

  /// Show resolved options and install state without changing anything
  Plan {
    /// Only show this package
    #[arg(short, long)]
    package: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },

  /// Show platform tags and directories
  Info {
    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },
}

fn main() {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  if let Err(err) = run(cli) {
    print_error(&format!("{err:#}"));
    std::process::exit(1);
  }
}

fn run(cli: Cli) -> Result<()> {
  let layout = Layout::resolve(cli.root.as_deref()).context("Failed to resolve the root directory")?;

  match cli.command {
    Commands::Install {
      package,
      purge,
      force,
      jobs,
    } => cmd::cmd_install(
      &layout,
      cmd::InstallArgs {
        package,
        purge,
        force,
        jobs,
      },
    ),
    Commands::Plan { package, output } => cmd::cmd_plan(&layout, package.as_deref(), output),
    Commands::Info { output } => cmd::cmd_info(&layout, output),
  }
}

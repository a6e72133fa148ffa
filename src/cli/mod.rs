//! Command-line interface for `repograph`.
//!
//! # Commands
//!
//! - `resolve` - Resolve an artifact and print its graph (tree, JSON or list)
//! - `classpath` - Print the effective dependencies in install order
//!
//! # Global options
//!
//! - `--verbose` / `-v` - Debug logging
//! - `--quiet` / `-q` - Errors only, no progress or summary
//! - `--config` / `-c` - Resolver configuration file
//! - `--no-progress` - Hide the spinner
//! - `--max-parallel` - Concurrent model loads per pass
//! - `--timeout` - Abort resolution after this many seconds
//!
//! `RUST_LOG` overrides the log level chosen by `--verbose`/`--quiet`.

mod classpath;
pub mod common;
mod resolve;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use common::CliConfig;
pub use resolve::OutputFormat;

#[derive(Parser)]
#[command(
    name = "repograph",
    about = "Resolve Maven-style artifact dependency graphs",
    version,
    long_about = "repograph expands an artifact's project model into a full dependency graph: \
                  nearest-version conflict mediation, relocations, exclusions, optional and \
                  cycle edges."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to the resolver configuration (default: ~/.repograph/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Disable the progress spinner
    #[arg(long, global = true)]
    no_progress: bool,

    /// Maximum concurrent model loads
    #[arg(long, global = true)]
    max_parallel: Option<usize>,

    /// Resolution timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve an artifact and print its dependency graph
    Resolve(resolve::ResolveCommand),
    /// Print the effective dependencies in install order
    Classpath(classpath::ClasspathCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        config.init_logging();
        self.execute_with_config(config).await
    }

    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            Some("error".to_string())
        } else {
            None
        };

        CliConfig {
            log_level,
            quiet: self.quiet,
            no_progress: self.no_progress,
            config_path: self.config.clone(),
            max_parallel: self.max_parallel,
            timeout_secs: self.timeout,
        }
    }

    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        match self.command {
            Commands::Resolve(cmd) => cmd.execute(&config).await,
            Commands::Classpath(cmd) => cmd.execute(&config).await,
        }
    }
}

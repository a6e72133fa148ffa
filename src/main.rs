//! repograph - Maven-style dependency graph resolver
//!
//! Entry point for the command-line tool. See the `cli` module for the commands.

use anyhow::Result;
use clap::Parser;
use repograph_cli::cli;
use repograph_cli::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}

//! Configuration for the resolver and the `repograph` binary.
//!
//! Settings live in a single TOML file:
//!
//! - Unix/macOS: `~/.repograph/config.toml`
//! - Windows: `%LOCALAPPDATA%\repograph\config.toml`
//!
//! `--config <path>` on the command line replaces the default location. A
//! missing default file means "all defaults"; see [`ResolverConfig`] for the
//! fields. Command-line flags such as `--max-parallel` and `--timeout` are
//! applied on top of the loaded values.

mod parser;
mod resolver;

pub use parser::parse_config;
pub use resolver::{ModelErrorPolicy, ResolverConfig};

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Expand `~` and environment variables in a user-supplied path.
///
/// ```rust
/// use repograph_cli::config::expand_path;
///
/// let path = expand_path("/srv/repository").unwrap();
/// assert_eq!(path, std::path::PathBuf::from("/srv/repository"));
/// ```
pub fn expand_path(raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(raw).with_context(|| format!("Failed to expand path: {raw}"))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

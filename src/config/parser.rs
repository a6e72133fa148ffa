//! Generic TOML file parsing.

use anyhow::{Context, Result};
use std::path::Path;

/// Read a TOML file and deserialize it into `T`.
///
/// Errors carry the file path: "Failed to read config file: ..." for I/O
/// problems and "Failed to parse config file: ..." when the content does not
/// match `T`. The underlying error is kept as the cause.
///
/// ```rust,no_run
/// use repograph_cli::config::{ResolverConfig, parse_config};
/// use std::path::Path;
///
/// # fn example() -> anyhow::Result<()> {
/// let config: ResolverConfig = parse_config(Path::new("repograph.toml"))?;
/// println!("loading up to {} models at once", config.max_parallel);
/// # Ok(())
/// # }
/// ```
pub fn parse_config<T>(path: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: T = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    Ok(config)
}

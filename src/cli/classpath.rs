//! `repograph classpath`: effective dependencies in install order.
//!
//! ```bash
//! repograph classpath com.example:app:1.0 --repo ./repo
//! repograph classpath com.example:app:1.0 --repo ./repo --paths
//! ```

use anyhow::Result;
use clap::Args;

use crate::config::expand_path;
use crate::graph::install_order;

use super::common::{CliConfig, artifact_path, resolve_from_repository};

/// Print the effective dependencies, dependencies before their dependents.
#[derive(Args, Debug)]
pub struct ClasspathCommand {
    /// Root artifact as groupId:artifactId:version
    coordinate: String,

    /// Directory holding the project descriptors
    #[arg(short, long, env = "REPOGRAPH_REPO")]
    repo: String,

    /// Print artifact file paths joined with the platform path separator
    #[arg(long)]
    paths: bool,
}

impl ClasspathCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let resolved = resolve_from_repository(config, &self.repo, &self.coordinate).await?;
        let order = install_order(&resolved.graph)?;

        if self.paths {
            let repository = expand_path(&self.repo)?;
            let separator = if cfg!(windows) { ";" } else { ":" };
            let entries: Vec<String> = order
                .iter()
                .map(|coordinate| artifact_path(&repository, coordinate).display().to_string())
                .collect();
            println!("{}", entries.join(separator));
        } else {
            for coordinate in &order {
                println!("{coordinate}");
            }
        }
        Ok(())
    }
}

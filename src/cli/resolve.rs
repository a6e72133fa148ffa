//! `repograph resolve`: print the resolved dependency graph.
//!
//! ```bash
//! repograph resolve com.example:app:1.0 --repo ~/.m2/descriptors
//! repograph resolve com.example:app:1.0 --repo ./repo --format json
//! repograph resolve com.example:app:1.0 --repo ./repo --format list
//! ```

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;

use crate::graph::{GraphReport, effective_dependencies, render_tree};
use crate::resolver::Resolved;

use super::common::{CliConfig, resolve_from_repository};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Indented tree with disabled edges annotated
    #[default]
    Tree,
    /// Nodes and edges as JSON
    Json,
    /// Effective dependencies, one per line
    List,
}

/// Resolve an artifact and print its dependency graph.
#[derive(Args, Debug)]
pub struct ResolveCommand {
    /// Root artifact as groupId:artifactId:version
    coordinate: String,

    /// Directory holding the project descriptors
    #[arg(short, long, env = "REPOGRAPH_REPO")]
    repo: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Tree)]
    format: OutputFormat,
}

impl ResolveCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let resolved = resolve_from_repository(config, &self.repo, &self.coordinate).await?;
        print!("{}", render(&resolved, self.format)?);

        if !config.quiet && self.format != OutputFormat::Json {
            let summary = &resolved.summary;
            eprintln!(
                "{} {} artifacts in {} passes ({} conflicts omitted, {} unresolved)",
                "Resolved".green().bold(),
                effective_dependencies(&resolved.graph).len(),
                summary.passes,
                summary.conflicts,
                summary.failed.len()
            );
        }
        Ok(())
    }
}

fn render(resolved: &Resolved, format: OutputFormat) -> Result<String> {
    let graph = &resolved.graph;
    Ok(match format {
        OutputFormat::Tree => render_tree(graph),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(&GraphReport::from(graph))
                .context("Failed to serialize graph report")?;
            json.push('\n');
            json
        }
        OutputFormat::List => effective_dependencies(graph)
            .iter()
            .map(|coordinate| format!("{coordinate}\n"))
            .collect(),
    })
}

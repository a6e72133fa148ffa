//! Setup shared by the resolution commands.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::config::{ResolverConfig, expand_path};
use crate::coordinate::VersionedReference;
use crate::events::{GraphListener, LoggingListener};
use crate::model::{CachingModelLoader, FileModelLoader};
use crate::resolver::{Cancellation, GraphBuilder, GraphResolver, Resolved};
use crate::utils::ProgressListener;

/// Global settings derived from the top-level flags.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// `EnvFilter` directive, `None` to defer to `RUST_LOG`.
    pub log_level: Option<String>,
    pub quiet: bool,
    pub no_progress: bool,
    pub config_path: Option<PathBuf>,
    pub max_parallel: Option<usize>,
    pub timeout_secs: Option<u64>,
}

impl CliConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the stderr `tracing` subscriber. `RUST_LOG` wins over the flags.
    pub fn init_logging(&self) {
        let filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new(self.log_level.as_deref().unwrap_or("warn")),
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }

    /// Configuration file values with the command-line overrides applied.
    pub fn resolver_config(&self) -> Result<ResolverConfig> {
        let mut config = ResolverConfig::load_with_optional(self.config_path.as_deref())?;
        if let Some(max_parallel) = self.max_parallel {
            config.max_parallel = max_parallel;
        }
        if let Some(timeout) = self.timeout_secs {
            config.timeout_secs = Some(timeout);
        }
        config.validate().context("Invalid command-line options")?;
        Ok(config)
    }

    pub fn show_progress(&self) -> bool {
        !self.no_progress && !self.quiet
    }
}

/// Resolve `coordinate` against the descriptor repository at `repo`.
///
/// Ctrl-C and `timeout_secs` cancel the resolution. Nodes that could not be
/// loaded are reported as warnings on stderr.
pub async fn resolve_from_repository(
    config: &CliConfig,
    repo: &str,
    coordinate: &str,
) -> Result<Resolved> {
    let reference: VersionedReference = coordinate.parse()?;
    let repository = repository_root(repo)?;
    let resolver_config = config.resolver_config()?;

    let mut listeners: Vec<Arc<dyn GraphListener>> = vec![Arc::new(LoggingListener)];
    if config.show_progress() {
        listeners.push(Arc::new(ProgressListener::new()));
    }

    let cancel = match resolver_config.timeout_secs {
        Some(secs) => Cancellation::with_timeout(Duration::from_secs(secs)),
        None => Cancellation::new(),
    };
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let loader = CachingModelLoader::new(FileModelLoader::new(&repository));
    let resolver =
        GraphResolver::new(GraphBuilder::with_listeners(loader, resolver_config, listeners));
    let result = resolver.resolve(&reference, &cancel).await;
    interrupt.abort();

    let resolved = result.with_context(|| {
        format!("Failed to resolve {reference} from {}", repository.display())
    })?;

    if !config.quiet {
        for failure in &resolved.summary.failed {
            eprintln!("{} {}: {}", "warning:".yellow().bold(), failure.coordinate, failure.error);
        }
    }
    Ok(resolved)
}

fn repository_root(repo: &str) -> Result<PathBuf> {
    let path = expand_path(repo)?;
    if !path.is_dir() {
        anyhow::bail!("Repository directory not found: {}", path.display());
    }
    Ok(path)
}

/// Where the artifact file for `coordinate` lives in a Maven-style repository.
pub fn artifact_path(
    repository: &Path,
    coordinate: &crate::coordinate::ArtifactCoordinate,
) -> PathBuf {
    let mut path = repository.to_path_buf();
    for segment in coordinate.group_id.split('.') {
        path.push(segment);
    }
    path.push(&coordinate.artifact_id);
    path.push(&coordinate.version);

    let mut file = format!("{}-{}", coordinate.artifact_id, coordinate.version);
    if !coordinate.classifier.is_empty() {
        file.push('-');
        file.push_str(&coordinate.classifier);
    }
    file.push('.');
    file.push_str(&coordinate.artifact_type);
    path.push(file);
    path
}

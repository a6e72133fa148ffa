//! Resolver settings loaded from `~/.repograph/config.toml`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::coordinate::DEFAULT_TYPE;
use crate::core::GraphError;
use crate::model::TEST_SCOPE;

use super::parse_config;

/// What the resolve loop does when a non-root model fails to load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelErrorPolicy {
    /// Leave the node unresolved and keep going.
    #[default]
    Skip,
    /// Stop resolution with the load error.
    Abort,
}

/// Tuning knobs for graph resolution.
///
/// Every field has a default, so an empty file (or no file) is valid:
///
/// ```toml
/// max_parallel = 16
/// non_transitive_scopes = ["test", "provided"]
/// model_error_policy = "abort"
/// timeout_secs = 120
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Model loads in flight per resolution pass.
    pub max_parallel: usize,
    /// Events buffered per listener before new ones are dropped.
    pub event_queue_capacity: usize,
    /// Artifact type for references and dependencies that do not name one.
    pub default_type: String,
    /// Scopes that only propagate from the root project.
    pub non_transitive_scopes: Vec<String>,
    pub model_error_policy: ModelErrorPolicy,
    /// Extra attempts for transient (I/O) load failures.
    pub model_load_retries: usize,
    /// Overall deadline for one resolution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Upper bound on resolve-loop passes.
    pub max_passes: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_parallel: 8,
            event_queue_capacity: 1024,
            default_type: DEFAULT_TYPE.to_string(),
            non_transitive_scopes: vec![TEST_SCOPE.to_string()],
            model_error_policy: ModelErrorPolicy::Skip,
            model_load_retries: 2,
            timeout_secs: None,
            max_passes: 10_000,
        }
    }
}

impl ResolverConfig {
    /// `~/.repograph/config.toml`, or the local data directory on Windows.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("repograph")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".repograph")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Load from `path` if given, else from the default path.
    ///
    /// A missing default file yields the defaults; a missing explicit file is an
    /// error.
    pub fn load_with_optional(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => parse_config::<Self>(path)?,
            None => {
                let path = Self::default_path()?;
                if path.exists() {
                    parse_config::<Self>(&path)?
                } else {
                    tracing::debug!("No config at {}, using defaults", path.display());
                    Self::default()
                }
            }
        };

        config.validate().context("Invalid resolver configuration")?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), GraphError> {
        let invalid = |message: &str| {
            Err(GraphError::ConfigError {
                message: message.to_string(),
            })
        };

        if self.max_parallel == 0 {
            return invalid("max_parallel must be at least 1");
        }
        if self.event_queue_capacity == 0 {
            return invalid("event_queue_capacity must be at least 1");
        }
        if self.max_passes == 0 {
            return invalid("max_passes must be at least 1");
        }
        if self.default_type.trim().is_empty() {
            return invalid("default_type must not be empty");
        }
        if self.timeout_secs == Some(0) {
            return invalid("timeout_secs must be positive when set");
        }
        Ok(())
    }

    pub fn is_non_transitive(&self, scope: &str) -> bool {
        self.non_transitive_scopes.iter().any(|s| s == scope)
    }
}

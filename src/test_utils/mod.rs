//! Test utilities for repograph
//!
//! Helpers shared by unit and integration tests: one-time logging setup and
//! a [`ModelRepository`] fixture that writes TOML descriptors into a
//! temporary directory laid out the way [`FileModelLoader`] expects.
//!
//! # Example
//!
//! ```rust,no_run
//! use repograph_cli::model::{Dependency, ProjectModel};
//! use repograph_cli::test_utils::ModelRepository;
//!
//! let repo = ModelRepository::new().unwrap();
//! repo.add(&ProjectModel::new("g", "app", "1").with_dependency(Dependency::new("g", "lib", "1")))
//!     .unwrap();
//! let loader = repo.loader();
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Once;
use tempfile::TempDir;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::coordinate::VersionedReference;
use crate::model::{FileModelLoader, ProjectModel, StaticModelLoader};

pub use crate::events::{RecordedEvent, RecordingListener};

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has any effect. Uses `level` when given, otherwise
/// `RUST_LOG`; with neither set, tests run without a subscriber.
///
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// A descriptor repository in a temporary directory.
pub struct ModelRepository {
    temp_dir: TempDir,
}

impl ModelRepository {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Serialize `model` to its descriptor path. Returns the written path.
    pub fn add(&self, model: &ProjectModel) -> Result<PathBuf> {
        let reference =
            VersionedReference::new(&model.group_id, &model.artifact_id, &model.version);
        let content = toml::to_string(model).context("Failed to serialize project model")?;
        self.add_raw(&reference, &content)
    }

    /// Write `content` verbatim as the descriptor for `reference`.
    pub fn add_raw(&self, reference: &VersionedReference, content: &str) -> Result<PathBuf> {
        let path = self.loader().descriptor_path(reference);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    pub fn add_all<'a>(&self, models: impl IntoIterator<Item = &'a ProjectModel>) -> Result<()> {
        for model in models {
            self.add(model)?;
        }
        Ok(())
    }

    pub fn loader(&self) -> FileModelLoader {
        FileModelLoader::new(self.path())
    }
}

/// In-memory loader holding `models`.
pub fn static_loader(models: impl IntoIterator<Item = ProjectModel>) -> StaticModelLoader {
    models.into_iter().fold(StaticModelLoader::new(), StaticModelLoader::with_model)
}

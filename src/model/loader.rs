//! Model loader collaborators.
//!
//! The resolution engine only depends on the [`ModelLoader`] trait. Three
//! implementations ship with the crate:
//!
//! - [`StaticModelLoader`] - in-memory models, used by tests and embedders
//! - [`FileModelLoader`] - TOML descriptors in a Maven-style directory layout
//! - [`CachingModelLoader`] - memoizes successful loads of any inner loader
//!
//! Transient failures are retried with [`load_with_retry`].

use dashmap::DashMap;
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_retry::strategy::ExponentialBackoff;

use crate::coordinate::VersionedReference;
use crate::core::ModelLoadError;

use super::ProjectModel;

/// Turns a versioned reference into a project model.
///
/// Loading is the only suspension point of graph resolution; the engine may
/// run several loads concurrently but applies their results one at a time.
pub trait ModelLoader: Send + Sync {
    fn load_model(
        &self,
        reference: &VersionedReference,
    ) -> impl Future<Output = Result<ProjectModel, ModelLoadError>> + Send;
}

impl<L: ModelLoader> ModelLoader for Arc<L> {
    fn load_model(
        &self,
        reference: &VersionedReference,
    ) -> impl Future<Output = Result<ProjectModel, ModelLoadError>> + Send {
        (**self).load_model(reference)
    }
}

/// Load a model, retrying transient (I/O) failures with exponential backoff.
///
/// `retries` is the number of additional attempts after the first one.
pub async fn load_with_retry<L: ModelLoader>(
    loader: &L,
    reference: &VersionedReference,
    retries: usize,
) -> Result<ProjectModel, ModelLoadError> {
    let strategy =
        ExponentialBackoff::from_millis(10).max_delay(Duration::from_millis(500)).take(retries);

    RetryIf::spawn(
        strategy,
        || async {
            let result = loader.load_model(reference).await;
            if let Err(e) = &result {
                if e.is_transient() {
                    tracing::debug!("Transient model load failure for {}: {}", reference, e.reason);
                }
            }
            result
        },
        |e: &ModelLoadError| e.is_transient(),
    )
    .await
}

/// In-memory loader backed by a map of models.
///
/// Failures can be injected per reference; a failure registered with
/// `remaining > 0` is returned that many times before the model is served,
/// which simulates a flaky repository.
#[derive(Debug, Default)]
pub struct StaticModelLoader {
    models: HashMap<VersionedReference, ProjectModel>,
    failures: DashMap<VersionedReference, (ModelLoadError, usize)>,
    loads: AtomicUsize,
}

impl StaticModelLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model under the reference derived from its own coordinate.
    #[must_use]
    pub fn with_model(mut self, model: ProjectModel) -> Self {
        self.insert(model);
        self
    }

    pub fn insert(&mut self, model: ProjectModel) {
        let reference =
            VersionedReference::new(&model.group_id, &model.artifact_id, &model.version);
        self.models.insert(reference, model);
    }

    /// Fail the next `times` loads of `reference` with `error`.
    pub fn fail(&self, reference: &VersionedReference, error: ModelLoadError, times: usize) {
        self.failures.insert(reference.clone(), (error, times));
    }

    /// Number of `load_model` calls served so far (including failures).
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    fn lookup(&self, reference: &VersionedReference) -> Result<ProjectModel, ModelLoadError> {
        self.loads.fetch_add(1, Ordering::SeqCst);

        if let Some(mut entry) = self.failures.get_mut(reference) {
            let (error, remaining) = entry.value_mut();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(error.clone());
            }
        }

        self.models.get(reference).cloned().ok_or_else(|| ModelLoadError::not_found(reference))
    }
}

impl ModelLoader for StaticModelLoader {
    async fn load_model(
        &self,
        reference: &VersionedReference,
    ) -> Result<ProjectModel, ModelLoadError> {
        self.lookup(reference)
    }
}

/// Reads TOML project descriptors from a repository directory.
///
/// Layout: `<root>/<group/as/path>/<artifactId>/<version>/<artifactId>-<version>.toml`.
/// Coordinate fields missing from a descriptor are filled in from the reference;
/// fields that contradict the reference make the descriptor malformed.
#[derive(Debug, Clone)]
pub struct FileModelLoader {
    root: PathBuf,
}

impl FileModelLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the descriptor for `reference`.
    pub fn descriptor_path(&self, reference: &VersionedReference) -> PathBuf {
        let mut path = self.root.clone();
        for segment in reference.group_id.split('.') {
            path.push(segment);
        }
        path.push(&reference.artifact_id);
        path.push(&reference.version);
        path.push(format!("{}-{}.toml", reference.artifact_id, reference.version));
        path
    }
}

fn reconcile(
    reference: &VersionedReference,
    mut model: ProjectModel,
) -> Result<ProjectModel, ModelLoadError> {
    for (field, value, expected) in [
        ("group_id", &mut model.group_id, &reference.group_id),
        ("artifact_id", &mut model.artifact_id, &reference.artifact_id),
        ("version", &mut model.version, &reference.version),
    ] {
        if value.is_empty() {
            value.clone_from(expected);
        } else if value != expected {
            return Err(ModelLoadError::malformed(
                reference,
                format!("descriptor declares {field} '{value}' but was requested as '{expected}'"),
            ));
        }
    }
    Ok(model)
}

impl ModelLoader for FileModelLoader {
    async fn load_model(
        &self,
        reference: &VersionedReference,
    ) -> Result<ProjectModel, ModelLoadError> {
        let path = self.descriptor_path(reference);
        tracing::debug!("Loading descriptor {}", path.display());

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ModelLoadError::not_found(reference));
            }
            Err(e) => {
                return Err(ModelLoadError::io(reference, format!("{}: {}", path.display(), e)));
            }
        };

        let model: ProjectModel = toml::from_str(&content).map_err(|e| {
            ModelLoadError::malformed(reference, format!("{}: {}", path.display(), e))
        })?;

        reconcile(reference, model)
    }
}

/// Memoizes successful loads of an inner loader. Failures are never cached.
#[derive(Debug)]
pub struct CachingModelLoader<L> {
    inner: L,
    cache: DashMap<VersionedReference, ProjectModel>,
}

impl<L: ModelLoader> CachingModelLoader<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
        }
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }
}

impl<L: ModelLoader> ModelLoader for CachingModelLoader<L> {
    async fn load_model(
        &self,
        reference: &VersionedReference,
    ) -> Result<ProjectModel, ModelLoadError> {
        if let Some(model) = self.cache.get(reference) {
            return Ok(model.value().clone());
        }

        let model = self.inner.load_model(reference).await?;
        self.cache.insert(reference.clone(), model.clone());
        Ok(model)
    }
}

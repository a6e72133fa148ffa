//! Project models consumed by graph expansion.
//!
//! A [`ProjectModel`] is what the model loader returns for a
//! [`VersionedReference`](crate::coordinate::VersionedReference): its own coordinate,
//! an optional [`Relocation`], the dependency-management section and the direct
//! dependency list. The same shapes deserialize from the TOML descriptors read by
//! [`FileModelLoader`]:
//!
//! ```toml
//! group_id = "com.example"
//! artifact_id = "app"
//! version = "1.0"
//!
//! [[dependency_management]]
//! group_id = "com.example"
//! artifact_id = "lib"
//! version = "1.2"
//!
//! [[dependencies]]
//! group_id = "com.example"
//! artifact_id = "lib"
//! version = "1.0"
//! exclusions = [{ group_id = "commons-logging", artifact_id = "*" }]
//!
//! [[dependencies]]
//! group_id = "junit"
//! artifact_id = "junit"
//! version = "4.13"
//! scope = "test"
//! ```

pub mod loader;

pub use loader::{
    CachingModelLoader, FileModelLoader, ModelLoader, StaticModelLoader, load_with_retry,
};

use serde::{Deserialize, Serialize};

use crate::coordinate::{ArtifactCoordinate, management_key_of};

/// Scope used when a dependency does not declare one.
pub const DEFAULT_SCOPE: &str = "compile";

/// Scope that only propagates from the root project.
pub const TEST_SCOPE: &str = "test";

/// A `groupId:artifactId` pattern excluded from a dependency's subtree.
///
/// Either part may be `*` to match any value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Exclusion {
    pub group_id: String,
    pub artifact_id: String,
}

impl Exclusion {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
        }
    }

    /// The exclusion rendered as a management key (wildcards kept literally).
    pub fn management_key(&self) -> String {
        management_key_of(&self.group_id, &self.artifact_id)
    }
}

/// A dependency declaration, used both for direct dependencies and for
/// dependency-management entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub group_id: String,
    pub artifact_id: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub artifact_type: Option<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclusions: Vec<Exclusion>,
    /// Declared by a parent POM rather than by the project itself.
    #[serde(default)]
    pub from_parent: bool,
}

impl Dependency {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            scope: None,
            classifier: None,
            artifact_type: None,
            optional: false,
            exclusions: Vec::new(),
            from_parent: false,
        }
    }

    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    #[must_use]
    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }

    #[must_use]
    pub fn with_type(mut self, artifact_type: impl Into<String>) -> Self {
        self.artifact_type = Some(artifact_type.into());
        self
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    #[must_use]
    pub fn inherited(mut self) -> Self {
        self.from_parent = true;
        self
    }

    #[must_use]
    pub fn exclude(mut self, group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        self.exclusions.push(Exclusion::new(group_id, artifact_id));
        self
    }

    /// Declared scope, or `compile` when absent or blank.
    pub fn effective_scope(&self) -> &str {
        match self.scope.as_deref().map(str::trim) {
            Some(scope) if !scope.is_empty() => scope,
            _ => DEFAULT_SCOPE,
        }
    }

    pub fn management_key(&self) -> String {
        management_key_of(&self.group_id, &self.artifact_id)
    }

    /// Coordinate of the artifact this dependency points at, typed
    /// `default_type` when the dependency names no type.
    pub fn coordinate(&self, default_type: &str) -> ArtifactCoordinate {
        ArtifactCoordinate::new(&self.group_id, &self.artifact_id, self.version.trim())
            .with_classifier(self.classifier.as_deref())
            .with_type(self.artifact_type.as_deref().unwrap_or(default_type))
    }
}

/// Where a project has moved to. Blank fields keep the original value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Relocation {
    /// Overlay the non-blank relocation fields onto `coord`.
    pub fn apply(&self, coord: &ArtifactCoordinate) -> ArtifactCoordinate {
        fn pick(overlay: Option<&String>, original: &str) -> String {
            match overlay.map(|s| s.trim()) {
                Some(value) if !value.is_empty() => value.to_string(),
                _ => original.to_string(),
            }
        }

        ArtifactCoordinate {
            group_id: pick(self.group_id.as_ref(), &coord.group_id),
            artifact_id: pick(self.artifact_id.as_ref(), &coord.artifact_id),
            version: pick(self.version.as_ref(), &coord.version),
            classifier: coord.classifier.clone(),
            artifact_type: coord.artifact_type.clone(),
        }
    }
}

/// A loaded project model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectModel {
    #[serde(default)]
    pub group_id: String,
    #[serde(default)]
    pub artifact_id: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relocation: Option<Relocation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependency_management: Vec<Dependency>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
}

impl ProjectModel {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_dependency(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    #[must_use]
    pub fn with_managed(mut self, dependency: Dependency) -> Self {
        self.dependency_management.push(dependency);
        self
    }

    #[must_use]
    pub fn relocated_to(mut self, relocation: Relocation) -> Self {
        self.relocation = Some(relocation);
        self
    }

    /// The relocation, if it changes at least one field.
    pub fn effective_relocation(&self) -> Option<&Relocation> {
        self.relocation.as_ref().filter(|r| {
            [&r.group_id, &r.artifact_id, &r.version]
                .iter()
                .any(|field| field.as_deref().is_some_and(|v| !v.trim().is_empty()))
        })
    }
}

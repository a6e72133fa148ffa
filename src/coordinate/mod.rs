//! Artifact coordinates and the key codec used for graph identity.
//!
//! Every node and edge endpoint in a [`Graph`](crate::graph::Graph) is identified by an
//! [`ArtifactCoordinate`]. Two string keys are derived from a coordinate:
//!
//! - the **full key** (`groupId:artifactId:version:classifier:type`), used as the node
//!   identity inside a graph, and
//! - the **management key** (`groupId:artifactId`), used to match dependency-management
//!   entries, exclusions, conflicts and cycles irrespective of version.
//!
//! The full key always has five colon-separated segments, even when the classifier is
//! empty. Any `%` or `:` inside a field is percent-escaped so that distinct coordinates
//! never render to the same key.
//!
//! # Examples
//!
//! ```rust
//! use repograph_cli::coordinate::{ArtifactCoordinate, full_key, management_key};
//!
//! let coord = ArtifactCoordinate::new("com.example", "lib", "1.0");
//! assert_eq!(full_key(&coord), "com.example:lib:1.0::jar");
//! assert_eq!(management_key(&coord), "com.example:lib");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Artifact type assumed when a dependency or reference does not name one.
pub const DEFAULT_TYPE: &str = "jar";

/// Immutable `(groupId, artifactId, version, classifier, type)` tuple.
///
/// The classifier is normalized to the empty string when absent, so `None` and
/// `Some("")` never produce two different coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactCoordinate {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    #[serde(default)]
    pub classifier: String,
    #[serde(default = "default_type", rename = "type")]
    pub artifact_type: String,
}

fn default_type() -> String {
    DEFAULT_TYPE.to_string()
}

impl ArtifactCoordinate {
    /// Create a coordinate with an empty classifier and the default `jar` type.
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            classifier: String::new(),
            artifact_type: default_type(),
        }
    }

    /// Builder-style classifier override. `None` normalizes to the empty classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: Option<&str>) -> Self {
        self.classifier = classifier.unwrap_or_default().to_string();
        self
    }

    /// Builder-style type override. A blank type falls back to [`DEFAULT_TYPE`].
    #[must_use]
    pub fn with_type(mut self, artifact_type: &str) -> Self {
        self.artifact_type = if artifact_type.trim().is_empty() {
            default_type()
        } else {
            artifact_type.to_string()
        };
        self
    }

    /// Derive the coordinate for a versioned reference using the given artifact type.
    pub fn from_reference(reference: &VersionedReference, artifact_type: &str) -> Self {
        Self::new(&reference.group_id, &reference.artifact_id, &reference.version)
            .with_type(artifact_type)
    }

    /// The `(groupId, artifactId, version)` triple the model loader understands.
    pub fn to_reference(&self) -> VersionedReference {
        VersionedReference::new(&self.group_id, &self.artifact_id, &self.version)
    }

    pub fn full_key(&self) -> String {
        full_key(self)
    }

    pub fn management_key(&self) -> String {
        management_key(self)
    }
}

impl fmt::Display for ArtifactCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)?;
        if !self.classifier.is_empty() {
            write!(f, ":{}", self.classifier)?;
        }
        if self.artifact_type != DEFAULT_TYPE {
            write!(f, " ({})", self.artifact_type)?;
        }
        Ok(())
    }
}

/// A `(groupId, artifactId, version)` reference to a project model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VersionedReference {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl VersionedReference {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for VersionedReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}

/// Error returned when a `group:artifact:version` string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid artifact reference '{input}': expected groupId:artifactId:version")]
pub struct ReferenceParseError {
    pub input: String,
}

impl FromStr for VersionedReference {
    type Err = ReferenceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        match parts.as_slice() {
            [group, artifact, version]
                if !group.is_empty() && !artifact.is_empty() && !version.is_empty() =>
            {
                Ok(Self::new(*group, *artifact, *version))
            }
            _ => Err(ReferenceParseError {
                input: s.to_string(),
            }),
        }
    }
}

fn escape_segment(segment: &str) -> String {
    if segment.contains(['%', ':']) {
        segment.replace('%', "%25").replace(':', "%3A")
    } else {
        segment.to_string()
    }
}

/// `groupId:artifactId:version:classifier:type`, always five segments.
pub fn full_key(coord: &ArtifactCoordinate) -> String {
    format!(
        "{}:{}:{}:{}:{}",
        escape_segment(&coord.group_id),
        escape_segment(&coord.artifact_id),
        escape_segment(&coord.version),
        escape_segment(&coord.classifier),
        escape_segment(&coord.artifact_type),
    )
}

/// `groupId:artifactId`, the version-independent identity of an artifact.
pub fn management_key(coord: &ArtifactCoordinate) -> String {
    management_key_of(&coord.group_id, &coord.artifact_id)
}

/// Management key for a bare `(groupId, artifactId)` pair.
pub fn management_key_of(group_id: &str, artifact_id: &str) -> String {
    format!("{}:{}", escape_segment(group_id), escape_segment(artifact_id))
}

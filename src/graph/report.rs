//! Serializable summary of a resolved graph, used for `--format json`.

use serde::Serialize;

use super::{DisabledType, Graph};

#[derive(Debug, Clone, Serialize)]
pub struct GraphReport {
    pub root: String,
    pub nodes: Vec<NodeReport>,
    pub edges: Vec<EdgeReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeReport {
    pub key: String,
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub classifier: String,
    #[serde(rename = "type")]
    pub artifact_type: String,
    pub resolved: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub from_parent: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub excludes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EdgeReport {
    pub from: String,
    pub to: String,
    pub scope: String,
    #[serde(skip_serializing_if = "is_enabled")]
    pub disabled: DisabledType,
}

fn is_enabled(disabled: &DisabledType) -> bool {
    *disabled == DisabledType::None
}

impl From<&Graph> for GraphReport {
    fn from(graph: &Graph) -> Self {
        Self {
            root: graph.root_key().to_string(),
            nodes: graph
                .nodes()
                .map(|node| NodeReport {
                    key: node.key(),
                    group_id: node.coordinate.group_id.clone(),
                    artifact_id: node.coordinate.artifact_id.clone(),
                    version: node.coordinate.version.clone(),
                    classifier: node.coordinate.classifier.clone(),
                    artifact_type: node.coordinate.artifact_type.clone(),
                    resolved: node.resolved,
                    from_parent: node.from_parent,
                    excludes: node.excludes.iter().cloned().collect(),
                })
                .collect(),
            edges: graph
                .edges()
                .iter()
                .map(|edge| EdgeReport {
                    from: edge.from.full_key(),
                    to: edge.to.full_key(),
                    scope: edge.scope.clone(),
                    disabled: edge.disabled.clone(),
                })
                .collect(),
        }
    }
}

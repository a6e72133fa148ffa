// End-to-end resolution against descriptor repositories on disk.

use anyhow::Result;
use std::sync::Arc;

use repograph_cli::config::ResolverConfig;
use repograph_cli::coordinate::VersionedReference;
use repograph_cli::events::{GraphListener, GraphPhase, ResolutionEventType};
use repograph_cli::graph::{
    DisabledType, cleanup_orphaned_nodes, effective_dependencies, install_order,
};
use repograph_cli::model::{
    CachingModelLoader, Dependency, FileModelLoader, ProjectModel, Relocation,
};
use repograph_cli::resolver::{Cancellation, GraphBuilder, GraphResolver, Resolved};
use repograph_cli::test_utils::{ModelRepository, RecordingListener, init_test_logging};

fn model(artifact: &str, version: &str) -> ProjectModel {
    ProjectModel::new("com.example", artifact, version)
}

fn dep(artifact: &str, version: &str) -> Dependency {
    Dependency::new("com.example", artifact, version)
}

fn app() -> VersionedReference {
    VersionedReference::new("com.example", "app", "1.0")
}

async fn resolve(repo: &ModelRepository) -> Result<(Resolved, Arc<RecordingListener>)> {
    init_test_logging(None);
    let recorder = Arc::new(RecordingListener::new());
    let builder = GraphBuilder::with_listeners(
        CachingModelLoader::new(repo.loader()),
        ResolverConfig::default(),
        vec![recorder.clone() as Arc<dyn GraphListener>],
    );
    let resolved = GraphResolver::new(builder).resolve(&app(), &Cancellation::new()).await?;
    Ok((resolved, recorder))
}

fn artifacts(resolved: &Resolved) -> Vec<String> {
    effective_dependencies(&resolved.graph).iter().map(ToString::to_string).collect()
}

#[tokio::test]
async fn test_nearest_version_wins_and_farther_is_removed() -> Result<()> {
    let repo = ModelRepository::new()?;
    repo.add_all(&[
        model("app", "1.0")
            .with_dependency(dep("lib", "1.0"))
            .with_dependency(dep("client", "1.0")),
        model("client", "1.0").with_dependency(dep("lib", "2.0")),
        model("lib", "1.0"),
        model("lib", "2.0"),
    ])?;

    let (resolved, recorder) = resolve(&repo).await?;
    let graph = &resolved.graph;

    let libs: Vec<_> = graph.nodes().filter(|n| n.coordinate.artifact_id == "lib").collect();
    assert_eq!(libs.len(), 1, "only one lib node should survive");
    assert_eq!(libs[0].coordinate.version, "1.0");
    assert!(!libs[0].conflicted);

    assert_eq!(recorder.count_of(ResolutionEventType::ConflictOmitForNearer), 1);
    let omitted = recorder.subjects_of(ResolutionEventType::ConflictOmitForNearer);
    assert_eq!(omitted[0].version, "2.0");

    assert_eq!(resolved.summary.conflicts, 1);
    assert!(graph.validate().is_ok());
    assert_eq!(artifacts(&resolved), vec!["com.example:lib:1.0", "com.example:client:1.0"]);
    assert_eq!(recorder.phases().last(), Some(&(GraphPhase::Done, None)));
    Ok(())
}

#[tokio::test]
async fn test_test_scope_does_not_propagate() -> Result<()> {
    let repo = ModelRepository::new()?;
    repo.add_all(&[
        model("app", "1.0").with_dependency(dep("junit", "4.13").with_scope("test")),
        model("junit", "4.13")
            .with_dependency(dep("hamcrest", "1.3"))
            .with_dependency(dep("mockito", "5.0").with_scope("test")),
        model("hamcrest", "1.3"),
        model("mockito", "5.0"),
    ])?;

    let (resolved, _) = resolve(&repo).await?;
    let names = artifacts(&resolved);
    assert!(names.contains(&"com.example:junit:4.13".to_string()));
    assert!(names.contains(&"com.example:hamcrest:1.3".to_string()));
    assert!(!names.iter().any(|n| n.contains("mockito")));

    let root = resolved.graph.root().coordinate.clone();
    let junit_edge = resolved.graph.edges_from(&root).next().unwrap();
    assert_eq!(junit_edge.scope, "test");
    Ok(())
}

#[tokio::test]
async fn test_exclusions_prune_subtrees() -> Result<()> {
    let repo = ModelRepository::new()?;
    repo.add_all(&[
        model("app", "1.0").with_dependency(dep("lib", "1.0").exclude("commons-logging", "*")),
        model("lib", "1.0")
            .with_dependency(Dependency::new("commons-logging", "commons-logging", "1.2"))
            .with_dependency(dep("util", "1.0")),
        model("util", "1.0").with_dependency(Dependency::new(
            "commons-logging",
            "commons-logging-api",
            "1.1",
        )),
    ])?;

    let (resolved, _) = resolve(&repo).await?;
    let names = artifacts(&resolved);
    assert_eq!(names, vec!["com.example:lib:1.0", "com.example:util:1.0"]);
    Ok(())
}

#[tokio::test]
async fn test_root_dependency_management_overrides_transitive_versions() -> Result<()> {
    let repo = ModelRepository::new()?;
    repo.add_all(&[
        model("app", "1.0").with_managed(dep("lib", "3.0")).with_dependency(dep("mid", "1.0")),
        model("mid", "1.0").with_dependency(dep("lib", "1.0")),
        model("lib", "3.0"),
    ])?;

    let (resolved, recorder) = resolve(&repo).await?;
    assert_eq!(artifacts(&resolved), vec!["com.example:mid:1.0", "com.example:lib:3.0"]);
    assert!(resolved.summary.failed.is_empty());
    assert_eq!(recorder.count_of(ResolutionEventType::ApplyingDependencyManagement), 1);
    Ok(())
}

#[tokio::test]
async fn test_relocated_artifact_is_collapsed_into_its_target() -> Result<()> {
    let repo = ModelRepository::new()?;
    let relocation = Relocation {
        group_id: Some("org.example".to_string()),
        ..Relocation::default()
    };
    repo.add_all(&[
        model("app", "1.0").with_dependency(dep("old", "1.0")),
        model("old", "1.0").relocated_to(relocation),
        ProjectModel::new("org.example", "old", "1.0").with_dependency(dep("util", "1.0")),
        model("util", "1.0"),
    ])?;

    let (resolved, _) = resolve(&repo).await?;
    assert_eq!(artifacts(&resolved), vec!["org.example:old:1.0", "com.example:util:1.0"]);
    assert_eq!(resolved.graph.relocations().len(), 1);
    assert!(resolved.summary.relocated >= 1);
    Ok(())
}

#[tokio::test]
async fn test_relocation_onto_already_relocated_artifact_follows_chain() -> Result<()> {
    // a moves to b in one pass; z, found a pass later, moves to a.
    let repo = ModelRepository::new()?;
    let to = |artifact: &str| Relocation {
        artifact_id: Some(artifact.to_string()),
        ..Relocation::default()
    };
    repo.add_all(&[
        model("app", "1.0").with_dependency(dep("a", "1")).with_dependency(dep("x", "1")),
        model("a", "1").relocated_to(to("b")),
        model("x", "1").with_dependency(dep("z", "1")),
        model("z", "1").relocated_to(to("a")),
        model("b", "1"),
    ])?;

    let (resolved, recorder) = resolve(&repo).await?;
    assert!(resolved.summary.failed.is_empty());
    assert!(recorder.errors().is_empty());
    assert_eq!(artifacts(&resolved), vec!["com.example:x:1", "com.example:b:1"]);
    assert_eq!(resolved.graph.relocations().len(), 2);
    assert_eq!(resolved.summary.relocated, 2);
    assert!(resolved.graph.validate().is_ok());
    Ok(())
}

#[tokio::test]
async fn test_three_node_cycle_resolves_with_one_disabled_edge() -> Result<()> {
    let repo = ModelRepository::new()?;
    repo.add_all(&[
        model("app", "1.0").with_dependency(dep("b", "1.0")),
        model("b", "1.0").with_dependency(dep("c", "1.0")),
        model("c", "1.0").with_dependency(dep("app", "1.0")),
    ])?;

    let (resolved, recorder) = resolve(&repo).await?;
    let cycles: Vec<_> =
        resolved.graph.edges().iter().filter(|e| e.disabled == DisabledType::Cycle).collect();
    assert_eq!(cycles.len(), 1);
    assert_eq!(recorder.count_of(ResolutionEventType::CycleBroken), 1);

    // Disabled cycle edges do not affect install order
    let order = install_order(&resolved.graph)?;
    let names: Vec<_> = order.iter().map(|c| c.artifact_id.as_str()).collect();
    assert_eq!(names, vec!["c", "b"]);
    Ok(())
}

#[tokio::test]
async fn test_missing_descriptor_is_reported_not_fatal() -> Result<()> {
    let repo = ModelRepository::new()?;
    repo.add_all(&[
        model("app", "1.0").with_dependency(dep("gone", "1.0")).with_dependency(dep("lib", "1.0")),
        model("lib", "1.0"),
    ])?;

    let (resolved, recorder) = resolve(&repo).await?;
    assert_eq!(resolved.summary.failed.len(), 1);
    assert_eq!(resolved.summary.failed[0].coordinate.artifact_id, "gone");
    assert_eq!(recorder.errors().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_cleanup_is_idempotent_after_resolution() -> Result<()> {
    let repo = ModelRepository::new()?;
    repo.add_all(&[
        model("app", "1.0")
            .with_dependency(dep("lib", "1.0"))
            .with_dependency(dep("client", "1.0")),
        model("client", "1.0").with_dependency(dep("lib", "2.0")),
        model("lib", "1.0"),
    ])?;

    let (mut resolved, _) = resolve(&repo).await?;
    let before = resolved.graph.node_count();
    assert!(cleanup_orphaned_nodes(&mut resolved.graph).is_empty());
    assert_eq!(resolved.graph.node_count(), before);
    Ok(())
}

#[tokio::test]
async fn test_file_loader_rejects_mismatched_descriptor() -> Result<()> {
    let repo = ModelRepository::new()?;
    repo.add_raw(
        &app(),
        "group_id = \"com.example\"\nartifact_id = \"other\"\nversion = \"1.0\"\n",
    )?;

    let builder = GraphBuilder::new(FileModelLoader::new(repo.path()), ResolverConfig::default());
    let err = GraphResolver::new(builder).resolve(&app(), &Cancellation::new()).await.unwrap_err();
    assert!(err.to_string().contains("com.example:app:1.0"), "unexpected error: {err}");
    Ok(())
}

// Tests for the repograph binary.

use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;

use repograph_cli::model::{Dependency, ProjectModel};
use repograph_cli::test_utils::ModelRepository;

fn repository() -> Result<ModelRepository> {
    let repo = ModelRepository::new()?;
    repo.add_all(&[
        ProjectModel::new("com.example", "app", "1.0")
            .with_dependency(Dependency::new("com.example", "lib", "1.0"))
            .with_dependency(Dependency::new("com.example", "client", "1.0"))
            .with_dependency(Dependency::new("junit", "junit", "4.13").with_scope("test")),
        ProjectModel::new("com.example", "client", "1.0")
            .with_dependency(Dependency::new("com.example", "lib", "2.0")),
        ProjectModel::new("com.example", "lib", "1.0"),
        ProjectModel::new("com.example", "lib", "2.0"),
        ProjectModel::new("junit", "junit", "4.13"),
    ])?;
    Ok(repo)
}

fn repograph() -> Command {
    let mut cmd = Command::cargo_bin("repograph").unwrap();
    cmd.env("REPOGRAPH_NO_PROGRESS", "1").env_remove("RUST_LOG").arg("--no-progress");
    cmd
}

#[test]
fn test_resolve_prints_tree() -> Result<()> {
    let repo = repository()?;

    repograph()
        .args(["resolve", "com.example:app:1.0", "--repo"])
        .arg(repo.path())
        .assert()
        .success()
        .stdout(predicate::str::starts_with("com.example:app:1.0\n"))
        .stdout(predicate::str::contains("com.example:client:1.0"))
        .stdout(predicate::str::contains("junit:junit:4.13 [test]"))
        .stdout(predicate::str::contains("com.example:lib:2.0").not())
        .stderr(predicate::str::contains("Resolved"));
    Ok(())
}

#[test]
fn test_resolve_json_output() -> Result<()> {
    let repo = repository()?;

    let output = repograph()
        .args(["resolve", "com.example:app:1.0", "--format", "json", "--repo"])
        .arg(repo.path())
        .output()?;
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(report["root"], "com.example:app:1.0::jar");
    let nodes = report["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 4);
    assert!(nodes.iter().all(|n| n["resolved"] == true));
    Ok(())
}

#[test]
fn test_resolve_list_output() -> Result<()> {
    let repo = repository()?;

    repograph()
        .args(["--quiet", "resolve", "com.example:app:1.0", "-f", "list", "--repo"])
        .arg(repo.path())
        .assert()
        .success()
        .stdout("com.example:lib:1.0\ncom.example:client:1.0\njunit:junit:4.13\n")
        .stderr(predicate::str::is_empty());
    Ok(())
}

#[test]
fn test_classpath_lists_dependencies_first() -> Result<()> {
    let repo = ModelRepository::new()?;
    repo.add_all(&[
        ProjectModel::new("com.example", "app", "1.0")
            .with_dependency(Dependency::new("com.example", "a", "1")),
        ProjectModel::new("com.example", "a", "1")
            .with_dependency(Dependency::new("com.example", "b", "1")),
        ProjectModel::new("com.example", "b", "1"),
    ])?;

    repograph()
        .args(["classpath", "com.example:app:1.0", "--repo"])
        .arg(repo.path())
        .assert()
        .success()
        .stdout("com.example:b:1\ncom.example:a:1\n");

    let separator = if cfg!(windows) { ";" } else { ":" };
    let b = repo.path().join("com").join("example").join("b").join("1").join("b-1.jar");
    let a = repo.path().join("com").join("example").join("a").join("1").join("a-1.jar");
    let expected = format!("{}{separator}{}\n", b.display(), a.display());

    repograph()
        .args(["classpath", "com.example:app:1.0", "--paths", "--repo"])
        .arg(repo.path())
        .assert()
        .success()
        .stdout(expected);
    Ok(())
}

#[test]
fn test_missing_transitive_descriptor_warns() -> Result<()> {
    let repo = ModelRepository::new()?;
    repo.add(
        &ProjectModel::new("com.example", "app", "1.0")
            .with_dependency(Dependency::new("com.example", "gone", "1.0")),
    )?;

    repograph()
        .args(["resolve", "com.example:app:1.0", "--repo"])
        .arg(repo.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("warning:"))
        .stderr(predicate::str::contains("com.example:gone:1.0"));
    Ok(())
}

#[test]
fn test_missing_root_descriptor_fails() -> Result<()> {
    let repo = repository()?;

    repograph()
        .args(["resolve", "com.example:nothing:1.0", "--repo"])
        .arg(repo.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("com.example:nothing:1.0"));
    Ok(())
}

#[test]
fn test_missing_repository_fails() {
    repograph()
        .args(["resolve", "com.example:app:1.0", "--repo", "/definitely/not/a/repository"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Repository directory not found"));
}

#[test]
fn test_invalid_coordinate_fails() -> Result<()> {
    let repo = repository()?;

    repograph()
        .args(["resolve", "not-a-coordinate", "--repo"])
        .arg(repo.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid artifact reference"));
    Ok(())
}

#[test]
fn test_invalid_config_file_fails() -> Result<()> {
    let repo = repository()?;
    let config = repo.path().join("repograph.toml");
    std::fs::write(&config, "max_parallel = 0\n")?;

    repograph()
        .args(["resolve", "com.example:app:1.0", "--config"])
        .arg(&config)
        .arg("--repo")
        .arg(repo.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_parallel"));
    Ok(())
}

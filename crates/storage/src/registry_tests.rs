// SPDX-License-Identifier: MIT

use super::*;
use tempfile::TempDir;

fn registry(dir: &TempDir) -> ProjectRegistry {
    ProjectRegistry::new(dir.path().join("projects"))
}

fn identity(root: &Path, url: &str) -> RepoIdentity {
    RepoIdentity { root: root.to_path_buf(), origin_url: url.to_string() }
}

#[test]
fn add_then_get_and_list_in_name_order() {
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir);
    let repo = TempDir::new().unwrap();

    registry
        .add("zulu", &identity(repo.path(), "git@example.com:z.git"), AddOptions::default())
        .unwrap();
    registry
        .add("alpha", &identity(repo.path(), "git@example.com:a.git"), AddOptions::default())
        .unwrap();

    let names: Vec<String> = registry.list().unwrap().into_iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["alpha", "zulu"]);
    assert_eq!(registry.get("alpha").unwrap().repo_url, "git@example.com:a.git");
}

#[test]
fn add_defaults_prefix_to_project_name() {
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir);
    let repo = TempDir::new().unwrap();

    let project = registry
        .add("demo", &identity(repo.path(), ""), AddOptions::default())
        .unwrap();
    assert_eq!(project.bead_prefix, "demo");
    assert_eq!(project.default_branch, "main");
}

#[test]
fn add_reads_prefix_from_embedded_beads_config() {
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir);
    let repo = TempDir::new().unwrap();
    std::fs::create_dir_all(repo.path().join(".beads")).unwrap();
    std::fs::write(repo.path().join(".beads/config.json"), r#"{"prefix":"dm"}"#).unwrap();

    let project = registry
        .add("demo", &identity(repo.path(), ""), AddOptions::default())
        .unwrap();
    assert_eq!(project.bead_prefix, "dm");
}

#[test]
fn duplicate_name_is_rejected() {
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir);
    let repo = TempDir::new().unwrap();

    registry.add("demo", &identity(repo.path(), ""), AddOptions::default()).unwrap();
    let err = registry
        .add("demo", &identity(repo.path(), ""), AddOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::ExistingProject(name) if name == "demo"));
}

#[test]
fn same_repo_and_branch_is_rejected() {
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir);
    let repo = TempDir::new().unwrap();
    let url = "git@example.com:demo.git";

    registry.add("demo", &identity(repo.path(), url), AddOptions::default()).unwrap();
    let err = registry
        .add("demo2", &identity(repo.path(), url), AddOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::RepoBranchConflict { existing, .. } if existing == "demo"));
}

#[test]
fn same_repo_different_branch_must_share_prefix() {
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir);
    let url = "git@example.com:demo.git";

    let repo_a = TempDir::new().unwrap();
    std::fs::create_dir_all(repo_a.path().join(".beads")).unwrap();
    std::fs::write(repo_a.path().join(".beads/config.json"), r#"{"prefix":"dm"}"#).unwrap();
    registry.add("demo", &identity(repo_a.path(), url), AddOptions::default()).unwrap();

    // Different branch, no embedded prefix: falls back to the project
    // name, which mismatches the registered prefix.
    let repo_b = TempDir::new().unwrap();
    let err = registry
        .add(
            "demo-staging",
            &identity(repo_b.path(), url),
            AddOptions { branch: Some("staging".into()), merge_mode: None },
        )
        .unwrap_err();
    assert!(matches!(err, Error::BeadPrefixMismatch { expected, .. } if expected == "dm"));

    // Same prefix on a different branch is fine.
    let repo_c = TempDir::new().unwrap();
    std::fs::create_dir_all(repo_c.path().join(".beads")).unwrap();
    std::fs::write(repo_c.path().join(".beads/config.json"), r#"{"prefix":"dm"}"#).unwrap();
    registry
        .add(
            "demo-release",
            &identity(repo_c.path(), url),
            AddOptions { branch: Some("release".into()), merge_mode: None },
        )
        .unwrap();
}

#[test]
fn empty_urls_never_conflict() {
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir);
    let repo_a = TempDir::new().unwrap();
    let repo_b = TempDir::new().unwrap();

    registry.add("one", &identity(repo_a.path(), ""), AddOptions::default()).unwrap();
    registry.add("two", &identity(repo_b.path(), ""), AddOptions::default()).unwrap();
}

#[test]
fn delete_removes_record() {
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir);
    let repo = TempDir::new().unwrap();

    registry.add("demo", &identity(repo.path(), ""), AddOptions::default()).unwrap();
    registry.delete("demo").unwrap();
    assert!(matches!(registry.get("demo"), Err(Error::ProjectNotFound(_))));
    assert!(matches!(registry.delete("demo"), Err(Error::ProjectNotFound(_))));
}

#[test]
fn find_by_bead_prefix_strips_last_segment() {
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir);
    let repo = TempDir::new().unwrap();
    std::fs::create_dir_all(repo.path().join(".beads")).unwrap();
    std::fs::write(repo.path().join(".beads/config.json"), r#"{"prefix":"wt-core"}"#).unwrap();

    registry.add("demo", &identity(repo.path(), ""), AddOptions::default()).unwrap();

    // Multi-dash bead id: prefix is everything but the last part.
    let found = registry.find_by_bead_prefix("wt-core-17").unwrap().unwrap();
    assert_eq!(found.name, "demo");
    assert!(registry.find_by_bead_prefix("nope-17").unwrap().is_none());
    assert!(registry.find_by_bead_prefix("nodash").unwrap().is_none());
}

#[test]
fn find_by_bead_prefix_prefers_prefix_over_name() {
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir);

    // Project literally named "dm" (name match) whose own prefix differs...
    let repo_a = TempDir::new().unwrap();
    std::fs::create_dir_all(repo_a.path().join(".beads")).unwrap();
    std::fs::write(repo_a.path().join(".beads/config.json"), r#"{"prefix":"legacy"}"#).unwrap();
    registry
        .add("dm", &identity(repo_a.path(), "git@example.com:a.git"), AddOptions::default())
        .unwrap();
    // ...and a different project whose bead_prefix is "dm" (prefix match).
    let repo_b = TempDir::new().unwrap();
    std::fs::create_dir_all(repo_b.path().join(".beads")).unwrap();
    std::fs::write(repo_b.path().join(".beads/config.json"), r#"{"prefix":"dm"}"#).unwrap();
    registry
        .add("demo", &identity(repo_b.path(), "git@example.com:b.git"), AddOptions::default())
        .unwrap();

    assert_eq!(registry.find_by_bead_prefix("dm-3").unwrap().unwrap().name, "demo");
}

#[test]
fn find_by_repo_url_skips_empty() {
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir);
    let repo = TempDir::new().unwrap();
    registry
        .add("demo", &identity(repo.path(), "git@example.com:demo.git"), AddOptions::default())
        .unwrap();

    assert_eq!(
        registry.find_by_repo_url("git@example.com:demo.git").unwrap().unwrap().name,
        "demo"
    );
    assert!(registry.find_by_repo_url("").unwrap().is_none());
}

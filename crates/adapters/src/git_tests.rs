// SPDX-License-Identifier: MIT

use super::*;
use tempfile::TempDir;

/// Check if git is available on this system
fn git_available() -> bool {
    std::process::Command::new("git")
        .arg("version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn sh(dir: &Path, script: &str) {
    let status = std::process::Command::new("sh")
        .args(["-c", script])
        .current_dir(dir)
        .env_remove("GIT_DIR")
        .env_remove("GIT_WORK_TREE")
        .status()
        .unwrap();
    assert!(status.success(), "fixture command failed: {script}");
}

/// Initialize a repo with one commit on `main`.
fn init_repo(dir: &Path) {
    sh(
        dir,
        "git init -q -b main . \
         && git config user.email wt@example.com \
         && git config user.name wt \
         && echo seed > seed.txt \
         && git add . && git commit -q -m seed",
    );
}

#[tokio::test]
async fn create_makes_a_new_branch_at_head() {
    if !git_available() {
        eprintln!("skipping test: git not available");
        return;
    }
    let repo = TempDir::new().unwrap();
    init_repo(repo.path());
    let worktree = repo.path().join("wt").join("demo-amazon");

    create(repo.path(), &worktree, "dm-1").await.unwrap();

    assert!(worktree.join("seed.txt").is_file());
    assert!(local_branch_exists(repo.path(), "dm-1").await.unwrap());
}

#[tokio::test]
async fn create_checks_out_an_existing_branch() {
    if !git_available() {
        eprintln!("skipping test: git not available");
        return;
    }
    let repo = TempDir::new().unwrap();
    init_repo(repo.path());
    sh(repo.path(), "git branch existing");

    let worktree = repo.path().join("wt").join("demo-nile");
    create(repo.path(), &worktree, "existing").await.unwrap();
    assert!(worktree.is_dir());

    // The same branch cannot be checked out into a second worktree.
    let second = repo.path().join("wt").join("demo-tiber");
    assert!(create(repo.path(), &second, "existing").await.is_err());
}

#[tokio::test]
async fn create_from_branch_uses_the_base_point() {
    if !git_available() {
        eprintln!("skipping test: git not available");
        return;
    }
    let repo = TempDir::new().unwrap();
    init_repo(repo.path());
    sh(repo.path(), "git branch base && echo extra > extra.txt && git add . && git commit -q -m extra");

    let worktree = repo.path().join("wt").join("epic");
    create_from_branch(repo.path(), &worktree, "epic/dm-epic", "base").await.unwrap();

    // Branched from `base`, so the later commit is absent.
    assert!(worktree.join("seed.txt").is_file());
    assert!(!worktree.join("extra.txt").exists());
}

#[tokio::test]
async fn remove_deletes_directory_and_registration() {
    if !git_available() {
        eprintln!("skipping test: git not available");
        return;
    }
    let repo = TempDir::new().unwrap();
    init_repo(repo.path());
    let worktree = repo.path().join("wt").join("demo-amazon");
    create(repo.path(), &worktree, "dm-1").await.unwrap();

    remove(&worktree).await.unwrap();
    assert!(!worktree.exists());
    prune(repo.path()).await.unwrap();

    // A plain directory (registration already gone) falls back to rm -rf.
    let stray = repo.path().join("wt").join("stray");
    std::fs::create_dir_all(stray.join("sub")).unwrap();
    std::fs::write(stray.join("sub/file"), "x").unwrap();
    remove(&stray).await.unwrap();
    assert!(!stray.exists());
}

#[tokio::test]
async fn is_branch_merged_tracks_ancestry() {
    if !git_available() {
        eprintln!("skipping test: git not available");
        return;
    }
    let repo = TempDir::new().unwrap();
    init_repo(repo.path());
    sh(
        repo.path(),
        "git checkout -q -b feature \
         && echo f > f.txt && git add . && git commit -q -m feature \
         && git checkout -q main",
    );

    assert!(!is_branch_merged(repo.path(), "feature", "main").await.unwrap());
    sh(repo.path(), "git merge -q --no-ff feature -m merge");
    assert!(is_branch_merged(repo.path(), "feature", "main").await.unwrap());
}

#[tokio::test]
async fn find_git_root_resolves_from_subdirectory() {
    if !git_available() {
        eprintln!("skipping test: git not available");
        return;
    }
    let repo = TempDir::new().unwrap();
    init_repo(repo.path());
    let sub = repo.path().join("a").join("b");
    std::fs::create_dir_all(&sub).unwrap();

    let root = find_git_root(&sub).await.unwrap();
    assert_eq!(root.canonicalize().unwrap(), repo.path().canonicalize().unwrap());

    let outside = TempDir::new().unwrap();
    assert!(matches!(
        find_git_root(outside.path()).await,
        Err(GitError::NotARepo(_))
    ));
}

#[tokio::test]
async fn origin_url_is_empty_without_origin() {
    if !git_available() {
        eprintln!("skipping test: git not available");
        return;
    }
    let repo = TempDir::new().unwrap();
    init_repo(repo.path());
    assert_eq!(origin_url(repo.path()).await.unwrap(), "");

    sh(repo.path(), "git remote add origin git@example.com:demo.git");
    assert_eq!(origin_url(repo.path()).await.unwrap(), "git@example.com:demo.git");
}

#[tokio::test]
async fn main_repo_root_resolves_from_worktree() {
    if !git_available() {
        eprintln!("skipping test: git not available");
        return;
    }
    let repo = TempDir::new().unwrap();
    init_repo(repo.path());
    let worktree = repo.path().join("wt").join("demo-amazon");
    create(repo.path(), &worktree, "dm-1").await.unwrap();

    let root = main_repo_root(&worktree).await.unwrap();
    assert_eq!(root.canonicalize().unwrap(), repo.path().canonicalize().unwrap());
}

#[tokio::test]
async fn symlink_claude_dir_links_once() {
    if !git_available() {
        eprintln!("skipping test: git not available");
        return;
    }
    let repo = TempDir::new().unwrap();
    init_repo(repo.path());
    let worktree = repo.path().join("wt").join("demo-amazon");
    create(repo.path(), &worktree, "dm-1").await.unwrap();

    // No .claude in the repo: no-op.
    symlink_claude_dir(repo.path(), &worktree).unwrap();
    assert!(!worktree.join(".claude").exists());

    std::fs::create_dir(repo.path().join(".claude")).unwrap();
    std::fs::write(repo.path().join(".claude/settings.json"), "{}").unwrap();
    symlink_claude_dir(repo.path(), &worktree).unwrap();
    assert!(worktree.join(".claude/settings.json").is_file());

    // Existing target: still a no-op.
    symlink_claude_dir(repo.path(), &worktree).unwrap();
}

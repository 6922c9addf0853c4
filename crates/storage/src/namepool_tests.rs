// SPDX-License-Identifier: MIT

use super::*;
use tempfile::TempDir;
use wt_core::Error;

#[test]
fn allocate_walks_theme_in_order() {
    let theme = theme_for_project("demo");
    let mut in_use = HashSet::new();

    let first = allocate("demo", &in_use).unwrap();
    assert_eq!(first.name, theme.names[0]);
    assert_eq!(first.theme, theme.name);

    in_use.insert(first.name);
    let second = allocate("demo", &in_use).unwrap();
    assert_eq!(second.name, theme.names[1]);
}

#[test]
fn allocate_reissues_freed_names() {
    let theme = theme_for_project("demo");
    let mut in_use: HashSet<String> =
        theme.names.iter().take(3).map(|n| n.to_string()).collect();

    assert_eq!(allocate("demo", &in_use).unwrap().name, theme.names[3]);
    in_use.remove(theme.names[1]);
    assert_eq!(allocate("demo", &in_use).unwrap().name, theme.names[1]);
}

#[test]
fn allocate_fails_when_pool_exhausted() {
    let theme = theme_for_project("demo");
    let in_use: HashSet<String> = theme.names.iter().map(|n| n.to_string()).collect();
    assert!(matches!(allocate("demo", &in_use), Err(Error::PoolExhausted(_))));
}

#[test]
fn file_pool_skips_comments_and_used_names() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("namepool.txt");
    std::fs::write(&path, "# fallback pool\nalpha\n\n  beta  \ngamma\n").unwrap();

    let mut in_use = HashSet::new();
    assert_eq!(allocate_from_file(&path, &in_use).unwrap().name, "alpha");

    in_use.insert("alpha".to_string());
    in_use.insert("beta".to_string());
    assert_eq!(allocate_from_file(&path, &in_use).unwrap().name, "gamma");
}

#[test]
fn file_pool_exhaustion_and_missing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("namepool.txt");

    // Missing file behaves like an empty pool.
    let in_use = HashSet::new();
    assert!(matches!(allocate_from_file(&path, &in_use), Err(Error::PoolExhausted(_))));

    std::fs::write(&path, "alpha\n").unwrap();
    let in_use: HashSet<String> = ["alpha".to_string()].into_iter().collect();
    assert!(matches!(allocate_from_file(&path, &in_use), Err(Error::PoolExhausted(_))));
}

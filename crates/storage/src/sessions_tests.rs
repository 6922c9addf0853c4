// SPDX-License-Identifier: MIT

use super::*;
use tempfile::TempDir;
use wt_core::test_support::SessionBuilder;
use wt_core::SessionStatus;

fn store(dir: &TempDir) -> SessionStore {
    SessionStore::new(dir.path().join("sessions.json"), dir.path().join("sessions.lock"))
}

#[test]
fn load_missing_file_yields_empty_map() {
    let dir = TempDir::new().unwrap();
    assert!(store(&dir).load().unwrap().is_empty());
}

#[test]
fn load_empty_file_yields_empty_map() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("sessions.json"), "").unwrap();
    assert!(store(&dir).load().unwrap().is_empty());
}

#[test]
fn save_then_load_round_trips() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);

    let session = SessionBuilder::bead("demo-amazon", "dm-1").theme_name("amazon").build();
    let mut map = SessionMap::new();
    map.insert(session.name.clone(), session.clone());
    store.save(&map).unwrap();

    let loaded = store.load().unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded["demo-amazon"], session);
}

#[test]
fn used_names_prefers_theme_name_with_session_name_fallback() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);

    let with_theme = SessionBuilder::bead("demo-amazon", "dm-1").theme_name("amazon").build();
    // Session written before theme tracking: no theme_name field.
    let without_theme = SessionBuilder::bead("legacy-name", "dm-2").build();

    let mut map = SessionMap::new();
    map.insert(with_theme.name.clone(), with_theme);
    map.insert(without_theme.name.clone(), without_theme);
    store.save(&map).unwrap();

    let used = store.used_names().unwrap();
    assert!(used.contains("amazon"));
    assert!(used.contains("legacy-name"));
    assert!(!used.contains("demo-amazon"));
}

#[test]
fn find_by_bead_matches_only_bead_sessions() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);

    let bead = SessionBuilder::bead("demo-amazon", "dm-1").build();
    let task = SessionBuilder::task("demo-nile", "spike").build();
    let mut map = SessionMap::new();
    map.insert(bead.name.clone(), bead.clone());
    map.insert(task.name.clone(), task);
    store.save(&map).unwrap();

    assert_eq!(store.find_by_bead("dm-1").unwrap().unwrap().name, "demo-amazon");
    assert!(store.find_by_bead("dm-9").unwrap().is_none());
}

#[test]
fn with_lock_persists_mutations() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);

    let added: usize = store
        .with_lock(|sessions| {
            let s = SessionBuilder::bead("demo-amazon", "dm-1").build();
            sessions.insert(s.name.clone(), s);
            Ok(sessions.len())
        })
        .unwrap();
    assert_eq!(added, 1);
    assert_eq!(store.load().unwrap().len(), 1);

    // Mutation error leaves the previous state on disk.
    let result: Result<(), _> = store.with_lock(|sessions| {
        sessions.clear();
        Err(wt_core::Error::NotInSession)
    });
    assert!(result.is_err());
    assert_eq!(store.load().unwrap().len(), 1);
}

#[test]
fn with_lock_updates_status_in_place() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);

    store
        .with_lock(|sessions| {
            let s = SessionBuilder::bead("demo-amazon", "dm-1").build();
            sessions.insert(s.name.clone(), s);
            Ok(())
        })
        .unwrap();

    store
        .with_lock(|sessions| {
            if let Some(s) = sessions.get_mut("demo-amazon") {
                s.status = SessionStatus::Ready;
            }
            Ok(())
        })
        .unwrap();

    assert_eq!(store.load().unwrap()["demo-amazon"].status, SessionStatus::Ready);
}

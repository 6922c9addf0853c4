// SPDX-License-Identifier: MIT

use super::*;
use tempfile::TempDir;

#[test]
fn load_returns_defaults_when_absent() {
    let dir = TempDir::new().unwrap();
    let store = ConfigStore::at(dir.path());

    assert!(!store.exists());
    let config = store.load().unwrap();
    assert_eq!(config.editor_cmd, "claude");
    assert_eq!(config.default_merge_mode, MergeMode::Direct);
    assert!(config.worktree_root.ends_with("worktrees"));
}

#[test]
fn save_then_load_round_trips() {
    let dir = TempDir::new().unwrap();
    let store = ConfigStore::at(dir.path());

    let config = Config {
        worktree_root: "/srv/worktrees".into(),
        editor_cmd: "claude --dangerously-skip-permissions".into(),
        default_merge_mode: MergeMode::PrAuto,
    };
    store.save(&config).unwrap();

    assert!(store.exists());
    assert_eq!(store.load().unwrap(), config);

    // Indented JSON on disk.
    let raw = std::fs::read_to_string(store.config_path()).unwrap();
    assert!(raw.contains("\n  "));
}

#[test]
fn save_leaves_no_temp_files() {
    let dir = TempDir::new().unwrap();
    let store = ConfigStore::at(dir.path());
    store.save(&Config::default()).unwrap();

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["config.json".to_string()]);
}

#[test]
fn unknown_fields_are_ignored() {
    let dir = TempDir::new().unwrap();
    let store = ConfigStore::at(dir.path());
    std::fs::write(
        store.config_path(),
        r#"{"worktree_root":"/w","editor_cmd":"claude","default_merge_mode":"direct","future_option":1}"#,
    )
    .unwrap();
    assert_eq!(store.load().unwrap().worktree_root, std::path::PathBuf::from("/w"));
}

#[test]
fn corrupt_config_is_reported() {
    let dir = TempDir::new().unwrap();
    let store = ConfigStore::at(dir.path());
    std::fs::write(store.config_path(), "{not json").unwrap();
    assert!(matches!(store.load(), Err(Error::StateCorrupt(_))));
}

#[test]
fn paths_live_under_the_config_dir() {
    let store = ConfigStore::at("/cfg/wt");
    assert_eq!(store.sessions_path(), std::path::PathBuf::from("/cfg/wt/sessions.json"));
    assert_eq!(store.events_path(), std::path::PathBuf::from("/cfg/wt/events.log"));
    assert_eq!(store.events_offset_path(), std::path::PathBuf::from("/cfg/wt/events.offset"));
    assert_eq!(store.namepool_path(), std::path::PathBuf::from("/cfg/wt/namepool.txt"));
    assert_eq!(store.auto_sentinel_path(), std::path::PathBuf::from("/cfg/wt/auto.sentinel"));
    assert_eq!(store.handoff_archive_path("20260301-120000"), std::path::PathBuf::from("/cfg/wt/handoff-20260301-120000.md"));
}

// SPDX-License-Identifier: MIT

use super::*;

const BEAD_OBJECT: &str = r#"{
    "id": "dm-1",
    "title": "Fix the widget",
    "description": "It wobbles.",
    "status": "open",
    "issue_type": "bug",
    "priority": 1,
    "dependencies": ["dm-0"]
}"#;

#[test]
fn decode_accepts_object_form() {
    let bead = decode_bead(BEAD_OBJECT).unwrap();
    assert_eq!(bead.id, "dm-1");
    assert_eq!(bead.priority, Some(1));
    assert_eq!(bead.dependencies, vec!["dm-0"]);
}

#[test]
fn decode_accepts_one_element_array_form() {
    let json = format!("[{BEAD_OBJECT}]");
    let bead = decode_bead(&json).unwrap();
    assert_eq!(bead.id, "dm-1");
}

#[test]
fn decode_rejects_other_shapes() {
    assert!(decode_bead("[]").is_err());
    assert!(decode_bead(&format!("[{BEAD_OBJECT},{BEAD_OBJECT}]")).is_err());
    assert!(decode_bead("42").is_err());
}

#[test]
fn decode_defaults_missing_fields() {
    let bead = decode_bead(r#"{"id":"dm-2"}"#).unwrap();
    assert_eq!(bead.title, "");
    assert_eq!(bead.priority, None);
    assert!(bead.dependencies.is_empty());
}

#[tokio::test]
async fn fake_show_and_close_mutate_state() {
    let store = FakeIssueStore::new();
    let dir = std::path::Path::new("/tmp/repo");
    store.put_simple("dm-1", "Fix the widget", "It wobbles.");

    let bead = store.show(dir, "dm-1").await.unwrap();
    assert_eq!(bead.status, "open");
    assert!(matches!(store.show(dir, "dm-9").await, Err(IssueError::NotFound(_))));

    store.close(dir, "dm-1").await.unwrap();
    assert_eq!(store.status_of("dm-1").as_deref(), Some("closed"));
    assert_eq!(store.calls(), vec![IssueCall::Close("dm-1".into())]);
}

#[tokio::test]
async fn fake_ready_requires_closed_dependencies() {
    let store = FakeIssueStore::new();
    let dir = std::path::Path::new("/tmp/repo");
    store.put_simple("dm-1", "first", "d");
    store.put(Bead {
        id: "dm-2".into(),
        title: "second".into(),
        description: "d".into(),
        status: "open".into(),
        issue_type: "task".into(),
        priority: None,
        dependencies: vec!["dm-1".into()],
    });

    let ready: Vec<String> =
        store.ready(dir).await.unwrap().into_iter().map(|b| b.id).collect();
    assert_eq!(ready, vec!["dm-1"]);

    store.close(dir, "dm-1").await.unwrap();
    let ready: Vec<String> =
        store.ready(dir).await.unwrap().into_iter().map(|b| b.id).collect();
    assert_eq!(ready, vec!["dm-2"]);
}

#[tokio::test]
async fn fake_create_allocates_sequential_ids() {
    let store = FakeIssueStore::new();
    let dir = std::path::Path::new("/tmp/repo");

    let id = store
        .create(dir, BeadCreate { title: "New thing".into(), ..BeadCreate::default() })
        .await
        .unwrap();
    assert_eq!(id, "fake-1");
    assert_eq!(store.show(dir, &id).await.unwrap().title, "New thing");
}

#[test]
fn errors_map_to_core_kinds() {
    let err: wt_core::Error = IssueError::NotFound("dm-1".into()).into();
    assert!(matches!(err, wt_core::Error::BeadNotFound(_)));
    let err: wt_core::Error = IssueError::CliMissing("bd".into()).into();
    assert!(matches!(err, wt_core::Error::ExternalCliMissing(_)));
}

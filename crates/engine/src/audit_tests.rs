// SPDX-License-Identifier: MIT

use super::*;
use wt_adapters::FakeIssueStore;

fn bead(id: &str, description: &str, deps: &[&str], priority: Option<i64>) -> Bead {
    Bead {
        id: id.to_string(),
        title: format!("title {id}"),
        description: description.to_string(),
        status: "open".to_string(),
        issue_type: "task".to_string(),
        priority,
        dependencies: deps.iter().map(|d| d.to_string()).collect(),
    }
}

fn epic_store(members: &[Bead]) -> FakeIssueStore {
    let store = FakeIssueStore::new();
    let mut epic = bead("dm-epic", "the epic", &[], None);
    epic.dependencies = members.iter().map(|b| b.id.clone()).collect();
    store.put(epic);
    for member in members {
        store.put(member.clone());
    }
    store
}

#[tokio::test]
async fn clean_epic_audits_ready_in_topo_order() {
    let members = vec![
        bead("dm-2", "second", &["dm-1"], None),
        bead("dm-1", "first", &[], None),
    ];
    let store = epic_store(&members);

    let (ordered, audits) =
        audit_epic(&store, Path::new("/tmp"), "dm-epic").await.unwrap();

    let order: Vec<&str> = ordered.iter().map(|b| b.id.as_str()).collect();
    assert_eq!(order, vec!["dm-1", "dm-2"]);
    assert!(audits.iter().all(|a| a.readiness == Readiness::Ready));
    // Property: Ready implies no findings.
    assert!(audits.iter().all(|a| a.issue_count() == 0 && a.questions.is_empty()));
}

#[tokio::test]
async fn empty_description_is_not_ready_with_a_question() {
    let members = vec![bead("dm-1", "  ", &[], None)];
    let store = epic_store(&members);

    let (_, audits) = audit_epic(&store, Path::new("/tmp"), "dm-epic").await.unwrap();
    assert_eq!(audits[0].readiness, Readiness::NotReady);
    assert_eq!(audits[0].issue_count(), 1);
    assert!(audits[0].questions[0].contains("dm-1"));
}

#[tokio::test]
async fn open_external_blocker_is_partial() {
    let members = vec![bead("dm-1", "first", &["ext-1"], None)];
    let store = epic_store(&members);
    store.put(bead("ext-1", "outside", &[], None)); // open

    let (_, audits) = audit_epic(&store, Path::new("/tmp"), "dm-epic").await.unwrap();
    assert_eq!(audits[0].readiness, Readiness::Partial);
    assert!(audits[0].issues[0].contains("ext-1"));
}

#[tokio::test]
async fn closed_external_blocker_is_fine() {
    let members = vec![bead("dm-1", "first", &["ext-1"], None)];
    let store = epic_store(&members);
    let mut ext = bead("ext-1", "outside", &[], None);
    ext.status = "closed".to_string();
    store.put(ext);

    let (_, audits) = audit_epic(&store, Path::new("/tmp"), "dm-epic").await.unwrap();
    assert_eq!(audits[0].readiness, Readiness::Ready);
}

#[tokio::test]
async fn dependency_cycles_are_not_ready() {
    let members = vec![
        bead("dm-1", "a", &["dm-2"], None),
        bead("dm-2", "b", &["dm-1"], None),
        bead("dm-3", "c", &[], None),
    ];
    let store = epic_store(&members);

    let (ordered, audits) = audit_epic(&store, Path::new("/tmp"), "dm-epic").await.unwrap();
    // Only the acyclic member gets an execution slot.
    assert_eq!(ordered.len(), 1);
    assert_eq!(ordered[0].id, "dm-3");

    let cyclic: Vec<Readiness> = audits
        .iter()
        .filter(|a| a.id != "dm-3")
        .map(|a| a.readiness)
        .collect();
    assert_eq!(cyclic, vec![Readiness::NotReady, Readiness::NotReady]);
}

#[tokio::test]
async fn empty_epic_is_an_error() {
    let store = FakeIssueStore::new();
    store.put(bead("dm-epic", "the epic", &[], None));
    assert!(audit_epic(&store, Path::new("/tmp"), "dm-epic").await.is_err());
}

#[test]
fn topo_order_breaks_ties_by_priority_then_id() {
    let members = vec![
        bead("dm-c", "c", &[], Some(1)),
        bead("dm-a", "a", &[], None),
        bead("dm-b", "b", &[], Some(0)),
        bead("dm-d", "d", &["dm-c"], Some(0)),
    ];
    let order: Vec<String> = topo_order(&members).into_iter().map(|b| b.id).collect();
    // Priority 0 first, then 1, unset last; dependents after their deps.
    assert_eq!(order, vec!["dm-b", "dm-c", "dm-d", "dm-a"]);
}

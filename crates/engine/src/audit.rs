// SPDX-License-Identifier: MIT

//! Epic readiness audit.
//!
//! Before a batch run, every member bead is checked for a usable
//! description, external blockers, and a well-formed dependency graph.
//! A bead is Ready only when nothing was flagged.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use wt_adapters::{Bead, IssueStore};
use wt_core::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    Partial,
    NotReady,
}

/// Audit result for one member bead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeadAudit {
    pub id: String,
    pub title: String,
    pub readiness: Readiness,
    /// Human-readable findings; empty iff Ready.
    pub issues: Vec<String>,
    /// Suggested questions to resolve the findings.
    pub questions: Vec<String>,
}

impl BeadAudit {
    pub fn issue_count(&self) -> usize {
        self.issues.len()
    }
}

/// Enumerate an epic's members and audit each one.
///
/// Returns the members in execution order (topological, then priority,
/// then id) alongside their audits. Members caught in a dependency cycle
/// are NotReady and excluded from the order.
pub async fn audit_epic<I: IssueStore>(
    issues: &I,
    dir: &Path,
    epic: &str,
) -> Result<(Vec<Bead>, Vec<BeadAudit>), Error> {
    let members = issues.deps(dir, epic).await.map_err(Error::from)?;
    if members.is_empty() {
        return Err(Error::AutoFailed(format!("epic '{epic}' has no member beads")));
    }
    let member_ids: HashSet<&str> = members.iter().map(|b| b.id.as_str()).collect();

    let ordered = topo_order(&members);
    let cyclic: HashSet<&str> = members
        .iter()
        .map(|b| b.id.as_str())
        .filter(|id| !ordered.iter().any(|b| b.id == *id))
        .collect();

    let mut audits = Vec::with_capacity(members.len());
    for bead in &members {
        let mut found = Vec::new();
        let mut questions = Vec::new();
        let mut readiness = Readiness::Ready;

        if bead.description.trim().is_empty() {
            found.push("empty description".to_string());
            questions.push(format!("What are the acceptance criteria for {}?", bead.id));
            readiness = Readiness::NotReady;
        }

        if cyclic.contains(bead.id.as_str()) {
            found.push("part of a dependency cycle within the epic".to_string());
            questions.push(format!("Which dependency of {} should be dropped?", bead.id));
            readiness = Readiness::NotReady;
        }

        // Blockers outside the epic set must already be closed.
        for dep in &bead.dependencies {
            if dep == epic || member_ids.contains(dep.as_str()) {
                continue;
            }
            let closed = matches!(
                issues.show(dir, dep).await,
                Ok(blocker) if blocker.status == "closed"
            );
            if !closed {
                found.push(format!("blocked by external bead {dep}"));
                questions.push(format!("Can {dep} be finished or dropped before the epic?"));
                if readiness == Readiness::Ready {
                    readiness = Readiness::Partial;
                }
            }
        }

        audits.push(BeadAudit {
            id: bead.id.clone(),
            title: bead.title.clone(),
            readiness,
            issues: found,
            questions,
        });
    }

    Ok((ordered, audits))
}

/// Kahn's algorithm over the epic-internal dependency edges. Ties are
/// broken by priority (lower value first, unset last), then id. Beads in
/// cycles are left out.
pub fn topo_order(members: &[Bead]) -> Vec<Bead> {
    let by_id: BTreeMap<&str, &Bead> = members.iter().map(|b| (b.id.as_str(), b)).collect();

    // In-degree over in-epic edges only.
    let mut indegree: BTreeMap<&str, usize> = members.iter().map(|b| (b.id.as_str(), 0)).collect();
    for bead in members {
        for dep in &bead.dependencies {
            if by_id.contains_key(dep.as_str()) {
                if let Some(d) = indegree.get_mut(bead.id.as_str()) {
                    *d += 1;
                }
            }
        }
    }

    let mut ready: Vec<&Bead> = indegree
        .iter()
        .filter(|(_, d)| **d == 0)
        .filter_map(|(id, _)| by_id.get(id).copied())
        .collect();
    let mut ordered = Vec::with_capacity(members.len());

    while !ready.is_empty() {
        ready.sort_by_key(|b| (b.priority.unwrap_or(i64::MAX), b.id.clone()));
        let next = ready.remove(0);
        ordered.push(next.clone());

        for bead in members {
            if bead.dependencies.iter().any(|d| d == &next.id) {
                if let Some(d) = indegree.get_mut(bead.id.as_str()) {
                    *d -= 1;
                    if *d == 0 {
                        ready.push(bead);
                    }
                }
            }
        }
    }

    ordered
}

#[cfg(test)]
#[path = "audit_tests.rs"]
mod tests;

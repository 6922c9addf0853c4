// SPDX-License-Identifier: MIT

//! CLI command implementations

pub mod auto;
pub mod events;
pub mod hub;
pub mod ops;
pub mod project;
pub mod session;

use crate::Wt;
use wt_core::{Error, Session};

/// The session the caller is inside: `WT_SESSION` when set (propagated
/// into every session's environment), else the worktree enclosing the
/// working directory.
pub(crate) fn current_session(wt: &Wt) -> Result<Session, Error> {
    if let Ok(name) = std::env::var("WT_SESSION") {
        if !name.is_empty() {
            let sessions = wt.sessions.load()?;
            if let Some(session) = sessions.get(&name) {
                return Ok(session.clone());
            }
        }
    }
    let cwd = std::env::current_dir().map_err(Error::Io)?;
    wt.session_for_cwd(&cwd)
}

// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wt-storage: File-backed stores under the wt config directory.
//!
//! Everything here lives in one directory (default `~/.config/wt`):
//! user config, project records, the session state map, the append-only
//! event log, the fallback name pool and the message mailbox. All writes
//! go through temp-file + atomic rename; the session map is additionally
//! guarded by a cross-process advisory lock.

pub mod config;
pub mod events;
pub(crate) mod fsutil;
pub mod mailbox;
pub mod namepool;
pub mod registry;
pub mod sessions;

pub use config::{Config, ConfigStore};
pub use events::EventLog;
pub use fsutil::expand_tilde;
pub use mailbox::Mailbox;
pub use namepool::Allocation;
pub use registry::{AddOptions, ProjectRegistry, RepoIdentity};
pub use sessions::{SessionMap, SessionStore};

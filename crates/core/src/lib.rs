// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wt-core: Domain types for the wt session orchestrator

pub mod clock;
pub mod error;
pub mod event;
pub mod message;
pub mod project;
pub mod session;
pub mod theme;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use error::Error;
pub use event::{Event, EventKind};
pub use message::{Message, Subject};
pub use project::{AutoRebase, MergeMode, Project, TestEnv};
pub use session::{CompletionCondition, Session, SessionKind, SessionStatus};
pub use theme::{fnv1a32, theme_for_project, Theme, THEMES};

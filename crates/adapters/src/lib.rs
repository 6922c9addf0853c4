// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wt-adapters: Subprocess drivers for the external collaborators.
//!
//! Each external binary (tmux, git, gh, bd) is consumed through a stable
//! command surface. Adapters with nontrivial behavior are traits so the
//! engine can be tested against recording fakes.

pub mod git;
pub mod issue;
pub mod merge;
pub mod multiplexer;
pub mod notify;
pub mod subprocess;
pub mod testenv;

pub use issue::{Bead, BeadCreate, IssueStore};
pub use merge::{MergeDriver, PrState};
pub use multiplexer::{Multiplexer, NewSessionOptions};
pub use notify::NotifyAdapter;

#[cfg(any(test, feature = "test-support"))]
pub use issue::FakeIssueStore;
#[cfg(any(test, feature = "test-support"))]
pub use merge::FakeMergeDriver;
#[cfg(any(test, feature = "test-support"))]
pub use multiplexer::FakeMultiplexer;
#[cfg(any(test, feature = "test-support"))]
pub use notify::FakeNotifyAdapter;

//! Kestrel Testing Infrastructure
//!
//! Scripted in-memory collaborators for every port of `kestrel-session`, a
//! recording UI boundary, and a [`TestHarness`] that wires them together.
//!
//! Every collaborator writes to one shared [`CallJournal`], so tests can
//! assert ordering across collaborators (for example "generate, then factory,
//! then init").

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! kestrel-testkit = { path = "../kestrel-testkit" }
//! ```
//!
//! ```rust,no_run
//! use kestrel_testkit::*;
//!
//! # async fn demo() {
//! let harness = TestHarness::new();
//! harness.payload.script().nodes_exist = false;
//! let orchestrator = harness.orchestrator();
//! orchestrator.start().await;
//! assert!(harness.journal.contains("payload.generate_nodes"));
//! # }
//! ```

/// [`TestHarness`] wiring.
pub mod harness;
/// Shared call journal.
pub mod journal;
/// Scripted collaborators.
pub mod mocks;
/// Declarative scenarios loaded from TOML.
pub mod scenario;
/// Recording UI boundary.
pub mod ui;
/// Polling helpers.
pub mod wait;

pub use harness::TestHarness;
pub use journal::CallJournal;
pub use mocks::*;
pub use scenario::Scenario;
pub use ui::{RecordingUi, UiCall};
pub use wait::{wait_until, wait_until_timeout};

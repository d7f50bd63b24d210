//! Kestrel-Core: runtime primitives for the session orchestrator
//!
//! This crate holds the leaf building blocks every coordinator composes over:
//!
//! - [`event_bus`]: typed publish/subscribe channel for asynchronous external
//!   events (push notifications, contact-service readiness)
//! - [`task`]: completable/observable task shapes and the per-session
//!   [`TaskRegistry`](task::TaskRegistry) that cancels a session's work at once
//! - [`compose`]: declarative combinators (`all_of`, `then`, `absorb`, `absorb_stream`) with
//!   documented ordering and error-merge semantics
//! - [`cache`]: last-write-wins cache slots shared between coordinators
//!
//! Nothing in here knows about wallets; the domain lives in `kestrel-session`.

#![forbid(unsafe_code)]

pub mod cache;
pub mod compose;
pub mod event_bus;
pub mod task;

pub use cache::CacheSlot;
pub use event_bus::{Event, EventBus, EventStream, RegistrationId};
pub use task::{Completable, Observable, TaskRegistry};

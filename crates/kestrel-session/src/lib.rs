//! Kestrel-Session: launch-time session orchestration for the wallet client
//!
//! On every authenticated launch the [`SessionOrchestrator`] brings the
//! wallet's asynchronous subsystems into a consistent ready state:
//!
//! - [`metadata`]: resolves or provisions the metadata node pair
//! - [`contacts`]: peer-messaging initialization, message pulls, deferred
//!   contacts entry and payment broadcast confirmation
//! - [`market`]: fee options and price ticker refresh into a shared cache
//! - [`purchase`]: buy/sell gate, trade watching and web session handoff
//! - [`orchestrator`]: the launch sequence, teardown and unpairing
//!
//! All I/O goes through the collaborator traits in [`ports`]. Failures are
//! classified once, see [`errors`].

#![forbid(unsafe_code)]

pub mod config;
pub mod contacts;
pub mod errors;
pub mod market;
pub mod metadata;
pub mod model;
pub mod orchestrator;
pub mod ports;
pub mod purchase;
pub mod session;

#[cfg(test)]
mod test_support;

pub use config::{SessionConfig, StaticCapabilities};
pub use contacts::{ContactsSync, DeferredRoute};
pub use errors::{
    BootstrapError, BroadcastFailure, ConfigError, ContactsError, FailureClass, LaunchFailure,
    RefreshError, ServiceError,
};
pub use market::{format_fiat, MarketCache, MarketRefresh};
pub use metadata::{MetadataBootstrap, MetadataState};
pub use orchestrator::{LaunchOutcome, SessionOrchestrator};
pub use ports::SessionPorts;
pub use purchase::PurchaseGate;
pub use session::{SessionScope, SessionState};

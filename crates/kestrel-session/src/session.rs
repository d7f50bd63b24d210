//! Per-session scope: identity, task registry and event registration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use kestrel_core::{RegistrationId, TaskRegistry};
use parking_lot::Mutex;

use crate::model::SessionId;

/// Lifecycle of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No wallet logged in, or the last launch routed to login.
    NotAuthenticated,
    /// A launch is running.
    Bootstrapping,
    /// The launch finished, with or without a failure.
    Ready,
    /// [`teardown`](crate::SessionOrchestrator::teardown) ran.
    TornDown,
}

/// Everything owned by one authenticated session.
///
/// Background work checks [`is_live`](Self::is_live) before delivering results,
/// so nothing started here reaches the UI after the scope is closed.
#[derive(Debug)]
pub struct SessionScope {
    id: SessionId,
    tasks: TaskRegistry,
    closed: AtomicBool,
    notifications_subscribed: AtomicBool,
    notification_registration: Mutex<Option<RegistrationId>>,
}

impl SessionScope {
    /// Live scope with a fresh id.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            id: SessionId::new(),
            tasks: TaskRegistry::new(),
            closed: AtomicBool::new(false),
            notifications_subscribed: AtomicBool::new(false),
            notification_registration: Mutex::new(None),
        })
    }

    /// Session identity.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Background work owned by this session.
    pub fn tasks(&self) -> &TaskRegistry {
        &self.tasks
    }

    /// `false` once the scope is closed.
    pub fn is_live(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    /// Claim the one notification subscription this session may open.
    ///
    /// Returns `true` only for the first caller.
    pub(crate) fn claim_notification_subscription(&self) -> bool {
        self.is_live()
            && self
                .notifications_subscribed
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
    }

    pub(crate) fn set_notification_registration(&self, id: RegistrationId) {
        *self.notification_registration.lock() = Some(id);
    }

    pub(crate) fn take_notification_registration(&self) -> Option<RegistrationId> {
        self.notification_registration.lock().take()
    }

    /// Close the scope and cancel its tasks. Returns `false` if already closed.
    pub(crate) fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.tasks.shutdown();
        tracing::debug!(session = %self.id, "session scope closed");
        true
    }
}

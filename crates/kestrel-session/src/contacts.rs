//! # Peer-Messaging Sync
//!
//! **What it does**: Brings peer messaging up for a session and funnels every
//! "there may be new messages" trigger into one serialized pull.
//!
//! **Triggers** for [`ContactsSync::pull_messages`]:
//! - a `NotificationPayload` on the event bus
//! - the fallback branch of [`ContactsSync::route_deferred_entry`]
//! - an explicit check from the UI layer
//!
//! Pulls are serialized with an async mutex, so overlapping triggers run one
//! after another and never interleave contact-list writes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use kestrel_core::{compose, EventBus};

use crate::errors::{BroadcastFailure, ContactsError, FailureClass, ServiceError};
use crate::model::{ContactsEvent, Message, MetadataNodeSet, NotificationPayload, ProgressMessage};
use crate::ports::{ContactsService, PrefKey, SettingsStore, UiBoundary};
use crate::session::SessionScope;

/// Branch taken by [`ContactsSync::route_deferred_entry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferredRoute {
    /// A contact invitation URI captured before login.
    ContactUri(String),
    /// App was opened from a contacts notification.
    Notification,
    /// Nothing pending; messages were pulled instead.
    PulledMessages(usize),
}

/// Peer-messaging coordinator bound to one session.
pub struct ContactsSync {
    scope: Arc<SessionScope>,
    contacts: Arc<dyn ContactsService>,
    settings: Arc<dyn SettingsStore>,
    ui: Arc<dyn UiBoundary>,
    bus: Arc<EventBus>,
    init_attempted: AtomicBool,
    ready: AtomicBool,
    pull_lock: tokio::sync::Mutex<()>,
}

impl ContactsSync {
    /// Coordinator for `scope`. Nothing runs until the first call.
    pub fn new(
        scope: Arc<SessionScope>,
        contacts: Arc<dyn ContactsService>,
        settings: Arc<dyn SettingsStore>,
        ui: Arc<dyn UiBoundary>,
        bus: Arc<EventBus>,
    ) -> Arc<Self> {
        Arc::new(Self {
            scope,
            contacts,
            settings,
            ui,
            bus,
            init_attempted: AtomicBool::new(false),
            ready: AtomicBool::new(false),
            pull_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Session this coordinator belongs to.
    pub fn session(&self) -> &Arc<SessionScope> {
        &self.scope
    }

    /// Whether `init_contacts_service` completed for this session.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Initialize peer messaging from the session's node set.
    ///
    /// Runs at most once per session, even if the first attempt failed.
    pub async fn init_contacts_service(&self, nodes: MetadataNodeSet) -> Result<(), ContactsError> {
        let active = self.scope.id();
        if nodes.session() != active {
            return Err(ContactsError::StaleSession {
                active,
                found: nodes.session(),
            });
        }
        if self.init_attempted.swap(true, Ordering::AcqRel) {
            return Err(ContactsError::AlreadyInitialized(active));
        }

        let (own, shared) = nodes.into_nodes();
        self.contacts.init_contacts_service(own, shared).await?;
        self.ready.store(true, Ordering::Release);
        tracing::info!(session = %active, "peer messaging initialized");

        self.bus.emit(ContactsEvent::Init);
        Ok(())
    }

    /// Open the session's single notification subscription.
    ///
    /// Returns `false` if this session already subscribed or is closed.
    pub fn subscribe_to_notifications(self: &Arc<Self>) -> bool {
        if !self.scope.claim_notification_subscription() {
            return false;
        }
        let mut events = self.bus.register::<NotificationPayload>();
        self.scope.set_notification_registration(events.id());
        tracing::debug!(session = %self.scope.id(), registration = %events.id(), "subscribed to notifications");

        let this = Arc::clone(self);
        self.scope.tasks().spawn_cancellable(async move {
            while let Some(payload) = events.next().await {
                if !this.scope.is_live() {
                    break;
                }
                tracing::debug!(session = %this.scope.id(), kind = ?payload.kind, "notification received");
                this.pull_messages().await;
            }
        });
        true
    }

    /// Refresh contacts and fetch unread messages.
    ///
    /// Never fails: errors are logged as best-effort failures and yield an
    /// empty list.
    pub async fn pull_messages(&self) -> Vec<Message> {
        if !self.scope.is_live() {
            return Vec::new();
        }
        let _guard = self.pull_lock.lock().await;
        match self.try_pull_messages().await {
            Ok(messages) => messages,
            Err(err) => {
                tracing::warn!(
                    session = %self.scope.id(),
                    class = %FailureClass::BestEffortFailure,
                    error = %err,
                    "message pull failed"
                );
                Vec::new()
            }
        }
    }

    async fn try_pull_messages(&self) -> Result<Vec<Message>, ServiceError> {
        self.contacts.fetch_contacts().await?;
        let contacts = compose::to_list(self.contacts.contact_list()).await?;
        if contacts.is_empty() {
            tracing::debug!(session = %self.scope.id(), "no contacts, skipping message fetch");
            return Ok(Vec::new());
        }
        let messages = compose::to_list(self.contacts.get_messages(true)).await?;
        tracing::debug!(session = %self.scope.id(), count = messages.len(), "messages pulled");
        Ok(messages)
    }

    /// Consume whatever deferred contacts input was captured before launch.
    pub async fn route_deferred_entry(&self) -> DeferredRoute {
        if let Some(uri) = self.settings.get_non_empty(PrefKey::MetadataUri) {
            self.ui.show_progress(ProgressMessage::PleaseWait);
            self.ui.start_contact_flow(Some(uri.clone()));
            self.settings.remove(PrefKey::MetadataUri);
            return DeferredRoute::ContactUri(uri);
        }

        if self.settings.get_bool(PrefKey::ContactsNotification, false) {
            self.ui.show_progress(ProgressMessage::PleaseWait);
            self.ui.start_contact_flow(None);
            self.settings.remove(PrefKey::ContactsNotification);
            return DeferredRoute::Notification;
        }

        DeferredRoute::PulledMessages(self.pull_messages().await.len())
    }

    /// Tell the peer that a requested payment went out.
    ///
    /// Refused with [`ContactsError::NotInitialized`] until peer messaging is
    /// up. Every failure is reported to the UI with its retry context.
    pub async fn broadcast_payment_outcome(
        &self,
        peer_id: &str,
        tx_hash: &str,
        facilitated_tx_id: &str,
        value: u64,
    ) -> Result<(), BroadcastFailure> {
        self.ui.show_progress(ProgressMessage::BroadcastingPayment);
        let result = self.send_broadcast(peer_id, tx_hash, facilitated_tx_id).await;
        self.ui.hide_progress();

        match result {
            Ok(()) => {
                tracing::info!(peer = peer_id, tx = tx_hash, "payment broadcast confirmed to peer");
                self.ui.broadcast_success();
                Ok(())
            }
            Err(err) => {
                let failure = BroadcastFailure {
                    peer_id: peer_id.to_string(),
                    tx_hash: tx_hash.to_string(),
                    facilitated_tx_id: facilitated_tx_id.to_string(),
                    value,
                    reason: err.to_string(),
                };
                tracing::warn!(peer = peer_id, tx = tx_hash, class = %failure.class(), error = %err, "payment broadcast confirmation failed");
                self.ui
                    .broadcast_failed(peer_id, tx_hash, facilitated_tx_id, value);
                Err(failure)
            }
        }
    }

    async fn send_broadcast(
        &self,
        peer_id: &str,
        tx_hash: &str,
        facilitated_tx_id: &str,
    ) -> Result<(), ContactsError> {
        if !self.is_ready() {
            return Err(ContactsError::NotInitialized);
        }
        let contacts = compose::to_list(self.contacts.contact_list()).await?;
        let contact = contacts
            .iter()
            .find(|c| c.mdid == peer_id)
            .ok_or_else(|| ServiceError::not_found(format!("contact {peer_id}")))?;
        let tx = contact
            .facilitated_transaction(facilitated_tx_id)
            .ok_or_else(|| {
                ServiceError::not_found(format!("facilitated transaction {facilitated_tx_id}"))
            })?;
        self.contacts
            .send_payment_broadcasted(&contact.mdid, tx_hash, &tx.id)
            .await?;
        Ok(())
    }
}

//! # Session Orchestrator
//!
//! **What it does**: Drives one app launch from "is anyone logged in?" to a
//! ready session, and owns that session until teardown.
//!
//! ```text
//! start()
//!   ├─ close any previous session
//!   ├─ not logged in ─────────────▶ route_to_login            (NotAuthenticated)
//!   └─ keep-alive, diagnostics, show progress                (Bootstrapping)
//!        ├─ metadata bootstrap ─then─ init peer messaging  ┐
//!        └─ fee & price refresh                            ┴─ all_of
//!      always: hide progress, balance view, prompts, scheme URI
//!      success: purchase gate, deferred contacts entry
//!      failure: ExpectedNoSetup silent, otherwise registration_failed once
//!                                                            (Ready)
//! teardown() ─ cancel tasks, unregister notifications, housekeeping (TornDown)
//! ```
//!
//! Each `start` creates a fresh [`SessionScope`]. Results from an older scope
//! are dropped before they reach the UI.

use std::sync::Arc;

use kestrel_core::{compose, Completable, EventBus};
use parking_lot::Mutex;

use crate::config::SessionConfig;
use crate::contacts::{ContactsSync, DeferredRoute};
use crate::errors::{BroadcastFailure, LaunchFailure};
use crate::market::{MarketCache, MarketRefresh};
use crate::metadata::MetadataBootstrap;
use crate::model::{NotificationPayload, ProgressMessage, SessionId};
use crate::ports::{PrefKey, SessionPorts};
use crate::purchase::PurchaseGate;
use crate::session::{SessionScope, SessionState};

/// Result of [`SessionOrchestrator::start`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// Nobody is logged in; the UI was sent to the login flow.
    LoginRequired,
    /// Bootstrap finished. `failure` is the merged classification, if any.
    Ready {
        /// Session that reached ready.
        session: SessionId,
        /// Merged bootstrap failure.
        failure: Option<LaunchFailure>,
        /// Deferred contacts entry taken after a successful bootstrap.
        deferred: Option<DeferredRoute>,
    },
    /// The session was torn down before bootstrap finished.
    Cancelled {
        /// Session that was cancelled.
        session: SessionId,
    },
}

struct ActiveSession {
    scope: Arc<SessionScope>,
    contacts: Arc<ContactsSync>,
}

/// Composes the coordinators into the launch sequence.
pub struct SessionOrchestrator {
    ports: SessionPorts,
    config: SessionConfig,
    bus: Arc<EventBus>,
    market: MarketRefresh,
    state: Mutex<SessionState>,
    active: Mutex<Option<ActiveSession>>,
}

impl SessionOrchestrator {
    /// Orchestrator with no session. Call [`start`](Self::start) on launch.
    pub fn new(ports: SessionPorts, config: SessionConfig, bus: Arc<EventBus>, cache: MarketCache) -> Self {
        let market = MarketRefresh::new(
            ports.fees.clone(),
            ports.prices.clone(),
            ports.settings.clone(),
            ports.ui.clone(),
            cache,
            config.default_fiat.clone(),
        );
        Self {
            ports,
            config,
            bus,
            market,
            state: Mutex::new(SessionState::NotAuthenticated),
            active: Mutex::new(None),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Id of the open session, if any.
    pub fn session_id(&self) -> Option<SessionId> {
        self.active.lock().as_ref().map(|s| s.scope.id())
    }

    /// Shared fee and price cache.
    pub fn market(&self) -> &MarketCache {
        self.market.cache()
    }

    /// Explorer base URL shown by the UI.
    pub fn current_server_url(&self) -> &str {
        &self.config.explorer_url
    }

    fn set_state(&self, next: SessionState) {
        let previous = std::mem::replace(&mut *self.state.lock(), next);
        if previous != next {
            tracing::debug!(?previous, ?next, "session state transition");
        }
    }

    fn active_parts(&self) -> Option<(Arc<SessionScope>, Arc<ContactsSync>)> {
        self.active
            .lock()
            .as_ref()
            .filter(|s| s.scope.is_live())
            .map(|s| (Arc::clone(&s.scope), Arc::clone(&s.contacts)))
    }

    /// Run the launch sequence.
    pub async fn start(&self) -> LaunchOutcome {
        let previous = self.active.lock().take();
        if let Some(previous) = previous {
            tracing::debug!(session = %previous.scope.id(), "closing previous session");
            Self::close_scope(&self.bus, &previous.scope);
        }

        if !self.ports.access.is_logged_in() {
            tracing::info!("no wallet logged in, routing to login");
            self.set_state(SessionState::NotAuthenticated);
            self.ports.ui.route_to_login();
            return LaunchOutcome::LoginRequired;
        }

        let scope = SessionScope::new();
        let contacts = ContactsSync::new(
            Arc::clone(&scope),
            self.ports.contacts.clone(),
            self.ports.settings.clone(),
            self.ports.ui.clone(),
            Arc::clone(&self.bus),
        );
        *self.active.lock() = Some(ActiveSession {
            scope: Arc::clone(&scope),
            contacts: Arc::clone(&contacts),
        });
        self.set_state(SessionState::Bootstrapping);
        tracing::info!(session = %scope.id(), "session bootstrap started");

        self.restart_keep_alive();
        if scope
            .tasks()
            .run_until_shutdown(self.log_launch_events())
            .await
            .is_none()
        {
            tracing::debug!(session = %scope.id(), "launch cancelled during diagnostics");
            return LaunchOutcome::Cancelled { session: scope.id() };
        }
        self.ports.ui.show_progress(ProgressMessage::PleaseWait);

        let Some(result) = scope
            .tasks()
            .run_until_shutdown(self.bootstrap(&scope, &contacts))
            .await
        else {
            tracing::debug!(session = %scope.id(), "bootstrap cancelled by teardown");
            return LaunchOutcome::Cancelled { session: scope.id() };
        };
        if !scope.is_live() {
            return LaunchOutcome::Cancelled { session: scope.id() };
        }

        self.ports.ui.hide_progress();
        self.ports.ui.start_balance_view();
        self.init_prompts(&scope);
        self.flush_scheme_uri();

        let mut deferred = None;
        match &result {
            Ok(()) => {
                tracing::info!(session = %scope.id(), "session bootstrap complete");
                PurchaseGate::new(
                    Arc::clone(&scope),
                    self.ports.buy.clone(),
                    self.ports.capabilities.clone(),
                    self.ports.ui.clone(),
                )
                .start();
                if self.ports.capabilities.contacts_enabled() {
                    deferred = scope
                        .tasks()
                        .run_until_shutdown(contacts.route_deferred_entry())
                        .await;
                }
            }
            Err(LaunchFailure::ExpectedNoSetup) => {
                tracing::debug!(session = %scope.id(), "metadata nodes not set up for double-encrypted wallet");
            }
            Err(failure @ LaunchFailure::Registration(_)) => {
                tracing::error!(session = %scope.id(), error = %failure, "session registration failed");
                self.ports.ui.registration_failed();
            }
        }

        if scope.is_live() {
            self.set_state(SessionState::Ready);
        }
        LaunchOutcome::Ready {
            session: scope.id(),
            failure: result.err(),
            deferred,
        }
    }

    async fn bootstrap(
        &self,
        scope: &Arc<SessionScope>,
        contacts: &Arc<ContactsSync>,
    ) -> Result<(), LaunchFailure> {
        let metadata = MetadataBootstrap::new(scope.id(), self.ports.payload.clone());
        let messaging: Completable<'_, LaunchFailure> = Box::pin(compose::then(
            async {
                metadata
                    .bootstrap(|| {
                        contacts.subscribe_to_notifications();
                    })
                    .await
                    .map_err(LaunchFailure::from)
            },
            |nodes| async move {
                contacts
                    .init_contacts_service(nodes)
                    .await
                    .map_err(LaunchFailure::from)
            },
        ));
        let refresh: Completable<'_, LaunchFailure> =
            Box::pin(async { self.market.refresh().await.map_err(LaunchFailure::from) });

        compose::all_of(messaging, refresh, LaunchFailure::most_severe).await
    }

    fn restart_keep_alive(&self) {
        let keep_alive = &self.ports.keep_alive;
        if keep_alive.is_running() {
            keep_alive.stop();
        }
        keep_alive.start();
    }

    async fn log_launch_events(&self) {
        let payload = &self.ports.payload;
        let diagnostics = &self.ports.diagnostics;
        diagnostics.log_second_password(payload.is_double_encryption());
        diagnostics.log_backup(payload.is_mnemonic_verified());
        if let Some(Some(balance)) =
            compose::absorb("imported_addresses_balance", payload.imported_addresses_balance()).await
        {
            diagnostics.log_legacy(balance > 0);
        }
    }

    fn init_prompts(&self, scope: &Arc<SessionScope>) {
        let prompts = self.ports.prompts.clone();
        let ui = self.ports.ui.clone();
        let live = Arc::clone(scope);
        scope.tasks().spawn_cancellable(async move {
            if let Some(defaults) = compose::absorb("default_prompts", prompts.default_prompts()).await {
                for prompt in defaults {
                    if live.is_live() {
                        ui.show_default_prompt(prompt);
                    }
                }
            }
            if let Some(custom) = compose::absorb("custom_prompts", prompts.custom_prompts()).await {
                for prompt in custom {
                    if live.is_live() {
                        ui.show_custom_prompt(prompt);
                    }
                }
            }
        });
    }

    fn flush_scheme_uri(&self) {
        let settings = &self.ports.settings;
        if let Some(uri) = settings.get_non_empty(PrefKey::SchemeUrl) {
            settings.remove(PrefKey::SchemeUrl);
            tracing::debug!("handing deferred scheme URI to scanner");
            self.ports.ui.scan_input(&uri);
        }
    }

    /// Pull messages in the background. Returns `false` with no live session.
    pub fn check_for_messages(&self) -> bool {
        let Some((scope, contacts)) = self.active_parts() else {
            return false;
        };
        scope.tasks().spawn_cancellable(async move {
            contacts.pull_messages().await;
        });
        true
    }

    /// Refresh the ticker and push the price to the UI.
    pub async fn update_ticker(&self) -> Option<String> {
        let (scope, _) = self.active_parts()?;
        scope
            .tasks()
            .run_until_shutdown(self.market.refresh_price_display())
            .await
            .flatten()
    }

    /// Confirm a sent payment to the peer who requested it.
    pub async fn broadcast_payment_outcome(
        &self,
        peer_id: &str,
        tx_hash: &str,
        facilitated_tx_id: &str,
        value: u64,
    ) -> Result<(), BroadcastFailure> {
        let Some((_, contacts)) = self.active_parts() else {
            return Err(BroadcastFailure {
                peer_id: peer_id.to_string(),
                tx_hash: tx_hash.to_string(),
                facilitated_tx_id: facilitated_tx_id.to_string(),
                value,
                reason: "no active session".to_string(),
            });
        };
        contacts
            .broadcast_payment_outcome(peer_id, tx_hash, facilitated_tx_id, value)
            .await
    }

    /// Tear down the session. Returns `false` if already torn down.
    pub fn teardown(&self) -> bool {
        {
            let mut state = self.state.lock();
            if *state == SessionState::TornDown {
                return false;
            }
            *state = SessionState::TornDown;
        }

        let active = self.active.lock().take();
        if let Some(active) = active {
            Self::close_scope(&self.bus, &active.scope);
        }

        self.ports.artifacts.delete_qr();
        let settings = &self.ports.settings;
        if settings.get_bool(PrefKey::OnboardingComplete, false)
            && settings.get_bool(PrefKey::LatestAnnouncementSeen, false)
        {
            settings.set_bool(PrefKey::LatestAnnouncementDismissed, true);
        }
        tracing::info!("session torn down");
        true
    }

    fn close_scope(bus: &EventBus, scope: &SessionScope) {
        if !scope.close() {
            return;
        }
        if let Some(registration) = scope.take_notification_registration() {
            bus.unregister::<NotificationPayload>(registration);
        }
    }

    /// Forget the wallet on this device and restart.
    pub fn unpair(&self) {
        tracing::info!("unpairing wallet");
        self.ports.ui.clear_app_shortcuts();
        self.ports.payload.wipe();
        self.ports.settings.log_out();
        self.ports.access.unpair_wallet();
        self.ports.access.restart_app();
        self.ports.access.set_pin(None);
        self.market.cache().clear();
        self.teardown();
    }
}

//! # Ports: collaborator contracts
//!
//! The orchestrator owns no I/O. Everything it sequences is reached through
//! the traits in this module, implemented by the host application (and by
//! `kestrel-testkit` for tests and the CLI simulator).
//!
//! ```text
//!  kestrel-session                       host application
//! ┌──────────────────────┐             ┌────────────────────────┐
//! │ SessionOrchestrator  │──ports──────▶ payload / contacts /   │
//! │   coordinators       │             │ fees / prices / buy    │
//! │                      │◀─UiBoundary─│ UI layer               │
//! └──────────────────────┘             └────────────────────────┘
//! ```
//!
//! Calls that reach the network or disk are `async`; local state lookups
//! (login flag, settings store, feature predicates) are synchronous.

use std::sync::Arc;

use async_trait::async_trait;
use kestrel_core::Observable;

use crate::errors::ServiceError;
use crate::model::{
    Contact, FeeOptions, MetadataNode, MetadataNodeFactory, Message, Prompt, ProgressMessage,
    TickerSnapshot, WebViewLoginDetails,
};

/// Authentication state of the device.
pub trait AccessState: Send + Sync {
    /// Whether a wallet is signed in on this device.
    fn is_logged_in(&self) -> bool;

    /// Forget the paired wallet.
    fn unpair_wallet(&self);

    /// Replace the stored PIN; `None` clears it.
    fn set_pin(&self, pin: Option<String>);

    /// Restart into the launch flow.
    fn restart_app(&self);
}

/// Keys of the persisted settings the orchestrator reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefKey {
    /// Payment URI captured from a scheme link before login.
    SchemeUrl,
    /// Contact invitation URI captured before login.
    MetadataUri,
    /// App was opened from a contacts push notification.
    ContactsNotification,
    /// User-selected fiat currency code.
    SelectedFiat,
    /// Onboarding finished.
    OnboardingComplete,
    /// The newest announcement was shown.
    LatestAnnouncementSeen,
    /// The newest announcement was dismissed.
    LatestAnnouncementDismissed,
}

impl PrefKey {
    /// Storage key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SchemeUrl => "scheme_url",
            Self::MetadataUri => "metadata_uri",
            Self::ContactsNotification => "contacts_notification",
            Self::SelectedFiat => "selected_fiat",
            Self::OnboardingComplete => "onboarding_complete",
            Self::LatestAnnouncementSeen => "latest_announcement_seen",
            Self::LatestAnnouncementDismissed => "latest_announcement_dismissed",
        }
    }
}

/// Persisted key-value settings.
pub trait SettingsStore: Send + Sync {
    /// Stored string for `key`.
    fn get_string(&self, key: PrefKey) -> Option<String>;

    /// Stored flag for `key`, or `default`.
    fn get_bool(&self, key: PrefKey, default: bool) -> bool;

    /// Store a string.
    fn set_string(&self, key: PrefKey, value: &str);

    /// Store a flag.
    fn set_bool(&self, key: PrefKey, value: bool);

    /// Delete `key`.
    fn remove(&self, key: PrefKey);

    /// Clear everything tied to the signed-in wallet.
    fn log_out(&self);

    /// Non-empty string value for `key`.
    fn get_non_empty(&self, key: PrefKey) -> Option<String> {
        self.get_string(key).filter(|v| !v.is_empty())
    }
}

/// Wallet payload and metadata node access.
#[async_trait]
pub trait PayloadService: Send + Sync {
    /// Load persisted metadata node pointers. `true` when they exist.
    async fn load_nodes(&self) -> Result<bool, ServiceError>;

    /// Derive and persist new metadata nodes.
    async fn generate_nodes(&self, second_password: Option<String>) -> Result<(), ServiceError>;

    /// Node pair derived from the loaded pointers.
    async fn metadata_node_factory(&self) -> Result<MetadataNodeFactory, ServiceError>;

    /// Whether the payload needs a second password.
    fn is_double_encryption(&self) -> bool;

    /// Whether the user confirmed the recovery phrase.
    fn is_mnemonic_verified(&self) -> bool;

    /// Balance held by imported (non-HD) addresses, if known.
    async fn imported_addresses_balance(&self) -> Result<Option<u64>, ServiceError>;

    /// Drop the decrypted payload from memory.
    fn wipe(&self);
}

/// Peer-messaging service.
#[async_trait]
pub trait ContactsService: Send + Sync {
    /// Bring peer messaging up on the given nodes.
    async fn init_contacts_service(
        &self,
        metadata_node: MetadataNode,
        shared_metadata_node: MetadataNode,
    ) -> Result<(), ServiceError>;

    /// Refresh the contact list from the remote store.
    async fn fetch_contacts(&self) -> Result<(), ServiceError>;

    /// Contacts as currently stored locally.
    fn contact_list(&self) -> Observable<Contact, ServiceError>;

    /// Unread messages; `mark_read` flags them as processed.
    fn get_messages(&self, mark_read: bool) -> Observable<Message, ServiceError>;

    /// Tell `mdid` that `tx_hash` settles `facilitated_tx_id`.
    async fn send_payment_broadcasted(
        &self,
        mdid: &str,
        tx_hash: &str,
        facilitated_tx_id: &str,
    ) -> Result<(), ServiceError>;
}

/// Dynamic fee source.
pub trait FeeService: Send + Sync {
    /// Fee snapshots; usually one, then completion.
    fn fee_options(&self) -> Observable<FeeOptions, ServiceError>;
}

/// Exchange-rate source.
#[async_trait]
pub trait PriceService: Send + Sync {
    /// Fetch the current price table.
    async fn update_ticker(&self) -> Result<TickerSnapshot, ServiceError>;
}

/// Buy/sell partner integration.
#[async_trait]
pub trait BuyService: Send + Sync {
    /// Whether buying is available, re-emitted on change.
    fn can_buy(&self) -> Observable<bool, ServiceError>;

    /// Transaction hashes of trades as they complete.
    fn watch_pending_trades(&self) -> Observable<String, ServiceError>;

    /// Credentials for the exchange web session.
    async fn web_view_login_details(&self) -> Result<WebViewLoginDetails, ServiceError>;
}

/// Runtime feature predicates.
pub trait Capabilities: Send + Sync {
    /// Peer messaging is available.
    fn contacts_enabled(&self) -> bool;

    /// The purchase gate may start.
    fn buy_sell_permitted(&self) -> bool;
}

/// Background keep-alive (websocket) service.
pub trait KeepAliveService: Send + Sync {
    /// Whether the service is up.
    fn is_running(&self) -> bool;

    /// Start the service.
    fn start(&self);

    /// Stop the service.
    fn stop(&self);
}

/// Launch-time diagnostic events.
pub trait LaunchDiagnostics: Send + Sync {
    /// Record whether a second password is set.
    fn log_second_password(&self, enabled: bool);

    /// Record whether the recovery phrase was verified.
    fn log_backup(&self, mnemonic_verified: bool);

    /// Record whether imported addresses hold funds.
    fn log_legacy(&self, has_legacy_balance: bool);
}

/// Source of post-launch prompts and announcements.
#[async_trait]
pub trait PromptSource: Send + Sync {
    /// Built-in prompts.
    async fn default_prompts(&self) -> Result<Vec<Prompt>, ServiceError>;

    /// Server-driven announcements.
    async fn custom_prompts(&self) -> Result<Vec<Prompt>, ServiceError>;
}

/// Cached display artifacts.
pub trait ArtifactStore: Send + Sync {
    /// Remove the cached receive QR code.
    fn delete_qr(&self);
}

/// Fire-and-forget callbacks into the UI layer.
pub trait UiBoundary: Send + Sync {
    /// Show the blocking progress indicator.
    fn show_progress(&self, message: ProgressMessage);

    /// Hide the progress indicator.
    fn hide_progress(&self);

    /// Send the user to the login flow.
    fn route_to_login(&self);

    /// Show the balance screen.
    fn start_balance_view(&self);

    /// Open the contacts flow, optionally with an invitation URI.
    fn start_contact_flow(&self, uri: Option<String>);

    /// Show the one-off registration failure notice.
    fn registration_failed(&self);

    /// Payment confirmation reached the peer.
    fn broadcast_success(&self);

    /// Payment confirmation failed; the UI may offer a retry.
    fn broadcast_failed(&self, peer_id: &str, tx_hash: &str, facilitated_tx_id: &str, value: u64);

    /// New formatted price for the selected fiat.
    fn price_updated(&self, price: &str);

    /// Buy availability changed.
    fn buy_enabled(&self, enabled: bool);

    /// A pending trade completed.
    fn trade_completed(&self, tx_hash: &str);

    /// Hand off credentials for the exchange web session.
    fn web_session_ready(&self, details: WebViewLoginDetails);

    /// Show a built-in prompt.
    fn show_default_prompt(&self, prompt: Prompt);

    /// Show a server-driven prompt.
    fn show_custom_prompt(&self, prompt: Prompt);

    /// Remove launcher shortcuts tied to the wallet.
    fn clear_app_shortcuts(&self);

    /// Hand a captured payment URI to the scanner flow.
    fn scan_input(&self, uri: &str);
}

/// Every collaborator the orchestrator needs, bundled for injection.
#[derive(Clone)]
#[allow(missing_docs)]
pub struct SessionPorts {
    pub access: Arc<dyn AccessState>,
    pub settings: Arc<dyn SettingsStore>,
    pub payload: Arc<dyn PayloadService>,
    pub contacts: Arc<dyn ContactsService>,
    pub fees: Arc<dyn FeeService>,
    pub prices: Arc<dyn PriceService>,
    pub buy: Arc<dyn BuyService>,
    pub capabilities: Arc<dyn Capabilities>,
    pub keep_alive: Arc<dyn KeepAliveService>,
    pub diagnostics: Arc<dyn LaunchDiagnostics>,
    pub prompts: Arc<dyn PromptSource>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub ui: Arc<dyn UiBoundary>,
}

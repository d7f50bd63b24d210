//! Scripted collaborators.
//!
//! Each mock keeps its behaviour in a plain `*Script` struct behind a mutex.
//! Tests adjust it through `script()` before or between calls, and every call
//! is recorded in the shared [`CallJournal`] as `"<port>.<method>"`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use kestrel_core::Observable;
use kestrel_session::errors::ServiceError;
use kestrel_session::model::{
    Contact, FeeOptions, Message, MetadataNode, MetadataNodeFactory, Prompt, TickerSnapshot,
    WebViewLoginDetails,
};
use kestrel_session::ports::{
    AccessState, ArtifactStore, BuyService, Capabilities, ContactsService, FeeService,
    KeepAliveService, LaunchDiagnostics, PayloadService, PrefKey, PriceService, PromptSource,
    SettingsStore,
};
use parking_lot::{Mutex, MutexGuard};

use crate::journal::CallJournal;

async fn pause(delay: Option<Duration>) {
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
}

// ============================================================================
// Access and settings
// ============================================================================

/// Logged in by default, no PIN.
pub struct MockAccess {
    logged_in: AtomicBool,
    pin: Mutex<Option<String>>,
    journal: CallJournal,
}

impl MockAccess {
    /// Fresh collaborator recording into `journal`.
    pub fn new(journal: CallJournal) -> Self {
        Self {
            logged_in: AtomicBool::new(true),
            pin: Mutex::new(Some("1234".to_string())),
            journal,
        }
    }

    /// Flip the logged-in flag.
    pub fn set_logged_in(&self, logged_in: bool) {
        self.logged_in.store(logged_in, Ordering::SeqCst);
    }

    /// PIN as last set.
    pub fn pin(&self) -> Option<String> {
        self.pin.lock().clone()
    }
}

impl AccessState for MockAccess {
    fn is_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::SeqCst)
    }

    fn unpair_wallet(&self) {
        self.journal.record("access.unpair_wallet");
        self.logged_in.store(false, Ordering::SeqCst);
    }

    fn set_pin(&self, pin: Option<String>) {
        self.journal.record("access.set_pin");
        *self.pin.lock() = pin;
    }

    fn restart_app(&self) {
        self.journal.record("access.restart_app");
    }
}

/// Settings backed by two hash maps.
pub struct MemorySettings {
    strings: Mutex<HashMap<PrefKey, String>>,
    bools: Mutex<HashMap<PrefKey, bool>>,
    journal: CallJournal,
}

impl MemorySettings {
    /// Fresh collaborator recording into `journal`.
    pub fn new(journal: CallJournal) -> Self {
        Self {
            strings: Mutex::new(HashMap::new()),
            bools: Mutex::new(HashMap::new()),
            journal,
        }
    }
}

impl SettingsStore for MemorySettings {
    fn get_string(&self, key: PrefKey) -> Option<String> {
        self.strings.lock().get(&key).cloned()
    }

    fn get_bool(&self, key: PrefKey, default: bool) -> bool {
        self.bools.lock().get(&key).copied().unwrap_or(default)
    }

    fn set_string(&self, key: PrefKey, value: &str) {
        self.strings.lock().insert(key, value.to_string());
    }

    fn set_bool(&self, key: PrefKey, value: bool) {
        self.bools.lock().insert(key, value);
    }

    fn remove(&self, key: PrefKey) {
        self.journal.record(format!("settings.remove.{}", key.as_str()));
        self.strings.lock().remove(&key);
        self.bools.lock().remove(&key);
    }

    fn log_out(&self) {
        self.journal.record("settings.log_out");
        self.strings.lock().clear();
        self.bools.lock().clear();
    }
}

// ============================================================================
// Payload
// ============================================================================

#[allow(missing_docs)]
#[derive(Debug, Clone)]
pub struct PayloadScript {
    pub nodes_exist: bool,
    pub double_encrypted: bool,
    pub mnemonic_verified: bool,
    pub imported_balance: Result<Option<u64>, ServiceError>,
    pub load_error: Option<ServiceError>,
    pub generate_error: Option<ServiceError>,
    pub factory_error: Option<ServiceError>,
    pub load_delay: Option<Duration>,
    pub balance_delay: Option<Duration>,
}

impl Default for PayloadScript {
    fn default() -> Self {
        Self {
            nodes_exist: true,
            double_encrypted: false,
            mnemonic_verified: true,
            imported_balance: Ok(Some(0)),
            load_error: None,
            generate_error: None,
            factory_error: None,
            load_delay: None,
            balance_delay: None,
        }
    }
}

/// [`PayloadService`] driven by a [`PayloadScript`].
pub struct ScriptedPayload {
    script: Mutex<PayloadScript>,
    journal: CallJournal,
}

impl ScriptedPayload {
    /// Fresh collaborator recording into `journal`.
    pub fn new(journal: CallJournal) -> Self {
        Self {
            script: Mutex::new(PayloadScript::default()),
            journal,
        }
    }

    /// Edit the script; keep the guard short-lived.
    pub fn script(&self) -> MutexGuard<'_, PayloadScript> {
        self.script.lock()
    }
}

#[async_trait]
impl PayloadService for ScriptedPayload {
    async fn load_nodes(&self) -> Result<bool, ServiceError> {
        self.journal.record("payload.load_nodes");
        let delay = self.script().load_delay;
        pause(delay).await;
        let script = self.script();
        match &script.load_error {
            Some(err) => Err(err.clone()),
            None => Ok(script.nodes_exist),
        }
    }

    async fn generate_nodes(&self, _second_password: Option<String>) -> Result<(), ServiceError> {
        self.journal.record("payload.generate_nodes");
        let mut script = self.script();
        if let Some(err) = &script.generate_error {
            return Err(err.clone());
        }
        script.nodes_exist = true;
        Ok(())
    }

    async fn metadata_node_factory(&self) -> Result<MetadataNodeFactory, ServiceError> {
        self.journal.record("payload.metadata_node_factory");
        if let Some(err) = &self.script().factory_error {
            return Err(err.clone());
        }
        Ok(MetadataNodeFactory {
            metadata_node: MetadataNode::from_bytes(b"metadata-node".to_vec()),
            shared_metadata_node: MetadataNode::from_bytes(b"shared-metadata-node".to_vec()),
        })
    }

    fn is_double_encryption(&self) -> bool {
        self.script().double_encrypted
    }

    fn is_mnemonic_verified(&self) -> bool {
        self.script().mnemonic_verified
    }

    async fn imported_addresses_balance(&self) -> Result<Option<u64>, ServiceError> {
        self.journal.record("payload.imported_addresses_balance");
        let delay = self.script().balance_delay;
        pause(delay).await;
        self.script().imported_balance.clone()
    }

    fn wipe(&self) {
        self.journal.record("payload.wipe");
    }
}

// ============================================================================
// Contacts
// ============================================================================

#[allow(missing_docs)]
#[derive(Debug, Clone, Default)]
pub struct ContactsScript {
    pub contacts: Vec<Contact>,
    pub messages: Vec<Message>,
    pub init_error: Option<ServiceError>,
    pub fetch_error: Option<ServiceError>,
    pub send_error: Option<ServiceError>,
    pub fetch_delay: Option<Duration>,
}

/// [`ContactsService`] that also tracks how many fetches overlap.
pub struct ScriptedContacts {
    script: Mutex<ContactsScript>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    journal: CallJournal,
}

impl ScriptedContacts {
    /// Fresh collaborator recording into `journal`.
    pub fn new(journal: CallJournal) -> Self {
        Self {
            script: Mutex::new(ContactsScript::default()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            journal,
        }
    }

    /// Edit the script; keep the guard short-lived.
    pub fn script(&self) -> MutexGuard<'_, ContactsScript> {
        self.script.lock()
    }

    /// Highest number of `fetch_contacts` calls observed running at once.
    pub fn max_concurrent_fetches(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContactsService for ScriptedContacts {
    async fn init_contacts_service(
        &self,
        _metadata_node: MetadataNode,
        _shared_metadata_node: MetadataNode,
    ) -> Result<(), ServiceError> {
        self.journal.record("contacts.init_contacts_service");
        match &self.script().init_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn fetch_contacts(&self) -> Result<(), ServiceError> {
        self.journal.record("contacts.fetch_contacts");
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        let delay = self.script().fetch_delay;
        pause(delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match &self.script().fetch_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn contact_list(&self) -> Observable<Contact, ServiceError> {
        self.journal.record("contacts.contact_list");
        let contacts = self.script().contacts.clone();
        futures::stream::iter(contacts.into_iter().map(Ok)).boxed()
    }

    fn get_messages(&self, mark_read: bool) -> Observable<Message, ServiceError> {
        self.journal.record(format!("contacts.get_messages.{mark_read}"));
        let messages = self.script().messages.clone();
        futures::stream::iter(messages.into_iter().map(Ok)).boxed()
    }

    async fn send_payment_broadcasted(
        &self,
        mdid: &str,
        tx_hash: &str,
        facilitated_tx_id: &str,
    ) -> Result<(), ServiceError> {
        self.journal.record(format!(
            "contacts.send_payment_broadcasted.{mdid}.{tx_hash}.{facilitated_tx_id}"
        ));
        match &self.script().send_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Fees and prices
// ============================================================================

#[allow(missing_docs)]
#[derive(Debug, Clone)]
pub struct MarketScript {
    pub fee_options: Vec<Result<FeeOptions, ServiceError>>,
    pub ticker: Result<TickerSnapshot, ServiceError>,
    pub ticker_delay: Option<Duration>,
}

impl Default for MarketScript {
    fn default() -> Self {
        Self {
            fee_options: vec![Ok(FeeOptions {
                regular_fee: 25,
                priority_fee: 50,
                ..Default::default()
            })],
            ticker: Ok(TickerSnapshot::default()
                .with_price("USD", 6543.21, "$")
                .with_price("EUR", 5432.1, "€")),
            ticker_delay: None,
        }
    }
}

/// Implements both [`FeeService`] and [`PriceService`].
pub struct ScriptedMarket {
    script: Mutex<MarketScript>,
    journal: CallJournal,
}

impl ScriptedMarket {
    /// Fresh collaborator recording into `journal`.
    pub fn new(journal: CallJournal) -> Self {
        Self {
            script: Mutex::new(MarketScript::default()),
            journal,
        }
    }

    /// Edit the script; keep the guard short-lived.
    pub fn script(&self) -> MutexGuard<'_, MarketScript> {
        self.script.lock()
    }
}

impl FeeService for ScriptedMarket {
    fn fee_options(&self) -> Observable<FeeOptions, ServiceError> {
        self.journal.record("fees.fee_options");
        futures::stream::iter(self.script().fee_options.clone()).boxed()
    }
}

#[async_trait]
impl PriceService for ScriptedMarket {
    async fn update_ticker(&self) -> Result<TickerSnapshot, ServiceError> {
        self.journal.record("prices.update_ticker");
        let delay = self.script().ticker_delay;
        pause(delay).await;
        self.script().ticker.clone()
    }
}

// ============================================================================
// Buy / sell
// ============================================================================

#[allow(missing_docs)]
#[derive(Debug, Clone)]
pub struct BuyScript {
    pub can_buy: Vec<Result<bool, ServiceError>>,
    pub completed_trades: Vec<String>,
    pub trades_error: Option<ServiceError>,
    /// Keep the trade stream open after the scripted trades.
    pub trades_stay_open: bool,
    pub login_details: Result<WebViewLoginDetails, ServiceError>,
}

impl Default for BuyScript {
    fn default() -> Self {
        Self {
            can_buy: vec![Ok(true)],
            completed_trades: Vec::new(),
            trades_error: None,
            trades_stay_open: false,
            login_details: Ok(WebViewLoginDetails::default()),
        }
    }
}

/// [`BuyService`] replaying a [`BuyScript`].
pub struct ScriptedBuy {
    script: Mutex<BuyScript>,
    journal: CallJournal,
}

impl ScriptedBuy {
    /// Fresh collaborator recording into `journal`.
    pub fn new(journal: CallJournal) -> Self {
        Self {
            script: Mutex::new(BuyScript::default()),
            journal,
        }
    }

    /// Edit the script; keep the guard short-lived.
    pub fn script(&self) -> MutexGuard<'_, BuyScript> {
        self.script.lock()
    }
}

#[async_trait]
impl BuyService for ScriptedBuy {
    fn can_buy(&self) -> Observable<bool, ServiceError> {
        self.journal.record("buy.can_buy");
        futures::stream::iter(self.script().can_buy.clone()).boxed()
    }

    fn watch_pending_trades(&self) -> Observable<String, ServiceError> {
        self.journal.record("buy.watch_pending_trades");
        let script = self.script();
        let mut items: Vec<Result<String, ServiceError>> =
            script.completed_trades.iter().cloned().map(Ok).collect();
        if let Some(err) = &script.trades_error {
            items.push(Err(err.clone()));
        }
        let trades = futures::stream::iter(items);
        if script.trades_stay_open {
            trades.chain(futures::stream::pending()).boxed()
        } else {
            trades.boxed()
        }
    }

    async fn web_view_login_details(&self) -> Result<WebViewLoginDetails, ServiceError> {
        self.journal.record("buy.web_view_login_details");
        self.script().login_details.clone()
    }
}

// ============================================================================
// Remaining ports
// ============================================================================

/// Feature predicates that tests can flip at runtime.
pub struct MockCapabilities {
    contacts_enabled: AtomicBool,
    buy_sell_permitted: AtomicBool,
}

impl MockCapabilities {
    /// Capabilities with the given flags.
    pub fn new(contacts_enabled: bool, buy_sell_permitted: bool) -> Self {
        Self {
            contacts_enabled: AtomicBool::new(contacts_enabled),
            buy_sell_permitted: AtomicBool::new(buy_sell_permitted),
        }
    }

    /// Toggle peer messaging.
    pub fn set_contacts_enabled(&self, enabled: bool) {
        self.contacts_enabled.store(enabled, Ordering::SeqCst);
    }

    /// Toggle the purchase gate.
    pub fn set_buy_sell_permitted(&self, permitted: bool) {
        self.buy_sell_permitted.store(permitted, Ordering::SeqCst);
    }
}

impl Capabilities for MockCapabilities {
    fn contacts_enabled(&self) -> bool {
        self.contacts_enabled.load(Ordering::SeqCst)
    }

    fn buy_sell_permitted(&self) -> bool {
        self.buy_sell_permitted.load(Ordering::SeqCst)
    }
}

/// Keep-alive service that only flips a flag.
pub struct MockKeepAlive {
    running: AtomicBool,
    journal: CallJournal,
}

impl MockKeepAlive {
    /// Fresh collaborator recording into `journal`.
    pub fn new(journal: CallJournal) -> Self {
        Self {
            running: AtomicBool::new(false),
            journal,
        }
    }

    /// Pretend the service is already up, or down.
    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }
}

impl KeepAliveService for MockKeepAlive {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn start(&self) {
        self.journal.record("keep_alive.start");
        self.running.store(true, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.journal.record("keep_alive.stop");
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Journals each diagnostic with its value.
pub struct RecordingDiagnostics {
    journal: CallJournal,
}

impl RecordingDiagnostics {
    /// Fresh collaborator recording into `journal`.
    pub fn new(journal: CallJournal) -> Self {
        Self { journal }
    }
}

impl LaunchDiagnostics for RecordingDiagnostics {
    fn log_second_password(&self, enabled: bool) {
        self.journal.record(format!("diagnostics.second_password.{enabled}"));
    }

    fn log_backup(&self, mnemonic_verified: bool) {
        self.journal.record(format!("diagnostics.backup.{mnemonic_verified}"));
    }

    fn log_legacy(&self, has_legacy_balance: bool) {
        self.journal.record(format!("diagnostics.legacy.{has_legacy_balance}"));
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone)]
pub struct PromptScript {
    pub defaults: Result<Vec<Prompt>, ServiceError>,
    pub custom: Result<Vec<Prompt>, ServiceError>,
}

impl Default for PromptScript {
    fn default() -> Self {
        Self {
            defaults: Ok(Vec::new()),
            custom: Ok(Vec::new()),
        }
    }
}

/// [`PromptSource`] replaying a [`PromptScript`].
pub struct ScriptedPrompts {
    script: Mutex<PromptScript>,
    journal: CallJournal,
}

impl ScriptedPrompts {
    /// Fresh collaborator recording into `journal`.
    pub fn new(journal: CallJournal) -> Self {
        Self {
            script: Mutex::new(PromptScript::default()),
            journal,
        }
    }

    /// Edit the script; keep the guard short-lived.
    pub fn script(&self) -> MutexGuard<'_, PromptScript> {
        self.script.lock()
    }
}

#[async_trait]
impl PromptSource for ScriptedPrompts {
    async fn default_prompts(&self) -> Result<Vec<Prompt>, ServiceError> {
        self.journal.record("prompts.default_prompts");
        self.script().defaults.clone()
    }

    async fn custom_prompts(&self) -> Result<Vec<Prompt>, ServiceError> {
        self.journal.record("prompts.custom_prompts");
        self.script().custom.clone()
    }
}

#[allow(missing_docs)]
pub struct MockArtifacts {
    journal: CallJournal,
}

impl MockArtifacts {
    /// Fresh collaborator recording into `journal`.
    pub fn new(journal: CallJournal) -> Self {
        Self { journal }
    }
}

impl ArtifactStore for MockArtifacts {
    fn delete_qr(&self) {
        self.journal.record("artifacts.delete_qr");
    }
}

//! Minimal in-crate fakes for unit tests. The full scripted collaborators live
//! in `kestrel-testkit` and back the integration tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use kestrel_core::{EventBus, Observable};
use parking_lot::Mutex;

use crate::contacts::ContactsSync;
use crate::errors::ServiceError;
use crate::model::{
    Contact, MetadataNode, Message, Prompt, ProgressMessage, WebViewLoginDetails,
};
use crate::ports::{ContactsService, PrefKey, SettingsStore, UiBoundary};
use crate::session::SessionScope;

#[derive(Default)]
pub(crate) struct MemorySettings {
    strings: Mutex<HashMap<PrefKey, String>>,
    bools: Mutex<HashMap<PrefKey, bool>>,
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
        self.strings.lock().remove(&key);
        self.bools.lock().remove(&key);
    }

    fn log_out(&self) {
        self.strings.lock().clear();
        self.bools.lock().clear();
    }
}

/// Records every UI callback as a short string.
#[derive(Default)]
pub(crate) struct LogUi {
    pub(crate) calls: Mutex<Vec<String>>,
}

impl LogUi {
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn push(&self, call: String) {
        self.calls.lock().push(call);
    }
}

impl UiBoundary for LogUi {
    fn show_progress(&self, message: ProgressMessage) {
        self.push(format!("show_progress:{message:?}"));
    }

    fn hide_progress(&self) {
        self.push("hide_progress".into());
    }

    fn route_to_login(&self) {
        self.push("route_to_login".into());
    }

    fn start_balance_view(&self) {
        self.push("start_balance_view".into());
    }

    fn start_contact_flow(&self, uri: Option<String>) {
        self.push(format!("start_contact_flow:{}", uri.unwrap_or_default()));
    }

    fn registration_failed(&self) {
        self.push("registration_failed".into());
    }

    fn broadcast_success(&self) {
        self.push("broadcast_success".into());
    }

    fn broadcast_failed(&self, peer_id: &str, tx_hash: &str, facilitated_tx_id: &str, value: u64) {
        self.push(format!("broadcast_failed:{peer_id}:{tx_hash}:{facilitated_tx_id}:{value}"));
    }

    fn price_updated(&self, price: &str) {
        self.push(format!("price_updated:{price}"));
    }

    fn buy_enabled(&self, enabled: bool) {
        self.push(format!("buy_enabled:{enabled}"));
    }

    fn trade_completed(&self, tx_hash: &str) {
        self.push(format!("trade_completed:{tx_hash}"));
    }

    fn web_session_ready(&self, _details: WebViewLoginDetails) {
        self.push("web_session_ready".into());
    }

    fn show_default_prompt(&self, prompt: Prompt) {
        self.push(format!("default_prompt:{}", prompt.id));
    }

    fn show_custom_prompt(&self, prompt: Prompt) {
        self.push(format!("custom_prompt:{}", prompt.id));
    }

    fn clear_app_shortcuts(&self) {
        self.push("clear_app_shortcuts".into());
    }

    fn scan_input(&self, uri: &str) {
        self.push(format!("scan_input:{uri}"));
    }
}

#[derive(Default)]
pub(crate) struct StubContacts {
    pub(crate) contacts: Mutex<Vec<Contact>>,
    pub(crate) messages: Mutex<Vec<Message>>,
    pub(crate) fail_fetch: bool,
    pub(crate) calls: Mutex<Vec<String>>,
}

impl StubContacts {
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub(crate) fn count(&self, call: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.as_str() == call).count()
    }
}

#[async_trait]
impl ContactsService for StubContacts {
    async fn init_contacts_service(
        &self,
        _metadata_node: MetadataNode,
        _shared_metadata_node: MetadataNode,
    ) -> Result<(), ServiceError> {
        self.calls.lock().push("init".into());
        Ok(())
    }

    async fn fetch_contacts(&self) -> Result<(), ServiceError> {
        self.calls.lock().push("fetch".into());
        if self.fail_fetch {
            return Err(ServiceError::network("unreachable"));
        }
        Ok(())
    }

    fn contact_list(&self) -> Observable<Contact, ServiceError> {
        self.calls.lock().push("contact_list".into());
        let contacts = self.contacts.lock().clone();
        futures::stream::iter(contacts.into_iter().map(Ok)).boxed()
    }

    fn get_messages(&self, mark_read: bool) -> Observable<Message, ServiceError> {
        self.calls.lock().push(format!("get_messages:{mark_read}"));
        let messages = self.messages.lock().clone();
        futures::stream::iter(messages.into_iter().map(Ok)).boxed()
    }

    async fn send_payment_broadcasted(
        &self,
        mdid: &str,
        tx_hash: &str,
        facilitated_tx_id: &str,
    ) -> Result<(), ServiceError> {
        self.calls
            .lock()
            .push(format!("send:{mdid}:{tx_hash}:{facilitated_tx_id}"));
        Ok(())
    }
}

pub(crate) struct ContactsHarness {
    pub(crate) scope: Arc<SessionScope>,
    pub(crate) contacts: Arc<StubContacts>,
    pub(crate) settings: Arc<MemorySettings>,
    pub(crate) ui: Arc<LogUi>,
    pub(crate) bus: Arc<EventBus>,
    pub(crate) sync: Arc<ContactsSync>,
}

pub(crate) fn contacts_harness(contacts: StubContacts) -> ContactsHarness {
    let scope = SessionScope::new();
    let contacts = Arc::new(contacts);
    let settings = Arc::new(MemorySettings::default());
    let ui = Arc::new(LogUi::default());
    let bus = Arc::new(EventBus::new());
    let sync = ContactsSync::new(
        scope.clone(),
        contacts.clone(),
        settings.clone(),
        ui.clone(),
        bus.clone(),
    );
    ContactsHarness {
        scope,
        contacts,
        settings,
        ui,
        bus,
        sync,
    }
}

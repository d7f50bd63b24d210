//! Wires the scripted collaborators into [`SessionPorts`].

use std::sync::Arc;

use kestrel_core::EventBus;
use kestrel_session::model::{Contact, FacilitatedTransaction, NotificationPayload};
use kestrel_session::{MarketCache, SessionConfig, SessionOrchestrator, SessionPorts};

use crate::journal::CallJournal;
use crate::mocks::{
    MemorySettings, MockAccess, MockArtifacts, MockCapabilities, MockKeepAlive,
    RecordingDiagnostics, ScriptedBuy, ScriptedContacts, ScriptedMarket, ScriptedPayload,
    ScriptedPrompts,
};
use crate::ui::RecordingUi;

/// Every collaborator of a session, scripted and observable.
///
/// Defaults: logged in, metadata nodes present, no contacts, one fee snapshot,
/// a USD/EUR ticker, buy/sell and contacts enabled.
#[allow(missing_docs)]
pub struct TestHarness {
    pub journal: CallJournal,
    pub access: Arc<MockAccess>,
    pub settings: Arc<MemorySettings>,
    pub payload: Arc<ScriptedPayload>,
    pub contacts: Arc<ScriptedContacts>,
    pub market: Arc<ScriptedMarket>,
    pub buy: Arc<ScriptedBuy>,
    pub capabilities: Arc<MockCapabilities>,
    pub keep_alive: Arc<MockKeepAlive>,
    pub diagnostics: Arc<RecordingDiagnostics>,
    pub prompts: Arc<ScriptedPrompts>,
    pub artifacts: Arc<MockArtifacts>,
    pub ui: Arc<RecordingUi>,
    pub bus: Arc<EventBus>,
    pub cache: MarketCache,
}

impl TestHarness {
    /// Harness with every collaborator at its default script.
    pub fn new() -> Self {
        let journal = CallJournal::new();
        Self {
            access: Arc::new(MockAccess::new(journal.clone())),
            settings: Arc::new(MemorySettings::new(journal.clone())),
            payload: Arc::new(ScriptedPayload::new(journal.clone())),
            contacts: Arc::new(ScriptedContacts::new(journal.clone())),
            market: Arc::new(ScriptedMarket::new(journal.clone())),
            buy: Arc::new(ScriptedBuy::new(journal.clone())),
            capabilities: Arc::new(MockCapabilities::new(true, true)),
            keep_alive: Arc::new(MockKeepAlive::new(journal.clone())),
            diagnostics: Arc::new(RecordingDiagnostics::new(journal.clone())),
            prompts: Arc::new(ScriptedPrompts::new(journal.clone())),
            artifacts: Arc::new(MockArtifacts::new(journal.clone())),
            ui: Arc::new(RecordingUi::new()),
            bus: Arc::new(EventBus::new()),
            cache: MarketCache::new(),
            journal,
        }
    }

    /// Ports backed by this harness's collaborators.
    pub fn ports(&self) -> SessionPorts {
        SessionPorts {
            access: self.access.clone(),
            settings: self.settings.clone(),
            payload: self.payload.clone(),
            contacts: self.contacts.clone(),
            fees: self.market.clone(),
            prices: self.market.clone(),
            buy: self.buy.clone(),
            capabilities: self.capabilities.clone(),
            keep_alive: self.keep_alive.clone(),
            diagnostics: self.diagnostics.clone(),
            prompts: self.prompts.clone(),
            artifacts: self.artifacts.clone(),
            ui: self.ui.clone(),
        }
    }

    /// Orchestrator with [`SessionConfig::for_testing`].
    pub fn orchestrator(&self) -> SessionOrchestrator {
        self.orchestrator_with(SessionConfig::for_testing())
    }

    /// Orchestrator with `config`, sharing this harness's bus and cache.
    pub fn orchestrator_with(&self, config: SessionConfig) -> SessionOrchestrator {
        SessionOrchestrator::new(self.ports(), config, self.bus.clone(), self.cache.clone())
    }

    /// Add a contact with one facilitated transaction.
    pub fn add_contact(&self, mdid: &str, facilitated_tx_id: Option<&str>, amount: u64) {
        let mut contact = Contact::new(mdid, mdid);
        if let Some(id) = facilitated_tx_id {
            contact = contact.with_transaction(FacilitatedTransaction {
                id: id.to_string(),
                intended_amount: amount,
                address: None,
                tx_hash: None,
            });
        }
        self.contacts.script().contacts.push(contact);
    }

    /// Publish a push notification on the bus. Returns the receiver count.
    pub fn notify(&self) -> usize {
        self.bus.emit(NotificationPayload {
            title: Some("New message".to_string()),
            body: None,
            kind: Some("contact_request".to_string()),
        })
    }

    /// Number of message pulls started so far.
    pub fn pulls(&self) -> usize {
        self.journal.count("contacts.fetch_contacts")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

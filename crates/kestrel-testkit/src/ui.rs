//! Recording UI boundary.

use kestrel_session::model::{Prompt, ProgressMessage, WebViewLoginDetails};
use kestrel_session::ports::UiBoundary;
use parking_lot::Mutex;

/// One UI callback as observed by [`RecordingUi`].
#[derive(Debug, Clone, PartialEq)]
pub enum UiCall {
    ShowProgress(ProgressMessage),
    HideProgress,
    RouteToLogin,
    StartBalanceView,
    StartContactFlow(Option<String>),
    RegistrationFailed,
    BroadcastSuccess,
    BroadcastFailed {
        peer_id: String,
        tx_hash: String,
        facilitated_tx_id: String,
        value: u64,
    },
    PriceUpdated(String),
    BuyEnabled(bool),
    TradeCompleted(String),
    WebSessionReady(WebViewLoginDetails),
    DefaultPrompt(Prompt),
    CustomPrompt(Prompt),
    ClearAppShortcuts,
    ScanInput(String),
}

/// Records every callback in arrival order.
#[derive(Debug, Default)]
pub struct RecordingUi {
    calls: Mutex<Vec<UiCall>>,
}

impl RecordingUi {
    /// UI with nothing recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call in order.
    pub fn calls(&self) -> Vec<UiCall> {
        self.calls.lock().clone()
    }

    /// How often `call` was made.
    pub fn count(&self, call: &UiCall) -> usize {
        self.calls.lock().iter().filter(|c| *c == call).count()
    }

    /// How many calls satisfy `predicate`.
    pub fn count_matching(&self, predicate: impl Fn(&UiCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| predicate(c)).count()
    }

    /// Whether `call` was made.
    pub fn contains(&self, call: &UiCall) -> bool {
        self.count(call) > 0
    }

    /// Index of the first `call`.
    pub fn position(&self, call: &UiCall) -> Option<usize> {
        self.calls.lock().iter().position(|c| c == call)
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    fn push(&self, call: UiCall) {
        self.calls.lock().push(call);
    }
}

impl UiBoundary for RecordingUi {
    fn show_progress(&self, message: ProgressMessage) {
        self.push(UiCall::ShowProgress(message));
    }

    fn hide_progress(&self) {
        self.push(UiCall::HideProgress);
    }

    fn route_to_login(&self) {
        self.push(UiCall::RouteToLogin);
    }

    fn start_balance_view(&self) {
        self.push(UiCall::StartBalanceView);
    }

    fn start_contact_flow(&self, uri: Option<String>) {
        self.push(UiCall::StartContactFlow(uri));
    }

    fn registration_failed(&self) {
        self.push(UiCall::RegistrationFailed);
    }

    fn broadcast_success(&self) {
        self.push(UiCall::BroadcastSuccess);
    }

    fn broadcast_failed(&self, peer_id: &str, tx_hash: &str, facilitated_tx_id: &str, value: u64) {
        self.push(UiCall::BroadcastFailed {
            peer_id: peer_id.to_string(),
            tx_hash: tx_hash.to_string(),
            facilitated_tx_id: facilitated_tx_id.to_string(),
            value,
        });
    }

    fn price_updated(&self, price: &str) {
        self.push(UiCall::PriceUpdated(price.to_string()));
    }

    fn buy_enabled(&self, enabled: bool) {
        self.push(UiCall::BuyEnabled(enabled));
    }

    fn trade_completed(&self, tx_hash: &str) {
        self.push(UiCall::TradeCompleted(tx_hash.to_string()));
    }

    fn web_session_ready(&self, details: WebViewLoginDetails) {
        self.push(UiCall::WebSessionReady(details));
    }

    fn show_default_prompt(&self, prompt: Prompt) {
        self.push(UiCall::DefaultPrompt(prompt));
    }

    fn show_custom_prompt(&self, prompt: Prompt) {
        self.push(UiCall::CustomPrompt(prompt));
    }

    fn clear_app_shortcuts(&self) {
        self.push(UiCall::ClearAppShortcuts);
    }

    fn scan_input(&self, uri: &str) {
        self.push(UiCall::ScanInput(uri.to_string()));
    }
}

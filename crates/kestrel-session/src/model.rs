//! Domain types shared by the coordinators.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of one authenticated session.
///
/// Every result produced on behalf of a session carries this id so it can be
/// rejected once the session is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Random v4 id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session:{}", self.0)
    }
}

/// Opaque handle to an encrypted metadata node.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MetadataNode(Vec<u8>);

impl MetadataNode {
    /// Wrap serialized node bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Serialized node bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

// Node handles wrap key material; never print the bytes.
impl fmt::Debug for MetadataNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MetadataNode(<{} bytes>)", self.0.len())
    }
}

/// Node pair as handed out by the payload collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataNodeFactory {
    /// The wallet's own metadata node.
    pub metadata_node: MetadataNode,
    /// Node shared with contacts.
    pub shared_metadata_node: MetadataNode,
}

/// Node handles bound to the session that resolved them.
///
/// Only the metadata bootstrap can build one, and it is consumed by value when
/// peer messaging is initialized.
#[derive(Debug, PartialEq, Eq)]
pub struct MetadataNodeSet {
    session: SessionId,
    own_node: MetadataNode,
    shared_node: MetadataNode,
}

impl MetadataNodeSet {
    pub(crate) fn new(session: SessionId, factory: MetadataNodeFactory) -> Self {
        Self {
            session,
            own_node: factory.metadata_node,
            shared_node: factory.shared_metadata_node,
        }
    }

    /// Session that resolved the nodes.
    pub fn session(&self) -> SessionId {
        self.session
    }

    pub(crate) fn into_nodes(self) -> (MetadataNode, MetadataNode) {
        (self.own_node, self.shared_node)
    }
}

/// Fee-rate limits in satoshi per byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeeLimits {
    /// Lowest accepted rate.
    pub min: u64,
    /// Highest accepted rate.
    pub max: u64,
}

/// Latest dynamic fee snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeeOptions {
    /// Rate for normal confirmation.
    pub regular_fee: u64,
    /// Rate for next-block confirmation.
    pub priority_fee: u64,
    /// Bounds for a custom rate.
    pub limits: FeeLimits,
}

/// One row of the price table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceEntry {
    /// Last traded price.
    pub last: f64,
    /// Currency symbol, e.g. `$`.
    pub symbol: String,
}

/// Latest fiat price table keyed by currency code.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TickerSnapshot {
    /// Rows keyed by ISO currency code.
    pub prices: HashMap<String, PriceEntry>,
}

impl TickerSnapshot {
    /// Add or replace the row for `code`.
    pub fn with_price(mut self, code: &str, last: f64, symbol: &str) -> Self {
        self.prices.insert(
            code.to_string(),
            PriceEntry {
                last,
                symbol: symbol.to_string(),
            },
        );
        self
    }

    /// Last price for `code`, `0.0` when unknown.
    pub fn last_price(&self, code: &str) -> f64 {
        self.prices.get(code).map_or(0.0, |p| p.last)
    }

    /// Currency symbol for `code`, empty when unknown.
    pub fn symbol(&self, code: &str) -> &str {
        self.prices.get(code).map_or("", |p| p.symbol.as_str())
    }
}

/// A payment or trade request tracked per contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilitatedTransaction {
    /// Request id shared with the peer.
    pub id: String,
    /// Requested amount in satoshi.
    pub intended_amount: u64,
    /// Receive address, once the peer supplied one.
    pub address: Option<String>,
    /// Hash of the payment, once sent.
    pub tx_hash: Option<String>,
}

/// A peer-messaging contact.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Contact {
    /// Metadata id of the peer.
    pub mdid: String,
    /// Display name.
    pub name: String,
    /// Open requests keyed by id.
    pub facilitated_transactions: HashMap<String, FacilitatedTransaction>,
}

impl Contact {
    /// Contact with no open requests.
    pub fn new(mdid: &str, name: &str) -> Self {
        Self {
            mdid: mdid.to_string(),
            name: name.to_string(),
            facilitated_transactions: HashMap::new(),
        }
    }

    /// Add a facilitated transaction.
    pub fn with_transaction(mut self, tx: FacilitatedTransaction) -> Self {
        self.facilitated_transactions.insert(tx.id.clone(), tx);
        self
    }

    /// Look up a facilitated transaction by id.
    pub fn facilitated_transaction(&self, id: &str) -> Option<&FacilitatedTransaction> {
        self.facilitated_transactions.get(id)
    }
}

/// A message fetched from the shared metadata service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message id.
    pub id: String,
    /// Metadata id of the sender.
    pub sender_mdid: String,
    /// Protocol message type.
    pub kind: u32,
    /// Whether the message was already handled.
    pub processed: bool,
}

/// Credentials for the third-party exchange web session.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WebViewLoginDetails {
    /// Serialized wallet.
    pub wallet_json: String,
    /// Wallet password.
    pub password: String,
    /// Exchange-side metadata.
    pub external_json: String,
    /// Session magic hash.
    pub magic_hash: String,
}

impl fmt::Debug for WebViewLoginDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebViewLoginDetails")
            .field("wallet_json", &"<redacted>")
            .field("password", &"<redacted>")
            .field("external_json", &self.external_json.len())
            .field("magic_hash", &self.magic_hash)
            .finish()
    }
}

/// A prompt or announcement the UI may show after launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    /// Stable prompt id.
    pub id: String,
    /// Heading.
    pub title: String,
    /// Text.
    pub body: String,
}

/// Push notification as published on the event bus.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// Notification title.
    pub title: Option<String>,
    /// Notification body.
    pub body: Option<String>,
    /// Sender-defined type, e.g. `contact_request`.
    pub kind: Option<String>,
}

/// Peer-messaging lifecycle events published on the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactsEvent {
    /// Peer messaging finished initializing for the active session.
    Init,
}

/// Message shown alongside the progress indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressMessage {
    /// Generic wait while launching or opening contacts.
    PleaseWait,
    /// A payment confirmation is being sent.
    BroadcastingPayment,
}

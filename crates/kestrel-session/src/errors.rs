//! Session error types
//!
//! Failures are classified once, at the boundary that has enough context to
//! tell expected outcomes from real faults, and never re-classified after that:
//!
//! | class                | raised by                                   | user-visible |
//! |----------------------|---------------------------------------------|--------------|
//! | `ExpectedNoSetup`    | metadata bootstrap on a double-encrypted wallet without nodes | no |
//! | `RegistrationFailure`| any other bootstrap or fee/price refresh failure | once      |
//! | `BestEffortFailure`  | message pull, on-demand ticker, purchase streams | no (logged) |
//! | `BroadcastFailure`   | payment broadcast confirmation              | yes, with retry context |

use std::fmt;

use thiserror::Error;

use crate::model::SessionId;

/// Failure reported by an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// Remote endpoint unreachable or returned a transport error.
    #[error("network error: {0}")]
    Network(String),

    /// Credentials were missing or could not unlock the payload.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Remote service refused the request.
    #[error("rejected: {0}")]
    Rejected(String),

    /// Anything else.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// [`ServiceError::Network`] from any message.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// [`ServiceError::NotFound`] from any message.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// [`ServiceError::Internal`] from any message.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

/// Outcome classes used when routing a failure to the UI boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// Double-encrypted wallet without metadata nodes. Silent.
    ExpectedNoSetup,
    /// Bootstrap or refresh fault. One blocking notice.
    RegistrationFailure,
    /// Background work that is logged and dropped.
    BestEffortFailure,
    /// Payment confirmation the user may retry.
    BroadcastFailure,
}

impl FailureClass {
    /// Whether a failure of this class reaches the user.
    #[must_use]
    pub fn is_user_visible(&self) -> bool {
        matches!(self, Self::RegistrationFailure | Self::BroadcastFailure)
    }

    /// Stable name used in logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::ExpectedNoSetup => "expected-no-setup",
            Self::RegistrationFailure => "registration-failure",
            Self::BestEffortFailure => "best-effort-failure",
            Self::BroadcastFailure => "broadcast-failure",
        }
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Metadata bootstrap failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BootstrapError {
    /// Wallet is double encrypted and was never provisioned with metadata nodes.
    #[error("payload is double encrypted and has no metadata nodes")]
    ExpectedNoSetup,

    /// Loading, generating or fetching nodes failed.
    #[error("metadata registration failed: {0}")]
    Registration(#[from] ServiceError),
}

impl BootstrapError {
    /// Class assigned at the bootstrap boundary.
    pub fn class(&self) -> FailureClass {
        match self {
            Self::ExpectedNoSetup => FailureClass::ExpectedNoSetup,
            Self::Registration(_) => FailureClass::RegistrationFailure,
        }
    }
}

/// Fee or ticker refresh failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    /// The fee stream yielded an error.
    #[error("fee options refresh failed: {0}")]
    Fees(#[source] ServiceError),

    /// Ticker update failed after a fee snapshot.
    #[error("price ticker refresh failed: {0}")]
    Ticker(#[source] ServiceError),
}

/// Peer-messaging coordinator failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContactsError {
    /// `init_contacts_service` already ran for this session.
    #[error("contacts service already initialized for {0}")]
    AlreadyInitialized(SessionId),

    /// The node set was produced by another session.
    #[error("metadata nodes belong to {found}, active session is {active}")]
    StaleSession {
        /// Session the coordinator belongs to.
        active: SessionId,
        /// Session stamped on the node set.
        found: SessionId,
    },

    /// An operation that needs peer messaging ran before initialization.
    #[error("contacts service not initialized")]
    NotInitialized,

    /// Collaborator failure.
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Failure at the launch merge point, after classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LaunchFailure {
    /// See [`BootstrapError::ExpectedNoSetup`].
    #[error("metadata nodes not set up for double-encrypted wallet")]
    ExpectedNoSetup,

    /// Any other bootstrap, contacts or refresh failure, rendered.
    #[error("registration failed: {0}")]
    Registration(String),
}

impl LaunchFailure {
    /// Class reported to the UI boundary.
    pub fn class(&self) -> FailureClass {
        match self {
            Self::ExpectedNoSetup => FailureClass::ExpectedNoSetup,
            Self::Registration(_) => FailureClass::RegistrationFailure,
        }
    }

    /// Merge two concurrent failures. A registration failure outranks
    /// `ExpectedNoSetup`; between equals the first wins.
    pub fn most_severe(first: Self, second: Self) -> Self {
        match (&first, &second) {
            (Self::ExpectedNoSetup, Self::Registration(_)) => second,
            _ => first,
        }
    }
}

impl From<BootstrapError> for LaunchFailure {
    fn from(err: BootstrapError) -> Self {
        match err {
            BootstrapError::ExpectedNoSetup => Self::ExpectedNoSetup,
            BootstrapError::Registration(e) => Self::Registration(e.to_string()),
        }
    }
}

impl From<ContactsError> for LaunchFailure {
    fn from(err: ContactsError) -> Self {
        Self::Registration(err.to_string())
    }
}

impl From<RefreshError> for LaunchFailure {
    fn from(err: RefreshError) -> Self {
        Self::Registration(err.to_string())
    }
}

/// Payment broadcast confirmation failure, with everything needed to retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("broadcast of {tx_hash} for {facilitated_tx_id} to {peer_id} failed: {reason}")]
pub struct BroadcastFailure {
    /// Peer that requested the payment.
    pub peer_id: String,
    /// Hash of the sent transaction.
    pub tx_hash: String,
    /// Facilitated transaction the payment settles.
    pub facilitated_tx_id: String,
    /// Amount sent, in satoshi.
    pub value: u64,
    /// Rendered cause.
    pub reason: String,
}

impl BroadcastFailure {
    /// Always [`FailureClass::BroadcastFailure`].
    pub fn class(&self) -> FailureClass {
        FailureClass::BroadcastFailure
    }
}

/// Configuration loading failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for [`SessionConfig`](crate::config::SessionConfig).
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_no_setup_is_silent() {
        let err = LaunchFailure::from(BootstrapError::ExpectedNoSetup);
        assert_eq!(err, LaunchFailure::ExpectedNoSetup);
        assert!(!err.class().is_user_visible());
    }

    #[test]
    fn refresh_failures_classify_as_registration() {
        let err = LaunchFailure::from(RefreshError::Ticker(ServiceError::network("timeout")));
        assert_eq!(err.class(), FailureClass::RegistrationFailure);
        assert!(err.class().is_user_visible());
    }

    #[test]
    fn registration_outranks_expected_no_setup() {
        let merged = LaunchFailure::most_severe(
            LaunchFailure::ExpectedNoSetup,
            LaunchFailure::Registration("ticker".into()),
        );
        assert_eq!(merged, LaunchFailure::Registration("ticker".into()));

        let merged = LaunchFailure::most_severe(
            LaunchFailure::Registration("first".into()),
            LaunchFailure::Registration("second".into()),
        );
        assert_eq!(merged, LaunchFailure::Registration("first".into()));
    }

    #[test]
    fn invalid_credentials_from_service_stay_registration() {
        // Only the bootstrap's own double-encryption branch may yield ExpectedNoSetup.
        let err = BootstrapError::from(ServiceError::InvalidCredentials("bad".into()));
        assert_eq!(err.class(), FailureClass::RegistrationFailure);
    }
}

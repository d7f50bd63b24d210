//! # Metadata Bootstrap
//!
//! **What it does**: Resolves the metadata node pair for a session.
//!
//! ```text
//! Unloaded ──load_nodes──▶ Loaded { exists }
//!     exists                       ──factory──▶ NodesPresent
//!     !exists, single encryption   ──generate──factory──▶ NodesGenerated
//!     !exists, double encryption   ──▶ Blocked (ExpectedNoSetup)
//!     any collaborator error       ──▶ Failed
//! ```
//!
//! Nodes are never generated for a double-encrypted payload: that needs the
//! second password, which is not available at launch.

use std::sync::Arc;

use kestrel_core::CacheSlot;

use crate::errors::BootstrapError;
use crate::model::{MetadataNodeSet, SessionId};
use crate::ports::PayloadService;

/// Observable state of the bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataState {
    /// Nothing attempted yet.
    Unloaded,
    /// Node pointers loaded.
    Loaded {
        /// Whether nodes were already provisioned.
        exists: bool,
    },
    /// Existing nodes resolved.
    NodesPresent,
    /// Nodes generated during this launch.
    NodesGenerated,
    /// Double-encrypted wallet without nodes.
    Blocked,
    /// A collaborator call failed.
    Failed,
}

/// Metadata bootstrap for one session.
pub struct MetadataBootstrap {
    session: SessionId,
    payload: Arc<dyn PayloadService>,
    state: CacheSlot<MetadataState>,
}

impl MetadataBootstrap {
    /// Bootstrap for `session`, in [`MetadataState::Unloaded`].
    pub fn new(session: SessionId, payload: Arc<dyn PayloadService>) -> Self {
        Self {
            session,
            payload,
            state: CacheSlot::new(MetadataState::Unloaded),
        }
    }

    /// Current state.
    pub fn state(&self) -> MetadataState {
        self.state.get()
    }

    /// Run the bootstrap.
    ///
    /// `on_loaded` fires after `load_nodes` succeeds, whatever it found.
    pub async fn bootstrap<F>(&self, on_loaded: F) -> Result<MetadataNodeSet, BootstrapError>
    where
        F: FnOnce(),
    {
        let result = self.resolve(on_loaded).await;
        if let Err(err) = &result {
            match err {
                BootstrapError::ExpectedNoSetup => self.transition(MetadataState::Blocked),
                BootstrapError::Registration(_) => self.transition(MetadataState::Failed),
            }
        }
        result
    }

    async fn resolve<F>(&self, on_loaded: F) -> Result<MetadataNodeSet, BootstrapError>
    where
        F: FnOnce(),
    {
        let exists = self.payload.load_nodes().await?;
        self.transition(MetadataState::Loaded { exists });
        on_loaded();

        if exists {
            let factory = self.payload.metadata_node_factory().await?;
            self.transition(MetadataState::NodesPresent);
            return Ok(MetadataNodeSet::new(self.session, factory));
        }

        if self.payload.is_double_encryption() {
            return Err(BootstrapError::ExpectedNoSetup);
        }

        self.payload.generate_nodes(None).await?;
        let factory = self.payload.metadata_node_factory().await?;
        self.transition(MetadataState::NodesGenerated);
        Ok(MetadataNodeSet::new(self.session, factory))
    }

    fn transition(&self, next: MetadataState) {
        let previous = self.state.get();
        self.state.set(next);
        tracing::debug!(session = %self.session, ?previous, ?next, "metadata bootstrap transition");
    }
}

//! Declarative launch scenarios for the simulator.

use kestrel_session::errors::ServiceError;
use kestrel_session::model::Prompt;
use kestrel_session::ports::{PrefKey, SettingsStore};
use serde::{Deserialize, Serialize};

use crate::harness::TestHarness;

/// What the simulated device and services look like at launch.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub logged_in: bool,
    pub nodes_exist: bool,
    pub double_encrypted: bool,
    pub contacts: Vec<String>,
    pub metadata_uri: Option<String>,
    pub contacts_notification: bool,
    pub scheme_url: Option<String>,
    pub selected_fiat: Option<String>,
    pub fee_failure: bool,
    pub ticker_failure: bool,
    pub can_buy: bool,
    pub completed_trades: Vec<String>,
    pub prompts: Vec<String>,
    /// Push notifications emitted after launch.
    pub notifications: usize,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            logged_in: true,
            nodes_exist: true,
            double_encrypted: false,
            contacts: Vec::new(),
            metadata_uri: None,
            contacts_notification: false,
            scheme_url: None,
            selected_fiat: None,
            fee_failure: false,
            ticker_failure: false,
            can_buy: true,
            completed_trades: Vec::new(),
            prompts: Vec::new(),
            notifications: 0,
        }
    }
}

impl Scenario {
    /// Script `harness` to match this scenario.
    pub fn apply(&self, harness: &TestHarness) {
        harness.access.set_logged_in(self.logged_in);
        {
            let mut payload = harness.payload.script();
            payload.nodes_exist = self.nodes_exist;
            payload.double_encrypted = self.double_encrypted;
        }
        for mdid in &self.contacts {
            harness.add_contact(mdid, None, 0);
        }

        let settings = &harness.settings;
        if let Some(uri) = &self.metadata_uri {
            settings.set_string(PrefKey::MetadataUri, uri);
        }
        if self.contacts_notification {
            settings.set_bool(PrefKey::ContactsNotification, true);
        }
        if let Some(uri) = &self.scheme_url {
            settings.set_string(PrefKey::SchemeUrl, uri);
        }
        if let Some(code) = &self.selected_fiat {
            settings.set_string(PrefKey::SelectedFiat, code);
        }

        {
            let mut market = harness.market.script();
            if self.fee_failure {
                market.fee_options = vec![Err(ServiceError::network("fee endpoint unreachable"))];
            }
            if self.ticker_failure {
                market.ticker = Err(ServiceError::network("ticker endpoint unreachable"));
            }
        }
        {
            let mut buy = harness.buy.script();
            buy.can_buy = vec![Ok(self.can_buy)];
            buy.completed_trades = self.completed_trades.clone();
        }
        harness.prompts.script().defaults = Ok(self
            .prompts
            .iter()
            .map(|id| Prompt {
                id: id.clone(),
                title: id.clone(),
                body: String::new(),
            })
            .collect());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_scenario_keeps_defaults() {
        let scenario: Scenario = toml::from_str("double_encrypted = true\nnodes_exist = false\n").unwrap();
        assert!(scenario.logged_in);
        assert!(scenario.double_encrypted);
        assert!(!scenario.nodes_exist);
    }

    #[test]
    fn apply_scripts_collaborators() {
        let harness = TestHarness::new();
        Scenario {
            logged_in: false,
            contacts: vec!["peer1".into()],
            scheme_url: Some("bitcoin:1abc".into()),
            ticker_failure: true,
            ..Scenario::default()
        }
        .apply(&harness);

        assert!(!kestrel_session::ports::AccessState::is_logged_in(harness.access.as_ref()));
        assert_eq!(harness.contacts.script().contacts.len(), 1);
        assert_eq!(
            harness.settings.get_string(PrefKey::SchemeUrl).as_deref(),
            Some("bitcoin:1abc")
        );
        assert!(harness.market.script().ticker.is_err());
    }
}

//! Purchase service gate.
//!
//! Runs only when buy/sell is permitted. Every subscription is best effort and
//! lives in the session's task registry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use kestrel_core::compose;

use crate::ports::{BuyService, Capabilities, UiBoundary};
use crate::session::SessionScope;

/// Starts trade watching and the web session handoff for a session.
pub struct PurchaseGate {
    scope: Arc<SessionScope>,
    buy: Arc<dyn BuyService>,
    capabilities: Arc<dyn Capabilities>,
    ui: Arc<dyn UiBoundary>,
    trades_started: AtomicBool,
}

impl PurchaseGate {
    /// Gate for `scope`. Nothing runs until [`start`](Self::start).
    pub fn new(
        scope: Arc<SessionScope>,
        buy: Arc<dyn BuyService>,
        capabilities: Arc<dyn Capabilities>,
        ui: Arc<dyn UiBoundary>,
    ) -> Arc<Self> {
        Arc::new(Self {
            scope,
            buy,
            capabilities,
            ui,
            trades_started: AtomicBool::new(false),
        })
    }

    /// Start watching `can_buy`. Returns `false` when buy/sell is not permitted.
    pub fn start(self: &Arc<Self>) -> bool {
        if !self.capabilities.buy_sell_permitted() {
            tracing::debug!(session = %self.scope.id(), "buy/sell not permitted");
            return false;
        }
        let this = Arc::clone(self);
        self.scope.tasks().spawn_cancellable(async move {
            let gate = Arc::clone(&this);
            compose::absorb_stream("can_buy", this.buy.can_buy(), move |enabled| {
                gate.on_can_buy(enabled);
            })
            .await;
        });
        true
    }

    fn on_can_buy(self: &Arc<Self>, enabled: bool) {
        if !self.scope.is_live() {
            return;
        }
        self.ui.buy_enabled(enabled);
        // Later `true` values must not open duplicate subscriptions.
        if enabled && !self.trades_started.swap(true, Ordering::AcqRel) {
            self.watch_trades();
            self.hand_off_web_session();
        }
    }

    fn watch_trades(self: &Arc<Self>) {
        let this = Arc::clone(self);
        self.scope.tasks().spawn_cancellable(async move {
            let stream = this.buy.watch_pending_trades();
            let scope = Arc::clone(&this.scope);
            let ui = Arc::clone(&this.ui);
            compose::absorb_stream("watch_pending_trades", stream, move |tx_hash: String| {
                if scope.is_live() {
                    tracing::info!(session = %scope.id(), tx = %tx_hash, "trade completed");
                    ui.trade_completed(&tx_hash);
                }
            })
            .await;
        });
    }

    fn hand_off_web_session(self: &Arc<Self>) {
        let this = Arc::clone(self);
        self.scope.tasks().spawn_cancellable(async move {
            let details =
                compose::absorb("web_view_login_details", this.buy.web_view_login_details()).await;
            if let Some(details) = details {
                if this.scope.is_live() {
                    this.ui.web_session_ready(details);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticCapabilities;
    use crate::errors::ServiceError;
    use crate::model::WebViewLoginDetails;
    use crate::test_support::LogUi;
    use async_trait::async_trait;
    use futures::StreamExt;
    use kestrel_core::Observable;
    use parking_lot::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Buy {
        can_buy: Vec<bool>,
        fail_trades: bool,
        watch_calls: Mutex<usize>,
    }

    #[async_trait]
    impl BuyService for Buy {
        fn can_buy(&self) -> Observable<bool, ServiceError> {
            futures::stream::iter(self.can_buy.clone().into_iter().map(Ok)).boxed()
        }

        fn watch_pending_trades(&self) -> Observable<String, ServiceError> {
            *self.watch_calls.lock() += 1;
            if self.fail_trades {
                return futures::stream::iter(vec![Err(ServiceError::network("socket closed"))]).boxed();
            }
            futures::stream::iter(vec![Ok("trade-tx".to_string())]).boxed()
        }

        async fn web_view_login_details(&self) -> Result<WebViewLoginDetails, ServiceError> {
            Ok(WebViewLoginDetails::default())
        }
    }

    fn gate(buy: Buy, permitted: bool) -> (Arc<PurchaseGate>, Arc<Buy>, Arc<LogUi>) {
        let buy = Arc::new(buy);
        let ui = Arc::new(LogUi::default());
        let caps = Arc::new(StaticCapabilities {
            contacts_enabled: true,
            buy_sell_permitted: permitted,
        });
        let gate = PurchaseGate::new(SessionScope::new(), buy.clone(), caps, ui.clone());
        (gate, buy, ui)
    }

    async fn settle(ui: &LogUi, expected: usize) {
        for _ in 0..100 {
            if ui.calls().len() >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn not_permitted_starts_nothing() {
        let (gate, buy, ui) = gate(
            Buy {
                can_buy: vec![true],
                ..Default::default()
            },
            false,
        );
        assert!(!gate.start());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(ui.calls().is_empty());
        assert_eq!(*buy.watch_calls.lock(), 0);
    }

    #[tokio::test]
    async fn can_buy_starts_trades_and_web_session_once() {
        let (gate, buy, ui) = gate(
            Buy {
                can_buy: vec![true, true],
                ..Default::default()
            },
            true,
        );
        assert!(gate.start());
        settle(&ui, 4).await;

        let calls = ui.calls();
        assert_eq!(calls.iter().filter(|c| *c == "buy_enabled:true").count(), 2);
        assert!(calls.contains(&"trade_completed:trade-tx".to_string()));
        assert!(calls.contains(&"web_session_ready".to_string()));
        assert_eq!(*buy.watch_calls.lock(), 1);
    }

    #[tokio::test]
    async fn trade_failure_leaves_web_session() {
        let (gate, _buy, ui) = gate(
            Buy {
                can_buy: vec![true],
                fail_trades: true,
                ..Default::default()
            },
            true,
        );
        gate.start();
        settle(&ui, 2).await;

        let calls = ui.calls();
        assert!(calls.contains(&"web_session_ready".to_string()));
        assert!(!calls.iter().any(|c| c.starts_with("trade_completed")));
    }
}

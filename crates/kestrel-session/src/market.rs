//! Fee and price refresh.
//!
//! [`MarketCache`] holds the latest fee snapshot and price table. Both slots
//! are last-write-wins; readers never wait for a refresh.

use std::sync::Arc;

use futures::StreamExt;
use kestrel_core::{compose, CacheSlot};

use crate::errors::RefreshError;
use crate::model::{FeeOptions, TickerSnapshot};
use crate::ports::{FeeService, PrefKey, PriceService, SettingsStore, UiBoundary};

/// Shared fee and ticker cache.
#[derive(Debug, Clone, Default)]
pub struct MarketCache {
    fees: CacheSlot<Option<FeeOptions>>,
    ticker: CacheSlot<TickerSnapshot>,
}

impl MarketCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest fee snapshot, if any refresh succeeded.
    pub fn fee_options(&self) -> Option<FeeOptions> {
        self.fees.get()
    }

    /// Replace the fee snapshot.
    pub fn set_fee_options(&self, options: FeeOptions) {
        self.fees.set(Some(options));
    }

    /// Replace the price table.
    pub fn set_ticker(&self, snapshot: TickerSnapshot) {
        self.ticker.set(snapshot);
    }

    /// Last price for `code`, `0.0` when unknown.
    pub fn last_price(&self, code: &str) -> f64 {
        self.ticker.with(|t| t.last_price(code))
    }

    /// Symbol for `code`, empty when unknown.
    pub fn symbol(&self, code: &str) -> String {
        self.ticker.with(|t| t.symbol(code).to_string())
    }

    /// Versions of the fee and ticker slots.
    pub fn versions(&self) -> (u64, u64) {
        (self.fees.version(), self.ticker.version())
    }

    /// Reset both slots, e.g. on unpair.
    pub fn clear(&self) {
        self.fees.set(None);
        self.ticker.set(TickerSnapshot::default());
    }
}

/// Refreshes [`MarketCache`] from the fee and price collaborators.
pub struct MarketRefresh {
    fees: Arc<dyn FeeService>,
    prices: Arc<dyn PriceService>,
    settings: Arc<dyn SettingsStore>,
    ui: Arc<dyn UiBoundary>,
    cache: MarketCache,
    default_fiat: String,
}

impl MarketRefresh {
    /// Refresh coordinator writing into `cache`.
    pub fn new(
        fees: Arc<dyn FeeService>,
        prices: Arc<dyn PriceService>,
        settings: Arc<dyn SettingsStore>,
        ui: Arc<dyn UiBoundary>,
        cache: MarketCache,
        default_fiat: impl Into<String>,
    ) -> Self {
        Self {
            fees,
            prices,
            settings,
            ui,
            cache,
            default_fiat: default_fiat.into(),
        }
    }

    /// The cache this coordinator writes.
    pub fn cache(&self) -> &MarketCache {
        &self.cache
    }

    /// Store each fee snapshot, refreshing the ticker after every one.
    ///
    /// No retries. A ticker failure after a good fee snapshot still fails.
    pub async fn refresh(&self) -> Result<(), RefreshError> {
        let mut options = self.fees.fee_options();
        while let Some(item) = options.next().await {
            let fee_options = item.map_err(RefreshError::Fees)?;
            self.cache.set_fee_options(fee_options);
            tracing::debug!(
                regular = fee_options.regular_fee,
                priority = fee_options.priority_fee,
                "fee options cached"
            );
            self.refresh_ticker().await?;
        }
        Ok(())
    }

    /// Fetch and cache the price table.
    pub async fn refresh_ticker(&self) -> Result<(), RefreshError> {
        let snapshot = self
            .prices
            .update_ticker()
            .await
            .map_err(RefreshError::Ticker)?;
        tracing::debug!(currencies = snapshot.prices.len(), "price ticker cached");
        self.cache.set_ticker(snapshot);
        Ok(())
    }

    /// Refresh the ticker and push the selected fiat price to the UI.
    ///
    /// Best effort: failures are logged and `None` is returned.
    pub async fn refresh_price_display(&self) -> Option<String> {
        compose::absorb("update_ticker", self.refresh_ticker()).await?;
        let price = self.formatted_price();
        self.ui.price_updated(&price);
        Some(price)
    }

    /// Currency code the user picked, or the configured default.
    pub fn selected_fiat(&self) -> String {
        self.settings
            .get_non_empty(PrefKey::SelectedFiat)
            .unwrap_or_else(|| self.default_fiat.clone())
    }

    /// Symbol followed by the formatted last price of the selected fiat.
    pub fn formatted_price(&self) -> String {
        let code = self.selected_fiat();
        format!("{}{}", self.cache.symbol(&code), format_fiat(self.cache.last_price(&code)))
    }
}

/// Group thousands with `,` and keep two to three fraction digits.
pub fn format_fiat(value: f64) -> String {
    if !value.is_finite() {
        return "0.00".to_string();
    }
    let fixed = format!("{:.3}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "000"));
    let frac = frac_part.strip_suffix('0').unwrap_or(frac_part);

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && fixed.bytes().any(|b| matches!(b, b'1'..=b'9')) {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped}.{frac}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ServiceError;
    use crate::test_support::{LogUi, MemorySettings};
    use async_trait::async_trait;
    use kestrel_core::Observable;
    use parking_lot::Mutex;

    struct Fees(Vec<Result<FeeOptions, ServiceError>>);

    impl FeeService for Fees {
        fn fee_options(&self) -> Observable<FeeOptions, ServiceError> {
            futures::stream::iter(self.0.clone()).boxed()
        }
    }

    struct Prices {
        result: Result<TickerSnapshot, ServiceError>,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl PriceService for Prices {
        async fn update_ticker(&self) -> Result<TickerSnapshot, ServiceError> {
            *self.calls.lock() += 1;
            self.result.clone()
        }
    }

    fn options(regular: u64) -> FeeOptions {
        FeeOptions {
            regular_fee: regular,
            priority_fee: regular * 2,
            ..Default::default()
        }
    }

    fn refresh_with(
        fees: Vec<Result<FeeOptions, ServiceError>>,
        ticker: Result<TickerSnapshot, ServiceError>,
    ) -> (MarketRefresh, Arc<Prices>, Arc<LogUi>, Arc<MemorySettings>) {
        let prices = Arc::new(Prices {
            result: ticker,
            calls: Mutex::new(0),
        });
        let ui = Arc::new(LogUi::default());
        let settings = Arc::new(MemorySettings::default());
        let refresh = MarketRefresh::new(
            Arc::new(Fees(fees)),
            prices.clone(),
            settings.clone(),
            ui.clone(),
            MarketCache::new(),
            "USD",
        );
        (refresh, prices, ui, settings)
    }

    #[test]
    fn formats_with_grouping_and_fraction_bounds() {
        assert_eq!(format_fiat(6543.21), "6,543.21");
        assert_eq!(format_fiat(1234567.0), "1,234,567.00");
        assert_eq!(format_fiat(0.125), "0.125");
        assert_eq!(format_fiat(12.3456), "12.346");
        assert_eq!(format_fiat(999.0), "999.00");
        assert_eq!(format_fiat(-1500.5), "-1,500.50");
        assert_eq!(format_fiat(f64::NAN), "0.00");
    }

    #[tokio::test]
    async fn refresh_caches_fees_then_ticker() {
        let ticker = TickerSnapshot::default().with_price("USD", 6543.21, "$");
        let (refresh, prices, _, _) = refresh_with(vec![Ok(options(10))], Ok(ticker));

        refresh.refresh().await.unwrap();

        assert_eq!(refresh.cache().fee_options(), Some(options(10)));
        assert_eq!(refresh.cache().last_price("USD"), 6543.21);
        assert_eq!(*prices.calls.lock(), 1);
    }

    #[tokio::test]
    async fn ticker_failure_fails_refresh_after_fee_success() {
        let (refresh, _, _, _) =
            refresh_with(vec![Ok(options(10))], Err(ServiceError::network("timeout")));

        let err = refresh.refresh().await.unwrap_err();

        assert!(matches!(err, RefreshError::Ticker(_)));
        assert_eq!(refresh.cache().fee_options(), Some(options(10)));
    }

    #[tokio::test]
    async fn fee_failure_skips_ticker() {
        let (refresh, prices, _, _) = refresh_with(
            vec![Err(ServiceError::network("down"))],
            Ok(TickerSnapshot::default()),
        );

        assert!(matches!(refresh.refresh().await, Err(RefreshError::Fees(_))));
        assert_eq!(*prices.calls.lock(), 0);
    }

    #[tokio::test]
    async fn price_display_uses_selected_fiat() {
        let ticker = TickerSnapshot::default()
            .with_price("USD", 6543.21, "$")
            .with_price("EUR", 5000.0, "€");
        let (refresh, _, ui, settings) = refresh_with(vec![], Ok(ticker));
        settings.set_string(PrefKey::SelectedFiat, "EUR");

        assert_eq!(refresh.refresh_price_display().await.as_deref(), Some("€5,000.00"));
        assert_eq!(ui.calls(), vec!["price_updated:€5,000.00"]);
    }

    #[tokio::test]
    async fn price_display_failure_is_silent() {
        let (refresh, _, ui, _) = refresh_with(vec![], Err(ServiceError::network("timeout")));
        assert_eq!(refresh.refresh_price_display().await, None);
        assert!(ui.calls().is_empty());
    }

    #[test]
    fn clear_resets_both_slots() {
        let cache = MarketCache::new();
        cache.set_fee_options(options(3));
        cache.set_ticker(TickerSnapshot::default().with_price("USD", 1.0, "$"));
        cache.clear();

        assert_eq!(cache.fee_options(), None);
        assert_eq!(cache.last_price("USD"), 0.0);
        assert_eq!(cache.versions(), (2, 2));
    }
}

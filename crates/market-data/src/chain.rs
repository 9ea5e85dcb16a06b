//! Priority-ordered provider chain with try-next-on-failure semantics.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::errors::MarketDataError;
use crate::models::{Candle, SymbolSnapshot};
use crate::provider::alpha_vantage::AlphaVantageProvider;
use crate::provider::finnhub::FinnhubProvider;
use crate::provider::yahoo::YahooProvider;
use crate::provider::MarketDataProvider;

/// Ordered chain of providers; the first usable answer wins.
///
/// Snapshot requests fall through on errors and on all-missing responses (a
/// provider that answers but prices nothing is as useless as one that
/// errors). History requests fall through until any provider returns bars.
pub struct ProviderChain {
    providers: Vec<Arc<dyn MarketDataProvider>>,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn MarketDataProvider>>) -> Self {
        Self { providers }
    }

    /// Assemble the standard chain: Finnhub and Alpha Vantage when their API
    /// keys are configured, Yahoo always last as the keyless fallback.
    pub fn standard(
        finnhub_key: Option<String>,
        alpha_vantage_key: Option<String>,
    ) -> Result<Self, MarketDataError> {
        let mut providers: Vec<Arc<dyn MarketDataProvider>> = Vec::new();

        if let Some(key) = finnhub_key.filter(|k| !k.is_empty()) {
            providers.push(Arc::new(FinnhubProvider::new(key)));
            info!("Provider available: FINNHUB");
        } else {
            info!("Provider skipped (no API key): FINNHUB");
        }

        if let Some(key) = alpha_vantage_key.filter(|k| !k.is_empty()) {
            providers.push(Arc::new(AlphaVantageProvider::new(key)));
            info!("Provider available: ALPHA_VANTAGE");
        } else {
            info!("Provider skipped (no API key): ALPHA_VANTAGE");
        }

        providers.push(Arc::new(YahooProvider::new()?));
        info!("Provider available: YAHOO (fallback)");

        Ok(Self::new(providers))
    }

    /// Fetch current quotes, one row per symbol.
    pub async fn get_snapshot(
        &self,
        symbols: &[String],
    ) -> Result<Vec<SymbolSnapshot>, MarketDataError> {
        for provider in &self.providers {
            match provider.get_snapshot(symbols).await {
                Ok(rows) => {
                    if rows.iter().any(SymbolSnapshot::has_price) {
                        info!("Snapshot served by {}", provider.id());
                        return Ok(rows);
                    }
                    warn!("{} returned all-missing snapshot, trying next", provider.id());
                }
                Err(e) => {
                    warn!("{} snapshot failed, trying next: {}", provider.id(), e);
                }
            }
        }

        error!("All providers failed for snapshot");
        Err(MarketDataError::AllProvidersFailed)
    }

    /// Fetch daily history for one symbol.
    ///
    /// Total failure is data, not an error: the caller degrades the period
    /// metrics of this one symbol and the reporting cycle carries on.
    pub async fn get_history(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<Candle> {
        for provider in &self.providers {
            match provider.get_history(symbol, start, end).await {
                Ok(candles) if !candles.is_empty() => return candles,
                Ok(_) => {
                    warn!("{} history({}) was empty, trying next", provider.id(), symbol);
                }
                Err(e) => {
                    warn!(
                        "{} history({}) failed, trying next: {}",
                        provider.id(),
                        symbol,
                        e
                    );
                }
            }
        }

        error!("All providers failed for history({})", symbol);
        Vec::new()
    }

    /// Spot FX rate `from` → `to`; identical currencies short-circuit to 1.0.
    pub async fn get_fx_rate(&self, from: &str, to: &str) -> Result<f64, MarketDataError> {
        let from = from.to_uppercase();
        let to = to.to_uppercase();
        if from == to {
            return Ok(1.0);
        }

        for provider in &self.providers {
            match provider.get_fx_rate(&from, &to).await {
                Ok(rate) if rate > 0.0 => {
                    info!("FX {}->{} = {:.6} (via {})", from, to, rate, provider.id());
                    return Ok(rate);
                }
                Ok(rate) => {
                    warn!(
                        "{} returned non-positive FX rate {} for {}->{}, trying next",
                        provider.id(),
                        rate,
                        from,
                        to
                    );
                }
                Err(e) => {
                    warn!("{} FX {}->{} failed, trying next: {}", provider.id(), from, to, e);
                }
            }
        }

        error!("All providers failed for FX {}->{}", from, to);
        Err(MarketDataError::AllProvidersFailed)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::TimeZone;

    use super::*;

    /// Scripted provider for chain tests.
    struct FakeProvider {
        id: &'static str,
        snapshot: Option<Vec<SymbolSnapshot>>,
        history: Option<Vec<Candle>>,
        fx_rate: Option<f64>,
    }

    impl FakeProvider {
        fn failing(id: &'static str) -> Self {
            Self {
                id,
                snapshot: None,
                history: None,
                fx_rate: None,
            }
        }
    }

    #[async_trait]
    impl MarketDataProvider for FakeProvider {
        fn id(&self) -> &'static str {
            self.id
        }

        async fn get_snapshot(
            &self,
            _symbols: &[String],
        ) -> Result<Vec<SymbolSnapshot>, MarketDataError> {
            self.snapshot
                .clone()
                .ok_or(MarketDataError::AllProvidersFailed)
        }

        async fn get_history(
            &self,
            _symbol: &str,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Result<Vec<Candle>, MarketDataError> {
            self.history.clone().ok_or(MarketDataError::NoDataForRange)
        }

        async fn get_fx_rate(&self, _from: &str, _to: &str) -> Result<f64, MarketDataError> {
            self.fx_rate.ok_or(MarketDataError::NotSupported {
                provider: self.id.to_string(),
                operation: "fx rates".to_string(),
            })
        }
    }

    fn priced_row(symbol: &str) -> SymbolSnapshot {
        SymbolSnapshot {
            last_price: Some(100.0),
            ..SymbolSnapshot::unavailable(symbol)
        }
    }

    fn candle(ts: i64, close: f64) -> Candle {
        Candle {
            timestamp: Utc.timestamp_opt(ts, 0).unwrap(),
            open: None,
            high: None,
            low: None,
            close,
            volume: None,
        }
    }

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn snapshot_from_first_working_provider() {
        let chain = ProviderChain::new(vec![
            Arc::new(FakeProvider::failing("A")),
            Arc::new(FakeProvider {
                id: "B",
                snapshot: Some(vec![priced_row("AAPL")]),
                history: None,
                fx_rate: None,
            }),
        ]);

        let rows = chain.get_snapshot(&symbols(&["AAPL"])).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].has_price());
    }

    #[tokio::test]
    async fn all_missing_snapshot_falls_through_to_next() {
        let chain = ProviderChain::new(vec![
            Arc::new(FakeProvider {
                id: "A",
                snapshot: Some(vec![SymbolSnapshot::unavailable("AAPL")]),
                history: None,
                fx_rate: None,
            }),
            Arc::new(FakeProvider {
                id: "B",
                snapshot: Some(vec![priced_row("AAPL")]),
                history: None,
                fx_rate: None,
            }),
        ]);

        let rows = chain.get_snapshot(&symbols(&["AAPL"])).await.unwrap();
        assert!(rows[0].has_price());
    }

    #[tokio::test]
    async fn snapshot_errors_when_every_provider_fails() {
        let chain = ProviderChain::new(vec![
            Arc::new(FakeProvider::failing("A")),
            Arc::new(FakeProvider::failing("B")),
        ]);

        let result = chain.get_snapshot(&symbols(&["AAPL"])).await;
        assert!(matches!(result, Err(MarketDataError::AllProvidersFailed)));
    }

    #[tokio::test]
    async fn history_skips_empty_results() {
        let chain = ProviderChain::new(vec![
            Arc::new(FakeProvider {
                id: "A",
                snapshot: None,
                history: Some(vec![]),
                fx_rate: None,
            }),
            Arc::new(FakeProvider {
                id: "B",
                snapshot: None,
                history: Some(vec![candle(1704067200, 150.0)]),
                fx_rate: None,
            }),
        ]);

        let bars = chain
            .get_history("AAPL", Utc::now() - chrono::Duration::days(35), Utc::now())
            .await;
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, 150.0);
    }

    #[tokio::test]
    async fn history_total_failure_is_empty_not_error() {
        let chain = ProviderChain::new(vec![Arc::new(FakeProvider::failing("A"))]);

        let bars = chain
            .get_history("AAPL", Utc::now() - chrono::Duration::days(35), Utc::now())
            .await;
        assert!(bars.is_empty());
    }

    #[tokio::test]
    async fn fx_same_currency_short_circuits() {
        let chain = ProviderChain::new(vec![Arc::new(FakeProvider::failing("A"))]);
        assert_eq!(chain.get_fx_rate("eur", "EUR").await.unwrap(), 1.0);
    }

    #[tokio::test]
    async fn fx_falls_through_to_a_provider_with_rates() {
        let chain = ProviderChain::new(vec![
            Arc::new(FakeProvider::failing("A")),
            Arc::new(FakeProvider {
                id: "B",
                snapshot: None,
                history: None,
                fx_rate: Some(0.9215),
            }),
        ]);

        assert_eq!(chain.get_fx_rate("USD", "EUR").await.unwrap(), 0.9215);
    }

    #[tokio::test]
    async fn fx_exhausted_chain_is_an_error() {
        let chain = ProviderChain::new(vec![Arc::new(FakeProvider::failing("A"))]);
        let result = chain.get_fx_rate("USD", "EUR").await;
        assert!(matches!(result, Err(MarketDataError::AllProvidersFailed)));
    }
}

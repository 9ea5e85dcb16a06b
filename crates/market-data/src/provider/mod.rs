//! Market data provider trait and implementations.

pub mod alpha_vantage;
pub mod finnhub;
pub mod yahoo;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::MarketDataError;
use crate::models::{Candle, SymbolSnapshot};

/// A source of quotes, daily history and spot FX rates.
///
/// Implementations degrade per symbol inside `get_snapshot`: a symbol the
/// provider cannot serve yields an unavailable row, not an error. Errors are
/// reserved for failures that affect the whole request, which is what the
/// chain uses to decide whether to try the next provider.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Stable provider identifier, e.g. "FINNHUB".
    fn id(&self) -> &'static str;

    /// Fetch current quotes; one row per requested symbol, same order.
    async fn get_snapshot(
        &self,
        symbols: &[String],
    ) -> Result<Vec<SymbolSnapshot>, MarketDataError>;

    /// Fetch daily bars for one symbol within `[start, end]`.
    async fn get_history(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>, MarketDataError>;

    /// Spot FX rate `from` → `to`. Not every provider has an FX endpoint.
    async fn get_fx_rate(&self, _from: &str, _to: &str) -> Result<f64, MarketDataError> {
        Err(MarketDataError::NotSupported {
            provider: self.id().to_string(),
            operation: "fx rates".to_string(),
        })
    }
}

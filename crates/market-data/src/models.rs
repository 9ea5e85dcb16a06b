//! Provider-neutral data shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current quote data for one symbol, in the symbol's native currency.
///
/// Providers that cannot serve a symbol return an [`unavailable`](Self::unavailable)
/// row instead of dropping it, so callers always get one row per requested
/// symbol and can degrade per field downstream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolSnapshot {
    pub symbol: String,
    pub last_price: Option<f64>,
    pub prev_close: Option<f64>,
    /// ISO 4217 code; providers default to USD when they don't report one.
    pub currency: String,
    pub fifty_two_week_low: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
}

impl SymbolSnapshot {
    /// A row with no price data, used when a provider fails for one symbol.
    pub fn unavailable(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            last_price: None,
            prev_close: None,
            currency: "USD".to_string(),
            fifty_two_week_low: None,
            fifty_two_week_high: None,
        }
    }

    pub fn has_price(&self) -> bool {
        self.last_price.is_some()
    }
}

/// One daily OHLCV bar. Close is the only field every provider guarantees.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub volume: Option<f64>,
}

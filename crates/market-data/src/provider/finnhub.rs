//! Finnhub market data provider.
//!
//! - Quotes via /quote, currency via /stock/profile2
//! - Daily history via /stock/candle
//! - Spot FX via /forex/rates
//!
//! Finnhub free tier is limited to 60 API calls per minute.
//! API documentation: https://finnhub.io/docs/api

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::MarketDataError;
use crate::models::{Candle, SymbolSnapshot};
use crate::provider::MarketDataProvider;

const BASE_URL: &str = "https://finnhub.io/api/v1";
const PROVIDER_ID: &str = "FINNHUB";

/// Response from /quote endpoint
#[derive(Debug, Deserialize)]
struct QuoteResponse {
    /// Current price
    c: Option<f64>,
    /// Previous close
    pc: Option<f64>,
    /// High price of the day
    h: Option<f64>,
    /// Low price of the day
    l: Option<f64>,
}

/// Response from /stock/profile2 endpoint
#[derive(Debug, Deserialize)]
struct ProfileResponse {
    currency: Option<String>,
}

/// Response from /stock/candle endpoint
#[derive(Debug, Deserialize)]
struct CandleResponse {
    /// Status: "ok" or "no_data"
    s: String,
    #[serde(default)]
    c: Vec<f64>,
    #[serde(default)]
    h: Vec<f64>,
    #[serde(default)]
    l: Vec<f64>,
    #[serde(default)]
    o: Vec<f64>,
    #[serde(default)]
    v: Vec<f64>,
    #[serde(default)]
    t: Vec<i64>,
}

/// Response from /forex/rates endpoint
#[derive(Debug, Deserialize)]
struct ForexRatesResponse {
    #[serde(default)]
    quote: HashMap<String, f64>,
}

/// Error response from Finnhub
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
}

/// Finnhub market data provider. Requires an API key.
pub struct FinnhubProvider {
    client: Client,
    api_key: String,
}

impl FinnhubProvider {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, api_key }
    }

    /// Make a GET request to the Finnhub API.
    async fn fetch(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<String, MarketDataError> {
        let url = format!("{}{}", BASE_URL, endpoint);

        let mut request = self.client.get(&url);

        // API key as header rather than query param
        request = request.header("X-Finnhub-Token", &self.api_key);

        for (key, value) in params {
            request = request.query(&[(key, value)]);
        }

        debug!("Finnhub request: {} with {} params", endpoint, params.len());

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                MarketDataError::Timeout {
                    provider: PROVIDER_ID.to_string(),
                }
            } else {
                MarketDataError::ProviderError {
                    provider: PROVIDER_ID.to_string(),
                    message: format!("Request failed: {}", e),
                }
            }
        })?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: "Invalid or missing API key".to_string(),
            });
        }

        // Finnhub answers 403 when the key's quota is exhausted
        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            if let Ok(error_resp) = serde_json::from_str::<ErrorResponse>(&body) {
                if let Some(error_msg) = error_resp.error {
                    return Err(MarketDataError::ProviderError {
                        provider: PROVIDER_ID.to_string(),
                        message: error_msg,
                    });
                }
            }

            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("HTTP {} - {}", status, body),
            });
        }

        response
            .text()
            .await
            .map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to read response: {}", e),
            })
    }

    async fn fetch_symbol_snapshot(&self, symbol: &str) -> Result<SymbolSnapshot, MarketDataError> {
        let params = [("symbol", symbol)];
        let text = self.fetch("/quote", &params).await?;

        let quote: QuoteResponse =
            serde_json::from_str(&text).map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to parse quote response: {}", e),
            })?;

        // Finnhub returns 0 for unknown symbols instead of an error
        if quote.c.unwrap_or(0.0) == 0.0 {
            return Err(MarketDataError::SymbolNotFound(symbol.to_string()));
        }

        let currency = match self.fetch("/stock/profile2", &params).await {
            Ok(text) => serde_json::from_str::<ProfileResponse>(&text)
                .ok()
                .and_then(|p| p.currency)
                .map(|c| c.to_uppercase())
                .unwrap_or_else(|| "USD".to_string()),
            Err(e) => {
                debug!("Finnhub profile fetch failed for {}: {}", symbol, e);
                "USD".to_string()
            }
        };

        Ok(SymbolSnapshot {
            symbol: symbol.to_string(),
            last_price: quote.c,
            prev_close: quote.pc,
            currency,
            // Day range stands in; the free quote endpoint has no 52-week fields.
            fifty_two_week_low: quote.l,
            fifty_two_week_high: quote.h,
        })
    }
}

#[async_trait]
impl MarketDataProvider for FinnhubProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn get_snapshot(
        &self,
        symbols: &[String],
    ) -> Result<Vec<SymbolSnapshot>, MarketDataError> {
        let mut rows = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            match self.fetch_symbol_snapshot(symbol).await {
                Ok(row) => rows.push(row),
                Err(e) => {
                    warn!("Finnhub: failed to fetch {}: {}", symbol, e);
                    rows.push(SymbolSnapshot::unavailable(symbol));
                }
            }
        }
        Ok(rows)
    }

    async fn get_history(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let from_ts = start.timestamp().to_string();
        let to_ts = end.timestamp().to_string();

        let params = [
            ("symbol", symbol),
            ("resolution", "D"),
            ("from", from_ts.as_str()),
            ("to", to_ts.as_str()),
        ];

        let text = self.fetch("/stock/candle", &params).await?;

        let response: CandleResponse =
            serde_json::from_str(&text).map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to parse candle response: {}", e),
            })?;

        if response.s == "no_data" {
            return Err(MarketDataError::NoDataForRange);
        }

        if response.s != "ok" {
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Unexpected candle status: {}", response.s),
            });
        }

        let len = response.t.len();
        if response.c.len() != len {
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: "Mismatched array lengths in candle response".to_string(),
            });
        }

        if len == 0 {
            return Err(MarketDataError::NoDataForRange);
        }

        let mut candles = Vec::with_capacity(len);
        for i in 0..len {
            let timestamp = match Utc.timestamp_opt(response.t[i], 0).single() {
                Some(ts) => ts,
                None => {
                    warn!("Invalid timestamp at index {}: {}", i, response.t[i]);
                    continue;
                }
            };

            candles.push(Candle {
                timestamp,
                open: response.o.get(i).copied(),
                high: response.h.get(i).copied(),
                low: response.l.get(i).copied(),
                close: response.c[i],
                volume: response.v.get(i).copied(),
            });
        }

        candles.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        debug!(
            "Finnhub: fetched {} daily bars for {} ({} to {})",
            candles.len(),
            symbol,
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d")
        );

        Ok(candles)
    }

    async fn get_fx_rate(&self, from: &str, to: &str) -> Result<f64, MarketDataError> {
        let params = [("base", from)];
        let text = self.fetch("/forex/rates", &params).await?;

        let response: ForexRatesResponse =
            serde_json::from_str(&text).map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to parse forex rates response: {}", e),
            })?;

        response
            .quote
            .get(to)
            .copied()
            .filter(|rate| *rate > 0.0)
            .ok_or_else(|| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("No rate for {}->{}", from, to),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_response_parsing() {
        let json = r#"{
            "c": 150.25,
            "d": 1.50,
            "dp": 1.01,
            "h": 152.00,
            "l": 148.50,
            "o": 149.00,
            "pc": 148.75,
            "t": 1704067200
        }"#;

        let response: QuoteResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.c, Some(150.25));
        assert_eq!(response.pc, Some(148.75));
        assert_eq!(response.h, Some(152.00));
        assert_eq!(response.l, Some(148.50));
    }

    #[test]
    fn profile_response_parsing() {
        let json = r#"{
            "name": "Apple Inc",
            "ticker": "AAPL",
            "exchange": "NASDAQ NMS - GLOBAL MARKET",
            "currency": "USD"
        }"#;

        let response: ProfileResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.currency, Some("USD".to_string()));
    }

    #[test]
    fn candle_response_parsing() {
        let json = r#"{
            "s": "ok",
            "c": [150.0, 151.0, 152.0],
            "h": [151.0, 152.0, 153.0],
            "l": [149.0, 150.0, 151.0],
            "o": [149.5, 150.5, 151.5],
            "v": [1000000, 1100000, 1200000],
            "t": [1704067200, 1704153600, 1704240000]
        }"#;

        let response: CandleResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.s, "ok");
        assert_eq!(response.c.len(), 3);
        assert_eq!(response.t.len(), 3);
    }

    #[test]
    fn candle_response_no_data() {
        let json = r#"{"s": "no_data"}"#;

        let response: CandleResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.s, "no_data");
        assert!(response.c.is_empty());
    }

    #[test]
    fn forex_rates_response_parsing() {
        let json = r#"{
            "base": "EUR",
            "quote": {
                "USD": 1.0832,
                "GBP": 0.8541
            }
        }"#;

        let response: ForexRatesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.quote.get("USD"), Some(&1.0832));
        assert_eq!(response.quote.get("GBP"), Some(&0.8541));
    }

    #[test]
    fn provider_id() {
        let provider = FinnhubProvider::new("test_key".to_string());
        assert_eq!(provider.id(), "FINNHUB");
    }
}

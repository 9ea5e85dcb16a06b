//! Alpha Vantage market data provider.
//!
//! - Quotes via GLOBAL_QUOTE, currency and 52-week range via OVERVIEW
//! - Daily history via TIME_SERIES_DAILY
//! - Spot FX via CURRENCY_EXCHANGE_RATE
//!
//! Alpha Vantage returns every numeric field as a JSON string, and reports
//! throttling as a 200 response carrying a "Note" or "Information" key.
//! Free tier is limited to 25 requests per day.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::MarketDataError;
use crate::models::{Candle, SymbolSnapshot};
use crate::provider::MarketDataProvider;

const BASE_URL: &str = "https://www.alphavantage.co/query";
const PROVIDER_ID: &str = "ALPHA_VANTAGE";

/// Throttle notice embedded in otherwise-successful responses.
#[derive(Debug, Deserialize)]
struct ThrottleNotice {
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote", default)]
    global_quote: Option<GlobalQuote>,
}

#[derive(Debug, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "05. price")]
    price: Option<String>,
    #[serde(rename = "08. previous close")]
    previous_close: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OverviewResponse {
    #[serde(rename = "Currency")]
    currency: Option<String>,
    #[serde(rename = "52WeekLow")]
    week_52_low: Option<String>,
    #[serde(rename = "52WeekHigh")]
    week_52_high: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DailySeriesResponse {
    #[serde(rename = "Time Series (Daily)", default)]
    series: BTreeMap<String, DailyBar>,
}

#[derive(Debug, Deserialize)]
struct DailyBar {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: String,
}

#[derive(Debug, Deserialize)]
struct ExchangeRateResponse {
    #[serde(rename = "Realtime Currency Exchange Rate", default)]
    exchange_rate: Option<ExchangeRate>,
}

#[derive(Debug, Deserialize)]
struct ExchangeRate {
    #[serde(rename = "5. Exchange Rate")]
    rate: Option<String>,
}

/// Safe conversion for Alpha Vantage's stringly-typed numbers.
fn parse_float(value: Option<&String>) -> Option<f64> {
    value.and_then(|s| s.trim().parse::<f64>().ok())
}

/// Alpha Vantage market data provider. Requires an API key.
pub struct AlphaVantageProvider {
    client: Client,
    api_key: String,
}

impl AlphaVantageProvider {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, api_key }
    }

    /// Make a GET request and surface throttle notices as errors.
    async fn fetch(&self, params: &[(&str, &str)]) -> Result<String, MarketDataError> {
        let mut request = self.client.get(BASE_URL);
        for (key, value) in params {
            request = request.query(&[(key, value)]);
        }
        request = request.query(&[("apikey", self.api_key.as_str())]);

        debug!("Alpha Vantage request with {} params", params.len());

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
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("HTTP {} - {}", status, body),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to read response: {}", e),
            })?;

        if let Ok(notice) = serde_json::from_str::<ThrottleNotice>(&text) {
            if notice.note.is_some() || notice.information.is_some() {
                return Err(MarketDataError::RateLimited {
                    provider: PROVIDER_ID.to_string(),
                });
            }
        }

        Ok(text)
    }

    async fn fetch_symbol_snapshot(&self, symbol: &str) -> Result<SymbolSnapshot, MarketDataError> {
        let text = self
            .fetch(&[("function", "GLOBAL_QUOTE"), ("symbol", symbol)])
            .await?;

        let response: GlobalQuoteResponse =
            serde_json::from_str(&text).map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to parse quote response: {}", e),
            })?;

        let quote = response
            .global_quote
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;

        // OVERVIEW carries currency and the 52-week range; treat its failure
        // as missing data, the quote alone is still worth a row.
        let overview = match self.fetch(&[("function", "OVERVIEW"), ("symbol", symbol)]).await {
            Ok(text) => serde_json::from_str::<OverviewResponse>(&text).ok(),
            Err(e) => {
                debug!("Alpha Vantage overview fetch failed for {}: {}", symbol, e);
                None
            }
        };
        let overview = overview.as_ref();

        Ok(SymbolSnapshot {
            symbol: symbol.to_string(),
            last_price: parse_float(quote.price.as_ref()),
            prev_close: parse_float(quote.previous_close.as_ref()),
            currency: overview
                .and_then(|o| o.currency.clone())
                .map(|c| c.to_uppercase())
                .unwrap_or_else(|| "USD".to_string()),
            fifty_two_week_low: overview.and_then(|o| parse_float(o.week_52_low.as_ref())),
            fifty_two_week_high: overview.and_then(|o| parse_float(o.week_52_high.as_ref())),
        })
    }
}

#[async_trait]
impl MarketDataProvider for AlphaVantageProvider {
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
                // A rate limit kills the whole request; anything else
                // degrades this symbol only.
                Err(e @ MarketDataError::RateLimited { .. }) => return Err(e),
                Err(e) => {
                    warn!("Alpha Vantage: failed to fetch {}: {}", symbol, e);
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
        let text = self
            .fetch(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", symbol),
                ("outputsize", "compact"),
            ])
            .await?;

        let response: DailySeriesResponse =
            serde_json::from_str(&text).map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to parse daily series response: {}", e),
            })?;

        if response.series.is_empty() {
            return Err(MarketDataError::NoDataForRange);
        }

        // BTreeMap keys come out date-ascending already.
        let mut candles = Vec::new();
        for (date_str, bar) in &response.series {
            let date = match NaiveDate::parse_from_str(date_str, "%Y-%m-%d") {
                Ok(d) => d,
                Err(e) => {
                    warn!("Alpha Vantage: bad date key '{}': {}", date_str, e);
                    continue;
                }
            };
            let Some(close) = parse_float(Some(&bar.close)) else {
                warn!("Alpha Vantage: bad close for {} on {}", symbol, date_str);
                continue;
            };
            let timestamp = date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
            let Some(timestamp) = timestamp else { continue };

            if timestamp < start || timestamp > end {
                continue;
            }

            candles.push(Candle {
                timestamp,
                open: parse_float(Some(&bar.open)),
                high: parse_float(Some(&bar.high)),
                low: parse_float(Some(&bar.low)),
                close,
                volume: parse_float(Some(&bar.volume)),
            });
        }

        if candles.is_empty() {
            return Err(MarketDataError::NoDataForRange);
        }

        debug!(
            "Alpha Vantage: fetched {} daily bars for {}",
            candles.len(),
            symbol
        );

        Ok(candles)
    }

    async fn get_fx_rate(&self, from: &str, to: &str) -> Result<f64, MarketDataError> {
        let text = self
            .fetch(&[
                ("function", "CURRENCY_EXCHANGE_RATE"),
                ("from_currency", from),
                ("to_currency", to),
            ])
            .await?;

        let response: ExchangeRateResponse =
            serde_json::from_str(&text).map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to parse exchange rate response: {}", e),
            })?;

        response
            .exchange_rate
            .as_ref()
            .and_then(|r| parse_float(r.rate.as_ref()))
            .filter(|rate| *rate > 0.0)
            .ok_or_else(|| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("No rate for {}->{}", from, to),
            })
    }
}

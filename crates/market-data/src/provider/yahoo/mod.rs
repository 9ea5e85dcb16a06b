//! Yahoo Finance market data provider.
//!
//! Always available as the last link of the chain since it needs no API key.
//! Snapshots come from the quoteSummary API (price + summaryDetail modules,
//! authenticated with a crumb/cookie pair), history from the chart API via
//! the `yahoo_finance_api` crate, and FX rates from `{FROM}{TO}=X` tickers.

mod models;

use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use lazy_static::lazy_static;
use reqwest::header;
use time::OffsetDateTime;
use tracing::{debug, warn};
use urlencoding::encode;
use yahoo_finance_api as yahoo;

use crate::errors::MarketDataError;
use crate::models::{Candle, SymbolSnapshot};
use crate::provider::MarketDataProvider;

use models::YahooQuoteSummaryResponse;

const PROVIDER_ID: &str = "YAHOO";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Cached Yahoo authentication data
#[derive(Debug, Clone)]
struct CrumbData {
    cookie: String,
    crumb: String,
}

lazy_static! {
    /// Global cache for Yahoo authentication crumb
    static ref YAHOO_CRUMB: RwLock<Option<CrumbData>> = RwLock::default();
}

/// Yahoo Finance market data provider.
pub struct YahooProvider {
    connector: yahoo::YahooConnector,
}

impl YahooProvider {
    pub fn new() -> Result<Self, MarketDataError> {
        let connector =
            yahoo::YahooConnector::new().map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to initialize Yahoo connector: {}", e),
            })?;
        Ok(Self { connector })
    }

    /// Ensure we have a valid Yahoo authentication crumb.
    async fn ensure_crumb(&self) -> Result<CrumbData, MarketDataError> {
        {
            let guard = YAHOO_CRUMB.read().unwrap();
            if let Some(crumb) = guard.as_ref() {
                return Ok(crumb.clone());
            }
        }

        self.fetch_crumb().await
    }

    /// Fetch a new Yahoo authentication crumb.
    async fn fetch_crumb(&self) -> Result<CrumbData, MarketDataError> {
        let client = reqwest::Client::new();

        // Step 1: Get cookie from fc.yahoo.com
        let response = client
            .get("https://fc.yahoo.com")
            .send()
            .await
            .map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to get cookie: {}", e),
            })?;

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.split_once(';').map(|(v, _)| v.to_string()))
            .ok_or_else(|| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: "Failed to parse Yahoo cookie".to_string(),
            })?;

        // Step 2: Get crumb using cookie
        let crumb = client
            .get("https://query1.finance.yahoo.com/v1/test/getcrumb")
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::COOKIE, &cookie)
            .send()
            .await
            .map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to get crumb: {}", e),
            })?
            .text()
            .await
            .map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to read crumb: {}", e),
            })?;

        let crumb_data = CrumbData { cookie, crumb };

        let mut guard = YAHOO_CRUMB.write().unwrap();
        *guard = Some(crumb_data.clone());

        Ok(crumb_data)
    }

    /// Clear the cached crumb (used when authentication fails)
    fn clear_crumb(&self) {
        let mut guard = YAHOO_CRUMB.write().unwrap();
        *guard = None;
    }

    /// Convert chrono DateTime<Utc> to time::OffsetDateTime for the Yahoo API.
    fn chrono_to_offset_datetime(dt: DateTime<Utc>) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(dt.timestamp())
            .unwrap_or_else(|_| OffsetDateTime::now_utc())
    }

    async fn fetch_symbol_snapshot(&self, symbol: &str) -> Result<SymbolSnapshot, MarketDataError> {
        let crumb = self.ensure_crumb().await?;

        let url = format!(
            "https://query1.finance.yahoo.com/v10/finance/quoteSummary/{}?modules=price,summaryDetail&crumb={}",
            encode(symbol),
            encode(&crumb.crumb)
        );

        let client = reqwest::Client::new();
        let response = client
            .get(&url)
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::COOKIE, &crumb.cookie)
            .send()
            .await
            .map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Quote summary request failed: {}", e),
            })?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            self.clear_crumb();
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: "Yahoo authentication expired".to_string(),
            });
        }

        let data: YahooQuoteSummaryResponse =
            response
                .json()
                .await
                .map_err(|e| MarketDataError::ProviderError {
                    provider: PROVIDER_ID.to_string(),
                    message: format!("Failed to parse quote summary response: {}", e),
                })?;

        let result = data
            .quote_summary
            .result
            .into_iter()
            .next()
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;

        let price = result
            .price
            .as_ref()
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;
        let detail = result.summary_detail.as_ref();

        Ok(SymbolSnapshot {
            symbol: symbol.to_string(),
            last_price: price.regular_market_price.as_ref().and_then(|p| p.raw),
            prev_close: price
                .regular_market_previous_close
                .as_ref()
                .and_then(|p| p.raw),
            currency: price
                .currency
                .clone()
                .map(|c| c.to_uppercase())
                .unwrap_or_else(|| "USD".to_string()),
            fifty_two_week_low: detail
                .and_then(|d| d.fifty_two_week_low.as_ref())
                .and_then(|p| p.raw),
            fifty_two_week_high: detail
                .and_then(|d| d.fifty_two_week_high.as_ref())
                .and_then(|p| p.raw),
        })
    }
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
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
                    warn!("Yahoo: failed to fetch {}: {}", symbol, e);
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
        debug!(
            "Fetching history for {} from {} to {} from Yahoo",
            symbol,
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d")
        );

        let start_time = Self::chrono_to_offset_datetime(start);
        let end_time = Self::chrono_to_offset_datetime(end);

        let response = self
            .connector
            .get_quote_history(symbol, start_time, end_time)
            .await
            .map_err(|e| {
                if matches!(e, yahoo::YahooError::NoQuotes | yahoo::YahooError::NoResult) {
                    MarketDataError::SymbolNotFound(symbol.to_string())
                } else {
                    MarketDataError::ProviderError {
                        provider: PROVIDER_ID.to_string(),
                        message: e.to_string(),
                    }
                }
            })?;

        let quotes = response.quotes().map_err(|e| {
            if matches!(e, yahoo::YahooError::NoQuotes | yahoo::YahooError::NoResult) {
                MarketDataError::NoDataForRange
            } else {
                MarketDataError::ProviderError {
                    provider: PROVIDER_ID.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        let candles: Vec<Candle> = quotes
            .into_iter()
            .filter_map(|q| {
                let timestamp = Utc.timestamp_opt(q.timestamp as i64, 0).single()?;
                Some(Candle {
                    timestamp,
                    open: Some(q.open),
                    high: Some(q.high),
                    low: Some(q.low),
                    close: q.close,
                    volume: Some(q.volume as f64),
                })
            })
            .collect();

        if candles.is_empty() {
            return Err(MarketDataError::NoDataForRange);
        }

        Ok(candles)
    }

    /// FX rates come from Yahoo's synthetic `{FROM}{TO}=X` tickers.
    async fn get_fx_rate(&self, from: &str, to: &str) -> Result<f64, MarketDataError> {
        let symbol = format!("{}{}=X", from, to);

        let response = self
            .connector
            .get_latest_quotes(&symbol, "1d")
            .await
            .map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("FX quote for {} failed: {}", symbol, e),
            })?;

        let quote = response
            .last_quote()
            .map_err(|_| MarketDataError::SymbolNotFound(symbol.clone()))?;

        if quote.close > 0.0 {
            Ok(quote.close)
        } else {
            Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Non-positive rate for {}", symbol),
            })
        }
    }
}

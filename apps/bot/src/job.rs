//! One reporting cycle: fetch, convert, compute, render, deliver.

use std::collections::HashMap;

use anyhow::{bail, Context};
use chrono::{Duration, Utc};
use stockbot_core::models::normalize_history;
use stockbot_core::{
    compute_position_metrics, day_change_pct, format_report, fx, IndexMetrics, PricePoint,
    PriceSnapshot, ReportOptions,
};
use stockbot_market_data::{Candle, ProviderChain, SymbolSnapshot};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::delivery;

/// History window for the WTD/MTD anchors: a full month of trading days
/// plus slack for holidays and weekends.
const HISTORY_WINDOW_DAYS: i64 = 35;

/// Per-cycle FX rate cache keyed by native currency.
///
/// When no provider can serve a rate the cycle proceeds unconverted at 1.0;
/// a report with native-currency numbers beats no report.
struct FxCache<'a> {
    chain: &'a ProviderChain,
    base: String,
    rates: HashMap<String, f64>,
}

impl<'a> FxCache<'a> {
    fn new(chain: &'a ProviderChain, base: &str) -> Self {
        Self {
            chain,
            base: base.to_uppercase(),
            rates: HashMap::new(),
        }
    }

    async fn rate(&mut self, currency: &str) -> f64 {
        let currency = currency.to_uppercase();
        if currency == self.base {
            return 1.0;
        }
        if let Some(rate) = self.rates.get(&currency) {
            return *rate;
        }

        let rate = match self.chain.get_fx_rate(&currency, &self.base).await {
            Ok(rate) => rate,
            Err(e) => {
                error!(
                    "Could not fetch FX rate {}->{} ({}), using 1.0",
                    currency, self.base, e
                );
                1.0
            }
        };
        self.rates.insert(currency, rate);
        rate
    }
}

fn to_price_snapshot(row: &SymbolSnapshot) -> PriceSnapshot {
    PriceSnapshot::new(
        row.last_price,
        row.prev_close,
        row.fifty_two_week_low,
        row.fifty_two_week_high,
    )
}

fn to_history(candles: &[Candle]) -> Vec<PricePoint> {
    // Timestamp order first, so the last bar of a day survives the
    // per-day dedup in normalize_history.
    let mut candles: Vec<&Candle> = candles.iter().collect();
    candles.sort_by_key(|c| c.timestamp);
    normalize_history(
        candles
            .iter()
            .map(|c| PricePoint::new(c.timestamp.date_naive(), c.close))
            .collect(),
    )
}

/// Run a single reporting cycle end to end.
pub async fn run_report_cycle(config: &Config, chain: &ProviderChain) -> anyhow::Result<()> {
    let base = config.portfolio.base_currency.to_uppercase();
    let positions = &config.portfolio.positions;
    if positions.is_empty() {
        bail!("no positions configured");
    }

    // One timestamp drives the whole cycle so every metric agrees on "today".
    let now = Utc::now();
    let history_start = now - Duration::days(HISTORY_WINDOW_DAYS);

    let symbols: Vec<String> = positions.iter().map(|p| p.symbol.clone()).collect();
    info!("Fetching snapshot for {} symbols", symbols.len());
    let snapshot = chain
        .get_snapshot(&symbols)
        .await
        .context("portfolio snapshot failed")?;

    let mut fx_cache = FxCache::new(chain, &base);

    let mut metrics = Vec::new();
    for position in positions {
        let Some(row) = snapshot.iter().find(|r| r.symbol == position.symbol) else {
            warn!("Symbol {} not in snapshot, skipping", position.symbol);
            continue;
        };

        let rate = fx_cache.rate(&row.currency).await;
        let snap_base = fx::convert_snapshot(&to_price_snapshot(row), rate);

        let candles = chain
            .get_history(&position.symbol, history_start, now)
            .await;
        let history = fx::convert_history(&to_history(&candles), rate);

        metrics.push(compute_position_metrics(
            &position.symbol,
            &snap_base,
            &history,
            position.units,
            position.cost_basis,
            rate,
            now,
        ));
    }

    let index_metrics = fetch_index_metrics(config, chain, &mut fx_cache).await;

    let options = ReportOptions {
        header: config.telegram.header.clone(),
        footer: config.telegram.footer.clone(),
        sort_by: config.report.sort_by,
        top_n: config.report.top_n,
        base_currency: base,
    };
    let report = format_report(&metrics, &index_metrics, &options, now);
    info!("Report generated ({} bytes)", report.len());

    deliver(config, &report).await
}

async fn fetch_index_metrics(
    config: &Config,
    chain: &ProviderChain,
    fx_cache: &mut FxCache<'_>,
) -> Vec<IndexMetrics> {
    let index_symbols = &config.report.include_index;
    if index_symbols.is_empty() {
        return Vec::new();
    }

    info!("Fetching index snapshot for {:?}", index_symbols);
    let rows = match chain.get_snapshot(index_symbols).await {
        Ok(rows) => rows,
        Err(e) => {
            warn!("Index snapshot failed, omitting index section: {}", e);
            return Vec::new();
        }
    };

    let mut metrics = Vec::with_capacity(rows.len());
    for row in &rows {
        let rate = fx_cache.rate(&row.currency).await;
        let snap = fx::convert_snapshot(&to_price_snapshot(row), rate);
        metrics.push(IndexMetrics {
            symbol: row.symbol.clone(),
            last_price: snap.last_price,
            day_change_pct: day_change_pct(snap.last_price, snap.prev_close),
        });
    }
    metrics
}

async fn deliver(config: &Config, report: &str) -> anyhow::Result<()> {
    let senders = delivery::build_senders(config);
    if senders.is_empty() {
        warn!("No delivery channel configured, printing report to stdout");
        println!("{report}");
        return Ok(());
    }

    let mut any_ok = false;
    for sender in senders {
        match sender.send(report).await {
            Ok(()) => {
                info!("Report delivered via {}", sender.channel());
                any_ok = true;
            }
            Err(e) => error!("Delivery via {} failed: {}", sender.channel(), e),
        }
    }

    if !any_ok {
        bail!("report could not be delivered on any channel");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn snapshot_conversion_keeps_optionality() {
        let row = SymbolSnapshot {
            symbol: "AAPL".to_string(),
            last_price: Some(150.25),
            prev_close: None,
            currency: "USD".to_string(),
            fifty_two_week_low: Some(124.17),
            fifty_two_week_high: Some(199.62),
        };
        let snap = to_price_snapshot(&row);
        assert_eq!(snap.last_price, Some(150.25));
        assert_eq!(snap.prev_close, None);
    }

    #[test]
    fn history_conversion_collapses_to_daily_closes() {
        let day = |d: u32, h: u32, close: f64| Candle {
            timestamp: Utc.with_ymd_and_hms(2026, 2, d, h, 0, 0).unwrap(),
            open: None,
            high: None,
            low: None,
            close,
            volume: None,
        };
        // Out of order, with two bars on the same day
        let candles = vec![day(5, 21, 105.0), day(3, 21, 101.0), day(5, 15, 104.0)];
        let history = to_history(&candles);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].close, 101.0);
        // Later bar wins for the duplicated day
        assert_eq!(history[1].close, 105.0);
    }
}

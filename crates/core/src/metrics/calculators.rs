//! Per-position change and profit/loss calculators.
//!
//! All inputs are assumed to be in the report's base currency already; FX
//! conversion is the aggregator's job (see [`super::compute_position_metrics`]).

use chrono::{DateTime, NaiveDate, Utc};

use crate::format::grouped_2dp;
use crate::models::PricePoint;

/// Sentinel shown when a range bound is missing.
pub const RANGE_UNAVAILABLE: &str = "N/A";

/// Percentage change from previous close to last price.
///
/// `None` when either input is missing or the previous close is zero.
pub fn day_change_pct(last_price: Option<f64>, prev_close: Option<f64>) -> Option<f64> {
    let last = last_price?;
    let prev = prev_close?;
    if prev == 0.0 {
        return None;
    }
    Some((last - prev) / prev * 100.0)
}

/// Absolute profit/loss in base currency.
///
/// Zero units is a real answer (flat zero), not missing data.
pub fn pnl_absolute(
    last_price: Option<f64>,
    cost_basis: Option<f64>,
    units: f64,
) -> Option<f64> {
    let last = last_price?;
    let cost = cost_basis?;
    Some((last - cost) * units)
}

/// Profit/loss as a percentage of cost basis.
pub fn pnl_percent(last_price: Option<f64>, cost_basis: Option<f64>) -> Option<f64> {
    let last = last_price?;
    let cost = cost_basis?;
    if cost == 0.0 {
        return None;
    }
    Some((last - cost) / cost * 100.0)
}

/// Percentage change from the close at `reference` to the latest close.
///
/// `reference` is compared by calendar date; time-of-day and offset are
/// stripped. The reference close is the latest point on or before that date.
/// When the reference date precedes the entire history window, the earliest
/// available point is used instead of failing: for young histories "change
/// since the window began" is the most honest number available.
pub fn period_change_pct(history: &[PricePoint], reference: DateTime<Utc>) -> Option<f64> {
    period_change_on(history, reference.date_naive())
}

/// Date-keyed variant of [`period_change_pct`], used by the calendar anchors.
pub fn period_change_on(history: &[PricePoint], reference_date: NaiveDate) -> Option<f64> {
    let latest = history.last()?;

    let reference_close = history
        .iter()
        .rev()
        .find(|p| p.date <= reference_date)
        .unwrap_or(&history[0])
        .close;

    if reference_close == 0.0 {
        return None;
    }
    Some((latest.close - reference_close) / reference_close * 100.0)
}

/// Render a 52-week low/high pair, e.g. `"120.50 – 200.75"`.
///
/// Either bound missing yields the [`RANGE_UNAVAILABLE`] sentinel; a partial
/// range is never shown.
pub fn fifty_two_week_range(low: Option<f64>, high: Option<f64>) -> String {
    match (low, high) {
        (Some(low), Some(high)) => format!("{} – {}", grouped_2dp(low), grouped_2dp(high)),
        _ => RANGE_UNAVAILABLE.to_string(),
    }
}

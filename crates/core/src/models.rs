use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Point-in-time quote for a single symbol, already expressed in the
/// report's base currency.
///
/// `None` means "no data". Non-finite values coming off the wire are folded
/// into `None` at construction so the calculators only ever see real numbers.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSnapshot {
    pub last_price: Option<f64>,
    pub prev_close: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
}

impl PriceSnapshot {
    pub fn new(
        last_price: Option<f64>,
        prev_close: Option<f64>,
        fifty_two_week_low: Option<f64>,
        fifty_two_week_high: Option<f64>,
    ) -> Self {
        Self {
            last_price: finite(last_price),
            prev_close: finite(prev_close),
            fifty_two_week_low: finite(fifty_two_week_low),
            fifty_two_week_high: finite(fifty_two_week_high),
        }
    }
}

/// NaN and infinities mean "no data".
fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// One daily closing price.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// Sort a raw series into the shape the calculators expect: ascending by
/// date, one point per calendar day (the later sample wins on duplicates).
pub fn normalize_history(mut points: Vec<PricePoint>) -> Vec<PricePoint> {
    points.sort_by_key(|p| p.date);
    points.dedup_by(|next, prev| {
        if next.date == prev.date {
            // keep the later sample
            prev.close = next.close;
            true
        } else {
            false
        }
    });
    points
}

/// A configured holding.
///
/// `cost_basis` is the per-unit entry price in the position's native
/// currency; P/L fields are omitted from the report when it is unknown.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub symbol: String,
    pub units: f64,
    #[serde(default, alias = "cost_basis", skip_serializing_if = "Option::is_none")]
    pub cost_basis: Option<f64>,
}

impl Position {
    pub fn new(symbol: impl Into<String>, units: f64, cost_basis: Option<f64>) -> Self {
        Self {
            symbol: symbol.into(),
            units,
            cost_basis,
        }
    }
}

/// Parses the `SYMBOL:UNITS[:COST_BASIS]` grammar used by the `POSITIONS`
/// environment override, e.g. `AAPL:12:148.20` or `MSFT:8`.
impl FromStr for Position {
    type Err = CoreError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| CoreError::InvalidPosition {
            spec: spec.to_string(),
            reason: reason.to_string(),
        };

        let mut parts = spec.split(':').map(str::trim);
        let symbol = match parts.next() {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => return Err(invalid("missing symbol")),
        };
        let units = parts
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| invalid("missing units"))?
            .parse::<f64>()
            .map_err(|e| invalid(&format!("units: {e}")))?;
        let cost_basis = match parts.next().filter(|s| !s.is_empty()) {
            Some(raw) => Some(
                raw.parse::<f64>()
                    .map_err(|e| invalid(&format!("cost basis: {e}")))?,
            ),
            None => None,
        };

        if units < 0.0 {
            return Err(invalid("units must be >= 0"));
        }

        Ok(Position {
            symbol,
            units,
            cost_basis,
        })
    }
}

/// Computed metrics for one position, one record per reporting cycle.
///
/// Every optional field is present if and only if all of its inputs were
/// present and well-formed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionMetrics {
    pub symbol: String,
    pub units: f64,
    pub last_price: Option<f64>,
    pub day_change_pct: Option<f64>,
    pub pnl_abs: Option<f64>,
    pub pnl_pct: Option<f64>,
    pub week_to_date_pct: Option<f64>,
    pub month_to_date_pct: Option<f64>,
    pub fifty_two_week_range: String,
}

/// Reduced metrics for a benchmark index shown in the report footer section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexMetrics {
    pub symbol: String,
    pub last_price: Option<f64>,
    pub day_change_pct: Option<f64>,
}

//! The metric computation core: change calculators, P/L calculators,
//! calendar anchors, and the per-position aggregator.

mod calculators;
mod calendar;

pub use calculators::{
    day_change_pct, fifty_two_week_range, period_change_on, period_change_pct, pnl_absolute,
    pnl_percent, RANGE_UNAVAILABLE,
};
pub use calendar::{month_to_date_pct, week_to_date_pct};

use chrono::{DateTime, Utc};

use crate::models::{PositionMetrics, PricePoint, PriceSnapshot};

/// Build the full metrics record for one position.
///
/// * `snapshot` and `history` must already be expressed in the report's base
///   currency; the caller applies the same `fx_rate` to the history closes
///   before calling in.
/// * `cost_basis` is in the position's native currency and is converted here
///   with `fx_rate` (1.0 when the native currency is the base currency).
/// * `today` is the reporting cycle's reference timestamp; the wall clock is
///   never read here so a cycle is reproducible.
///
/// Positions are independent: this function reads nothing but its arguments,
/// so callers may fan out over positions in any order.
#[allow(clippy::too_many_arguments)]
pub fn compute_position_metrics(
    symbol: &str,
    snapshot: &PriceSnapshot,
    history: &[PricePoint],
    units: f64,
    cost_basis: Option<f64>,
    fx_rate: f64,
    today: DateTime<Utc>,
) -> PositionMetrics {
    let cost_basis_base = cost_basis.map(|cb| cb * fx_rate);

    PositionMetrics {
        symbol: symbol.to_string(),
        units,
        last_price: snapshot.last_price,
        day_change_pct: day_change_pct(snapshot.last_price, snapshot.prev_close),
        pnl_abs: pnl_absolute(snapshot.last_price, cost_basis_base, units),
        pnl_pct: pnl_percent(snapshot.last_price, cost_basis_base),
        week_to_date_pct: week_to_date_pct(history, today),
        month_to_date_pct: month_to_date_pct(history, today),
        fifty_two_week_range: fifty_two_week_range(
            snapshot.fifty_two_week_low,
            snapshot.fifty_two_week_high,
        ),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn point(y: i32, m: u32, d: u32, close: f64) -> PricePoint {
        PricePoint::new(NaiveDate::from_ymd_opt(y, m, d).unwrap(), close)
    }

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(8, 10, 0)
            .unwrap()
            .and_utc()
    }

    fn snapshot() -> PriceSnapshot {
        PriceSnapshot::new(Some(160.0), Some(155.0), Some(120.0), Some(180.0))
    }

    fn history() -> Vec<PricePoint> {
        vec![
            point(2026, 1, 28, 145.0),
            point(2026, 1, 30, 150.0),
            point(2026, 2, 3, 155.0),
            point(2026, 2, 5, 160.0),
        ]
    }

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("expected a value");
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn full_metrics_record() {
        let m = compute_position_metrics(
            "AAPL",
            &snapshot(),
            &history(),
            12.0,
            Some(148.2),
            1.0,
            utc(2026, 2, 5),
        );
        assert_eq!(m.symbol, "AAPL");
        assert_eq!(m.units, 12.0);
        assert_eq!(m.last_price, Some(160.0));
        assert_close(m.day_change_pct, (160.0 - 155.0) / 155.0 * 100.0);
        assert_close(m.pnl_abs, (160.0 - 148.2) * 12.0);
        assert_close(m.pnl_pct, (160.0 - 148.2) / 148.2 * 100.0);
        // WTD anchor: Friday Jan 30 close (150), latest 160.
        assert_close(m.week_to_date_pct, (160.0 - 150.0) / 150.0 * 100.0);
        // MTD anchor: Jan 31 → closest earlier close is Jan 30 (150).
        assert_close(m.month_to_date_pct, (160.0 - 150.0) / 150.0 * 100.0);
        assert_eq!(m.fifty_two_week_range, "120.00 – 180.00");
    }

    #[test]
    fn missing_cost_basis_omits_pnl_but_keeps_the_rest() {
        let m = compute_position_metrics(
            "ASML.AS",
            &snapshot(),
            &history(),
            5.0,
            None,
            1.0,
            utc(2026, 2, 5),
        );
        assert_eq!(m.pnl_abs, None);
        assert_eq!(m.pnl_pct, None);
        assert!(m.day_change_pct.is_some());
        assert!(m.week_to_date_pct.is_some());
    }

    #[test]
    fn cost_basis_is_converted_with_the_fx_rate() {
        let m = compute_position_metrics(
            "AAPL",
            &snapshot(),
            &history(),
            12.0,
            Some(148.2),
            0.92,
            utc(2026, 2, 5),
        );
        let cb_base = 148.2 * 0.92;
        assert_close(m.pnl_abs, (160.0 - cb_base) * 12.0);
        assert_close(m.pnl_pct, (160.0 - cb_base) / cb_base * 100.0);
    }

    #[test]
    fn empty_history_omits_period_metrics_only() {
        let m = compute_position_metrics(
            "AAPL",
            &snapshot(),
            &[],
            12.0,
            Some(148.2),
            1.0,
            utc(2026, 2, 5),
        );
        assert_eq!(m.week_to_date_pct, None);
        assert_eq!(m.month_to_date_pct, None);
        assert!(m.day_change_pct.is_some());
        assert!(m.pnl_abs.is_some());
    }

    #[test]
    fn empty_snapshot_degrades_every_price_field() {
        let m = compute_position_metrics(
            "GME",
            &PriceSnapshot::default(),
            &history(),
            3.0,
            Some(20.0),
            1.0,
            utc(2026, 2, 5),
        );
        assert_eq!(m.last_price, None);
        assert_eq!(m.day_change_pct, None);
        assert_eq!(m.pnl_abs, None);
        assert_eq!(m.pnl_pct, None);
        assert_eq!(m.fifty_two_week_range, "N/A");
        // History is independent of the snapshot.
        assert!(m.week_to_date_pct.is_some());
    }
}

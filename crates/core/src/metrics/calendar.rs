//! Week-to-date and month-to-date anchor resolution.
//!
//! The anchors are calendar approximations: the week anchor is the Friday
//! before the current ISO week's Monday, the month anchor is the last
//! calendar day of the previous month. Market holidays are not consulted;
//! `period_change_on` already walks back to the closest earlier trading day
//! when the anchor itself has no close.

use chrono::{DateTime, Datelike, Days, Utc};

use crate::models::PricePoint;

use super::calculators::period_change_on;

/// Percentage change since the close before the current week started.
pub fn week_to_date_pct(history: &[PricePoint], today: DateTime<Utc>) -> Option<f64> {
    let today = today.date_naive();
    let monday = today.checked_sub_days(Days::new(u64::from(
        today.weekday().num_days_from_monday(),
    )))?;
    // Friday before the week started
    let reference = monday.checked_sub_days(Days::new(3))?;
    period_change_on(history, reference)
}

/// Percentage change since the last calendar day of the previous month.
pub fn month_to_date_pct(history: &[PricePoint], today: DateTime<Utc>) -> Option<f64> {
    let first_of_month = today.date_naive().with_day(1)?;
    let reference = first_of_month.checked_sub_days(Days::new(1))?;
    period_change_on(history, reference)
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
            .and_hms_opt(12, 30, 0)
            .unwrap()
            .and_utc()
    }

    fn fixture() -> Vec<PricePoint> {
        vec![
            point(2026, 1, 28, 100.0),
            point(2026, 1, 29, 101.0),
            point(2026, 1, 30, 102.0),
            point(2026, 2, 2, 103.0),
            point(2026, 2, 3, 104.0),
            point(2026, 2, 4, 106.0),
            point(2026, 2, 5, 105.0),
        ]
    }

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("expected a value");
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn wtd_anchors_on_friday_before_monday() {
        // Thursday 2026-02-05: Monday is Feb 2, anchor is Friday Jan 30
        // (close 102), latest close 105.
        let expected = (105.0 - 102.0) / 102.0 * 100.0;
        assert_close(week_to_date_pct(&fixture(), utc(2026, 2, 5)), expected);
    }

    #[test]
    fn wtd_on_a_monday_anchors_on_previous_friday() {
        let expected = (103.0 - 102.0) / 102.0 * 100.0;
        let history: Vec<_> = fixture().into_iter().take(4).collect();
        assert_close(week_to_date_pct(&history, utc(2026, 2, 2)), expected);
    }

    #[test]
    fn mtd_anchors_on_last_close_of_previous_month() {
        // Last calendar day of January is the 31st; closest earlier close is
        // Friday Jan 30 (102).
        let expected = (105.0 - 102.0) / 102.0 * 100.0;
        assert_close(month_to_date_pct(&fixture(), utc(2026, 2, 5)), expected);
    }

    #[test]
    fn mtd_mid_january_uses_year_boundary() {
        let history = vec![
            point(2025, 12, 30, 200.0),
            point(2025, 12, 31, 210.0),
            point(2026, 1, 14, 231.0),
        ];
        // Anchor is Dec 31 exactly.
        assert_close(month_to_date_pct(&history, utc(2026, 1, 15)), 10.0);
    }

    #[test]
    fn both_are_absent_on_empty_history() {
        assert_eq!(week_to_date_pct(&[], utc(2026, 2, 5)), None);
        assert_eq!(month_to_date_pct(&[], utc(2026, 2, 5)), None);
    }

    #[test]
    fn young_history_falls_back_to_earliest_point() {
        // History starts mid-week, after the anchor date.
        let history = vec![point(2026, 2, 4, 100.0), point(2026, 2, 5, 103.0)];
        assert_close(week_to_date_pct(&history, utc(2026, 2, 5)), 3.0);
        assert_close(month_to_date_pct(&history, utc(2026, 2, 5)), 3.0);
    }
}

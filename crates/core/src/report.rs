//! Plain-text report rendering.
//!
//! The output is a fixed-width table meant for monospace messengers. It must
//! stay small enough for a single message, so an oversized report is
//! truncated at a UTF-8 boundary rather than split.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::format::grouped_2dp;
use crate::models::{IndexMetrics, PositionMetrics};

/// Hard ceiling on the rendered report, in bytes. Signal rejects messages
/// around 6 KB, so stay comfortably below.
pub const MAX_REPORT_BYTES: usize = 5500;

const MISSING: &str = "—";

/// Which column orders the position table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    DayChangePct,
    PnlAbs,
    PnlPct,
    WeekToDatePct,
    MonthToDatePct,
    LastPrice,
}

impl SortKey {
    fn value(self, m: &PositionMetrics) -> Option<f64> {
        match self {
            SortKey::DayChangePct => m.day_change_pct,
            SortKey::PnlAbs => m.pnl_abs,
            SortKey::PnlPct => m.pnl_pct,
            SortKey::WeekToDatePct => m.week_to_date_pct,
            SortKey::MonthToDatePct => m.month_to_date_pct,
            SortKey::LastPrice => m.last_price,
        }
    }
}

/// Presentation knobs, taken from the delivery and report config sections.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReportOptions {
    pub header: String,
    pub footer: String,
    pub sort_by: SortKey,
    pub top_n: usize,
    pub base_currency: String,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            header: "Daily Stock Report".to_string(),
            footer: String::new(),
            sort_by: SortKey::default(),
            top_n: 10,
            base_currency: "EUR".to_string(),
        }
    }
}

/// Missing values render as an em-dash, never as a zero.
fn plain(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2}"),
        None => MISSING.to_string(),
    }
}

fn money(value: Option<f64>) -> String {
    match value {
        Some(v) => grouped_2dp(v),
        None => format!("  {MISSING}"),
    }
}

/// Percent with an explicit sign, e.g. `+3.14%` / `-0.50%`.
fn signed_pct(value: Option<f64>) -> String {
    match value {
        Some(v) if v >= 0.0 => format!("+{v:.2}%"),
        Some(v) => format!("{v:.2}%"),
        None => format!("  {MISSING}"),
    }
}

/// Render the complete report.
///
/// Positions are sorted descending by the configured key with missing values
/// last, then cut to `top_n`. The caller owns the reference timestamp so the
/// rendered text is reproducible.
pub fn format_report(
    metrics: &[PositionMetrics],
    index_metrics: &[IndexMetrics],
    options: &ReportOptions,
    now: DateTime<Utc>,
) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push(options.header.clone());
    lines.push(format!("Date: {} UTC", now.format("%Y-%m-%d %H:%M")));
    lines.push(format!("Currency: {}", options.base_currency));
    lines.push("=".repeat(48));

    if metrics.is_empty() {
        lines.push("No position data available.".to_string());
        lines.push(options.footer.clone());
        return lines.join("\n");
    }

    let mut rows: Vec<&PositionMetrics> = metrics.iter().collect();
    let key = options.sort_by;
    rows.sort_by(|a, b| match (key.value(a), key.value(b)) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    rows.truncate(options.top_n);

    lines.push(format!(
        "{:<8} {:>9} {:>7} {:>10} {:>7} {:>7} {:>7} {:>20}",
        "Sym", "Price", "Day%", "P/L", "P/L%", "WTD%", "MTD%", "52wk Range"
    ));
    lines.push("-".repeat(80));

    for row in rows {
        let sym: String = row.symbol.chars().take(7).collect();
        lines.push(format!(
            "{:<8} {:>9} {:>7} {:>10} {:>7} {:>7} {:>7} {:>20}",
            sym,
            plain(row.last_price),
            signed_pct(row.day_change_pct),
            money(row.pnl_abs),
            signed_pct(row.pnl_pct),
            signed_pct(row.week_to_date_pct),
            signed_pct(row.month_to_date_pct),
            row.fifty_two_week_range,
        ));
    }

    if !index_metrics.is_empty() {
        lines.push(String::new());
        lines.push("Indices:".to_string());
        lines.push("-".repeat(48));
        for idx in index_metrics {
            lines.push(format!(
                "  {:<10} {:>12}  {:>7}",
                idx.symbol,
                money(idx.last_price),
                signed_pct(idx.day_change_pct),
            ));
        }
    }

    lines.push(String::new());
    lines.push(options.footer.clone());

    let mut report = lines.join("\n");

    if report.len() > MAX_REPORT_BYTES {
        warn!(
            "Report too large ({} bytes), truncating to {}",
            report.len(),
            MAX_REPORT_BYTES
        );
        let mut cut = MAX_REPORT_BYTES;
        while !report.is_char_boundary(cut) {
            cut -= 1;
        }
        report.truncate(cut);
        report.push_str("\n... (truncated)");
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(symbol: &str, day: Option<f64>) -> PositionMetrics {
        PositionMetrics {
            symbol: symbol.to_string(),
            units: 1.0,
            last_price: Some(100.0),
            day_change_pct: day,
            pnl_abs: Some(141.6),
            pnl_pct: Some(7.96),
            week_to_date_pct: Some(1.2),
            month_to_date_pct: Some(-2.5),
            fifty_two_week_range: "120.00 – 180.00".to_string(),
        }
    }

    fn now() -> DateTime<Utc> {
        chrono::NaiveDate::from_ymd_opt(2026, 2, 5)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn header_block_carries_date_and_currency() {
        let report = format_report(&[], &[], &ReportOptions::default(), now());
        assert!(report.starts_with("Daily Stock Report\n"));
        assert!(report.contains("Date: 2026-02-05 08:00 UTC"));
        assert!(report.contains("Currency: EUR"));
    }

    #[test]
    fn empty_portfolio_renders_placeholder() {
        let report = format_report(&[], &[], &ReportOptions::default(), now());
        assert!(report.contains("No position data available."));
        assert!(!report.contains("Sym"));
    }

    #[test]
    fn rows_are_sorted_descending_with_missing_last() {
        let positions = vec![
            metrics("FLAT", Some(0.0)),
            metrics("DOWN", Some(-4.0)),
            metrics("NONE", None),
            metrics("UP", Some(3.0)),
        ];
        let report = format_report(&positions, &[], &ReportOptions::default(), now());
        let up = report.find("UP").unwrap();
        let flat = report.find("FLAT").unwrap();
        let down = report.find("DOWN").unwrap();
        let none = report.find("NONE").unwrap();
        assert!(up < flat && flat < down && down < none);
    }

    #[test]
    fn top_n_limits_the_table() {
        let positions: Vec<_> = (0..5)
            .map(|i| metrics(&format!("SYM{i}"), Some(f64::from(i))))
            .collect();
        let options = ReportOptions {
            top_n: 2,
            ..ReportOptions::default()
        };
        let report = format_report(&positions, &[], &options, now());
        assert!(report.contains("SYM4"));
        assert!(report.contains("SYM3"));
        assert!(!report.contains("SYM2"));
    }

    #[test]
    fn percents_carry_explicit_signs_and_missing_shows_a_dash() {
        let positions = vec![PositionMetrics {
            pnl_abs: None,
            ..metrics("AAPL", Some(3.226))
        }];
        let report = format_report(&positions, &[], &ReportOptions::default(), now());
        assert!(report.contains("+3.23%"));
        assert!(report.contains("-2.50%"));
        assert!(report.contains(MISSING));
    }

    #[test]
    fn long_symbols_are_clipped_to_the_column() {
        let positions = vec![metrics("VERYLONGSYMBOL", Some(1.0))];
        let report = format_report(&positions, &[], &ReportOptions::default(), now());
        assert!(report.contains("VERYLON "));
        assert!(!report.contains("VERYLONG"));
    }

    #[test]
    fn index_section_appears_only_when_indices_exist() {
        let indices = vec![IndexMetrics {
            symbol: "^GSPC".to_string(),
            last_price: Some(6123.45),
            day_change_pct: Some(0.42),
        }];
        let with = format_report(&[metrics("AAPL", Some(1.0))], &indices, &ReportOptions::default(), now());
        assert!(with.contains("Indices:"));
        assert!(with.contains("6,123.45"));
        assert!(with.contains("+0.42%"));

        let without =
            format_report(&[metrics("AAPL", Some(1.0))], &[], &ReportOptions::default(), now());
        assert!(!without.contains("Indices:"));
    }

    #[test]
    fn alternate_sort_key_reorders_rows() {
        let mut a = metrics("AAA", Some(9.0));
        a.pnl_abs = Some(1.0);
        let mut b = metrics("BBB", Some(-5.0));
        b.pnl_abs = Some(500.0);
        let options = ReportOptions {
            sort_by: SortKey::PnlAbs,
            ..ReportOptions::default()
        };
        let report = format_report(&[a, b], &[], &options, now());
        assert!(report.find("BBB").unwrap() < report.find("AAA").unwrap());
    }

    #[test]
    fn oversized_report_is_truncated_with_marker() {
        let positions: Vec<_> = (0..200)
            .map(|i| metrics(&format!("S{i:04}"), Some(1.0)))
            .collect();
        let options = ReportOptions {
            top_n: 200,
            ..ReportOptions::default()
        };
        let report = format_report(&positions, &[], &options, now());
        assert!(report.ends_with("... (truncated)"));
        assert!(report.len() <= MAX_REPORT_BYTES + "\n... (truncated)".len());
        // Still valid UTF-8 by construction; the cut never splits a char.
        assert!(std::str::from_utf8(report.as_bytes()).is_ok());
    }
}

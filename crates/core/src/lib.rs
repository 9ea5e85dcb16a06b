//! Stockbot Core
//!
//! Pure computation core for the portfolio reporter. Everything in this crate
//! is deterministic and free of I/O: callers fetch snapshots and price
//! histories, convert them to the report's base currency, and hand them to
//! the metric functions together with an explicit reference timestamp.
//!
//! Missing data is never an error here. Every metric degrades field-by-field
//! to `None` when an input is absent or a divisor is zero; fabricated zeros
//! are never produced.

pub mod errors;
pub mod fx;
pub mod metrics;
pub mod models;
pub mod report;

mod format;

pub use errors::{CoreError, Result};
pub use metrics::{
    compute_position_metrics, day_change_pct, fifty_two_week_range, month_to_date_pct,
    period_change_pct, pnl_absolute, pnl_percent, week_to_date_pct,
};
pub use models::{IndexMetrics, Position, PositionMetrics, PricePoint, PriceSnapshot};
pub use report::{format_report, ReportOptions, SortKey};

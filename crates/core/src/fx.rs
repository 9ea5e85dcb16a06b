//! Applying exchange rates to quote data.
//!
//! Rate discovery lives with the market data providers; this module only
//! multiplies. A rate of 1.0 is the identity, which is also what callers pass
//! when every rate source failed and the cycle proceeds unconverted.

use crate::models::{PricePoint, PriceSnapshot};

/// Convert every price field of a snapshot into the base currency.
///
/// Missing fields stay missing; conversion never invents data.
pub fn convert_snapshot(snapshot: &PriceSnapshot, rate: f64) -> PriceSnapshot {
    PriceSnapshot::new(
        snapshot.last_price.map(|v| v * rate),
        snapshot.prev_close.map(|v| v * rate),
        snapshot.fifty_two_week_low.map(|v| v * rate),
        snapshot.fifty_two_week_high.map(|v| v * rate),
    )
}

/// Convert a close series into the base currency with a single spot rate.
///
/// The same rate is applied to every point; historical rates are not
/// reconstructed. Period changes are therefore currency-neutral.
pub fn convert_history(history: &[PricePoint], rate: f64) -> Vec<PricePoint> {
    history
        .iter()
        .map(|p| PricePoint::new(p.date, p.close * rate))
        .collect()
}

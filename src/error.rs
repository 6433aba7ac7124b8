use chrono::NaiveDate;
use thiserror::Error;

/// Failure kinds that callers may want to match on. These are attached as
/// context to `anyhow` chains, so `err.downcast_ref::<AnalyticsError>()`
/// recovers the kind from any aggregation entry point.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalyticsError {
    /// The raw performance store could not be queried. Aggregations fail
    /// without writing anything to the result cache.
    #[error("raw performance store unavailable")]
    StoreUnavailable,

    /// The compare window must have the same length as the current window.
    #[error("compare window spans {compare_days} days but current window spans {current_days} days")]
    InvalidWindow {
        current_days: i64,
        compare_days: i64,
    },

    #[error("window start {start} is after window end {end}")]
    InvalidWindowBounds { start: NaiveDate, end: NaiveDate },
}

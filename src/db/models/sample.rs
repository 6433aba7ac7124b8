use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One immutable fact row of the search-console performance log. The
/// engine only ever reads these; the external collector appends them and
/// the store assigns row ids internally (higher id = more recent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSample {
    pub query: String,
    pub page: String,
    pub date: NaiveDate,
    pub clicks: u32,
    pub impressions: u32,
    pub ctr: f64,
    pub position: f64,
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A windowed total plus its diff against the compare window. For
/// position, a negative difference means the rank improved.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricValue<T> {
    pub total: T,
    pub difference: T,
}

impl<T> MetricValue<T> {
    pub fn new(total: T, difference: T) -> Self {
        Self { total, difference }
    }
}

/// One plottable point of a keyword's position history. The date is the
/// representative sample's own date within its bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphPoint {
    pub date: NaiveDate,
    pub position: f64,
}

/// Diffed metrics for one keyword over a window pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordMetrics {
    pub query: String,
    pub clicks: MetricValue<i64>,
    pub impressions: MetricValue<i64>,
    pub ctr: MetricValue<f64>,
    pub position: MetricValue<f64>,
    pub graph: Vec<GraphPoint>,
}

impl KeywordMetrics {
    /// Fallback entry for a tracked keyword with no samples in either
    /// window.
    pub fn zeroed(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            clicks: MetricValue::default(),
            impressions: MetricValue::default(),
            ctr: MetricValue::default(),
            position: MetricValue::default(),
            graph: Vec::new(),
        }
    }
}

pub mod analytics;
pub mod cache;
pub mod db;
pub mod error;
pub mod registry;
pub mod settings;

pub use analytics::{
    query::{KeywordScope, Pagination, PositionFilter, SelectionArgs, SortField, SortOrder},
    types::{GraphPoint, KeywordMetrics, MetricValue},
    windows::{bucket_spec, Bucket, Window, WindowPair},
    KeywordAnalytics,
};
pub use cache::ResultCache;
pub use db::{
    models::{PerformanceSample, TrackedKeyword},
    Database,
};
pub use error::AnalyticsError;
pub use registry::{KeywordRegistry, KeywordsSummary};
pub use settings::{KeywordQuota, SettingsStore};

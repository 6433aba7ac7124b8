//! Keyword analytics facade.
//!
//! `KeywordAnalytics` wires the aggregation components to their
//! collaborators (store, cache, settings) and exposes the operations the
//! surrounding application consumes. Every aggregation takes an explicit
//! `WindowPair`; nothing here holds hidden reporting-period state.

pub mod aggregator;
pub mod classifier;
pub mod graph;
pub mod query;
pub mod types;
pub mod windows;

use std::{collections::HashMap, future::Future, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use log::warn;
use tokio::time::timeout;

use crate::{
    cache::ResultCache,
    db::Database,
    error::AnalyticsError,
    registry::{KeywordRegistry, KeywordsSummary},
    settings::SettingsStore,
};
use aggregator::MetricsAggregator;
use classifier::RankClassifier;
use graph::GraphBuilder;
use query::{KeywordScope, Pagination, SelectionArgs};
use types::{GraphPoint, KeywordMetrics};
use windows::{Window, WindowPair};

/// Page size of the tracked-keywords table view.
pub const ROWS_PER_PAGE: usize = 25;
/// How many distinct ranking pages to report per keyword.
pub const KEYWORD_PAGES_LIMIT: usize = 5;

pub struct KeywordAnalytics {
    db: Database,
    cache: Arc<ResultCache>,
    registry: KeywordRegistry,
    aggregator: MetricsAggregator,
    graph: GraphBuilder,
    classifier: RankClassifier,
}

impl KeywordAnalytics {
    pub fn new(db: Database, settings: Arc<SettingsStore>) -> Self {
        let cache = Arc::new(ResultCache::new(settings.cache_ttl_secs()));
        Self {
            registry: KeywordRegistry::new(db.clone(), Arc::clone(&cache), settings),
            aggregator: MetricsAggregator::new(db.clone()),
            graph: GraphBuilder::new(db.clone()),
            classifier: RankClassifier::new(db.clone()),
            cache,
            db,
        }
    }

    pub fn registry(&self) -> &KeywordRegistry {
        &self.registry
    }

    pub async fn tracked_keywords_summary(&self) -> Result<KeywordsSummary> {
        self.registry.summary().await
    }

    /// Top improved keywords among those ranked on the most recent sample
    /// date. Cached per window length; registry mutations do not
    /// invalidate this, so the view may lag a mutation by up to one TTL.
    pub async fn winning_keywords(
        &self,
        windows: &WindowPair,
        deadline: Option<Duration>,
    ) -> Result<Vec<KeywordMetrics>> {
        self.cached_classification(Classification::Winning, windows, deadline)
            .await
    }

    /// Counterpart of `winning_keywords` for declined ranks.
    pub async fn losing_keywords(
        &self,
        windows: &WindowPair,
        deadline: Option<Duration>,
    ) -> Result<Vec<KeywordMetrics>> {
        self.cached_classification(Classification::Losing, windows, deadline)
            .await
    }

    /// `winning_keywords` restricted to the tracked-keyword registry
    /// instead of the most-recent-sample-date universe.
    pub async fn winning_tracked_keywords(
        &self,
        windows: &WindowPair,
        deadline: Option<Duration>,
    ) -> Result<Vec<KeywordMetrics>> {
        self.cached_classification(Classification::TrackedWinning, windows, deadline)
            .await
    }

    /// Counterpart of `winning_tracked_keywords` for declined ranks.
    pub async fn losing_tracked_keywords(
        &self,
        windows: &WindowPair,
        deadline: Option<Duration>,
    ) -> Result<Vec<KeywordMetrics>> {
        self.cached_classification(Classification::TrackedLosing, windows, deadline)
            .await
    }

    /// Every active tracked keyword with diffed metrics and graph series.
    /// Keywords without samples appear zero-filled, so the output always
    /// covers the registry. Not cached.
    pub async fn all_tracked_keywords(
        &self,
        windows: &WindowPair,
        deadline: Option<Duration>,
    ) -> Result<Vec<KeywordMetrics>> {
        let compute = async {
            let args = SelectionArgs {
                include_zero_keywords: true,
                ..SelectionArgs::default()
            };
            let mut rows = self
                .aggregator
                .keyword_metrics(KeywordScope::Tracked, windows, &args)
                .await?;
            self.graph.attach(&mut rows, &windows.current).await?;
            Ok(rows)
        };
        with_deadline(deadline, Vec::new(), compute).await
    }

    /// One page of the tracked-keywords table (25 per page, one-based).
    /// Top-N style view: no zero backfill.
    pub async fn tracked_keyword_rows(
        &self,
        windows: &WindowPair,
        page: usize,
        deadline: Option<Duration>,
    ) -> Result<Vec<KeywordMetrics>> {
        let compute = async {
            let args = SelectionArgs {
                page: Pagination::page(page, ROWS_PER_PAGE),
                ..SelectionArgs::default()
            };
            let mut rows = self
                .aggregator
                .keyword_metrics(KeywordScope::Tracked, windows, &args)
                .await?;
            self.graph.attach(&mut rows, &windows.current).await?;
            Ok(rows)
        };
        with_deadline(deadline, Vec::new(), compute).await
    }

    /// Bucketed position history for an arbitrary keyword set, keyed by
    /// the keywords as the caller spelled them.
    pub async fn keyword_graph(
        &self,
        keywords: &[String],
        window: &Window,
        deadline: Option<Duration>,
    ) -> Result<HashMap<String, Vec<GraphPoint>>> {
        let compute = self.graph.position_history(keywords, window);
        with_deadline(deadline, HashMap::new(), compute).await
    }

    /// Distinct pages a keyword ranked for inside the window, most recent
    /// first.
    pub async fn keyword_pages(
        &self,
        keyword: &str,
        window: &Window,
        deadline: Option<Duration>,
    ) -> Result<Vec<String>> {
        let compute = async {
            self.db
                .keyword_pages(keyword.to_string(), *window, KEYWORD_PAGES_LIMIT)
                .await
                .context(AnalyticsError::StoreUnavailable)
        };
        with_deadline(deadline, Vec::new(), compute).await
    }

    /// Keywords with a sample on the most recent sample date within the
    /// window — the classifier's keyword universe.
    pub async fn recent_keywords(
        &self,
        window: &Window,
        deadline: Option<Duration>,
    ) -> Result<Vec<String>> {
        let compute = async {
            self.db
                .recent_queries(*window)
                .await
                .context(AnalyticsError::StoreUnavailable)
        };
        with_deadline(deadline, Vec::new(), compute).await
    }

    async fn cached_classification(
        &self,
        kind: Classification,
        windows: &WindowPair,
        deadline: Option<Duration>,
    ) -> Result<Vec<KeywordMetrics>> {
        let key = ResultCache::key(kind.cache_kind(), windows.days());
        if let Some(value) = self.cache.get(&key) {
            if let Ok(rows) = serde_json::from_value(value) {
                return Ok(rows);
            }
        }

        let compute = async {
            let rows = match kind {
                Classification::Winning => self.classifier.winning(windows).await?,
                Classification::Losing => self.classifier.losing(windows).await?,
                Classification::TrackedWinning => self.classifier.winning_tracked(windows).await?,
                Classification::TrackedLosing => self.classifier.losing_tracked(windows).await?,
            };
            self.cache.set(&key, serde_json::to_value(&rows)?);
            Ok(rows)
        };
        with_deadline(deadline, Vec::new(), compute).await
    }
}

#[derive(Clone, Copy)]
enum Classification {
    Winning,
    Losing,
    TrackedWinning,
    TrackedLosing,
}

impl Classification {
    fn cache_kind(self) -> &'static str {
        match self {
            Classification::Winning => "winning_keywords",
            Classification::Losing => "losing_keywords",
            Classification::TrackedWinning => "tracked_winning_keywords",
            Classification::TrackedLosing => "tracked_losing_keywords",
        }
    }
}

/// Bounds an aggregation with a caller-supplied deadline. On expiry the
/// chain is dropped mid-query and the fallback is returned; nothing gets
/// written to the cache for an aborted run.
async fn with_deadline<T, F>(deadline: Option<Duration>, fallback: T, compute: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match deadline {
        None => compute.await,
        Some(limit) => match timeout(limit, compute).await {
            Ok(result) => result,
            Err(_) => {
                warn!("aggregation deadline of {limit:?} expired, returning empty result");
                Ok(fallback)
            }
        },
    }
}

//! Winning/losing keyword classification.
//!
//! The universe for a classification run is deliberately narrower than the
//! registry: only keywords with at least one sample on the most recent
//! sample date inside the current window qualify. Each run re-executes the
//! windowed aggregation over that set and attaches graph series.

use anyhow::{Context, Result};
use log::debug;

use crate::{
    analytics::{
        aggregator::MetricsAggregator,
        graph::GraphBuilder,
        query::{KeywordScope, Pagination, PositionFilter, SelectionArgs, SortField, SortOrder},
        types::KeywordMetrics,
        windows::WindowPair,
    },
    db::Database,
    error::AnalyticsError,
};

/// Default size of the winning/losing views.
pub const TOP_KEYWORDS: usize = 5;

pub struct RankClassifier {
    db: Database,
    aggregator: MetricsAggregator,
    graph: GraphBuilder,
}

impl RankClassifier {
    pub fn new(db: Database) -> Self {
        Self {
            aggregator: MetricsAggregator::new(db.clone()),
            graph: GraphBuilder::new(db.clone()),
            db,
        }
    }

    /// Top keywords whose rounded position diff is strictly negative
    /// (rank number decreased), best improvement first.
    pub async fn winning(&self, windows: &WindowPair) -> Result<Vec<KeywordMetrics>> {
        let universe = self.recent_universe(windows).await?;
        self.classify(universe, windows, PositionFilter::Improved, SortOrder::Ascending)
            .await
    }

    /// Top keywords whose rounded position diff is strictly positive,
    /// worst decline first.
    pub async fn losing(&self, windows: &WindowPair) -> Result<Vec<KeywordMetrics>> {
        let universe = self.recent_universe(windows).await?;
        self.classify(universe, windows, PositionFilter::Declined, SortOrder::Descending)
            .await
    }

    /// `winning` over the tracked-keyword registry instead of the
    /// recent-sample-date universe.
    pub async fn winning_tracked(&self, windows: &WindowPair) -> Result<Vec<KeywordMetrics>> {
        self.classify(
            KeywordScope::Tracked,
            windows,
            PositionFilter::Improved,
            SortOrder::Ascending,
        )
        .await
    }

    /// `losing` over the tracked-keyword registry.
    pub async fn losing_tracked(&self, windows: &WindowPair) -> Result<Vec<KeywordMetrics>> {
        self.classify(
            KeywordScope::Tracked,
            windows,
            PositionFilter::Declined,
            SortOrder::Descending,
        )
        .await
    }

    async fn recent_universe(&self, windows: &WindowPair) -> Result<KeywordScope> {
        let recent = self
            .db
            .recent_queries(windows.current)
            .await
            .context(AnalyticsError::StoreUnavailable)?;
        debug!("classifying {} recent keywords", recent.len());
        Ok(KeywordScope::Keywords(recent))
    }

    async fn classify(
        &self,
        scope: KeywordScope,
        windows: &WindowPair,
        filter: PositionFilter,
        order: SortOrder,
    ) -> Result<Vec<KeywordMetrics>> {
        let args = SelectionArgs {
            order_by: SortField::DiffPosition,
            order,
            page: Pagination::top(TOP_KEYWORDS),
            position_filter: Some(filter),
            include_zero_keywords: false,
        };

        let mut rows = self.aggregator.keyword_metrics(scope, windows, &args).await?;
        self.graph.attach(&mut rows, &windows.current).await?;

        Ok(rows)
    }
}

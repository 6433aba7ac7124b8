//! Position-history series for plotting.

use std::collections::HashMap;

use anyhow::{Context, Result};
use log::debug;

use crate::{
    analytics::{
        aggregator::normalize_keyword,
        types::{GraphPoint, KeywordMetrics},
        windows::{bucket_spec, Window},
    },
    db::Database,
    error::AnalyticsError,
};

/// Upper bound on graph resolution; windows shorter than this get one
/// bucket per day.
pub const MAX_GRAPH_BUCKETS: usize = 30;

pub struct GraphBuilder {
    db: Database,
}

impl GraphBuilder {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Builds, per keyword, a chronological position series with one point
    /// per bucket that has at least one sample. Empty buckets are omitted
    /// rather than zero-filled, so the output never exceeds
    /// buckets x keywords points. The map is keyed by the keywords as the
    /// caller spelled them; keywords without samples get no entry.
    pub async fn position_history(
        &self,
        keywords: &[String],
        window: &Window,
    ) -> Result<HashMap<String, Vec<GraphPoint>>> {
        let series = self.normalized_history(keywords, window).await?;

        let mut keyed = HashMap::with_capacity(keywords.len());
        for keyword in keywords {
            if let Some(points) = series.get(&normalize_keyword(keyword)) {
                keyed.insert(keyword.clone(), points.clone());
            }
        }
        Ok(keyed)
    }

    async fn normalized_history(
        &self,
        keywords: &[String],
        window: &Window,
    ) -> Result<HashMap<String, Vec<GraphPoint>>> {
        if keywords.is_empty() {
            return Ok(HashMap::new());
        }

        let buckets = bucket_spec(window, MAX_GRAPH_BUCKETS);
        let rows = self
            .db
            .bucketed_positions(keywords.to_vec(), *window, buckets)
            .await
            .context(AnalyticsError::StoreUnavailable)?;

        debug!(
            "graph series: {} points across {} keywords",
            rows.len(),
            keywords.len()
        );

        // Rows arrive ordered by date, so each series stays chronological.
        let mut series: HashMap<String, Vec<GraphPoint>> = HashMap::new();
        for row in rows {
            series
                .entry(normalize_keyword(&row.query))
                .or_default()
                .push(GraphPoint {
                    date: row.date,
                    position: row.position,
                });
        }

        Ok(series)
    }

    /// Fills in the graph series on already-aggregated metric rows.
    pub async fn attach(&self, rows: &mut [KeywordMetrics], window: &Window) -> Result<()> {
        let keywords: Vec<String> = rows.iter().map(|row| row.query.clone()).collect();
        let history = self.normalized_history(&keywords, window).await?;

        for row in rows {
            if let Some(points) = history.get(&normalize_keyword(&row.query)) {
                row.graph = points.clone();
            }
        }
        Ok(())
    }
}

//! Two-phase correlated aggregation.
//!
//! Phase 1 correlates representative positions (most recent sample by id)
//! between the current and compare windows. Phase 2 sums clicks and
//! impressions and averages position and CTR across every sample in each
//! window, restricted to the keywords phase 1 produced. The merged rows
//! are sorted, paged, and optionally backfilled with zeroed entries for
//! tracked keywords that never ranked.

use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};

use crate::{
    analytics::{
        query::{KeywordScope, PositionFilter, Pagination, SelectionArgs, SortField, SortOrder},
        types::{KeywordMetrics, MetricValue},
        windows::WindowPair,
    },
    db::{repositories::VolumeAggregate, Database},
    error::AnalyticsError,
};

/// Baseline rank assumed for a keyword with no compare-window sample.
/// Diffing against this instead of null keeps brand-new keywords from
/// registering an unbounded improvement.
pub const MISSING_COMPARE_POSITION: f64 = 100.0;

pub fn normalize_keyword(keyword: &str) -> String {
    keyword.trim().to_lowercase()
}

struct PositionEntry {
    query: String,
    total: f64,
    difference: f64,
}

pub struct MetricsAggregator {
    db: Database,
}

impl MetricsAggregator {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Computes diffed metrics per keyword for the given scope and window
    /// pair. Pure with respect to its inputs: two calls over unchanged
    /// samples yield identical output.
    pub async fn keyword_metrics(
        &self,
        scope: KeywordScope,
        windows: &WindowPair,
        args: &SelectionArgs,
    ) -> Result<Vec<KeywordMetrics>> {
        // Unequal window lengths are rejected before touching the store.
        if windows.current.duration_days() != windows.compare.duration_days() {
            return Err(AnalyticsError::InvalidWindow {
                current_days: windows.current.duration_days(),
                compare_days: windows.compare.duration_days(),
            }
            .into());
        }

        // An empty keyword set is an empty result, not an error.
        if matches!(&scope, KeywordScope::Keywords(keywords) if keywords.is_empty()) {
            return self.backfill_zero_keywords(Vec::new(), args).await;
        }

        let entries = self.correlate_positions(&scope, windows, args).await?;
        let merged = self.correlate_volumes(entries, windows).await?;

        let mut rows = merged;
        sort_rows(&mut rows, args.order_by, args.order);
        let rows = paginate(rows, args.page);

        self.backfill_zero_keywords(rows, args).await
    }

    /// Phase 1: representative position per keyword in each window,
    /// left-joined on keyword, compare defaulting to the missing-compare
    /// baseline. The position filter applies here so that top-N selection
    /// never pays for volume queries on discarded keywords.
    async fn correlate_positions(
        &self,
        scope: &KeywordScope,
        windows: &WindowPair,
        args: &SelectionArgs,
    ) -> Result<Vec<PositionEntry>> {
        let current = self
            .db
            .representative_positions(scope.clone(), windows.current)
            .await
            .context(AnalyticsError::StoreUnavailable)?;
        let compare = self
            .db
            .representative_positions(scope.clone(), windows.compare)
            .await
            .context(AnalyticsError::StoreUnavailable)?;

        let baselines: HashMap<String, f64> = compare
            .into_iter()
            .map(|row| (normalize_keyword(&row.query), row.position))
            .collect();

        let mut entries: Vec<PositionEntry> = current
            .into_iter()
            .map(|row| {
                let baseline = baselines
                    .get(&normalize_keyword(&row.query))
                    .copied()
                    .unwrap_or(MISSING_COMPARE_POSITION);
                PositionEntry {
                    total: row.position.round(),
                    difference: (row.position - baseline).round(),
                    query: row.query,
                }
            })
            .collect();

        if let Some(filter) = args.position_filter {
            entries.retain(|entry| match filter {
                PositionFilter::Improved => entry.difference < 0.0,
                PositionFilter::Declined => entry.difference > 0.0,
            });
        }

        Ok(entries)
    }

    /// Phase 2: whole-window volume aggregates for the phase-1 keywords,
    /// merged into final rows. A keyword missing from the compare window
    /// diffs against zero.
    async fn correlate_volumes(
        &self,
        entries: Vec<PositionEntry>,
        windows: &WindowPair,
    ) -> Result<Vec<KeywordMetrics>> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let keywords: Vec<String> = entries.iter().map(|entry| entry.query.clone()).collect();

        let current = self
            .db
            .volume_aggregates(KeywordScope::Keywords(keywords.clone()), windows.current)
            .await
            .context(AnalyticsError::StoreUnavailable)?;
        let compare = self
            .db
            .volume_aggregates(KeywordScope::Keywords(keywords), windows.compare)
            .await
            .context(AnalyticsError::StoreUnavailable)?;

        let current = key_by_keyword(current);
        let compare = key_by_keyword(compare);

        let rows = entries
            .into_iter()
            .map(|entry| {
                let key = normalize_keyword(&entry.query);
                let cur = current.get(&key);
                let cmp = compare.get(&key);

                let clicks = cur.map_or(0, |v| v.clicks);
                let impressions = cur.map_or(0, |v| v.impressions);
                let ctr = cur.map_or(0.0, |v| v.avg_ctr);

                KeywordMetrics {
                    clicks: MetricValue::new(clicks, clicks - cmp.map_or(0, |v| v.clicks)),
                    impressions: MetricValue::new(
                        impressions,
                        impressions - cmp.map_or(0, |v| v.impressions),
                    ),
                    ctr: MetricValue::new(ctr, ctr - cmp.map_or(0.0, |v| v.avg_ctr)),
                    position: MetricValue::new(entry.total, entry.difference),
                    query: entry.query,
                    graph: Vec::new(),
                }
            })
            .collect();

        Ok(rows)
    }

    /// Completion step: every active tracked keyword appears in the output
    /// even with zero samples, when the selection asks for it.
    async fn backfill_zero_keywords(
        &self,
        mut rows: Vec<KeywordMetrics>,
        args: &SelectionArgs,
    ) -> Result<Vec<KeywordMetrics>> {
        if !args.include_zero_keywords {
            return Ok(rows);
        }

        let tracked = self
            .db
            .list_tracked_keywords()
            .await
            .context(AnalyticsError::StoreUnavailable)?;
        let present: HashSet<String> = rows
            .iter()
            .map(|row| normalize_keyword(&row.query))
            .collect();

        for keyword in tracked.into_iter().filter(|k| k.is_active) {
            if !present.contains(&normalize_keyword(&keyword.keyword)) {
                rows.push(KeywordMetrics::zeroed(keyword.keyword));
            }
        }

        Ok(rows)
    }
}

fn key_by_keyword(aggregates: Vec<VolumeAggregate>) -> HashMap<String, VolumeAggregate> {
    aggregates
        .into_iter()
        .map(|aggregate| (normalize_keyword(&aggregate.query), aggregate))
        .collect()
}

fn sort_value(row: &KeywordMetrics, field: SortField) -> f64 {
    match field {
        SortField::Position => row.position.total,
        SortField::DiffPosition => row.position.difference,
        SortField::Clicks => row.clicks.total as f64,
        SortField::DiffClicks => row.clicks.difference as f64,
        SortField::Impressions => row.impressions.total as f64,
        SortField::DiffImpressions => row.impressions.difference as f64,
        SortField::Ctr => row.ctr.total,
        SortField::DiffCtr => row.ctr.difference,
    }
}

fn sort_rows(rows: &mut [KeywordMetrics], field: SortField, order: SortOrder) {
    rows.sort_by(|a, b| {
        let ordering = sort_value(a, field).total_cmp(&sort_value(b, field));
        match order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    });
}

fn paginate(rows: Vec<KeywordMetrics>, page: Pagination) -> Vec<KeywordMetrics> {
    rows.into_iter()
        .skip(page.offset)
        .take(page.limit.unwrap_or(usize::MAX))
        .collect()
}

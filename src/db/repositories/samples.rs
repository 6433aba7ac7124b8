//! Read queries against the raw performance log.
//!
//! Keyword identity is case-insensitive everywhere: grouping and scope
//! filters go through `lower(query)` so that samples join against tracked
//! keywords regardless of casing.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, params_from_iter};

use crate::{
    analytics::{
        query::KeywordScope,
        windows::{Bucket, Window},
    },
    db::{
        helpers::{parse_date, to_i64},
        models::PerformanceSample,
        Database,
    },
};

/// Most recent sample (by id) for a keyword within one window.
#[derive(Debug, Clone, PartialEq)]
pub struct RepresentativePosition {
    pub query: String,
    pub position: f64,
    pub sample_id: i64,
}

/// Whole-window click/impression sums and CTR average for a keyword.
/// Positions are not aggregated here; they come from the representative
/// sample per window.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeAggregate {
    pub query: String,
    pub clicks: i64,
    pub impressions: i64,
    pub avg_ctr: f64,
}

/// Representative sample for a keyword within one graph bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketedPosition {
    pub query: String,
    pub date: NaiveDate,
    pub position: f64,
}

/// Renders the keyword scope as a SQL predicate, appending any bound
/// values to `params`. Placeholders are numbered after the existing ones.
fn scope_filter(scope: &KeywordScope, params: &mut Vec<String>) -> String {
    match scope {
        KeywordScope::Tracked => {
            "lower(query) IN (SELECT lower(keyword) FROM tracked_keywords WHERE is_active = 1)"
                .to_string()
        }
        KeywordScope::Keywords(keywords) => {
            if keywords.is_empty() {
                return "0 = 1".to_string();
            }
            let first = params.len() + 1;
            let placeholders = (0..keywords.len())
                .map(|i| format!("?{}", first + i))
                .collect::<Vec<_>>()
                .join(", ");
            params.extend(keywords.iter().map(|k| k.trim().to_lowercase()));
            format!("lower(query) IN ({placeholders})")
        }
    }
}

impl Database {
    /// Appends sample rows delivered by the external collector. This is
    /// the only write path into the performance log.
    pub async fn append_samples(&self, samples: Vec<PerformanceSample>) -> Result<()> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            for sample in &samples {
                tx.execute(
                    "INSERT INTO gsc_samples (query, page, date, clicks, impressions, ctr, position)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        sample.query,
                        sample.page,
                        sample.date.to_string(),
                        to_i64(sample.clicks),
                        to_i64(sample.impressions),
                        sample.ctr,
                        sample.position,
                    ],
                )
                .with_context(|| "failed to insert performance sample")?;
            }
            tx.commit().context("failed to commit sample batch")?;
            Ok(())
        })
        .await
    }

    /// Per keyword, the position of the most recent sample (highest id)
    /// inside the window.
    pub async fn representative_positions(
        &self,
        scope: KeywordScope,
        window: Window,
    ) -> Result<Vec<RepresentativePosition>> {
        self.execute(move |conn| {
            let mut bind: Vec<String> =
                vec![window.start.to_string(), window.end.to_string()];
            let scope_sql = scope_filter(&scope, &mut bind);

            let sql = format!(
                "SELECT s.query, s.position, s.id
                 FROM gsc_samples AS s
                 JOIN (
                     SELECT MAX(id) AS id
                     FROM gsc_samples
                     WHERE date BETWEEN ?1 AND ?2 AND {scope_sql}
                     GROUP BY lower(query)
                 ) AS t ON s.id = t.id"
            );

            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(bind.iter()))?;
            let mut positions = Vec::new();
            while let Some(row) = rows.next()? {
                positions.push(RepresentativePosition {
                    query: row.get(0)?,
                    position: row.get(1)?,
                    sample_id: row.get(2)?,
                });
            }
            Ok(positions)
        })
        .await
    }

    /// Per keyword, clicks/impressions summed and position/ctr averaged
    /// across every sample inside the window.
    pub async fn volume_aggregates(
        &self,
        scope: KeywordScope,
        window: Window,
    ) -> Result<Vec<VolumeAggregate>> {
        self.execute(move |conn| {
            let mut bind: Vec<String> =
                vec![window.start.to_string(), window.end.to_string()];
            let scope_sql = scope_filter(&scope, &mut bind);

            let sql = format!(
                "SELECT query,
                        SUM(clicks) AS clicks,
                        SUM(impressions) AS impressions,
                        AVG(ctr) AS ctr
                 FROM gsc_samples
                 WHERE date BETWEEN ?1 AND ?2 AND {scope_sql}
                 GROUP BY lower(query)"
            );

            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(bind.iter()))?;
            let mut aggregates = Vec::new();
            while let Some(row) = rows.next()? {
                aggregates.push(VolumeAggregate {
                    query: row.get(0)?,
                    clicks: row.get(1)?,
                    impressions: row.get(2)?,
                    avg_ctr: row.get(3)?,
                });
            }
            Ok(aggregates)
        })
        .await
    }

    /// Per keyword and bucket, the sample with the highest id whose date
    /// falls inside the bucket. Buckets with no qualifying sample produce
    /// no row.
    pub async fn bucketed_positions(
        &self,
        keywords: Vec<String>,
        window: Window,
        buckets: Vec<Bucket>,
    ) -> Result<Vec<BucketedPosition>> {
        if keywords.is_empty() || buckets.is_empty() {
            return Ok(Vec::new());
        }

        self.execute(move |conn| {
            let mut bind: Vec<String> =
                vec![window.start.to_string(), window.end.to_string()];

            let mut range_group = String::from("CASE");
            for (index, bucket) in buckets.iter().enumerate() {
                let low = bind.len() + 1;
                bind.push(bucket.start.to_string());
                bind.push(bucket.end.to_string());
                range_group.push_str(&format!(
                    " WHEN date BETWEEN ?{low} AND ?{high} THEN {index}",
                    high = low + 1
                ));
            }
            range_group.push_str(" END");

            let scope_sql =
                scope_filter(&KeywordScope::Keywords(keywords), &mut bind);

            let sql = format!(
                "SELECT s.query, s.date, s.position
                 FROM gsc_samples AS s
                 JOIN (
                     SELECT MAX(id) AS id, {range_group} AS range_group
                     FROM gsc_samples
                     WHERE date BETWEEN ?1 AND ?2 AND {scope_sql}
                     GROUP BY lower(query), range_group
                 ) AS t ON s.id = t.id
                 ORDER BY s.date ASC, s.id ASC"
            );

            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(bind.iter()))?;
            let mut points = Vec::new();
            while let Some(row) = rows.next()? {
                let date: String = row.get(1)?;
                points.push(BucketedPosition {
                    query: row.get(0)?,
                    date: parse_date(&date, "date")?,
                    position: row.get(2)?,
                });
            }
            Ok(points)
        })
        .await
    }

    /// Keywords that have at least one sample on the most recent sample
    /// date within the window.
    pub async fn recent_queries(&self, window: Window) -> Result<Vec<String>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT query
                 FROM gsc_samples
                 WHERE date = (
                     SELECT MAX(date) FROM gsc_samples WHERE date BETWEEN ?1 AND ?2
                 )
                 GROUP BY lower(query)",
            )?;

            let mut rows =
                stmt.query(params![window.start.to_string(), window.end.to_string()])?;
            let mut queries = Vec::new();
            while let Some(row) = rows.next()? {
                queries.push(row.get(0)?);
            }
            Ok(queries)
        })
        .await
    }

    /// Distinct pages a keyword ranked for inside the window, most
    /// recently seen first.
    pub async fn keyword_pages(
        &self,
        keyword: String,
        window: Window,
        limit: usize,
    ) -> Result<Vec<String>> {
        let limit = limit as i64;
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT page
                 FROM gsc_samples
                 WHERE lower(query) = lower(?1) AND date BETWEEN ?2 AND ?3
                 GROUP BY page
                 ORDER BY MAX(date) DESC, MAX(id) DESC
                 LIMIT ?4",
            )?;

            let mut rows = stmt.query(params![
                keyword,
                window.start.to_string(),
                window.end.to_string(),
                limit,
            ])?;
            let mut pages = Vec::new();
            while let Some(row) = rows.next()? {
                pages.push(row.get(0)?);
            }
            Ok(pages)
        })
        .await
    }
}

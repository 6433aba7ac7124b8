//! The tracked-keyword registry: the curated set of keywords the engine
//! reports on.

use std::{collections::HashSet, sync::Arc};

use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    analytics::aggregator::normalize_keyword,
    cache::ResultCache,
    db::{models::TrackedKeyword, Database},
    settings::{KeywordQuota, SettingsStore},
};

pub const SUMMARY_CACHE_KIND: &str = "tracked_keywords_summary";

/// Quota usage merged with the distinct active keyword count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordsSummary {
    pub taken: u32,
    pub available: u32,
    pub total: i64,
}

pub struct KeywordRegistry {
    db: Database,
    cache: Arc<ResultCache>,
    settings: Arc<SettingsStore>,
}

impl KeywordRegistry {
    pub fn new(db: Database, cache: Arc<ResultCache>, settings: Arc<SettingsStore>) -> Self {
        Self {
            db,
            cache,
            settings,
        }
    }

    /// Splits a comma-separated input into trimmed candidates and returns
    /// the ones not already tracked (case-insensitively). Original casing
    /// of the survivors is preserved. Does not mutate the registry.
    pub async fn extract_addable(&self, raw: &str) -> Result<Vec<String>> {
        let candidates: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|candidate| !candidate.is_empty())
            .map(str::to_string)
            .collect();
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let existing: HashSet<String> = self
            .db
            .list_tracked_keywords()
            .await?
            .into_iter()
            .map(|keyword| normalize_keyword(&keyword.keyword))
            .collect();

        Ok(candidates
            .into_iter()
            .filter(|candidate| !existing.contains(&normalize_keyword(candidate)))
            .collect())
    }

    /// Starts tracking the given keywords. Precondition (not re-checked
    /// here, matching `extract_addable`'s contract): the list has already
    /// been filtered against existing entries.
    pub async fn add(&self, keywords: Vec<String>) -> Result<()> {
        if keywords.is_empty() {
            return Ok(());
        }
        info!("tracking {} new keywords", keywords.len());
        self.db.insert_tracked_keywords(keywords).await?;
        self.invalidate_summary();
        Ok(())
    }

    /// Stops tracking a keyword. Hard delete of every exactly-matching
    /// row; removing an untracked keyword is a no-op.
    pub async fn remove(&self, keyword: &str) -> Result<()> {
        let deleted = self.db.delete_tracked_keyword(keyword.to_string()).await?;
        if deleted > 0 {
            info!("stopped tracking '{keyword}' ({deleted} rows)");
        }
        self.invalidate_summary();
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<TrackedKeyword>> {
        self.db.list_tracked_keywords().await
    }

    /// Distinct active keyword count.
    pub async fn count(&self) -> Result<i64> {
        self.db.tracked_keyword_count().await
    }

    /// Externally configured usage limits; a settings lookup, not derived
    /// from the registry.
    pub fn quota(&self) -> KeywordQuota {
        self.settings.keyword_quota()
    }

    /// Quota merged with the live count. Read-through cached under the
    /// summary key; `add`/`remove` invalidate it so the next read always
    /// reflects the mutation.
    pub async fn summary(&self) -> Result<KeywordsSummary> {
        let key = self.summary_key();
        if let Some(value) = self.cache.get(&key) {
            if let Ok(summary) = serde_json::from_value(value) {
                return Ok(summary);
            }
        }

        let quota = self.quota();
        let summary = KeywordsSummary {
            taken: quota.taken,
            available: quota.available,
            total: self.count().await?,
        };
        self.cache.set(&key, serde_json::to_value(&summary)?);
        Ok(summary)
    }

    fn summary_key(&self) -> String {
        ResultCache::key(
            SUMMARY_CACHE_KIND,
            i64::from(self.settings.lookback_days()),
        )
    }

    fn invalidate_summary(&self) {
        self.cache.invalidate(&self.summary_key());
    }
}

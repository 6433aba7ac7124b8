use anyhow::{Context, Result};
use rusqlite::params;

use crate::db::{models::TrackedKeyword, Database};

impl Database {
    /// Inserts each keyword as an active, uncategorized entry. Callers are
    /// expected to have filtered duplicates through `extract_addable`
    /// first; the insert itself does not re-check.
    pub async fn insert_tracked_keywords(&self, keywords: Vec<String>) -> Result<()> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            for keyword in &keywords {
                tx.execute(
                    "INSERT INTO tracked_keywords (keyword, collection, is_active)
                     VALUES (?1, 'uncategorized', 1)",
                    params![keyword],
                )
                .with_context(|| "failed to insert tracked keyword")?;
            }
            tx.commit().context("failed to commit keyword batch")?;
            Ok(())
        })
        .await
    }

    /// Deletes every registry row matching the keyword exactly. Removing a
    /// keyword that is not tracked is a no-op.
    pub async fn delete_tracked_keyword(&self, keyword: String) -> Result<usize> {
        self.execute(move |conn| {
            let deleted = conn
                .execute(
                    "DELETE FROM tracked_keywords WHERE keyword = ?1",
                    params![keyword],
                )
                .with_context(|| "failed to delete tracked keyword")?;
            Ok(deleted)
        })
        .await
    }

    pub async fn tracked_keyword_count(&self) -> Result<i64> {
        self.execute(|conn| {
            let total: i64 = conn.query_row(
                "SELECT COUNT(DISTINCT lower(keyword)) FROM tracked_keywords WHERE is_active = 1",
                [],
                |row| row.get(0),
            )?;
            Ok(total)
        })
        .await
    }

    pub async fn list_tracked_keywords(&self) -> Result<Vec<TrackedKeyword>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, keyword, collection, is_active
                 FROM tracked_keywords
                 ORDER BY id ASC",
            )?;

            let mut rows = stmt.query([])?;
            let mut keywords = Vec::new();
            while let Some(row) = rows.next()? {
                keywords.push(TrackedKeyword {
                    id: row.get(0)?,
                    keyword: row.get(1)?,
                    collection: row.get(2)?,
                    is_active: row.get::<_, i64>(3)? != 0,
                });
            }
            Ok(keywords)
        })
        .await
    }
}

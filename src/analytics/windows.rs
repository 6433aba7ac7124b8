//! Reporting windows and graph bucket boundaries.

use anyhow::Result;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;

/// An inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Window {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(AnalyticsError::InvalidWindowBounds { start, end }.into());
        }
        Ok(Self { start, end })
    }

    /// Number of calendar days covered, counting both endpoints.
    pub fn duration_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// A current window plus the equal-length window immediately preceding it.
/// Equal duration is the only hard invariant; the windows may abut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowPair {
    pub current: Window,
    pub compare: Window,
}

impl WindowPair {
    pub fn new(current: Window, compare: Window) -> Result<Self> {
        if current.duration_days() != compare.duration_days() {
            return Err(AnalyticsError::InvalidWindow {
                current_days: current.duration_days(),
                compare_days: compare.duration_days(),
            }
            .into());
        }
        Ok(Self { current, compare })
    }

    /// Standard lookback resolution: current `[today - N, today]`,
    /// compare `[today - 2N, today - N]`.
    pub fn resolve(lookback_days: u32, today: NaiveDate) -> Self {
        let span = Duration::days(i64::from(lookback_days));
        Self {
            current: Window {
                start: today - span,
                end: today,
            },
            compare: Window {
                start: today - span - span,
                end: today - span,
            },
        }
    }

    /// Window length used to scope cache keys.
    pub fn days(&self) -> i64 {
        self.current.duration_days()
    }
}

/// One labeled sub-range of a window, used for graph grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Partitions a window into at most `max_buckets` contiguous day ranges.
/// Bucket width is the smallest that covers the window; the final bucket
/// is clipped at the window end.
pub fn bucket_spec(window: &Window, max_buckets: usize) -> Vec<Bucket> {
    if max_buckets == 0 {
        return Vec::new();
    }

    let total_days = window.duration_days();
    let width = (total_days + max_buckets as i64 - 1) / max_buckets as i64;
    let width = width.max(1);

    let mut buckets = Vec::new();
    let mut cursor = window.start;
    while cursor <= window.end {
        let end = (cursor + Duration::days(width - 1)).min(window.end);
        buckets.push(Bucket { start: cursor, end });
        cursor = end + Duration::days(1);
    }
    buckets
}

//! End-to-end tests for the analytics engine against a real on-disk
//! SQLite store.

use std::{sync::Arc, time::Duration};

use chrono::NaiveDate;
use serptrack::{
    AnalyticsError, Database, KeywordAnalytics, KeywordMetrics, KeywordQuota, PerformanceSample,
    SettingsStore, Window, WindowPair,
};
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    db: Database,
    settings: Arc<SettingsStore>,
    engine: KeywordAnalytics,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(dir.path().join("analytics.db")).unwrap();
    let settings = Arc::new(SettingsStore::new(dir.path().join("settings.json")).unwrap());
    let engine = KeywordAnalytics::new(db.clone(), Arc::clone(&settings));
    Fixture {
        _dir: dir,
        db,
        settings,
        engine,
    }
}

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

/// Current window 2025-06-16..2025-06-30, compare 2025-06-01..2025-06-15.
fn windows() -> WindowPair {
    WindowPair::new(
        Window::new(date("2025-06-16"), date("2025-06-30")).unwrap(),
        Window::new(date("2025-06-01"), date("2025-06-15")).unwrap(),
    )
    .unwrap()
}

fn sample(query: &str, day: &str, position: f64) -> PerformanceSample {
    PerformanceSample {
        query: query.to_string(),
        page: "https://example.com/".to_string(),
        date: date(day),
        clicks: 0,
        impressions: 0,
        ctr: 0.0,
        position,
    }
}

fn volume_sample(
    query: &str,
    day: &str,
    clicks: u32,
    impressions: u32,
    ctr: f64,
    position: f64,
) -> PerformanceSample {
    PerformanceSample {
        query: query.to_string(),
        page: "https://example.com/".to_string(),
        date: date(day),
        clicks,
        impressions,
        ctr,
        position,
    }
}

fn by_query<'a>(rows: &'a [KeywordMetrics], query: &str) -> &'a KeywordMetrics {
    rows.iter()
        .find(|row| row.query.eq_ignore_ascii_case(query))
        .unwrap_or_else(|| panic!("no row for {query}"))
}

#[tokio::test]
async fn position_diff_uses_max_id_representative() {
    let fx = fixture();
    fx.engine.registry().add(vec!["seo tips".into()]).await.unwrap();
    fx.db
        .append_samples(vec![
            sample("seo tips", "2025-06-05", 8.0),
            sample("seo tips", "2025-06-20", 6.0),
            // Same day as above: the higher id must win the tie.
            sample("seo tips", "2025-06-20", 5.0),
        ])
        .await
        .unwrap();

    let rows = fx
        .engine
        .all_tracked_keywords(&windows(), None)
        .await
        .unwrap();
    let row = by_query(&rows, "seo tips");
    assert_eq!(row.position.total, 5.0);
    assert_eq!(row.position.difference, -3.0);
}

#[tokio::test]
async fn missing_compare_window_diffs_against_100() {
    let fx = fixture();
    fx.engine.registry().add(vec!["brand new".into()]).await.unwrap();
    fx.db
        .append_samples(vec![sample("brand new", "2025-06-25", 4.0)])
        .await
        .unwrap();

    let rows = fx
        .engine
        .all_tracked_keywords(&windows(), None)
        .await
        .unwrap();
    let row = by_query(&rows, "brand new");
    assert_eq!(row.position.total, 4.0);
    assert_eq!(row.position.difference, -96.0);
}

#[tokio::test]
async fn volume_metrics_sum_and_diff_against_compare() {
    let fx = fixture();
    fx.engine.registry().add(vec!["shoes".into()]).await.unwrap();
    fx.db
        .append_samples(vec![
            volume_sample("shoes", "2025-06-05", 2, 5, 0.1, 9.0),
            volume_sample("shoes", "2025-06-18", 3, 10, 0.1, 7.0),
            volume_sample("shoes", "2025-06-22", 5, 30, 0.3, 5.0),
        ])
        .await
        .unwrap();

    let rows = fx
        .engine
        .all_tracked_keywords(&windows(), None)
        .await
        .unwrap();
    let row = by_query(&rows, "shoes");
    assert_eq!(row.clicks.total, 8);
    assert_eq!(row.clicks.difference, 6);
    assert_eq!(row.impressions.total, 40);
    assert_eq!(row.impressions.difference, 35);
    assert!((row.ctr.total - 0.2).abs() < 1e-9);
    assert!((row.ctr.difference - 0.1).abs() < 1e-9);
}

#[tokio::test]
async fn aggregation_is_idempotent() {
    let fx = fixture();
    fx.engine
        .registry()
        .add(vec!["alpha".into(), "beta".into()])
        .await
        .unwrap();
    fx.db
        .append_samples(vec![
            sample("alpha", "2025-06-05", 12.0),
            sample("alpha", "2025-06-20", 7.0),
            sample("beta", "2025-06-21", 3.0),
        ])
        .await
        .unwrap();

    let first = fx
        .engine
        .all_tracked_keywords(&windows(), None)
        .await
        .unwrap();
    let second = fx
        .engine
        .all_tracked_keywords(&windows(), None)
        .await
        .unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn all_tracked_view_backfills_sampleless_keywords() {
    let fx = fixture();
    fx.engine
        .registry()
        .add(vec!["ranked".into(), "never seen".into()])
        .await
        .unwrap();
    fx.db
        .append_samples(vec![sample("ranked", "2025-06-20", 3.0)])
        .await
        .unwrap();

    let rows = fx
        .engine
        .all_tracked_keywords(&windows(), None)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);

    let zeroed = by_query(&rows, "never seen");
    assert_eq!(zeroed.clicks.total, 0);
    assert_eq!(zeroed.position.total, 0.0);
    assert_eq!(zeroed.position.difference, 0.0);
    assert!(zeroed.graph.is_empty());

    // The paginated table view is a top-N style view: no backfill.
    let page = fx
        .engine
        .tracked_keyword_rows(&windows(), 1, None)
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].query, "ranked");
}

#[tokio::test]
async fn winning_and_losing_are_disjoint_with_strict_signs() {
    let fx = fixture();
    // All four keywords rank on the most recent day (2025-06-30).
    fx.db
        .append_samples(vec![
            sample("improved a lot", "2025-06-05", 20.0),
            sample("improved a lot", "2025-06-30", 13.0),
            sample("improved a bit", "2025-06-05", 9.0),
            sample("improved a bit", "2025-06-30", 7.0),
            sample("declined", "2025-06-05", 4.0),
            sample("declined", "2025-06-30", 11.0),
            sample("unchanged", "2025-06-05", 6.0),
            sample("unchanged", "2025-06-30", 6.0),
        ])
        .await
        .unwrap();

    let winning = fx.engine.winning_keywords(&windows(), None).await.unwrap();
    let losing = fx.engine.losing_keywords(&windows(), None).await.unwrap();

    let winning_names: Vec<&str> = winning.iter().map(|r| r.query.as_str()).collect();
    assert_eq!(winning_names, ["improved a lot", "improved a bit"]);
    for row in &winning {
        assert!(row.position.difference < 0.0);
    }

    let losing_names: Vec<&str> = losing.iter().map(|r| r.query.as_str()).collect();
    assert_eq!(losing_names, ["declined"]);
    for row in &losing {
        assert!(row.position.difference > 0.0);
    }

    for row in &winning {
        assert!(!losing_names.contains(&row.query.as_str()));
    }
}

#[tokio::test]
async fn classifier_universe_is_the_most_recent_sample_date() {
    let fx = fixture();
    fx.db
        .append_samples(vec![
            // Improved, but its latest sample is not on the most recent date.
            sample("stale", "2025-06-05", 15.0),
            sample("stale", "2025-06-25", 5.0),
            sample("fresh", "2025-06-05", 9.0),
            sample("fresh", "2025-06-28", 4.0),
        ])
        .await
        .unwrap();

    let recent = fx
        .engine
        .recent_keywords(&windows().current, None)
        .await
        .unwrap();
    assert_eq!(recent, vec!["fresh".to_string()]);

    let winning = fx.engine.winning_keywords(&windows(), None).await.unwrap();
    let names: Vec<&str> = winning.iter().map(|r| r.query.as_str()).collect();
    assert_eq!(names, ["fresh"]);
}

#[tokio::test]
async fn graph_series_is_sparse_and_chronological() {
    let fx = fixture();
    fx.db
        .append_samples(vec![
            sample("kw", "2025-06-17", 9.0),
            // Same day, higher id: representative for the bucket.
            sample("kw", "2025-06-17", 8.0),
            sample("kw", "2025-06-22", 6.0),
            sample("kw", "2025-06-29", 5.0),
        ])
        .await
        .unwrap();

    let window = windows().current;
    let series = fx
        .engine
        .keyword_graph(&["kw".to_string()], &window, None)
        .await
        .unwrap();
    let points = &series["kw"];

    // 15-day window, daily buckets: only the three sampled days appear.
    assert_eq!(points.len(), 3);
    assert_eq!(points[0].date, date("2025-06-17"));
    assert_eq!(points[0].position, 8.0);
    assert_eq!(points[1].date, date("2025-06-22"));
    assert_eq!(points[2].date, date("2025-06-29"));
    assert!(points.windows(2).all(|p| p[0].date < p[1].date));
}

#[tokio::test]
async fn graph_output_is_capped_by_bucket_count() {
    let fx = fixture();
    let start = date("2025-05-02");
    let end = date("2025-06-30");

    let mut samples = Vec::new();
    let mut day = start;
    while day <= end {
        samples.push(sample("daily", &day.to_string(), 10.0));
        day = day.succ_opt().unwrap();
    }
    fx.db.append_samples(samples).await.unwrap();

    let window = Window::new(start, end).unwrap();
    let series = fx
        .engine
        .keyword_graph(&["daily".to_string()], &window, None)
        .await
        .unwrap();

    // 60 days of samples collapse into at most 30 buckets.
    assert!(series["daily"].len() <= 30);
    assert!(series["daily"].len() >= 29);
}

#[tokio::test]
async fn summary_reflects_registry_mutations_immediately() {
    let fx = fixture();
    fx.settings
        .update_keyword_quota(KeywordQuota {
            taken: 2,
            available: 100,
        })
        .unwrap();

    fx.engine.registry().add(vec!["first".into()]).await.unwrap();
    let summary = fx.engine.tracked_keywords_summary().await.unwrap();
    assert_eq!(summary.total, 1);
    assert_eq!(summary.taken, 2);
    assert_eq!(summary.available, 100);

    // add() invalidates the cached summary; the next read recounts.
    fx.engine.registry().add(vec!["second".into()]).await.unwrap();
    let summary = fx.engine.tracked_keywords_summary().await.unwrap();
    assert_eq!(summary.total, 2);

    fx.engine.registry().remove("second").await.unwrap();
    let summary = fx.engine.tracked_keywords_summary().await.unwrap();
    assert_eq!(summary.total, 1);
}

#[tokio::test]
async fn winning_keywords_are_served_from_cache_until_ttl() {
    let fx = fixture();
    fx.db
        .append_samples(vec![
            sample("cached", "2025-06-05", 10.0),
            sample("cached", "2025-06-30", 2.0),
        ])
        .await
        .unwrap();

    let first = fx.engine.winning_keywords(&windows(), None).await.unwrap();
    assert_eq!(first.len(), 1);

    // New samples would change the result, but the cached value is still
    // inside its TTL.
    fx.db
        .append_samples(vec![sample("cached", "2025-06-30", 50.0)])
        .await
        .unwrap();
    let second = fx.engine.winning_keywords(&windows(), None).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn extract_addable_filters_case_insensitively() {
    let fx = fixture();
    fx.engine.registry().add(vec!["seo tips".into()]).await.unwrap();

    let addable = fx
        .engine
        .registry()
        .extract_addable("SEO Tips, new phrase")
        .await
        .unwrap();
    assert_eq!(addable, vec!["new phrase".to_string()]);

    assert!(fx.engine.registry().extract_addable("").await.unwrap().is_empty());
    assert!(fx
        .engine
        .registry()
        .extract_addable(" , ,, ")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn removing_unknown_keyword_is_a_noop() {
    let fx = fixture();
    fx.engine.registry().remove("ghost").await.unwrap();
    assert_eq!(fx.engine.registry().count().await.unwrap(), 0);
}

#[tokio::test]
async fn mismatched_window_lengths_are_rejected_before_querying() {
    let fx = fixture();
    let pair = WindowPair {
        current: Window::new(date("2025-06-16"), date("2025-06-30")).unwrap(),
        compare: Window::new(date("2025-06-01"), date("2025-06-10")).unwrap(),
    };

    let err = fx
        .engine
        .all_tracked_keywords(&pair, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AnalyticsError>(),
        Some(AnalyticsError::InvalidWindow { .. })
    ));
}

#[tokio::test]
async fn keyword_pages_lists_most_recent_distinct_pages() {
    let fx = fixture();
    let mut samples = Vec::new();
    for (index, day) in ["2025-06-17", "2025-06-18", "2025-06-19", "2025-06-20", "2025-06-21", "2025-06-22"]
        .iter()
        .enumerate()
    {
        let mut row = sample("kw", day, 5.0);
        row.page = format!("https://example.com/{index}");
        samples.push(row);
    }
    // Other keywords never contribute pages.
    samples.push(sample("other", "2025-06-30", 1.0));
    fx.db.append_samples(samples).await.unwrap();

    let pages = fx
        .engine
        .keyword_pages("kw", &windows().current, None)
        .await
        .unwrap();
    assert_eq!(pages.len(), 5);
    assert_eq!(pages[0], "https://example.com/5");
    assert!(!pages.contains(&"https://example.com/0".to_string()));
}

#[tokio::test]
async fn expired_deadline_yields_empty_result_without_caching() {
    let fx = fixture();
    fx.db
        .append_samples(vec![
            sample("kw", "2025-06-05", 10.0),
            sample("kw", "2025-06-30", 2.0),
        ])
        .await
        .unwrap();

    let rushed = fx
        .engine
        .winning_keywords(&windows(), Some(Duration::ZERO))
        .await
        .unwrap();
    assert!(rushed.is_empty());

    // The aborted run wrote nothing: an unhurried call still computes.
    let unhurried = fx.engine.winning_keywords(&windows(), None).await.unwrap();
    assert_eq!(unhurried.len(), 1);
}

#[tokio::test]
async fn paged_view_honors_expired_deadline() {
    let fx = fixture();
    fx.engine.registry().add(vec!["seo tips".into()]).await.unwrap();
    fx.db
        .append_samples(vec![
            sample("seo tips", "2025-06-05", 8.0),
            sample("seo tips", "2025-06-20", 5.0),
        ])
        .await
        .unwrap();

    let rushed = fx
        .engine
        .tracked_keyword_rows(&windows(), 1, Some(Duration::ZERO))
        .await
        .unwrap();
    assert!(rushed.is_empty());

    let unhurried = fx
        .engine
        .tracked_keyword_rows(&windows(), 1, None)
        .await
        .unwrap();
    assert_eq!(unhurried.len(), 1);
}

#[tokio::test]
async fn graph_series_keys_match_caller_spelling() {
    let fx = fixture();
    fx.db
        .append_samples(vec![
            sample("seo tips", "2025-06-17", 9.0),
            sample("seo tips", "2025-06-22", 6.0),
        ])
        .await
        .unwrap();

    let series = fx
        .engine
        .keyword_graph(&["SEO Tips".to_string()], &windows().current, None)
        .await
        .unwrap();
    assert_eq!(series["SEO Tips"].len(), 2);

    // A keyword with no samples gets no entry rather than an empty series.
    let empty = fx
        .engine
        .keyword_graph(&["unseen".to_string()], &windows().current, None)
        .await
        .unwrap();
    assert!(empty.is_empty());
}

#[tokio::test]
async fn tracked_classification_is_scoped_to_the_registry() {
    let fx = fixture();
    fx.engine
        .registry()
        .add(vec!["tracked up".into(), "tracked down".into()])
        .await
        .unwrap();
    fx.db
        .append_samples(vec![
            // Improved tracked keyword; its latest sample is not on the
            // most recent sample date, so the recent-day view misses it.
            sample("tracked up", "2025-06-05", 14.0),
            sample("tracked up", "2025-06-25", 6.0),
            sample("tracked down", "2025-06-05", 3.0),
            sample("tracked down", "2025-06-25", 9.0),
            // Improved but untracked, sampled on the most recent date.
            sample("untracked up", "2025-06-05", 20.0),
            sample("untracked up", "2025-06-30", 10.0),
        ])
        .await
        .unwrap();

    let winning = fx
        .engine
        .winning_tracked_keywords(&windows(), None)
        .await
        .unwrap();
    let names: Vec<&str> = winning.iter().map(|r| r.query.as_str()).collect();
    assert_eq!(names, ["tracked up"]);

    let losing = fx
        .engine
        .losing_tracked_keywords(&windows(), None)
        .await
        .unwrap();
    let names: Vec<&str> = losing.iter().map(|r| r.query.as_str()).collect();
    assert_eq!(names, ["tracked down"]);

    // The recent-day view sees only the untracked keyword.
    let recent_winning = fx.engine.winning_keywords(&windows(), None).await.unwrap();
    let names: Vec<&str> = recent_winning.iter().map(|r| r.query.as_str()).collect();
    assert_eq!(names, ["untracked up"]);
}

#[tokio::test]
async fn empty_data_produces_empty_results_not_errors() {
    let fx = fixture();
    let rows = fx
        .engine
        .all_tracked_keywords(&windows(), None)
        .await
        .unwrap();
    assert!(rows.is_empty());

    let winning = fx.engine.winning_keywords(&windows(), None).await.unwrap();
    assert!(winning.is_empty());
}

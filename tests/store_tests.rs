//! Link store tests
//!
//! Cache behavior, lookups, mutations and aggregates against temporary
//! SQLite databases.

use std::sync::Arc;

use chrono::Utc;
use kurz::config::AppConfig;
use kurz::engine::Engine;
use kurz::services::EchoTitle;
use kurz::storage::{ClickUpdate, LinkRecord, SortField, SortOrder};
use tempfile::TempDir;

async fn test_engine() -> (Engine, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");

    let mut config = AppConfig::default();
    config.database.url = format!("sqlite://{}?mode=rwc", db_path.display());
    config.site.allow_duplicate_urls = true;

    let engine = Engine::builder(config)
        .title_fetcher(Arc::new(EchoTitle))
        .connect()
        .await
        .expect("Failed to build engine");

    (engine, temp_dir)
}

fn record(keyword: &str, url: &str) -> LinkRecord {
    LinkRecord {
        keyword: keyword.to_string(),
        url: url.to_string(),
        title: format!("Title of {}", keyword),
        created_at: Utc::now(),
        ip: "203.0.113.7".to_string(),
        clicks: 0,
    }
}

#[tokio::test]
async fn insert_then_lookup() {
    let (engine, _tmp) = test_engine().await;
    let links = engine.links();

    assert!(links.insert(&record("abc", "http://example.com/a")).await);
    assert!(links.keyword_is_taken("abc").await.unwrap());
    assert!(!links.keyword_is_taken("zzz").await.unwrap());

    let info = links
        .get_keyword_info("abc", true)
        .await
        .unwrap()
        .expect("inserted record is readable");
    assert_eq!(info.url, "http://example.com/a");
    assert_eq!(info.clicks, 0);

    let by_url = links.url_exists("http://example.com/a").await.unwrap();
    assert_eq!(by_url.map(|r| r.keyword), Some("abc".to_string()));
    assert!(links.url_exists("http://example.com/b").await.unwrap().is_none());
}

#[tokio::test]
async fn double_insert_of_a_keyword_fails() {
    let (engine, _tmp) = test_engine().await;
    let links = engine.links();

    assert!(links.insert(&record("abc", "http://example.com/a")).await);
    assert!(!links.insert(&record("abc", "http://example.com/b")).await);
}

#[tokio::test]
async fn negative_lookups_are_cached() {
    let (engine, _tmp) = test_engine().await;
    let links = engine.links();

    assert!(links.get_keyword_info("ghost", true).await.unwrap().is_none());
    // The negative result is now a cache entry, so a second lookup is
    // answered without a query; observable only as a second None here
    assert!(links.get_keyword_info("ghost", true).await.unwrap().is_none());

    // A fresh read refreshes the entry once the record exists
    assert!(links.insert(&record("ghost", "http://example.com/g")).await);
    let info = links.get_keyword_info("ghost", false).await.unwrap();
    assert!(info.is_some());
}

#[tokio::test]
async fn keywords_for_url_sorts_deterministically() {
    let (engine, _tmp) = test_engine().await;
    let links = engine.links();

    let base = Utc::now();
    for (i, keyword) in ["m", "a", "z"].into_iter().enumerate() {
        let mut r = record(keyword, "http://example.com/shared");
        r.created_at = base + chrono::Duration::seconds(i as i64);
        assert!(links.insert(&r).await);
    }

    let by_keyword = links
        .keywords_for_url(
            "http://example.com/shared",
            Some(SortField::Keyword),
            SortOrder::Asc,
        )
        .await
        .unwrap();
    assert_eq!(by_keyword, vec!["a", "m", "z"]);

    let by_keyword_desc = links
        .keywords_for_url(
            "http://example.com/shared",
            Some(SortField::Keyword),
            SortOrder::Desc,
        )
        .await
        .unwrap();
    assert_eq!(by_keyword_desc, vec!["z", "m", "a"]);

    // Default order is creation time ascending
    let default_order = links
        .keywords_for_url("http://example.com/shared", None, SortOrder::Asc)
        .await
        .unwrap();
    assert_eq!(default_order, vec!["m", "a", "z"]);
}

#[tokio::test]
async fn click_updates_apply_both_ways() {
    let (engine, _tmp) = test_engine().await;
    let links = engine.links();

    assert!(links.insert(&record("abc", "http://example.com/a")).await);

    assert!(links.set_clicks("abc", ClickUpdate::Increment).await.unwrap());
    assert!(links.set_clicks("abc", ClickUpdate::Increment).await.unwrap());
    let info = links.get_keyword_info("abc", true).await.unwrap().unwrap();
    assert_eq!(info.clicks, 2);

    assert!(
        links
            .set_clicks("abc", ClickUpdate::Absolute(40))
            .await
            .unwrap()
    );
    let info = links.get_keyword_info("abc", true).await.unwrap().unwrap();
    assert_eq!(info.clicks, 40);

    // Unknown keyword touches nothing
    assert!(!links.set_clicks("zzz", ClickUpdate::Increment).await.unwrap());
}

#[tokio::test]
async fn delete_is_explicit_and_final() {
    let (engine, _tmp) = test_engine().await;
    let links = engine.links();

    assert!(links.insert(&record("abc", "http://example.com/a")).await);
    assert!(links.delete_by_keyword("abc").await.unwrap());
    assert!(!links.delete_by_keyword("abc").await.unwrap());

    assert!(links.get_keyword_info("abc", true).await.unwrap().is_none());
    assert!(!links.keyword_is_taken("abc").await.unwrap());
}

#[tokio::test]
async fn stats_aggregate_links_and_clicks() {
    let (engine, _tmp) = test_engine().await;
    let links = engine.links();

    assert!(links.insert(&record("a1", "http://example.com/1")).await);
    assert!(links.insert(&record("a2", "http://example.com/2")).await);
    assert!(
        links
            .set_clicks("a1", ClickUpdate::Absolute(5))
            .await
            .unwrap()
    );
    assert!(links.set_clicks("a2", ClickUpdate::Increment).await.unwrap());

    let stats = links.stats().await.unwrap();
    assert_eq!(stats.total_links, 2);
    assert_eq!(stats.total_clicks, 6);
}

#[tokio::test]
async fn filtered_stats_restrict_the_aggregate() {
    use sea_orm::{ColumnTrait, Condition};

    let (engine, _tmp) = test_engine().await;
    let links = engine.links();

    let mut popular = record("hot", "http://example.com/hot");
    popular.clicks = 9;
    assert!(links.insert(&popular).await);
    assert!(links.insert(&record("cold", "http://example.com/cold")).await);

    let stats = links
        .stats_filtered(
            Condition::all()
                .add(migration::entities::link::Column::Clicks.gt(0)),
        )
        .await
        .unwrap();
    assert_eq!(stats.total_links, 1);
    assert_eq!(stats.total_clicks, 9);
}

#[tokio::test]
async fn empty_store_has_zero_stats() {
    let (engine, _tmp) = test_engine().await;
    let stats = engine.links().stats().await.unwrap();
    assert_eq!(stats.total_links, 0);
    assert_eq!(stats.total_clicks, 0);
}

#[tokio::test]
async fn last_creation_per_ip_is_tracked() {
    let (engine, _tmp) = test_engine().await;
    let links = engine.links();

    assert!(links.last_created_by_ip("203.0.113.7").await.unwrap().is_none());

    let before = Utc::now();
    assert!(links.insert(&record("abc", "http://example.com/a")).await);

    let last = links
        .last_created_by_ip("203.0.113.7")
        .await
        .unwrap()
        .expect("the insert is visible");
    assert!(last >= before - chrono::Duration::seconds(1));
    assert!(links.last_created_by_ip("198.51.100.1").await.unwrap().is_none());
}

#[tokio::test]
async fn update_rewrites_the_row_in_place() {
    let (engine, _tmp) = test_engine().await;
    let links = engine.links();

    assert!(links.insert(&record("abc", "http://example.com/a")).await);
    assert!(
        links
            .update("abc", "http://example.com/b", "xyz", "Renamed")
            .await
            .unwrap()
    );

    assert!(links.get_keyword_info("abc", false).await.unwrap().is_none());
    let moved = links.get_keyword_info("xyz", false).await.unwrap().unwrap();
    assert_eq!(moved.url, "http://example.com/b");
    assert_eq!(moved.title, "Renamed");

    assert!(
        !links
            .update("abc", "http://example.com/c", "abc", "")
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn title_only_update_skips_the_checks() {
    let (engine, _tmp) = test_engine().await;
    let links = engine.links();

    assert!(links.insert(&record("abc", "http://example.com/a")).await);
    assert!(links.update_title("abc", "Renamed").await.unwrap());

    let info = links.get_keyword_info("abc", true).await.unwrap().unwrap();
    assert_eq!(info.title, "Renamed");
    assert_eq!(info.url, "http://example.com/a");
}

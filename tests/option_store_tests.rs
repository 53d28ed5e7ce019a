//! Option store tests
//!
//! Lazy loading, negative caching, idempotent writes and the provisioning
//! signal.

use std::sync::Arc;

use kurz::config::AppConfig;
use kurz::engine::Engine;
use kurz::services::EchoTitle;
use kurz::storage::OptionValue;
use tempfile::TempDir;

async fn test_engine() -> (Engine, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");

    let mut config = AppConfig::default();
    config.database.url = format!("sqlite://{}?mode=rwc", db_path.display());

    let engine = Engine::builder(config)
        .title_fetcher(Arc::new(EchoTitle))
        .connect()
        .await
        .expect("Failed to build engine");

    (engine, temp_dir)
}

#[tokio::test]
async fn missing_options_read_as_none_and_defaults_apply() {
    let (engine, _tmp) = test_engine().await;
    let options = engine.options();

    assert!(options.get("nope").await.unwrap().is_none());
    assert_eq!(
        options
            .get_or("nope", OptionValue::scalar("fallback"))
            .await
            .unwrap(),
        OptionValue::scalar("fallback")
    );
}

#[tokio::test]
async fn set_creates_then_updates() {
    let (engine, _tmp) = test_engine().await;
    let options = engine.options();

    assert!(options.set("greeting", OptionValue::scalar("hi")).await.unwrap());
    assert_eq!(
        options.get("greeting").await.unwrap(),
        Some(OptionValue::scalar("hi"))
    );

    assert!(
        options
            .set("greeting", OptionValue::scalar("hello"))
            .await
            .unwrap()
    );
    assert_eq!(
        options.get("greeting").await.unwrap(),
        Some(OptionValue::scalar("hello"))
    );
}

#[tokio::test]
async fn equal_value_writes_are_no_ops() {
    let (engine, _tmp) = test_engine().await;
    let options = engine.options();

    assert!(options.set("counter", OptionValue::scalar("7")).await.unwrap());
    // Same value again: judged against the cached value, no write happens
    assert!(!options.set("counter", OptionValue::scalar("7")).await.unwrap());
    assert_eq!(
        options.get("counter").await.unwrap(),
        Some(OptionValue::scalar("7"))
    );
}

#[tokio::test]
async fn composites_survive_the_database() {
    let (engine, _tmp) = test_engine().await;
    let options = engine.options();

    let value = OptionValue::Composite(serde_json::json!({
        "window": 30,
        "whitelist": ["127.0.0.1", "10.0.0.0/8"],
    }));
    assert!(options.set("limits", value.clone()).await.unwrap());

    // get_all reloads from the database, bypassing nothing but proving the
    // stored text decodes back into the same composite
    let all = options.get_all().await.unwrap();
    assert_eq!(all.get("limits"), Some(&value));
}

#[tokio::test]
async fn delete_removes_and_reports_absence() {
    let (engine, _tmp) = test_engine().await;
    let options = engine.options();

    assert!(options.set("doomed", OptionValue::scalar("x")).await.unwrap());
    assert!(options.delete("doomed").await.unwrap());
    assert!(options.get("doomed").await.unwrap().is_none());
    assert!(!options.delete("doomed").await.unwrap());
}

#[tokio::test]
async fn zero_options_means_not_provisioned() {
    let (engine, _tmp) = test_engine().await;

    assert!(!engine.is_installed().await.unwrap());

    engine.install().await.unwrap();
    assert!(engine.is_installed().await.unwrap());

    // Fresh engine over the same database sees the provisioned state
    let next = engine
        .options()
        .get_all()
        .await
        .unwrap();
    assert!(next.contains_key("version"));
    assert!(next.contains_key("next_id"));
}

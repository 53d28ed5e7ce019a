//! Flood guard tests
//!
//! The write-rate limit is the one check that aborts a request fatally
//! instead of returning a result value.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kurz::config::AppConfig;
use kurz::engine::Engine;
use kurz::hooks::Shunt;
use kurz::services::EchoTitle;
use kurz::structs::{Caller, Fatal, ResolveRequest};
use tempfile::TempDir;

async fn test_engine_with<F>(tweak: F) -> (Engine, TempDir)
where
    F: FnOnce(&mut AppConfig),
{
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");

    let mut config = AppConfig::default();
    config.database.url = format!("sqlite://{}?mode=rwc", db_path.display());
    config.site.allow_duplicate_urls = true;
    tweak(&mut config);

    let engine = Engine::builder(config)
        .title_fetcher(Arc::new(EchoTitle))
        .connect()
        .await
        .expect("Failed to build engine");

    (engine, temp_dir)
}

async fn create(engine: &Engine, url: &str, caller: Caller) -> Result<(), Fatal> {
    let resolution = engine
        .resolver()
        .get_or_create_link(ResolveRequest::new(url, caller).strict_create())
        .await?;
    assert!(resolution.is_success(), "{:?}", resolution);
    Ok(())
}

#[tokio::test]
async fn no_window_means_no_throttling() {
    let (engine, _tmp) = test_engine_with(|c| c.flood.delay_seconds = 0).await;

    for i in 0..3 {
        create(
            &engine,
            &format!("http://example.com/{}", i),
            Caller::anonymous("203.0.113.7"),
        )
        .await
        .expect("no flood window configured");
    }
}

#[tokio::test]
async fn second_write_inside_the_window_is_fatal() {
    let (engine, _tmp) = test_engine_with(|c| c.flood.delay_seconds = 60).await;

    create(&engine, "http://example.com/a", Caller::anonymous("203.0.113.7"))
        .await
        .expect("first write passes");

    let fatal = create(
        &engine,
        "http://example.com/b",
        Caller::anonymous("203.0.113.7"),
    )
    .await
    .expect_err("second write inside the window must abort");

    assert_eq!(fatal.status_code, 403);
    assert!(fatal.message.contains("Too many URLs"));

    // A different IP is unaffected
    create(&engine, "http://example.com/c", Caller::anonymous("198.51.100.1"))
        .await
        .expect("other callers are not throttled");
}

#[tokio::test]
async fn a_write_after_the_window_passes() {
    let (engine, _tmp) = test_engine_with(|c| c.flood.delay_seconds = 1).await;
    let ip = "203.0.113.7";

    create(&engine, "http://example.com/a", Caller::anonymous(ip))
        .await
        .expect("first write passes");

    tokio::time::sleep(Duration::from_millis(2_100)).await;

    create(&engine, "http://example.com/b", Caller::anonymous(ip))
        .await
        .expect("the window has elapsed");
}

#[tokio::test]
async fn whitelisted_ips_are_never_throttled() {
    let (engine, _tmp) = test_engine_with(|c| {
        c.flood.delay_seconds = 60;
        c.flood.whitelist = vec!["203.0.113.7".to_string(), "10.0.0.0/8".to_string()];
    })
    .await;

    for i in 0..3 {
        create(
            &engine,
            &format!("http://example.com/{}", i),
            Caller::anonymous("203.0.113.7"),
        )
        .await
        .expect("whitelisted exact IP");
    }

    for i in 0..3 {
        create(
            &engine,
            &format!("http://example.com/cidr{}", i),
            Caller::anonymous("10.1.2.3"),
        )
        .await
        .expect("whitelisted CIDR range");
    }
}

#[tokio::test]
async fn privileged_callers_pass_under_private_mode() {
    let (engine, _tmp) = test_engine_with(|c| {
        c.flood.delay_seconds = 60;
        c.site.private_mode = true;
    })
    .await;

    let privileged = Caller {
        ip: "203.0.113.7".to_string(),
        user: Some("admin".to_string()),
        privileged: true,
    };

    for i in 0..3 {
        create(&engine, &format!("http://example.com/{}", i), privileged.clone())
            .await
            .expect("privileged caller under private mode");
    }
}

struct AlwaysAllow;

#[async_trait]
impl Shunt for AlwaysAllow {
    fn name(&self) -> &str {
        "always-allow"
    }

    async fn check_flood(&self, _ip: &str) -> Option<Result<(), Fatal>> {
        Some(Ok(()))
    }
}

struct AlwaysReject;

#[async_trait]
impl Shunt for AlwaysReject {
    fn name(&self) -> &str {
        "always-reject"
    }

    async fn check_flood(&self, _ip: &str) -> Option<Result<(), Fatal>> {
        Some(Err(Fatal::forbidden("rejected by policy")))
    }
}

#[tokio::test]
async fn a_handler_can_supply_the_flood_verdict() {
    let (engine, _tmp) = test_engine_with(|c| c.flood.delay_seconds = 60).await;
    engine.hooks().register(Arc::new(AlwaysAllow));

    // The handler waves everything through, including back-to-back writes
    for i in 0..3 {
        create(
            &engine,
            &format!("http://example.com/{}", i),
            Caller::anonymous("203.0.113.7"),
        )
        .await
        .expect("handler supplied a pass");
    }
}

#[tokio::test]
async fn a_handler_can_reject_outright() {
    let (engine, _tmp) = test_engine_with(|c| c.flood.delay_seconds = 0).await;
    engine.hooks().register(Arc::new(AlwaysReject));

    let fatal = create(
        &engine,
        "http://example.com/a",
        Caller::anonymous("203.0.113.7"),
    )
    .await
    .expect_err("handler supplied a rejection");
    assert_eq!(fatal.status_code, 403);
    assert_eq!(fatal.message, "rejected by policy");
}

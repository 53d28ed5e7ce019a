//! Remote title boundary.
//!
//! Fetching and parsing a page title is outside the engine; the resolver
//! only sees the [`TitleFetcher`] trait. [`HttpTitleFetcher`] is the
//! provided implementation; anything that goes wrong falls back to
//! returning the URL itself, which is what the resolver expects.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use ureq::Agent;

const HTTP_TIMEOUT_SECS: u64 = 4;
/// Don't read more than this much of a page looking for its title.
const MAX_BODY_BYTES: u64 = 64 * 1024;

#[async_trait]
pub trait TitleFetcher: Send + Sync {
    /// Best-effort page title; on failure, the URL itself.
    async fn fetch(&self, url: &str) -> String;
}

/// Fallback fetcher that never touches the network.
pub struct EchoTitle;

#[async_trait]
impl TitleFetcher for EchoTitle {
    async fn fetch(&self, url: &str) -> String {
        url.to_string()
    }
}

/// HTTP fetcher with a small read limit and timeout.
pub struct HttpTitleFetcher {
    agent: Agent,
}

impl HttpTitleFetcher {
    pub fn new() -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(HTTP_TIMEOUT_SECS)))
            .build()
            .into();
        Self { agent }
    }

    fn fetch_sync(agent: &Agent, url: &str) -> Option<String> {
        let mut response = agent.get(url).call().ok()?;
        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_BYTES)
            .read_to_string()
            .ok()?;
        extract_title(&body)
    }
}

impl Default for HttpTitleFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TitleFetcher for HttpTitleFetcher {
    async fn fetch(&self, url: &str) -> String {
        let agent = self.agent.clone();
        let owned = url.to_string();
        let title = tokio::task::spawn_blocking(move || Self::fetch_sync(&agent, &owned))
            .await
            .ok()
            .flatten();

        match title {
            Some(title) => title,
            None => {
                debug!("No remote title for {}, falling back to the URL", url);
                url.to_string()
            }
        }
    }
}

/// Pull the contents of the first `<title>` element out of an HTML page.
fn extract_title(html: &str) -> Option<String> {
    let lower = html.to_lowercase();
    let open = lower.find("<title")?;
    let open_end = lower[open..].find('>')? + open + 1;
    let close = lower[open_end..].find("</title")? + open_end;

    let title = html[open_end..close].trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

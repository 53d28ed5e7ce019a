//! GeoIP boundary.
//!
//! Only the lookup interface is in scope; where the answer comes from is
//! not. The resolver-facing [`GeoResolver`] honors the `country_lookup`
//! interception point before asking the configured provider, and falls back
//! to the configured default country when nobody answers.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::maxmind::MaxMindProvider;
use crate::config::GeoConfig;
use crate::hooks::HookChain;

/// Country lookup interface. Implementations answer with an ISO 3166-1
/// alpha-2 code.
#[async_trait]
pub trait GeoLookup: Send + Sync {
    async fn lookup(&self, ip: &str) -> Option<String>;

    /// Provider name, for logs.
    fn name(&self) -> &'static str;
}

/// Provider that never answers; the configured default applies.
pub struct NullGeoProvider;

#[async_trait]
impl GeoLookup for NullGeoProvider {
    async fn lookup(&self, _ip: &str) -> Option<String> {
        None
    }

    fn name(&self) -> &'static str {
        "null"
    }
}

pub struct GeoResolver {
    inner: Arc<dyn GeoLookup>,
    default_country: String,
    hooks: Arc<HookChain>,
}

impl GeoResolver {
    /// Pick a provider from configuration: a readable MaxMind database when
    /// one is configured, the null provider otherwise.
    pub fn new(config: &GeoConfig, hooks: Arc<HookChain>) -> Self {
        let inner: Arc<dyn GeoLookup> = if let Some(ref path) = config.maxminddb_path {
            match MaxMindProvider::new(path) {
                Ok(provider) => {
                    info!("GeoIP: using MaxMind database at {}", path);
                    Arc::new(provider)
                }
                Err(e) => {
                    warn!("GeoIP: cannot load MaxMind database at {}: {}", path, e);
                    Arc::new(NullGeoProvider)
                }
            }
        } else {
            debug!("GeoIP: no database configured");
            Arc::new(NullGeoProvider)
        };

        Self {
            inner,
            default_country: config.default_country.clone(),
            hooks,
        }
    }

    pub fn with_provider(
        provider: Arc<dyn GeoLookup>,
        default_country: String,
        hooks: Arc<HookChain>,
    ) -> Self {
        Self {
            inner: provider,
            default_country,
            hooks,
        }
    }

    /// Country code for an IP, default when unknown.
    pub async fn country_code(&self, ip: &str) -> String {
        if let Some(code) = self.hooks.country_lookup(ip).await {
            return code;
        }

        match self.inner.lookup(ip).await {
            Some(code) => code,
            None => self.default_country.clone(),
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.inner.name()
    }
}

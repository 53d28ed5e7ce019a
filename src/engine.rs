//! Engine assembly.
//!
//! Wires the stores, hook chain, event bus and services together from an
//! [`AppConfig`] and a database connection. Nothing here is a global: the
//! engine owns its caches and registries, and embedders that need several
//! isolated instances in one process can simply build several engines.

use std::sync::Arc;

use crate::codec::KeywordCodec;
use crate::config::AppConfig;
use crate::errors::Result;
use crate::hooks::HookChain;
use crate::hooks::events::EventBus;
use crate::sanitize::{BasicSanitizer, Sanitizer};
use crate::services::geoip::{GeoLookup, GeoResolver};
use crate::services::{
    FloodGuard, HttpTitleFetcher, LinkResolver, NEXT_ID_OPTION, NonceFactory, TitleFetcher,
};
use crate::storage::{LinkDatabase, LinkStore, OptionStore, OptionValue};

pub struct Engine {
    config: AppConfig,
    db: LinkDatabase,
    hooks: Arc<HookChain>,
    events: Arc<EventBus>,
    links: Arc<LinkStore>,
    options: Arc<OptionStore>,
    flood: Arc<FloodGuard>,
    resolver: LinkResolver,
    nonces: NonceFactory,
    geo: GeoResolver,
}

impl Engine {
    /// Connect with the default collaborators.
    pub async fn connect(config: AppConfig) -> Result<Self> {
        Self::builder(config).connect().await
    }

    pub fn builder(config: AppConfig) -> EngineBuilder {
        EngineBuilder {
            config,
            sanitizer: None,
            titles: None,
            geo_provider: None,
        }
    }

    /// Seed the options a fresh installation needs. Idempotent.
    pub async fn install(&self) -> Result<()> {
        self.options
            .set("version", OptionValue::scalar(env!("CARGO_PKG_VERSION")))
            .await?;
        if self.options.get(NEXT_ID_OPTION).await?.is_none() {
            self.options
                .set(NEXT_ID_OPTION, OptionValue::scalar("1"))
                .await?;
        }
        Ok(())
    }

    /// Whether any option exists; zero options means "not provisioned".
    pub async fn is_installed(&self) -> Result<bool> {
        self.options.is_installed().await
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn database(&self) -> &LinkDatabase {
        &self.db
    }

    pub fn resolver(&self) -> &LinkResolver {
        &self.resolver
    }

    pub fn links(&self) -> &Arc<LinkStore> {
        &self.links
    }

    pub fn options(&self) -> &Arc<OptionStore> {
        &self.options
    }

    pub fn flood(&self) -> &Arc<FloodGuard> {
        &self.flood
    }

    pub fn nonces(&self) -> &NonceFactory {
        &self.nonces
    }

    pub fn geo(&self) -> &GeoResolver {
        &self.geo
    }

    pub fn hooks(&self) -> &Arc<HookChain> {
        &self.hooks
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }
}

pub struct EngineBuilder {
    config: AppConfig,
    sanitizer: Option<Arc<dyn Sanitizer>>,
    titles: Option<Arc<dyn TitleFetcher>>,
    geo_provider: Option<Arc<dyn GeoLookup>>,
}

impl EngineBuilder {
    /// Replace the sanitization collaborator.
    pub fn sanitizer(mut self, sanitizer: Arc<dyn Sanitizer>) -> Self {
        self.sanitizer = Some(sanitizer);
        self
    }

    /// Replace the title-fetch collaborator.
    pub fn title_fetcher(mut self, titles: Arc<dyn TitleFetcher>) -> Self {
        self.titles = Some(titles);
        self
    }

    /// Replace the GeoIP provider.
    pub fn geo_provider(mut self, provider: Arc<dyn GeoLookup>) -> Self {
        self.geo_provider = Some(provider);
        self
    }

    pub async fn connect(self) -> Result<Engine> {
        let db = LinkDatabase::connect(&self.config.database).await?;
        Ok(self.assemble(db))
    }

    /// Assemble on an already-established connection.
    pub fn assemble(self, db: LinkDatabase) -> Engine {
        let config = self.config;

        let hooks = Arc::new(HookChain::new());
        let events = Arc::new(EventBus::new());

        let sanitizer = self
            .sanitizer
            .unwrap_or_else(|| Arc::new(BasicSanitizer::new(config.codec.alphabet)));
        let titles = self
            .titles
            .unwrap_or_else(|| Arc::new(HttpTitleFetcher::new()));

        let links = Arc::new(LinkStore::new(
            db.conn().clone(),
            hooks.clone(),
            events.clone(),
        ));
        let options = Arc::new(OptionStore::new(
            db.conn().clone(),
            hooks.clone(),
            events.clone(),
        ));

        let flood = Arc::new(FloodGuard::new(
            config.flood.clone(),
            config.site.private_mode,
            links.clone(),
            hooks.clone(),
            events.clone(),
        ));

        let geo = match self.geo_provider {
            Some(provider) => GeoResolver::with_provider(
                provider,
                config.geoip.default_country.clone(),
                hooks.clone(),
            ),
            None => GeoResolver::new(&config.geoip, hooks.clone()),
        };

        let resolver = LinkResolver::new(
            config.site.clone(),
            config.resolver.clone(),
            KeywordCodec::new(config.codec.alphabet),
            links.clone(),
            options.clone(),
            flood.clone(),
            sanitizer,
            titles,
            hooks.clone(),
            events.clone(),
        );

        let nonces = NonceFactory::new(config.nonce.clone());

        Engine {
            config,
            db,
            hooks,
            events,
            links,
            options,
            flood,
            resolver,
            nonces,
            geo,
        }
    }
}

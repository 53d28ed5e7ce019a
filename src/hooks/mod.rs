//! Extension seams.
//!
//! Two mechanisms, both first-class registries:
//!
//! - **Interception** ([`Shunt`] / [`HookChain`]): before an operation runs
//!   its own logic it offers the registered handlers the chance to supply the
//!   entire result. `None` is the "no opinion" sentinel; the first handler
//!   returning `Some` wins and the internal logic is skipped.
//! - **Notification** ([`events::EventBus`]): observers receive typed events
//!   after the fact and cannot alter the outcome.

pub mod events;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::storage::{LinkRecord, OptionValue};
use crate::structs::{Fatal, Resolution, ResolveRequest};

/// Interception handler. Every method defaults to "no opinion".
///
/// The double `Option` on lookup points distinguishes "handler declined"
/// (outer `None`) from "handler answered: no such record" (`Some(None)`).
#[async_trait]
pub trait Shunt: Send + Sync {
    /// Handler name, for logs.
    fn name(&self) -> &str;

    async fn keyword_is_taken(&self, _keyword: &str) -> Option<bool> {
        None
    }

    async fn url_exists(&self, _url: &str) -> Option<Option<LinkRecord>> {
        None
    }

    async fn get_keyword_info(&self, _keyword: &str) -> Option<Option<LinkRecord>> {
        None
    }

    async fn get_or_create(&self, _request: &ResolveRequest) -> Option<Resolution> {
        None
    }

    async fn check_flood(&self, _ip: &str) -> Option<Result<(), Fatal>> {
        None
    }

    async fn option_get(&self, _name: &str) -> Option<Option<OptionValue>> {
        None
    }

    async fn option_get_all(&self) -> Option<HashMap<String, OptionValue>> {
        None
    }

    async fn country_lookup(&self, _ip: &str) -> Option<String> {
        None
    }

    /// Value filter: transform an auto-generated keyword candidate.
    async fn generate_keyword(&self, _candidate: &str, _url: &str) -> Option<String> {
        None
    }

    /// Value filter: rewrite the final result of the legacy add-link entry.
    async fn add_link_result(&self, _result: &Resolution) -> Option<Resolution> {
        None
    }
}

/// Ordered chain of interception handlers.
///
/// Handlers run in registration order; the first `Some` short-circuits the
/// rest of the chain and the operation's own logic.
#[derive(Default)]
pub struct HookChain {
    handlers: RwLock<Vec<Arc<dyn Shunt>>>,
}

macro_rules! drive_chain {
    ($self:ident, $point:ident ( $($arg:expr),* )) => {{
        let handlers = $self.snapshot();
        for handler in handlers {
            if let Some(result) = handler.$point($($arg),*).await {
                tracing::debug!(
                    handler = handler.name(),
                    point = stringify!($point),
                    "shunt supplied result"
                );
                return Some(result);
            }
        }
        None
    }};
}

impl HookChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, handler: Arc<dyn Shunt>) {
        self.handlers.write().push(handler);
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }

    fn snapshot(&self) -> Vec<Arc<dyn Shunt>> {
        self.handlers.read().clone()
    }

    pub async fn keyword_is_taken(&self, keyword: &str) -> Option<bool> {
        drive_chain!(self, keyword_is_taken(keyword))
    }

    pub async fn url_exists(&self, url: &str) -> Option<Option<LinkRecord>> {
        drive_chain!(self, url_exists(url))
    }

    pub async fn get_keyword_info(&self, keyword: &str) -> Option<Option<LinkRecord>> {
        drive_chain!(self, get_keyword_info(keyword))
    }

    pub async fn get_or_create(&self, request: &ResolveRequest) -> Option<Resolution> {
        drive_chain!(self, get_or_create(request))
    }

    pub async fn check_flood(&self, ip: &str) -> Option<Result<(), Fatal>> {
        drive_chain!(self, check_flood(ip))
    }

    pub async fn option_get(&self, name: &str) -> Option<Option<OptionValue>> {
        drive_chain!(self, option_get(name))
    }

    pub async fn option_get_all(&self) -> Option<HashMap<String, OptionValue>> {
        drive_chain!(self, option_get_all())
    }

    pub async fn country_lookup(&self, ip: &str) -> Option<String> {
        drive_chain!(self, country_lookup(ip))
    }

    pub async fn generate_keyword(&self, candidate: &str, url: &str) -> Option<String> {
        drive_chain!(self, generate_keyword(candidate, url))
    }

    pub async fn add_link_result(&self, result: &Resolution) -> Option<Resolution> {
        drive_chain!(self, add_link_result(result))
    }
}

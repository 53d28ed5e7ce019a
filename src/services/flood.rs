//! Write-rate limiting.
//!
//! One creation per IP per configured window. A violation does not produce
//! an error value for the caller to handle: it aborts the in-flight request
//! with a fatal 403 outcome.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::config::FloodConfig;
use crate::hooks::HookChain;
use crate::hooks::events::{Event, EventBus};
use crate::storage::LinkStore;
use crate::structs::{Caller, Fatal};
use crate::utils::ip_in_whitelist;

pub struct FloodGuard {
    config: FloodConfig,
    /// Private-mode installs exempt privileged callers.
    private_mode: bool,
    links: Arc<LinkStore>,
    hooks: Arc<HookChain>,
    events: Arc<EventBus>,
}

impl FloodGuard {
    pub fn new(
        config: FloodConfig,
        private_mode: bool,
        links: Arc<LinkStore>,
        hooks: Arc<HookChain>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            config,
            private_mode,
            links,
            hooks,
            events,
        }
    }

    /// Enforce the minimum creation interval for this caller.
    pub async fn check(&self, caller: &Caller) -> Result<(), Fatal> {
        if let Some(verdict) = self.hooks.check_flood(&caller.ip).await {
            return verdict;
        }

        if self.config.delay_seconds == 0 {
            return Ok(());
        }

        if ip_in_whitelist(&caller.ip, &self.config.whitelist) {
            debug!("Flood check skipped, {} is whitelisted", caller.ip);
            return Ok(());
        }

        if self.private_mode && caller.privileged {
            return Ok(());
        }

        let last = match self.links.last_created_by_ip(&caller.ip).await {
            Ok(last) => last,
            Err(e) => {
                // Fail open: a storage hiccup must not lock every caller out
                warn!("Flood lookup for {} failed: {}", caller.ip, e);
                return Ok(());
            }
        };

        if let Some(last) = last {
            let elapsed = (Utc::now() - last).num_seconds().max(0) as u64;
            if elapsed <= self.config.delay_seconds {
                self.events
                    .publish(Event::FloodDetected {
                        ip: caller.ip.clone(),
                        elapsed_seconds: elapsed,
                    })
                    .await;
                return Err(Fatal::forbidden(
                    "Too many URLs added too fast. Slow down please.",
                ));
            }
        }

        Ok(())
    }
}

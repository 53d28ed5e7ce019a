//! Link resolution engine.
//!
//! [`LinkResolver::get_or_create_link`] is the decision procedure at the
//! center of the system: given a URL and an optional keyword/title plus
//! strictness flags, it reuses an existing short link, creates one under the
//! caller's keyword, or auto-generates one. Every terminal outcome is a
//! [`Resolution`]; only the flood guard can abort the request with a
//! [`Fatal`].
//!
//! Ordering inside the procedure is load-bearing. Each numbered step is a
//! potential early exit, and a direct creation under a free keyword is
//! authoritative no matter what a later step would have said.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::codec::KeywordCodec;
use crate::config::{ResolverConfig, SiteConfig};
use crate::errors::KurzError;
use crate::hooks::HookChain;
use crate::hooks::events::{Event, EventBus};
use crate::sanitize::Sanitizer;
use crate::services::flood::FloodGuard;
use crate::services::title::TitleFetcher;
use crate::storage::{LinkRecord, LinkStore, OptionStore, OptionValue, SortField, SortOrder};
use crate::structs::{Caller, ErrorCode, Fatal, Resolution, ResolveRequest, Status};
use crate::utils::{encode_uri, relative_to_base, trim_long_string};

/// Option holding the next sequence id to try during auto-generation.
pub const NEXT_ID_OPTION: &str = "next_id";

/// Message length cap for URLs echoed back to the caller.
const DISPLAY_URL_LEN: usize = 60;

fn db_fail(e: KurzError) -> Resolution {
    warn!("Storage failure during resolution: {}", e);
    Resolution::fail(ErrorCode::Db, 500, "Database error")
}

pub struct LinkResolver {
    site: SiteConfig,
    settings: ResolverConfig,
    codec: KeywordCodec,
    links: Arc<LinkStore>,
    options: Arc<OptionStore>,
    flood: Arc<FloodGuard>,
    sanitizer: Arc<dyn Sanitizer>,
    titles: Arc<dyn TitleFetcher>,
    hooks: Arc<HookChain>,
    events: Arc<EventBus>,
}

impl LinkResolver {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        site: SiteConfig,
        settings: ResolverConfig,
        codec: KeywordCodec,
        links: Arc<LinkStore>,
        options: Arc<OptionStore>,
        flood: Arc<FloodGuard>,
        sanitizer: Arc<dyn Sanitizer>,
        titles: Arc<dyn TitleFetcher>,
        hooks: Arc<HookChain>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            site,
            settings,
            codec,
            links,
            options,
            flood,
            sanitizer,
            titles,
            hooks,
            events,
        }
    }

    /// Resolve a URL to a short link, reusing or creating as the flags
    /// allow.
    pub async fn get_or_create_link(&self, request: ResolveRequest) -> Result<Resolution, Fatal> {
        if let Some(resolution) = self.hooks.get_or_create(&request).await {
            return Ok(resolution);
        }

        // 1. URL validation
        let url = self.sanitizer.sanitize_url(&encode_uri(&request.url));
        if url.is_empty() || url == "http://" || url == "https://" {
            return Ok(Resolution::fail(
                ErrorCode::Url,
                400,
                "Missing or malformed URL",
            ));
        }

        // 2. Strict keyword precondition
        let keyword = self
            .sanitizer
            .sanitize_keyword(request.keyword.as_deref().unwrap_or(""));
        if request.strict_keyword && keyword.is_empty() {
            return Ok(Resolution::fail(
                ErrorCode::Keyword,
                400,
                "A valid keyword must be provided when the keyword is strict",
            ));
        }

        // 3. Title default
        let mut title = self
            .sanitizer
            .sanitize_title(request.title.as_deref().unwrap_or(""));
        if !request.strict_title && title.is_empty() {
            title = self.sanitizer.sanitize_title(&self.titles.fetch(&url).await);
        }

        // 4. Rate limiting, possibly fatal
        self.flood.check(&request.caller).await?;

        // 5. Loop prevention: a short link never targets another short link
        // of this installation
        match self.is_short_url(&url).await {
            Ok(true) => {
                return Ok(Resolution::fail(ErrorCode::NoLoop, 403, "URL is a short URL"));
            }
            Ok(false) => {}
            Err(e) => return Ok(db_fail(e)),
        }

        self.events
            .publish(Event::LinkCreating {
                url: url.clone(),
                keyword: keyword.clone(),
                title: title.clone(),
            })
            .await;

        // 6. Prefer the caller's keyword, even when not strictly required
        if !keyword.is_empty() {
            let taken = match self.links.keyword_is_taken(&keyword).await {
                Ok(taken) => taken,
                Err(e) => return Ok(db_fail(e)),
            };

            if !request.strict_create && taken {
                // See if the existing entry under this keyword is acceptable
                let info = match self.links.get_keyword_info(&keyword, true).await {
                    Ok(info) => info,
                    Err(e) => return Ok(db_fail(e)),
                };

                if let Some(info) = info {
                    if info.url == url && (!request.strict_title || info.title == title) {
                        let message = format!(
                            "{} already exists in database",
                            trim_long_string(&url, DISPLAY_URL_LEN)
                        );
                        return Ok(Resolution::success(info, &self.site.base_url, message));
                    }
                }

                if request.strict_keyword {
                    return Ok(Resolution::fail(
                        ErrorCode::KeywordTaken,
                        403,
                        format!(
                            "Short URL {} already exists but does not match requested values",
                            keyword
                        ),
                    ));
                }
                // The keyword is unusable; fall through to reuse or
                // auto-generation
            } else {
                // Create is strict or the keyword is free. Either way this
                // outcome is authoritative; a lost race surfaces as the
                // taken re-check or as error:db inside create_link.
                return Ok(self.create_link(&url, &keyword, &title, &request.caller).await);
            }
        }

        // 8. No usable keyword: reuse an acceptable existing link, oldest
        // first so enumeration order is deterministic
        if !request.strict_create {
            let keywords = match self
                .links
                .keywords_for_url(&url, Some(SortField::CreatedAt), SortOrder::Asc)
                .await
            {
                Ok(keywords) => keywords,
                Err(e) => return Ok(db_fail(e)),
            };

            for existing in keywords {
                let info = match self.links.get_keyword_info(&existing, true).await {
                    Ok(info) => info,
                    Err(e) => return Ok(db_fail(e)),
                };
                if let Some(info) = info
                    && (!request.strict_title || info.title == title)
                {
                    debug!("Reusing keyword '{}' for {}", info.keyword, url);
                    return Ok(Resolution::success(
                        info,
                        &self.site.base_url,
                        "Keyword already exists",
                    ));
                }
            }
        }

        // 9. Auto-generate a keyword
        Ok(self.generate_and_create(&url, &title, &request.caller).await)
    }

    /// Direct creation under a specific keyword.
    ///
    /// Runs the reserved check, the taken re-check (the race window between
    /// "keyword is free" and the insert closes here or at the storage
    /// layer), and the duplicate-URL policy before inserting.
    pub async fn create_link(
        &self,
        url: &str,
        keyword: &str,
        title: &str,
        caller: &Caller,
    ) -> Resolution {
        if self.site.is_reserved(keyword) {
            return Resolution::fail(
                ErrorCode::KeywordReserved,
                403,
                format!("Short URL {} is reserved", keyword),
            );
        }

        match self.links.keyword_is_taken(keyword).await {
            Ok(true) => {
                return Resolution::fail(
                    ErrorCode::KeywordTaken,
                    403,
                    format!("Short URL {} already exists", keyword),
                );
            }
            Ok(false) => {}
            Err(e) => return db_fail(e),
        }

        if !self.site.allow_duplicate_urls {
            match self.links.url_exists(url).await {
                Ok(Some(_)) => {
                    return Resolution::fail(
                        ErrorCode::UrlIllegalDuplicate,
                        403,
                        "Long URL is already stored under another keyword",
                    );
                }
                Ok(None) => {}
                Err(e) => return db_fail(e),
            }
        }

        let record = LinkRecord {
            keyword: keyword.to_string(),
            url: url.to_string(),
            title: title.to_string(),
            created_at: Utc::now(),
            ip: self.sanitizer.sanitize_ip(&caller.ip),
            clicks: 0,
        };

        if self.links.insert(&record).await {
            info!("Created short link '{}' -> {}", record.keyword, record.url);
            self.events
                .publish(Event::LinkCreated {
                    record: record.clone(),
                })
                .await;
            let message = format!(
                "{} added to database",
                trim_long_string(&record.url, DISPLAY_URL_LEN)
            );
            Resolution::success(record, &self.site.base_url, message)
        } else {
            Resolution::fail(ErrorCode::Db, 500, "Error saving url to database")
        }
    }

    /// Bounded keyword auto-generation.
    ///
    /// Encodes ids starting at the persisted counter, retrying past
    /// reserved and taken keywords. Any other outcome ends the loop. The
    /// counter is written once after the loop (not per attempt), so a crash
    /// mid-loop only re-tries ids, it never skips them.
    async fn generate_and_create(&self, url: &str, title: &str, caller: &Caller) -> Resolution {
        let mut id = match self.next_id().await {
            Ok(id) => id,
            Err(e) => return db_fail(e),
        };

        let mut outcome: Option<Resolution> = None;

        for _ in 0..self.settings.max_generate_attempts {
            let mut candidate = self.codec.encode(id);
            if let Some(transformed) = self.hooks.generate_keyword(&candidate, url).await {
                candidate = transformed;
            }

            let resolution = self.create_link(url, &candidate, title, caller).await;
            id += 1;

            match resolution.code {
                Some(ErrorCode::KeywordReserved) | Some(ErrorCode::KeywordTaken) => continue,
                _ => {
                    outcome = Some(resolution);
                    break;
                }
            }
        }

        // Persist the next id to try, best-effort; a failure here only
        // causes already-tried ids to be re-tried on the next call
        if let Err(e) = self
            .options
            .set(NEXT_ID_OPTION, OptionValue::scalar(id.to_string()))
            .await
        {
            warn!("Could not persist {}: {}", NEXT_ID_OPTION, e);
        }

        outcome.unwrap_or_else(|| {
            Resolution::fail(
                ErrorCode::KeywordSpaceExhausted,
                500,
                "Keyword auto-generation ran out of attempts",
            )
        })
    }

    /// Legacy find-or-create entry point.
    ///
    /// Preserves the historical result mapping: an already-stored URL under
    /// the no-duplicates policy comes back as the existing link flagged
    /// `fail`/`error:url`, keyword conflicts collapse to `error:keyword`
    /// with status 200, and database failures keep status 200. Results that
    /// keep status 200 pass through the `add_link_result` filter.
    pub async fn add_link(
        &self,
        url: &str,
        keyword: Option<&str>,
        title: Option<&str>,
        caller: Caller,
    ) -> Result<Resolution, Fatal> {
        let sanitized_url = self.sanitizer.sanitize_url(&encode_uri(url));
        let keyword = keyword
            .map(|k| self.sanitizer.sanitize_keyword(k))
            .filter(|k| !k.is_empty());

        let url_taken = match self.links.url_exists(&sanitized_url).await {
            Ok(existing) => existing.is_some(),
            Err(e) => return Ok(db_fail(e)),
        };

        let base = ResolveRequest {
            url: url.to_string(),
            title: title.map(String::from),
            caller,
            ..ResolveRequest::default()
        };

        let mut resolution = if !self.site.allow_duplicate_urls && url_taken {
            // Return the existing link, flagged as a duplicate failure
            let mut r = self.get_or_create_link(base).await?;
            r.status = Status::Fail;
            r.code = Some(ErrorCode::Url);
            r
        } else if let Some(kw) = keyword {
            let mut r = self
                .get_or_create_link(ResolveRequest {
                    keyword: Some(kw),
                    strict_create: true,
                    strict_keyword: true,
                    ..base
                })
                .await?;
            remap_legacy_codes(&mut r);
            r
        } else {
            let mut r = self
                .get_or_create_link(ResolveRequest {
                    strict_create: true,
                    ..base
                })
                .await?;
            remap_legacy_codes(&mut r);
            r
        };

        if resolution.status_code != 200 {
            return Ok(resolution);
        }

        if let Some(filtered) = self.hooks.add_link_result(&resolution).await {
            resolution = filtered;
        }
        Ok(resolution)
    }

    /// Edit a link in place.
    ///
    /// Refused when the new URL is already stored elsewhere while
    /// duplicates are disallowed, or when the new keyword is neither the
    /// old one nor free.
    pub async fn edit_link(
        &self,
        url: &str,
        keyword: &str,
        new_keyword: Option<&str>,
        title: Option<&str>,
    ) -> Resolution {
        let url = self.sanitizer.sanitize_url(&encode_uri(url));
        let keyword = self.sanitizer.sanitize_keyword(keyword);
        let new_keyword = match new_keyword.map(|k| self.sanitizer.sanitize_keyword(k)) {
            Some(k) if !k.is_empty() => k,
            _ => keyword.clone(),
        };
        let title = self.sanitizer.sanitize_title(title.unwrap_or(""));

        let old = match self.links.get_keyword_info(&keyword, false).await {
            Ok(old) => old,
            Err(e) => return db_fail(e),
        };

        let url_conflict = if old.as_ref().map(|r| r.url.as_str()) != Some(url.as_str())
            && !self.site.allow_duplicate_urls
        {
            match self.links.url_exists(&url).await {
                Ok(existing) => existing.is_some(),
                Err(e) => return db_fail(e),
            }
        } else {
            false
        };

        let keyword_ok = if new_keyword != keyword {
            match self.keyword_is_free(&new_keyword).await {
                Ok(free) => free,
                Err(e) => return db_fail(e),
            }
        } else {
            true
        };

        self.events
            .publish(Event::LinkEditing {
                keyword: keyword.clone(),
                new_keyword: new_keyword.clone(),
                new_url: url.clone(),
            })
            .await;

        if url_conflict || !keyword_ok {
            return Resolution::fail_plain(403, "URL or keyword already exists in database");
        }

        let updated = match self.links.update(&keyword, &url, &new_keyword, &title).await {
            Ok(updated) => updated,
            Err(e) => return db_fail(e),
        };

        if !updated {
            return Resolution::fail(
                ErrorCode::Db,
                500,
                format!(
                    "Error updating {} (Short URL: {})",
                    trim_long_string(&url, DISPLAY_URL_LEN),
                    keyword
                ),
            );
        }

        self.events
            .publish(Event::LinkEdited {
                keyword: keyword.clone(),
                new_keyword: new_keyword.clone(),
                new_url: url.clone(),
                new_title: title.clone(),
            })
            .await;

        // Fresh read under the new keyword, refreshing the cache
        match self.links.get_keyword_info(&new_keyword, false).await {
            Ok(Some(record)) => {
                Resolution::success(record, &self.site.base_url, "Link updated in database")
            }
            Ok(None) => Resolution::fail(
                ErrorCode::Db,
                500,
                format!("Edited link '{}' could not be read back", new_keyword),
            ),
            Err(e) => db_fail(e),
        }
    }

    /// Whether a URL names an existing short link of this installation.
    /// Accepts a full URL below the base URL; the relative part must be a
    /// well-formed keyword in use.
    pub async fn is_short_url(&self, url: &str) -> crate::errors::Result<bool> {
        let Some(relative) = relative_to_base(&self.site.base_url, url) else {
            return Ok(false);
        };

        let keyword = self.sanitizer.sanitize_keyword(&relative);
        if keyword.is_empty() || keyword != relative {
            return Ok(false);
        }

        self.links.keyword_is_taken(&keyword).await
    }

    /// A keyword is free when it is neither reserved nor taken.
    pub async fn keyword_is_free(&self, keyword: &str) -> crate::errors::Result<bool> {
        if self.site.is_reserved(keyword) {
            return Ok(false);
        }
        Ok(!self.links.keyword_is_taken(keyword).await?)
    }

    /// Next id the auto-generation loop will try.
    pub async fn next_id(&self) -> crate::errors::Result<u64> {
        let value = self
            .options
            .get_or(NEXT_ID_OPTION, OptionValue::scalar("1"))
            .await?;
        Ok(value.as_u64().unwrap_or(1))
    }
}

fn remap_legacy_codes(resolution: &mut Resolution) {
    if resolution.status != Status::Fail {
        return;
    }
    match resolution.code {
        Some(ErrorCode::KeywordReserved) | Some(ErrorCode::KeywordTaken) => {
            resolution.status_code = 200;
            resolution.code = Some(ErrorCode::Keyword);
        }
        Some(ErrorCode::Db) => {
            resolution.status_code = 200;
        }
        _ => {}
    }
}

//! Link persistence and per-process cache.
//!
//! Lookups go through the interception chain first, then the keyword cache
//! (negative entries included), then the database. All string inputs are
//! expected to have passed through the sanitizer collaborator already; this
//! layer does no sanitization of its own and relies on parameter binding for
//! quoting.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, ExprTrait, FromQueryResult, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use tracing::{debug, warn};

use migration::entities::link;

use crate::cache::{CacheResult, InfoCache};
use crate::errors::{KurzError, Result};
use crate::hooks::events::{Event, EventBus};
use crate::hooks::HookChain;
use crate::storage::models::{ClickUpdate, LinkRecord, LinkStats, SortField, SortOrder};

/// Aggregate query row.
#[derive(Debug, FromQueryResult)]
struct StatsRow {
    total_links: i64,
    total_clicks: Option<i64>,
}

fn model_to_record(model: link::Model) -> LinkRecord {
    LinkRecord {
        keyword: model.keyword,
        url: model.url,
        title: model.title,
        created_at: model.created_at,
        ip: model.ip,
        clicks: Ord::max(model.clicks, 0) as u64,
    }
}

pub struct LinkStore {
    db: DatabaseConnection,
    cache: InfoCache<LinkRecord>,
    stats_cache: moka::sync::Cache<&'static str, LinkStats>,
    hooks: Arc<HookChain>,
    events: Arc<EventBus>,
}

impl LinkStore {
    pub fn new(db: DatabaseConnection, hooks: Arc<HookChain>, events: Arc<EventBus>) -> Self {
        Self {
            db,
            cache: InfoCache::new(),
            stats_cache: moka::sync::Cache::builder()
                .time_to_live(Duration::from_secs(30))
                .max_capacity(1)
                .build(),
            hooks,
            events,
        }
    }

    /// Whether a live record owns this keyword.
    pub async fn keyword_is_taken(&self, keyword: &str) -> Result<bool> {
        if let Some(taken) = self.hooks.keyword_is_taken(keyword).await {
            return Ok(taken);
        }

        let count = link::Entity::find()
            .filter(link::Column::Keyword.eq(keyword))
            .count(&self.db)
            .await
            .map_err(|e| {
                KurzError::database_operation(format!(
                    "Failed to check keyword '{}': {}",
                    keyword, e
                ))
            })?;

        Ok(count > 0)
    }

    /// First record storing this URL, if any.
    pub async fn url_exists(&self, url: &str) -> Result<Option<LinkRecord>> {
        if let Some(existing) = self.hooks.url_exists(url).await {
            return Ok(existing);
        }

        let model = link::Entity::find()
            .filter(link::Column::Url.eq(url))
            .one(&self.db)
            .await
            .map_err(|e| {
                KurzError::database_operation(format!("Failed to look up URL: {}", e))
            })?;

        Ok(model.map(model_to_record))
    }

    /// Full record for a keyword.
    ///
    /// Results are cached per keyword, negative outcomes included.
    /// `use_cache = false` forces a fresh read and refreshes the cache.
    pub async fn get_keyword_info(
        &self,
        keyword: &str,
        use_cache: bool,
    ) -> Result<Option<LinkRecord>> {
        if let Some(info) = self.hooks.get_keyword_info(keyword).await {
            return Ok(info);
        }

        if use_cache {
            match self.cache.get(keyword) {
                CacheResult::Hit(record) => return Ok(Some(record)),
                CacheResult::NegativeHit => return Ok(None),
                CacheResult::Miss => {}
            }
        }

        debug!("Keyword '{}' not cached, hitting the database", keyword);

        let record = link::Entity::find_by_id(keyword)
            .one(&self.db)
            .await
            .map_err(|e| {
                KurzError::database_operation(format!(
                    "Failed to load keyword '{}': {}",
                    keyword, e
                ))
            })?
            .map(model_to_record);

        self.cache.store(keyword.to_string(), record.clone());
        Ok(record)
    }

    /// All keywords pointing at a URL, in the requested order.
    ///
    /// `sort` is restricted to [`SortField`]; `None` falls back to creation
    /// time ascending so enumeration order is deterministic.
    pub async fn keywords_for_url(
        &self,
        url: &str,
        sort: Option<SortField>,
        order: SortOrder,
    ) -> Result<Vec<String>> {
        let column = match sort.unwrap_or(SortField::CreatedAt) {
            SortField::Keyword => link::Column::Keyword,
            SortField::Title => link::Column::Title,
            SortField::CreatedAt => link::Column::CreatedAt,
            SortField::Clicks => link::Column::Clicks,
        };
        let order = match order {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        };

        let keywords = link::Entity::find()
            .select_only()
            .column(link::Column::Keyword)
            .filter(link::Column::Url.eq(url))
            .order_by(column, order)
            .into_tuple::<String>()
            .all(&self.db)
            .await
            .map_err(|e| {
                KurzError::database_operation(format!("Failed to enumerate keywords: {}", e))
            })?;

        Ok(keywords)
    }

    /// Insert a new record. `false` means the row was not written, which
    /// includes losing a keyword race to a concurrent writer.
    pub async fn insert(&self, record: &LinkRecord) -> bool {
        let model = link::ActiveModel {
            keyword: Set(record.keyword.clone()),
            url: Set(record.url.clone()),
            title: Set(record.title.clone()),
            created_at: Set(record.created_at),
            ip: Set(record.ip.clone()),
            clicks: Set(record.clicks as i64),
        };

        match link::Entity::insert(model).exec(&self.db).await {
            Ok(_) => {
                self.cache.store(record.keyword.clone(), Some(record.clone()));
                self.stats_cache.invalidate_all();
                true
            }
            Err(e) => {
                warn!("Insert of keyword '{}' failed: {}", record.keyword, e);
                false
            }
        }
    }

    /// Rewrite a record's URL, keyword and title in place.
    pub async fn update(
        &self,
        keyword: &str,
        new_url: &str,
        new_keyword: &str,
        new_title: &str,
    ) -> Result<bool> {
        let result = link::Entity::update_many()
            .col_expr(link::Column::Url, Expr::value(new_url))
            .col_expr(link::Column::Keyword, Expr::value(new_keyword))
            .col_expr(link::Column::Title, Expr::value(new_title))
            .filter(link::Column::Keyword.eq(keyword))
            .exec(&self.db)
            .await
            .map_err(|e| {
                KurzError::database_operation(format!(
                    "Failed to update keyword '{}': {}",
                    keyword, e
                ))
            })?;

        self.cache.invalidate(keyword);
        self.cache.invalidate(new_keyword);
        Ok(result.rows_affected > 0)
    }

    /// Overwrite a record's title only, no duplicate checks.
    pub async fn update_title(&self, keyword: &str, title: &str) -> Result<bool> {
        let result = link::Entity::update_many()
            .col_expr(link::Column::Title, Expr::value(title))
            .filter(link::Column::Keyword.eq(keyword))
            .exec(&self.db)
            .await
            .map_err(|e| {
                KurzError::database_operation(format!(
                    "Failed to update title of '{}': {}",
                    keyword, e
                ))
            })?;

        self.cache.invalidate(keyword);
        Ok(result.rows_affected > 0)
    }

    /// Apply a click counter update.
    pub async fn set_clicks(&self, keyword: &str, update: ClickUpdate) -> Result<bool> {
        let query = link::Entity::update_many();
        let query = match update {
            ClickUpdate::Absolute(value) => {
                query.col_expr(link::Column::Clicks, Expr::value(value as i64))
            }
            ClickUpdate::Increment => query.col_expr(
                link::Column::Clicks,
                Expr::col(link::Column::Clicks).add(1),
            ),
        };

        let result = query
            .filter(link::Column::Keyword.eq(keyword))
            .exec(&self.db)
            .await
            .map_err(|e| {
                KurzError::database_operation(format!(
                    "Failed to update clicks of '{}': {}",
                    keyword, e
                ))
            })?;

        if result.rows_affected > 0 {
            self.cache.invalidate(keyword);
            self.stats_cache.invalidate_all();
            self.events
                .publish(Event::ClickRecorded {
                    keyword: keyword.to_string(),
                    clicks: match update {
                        ClickUpdate::Absolute(value) => Some(value),
                        ClickUpdate::Increment => None,
                    },
                })
                .await;
        }

        Ok(result.rows_affected > 0)
    }

    /// Remove a record. Irreversible.
    pub async fn delete_by_keyword(&self, keyword: &str) -> Result<bool> {
        let result = link::Entity::delete_by_id(keyword)
            .exec(&self.db)
            .await
            .map_err(|e| {
                KurzError::database_operation(format!(
                    "Failed to delete keyword '{}': {}",
                    keyword, e
                ))
            })?;

        if result.rows_affected == 0 {
            return Ok(false);
        }

        self.cache.store(keyword.to_string(), None);
        self.stats_cache.invalidate_all();
        self.events
            .publish(Event::LinkDeleted {
                keyword: keyword.to_string(),
            })
            .await;

        Ok(true)
    }

    /// Total link and click counts, cached for a short interval.
    pub async fn stats(&self) -> Result<LinkStats> {
        if let Some(stats) = self.stats_cache.get("totals") {
            return Ok(stats);
        }

        let stats = self.aggregate(None).await?;
        self.stats_cache.insert("totals", stats);
        Ok(stats)
    }

    /// Aggregate over a restricted set of rows. Uncached.
    pub async fn stats_filtered(&self, condition: Condition) -> Result<LinkStats> {
        self.aggregate(Some(condition)).await
    }

    async fn aggregate(&self, condition: Option<Condition>) -> Result<LinkStats> {
        let mut query = link::Entity::find()
            .select_only()
            .column_as(link::Column::Keyword.count(), "total_links")
            .column_as(link::Column::Clicks.sum(), "total_clicks");
        if let Some(condition) = condition {
            query = query.filter(condition);
        }

        let row = query
            .into_model::<StatsRow>()
            .one(&self.db)
            .await
            .map_err(|e| {
                KurzError::database_operation(format!("Failed to aggregate stats: {}", e))
            })?;

        Ok(match row {
            Some(row) => LinkStats {
                total_links: Ord::max(row.total_links, 0) as u64,
                total_clicks: Ord::max(row.total_clicks.unwrap_or(0), 0) as u64,
            },
            None => LinkStats::default(),
        })
    }

    /// Timestamp of the most recent record created by an IP, for the flood
    /// window check.
    pub async fn last_created_by_ip(&self, ip: &str) -> Result<Option<DateTime<Utc>>> {
        let model = link::Entity::find()
            .filter(link::Column::Ip.eq(ip))
            .order_by_desc(link::Column::CreatedAt)
            .one(&self.db)
            .await
            .map_err(|e| {
                KurzError::database_operation(format!(
                    "Failed to look up last creation by '{}': {}",
                    ip, e
                ))
            })?;

        Ok(model.map(|m| m.created_at))
    }

    /// Drop every cached keyword entry.
    pub fn invalidate_cache(&self) {
        self.cache.clear();
    }
}

//! Named-value option store.
//!
//! A thin cache-backed key/value layer over the `options` table. Values are
//! lazily loaded and cached per process, negative entries included, so a
//! missing option costs one query total. Equal-value writes are judged
//! against the cached current value and never touch the database.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::debug;

use migration::entities::option_record;

use crate::cache::{CacheResult, InfoCache};
use crate::errors::{KurzError, Result};
use crate::hooks::HookChain;
use crate::hooks::events::{Event, EventBus};
use crate::storage::models::OptionValue;

/// Persist an option value as text. Scalars go through verbatim, composites
/// as JSON.
pub fn serialize_option_value(value: &OptionValue) -> String {
    match value {
        OptionValue::Scalar(s) => s.clone(),
        OptionValue::Composite(v) => v.to_string(),
    }
}

/// Decode a stored option text. Text that parses as a JSON object or array
/// is a composite; everything else is a scalar.
pub fn deserialize_option_value(raw: &str) -> OptionValue {
    let trimmed = raw.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) {
            if value.is_object() || value.is_array() {
                return OptionValue::Composite(value);
            }
        }
    }
    OptionValue::Scalar(raw.to_string())
}

pub struct OptionStore {
    db: DatabaseConnection,
    cache: InfoCache<OptionValue>,
    /// `get_all` has run at least once.
    loaded: AtomicBool,
    /// At least one option existed at the last `get_all`; zero options is
    /// the "not yet provisioned" signal.
    installed: AtomicBool,
    hooks: Arc<HookChain>,
    events: Arc<EventBus>,
}

impl OptionStore {
    pub fn new(db: DatabaseConnection, hooks: Arc<HookChain>, events: Arc<EventBus>) -> Self {
        Self {
            db,
            cache: InfoCache::new(),
            loaded: AtomicBool::new(false),
            installed: AtomicBool::new(false),
            hooks,
            events,
        }
    }

    /// Read an option, from cache when possible.
    pub async fn get(&self, name: &str) -> Result<Option<OptionValue>> {
        if let Some(value) = self.hooks.option_get(name).await {
            return Ok(value);
        }

        match self.cache.get(name) {
            CacheResult::Hit(value) => return Ok(Some(value)),
            CacheResult::NegativeHit => return Ok(None),
            CacheResult::Miss => {}
        }

        debug!("Option '{}' not cached, hitting the database", name);

        let value = option_record::Entity::find_by_id(name)
            .one(&self.db)
            .await
            .map_err(|e| {
                KurzError::database_operation(format!("Failed to load option '{}': {}", name, e))
            })?
            .map(|m| deserialize_option_value(&m.value));

        self.cache.store(name.to_string(), value.clone());
        Ok(value)
    }

    /// Read an option, falling back to `default` when absent.
    pub async fn get_or(&self, name: &str, default: OptionValue) -> Result<OptionValue> {
        Ok(self.get(name).await?.unwrap_or(default))
    }

    /// Load every option into the cache at once.
    pub async fn get_all(&self) -> Result<HashMap<String, OptionValue>> {
        if let Some(all) = self.hooks.option_get_all().await {
            return Ok(all);
        }

        let records = option_record::Entity::find()
            .all(&self.db)
            .await
            .map_err(|e| {
                KurzError::database_operation(format!("Failed to load options: {}", e))
            })?;

        let mut all = HashMap::with_capacity(records.len());
        for record in records {
            let value = deserialize_option_value(&record.value);
            self.cache.store(record.name.clone(), Some(value.clone()));
            all.insert(record.name, value);
        }

        self.loaded.store(true, Ordering::SeqCst);
        self.installed.store(!all.is_empty(), Ordering::SeqCst);

        Ok(all)
    }

    /// Whether the installation has been provisioned, i.e. any option exists.
    pub async fn is_installed(&self) -> Result<bool> {
        if !self.loaded.load(Ordering::SeqCst) {
            self.get_all().await?;
        }
        Ok(self.installed.load(Ordering::SeqCst))
    }

    /// Write an option.
    ///
    /// Returns `false` without touching the database when the new value
    /// equals the cached/loaded current one. Inserts when the key is absent;
    /// otherwise updates and recaches only if the persistence layer reports
    /// a changed row.
    pub async fn set(&self, name: &str, value: OptionValue) -> Result<bool> {
        let current = self.get(name).await?;

        if current.as_ref() == Some(&value) {
            return Ok(false);
        }

        match current {
            None => {
                let model = option_record::ActiveModel {
                    name: Set(name.to_string()),
                    value: Set(serialize_option_value(&value)),
                };
                option_record::Entity::insert(model)
                    .exec(&self.db)
                    .await
                    .map_err(|e| {
                        KurzError::database_operation(format!(
                            "Failed to insert option '{}': {}",
                            name, e
                        ))
                    })?;

                self.cache.store(name.to_string(), Some(value.clone()));
                // The store is provisioned as soon as one option exists
                self.installed.store(true, Ordering::SeqCst);
                self.events
                    .publish(Event::OptionAdded {
                        name: name.to_string(),
                        value,
                    })
                    .await;
                Ok(true)
            }
            Some(old_value) => {
                let result = option_record::Entity::update_many()
                    .col_expr(
                        option_record::Column::Value,
                        Expr::value(serialize_option_value(&value)),
                    )
                    .filter(option_record::Column::Name.eq(name))
                    .exec(&self.db)
                    .await
                    .map_err(|e| {
                        KurzError::database_operation(format!(
                            "Failed to update option '{}': {}",
                            name, e
                        ))
                    })?;

                if result.rows_affected != 1 {
                    return Ok(false);
                }

                self.cache.store(name.to_string(), Some(value.clone()));
                self.events
                    .publish(Event::OptionUpdated {
                        name: name.to_string(),
                        old_value: Some(old_value),
                        new_value: value,
                    })
                    .await;
                Ok(true)
            }
        }
    }

    /// Remove an option. `false` when it did not exist.
    pub async fn delete(&self, name: &str) -> Result<bool> {
        let existing = option_record::Entity::find_by_id(name)
            .one(&self.db)
            .await
            .map_err(|e| {
                KurzError::database_operation(format!("Failed to load option '{}': {}", name, e))
            })?;

        if existing.is_none() {
            return Ok(false);
        }

        option_record::Entity::delete_by_id(name)
            .exec(&self.db)
            .await
            .map_err(|e| {
                KurzError::database_operation(format!(
                    "Failed to delete option '{}': {}",
                    name, e
                ))
            })?;

        self.cache.store(name.to_string(), None);
        self.events
            .publish(Event::OptionDeleted {
                name: name.to_string(),
            })
            .await;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_pass_through_serialization() {
        let value = OptionValue::scalar("42");
        let text = serialize_option_value(&value);
        assert_eq!(text, "42");
        assert_eq!(deserialize_option_value(&text), value);
    }

    #[test]
    fn composites_round_trip_as_json() {
        let value = OptionValue::Composite(serde_json::json!({"a": 1, "b": ["x", "y"]}));
        let text = serialize_option_value(&value);
        assert_eq!(deserialize_option_value(&text), value);
    }

    #[test]
    fn malformed_json_stays_scalar() {
        assert_eq!(
            deserialize_option_value("{not json"),
            OptionValue::Scalar("{not json".to_string())
        );
        assert_eq!(
            deserialize_option_value("plain text"),
            OptionValue::Scalar("plain text".to_string())
        );
    }

    #[test]
    fn numeric_scalars_parse() {
        assert_eq!(OptionValue::scalar("123").as_u64(), Some(123));
        assert_eq!(OptionValue::scalar("abc").as_u64(), None);
        assert_eq!(
            OptionValue::Composite(serde_json::json!([1])).as_u64(),
            None
        );
    }
}

//! Per-process lookup caches.
//!
//! Both stores keep a process-local cache of decoded records, including
//! negative entries so a repeated miss never reaches the database. The
//! caches are not coherent across processes; a caller that needs a fresh
//! view bypasses them explicitly.

use dashmap::DashMap;

/// Outcome of a cache probe.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheResult<T> {
    /// Key not seen before.
    Miss,
    /// Key known to have no backing record.
    NegativeHit,
    /// Cached record.
    Hit(T),
}

/// Keyed cache with explicit negative entries.
#[derive(Debug)]
pub struct InfoCache<T> {
    inner: DashMap<String, Option<T>>,
}

impl<T: Clone> InfoCache<T> {
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> CacheResult<T> {
        match self.inner.get(key) {
            Some(entry) => match entry.value() {
                Some(value) => CacheResult::Hit(value.clone()),
                None => CacheResult::NegativeHit,
            },
            None => CacheResult::Miss,
        }
    }

    /// Record a lookup result; `None` stores a negative entry.
    pub fn store(&self, key: String, value: Option<T>) {
        self.inner.insert(key, value);
    }

    pub fn invalidate(&self, key: &str) {
        self.inner.remove(key);
    }

    pub fn clear(&self) {
        self.inner.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<T: Clone> Default for InfoCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_negative_and_hit() {
        let cache: InfoCache<u32> = InfoCache::new();
        assert_eq!(cache.get("a"), CacheResult::Miss);

        cache.store("a".into(), None);
        assert_eq!(cache.get("a"), CacheResult::NegativeHit);

        cache.store("a".into(), Some(7));
        assert_eq!(cache.get("a"), CacheResult::Hit(7));

        cache.invalidate("a");
        assert_eq!(cache.get("a"), CacheResult::Miss);
    }
}

//! Principal (decision) cache.
//!
//! Maps decision keys to previously authorized principals with a per-entry
//! TTL. Reads treat expired entries as misses; eviction itself happens on
//! the periodic sweep so the expiry hook runs exactly once per entry.

use std::sync::Arc;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::principal::Principal;

/// Callback invoked once per evicted entry, with the entry's key and
/// principal. Must not block; it runs on the sweeper's task.
pub type ExpiredHook = Box<dyn Fn(&str, &Principal) + Send + Sync>;

struct CacheEntry {
    principal: Arc<Principal>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// TTL'd mapping from decision key to [`Principal`].
///
/// Concurrent reads are lock-free (sharded map); writers serialize per
/// key. The container's own [`size`](Self::size) is a structural estimate
/// that excludes key and principal payloads, which are accounted
/// separately by the engine through the expiry hook.
pub struct PrincipalCache {
    entries: DashMap<String, CacheEntry>,
    expired_hook: RwLock<Option<ExpiredHook>>,
}

impl PrincipalCache {
    /// Create an empty cache with no expiry hook.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            expired_hook: RwLock::new(None),
        }
    }

    /// Register the hook invoked on every eviction.
    pub fn set_expired_hook(&self, hook: ExpiredHook) {
        *self.expired_hook.write().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(hook);
    }

    /// Look up a live entry. Expired entries count as misses.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Arc<Principal>> {
        let entry = self.entries.get(key)?;
        if entry.is_expired(Instant::now()) {
            return None;
        }
        Some(Arc::clone(&entry.principal))
    }

    /// Insert or overwrite an entry with the given TTL.
    ///
    /// Overwriting a live entry does not fire the expiry hook; the hook is
    /// eviction-only.
    pub fn set_with_expire(&self, key: String, principal: Arc<Principal>, ttl: Duration) {
        self.entries.insert(
            key,
            CacheEntry {
                principal,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Remove every expired entry, invoking the expiry hook for each.
    pub fn evict_expired(&self) {
        let now = Instant::now();
        let dead: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.value().is_expired(now))
            .map(|e| e.key().clone())
            .collect();

        for key in dead {
            // Re-check under the entry lock: a writer may have refreshed it.
            if let Some((key, entry)) = self.entries.remove_if(&key, |_, e| e.is_expired(now)) {
                self.run_hook(&key, &entry.principal);
            }
        }
    }

    /// Remove every entry, expired or not, invoking the expiry hook for each.
    pub fn clear(&self) {
        let keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        for key in keys {
            if let Some((key, entry)) = self.entries.remove(&key) {
                self.run_hook(&key, &entry.principal);
            }
        }
    }

    /// Number of entries, including expired ones not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Structural byte estimate of the container: per-entry bookkeeping
    /// only, excluding key and principal payloads.
    #[must_use]
    pub fn size(&self) -> i64 {
        let per_entry =
            std::mem::size_of::<String>() + std::mem::size_of::<CacheEntry>();
        (self.entries.len() * per_entry) as i64
    }

    fn run_hook(&self, key: &str, principal: &Principal) {
        let guard = self
            .expired_hook
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(hook) = guard.as_ref() {
            hook(key, principal);
        }
    }
}

impl Default for PrincipalCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI64, Ordering};

    use super::*;
    use crate::principal::{principal_cache_footprint, TokenPrincipal};

    fn principal(name: &str) -> Arc<Principal> {
        Arc::new(Principal::RoleToken(TokenPrincipal {
            name: name.to_string(),
            domain: "coretech".to_string(),
            roles: vec!["readers".to_string()],
            issue_time: 0,
            expiry_time: 0,
            authorized_roles: vec!["readers".to_string()],
        }))
    }

    #[test]
    fn test_get_returns_live_entries() {
        let cache = PrincipalCache::new();
        cache.set_with_expire("k".to_string(), principal("alice"), Duration::from_secs(60));

        let hit = cache.get("k").unwrap();
        assert_eq!(hit.name(), "alice");
        assert!(cache.get("missing").is_none());
    }

    #[test]
    fn test_expired_entry_is_a_miss_until_swept() {
        let cache = PrincipalCache::new();
        cache.set_with_expire("k".to_string(), principal("alice"), Duration::ZERO);

        assert!(cache.get("k").is_none());
        assert_eq!(cache.len(), 1);

        cache.evict_expired();
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_sweep_keeps_live_entries() {
        let cache = PrincipalCache::new();
        cache.set_with_expire("dead".to_string(), principal("a"), Duration::ZERO);
        cache.set_with_expire("live".to_string(), principal("b"), Duration::from_secs(60));

        cache.evict_expired();

        assert_eq!(cache.len(), 1);
        assert!(cache.get("live").is_some());
    }

    #[test]
    fn test_byte_accounting_round_trip() {
        let usage = Arc::new(AtomicI64::new(0));
        let cache = PrincipalCache::new();
        {
            let usage = Arc::clone(&usage);
            cache.set_expired_hook(Box::new(move |key, p| {
                usage.fetch_sub(principal_cache_footprint(key, p), Ordering::Relaxed);
            }));
        }

        for i in 0..10 {
            let key = format!("key-{i}");
            let p = principal("alice");
            usage.fetch_add(principal_cache_footprint(&key, &p), Ordering::Relaxed);
            cache.set_with_expire(key, p, Duration::ZERO);
        }
        assert!(usage.load(Ordering::Relaxed) > 0);

        cache.evict_expired();
        assert_eq!(usage.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_clear_runs_hook_for_live_entries() {
        let evicted = Arc::new(AtomicI64::new(0));
        let cache = PrincipalCache::new();
        {
            let evicted = Arc::clone(&evicted);
            cache.set_expired_hook(Box::new(move |_, _| {
                evicted.fetch_add(1, Ordering::Relaxed);
            }));
        }

        cache.set_with_expire("a".to_string(), principal("a"), Duration::from_secs(60));
        cache.set_with_expire("b".to_string(), principal("b"), Duration::from_secs(60));
        cache.clear();

        assert_eq!(evicted.load(Ordering::Relaxed), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_size_is_structural_only() {
        let cache = PrincipalCache::new();
        assert_eq!(cache.size(), 0);

        cache.set_with_expire("short".to_string(), principal("a"), Duration::from_secs(60));
        let one = cache.size();
        cache.set_with_expire(
            "a-considerably-longer-key-with-the-same-structure".to_string(),
            principal("a"),
            Duration::from_secs(60),
        );

        // Two entries cost exactly twice one entry: payload lengths are
        // excluded from the structural estimate.
        assert_eq!(cache.size(), 2 * one);
    }
}

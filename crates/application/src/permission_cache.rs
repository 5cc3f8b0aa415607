use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use caseflow_core::Principal;

use crate::PermissionSet;

/// Default time-to-live for cached permission sets.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);

struct CachedSet {
    stored_at: Instant,
    permissions: PermissionSet,
}

/// Per-principal cache of resolved permission sets with a short TTL.
///
/// Reads are lock-free of I/O and safe under concurrency; invalidation is a
/// delete-by-key, so the staleness window for writers that bypass
/// invalidation is bounded by the TTL. A poisoned lock degrades to cache
/// misses rather than failing permission checks.
pub struct PermissionCache {
    ttl: Duration,
    entries: RwLock<HashMap<Principal, CachedSet>>,
}

impl PermissionCache {
    /// Creates a cache with the given time-to-live.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached set for a principal while the entry is fresh.
    #[must_use]
    pub fn get(&self, principal: &Principal) -> Option<PermissionSet> {
        let entries = self.entries.read().ok()?;
        let cached = entries.get(principal)?;
        if cached.stored_at.elapsed() > self.ttl {
            return None;
        }

        Some(cached.permissions.clone())
    }

    /// Stores a freshly resolved set for a principal.
    pub fn store(&self, principal: Principal, permissions: PermissionSet) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(
                principal,
                CachedSet {
                    stored_at: Instant::now(),
                    permissions,
                },
            );
        }
    }

    /// Drops the cached set for one principal.
    pub fn invalidate(&self, principal: &Principal) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(principal);
        }
    }

    /// Drops the cached set for an authenticated subject.
    pub fn invalidate_subject(&self, subject: &str) {
        self.invalidate(&Principal::user(subject));
    }

    /// Drops every cached set; used when a write may affect any principal.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }
}

impl Default for PermissionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use caseflow_core::Principal;

    use crate::PermissionSet;

    use super::PermissionCache;

    fn set_of(names: &[&str]) -> PermissionSet {
        PermissionSet::from_names(names.iter().map(|name| (*name).to_owned()))
    }

    #[test]
    fn fresh_entries_are_served() {
        let cache = PermissionCache::default();
        cache.store(Principal::user("alice"), set_of(&["cases:read"]));

        let cached = cache.get(&Principal::user("alice"));
        assert!(matches!(&cached, Some(set) if set.contains("cases:read")));
    }

    #[test]
    fn expired_entries_are_misses() {
        let cache = PermissionCache::new(Duration::ZERO);
        cache.store(Principal::user("alice"), set_of(&["cases:read"]));

        std::thread::sleep(Duration::from_millis(2));
        assert!(cache.get(&Principal::user("alice")).is_none());
    }

    #[test]
    fn invalidation_targets_one_principal() {
        let cache = PermissionCache::default();
        cache.store(Principal::user("alice"), set_of(&["cases:read"]));
        cache.store(Principal::Visitor, set_of(&["pages:read"]));

        cache.invalidate_subject("alice");
        assert!(cache.get(&Principal::user("alice")).is_none());
        assert!(cache.get(&Principal::Visitor).is_some());
    }

    #[test]
    fn clear_drops_everything() {
        let cache = PermissionCache::default();
        cache.store(Principal::user("alice"), set_of(&["cases:read"]));
        cache.store(Principal::Visitor, set_of(&["pages:read"]));

        cache.clear();
        assert!(cache.get(&Principal::user("alice")).is_none());
        assert!(cache.get(&Principal::Visitor).is_none());
    }
}

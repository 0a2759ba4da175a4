//! Verdict caching.
//!
//! In-memory caching of per-domain verdicts keyed by the input text pair,
//! so repeated evaluations of identical inputs skip the model call. Batch
//! runs over datasets frequently contain duplicate reference texts.

use moka::future::Cache;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use medeval_core::{Domain, DomainVerdict};

/// Cache key: one domain judgment over one text pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VerdictKey {
    domain: Domain,
    original_hash: u64,
    transcribed_hash: u64,
}

impl VerdictKey {
    pub fn new(domain: Domain, original_text: &str, transcribed_text: &str) -> Self {
        Self {
            domain,
            original_hash: hash_text(original_text),
            transcribed_hash: hash_text(transcribed_text),
        }
    }
}

/// Verdict cache using moka.
pub struct VerdictCache {
    cache: Cache<VerdictKey, DomainVerdict>,
}

impl VerdictCache {
    /// Create a cache with the given capacity and entry lifetime.
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    /// Get a cached verdict.
    pub async fn get(&self, key: &VerdictKey) -> Option<DomainVerdict> {
        self.cache.get(key).await
    }

    /// Store a verdict.
    pub async fn insert(&self, key: VerdictKey, verdict: DomainVerdict) {
        self.cache.insert(key, verdict).await;
    }

    /// Drop all cached verdicts.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Number of cached entries.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for VerdictCache {
    fn default() -> Self {
        Self::new(10_000, Duration::from_secs(3600))
    }
}

fn hash_text(text: &str) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use medeval_core::Severity;

    #[tokio::test]
    async fn cache_round_trip() {
        let cache = VerdictCache::default();
        let key = VerdictKey::new(Domain::Medication, "texto original", "texto transcrito");

        assert!(cache.get(&key).await.is_none());

        let verdict = DomainVerdict::new(Severity::Minor, "variante ortográfica");
        cache.insert(key.clone(), verdict.clone()).await;

        assert_eq!(cache.get(&key).await, Some(verdict));
    }

    #[tokio::test]
    async fn invalidate_all_empties_the_cache() {
        let cache = VerdictCache::new(100, Duration::from_secs(60));
        for domain in Domain::ALL {
            let key = VerdictKey::new(domain, "texto original", "texto transcrito");
            cache.insert(key, DomainVerdict::clean()).await;
        }
        cache.cache.run_pending_tasks().await;
        assert_eq!(cache.entry_count(), 3);

        cache.invalidate_all();
        cache.cache.run_pending_tasks().await;
        assert_eq!(cache.entry_count(), 0);

        let key = VerdictKey::new(Domain::Medication, "texto original", "texto transcrito");
        assert!(cache.get(&key).await.is_none());
    }

    #[test]
    fn keys_distinguish_domain_and_texts() {
        let a = VerdictKey::new(Domain::Medication, "x", "y");
        let b = VerdictKey::new(Domain::Dosage, "x", "y");
        let c = VerdictKey::new(Domain::Medication, "x", "z");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }
}

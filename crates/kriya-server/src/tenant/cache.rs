//! Time-bounded caches with an injectable clock.
//!
//! Entries are replaced on write and dropped only by explicit invalidation;
//! an entry older than the TTL is ignored on read and overwritten by the next
//! lookup.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use kriya_core::StoreIdentifier;
use kriya_db::{DbError, StoreRow};
use sqlx::PgPool;
use tokio::sync::RwLock;

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

pub struct TtlCache<V> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<String, Entry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the value under `key` if it was stored less than one TTL ago.
    pub async fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        let age = self.clock.now().saturating_duration_since(entry.stored_at);
        (age < self.ttl).then(|| entry.value.clone())
    }

    pub async fn insert(&self, key: String, value: V) {
        let stored_at = self.clock.now();
        self.entries
            .write()
            .await
            .insert(key, Entry { value, stored_at });
    }

    pub async fn remove(&self, key: &str) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

/// Active store looked up for a request; `None` is cached as well so unknown
/// hosts do not hit the database on every request.
pub type CachedTenant = Option<Arc<StoreRow>>;

pub struct TenantCache {
    entries: TtlCache<CachedTenant>,
}

impl TenantCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: TtlCache::new(ttl, clock),
        }
    }

    /// Resolves `identifier` through the cache, calling `lookup` on a miss.
    ///
    /// `Demo` never reaches the cache. A failed lookup is logged and reported
    /// as `None` without being stored.
    pub async fn resolve_with<F, Fut>(&self, identifier: &StoreIdentifier, lookup: F) -> CachedTenant
    where
        F: FnOnce(StoreIdentifier) -> Fut,
        Fut: Future<Output = Result<Option<StoreRow>, DbError>>,
    {
        if *identifier == StoreIdentifier::Demo {
            return None;
        }

        let key = identifier.cache_key();
        if let Some(hit) = self.entries.get(&key).await {
            return hit;
        }

        match lookup(identifier.clone()).await {
            Ok(found) => {
                let found = found.map(Arc::new);
                self.entries.insert(key, found.clone()).await;
                found
            }
            Err(e) => {
                tracing::error!(tenant = %identifier, error = %e, "tenant lookup failed");
                None
            }
        }
    }

    /// Resolves against the `stores` table, active stores only.
    pub async fn resolve(&self, identifier: &StoreIdentifier, pool: &PgPool) -> CachedTenant {
        self.resolve_with(identifier, |id| async move {
            match id {
                StoreIdentifier::Slug(slug) => kriya_db::get_active_store_by_slug(pool, &slug).await,
                StoreIdentifier::Domain(domain) => {
                    kriya_db::get_active_store_by_domain(pool, &domain).await
                }
                StoreIdentifier::Demo => Ok(None),
            }
        })
        .await
    }

    pub async fn invalidate_slug(&self, slug: &str) {
        self.entries
            .remove(&StoreIdentifier::Slug(slug.to_owned()).cache_key())
            .await;
    }

    pub async fn invalidate_domain(&self, domain: &str) {
        self.entries
            .remove(&StoreIdentifier::Domain(domain.to_owned()).cache_key())
            .await;
    }

    /// Drops both entries a store can be cached under.
    pub async fn invalidate_store(&self, store: &StoreRow) {
        self.invalidate_slug(&store.slug).await;
        if let Some(domain) = store.custom_domain.as_deref() {
            self.invalidate_domain(domain).await;
        }
    }

    pub async fn clear(&self) {
        self.entries.clear().await;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    pub(crate) struct MockClock {
        now: Mutex<Instant>,
    }

    impl MockClock {
        pub(crate) fn new() -> Arc<Self> {
            Arc::new(Self {
                now: Mutex::new(Instant::now()),
            })
        }

        pub(crate) fn advance(&self, by: Duration) {
            *self.now.lock().unwrap() += by;
        }
    }

    impl Clock for MockClock {
        fn now(&self) -> Instant {
            *self.now.lock().unwrap()
        }
    }

    fn store(slug: &str, name: &str) -> StoreRow {
        let now = Utc::now();
        StoreRow {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: name.to_owned(),
            slug: slug.to_owned(),
            custom_domain: Some("shop.acme.test".to_owned()),
            tagline: None,
            logo_url: None,
            theme: "neon".to_owned(),
            currency: "USD".to_owned(),
            currency_symbol: "$".to_owned(),
            announcement: None,
            instagram_url: None,
            twitter_url: None,
            tiktok_url: None,
            google_sheet_id: None,
            google_sheet_last_sync: None,
            is_active: true,
            plan: "free".to_owned(),
            settings: serde_json::json!({}),
            created_at: now,
            updated_at: now,
        }
    }

    fn acme() -> StoreIdentifier {
        StoreIdentifier::Slug("acme".to_owned())
    }

    async fn resolve_counting(
        cache: &TenantCache,
        id: &StoreIdentifier,
        calls: &AtomicU32,
        name: &str,
    ) -> CachedTenant {
        cache
            .resolve_with(id, |_| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Some(store("acme", name)))
            })
            .await
    }

    #[tokio::test]
    async fn second_resolution_within_ttl_hits_cache() {
        let clock = MockClock::new();
        let cache = TenantCache::new(Duration::from_secs(60), clock.clone());
        let calls = AtomicU32::new(0);

        let first = resolve_counting(&cache, &acme(), &calls, "Acme").await;
        clock.advance(Duration::from_secs(59));
        let second = resolve_counting(&cache, &acme(), &calls, "Acme").await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.unwrap().id, second.unwrap().id);
    }

    #[tokio::test]
    async fn expired_entry_is_refetched() {
        let clock = MockClock::new();
        let cache = TenantCache::new(Duration::from_secs(60), clock.clone());
        let calls = AtomicU32::new(0);

        resolve_counting(&cache, &acme(), &calls, "Acme").await;
        clock.advance(Duration::from_secs(60));
        let renamed = resolve_counting(&cache, &acme(), &calls, "Acme Renamed").await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(renamed.unwrap().name, "Acme Renamed");
    }

    #[tokio::test]
    async fn missing_store_is_cached() {
        let cache = TenantCache::new(Duration::from_secs(60), MockClock::new());
        let calls = AtomicU32::new(0);
        let ghost = StoreIdentifier::Slug("ghost".to_owned());

        for _ in 0..3 {
            let calls = &calls;
            let found = cache
                .resolve_with(&ghost, |_| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(None)
                })
                .await;
            assert!(found.is_none());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn lookup_errors_are_not_cached() {
        let cache = TenantCache::new(Duration::from_secs(60), MockClock::new());
        let calls = AtomicU32::new(0);

        let calls_ref = &calls;
        let failed = cache
            .resolve_with(&acme(), |_| async move {
                calls_ref.fetch_add(1, Ordering::SeqCst);
                Err(DbError::NotFound)
            })
            .await;
        assert!(failed.is_none());

        let recovered = resolve_counting(&cache, &acme(), &calls, "Acme").await;
        assert!(recovered.is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn demo_bypasses_lookup() {
        let cache = TenantCache::new(Duration::from_secs(60), MockClock::new());
        let calls = AtomicU32::new(0);

        let found = resolve_counting(&cache, &StoreIdentifier::Demo, &calls, "x").await;

        assert!(found.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalidation_forces_refetch() {
        let cache = TenantCache::new(Duration::from_secs(60), MockClock::new());
        let calls = AtomicU32::new(0);
        let domain = StoreIdentifier::Domain("shop.acme.test".to_owned());

        let row = resolve_counting(&cache, &acme(), &calls, "Acme").await.unwrap();
        resolve_counting(&cache, &domain, &calls, "Acme").await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        cache.invalidate_store(&row).await;
        resolve_counting(&cache, &acme(), &calls, "Acme").await;
        resolve_counting(&cache, &domain, &calls, "Acme").await;
        assert_eq!(calls.load(Ordering::SeqCst), 4);

        cache.clear().await;
        resolve_counting(&cache, &acme(), &calls, "Acme").await;
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }
}

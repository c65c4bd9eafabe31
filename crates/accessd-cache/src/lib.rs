//! # Accessd Cache - Snapshot Cache
//!
//! Bounded, expiring storage for computed authorization snapshots keyed by identity
//! fingerprint.
//!
//! - **Capacity**: at most `max_capacity` snapshots; the least-recently-used entry is evicted
//!   first.
//! - **TTL**: every entry carries its own time-to-live. Expiry is checked against an
//!   injectable [`Clock`] on every read, so an expired entry is never served.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use accessd_types::{AccessSet, Fingerprint};
use async_trait::async_trait;
use moka::{
    Expiry,
    future::Cache,
    notification::RemovalCause,
    ops::compute::Op,
    policy::EvictionPolicy,
};

pub mod clock;

pub use clock::{Clock, SystemClock};

/// Default number of cached snapshots
pub const DEFAULT_CACHE_CAPACITY: u64 = 50;

/// Default snapshot time-to-live (24 hours)
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Storage for computed snapshots.
///
/// Implementations are shared between concurrent callers and synchronize internally.
#[async_trait]
pub trait SnapshotCache: Send + Sync {
    /// Fetch a live snapshot; expired entries are reported as absent
    async fn get(&self, key: &Fingerprint) -> Option<Arc<AccessSet>>;

    /// Like [`SnapshotCache::get`], but leaves hit and miss counters untouched
    async fn peek(&self, key: &Fingerprint) -> Option<Arc<AccessSet>>;

    /// Store a snapshot, replacing any previous entry for `key`
    async fn insert(&self, key: Fingerprint, snapshot: Arc<AccessSet>, ttl: Duration);

    /// Drop the entry for `key`; a missing key is not an error
    async fn remove(&self, key: &Fingerprint);

    /// Drop every entry
    async fn clear(&self);

    fn stats(&self) -> CacheStats;
}

#[derive(Debug, Clone)]
struct CachedSnapshot {
    snapshot: Arc<AccessSet>,
    /// `None` when `now + ttl` does not fit in an `Instant`
    expires_at: Option<Instant>,
    ttl: Duration,
}

impl CachedSnapshot {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// Longest expiry handed to moka; longer TTLs still hold through the clock check on read
const MAX_ENTRY_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Hands each entry's own TTL to moka so entries also leave the cache on their own
struct SnapshotExpiry;

impl Expiry<Fingerprint, CachedSnapshot> for SnapshotExpiry {
    fn expire_after_create(
        &self,
        _key: &Fingerprint,
        value: &CachedSnapshot,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl.min(MAX_ENTRY_TTL))
    }

    fn expire_after_update(
        &self,
        _key: &Fingerprint,
        value: &CachedSnapshot,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl.min(MAX_ENTRY_TTL))
    }
}

/// LRU cache with per-entry expiry, backed by moka
pub struct LruExpireCache {
    cache: Cache<Fingerprint, CachedSnapshot>,
    clock: Arc<dyn Clock>,
    max_capacity: u64,
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    expirations: AtomicU64,
    evictions: Arc<AtomicU64>,
}

impl LruExpireCache {
    pub fn new(max_capacity: u64) -> Self {
        Self::with_clock(max_capacity, Arc::new(SystemClock))
    }

    pub fn with_clock(max_capacity: u64, clock: Arc<dyn Clock>) -> Self {
        let evictions = Arc::new(AtomicU64::new(0));
        let listener_evictions = Arc::clone(&evictions);

        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .eviction_policy(EvictionPolicy::lru())
            .expire_after(SnapshotExpiry)
            .eviction_listener(move |key: Arc<Fingerprint>, _value, cause| {
                if matches!(cause, RemovalCause::Size) {
                    listener_evictions.fetch_add(1, Ordering::Relaxed);
                    accessd_observe::metrics::record_cache_eviction();
                    tracing::debug!(fingerprint = %key, "Evicted least recently used snapshot");
                }
            })
            .build();

        Self {
            cache,
            clock,
            max_capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            inserts: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
            evictions,
        }
    }

    pub fn max_capacity(&self) -> u64 {
        self.max_capacity
    }

    /// Current entry count.
    ///
    /// Eventually consistent; call [`LruExpireCache::sync`] first for an exact figure.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Apply pending evictions and invalidations
    pub async fn sync(&self) {
        self.cache.run_pending_tasks().await;
    }

    /// Reset hit/miss counters
    pub fn reset_stats(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.inserts.store(0, Ordering::Relaxed);
        self.expirations.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
    }

    /// Remove `key` only if it is still expired, so a concurrent fresh insert survives
    async fn remove_if_expired(&self, key: &Fingerprint) {
        let now = self.clock.now();
        self.cache
            .entry_by_ref(key)
            .and_compute_with(|entry| {
                let op = match entry {
                    Some(entry) if entry.value().is_expired(now) => Op::Remove,
                    _ => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;
    }
}

impl Default for LruExpireCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

#[async_trait]
impl SnapshotCache for LruExpireCache {
    async fn get(&self, key: &Fingerprint) -> Option<Arc<AccessSet>> {
        match self.cache.get(key).await {
            Some(entry) if !entry.is_expired(self.clock.now()) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.snapshot)
            },
            Some(_) => {
                self.expirations.fetch_add(1, Ordering::Relaxed);
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(fingerprint = %key, "Cached snapshot expired");
                self.remove_if_expired(key).await;
                None
            },
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            },
        }
    }

    async fn peek(&self, key: &Fingerprint) -> Option<Arc<AccessSet>> {
        let entry = self.cache.get(key).await?;
        (!entry.is_expired(self.clock.now())).then_some(entry.snapshot)
    }

    async fn insert(&self, key: Fingerprint, snapshot: Arc<AccessSet>, ttl: Duration) {
        let expires_at = self.clock.now().checked_add(ttl);
        self.cache.insert(key, CachedSnapshot { snapshot, expires_at, ttl }).await;
        self.inserts.fetch_add(1, Ordering::Relaxed);

        // Enforce the capacity bound before returning
        self.cache.run_pending_tasks().await;
        accessd_observe::metrics::update_cache_entries(self.cache.entry_count());
    }

    async fn remove(&self, key: &Fingerprint) {
        self.cache.invalidate(key).await;
    }

    async fn clear(&self) {
        let count = self.cache.entry_count();
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        tracing::debug!(cached_snapshots = count, "Cleared snapshot cache");
    }

    fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 { (hits as f64 / total as f64) * 100.0 } else { 0.0 };

        CacheStats {
            entry_count: self.cache.entry_count(),
            max_capacity: self.max_capacity,
            hits,
            misses,
            hit_rate,
            inserts: self.inserts.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    pub entry_count: u64,
    pub max_capacity: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub inserts: u64,
    /// Reads that found an entry past its TTL
    pub expirations: u64,
    /// Entries dropped to stay within capacity
    pub evictions: u64,
}

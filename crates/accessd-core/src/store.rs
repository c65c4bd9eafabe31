//! The access store: cached, deduplicated snapshot computation per identity

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use accessd_cache::{
    CacheStats, Clock, DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL, LruExpireCache, SnapshotCache,
    SystemClock,
};
use accessd_config::CacheConfig;
use accessd_observe::metrics;
use accessd_types::{
    AccessError, AccessResult, AccessSet, Fingerprint, Identity, PolicyIndex, UserInfo,
};
use async_trait::async_trait;
use bon::Builder;
use tracing::{debug, info, instrument, warn};

use crate::{
    resolver::PolicyResolver,
    single_flight::{Flight, SingleFlight},
};

/// Read side of the store as seen by request handlers
#[async_trait]
pub trait AccessSetLookup: Send + Sync {
    /// Snapshot of everything `user` may do
    async fn access_for(&self, user: &UserInfo) -> AccessResult<Arc<AccessSet>>;

    /// Forget the cached snapshot for `id` so the next lookup recomputes it
    async fn purge_user_data(&self, id: &Fingerprint);
}

/// Construction options for [`AccessStore`]
#[derive(Debug, Clone, Builder)]
pub struct StoreOptions {
    /// Cache snapshots; when false every lookup recomputes
    #[builder(default = true)]
    pub cache_results: bool,

    #[builder(default = DEFAULT_CACHE_CAPACITY)]
    pub max_capacity: u64,

    #[builder(default = DEFAULT_CACHE_TTL)]
    pub ttl: Duration,

    /// Time source for snapshot expiry
    #[builder(default = system_clock())]
    pub clock: Arc<dyn Clock>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl From<&CacheConfig> for StoreOptions {
    fn from(config: &CacheConfig) -> Self {
        Self::builder()
            .cache_results(config.enabled)
            .max_capacity(config.max_capacity)
            .ttl(config.ttl())
            .build()
    }
}

fn system_clock() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}

/// Everything that only exists while caching is enabled
struct CacheLayer {
    cache: Arc<dyn SnapshotCache>,
    ttl: Duration,
    flights: SingleFlight<Fingerprint, Arc<AccessSet>, AccessError>,
}

/// Computes authorization snapshots from the policy indexes and caches them per identity.
///
/// Concurrent lookups for the same identity share a single computation. Snapshots live
/// until their TTL passes, they are pushed out by capacity, or they are purged.
pub struct AccessStore {
    resolver: PolicyResolver,
    cache: Option<CacheLayer>,
}

impl AccessStore {
    pub fn new(
        users: Arc<dyn PolicyIndex>,
        groups: Arc<dyn PolicyIndex>,
        options: StoreOptions,
    ) -> Self {
        let cache = options.cache_results.then(|| {
            let cache: Arc<dyn SnapshotCache> =
                Arc::new(LruExpireCache::with_clock(options.max_capacity, options.clock));
            CacheLayer { cache, ttl: options.ttl, flights: SingleFlight::new() }
        });

        Self { resolver: PolicyResolver::new(users, groups), cache }
    }

    /// Store caching into a caller-provided [`SnapshotCache`]
    pub fn with_cache(
        users: Arc<dyn PolicyIndex>,
        groups: Arc<dyn PolicyIndex>,
        cache: Arc<dyn SnapshotCache>,
        ttl: Duration,
    ) -> Self {
        Self {
            resolver: PolicyResolver::new(users, groups),
            cache: Some(CacheLayer { cache, ttl, flights: SingleFlight::new() }),
        }
    }

    pub fn from_config(
        config: &CacheConfig,
        users: Arc<dyn PolicyIndex>,
        groups: Arc<dyn PolicyIndex>,
    ) -> Self {
        Self::new(users, groups, StoreOptions::from(config))
    }

    pub fn caching_enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// Key under which the snapshot for `user` is cached
    pub fn fingerprint_for(user: &UserInfo) -> Fingerprint {
        Identity::normalize(user).fingerprint()
    }

    pub async fn access_for(&self, user: &UserInfo) -> AccessResult<Arc<AccessSet>> {
        let identity = Identity::normalize(user);

        let Some(layer) = &self.cache else {
            return self.compute(&identity).await.map(Arc::new);
        };

        let key = identity.fingerprint();
        if let Some(snapshot) = layer.cache.get(&key).await {
            metrics::record_cache_hit(true);
            debug!(user = %identity.name(), fingerprint = %key, "Snapshot cache hit");
            return Ok(snapshot);
        }
        metrics::record_cache_hit(false);
        debug!(user = %identity.name(), fingerprint = %key, "Snapshot cache miss");

        let identity = &identity;
        let fingerprint = &key;
        let Flight { result, shared } = layer
            .flights
            .run_once(key.clone(), move || async move {
                // A flight that finished between our miss and joining may have stored it.
                // The miss above is already counted.
                if let Some(snapshot) = layer.cache.peek(fingerprint).await {
                    return Ok(snapshot);
                }

                let mut snapshot = self.compute(identity).await?;
                snapshot.id = Some(fingerprint.clone());
                let snapshot = Arc::new(snapshot);
                layer.cache.insert(fingerprint.clone(), Arc::clone(&snapshot), layer.ttl).await;
                Ok(snapshot)
            })
            .await;

        if shared {
            metrics::record_coalesced_request();
            debug!(fingerprint = %key, "Joined in-flight snapshot computation");
        }
        result
    }

    /// Remove the cached snapshot for `id`.
    ///
    /// A computation already running for `id` is not cancelled and may store its result
    /// afterwards. Without caching this does nothing.
    pub async fn purge_user_data(&self, id: &Fingerprint) {
        let Some(layer) = &self.cache else {
            debug!(fingerprint = %id, "Caching disabled, nothing to purge");
            return;
        };

        layer.cache.remove(id).await;
        metrics::record_purge("entry");
        debug!(fingerprint = %id, "Purged cached snapshot");
    }

    /// Remove every cached snapshot, e.g. after role definitions changed
    pub async fn purge_all(&self) {
        let Some(layer) = &self.cache else {
            return;
        };

        layer.cache.clear().await;
        metrics::record_purge("all");
        info!("Purged all cached snapshots");
    }

    /// Cache statistics, `None` when caching is disabled
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|layer| layer.cache.stats())
    }

    /// Snapshot computations currently running
    pub fn in_flight(&self) -> usize {
        self.cache.as_ref().map_or(0, |layer| layer.flights.in_flight())
    }

    #[instrument(
        skip(self, identity),
        fields(user = %identity.name(), groups = identity.groups().len())
    )]
    async fn compute(&self, identity: &Identity) -> AccessResult<AccessSet> {
        let start = Instant::now();

        let grants = match self.resolver.resolve(identity).await {
            Ok(grants) => grants,
            Err(e) => {
                warn!(subject = %e.subject(), error = %e, "Failed to resolve grants");
                metrics::record_resolution_failure("unavailable");
                return Err(e);
            },
        };

        let snapshot = grants.to_access_set();
        let elapsed = start.elapsed();
        metrics::record_snapshot_computed(elapsed.as_secs_f64(), grants.subjects());
        debug!(
            grants = snapshot.len(),
            duration_ms = elapsed.as_millis() as u64,
            "Computed access snapshot"
        );

        Ok(snapshot)
    }
}

#[async_trait]
impl AccessSetLookup for AccessStore {
    async fn access_for(&self, user: &UserInfo) -> AccessResult<Arc<AccessSet>> {
        AccessStore::access_for(self, user).await
    }

    async fn purge_user_data(&self, id: &Fingerprint) {
        AccessStore::purge_user_data(self, id).await
    }
}

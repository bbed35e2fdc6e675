// Keyed cache over the marketplace API. Concurrent readers of the same
// QueryKey coalesce onto a single in-flight request; mutations mark related
// keys stale so the next read refetches instead of trusting local state.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::ApiError;
use crate::filters::VehicleFilters;
use crate::models::{Pagination, Vehicle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Vehicles,
    VehicleDetail,
    Featured,
    Favorites,
    FavoriteCheck,
}

impl Resource {
    /// Maximum age before a cached result must be refetched on next access.
    /// Favorites change from the current user's own actions, so they go
    /// stale much sooner than catalog data.
    pub fn stale_after(self) -> Duration {
        match self {
            Resource::Vehicles | Resource::VehicleDetail => Duration::from_secs(2 * 60),
            Resource::Featured => Duration::from_secs(5 * 60),
            Resource::Favorites => Duration::from_secs(60),
            Resource::FavoriteCheck => Duration::from_secs(30),
        }
    }

    /// How long an unused entry is retained before eviction. Longer than the
    /// staleness window so paging back and forth stays cheap.
    pub fn retain_for(self) -> Duration {
        match self {
            Resource::Vehicles | Resource::VehicleDetail | Resource::Favorites => {
                Duration::from_secs(5 * 60)
            }
            Resource::Featured => Duration::from_secs(10 * 60),
            Resource::FavoriteCheck => Duration::from_secs(2 * 60),
        }
    }
}

/// Canonical identifier for a cached request: resource plus normalized
/// parameters. Params are sorted so logically identical filter states
/// produce the same key regardless of insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub resource: Resource,
    params: Vec<(String, String)>,
}

impl QueryKey {
    fn new(resource: Resource, mut params: Vec<(String, String)>) -> Self {
        params.sort();
        QueryKey { resource, params }
    }

    pub fn vehicles(filters: &VehicleFilters, per_page: u32) -> Self {
        let params = filters
            .to_api_params(per_page)
            .into_iter()
            .map(|(key, value)| (key.to_owned(), value))
            .collect();
        Self::new(Resource::Vehicles, params)
    }

    pub fn vehicle(id: i64) -> Self {
        Self::new(Resource::VehicleDetail, vec![("id".to_owned(), id.to_string())])
    }

    pub fn featured() -> Self {
        Self::new(Resource::Featured, Vec::new())
    }

    // Favorites are per user; the session token keeps one user's entries
    // from being served to another.
    pub fn favorites(token: &str) -> Self {
        Self::new(Resource::Favorites, vec![("session".to_owned(), token.to_owned())])
    }

    pub fn favorite_check(token: &str, vehicle_id: i64) -> Self {
        Self::new(
            Resource::FavoriteCheck,
            vec![
                ("session".to_owned(), token.to_owned()),
                ("vehicleId".to_owned(), vehicle_id.to_string()),
            ],
        )
    }
}

/// Patterns accepted by `QueryCache::invalidate`.
#[derive(Debug, Clone)]
pub enum KeyPattern {
    /// Every entry for the resource, across sessions.
    Resource(Resource),
    /// The favorite-status entries for one vehicle, across sessions.
    FavoriteCheck(i64),
}

impl KeyPattern {
    fn matches(&self, key: &QueryKey) -> bool {
        match self {
            KeyPattern::Resource(resource) => key.resource == *resource,
            KeyPattern::FavoriteCheck(vehicle_id) => {
                key.resource == Resource::FavoriteCheck
                    && key
                        .params
                        .iter()
                        .any(|(name, value)| name == "vehicleId" && *value == vehicle_id.to_string())
            }
        }
    }
}

/// Payloads the cache can hold, one variant per resource shape.
#[derive(Debug, Clone)]
pub enum CachedPayload {
    VehiclePage {
        vehicles: Vec<Vehicle>,
        pagination: Pagination,
    },
    Vehicle(Vehicle),
    Vehicles(Vec<Vehicle>),
    FavoriteStatus(bool),
}

impl CachedPayload {
    pub fn as_vehicle_page(&self) -> Option<(&[Vehicle], &Pagination)> {
        match self {
            CachedPayload::VehiclePage { vehicles, pagination } => Some((vehicles, pagination)),
            _ => None,
        }
    }

    pub fn as_vehicle(&self) -> Option<&Vehicle> {
        match self {
            CachedPayload::Vehicle(vehicle) => Some(vehicle),
            _ => None,
        }
    }

    pub fn as_vehicles(&self) -> Option<&[Vehicle]> {
        match self {
            CachedPayload::Vehicles(vehicles) => Some(vehicles),
            _ => None,
        }
    }

    pub fn as_favorite_status(&self) -> Option<bool> {
        match self {
            CachedPayload::FavoriteStatus(status) => Some(*status),
            _ => None,
        }
    }
}

type SharedFetch = Shared<BoxFuture<'static, Result<Arc<CachedPayload>, ApiError>>>;

struct StoredValue {
    payload: Arc<CachedPayload>,
    fetched_at: Instant,
}

struct CacheEntry {
    value: Option<StoredValue>,
    inflight: Option<SharedFetch>,
    stale: bool,
    // Bumped by invalidation so a fetch that raced it cannot clear the flag.
    epoch: u64,
    last_used: Instant,
}

impl CacheEntry {
    fn new(now: Instant) -> Self {
        CacheEntry {
            value: None,
            inflight: None,
            stale: false,
            epoch: 0,
            last_used: now,
        }
    }
}

/// One instance lives in AppState for the whole process; handlers reach it
/// through state, never through an ambient static.
#[derive(Default)]
pub struct QueryCache {
    entries: Mutex<HashMap<QueryKey, CacheEntry>>,
}

impl QueryCache {
    /// Returns the cached payload when present and fresh. Otherwise starts
    /// (or joins) the single in-flight fetch for this key: every concurrent
    /// caller awaits the same shared future and observes the same resolved
    /// payload or the same error. Errors are fanned out but never stored, so
    /// the next read retries.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: QueryKey,
        fetch: F,
    ) -> Result<Arc<CachedPayload>, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CachedPayload, ApiError>> + Send + 'static,
    {
        let (shared, epoch) = {
            let mut entries = self.entries.lock().await;
            Self::sweep(&mut entries);

            let now = Instant::now();
            let entry = entries
                .entry(key.clone())
                .or_insert_with(|| CacheEntry::new(now));
            entry.last_used = now;

            if let Some(value) = &entry.value {
                if !entry.stale && now.duration_since(value.fetched_at) < key.resource.stale_after() {
                    return Ok(Arc::clone(&value.payload));
                }
            }

            match &entry.inflight {
                Some(inflight) => (inflight.clone(), entry.epoch),
                None => {
                    let shared: SharedFetch =
                        fetch().map(|result| result.map(Arc::new)).boxed().shared();
                    entry.inflight = Some(shared.clone());
                    (shared, entry.epoch)
                }
            }
        };

        let result = shared.clone().await;
        self.finish(&key, &shared, epoch, &result).await;
        result
    }

    /// Write-back after a fetch resolves. Only the fetch still registered
    /// for the key may deregister itself and store its payload: a waiter
    /// resuming late, after an invalidation already let a newer fetch start,
    /// must neither clear that fetch's registration nor overwrite its result
    /// with pre-invalidation data.
    async fn finish(
        &self,
        key: &QueryKey,
        shared: &SharedFetch,
        epoch: u64,
        result: &Result<Arc<CachedPayload>, ApiError>,
    ) {
        let mut entries = self.entries.lock().await;
        let Some(entry) = entries.get_mut(key) else {
            return;
        };
        let registered = entry
            .inflight
            .as_ref()
            .is_some_and(|inflight| inflight.ptr_eq(shared));
        if !registered {
            return;
        }
        entry.inflight = None;
        entry.last_used = Instant::now();
        if let Ok(payload) = result {
            entry.value = Some(StoredValue {
                payload: Arc::clone(payload),
                fetched_at: Instant::now(),
            });
            // An invalidation that arrived mid-flight keeps the entry
            // stale; the next read refetches.
            if entry.epoch == epoch {
                entry.stale = false;
            }
        }
    }

    /// Marks every matching entry stale. Currently cached data stays
    /// readable until the next access triggers the refetch.
    pub async fn invalidate(&self, pattern: &KeyPattern) {
        let mut entries = self.entries.lock().await;
        let mut marked = 0usize;
        for (key, entry) in entries.iter_mut() {
            if pattern.matches(key) {
                entry.stale = true;
                entry.epoch = entry.epoch.wrapping_add(1);
                marked += 1;
            }
        }
        tracing::debug!(?pattern, marked, "Invalidated cache entries");
    }

    fn sweep(entries: &mut HashMap<QueryKey, CacheEntry>) {
        let now = Instant::now();
        entries.retain(|key, entry| {
            entry.inflight.is_some()
                || now.duration_since(entry.last_used) < key.resource.retain_for()
        });
    }

    #[cfg(test)]
    pub(crate) async fn is_stale(&self, key: &QueryKey) -> bool {
        let entries = self.entries.lock().await;
        entries.get(key).map(|entry| entry.stale).unwrap_or(false)
    }

    #[cfg(test)]
    pub(crate) async fn contains(&self, key: &QueryKey) -> bool {
        self.entries.lock().await.contains_key(key)
    }

    #[cfg(test)]
    pub(crate) async fn has_inflight(&self, key: &QueryKey) -> bool {
        let entries = self.entries.lock().await;
        entries
            .get(key)
            .map(|entry| entry.inflight.is_some())
            .unwrap_or(false)
    }
}

//! Session-lifetime cache of entity lists, one slot per [`EntityKind`].
//!
//! Each slot publishes its [`CacheEntry`] through a `watch` channel, so an
//! entry is always replaced as a whole and readers can subscribe to
//! changes. Concurrent fetches of the same kind share one in-flight task.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use api_client::{ApiClient, EntitySource};
use chrono::{DateTime, Utc};
use common::config::CacheConfig;
use common::{
    Country, Engine, EntityKind, Error, LaunchSite, LaunchVehicle, Mission, Record, Result,
    Satellite,
};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::{oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Cached state for one entity kind.
#[derive(Debug)]
pub struct CacheEntry<T> {
    pub data: Option<Arc<Vec<T>>>,
    /// Completion instant of the fetch that produced `data`.
    pub fetched_at: Option<Instant>,
    /// Wall-clock completion time, for display.
    pub fetched_at_utc: Option<DateTime<Utc>>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for CacheEntry<T> {
    fn default() -> Self {
        Self {
            data: None,
            fetched_at: None,
            fetched_at_utc: None,
            loading: false,
            error: None,
        }
    }
}

impl<T> Clone for CacheEntry<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            fetched_at: self.fetched_at,
            fetched_at_utc: self.fetched_at_utc,
            loading: self.loading,
            error: self.error.clone(),
        }
    }
}

impl<T> CacheEntry<T> {
    /// Valid iff data is present and younger than `ttl`.
    pub fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        match (&self.data, self.fetched_at) {
            (Some(_), Some(at)) => now.saturating_duration_since(at) < ttl,
            _ => false,
        }
    }
}

type SharedFetch<T> = Shared<BoxFuture<'static, Result<Arc<Vec<T>>>>>;

/// Storage for one entity kind.
#[doc(hidden)]
pub struct Slot<T> {
    state: watch::Sender<CacheEntry<T>>,
    in_flight: Mutex<Option<SharedFetch<T>>>,
    /// Bumped on invalidation so fetches started earlier cannot write back.
    generation: AtomicU64,
}

impl<T: Record> Slot<T> {
    fn new() -> Self {
        Self {
            state: watch::Sender::new(CacheEntry::default()),
            in_flight: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, Option<SharedFetch<T>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reset(&self) {
        let mut in_flight = self.lock_in_flight();
        self.generation.fetch_add(1, Ordering::SeqCst);
        *in_flight = None;
        self.state.send_replace(CacheEntry::default());
    }

    fn fail(&self, message: String) {
        self.state.send_modify(|entry| {
            entry.loading = false;
            entry.error = Some(message);
        });
    }

    fn store(&self, data: Arc<Vec<T>>) {
        self.state.send_replace(CacheEntry {
            data: Some(data),
            fetched_at: Some(Instant::now()),
            fetched_at_utc: Some(Utc::now()),
            loading: false,
            error: None,
        });
    }
}

/// One slot per entity kind.
#[doc(hidden)]
pub struct Slots {
    countries: Slot<Country>,
    engines: Slot<Engine>,
    launch_vehicles: Slot<LaunchVehicle>,
    missions: Slot<Mission>,
    satellites: Slot<Satellite>,
    launch_sites: Slot<LaunchSite>,
}

impl Slots {
    fn new() -> Self {
        Self {
            countries: Slot::new(),
            engines: Slot::new(),
            launch_vehicles: Slot::new(),
            missions: Slot::new(),
            satellites: Slot::new(),
            launch_sites: Slot::new(),
        }
    }

    fn reset(&self, kind: EntityKind) {
        match kind {
            EntityKind::Countries => self.countries.reset(),
            EntityKind::Engines => self.engines.reset(),
            EntityKind::LaunchVehicles => self.launch_vehicles.reset(),
            EntityKind::Missions => self.missions.reset(),
            EntityKind::Satellites => self.satellites.reset(),
            EntityKind::LaunchSites => self.launch_sites.reset(),
        }
    }
}

/// A record type the cache has a slot for.
pub trait CachedRecord: Record {
    #[doc(hidden)]
    fn slot(slots: &Slots) -> &Slot<Self>;
}

macro_rules! cached_record {
    ($ty:ty, $field:ident) => {
        impl CachedRecord for $ty {
            fn slot(slots: &Slots) -> &Slot<Self> {
                &slots.$field
            }
        }
    };
}

cached_record!(Country, countries);
cached_record!(Engine, engines);
cached_record!(LaunchVehicle, launch_vehicles);
cached_record!(Mission, missions);
cached_record!(Satellite, satellites);
cached_record!(LaunchSite, launch_sites);

/// Decode raw records, skipping (and logging) ones that do not fit `T`.
pub(crate) fn decode_records<T: Record>(raw: Vec<Value>) -> Vec<T> {
    let total = raw.len();
    let records: Vec<T> = raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!("{}: skipping undecodable record: {}", T::KIND, e);
                None
            }
        })
        .collect();

    if records.len() < total {
        warn!(
            "{}: skipped {} of {} records that failed to decode",
            T::KIND,
            total - records.len(),
            total
        );
    }
    records
}

struct Inner<S> {
    source: Arc<S>,
    slots: Slots,
    ttl: Duration,
}

/// Shared entity cache handle. Cloning is cheap and every clone sees the
/// same entries.
pub struct EntityCache<S = ApiClient> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for EntityCache<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: EntitySource> EntityCache<S> {
    pub fn new(source: S, config: &CacheConfig) -> Self {
        Self::with_ttl(Arc::new(source), Duration::from_secs(config.ttl_secs))
    }

    pub fn with_ttl(source: Arc<S>, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                slots: Slots::new(),
                ttl,
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    pub fn source(&self) -> Arc<S> {
        Arc::clone(&self.inner.source)
    }

    /// Snapshot of the current entry for `T`.
    pub fn entry<T: CachedRecord>(&self) -> CacheEntry<T> {
        T::slot(&self.inner.slots).state.borrow().clone()
    }

    /// Receiver notified on every entry replacement for `T`.
    pub fn subscribe<T: CachedRecord>(&self) -> watch::Receiver<CacheEntry<T>> {
        T::slot(&self.inner.slots).state.subscribe()
    }

    fn fresh_data<T: CachedRecord>(&self) -> Option<Arc<Vec<T>>> {
        let entry = T::slot(&self.inner.slots).state.borrow();
        if entry.is_fresh(self.inner.ttl, Instant::now()) {
            entry.data.clone()
        } else {
            None
        }
    }

    /// Records of type `T`, from cache while fresh, otherwise from the source.
    ///
    /// Callers arriving while a fetch is in flight wait for that fetch
    /// instead of starting another one.
    pub async fn fetch<T: CachedRecord>(&self) -> Result<Arc<Vec<T>>> {
        if let Some(data) = self.fresh_data::<T>() {
            debug!("{}: cache hit ({} records)", T::KIND, data.len());
            return Ok(data);
        }
        self.start_or_join::<T>()?.await
    }

    /// Fetch from the source regardless of freshness.
    pub async fn refresh<T: CachedRecord>(&self) -> Result<Arc<Vec<T>>> {
        self.start_or_join::<T>()?.await
    }

    /// Start a fetch in the background without waiting for it. A fresh
    /// entry is left alone unless `force` is set.
    pub fn spawn_fetch<T: CachedRecord>(&self, force: bool) -> Result<()> {
        if !force && self.fresh_data::<T>().is_some() {
            return Ok(());
        }
        self.start_or_join::<T>().map(drop)
    }

    /// Put records into the cache as if they had just been fetched.
    pub fn seed<T: CachedRecord>(&self, records: Vec<T>) {
        T::slot(&self.inner.slots).store(Arc::new(records));
    }

    /// Reset one kind, or all six when `kind` is `None`.
    pub fn invalidate(&self, kind: Option<EntityKind>) {
        match kind {
            Some(kind) => {
                debug!("{}: invalidated", kind);
                self.inner.slots.reset(kind);
            }
            None => {
                debug!("all entity kinds invalidated");
                for kind in EntityKind::ALL {
                    self.inner.slots.reset(kind);
                }
            }
        }
    }

    fn start_or_join<T: CachedRecord>(&self) -> Result<SharedFetch<T>> {
        let slot = T::slot(&self.inner.slots);
        let runtime = Handle::try_current().map_err(|e| Error::Runtime(e.to_string()))?;

        let (tx, rx) = oneshot::channel();
        let (shared, generation) = {
            let mut in_flight = slot.lock_in_flight();
            if let Some(existing) = in_flight.as_ref() {
                debug!("{}: joining in-flight fetch", T::KIND);
                return Ok(existing.clone());
            }

            let shared = async move {
                match rx.await {
                    Ok(result) => result,
                    Err(_) => Err(Error::Other(format!("{} fetch did not complete", T::KIND))),
                }
            }
            .boxed()
            .shared();

            let generation = slot.generation.load(Ordering::SeqCst);
            slot.state.send_modify(|entry| entry.loading = true);
            *in_flight = Some(shared.clone());
            (shared, generation)
        };

        // Spawned outside the slot lock: a runtime that is shutting down
        // drops the task (and its guard) inside `spawn`.
        let guard = FetchGuard::<T, S> {
            cache: self.clone(),
            generation,
            tx: Some(tx),
            _kind: PhantomData,
        };
        runtime.spawn(async move {
            let mut guard = guard;
            let result = guard.cache.run_fetch::<T>(guard.generation).await;
            guard.finish(result);
        });

        Ok(shared)
    }

    async fn run_fetch<T: CachedRecord>(&self, generation: u64) -> Result<Arc<Vec<T>>> {
        let kind = T::KIND;
        debug!("{}: fetching {}", kind, kind.endpoint());

        let result = self
            .inner
            .source
            .fetch_all(kind.endpoint())
            .await
            .map(|raw| Arc::new(decode_records::<T>(raw)));

        let slot = T::slot(&self.inner.slots);
        let mut in_flight = slot.lock_in_flight();
        if slot.generation.load(Ordering::SeqCst) != generation {
            debug!("{}: discarding result of fetch started before invalidation", kind);
            return result;
        }
        *in_flight = None;

        match &result {
            Ok(data) => {
                info!("{}: cached {} records", kind, data.len());
                slot.store(Arc::clone(data));
            }
            Err(e) => {
                warn!("{}: fetch failed: {}", kind, e);
                slot.fail(e.to_string());
            }
        }
        result
    }
}

/// Owned by a spawned fetch task. Delivers the result to waiters, or, if
/// the task panics or is dropped first, releases the slot and records an
/// error so the next fetch starts over.
struct FetchGuard<T: CachedRecord, S: EntitySource> {
    cache: EntityCache<S>,
    generation: u64,
    tx: Option<oneshot::Sender<Result<Arc<Vec<T>>>>>,
    _kind: PhantomData<fn() -> T>,
}

impl<T: CachedRecord, S: EntitySource> FetchGuard<T, S> {
    fn finish(&mut self, result: Result<Arc<Vec<T>>>) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(result);
        }
    }
}

impl<T: CachedRecord, S: EntitySource> Drop for FetchGuard<T, S> {
    fn drop(&mut self) {
        if self.tx.is_none() {
            return;
        }
        let slot = T::slot(&self.cache.inner.slots);
        let mut in_flight = slot.lock_in_flight();
        if slot.generation.load(Ordering::SeqCst) != self.generation {
            return;
        }
        *in_flight = None;
        warn!("{}: fetch task ended without a result", T::KIND);
        slot.fail(format!("{} fetch did not complete", T::KIND));
        // `tx` drops after this, waking waiters with an error.
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use std::future::Future;
    use std::sync::atomic::{AtomicBool, AtomicUsize};

    /// Counting in-memory source.
    #[derive(Default)]
    pub(crate) struct FakeSource {
        pub calls: AtomicUsize,
        pub fail: AtomicBool,
        pub delay_ms: AtomicU64,
    }

    impl FakeSource {
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn with_delay(ms: u64) -> Self {
            let source = Self::default();
            source.delay_ms.store(ms, Ordering::SeqCst);
            source
        }

        fn body(endpoint: &str) -> Vec<Value> {
            match endpoint {
                "/countries" => vec![
                    json!({"id": 1, "name": "United States", "isoCode": "USA", "overallCapabilityScore": 95}),
                    json!({"id": 2, "name": "China", "isoCode": "CHN", "overallCapabilityScore": 85}),
                    json!({"id": "not-a-number", "isoCode": "BAD"}),
                ],
                "/engines" => vec![json!({"id": 10, "name": "RS-25", "countryId": 1})],
                _ => Vec::new(),
            }
        }
    }

    impl EntitySource for FakeSource {
        fn fetch_all(&self, endpoint: &str) -> impl Future<Output = Result<Vec<Value>>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let fail = self.fail.load(Ordering::SeqCst);
            let delay = Duration::from_millis(self.delay_ms.load(Ordering::SeqCst));
            let body = Self::body(endpoint);
            async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                if fail {
                    Err(Error::Http("connection refused".into()))
                } else {
                    Ok(body)
                }
            }
        }
    }

    fn cache_with(source: FakeSource) -> (EntityCache<FakeSource>, Arc<FakeSource>) {
        let source = Arc::new(source);
        let cache = EntityCache::with_ttl(Arc::clone(&source), Duration::from_secs(300));
        (cache, source)
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_boundary() {
        let (cache, source) = cache_with(FakeSource::default());

        let first = cache.fetch::<Country>().await.unwrap();
        assert_eq!(source.calls(), 1);

        tokio::time::advance(Duration::from_secs(4 * 60 + 59)).await;
        let second = cache.fetch::<Country>().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.calls(), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        let third = cache.fetch::<Country>().await.unwrap();
        assert_eq!(source.calls(), 2);
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(third.len(), 2);
    }

    #[tokio::test]
    async fn test_undecodable_records_are_skipped() {
        let (cache, _) = cache_with(FakeSource::default());
        let countries = cache.fetch::<Country>().await.unwrap();
        let codes: Vec<&str> = countries.iter().map(|c| c.iso_code.as_str()).collect();
        assert_eq!(codes, vec!["USA", "CHN"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_fetches_share_one_request() {
        let (cache, source) = cache_with(FakeSource::with_delay(100));

        let (a, b) = tokio::join!(cache.fetch::<Country>(), cache.fetch::<Country>());
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(source.calls(), 1);
        assert!(!cache.entry::<Country>().loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loading_flag_while_in_flight() {
        let (cache, _) = cache_with(FakeSource::with_delay(100));

        cache.spawn_fetch::<Country>(false).unwrap();
        let entry = cache.entry::<Country>();
        assert!(entry.loading);
        assert!(entry.data.is_none());

        let data = cache.fetch::<Country>().await.unwrap();
        let entry = cache.entry::<Country>();
        assert!(!entry.loading);
        assert!(entry.fetched_at.is_some());
        assert!(entry.fetched_at_utc.is_some());
        assert!(Arc::ptr_eq(entry.data.as_ref().unwrap(), &data));
    }

    #[tokio::test]
    async fn test_failure_records_error_and_propagates() {
        let (cache, source) = cache_with(FakeSource::default());
        source.fail.store(true, Ordering::SeqCst);

        let err = cache.fetch::<Country>().await.unwrap_err();
        assert_eq!(err, Error::Http("connection refused".into()));

        let entry = cache.entry::<Country>();
        assert!(!entry.loading);
        assert!(entry.data.is_none());
        assert_eq!(
            entry.error.as_deref(),
            Some("HTTP request failed: connection refused")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refetch_keeps_previous_data() {
        let (cache, source) = cache_with(FakeSource::default());
        let first = cache.fetch::<Country>().await.unwrap();

        source.fail.store(true, Ordering::SeqCst);
        tokio::time::advance(Duration::from_secs(301)).await;
        assert!(cache.fetch::<Country>().await.is_err());

        let entry = cache.entry::<Country>();
        assert!(Arc::ptr_eq(entry.data.as_ref().unwrap(), &first));
        assert!(entry.error.is_some());

        // A later success clears the error.
        source.fail.store(false, Ordering::SeqCst);
        cache.fetch::<Country>().await.unwrap();
        assert!(cache.entry::<Country>().error.is_none());
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn test_refresh_ignores_freshness() {
        let (cache, source) = cache_with(FakeSource::default());
        cache.fetch::<Country>().await.unwrap();
        cache.refresh::<Country>().await.unwrap();
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_one_kind() {
        let (cache, source) = cache_with(FakeSource::default());
        cache.fetch::<Country>().await.unwrap();
        cache.fetch::<Engine>().await.unwrap();

        cache.invalidate(Some(EntityKind::Countries));
        assert!(cache.entry::<Country>().data.is_none());
        assert!(cache.entry::<Engine>().data.is_some());

        cache.fetch::<Country>().await.unwrap();
        cache.fetch::<Engine>().await.unwrap();
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn test_invalidate_all_kinds() {
        let (cache, _) = cache_with(FakeSource::default());
        cache.fetch::<Country>().await.unwrap();
        cache.fetch::<Engine>().await.unwrap();
        cache.fetch::<Mission>().await.unwrap();

        cache.invalidate(None);
        assert!(cache.entry::<Country>().data.is_none());
        assert!(cache.entry::<Engine>().data.is_none());
        assert!(cache.entry::<Mission>().data.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_fetched_before_invalidation_is_discarded() {
        let (cache, _) = cache_with(FakeSource::with_delay(100));

        let pending = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.fetch::<Country>().await })
        };
        tokio::task::yield_now().await;
        assert!(cache.entry::<Country>().loading);

        cache.invalidate(Some(EntityKind::Countries));
        let data = pending.await.unwrap().unwrap();
        assert_eq!(data.len(), 2);

        let entry = cache.entry::<Country>();
        assert!(entry.data.is_none());
        assert!(!entry.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_fetch_still_populates_cache() {
        let (cache, source) = cache_with(FakeSource::with_delay(100));

        let abandoned =
            tokio::time::timeout(Duration::from_millis(10), cache.fetch::<Country>()).await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(200)).await;
        let entry = cache.entry::<Country>();
        assert_eq!(entry.data.map(|d| d.len()), Some(2));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_seeded_data_is_served_without_fetch() {
        let (cache, source) = cache_with(FakeSource::default());
        cache.seed(vec![Country {
            id: 3,
            iso_code: "IND".into(),
            ..Default::default()
        }]);

        let countries = cache.fetch::<Country>().await.unwrap();
        assert_eq!(countries[0].iso_code, "IND");
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_subscribers_see_whole_entry_replacements() {
        let (cache, _) = cache_with(FakeSource::default());
        let mut rx = cache.subscribe::<Engine>();

        cache.fetch::<Engine>().await.unwrap();
        assert!(rx.has_changed().unwrap());
        let entry = rx.borrow_and_update().clone();
        assert_eq!(entry.data.map(|d| d.len()), Some(1));
        assert!(!entry.loading);
    }

    /// Panics on its first call, then serves one country.
    #[derive(Default)]
    struct PanicOnce {
        calls: AtomicUsize,
    }

    impl EntitySource for PanicOnce {
        fn fetch_all(&self, _endpoint: &str) -> impl Future<Output = Result<Vec<Value>>> + Send {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if call == 0 {
                    panic!("backend client blew up");
                }
                Ok(vec![json!({"id": 1, "isoCode": "USA"})])
            }
        }
    }

    #[tokio::test]
    async fn test_panicked_fetch_releases_slot() {
        let source = Arc::new(PanicOnce::default());
        let cache = EntityCache::with_ttl(Arc::clone(&source), Duration::from_secs(300));

        assert!(cache.fetch::<Country>().await.is_err());
        let entry = cache.entry::<Country>();
        assert!(!entry.loading);
        assert!(entry.error.is_some());

        let countries = cache.fetch::<Country>().await.unwrap();
        assert_eq!(countries.len(), 1);
        cache.refresh::<Country>().await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        assert!(cache.entry::<Country>().error.is_none());
    }

    fn current_thread_runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn test_fetch_cancelled_by_runtime_shutdown_can_be_retried() {
        let (cache, source) = cache_with(FakeSource::with_delay(50));

        let first = current_thread_runtime();
        first.block_on(async {
            cache.spawn_fetch::<Country>(false).unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
        });
        assert_eq!(source.calls(), 1);
        drop(first);

        let entry = cache.entry::<Country>();
        assert!(!entry.loading);
        assert!(entry.error.is_some());

        let second = current_thread_runtime();
        let countries = second.block_on(cache.fetch::<Country>()).unwrap();
        assert_eq!(countries.len(), 2);
        assert_eq!(source.calls(), 2);
    }

    #[test]
    fn test_spawn_fetch_without_runtime_is_an_error() {
        let (cache, source) = cache_with(FakeSource::default());
        let err = cache.spawn_fetch::<Country>(false).unwrap_err();
        assert!(matches!(err, Error::Runtime(_)));
        assert!(!cache.entry::<Country>().loading);
        assert_eq!(source.calls(), 0);
    }
}

//! Per-entity accessors exposing `{items, loading, error}`.
//!
//! An [`EntityQuery`] reads through the shared [`EntityCache`] when one is
//! available. Without a cache it fetches straight from the source and keeps
//! its own state (degraded mode). Failures never surface as panics or
//! synchronous errors, only through [`QueryState::error`].

use std::sync::Arc;

use api_client::{ApiClient, EntitySource};
use common::{Country, Engine, LaunchSite, LaunchVehicle, Mission, Satellite};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::debug;

use crate::store::{decode_records, CacheEntry, CachedRecord, EntityCache};

/// What a consumer renders: records, a spinner flag, an error message.
#[derive(Debug)]
pub struct QueryState<T> {
    pub items: Arc<Vec<T>>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> QueryState<T> {
    /// Loaded successfully but nothing came back.
    pub fn is_empty(&self) -> bool {
        !self.loading && self.error.is_none() && self.items.is_empty()
    }
}

#[derive(Debug)]
struct LocalState<T> {
    data: Option<Arc<Vec<T>>>,
    loading: bool,
    error: Option<String>,
}

impl<T> Default for LocalState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

/// Factory for entity queries.
pub struct EntityHooks<S = ApiClient> {
    cache: Option<EntityCache<S>>,
    source: Arc<S>,
}

impl<S: EntitySource> EntityHooks<S> {
    pub fn new(cache: EntityCache<S>) -> Self {
        let source = cache.source();
        Self {
            cache: Some(cache),
            source,
        }
    }

    /// Hooks with no cache behind them; every query fetches on its own.
    pub fn without_cache(source: Arc<S>) -> Self {
        Self {
            cache: None,
            source,
        }
    }

    pub fn query<T: CachedRecord>(&self) -> EntityQuery<T, S> {
        EntityQuery::observe(self.cache.clone(), Arc::clone(&self.source))
    }

    pub fn countries(&self) -> EntityQuery<Country, S> {
        self.query()
    }

    pub fn engines(&self) -> EntityQuery<Engine, S> {
        self.query()
    }

    pub fn launch_vehicles(&self) -> EntityQuery<LaunchVehicle, S> {
        self.query()
    }

    pub fn missions(&self) -> EntityQuery<Mission, S> {
        self.query()
    }

    pub fn satellites(&self) -> EntityQuery<Satellite, S> {
        self.query()
    }

    pub fn launch_sites(&self) -> EntityQuery<LaunchSite, S> {
        self.query()
    }
}

/// Live view of one entity list.
///
/// Dropping the query does not cancel a fetch it started; the cache is
/// still updated and local updates are discarded.
pub struct EntityQuery<T, S = ApiClient> {
    cache: Option<EntityCache<S>>,
    source: Arc<S>,
    shared: Option<watch::Receiver<CacheEntry<T>>>,
    local_tx: Arc<watch::Sender<LocalState<T>>>,
    local: watch::Receiver<LocalState<T>>,
}

impl<T: CachedRecord, S: EntitySource> EntityQuery<T, S> {
    fn observe(cache: Option<EntityCache<S>>, source: Arc<S>) -> Self {
        let (local_tx, local) = watch::channel(LocalState::default());
        let query = Self {
            shared: cache.as_ref().map(|c| c.subscribe::<T>()),
            cache,
            source,
            local_tx: Arc::new(local_tx),
            local,
        };

        match &query.cache {
            Some(cache) => {
                let entry = cache.entry::<T>();
                if entry.data.is_none() && !entry.loading {
                    query.fetch_through_cache(false);
                }
            }
            None => query.fetch_direct(),
        }
        query
    }

    fn fetch_through_cache(&self, force: bool) {
        let Some(cache) = &self.cache else {
            return;
        };
        if let Err(e) = cache.spawn_fetch::<T>(force) {
            let message = e.to_string();
            self.local_tx.send_modify(|state| state.error = Some(message));
        }
    }

    fn fetch_direct(&self) {
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                let message = common::Error::Runtime(e.to_string()).to_string();
                self.local_tx.send_modify(|state| state.error = Some(message));
                return;
            }
        };

        self.local_tx.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        let tx = Arc::clone(&self.local_tx);
        let source = Arc::clone(&self.source);
        runtime.spawn(async move {
            let result = source.fetch_all(T::KIND.endpoint()).await;
            if tx.is_closed() {
                debug!("{}: query dropped before fetch completed", T::KIND);
                return;
            }
            tx.send_modify(|state| {
                state.loading = false;
                match result {
                    Ok(raw) => {
                        state.data = Some(Arc::new(decode_records::<T>(raw)));
                        state.error = None;
                    }
                    Err(e) => state.error = Some(e.to_string()),
                }
            });
        });
    }

    /// Re-fetch, bypassing the cache TTL.
    pub fn refresh(&self) {
        if self.cache.is_some() {
            self.fetch_through_cache(true);
        } else {
            self.fetch_direct();
        }
    }

    /// Current union of cache-level and query-local state.
    pub fn state(&self) -> QueryState<T> {
        let local = self.local.borrow();
        let (shared_data, shared_loading, shared_error) = match &self.shared {
            Some(rx) => {
                let entry = rx.borrow();
                (entry.data.clone(), entry.loading, entry.error.clone())
            }
            None => (None, false, None),
        };

        QueryState {
            items: shared_data
                .or_else(|| local.data.clone())
                .unwrap_or_default(),
            loading: shared_loading || local.loading,
            error: shared_error.or_else(|| local.error.clone()),
        }
    }

    fn mark_seen(&mut self) {
        self.local.borrow_and_update();
        if let Some(rx) = &mut self.shared {
            rx.borrow_and_update();
        }
    }

    /// Wait for the next state change. Returns `false` once no further
    /// changes can arrive.
    pub async fn changed(&mut self) -> bool {
        match &mut self.shared {
            Some(shared) => tokio::select! {
                r = shared.changed() => r.is_ok(),
                r = self.local.changed() => r.is_ok(),
            },
            None => self.local.changed().await.is_ok(),
        }
    }

    /// Wait until nothing is loading and return that state.
    pub async fn settled(&mut self) -> QueryState<T> {
        loop {
            self.mark_seen();
            let state = self.state();
            if !state.loading || !self.changed().await {
                return state;
            }
        }
    }
}

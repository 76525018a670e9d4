//! Page-lifetime cache for the category and app-card documents.
//!
//! The store fetches the two JSON resources at most once per page
//! session. Concurrent callers that arrive before the first fetch pair
//! resolves all await the same shared in-flight future, so the network
//! never sees duplicate requests. A forced [`DataStore::refresh`] is the
//! only way to replace the data, and it swaps both documents in together
//! or not at all.
//!
//! The store is an explicitly constructed value passed to whoever needs
//! it; there is no hidden `window`-level state.

use crate::fetch::{CacheMode, Fetch};
use crate::{resources, AppCardMap, Category, FetchError};
use futures::future::{FutureExt, LocalBoxFuture, Shared};
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use std::cell::RefCell;
use std::rc::Rc;

/// An immutable view of the loaded data.
///
/// Either field is `None` when its fetch or decode failed; readers treat
/// that as "no data" rather than an error. Both fields always come from
/// the same fetch pair — a reader never sees one fresh and one stale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub categories: Option<Rc<Vec<Category>>>,
    pub app_cards: Option<Rc<AppCardMap>>,
}

impl Snapshot {
    fn is_complete(&self) -> bool {
        self.categories.is_some() && self.app_cards.is_some()
    }
}

type InFlight = Shared<LocalBoxFuture<'static, Snapshot>>;

#[derive(Default)]
struct State {
    snapshot: Option<Snapshot>,
    in_flight: Option<InFlight>,
    /// Bumped by `refresh` and `dispose`. A load commits its result only
    /// when the epoch it started under is still current, which gives
    /// refresh last-writer-wins over any older in-flight load.
    epoch: u64,
}

/// Single-flight cache of the two data resources.
pub struct DataStore<F: Fetch + 'static> {
    fetcher: Rc<F>,
    state: Rc<RefCell<State>>,
}

// A handle clone, not a second store: clones share cache and in-flight
// state.
impl<F: Fetch + 'static> Clone for DataStore<F> {
    fn clone(&self) -> Self {
        Self {
            fetcher: self.fetcher.clone(),
            state: self.state.clone(),
        }
    }
}

impl<F: Fetch + 'static> DataStore<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher: Rc::new(fetcher),
            state: Rc::new(RefCell::new(State::default())),
        }
    }

    /// Synchronous peek at the cached snapshot. Never fetches.
    pub fn cached(&self) -> Option<Snapshot> {
        self.state.borrow().snapshot.clone()
    }

    /// Return the cached data, joining an in-flight load or starting one
    /// when necessary.
    ///
    /// Fetch failures are not retried here: a completed load, even a
    /// partially failed one, is the session's snapshot until someone
    /// calls [`refresh`](Self::refresh) or [`dispose`](Self::dispose).
    pub async fn ensure_loaded(&self) -> Snapshot {
        let pending = {
            let mut state = self.state.borrow_mut();
            if let Some(snapshot) = state.snapshot.clone() {
                debug!("Serving cached category data");
                return snapshot;
            }
            match state.in_flight.clone() {
                Some(pending) => {
                    debug!("Joining in-flight data load");
                    pending
                }
                None => {
                    let load = Self::load(self.fetcher.clone(), self.state.clone(), state.epoch)
                        .boxed_local()
                        .shared();
                    state.in_flight = Some(load.clone());
                    load
                }
            }
        };
        pending.await
    }

    /// Discard the cache and fetch both resources again, bypassing
    /// intermediate HTTP caches.
    ///
    /// The new snapshot is committed only when both fetches succeed; on
    /// any failure the previous data survives, so a refresh never leaves
    /// the store worse than before the call.
    pub async fn refresh(&self) -> Snapshot {
        let epoch = {
            let mut state = self.state.borrow_mut();
            state.epoch += 1;
            state.in_flight = None;
            state.epoch
        };
        info!("Refreshing category data, bypassing caches");
        let fresh = Self::fetch_pair(self.fetcher.clone(), CacheMode::Bypass).await;

        let mut state = self.state.borrow_mut();
        if state.epoch == epoch && fresh.is_complete() {
            state.snapshot = Some(fresh.clone());
            return fresh;
        }
        if !fresh.is_complete() {
            warn!("Refresh fetch incomplete, keeping previous data");
        }
        state.snapshot.clone().unwrap_or(fresh)
    }

    /// Drop the cache and detach any in-flight load. The store can be
    /// loaded again afterwards.
    pub fn dispose(&self) {
        let mut state = self.state.borrow_mut();
        state.epoch += 1;
        state.snapshot = None;
        state.in_flight = None;
    }

    async fn load(fetcher: Rc<F>, state: Rc<RefCell<State>>, epoch: u64) -> Snapshot {
        let snapshot = Self::fetch_pair(fetcher, CacheMode::Default).await;
        let mut state = state.borrow_mut();
        if state.epoch == epoch {
            state.snapshot = Some(snapshot.clone());
            state.in_flight = None;
        }
        snapshot
    }

    async fn fetch_pair(fetcher: Rc<F>, mode: CacheMode) -> Snapshot {
        let (categories, app_cards) = futures::join!(
            fetcher.fetch_json(resources::CATEGORIES_FILE, mode),
            fetcher.fetch_json(resources::APP_CARDS_FILE, mode),
        );
        let categories =
            decode::<Vec<Category>>(resources::CATEGORIES_FILE, categories).map(Rc::new);
        let app_cards = decode::<AppCardMap>(resources::APP_CARDS_FILE, app_cards).map(Rc::new);
        if let Some(categories) = &categories {
            info!("Categories loaded: {}", categories.len());
        }
        if let Some(app_cards) = &app_cards {
            info!("App cards loaded: {}", app_cards.len());
        }
        Snapshot {
            categories,
            app_cards,
        }
    }
}

fn decode<T: DeserializeOwned>(resource: &str, body: Result<String, FetchError>) -> Option<T> {
    let body = match body {
        Ok(body) => body,
        Err(err) => {
            warn!("{}", err);
            return None;
        }
    };
    match serde_json::from_str(&body) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(
                "{}",
                FetchError::Decode {
                    resource: resource.to_string(),
                    message: err.to_string(),
                }
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter_apps;
    use futures::channel::oneshot;
    use futures::executor::LocalPool;
    use futures::task::LocalSpawnExt;
    use std::collections::HashMap;

    const CATEGORIES_BODY: &str = r#"[{"title": "Networking", "icon": "hub",
        "isPrimary": true, "count": 1, "ids": ["net-app"]}]"#;
    const CARDS_BODY: &str = r#"{"net-app-1": {"app_title": "net-app-1",
        "description": "A networking demo."}}"#;

    /// Scripted fetcher: records every call, answers from a canned body
    /// table, optionally holding all responses behind a gate so tests
    /// can observe the in-flight window.
    struct ScriptedFetch {
        calls: RefCell<Vec<(String, CacheMode)>>,
        bodies: RefCell<HashMap<String, Result<String, FetchError>>>,
        gate: RefCell<Option<Shared<oneshot::Receiver<()>>>>,
    }

    impl ScriptedFetch {
        fn new() -> Rc<Self> {
            Rc::new(Self {
                calls: RefCell::new(Vec::new()),
                bodies: RefCell::new(HashMap::new()),
                gate: RefCell::new(None),
            })
        }

        /// Both resources succeed with the canned documents.
        fn ok_pair() -> Rc<Self> {
            let fetch = Self::new();
            fetch.set_body(resources::CATEGORIES_FILE, Ok(CATEGORIES_BODY.to_string()));
            fetch.set_body(resources::APP_CARDS_FILE, Ok(CARDS_BODY.to_string()));
            fetch
        }

        fn set_body(&self, resource: &str, body: Result<String, FetchError>) {
            self.bodies.borrow_mut().insert(resource.to_string(), body);
        }

        fn fail(&self, resource: &str) {
            self.set_body(
                resource,
                Err(FetchError::Http {
                    resource: resource.to_string(),
                    status: 503,
                    status_text: "Service Unavailable".to_string(),
                }),
            );
        }

        /// Hold every response until the returned sender fires.
        fn gated(&self) -> oneshot::Sender<()> {
            let (release, held) = oneshot::channel();
            *self.gate.borrow_mut() = Some(held.shared());
            release
        }

        fn total_calls(&self) -> usize {
            self.calls.borrow().len()
        }

        fn modes(&self) -> Vec<CacheMode> {
            self.calls.borrow().iter().map(|(_, m)| *m).collect()
        }
    }

    impl Fetch for Rc<ScriptedFetch> {
        fn fetch_json(
            &self,
            resource: &str,
            mode: CacheMode,
        ) -> LocalBoxFuture<'static, Result<String, FetchError>> {
            self.calls.borrow_mut().push((resource.to_string(), mode));
            let body = self
                .bodies
                .borrow()
                .get(resource)
                .cloned()
                .unwrap_or_else(|| {
                    Err(FetchError::Http {
                        resource: resource.to_string(),
                        status: 404,
                        status_text: "Not Found".to_string(),
                    })
                });
            let gate = self.gate.borrow().clone();
            Box::pin(async move {
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                body
            })
        }
    }

    #[test]
    fn ensure_loaded_fetches_once_and_caches() {
        let fetch = ScriptedFetch::ok_pair();
        let store = DataStore::new(fetch.clone());
        let mut pool = LocalPool::new();

        let first = pool.run_until(store.ensure_loaded());
        let second = pool.run_until(store.ensure_loaded());

        // One fetch per resource for the whole session.
        assert_eq!(fetch.total_calls(), 2);
        // The second call returns the identical cached objects.
        assert!(Rc::ptr_eq(
            first.categories.as_ref().unwrap(),
            second.categories.as_ref().unwrap()
        ));
        assert!(Rc::ptr_eq(
            first.app_cards.as_ref().unwrap(),
            second.app_cards.as_ref().unwrap()
        ));
        assert_eq!(first.categories.unwrap()[0].title, "Networking");
    }

    #[test]
    fn concurrent_callers_share_one_fetch_pair() {
        let fetch = ScriptedFetch::ok_pair();
        let release = fetch.gated();
        let store = DataStore::new(fetch.clone());
        let mut pool = LocalPool::new();
        let spawner = pool.spawner();

        let first = {
            let store = store.clone();
            spawner
                .spawn_local_with_handle(async move { store.ensure_loaded().await })
                .unwrap()
        };
        let second = {
            let store = store.clone();
            spawner
                .spawn_local_with_handle(async move { store.ensure_loaded().await })
                .unwrap()
        };

        // Both callers are now parked on the same in-flight load.
        pool.run_until_stalled();
        assert_eq!(fetch.total_calls(), 2);

        release.send(()).unwrap();
        let a = pool.run_until(first);
        let b = pool.run_until(second);
        assert_eq!(a, b);
        assert!(a.is_complete());
        assert_eq!(fetch.total_calls(), 2);
    }

    #[test]
    fn partial_failure_keeps_the_surviving_resource() {
        let fetch = ScriptedFetch::ok_pair();
        fetch.fail(resources::APP_CARDS_FILE);
        let store = DataStore::new(fetch.clone());
        let mut pool = LocalPool::new();

        let snapshot = pool.run_until(store.ensure_loaded());
        assert!(snapshot.categories.is_some());
        assert!(snapshot.app_cards.is_none());

        // Filtering over the partial snapshot is "no applications", not
        // a crash.
        let categories = snapshot.categories.as_ref().unwrap();
        let resolved = crate::resolve_category(categories, "Networking");
        assert!(resolved.is_some());
        assert!(filter_apps(resolved, snapshot.app_cards.as_deref()).is_empty());

        // The failure is cached: no automatic retry on the next call.
        pool.run_until(store.ensure_loaded());
        assert_eq!(fetch.total_calls(), 2);
    }

    #[test]
    fn decode_failure_is_treated_like_a_fetch_failure() {
        let fetch = ScriptedFetch::ok_pair();
        fetch.set_body(resources::CATEGORIES_FILE, Ok("not json".to_string()));
        let store = DataStore::new(fetch.clone());
        let mut pool = LocalPool::new();

        let snapshot = pool.run_until(store.ensure_loaded());
        assert!(snapshot.categories.is_none());
        assert!(snapshot.app_cards.is_some());
    }

    #[test]
    fn refresh_swaps_both_resources_and_bypasses_caches() {
        let fetch = ScriptedFetch::ok_pair();
        let store = DataStore::new(fetch.clone());
        let mut pool = LocalPool::new();
        pool.run_until(store.ensure_loaded());

        fetch.set_body(
            resources::CATEGORIES_FILE,
            Ok(r#"[{"title": "Visualization", "icon": "auto_awesome_motion",
                    "isPrimary": true, "count": 2, "ids": ["holoviz"]}]"#
                .to_string()),
        );
        let refreshed = pool.run_until(store.refresh());

        assert_eq!(refreshed.categories.unwrap()[0].title, "Visualization");
        assert_eq!(store.cached(), Some(pool.run_until(store.ensure_loaded())));
        // The initial pair used the default mode, the refresh pair the
        // cache-busting one.
        let modes = fetch.modes();
        assert_eq!(
            modes,
            vec![
                CacheMode::Default,
                CacheMode::Default,
                CacheMode::Bypass,
                CacheMode::Bypass,
            ]
        );
    }

    #[test]
    fn failed_refresh_keeps_the_previous_snapshot() {
        let fetch = ScriptedFetch::ok_pair();
        let store = DataStore::new(fetch.clone());
        let mut pool = LocalPool::new();
        let original = pool.run_until(store.ensure_loaded());

        fetch.fail(resources::APP_CARDS_FILE);
        let after = pool.run_until(store.refresh());

        assert_eq!(after, original);
        assert_eq!(store.cached(), Some(original));
    }

    #[test]
    fn refresh_with_empty_store_does_not_commit_partial_data() {
        let fetch = ScriptedFetch::ok_pair();
        fetch.fail(resources::APP_CARDS_FILE);
        let store = DataStore::new(fetch.clone());
        let mut pool = LocalPool::new();

        let partial = pool.run_until(store.refresh());
        assert!(partial.categories.is_some());
        assert!(partial.app_cards.is_none());
        // Nothing was committed, so the next ensure_loaded fetches again.
        assert_eq!(store.cached(), None);
        pool.run_until(store.ensure_loaded());
        assert_eq!(fetch.total_calls(), 4);
    }

    #[test]
    fn dispose_clears_the_cache_and_allows_reload() {
        let fetch = ScriptedFetch::ok_pair();
        let store = DataStore::new(fetch.clone());
        let mut pool = LocalPool::new();
        pool.run_until(store.ensure_loaded());
        assert!(store.cached().is_some());

        store.dispose();
        assert_eq!(store.cached(), None);

        pool.run_until(store.ensure_loaded());
        assert_eq!(fetch.total_calls(), 4);
    }

    #[test]
    fn superseded_load_resolves_but_does_not_commit() {
        let fetch = ScriptedFetch::ok_pair();
        let release = fetch.gated();
        let store = DataStore::new(fetch.clone());
        let mut pool = LocalPool::new();
        let spawner = pool.spawner();

        let caller = {
            let store = store.clone();
            spawner
                .spawn_local_with_handle(async move { store.ensure_loaded().await })
                .unwrap()
        };
        pool.run_until_stalled();

        // The store is reset while the load is still in flight.
        store.dispose();
        release.send(()).unwrap();

        // The parked caller still gets the resolved data...
        let snapshot = pool.run_until(caller);
        assert!(snapshot.is_complete());
        // ...but the stale load lost the epoch race and never commits.
        assert_eq!(store.cached(), None);
    }
}

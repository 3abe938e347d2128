//! Read side: serve fresh cache entries, otherwise fetch once per view key.
//!
//! # Design
//! Concurrent reads of the same key while a fetch is outstanding share that
//! fetch (single-flight). The in-flight map holds a `Shared` future per key,
//! tagged with the generation its ticket was taken at; a fetch cancelled by a
//! mutation is not joined by later readers, who start a fresh one instead.
//!
//! Locks are always taken cache first, then the in-flight map. A reader
//! checks freshness and joins or registers a fetch under both, and a fetch
//! writes its result and leaves the map under both, so no reader sees an
//! outdated entry with nothing in flight to replace it.
//!
//! Failed reads are retried with exponential backoff, except for not-found
//! answers. A read superseded by a mutation answers with what the mutation
//! left in the cache, or reads again when the mutation left nothing.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::cache::{FetchTicket, Lookup, SharedCache, ViewCache, ViewData, ViewKey};
use crate::config::RetryPolicy;
use crate::error::ApiError;
use crate::filter::TaskFilter;
use crate::http::Transport;
use crate::page::PageState;
use crate::remote::RemoteTasks;
use crate::types::{Task, TaskId};

type SharedFetch = Shared<BoxFuture<'static, Result<ViewData, ApiError>>>;

struct InFlight {
    generation: u64,
    fetch: SharedFetch,
}

type InFlightMap = Arc<Mutex<HashMap<ViewKey, InFlight>>>;

/// A cached payload together with whether it is still fresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cached {
    pub data: ViewData,
    pub fresh: bool,
}

pub struct QueryFacade<T> {
    remote: Arc<RemoteTasks<T>>,
    cache: SharedCache,
    in_flight: InFlightMap,
    retry: RetryPolicy,
}

impl<T: Transport + 'static> QueryFacade<T> {
    pub fn new(remote: Arc<RemoteTasks<T>>, cache: SharedCache, retry: RetryPolicy) -> Self {
        Self {
            remote,
            cache,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            retry,
        }
    }

    /// Cached value if fresh, otherwise the result of a (shared) fetch.
    pub async fn get_view(&self, key: ViewKey) -> Result<ViewData, ApiError> {
        self.fetch(key, false).await
    }

    /// Fetch regardless of freshness, still joining a fetch already running.
    pub async fn refetch(&self, key: ViewKey) -> Result<ViewData, ApiError> {
        self.fetch(key, true).await
    }

    /// Evict entries that have outlived their gc window. Every read does this
    /// first; hosts may also call it to trim an idle cache.
    pub fn collect_garbage(&self) -> usize {
        let mut cache = self.cache.lock();
        let in_flight = self.in_flight.lock();
        sweep(&mut cache, &in_flight)
    }

    /// Whatever is cached, fresh or stale, without touching the network.
    /// Lets a page keep showing old data while a refetch runs.
    pub fn peek(&self, key: ViewKey) -> Option<Cached> {
        match self.cache.lock().lookup(&key, Instant::now()) {
            Lookup::Fresh(data) => Some(Cached {
                data: data.clone(),
                fresh: true,
            }),
            Lookup::Stale(data) => Some(Cached {
                data: data.clone(),
                fresh: false,
            }),
            Lookup::Absent => None,
        }
    }

    pub fn is_fetching(&self, key: ViewKey) -> bool {
        let cache = self.cache.lock();
        let generation = cache.begin_fetch(key).generation;
        self.in_flight
            .lock()
            .get(&key)
            .is_some_and(|entry| entry.generation == generation)
    }

    pub async fn tasks(&self, filter: TaskFilter) -> Result<Vec<Task>, ApiError> {
        let key = filter.view_key();
        self.get_view(key)
            .await?
            .into_list()
            .ok_or_else(|| unexpected_payload(key))
    }

    /// `Ok(None)` is the explicit not-found answer.
    pub async fn task(&self, id: TaskId) -> Result<Option<Task>, ApiError> {
        let key = ViewKey::ById(id);
        self.get_view(key)
            .await?
            .into_item()
            .ok_or_else(|| unexpected_payload(key))
    }

    pub async fn ping(&self) -> Result<String, ApiError> {
        self.get_view(ViewKey::Ping)
            .await?
            .into_pong()
            .ok_or_else(|| unexpected_payload(ViewKey::Ping))
    }

    /// What a page bound to `key` should render right now, without fetching.
    pub fn page_state(&self, key: ViewKey) -> PageState<ViewData> {
        match self.peek(key) {
            Some(cached) => PageState::from_view(cached.data),
            None => PageState::Loading,
        }
    }

    fn fetch(&self, key: ViewKey, force: bool) -> SharedFetch {
        let mut cache = self.cache.lock();
        let mut in_flight = self.in_flight.lock();
        sweep(&mut cache, &in_flight);

        if !force {
            if let Lookup::Fresh(data) = cache.lookup(&key, Instant::now()) {
                debug!(view = %key, "serving fresh cache entry");
                return future::ready(Ok(data.clone())).boxed().shared();
            }
        }

        let ticket = cache.begin_fetch(key);
        if let Some(entry) = in_flight.get(&key) {
            if entry.generation == ticket.generation {
                debug!(view = %key, "joining fetch in flight");
                return entry.fetch.clone();
            }
        }

        debug!(view = %key, "fetching");
        let fetch = run_fetch(
            Arc::clone(&self.remote),
            Arc::clone(&self.cache),
            Arc::clone(&self.in_flight),
            self.retry,
            ticket,
        )
        .boxed()
        .shared();

        in_flight.insert(
            key,
            InFlight {
                generation: ticket.generation,
                fetch: fetch.clone(),
            },
        );
        fetch
    }
}

fn sweep(cache: &mut ViewCache, in_flight: &HashMap<ViewKey, InFlight>) -> usize {
    let busy: HashSet<ViewKey> = in_flight.keys().copied().collect();
    cache.collect_garbage(Instant::now(), &busy)
}

/// What a fetch does after one round against the backend.
enum Settled {
    Done(Result<ViewData, ApiError>),
    Join(SharedFetch),
    Again,
}

async fn run_fetch<T: Transport>(
    remote: Arc<RemoteTasks<T>>,
    cache: SharedCache,
    registry: InFlightMap,
    retry: RetryPolicy,
    mut ticket: FetchTicket,
) -> Result<ViewData, ApiError> {
    loop {
        let result = fetch_with_retry(&remote, ticket.key, &retry).await;

        let settled = {
            let mut cache = cache.lock();
            let mut registry = registry.lock();
            settle(&mut cache, &mut registry, &mut ticket, result)
        };
        match settled {
            Settled::Done(result) => return result,
            Settled::Join(fetch) => return fetch.await,
            Settled::Again => continue,
        }
    }
}

/// Write back or discard one round's result. Runs with both locks held.
fn settle(
    cache: &mut ViewCache,
    registry: &mut HashMap<ViewKey, InFlight>,
    ticket: &mut FetchTicket,
    result: Result<ViewData, ApiError>,
) -> Settled {
    let key = ticket.key;
    let registered = registry
        .get(&key)
        .is_some_and(|entry| entry.generation == ticket.generation);

    let outcome = match result {
        Err(err) => Err(err),
        Ok(data) => {
            if cache.complete_fetch(ticket, data.clone()) {
                Ok(data)
            } else if let Some(current) = cache.read(&key) {
                // A mutation started after this read; its state wins.
                debug!(view = %key, "discarding superseded read");
                Ok(current.clone())
            } else {
                debug!(view = %key, "superseded read left nothing cached, reading again");
                *ticket = cache.begin_fetch(key);
                if registered {
                    if let Some(entry) = registry.get_mut(&key) {
                        entry.generation = ticket.generation;
                    }
                    return Settled::Again;
                }
                return match registry.get(&key) {
                    Some(entry) if entry.generation == ticket.generation => Settled::Join(entry.fetch.clone()),
                    _ => Settled::Again,
                };
            }
        }
    };

    if registered {
        registry.remove(&key);
    }
    Settled::Done(outcome)
}

async fn fetch_with_retry<T: Transport>(
    remote: &RemoteTasks<T>,
    key: ViewKey,
    policy: &RetryPolicy,
) -> Result<ViewData, ApiError> {
    let retries = match key {
        ViewKey::All | ViewKey::Completed | ViewKey::Incompleted => policy.list,
        ViewKey::ById(_) => policy.item,
        ViewKey::Ping => policy.ping,
    };
    let mut attempt = 0;
    loop {
        match remote.fetch_view(key).await {
            Err(err) if attempt < retries && err != ApiError::NotFound => {
                let delay = policy.delay(attempt);
                attempt += 1;
                warn!(view = %key, attempt, ?delay, error = %err, "read failed, retrying");
                tokio::time::sleep(delay).await;
            }
            result => return result,
        }
    }
}

fn unexpected_payload(key: ViewKey) -> ApiError {
    ApiError::unknown(format!("unexpected payload cached for view {key}"))
}

//! Owner of the cache and everything that touches it.

use std::sync::Arc;

use crate::cache::{SharedCache, ViewCache};
use crate::client::TaskClient;
use crate::config::ClientConfig;
use crate::coordinator::MutationCoordinator;
use crate::http::Transport;
use crate::query::QueryFacade;
use crate::remote::RemoteTasks;

/// Created once at start-up and dropped at shutdown. The query and mutation
/// sides share one cache through it; nothing is global.
pub struct TaskStore<T> {
    remote: Arc<RemoteTasks<T>>,
    cache: SharedCache,
    query: QueryFacade<T>,
    mutations: MutationCoordinator<T>,
}

impl<T: Transport + 'static> TaskStore<T> {
    pub fn new(config: &ClientConfig, transport: T) -> Self {
        let client = TaskClient::new(&config.base_url);
        let remote = Arc::new(RemoteTasks::new(client, transport, config.timeout));
        let cache = ViewCache::shared(config.freshness);
        Self {
            query: QueryFacade::new(Arc::clone(&remote), Arc::clone(&cache), config.retry),
            mutations: MutationCoordinator::new(Arc::clone(&remote), Arc::clone(&cache)),
            remote,
            cache,
        }
    }

    pub fn query(&self) -> &QueryFacade<T> {
        &self.query
    }

    pub fn mutations(&self) -> &MutationCoordinator<T> {
        &self.mutations
    }

    pub fn remote(&self) -> &RemoteTasks<T> {
        &self.remote
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }
}

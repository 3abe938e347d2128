//! Async remote resource client: `TaskClient` plus a host `Transport`.

use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::{ViewData, ViewKey};
use crate::client::TaskClient;
use crate::error::ApiError;
use crate::filter::TaskFilter;
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::types::{Task, TaskCreate, TaskId, TaskUpdate};

/// One method per server action. Every call is bounded by `timeout`; a call
/// that exceeds it fails as `NetworkUnreachable`.
#[derive(Debug)]
pub struct RemoteTasks<T> {
    client: TaskClient,
    transport: T,
    timeout: Duration,
}

impl<T: Transport> RemoteTasks<T> {
    pub fn new(client: TaskClient, transport: T, timeout: Duration) -> Self {
        Self {
            client,
            transport,
            timeout,
        }
    }

    pub fn client(&self) -> &TaskClient {
        &self.client
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = request.method.as_str(), path = %request.path, "sending request");
        match tokio::time::timeout(self.timeout, self.transport.execute(request)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ApiError::network(format!("no response within {:?}", self.timeout))),
        }
    }

    pub async fn list(&self, filter: TaskFilter) -> Result<Vec<Task>, ApiError> {
        let response = self.send(self.client.build_list(filter)).await?;
        self.client.parse_list(response)
    }

    pub async fn list_all(&self) -> Result<Vec<Task>, ApiError> {
        self.list(TaskFilter::All).await
    }

    pub async fn list_completed(&self) -> Result<Vec<Task>, ApiError> {
        self.list(TaskFilter::Completed).await
    }

    pub async fn list_incompleted(&self) -> Result<Vec<Task>, ApiError> {
        self.list(TaskFilter::Incompleted).await
    }

    /// `Ok(None)` when the server answers 404.
    pub async fn get_by_id(&self, id: TaskId) -> Result<Option<Task>, ApiError> {
        let response = self.send(self.client.build_get(id)).await?;
        self.client.parse_get(response)
    }

    pub async fn create(&self, input: &TaskCreate) -> Result<Task, ApiError> {
        let request = self.client.build_create(input)?;
        let response = self.send(request).await?;
        self.client.parse_create(response)
    }

    pub async fn update(&self, id: TaskId, input: &TaskUpdate) -> Result<Task, ApiError> {
        let request = self.client.build_update(id, input)?;
        let response = self.send(request).await?;
        self.client.parse_update(response)
    }

    pub async fn delete(&self, id: TaskId) -> Result<(), ApiError> {
        let response = self.send(self.client.build_delete(id)).await?;
        self.client.parse_delete(response)
    }

    /// Delete that reports failure as `false`.
    ///
    /// "Already gone" and "network down" look the same here; use
    /// [`RemoteTasks::delete`] when the difference matters.
    pub async fn remove(&self, id: TaskId) -> bool {
        match self.delete(id).await {
            Ok(()) => true,
            Err(err) => {
                warn!(id, error = %err, "failed to delete task");
                false
            }
        }
    }

    pub async fn ping(&self) -> Result<String, ApiError> {
        let response = self.send(self.client.build_ping()).await?;
        self.client.parse_ping(response)
    }

    /// Fetch the authoritative payload behind a view key.
    pub async fn fetch_view(&self, key: ViewKey) -> Result<ViewData, ApiError> {
        match key {
            ViewKey::All => self.list_all().await.map(ViewData::List),
            ViewKey::Completed => self.list_completed().await.map(ViewData::List),
            ViewKey::Incompleted => self.list_incompleted().await.map(ViewData::List),
            ViewKey::ById(id) => self.get_by_id(id).await.map(ViewData::Item),
            ViewKey::Ping => self.ping().await.map(ViewData::Pong),
        }
    }
}

//! Mutation coordinator: optimistic write, network call, reconcile or unwind.
//!
//! # Design
//! Mutations do not lock each other out. Two mutations on the same task that
//! overlap in flight both project optimistically (the later projection
//! overwrites the earlier one) and each reconciles when its own response
//! arrives, so the last response wins, not the last request.

use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::SharedCache;
use crate::error::ApiError;
use crate::http::Transport;
use crate::mutation::{CreateMutation, DeleteMutation, UpdateMutation};
use crate::remote::RemoteTasks;
use crate::types::{Task, TaskCreate, TaskId, TaskUpdate};

pub struct MutationCoordinator<T> {
    remote: Arc<RemoteTasks<T>>,
    cache: SharedCache,
}

impl<T: Transport> MutationCoordinator<T> {
    pub fn new(remote: Arc<RemoteTasks<T>>, cache: SharedCache) -> Self {
        Self { remote, cache }
    }

    pub async fn create(&self, input: TaskCreate) -> Result<Task, ApiError> {
        input.validate()?;
        let mut mutation = CreateMutation::begin(&mut self.cache.lock());

        match self.remote.create(&input).await {
            Ok(task) => {
                mutation.commit(&mut self.cache.lock(), &task);
                info!(id = task.id, "task created");
                Ok(task)
            }
            Err(err) => {
                mutation.roll_back(&mut self.cache.lock());
                warn!(error = %err, "create failed");
                Err(err)
            }
        }
    }

    /// Partial update. Errors are returned after the cache has been unwound.
    pub async fn update(&self, id: TaskId, patch: TaskUpdate) -> Result<Task, ApiError> {
        patch.validate()?;
        let mut mutation = UpdateMutation::begin(&mut self.cache.lock(), id, &patch);

        match self.remote.update(id, &patch).await {
            Ok(task) => {
                mutation.commit(&mut self.cache.lock(), &task);
                info!(id, "task updated");
                Ok(task)
            }
            Err(err) => {
                mutation.roll_back(&mut self.cache.lock());
                warn!(id, error = %err, "update failed, cache rolled back");
                Err(err)
            }
        }
    }

    pub async fn toggle(&self, id: TaskId, completed: bool) -> Result<Task, ApiError> {
        self.update(id, TaskUpdate::toggle(completed)).await
    }

    /// Delete a task. On failure every task view is invalidated and the
    /// error is returned; the removed task is never resurrected locally.
    pub async fn delete(&self, id: TaskId) -> Result<(), ApiError> {
        let mut mutation = DeleteMutation::begin(&mut self.cache.lock(), id);

        match self.remote.delete(id).await {
            Ok(()) => {
                mutation.commit(&mut self.cache.lock());
                info!(id, "task deleted");
                Ok(())
            }
            Err(err) => {
                mutation.roll_back(&mut self.cache.lock());
                warn!(id, error = %err, "delete failed, all task views invalidated");
                Err(err)
            }
        }
    }
}

//! Per-mutation state machines over the view cache.
//!
//! # Design
//! Each mutation is `Pending` from the moment its optimistic projection is
//! written until the server answers, then becomes `Committed` or
//! `RolledBack`. The transitions are plain synchronous functions over a
//! `&mut ViewCache`, so they can be exercised without any transport. The
//! coordinator only decides which transition to run.
//!
//! Transitions out of a terminal state are ignored.

use tracing::debug;

use crate::cache::{ViewCache, ViewData, ViewKey};
use crate::types::{Task, TaskId, TaskUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    Pending,
    Committed,
    RolledBack,
}

/// Write a server-confirmed task into `ById` and every list view, fixing up
/// status-list membership when `completed` differs from what is cached.
fn reconcile(cache: &mut ViewCache, task: &Task) {
    cache.write(ViewKey::ById(task.id), ViewData::Item(Some(task.clone())));
    cache.patch_across_list_views(task.id, |_| Some(task.clone()));
    let from = ViewKey::status_list(!task.completed);
    let to = ViewKey::status_list(task.completed);
    let misplaced = cache
        .read(&from)
        .and_then(ViewData::as_list)
        .is_some_and(|tasks| tasks.iter().any(|t| t.id == task.id));
    let listed = cache
        .read(&ViewKey::All)
        .and_then(ViewData::as_list)
        .is_some_and(|tasks| tasks.iter().any(|t| t.id == task.id));
    if misplaced || listed {
        cache.move_between_lists(task, from, to);
    }
}

fn cancel_task_reads(cache: &mut ViewCache, id: Option<TaskId>) {
    for key in ViewKey::LISTS {
        cache.cancel_fetches(key);
    }
    if let Some(id) = id {
        cache.cancel_fetches(ViewKey::ById(id));
    }
}

/// Creation has no id until the server answers, so nothing is projected.
#[derive(Debug)]
pub struct CreateMutation {
    state: MutationState,
}

impl CreateMutation {
    pub fn begin(cache: &mut ViewCache) -> Self {
        cancel_task_reads(cache, None);
        Self {
            state: MutationState::Pending,
        }
    }

    pub fn state(&self) -> MutationState {
        self.state
    }

    /// Prepend the new task to `all` and its status list, and seed `ById`.
    pub fn commit(&mut self, cache: &mut ViewCache, task: &Task) {
        if self.state != MutationState::Pending {
            return;
        }
        cache.prepend(ViewKey::All, task);
        cache.prepend(ViewKey::status_list(task.completed), task);
        cache.write(ViewKey::ById(task.id), ViewData::Item(Some(task.clone())));
        self.state = MutationState::Committed;
    }

    pub fn roll_back(&mut self, _cache: &mut ViewCache) {
        if self.state == MutationState::Pending {
            self.state = MutationState::RolledBack;
        }
    }
}

/// Update or toggle of an existing task.
#[derive(Debug)]
pub struct UpdateMutation {
    id: TaskId,
    snapshot: Option<Task>,
    optimistic: Option<Task>,
    state: MutationState,
}

impl UpdateMutation {
    /// Snapshot `ById(id)` and, if it was cached, project the patched task
    /// into `ById` and every list view.
    pub fn begin(cache: &mut ViewCache, id: TaskId, patch: &TaskUpdate) -> Self {
        cancel_task_reads(cache, Some(id));

        let snapshot = cache
            .read(&ViewKey::ById(id))
            .cloned()
            .and_then(ViewData::into_item)
            .flatten();

        let optimistic = snapshot.as_ref().map(|previous| {
            let projected = previous.merged(patch);
            cache.write(ViewKey::ById(id), ViewData::Item(Some(projected.clone())));
            cache.patch_across_list_views(id, |_| Some(projected.clone()));
            if projected.completed != previous.completed {
                cache.move_between_lists(
                    &projected,
                    ViewKey::status_list(previous.completed),
                    ViewKey::status_list(projected.completed),
                );
            }
            projected
        });

        debug!(id, projected = optimistic.is_some(), "update pending");
        Self {
            id,
            snapshot,
            optimistic,
            state: MutationState::Pending,
        }
    }

    pub fn state(&self) -> MutationState {
        self.state
    }

    pub fn snapshot(&self) -> Option<&Task> {
        self.snapshot.as_ref()
    }

    pub fn optimistic(&self) -> Option<&Task> {
        self.optimistic.as_ref()
    }

    /// Server values win over the optimistic merge.
    pub fn commit(&mut self, cache: &mut ViewCache, task: &Task) {
        if self.state != MutationState::Pending {
            return;
        }
        reconcile(cache, task);
        self.state = MutationState::Committed;
    }

    /// Restore the snapshot into `ById` and mark `ById` and every list stale
    /// so the next read fetches ground truth.
    pub fn roll_back(&mut self, cache: &mut ViewCache) {
        if self.state != MutationState::Pending {
            return;
        }
        if let Some(previous) = &self.snapshot {
            cache.write(ViewKey::ById(self.id), ViewData::Item(Some(previous.clone())));
        }
        cache.invalidate(&ViewKey::ById(self.id));
        cache.invalidate_lists();
        self.state = MutationState::RolledBack;
    }
}

#[derive(Debug)]
pub struct DeleteMutation {
    id: TaskId,
    snapshot: Option<Task>,
    state: MutationState,
}

impl DeleteMutation {
    /// Remove the task from every list view and drop its `ById` entry.
    pub fn begin(cache: &mut ViewCache, id: TaskId) -> Self {
        cancel_task_reads(cache, Some(id));
        let snapshot = cache
            .remove(&ViewKey::ById(id))
            .and_then(ViewData::into_item)
            .flatten();
        let removed_from = cache.patch_across_list_views(id, |_| None);
        debug!(id, removed_from, "delete pending");
        Self {
            id,
            snapshot,
            state: MutationState::Pending,
        }
    }

    pub fn state(&self) -> MutationState {
        self.state
    }

    /// The task as it was cached before removal, if it was.
    pub fn snapshot(&self) -> Option<&Task> {
        self.snapshot.as_ref()
    }

    pub fn commit(&mut self, cache: &mut ViewCache) {
        if self.state != MutationState::Pending {
            return;
        }
        cache.remove(&ViewKey::ById(self.id));
        self.state = MutationState::Committed;
    }

    /// The snapshot is not restored: the server may have deleted the task
    /// even though the call failed. Everything is refetched instead.
    pub fn roll_back(&mut self, cache: &mut ViewCache) {
        if self.state != MutationState::Pending {
            return;
        }
        cache.invalidate_task_views();
        self.state = MutationState::RolledBack;
    }
}

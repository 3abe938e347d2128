//! In-memory view cache.
//!
//! # Design
//! Entries are keyed by logical view ([`ViewKey`]), not by request URL, so one
//! mutation can keep `all`, `completed` and `incompleted` consistent in a
//! single synchronous update. Staleness never drops data: an invalidated or
//! expired entry is still readable (stale-while-revalidate) but
//! [`ViewCache::lookup`] reports it as stale so the query side refetches.
//!
//! Reads in flight are tracked with a per-key generation counter. A fetch
//! takes a [`FetchTicket`] when it starts and may only write back if no
//! mutation has cancelled that key in the meantime.
//!
//! An entry that has been stale for longer than its gc window is evicted by
//! [`ViewCache::collect_garbage`]. Generation counters are never reset to a
//! value an outstanding ticket could still hold: pruned keys fall back to a
//! floor that is raised past every generation handed out so far.
//!
//! The cache itself is plain data with `&mut self` methods. Sharing happens
//! through [`SharedCache`], whose lock is never held across an `.await`.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::config::FreshnessPolicy;
use crate::types::{Task, TaskId};

/// Cache handle shared between the query and mutation sides.
pub type SharedCache = Arc<Mutex<ViewCache>>;

/// Logical cache partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKey {
    All,
    Completed,
    Incompleted,
    ById(TaskId),
    Ping,
}

impl ViewKey {
    /// The three list views, in the order mutations visit them.
    pub const LISTS: [ViewKey; 3] = [ViewKey::All, ViewKey::Completed, ViewKey::Incompleted];

    pub fn is_list(&self) -> bool {
        matches!(self, ViewKey::All | ViewKey::Completed | ViewKey::Incompleted)
    }

    /// Every key except `Ping`.
    pub fn is_task_view(&self) -> bool {
        !matches!(self, ViewKey::Ping)
    }

    /// The status list a task with the given `completed` flag belongs to.
    pub fn status_list(completed: bool) -> ViewKey {
        if completed {
            ViewKey::Completed
        } else {
            ViewKey::Incompleted
        }
    }
}

impl fmt::Display for ViewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewKey::All => write!(f, "all"),
            ViewKey::Completed => write!(f, "completed"),
            ViewKey::Incompleted => write!(f, "incompleted"),
            ViewKey::ById(id) => write!(f, "byId:{id}"),
            ViewKey::Ping => write!(f, "ping"),
        }
    }
}

/// Cached payload of a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewData {
    List(Vec<Task>),
    /// `None` is the explicit "not found" answer for a `ById` view.
    Item(Option<Task>),
    Pong(String),
}

impl ViewData {
    pub fn as_list(&self) -> Option<&[Task]> {
        match self {
            ViewData::List(tasks) => Some(tasks),
            _ => None,
        }
    }

    pub fn into_list(self) -> Option<Vec<Task>> {
        match self {
            ViewData::List(tasks) => Some(tasks),
            _ => None,
        }
    }

    pub fn into_item(self) -> Option<Option<Task>> {
        match self {
            ViewData::Item(task) => Some(task),
            _ => None,
        }
    }

    pub fn into_pong(self) -> Option<String> {
        match self {
            ViewData::Pong(text) => Some(text),
            _ => None,
        }
    }
}

/// Result of looking a key up with freshness taken into account.
#[derive(Debug, PartialEq, Eq)]
pub enum Lookup<'a> {
    Fresh(&'a ViewData),
    Stale(&'a ViewData),
    Absent,
}

/// Proof that a read started at a given generation of a view key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub key: ViewKey,
    pub generation: u64,
}

#[derive(Debug)]
struct Entry {
    data: ViewData,
    written_at: Instant,
    invalidated_at: Option<Instant>,
}

impl Entry {
    fn stale_since(&self, ttl: Duration) -> Instant {
        let expiry = self.written_at + ttl;
        match self.invalidated_at {
            Some(at) => at.min(expiry),
            None => expiry,
        }
    }
}

#[derive(Debug, Default)]
pub struct ViewCache {
    policy: FreshnessPolicy,
    entries: HashMap<ViewKey, Entry>,
    generations: HashMap<ViewKey, u64>,
    /// Last generation handed out by any key.
    clock: u64,
    /// Generation of keys missing from `generations`.
    floor: u64,
}

impl ViewCache {
    pub fn new(policy: FreshnessPolicy) -> Self {
        Self {
            policy,
            entries: HashMap::new(),
            generations: HashMap::new(),
            clock: 0,
            floor: 0,
        }
    }

    pub fn shared(policy: FreshnessPolicy) -> SharedCache {
        Arc::new(Mutex::new(Self::new(policy)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached payload regardless of freshness.
    pub fn read(&self, key: &ViewKey) -> Option<&ViewData> {
        self.entries.get(key).map(|entry| &entry.data)
    }

    pub fn lookup(&self, key: &ViewKey, now: Instant) -> Lookup<'_> {
        match self.entries.get(key) {
            None => Lookup::Absent,
            Some(entry) if entry.invalidated_at.is_some() => Lookup::Stale(&entry.data),
            Some(entry) if now.saturating_duration_since(entry.written_at) >= ttl(&self.policy, key) => {
                Lookup::Stale(&entry.data)
            }
            Some(entry) => Lookup::Fresh(&entry.data),
        }
    }

    pub fn is_fresh(&self, key: &ViewKey, now: Instant) -> bool {
        matches!(self.lookup(key, now), Lookup::Fresh(_))
    }

    /// Replace the entry and mark it fresh as of now.
    pub fn write(&mut self, key: ViewKey, data: ViewData) {
        self.entries.insert(
            key,
            Entry {
                data,
                written_at: Instant::now(),
                invalidated_at: None,
            },
        );
    }

    /// Mark one entry stale. Absent keys stay absent.
    pub fn invalidate(&mut self, key: &ViewKey) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.invalidated_at.get_or_insert_with(Instant::now);
        }
    }

    pub fn invalidate_lists(&mut self) {
        for key in ViewKey::LISTS {
            self.invalidate(&key);
        }
    }

    /// Mark every list and `ById` entry stale.
    pub fn invalidate_task_views(&mut self) {
        let now = Instant::now();
        for (key, entry) in self.entries.iter_mut() {
            if key.is_task_view() {
                entry.invalidated_at.get_or_insert(now);
            }
        }
    }

    pub fn remove(&mut self, key: &ViewKey) -> Option<ViewData> {
        self.entries.remove(key).map(|entry| entry.data)
    }

    /// Apply `transform` to the task with `id` in every cached list view.
    ///
    /// `Some(task)` replaces the entry in place, `None` removes it. Lists that
    /// do not contain `id` are left alone. Patching keeps each list's freshness
    /// metadata. Returns how many views changed.
    pub fn patch_across_list_views<F>(&mut self, id: TaskId, mut transform: F) -> usize
    where
        F: FnMut(&Task) -> Option<Task>,
    {
        let mut touched = 0;
        for key in ViewKey::LISTS {
            let Some(ViewData::List(tasks)) = self.entries.get_mut(&key).map(|entry| &mut entry.data) else {
                continue;
            };
            let Some(pos) = tasks.iter().position(|task| task.id == id) else {
                continue;
            };
            match transform(&tasks[pos]) {
                Some(updated) => tasks[pos] = updated,
                None => {
                    tasks.remove(pos);
                }
            }
            touched += 1;
        }
        touched
    }

    /// Take `task` out of `from` and put it at the front of `to`.
    ///
    /// Either side is skipped when that list is not cached. If `to` already
    /// holds the task it is replaced in place so ids stay unique.
    pub fn move_between_lists(&mut self, task: &Task, from: ViewKey, to: ViewKey) {
        if let Some(ViewData::List(tasks)) = self.entries.get_mut(&from).map(|entry| &mut entry.data) {
            tasks.retain(|t| t.id != task.id);
        }
        if let Some(ViewData::List(tasks)) = self.entries.get_mut(&to).map(|entry| &mut entry.data) {
            match tasks.iter().position(|t| t.id == task.id) {
                Some(pos) => tasks[pos] = task.clone(),
                None => tasks.insert(0, task.clone()),
            }
        }
    }

    /// Put `task` at the front of a cached list. Returns `false` when `key`
    /// is not a cached list.
    pub fn prepend(&mut self, key: ViewKey, task: &Task) -> bool {
        match self.entries.get_mut(&key).map(|entry| &mut entry.data) {
            Some(ViewData::List(tasks)) => {
                tasks.retain(|t| t.id != task.id);
                tasks.insert(0, task.clone());
                true
            }
            _ => false,
        }
    }

    pub fn begin_fetch(&self, key: ViewKey) -> FetchTicket {
        FetchTicket {
            key,
            generation: self.generations.get(&key).copied().unwrap_or(self.floor),
        }
    }

    /// Make every read in flight for `key` discard its result.
    pub fn cancel_fetches(&mut self, key: ViewKey) {
        self.clock += 1;
        self.generations.insert(key, self.clock);
    }

    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        self.begin_fetch(ticket.key).generation == ticket.generation
    }

    /// Write a fetched payload unless the read was cancelled. Returns whether
    /// the write happened.
    pub fn complete_fetch(&mut self, ticket: &FetchTicket, data: ViewData) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.write(ticket.key, data);
        true
    }

    /// Evict entries stale for longer than their gc window and forget the
    /// generation of keys with nothing cached.
    ///
    /// Keys in `busy` have a fetch in flight; they keep both their entry and
    /// their generation. Returns the number of evicted entries.
    pub fn collect_garbage(&mut self, now: Instant, busy: &HashSet<ViewKey>) -> usize {
        let policy = &self.policy;
        let before = self.entries.len();
        self.entries.retain(|key, entry| {
            busy.contains(key) || now < entry.stale_since(ttl(policy, key)) + gc_window(policy, key)
        });
        let evicted = before - self.entries.len();

        let idle: Vec<ViewKey> = self
            .generations
            .keys()
            .filter(|key| !self.entries.contains_key(key) && !busy.contains(key))
            .copied()
            .collect();
        if !idle.is_empty() {
            // Busy keys still on the old floor keep it explicitly.
            for key in busy {
                self.generations.entry(*key).or_insert(self.floor);
            }
            for key in &idle {
                self.generations.remove(key);
            }
            self.clock += 1;
            self.floor = self.clock;
        }
        if evicted > 0 || !idle.is_empty() {
            debug!(evicted, forgotten = idle.len(), "collected garbage");
        }
        evicted
    }
}

fn ttl(policy: &FreshnessPolicy, key: &ViewKey) -> Duration {
    match key {
        ViewKey::All | ViewKey::Completed | ViewKey::Incompleted => policy.list,
        ViewKey::ById(_) => policy.item,
        ViewKey::Ping => policy.ping,
    }
}

fn gc_window(policy: &FreshnessPolicy, key: &ViewKey) -> Duration {
    match key {
        ViewKey::All | ViewKey::Completed | ViewKey::Incompleted => policy.list_gc,
        ViewKey::ById(_) => policy.item_gc,
        ViewKey::Ping => policy.ping_gc,
    }
}

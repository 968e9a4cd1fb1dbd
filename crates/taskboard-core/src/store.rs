use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::BoardError;
use crate::filter::FilterState;
use crate::sort::{SortState, sort_tasks};
use crate::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Ready,
    Error,
}

/// Filtered and sorted tasks, tagged with the store revision they were
/// derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskView {
    revision: u64,
    tasks: Vec<Task>,
}

impl TaskView {
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Task> {
        self.tasks.iter()
    }

    pub fn into_tasks(self) -> Vec<Task> {
        self.tasks
    }
}

/// Immutable picture of the store at one revision.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    pub tasks: Arc<Vec<Task>>,
    pub filters: Arc<FilterState>,
    pub sort: SortState,
    pub state: LoadState,
    pub error: Option<BoardError>,
    pub revision: u64,
}

/// Canonical in-memory task list plus filter, sort and load status.
///
/// The task list is shared copy-on-write: snapshots handed out earlier keep
/// the list they were taken from.
#[derive(Debug, Clone)]
pub struct TaskStore {
    tasks: Arc<Vec<Task>>,
    filters: Arc<FilterState>,
    sort: SortState,
    state: LoadState,
    error: Option<BoardError>,
    loaded: bool,
    revision: u64,
    generation: u64,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new(SortState::default())
    }
}

impl TaskStore {
    pub fn new(sort: SortState) -> Self {
        Self {
            tasks: Arc::new(Vec::new()),
            filters: Arc::new(FilterState::default()),
            sort,
            state: LoadState::Idle,
            error: None,
            loaded: false,
            revision: 0,
            generation: 0,
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn error(&self) -> Option<&BoardError> {
        self.error.as_ref()
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn sort(&self) -> SortState {
        self.sort
    }

    /// Bumped on every observable mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Bumped only when the whole task list is replaced.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn all_tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Replaces the task list, clears any error and marks the store ready.
    #[tracing::instrument(skip(self, tasks), fields(count = tasks.len()))]
    pub fn set_tasks(&mut self, tasks: Vec<Task>) {
        self.tasks = Arc::new(tasks);
        self.state = LoadState::Ready;
        self.error = None;
        self.loaded = true;
        self.generation += 1;
        self.bump();
        debug!(generation = self.generation, "task list replaced");
    }

    /// Replaces tasks and filters as one update.
    #[tracing::instrument(skip(self, tasks, filters), fields(count = tasks.len()))]
    pub fn set_tasks_with_filters(&mut self, tasks: Vec<Task>, filters: FilterState) {
        self.filters = Arc::new(filters);
        self.set_tasks(tasks);
    }

    /// Setting the filters already in place is a no-op and keeps the revision.
    #[tracing::instrument(skip(self, filters))]
    pub fn set_filters(&mut self, filters: FilterState) {
        if *self.filters == filters {
            debug!("filters unchanged");
            return;
        }
        self.filters = Arc::new(filters);
        self.bump();
    }

    pub fn set_sort(&mut self, sort: SortState) {
        if self.sort == sort {
            return;
        }
        self.sort = sort;
        self.bump();
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.state = if loading {
            LoadState::Loading
        } else if self.error.is_some() {
            LoadState::Error
        } else if self.loaded {
            LoadState::Ready
        } else {
            LoadState::Idle
        };
        self.bump();
    }

    /// Records an error without discarding the last good task list.
    #[tracing::instrument(skip(self))]
    pub fn set_error(&mut self, error: BoardError) {
        warn!(error = %error, kept = self.tasks.len(), "store entered error state");
        self.error = Some(error);
        self.state = LoadState::Error;
        self.bump();
    }

    /// Mirrors a task acknowledged by the persistence collaborator. A copy
    /// older than the one already held is ignored; returns whether it was
    /// applied.
    #[tracing::instrument(skip(self, task), fields(id = %task.id))]
    pub fn upsert_task(&mut self, task: Task) -> bool {
        let tasks = Arc::make_mut(&mut self.tasks);
        match tasks.iter_mut().find(|held| held.id == task.id) {
            Some(held) if held.updated_at > task.updated_at => {
                warn!(
                    held = %held.updated_at,
                    incoming = %task.updated_at,
                    "ignoring stale task copy"
                );
                return false;
            }
            Some(held) => *held = task,
            None => tasks.push(task),
        }
        self.bump();
        true
    }

    pub fn remove_task(&mut self, id: &str) -> Option<Task> {
        let tasks = Arc::make_mut(&mut self.tasks);
        let idx = tasks.iter().position(|task| task.id == id)?;
        let removed = tasks.remove(idx);
        self.bump();
        Some(removed)
    }

    /// Applies `edit` to one task, advancing its `updated_at` to `now`.
    pub(crate) fn edit_task<F>(&mut self, id: &str, now: DateTime<Utc>, edit: F) -> Option<&Task>
    where
        F: FnOnce(&mut Task),
    {
        let tasks = Arc::make_mut(&mut self.tasks);
        let idx = tasks.iter().position(|task| task.id == id)?;
        edit(&mut tasks[idx]);
        tasks[idx].touch(now);
        self.bump();
        self.tasks.get(idx)
    }

    /// Replaces a task with the collaborator's acknowledged copy, keeping
    /// `updated_at` monotonic and clearing the pending flag. A copy of a task
    /// no longer held is dropped and `false` returned.
    pub(crate) fn commit_task(&mut self, mut task: Task) -> bool {
        let Some(idx) = self.tasks.iter().position(|held| held.id == task.id) else {
            debug!(task_id = %task.id, "acknowledged task no longer held; dropping");
            return false;
        };
        let tasks = Arc::make_mut(&mut self.tasks);
        let floor = tasks[idx].updated_at;
        task.pending = false;
        task.touch(floor);
        tasks[idx] = task;
        self.bump();
        true
    }

    /// Filter first, then a stable sort over the survivors.
    pub fn current_view(&self) -> TaskView {
        let mut tasks: Vec<Task> = self
            .tasks
            .iter()
            .filter(|task| self.filters.matches(task))
            .cloned()
            .collect();
        sort_tasks(&mut tasks, self.sort);
        TaskView {
            revision: self.revision,
            tasks,
        }
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            tasks: Arc::clone(&self.tasks),
            filters: Arc::clone(&self.filters),
            sort: self.sort,
            state: self.state,
            error: self.error.clone(),
            revision: self.revision,
        }
    }

    /// Drops all data and returns to `Idle`, keeping the sort preference.
    pub fn reset(&mut self) {
        let sort = self.sort;
        let revision = self.revision;
        let generation = self.generation;
        *self = Self::new(sort);
        self.revision = revision;
        self.generation = generation + 1;
        self.bump();
        info!("task store reset");
    }

    fn bump(&mut self) {
        self.revision += 1;
    }
}

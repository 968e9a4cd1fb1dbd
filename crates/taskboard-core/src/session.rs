//! Owned, injectable board state for one signed-in session.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::backend::{AuthProvider, SubtaskSuggestions, TaskBackend, suggest_subtasks};
use crate::board::{Board, group};
use crate::directory::{Directory, FilterChip, filter_chips};
use crate::drag::{DragGate, DragNode};
use crate::error::{BoardError, BoardResult, describe};
use crate::filter::FilterState;
use crate::sort::SortState;
use crate::stats::{Stats, StatsMemo};
use crate::store::{StoreSnapshot, TaskStore, TaskView};
use crate::task::{Status, Task, TaskDraft};
use crate::transition::{TransitionPhase, TransitionTicket, TransitionTracker};

/// Startup preferences for a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSettings {
    pub sort: SortState,
    pub drag_gate: DragGate,
}

/// Store, transition engine, stats memo and collaborators for one session.
///
/// Created by [`Session::init`] and emptied by [`Session::teardown`]; callers
/// pass the session (or a borrow of it) to whatever needs board state.
pub struct Session<B, A, D> {
    backend: B,
    auth: A,
    directory: D,
    store: TaskStore,
    transitions: TransitionTracker,
    stats_memo: StatsMemo,
    drag_gate: DragGate,
}

impl<B, A, D> Session<B, A, D>
where
    B: TaskBackend,
    A: AuthProvider,
    D: Directory,
{
    pub fn init(backend: B, auth: A, directory: D, settings: SessionSettings) -> Self {
        info!(sort_by = %settings.sort.sort_by, marker = settings.drag_gate.marker(), "session initialized");
        Self {
            backend,
            auth,
            directory,
            store: TaskStore::new(settings.sort),
            transitions: TransitionTracker::default(),
            stats_memo: StatsMemo::default(),
            drag_gate: settings.drag_gate,
        }
    }

    /// Drops every task, filter and in-flight record.
    pub fn teardown(&mut self) {
        self.store.reset();
        self.transitions.clear();
        self.stats_memo.clear();
        info!("session torn down");
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn transitions(&self) -> &TransitionTracker {
        &self.transitions
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.store.snapshot()
    }

    /// Fetches tasks for the current filters. On failure the store keeps its
    /// last good list and moves to the error state.
    #[tracing::instrument(skip(self))]
    pub async fn refresh(&mut self) -> BoardResult<usize> {
        self.store.set_loading(true);
        let filters = self.store.filters().clone();
        match self.backend.list_tasks(&filters).await {
            Ok(tasks) => {
                let count = tasks.len();
                self.store.set_tasks(tasks);
                self.transitions.forget_replaced(&self.store);
                info!(count, "tasks fetched");
                Ok(count)
            }
            Err(err) => {
                let failure = BoardError::FetchFailure(describe(&err));
                self.store.set_error(failure.clone());
                Err(failure)
            }
        }
    }

    pub fn set_filters(&mut self, filters: FilterState) {
        self.store.set_filters(filters);
    }

    pub fn set_sort(&mut self, sort: SortState) {
        self.store.set_sort(sort);
    }

    pub fn view(&self) -> TaskView {
        self.store.current_view()
    }

    pub fn board(&self) -> Board {
        group(self.store.current_view().tasks())
    }

    pub fn stats(&mut self) -> Stats {
        self.stats_at(Utc::now())
    }

    pub fn stats_at(&mut self, now: DateTime<Utc>) -> Stats {
        let view = self.store.current_view();
        let user = self.auth.current_user_id();
        self.stats_memo
            .get_or_compute(&view, user.as_deref(), now)
    }

    pub fn filter_chips(&self) -> Vec<FilterChip> {
        filter_chips(self.store.filters(), &self.directory)
    }

    pub fn should_start_drag<N: DragNode>(&self, origin: Option<&N>) -> bool {
        self.drag_gate.should_handle(origin)
    }

    /// First half of a status change: optimistic update, no I/O.
    pub fn begin_transition(&mut self, task_id: &str, status: Status) -> BoardResult<TransitionTicket> {
        self.transitions
            .begin(&mut self.store, task_id, status, Utc::now())
    }

    /// Second half: settle with whatever the collaborator answered.
    pub fn complete_transition(
        &mut self,
        ticket: TransitionTicket,
        outcome: anyhow::Result<Task>,
    ) -> BoardResult<TransitionPhase> {
        self.transitions
            .resolve(&mut self.store, ticket, outcome, Utc::now())
    }

    /// Optimistically moves a task and asks the backend to persist it,
    /// rolling back if the backend refuses.
    #[tracing::instrument(skip(self))]
    pub async fn request_status_change(
        &mut self,
        task_id: &str,
        status: Status,
    ) -> BoardResult<TransitionPhase> {
        let ticket = self.begin_transition(task_id, status)?;
        let outcome = self
            .backend
            .update_task_status(&ticket.task_id, &ticket.requested)
            .await;
        debug!(ok = outcome.is_ok(), "backend answered status change");
        self.complete_transition(ticket, outcome)
    }

    #[tracing::instrument(skip(self, draft), fields(title = %draft.title))]
    pub async fn create_task(&mut self, draft: TaskDraft) -> BoardResult<Task> {
        let task = self
            .backend
            .create_task(draft)
            .await
            .map_err(|err| BoardError::PersistenceFailure(describe(&err)))?;
        self.store.upsert_task(task.clone());
        Ok(task)
    }

    pub async fn suggest_subtasks(&self, title: &str, description: &str) -> SubtaskSuggestions {
        suggest_subtasks(&self.backend, title, description).await
    }
}

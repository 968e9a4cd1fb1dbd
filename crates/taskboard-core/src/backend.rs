//! Narrow interfaces to the collaborators the board core depends on.

use std::future::Future;

use tracing::warn;

use crate::error::{BoardError, describe};
use crate::filter::FilterState;
use crate::task::{Status, Subtask, Task, TaskDraft};

/// Persistence/RPC client. Every call may fail; the session turns failures
/// into store state or [`BoardError`] values.
pub trait TaskBackend {
    fn list_tasks(&self, filters: &FilterState) -> impl Future<Output = anyhow::Result<Vec<Task>>>;

    fn update_task_status(
        &self,
        id: &str,
        status: &Status,
    ) -> impl Future<Output = anyhow::Result<Task>>;

    fn create_task(&self, draft: TaskDraft) -> impl Future<Output = anyhow::Result<Task>>;

    /// Best-effort decomposition of a task into steps.
    fn generate_subtasks(
        &self,
        title: &str,
        description: &str,
    ) -> impl Future<Output = anyhow::Result<Vec<Subtask>>>;
}

/// Identity of the signed-in user.
pub trait AuthProvider {
    fn current_user_id(&self) -> Option<String>;
}

/// Auth collaborator with a fixed identity, e.g. from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticAuth {
    user_id: Option<String>,
}

impl StaticAuth {
    pub fn new(user_id: Option<String>) -> Self {
        Self { user_id }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl AuthProvider for StaticAuth {
    fn current_user_id(&self) -> Option<String> {
        self.user_id.clone()
    }
}

/// Subtask suggestions plus the message to show when generation failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtaskSuggestions {
    pub items: Vec<Subtask>,
    pub error: Option<String>,
}

/// Asks the backend for subtasks; a failure becomes an empty list with a
/// user-facing message instead of an error.
#[tracing::instrument(skip(backend, description))]
pub async fn suggest_subtasks<B: TaskBackend>(
    backend: &B,
    title: &str,
    description: &str,
) -> SubtaskSuggestions {
    match backend.generate_subtasks(title, description).await {
        Ok(items) => SubtaskSuggestions { items, error: None },
        Err(err) => {
            let failure = BoardError::SubtaskGenerationFailure(describe(&err));
            warn!(error = %failure, "subtask generation degraded to empty list");
            SubtaskSuggestions {
                items: Vec::new(),
                error: Some(failure.to_string()),
            }
        }
    }
}

/// Failure conditions surfaced by the store, the transition engine and the
/// collaborator boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    /// Reading tasks from the persistence collaborator failed.
    #[error("failed to fetch tasks: {0}")]
    FetchFailure(String),

    /// The collaborator rejected a status change; the optimistic value was
    /// rolled back.
    #[error("status change for task {task_id} was rejected: {reason}")]
    TransitionFailure { task_id: String, reason: String },

    /// A status change for the same task is already awaiting acknowledgement.
    #[error("a status change for task {0} is already in flight")]
    ConflictingTransition(String),

    #[error("subtask generation failed: {0}")]
    SubtaskGenerationFailure(String),

    /// A create or update other than a status transition failed.
    #[error("failed to persist task: {0}")]
    PersistenceFailure(String),

    #[error("task not found: {0}")]
    UnknownTask(String),

    #[error("unknown task status: {0}")]
    InvalidStatus(String),

    /// The ticket no longer matches the transition in flight for its task.
    #[error("no matching status change is in flight for task {0}")]
    StaleTicket(String),
}

pub type BoardResult<T> = Result<T, BoardError>;

/// Flattens a collaborator error chain into the message carried by a
/// [`BoardError`].
pub(crate) fn describe(err: &anyhow::Error) -> String {
    format!("{err:#}")
}

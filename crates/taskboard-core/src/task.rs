use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::datetime::flexible_date_serde;

/// Workflow stage of a task. Board order is `Todo`, `InProgress`, `Review`, `Done`.
///
/// Strings outside the four known stages are kept as `Unknown` so bad
/// records can be reported instead of failing a whole payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    Todo,
    InProgress,
    Review,
    Done,
    Unknown(String),
}

impl Status {
    pub const KNOWN: [Status; 4] = [
        Status::Todo,
        Status::InProgress,
        Status::Review,
        Status::Done,
    ];

    /// Parses one of the four known wire names.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "todo" => Some(Self::Todo),
            "in-progress" | "in_progress" | "inprogress" => Some(Self::InProgress),
            "review" => Some(Self::Review),
            "done" => Some(Self::Done),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in-progress",
            Self::Review => "review",
            Self::Done => "done",
            Self::Unknown(raw) => raw.as_str(),
        }
    }

    /// Position on the board, `None` for unknown stages.
    pub fn stage(&self) -> Option<usize> {
        match self {
            Self::Todo => Some(0),
            Self::InProgress => Some(1),
            Self::Review => Some(2),
            Self::Done => Some(3),
            Self::Unknown(_) => None,
        }
    }

    pub fn is_known(&self) -> bool {
        self.stage().is_some()
    }
}

impl From<String> for Status {
    fn from(raw: String) -> Self {
        Self::parse(&raw).unwrap_or(Self::Unknown(raw))
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        match status {
            Status::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            anyhow::anyhow!("unknown status '{s}', expected todo, in-progress, review or done")
        })
    }
}

/// Severity, ordered `Low < Medium < High < Urgent`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" | "l" => Ok(Self::Low),
            "medium" | "med" | "m" => Ok(Self::Medium),
            "high" | "h" => Ok(Self::High),
            "urgent" | "u" => Ok(Self::Urgent),
            other => Err(anyhow::anyhow!("unknown priority: {other}")),
        }
    }
}

/// Embedded summary of a referenced user or project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySummary {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Weak reference to a user or project: either a bare id or an embedded summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityRef {
    Id(String),
    Embedded(EntitySummary),
}

pub type AssigneeRef = EntityRef;
pub type ProjectRef = EntityRef;

impl EntityRef {
    /// `_id` wins over `id` for embedded summaries.
    pub fn effective_id(&self) -> Option<&str> {
        match self {
            Self::Id(id) => Some(id.as_str()),
            Self::Embedded(summary) => summary
                .object_id
                .as_deref()
                .or(summary.id.as_deref()),
        }
    }

    pub fn display_name(&self) -> Option<&str> {
        match self {
            Self::Id(_) => None,
            Self::Embedded(summary) => summary.name.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(alias = "_id")]
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub description: String,

    pub status: Status,

    #[serde(default)]
    pub priority: Priority,

    #[serde(
        default,
        with = "flexible_date_serde::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub tags: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<AssigneeRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectRef>,

    #[serde(with = "flexible_date_serde")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "flexible_date_serde")]
    pub updated_at: DateTime<Utc>,

    /// Set while an optimistic status change awaits acknowledgement.
    #[serde(skip)]
    pub pending: bool,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            status: Status::Todo,
            priority: Priority::Medium,
            due_date: None,
            tags: BTreeSet::new(),
            assignee: None,
            project_id: None,
            created_at: now,
            updated_at: now,
            pending: false,
        }
    }

    pub fn assignee_id(&self) -> Option<&str> {
        self.assignee.as_ref().and_then(EntityRef::effective_id)
    }

    pub fn project_ref_id(&self) -> Option<&str> {
        self.project_id.as_ref().and_then(EntityRef::effective_id)
    }

    /// Advances `updated_at` without ever moving it backwards.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.updated_at {
            self.updated_at = now;
        }
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status != Status::Done && self.due_date.is_some_and(|due| due < now)
    }
}

/// Fields supplied when asking the persistence collaborator to create a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, with = "flexible_date_serde::option")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
}

impl TaskDraft {
    pub fn into_task(self, id: String, now: DateTime<Utc>) -> Task {
        let mut task = Task::new(id, self.title, now);
        task.description = self.description;
        task.status = self.status.unwrap_or(Status::Todo);
        task.priority = self.priority;
        task.due_date = self.due_date;
        task.tags = self.tags;
        task.assignee = self.assignee.map(EntityRef::Id);
        task.project_id = self.project_id.map(EntityRef::Id);
        task
    }
}

/// A suggested breakdown step for a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{EntityRef, Priority, Status, Task};

    #[test]
    fn status_wire_names_and_unknown_fallback() {
        let parsed: Vec<Status> =
            serde_json::from_str(r#"["todo","in-progress","review","done","archived"]"#)
                .expect("parse statuses");
        assert_eq!(
            parsed,
            vec![
                Status::Todo,
                Status::InProgress,
                Status::Review,
                Status::Done,
                Status::Unknown("archived".to_string()),
            ]
        );
        assert_eq!(
            serde_json::to_string(&Status::InProgress).expect("serialize"),
            "\"in-progress\""
        );
        assert_eq!(
            serde_json::to_string(&Status::Unknown("archived".to_string())).expect("serialize"),
            "\"archived\""
        );
    }

    #[test]
    fn priority_orders_by_severity() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::Medium < Priority::High);
        assert!(Priority::High < Priority::Urgent);
    }

    #[test]
    fn embedded_assignee_prefers_object_id() {
        let embedded: EntityRef =
            serde_json::from_str(r#"{"_id":"u-obj","id":"u-plain","name":"Ana"}"#)
                .expect("parse embedded");
        assert_eq!(embedded.effective_id(), Some("u-obj"));
        assert_eq!(embedded.display_name(), Some("Ana"));

        let plain: EntityRef = serde_json::from_str(r#"{"id":"u-plain"}"#).expect("parse");
        assert_eq!(plain.effective_id(), Some("u-plain"));

        let bare: EntityRef = serde_json::from_str(r#""u-bare""#).expect("parse bare");
        assert_eq!(bare.effective_id(), Some("u-bare"));
    }

    #[test]
    fn task_parses_document_shape() {
        let raw = r#"{
            "_id": "t1",
            "title": "Ship board",
            "status": "review",
            "priority": "urgent",
            "dueDate": "2026-03-01T00:00:00Z",
            "tags": ["ui", "release"],
            "assignee": {"_id": "u1", "name": "Ana"},
            "projectId": "p1",
            "createdAt": "2026-02-01T10:00:00Z",
            "updatedAt": "2026-02-02T10:00:00Z"
        }"#;
        let task: Task = serde_json::from_str(raw).expect("parse task");
        assert_eq!(task.id, "t1");
        assert_eq!(task.status, Status::Review);
        assert_eq!(task.priority, Priority::Urgent);
        assert_eq!(task.assignee_id(), Some("u1"));
        assert_eq!(task.project_ref_id(), Some("p1"));
        assert!(task.tags.contains("release"));
        assert!(!task.pending);
    }

    #[test]
    fn touch_never_moves_backwards() {
        let later = Utc.with_ymd_and_hms(2026, 2, 2, 0, 0, 0).unwrap();
        let earlier = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        let mut task = Task::new("t1", "x", later);
        task.touch(earlier);
        assert_eq!(task.updated_at, later);
    }
}

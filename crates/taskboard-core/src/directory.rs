use std::collections::BTreeMap;

use crate::filter::FilterState;

pub const UNKNOWN_LABEL: &str = "Unknown";

/// Resolves project and user ids to display labels.
pub trait Directory {
    fn lookup_project(&self, id: &str) -> Option<String>;

    fn lookup_user(&self, id: &str) -> Option<String>;

    fn project_label(&self, id: &str) -> String {
        self.lookup_project(id)
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
    }

    fn user_label(&self, id: &str) -> String {
        self.lookup_user(id)
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
    }
}

/// In-memory directory, typically filled from `directory.*` config keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticDirectory {
    projects: BTreeMap<String, String>,
    users: BTreeMap<String, String>,
}

impl StaticDirectory {
    pub fn insert_project(&mut self, id: impl Into<String>, label: impl Into<String>) {
        self.projects.insert(id.into(), label.into());
    }

    pub fn insert_user(&mut self, id: impl Into<String>, label: impl Into<String>) {
        self.users.insert(id.into(), label.into());
    }
}

impl Directory for StaticDirectory {
    fn lookup_project(&self, id: &str) -> Option<String> {
        self.projects.get(id).cloned()
    }

    fn lookup_user(&self, id: &str) -> Option<String> {
        self.users.get(id).cloned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipKind {
    Status,
    Priority,
    Assignee,
    Tag,
    Search,
    DueDate,
    Project,
}

/// One active filter constraint, labeled for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterChip {
    pub kind: ChipKind,
    pub label: String,
}

/// Lists the active constraints of `filters` in a stable order.
pub fn filter_chips<D: Directory>(filters: &FilterState, directory: &D) -> Vec<FilterChip> {
    let mut chips = Vec::new();
    let mut push = |kind, label: String| chips.push(FilterChip { kind, label });

    if let Some(status) = &filters.status {
        push(ChipKind::Status, format!("status: {status}"));
    }
    if let Some(priority) = filters.priority {
        push(ChipKind::Priority, format!("priority: {priority}"));
    }
    if let Some(assignee) = filters.assignee.as_deref() {
        push(ChipKind::Assignee, format!("assignee: {}", directory.user_label(assignee)));
    }
    for tag in &filters.tags {
        push(ChipKind::Tag, format!("#{tag}"));
    }
    if let Some(term) = filters.search_term() {
        push(ChipKind::Search, format!("\"{term}\""));
    }
    if let Some(range) = filters.date_range {
        push(
            ChipKind::DueDate,
            format!(
                "due: {} .. {}",
                range.from.format("%Y-%m-%d"),
                range.to.format("%Y-%m-%d")
            ),
        );
    }
    for project in &filters.selected_projects {
        push(ChipKind::Project, format!("project: {}", directory.project_label(project)));
    }

    chips
}

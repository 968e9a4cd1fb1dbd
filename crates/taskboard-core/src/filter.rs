use std::collections::BTreeSet;

use chrono::{
  DateTime,
  Utc
};
use serde::{
  Deserialize,
  Serialize
};
use tracing::trace;

use crate::task::{
  Priority,
  Status,
  Task
};

/// Inclusive `[from, to]` window over a
/// task's due date.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
pub struct DateRange {
  pub from: DateTime<Utc>,
  pub to:   DateTime<Utc>
}

impl DateRange {
  pub fn contains(
    &self,
    at: DateTime<Utc>
  ) -> bool {
    self.from <= at && at <= self.to
  }
}

/// Which tasks are visible. Every
/// field left unset is a wildcard.
///
/// Held behind an `Arc` by the store;
/// replacing it never touches a
/// snapshot an observer already holds.
#[derive(
  Debug,
  Clone,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
  #[serde(default)]
  pub status:            Option<Status>,
  #[serde(default)]
  pub priority:          Option<Priority>,
  #[serde(default)]
  pub assignee:          Option<String>,
  #[serde(default)]
  pub tags:              BTreeSet<String>,
  #[serde(default)]
  pub search:            Option<String>,
  #[serde(default)]
  pub date_range:        Option<DateRange>,
  #[serde(default)]
  pub selected_projects: BTreeSet<String>
}

impl FilterState {
  pub fn matches(
    &self,
    task: &Task
  ) -> bool {
    matches(task, self)
  }

  /// Search term, if it constrains
  /// anything.
  pub fn search_term(
    &self
  ) -> Option<&str> {
    self
      .search
      .as_deref()
      .filter(|term| {
        !term.trim().is_empty()
      })
  }

  pub fn is_unconstrained(
    &self
  ) -> bool {
    self.status.is_none()
      && self.priority.is_none()
      && self.assignee.is_none()
      && self.tags.is_empty()
      && self.search_term().is_none()
      && self.date_range.is_none()
      && self
        .selected_projects
        .is_empty()
  }
}

/// Pure predicate: does `task` pass
/// every constraint in `filters`?
///
/// A `date_range` with `from > to`
/// is taken literally and matches
/// nothing.
pub fn matches(
  task: &Task,
  filters: &FilterState
) -> bool {
  let ok = status_matches(
    task, filters
  ) && priority_matches(task, filters)
    && assignee_matches(task, filters)
    && tags_match(task, filters)
    && search_matches(task, filters)
    && due_in_range(task, filters)
    && project_selected(task, filters);

  trace!(id = %task.id, ok, "filter predicate evaluation");
  ok
}

fn status_matches(
  task: &Task,
  filters: &FilterState
) -> bool {
  filters
    .status
    .as_ref()
    .is_none_or(|status| {
      &task.status == status
    })
}

fn priority_matches(
  task: &Task,
  filters: &FilterState
) -> bool {
  filters
    .priority
    .is_none_or(|priority| {
      task.priority == priority
    })
}

fn assignee_matches(
  task: &Task,
  filters: &FilterState
) -> bool {
  match filters.assignee.as_deref() {
    | None => true,
    | Some(wanted) => {
      task.assignee_id() == Some(wanted)
    }
  }
}

fn tags_match(
  task: &Task,
  filters: &FilterState
) -> bool {
  filters.tags.is_empty()
    || filters
      .tags
      .iter()
      .any(|tag| task.tags.contains(tag))
}

fn search_matches(
  task: &Task,
  filters: &FilterState
) -> bool {
  let Some(term) =
    filters.search_term()
  else {
    return true;
  };

  let needle = term.to_lowercase();
  task
    .title
    .to_lowercase()
    .contains(&needle)
    || task
      .description
      .to_lowercase()
      .contains(&needle)
}

fn due_in_range(
  task: &Task,
  filters: &FilterState
) -> bool {
  match (
    filters.date_range,
    task.due_date
  ) {
    | (None, _) => true,
    | (Some(_), None) => false,
    | (Some(range), Some(due)) => {
      range.contains(due)
    }
  }
}

fn project_selected(
  task: &Task,
  filters: &FilterState
) -> bool {
  if filters
    .selected_projects
    .is_empty()
  {
    return true;
  }

  task.project_ref_id().is_some_and(
    |project| {
      filters
        .selected_projects
        .contains(project)
    }
  )
}

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{
  Deserialize,
  Serialize
};

use crate::task::{
  Status,
  Task
};

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
  #[default]
  CreatedAt,
  UpdatedAt,
  DueDate,
  Priority,
  Status,
  Title
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
  Asc,
  #[default]
  Desc
}

/// Defaults to newest first
/// (`createdAt` / `desc`).
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct SortState {
  pub sort_by:    SortKey,
  pub sort_order: SortOrder
}

impl SortState {
  pub fn new(
    sort_by: SortKey,
    sort_order: SortOrder
  ) -> Self {
    Self {
      sort_by,
      sort_order
    }
  }
}

impl SortKey {
  pub fn as_str(self) -> &'static str {
    match self {
      | Self::CreatedAt => "createdAt",
      | Self::UpdatedAt => "updatedAt",
      | Self::DueDate => "dueDate",
      | Self::Priority => "priority",
      | Self::Status => "status",
      | Self::Title => "title"
    }
  }
}

impl fmt::Display for SortKey {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for SortKey {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let normalized: String = s
      .trim()
      .chars()
      .filter(|c| *c != '_' && *c != '-')
      .collect::<String>()
      .to_ascii_lowercase();
    match normalized.as_str() {
      | "createdat" | "created" => {
        Ok(Self::CreatedAt)
      }
      | "updatedat" | "updated" => {
        Ok(Self::UpdatedAt)
      }
      | "duedate" | "due" => {
        Ok(Self::DueDate)
      }
      | "priority" => Ok(Self::Priority),
      | "status" => Ok(Self::Status),
      | "title" => Ok(Self::Title),
      | _ => {
        Err(anyhow!(
          "unknown sort key: {s}"
        ))
      }
    }
  }
}

impl FromStr for SortOrder {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "asc" | "ascending" => {
        Ok(Self::Asc)
      }
      | "desc" | "descending" => {
        Ok(Self::Desc)
      }
      | other => {
        Err(anyhow!(
          "unknown sort order: {other}"
        ))
      }
    }
  }
}

/// Board position used as the status
/// sort ordinal; unknown stages sort
/// after `done`.
fn status_rank(status: &Status) -> usize {
  status
    .stage()
    .unwrap_or(Status::KNOWN.len())
}

/// Ascending comparison on a single
/// key. Tasks without a due date sort
/// after every dated task.
fn compare_asc(
  a: &Task,
  b: &Task,
  sort_by: SortKey
) -> Ordering {
  match sort_by {
    | SortKey::CreatedAt => {
      a.created_at.cmp(&b.created_at)
    }
    | SortKey::UpdatedAt => {
      a.updated_at.cmp(&b.updated_at)
    }
    | SortKey::DueDate => {
      match (a.due_date, b.due_date) {
        | (Some(x), Some(y)) => x.cmp(&y),
        | (Some(_), None) => {
          Ordering::Less
        }
        | (None, Some(_)) => {
          Ordering::Greater
        }
        | (None, None) => Ordering::Equal
      }
    }
    | SortKey::Priority => {
      a.priority.cmp(&b.priority)
    }
    | SortKey::Status => {
      status_rank(&a.status)
        .cmp(&status_rank(&b.status))
    }
    | SortKey::Title => {
      a.title
        .to_lowercase()
        .cmp(&b.title.to_lowercase())
    }
  }
}

/// Total order over tasks for one sort
/// key. `Desc` is the plain reversal
/// of `Asc`, so equal keys still
/// compare `Equal`.
pub fn compare(
  a: &Task,
  b: &Task,
  sort_by: SortKey,
  sort_order: SortOrder
) -> Ordering {
  let ord = compare_asc(a, b, sort_by);
  match sort_order {
    | SortOrder::Asc => ord,
    | SortOrder::Desc => ord.reverse()
  }
}

/// Stable in-place sort; tasks with
/// equal keys keep their input order.
pub fn sort_tasks(
  tasks: &mut [Task],
  state: SortState
) {
  tasks.sort_by(|a, b| {
    compare(
      a,
      b,
      state.sort_by,
      state.sort_order
    )
  });
}

#[cfg(test)]
mod tests {
  use std::cmp::Ordering;

  use chrono::{
    DateTime,
    Duration,
    TimeZone,
    Utc
  };

  use super::{
    SortKey,
    SortOrder,
    SortState,
    compare,
    sort_tasks
  };
  use crate::task::{
    Priority,
    Status,
    Task
  };

  fn at() -> DateTime<Utc> {
    Utc
      .with_ymd_and_hms(
        2026, 2, 16, 5, 0, 0
      )
      .unwrap()
  }

  fn ids(tasks: &[Task]) -> Vec<&str> {
    tasks
      .iter()
      .map(|t| t.id.as_str())
      .collect()
  }

  #[test]
  fn default_is_created_desc() {
    let state = SortState::default();
    assert_eq!(
      state.sort_by,
      SortKey::CreatedAt
    );
    assert_eq!(
      state.sort_order,
      SortOrder::Desc
    );
  }

  #[test]
  fn priority_sorts_by_severity_not_name()
   {
    let mut tasks: Vec<Task> = [
      ("a", Priority::Urgent),
      ("b", Priority::Low),
      ("c", Priority::High),
      ("d", Priority::Medium)
    ]
    .into_iter()
    .map(|(id, priority)| {
      let mut task =
        Task::new(id, id, at());
      task.priority = priority;
      task
    })
    .collect();

    sort_tasks(
      &mut tasks,
      SortState::new(
        SortKey::Priority,
        SortOrder::Asc
      )
    );
    assert_eq!(
      ids(&tasks),
      vec!["b", "d", "c", "a"]
    );
  }

  #[test]
  fn status_sorts_by_board_stage() {
    let mut tasks: Vec<Task> = [
      ("a", Status::Done),
      ("b", Status::Review),
      ("c", Status::Todo),
      ("d", Status::InProgress)
    ]
    .into_iter()
    .map(|(id, status)| {
      let mut task =
        Task::new(id, id, at());
      task.status = status;
      task
    })
    .collect();

    sort_tasks(
      &mut tasks,
      SortState::new(
        SortKey::Status,
        SortOrder::Asc
      )
    );
    assert_eq!(
      ids(&tasks),
      vec!["c", "d", "b", "a"]
    );
  }

  #[test]
  fn equal_keys_keep_input_order_in_both_directions()
   {
    let make = |id: &str,
                priority: Priority| {
      let mut task =
        Task::new(id, id, at());
      task.priority = priority;
      task
    };
    let input = vec![
      make("h1", Priority::High),
      make("l1", Priority::Low),
      make("h2", Priority::High),
      make("l2", Priority::Low),
    ];

    let mut asc = input.clone();
    sort_tasks(
      &mut asc,
      SortState::new(
        SortKey::Priority,
        SortOrder::Asc
      )
    );
    assert_eq!(
      ids(&asc),
      vec!["l1", "l2", "h1", "h2"]
    );

    let mut desc = input;
    sort_tasks(
      &mut desc,
      SortState::new(
        SortKey::Priority,
        SortOrder::Desc
      )
    );
    assert_eq!(
      ids(&desc),
      vec!["h1", "h2", "l1", "l2"]
    );
  }

  #[test]
  fn undated_tasks_sort_last_ascending()
  {
    let mut soon =
      Task::new("soon", "soon", at());
    soon.due_date =
      Some(at() + Duration::days(1));
    let undated =
      Task::new("none", "none", at());
    let mut late =
      Task::new("late", "late", at());
    late.due_date =
      Some(at() + Duration::days(9));

    let mut tasks =
      vec![undated, late, soon];
    sort_tasks(
      &mut tasks,
      SortState::new(
        SortKey::DueDate,
        SortOrder::Asc
      )
    );
    assert_eq!(
      ids(&tasks),
      vec!["soon", "late", "none"]
    );
  }

  #[test]
  fn desc_reverses_the_comparator() {
    let older = Task::new(
      "old",
      "old",
      at() - Duration::hours(1)
    );
    let newer =
      Task::new("new", "new", at());
    assert_eq!(
      compare(
        &older,
        &newer,
        SortKey::CreatedAt,
        SortOrder::Asc
      ),
      Ordering::Less
    );
    assert_eq!(
      compare(
        &older,
        &newer,
        SortKey::CreatedAt,
        SortOrder::Desc
      ),
      Ordering::Greater
    );
  }

  #[test]
  fn parses_keys_and_orders() {
    assert_eq!(
      "dueDate"
        .parse::<SortKey>()
        .expect("dueDate"),
      SortKey::DueDate
    );
    assert_eq!(
      "updated_at"
        .parse::<SortKey>()
        .expect("updated_at"),
      SortKey::UpdatedAt
    );
    assert_eq!(
      "ASC"
        .parse::<SortOrder>()
        .expect("asc"),
      SortOrder::Asc
    );
    assert!(
      "size".parse::<SortKey>().is_err()
    );
  }
}

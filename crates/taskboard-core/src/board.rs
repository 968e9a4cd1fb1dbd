use serde::Serialize;
use tracing::warn;

use crate::task::{
  Status,
  Task
};

/// One fixed board column.
#[derive(
  Debug, Clone, PartialEq, Eq,
)]
pub struct KanbanColumn {
  pub status: Status,
  pub title:  &'static str
}

/// Board order. Never reordered by
/// data.
pub const KANBAN_COLUMNS: [KanbanColumn;
  4] = [
  KanbanColumn {
    status: Status::Todo,
    title:  "To Do"
  },
  KanbanColumn {
    status: Status::InProgress,
    title:  "In Progress"
  },
  KanbanColumn {
    status: Status::Review,
    title:  "Review"
  },
  KanbanColumn {
    status: Status::Done,
    title:  "Done"
  }
];

#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
pub struct BoardColumn {
  pub status: Status,
  pub title:  &'static str,
  pub tasks:  Vec<Task>
}

/// A task left off the board because
/// its status is not a known stage.
#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
pub struct GroupingAnomaly {
  pub task_id: String,
  pub status:  String
}

/// Tasks partitioned into the fixed
/// columns, plus any records that
/// could not be placed.
#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
pub struct Board {
  columns:   Vec<BoardColumn>,
  anomalies: Vec<GroupingAnomaly>
}

impl Board {
  fn empty() -> Self {
    Self {
      columns:   KANBAN_COLUMNS
        .iter()
        .map(|column| {
          BoardColumn {
            status: column
              .status
              .clone(),
            title:  column.title,
            tasks:  Vec::new()
          }
        })
        .collect(),
      anomalies: Vec::new()
    }
  }

  pub fn columns(
    &self
  ) -> &[BoardColumn] {
    &self.columns
  }

  pub fn column(
    &self,
    status: &Status
  ) -> Option<&BoardColumn> {
    self
      .columns
      .iter()
      .find(|column| {
        &column.status == status
      })
  }

  pub fn statuses(
    &self
  ) -> impl Iterator<Item = &Status> {
    self
      .columns
      .iter()
      .map(|column| &column.status)
  }

  pub fn anomalies(
    &self
  ) -> &[GroupingAnomaly] {
    &self.anomalies
  }
}

/// Single pass over `view`: every task
/// lands in its status column in view
/// order. Unknown statuses are dropped
/// and recorded as anomalies.
#[tracing::instrument(skip(view), fields(count = view.len()))]
pub fn group(view: &[Task]) -> Board {
  let mut board = Board::empty();

  for task in view {
    match task.status.stage() {
      | Some(idx) => {
        board.columns[idx]
          .tasks
          .push(task.clone());
      }
      | None => {
        warn!(
          id = %task.id,
          status = %task.status,
          "dropping task with unknown status from board"
        );
        board.anomalies.push(
          GroupingAnomaly {
            task_id: task.id.clone(),
            status:  task
              .status
              .to_string()
          }
        );
      }
    }
  }

  board
}

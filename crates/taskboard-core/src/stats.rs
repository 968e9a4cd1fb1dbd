use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::trace;

use crate::store::TaskView;
use crate::task::{Status, Task};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub overdue: usize,
    /// Whole percent, `0` when the view is empty.
    pub completion_rate: u8,
    pub my_stats: UserStats,
}

/// Aggregates over a task view. `now` is sampled once by the caller, so
/// every task is judged against the same instant. Unassigned tasks never
/// count toward `my_stats`.
pub fn compute(tasks: &[Task], current_user: Option<&str>, now: DateTime<Utc>) -> Stats {
    let mut stats = Stats::default();

    for task in tasks {
        stats.total += 1;
        match task.status {
            Status::Done => stats.completed += 1,
            Status::InProgress => stats.in_progress += 1,
            _ => {}
        }
        if task.is_overdue(now) {
            stats.overdue += 1;
        }

        let mine = current_user.is_some_and(|user| task.assignee_id() == Some(user));
        if mine {
            stats.my_stats.total += 1;
            match task.status {
                Status::Done => stats.my_stats.completed += 1,
                Status::InProgress => stats.my_stats.in_progress += 1,
                _ => {}
            }
        }
    }

    stats.completion_rate = completion_rate(stats.completed, stats.total);
    trace!(?stats, "computed task statistics");
    stats
}

/// `round(100 * completed / total)` in integer arithmetic, halves rounding up.
fn completion_rate(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let rate = (completed * 200 + total) / (total * 2);
    u8::try_from(rate).unwrap_or(100)
}

/// Last aggregate, keyed by the view revision and user it was computed for.
///
/// The entry also remembers the span of instants over which its `overdue`
/// count holds: between the latest open due date already passed and the
/// earliest one not yet passed. A read outside that span recomputes.
#[derive(Debug, Clone, Default)]
pub struct StatsMemo {
    entry: Option<MemoEntry>,
}

#[derive(Debug, Clone)]
struct MemoEntry {
    revision: u64,
    user: Option<String>,
    after: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
    stats: Stats,
}

impl MemoEntry {
    fn holds(&self, revision: u64, user: Option<&str>, now: DateTime<Utc>) -> bool {
        self.revision == revision
            && self.user.as_deref() == user
            && self.after.is_none_or(|passed| passed < now)
            && self.until.is_none_or(|next| now <= next)
    }
}

/// `(latest open due < now, earliest open due >= now)`.
fn overdue_window(
    tasks: &[Task],
    now: DateTime<Utc>,
) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    tasks
        .iter()
        .filter(|task| task.status != Status::Done)
        .filter_map(|task| task.due_date)
        .fold((None, None), |(after, until), due| {
            if due < now {
                (after.max(Some(due)), until)
            } else {
                let until = match until {
                    Some(next) if next <= due => Some(next),
                    _ => Some(due),
                };
                (after, until)
            }
        })
}

impl StatsMemo {
    pub fn get_or_compute(
        &mut self,
        view: &TaskView,
        current_user: Option<&str>,
        now: DateTime<Utc>,
    ) -> Stats {
        if let Some(entry) = &self.entry
            && entry.holds(view.revision(), current_user, now)
        {
            return entry.stats;
        }

        let stats = compute(view.tasks(), current_user, now);
        let (after, until) = overdue_window(view.tasks(), now);
        self.entry = Some(MemoEntry {
            revision: view.revision(),
            user: current_user.map(str::to_string),
            after,
            until,
            stats,
        });
        stats
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::{StatsMemo, compute, completion_rate};
    use crate::store::TaskStore;
    use crate::task::{EntityRef, Status, Task};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 16, 12, 0, 0).unwrap()
    }

    fn task(id: &str, status: Status, assignee: Option<&str>) -> Task {
        let mut task = Task::new(id, id, now());
        task.status = status;
        task.assignee = assignee.map(|a| EntityRef::Id(a.to_string()));
        task
    }

    #[test]
    fn empty_view_has_zero_rate() {
        let stats = compute(&[], Some("u1"), now());
        assert_eq!(stats.total, 0);
        assert_eq!(stats.completion_rate, 0);
    }

    #[test]
    fn overdue_counts_only_open_past_due() {
        let mut yesterday = task("a", Status::Todo, None);
        yesterday.due_date = Some(now() - Duration::days(1));
        let mut tomorrow = task("b", Status::Todo, None);
        tomorrow.due_date = Some(now() + Duration::days(1));
        let mut finished_late = task("c", Status::Done, None);
        finished_late.due_date = Some(now() - Duration::days(3));

        let stats = compute(&[yesterday.clone(), tomorrow.clone()], None, now());
        assert_eq!(stats.overdue, 1);

        let stats = compute(&[yesterday, tomorrow, finished_late], None, now());
        assert_eq!(stats.overdue, 1);
    }

    #[test]
    fn totals_rate_and_my_stats() {
        let tasks = vec![
            task("a", Status::Done, Some("u1")),
            task("b", Status::InProgress, Some("u1")),
            task("c", Status::Done, Some("u2")),
            task("d", Status::Todo, None),
            task("e", Status::Review, Some("u1")),
            task("f", Status::Done, None),
        ];
        let stats = compute(&tasks, Some("u1"), now());

        assert_eq!(stats.total, 6);
        assert_eq!(stats.completed, 3);
        assert_eq!(stats.in_progress, 1);
        assert_eq!(stats.completion_rate, 50);
        assert_eq!(stats.my_stats.total, 3);
        assert_eq!(stats.my_stats.completed, 1);
        assert_eq!(stats.my_stats.in_progress, 1);
    }

    #[test]
    fn unassigned_tasks_never_count_as_mine() {
        let tasks = vec![task("a", Status::Done, None), task("b", Status::Todo, None)];
        let stats = compute(&tasks, None, now());
        assert_eq!(stats.my_stats.total, 0);
    }

    #[test]
    fn rate_rounds_half_up() {
        assert_eq!(completion_rate(1, 3), 33);
        assert_eq!(completion_rate(2, 3), 67);
        assert_eq!(completion_rate(1, 8), 13);
        assert_eq!(completion_rate(5, 5), 100);
    }

    #[test]
    fn memo_is_invalidated_by_store_mutations() {
        let mut store = TaskStore::default();
        store.set_tasks(vec![task("a", Status::Done, Some("u1"))]);
        let mut memo = StatsMemo::default();

        let first = memo.get_or_compute(&store.current_view(), Some("u1"), now());
        assert_eq!(first.completed, 1);

        store.set_tasks(vec![
            task("a", Status::Todo, Some("u1")),
            task("b", Status::Todo, Some("u1")),
        ]);
        let second = memo.get_or_compute(&store.current_view(), Some("u1"), now());
        assert_eq!(second.total, 2);
        assert_eq!(second.completed, 0);

        let other_user = memo.get_or_compute(&store.current_view(), Some("u2"), now());
        assert_eq!(other_user.my_stats.total, 0);
    }

    #[test]
    fn memo_recounts_overdue_as_time_passes() {
        let mut store = TaskStore::default();
        let mut soon = task("a", Status::Todo, None);
        soon.due_date = Some(now() + Duration::hours(1));
        let mut later = task("b", Status::Todo, None);
        later.due_date = Some(now() + Duration::days(3));
        store.set_tasks(vec![soon, later]);
        let view = store.current_view();
        let mut memo = StatsMemo::default();

        assert_eq!(memo.get_or_compute(&view, None, now()).overdue, 0);
        assert_eq!(
            memo.get_or_compute(&view, None, now() + Duration::minutes(30)).overdue,
            0
        );
        assert_eq!(
            memo.get_or_compute(&view, None, now() + Duration::days(2)).overdue,
            1
        );
        assert_eq!(
            memo.get_or_compute(&view, None, now() + Duration::days(4)).overdue,
            2
        );
        assert_eq!(memo.get_or_compute(&view, None, now()).overdue, 0);
    }
}

use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use unicode_width::UnicodeWidthStr;

use crate::backend::SubtaskSuggestions;
use crate::board::Board;
use crate::config::Config;
use crate::directory::{Directory, FilterChip};
use crate::stats::Stats;
use crate::task::{Priority, Status, Task};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self {
            color: color && io::stdout().is_terminal(),
        })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, out, tasks, directory, now))]
    pub fn write_task_table<W: Write, D: Directory>(
        &self,
        out: &mut W,
        tasks: &[Task],
        directory: &D,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let headers = vec![
            "ID".to_string(),
            "Status".to_string(),
            "Pri".to_string(),
            "Due".to_string(),
            "Project".to_string(),
            "Assignee".to_string(),
            "Title".to_string(),
            "Tags".to_string(),
        ];

        let rows = tasks
            .iter()
            .map(|task| self.task_row(task, directory, now))
            .collect();

        write_table(out, headers, rows)
    }

    #[tracing::instrument(skip_all)]
    pub fn write_board<W: Write>(&self, out: &mut W, board: &Board) -> anyhow::Result<()> {
        for column in board.columns() {
            let heading = format!("{} ({})", column.title, column.tasks.len());
            writeln!(out, "{}", self.paint(&heading, "1"))?;
            if column.tasks.is_empty() {
                writeln!(out, "  -")?;
            }
            for task in &column.tasks {
                let marker = if task.pending { "~" } else { " " };
                writeln!(
                    out,
                    " {marker}{} [{}] {}",
                    self.paint(&short_id(&task.id), "33"),
                    self.paint_priority(task.priority),
                    task.title
                )?;
            }
            writeln!(out)?;
        }

        for anomaly in board.anomalies() {
            writeln!(
                out,
                "{}",
                self.paint(
                    &format!(
                        "skipped {}: unknown status '{}'",
                        short_id(&anomaly.task_id),
                        anomaly.status
                    ),
                    "31"
                )
            )?;
        }

        Ok(())
    }

    #[tracing::instrument(skip_all)]
    pub fn write_stats<W: Write>(&self, out: &mut W, stats: &Stats) -> anyhow::Result<()> {
        writeln!(out, "total        {}", stats.total)?;
        writeln!(out, "completed    {}", stats.completed)?;
        writeln!(out, "in progress  {}", stats.in_progress)?;
        let overdue = stats.overdue.to_string();
        let overdue = if stats.overdue > 0 {
            self.paint(&overdue, "31")
        } else {
            overdue
        };
        writeln!(out, "overdue      {overdue}")?;
        writeln!(out, "completion   {}%", stats.completion_rate)?;
        writeln!(
            out,
            "mine         {} total, {} completed, {} in progress",
            stats.my_stats.total, stats.my_stats.completed, stats.my_stats.in_progress
        )?;
        Ok(())
    }

    pub fn write_chips<W: Write>(&self, out: &mut W, chips: &[FilterChip]) -> anyhow::Result<()> {
        if chips.is_empty() {
            return Ok(());
        }
        let joined = chips
            .iter()
            .map(|chip| self.paint(&chip.label, "36"))
            .collect::<Vec<_>>()
            .join("  ");
        writeln!(out, "filters: {joined}")?;
        Ok(())
    }

    pub fn write_subtasks<W: Write>(
        &self,
        out: &mut W,
        suggestions: &SubtaskSuggestions,
    ) -> anyhow::Result<()> {
        if let Some(message) = &suggestions.error {
            writeln!(out, "{}", self.paint(message, "31"))?;
        }
        for (idx, item) in suggestions.items.iter().enumerate() {
            writeln!(out, "{:>2}. {}", idx + 1, item.title)?;
            if !item.description.is_empty() {
                writeln!(out, "    {}", item.description)?;
            }
        }
        Ok(())
    }

    fn task_row<D: Directory>(&self, task: &Task, directory: &D, now: DateTime<Utc>) -> Vec<String> {
        let due = task
            .due_date
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        let due = if task.is_overdue(now) {
            self.paint(&due, "31")
        } else {
            due
        };

        let project = task
            .project_ref_id()
            .map(|id| directory.project_label(id))
            .unwrap_or_default();
        let assignee = match &task.assignee {
            Some(entity) => entity
                .display_name()
                .map(str::to_string)
                .or_else(|| entity.effective_id().map(|id| directory.user_label(id)))
                .unwrap_or_default(),
            None => String::new(),
        };
        let tags = task
            .tags
            .iter()
            .map(|tag| format!("#{tag}"))
            .collect::<Vec<_>>()
            .join(" ");

        vec![
            self.paint(&short_id(&task.id), "33"),
            self.paint_status(&task.status),
            self.paint_priority(task.priority),
            due,
            project,
            assignee,
            task.title.clone(),
            tags,
        ]
    }

    fn paint_status(&self, status: &Status) -> String {
        match status {
            Status::Done => self.paint(status.as_str(), "32"),
            Status::Unknown(_) => self.paint(status.as_str(), "31"),
            _ => status.to_string(),
        }
    }

    fn paint_priority(&self, priority: Priority) -> String {
        match priority {
            Priority::Urgent => self.paint(priority.as_str(), "31"),
            Priority::High => self.paint(priority.as_str(), "33"),
            _ => priority.to_string(),
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

fn write_table<W: Write>(
    writer: &mut W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths: Vec<usize> = headers
        .iter()
        .map(|header| UnicodeWidthStr::width(header.as_str()))
        .collect();

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for (header, width) in headers.iter().zip(&widths) {
        write!(writer, "{header:width$} ")?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "")?;
    }
    writeln!(writer)?;

    for row in rows {
        for (cell, width) in row.iter().zip(&widths) {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = width.saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' {
            // skip through the SGR terminator
            chars.by_ref().find(|c| *c == 'm');
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{Renderer, strip_ansi};
    use crate::board::group;
    use crate::directory::StaticDirectory;
    use crate::task::{EntityRef, Status, Task};

    #[test]
    fn strip_ansi_keeps_visible_text() {
        assert_eq!(strip_ansi("\x1b[31mlate\x1b[0m"), "late");
    }

    #[test]
    fn table_resolves_project_labels() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let mut task = Task::new("abc123456789", "Ship release", now);
        task.project_id = Some(EntityRef::Id("p1".to_string()));
        let mut directory = StaticDirectory::default();
        directory.insert_project("p1", "Website");

        let mut out = Vec::new();
        Renderer::plain()
            .write_task_table(&mut out, &[task], &directory, now)
            .expect("render");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("Website"));
        assert!(text.contains("abc12345 "));
        assert!(text.contains("Ship release"));
    }

    #[test]
    fn board_lists_anomalies_after_columns() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let mut odd = Task::new("t9", "Legacy", now);
        odd.status = Status::Unknown("archived".to_string());
        let board = group(&[Task::new("t1", "Plan", now), odd]);

        let mut out = Vec::new();
        Renderer::plain().write_board(&mut out, &board).expect("render");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.starts_with("To Do (1)"));
        assert!(text.contains("Done (0)"));
        assert!(text.ends_with("skipped t9: unknown status 'archived'\n"));
    }
}

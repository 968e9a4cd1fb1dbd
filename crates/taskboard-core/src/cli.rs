use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::datetime::{parse_date_end, parse_date_expr};
use crate::filter::{DateRange, FilterState};
use crate::sort::{SortKey, SortOrder, SortState};
use crate::task::{Priority, Status, TaskDraft};

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "taskboard",
    version,
    about = "Kanban task board over a local task store",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Filtered, sorted task table.
    List {
        #[command(flatten)]
        filters: FilterArgs,
        #[command(flatten)]
        sort: SortArgs,
    },
    /// Tasks grouped into kanban columns.
    Board {
        #[command(flatten)]
        filters: FilterArgs,
        #[command(flatten)]
        sort: SortArgs,
    },
    /// Totals, completion rate and overdue count for the filtered view.
    Stats {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Create a task.
    Add(AddArgs),
    /// Move a task to another column.
    Move {
        id: String,
        status: String,
    },
    /// Suggest subtasks for a title.
    Subtasks {
        title: String,
        #[arg(default_value = "")]
        description: String,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    #[arg(long)]
    pub status: Option<String>,

    #[arg(long)]
    pub priority: Option<String>,

    #[arg(long)]
    pub assignee: Option<String>,

    #[arg(long = "tag", action = ArgAction::Append)]
    pub tags: Vec<String>,

    #[arg(long)]
    pub search: Option<String>,

    #[arg(long = "due-from")]
    pub due_from: Option<String>,

    #[arg(long = "due-to")]
    pub due_to: Option<String>,

    #[arg(long = "project", action = ArgAction::Append)]
    pub projects: Vec<String>,
}

impl FilterArgs {
    #[tracing::instrument(skip(self, now))]
    pub fn into_filter_state(self, now: DateTime<Utc>) -> anyhow::Result<FilterState> {
        let status = self
            .status
            .map(|raw| raw.parse::<Status>())
            .transpose()
            .context("invalid --status")?;
        let priority = self
            .priority
            .map(|raw| raw.parse::<Priority>())
            .transpose()
            .context("invalid --priority")?;

        let from = self
            .due_from
            .map(|raw| parse_date_expr(&raw, now))
            .transpose()
            .context("invalid --due-from")?;
        let to = self
            .due_to
            .map(|raw| parse_date_end(&raw, now))
            .transpose()
            .context("invalid --due-to")?;
        let date_range = match (from, to) {
            (None, None) => None,
            (from, to) => Some(DateRange {
                from: from.unwrap_or(DateTime::<Utc>::MIN_UTC),
                to: to.unwrap_or(DateTime::<Utc>::MAX_UTC),
            }),
        };

        let filters = FilterState {
            status,
            priority,
            assignee: self.assignee,
            tags: self.tags.into_iter().collect(),
            search: self.search,
            date_range,
            selected_projects: self.projects.into_iter().collect(),
        };
        debug!(?filters, "filters from flags");
        Ok(filters)
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct SortArgs {
    #[arg(long = "sort-by")]
    pub sort_by: Option<String>,

    #[arg(long = "order")]
    pub order: Option<String>,
}

impl SortArgs {
    /// Flags layered over the configured default.
    pub fn apply(self, base: SortState) -> anyhow::Result<SortState> {
        let sort_by = match self.sort_by {
            Some(raw) => raw.parse::<SortKey>().context("invalid --sort-by")?,
            None => base.sort_by,
        };
        let sort_order = match self.order {
            Some(raw) => raw.parse::<SortOrder>().context("invalid --order")?,
            None => base.sort_order,
        };
        Ok(SortState::new(sort_by, sort_order))
    }
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    pub title: String,

    #[arg(long, default_value = "")]
    pub description: String,

    #[arg(long)]
    pub status: Option<String>,

    #[arg(long)]
    pub priority: Option<String>,

    #[arg(long)]
    pub due: Option<String>,

    #[arg(long = "tag", action = ArgAction::Append)]
    pub tags: Vec<String>,

    #[arg(long)]
    pub assignee: Option<String>,

    #[arg(long)]
    pub project: Option<String>,
}

impl AddArgs {
    pub fn into_draft(self, now: DateTime<Utc>) -> anyhow::Result<TaskDraft> {
        let status = self
            .status
            .map(|raw| raw.parse::<Status>())
            .transpose()
            .context("invalid --status")?;
        let priority = self
            .priority
            .map(|raw| raw.parse::<Priority>())
            .transpose()
            .context("invalid --priority")?
            .unwrap_or_default();
        let due_date = self
            .due
            .map(|raw| parse_date_expr(&raw, now))
            .transpose()
            .context("invalid --due")?;

        Ok(TaskDraft {
            title: self.title,
            description: self.description,
            status,
            priority,
            due_date,
            tags: self.tags.into_iter().collect(),
            assignee: self.assignee,
            project_id: self.project,
        })
    }
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

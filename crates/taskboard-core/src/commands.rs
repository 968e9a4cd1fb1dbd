use std::io::Write;

use anyhow::Context;
use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::backend::{AuthProvider, TaskBackend};
use crate::cli::Command;
use crate::directory::Directory;
use crate::render::Renderer;
use crate::session::Session;
use crate::task::Status;
use crate::transition::TransitionPhase;

/// Runs one CLI command against a session and writes its output to `out`.
#[instrument(skip(session, renderer, out, command))]
pub async fn dispatch<B, A, D, W>(
    session: &mut Session<B, A, D>,
    renderer: &Renderer,
    out: &mut W,
    command: Command,
) -> anyhow::Result<()>
where
    B: TaskBackend,
    A: AuthProvider,
    D: Directory,
    W: Write,
{
    let now = Utc::now();

    match command {
        Command::List { filters, sort } => {
            let filters = filters.into_filter_state(now)?;
            let sort = sort.apply(session.store().sort())?;
            session.set_sort(sort);
            session.set_filters(filters);
            session.refresh().await?;

            renderer.write_chips(out, &session.filter_chips())?;
            let view = session.view();
            renderer.write_task_table(out, view.tasks(), session.directory(), now)?;
            info!(count = view.len(), "listed tasks");
        }
        Command::Board { filters, sort } => {
            let filters = filters.into_filter_state(now)?;
            let sort = sort.apply(session.store().sort())?;
            session.set_sort(sort);
            session.set_filters(filters);
            session.refresh().await?;

            renderer.write_chips(out, &session.filter_chips())?;
            renderer.write_board(out, &session.board())?;
        }
        Command::Stats { filters } => {
            session.set_filters(filters.into_filter_state(now)?);
            session.refresh().await?;

            renderer.write_chips(out, &session.filter_chips())?;
            let stats = session.stats_at(now);
            renderer.write_stats(out, &stats)?;
        }
        Command::Add(args) => {
            let draft = args.into_draft(now)?;
            let task = session.create_task(draft).await?;
            writeln!(out, "Created task {}.", task.id)?;
        }
        Command::Move { id, status } => {
            let status: Status = status.parse().context("invalid status")?;
            session.refresh().await?;

            let phase = session.request_status_change(&id, status.clone()).await?;
            match phase {
                TransitionPhase::Superseded => {
                    warn!(id = %id, "move was superseded by a newer task list");
                    writeln!(out, "Move of {id} was superseded by newer data.")?;
                }
                _ => writeln!(out, "Moved {id} to {status}.")?,
            }
        }
        Command::Subtasks { title, description } => {
            let suggestions = session.suggest_subtasks(&title, &description).await;
            renderer.write_subtasks(out, &suggestions)?;
        }
    }

    Ok(())
}

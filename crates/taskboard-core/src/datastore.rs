use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::Utc;
use tempfile::NamedTempFile;
use tracing::{debug, info};
use uuid::Uuid;

use crate::backend::TaskBackend;
use crate::filter::FilterState;
use crate::task::{Status, Subtask, Task, TaskDraft};

/// Local persistence collaborator: one JSON task per line in `tasks.jsonl`.
#[derive(Debug)]
pub struct DataStore {
    pub data_dir: PathBuf,
    pub tasks_path: PathBuf,
}

impl DataStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let tasks_path = data_dir.join("tasks.jsonl");
        if !tasks_path.exists() {
            fs::write(&tasks_path, "")?;
        }

        info!(
            data_dir = %data_dir.display(),
            tasks = %tasks_path.display(),
            "opened datastore"
        );

        Ok(Self {
            data_dir,
            tasks_path,
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn load_tasks(&self) -> anyhow::Result<Vec<Task>> {
        load_jsonl(&self.tasks_path).context("failed to load tasks.jsonl")
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn save_tasks(&self, tasks: &[Task]) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.tasks_path, tasks).context("failed to save tasks.jsonl")
    }

    #[tracing::instrument(skip(self))]
    pub fn set_status(&self, id: &str, status: &Status) -> anyhow::Result<Task> {
        if !status.is_known() {
            return Err(anyhow!("refusing to store unknown status: {status}"));
        }

        let mut tasks = self.load_tasks()?;
        let task = tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| anyhow!("task not found: {id}"))?;
        task.status = status.clone();
        task.touch(Utc::now());
        let updated = task.clone();

        self.save_tasks(&tasks)?;
        debug!(id, status = %status, "status persisted");
        Ok(updated)
    }

    #[tracing::instrument(skip(self, draft), fields(title = %draft.title))]
    pub fn insert(&self, draft: TaskDraft) -> anyhow::Result<Task> {
        if draft.title.trim().is_empty() {
            return Err(anyhow!("task title cannot be empty"));
        }

        let mut tasks = self.load_tasks()?;
        let task = draft.into_task(Uuid::new_v4().to_string(), Utc::now());
        tasks.push(task.clone());
        self.save_tasks(&tasks)?;
        info!(id = %task.id, "task created");
        Ok(task)
    }
}

impl TaskBackend for DataStore {
    async fn list_tasks(&self, filters: &FilterState) -> anyhow::Result<Vec<Task>> {
        let tasks = self.load_tasks()?;
        Ok(tasks.into_iter().filter(|task| filters.matches(task)).collect())
    }

    async fn update_task_status(&self, id: &str, status: &Status) -> anyhow::Result<Task> {
        self.set_status(id, status)
    }

    async fn create_task(&self, draft: TaskDraft) -> anyhow::Result<Task> {
        self.insert(draft)
    }

    async fn generate_subtasks(&self, _title: &str, _description: &str) -> anyhow::Result<Vec<Subtask>> {
        Err(anyhow!(
            "subtask generation needs a remote backend; the local datastore has none"
        ))
    }
}

fn load_jsonl(path: &Path) -> anyhow::Result<Vec<Task>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let tasks = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str::<Task>(line)
                .with_context(|| format!("{} line {} is not a task", path.display(), idx + 1))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    debug!(file = %path.display(), count = tasks.len(), "tasks read");
    Ok(tasks)
}

/// Rewrites the whole file through a sibling temp file so readers never see
/// a half-written list.
fn save_jsonl_atomic(path: &Path, tasks: &[Task]) -> anyhow::Result<()> {
    let mut body = String::new();
    for task in tasks {
        body.push_str(&serde_json::to_string(task)?);
        body.push('\n');
    }

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(body.as_bytes())?;
    temp.as_file().sync_all()?;
    temp.persist(path)
        .map_err(|err| anyhow!("failed to replace {}: {}", path.display(), err.error))?;

    debug!(file = %path.display(), count = tasks.len(), "tasks written");
    Ok(())
}

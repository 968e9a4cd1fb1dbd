use std::fs;

use chrono::{TimeZone, Utc};
use clap::Parser;
use taskboard_core::backend::StaticAuth;
use taskboard_core::cli::GlobalCli;
use taskboard_core::commands::dispatch;
use taskboard_core::datastore::DataStore;
use taskboard_core::directory::StaticDirectory;
use taskboard_core::error::BoardError;
use taskboard_core::filter::FilterState;
use taskboard_core::render::Renderer;
use taskboard_core::session::{Session, SessionSettings};
use taskboard_core::task::{Priority, Status, TaskDraft};
use taskboard_core::transition::TransitionPhase;
use tempfile::tempdir;

fn draft(title: &str, status: Status, priority: Priority) -> TaskDraft {
    TaskDraft {
        title: title.to_string(),
        status: Some(status),
        priority,
        ..TaskDraft::default()
    }
}

fn open_session(store: DataStore) -> Session<DataStore, StaticAuth, StaticDirectory> {
    Session::init(
        store,
        StaticAuth::new(Some("u1".to_string())),
        StaticDirectory::default(),
        SessionSettings::default(),
    )
}

#[tokio::test]
async fn datastore_backed_session_moves_and_persists() {
    let temp = tempdir().expect("tempdir");
    let store = DataStore::open(temp.path()).expect("open datastore");
    let plan = store
        .insert(draft("Plan sprint", Status::Todo, Priority::High))
        .expect("insert plan");
    store
        .insert(draft("Ship release", Status::Done, Priority::Urgent))
        .expect("insert ship");

    let mut session = open_session(store);
    assert_eq!(session.refresh().await, Ok(2));

    let phase = session
        .request_status_change(&plan.id, Status::InProgress)
        .await
        .expect("move");
    assert_eq!(phase, TransitionPhase::Committed);

    let reopened = DataStore::open(temp.path()).expect("reopen");
    let persisted = reopened.load_tasks().expect("load");
    let moved = persisted
        .iter()
        .find(|task| task.id == plan.id)
        .expect("plan persisted");
    assert_eq!(moved.status, Status::InProgress);
    assert!(moved.updated_at >= plan.updated_at);

    let stats = session.stats();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.in_progress, 1);
    assert_eq!(stats.completion_rate, 50);
}

#[tokio::test]
async fn moving_a_missing_task_reports_unknown_task() {
    let temp = tempdir().expect("tempdir");
    let store = DataStore::open(temp.path()).expect("open datastore");
    let mut session = open_session(store);
    session.refresh().await.expect("refresh");

    assert_eq!(
        session.request_status_change("ghost", Status::Done).await,
        Err(BoardError::UnknownTask("ghost".to_string()))
    );
}

#[tokio::test]
async fn unknown_status_on_disk_becomes_grouping_anomaly() {
    let temp = tempdir().expect("tempdir");
    let store = DataStore::open(temp.path()).expect("open datastore");
    fs::write(
        &store.tasks_path,
        concat!(
            r#"{"_id":"a1","title":"Legacy","status":"archived","createdAt":"2026-01-05T10:00:00Z","updatedAt":"2026-01-05T10:00:00Z"}"#,
            "\n",
            r#"{"_id":"a2","title":"Fresh","status":"review","priority":"low","createdAt":"2026-01-06T10:00:00Z","updatedAt":"2026-01-06T10:00:00Z"}"#,
            "\n"
        ),
    )
    .expect("seed jsonl");

    let mut session = open_session(store);
    session.refresh().await.expect("refresh");
    let board = session.board();

    assert_eq!(board.column(&Status::Review).map(|c| c.tasks.len()), Some(1));
    assert_eq!(board.anomalies().len(), 1);
    assert_eq!(board.anomalies()[0].task_id, "a1");
    assert_eq!(board.anomalies()[0].status, "archived");
}

#[tokio::test]
async fn filters_narrow_fetch_and_view() {
    let temp = tempdir().expect("tempdir");
    let store = DataStore::open(temp.path()).expect("open datastore");
    store
        .insert(draft("Fix login bug", Status::Todo, Priority::Urgent))
        .expect("insert");
    store
        .insert(draft("Write docs", Status::Todo, Priority::Low))
        .expect("insert");

    let mut session = open_session(store);
    session.set_filters(FilterState {
        search: Some("LOGIN".to_string()),
        ..FilterState::default()
    });
    assert_eq!(session.refresh().await, Ok(1));
    assert_eq!(session.view().tasks()[0].title, "Fix login bug");
}

#[tokio::test]
async fn cli_commands_render_through_dispatch() {
    let temp = tempdir().expect("tempdir");
    let store = DataStore::open(temp.path()).expect("open datastore");
    let mut session = open_session(store);
    let renderer = Renderer::plain();

    let mut out = Vec::new();
    let add = GlobalCli::parse_from(["taskboard", "add", "Draft roadmap", "--tag", "plan"]);
    dispatch(&mut session, &renderer, &mut out, add.command)
        .await
        .expect("add");

    let list = GlobalCli::parse_from(["taskboard", "list", "--tag", "plan"]);
    dispatch(&mut session, &renderer, &mut out, list.command)
        .await
        .expect("list");

    let subtasks = GlobalCli::parse_from(["taskboard", "subtasks", "Draft roadmap"]);
    dispatch(&mut session, &renderer, &mut out, subtasks.command)
        .await
        .expect("subtasks degrade instead of failing");

    let text = String::from_utf8(out).expect("utf8");
    assert!(text.starts_with("Created task "));
    assert!(text.contains("filters: #plan"));
    assert!(text.contains("Draft roadmap"));
    assert!(text.contains("subtask generation failed"));
}

#[test]
fn stored_tasks_keep_camel_case_wire_names() {
    let temp = tempdir().expect("tempdir");
    let store = DataStore::open(temp.path()).expect("open datastore");
    let mut due = draft("Review PR", Status::Review, Priority::Medium);
    due.due_date = Some(Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap());
    store.insert(due).expect("insert");

    let raw = fs::read_to_string(&store.tasks_path).expect("read");
    assert!(raw.contains(r#""dueDate":"2026-04-01T00:00:00Z""#));
    assert!(raw.contains(r#""status":"review""#));
    assert!(raw.contains(r#""createdAt""#));
}

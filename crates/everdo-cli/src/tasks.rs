use chrono::NaiveDate;
use color_eyre::Result;
use everdo_core::{
    store::{StoreError, TaskStore},
    task::{parse_date, Task},
};
use everdo_tasks::{
    ops::{self, TaskInput, WriteRequest},
    view::{self, Filter},
};

use crate::{
    cli::{CategoryArg, PriorityArg, TaskCommand},
    config::Config,
    remote, session,
};

/// Execute a task subcommand against the remote store. Every mutation is
/// validated against a fresh snapshot first, mirroring what the board does
/// with its live one.
pub async fn handle(cmd: TaskCommand, config: &Config) -> Result<()> {
    let cached = session::require_session(config)?;
    let store = remote::task_store(config, &cached)?;
    let uid = cached.uid.as_str();

    match cmd {
        TaskCommand::List { filter, search } => {
            let snapshot = store.list(uid).await.map_err(to_eyre)?;
            print_list(&snapshot, filter.into(), &search);
        }
        TaskCommand::Add {
            title,
            description,
            due,
            priority,
            category,
            subtasks,
        } => {
            let snapshot = store.list(uid).await.map_err(to_eyre)?;
            let input = task_input(title, description, &due, priority, category, subtasks)?;
            let request = ops::create_task(&snapshot, &input, today()).map_err(to_eyre)?;
            announce(&store, uid, request).await?;
        }
        TaskCommand::Edit {
            id,
            title,
            description,
            due,
            priority,
            category,
            subtasks,
        } => {
            let snapshot = store.list(uid).await.map_err(to_eyre)?;
            let input = task_input(title, description, &due, priority, category, subtasks)?;
            let request = ops::edit_task(&snapshot, &id, &input, today()).map_err(to_eyre)?;
            announce(&store, uid, request).await?;
        }
        TaskCommand::Toggle { id } => {
            let snapshot = store.list(uid).await.map_err(to_eyre)?;
            let task = find_task(&snapshot, &id)?;
            announce(&store, uid, ops::toggle_task_complete(task)).await?;
        }
        TaskCommand::ToggleStep { id, index } => {
            let snapshot = store.list(uid).await.map_err(to_eyre)?;
            let task = find_task(&snapshot, &id)?;
            let request = ops::toggle_subtask_complete(task, index).map_err(to_eyre)?;
            announce(&store, uid, request).await?;
        }
        TaskCommand::Delete { id } => {
            announce(&store, uid, ops::delete_task(&id)).await?;
        }
    }

    Ok(())
}

/// Dispatch one write request to the store. Shared with the board, which
/// fires these without waiting for the outcome.
pub async fn apply<S: TaskStore>(
    store: &S,
    uid: &str,
    request: WriteRequest,
) -> Result<Option<Task>, StoreError> {
    match request {
        WriteRequest::Create(fields) => store.create(uid, fields).await.map(Some),
        WriteRequest::Update { id, fields } => store.update(uid, &id, fields).await.map(|()| None),
        WriteRequest::Delete { id } => store.delete(uid, &id).await.map(|()| None),
    }
}

async fn announce<S: TaskStore>(store: &S, uid: &str, request: WriteRequest) -> Result<()> {
    let verb = match &request {
        WriteRequest::Create(_) => "Created",
        WriteRequest::Update { .. } => "Updated",
        WriteRequest::Delete { .. } => "Deleted",
    };
    let id = match &request {
        WriteRequest::Create(_) => None,
        WriteRequest::Update { id, .. } | WriteRequest::Delete { id } => Some(id.clone()),
    };
    let created = apply(store, uid, request).await.map_err(to_eyre)?;
    match (created, id) {
        (Some(task), _) => println!("{verb} task {}: {}", task.id, task.title),
        (None, Some(id)) => println!("{verb} task {id}"),
        (None, None) => {}
    }
    Ok(())
}

fn task_input(
    title: String,
    description: Option<String>,
    due: &str,
    priority: PriorityArg,
    category: CategoryArg,
    subtasks: String,
) -> Result<TaskInput> {
    let due = parse_date(due)
        .ok_or_else(|| color_eyre::eyre::eyre!("invalid date {due:?}: expected DD/MM/YYYY"))?;
    Ok(TaskInput {
        title,
        description,
        due,
        priority: priority.into(),
        category: category.into(),
        subtasks,
    })
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn find_task<'a>(snapshot: &'a [Task], id: &str) -> Result<&'a Task> {
    snapshot
        .iter()
        .find(|task| task.id == id)
        .ok_or_else(|| color_eyre::eyre::eyre!("no task with id: {id}"))
}

fn print_list(snapshot: &[Task], filter: Filter, search: &str) {
    let visible = view::project(snapshot, filter, search);
    if visible.is_empty() {
        println!("No tasks to show. Add one with `everdo task add <title> --due <date>`.");
    }
    for task in &visible {
        println!(
            "[{}] {}  {} ({}, {}, due {})",
            checkbox(task.completed),
            task.id,
            task.title,
            task.priority,
            task.category,
            task.date
        );
        if let Some(description) = &task.description {
            println!("      {description}");
        }
        for (index, subtask) in task.subtasks.iter().enumerate() {
            println!(
                "      [{}] {index}. {}",
                checkbox(subtask.completed),
                subtask.name
            );
        }
    }
    let progress = view::progress(snapshot);
    println!("{} / {} tasks completed", progress.completed, progress.total);
}

fn checkbox(completed: bool) -> &'static str {
    if completed {
        "x"
    } else {
        " "
    }
}

fn to_eyre(err: impl std::fmt::Display) -> color_eyre::eyre::Report {
    color_eyre::eyre::eyre!(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use everdo_core::store::InMemoryTaskStore;
    use everdo_core::task::{Category, Priority};

    fn input(title: &str, subtasks: &str) -> TaskInput {
        TaskInput {
            title: title.to_string(),
            description: None,
            due: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            priority: Priority::Medium,
            category: Category::Personal,
            subtasks: subtasks.to_string(),
        }
    }

    #[tokio::test]
    async fn create_then_toggle_round_trips_through_the_store() {
        let store = InMemoryTaskStore::new();
        let today = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();

        let request = ops::create_task(&[], &input("Plan trip", "book hotel, pack"), today)
            .expect("create should validate");
        let created = apply(&store, "u1", request)
            .await
            .expect("apply")
            .expect("create returns the task");
        assert_eq!(created.title, "Plan trip");
        assert_eq!(created.subtasks.len(), 2);

        let snapshot = store.list("u1").await.expect("list");
        let request = ops::toggle_task_complete(&snapshot[0]);
        apply(&store, "u1", request).await.expect("apply toggle");

        let snapshot = store.list("u1").await.expect("list");
        assert!(snapshot[0].completed);
        assert!(snapshot[0].subtasks.iter().all(|s| s.completed));
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected_before_any_write() {
        let store = InMemoryTaskStore::new();
        let today = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let request =
            ops::create_task(&[], &input("Buy milk", ""), today).expect("first create");
        apply(&store, "u1", request).await.expect("apply");

        let snapshot = store.list("u1").await.expect("list");
        let err = ops::create_task(&snapshot, &input(" BUY MILK ", ""), today)
            .expect_err("duplicate should fail");
        assert_eq!(
            err,
            everdo_core::task::ValidationError::DuplicateTitle
        );
        assert_eq!(store.list("u1").await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn delete_requests_are_idempotent_at_the_store() {
        let store = InMemoryTaskStore::new();
        apply(&store, "u1", ops::delete_task("never-existed"))
            .await
            .expect("deleting an absent task is not an error");
    }
}

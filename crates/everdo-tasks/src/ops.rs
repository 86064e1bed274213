//! Mutation operations: pure functions of (snapshot, input) that either
//! produce the write request to hand to the remote store, or fail
//! validation before anything leaves the device.

use chrono::NaiveDate;
use everdo_core::task::{
    format_date, parse_subtask_input, validate_due_date, validate_title, Category, Priority, Task,
    TaskFields, ValidationError,
};

/// Raw form input for creating or editing a task. Subtasks arrive as the
/// comma-separated string the user typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInput {
    pub title: String,
    pub description: Option<String>,
    pub due: NaiveDate,
    pub priority: Priority,
    pub category: Category,
    pub subtasks: String,
}

/// A single mutation to send to the remote store. Each request is an
/// independent round trip; the next snapshot reflects whatever landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteRequest {
    Create(TaskFields),
    Update { id: String, fields: TaskFields },
    Delete { id: String },
}

fn title_taken(snapshot: &[Task], title: &str, exclude_id: Option<&str>) -> bool {
    let wanted = title.trim().to_lowercase();
    snapshot
        .iter()
        .filter(|task| exclude_id != Some(task.id.as_str()))
        .any(|task| task.title.trim().to_lowercase() == wanted)
}

fn build_fields(input: &TaskInput, completed: bool) -> TaskFields {
    TaskFields {
        title: input.title.clone(),
        description: input.description.clone(),
        date: format_date(input.due),
        priority: input.priority,
        category: input.category,
        completed,
        subtasks: parse_subtask_input(&input.subtasks),
    }
}

/// Validates and assembles a new task. New tasks always start incomplete.
pub fn create_task(
    snapshot: &[Task],
    input: &TaskInput,
    today: NaiveDate,
) -> Result<WriteRequest, ValidationError> {
    validate_title(&input.title)?;
    if title_taken(snapshot, &input.title, None) {
        return Err(ValidationError::DuplicateTitle);
    }
    validate_due_date(input.due, today)?;
    Ok(WriteRequest::Create(build_fields(input, false)))
}

/// Validates and assembles a full replacement for an existing task. The
/// duplicate check skips the task being edited, and a completed task must
/// be un-completed before it can be edited; that guard lives here, not
/// only in the calling UI.
pub fn edit_task(
    snapshot: &[Task],
    id: &str,
    input: &TaskInput,
    today: NaiveDate,
) -> Result<WriteRequest, ValidationError> {
    let target = snapshot
        .iter()
        .find(|task| task.id == id)
        .ok_or_else(|| ValidationError::UnknownTask { id: id.to_string() })?;
    if target.completed {
        return Err(ValidationError::CannotEditCompleted);
    }
    validate_title(&input.title)?;
    if title_taken(snapshot, &input.title, Some(id)) {
        return Err(ValidationError::DuplicateTitle);
    }
    validate_due_date(input.due, today)?;
    Ok(WriteRequest::Update {
        id: id.to_string(),
        fields: build_fields(input, target.completed),
    })
}

/// Flips a task's completion and forces every subtask to the new value,
/// regardless of their prior individual states.
pub fn toggle_task_complete(task: &Task) -> WriteRequest {
    let completed = !task.completed;
    let mut fields = task.fields();
    fields.completed = completed;
    for subtask in &mut fields.subtasks {
        subtask.completed = completed;
    }
    WriteRequest::Update {
        id: task.id.clone(),
        fields,
    }
}

/// Flips one subtask, then recomputes the task's completion as the AND
/// over all subtask flags.
pub fn toggle_subtask_complete(
    task: &Task,
    index: usize,
) -> Result<WriteRequest, ValidationError> {
    if index >= task.subtasks.len() {
        return Err(ValidationError::SubtaskIndexOutOfRange { index });
    }
    let mut fields = task.fields();
    fields.subtasks[index].completed = !fields.subtasks[index].completed;
    fields.completed = fields.subtasks.iter().all(|subtask| subtask.completed);
    Ok(WriteRequest::Update {
        id: task.id.clone(),
        fields,
    })
}

/// Deletion needs no validation; the remote store treats deleting an
/// absent document as success.
pub fn delete_task(id: &str) -> WriteRequest {
    WriteRequest::Delete { id: id.to_string() }
}

//! The view pipeline: filter → sort → search, in that fixed order, plus
//! the progress counters. Every function here is total over any snapshot
//! and referentially transparent; rendering is a pure projection of the
//! last received snapshot.

use everdo_core::task::Task;

/// Which slice of the collection the user asked to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    All,
    Completed,
    Pending,
}

impl Default for Filter {
    fn default() -> Self {
        Filter::All
    }
}

/// Completion counters over the unfiltered snapshot. The displayed subset
/// never changes these.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub remaining: usize,
    pub fraction: f64,
}

/// Keeps the tasks matching the filter, preserving snapshot order.
pub fn filter_tasks(tasks: &[Task], filter: Filter) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| match filter {
            Filter::All => true,
            Filter::Completed => task.completed,
            Filter::Pending => !task.completed,
        })
        .cloned()
        .collect()
}

/// Stable sort: incomplete tasks first, then by priority rank (High before
/// Medium before Low). Ties keep their original relative order.
pub fn sort_tasks(tasks: &[Task]) -> Vec<Task> {
    let mut sorted = tasks.to_vec();
    sorted.sort_by_key(|task| (task.completed, task.priority.rank()));
    sorted
}

fn matches_query(task: &Task, needle: &str) -> bool {
    task.title.to_lowercase().contains(needle)
        || task
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(needle))
        || task.priority.label().to_lowercase().contains(needle)
        || task.date.to_lowercase().contains(needle)
        || task.category.label().to_lowercase().contains(needle)
        || task
            .subtasks
            .iter()
            .any(|s| s.name.to_lowercase().contains(needle))
}

/// Narrows the list to tasks containing the query, case-insensitively, in
/// any of title, description, priority name, date string, category name,
/// or a subtask name. An empty query passes the list through untouched.
pub fn search_tasks(tasks: &[Task], query: &str) -> Vec<Task> {
    if query.is_empty() {
        return tasks.to_vec();
    }
    let needle = query.to_lowercase();
    tasks
        .iter()
        .filter(|task| matches_query(task, &needle))
        .cloned()
        .collect()
}

/// The full pipeline in its fixed order.
pub fn project(snapshot: &[Task], filter: Filter, query: &str) -> Vec<Task> {
    search_tasks(&sort_tasks(&filter_tasks(snapshot, filter)), query)
}

/// Counters over the full snapshot. An empty collection reports a zero
/// fraction rather than dividing by zero.
pub fn progress(snapshot: &[Task]) -> Progress {
    let total = snapshot.len();
    let completed = snapshot.iter().filter(|task| task.completed).count();
    let fraction = if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64
    };
    Progress {
        completed,
        total,
        remaining: total - completed,
        fraction,
    }
}

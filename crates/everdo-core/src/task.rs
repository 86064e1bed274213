use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Task priority. `rank` is the client-side sort order (High first).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Low
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" => Ok(Priority::Low),
            "Medium" => Ok(Priority::Medium),
            "High" => Ok(Priority::High),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

/// Task category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Category {
    Work,
    Fun,
    Personal,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Work => "Work",
            Category::Fun => "Fun",
            Category::Personal => "Personal",
        }
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Work
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Work" => Ok(Category::Work),
            "Fun" => Ok(Category::Fun),
            "Personal" => Ok(Category::Personal),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

/// A named, independently completable sub-item of a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subtask {
    pub name: String,
    pub completed: bool,
}

impl Subtask {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            completed: false,
        }
    }
}

/// Task entity. The id is assigned by the remote store on creation and is
/// immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    /// Display-formatted `DD/MM/YYYY`; validated against "today" only at
    /// entry time, never used for arithmetic afterwards.
    pub date: String,
    pub priority: Priority,
    pub category: Category,
    pub completed: bool,
    pub subtasks: Vec<Subtask>,
}

impl Task {
    pub fn fields(&self) -> TaskFields {
        TaskFields {
            title: self.title.clone(),
            description: self.description.clone(),
            date: self.date.clone(),
            priority: self.priority,
            category: self.category,
            completed: self.completed,
            subtasks: self.subtasks.clone(),
        }
    }
}

/// The mutable fields of a task document. Every mutation is a full-document
/// replace of this set; only the store ever attaches an id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskFields {
    pub title: String,
    pub description: Option<String>,
    pub date: String,
    pub priority: Priority,
    pub category: Category,
    pub completed: bool,
    pub subtasks: Vec<Subtask>,
}

impl TaskFields {
    pub fn into_task(self, id: impl Into<String>) -> Task {
        Task {
            id: id.into(),
            title: self.title,
            description: self.description,
            date: self.date,
            priority: self.priority,
            category: self.category,
            completed: self.completed,
            subtasks: self.subtasks,
        }
    }
}

/// Local, pre-submission validation failures. Each one blocks the mutation
/// before anything is sent to the remote store.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("task title cannot be empty")]
    EmptyTitle,
    #[error("a task with this title already exists")]
    DuplicateTitle,
    #[error("task date cannot be in the past")]
    PastDate,
    #[error("completed tasks cannot be edited; un-complete the task first")]
    CannotEditCompleted,
    #[error("subtask index {index} is out of range")]
    SubtaskIndexOutOfRange { index: usize },
    #[error("no task with id: {id}")]
    UnknownTask { id: String },
}

/// Fails when the title is empty after trimming. Stored titles keep the
/// user's original spelling.
pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    Ok(())
}

/// Fails when the due date lies before `today`.
pub fn validate_due_date(date: NaiveDate, today: NaiveDate) -> Result<(), ValidationError> {
    if date < today {
        return Err(ValidationError::PastDate);
    }
    Ok(())
}

/// Renders a date as zero-padded `DD/MM/YYYY`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Parses a `DD/MM/YYYY` string back into a date (used when editing).
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%d/%m/%Y").ok()
}

/// Splits comma-separated subtask input into subtasks. A blank field yields
/// no subtasks at all; blank segments between commas are dropped.
pub fn parse_subtask_input(raw: &str) -> Vec<Subtask> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    raw.split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(Subtask::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_must_not_be_blank() {
        assert_eq!(validate_title("  "), Err(ValidationError::EmptyTitle));
        assert_eq!(validate_title(""), Err(ValidationError::EmptyTitle));
        assert_eq!(validate_title(" Buy milk "), Ok(()));
    }

    #[test]
    fn due_date_must_not_be_in_the_past() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2026, 3, 13).unwrap();
        assert_eq!(
            validate_due_date(yesterday, today),
            Err(ValidationError::PastDate)
        );
        assert_eq!(validate_due_date(today, today), Ok(()));
    }

    #[test]
    fn date_formatting_is_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2026, 4, 5).unwrap();
        assert_eq!(format_date(date), "05/04/2026");
        assert_eq!(parse_date("05/04/2026"), Some(date));
        assert_eq!(parse_date("not a date"), None);
    }

    #[test]
    fn subtask_input_splits_on_commas_and_drops_blanks() {
        let subtasks = parse_subtask_input("wash car, , fold laundry");
        assert_eq!(
            subtasks,
            vec![Subtask::new("wash car"), Subtask::new("fold laundry")]
        );
        assert!(subtasks.iter().all(|s| !s.completed));
    }

    #[test]
    fn blank_subtask_input_yields_nothing() {
        assert!(parse_subtask_input("").is_empty());
        assert!(parse_subtask_input("   ").is_empty());
    }

    #[test]
    fn priority_rank_puts_high_first() {
        assert!(Priority::High.rank() < Priority::Medium.rank());
        assert!(Priority::Medium.rank() < Priority::Low.rank());
    }

    #[test]
    fn labels_round_trip_through_from_str() {
        for priority in [Priority::Low, Priority::Medium, Priority::High] {
            assert_eq!(priority.label().parse::<Priority>(), Ok(priority));
        }
        for category in [Category::Work, Category::Fun, Category::Personal] {
            assert_eq!(category.label().parse::<Category>(), Ok(category));
        }
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn enums_serialize_as_their_labels() {
        assert_eq!(
            serde_json::to_value(Priority::High).expect("serialize"),
            serde_json::json!("High")
        );
        assert_eq!(
            serde_json::to_value(Category::Personal).expect("serialize"),
            serde_json::json!("Personal")
        );
    }

    #[test]
    fn fields_round_trip_into_task() {
        let fields = TaskFields {
            title: "Ship".into(),
            description: None,
            date: "01/01/2027".into(),
            priority: Priority::High,
            category: Category::Work,
            completed: false,
            subtasks: vec![Subtask::new("step")],
        };
        let task = fields.clone().into_task("t1");
        assert_eq!(task.id, "t1");
        assert_eq!(task.fields(), fields);
    }
}

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use everdo_core::task::{Category, Priority};
use everdo_tasks::view::Filter;

/// CLI surface definition. The board is the default surface; everything
/// else is a one-shot command against the remote store.
#[derive(Parser, Debug)]
#[command(
    name = "everdo",
    about = "Cloud-synced task list for the terminal",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Optional subcommand; defaults to launching the task board.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Launch the interactive task board (Esc exits).
    Board,
    /// Print version and exit.
    Version,
    /// Create an account and cache the session.
    Signup { email: String },
    /// Sign in and cache the session.
    Login { email: String },
    /// Forget the cached session.
    Logout,
    /// Send a password-reset email.
    ResetPassword { email: String },
    /// Upload a profile avatar and store its hosted URL.
    Avatar { path: PathBuf },
    /// Inspect and mutate tasks.
    #[command(subcommand)]
    Task(TaskCommand),
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum TaskCommand {
    /// List tasks through the filter → sort → search pipeline.
    List {
        #[arg(long, value_enum, default_value = "all")]
        filter: FilterArg,
        /// Case-insensitive text to look for in any task field.
        #[arg(long, default_value = "")]
        search: String,
    },
    /// Add a task.
    Add {
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// Due date as DD/MM/YYYY; must not be in the past.
        #[arg(long)]
        due: String,
        #[arg(long, value_enum, default_value = "low")]
        priority: PriorityArg,
        #[arg(long, value_enum, default_value = "work")]
        category: CategoryArg,
        /// Comma-separated subtask names.
        #[arg(long, default_value = "")]
        subtasks: String,
    },
    /// Replace every field of an existing task.
    Edit {
        id: String,
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        due: String,
        #[arg(long, value_enum, default_value = "low")]
        priority: PriorityArg,
        #[arg(long, value_enum, default_value = "work")]
        category: CategoryArg,
        #[arg(long, default_value = "")]
        subtasks: String,
    },
    /// Toggle a task's completion (propagates to every subtask).
    Toggle { id: String },
    /// Toggle one subtask by zero-based index.
    ToggleStep { id: String, index: usize },
    /// Delete a task.
    Delete { id: String },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterArg {
    All,
    Completed,
    Pending,
}

impl From<FilterArg> for Filter {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::All => Filter::All,
            FilterArg::Completed => Filter::Completed,
            FilterArg::Pending => Filter::Pending,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityArg {
    Low,
    Medium,
    High,
}

impl From<PriorityArg> for Priority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::Low => Priority::Low,
            PriorityArg::Medium => Priority::Medium,
            PriorityArg::High => Priority::High,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryArg {
    Work,
    Fun,
    Personal,
}

impl From<CategoryArg> for Category {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Work => Category::Work,
            CategoryArg::Fun => Category::Fun,
            CategoryArg::Personal => Category::Personal,
        }
    }
}

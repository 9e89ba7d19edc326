//! Command tree for the `taskheat` binary.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use taskheat_core::{QueryMode, SortMode};

/// Top-level CLI parser for the `taskheat` binary.
#[derive(Debug, Parser)]
#[command(name = "taskheat", version, about = "Personal task tracker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file; created with defaults when missing
    #[arg(long, global = true, default_value = "settings.json")]
    pub settings: PathBuf,

    /// Directory for rotating log files (logging is off when omitted)
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Save after the command even when autoSave is off
    #[arg(long, global = true)]
    pub save: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a task
    Add(AddArgs),

    /// List tasks
    List(ListArgs),

    /// Show one task; viewing an open task raises its heat
    Show {
        /// Task id
        id: i64,
    },

    /// Mark a task complete
    Done {
        /// Task id
        id: i64,
    },

    /// Mark a task incomplete again
    Undo {
        /// Task id
        id: i64,
    },

    /// Change description, deadline or tag of a task
    Edit(EditArgs),

    /// Delete a task and its subtasks
    Rm {
        /// Task id
        id: i64,
    },

    /// Manage subtasks
    Subtask {
        #[command(subcommand)]
        action: SubtaskCommands,
    },

    /// Write the current task list to disk
    Save,
}

#[derive(Debug, Args)]
pub struct AddArgs {
    /// Task title
    pub title: String,

    /// Deadline: YYYY-MM-DD, "YYYY-MM-DD HH:MM" or RFC 3339
    #[arg(short, long)]
    pub due: String,

    #[arg(short = 'm', long)]
    pub description: Option<String>,

    #[command(flatten)]
    pub tag: TagArgs,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// all, complete or incomplete
    #[arg(short, long, default_value_t = QueryMode::All)]
    pub filter: QueryMode,

    /// creation, creation_r, due, due_r, heat, complete or complete_r
    #[arg(short, long, default_value_t = SortMode::Creation)]
    pub sort: SortMode,

    /// Only incomplete tasks past their deadline
    #[arg(long, conflicts_with_all = ["filter", "sort"])]
    pub overdue: bool,
}

#[derive(Debug, Args)]
pub struct EditArgs {
    /// Task id
    pub id: i64,

    /// New deadline
    #[arg(short, long)]
    pub due: Option<String>,

    #[arg(short = 'm', long, conflicts_with = "clear_description")]
    pub description: Option<String>,

    #[arg(long)]
    pub clear_description: bool,

    #[command(flatten)]
    pub tag: TagArgs,

    #[arg(long, conflicts_with = "tag_name")]
    pub clear_tag: bool,
}

#[derive(Debug, Args)]
pub struct TagArgs {
    /// Tag name
    #[arg(long, requires = "tag_color")]
    pub tag_name: Option<String>,

    /// Tag color as #RRGGBB
    #[arg(long, requires = "tag_name")]
    pub tag_color: Option<String>,

    /// Tag icon name
    #[arg(long, requires = "tag_name")]
    pub tag_icon: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum SubtaskCommands {
    /// Append a subtask to a task
    Add {
        /// Parent task id
        task_id: i64,
        /// Subtask title
        title: String,
        #[arg(short = 'm', long)]
        description: Option<String>,
    },
    /// Mark a subtask complete
    Done {
        /// Subtask id
        id: i64,
    },
    /// Mark a subtask incomplete again
    Undo {
        /// Subtask id
        id: i64,
    },
    /// Delete a subtask
    Rm {
        /// Subtask id
        id: i64,
    },
}

impl Commands {
    /// Whether the command can change the task list.
    pub fn mutates(&self) -> bool {
        !matches!(self, Self::List(_) | Self::Save)
    }
}

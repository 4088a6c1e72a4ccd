//! Error types shared across the planner.
//!
//! Structural scheduling failures (`ScheduleError`) are fatal to a scheduling
//! run and never leave a partially applied schedule behind. Manual date
//! conflicts are not errors; see [`crate::schedule::ManualDateWarning`].

use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

use crate::task::TaskNo;

/// Failures that abort a scheduling run before any date is written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// The predecessor relation is not acyclic.
    #[error("dependency cycle: {}", format_cycle(.cycle))]
    Cycle { cycle: Vec<TaskNo> },

    /// A predecessor references a task number that is missing or excluded.
    #[error("task {task} depends on {missing}, which does not exist or is excluded")]
    DanglingReference { task: TaskNo, missing: TaskNo },

    /// Two scheduled tasks share the same task number.
    #[error("task number {0} is used by more than one task")]
    DuplicateTaskNo(TaskNo),

    /// A scheduled task has a duration below one working day.
    #[error("task {0} has a duration of 0, expected at least 1 working day")]
    InvalidDuration(TaskNo),
}

impl ScheduleError {
    /// Task numbers the user should look at to resolve the failure.
    pub fn offending_tasks(&self) -> Vec<TaskNo> {
        match self {
            ScheduleError::Cycle { cycle } => cycle.clone(),
            ScheduleError::DanglingReference { task, missing } => vec![*task, *missing],
            ScheduleError::DuplicateTaskNo(no) | ScheduleError::InvalidDuration(no) => vec![*no],
        }
    }
}

fn format_cycle(cycle: &[TaskNo]) -> String {
    let mut parts: Vec<String> = cycle.iter().map(|no| no.to_string()).collect();
    if let Some(first) = cycle.first() {
        parts.push(first.to_string());
    }
    parts.join(" -> ")
}

/// Validation failures raised when tasks are created or edited.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("duration must be at least 1 working day")]
    InvalidDuration,

    #[error("invalid task number '{0}', expected <major>.<minor>")]
    InvalidTaskNo(String),

    #[error("task number {0} is already in use")]
    DuplicateTaskNo(TaskNo),

    #[error("task {0} cannot depend on itself")]
    SelfDependency(TaskNo),

    #[error("milestone '{0}' does not exist")]
    UnknownMilestone(String),

    #[error("no task matches '{0}'")]
    NotFound(String),

    #[error("'{name}' matches {count} tasks, use the task number instead")]
    Ambiguous { name: String, count: usize },
}

/// Milestone lifecycle failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MilestoneError {
    #[error("milestone name cannot be empty")]
    Empty,

    #[error("milestone '{0}' already exists")]
    Exists(String),

    #[error("milestone '{0}' does not exist")]
    NotFound(String),

    #[error("{count} task(s) still belong to milestone '{name}'")]
    InUse { name: String, count: usize },

    #[error("reordered list must contain exactly the existing milestones")]
    Mismatch,
}

/// Personnel registry failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersonnelError {
    #[error("name cannot be empty")]
    EmptyName,

    #[error("person '{0}' already exists")]
    PersonExists(String),

    #[error("no person matches '{0}'")]
    PersonNotFound(String),

    #[error("department '{0}' already exists")]
    DepartmentExists(String),

    #[error("department '{0}' does not exist")]
    UnknownDepartment(String),

    #[error("{count} person(s) still belong to department '{name}'")]
    DepartmentInUse { name: String, count: usize },
}

/// Progress tracker failures.
#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("progress must be between 0 and 100, got {0}")]
    InvalidProgress(u8),

    #[error("progress record {0} not found")]
    RecordNotFound(Uuid),

    #[error(transparent)]
    Task(#[from] TaskError),
}

/// Reading or writing a project file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed project file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Project discovery and lifecycle failures.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("project name cannot be empty")]
    EmptyName,

    #[error("project '{0}' already exists")]
    Exists(String),

    #[error("project '{0}' not found")]
    NotFound(String),

    #[error("project '{0}' is not a template")]
    NotATemplate(String),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Loading `config.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// CSV export/import failures.
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV file is empty")]
    Empty,

    #[error("invalid CSV header, expected:\n{expected}\ngot:\n{found}")]
    Header { expected: String, found: String },
}

/// Report aggregation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    #[error("comparison needs 2 to 4 projects, got {0}")]
    CompareCount(usize),
}

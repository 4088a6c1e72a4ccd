//! Enumerations and field types for planning.
//!
//! This module defines the small structured types used across the planner:
//! task status, scheduling direction, RACI roles and project lifecycle state.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Task completion status.
///
/// Derived from progress by the progress tracker, except `Paused` which is
/// sticky until explicitly resumed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Paused,
}

/// Direction of a scheduling run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ScheduleMode {
    /// Propagate from a fixed project start date.
    #[default]
    Forward,
    /// Propagate back from a fixed deadline.
    Backward,
}

/// Direction for reordering a task by one position.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

/// RACI responsibility role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum RaciRole {
    Responsible,
    Accountable,
    Consulted,
    Informed,
}

/// Project lifecycle state.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectStatus {
    #[default]
    Active,
    Archived,
    Template,
}

/// Available sorting options for task lists.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum SortKey {
    /// Display order (`<major>.<minor>`).
    #[default]
    No,
    /// Planned start date, unscheduled tasks last.
    Start,
    /// Stored position.
    Index,
    /// Dependency order: every task after its predecessors.
    Predecessor,
}

pub fn format_mode(mode: ScheduleMode) -> &'static str {
    match mode {
        ScheduleMode::Forward => "forward",
        ScheduleMode::Backward => "backward",
    }
}

/// Format a task status for display.
pub fn format_status(s: Status) -> &'static str {
    match s {
        Status::NotStarted => "Not started",
        Status::InProgress => "In progress",
        Status::Completed => "Completed",
        Status::Paused => "Paused",
    }
}

/// Format a RACI role as its single-letter code.
pub fn format_role(role: RaciRole) -> &'static str {
    match role {
        RaciRole::Responsible => "R",
        RaciRole::Accountable => "A",
        RaciRole::Consulted => "C",
        RaciRole::Informed => "I",
    }
}

/// Format a project status for display.
pub fn format_project_status(s: ProjectStatus) -> &'static str {
    match s {
        ProjectStatus::Active => "active",
        ProjectStatus::Archived => "archived",
        ProjectStatus::Template => "template",
    }
}

/// Parse a status string from CSV format.
pub fn parse_status(s: &str) -> Status {
    match s.trim().to_lowercase().replace(' ', "-").as_str() {
        "in-progress" => Status::InProgress,
        "completed" | "done" => Status::Completed,
        "paused" => Status::Paused,
        _ => Status::NotStarted,
    }
}

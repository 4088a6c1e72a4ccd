//! Task data structure and related functionality.
//!
//! This module defines the `Task` struct that represents a single schedulable
//! work item, together with the identifier types used by the task graph:
//! a stable opaque [`TaskId`] and the human-facing [`TaskNo`] label.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TaskError;
use crate::fields::*;

/// Stable identifier of a task within a project. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hierarchical task label `<milestone_seq>.<seq>`, ordered numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskNo {
    pub major: u32,
    pub minor: u32,
}

impl TaskNo {
    pub const fn new(major: u32, minor: u32) -> Self {
        TaskNo { major, minor }
    }
}

impl fmt::Display for TaskNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for TaskNo {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TaskError::InvalidTaskNo(s.to_string());
        let (major, minor) = s.trim().split_once('.').ok_or_else(invalid)?;
        let major = major.parse::<u32>().map_err(|_| invalid())?;
        let minor = minor.parse::<u32>().map_err(|_| invalid())?;
        Ok(TaskNo { major, minor })
    }
}

impl Serialize for TaskNo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TaskNo {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Set of task numbers a task depends on (AND-joined).
///
/// Stored and printed as a comma-joined string such as `"1.1,1.2"`; an empty
/// string means no dependency.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predecessors(BTreeSet<TaskNo>);

impl Predecessors {
    pub fn new() -> Self {
        Predecessors(BTreeSet::new())
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskNo> {
        self.0.iter()
    }

    pub fn contains(&self, no: &TaskNo) -> bool {
        self.0.contains(no)
    }

    pub fn insert(&mut self, no: TaskNo) -> bool {
        self.0.insert(no)
    }

    pub fn remove(&mut self, no: &TaskNo) -> bool {
        self.0.remove(no)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Parse and merge several comma-separated inputs (CLI flags may repeat).
    pub fn parse_all(inputs: &[String]) -> Result<Self, TaskError> {
        let mut set = Predecessors::new();
        for raw in inputs {
            let parsed: Predecessors = raw.parse()?;
            set.0.extend(parsed.0);
        }
        Ok(set)
    }
}

impl FromIterator<TaskNo> for Predecessors {
    fn from_iter<I: IntoIterator<Item = TaskNo>>(iter: I) -> Self {
        Predecessors(iter.into_iter().collect())
    }
}

impl fmt::Display for Predecessors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|no| no.to_string()).collect();
        f.write_str(&parts.join(","))
    }
}

impl FromStr for Predecessors {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::parse::<TaskNo>)
            .collect()
    }
}

impl Serialize for Predecessors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Predecessors {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// RACI assignment of personnel (by name) to a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Raci {
    #[serde(default)]
    pub responsible: Vec<String>,
    #[serde(default)]
    pub accountable: Option<String>,
    #[serde(default)]
    pub consulted: Vec<String>,
    #[serde(default)]
    pub informed: Vec<String>,
}

impl Raci {
    /// Everyone holding `role` on this task.
    pub fn people(&self, role: RaciRole) -> Vec<&str> {
        match role {
            RaciRole::Responsible => self.responsible.iter().map(String::as_str).collect(),
            RaciRole::Accountable => self.accountable.iter().map(String::as_str).collect(),
            RaciRole::Consulted => self.consulted.iter().map(String::as_str).collect(),
            RaciRole::Informed => self.informed.iter().map(String::as_str).collect(),
        }
    }

    /// Assign people to a role, either replacing or extending the current list.
    /// The accountable role holds a single person; the last name given wins.
    pub fn assign(&mut self, role: RaciRole, people: &[String], replace: bool) {
        let list = match role {
            RaciRole::Accountable => {
                if replace || people.last().is_some() {
                    self.accountable = people.last().cloned();
                }
                return;
            }
            RaciRole::Responsible => &mut self.responsible,
            RaciRole::Consulted => &mut self.consulted,
            RaciRole::Informed => &mut self.informed,
        };
        if replace {
            list.clear();
        }
        for person in people {
            if !list.contains(person) {
                list.push(person.clone());
            }
        }
    }
}

/// A schedulable unit of work.
///
/// `start_date`/`end_date` are written by the scheduler unless the matching
/// manual flag pins them; `actual_*`, `progress` and `status` belong to the
/// progress tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub task_no: TaskNo,
    pub milestone: String,
    pub name: String,
    /// Inclusive working-day count, at least 1.
    pub duration: u32,
    #[serde(default)]
    pub predecessor: Predecessors,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub manual_start: bool,
    #[serde(default)]
    pub manual_end: bool,
    #[serde(default)]
    pub excluded: bool,
    #[serde(default)]
    pub actual_start: Option<NaiveDate>,
    #[serde(default)]
    pub actual_end: Option<NaiveDate>,
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub raci: Raci,
    pub created_at_utc: i64,
    pub updated_at_utc: i64,
}

impl Task {
    /// The start date when it is pinned by the user.
    pub fn pinned_start(&self) -> Option<NaiveDate> {
        self.start_date.filter(|_| self.manual_start)
    }

    /// The end date when it is pinned by the user.
    pub fn pinned_end(&self) -> Option<NaiveDate> {
        self.end_date.filter(|_| self.manual_end)
    }
}

/// Editable fields of a task, used for both creation and full-replace updates.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
    /// `None` asks the database to generate the next number in the milestone.
    pub task_no: Option<TaskNo>,
    pub milestone: String,
    pub name: String,
    pub duration: u32,
    pub predecessor: Predecessors,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub manual_start: bool,
    pub manual_end: bool,
    pub excluded: bool,
    pub raci: Raci,
}

impl TaskDraft {
    pub fn new(milestone: &str, name: &str, duration: u32) -> Self {
        TaskDraft {
            task_no: None,
            milestone: milestone.to_string(),
            name: name.to_string(),
            duration,
            predecessor: Predecessors::new(),
            start_date: None,
            end_date: None,
            manual_start: false,
            manual_end: false,
            excluded: false,
            raci: Raci::default(),
        }
    }

    pub fn with_no(mut self, no: TaskNo) -> Self {
        self.task_no = Some(no);
        self
    }

    pub fn after(mut self, predecessors: &[TaskNo]) -> Self {
        self.predecessor = predecessors.iter().copied().collect();
        self
    }

    /// Pin the start date.
    pub fn pin_start(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self.manual_start = true;
        self
    }

    /// Pin the end date.
    pub fn pin_end(mut self, date: NaiveDate) -> Self {
        self.end_date = Some(date);
        self.manual_end = true;
        self
    }
}

impl From<&Task> for TaskDraft {
    fn from(task: &Task) -> Self {
        TaskDraft {
            task_no: Some(task.task_no),
            milestone: task.milestone.clone(),
            name: task.name.clone(),
            duration: task.duration,
            predecessor: task.predecessor.clone(),
            start_date: task.start_date,
            end_date: task.end_date,
            manual_start: task.manual_start,
            manual_end: task.manual_end,
            excluded: task.excluded,
            raci: task.raci.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_task_no_orders_numerically() {
        let a: TaskNo = "2.9".parse().unwrap();
        let b: TaskNo = "2.10".parse().unwrap();
        let c: TaskNo = "10.1".parse().unwrap();
        assert!(a < b);
        assert!(b < c);
        assert_eq!(b.to_string(), "2.10");
    }

    #[test]
    fn test_task_no_rejects_malformed() {
        assert!("3".parse::<TaskNo>().is_err());
        assert!("a.1".parse::<TaskNo>().is_err());
        assert!("1.".parse::<TaskNo>().is_err());
        assert_eq!(" 4.2 ".parse::<TaskNo>().unwrap(), TaskNo::new(4, 2));
    }

    #[test]
    fn test_predecessors_parse_tolerates_spacing() {
        let preds: Predecessors = " 1.2, 1.1 ,,".parse().unwrap();
        assert_eq!(preds.len(), 2);
        assert_eq!(preds.to_string(), "1.1,1.2");
        assert!("".parse::<Predecessors>().unwrap().is_empty());
        assert!("1.1,x".parse::<Predecessors>().is_err());
    }

    #[test]
    fn test_predecessors_serialise_as_string() {
        let preds: Predecessors = [TaskNo::new(2, 1), TaskNo::new(1, 3)].into_iter().collect();
        let json = serde_json::to_string(&preds).unwrap();
        assert_eq!(json, "\"1.3,2.1\"");
        let back: Predecessors = serde_json::from_str(&json).unwrap();
        assert_eq!(back, preds);
    }

    #[test]
    fn test_raci_assign_extends_and_replaces() {
        let mut raci = Raci::default();
        raci.assign(RaciRole::Responsible, &["ann".into(), "bo".into()], false);
        raci.assign(RaciRole::Responsible, &["bo".into(), "cy".into()], false);
        assert_eq!(raci.responsible, vec!["ann", "bo", "cy"]);

        raci.assign(RaciRole::Responsible, &["dee".into()], true);
        assert_eq!(raci.responsible, vec!["dee"]);

        raci.assign(RaciRole::Accountable, &["eve".into()], false);
        assert_eq!(raci.people(RaciRole::Accountable), vec!["eve"]);
    }
}

//! Progress tracking against the plan.
//!
//! A project keeps one [`ProgressLog`]: dated percentage entries per task, at
//! most one per task per calendar day. The task's `progress`, `status`,
//! `actual_start` and `actual_end` are always re-derived from the log, so
//! recording and deleting entries leave the task consistent with what
//! remains. Plan dates are never touched here.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::ProgressError;
use crate::fields::Status;
use crate::task::{Task, TaskId};

/// What a new entry does to the task's paused flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PauseChange {
    /// Leave paused tasks paused and running tasks running.
    #[default]
    Keep,
    Pause,
    Resume,
}

/// Status decision table. Pause wins; otherwise progress decides.
pub fn derive_status(paused: bool, progress: u8) -> Status {
    match (paused, progress) {
        (true, _) => Status::Paused,
        (false, 0) => Status::NotStarted,
        (false, p) if p >= 100 => Status::Completed,
        (false, _) => Status::InProgress,
    }
}

/// One dated progress entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub id: Uuid,
    pub task: TaskId,
    pub date: NaiveDate,
    pub progress: u8,
    pub status: Status,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub issues: String,
    /// Progress gained since the latest entry before `date`.
    #[serde(default)]
    pub increment: i16,
    pub created_at_utc: i64,
}

/// Input for [`ProgressLog::record`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEntry {
    pub date: NaiveDate,
    pub progress: u8,
    pub pause: PauseChange,
    pub note: String,
    pub issues: String,
}

impl ProgressEntry {
    pub fn new(date: NaiveDate, progress: u8) -> Self {
        ProgressEntry {
            date,
            progress,
            pause: PauseChange::Keep,
            note: String::new(),
            issues: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressLog {
    records: Vec<ProgressRecord>,
}

impl ProgressLog {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn get(&self, id: Uuid) -> Option<&ProgressRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Record progress for `task` on `entry.date`, replacing any entry the
    /// task already has for that day.
    pub fn record(
        &mut self,
        task: &mut Task,
        entry: ProgressEntry,
    ) -> Result<ProgressRecord, ProgressError> {
        if entry.progress > 100 {
            return Err(ProgressError::InvalidProgress(entry.progress));
        }

        let paused = match entry.pause {
            PauseChange::Keep => task.status == Status::Paused,
            PauseChange::Pause => true,
            PauseChange::Resume => false,
        };
        let record = ProgressRecord {
            id: Uuid::new_v4(),
            task: task.id,
            date: entry.date,
            progress: entry.progress,
            status: derive_status(paused, entry.progress),
            note: entry.note,
            issues: entry.issues,
            increment: 0,
            created_at_utc: Utc::now().timestamp(),
        };

        let id = match self
            .records
            .iter_mut()
            .find(|r| r.task == task.id && r.date == entry.date)
        {
            Some(existing) => {
                // Same-day entries keep their id.
                *existing = ProgressRecord {
                    id: existing.id,
                    ..record
                };
                existing.id
            }
            None => {
                let id = record.id;
                self.records.push(record);
                id
            }
        };

        self.recompute_increments(task.id);
        self.sync_task(task);
        let saved = self.get(id).cloned().ok_or(ProgressError::RecordNotFound(id))?;
        info!(task = %task.task_no, date = %saved.date, progress = saved.progress, "progress recorded");
        Ok(saved)
    }

    /// Delete one entry of `task` and re-derive the task from the rest.
    pub fn delete(&mut self, task: &mut Task, id: Uuid) -> Result<ProgressRecord, ProgressError> {
        let pos = self
            .records
            .iter()
            .position(|r| r.id == id && r.task == task.id)
            .ok_or(ProgressError::RecordNotFound(id))?;
        let removed = self.records.remove(pos);
        self.recompute_increments(task.id);
        self.sync_task(task);
        info!(task = %task.task_no, date = %removed.date, "progress record deleted");
        Ok(removed)
    }

    /// Entries of one task, ordered by date then creation time.
    pub fn history(&self, task: TaskId) -> Vec<&ProgressRecord> {
        let mut records: Vec<&ProgressRecord> =
            self.records.iter().filter(|r| r.task == task).collect();
        records.sort_by_key(|r| (r.date, r.created_at_utc));
        records
    }

    pub fn latest(&self, task: TaskId) -> Option<&ProgressRecord> {
        self.history(task).pop()
    }

    /// All entries recorded on one day, across tasks.
    pub fn records_on(&self, date: NaiveDate) -> Vec<&ProgressRecord> {
        self.records.iter().filter(|r| r.date == date).collect()
    }

    /// Drop every entry of a task. Returns how many were removed.
    pub fn remove_task(&mut self, task: TaskId) -> usize {
        let before = self.records.len();
        self.records.retain(|r| r.task != task);
        before - self.records.len()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Re-chain the increments of one task after its history changed.
    fn recompute_increments(&mut self, task: TaskId) {
        let mut order: Vec<usize> = (0..self.records.len())
            .filter(|&i| self.records[i].task == task)
            .collect();
        order.sort_by_key(|&i| (self.records[i].date, self.records[i].created_at_utc));
        let mut previous = 0u8;
        for i in order {
            let record = &mut self.records[i];
            record.increment = i16::from(record.progress) - i16::from(previous);
            previous = record.progress;
        }
    }

    /// Bring the task's progress fields in line with the log.
    ///
    /// `actual_start` is the first entry with progress above zero and
    /// `actual_end` the first entry reaching 100. With no entries left the
    /// task falls back to not started, unless it is paused.
    pub fn sync_task(&self, task: &mut Task) {
        let history = self.history(task.id);
        task.actual_start = history.iter().find(|r| r.progress > 0).map(|r| r.date);
        task.actual_end = history.iter().find(|r| r.progress >= 100).map(|r| r.date);
        match history.last() {
            Some(latest) => {
                task.progress = latest.progress;
                task.status = latest.status;
            }
            None => {
                task.progress = 0;
                let paused = task.status == Status::Paused;
                task.status = derive_status(paused, 0);
            }
        }
    }
}

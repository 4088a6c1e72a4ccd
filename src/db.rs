//! Project file storage and the operations that mutate it.
//!
//! A `Database` is one project: its metadata, ordered milestones, tasks,
//! progress log and the last schedule request. It is loaded whole from a JSON
//! file, mutated in memory and written back atomically. The helpers at the
//! bottom of the module format tasks for the terminal.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use chrono::{Duration, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{MilestoneError, ProgressError, ScheduleError, StoreError, TaskError};
use crate::fields::*;
use crate::graph;
use crate::progress::{ProgressEntry, ProgressLog, ProgressRecord};
use crate::schedule::{Schedule, ScheduleRequest, Scheduler};
use crate::task::{Task, TaskDraft, TaskId, TaskNo};

/// Descriptive metadata of a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectMeta {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub created_at_utc: i64,
    #[serde(default)]
    pub updated_at_utc: i64,
}

/// The schedule request last used for this project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSettings {
    #[serde(default)]
    pub mode: ScheduleMode,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default = "default_true")]
    pub exclude_weekends: bool,
    #[serde(default)]
    pub exclude_holidays: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        ScheduleSettings {
            mode: ScheduleMode::Forward,
            date: None,
            exclude_weekends: true,
            exclude_holidays: false,
        }
    }
}

/// In-memory project store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    pub meta: ProjectMeta,
    #[serde(default)]
    pub milestones: Vec<String>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub progress: ProgressLog,
    #[serde(default)]
    pub settings: ScheduleSettings,
    /// Highest task id ever handed out, so ids are not reused after deletes.
    #[serde(default)]
    last_id: u64,
}

impl Database {
    /// An empty project with the given name and milestones.
    pub fn new(name: &str, milestones: &[String]) -> Self {
        let now = Utc::now().timestamp();
        Database {
            meta: ProjectMeta {
                name: name.to_string(),
                created_at_utc: now,
                updated_at_utc: now,
                ..ProjectMeta::default()
            },
            milestones: milestones.to_vec(),
            ..Database::default()
        }
    }

    /// Load a project file. A missing file yields an empty project; a file
    /// that cannot be parsed is an error.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            debug!(path = %path.display(), "project file missing, starting empty");
            return Ok(Database::default());
        }
        let mut buf = String::new();
        File::open(path)?.read_to_string(&mut buf)?;
        let db = serde_json::from_str(&buf)?;
        Ok(db)
    }

    /// Save using atomic write (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(self)?;
        let mut f = File::create(&tmp)?;
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        debug!(path = %path.display(), tasks = self.tasks.len(), "project saved");
        Ok(())
    }

    pub fn touch(&mut self) {
        self.meta.updated_at_utc = Utc::now().timestamp();
    }

    /// Allocate the next task id.
    pub fn next_id(&mut self) -> TaskId {
        let max = self.tasks.iter().map(|t| t.id.0).max().unwrap_or(0);
        self.last_id = self.last_id.max(max) + 1;
        TaskId(self.last_id)
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Position of a task in the stored order (its index).
    pub fn position(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    pub fn find_by_no(&self, no: TaskNo) -> Option<&Task> {
        self.tasks.iter().find(|t| t.task_no == no)
    }

    /// Resolve a user-supplied identifier: a task number (`1.2`), an id
    /// (`#7`) or a task name (case-insensitive, must be unique).
    pub fn resolve(&self, identifier: &str) -> Result<TaskId, TaskError> {
        let identifier = identifier.trim();
        if let Ok(no) = identifier.parse::<TaskNo>() {
            return self
                .find_by_no(no)
                .map(|t| t.id)
                .ok_or_else(|| TaskError::NotFound(identifier.to_string()));
        }
        if let Some(raw) = identifier.strip_prefix('#') {
            if let Ok(id) = raw.parse::<u64>() {
                return self
                    .get(TaskId(id))
                    .map(|t| t.id)
                    .ok_or_else(|| TaskError::NotFound(identifier.to_string()));
            }
        }

        let lower = identifier.to_lowercase();
        let matches: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|t| t.name.to_lowercase() == lower)
            .collect();
        match matches.as_slice() {
            [] => Err(TaskError::NotFound(identifier.to_string())),
            [task] => Ok(task.id),
            _ => Err(TaskError::Ambiguous {
                name: identifier.to_string(),
                count: matches.len(),
            }),
        }
    }

    /// Tasks in the requested display order.
    pub fn sorted_tasks(&self, key: SortKey) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.tasks.iter().collect();
        match key {
            SortKey::No => tasks.sort_by_key(|t| t.task_no),
            SortKey::Start => tasks.sort_by_key(|t| (t.start_date.is_none(), t.start_date, t.task_no)),
            SortKey::Index => {}
            SortKey::Predecessor => {
                let rank: BTreeMap<TaskNo, usize> = graph::dependency_order(&self.tasks)
                    .into_iter()
                    .enumerate()
                    .map(|(i, no)| (no, i))
                    .collect();
                tasks.sort_by_key(|t| (rank.get(&t.task_no).copied(), t.task_no));
            }
        }
        tasks
    }

    /// 1-based position of a milestone, used as the task-number major.
    pub fn milestone_seq(&self, milestone: &str) -> Option<u32> {
        self.milestones
            .iter()
            .position(|m| m == milestone)
            .map(|i| i as u32 + 1)
    }

    /// Next free task number within a milestone.
    pub fn next_task_no(&self, milestone: &str) -> Result<TaskNo, TaskError> {
        let major = self
            .milestone_seq(milestone)
            .ok_or_else(|| TaskError::UnknownMilestone(milestone.to_string()))?;
        let minor = self
            .tasks
            .iter()
            .filter(|t| t.task_no.major == major)
            .map(|t| t.task_no.minor)
            .max()
            .unwrap_or(0);
        Ok(TaskNo::new(major, minor + 1))
    }

    fn validate(&self, draft: &TaskDraft, task_no: TaskNo, own: Option<TaskId>) -> Result<(), TaskError> {
        if draft.duration < 1 {
            return Err(TaskError::InvalidDuration);
        }
        if !self.milestones.iter().any(|m| *m == draft.milestone) {
            return Err(TaskError::UnknownMilestone(draft.milestone.clone()));
        }
        if draft.predecessor.contains(&task_no) {
            return Err(TaskError::SelfDependency(task_no));
        }
        if self
            .tasks
            .iter()
            .any(|t| t.task_no == task_no && Some(t.id) != own)
        {
            return Err(TaskError::DuplicateTaskNo(task_no));
        }
        Ok(())
    }

    /// Add a task. `position` inserts it at that index (clamped to the end);
    /// otherwise it is appended.
    pub fn add_task(&mut self, draft: TaskDraft, position: Option<usize>) -> Result<TaskId, TaskError> {
        let task_no = match draft.task_no {
            Some(no) => no,
            None => self.next_task_no(&draft.milestone)?,
        };
        self.validate(&draft, task_no, None)?;

        let now = Utc::now().timestamp();
        let id = self.next_id();
        let task = Task {
            id,
            task_no,
            milestone: draft.milestone,
            name: draft.name,
            duration: draft.duration,
            predecessor: draft.predecessor,
            start_date: draft.start_date,
            end_date: draft.end_date,
            manual_start: draft.manual_start,
            manual_end: draft.manual_end,
            excluded: draft.excluded,
            actual_start: None,
            actual_end: None,
            progress: 0,
            status: Status::NotStarted,
            raci: draft.raci,
            created_at_utc: now,
            updated_at_utc: now,
        };
        match position {
            Some(pos) => {
                let pos = pos.min(self.tasks.len());
                self.tasks.insert(pos, task);
            }
            None => self.tasks.push(task),
        }
        self.touch();
        info!(%id, task = %task_no, "task added");
        Ok(id)
    }

    /// Replace the editable fields of a task. Renumbering a task rewrites
    /// the predecessor sets that referenced the old number.
    pub fn update_task(&mut self, id: TaskId, draft: TaskDraft) -> Result<(), TaskError> {
        let old_no = self
            .get(id)
            .map(|t| t.task_no)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))?;
        let task_no = draft.task_no.unwrap_or(old_no);
        self.validate(&draft, task_no, Some(id))?;

        let now = Utc::now().timestamp();
        if task_no != old_no {
            for other in self.tasks.iter_mut().filter(|t| t.id != id) {
                if other.predecessor.remove(&old_no) {
                    other.predecessor.insert(task_no);
                    other.updated_at_utc = now;
                }
            }
        }
        let task = self
            .get_mut(id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))?;
        task.task_no = task_no;
        task.milestone = draft.milestone;
        task.name = draft.name;
        task.duration = draft.duration;
        task.predecessor = draft.predecessor;
        task.start_date = draft.start_date;
        task.end_date = draft.end_date;
        task.manual_start = draft.manual_start;
        task.manual_end = draft.manual_end;
        task.excluded = draft.excluded;
        task.raci = draft.raci;
        task.updated_at_utc = now;
        self.touch();
        info!(%id, task = %task_no, "task updated");
        Ok(())
    }

    /// Remove a task together with its progress records and every
    /// dependency pointing at it.
    pub fn delete_task(&mut self, id: TaskId) -> Result<Task, TaskError> {
        let pos = self
            .position(id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))?;
        let removed = self.tasks.remove(pos);
        for other in self.tasks.iter_mut() {
            other.predecessor.remove(&removed.task_no);
        }
        let records = self.progress.remove_task(id);
        self.touch();
        info!(%id, task = %removed.task_no, records, "task deleted");
        Ok(removed)
    }

    /// Flip the excluded flag. Returns the new value.
    pub fn toggle_exclude(&mut self, id: TaskId) -> Result<bool, TaskError> {
        let task = self
            .get_mut(id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))?;
        task.excluded = !task.excluded;
        task.updated_at_utc = Utc::now().timestamp();
        let excluded = task.excluded;
        self.touch();
        Ok(excluded)
    }

    /// Swap a task with its neighbour. Returns false at either edge.
    pub fn move_task(&mut self, id: TaskId, direction: MoveDirection) -> Result<bool, TaskError> {
        let pos = self
            .position(id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))?;
        let target = match direction {
            MoveDirection::Up if pos > 0 => pos - 1,
            MoveDirection::Down if pos + 1 < self.tasks.len() => pos + 1,
            _ => return Ok(false),
        };
        self.tasks.swap(pos, target);
        self.touch();
        Ok(true)
    }

    /// Assign people to a RACI role on several tasks at once. Every id is
    /// checked before anything changes.
    pub fn assign_raci(
        &mut self,
        ids: &[TaskId],
        role: RaciRole,
        people: &[String],
        replace: bool,
    ) -> Result<usize, TaskError> {
        if let Some(missing) = ids.iter().find(|id| self.get(**id).is_none()) {
            return Err(TaskError::NotFound(missing.to_string()));
        }
        let now = Utc::now().timestamp();
        let wanted: BTreeSet<TaskId> = ids.iter().copied().collect();
        let mut count = 0;
        for task in self.tasks.iter_mut().filter(|t| wanted.contains(&t.id)) {
            task.raci.assign(role, people, replace);
            task.updated_at_utc = now;
            count += 1;
        }
        self.touch();
        Ok(count)
    }

    pub fn add_milestone(&mut self, name: &str) -> Result<(), MilestoneError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(MilestoneError::Empty);
        }
        if self.milestones.iter().any(|m| m == name) {
            return Err(MilestoneError::Exists(name.to_string()));
        }
        self.milestones.push(name.to_string());
        self.touch();
        Ok(())
    }

    /// Rename a milestone; tasks follow.
    pub fn rename_milestone(&mut self, old: &str, new: &str) -> Result<usize, MilestoneError> {
        let new = new.trim();
        if new.is_empty() {
            return Err(MilestoneError::Empty);
        }
        let pos = self
            .milestones
            .iter()
            .position(|m| m == old)
            .ok_or_else(|| MilestoneError::NotFound(old.to_string()))?;
        if old != new && self.milestones.iter().any(|m| m == new) {
            return Err(MilestoneError::Exists(new.to_string()));
        }
        self.milestones[pos] = new.to_string();
        let mut moved = 0;
        for task in self.tasks.iter_mut().filter(|t| t.milestone == old) {
            task.milestone = new.to_string();
            moved += 1;
        }
        self.touch();
        Ok(moved)
    }

    /// Delete a milestone no task belongs to.
    pub fn delete_milestone(&mut self, name: &str) -> Result<(), MilestoneError> {
        let pos = self
            .milestones
            .iter()
            .position(|m| m == name)
            .ok_or_else(|| MilestoneError::NotFound(name.to_string()))?;
        let count = self.tasks.iter().filter(|t| t.milestone == name).count();
        if count > 0 {
            return Err(MilestoneError::InUse {
                name: name.to_string(),
                count,
            });
        }
        self.milestones.remove(pos);
        self.touch();
        Ok(())
    }

    /// Replace the milestone order. The new list must be a permutation of
    /// the current one.
    pub fn reorder_milestones(&mut self, order: Vec<String>) -> Result<(), MilestoneError> {
        let current: BTreeSet<&String> = self.milestones.iter().collect();
        let wanted: BTreeSet<&String> = order.iter().collect();
        if order.len() != self.milestones.len() || current != wanted {
            return Err(MilestoneError::Mismatch);
        }
        self.milestones = order;
        self.touch();
        Ok(())
    }

    /// Compute a schedule over the current tasks without applying it.
    pub fn plan(
        &self,
        mode: ScheduleMode,
        request: &ScheduleRequest,
        holidays: &BTreeSet<NaiveDate>,
    ) -> Result<Schedule, ScheduleError> {
        Scheduler::new(request.calendar(holidays)).run(&self.tasks, mode, request.date)
    }

    /// Compute and apply a schedule. On error no task is changed.
    pub fn schedule(
        &mut self,
        mode: ScheduleMode,
        request: &ScheduleRequest,
        holidays: &BTreeSet<NaiveDate>,
    ) -> Result<Schedule, ScheduleError> {
        let schedule = self.plan(mode, request, holidays)?;
        schedule.apply(&mut self.tasks);
        self.settings = ScheduleSettings {
            mode,
            date: Some(request.date),
            exclude_weekends: request.exclude_weekends,
            exclude_holidays: request.exclude_holidays,
        };
        self.touch();
        info!(?mode, anchor = %request.date, warnings = schedule.warnings.len(), "schedule applied");
        Ok(schedule)
    }

    pub fn record_progress(
        &mut self,
        id: TaskId,
        entry: ProgressEntry,
    ) -> Result<ProgressRecord, ProgressError> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))?;
        let record = self.progress.record(task, entry)?;
        task.updated_at_utc = Utc::now().timestamp();
        self.touch();
        Ok(record)
    }

    pub fn delete_progress(&mut self, record: Uuid) -> Result<ProgressRecord, ProgressError> {
        let owner = self
            .progress
            .get(record)
            .map(|r| r.task)
            .ok_or(ProgressError::RecordNotFound(record))?;
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == owner)
            .ok_or_else(|| TaskError::NotFound(owner.to_string()))?;
        let removed = self.progress.delete(task, record)?;
        self.touch();
        Ok(removed)
    }

    /// Unpin every task and drop its planned dates so the next run derives
    /// all of them from durations and dependencies. Actual dates stay.
    /// Returns how many tasks had a pin.
    pub fn clear_manual_dates(&mut self) -> usize {
        let mut pinned = 0;
        for task in self.tasks.iter_mut() {
            if task.manual_start || task.manual_end {
                pinned += 1;
            }
            task.manual_start = false;
            task.manual_end = false;
            task.start_date = None;
            task.end_date = None;
        }
        self.touch();
        info!(pinned, "manual dates cleared");
        pinned
    }

    /// Forget all tracked progress. With `clear_plan_dates` the computed and
    /// pinned dates go as well, leaving a reusable plan skeleton.
    pub fn reset_progress(&mut self, clear_plan_dates: bool) {
        self.progress.clear();
        for task in self.tasks.iter_mut() {
            task.progress = 0;
            task.status = Status::NotStarted;
            task.actual_start = None;
            task.actual_end = None;
            if clear_plan_dates {
                task.start_date = None;
                task.end_date = None;
                task.manual_start = false;
                task.manual_end = false;
            }
        }
        if clear_plan_dates {
            self.settings.date = None;
        }
        self.touch();
    }
}

/// Format an optional date, `-` when unset.
pub fn format_date(date: Option<NaiveDate>) -> String {
    date.map_or_else(|| "-".to_string(), |d| d.format("%Y-%m-%d").to_string())
}

/// Print tasks in a formatted table. Pinned dates carry a `*`, excluded
/// tasks an `x` in the first column.
pub fn print_table(tasks: &[&Task]) {
    println!(
        "{:<2}{:<6} {:<18} {:<11} {:<11} {:>4} {:>4} {:<12} {:<10} {}",
        "", "No", "Milestone", "Start", "End", "Dur", "%", "Status", "After", "Name"
    );
    for t in tasks {
        let flag = if t.excluded { "x" } else { "" };
        let pin = |date: Option<NaiveDate>, manual: bool| {
            let mut s = format_date(date);
            if manual {
                s.push('*');
            }
            s
        };
        let after = t.predecessor.to_string();
        println!(
            "{:<2}{:<6} {:<18} {:<11} {:<11} {:>4} {:>4} {:<12} {:<10} {}",
            flag,
            t.task_no.to_string(),
            truncate(&t.milestone, 18),
            pin(t.start_date, t.manual_start),
            pin(t.end_date, t.manual_end),
            t.duration,
            t.progress,
            format_status(t.status),
            truncate(if after.is_empty() { "-" } else { &after }, 10),
            t.name
        );
    }
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

/// Parse a date argument: `today`, `tomorrow`, `yesterday`, `in 3d`,
/// `in 2w` or `YYYY-MM-DD`.
pub fn parse_date_input(s: &str) -> Option<NaiveDate> {
    parse_date_relative(s, Local::now().date_naive())
}

fn parse_date_relative(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();
    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return today.succ_opt(),
        "yesterday" => return today.pred_opt(),
        _ => {}
    }
    if let Some(rest) = s.strip_prefix("in ") {
        // Offsets past the representable date range are rejected, not clamped.
        let offset = if let Some(nd) = rest.strip_suffix('d') {
            nd.trim().parse::<i64>().ok().and_then(Duration::try_days)
        } else if let Some(nw) = rest.strip_suffix('w') {
            nw.trim().parse::<i64>().ok().and_then(Duration::try_weeks)
        } else {
            None
        };
        return offset.and_then(|offset| today.checked_add_signed(offset));
    }
    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn no(s: &str) -> TaskNo {
        s.parse().unwrap()
    }

    fn sample_db() -> Database {
        let mut db = Database::new(
            "demo",
            &["Concept".to_string(), "Review".to_string()],
        );
        db.add_task(TaskDraft::new("Concept", "Sketch", 3), None).unwrap();
        db.add_task(TaskDraft::new("Concept", "Prototype", 2).after(&[no("1.1")]), None)
            .unwrap();
        db.add_task(TaskDraft::new("Review", "Sign off", 1).after(&[no("1.2")]), None)
            .unwrap();
        db
    }

    #[test]
    fn test_task_numbers_follow_milestones() {
        let db = sample_db();
        let nos: Vec<String> = db.tasks.iter().map(|t| t.task_no.to_string()).collect();
        assert_eq!(nos, vec!["1.1", "1.2", "2.1"]);
        assert_eq!(db.next_task_no("Concept").unwrap(), no("1.3"));
        assert_eq!(
            db.next_task_no("Nowhere").unwrap_err(),
            TaskError::UnknownMilestone("Nowhere".into())
        );
    }

    #[test]
    fn test_add_task_validates() {
        let mut db = sample_db();
        assert_eq!(
            db.add_task(TaskDraft::new("Concept", "Zero", 0), None).unwrap_err(),
            TaskError::InvalidDuration
        );
        assert_eq!(
            db.add_task(TaskDraft::new("Concept", "Dup", 1).with_no(no("1.1")), None)
                .unwrap_err(),
            TaskError::DuplicateTaskNo(no("1.1"))
        );
        assert_eq!(
            db.add_task(
                TaskDraft::new("Concept", "Loop", 1).with_no(no("1.9")).after(&[no("1.9")]),
                None
            )
            .unwrap_err(),
            TaskError::SelfDependency(no("1.9"))
        );
        assert_eq!(db.tasks.len(), 3);
    }

    #[test]
    fn test_insert_at_position_shifts_indices() {
        let mut db = sample_db();
        let id = db.add_task(TaskDraft::new("Review", "Kickoff", 1), Some(1)).unwrap();
        assert_eq!(db.position(id), Some(1));
        assert_eq!(db.tasks[2].name, "Prototype");

        db.delete_task(id).unwrap();
        assert_eq!(db.tasks[1].name, "Prototype");
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut db = sample_db();
        let last = db.tasks[2].id;
        db.delete_task(last).unwrap();
        let fresh = db.add_task(TaskDraft::new("Review", "Again", 1), None).unwrap();
        assert!(fresh > last);
    }

    #[test]
    fn test_delete_cleans_references_and_progress() {
        let mut db = sample_db();
        let first = db.resolve("1.1").unwrap();
        db.record_progress(first, ProgressEntry::new(d(2024, 1, 2), 50)).unwrap();
        db.delete_task(first).unwrap();
        assert!(db.progress.is_empty());
        let proto = db.get(db.resolve("1.2").unwrap()).unwrap();
        assert!(proto.predecessor.is_empty());
    }

    #[test]
    fn test_renumber_updates_dependents() {
        let mut db = sample_db();
        let id = db.resolve("1.2").unwrap();
        let draft = TaskDraft::from(db.get(id).unwrap()).with_no(no("1.5"));
        db.update_task(id, draft).unwrap();
        let sign_off = db.get(db.resolve("2.1").unwrap()).unwrap();
        assert!(sign_off.predecessor.contains(&no("1.5")));
        assert!(!sign_off.predecessor.contains(&no("1.2")));
    }

    #[test]
    fn test_resolve_by_number_id_and_name() {
        let db = sample_db();
        let id = db.tasks[1].id;
        assert_eq!(db.resolve("1.2").unwrap(), id);
        assert_eq!(db.resolve(&id.to_string()).unwrap(), id);
        assert_eq!(db.resolve("prototype").unwrap(), id);
        assert!(matches!(db.resolve("9.9"), Err(TaskError::NotFound(_))));
    }

    #[test]
    fn test_resolve_ambiguous_name() {
        let mut db = sample_db();
        db.add_task(TaskDraft::new("Review", "Sketch", 1), None).unwrap();
        assert_eq!(
            db.resolve("sketch").unwrap_err(),
            TaskError::Ambiguous { name: "sketch".into(), count: 2 }
        );
    }

    #[test]
    fn test_move_and_exclude() {
        let mut db = sample_db();
        let first = db.tasks[0].id;
        assert!(!db.move_task(first, MoveDirection::Up).unwrap());
        assert!(db.move_task(first, MoveDirection::Down).unwrap());
        assert_eq!(db.position(first), Some(1));

        assert!(db.toggle_exclude(first).unwrap());
        assert!(!db.toggle_exclude(first).unwrap());
    }

    #[test]
    fn test_batch_raci_is_all_or_nothing() {
        let mut db = sample_db();
        let ids: Vec<TaskId> = db.tasks.iter().map(|t| t.id).collect();
        let people = vec!["ann".to_string()];
        assert_eq!(db.assign_raci(&ids, RaciRole::Responsible, &people, false).unwrap(), 3);
        assert!(db.tasks.iter().all(|t| t.raci.responsible == people));

        let bad = vec![ids[0], TaskId(999)];
        assert!(db.assign_raci(&bad, RaciRole::Informed, &people, false).is_err());
        assert!(db.tasks[0].raci.informed.is_empty());
    }

    #[test]
    fn test_milestone_lifecycle() {
        let mut db = sample_db();
        assert_eq!(db.add_milestone("  "), Err(MilestoneError::Empty));
        assert_eq!(
            db.add_milestone("Review"),
            Err(MilestoneError::Exists("Review".into()))
        );
        db.add_milestone("Launch").unwrap();

        assert_eq!(db.rename_milestone("Concept", "Design").unwrap(), 2);
        assert!(db.tasks[..2].iter().all(|t| t.milestone == "Design"));

        assert_eq!(
            db.delete_milestone("Review"),
            Err(MilestoneError::InUse { name: "Review".into(), count: 1 })
        );
        db.delete_milestone("Launch").unwrap();

        assert_eq!(
            db.reorder_milestones(vec!["Review".into()]),
            Err(MilestoneError::Mismatch)
        );
        db.reorder_milestones(vec!["Review".into(), "Design".into()]).unwrap();
        assert_eq!(db.milestone_seq("Design"), Some(2));
    }

    #[test]
    fn test_schedule_applies_and_remembers_request() {
        let mut db = sample_db();
        let request = ScheduleRequest {
            date: d(2024, 1, 1),
            exclude_weekends: true,
            exclude_holidays: false,
        };
        let schedule = db
            .schedule(ScheduleMode::Forward, &request, &BTreeSet::new())
            .unwrap();
        assert_eq!(schedule.summary.unwrap().end_date, d(2024, 1, 8));
        assert_eq!(db.tasks[2].start_date, Some(d(2024, 1, 8)));
        assert_eq!(db.settings.date, Some(d(2024, 1, 1)));
    }

    #[test]
    fn test_failed_schedule_changes_nothing() {
        let mut db = sample_db();
        let first = db.resolve("1.1").unwrap();
        let mut draft = TaskDraft::from(db.get(first).unwrap());
        draft.predecessor = [no("2.1")].into_iter().collect();
        db.update_task(first, draft).unwrap();
        let before = db.tasks.clone();

        let request = ScheduleRequest {
            date: d(2024, 1, 1),
            exclude_weekends: true,
            exclude_holidays: false,
        };
        let err = db
            .schedule(ScheduleMode::Forward, &request, &BTreeSet::new())
            .unwrap_err();
        assert!(matches!(err, ScheduleError::Cycle { .. }));
        assert_eq!(db.tasks, before);
        assert_eq!(db.settings.date, None);
    }

    #[test]
    fn test_delete_progress_finds_owner() {
        let mut db = sample_db();
        let id = db.resolve("1.1").unwrap();
        let rec = db.record_progress(id, ProgressEntry::new(d(2024, 1, 2), 100)).unwrap();
        assert_eq!(db.get(id).unwrap().status, Status::Completed);
        db.delete_progress(rec.id).unwrap();
        assert_eq!(db.get(id).unwrap().status, Status::NotStarted);
        assert!(matches!(
            db.delete_progress(rec.id),
            Err(ProgressError::RecordNotFound(_))
        ));
    }

    #[test]
    fn test_reset_progress_keeps_or_clears_plan() {
        let mut db = sample_db();
        let id = db.resolve("1.1").unwrap();
        db.get_mut(id).unwrap().start_date = Some(d(2024, 1, 1));
        db.record_progress(id, ProgressEntry::new(d(2024, 1, 2), 30)).unwrap();

        db.reset_progress(false);
        assert_eq!(db.get(id).unwrap().progress, 0);
        assert_eq!(db.get(id).unwrap().start_date, Some(d(2024, 1, 1)));

        db.reset_progress(true);
        assert_eq!(db.get(id).unwrap().start_date, None);
    }

    #[test]
    fn test_clear_manual_dates_keeps_actuals() {
        let mut db = sample_db();
        let first = db.resolve("1.1").unwrap();
        let second = db.resolve("1.2").unwrap();
        let mut draft = TaskDraft::from(db.get(second).unwrap());
        draft = draft.pin_start(d(2024, 1, 8));
        db.update_task(second, draft).unwrap();
        db.get_mut(first).unwrap().start_date = Some(d(2024, 1, 1));
        db.record_progress(first, ProgressEntry::new(d(2024, 1, 2), 30)).unwrap();

        assert_eq!(db.clear_manual_dates(), 1);
        for task in &db.tasks {
            assert!(!task.manual_start && !task.manual_end);
            assert_eq!((task.start_date, task.end_date), (None, None));
        }
        assert_eq!(db.get(first).unwrap().actual_start, Some(d(2024, 1, 2)));
        assert_eq!(db.clear_manual_dates(), 0);
    }

    #[test]
    fn test_sort_by_predecessor() {
        let mut db = sample_db();
        db.add_task(TaskDraft::new("Concept", "Brief", 1), None).unwrap();
        let sketch = db.resolve("1.1").unwrap();
        let mut draft = TaskDraft::from(db.get(sketch).unwrap());
        draft.predecessor = "1.3".parse().unwrap();
        db.update_task(sketch, draft).unwrap();

        let order: Vec<String> = db
            .sorted_tasks(SortKey::Predecessor)
            .iter()
            .map(|t| t.task_no.to_string())
            .collect();
        assert_eq!(order, vec!["1.3", "1.1", "1.2", "2.1"]);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("demo_plan.json");
        let db = sample_db();
        db.save(&path).unwrap();
        assert!(!path.with_extension("json.tmp").exists());
        let loaded = Database::load(&path).unwrap();
        assert_eq!(loaded, db);
    }

    #[test]
    fn test_load_missing_and_corrupt_files() {
        let dir = tempdir().unwrap();
        let missing = Database::load(&dir.path().join("none.json")).unwrap();
        assert!(missing.tasks.is_empty());

        let bad = dir.path().join("bad.json");
        fs::write(&bad, "{ not json").unwrap();
        assert!(matches!(Database::load(&bad), Err(StoreError::Json(_))));
    }

    #[test]
    fn test_parse_date_relative() {
        let today = d(2024, 3, 15);
        assert_eq!(parse_date_relative("today", today), Some(today));
        assert_eq!(parse_date_relative("Tomorrow", today), Some(d(2024, 3, 16)));
        assert_eq!(parse_date_relative("in 3d", today), Some(d(2024, 3, 18)));
        assert_eq!(parse_date_relative("in 2w", today), Some(d(2024, 3, 29)));
        assert_eq!(parse_date_relative("2024-12-01", today), Some(d(2024, 12, 1)));
        assert_eq!(parse_date_relative("someday", today), None);
    }

    #[test]
    fn test_parse_date_relative_out_of_range_is_none() {
        let today = d(2024, 3, 15);
        assert_eq!(parse_date_relative("in 99999999d", today), None);
        assert_eq!(parse_date_relative("in 9223372036854775807d", today), None);
        assert_eq!(parse_date_relative("in 99999999999w", today), None);
        assert_eq!(parse_date_relative("in -3d", today), Some(d(2024, 3, 12)));
        assert_eq!(parse_date_relative("tomorrow", NaiveDate::MAX), None);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a long milestone", 6), "a lon…");
    }
}

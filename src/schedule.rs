//! Date-scheduling engine.
//!
//! Given a task snapshot, a working-day calendar and an anchor date, the
//! scheduler places every non-excluded task either forward from a project
//! start or backward from a deadline. A run is a pure function of its inputs:
//! it returns a [`Schedule`] describing the new dates and never touches the
//! tasks itself. Callers write the result with [`Schedule::apply`], which is
//! only reachable once the whole run has succeeded.
//!
//! Manually pinned dates are taken verbatim. Conflicts they create (span not
//! matching the duration, overlap with a dependency) are reported as
//! [`ManualDateWarning`]s instead of failing the run.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::calendar::CalendarConfig;
use crate::error::ScheduleError;
use crate::fields::ScheduleMode;
use crate::graph::TaskGraph;
use crate::task::{Task, TaskId, TaskNo};

/// Direction-agnostic scheduling request: `date` is the project start in
/// forward mode and the deadline in backward mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub date: NaiveDate,
    #[serde(default = "default_true")]
    pub exclude_weekends: bool,
    #[serde(default)]
    pub exclude_holidays: bool,
}

fn default_true() -> bool {
    true
}

impl ScheduleRequest {
    /// The calendar for this request, drawing on the supplied holiday list.
    pub fn calendar(&self, holidays: &BTreeSet<NaiveDate>) -> CalendarConfig {
        CalendarConfig::new(
            self.exclude_weekends,
            self.exclude_holidays,
            holidays.iter().copied(),
        )
    }
}

/// Planned dates of one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlannedDates {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Project-wide span of a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Inclusive calendar days between start and end, not working days.
    pub total_days: i64,
}

/// A non-fatal conflict caused by manually pinned dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManualDateWarning {
    pub task_no: TaskNo,
    #[serde(flatten)]
    pub kind: WarningKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WarningKind {
    /// Both dates pinned and their working-day span disagrees with the duration.
    DurationMismatch { duration: u32, span: u32 },
    /// Pinned start on or before a predecessor's end (forward mode).
    StartsBeforePredecessorEnds {
        predecessor: TaskNo,
        predecessor_end: NaiveDate,
    },
    /// Pinned end on or after a successor's start (backward mode).
    EndsAfterSuccessorStarts {
        successor: TaskNo,
        successor_start: NaiveDate,
    },
    /// The end date falls before the start date.
    EndBeforeStart,
}

impl fmt::Display for ManualDateWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            WarningKind::DurationMismatch { duration, span } => write!(
                f,
                "task {}: pinned dates span {} working day(s) but duration is {}",
                self.task_no, span, duration
            ),
            WarningKind::StartsBeforePredecessorEnds {
                predecessor,
                predecessor_end,
            } => write!(
                f,
                "task {}: pinned start is not after predecessor {} (ends {})",
                self.task_no, predecessor, predecessor_end
            ),
            WarningKind::EndsAfterSuccessorStarts {
                successor,
                successor_start,
            } => write!(
                f,
                "task {}: pinned end is not before successor {} (starts {})",
                self.task_no, successor, successor_start
            ),
            WarningKind::EndBeforeStart => {
                write!(f, "task {}: end date is before start date", self.task_no)
            }
        }
    }
}

/// Outcome of a successful scheduling run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub mode: ScheduleMode,
    pub anchor: NaiveDate,
    pub dates: BTreeMap<TaskId, PlannedDates>,
    pub summary: Option<Summary>,
    pub warnings: Vec<ManualDateWarning>,
}

impl Schedule {
    pub fn dates_for(&self, id: TaskId) -> Option<PlannedDates> {
        self.dates.get(&id).copied()
    }

    /// Write planned dates back onto the tasks. Excluded tasks lose their
    /// computed dates but keep manual pins.
    pub fn apply(&self, tasks: &mut [Task]) {
        for task in tasks.iter_mut() {
            match self.dates.get(&task.id) {
                Some(dates) => {
                    task.start_date = Some(dates.start);
                    task.end_date = Some(dates.end);
                }
                None if task.excluded => {
                    if !task.manual_start {
                        task.start_date = None;
                    }
                    if !task.manual_end {
                        task.end_date = None;
                    }
                }
                None => {}
            }
        }
    }

    /// Warnings attached to one task.
    pub fn warnings_for(&self, no: TaskNo) -> impl Iterator<Item = &ManualDateWarning> {
        self.warnings.iter().filter(move |w| w.task_no == no)
    }
}

/// Stateless scheduling engine bound to one calendar.
#[derive(Debug, Clone)]
pub struct Scheduler {
    calendar: CalendarConfig,
}

impl Scheduler {
    pub fn new(calendar: CalendarConfig) -> Self {
        Scheduler { calendar }
    }

    pub fn calendar(&self) -> &CalendarConfig {
        &self.calendar
    }

    /// Compute dates for every non-excluded task. Structural errors (cycle,
    /// dangling or duplicate reference, zero duration) abort before anything
    /// is produced.
    pub fn run(
        &self,
        tasks: &[Task],
        mode: ScheduleMode,
        anchor: NaiveDate,
    ) -> Result<Schedule, ScheduleError> {
        let graph = TaskGraph::build(tasks)?;
        let order = graph.topological_order()?;

        let mut planned: BTreeMap<TaskNo, PlannedDates> = BTreeMap::new();
        let mut warnings = Vec::new();
        match mode {
            ScheduleMode::Forward => {
                for no in &order {
                    let dates = self.place_forward(&graph, no, anchor, &planned, &mut warnings);
                    planned.insert(*no, dates);
                }
            }
            ScheduleMode::Backward => {
                for no in order.iter().rev() {
                    let dates = self.place_backward(&graph, no, anchor, &planned, &mut warnings);
                    planned.insert(*no, dates);
                }
            }
        }

        for warning in &warnings {
            warn!("{}", warning);
        }

        let summary = summarise(planned.values());
        let dates = planned
            .iter()
            .filter_map(|(no, dates)| graph.task(no).map(|task| (task.id, *dates)))
            .collect();
        debug!(?mode, %anchor, tasks = graph.len(), "schedule computed");

        Ok(Schedule {
            mode,
            anchor,
            dates,
            summary,
            warnings,
        })
    }

    fn place_forward(
        &self,
        graph: &TaskGraph<'_>,
        no: &TaskNo,
        anchor: NaiveDate,
        planned: &BTreeMap<TaskNo, PlannedDates>,
        warnings: &mut Vec<ManualDateWarning>,
    ) -> PlannedDates {
        let Some(task) = graph.task(no) else {
            return PlannedDates { start: anchor, end: anchor };
        };

        // Predecessor finishing last bounds the start.
        let mut binding: Option<(TaskNo, NaiveDate)> = None;
        for pred in graph.predecessors(no) {
            if let Some(dates) = planned.get(&pred) {
                if binding.map_or(true, |(_, end)| dates.end > end) {
                    binding = Some((pred, dates.end));
                }
            }
        }

        let start = match task.pinned_start() {
            Some(pinned) => {
                if let Some((predecessor, predecessor_end)) = binding {
                    if pinned <= predecessor_end {
                        warnings.push(ManualDateWarning {
                            task_no: *no,
                            kind: WarningKind::StartsBeforePredecessorEnds {
                                predecessor,
                                predecessor_end,
                            },
                        });
                    }
                }
                pinned
            }
            None => {
                let earliest = match binding {
                    Some((_, end)) => anchor.max(end + Duration::days(1)),
                    None => anchor,
                };
                self.calendar.next_working_day(earliest)
            }
        };

        let end = match task.pinned_end() {
            Some(pinned) => pinned,
            None => self
                .calendar
                .add_working_days(start, task.duration.saturating_sub(1)),
        };

        self.check_pins(task, start, end, warnings);
        debug!(task = %no, %start, %end, "placed forward");
        PlannedDates { start, end }
    }

    fn place_backward(
        &self,
        graph: &TaskGraph<'_>,
        no: &TaskNo,
        anchor: NaiveDate,
        planned: &BTreeMap<TaskNo, PlannedDates>,
        warnings: &mut Vec<ManualDateWarning>,
    ) -> PlannedDates {
        let Some(task) = graph.task(no) else {
            return PlannedDates { start: anchor, end: anchor };
        };

        // Successor starting first bounds the end.
        let mut binding: Option<(TaskNo, NaiveDate)> = None;
        for succ in graph.successors(no) {
            if let Some(dates) = planned.get(&succ) {
                if binding.map_or(true, |(_, start)| dates.start < start) {
                    binding = Some((succ, dates.start));
                }
            }
        }

        let end = match task.pinned_end() {
            Some(pinned) => {
                if let Some((successor, successor_start)) = binding {
                    if pinned >= successor_start {
                        warnings.push(ManualDateWarning {
                            task_no: *no,
                            kind: WarningKind::EndsAfterSuccessorStarts {
                                successor,
                                successor_start,
                            },
                        });
                    }
                }
                pinned
            }
            None => {
                let latest = match binding {
                    Some((_, start)) => anchor.min(start - Duration::days(1)),
                    None => anchor,
                };
                self.calendar.previous_working_day(latest)
            }
        };

        let start = match task.pinned_start() {
            Some(pinned) => pinned,
            None => self
                .calendar
                .subtract_working_days(end, task.duration.saturating_sub(1)),
        };

        self.check_pins(task, start, end, warnings);
        debug!(task = %no, %start, %end, "placed backward");
        PlannedDates { start, end }
    }

    fn check_pins(
        &self,
        task: &Task,
        start: NaiveDate,
        end: NaiveDate,
        warnings: &mut Vec<ManualDateWarning>,
    ) {
        if !task.manual_start && !task.manual_end {
            return;
        }
        if end < start {
            warnings.push(ManualDateWarning {
                task_no: task.task_no,
                kind: WarningKind::EndBeforeStart,
            });
            return;
        }
        if task.pinned_start().is_some() && task.pinned_end().is_some() {
            let span = self.calendar.working_days_between(start, end);
            if span != task.duration {
                warnings.push(ManualDateWarning {
                    task_no: task.task_no,
                    kind: WarningKind::DurationMismatch {
                        duration: task.duration,
                        span,
                    },
                });
            }
        }
    }
}

fn summarise<'a>(dates: impl Iterator<Item = &'a PlannedDates>) -> Option<Summary> {
    let mut span: Option<(NaiveDate, NaiveDate)> = None;
    for d in dates {
        span = Some(match span {
            None => (d.start, d.end),
            Some((start, end)) => (start.min(d.start), end.max(d.end)),
        });
    }
    span.map(|(start_date, end_date)| Summary {
        start_date,
        end_date,
        total_days: (end_date - start_date).num_days() + 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Predecessors, Raci};
    use pretty_assertions::assert_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn no(s: &str) -> TaskNo {
        s.parse().unwrap()
    }

    fn make_task(id: u64, task_no: &str, duration: u32, preds: &str) -> Task {
        Task {
            id: TaskId(id),
            task_no: no(task_no),
            milestone: "Concept".to_string(),
            name: format!("Task {}", task_no),
            duration,
            predecessor: preds.parse::<Predecessors>().unwrap(),
            start_date: None,
            end_date: None,
            manual_start: false,
            manual_end: false,
            excluded: false,
            actual_start: None,
            actual_end: None,
            progress: 0,
            status: Default::default(),
            raci: Raci::default(),
            created_at_utc: 0,
            updated_at_utc: 0,
        }
    }

    fn weekdays() -> Scheduler {
        Scheduler::new(CalendarConfig::default())
    }

    fn dates(schedule: &Schedule, id: u64) -> (NaiveDate, NaiveDate) {
        let planned = schedule.dates_for(TaskId(id)).unwrap();
        (planned.start, planned.end)
    }

    #[test]
    fn test_linear_chain_forward() {
        let tasks = vec![make_task(1, "1.1", 3, ""), make_task(2, "1.2", 2, "1.1")];
        let schedule = weekdays()
            .run(&tasks, ScheduleMode::Forward, d(2024, 1, 1))
            .unwrap();

        assert_eq!(dates(&schedule, 1), (d(2024, 1, 1), d(2024, 1, 3)));
        assert_eq!(dates(&schedule, 2), (d(2024, 1, 4), d(2024, 1, 5)));
        assert_eq!(
            schedule.summary,
            Some(Summary {
                start_date: d(2024, 1, 1),
                end_date: d(2024, 1, 5),
                total_days: 5,
            })
        );
        assert!(schedule.warnings.is_empty());
    }

    #[test]
    fn test_weekend_anchor_moves_to_monday() {
        let tasks = vec![make_task(1, "1.1", 1, "")];
        let schedule = weekdays()
            .run(&tasks, ScheduleMode::Forward, d(2024, 1, 6))
            .unwrap();
        assert_eq!(dates(&schedule, 1), (d(2024, 1, 8), d(2024, 1, 8)));
    }

    #[test]
    fn test_backward_single_task() {
        let tasks = vec![make_task(1, "2.1", 2, "")];
        let schedule = weekdays()
            .run(&tasks, ScheduleMode::Backward, d(2024, 1, 12))
            .unwrap();
        assert_eq!(dates(&schedule, 1), (d(2024, 1, 11), d(2024, 1, 12)));
    }

    #[test]
    fn test_backward_chain_crosses_weekend() {
        // 1.2 takes Thu-Fri; 1.1 (3 days) must end Wednesday.
        let tasks = vec![make_task(1, "1.1", 3, ""), make_task(2, "1.2", 2, "1.1")];
        let schedule = weekdays()
            .run(&tasks, ScheduleMode::Backward, d(2024, 1, 14))
            .unwrap();
        assert_eq!(dates(&schedule, 2), (d(2024, 1, 11), d(2024, 1, 12)));
        assert_eq!(dates(&schedule, 1), (d(2024, 1, 8), d(2024, 1, 10)));
        let summary = schedule.summary.unwrap();
        assert_eq!(summary.total_days, 5);
    }

    #[test]
    fn test_join_waits_for_latest_predecessor() {
        let tasks = vec![
            make_task(1, "1.1", 2, ""),
            make_task(2, "1.2", 4, ""),
            make_task(3, "2.1", 1, "1.1,1.2"),
        ];
        let schedule = weekdays()
            .run(&tasks, ScheduleMode::Forward, d(2024, 1, 1))
            .unwrap();
        assert_eq!(dates(&schedule, 2), (d(2024, 1, 1), d(2024, 1, 4)));
        assert_eq!(dates(&schedule, 3), (d(2024, 1, 5), d(2024, 1, 5)));
    }

    #[test]
    fn test_backward_fork_ends_before_earliest_successor() {
        let tasks = vec![
            make_task(1, "1.1", 1, ""),
            make_task(2, "1.2", 3, "1.1"),
            make_task(3, "1.3", 1, "1.1"),
        ];
        let schedule = weekdays()
            .run(&tasks, ScheduleMode::Backward, d(2024, 1, 12))
            .unwrap();
        assert_eq!(dates(&schedule, 2), (d(2024, 1, 10), d(2024, 1, 12)));
        assert_eq!(dates(&schedule, 3), (d(2024, 1, 12), d(2024, 1, 12)));
        assert_eq!(dates(&schedule, 1), (d(2024, 1, 9), d(2024, 1, 9)));
    }

    #[test]
    fn test_holidays_are_skipped() {
        let calendar = CalendarConfig::new(true, true, [d(2024, 1, 2)]);
        let tasks = vec![make_task(1, "1.1", 2, ""), make_task(2, "1.2", 1, "1.1")];
        let schedule = Scheduler::new(calendar)
            .run(&tasks, ScheduleMode::Forward, d(2024, 1, 1))
            .unwrap();
        assert_eq!(dates(&schedule, 1), (d(2024, 1, 1), d(2024, 1, 3)));
        assert_eq!(dates(&schedule, 2), (d(2024, 1, 4), d(2024, 1, 4)));
    }

    #[test]
    fn test_excluded_tasks_get_no_dates() {
        let mut skipped = make_task(2, "1.2", 5, "");
        skipped.excluded = true;
        skipped.start_date = Some(d(2023, 6, 1));
        let mut tasks = vec![make_task(1, "1.1", 1, ""), skipped];
        let schedule = weekdays()
            .run(&tasks, ScheduleMode::Forward, d(2024, 1, 1))
            .unwrap();
        assert!(schedule.dates_for(TaskId(2)).is_none());

        schedule.apply(&mut tasks);
        assert_eq!(tasks[1].start_date, None);
        assert_eq!(schedule.summary.unwrap().end_date, d(2024, 1, 1));
    }

    #[test]
    fn test_manual_start_is_kept_and_flagged() {
        let mut pred = make_task(1, "1.1", 5, "");
        pred.manual_end = true;
        pred.end_date = Some(d(2024, 2, 10));
        let mut pinned = make_task(2, "1.2", 5, "1.1");
        pinned.manual_start = true;
        pinned.start_date = Some(d(2024, 2, 1));
        let tasks = vec![pred, pinned];

        let schedule = weekdays()
            .run(&tasks, ScheduleMode::Forward, d(2024, 1, 29))
            .unwrap();

        assert_eq!(dates(&schedule, 2).0, d(2024, 2, 1));
        assert_eq!(
            schedule.warnings_for(no("1.2")).cloned().collect::<Vec<_>>(),
            vec![ManualDateWarning {
                task_no: no("1.2"),
                kind: WarningKind::StartsBeforePredecessorEnds {
                    predecessor: no("1.1"),
                    predecessor_end: d(2024, 2, 10),
                },
            }]
        );
    }

    #[test]
    fn test_manual_end_drives_successors() {
        let mut first = make_task(1, "1.1", 2, "");
        first.manual_end = true;
        first.end_date = Some(d(2024, 1, 9));
        let tasks = vec![first, make_task(2, "1.2", 1, "1.1")];
        let schedule = weekdays()
            .run(&tasks, ScheduleMode::Forward, d(2024, 1, 1))
            .unwrap();
        assert_eq!(dates(&schedule, 1), (d(2024, 1, 1), d(2024, 1, 9)));
        assert_eq!(dates(&schedule, 2), (d(2024, 1, 10), d(2024, 1, 10)));
    }

    #[test]
    fn test_both_pins_mismatching_duration_warns() {
        let mut task = make_task(1, "1.1", 2, "");
        task.manual_start = true;
        task.start_date = Some(d(2024, 1, 1));
        task.manual_end = true;
        task.end_date = Some(d(2024, 1, 5));
        let schedule = weekdays()
            .run(&[task], ScheduleMode::Forward, d(2024, 1, 1))
            .unwrap();
        assert_eq!(
            schedule.warnings[0].kind,
            WarningKind::DurationMismatch { duration: 2, span: 5 }
        );
        assert_eq!(dates(&schedule, 1), (d(2024, 1, 1), d(2024, 1, 5)));
    }

    #[test]
    fn test_pinned_date_on_weekend_is_accepted_verbatim() {
        let mut task = make_task(1, "1.1", 1, "");
        task.manual_start = true;
        task.start_date = Some(d(2024, 1, 6));
        let schedule = weekdays()
            .run(&[task], ScheduleMode::Forward, d(2024, 1, 1))
            .unwrap();
        assert_eq!(dates(&schedule, 1).0, d(2024, 1, 6));
    }

    #[test]
    fn test_manual_flag_without_date_is_unlocked() {
        let mut task = make_task(1, "1.1", 1, "");
        task.manual_start = true;
        let schedule = weekdays()
            .run(&[task], ScheduleMode::Forward, d(2024, 1, 2))
            .unwrap();
        assert_eq!(dates(&schedule, 1).0, d(2024, 1, 2));
    }

    #[test]
    fn test_backward_pinned_end_after_successor_warns() {
        let mut first = make_task(1, "1.1", 1, "");
        first.manual_end = true;
        first.end_date = Some(d(2024, 1, 12));
        let tasks = vec![first, make_task(2, "1.2", 1, "1.1")];
        let schedule = weekdays()
            .run(&tasks, ScheduleMode::Backward, d(2024, 1, 12))
            .unwrap();
        assert!(matches!(
            schedule.warnings[0].kind,
            WarningKind::EndsAfterSuccessorStarts { .. }
        ));
    }

    #[test]
    fn test_backward_keeps_pinned_start() {
        let mut pinned = make_task(2, "1.2", 2, "1.1");
        pinned.manual_start = true;
        pinned.start_date = Some(d(2024, 1, 8));
        let tasks = vec![make_task(1, "1.1", 1, ""), pinned];
        let schedule = weekdays()
            .run(&tasks, ScheduleMode::Backward, d(2024, 1, 12))
            .unwrap();

        assert_eq!(dates(&schedule, 2), (d(2024, 1, 8), d(2024, 1, 12)));
        // The predecessor ends before the pinned start, skipping the weekend.
        assert_eq!(dates(&schedule, 1), (d(2024, 1, 5), d(2024, 1, 5)));
        assert!(schedule.warnings.is_empty());
    }

    #[test]
    fn test_end_pinned_before_computed_start_warns() {
        let mut task = make_task(1, "1.1", 1, "");
        task.manual_end = true;
        task.end_date = Some(d(2024, 1, 1));
        let schedule = weekdays()
            .run(&[task], ScheduleMode::Forward, d(2024, 1, 3))
            .unwrap();

        assert_eq!(dates(&schedule, 1), (d(2024, 1, 3), d(2024, 1, 1)));
        assert_eq!(
            schedule.warnings,
            vec![ManualDateWarning {
                task_no: no("1.1"),
                kind: WarningKind::EndBeforeStart,
            }]
        );
    }

    #[test]
    fn test_forward_conflict_leaves_other_tasks_alone() {
        let mut tasks = vec![
            make_task(1, "1.1", 5, ""),
            make_task(2, "1.2", 2, "1.1"),
            make_task(3, "1.3", 2, ""),
            make_task(4, "1.4", 1, "1.1"),
            make_task(5, "2.1", 1, "1.2"),
        ];
        let unpinned = weekdays()
            .run(&tasks, ScheduleMode::Forward, d(2024, 1, 1))
            .unwrap();

        tasks[1].manual_start = true;
        tasks[1].start_date = Some(d(2024, 1, 3));
        let schedule = weekdays()
            .run(&tasks, ScheduleMode::Forward, d(2024, 1, 1))
            .unwrap();

        assert_eq!(dates(&schedule, 2), (d(2024, 1, 3), d(2024, 1, 4)));
        for id in [1, 3, 4] {
            assert_eq!(dates(&schedule, id), dates(&unpinned, id));
        }
        assert_eq!(dates(&schedule, 5), (d(2024, 1, 5), d(2024, 1, 5)));
        assert_eq!(schedule.warnings.len(), 1);
        assert_eq!(schedule.warnings[0].task_no, no("1.2"));
    }

    #[test]
    fn test_zero_duration_aborts_run() {
        let tasks = vec![make_task(1, "1.1", 0, "")];
        let result = weekdays().run(&tasks, ScheduleMode::Forward, d(2024, 1, 1));
        assert_eq!(result.unwrap_err(), ScheduleError::InvalidDuration(no("1.1")));
    }

    #[test]
    fn test_run_is_idempotent() {
        let mut tasks = vec![
            make_task(1, "1.1", 3, ""),
            make_task(2, "1.2", 4, "1.1"),
            make_task(3, "2.1", 2, "1.1"),
            make_task(4, "2.2", 6, "1.2,2.1"),
        ];
        tasks[2].manual_start = true;
        tasks[2].start_date = Some(d(2024, 3, 4));
        for mode in [ScheduleMode::Forward, ScheduleMode::Backward] {
            let scheduler = weekdays();
            let first = scheduler.run(&tasks, mode, d(2024, 3, 1)).unwrap();
            let mut applied = tasks.clone();
            first.apply(&mut applied);
            let second = scheduler.run(&applied, mode, d(2024, 3, 1)).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_schedule_properties_hold() {
        let calendar = CalendarConfig::new(true, true, [d(2024, 1, 15), d(2024, 1, 22)]);
        let scheduler = Scheduler::new(calendar.clone());
        let tasks = vec![
            make_task(1, "1.1", 4, ""),
            make_task(2, "1.2", 7, "1.1"),
            make_task(3, "1.3", 2, "1.1"),
            make_task(4, "2.1", 3, "1.2,1.3"),
            make_task(5, "2.2", 1, ""),
        ];
        for mode in [ScheduleMode::Forward, ScheduleMode::Backward] {
            let schedule = scheduler.run(&tasks, mode, d(2024, 1, 10)).unwrap();
            for task in &tasks {
                let planned = schedule.dates_for(task.id).unwrap();
                assert!(calendar.is_working_day(planned.start));
                assert!(calendar.is_working_day(planned.end));
                assert_eq!(
                    calendar.working_days_between(planned.start, planned.end),
                    task.duration
                );
                for pred in task.predecessor.iter() {
                    let pred_task = tasks.iter().find(|t| t.task_no == *pred).unwrap();
                    let pred_dates = schedule.dates_for(pred_task.id).unwrap();
                    assert!(planned.start > pred_dates.end);
                }
            }
        }
    }

    #[test]
    fn test_cycle_aborts_without_dates() {
        let mut tasks = vec![make_task(1, "1.1", 1, "1.2"), make_task(2, "1.2", 1, "1.1")];
        tasks[0].start_date = Some(d(2023, 1, 2));
        let before = tasks.clone();
        let result = weekdays().run(&tasks, ScheduleMode::Forward, d(2024, 1, 1));
        assert!(matches!(result, Err(ScheduleError::Cycle { .. })));
        assert_eq!(tasks, before);
    }

    #[test]
    fn test_empty_project_has_no_summary() {
        let schedule = weekdays()
            .run(&[], ScheduleMode::Forward, d(2024, 1, 1))
            .unwrap();
        assert!(schedule.summary.is_none());
        assert!(schedule.dates.is_empty());
    }
}

//! Read-only aggregations over project tasks: completion statistics,
//! per-milestone breakdown, multi-project comparison and RACI workload per
//! person or department.
//! Excluded tasks never count.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::db::Database;
use crate::error::ReportError;
use crate::fields::{RaciRole, Status};
use crate::personnel::Registry;
use crate::task::Task;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectStats {
    pub task_count: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub paused: usize,
    pub not_started: usize,
    /// Mean progress in percent, one decimal.
    pub completion_rate: f64,
}

impl ProjectStats {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let mut stats = ProjectStats::default();
        let mut total_progress = 0u64;
        for task in tasks.iter().filter(|t| !t.excluded) {
            stats.task_count += 1;
            total_progress += u64::from(task.progress);
            match task.status {
                Status::Completed => stats.completed += 1,
                Status::InProgress => stats.in_progress += 1,
                Status::Paused => stats.paused += 1,
                Status::NotStarted => stats.not_started += 1,
            }
        }
        stats.completion_rate = mean(total_progress, stats.task_count);
        stats
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MilestoneStats {
    pub milestone: String,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub avg_progress: f64,
}

fn mean(total: u64, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    (total as f64 / count as f64 * 10.0).round() / 10.0
}

/// Per-milestone totals, in milestone order. Milestones without tasks are
/// listed with zeros; tasks in unknown milestones are appended at the end.
pub fn milestone_breakdown(milestones: &[String], tasks: &[Task]) -> Vec<MilestoneStats> {
    let mut order: Vec<String> = milestones.to_vec();
    let mut sums: BTreeMap<&str, (usize, usize, u64)> = BTreeMap::new();
    for task in tasks.iter().filter(|t| !t.excluded) {
        if !order.iter().any(|m| *m == task.milestone) {
            order.push(task.milestone.clone());
        }
        let entry = sums.entry(task.milestone.as_str()).or_default();
        entry.0 += 1;
        if task.progress >= 100 {
            entry.1 += 1;
        }
        entry.2 += u64::from(task.progress);
    }
    order
        .iter()
        .map(|m| {
            let (total, done, progress) = sums.get(m.as_str()).copied().unwrap_or_default();
            MilestoneStats {
                milestone: m.clone(),
                total_tasks: total,
                completed_tasks: done,
                avg_progress: mean(progress, total),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectComparison {
    pub name: String,
    pub stats: ProjectStats,
    pub milestones: Vec<MilestoneStats>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Side-by-side figures for 2 to 4 projects.
pub fn compare(projects: &[(&str, &Database)]) -> Result<Vec<ProjectComparison>, ReportError> {
    if !(2..=4).contains(&projects.len()) {
        return Err(ReportError::CompareCount(projects.len()));
    }
    Ok(projects
        .iter()
        .map(|(name, db)| {
            let scheduled = db.tasks.iter().filter(|t| !t.excluded);
            ProjectComparison {
                name: name.to_string(),
                stats: ProjectStats::from_tasks(&db.tasks),
                milestones: milestone_breakdown(&db.milestones, &db.tasks),
                start_date: scheduled.clone().filter_map(|t| t.start_date).min(),
                end_date: scheduled.filter_map(|t| t.end_date).max(),
            }
        })
        .collect())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PersonLoad {
    pub person: String,
    pub responsible: usize,
    pub accountable: usize,
    pub consulted: usize,
    pub informed: usize,
    /// Working days carried as responsible, split evenly between co-owners.
    pub responsible_days: f64,
}

impl PersonLoad {
    pub fn count(&self, role: RaciRole) -> usize {
        match role {
            RaciRole::Responsible => self.responsible,
            RaciRole::Accountable => self.accountable,
            RaciRole::Consulted => self.consulted,
            RaciRole::Informed => self.informed,
        }
    }
}

/// RACI workload per person, sorted by name.
pub fn workload(tasks: &[Task]) -> Vec<PersonLoad> {
    let mut people: BTreeMap<&str, PersonLoad> = BTreeMap::new();
    for task in tasks.iter().filter(|t| !t.excluded) {
        for role in [
            RaciRole::Responsible,
            RaciRole::Accountable,
            RaciRole::Consulted,
            RaciRole::Informed,
        ] {
            let names = task.raci.people(role);
            let share = f64::from(task.duration) / names.len().max(1) as f64;
            for name in names {
                let load = people.entry(name).or_insert_with(|| PersonLoad {
                    person: name.to_string(),
                    ..PersonLoad::default()
                });
                match role {
                    RaciRole::Responsible => {
                        load.responsible += 1;
                        load.responsible_days += share;
                    }
                    RaciRole::Accountable => load.accountable += 1,
                    RaciRole::Consulted => load.consulted += 1,
                    RaciRole::Informed => load.informed += 1,
                }
            }
        }
    }
    people.into_values().collect()
}

/// Group for people without a registered department.
pub const NO_DEPARTMENT: &str = "(none)";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DepartmentLoad {
    pub department: String,
    pub people: Vec<String>,
    pub responsible: usize,
    pub accountable: usize,
    pub consulted: usize,
    pub informed: usize,
    pub responsible_days: f64,
}

/// Sum per-person workload by department, in registry order. People the
/// registry does not know, or who have no department, land in
/// [`NO_DEPARTMENT`] at the end.
pub fn department_workload(loads: &[PersonLoad], registry: &Registry) -> Vec<DepartmentLoad> {
    let mut groups: BTreeMap<usize, DepartmentLoad> = BTreeMap::new();
    for load in loads {
        let department = registry.department_of(&load.person);
        let rank = department
            .and_then(|d| registry.departments.iter().position(|known| known == d))
            .unwrap_or(registry.departments.len());
        let group = groups.entry(rank).or_insert_with(|| DepartmentLoad {
            department: match department {
                Some(d) if rank < registry.departments.len() => d.to_string(),
                _ => NO_DEPARTMENT.to_string(),
            },
            ..DepartmentLoad::default()
        });
        group.people.push(load.person.clone());
        group.responsible += load.responsible;
        group.accountable += load.accountable;
        group.consulted += load.consulted;
        group.informed += load.informed;
        group.responsible_days += load.responsible_days;
    }
    groups.into_values().collect()
}

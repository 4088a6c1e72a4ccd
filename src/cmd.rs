//! Command implementations for the CLI interface.
//!
//! Each handler opens the project it needs, performs one operation through
//! the library modules and saves the result. Errors bubble up as
//! `anyhow::Error` with enough context to print directly.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context as _, Result};
use chrono::{Local, NaiveDate, TimeZone, Utc};
use clap::Subcommand;
use clap_complete::{generate, Shell};
use serde::Serialize;
use uuid::Uuid;

use crate::config::Config;
use crate::csv::{read_csv, write_csv};
use crate::db::*;
use crate::fields::*;
use crate::personnel::{self, Registry};
use crate::progress::{PauseChange, ProgressEntry};
use crate::project::{self, Project, TemplateSource};
use crate::report::{self, ProjectStats};
use crate::schedule::{ManualDateWarning, Schedule, ScheduleRequest, Summary};
use crate::task::{Predecessors, Task, TaskDraft, TaskNo};
use crate::tui::run::run_gantt;

#[derive(Subcommand)]
pub enum Commands {
    /// Create, edit and inspect tasks.
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// Manage the ordered milestone list.
    Milestone {
        #[command(subcommand)]
        action: MilestoneAction,
    },

    /// Compute start/end dates for every task.
    Schedule {
        /// forward: DATE is the project start. backward: DATE is the deadline.
        #[arg(value_enum)]
        mode: ScheduleMode,
        /// Anchor date: YYYY-MM-DD, "today", "in Nd". Without it the last run
        /// is repeated with its calendar, which must have used the same mode.
        date: Option<String>,
        /// Count Saturdays and Sundays as working days.
        #[arg(long)]
        no_weekends: bool,
        /// Skip the configured holidays.
        #[arg(long)]
        holidays: bool,
        /// Extra holiday (YYYY-MM-DD). May be repeated; implies --holidays.
        #[arg(long)]
        holiday: Vec<String>,
        /// Show the result without saving it.
        #[arg(long)]
        dry_run: bool,
        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Record and review actual progress.
    Progress {
        #[command(subcommand)]
        action: ProgressAction,
    },

    /// Create, copy, archive and compare projects.
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Completion statistics of the current project.
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Tasks and working days per person, by RACI role.
    Workload {
        /// Sum people up by their registered department.
        #[arg(long)]
        by_department: bool,
        #[arg(long)]
        json: bool,
    },

    /// Manage the personnel registry shared by all projects.
    People {
        #[command(subcommand)]
        action: PeopleAction,
    },

    /// Manage the departments people belong to.
    Department {
        #[command(subcommand)]
        action: DepartmentAction,
    },

    /// Export tasks to CSV format.
    Export {
        /// Output file path (default: <project>_tasks.csv)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Import tasks from CSV format.
    Import {
        /// Input CSV file path
        input: PathBuf,
        /// Skip creating backup before import
        #[arg(long)]
        no_backup: bool,
        /// Drop pins and planned dates of all tasks after importing.
        #[arg(long)]
        clear_pins: bool,
    },

    /// Create timestamped backup of current project or all projects.
    Backup {
        /// Backup all projects instead of just current
        #[arg(long)]
        all: bool,
    },

    /// Show the schedule as a Gantt chart in the terminal.
    Gantt,

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a new task.
    Add {
        name: String,
        /// Milestone (defaults to the first one).
        #[arg(long, short)]
        milestone: Option<String>,
        /// Duration in working days.
        #[arg(long, short, default_value_t = 1)]
        duration: u32,
        /// Explicit task number (<major>.<minor>); generated when omitted.
        #[arg(long)]
        no: Option<String>,
        /// Predecessor task numbers. May be repeated and comma-separated.
        #[arg(long)]
        after: Vec<String>,
        /// Pin the start date.
        #[arg(long)]
        start: Option<String>,
        /// Pin the end date.
        #[arg(long)]
        end: Option<String>,
        /// Insert at this index instead of appending.
        #[arg(long)]
        position: Option<usize>,
        /// Responsible people. May be repeated.
        #[arg(long)]
        responsible: Vec<String>,
        #[arg(long)]
        accountable: Option<String>,
        /// Add the task excluded from scheduling.
        #[arg(long)]
        excluded: bool,
    },

    /// List tasks.
    List {
        #[arg(long, short)]
        milestone: Option<String>,
        #[arg(long, value_enum)]
        status: Option<Status>,
        /// Hide excluded tasks.
        #[arg(long)]
        hide_excluded: bool,
        #[arg(long, value_enum, default_value_t = SortKey::No)]
        sort: SortKey,
    },

    /// Show one task by number, #id or name.
    Show { id: String },

    /// Update fields on a task.
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, short)]
        milestone: Option<String>,
        #[arg(long, short)]
        duration: Option<u32>,
        /// Renumber the task; dependents follow.
        #[arg(long)]
        no: Option<String>,
        /// Replace predecessors. May be repeated and comma-separated.
        #[arg(long)]
        after: Vec<String>,
        /// Remove all predecessors.
        #[arg(long)]
        clear_after: bool,
        /// Pin the start date.
        #[arg(long)]
        start: Option<String>,
        /// Pin the end date.
        #[arg(long)]
        end: Option<String>,
        /// Let the scheduler compute the start date again.
        #[arg(long)]
        unpin_start: bool,
        /// Let the scheduler compute the end date again.
        #[arg(long)]
        unpin_end: bool,
    },

    /// Delete a task, its progress records and dependencies on it.
    Delete { id: String },

    /// Toggle whether a task takes part in scheduling.
    Exclude { id: String },

    /// Unpin every task and drop planned dates; actual dates are kept.
    UnpinAll,

    /// Move a task one position up or down.
    Move {
        id: String,
        #[arg(value_enum)]
        direction: MoveDirection,
    },

    /// Assign people to a RACI role on one or more tasks.
    Raci {
        #[arg(value_enum)]
        role: RaciRole,
        /// People to assign.
        #[arg(required = true)]
        people: Vec<String>,
        /// Task to update. May be repeated.
        #[arg(long = "task", required = true)]
        tasks: Vec<String>,
        /// Replace the current assignment instead of adding to it.
        #[arg(long)]
        replace: bool,
    },
}

#[derive(Subcommand)]
pub enum PeopleAction {
    /// List registered people.
    List {
        #[arg(long, short)]
        department: Option<String>,
    },
    /// Register a person.
    Add {
        name: String,
        #[arg(long, short, default_value = "")]
        department: String,
    },
    /// Rename a person or change their department ("" clears it).
    Update {
        /// Person id or name.
        person: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, short)]
        department: Option<String>,
    },
    /// Remove a person from the registry.
    Remove { person: String },
}

#[derive(Subcommand)]
pub enum DepartmentAction {
    /// List departments with their head count.
    List,
    Add { name: String },
    /// Remove a department nobody belongs to.
    Remove { name: String },
}

#[derive(Subcommand)]
pub enum MilestoneAction {
    /// List milestones with their task counts.
    List,
    Add { name: String },
    /// Rename a milestone; its tasks follow.
    Rename { old: String, new: String },
    /// Delete a milestone that has no tasks.
    Delete { name: String },
    /// Set the full milestone order.
    Reorder {
        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum ProgressAction {
    /// Record progress for a task (replaces that day's entry).
    Record {
        task: String,
        /// Percent complete, 0 to 100.
        progress: u8,
        /// Entry date (default: today).
        #[arg(long)]
        date: Option<String>,
        #[arg(long, default_value = "")]
        note: String,
        #[arg(long, default_value = "")]
        issues: String,
        /// Mark the task paused.
        #[arg(long, conflicts_with = "resume")]
        pause: bool,
        /// Clear a pause.
        #[arg(long)]
        resume: bool,
    },
    /// Show the progress history of a task.
    History { task: String },
    /// List every entry recorded on one day.
    Day {
        #[arg(long)]
        date: Option<String>,
    },
    /// Delete a progress entry by id.
    Delete { record: Uuid },
}

#[derive(Subcommand)]
pub enum ProjectAction {
    /// List projects.
    List {
        #[arg(long, value_enum)]
        status: Option<ProjectStatus>,
    },
    /// Create a project.
    New {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        /// "builtin" for the APQP template, or the name of a template project.
        #[arg(long)]
        from: Option<String>,
    },
    /// Copy a project with its progress cleared.
    Duplicate { source: String, name: String },
    /// Save a project as a reusable template.
    Template { source: String, name: String },
    Archive { name: String },
    Activate { name: String },
    /// Delete a project (a backup is kept).
    Delete { name: String },
    /// Compare 2 to 4 projects.
    Compare {
        #[arg(required = true)]
        names: Vec<String>,
        #[arg(long)]
        json: bool,
    },
}

/// Everything a handler needs to find projects.
pub struct Context {
    pub data_dir: PathBuf,
    pub config: Config,
    pub project: Option<String>,
}

impl Context {
    pub fn registry_path(&self) -> PathBuf {
        personnel::registry_path(&self.data_dir)
    }

    /// Open the selected project: `--project`, then the configured default,
    /// then the most recently modified one.
    pub fn open_project(&self) -> Result<(Project, Database)> {
        let project = match self.project.as_ref().or(self.config.default_project.as_ref()) {
            Some(name) => project::find_project(&self.data_dir, name)?,
            None => project::most_recent_project(&self.data_dir)?.ok_or_else(|| {
                anyhow!("no projects in {}; create one with `plan project new <NAME>`", self.data_dir.display())
            })?,
        };
        let db = project
            .load_database()
            .with_context(|| format!("failed to load project {}", project.display_name))?;
        Ok((project, db))
    }
}

fn save(project: &Project, db: &Database) -> Result<()> {
    project
        .save_database(db)
        .with_context(|| format!("failed to save {}", project.file_path.display()))
}

fn parse_date_arg(s: &str) -> Result<NaiveDate> {
    parse_date_input(s).ok_or_else(|| anyhow!("invalid date '{}'", s))
}

fn parse_opt_date(s: Option<&str>) -> Result<Option<NaiveDate>> {
    s.map(parse_date_arg).transpose()
}

fn format_timestamp(ts: i64) -> String {
    Utc.timestamp_opt(ts, 0)
        .single()
        .map_or_else(|| "-".to_string(), |t| t.to_rfc3339())
}

/// Dispatch a parsed command.
pub fn run(ctx: &Context, command: Commands) -> Result<()> {
    match command {
        Commands::Task { action } => cmd_task(ctx, action),
        Commands::Milestone { action } => cmd_milestone(ctx, action),
        Commands::Schedule { mode, date, no_weekends, holidays, holiday, dry_run, json } => {
            cmd_schedule(ctx, mode, date, no_weekends, holidays, holiday, dry_run, json)
        }
        Commands::Progress { action } => cmd_progress(ctx, action),
        Commands::Project { action } => cmd_project(ctx, action),
        Commands::Stats { json } => cmd_stats(ctx, json),
        Commands::Workload { by_department, json } => cmd_workload(ctx, by_department, json),
        Commands::People { action } => cmd_people(ctx, action),
        Commands::Department { action } => cmd_department(ctx, action),
        Commands::Export { output } => cmd_export(ctx, output),
        Commands::Import { input, no_backup, clear_pins } => {
            cmd_import(ctx, &input, no_backup, clear_pins)
        }
        Commands::Backup { all } => cmd_backup(ctx, all),
        Commands::Gantt => {
            let (project, db) = ctx.open_project()?;
            run_gantt(&project.display_name, &db)
        }
        Commands::Completions { shell } => {
            cmd_completions(shell);
            Ok(())
        }
    }
}

fn cmd_task(ctx: &Context, action: TaskAction) -> Result<()> {
    let (project, mut db) = ctx.open_project()?;
    match action {
        TaskAction::Add {
            name, milestone, duration, no, after, start, end, position, responsible,
            accountable, excluded,
        } => {
            let milestone = match milestone {
                Some(m) => m,
                None => db
                    .milestones
                    .first()
                    .cloned()
                    .ok_or_else(|| anyhow!("project has no milestones; add one with `plan milestone add`"))?,
            };
            let mut draft = TaskDraft::new(&milestone, &name, duration);
            draft.task_no = no.as_deref().map(str::parse::<TaskNo>).transpose()?;
            draft.predecessor = Predecessors::parse_all(&after)?;
            if let Some(date) = parse_opt_date(start.as_deref())? {
                draft = draft.pin_start(date);
            }
            if let Some(date) = parse_opt_date(end.as_deref())? {
                draft = draft.pin_end(date);
            }
            draft.excluded = excluded;
            draft.raci.assign(RaciRole::Responsible, &responsible, true);
            draft.raci.accountable = accountable;

            let id = db.add_task(draft, position)?;
            save(&project, &db)?;
            if let Some(task) = db.get(id) {
                println!("Added task {} {}", task.task_no, task.name);
            }
        }

        TaskAction::List { milestone, status, hide_excluded, sort } => {
            let tasks: Vec<&Task> = db
                .sorted_tasks(sort)
                .into_iter()
                .filter(|t| milestone.as_ref().map_or(true, |m| t.milestone == *m))
                .filter(|t| status.map_or(true, |s| t.status == s))
                .filter(|t| !(hide_excluded && t.excluded))
                .collect();
            if tasks.is_empty() {
                println!("No tasks.");
            } else {
                print_table(&tasks);
            }
        }

        TaskAction::Show { id } => {
            let id = db.resolve(&id)?;
            let task = db.get(id).ok_or_else(|| anyhow!("task {} not found", id))?;
            let index = db.position(id).unwrap_or_default();
            let pinned = |manual: bool| if manual { " (pinned)" } else { "" };
            println!("Task:         {} {}", task.task_no, task.name);
            println!("Id / index:   {} / {}", task.id, index);
            println!("Milestone:    {}", task.milestone);
            println!("Duration:     {} working day(s)", task.duration);
            println!("After:        {}", or_dash(&task.predecessor.to_string()));
            println!("Start:        {}{}", format_date(task.start_date), pinned(task.manual_start));
            println!("End:          {}{}", format_date(task.end_date), pinned(task.manual_end));
            println!("Excluded:     {}", task.excluded);
            println!("Status:       {} ({}%)", format_status(task.status), task.progress);
            println!("Actual:       {} .. {}", format_date(task.actual_start), format_date(task.actual_end));
            for role in [RaciRole::Responsible, RaciRole::Accountable, RaciRole::Consulted, RaciRole::Informed] {
                println!("{:<14}{}", format!("{}:", format_role(role)), or_dash(&task.raci.people(role).join(", ")));
            }
            let dependents: Vec<String> = db
                .sorted_tasks(SortKey::No)
                .into_iter()
                .filter(|t| t.predecessor.contains(&task.task_no))
                .map(|t| t.task_no.to_string())
                .collect();
            println!("Dependents:   {}", or_dash(&dependents.join(",")));
            println!("Created UTC:  {}", format_timestamp(task.created_at_utc));
            println!("Updated UTC:  {}", format_timestamp(task.updated_at_utc));
        }

        TaskAction::Update {
            id, name, milestone, duration, no, after, clear_after, start, end, unpin_start,
            unpin_end,
        } => {
            let id = db.resolve(&id)?;
            let task = db.get(id).ok_or_else(|| anyhow!("task {} not found", id))?;
            let mut draft = TaskDraft::from(task);
            if let Some(name) = name {
                draft.name = name;
            }
            if let Some(milestone) = milestone {
                draft.milestone = milestone;
            }
            if let Some(duration) = duration {
                draft.duration = duration;
            }
            if let Some(no) = no {
                draft.task_no = Some(no.parse()?);
            }
            if clear_after {
                draft.predecessor = Predecessors::new();
            }
            if !after.is_empty() {
                draft.predecessor = Predecessors::parse_all(&after)?;
            }
            if let Some(date) = parse_opt_date(start.as_deref())? {
                draft = draft.pin_start(date);
            }
            if let Some(date) = parse_opt_date(end.as_deref())? {
                draft = draft.pin_end(date);
            }
            if unpin_start {
                draft.manual_start = false;
            }
            if unpin_end {
                draft.manual_end = false;
            }
            db.update_task(id, draft)?;
            save(&project, &db)?;
            println!("Updated task {}", id);
        }

        TaskAction::Delete { id } => {
            let id = db.resolve(&id)?;
            let removed = db.delete_task(id)?;
            save(&project, &db)?;
            println!("Deleted task {} {}", removed.task_no, removed.name);
        }

        TaskAction::Exclude { id } => {
            let id = db.resolve(&id)?;
            let excluded = db.toggle_exclude(id)?;
            save(&project, &db)?;
            println!("Task {} is now {}", id, if excluded { "excluded" } else { "included" });
        }

        TaskAction::UnpinAll => {
            let pinned = db.clear_manual_dates();
            save(&project, &db)?;
            println!("Cleared planned dates of {} task(s), {} were pinned", db.tasks.len(), pinned);
        }

        TaskAction::Move { id, direction } => {
            let id = db.resolve(&id)?;
            if db.move_task(id, direction)? {
                save(&project, &db)?;
                println!("Moved task {} to index {}", id, db.position(id).unwrap_or_default());
            } else {
                println!("Task {} is already at the edge.", id);
            }
        }

        TaskAction::Raci { role, people, tasks, replace } => {
            let ids = tasks
                .iter()
                .map(|t| db.resolve(t))
                .collect::<Result<Vec<_>, _>>()?;
            let count = db.assign_raci(&ids, role, &people, replace)?;
            save(&project, &db)?;
            println!("Assigned {} on {} task(s)", format_role(role), count);
            let registry = Registry::load(&ctx.registry_path())?;
            if !registry.people.is_empty() {
                for name in registry.unknown(&people) {
                    eprintln!("Warning: {} is not in the personnel registry", name);
                }
            }
        }
    }
    Ok(())
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() {
        "-"
    } else {
        s
    }
}

fn cmd_milestone(ctx: &Context, action: MilestoneAction) -> Result<()> {
    let (project, mut db) = ctx.open_project()?;
    match action {
        MilestoneAction::List => {
            println!("{:<4} {:<32} {}", "Seq", "Milestone", "Tasks");
            for (i, m) in db.milestones.iter().enumerate() {
                let count = db.tasks.iter().filter(|t| t.milestone == *m).count();
                println!("{:<4} {:<32} {}", i + 1, truncate(m, 32), count);
            }
            return Ok(());
        }
        MilestoneAction::Add { name } => {
            db.add_milestone(&name)?;
            println!("Added milestone {}", name.trim());
        }
        MilestoneAction::Rename { old, new } => {
            let moved = db.rename_milestone(&old, &new)?;
            println!("Renamed milestone {} to {} ({} task(s))", old, new.trim(), moved);
        }
        MilestoneAction::Delete { name } => {
            db.delete_milestone(&name)?;
            println!("Deleted milestone {}", name);
        }
        MilestoneAction::Reorder { names } => {
            db.reorder_milestones(names)?;
            println!("Milestones reordered");
        }
    }
    save(&project, &db)
}

/// JSON shape of a scheduling result.
#[derive(Serialize)]
struct ScheduleResponse<'a> {
    tasks: &'a [Task],
    summary: Option<Summary>,
    warnings: &'a [ManualDateWarning],
}

#[allow(clippy::too_many_arguments)]
fn cmd_schedule(
    ctx: &Context,
    mode: ScheduleMode,
    date: Option<String>,
    no_weekends: bool,
    holidays: bool,
    holiday: Vec<String>,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let (project, mut db) = ctx.open_project()?;
    let date = parse_opt_date(date.as_deref())?;
    let request = schedule_request(
        &db.settings,
        &ctx.config,
        mode,
        date,
        no_weekends,
        holidays || !holiday.is_empty(),
        Local::now().date_naive(),
    )?;

    let mut holiday_set: BTreeSet<NaiveDate> = ctx.config.holidays();
    for raw in &holiday {
        holiday_set.insert(
            NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .with_context(|| format!("invalid holiday '{}'", raw))?,
        );
    }

    let (schedule, tasks): (Schedule, Vec<Task>) = if dry_run {
        let schedule = db
            .plan(mode, &request, &holiday_set)
            .context("scheduling failed")?;
        let mut preview = db.tasks.clone();
        schedule.apply(&mut preview);
        (schedule, preview)
    } else {
        let schedule = db
            .schedule(mode, &request, &holiday_set)
            .context("scheduling failed; no dates were changed")?;
        save(&project, &db)?;
        (schedule, db.tasks.clone())
    };

    if json {
        let response = ScheduleResponse {
            tasks: &tasks,
            summary: schedule.summary,
            warnings: &schedule.warnings,
        };
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    let mut rows: Vec<&Task> = tasks.iter().collect();
    rows.sort_by_key(|t| t.task_no);
    print_table(&rows);
    println!();
    match schedule.summary {
        Some(s) => println!(
            "{} schedule from {}: {} .. {} ({} calendar days)",
            format_mode(mode),
            request.date,
            s.start_date,
            s.end_date,
            s.total_days
        ),
        None => println!("Nothing to schedule."),
    }
    for warning in &schedule.warnings {
        println!("warning: {}", warning);
    }
    if dry_run {
        println!("(dry run, nothing saved)");
    }
    Ok(())
}

/// Anchor and calendar of a scheduling run. An explicit date starts from the
/// config defaults; without one the project's last run is repeated, which
/// only makes sense in the same mode. Flags switch exclusions on top.
fn schedule_request(
    settings: &ScheduleSettings,
    config: &Config,
    mode: ScheduleMode,
    date: Option<NaiveDate>,
    no_weekends: bool,
    holidays: bool,
    today: NaiveDate,
) -> Result<ScheduleRequest> {
    let (date, exclude_weekends, exclude_holidays) = match (date, settings.date) {
        (Some(date), _) => (date, config.calendar.exclude_weekends, config.calendar.exclude_holidays),
        (None, Some(last)) => {
            if settings.mode != mode {
                bail!(
                    "the last schedule ran {} from {}; give a date to schedule {}",
                    format_mode(settings.mode),
                    last,
                    format_mode(mode)
                );
            }
            (last, settings.exclude_weekends, settings.exclude_holidays)
        }
        (None, None) => (today, config.calendar.exclude_weekends, config.calendar.exclude_holidays),
    };
    Ok(ScheduleRequest {
        date,
        exclude_weekends: exclude_weekends && !no_weekends,
        exclude_holidays: exclude_holidays || holidays,
    })
}

fn cmd_progress(ctx: &Context, action: ProgressAction) -> Result<()> {
    let (project, mut db) = ctx.open_project()?;
    match action {
        ProgressAction::Record { task, progress, date, note, issues, pause, resume } => {
            let id = db.resolve(&task)?;
            let date = match date {
                Some(s) => parse_date_arg(&s)?,
                None => Local::now().date_naive(),
            };
            let entry = ProgressEntry {
                date,
                progress,
                pause: match (pause, resume) {
                    (true, _) => PauseChange::Pause,
                    (_, true) => PauseChange::Resume,
                    _ => PauseChange::Keep,
                },
                note,
                issues,
            };
            let record = db.record_progress(id, entry)?;
            save(&project, &db)?;
            println!(
                "Recorded {}% ({}, {:+}) on {} [{}]",
                record.progress,
                format_status(record.status),
                record.increment,
                record.date,
                record.id
            );
        }
        ProgressAction::History { task } => {
            let id = db.resolve(&task)?;
            let history = db.progress.history(id);
            if history.is_empty() {
                println!("No progress recorded.");
                return Ok(());
            }
            println!("{:<11} {:>4} {:>5} {:<12} {:<36} {}", "Date", "%", "+/-", "Status", "Id", "Note");
            for r in history {
                println!(
                    "{:<11} {:>4} {:>+5} {:<12} {:<36} {}",
                    r.date.to_string(),
                    r.progress,
                    r.increment,
                    format_status(r.status),
                    r.id.to_string(),
                    r.note
                );
            }
        }
        ProgressAction::Day { date } => {
            let date = match date {
                Some(s) => parse_date_arg(&s)?,
                None => Local::now().date_naive(),
            };
            let records = db.progress.records_on(date);
            if records.is_empty() {
                println!("No progress recorded on {}.", date);
            }
            for r in records {
                let label = db
                    .get(r.task)
                    .map_or_else(|| r.task.to_string(), |t| format!("{} {}", t.task_no, t.name));
                println!("{:>4}% {:<12} {}", r.progress, format_status(r.status), label);
            }
        }
        ProgressAction::Delete { record } => {
            let removed = db.delete_progress(record)?;
            save(&project, &db)?;
            println!("Deleted progress entry of {}", removed.date);
        }
    }
    Ok(())
}

fn cmd_project(ctx: &Context, action: ProjectAction) -> Result<()> {
    let dir = &ctx.data_dir;
    match action {
        ProjectAction::List { status } => {
            let projects = project::discover_projects(dir)?;
            println!("{:<24} {:<10} {:>6} {:>7}  {}", "Project", "Status", "Tasks", "Done %", "Updated");
            for p in projects {
                let db = match p.load_database() {
                    Ok(db) => db,
                    Err(e) => {
                        eprintln!("Skipping {}: {}", p.file_path.display(), e);
                        continue;
                    }
                };
                if status.map_or(false, |s| s != db.meta.status) {
                    continue;
                }
                let stats = ProjectStats::from_tasks(&db.tasks);
                println!(
                    "{:<24} {:<10} {:>6} {:>7.1}  {}",
                    truncate(&p.name, 24),
                    format_project_status(db.meta.status),
                    stats.task_count,
                    stats.completion_rate,
                    format_timestamp(db.meta.updated_at_utc)
                );
            }
        }
        ProjectAction::New { name, description, from } => {
            let source = match from.as_deref() {
                None => TemplateSource::Empty,
                Some("builtin") => TemplateSource::Builtin,
                Some(other) => TemplateSource::Project(other),
            };
            let (p, db) = project::create_project(
                dir,
                &name,
                &description,
                &ctx.config.default_milestones(),
                source,
            )?;
            println!("Created project {} ({} task(s)) at {}", p.name, db.tasks.len(), p.file_path.display());
        }
        ProjectAction::Duplicate { source, name } => {
            let p = project::duplicate_project(dir, &source, &name)?;
            println!("Created {} from {}", p.name, source);
        }
        ProjectAction::Template { source, name } => {
            let p = project::save_as_template(dir, &source, &name)?;
            println!("Saved template {} from {}", p.name, source);
        }
        ProjectAction::Archive { name } => {
            project::set_status(dir, &name, ProjectStatus::Archived)?;
            println!("Archived {}", name);
        }
        ProjectAction::Activate { name } => {
            project::set_status(dir, &name, ProjectStatus::Active)?;
            println!("Activated {}", name);
        }
        ProjectAction::Delete { name } => {
            let backup = project::delete_project(dir, &name)?;
            println!("Deleted {} (backup: {})", name, backup.display());
        }
        ProjectAction::Compare { names, json } => {
            let mut loaded = Vec::new();
            for name in &names {
                let db = project::find_project(dir, name)?.load_database()?;
                loaded.push((name.as_str(), db));
            }
            let refs: Vec<(&str, &Database)> = loaded.iter().map(|(n, db)| (*n, db)).collect();
            let rows = report::compare(&refs)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
                return Ok(());
            }
            for row in rows {
                println!(
                    "{}: {:.1}% over {} task(s), {} .. {}",
                    row.name,
                    row.stats.completion_rate,
                    row.stats.task_count,
                    format_date(row.start_date),
                    format_date(row.end_date)
                );
                for m in row.milestones {
                    println!(
                        "    {:<28} {:>3}/{:<3} {:>6.1}%",
                        truncate(&m.milestone, 28),
                        m.completed_tasks,
                        m.total_tasks,
                        m.avg_progress
                    );
                }
            }
        }
    }
    Ok(())
}

fn cmd_stats(ctx: &Context, json: bool) -> Result<()> {
    let (project, db) = ctx.open_project()?;
    let stats = ProjectStats::from_tasks(&db.tasks);
    let milestones = report::milestone_breakdown(&db.milestones, &db.tasks);
    if json {
        let value = serde_json::json!({ "project": project.name, "stats": stats, "milestones": milestones });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }
    println!("Project:      {}", project.display_name);
    println!("Tasks:        {}", stats.task_count);
    println!(
        "Status:       {} done, {} in progress, {} paused, {} not started",
        stats.completed, stats.in_progress, stats.paused, stats.not_started
    );
    println!("Completion:   {:.1}%", stats.completion_rate);
    println!();
    println!("{:<28} {:>5} {:>5} {:>7}", "Milestone", "Tasks", "Done", "Avg %");
    for m in milestones {
        println!(
            "{:<28} {:>5} {:>5} {:>7.1}",
            truncate(&m.milestone, 28),
            m.total_tasks,
            m.completed_tasks,
            m.avg_progress
        );
    }
    Ok(())
}

fn cmd_workload(ctx: &Context, by_department: bool, json: bool) -> Result<()> {
    let (_, db) = ctx.open_project()?;
    let loads = report::workload(&db.tasks);
    if by_department {
        let registry = Registry::load(&ctx.registry_path())?;
        let groups = report::department_workload(&loads, &registry);
        if json {
            println!("{}", serde_json::to_string_pretty(&groups)?);
            return Ok(());
        }
        println!("{:<16} {:>3} {:>3} {:>3} {:>3} {:>8}  {}", "Department", "R", "A", "C", "I", "R days", "People");
        for g in groups {
            println!(
                "{:<16} {:>3} {:>3} {:>3} {:>3} {:>8.1}  {}",
                truncate(&g.department, 16),
                g.responsible,
                g.accountable,
                g.consulted,
                g.informed,
                g.responsible_days,
                g.people.join(", ")
            );
        }
        return Ok(());
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&loads)?);
        return Ok(());
    }
    if loads.is_empty() {
        println!("No RACI assignments.");
        return Ok(());
    }
    println!("{:<24} {:>3} {:>3} {:>3} {:>3} {:>8}", "Person", "R", "A", "C", "I", "R days");
    for l in loads {
        println!(
            "{:<24} {:>3} {:>3} {:>3} {:>3} {:>8.1}",
            truncate(&l.person, 24),
            l.responsible,
            l.accountable,
            l.consulted,
            l.informed,
            l.responsible_days
        );
    }
    Ok(())
}

fn cmd_people(ctx: &Context, action: PeopleAction) -> Result<()> {
    let path = ctx.registry_path();
    let mut registry = Registry::load(&path)?;
    match action {
        PeopleAction::List { department } => {
            let people: Vec<_> = registry
                .people
                .iter()
                .filter(|p| department.as_ref().map_or(true, |d| p.department == *d))
                .collect();
            if people.is_empty() {
                println!("No people registered.");
            } else {
                println!("{:<16} {:<24} {}", "Id", "Name", "Department");
                for p in people {
                    println!("{:<16} {:<24} {}", p.id, truncate(&p.name, 24), or_dash(&p.department));
                }
            }
            return Ok(());
        }
        PeopleAction::Add { name, department } => {
            let person = registry.add_person(&name, &department)?;
            println!("Added {} [{}]", person.name, person.id);
        }
        PeopleAction::Update { person, name, department } => {
            let person = registry.update_person(&person, name.as_deref(), department.as_deref())?;
            println!("Updated {} ({})", person.name, or_dash(&person.department));
        }
        PeopleAction::Remove { person } => {
            let removed = registry.remove_person(&person)?;
            println!("Removed {}", removed.name);
        }
    }
    registry
        .save(&path)
        .with_context(|| format!("failed to save {}", path.display()))
}

fn cmd_department(ctx: &Context, action: DepartmentAction) -> Result<()> {
    let path = ctx.registry_path();
    let mut registry = Registry::load(&path)?;
    match action {
        DepartmentAction::List => {
            for d in &registry.departments {
                let count = registry.people.iter().filter(|p| p.department == *d).count();
                println!("{:<24} {}", truncate(d, 24), count);
            }
            return Ok(());
        }
        DepartmentAction::Add { name } => {
            registry.add_department(&name)?;
            println!("Added department {}", name.trim());
        }
        DepartmentAction::Remove { name } => {
            registry.remove_department(&name)?;
            println!("Removed department {}", name);
        }
    }
    registry
        .save(&path)
        .with_context(|| format!("failed to save {}", path.display()))
}

fn cmd_export(ctx: &Context, output: Option<PathBuf>) -> Result<()> {
    let (project, db) = ctx.open_project()?;
    let output = output.unwrap_or_else(|| PathBuf::from(format!("{}_tasks.csv", project.name)));
    let count = write_csv(&db, &output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("Exported {} task(s) to {}", count, output.display());
    Ok(())
}

fn cmd_import(ctx: &Context, input: &Path, no_backup: bool, clear_pins: bool) -> Result<()> {
    let (project, mut db) = ctx.open_project()?;
    if !no_backup {
        let backup = project::create_backup(&project.file_path)
            .context("failed to create backup; rerun with --no-backup to skip it")?;
        println!("Created backup: {}", backup.display());
    }
    let report = read_csv(&mut db, input)
        .with_context(|| format!("failed to import {}", input.display()))?;
    for (line, reason) in &report.skipped {
        eprintln!("Warning: line {} skipped: {}", line, reason);
    }
    if clear_pins {
        let pinned = db.clear_manual_dates();
        println!("Cleared planned dates; {} task(s) were pinned", pinned);
    }
    save(&project, &db)?;
    println!(
        "Import completed. {} task(s) imported, {} skipped.",
        report.imported,
        report.skipped.len()
    );
    Ok(())
}

fn cmd_backup(ctx: &Context, all: bool) -> Result<()> {
    let projects = if all {
        project::discover_projects(&ctx.data_dir)?
    } else {
        vec![ctx.open_project()?.0]
    };
    if projects.is_empty() {
        println!("No projects to back up.");
    }
    for p in projects {
        let backup = project::create_backup(&p.file_path)
            .with_context(|| format!("failed to back up {}", p.name))?;
        println!("Created backup: {}", backup.display());
    }
    Ok(())
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;
    use crate::cli::Cli;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}

/// Make sure the data directory exists before project commands touch it.
pub fn ensure_data_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create data directory {}", dir.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn context(dir: &Path, project: Option<&str>) -> Context {
        Context {
            data_dir: dir.to_path_buf(),
            config: Config::default(),
            project: project.map(String::from),
        }
    }

    #[test]
    fn test_open_project_without_projects_fails() {
        let dir = tempdir().unwrap();
        let err = context(dir.path(), None).open_project().unwrap_err();
        assert!(err.to_string().contains("no projects"));
    }

    #[test]
    fn test_task_and_schedule_commands() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path(), Some("Demo"));
        cmd_project(
            &ctx,
            ProjectAction::New { name: "Demo".into(), description: String::new(), from: None },
        )
        .unwrap();

        for (name, after) in [("Kickoff", vec![]), ("Design", vec!["1.1".to_string()])] {
            cmd_task(
                &ctx,
                TaskAction::Add {
                    name: name.into(),
                    milestone: None,
                    duration: 2,
                    no: None,
                    after,
                    start: None,
                    end: None,
                    position: None,
                    responsible: vec!["ann".into()],
                    accountable: None,
                    excluded: false,
                },
            )
            .unwrap();
        }

        cmd_schedule(
            &ctx,
            ScheduleMode::Forward,
            Some("2024-01-01".into()),
            false,
            false,
            vec![],
            false,
            true,
        )
        .unwrap();

        let (_, db) = ctx.open_project().unwrap();
        let design = db.get(db.resolve("Design").unwrap()).unwrap();
        assert_eq!(design.start_date, NaiveDate::from_ymd_opt(2024, 1, 3));
        assert_eq!(design.end_date, NaiveDate::from_ymd_opt(2024, 1, 4));
        assert_eq!(db.settings.mode, ScheduleMode::Forward);
    }

    #[test]
    fn test_dry_run_leaves_project_untouched() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path(), Some("Dry"));
        cmd_project(
            &ctx,
            ProjectAction::New { name: "Dry".into(), description: String::new(), from: Some("builtin".into()) },
        )
        .unwrap();
        cmd_schedule(
            &ctx,
            ScheduleMode::Backward,
            Some("2025-06-30".into()),
            false,
            false,
            vec!["2025-06-02".into()],
            true,
            true,
        )
        .unwrap();
        let (_, db) = ctx.open_project().unwrap();
        assert!(db.tasks.iter().all(|t| t.start_date.is_none()));
        assert_eq!(db.settings.date, None);
    }

    #[test]
    fn test_bad_holiday_argument_is_reported() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path(), Some("Hol"));
        cmd_project(
            &ctx,
            ProjectAction::New { name: "Hol".into(), description: String::new(), from: None },
        )
        .unwrap();
        let err = cmd_schedule(
            &ctx,
            ScheduleMode::Forward,
            Some("2024-01-01".into()),
            false,
            false,
            vec!["soon".into()],
            false,
            false,
        )
        .unwrap_err();
        assert!(err.to_string().contains("invalid holiday"));
    }

    fn add_task(ctx: &Context, name: &str, duration: u32, start: Option<&str>) {
        cmd_task(
            ctx,
            TaskAction::Add {
                name: name.into(),
                milestone: None,
                duration,
                no: None,
                after: vec![],
                start: start.map(String::from),
                end: None,
                position: None,
                responsible: vec![],
                accountable: None,
                excluded: false,
            },
        )
        .unwrap();
    }

    #[test]
    fn test_rerun_without_date_repeats_last_calendar() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path(), Some("Rerun"));
        cmd_project(
            &ctx,
            ProjectAction::New { name: "Rerun".into(), description: String::new(), from: None },
        )
        .unwrap();
        add_task(&ctx, "Build", 7, None);

        let end_date = |ctx: &Context| {
            let (_, db) = ctx.open_project().unwrap();
            db.tasks[0].end_date
        };
        let jan = |day| NaiveDate::from_ymd_opt(2024, 1, day);

        cmd_schedule(&ctx, ScheduleMode::Forward, Some("2024-01-05".into()), true, false, vec![], false, true)
            .unwrap();
        assert_eq!(end_date(&ctx), jan(11));

        cmd_schedule(&ctx, ScheduleMode::Forward, None, false, false, vec![], false, true).unwrap();
        assert_eq!(end_date(&ctx), jan(11));

        let err = cmd_schedule(&ctx, ScheduleMode::Backward, None, false, false, vec![], false, true)
            .unwrap_err();
        assert!(err.to_string().contains("last schedule ran forward from 2024-01-05"));
        assert_eq!(end_date(&ctx), jan(11));

        let (_, db) = ctx.open_project().unwrap();
        assert!(!db.settings.exclude_weekends);
    }

    #[test]
    fn test_schedule_request_sources() {
        let config = Config::default();
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let given = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();

        let fresh = ScheduleSettings::default();
        let request = schedule_request(&fresh, &config, ScheduleMode::Backward, None, false, false, today).unwrap();
        assert_eq!(request.date, today);
        assert!(request.exclude_weekends);

        let last = ScheduleSettings {
            mode: ScheduleMode::Backward,
            date: Some(given),
            exclude_weekends: true,
            exclude_holidays: true,
        };
        let request = schedule_request(&last, &config, ScheduleMode::Backward, None, true, false, today).unwrap();
        assert_eq!(
            (request.date, request.exclude_weekends, request.exclude_holidays),
            (given, false, true)
        );

        // An explicit date starts from the config, not the last run.
        let request = schedule_request(&last, &config, ScheduleMode::Forward, Some(today), false, false, today)
            .unwrap();
        assert_eq!(
            (request.date, request.exclude_weekends, request.exclude_holidays),
            (today, true, false)
        );
        assert!(schedule_request(&last, &config, ScheduleMode::Forward, None, false, false, today).is_err());
    }

    #[test]
    fn test_unpin_all_and_import_clear_pins() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path(), Some("Pins"));
        cmd_project(
            &ctx,
            ProjectAction::New { name: "Pins".into(), description: String::new(), from: None },
        )
        .unwrap();
        add_task(&ctx, "Kickoff", 1, Some("2024-02-01"));

        let csv = dir.path().join("pins.csv");
        cmd_export(&ctx, Some(csv.clone())).unwrap();

        cmd_task(&ctx, TaskAction::UnpinAll).unwrap();
        let (_, db) = ctx.open_project().unwrap();
        assert!(!db.tasks[0].manual_start);
        assert_eq!(db.tasks[0].start_date, None);

        cmd_task(&ctx, TaskAction::Delete { id: "1.1".into() }).unwrap();
        cmd_import(&ctx, &csv, true, true).unwrap();
        let (_, db) = ctx.open_project().unwrap();
        assert_eq!(db.tasks.len(), 1);
        assert!(!db.tasks[0].manual_start);
        assert_eq!(db.tasks[0].start_date, None);
    }

    #[test]
    fn test_people_and_department_commands() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path(), None);
        cmd_department(&ctx, DepartmentAction::Add { name: "Legal".into() }).unwrap();
        cmd_people(&ctx, PeopleAction::Add { name: "ann".into(), department: "Legal".into() }).unwrap();

        let err = cmd_department(&ctx, DepartmentAction::Remove { name: "Legal".into() }).unwrap_err();
        assert!(err.to_string().contains("still belong"));

        cmd_people(
            &ctx,
            PeopleAction::Update { person: "ann".into(), name: None, department: Some("Quality".into()) },
        )
        .unwrap();
        cmd_department(&ctx, DepartmentAction::Remove { name: "Legal".into() }).unwrap();

        let registry = Registry::load(&ctx.registry_path()).unwrap();
        assert_eq!(registry.department_of("ann"), Some("Quality"));
        assert!(!registry.departments.iter().any(|d| d == "Legal"));

        cmd_people(&ctx, PeopleAction::Remove { person: "ann".into() }).unwrap();
        assert!(Registry::load(&ctx.registry_path()).unwrap().people.is_empty());
    }
}

//! Multi-project support.
//!
//! Projects live side by side in one data directory, one JSON file each,
//! named `<project_name>_plan.json`. This module handles discovery, naming,
//! creation from templates, duplication, archiving and backups.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{Local, Utc};
use tracing::info;

use crate::db::Database;
use crate::error::ProjectError;
use crate::fields::ProjectStatus;
use crate::template;

const FILE_SUFFIX: &str = "_plan";

/// A project and the file holding its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub name: String,
    pub display_name: String,
    pub file_path: PathBuf,
}

impl Project {
    pub fn new(display_name: &str, data_dir: &Path) -> Self {
        let name = sanitize_project_name(display_name);
        let file_path = data_dir.join(format!("{}{}.json", name, FILE_SUFFIX));
        Project {
            name,
            display_name: display_name.trim().to_string(),
            file_path,
        }
    }

    /// Recognise a project file by its `_plan.json` suffix.
    pub fn from_file(file_path: PathBuf) -> Option<Self> {
        if file_path.extension()?.to_str()? != "json" {
            return None;
        }
        let stem = file_path.file_stem()?.to_str()?;
        let name = stem.strip_suffix(FILE_SUFFIX)?;
        if name.is_empty() {
            return None;
        }
        Some(Project {
            name: name.to_string(),
            display_name: name.replace('_', " "),
            file_path,
        })
    }

    pub fn load_database(&self) -> Result<Database, ProjectError> {
        Ok(Database::load(&self.file_path)?)
    }

    pub fn save_database(&self, db: &Database) -> Result<(), ProjectError> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        db.save(&self.file_path)?;
        Ok(())
    }
}

/// Convert a display name to a safe project name for file naming.
/// Lowercases and collapses every run of non-alphanumerics into `_`.
pub fn sanitize_project_name(display_name: &str) -> String {
    display_name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect::<String>()
        .split('_')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// All projects in the data directory, sorted by name.
pub fn discover_projects(data_dir: &Path) -> Result<Vec<Project>, std::io::Error> {
    let mut projects = Vec::new();
    if !data_dir.exists() {
        return Ok(projects);
    }
    for entry in fs::read_dir(data_dir)? {
        let path = entry?.path();
        if path.is_file() {
            if let Some(project) = Project::from_file(path) {
                projects.push(project);
            }
        }
    }
    projects.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(projects)
}

/// Look up an existing project by display or file name.
pub fn find_project(data_dir: &Path, name: &str) -> Result<Project, ProjectError> {
    let project = Project::new(name, data_dir);
    if project.name.is_empty() {
        return Err(ProjectError::EmptyName);
    }
    if !project.file_path.exists() {
        return Err(ProjectError::NotFound(name.to_string()));
    }
    Ok(project)
}

/// Where the initial tasks of a new project come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateSource<'a> {
    Empty,
    Builtin,
    /// An existing project saved as a template.
    Project(&'a str),
}

/// Create a project file. `milestones` seeds an empty project and is
/// ignored when a template provides its own.
pub fn create_project(
    data_dir: &Path,
    display_name: &str,
    description: &str,
    milestones: &[String],
    source: TemplateSource<'_>,
) -> Result<(Project, Database), ProjectError> {
    let project = Project::new(display_name, data_dir);
    if project.name.is_empty() {
        return Err(ProjectError::EmptyName);
    }
    if project.file_path.exists() {
        return Err(ProjectError::Exists(display_name.to_string()));
    }

    let mut db = match source {
        TemplateSource::Empty => Database::new(&project.display_name, milestones),
        TemplateSource::Builtin => {
            let mut db = Database::new(&project.display_name, &[]);
            template::apply_builtin(&mut db)?;
            db
        }
        TemplateSource::Project(name) => {
            let mut db = find_project(data_dir, name)?.load_database()?;
            if db.meta.status != ProjectStatus::Template {
                return Err(ProjectError::NotATemplate(name.to_string()));
            }
            db.reset_progress(true);
            restamp(&mut db, &project.display_name, ProjectStatus::Active);
            db
        }
    };
    db.meta.description = description.to_string();

    project.save_database(&db)?;
    info!(project = %project.name, tasks = db.tasks.len(), "project created");
    Ok((project, db))
}

fn restamp(db: &mut Database, name: &str, status: ProjectStatus) {
    let now = Utc::now().timestamp();
    db.meta.name = name.to_string();
    db.meta.status = status;
    db.meta.created_at_utc = now;
    db.meta.updated_at_utc = now;
}

/// Copy a project under a new name with progress cleared and plan dates kept.
pub fn duplicate_project(data_dir: &Path, source: &str, new_name: &str) -> Result<Project, ProjectError> {
    copy_project(data_dir, source, new_name, ProjectStatus::Active, false)
}

/// Copy a project as a reusable template: progress and plan dates cleared.
pub fn save_as_template(data_dir: &Path, source: &str, template_name: &str) -> Result<Project, ProjectError> {
    copy_project(data_dir, source, template_name, ProjectStatus::Template, true)
}

fn copy_project(
    data_dir: &Path,
    source: &str,
    new_name: &str,
    status: ProjectStatus,
    clear_plan_dates: bool,
) -> Result<Project, ProjectError> {
    let mut db = find_project(data_dir, source)?.load_database()?;
    let target = Project::new(new_name, data_dir);
    if target.name.is_empty() {
        return Err(ProjectError::EmptyName);
    }
    if target.file_path.exists() {
        return Err(ProjectError::Exists(new_name.to_string()));
    }
    db.reset_progress(clear_plan_dates);
    restamp(&mut db, &target.display_name, status);
    target.save_database(&db)?;
    info!(from = source, to = %target.name, "project copied");
    Ok(target)
}

/// Archive, re-activate or mark a project as a template.
pub fn set_status(data_dir: &Path, name: &str, status: ProjectStatus) -> Result<(), ProjectError> {
    let project = find_project(data_dir, name)?;
    let mut db = project.load_database()?;
    db.meta.status = status;
    db.touch();
    project.save_database(&db)
}

/// Delete a project file after copying it to the backup directory.
pub fn delete_project(data_dir: &Path, name: &str) -> Result<PathBuf, ProjectError> {
    let project = find_project(data_dir, name)?;
    let backup = create_backup(&project.file_path)?;
    fs::remove_file(&project.file_path)?;
    info!(project = %project.name, backup = %backup.display(), "project deleted");
    Ok(backup)
}

/// The most recently modified project, if any.
pub fn most_recent_project(data_dir: &Path) -> Result<Option<Project>, std::io::Error> {
    let mut most_recent: Option<(Project, SystemTime)> = None;
    for project in discover_projects(data_dir)? {
        let Ok(modified) = fs::metadata(&project.file_path).and_then(|m| m.modified()) else {
            continue;
        };
        if most_recent.as_ref().map_or(true, |(_, t)| modified > *t) {
            most_recent = Some((project, modified));
        }
    }
    Ok(most_recent.map(|(project, _)| project))
}

/// Copy a file into `backup/` next to it, prefixed with a timestamp.
pub fn create_backup(path: &Path) -> Result<PathBuf, std::io::Error> {
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        ));
    }
    let backup_dir = path.parent().unwrap_or_else(|| Path::new(".")).join("backup");
    fs::create_dir_all(&backup_dir)?;

    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("plan.json");
    let backup_path = backup_dir.join(format!("{}_{}", timestamp, file_name));
    fs::copy(path, &backup_path)?;
    Ok(backup_path)
}

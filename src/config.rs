//! User configuration.
//!
//! Read from `config.toml` in the platform config directory
//! (`~/.config/plan/config.toml` on Linux) or from `--config`. Every field
//! has a default, so a missing file is the same as an empty one.
//!
//! ```toml
//! data_dir = "~/plans"
//! default_project = "widget"
//! milestones = ["Concept", "Build", "Launch"]
//!
//! [calendar]
//! exclude_weekends = true
//! exclude_holidays = true
//! holidays = ["2024-12-25", "2025-01-01"]
//! ```

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calendar;
use crate::error::ConfigError;
use crate::template;

/// Default calendar for scheduling runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarSettings {
    #[serde(default = "default_true")]
    pub exclude_weekends: bool,
    #[serde(default)]
    pub exclude_holidays: bool,
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,
}

fn default_true() -> bool {
    true
}

impl Default for CalendarSettings {
    fn default() -> Self {
        CalendarSettings {
            exclude_weekends: true,
            exclude_holidays: false,
            holidays: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the project files. `~` expands to the home dir.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Project used when `--project` is not given.
    #[serde(default)]
    pub default_project: Option<String>,

    /// Milestones of a new empty project. Empty means the APQP set.
    #[serde(default)]
    pub milestones: Vec<String>,

    #[serde(default)]
    pub calendar: CalendarSettings,
}

impl Config {
    /// Load from an explicit path, or the default location. Only an
    /// explicit path that does not exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_path() {
                Some(p) if p.exists() => p,
                _ => return Ok(Config::default()),
            },
        };
        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config = Self::parse(&content)?;
        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Data directory: configured value, else `~/.plan`.
    pub fn data_dir(&self) -> PathBuf {
        match &self.data_dir {
            Some(dir) => expand_home(dir),
            None => dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".plan"),
        }
    }

    /// Configured holidays, or the built-in set when none are listed.
    pub fn holidays(&self) -> BTreeSet<NaiveDate> {
        if self.calendar.holidays.is_empty() {
            calendar::builtin_holidays()
        } else {
            self.calendar.holidays.iter().copied().collect()
        }
    }

    /// Milestones for a new empty project.
    pub fn default_milestones(&self) -> Vec<String> {
        if self.milestones.is_empty() {
            template::builtin_milestones()
        } else {
            self.milestones.clone()
        }
    }
}

/// `<config dir>/plan/config.toml`, when the platform has a config dir.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("plan").join("config.toml"))
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

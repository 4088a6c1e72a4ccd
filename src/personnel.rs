//! Personnel registry shared by every project in a data directory.
//!
//! People carry a department. RACI assignments stay plain names, so the
//! registry is optional: it only adds the department view of workload and a
//! check for names nobody has registered.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{PersonnelError, StoreError};

pub const FILE_NAME: &str = "personnel.json";

/// Departments of a fresh registry.
pub const DEFAULT_DEPARTMENTS: [&str; 6] = [
    "R&D",
    "Engineering",
    "Production",
    "Quality",
    "Purchasing",
    "Sales",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    pub name: String,
    /// Empty when the person belongs to no department.
    #[serde(default)]
    pub department: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    #[serde(default = "default_departments")]
    pub departments: Vec<String>,
    #[serde(default)]
    pub people: Vec<Person>,
}

fn default_departments() -> Vec<String> {
    DEFAULT_DEPARTMENTS.iter().map(|d| d.to_string()).collect()
}

impl Default for Registry {
    fn default() -> Self {
        Registry {
            departments: default_departments(),
            people: Vec::new(),
        }
    }
}

/// `<data dir>/personnel.json`
pub fn registry_path(data_dir: &Path) -> PathBuf {
    data_dir.join(FILE_NAME)
}

impl Registry {
    /// Load the registry; a missing file gives the default departments and
    /// nobody in them.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            debug!(path = %path.display(), "personnel file missing, starting empty");
            return Ok(Registry::default());
        }
        let mut buf = String::new();
        File::open(path)?.read_to_string(&mut buf)?;
        Ok(serde_json::from_str(&buf)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(self)?;
        let mut f = File::create(&tmp)?;
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        debug!(path = %path.display(), people = self.people.len(), "personnel saved");
        Ok(())
    }

    /// Look a person up by id or by name.
    pub fn find(&self, key: &str) -> Option<&Person> {
        let key = key.trim();
        self.people.iter().find(|p| p.id == key || p.name == key)
    }

    pub fn department_of(&self, name: &str) -> Option<&str> {
        self.people
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.department.as_str())
            .filter(|d| !d.is_empty())
    }

    fn check_department(&self, department: &str) -> Result<(), PersonnelError> {
        if department.is_empty() || self.departments.iter().any(|d| d == department) {
            Ok(())
        } else {
            Err(PersonnelError::UnknownDepartment(department.to_string()))
        }
    }

    pub fn add_person(&mut self, name: &str, department: &str) -> Result<&Person, PersonnelError> {
        let name = name.trim();
        let department = department.trim();
        if name.is_empty() {
            return Err(PersonnelError::EmptyName);
        }
        if self.people.iter().any(|p| p.name == name) {
            return Err(PersonnelError::PersonExists(name.to_string()));
        }
        self.check_department(department)?;

        let simple = Uuid::new_v4().simple().to_string();
        self.people.push(Person {
            id: format!("person_{}", &simple[..8]),
            name: name.to_string(),
            department: department.to_string(),
        });
        info!(person = name, department, "person added");
        Ok(&self.people[self.people.len() - 1])
    }

    /// Rename a person or move them to another department. `None` keeps the
    /// current value; an empty department clears it.
    pub fn update_person(
        &mut self,
        key: &str,
        name: Option<&str>,
        department: Option<&str>,
    ) -> Result<&Person, PersonnelError> {
        let pos = self
            .people
            .iter()
            .position(|p| p.id == key.trim() || p.name == key.trim())
            .ok_or_else(|| PersonnelError::PersonNotFound(key.to_string()))?;

        if let Some(name) = name.map(str::trim) {
            if name.is_empty() {
                return Err(PersonnelError::EmptyName);
            }
            if self
                .people
                .iter()
                .enumerate()
                .any(|(i, p)| i != pos && p.name == name)
            {
                return Err(PersonnelError::PersonExists(name.to_string()));
            }
        }
        if let Some(department) = department {
            self.check_department(department.trim())?;
        }

        let person = &mut self.people[pos];
        if let Some(name) = name {
            person.name = name.trim().to_string();
        }
        if let Some(department) = department {
            person.department = department.trim().to_string();
        }
        Ok(&self.people[pos])
    }

    pub fn remove_person(&mut self, key: &str) -> Result<Person, PersonnelError> {
        let pos = self
            .people
            .iter()
            .position(|p| p.id == key.trim() || p.name == key.trim())
            .ok_or_else(|| PersonnelError::PersonNotFound(key.to_string()))?;
        let removed = self.people.remove(pos);
        info!(person = %removed.name, "person removed");
        Ok(removed)
    }

    pub fn add_department(&mut self, name: &str) -> Result<(), PersonnelError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PersonnelError::EmptyName);
        }
        if self.departments.iter().any(|d| d == name) {
            return Err(PersonnelError::DepartmentExists(name.to_string()));
        }
        self.departments.push(name.to_string());
        Ok(())
    }

    /// Remove a department nobody belongs to.
    pub fn remove_department(&mut self, name: &str) -> Result<(), PersonnelError> {
        let pos = self
            .departments
            .iter()
            .position(|d| d == name)
            .ok_or_else(|| PersonnelError::UnknownDepartment(name.to_string()))?;
        let members = self.people.iter().filter(|p| p.department == name).count();
        if members > 0 {
            return Err(PersonnelError::DepartmentInUse {
                name: name.to_string(),
                count: members,
            });
        }
        self.departments.remove(pos);
        Ok(())
    }

    /// Names from `people` that are not registered.
    pub fn unknown<'a>(&self, people: &'a [String]) -> Vec<&'a str> {
        people
            .iter()
            .map(String::as_str)
            .filter(|name| !self.people.iter().any(|p| p.name == *name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_fresh_registry_has_default_departments() {
        let registry = Registry::default();
        assert_eq!(registry.departments.len(), DEFAULT_DEPARTMENTS.len());
        assert!(registry.people.is_empty());
    }

    #[test]
    fn test_people_need_unique_names_and_known_departments() {
        let mut registry = Registry::default();
        let id = registry.add_person(" ann ", "Quality").unwrap().id.clone();
        assert!(id.starts_with("person_"));
        assert_eq!(registry.find(&id).map(|p| p.name.as_str()), Some("ann"));

        assert_eq!(
            registry.add_person("ann", "").unwrap_err(),
            PersonnelError::PersonExists("ann".into())
        );
        assert_eq!(registry.add_person("  ", "").unwrap_err(), PersonnelError::EmptyName);
        assert_eq!(
            registry.add_person("bo", "Legal").unwrap_err(),
            PersonnelError::UnknownDepartment("Legal".into())
        );
        registry.add_person("bo", "").unwrap();
        assert_eq!(registry.department_of("ann"), Some("Quality"));
        assert_eq!(registry.department_of("bo"), None);
    }

    #[test]
    fn test_update_and_remove_person() {
        let mut registry = Registry::default();
        registry.add_person("ann", "Quality").unwrap();
        registry.add_person("bo", "Sales").unwrap();

        assert_eq!(
            registry.update_person("ann", Some("bo"), None).unwrap_err(),
            PersonnelError::PersonExists("bo".into())
        );
        let updated = registry
            .update_person("ann", Some("anna"), Some("R&D"))
            .unwrap();
        assert_eq!((updated.name.as_str(), updated.department.as_str()), ("anna", "R&D"));

        assert_eq!(registry.remove_person("anna").unwrap().name, "anna");
        assert_eq!(
            registry.remove_person("anna").unwrap_err(),
            PersonnelError::PersonNotFound("anna".into())
        );
    }

    #[test]
    fn test_department_in_use_cannot_be_removed() {
        let mut registry = Registry::default();
        registry.add_department("Legal").unwrap();
        assert_eq!(
            registry.add_department("Legal").unwrap_err(),
            PersonnelError::DepartmentExists("Legal".into())
        );
        registry.add_person("cy", "Legal").unwrap();
        assert_eq!(
            registry.remove_department("Legal").unwrap_err(),
            PersonnelError::DepartmentInUse { name: "Legal".into(), count: 1 }
        );

        registry.update_person("cy", None, Some("")).unwrap();
        registry.remove_department("Legal").unwrap();
        assert!(!registry.departments.contains(&"Legal".to_string()));
    }

    #[test]
    fn test_unknown_names() {
        let mut registry = Registry::default();
        registry.add_person("ann", "").unwrap();
        let names = vec!["ann".to_string(), "zed".to_string()];
        assert_eq!(registry.unknown(&names), vec!["zed"]);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = registry_path(dir.path());
        assert_eq!(Registry::load(&path).unwrap(), Registry::default());

        let mut registry = Registry::default();
        registry.add_person("ann", "Quality").unwrap();
        registry.save(&path).unwrap();
        assert!(!path.with_extension("json.tmp").exists());
        assert_eq!(Registry::load(&path).unwrap(), registry);
    }
}

//! Project Catalog
//!
//! Maps distribution identifiers (e.g. `"ubuntu"`) to the one-byte project id
//! used on the wire, plus the display metadata the map legend needs.
//!
//! The table is read on every event by the batcher and replaced wholesale on a
//! config reload, so it lives behind a `watch` channel: readers borrow one
//! consistent snapshot, writers swap in a new version atomically.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::watch;

/// Which listing page a project is shown on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectPage {
    #[default]
    Distributions,
    Software,
}

/// A mirrored project as configured
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Distribution identifier as it appears in access logs
    pub short: String,
    /// Wire id
    pub id: u8,
    /// Human readable name
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub page: ProjectPage,
    /// Legend colour, e.g. `#E95420`
    #[serde(default)]
    pub color: String,
}

impl Project {
    pub fn new(short: impl Into<String>, id: u8) -> Self {
        let short = short.into();
        Self {
            name: short.clone(),
            short,
            id,
            page: ProjectPage::default(),
            color: String::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn page(mut self, page: ProjectPage) -> Self {
        self.page = page;
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }
}

/// Immutable, versioned snapshot of all configured projects
#[derive(Debug, Clone, Default)]
pub struct ProjectTable {
    version: u64,
    by_short: HashMap<String, Project>,
}

impl ProjectTable {
    /// Build a table, rejecting duplicate short names and duplicate wire ids
    pub fn from_projects(
        version: u64,
        projects: impl IntoIterator<Item = Project>,
    ) -> Result<Self, ProjectError> {
        let mut by_short = HashMap::new();
        let mut ids: HashMap<u8, String> = HashMap::new();

        for project in projects {
            if let Some(existing) = ids.get(&project.id) {
                return Err(ProjectError::DuplicateId {
                    id: project.id,
                    first: existing.clone(),
                    second: project.short,
                });
            }
            if by_short.contains_key(&project.short) {
                return Err(ProjectError::DuplicateShort(project.short));
            }
            ids.insert(project.id, project.short.clone());
            by_short.insert(project.short.clone(), project);
        }

        Ok(Self { version, by_short })
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Wire id for a distribution identifier
    pub fn id_of(&self, short: &str) -> Option<u8> {
        self.by_short.get(short).map(|p| p.id)
    }

    pub fn len(&self) -> usize {
        self.by_short.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_short.is_empty()
    }

    /// Projects ordered by wire id
    pub fn sorted(&self) -> Vec<&Project> {
        let mut projects: Vec<_> = self.by_short.values().collect();
        projects.sort_by_key(|p| p.id);
        projects
    }
}

/// Owner of the live project table
pub struct ProjectCatalog {
    tx: watch::Sender<ProjectTable>,
}

impl ProjectCatalog {
    /// Create a catalog whose first table is version 1
    pub fn new(projects: impl IntoIterator<Item = Project>) -> Result<Self, ProjectError> {
        let table = ProjectTable::from_projects(1, projects)?;
        let (tx, _) = watch::channel(table);
        Ok(Self { tx })
    }

    /// Replace the table. On error the current table stays live.
    ///
    /// Returns the new version.
    pub fn reload(&self, projects: impl IntoIterator<Item = Project>) -> Result<u64, ProjectError> {
        let version = self.tx.borrow().version + 1;
        let table = ProjectTable::from_projects(version, projects)?;
        let count = table.len();
        self.tx.send_replace(table);

        tracing::info!(version, projects = count, "Project table reloaded");
        Ok(version)
    }

    /// Read-only view for a consumer of the table
    pub fn subscribe(&self) -> ProjectView {
        ProjectView {
            rx: self.tx.subscribe(),
        }
    }

    pub fn version(&self) -> u64 {
        self.tx.borrow().version
    }

    /// Copy of the current projects, ordered by wire id
    pub fn projects(&self) -> Vec<Project> {
        self.tx.borrow().sorted().into_iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tx.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.borrow().is_empty()
    }
}

/// Read handle onto the live project table
#[derive(Clone)]
pub struct ProjectView {
    rx: watch::Receiver<ProjectTable>,
}

impl ProjectView {
    /// Run `f` against one consistent snapshot of the table
    pub fn with<R>(&self, f: impl FnOnce(&ProjectTable) -> R) -> R {
        f(&self.rx.borrow())
    }

    pub fn id_of(&self, short: &str) -> Option<u8> {
        self.with(|table| table.id_of(short))
    }

    pub fn version(&self) -> u64 {
        self.with(ProjectTable::version)
    }
}

/// Invalid project table
#[derive(Debug, Error, PartialEq)]
pub enum ProjectError {
    #[error("Project id {id} used by both {first:?} and {second:?}")]
    DuplicateId { id: u8, first: String, second: String },

    #[error("Project {0:?} defined more than once")]
    DuplicateShort(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Project> {
        vec![
            Project::new("ubuntu", 1).name("Ubuntu").color("#E95420"),
            Project::new("debian", 2).name("Debian"),
            Project::new("blender", 3).page(ProjectPage::Software),
        ]
    }

    #[test]
    fn test_lookup() {
        let table = ProjectTable::from_projects(1, sample()).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.id_of("debian"), Some(2));
        assert_eq!(table.id_of("arch"), None);
        assert_eq!(table.id_of("blender"), Some(3));
    }

    #[test]
    fn test_sorted_by_id() {
        let table = ProjectTable::from_projects(1, sample()).unwrap();
        let ids: Vec<u8> = table.sorted().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let result = ProjectTable::from_projects(
            1,
            vec![Project::new("ubuntu", 1), Project::new("debian", 1)],
        );
        assert!(matches!(result, Err(ProjectError::DuplicateId { id: 1, .. })));
    }

    #[test]
    fn test_duplicate_short_rejected() {
        let result = ProjectTable::from_projects(
            1,
            vec![Project::new("ubuntu", 1), Project::new("ubuntu", 2)],
        );
        assert_eq!(
            result.unwrap_err(),
            ProjectError::DuplicateShort("ubuntu".to_string())
        );
    }

    #[test]
    fn test_reload_is_seen_by_views() {
        let catalog = ProjectCatalog::new(sample()).unwrap();
        let view = catalog.subscribe();
        assert_eq!(view.version(), 1);
        assert_eq!(view.id_of("arch"), None);

        let version = catalog
            .reload(vec![Project::new("arch", 9), Project::new("ubuntu", 1)])
            .unwrap();

        assert_eq!(version, 2);
        assert_eq!(view.version(), 2);
        assert_eq!(view.id_of("arch"), Some(9));
        assert_eq!(view.id_of("debian"), None);
    }

    #[test]
    fn test_catalog_lists_projects_by_id() {
        let catalog = ProjectCatalog::new(sample()).unwrap();

        let projects = catalog.projects();

        let shorts: Vec<&str> = projects.iter().map(|p| p.short.as_str()).collect();
        assert_eq!(shorts, vec!["ubuntu", "debian", "blender"]);
        assert_eq!(projects[0].color, "#E95420");
        assert_eq!(projects[2].page, ProjectPage::Software);
    }

    #[test]
    fn test_failed_reload_keeps_old_table() {
        let catalog = ProjectCatalog::new(sample()).unwrap();
        let view = catalog.subscribe();

        let result = catalog.reload(vec![Project::new("a", 1), Project::new("b", 1)]);

        assert!(result.is_err());
        assert_eq!(catalog.version(), 1);
        assert_eq!(view.id_of("ubuntu"), Some(1));
    }
}

// crates/archon-store/src/project.rs
// ============================================================================
// Module: Archon Project Store
// Description: Project CRUD, the active-project index, and directory scaffold.
// Purpose: Give every project an isolated state directory and I/O handle.
// Dependencies: archon-core, crate::io, serde, thiserror, uuid
// ============================================================================

//! ## Overview
//! Projects live under `<archon_home>/projects/<project_id>/` with `state/`,
//! `logs/`, and a default read-write `workspace/` root. The index records
//! project identity and the active selection. Two projects' I/O handles are
//! disjoint by construction, which is the storage half of project isolation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use archon_core::Clock;
use archon_core::FsRoot;
use archon_core::ProjectId;
use archon_core::ResourceConfig;
use archon_core::RootPerm;
use archon_core::Timestamp;
use archon_core::WORKSPACE_ROOT_ID;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::io::FileStateIo;
use crate::io::StateIo;
use crate::io::StateIoExt;

// ============================================================================
// SECTION: Records
// ============================================================================

/// Project identity record stored in the index and in `metadata.json`.
///
/// # Invariants
/// - `id` is stable for the project lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    /// Project identifier.
    pub id: ProjectId,
    /// Human-readable project name.
    pub name: String,
    /// Creation timestamp.
    #[serde(rename = "createdAt")]
    pub created_at: Timestamp,
}

/// Project index stored at `<archon_home>/projects/index.json`.
///
/// # Invariants
/// - `active_id`, when set, names a project present in `projects`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProjectIndex {
    /// Registered projects.
    #[serde(default)]
    pub projects: Vec<ProjectRecord>,
    /// Active project id, when one is selected.
    #[serde(default)]
    pub active_id: Option<ProjectId>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Project store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ProjectStoreError {
    /// Underlying I/O failed.
    #[error("project store io error: {0}")]
    Io(String),
    /// Index content failed to parse or serialize.
    #[error("project index error: {0}")]
    Index(String),
    /// Project is not registered in the index.
    #[error("unknown project: {project_id}")]
    UnknownProject {
        /// Unknown project identifier.
        project_id: ProjectId,
    },
}

impl From<std::io::Error> for ProjectStoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// ============================================================================
// SECTION: Project Store
// ============================================================================

/// Store managing project directories under one Archon home.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    /// Archon home directory.
    home: PathBuf,
}

impl ProjectStore {
    /// Creates a store rooted at the given home directory.
    #[must_use]
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
        }
    }

    /// Returns the Archon home directory.
    #[must_use]
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Returns the projects directory.
    fn projects_dir(&self) -> PathBuf {
        self.home.join("projects")
    }

    /// Returns the index path.
    fn index_path(&self) -> PathBuf {
        self.projects_dir().join("index.json")
    }

    /// Returns the directory of one project.
    #[must_use]
    pub fn project_dir(&self, project_id: &ProjectId) -> PathBuf {
        self.projects_dir().join(project_id.as_str())
    }

    /// Loads the index, tolerating an absent file.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectStoreError`] on I/O or parse failure.
    pub fn index(&self) -> Result<ProjectIndex, ProjectStoreError> {
        let path = self.index_path();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ProjectIndex::default());
            }
            Err(err) => return Err(err.into()),
        };
        serde_json::from_str(&raw).map_err(|err| ProjectStoreError::Index(err.to_string()))
    }

    /// Writes the index.
    fn write_index(&self, index: &ProjectIndex) -> Result<(), ProjectStoreError> {
        fs::create_dir_all(self.projects_dir())?;
        let rendered = serde_json::to_string_pretty(index)
            .map_err(|err| ProjectStoreError::Index(err.to_string()))?;
        fs::write(self.index_path(), rendered)?;
        Ok(())
    }

    /// Creates a project: stable id, directory scaffold, default workspace
    /// root, and index entry. The first project created becomes active.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectStoreError`] on I/O failure.
    pub fn create(
        &self,
        name: &str,
        clock: &dyn Clock,
    ) -> Result<ProjectRecord, ProjectStoreError> {
        let record = ProjectRecord {
            id: ProjectId::new(uuid::Uuid::new_v4().to_string()),
            name: name.to_string(),
            created_at: clock.now(),
        };
        let dir = self.project_dir(&record.id);
        fs::create_dir_all(dir.join("state"))?;
        fs::create_dir_all(dir.join("logs"))?;
        let workspace = dir.join("workspace");
        fs::create_dir_all(&workspace)?;

        fs::write(
            dir.join("metadata.json"),
            serde_json::to_string_pretty(&record)
                .map_err(|err| ProjectStoreError::Index(err.to_string()))?,
        )?;

        // Seed the default read-write workspace root.
        let io = self.io_for(&record.id);
        let config = ResourceConfig {
            fs_roots: vec![FsRoot {
                id: WORKSPACE_ROOT_ID.to_string(),
                abs_path: workspace.display().to_string(),
                perm: RootPerm::Rw,
            }],
            net_allowlist: Vec::new(),
            exec_cwd_root_id: None,
            secrets_epoch: 0,
        };
        io.write_json("resource-config", &config)
            .map_err(|err| ProjectStoreError::Io(err.to_string()))?;

        let mut index = self.index()?;
        index.projects.push(record.clone());
        if index.active_id.is_none() {
            index.active_id = Some(record.id.clone());
        }
        self.write_index(&index)?;
        Ok(record)
    }

    /// Lists all registered projects.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectStoreError`] on index failure.
    pub fn list(&self) -> Result<Vec<ProjectRecord>, ProjectStoreError> {
        Ok(self.index()?.projects)
    }

    /// Returns the active project record, when one is selected.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectStoreError`] on index failure.
    pub fn get_active(&self) -> Result<Option<ProjectRecord>, ProjectStoreError> {
        let index = self.index()?;
        Ok(index
            .active_id
            .and_then(|id| index.projects.iter().find(|record| record.id == id).cloned()))
    }

    /// Selects the active project.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectStoreError::UnknownProject`] when the id is not
    /// registered.
    pub fn select(&self, project_id: &ProjectId) -> Result<(), ProjectStoreError> {
        let mut index = self.index()?;
        if !index.projects.iter().any(|record| &record.id == project_id) {
            return Err(ProjectStoreError::UnknownProject {
                project_id: project_id.clone(),
            });
        }
        index.active_id = Some(project_id.clone());
        self.write_index(&index)
    }

    /// Returns a project record by id.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectStoreError::UnknownProject`] when the id is not
    /// registered.
    pub fn get(&self, project_id: &ProjectId) -> Result<ProjectRecord, ProjectStoreError> {
        self.index()?
            .projects
            .into_iter()
            .find(|record| &record.id == project_id)
            .ok_or_else(|| ProjectStoreError::UnknownProject {
                project_id: project_id.clone(),
            })
    }

    /// Returns the file-backed I/O handle for one project.
    #[must_use]
    pub fn io_for(&self, project_id: &ProjectId) -> Arc<dyn StateIo> {
        Arc::new(FileStateIo::new(self.project_dir(project_id)))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

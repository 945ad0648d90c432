//! Lookup service backed by a local workspace snapshot.
//!
//! ```yaml
//! workspaces:
//!   w1:
//!     projects:
//!       - { id: p1, name: Website, tasks: [{ id: t1, name: Design }] }
//!     tags:
//!       - { id: tg1, name: urgent }
//!       - { id: tg2, name: legacy, archived: true }
//! ```

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::{
    page_of, Client, ClientError, GetProjectParams, GetProjectsParams, GetTagsParams,
    GetTasksParams, Project, Tag, Task,
};
use crate::format::{decode, CodecError, Format};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: CodecError,
    },
    #[error("unsupported catalog format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceCatalog {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub workspaces: BTreeMap<String, WorkspaceCatalog>,
}

impl Catalog {
    pub fn load(path: &Path) -> Result<Catalog, CatalogError> {
        let format =
            Format::from_path(path).ok_or_else(|| CatalogError::UnsupportedFormat(path.into()))?;
        let file = File::open(path).map_err(|source| CatalogError::Open {
            path: path.into(),
            source,
        })?;
        decode(file, format).map_err(|source| CatalogError::Decode {
            path: path.into(),
            source,
        })
    }

    fn workspace(&self, id: &str) -> Result<&WorkspaceCatalog, ClientError> {
        self.workspaces
            .get(id)
            .ok_or_else(|| ClientError::WorkspaceNotFound(id.to_string()))
    }

    fn project(&self, workspace: &str, id: &str) -> Result<&Project, ClientError> {
        self.workspace(workspace)?
            .projects
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| ClientError::NotFound {
                kind: "project",
                id: id.to_string(),
            })
    }
}

impl Client for Catalog {
    fn get_project(&self, params: &GetProjectParams) -> Result<Project, ClientError> {
        let mut project = self.project(&params.workspace, &params.project_id)?.clone();
        if !params.hydrate {
            project.tasks.clear();
        }
        Ok(project)
    }

    fn get_projects(&self, params: &GetProjectsParams) -> Result<Vec<Project>, ClientError> {
        let projects: Vec<Project> = self
            .workspace(&params.workspace)?
            .projects
            .iter()
            .filter(|p| params.archived.map_or(true, |archived| p.archived == archived))
            .map(|p| Project {
                tasks: Vec::new(),
                ..p.clone()
            })
            .collect();
        Ok(page_of(&projects, params.pagination))
    }

    fn get_tasks(&self, params: &GetTasksParams) -> Result<Vec<Task>, ClientError> {
        let tasks: Vec<Task> = self
            .project(&params.workspace, &params.project_id)?
            .tasks
            .iter()
            .filter(|t| !params.active_only || t.active)
            .cloned()
            .collect();
        Ok(page_of(&tasks, params.pagination))
    }

    fn get_tags(&self, params: &GetTagsParams) -> Result<Vec<Tag>, ClientError> {
        let tags: Vec<Tag> = self
            .workspace(&params.workspace)?
            .tags
            .iter()
            .filter(|t| params.archived.map_or(true, |archived| t.archived == archived))
            .cloned()
            .collect();
        Ok(page_of(&tags, params.pagination))
    }
}

/// [`Client`] that re-reads its snapshot file on every request.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    path: PathBuf,
}

impl CatalogClient {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn catalog(&self) -> Result<Catalog, ClientError> {
        Ok(Catalog::load(&self.path)?)
    }
}

impl Client for CatalogClient {
    fn get_project(&self, params: &GetProjectParams) -> Result<Project, ClientError> {
        self.catalog()?.get_project(params)
    }

    fn get_projects(&self, params: &GetProjectsParams) -> Result<Vec<Project>, ClientError> {
        self.catalog()?.get_projects(params)
    }

    fn get_tasks(&self, params: &GetTasksParams) -> Result<Vec<Task>, ClientError> {
        self.catalog()?.get_tasks(params)
    }

    fn get_tags(&self, params: &GetTagsParams) -> Result<Vec<Tag>, ClientError> {
        self.catalog()?.get_tags(params)
    }
}

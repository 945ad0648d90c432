//! Interface of the time-tracking lookup service.
//!
//! The reconciler only reads from the service; every call is synchronous and
//! runs to completion before the next one starts.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_PAGE_SIZE: u32 = 50;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{kind} \"{id}\" not found")]
    NotFound { kind: &'static str, id: String },
    #[error("workspace \"{0}\" not found")]
    WorkspaceNotFound(String),
    #[error("remote request failed: {0}")]
    Remote(String),
    #[error("failed to load catalog: {0}")]
    Catalog(#[from] crate::catalog::CatalogError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub archived: bool,
    /// Only populated when the project was requested hydrated.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub archived: bool,
}

fn default_true() -> bool {
    true
}

/// One page of a listing; pages start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    /// Items to skip before this page.
    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize) * self.page_size as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetProjectParams {
    pub workspace: String,
    pub project_id: String,
    /// Include the project's tasks.
    pub hydrate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GetProjectsParams {
    pub workspace: String,
    pub archived: Option<bool>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GetTasksParams {
    pub workspace: String,
    pub project_id: String,
    pub active_only: bool,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GetTagsParams {
    pub workspace: String,
    /// `None` lists archived and active tags alike.
    pub archived: Option<bool>,
    pub pagination: Pagination,
}

pub trait Client {
    fn get_project(&self, params: &GetProjectParams) -> Result<Project, ClientError>;
    fn get_projects(&self, params: &GetProjectsParams) -> Result<Vec<Project>, ClientError>;
    fn get_tasks(&self, params: &GetTasksParams) -> Result<Vec<Task>, ClientError>;
    fn get_tags(&self, params: &GetTagsParams) -> Result<Vec<Tag>, ClientError>;
}

/// Requests successive pages until a short page comes back.
pub fn all_pages<T, F>(page_size: u32, mut fetch: F) -> Result<Vec<T>, ClientError>
where
    F: FnMut(Pagination) -> Result<Vec<T>, ClientError>,
{
    let page_size = page_size.max(1);
    let mut items = Vec::new();
    let mut page = 1;
    loop {
        let batch = fetch(Pagination { page, page_size })?;
        let done = batch.len() < page_size as usize;
        items.extend(batch);
        if done {
            return Ok(items);
        }
        page += 1;
    }
}

pub fn list_all_projects(
    client: &dyn Client,
    workspace: &str,
    archived: Option<bool>,
) -> Result<Vec<Project>, ClientError> {
    all_pages(DEFAULT_PAGE_SIZE, |pagination| {
        client.get_projects(&GetProjectsParams {
            workspace: workspace.to_string(),
            archived,
            pagination,
        })
    })
}

pub fn list_all_tasks(
    client: &dyn Client,
    workspace: &str,
    project_id: &str,
    active_only: bool,
) -> Result<Vec<Task>, ClientError> {
    all_pages(DEFAULT_PAGE_SIZE, |pagination| {
        client.get_tasks(&GetTasksParams {
            workspace: workspace.to_string(),
            project_id: project_id.to_string(),
            active_only,
            pagination,
        })
    })
}

pub fn list_all_tags(
    client: &dyn Client,
    workspace: &str,
    archived: Option<bool>,
) -> Result<Vec<Tag>, ClientError> {
    all_pages(DEFAULT_PAGE_SIZE, |pagination| {
        client.get_tags(&GetTagsParams {
            workspace: workspace.to_string(),
            archived,
            pagination,
        })
    })
}

/// Slices one page out of a full listing.
pub fn page_of<T: Clone>(items: &[T], pagination: Pagination) -> Vec<T> {
    items
        .iter()
        .skip(pagination.offset())
        .take(pagination.page_size as usize)
        .cloned()
        .collect()
}

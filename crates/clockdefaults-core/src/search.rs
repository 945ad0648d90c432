//! Translate user supplied names into ids.
//!
//! A value matches an entity when it is the entity id, or when it equals the
//! entity name ignoring case and surrounding whitespace.

use thiserror::Error;

use crate::api::{list_all_projects, list_all_tags, list_all_tasks, Client, ClientError};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("can't find {kind} with id/name {name}")]
    NotFound { kind: &'static str, name: String },
    #[error(transparent)]
    Client(#[from] ClientError),
}

fn matches(value: &str, id: &str, name: &str) -> bool {
    let value = value.trim();
    value == id || value.to_lowercase() == name.trim().to_lowercase()
}

fn find_id<'a, I>(kind: &'static str, value: &str, candidates: I) -> Result<String, SearchError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    candidates
        .into_iter()
        .find(|(id, name)| matches(value, id, name))
        .map(|(id, _)| id.to_string())
        .ok_or_else(|| SearchError::NotFound {
            kind,
            name: value.to_string(),
        })
}

pub fn project_id_by_name(
    client: &dyn Client,
    workspace: &str,
    name: &str,
) -> Result<String, SearchError> {
    let projects = list_all_projects(client, workspace, Some(false))?;
    find_id(
        "project",
        name,
        projects.iter().map(|p| (p.id.as_str(), p.name.as_str())),
    )
}

/// Looks among the active tasks of `project_id`.
pub fn task_id_by_name(
    client: &dyn Client,
    workspace: &str,
    project_id: &str,
    name: &str,
) -> Result<String, SearchError> {
    let tasks = list_all_tasks(client, workspace, project_id, true)?;
    find_id(
        "task",
        name,
        tasks.iter().map(|t| (t.id.as_str(), t.name.as_str())),
    )
}

/// Resolves every tag, failing on the first one that has no match.
pub fn tag_ids_by_name(
    client: &dyn Client,
    workspace: &str,
    archived: Option<bool>,
    names: &[String],
) -> Result<Vec<String>, SearchError> {
    let tags = list_all_tags(client, workspace, archived)?;
    names
        .iter()
        .map(|name| {
            find_id(
                "tag",
                name,
                tags.iter().map(|t| (t.id.as_str(), t.name.as_str())),
            )
        })
        .collect()
}

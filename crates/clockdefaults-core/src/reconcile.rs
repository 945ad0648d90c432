//! Merge stored defaults with overrides, check them against the lookup
//! service and persist the result.
//!
//! The flow is `read -> merge -> (resolve names | validate ids) -> write`.
//! Nothing is written unless every step before it succeeded.

use thiserror::Error;
use tracing::{debug, warn};

use crate::api::{list_all_tags, Client, ClientError, GetProjectParams};
use crate::config::{Settings, ToolConfig};
use crate::defaults::{DefaultsError, DefaultsStore};
use crate::entry::DefaultTimeEntry;
use crate::search::{project_id_by_name, tag_ids_by_name, task_id_by_name, SearchError};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("the flags --billable and --not-billable can't be used together")]
    ConflictingFlags,
    #[error("can't set task without project")]
    TaskWithoutProject,
    #[error("can't find task with ID \"{task}\" on project \"{project}\"")]
    TaskNotInProject { task: String, project: String },
    #[error("can't find tag with ID \"{0}\"")]
    TagNotFound(String),
    #[error(transparent)]
    Defaults(#[from] DefaultsError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error(transparent)]
    Workspace(anyhow::Error),
    #[error(transparent)]
    Prompt(anyhow::Error),
}

impl ReconcileError {
    /// Caused by the invocation itself rather than by I/O or the service.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ReconcileError::ConflictingFlags
                | ReconcileError::TaskWithoutProject
                | ReconcileError::TaskNotInProject { .. }
                | ReconcileError::TagNotFound(_)
        )
    }
}

/// Supplies the workspace the defaults belong to.
pub trait WorkspaceSource {
    fn workspace_id(&self) -> anyhow::Result<String>;
}

impl WorkspaceSource for ToolConfig {
    fn workspace_id(&self) -> anyhow::Result<String> {
        Ok(ToolConfig::workspace_id(self)?)
    }
}

/// Lets the user fix up the entry after name resolution when running
/// interactively.
pub trait Prompt {
    fn ask(
        &self,
        entry: DefaultTimeEntry,
        client: &dyn Client,
        settings: &Settings,
    ) -> anyhow::Result<DefaultTimeEntry>;
}

/// Prompt that accepts the entry as it is.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl Prompt for Passthrough {
    fn ask(
        &self,
        entry: DefaultTimeEntry,
        _client: &dyn Client,
        _settings: &Settings,
    ) -> anyhow::Result<DefaultTimeEntry> {
        Ok(entry)
    }
}

/// Explicitly requested field values. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub project: Option<String>,
    pub task: Option<String>,
    pub tags: Option<Vec<String>>,
    pub description: Option<String>,
    pub billable: Option<bool>,
}

impl Overrides {
    pub fn with_billable_flags(
        mut self,
        billable: bool,
        not_billable: bool,
    ) -> Result<Self, ReconcileError> {
        self.billable = billable_override(billable, not_billable)?;
        Ok(self)
    }

    /// Returns the merged entry and whether any field was overridden.
    pub fn apply(&self, mut entry: DefaultTimeEntry) -> (DefaultTimeEntry, bool) {
        let mut changed = false;
        if let Some(project) = &self.project {
            entry.project_id = project.clone();
            changed = true;
        }
        if let Some(task) = &self.task {
            entry.task_id = task.clone();
            changed = true;
        }
        if let Some(tags) = &self.tags {
            entry.set_tags(tags.iter().cloned());
            changed = true;
        }
        if let Some(description) = &self.description {
            entry.description = description.clone();
            changed = true;
        }
        if let Some(billable) = self.billable {
            entry.billable = Some(billable);
            changed = true;
        }
        (entry, changed)
    }
}

/// Maps the billable/not-billable flag pair onto the tri-state field.
pub fn billable_override(billable: bool, not_billable: bool) -> Result<Option<bool>, ReconcileError> {
    match (billable, not_billable) {
        (true, true) => Err(ReconcileError::ConflictingFlags),
        (true, false) => Ok(Some(true)),
        (false, true) => Ok(Some(false)),
        (false, false) => Ok(None),
    }
}

pub struct Reconciler<'a> {
    pub store: &'a dyn DefaultsStore,
    pub workspace: &'a dyn WorkspaceSource,
    pub client: &'a dyn Client,
    pub prompt: &'a dyn Prompt,
    pub settings: Settings,
}

impl<'a> Reconciler<'a> {
    /// Applies `overrides` to the stored defaults and writes the result.
    pub fn set(&self, overrides: &Overrides) -> Result<DefaultTimeEntry, ReconcileError> {
        let current = match self.store.read() {
            Ok(entry) => entry,
            Err(err) if err.is_not_found() => DefaultTimeEntry::default(),
            Err(err) => return Err(err.into()),
        };

        let (mut next, changed) = overrides.apply(current.clone());
        next.workspace = self
            .workspace
            .workspace_id()
            .map_err(ReconcileError::Workspace)?;

        if changed || next.workspace != current.workspace {
            next = self.reconcile(next)?;
        } else {
            debug!("defaults unchanged, skipping lookups");
        }

        self.store.write(&next)?;
        Ok(next)
    }

    fn reconcile(&self, mut entry: DefaultTimeEntry) -> Result<DefaultTimeEntry, ReconcileError> {
        if entry.has_task_without_project() {
            return Err(ReconcileError::TaskWithoutProject);
        }

        if self.settings.is_allow_name_for_id() {
            entry = update_ids_by_names(self.client, entry, &self.settings)?;
        }

        if self.settings.is_interactive() {
            entry = self
                .prompt
                .ask(entry, self.client, &self.settings)
                .map_err(ReconcileError::Prompt)?;
        }

        if !self.settings.is_allow_name_for_id() {
            check_ids(self.client, &entry)?;
        }
        Ok(entry)
    }
}

/// Replaces project, task and tag names with their ids.
///
/// Lookup failures abort unless the settings are interactive. Then a missing
/// project clears project and task, and a missing task or tag keeps the value
/// that was given.
pub fn update_ids_by_names(
    client: &dyn Client,
    mut entry: DefaultTimeEntry,
    settings: &Settings,
) -> Result<DefaultTimeEntry, ReconcileError> {
    if !entry.project_id.is_empty() {
        match project_id_by_name(client, &entry.workspace, &entry.project_id) {
            Ok(id) => entry.project_id = id,
            Err(err) => {
                entry.project_id.clear();
                entry.task_id.clear();
                tolerate(err, settings)?;
            }
        }
    }

    if !entry.task_id.is_empty() {
        match task_id_by_name(client, &entry.workspace, &entry.project_id, &entry.task_id) {
            Ok(id) => entry.task_id = id,
            Err(err) => tolerate(err, settings)?,
        }
    }

    if !entry.tag_ids.is_empty() {
        let archived = if settings.is_allow_archived_tags() {
            None
        } else {
            Some(false)
        };
        match tag_ids_by_name(client, &entry.workspace, archived, &entry.tag_ids) {
            Ok(ids) => entry.set_tags(ids),
            Err(err) => tolerate(err, settings)?,
        }
    }

    Ok(entry)
}

fn tolerate(err: SearchError, settings: &Settings) -> Result<(), ReconcileError> {
    if !settings.is_interactive() {
        return Err(err.into());
    }
    warn!(error = %err, "name lookup failed, leaving it to the prompt");
    Ok(())
}

/// Confirms the raw ids exist: the project, the task inside that project and
/// every tag among the workspace's active tags.
pub fn check_ids(client: &dyn Client, entry: &DefaultTimeEntry) -> Result<(), ReconcileError> {
    if !entry.project_id.is_empty() {
        let project = client.get_project(&GetProjectParams {
            workspace: entry.workspace.clone(),
            project_id: entry.project_id.clone(),
            hydrate: !entry.task_id.is_empty(),
        })?;

        if !entry.task_id.is_empty() && !project.tasks.iter().any(|t| t.id == entry.task_id) {
            return Err(ReconcileError::TaskNotInProject {
                task: entry.task_id.clone(),
                project: entry.project_id.clone(),
            });
        }
    } else if !entry.task_id.is_empty() {
        return Err(ReconcileError::TaskWithoutProject);
    }

    if entry.tag_ids.is_empty() {
        return Ok(());
    }

    let tags = list_all_tags(client, &entry.workspace, Some(false))?;
    if let Some(missing) = entry
        .tag_ids
        .iter()
        .find(|id| !tags.iter().any(|tag| &tag.id == *id))
    {
        return Err(ReconcileError::TagNotFound(missing.clone()));
    }
    Ok(())
}

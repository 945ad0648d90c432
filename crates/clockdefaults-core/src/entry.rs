use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Default properties for new time entries created under a directory.
///
/// Empty strings mean "unset". `billable` keeps "not set" apart from `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultTimeEntry {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub workspace: String,
    #[serde(rename = "project", default, skip_serializing_if = "String::is_empty")]
    pub project_id: String,
    #[serde(rename = "task", default, skip_serializing_if = "String::is_empty")]
    pub task_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billable: Option<bool>,
    #[serde(rename = "tags", default, skip_serializing_if = "Vec::is_empty")]
    pub tag_ids: Vec<String>,
}

impl DefaultTimeEntry {
    /// Replaces the tags, dropping repeated ids but keeping first-seen order.
    pub fn set_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tag_ids = unique(tags.into_iter().map(Into::into));
    }

    /// A task is only meaningful inside a project.
    pub fn has_task_without_project(&self) -> bool {
        !self.task_id.is_empty() && self.project_id.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        *self == DefaultTimeEntry::default()
    }
}

pub(crate) fn unique(values: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|value| seen.insert(value.clone()))
        .collect()
}

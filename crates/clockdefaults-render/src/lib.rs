//! Reporting of resolved defaults.

use std::io::Write;
use std::str::FromStr;

use clockdefaults_core::entry::DefaultTimeEntry;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Unsupported report format: {0}")]
    UnsupportedFormat(String),
    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to render YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

impl FromStr for ReportFormat {
    type Err = RenderError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "text" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            "yaml" | "yml" => Ok(ReportFormat::Yaml),
            other => Err(RenderError::UnsupportedFormat(other.to_string())),
        }
    }
}

pub fn report<W: Write>(
    format: ReportFormat,
    mut out: W,
    entry: &DefaultTimeEntry,
) -> Result<(), RenderError> {
    match format {
        ReportFormat::Text => out.write_all(render_text(entry).as_bytes())?,
        ReportFormat::Json => {
            serde_json::to_writer_pretty(&mut out, entry)?;
            out.write_all(b"\n")?;
        }
        ReportFormat::Yaml => serde_yaml::to_writer(&mut out, entry)?,
    }
    out.flush()?;
    Ok(())
}

/// One `key: value` line per field that is set.
pub fn render_text(entry: &DefaultTimeEntry) -> String {
    let mut lines = Vec::new();
    let fields = [
        ("workspace", entry.workspace.as_str()),
        ("project", entry.project_id.as_str()),
        ("task", entry.task_id.as_str()),
        ("description", entry.description.as_str()),
    ];
    for (key, value) in fields {
        if !value.is_empty() {
            lines.push(format!("{key}: {value}"));
        }
    }
    if let Some(billable) = entry.billable {
        lines.push(format!("billable: {billable}"));
    }
    if !entry.tag_ids.is_empty() {
        lines.push(format!("tags: {}", entry.tag_ids.join(", ")));
    }
    if lines.is_empty() {
        return "no defaults set\n".to_string();
    }
    lines.join("\n") + "\n"
}

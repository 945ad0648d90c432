use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported defaults file format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
}

/// On-disk representation, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

const EXTENSIONS: [(&str, Format); 3] = [
    ("json", Format::Json),
    ("yml", Format::Yaml),
    ("yaml", Format::Yaml),
];

impl Format {
    pub fn from_extension(ext: &str) -> Option<Format> {
        EXTENSIONS
            .iter()
            .find(|(candidate, _)| *candidate == ext)
            .map(|(_, format)| *format)
    }

    pub fn from_path(path: &Path) -> Option<Format> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Format::from_extension)
    }

    pub fn extension(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Yaml => "yaml",
        }
    }
}

pub fn encode<T, W>(value: &T, mut writer: W, format: Format) -> Result<(), CodecError>
where
    T: Serialize,
    W: Write,
{
    match format {
        Format::Json => {
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.write_all(b"\n")?;
        }
        Format::Yaml => serde_yaml::to_writer(&mut writer, value)?,
    }
    writer.flush()?;
    Ok(())
}

/// Decodes a value; a blank document decodes to `T::default()`.
pub fn decode<T, R>(mut reader: R, format: Format) -> Result<T, CodecError>
where
    T: DeserializeOwned + Default,
    R: Read,
{
    let mut raw = String::new();
    reader.read_to_string(&mut raw)?;
    if raw.trim().is_empty() {
        return Ok(T::default());
    }
    let value = match format {
        Format::Json => serde_json::from_str(&raw)?,
        Format::Yaml => serde_yaml::from_str(&raw)?,
    };
    Ok(value)
}

use std::fs::{self, File, OpenOptions};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use glob::Pattern;
use thiserror::Error;
use tracing::{debug, info};

use crate::entry::DefaultTimeEntry;
use crate::format::{decode, encode, CodecError, Format};

/// Base name used when a scan does not name its own file.
pub const DEFAULT_FILENAME: &str = ".clockify-defaults";

/// Where to start looking for a defaults file, and under which base name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanParam {
    pub dir: PathBuf,
    /// Base name without extension; empty means [`DEFAULT_FILENAME`].
    pub filename: String,
}

impl ScanParam {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            filename: String::new(),
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    pub fn filename(&self) -> &str {
        if self.filename.trim().is_empty() {
            DEFAULT_FILENAME
        } else {
            self.filename.as_str()
        }
    }
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to open defaults file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode defaults file {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: CodecError,
    },
}

#[derive(Debug, Error)]
pub enum DefaultsError {
    /// No ancestor directory holds a defaults file.
    #[error("defaults file not found")]
    NotFound,
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("failed to write defaults file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: CodecError,
    },
    #[error("unsupported defaults file format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
}

impl DefaultsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DefaultsError::NotFound)
    }
}

/// An opened defaults file candidate.
#[derive(Debug)]
pub struct FoundFile {
    pub path: PathBuf,
    pub format: Format,
    pub file: File,
}

/// Looks for `<filename>.{json,yml,yaml}` directly inside `dir`.
///
/// Candidates that cannot be stat'ed or are directories are skipped. A
/// candidate that exists but cannot be opened is an error.
pub fn find_file(dir: &Path, filename: &str) -> Result<Option<FoundFile>, ScanError> {
    let pattern = format!(
        "{}.*",
        Pattern::escape(&dir.join(filename).to_string_lossy())
    );
    let Ok(matches) = glob::glob(&pattern) else {
        return Ok(None);
    };

    for path in matches.flatten() {
        let Some(format) = Format::from_path(&path) else {
            debug!(path = %path.display(), "skipping unsupported extension");
            continue;
        };
        match fs::metadata(&path) {
            Ok(meta) if !meta.is_dir() => {}
            _ => {
                debug!(path = %path.display(), "skipping candidate that is not a file");
                continue;
            }
        }
        let file = File::open(&path).map_err(|source| ScanError::Open {
            path: path.clone(),
            source,
        })?;
        return Ok(Some(FoundFile { path, format, file }));
    }
    Ok(None)
}

/// Searches `param.dir` and then each parent for a defaults file and decodes
/// the first one found.
pub fn scan_for_defaults(param: &ScanParam) -> Result<DefaultTimeEntry, DefaultsError> {
    locate_and_decode(param).map(|(entry, _)| entry)
}

pub(crate) fn locate_and_decode(
    param: &ScanParam,
) -> Result<(DefaultTimeEntry, PathBuf), DefaultsError> {
    let filename = param.filename();
    let mut dir = absolute(&param.dir);
    loop {
        debug!(dir = %dir.display(), filename, "looking for defaults file");
        if let Some(found) = find_file(&dir, filename)? {
            let entry = decode(found.file, found.format).map_err(|source| ScanError::Decode {
                path: found.path.clone(),
                source,
            })?;
            return Ok((entry, found.path));
        }

        let parent = match dir.parent() {
            Some(parent) if parent != dir => parent.to_path_buf(),
            _ => return Err(DefaultsError::NotFound),
        };
        dir = parent;
    }
}

fn absolute(dir: &Path) -> PathBuf {
    if dir.is_absolute() {
        return dir.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(dir),
        Err(_) => dir.to_path_buf(),
    }
}

/// Writes `entry` to `dir/filename`, replacing any previous content. The
/// extension of `filename` selects the format.
pub fn write_defaults(
    dir: &Path,
    filename: &str,
    entry: &DefaultTimeEntry,
) -> Result<PathBuf, DefaultsError> {
    let path = dir.join(filename);
    let format =
        Format::from_path(&path).ok_or_else(|| DefaultsError::UnsupportedFormat(path.clone()))?;

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)
        .map_err(|err| DefaultsError::Write {
            path: path.clone(),
            source: err.into(),
        })?;
    encode(entry, BufWriter::new(file), format).map_err(|source| DefaultsError::Write {
        path: path.clone(),
        source,
    })?;

    info!(path = %path.display(), "wrote defaults file");
    Ok(path)
}

/// Reads and persists the defaults of one directory tree.
pub trait DefaultsStore {
    /// Upward search from the configured directory.
    fn read(&self) -> Result<DefaultTimeEntry, DefaultsError>;
    /// Persists into the configured directory itself; never searches.
    fn write(&self, entry: &DefaultTimeEntry) -> Result<PathBuf, DefaultsError>;
}

/// [`DefaultsStore`] over a starting directory and base filename.
#[derive(Debug, Clone)]
pub struct DirectoryDefaults {
    scan: ScanParam,
    format: Format,
}

impl DirectoryDefaults {
    pub fn new(scan: ScanParam) -> Self {
        Self {
            scan,
            format: Format::Yaml,
        }
    }

    /// Format for newly created files. An existing file in the directory
    /// keeps its own format.
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn scan_param(&self) -> &ScanParam {
        &self.scan
    }

    fn target_filename(&self) -> Result<String, DefaultsError> {
        let base = self.scan.filename();
        if let Some(found) = find_file(&self.scan.dir, base)? {
            if let Some(name) = found.path.file_name() {
                return Ok(name.to_string_lossy().into_owned());
            }
        }
        Ok(format!("{}.{}", base, self.format.extension()))
    }
}

impl DefaultsStore for DirectoryDefaults {
    fn read(&self) -> Result<DefaultTimeEntry, DefaultsError> {
        let (entry, path) = locate_and_decode(&self.scan)?;
        debug!(path = %path.display(), "loaded defaults");
        Ok(entry)
    }

    fn write(&self, entry: &DefaultTimeEntry) -> Result<PathBuf, DefaultsError> {
        let filename = self.target_filename()?;
        write_defaults(&self.scan.dir, &filename, entry)
    }
}

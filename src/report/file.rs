//! Offline report emitter
//!
//! Writes each submission as a JSON file instead of sending it, for benches
//! without network access or for dry runs.

use chrono::Utc;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use super::emitter::{Receipt, ReportEmitter, ReportingError};
use super::submission::RunSubmission;

/// Writes submissions to `<dir>/<procedure_id>/<serial>_<timestamp>.json`
#[derive(Clone, Debug)]
pub struct FileEmitter {
    dir: PathBuf,
}

impl FileEmitter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a submission and return the file path
    pub fn write(&self, submission: &RunSubmission) -> Result<PathBuf, ReportingError> {
        let procedure_dir = self.dir.join(sanitize(&submission.procedure_id));
        fs::create_dir_all(&procedure_dir).map_err(|source| ReportingError::Io {
            path: procedure_dir.clone(),
            source,
        })?;

        let path = unique_path(&procedure_dir, &submission_stem(submission));
        let file = File::create(&path).map_err(|source| ReportingError::Io {
            path: path.clone(),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, submission)?;
        writer.flush().map_err(|source| ReportingError::Io {
            path: path.clone(),
            source,
        })?;

        Ok(path)
    }
}

impl ReportEmitter for FileEmitter {
    fn emit(&self, submission: &RunSubmission) -> Result<Receipt, ReportingError> {
        let path = self.write(submission)?;
        info!("Wrote run report to {}", path.display());

        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(Receipt {
            id,
            url: Some(path.display().to_string()),
        })
    }
}

/// `<serial>_<UTC timestamp>` for a submission file
pub(crate) fn submission_stem(submission: &RunSubmission) -> String {
    format!(
        "{}_{}",
        sanitize(submission.serial_number()),
        Utc::now().format("%Y%m%d_%H%M%S_%3f")
    )
}

/// First free `<stem>[_n].json` in a directory
pub(crate) fn unique_path(dir: &Path, stem: &str) -> PathBuf {
    let mut path = dir.join(format!("{stem}.json"));
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("{stem}_{n}.json"));
        n += 1;
    }
    path
}

/// Keep names safe for use as file names
pub(crate) fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

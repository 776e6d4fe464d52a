//! Reporting outbox
//!
//! Submissions that could not be delivered are kept as JSON files under
//! `<base>/<procedure_id>/<serial>_<timestamp>.json` until a later flush
//! delivers them.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::report::{
    iso_duration, sanitize, submission_stem, unique_path, ReportEmitter, RunSubmission,
};

/// One stored submission
#[derive(Clone, Debug)]
pub struct OutboxEntry {
    pub path: PathBuf,
    pub submission: RunSubmission,
}

/// Outcome of a flush
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Directory-backed store of undelivered submissions
pub struct Outbox {
    base_dir: PathBuf,
}

impl Outbox {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Outbox under the user data directory
    pub fn default_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fixture-runner")
            .join("outbox")
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Store a submission and return its file
    pub fn store(&self, submission: &RunSubmission) -> Result<PathBuf> {
        let dir = self.base_dir.join(sanitize(&submission.procedure_id));
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create outbox directory {}", dir.display()))?;

        let path = unique_path(&dir, &submission_stem(submission));
        let file = File::create(&path).context("Failed to create outbox file")?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, submission)
            .context("Failed to write outbox file")?;
        writer
            .flush()
            .with_context(|| format!("Failed to write outbox file {}", path.display()))?;

        info!(
            "Queued run for {} in outbox: {}",
            submission.serial_number(),
            path.display()
        );
        Ok(path)
    }

    /// Load a stored submission
    pub fn load_from_path(&self, path: &Path) -> Result<RunSubmission> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open outbox file {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse outbox file {}", path.display()))
    }

    /// Every stored submission, oldest file name first; unreadable files are skipped
    pub fn list(&self) -> Result<Vec<OutboxEntry>> {
        if !self.base_dir.exists() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            for file in fs::read_dir(entry.path())? {
                let path = file?.path();
                if path.extension().map(|e| e == "json").unwrap_or(false) {
                    paths.push(path);
                }
            }
        }
        paths.sort();

        let mut entries = Vec::with_capacity(paths.len());
        for path in paths {
            match self.load_from_path(&path) {
                Ok(submission) => entries.push(OutboxEntry { path, submission }),
                Err(e) => warn!("Skipping unreadable outbox file {}: {:#}", path.display(), e),
            }
        }
        Ok(entries)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.list()?.len())
    }

    /// Re-emit every stored submission; delivered ones are removed
    pub fn flush<E: ReportEmitter>(&self, emitter: &E) -> Result<FlushReport> {
        let mut report = FlushReport::default();

        for entry in self.list()? {
            match emitter.emit(&entry.submission) {
                Ok(receipt) => {
                    fs::remove_file(&entry.path).with_context(|| {
                        format!("Failed to remove delivered {}", entry.path.display())
                    })?;
                    info!(
                        "Delivered {} as {}",
                        entry.submission.serial_number(),
                        receipt.id
                    );
                    report.delivered += 1;
                }
                Err(e) => {
                    warn!("Still undeliverable {}: {}", entry.path.display(), e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Write every stored submission to a file; format from the extension
    pub fn export(&self, path: &Path) -> Result<usize> {
        let entries = self.list()?;
        let format = ExportFormat::from_extension(path).unwrap_or(ExportFormat::Csv);

        match format {
            ExportFormat::Json => {
                let submissions: Vec<_> = entries.iter().map(|e| &e.submission).collect();
                let file = File::create(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                let mut writer = BufWriter::new(file);
                serde_json::to_writer_pretty(&mut writer, &submissions)?;
                writer
                    .flush()
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
            ExportFormat::Csv => {
                let mut writer = csv::Writer::from_path(path)?;

                writer.write_record([
                    "procedure_id",
                    "serial_number",
                    "part_number",
                    "revision",
                    "run_passed",
                    "step",
                    "step_passed",
                    "started_at",
                    "duration",
                    "value",
                    "unit",
                    "limit_low",
                    "limit_high",
                ])?;

                for entry in &entries {
                    let run = &entry.submission;
                    for step in &run.steps {
                        writer.write_record([
                            run.procedure_id.clone(),
                            run.unit_under_test.serial_number.clone(),
                            run.unit_under_test.part_number.clone(),
                            run.unit_under_test.revision.clone(),
                            run.run_passed.to_string(),
                            step.name.clone(),
                            step.step_passed.to_string(),
                            step.started_at.to_rfc3339(),
                            iso_duration::format(&step.duration),
                            step.measurement_value
                                .as_ref()
                                .map(|v| v.to_string())
                                .unwrap_or_default(),
                            step.measurement_unit.clone().unwrap_or_default(),
                            step.limit_low.map(|l| l.to_string()).unwrap_or_default(),
                            step.limit_high.map(|l| l.to_string()).unwrap_or_default(),
                        ])?;
                    }
                }
                writer.flush()?;
            }
        }

        info!("Exported {} outbox run(s) to {}", entries.len(), path.display());
        Ok(entries.len())
    }
}

/// Export format
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(ExportFormat::Json),
            "csv" => Some(ExportFormat::Csv),
            _ => None,
        }
    }

    pub fn from_extension(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_str)
    }
}

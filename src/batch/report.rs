// Batch report types and their console rendering

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::analysis::{ClipMeasurement, WorstError};

/// Result of checking one clip file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub name: String,
    pub path: PathBuf,
    #[serde(flatten)]
    pub measurement: ClipMeasurement,
}

impl FileReport {
    pub fn new(path: &Path, measurement: ClipMeasurement) -> Self {
        Self {
            name: file_name(path),
            path: path.to_path_buf(),
            measurement,
        }
    }

    pub fn passed(&self) -> bool {
        self.measurement.verdict.passed
    }

    /// One console line: status, name, both gaps and the larger error
    pub fn format_line(&self) -> String {
        let verdict = &self.measurement.verdict;
        let expected = &self.measurement.expected;
        let status = if verdict.passed { "OK " } else { "ERR" };
        format!(
            "{} {:>18}  Δ12 {:6.1}ms (exp {:4})  Δ23 {:6.1}ms (exp {:4})  err {:4.1}ms",
            status,
            self.name,
            verdict.measured_gap1,
            expected.first_gap_ms,
            verdict.measured_gap2,
            expected.second_gap_ms,
            verdict.worst_error()
        )
    }
}

/// A file left out because its name carries no clip spec
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedFile {
    pub name: String,
    pub path: PathBuf,
    pub reason: String,
}

/// Every file checked in one directory
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectoryReport {
    pub dir: PathBuf,
    pub files: Vec<FileReport>,
    pub skipped: Vec<SkippedFile>,
    pub worst_error: WorstError,
}

impl DirectoryReport {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            files: Vec::new(),
            skipped: Vec::new(),
            worst_error: WorstError::new(),
        }
    }

    pub fn push(&mut self, report: FileReport) {
        self.worst_error.fold(&report.measurement.verdict);
        self.files.push(report);
    }

    pub fn failures(&self) -> usize {
        self.files.iter().filter(|file| !file.passed()).count()
    }

    pub fn worst_error_line(&self) -> String {
        format_worst_error(self.worst_error)
    }
}

/// What happened to one clip directory
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DirectoryOutcome {
    /// Directory does not exist; nothing is printed for it
    Missing { dir: PathBuf },
    /// Directory exists but holds no `.wav` files
    Empty { dir: PathBuf },
    Checked(DirectoryReport),
}

impl DirectoryOutcome {
    pub fn report(&self) -> Option<&DirectoryReport> {
        match self {
            DirectoryOutcome::Checked(report) => Some(report),
            _ => None,
        }
    }
}

/// Aggregate over every directory of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub directories: Vec<DirectoryOutcome>,
    pub worst_error: WorstError,
    pub files_checked: usize,
    pub failures: usize,
    pub skipped: usize,
}

impl RunSummary {
    pub fn push(&mut self, outcome: DirectoryOutcome) {
        if let Some(report) = outcome.report() {
            self.worst_error = self.worst_error.merge(report.worst_error);
            self.files_checked += report.files.len();
            self.failures += report.failures();
            self.skipped += report.skipped.len();
        }
        self.directories.push(outcome);
    }

    /// True when no checked file violated the tolerance
    pub fn all_passed(&self) -> bool {
        self.failures == 0
    }
}

pub fn format_worst_error(worst: WorstError) -> String {
    format!("Worst absolute error: {:.1} ms", worst.value_ms())
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

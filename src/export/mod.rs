//! Report export
//!
//! Serializes a ledger snapshot as a CSV table and as a paginated PDF
//! document. Both serializations are pure functions of the snapshot and the
//! options, so repeated exports of an unchanged snapshot are byte-identical.
//! Writing the artifacts to disk is the only fallible part, and its errors
//! are returned to the caller.

mod csv;
mod pdf;

use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime};
use log::info;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{EmotiveError, Result};
use crate::state::LedgerSnapshot;

pub use self::csv::{to_csv, CSV_HEADER};
pub use self::pdf::{render_document, DocumentLayout};

/// File name of the CSV artifact
pub const CSV_FILE_NAME: &str = "session_emotions.csv";

/// File name of the document artifact
pub const DOCUMENT_FILE_NAME: &str = "session_report.pdf";

/// Export options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Document title
    pub title: String,
    /// `strftime` pattern for observation times
    pub time_format: String,
    /// Number of most recent observations tabulated in the document
    pub tail_rows: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            title: "Emotion Session Report".to_string(),
            time_format: "%H:%M:%S".to_string(),
            tail_rows: 20,
        }
    }
}

impl ExportOptions {
    /// Reject time formats chrono cannot render
    ///
    /// A pattern can parse and still fail at render time (`%z` needs an
    /// offset a naive timestamp does not have), so a sample is rendered too.
    pub fn validate(&self) -> Result<()> {
        let renders = NaiveDate::from_ymd_opt(2000, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .and_then(|sample| format_time(&sample, &self.time_format))
            .is_some();
        if self.time_format.is_empty()
            || StrftimeItems::new(&self.time_format).any(|item| matches!(item, Item::Error))
            || !renders
        {
            return Err(EmotiveError::config(
                "export.time_format",
                format!("'{}' is not a valid strftime pattern", self.time_format),
            ));
        }
        if self.tail_rows == 0 {
            return Err(EmotiveError::config(
                "export.tail_rows",
                "the document must list at least one row",
            ));
        }
        Ok(())
    }
}

/// Render `ts` with a strftime pattern, `None` if chrono cannot
pub fn format_time(ts: &NaiveDateTime, pattern: &str) -> Option<String> {
    let mut out = String::new();
    write!(out, "{}", ts.format(pattern)).ok()?;
    Some(out)
}

/// Rendered time of one observation, in `pattern` or the default layout
fn row_time(ts: &NaiveDateTime, pattern: &str) -> String {
    format_time(ts, pattern).unwrap_or_else(|| ts.format("%H:%M:%S").to_string())
}

/// One artifact written to disk
#[derive(Debug, Clone, Serialize)]
pub struct ExportArtifact {
    pub path: PathBuf,
    pub bytes: usize,
    /// Hex SHA-256 of the file contents
    pub sha256: String,
}

/// Both artifacts of one export
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub csv: ExportArtifact,
    pub document: ExportArtifact,
    pub observations: usize,
}

/// Serializes snapshots to CSV and PDF
#[derive(Debug, Clone)]
pub struct ReportExporter {
    options: ExportOptions,
}

impl ReportExporter {
    /// # Errors
    /// `InvalidConfig` if the options do not validate.
    pub fn new(options: ExportOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// CSV text of the whole snapshot
    pub fn csv(&self, snapshot: &LedgerSnapshot) -> String {
        to_csv(snapshot, &self.options.time_format)
    }

    /// PDF bytes: total count of the whole snapshot, table of its tail
    pub fn document(&self, snapshot: &LedgerSnapshot, generated_at: NaiveDateTime) -> Vec<u8> {
        render_document(&DocumentLayout {
            title: &self.options.title,
            generated_at,
            total: snapshot.len(),
            rows: snapshot.tail(self.options.tail_rows),
            time_format: &self.options.time_format,
        })
    }

    /// Write both artifacts into `dir`, creating it if needed
    ///
    /// # Errors
    /// `ExportDirectory` if the directory cannot be created,
    /// `ExportWrite` if either file cannot be written.
    pub fn export_to_dir(
        &self,
        snapshot: &LedgerSnapshot,
        dir: &Path,
        generated_at: NaiveDateTime,
    ) -> Result<ExportReport> {
        fs::create_dir_all(dir).map_err(|e| EmotiveError::ExportDirectory {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let csv = write_artifact(&dir.join(CSV_FILE_NAME), self.csv(snapshot).as_bytes())?;
        let document = write_artifact(
            &dir.join(DOCUMENT_FILE_NAME),
            &self.document(snapshot, generated_at),
        )?;

        info!(
            "[EXPORT] {} observations -> {}, {}",
            snapshot.len(),
            csv.path.display(),
            document.path.display()
        );

        Ok(ExportReport {
            csv,
            document,
            observations: snapshot.len(),
        })
    }
}

fn write_artifact(path: &Path, contents: &[u8]) -> Result<ExportArtifact> {
    fs::write(path, contents).map_err(|e| EmotiveError::ExportWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(ExportArtifact {
        path: path.to_path_buf(),
        bytes: contents.len(),
        sha256: checksum(contents),
    })
}

/// Hex-encoded SHA-256 digest
pub fn checksum(contents: &[u8]) -> String {
    let digest = Sha256::digest(contents);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

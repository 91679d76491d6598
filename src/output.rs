use chrono::{DateTime, Utc};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::OutputError;
use crate::logging::LogContext;
use crate::models::{DetectedTransaction, SignificantTransaction};

#[derive(Debug, PartialEq)]
pub enum WriteOutcome {
    /// The document was replaced with this many records
    Written { path: PathBuf, records: usize },
    /// Empty batch, the existing file (if any) was left alone
    NothingToWrite,
}

/// Writes a batch of significant transactions as one pretty-printed JSON array
pub struct OutputWriter {
    path: PathBuf,
}

impl OutputWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_batch(&self, detected: Vec<DetectedTransaction>) -> Result<WriteOutcome, OutputError> {
        self.write_batch_at(detected, Utc::now())
    }

    /// Every record in the batch is stamped with the same `timestamp`
    pub fn write_batch_at(
        &self,
        detected: Vec<DetectedTransaction>,
        timestamp: DateTime<Utc>,
    ) -> Result<WriteOutcome, OutputError> {
        let context = LogContext::new("output", "write_batch")
            .with_metadata("path", json!(self.path.display().to_string()));

        if detected.is_empty() {
            context.info("No significant transactions found, nothing written");
            return Ok(WriteOutcome::NothingToWrite);
        }

        let records: Vec<SignificantTransaction> = detected
            .into_iter()
            .map(|tx| tx.into_record(timestamp))
            .collect();
        let document = serde_json::to_string_pretty(&records)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // Readers never observe a half-written document
        let staging = self.staging_path();
        fs::write(&staging, document)?;
        if let Err(e) = fs::rename(&staging, &self.path) {
            let _ = fs::remove_file(&staging);
            return Err(e.into());
        }

        context
            .with_metadata("records", json!(records.len()))
            .info(&format!("Wrote {} significant transactions to {}", records.len(), self.path.display()));

        Ok(WriteOutcome::Written {
            path: self.path.clone(),
            records: records.len(),
        })
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

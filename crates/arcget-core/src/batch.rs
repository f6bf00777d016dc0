//! Per-record batch orchestration: skip, download, or re-download each
//! manifest entry, continuing past individual failures.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::checksum::{self, ChecksumAlgo};
use crate::downloader::{self, TransferOptions};
use crate::manifest::{self, ExpectedChecksum, FileEntry};
use crate::paths;
use crate::progress::ProgressSink;

/// Outcome of one manifest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    /// Final file already present with a matching digest; no request issued.
    Skipped,
    /// Downloaded (possibly resumed) and verified.
    Downloaded,
    /// Attempt failed; the batch continued.
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub filename: String,
    pub status: FileStatus,
}

/// Aggregated result of one record run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Skipped))
    }

    pub fn downloaded(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Downloaded))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&FileStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

/// Options for one record run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Record-files API base; the manifest lives at `<api_base>/<id>/files`.
    pub api_base: String,
    /// Algorithm assumed for bare manifest digests.
    pub default_algo: ChecksumAlgo,
    pub transfer: TransferOptions,
}

/// Download every file of `record_id` into `root/<record_id>/`.
///
/// A manifest fetch or parse failure is fatal. Per-file failures are recorded
/// in the report and the batch moves on to the next entry.
pub fn run_record(
    record_id: &str,
    root: &Path,
    opts: &BatchOptions,
    progress: &dyn ProgressSink,
) -> Result<BatchReport> {
    let record_dir = root.join(record_id);
    fs::create_dir_all(&record_dir)
        .with_context(|| format!("create record directory {}", record_dir.display()))?;

    let entries =
        manifest::fetch_manifest(&opts.api_base, record_id, opts.transfer.connect_timeout)
            .with_context(|| format!("fetch manifest for record {}", record_id))?;
    tracing::info!(record = record_id, files = entries.len(), "manifest fetched");

    let mut outcomes = Vec::with_capacity(entries.len());
    for entry in &entries {
        progress.file_started(&entry.filename);
        let status = match process_entry(entry, &record_dir, opts, progress) {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(file = %entry.filename, "entry failed: {:#}", e);
                FileStatus::Failed(format!("{:#}", e))
            }
        };
        progress.file_done(&entry.filename, &status_line(&status));
        outcomes.push(FileOutcome {
            filename: entry.filename.clone(),
            status,
        });
    }

    Ok(BatchReport { outcomes })
}

fn process_entry(
    entry: &FileEntry,
    record_dir: &Path,
    opts: &BatchOptions,
    progress: &dyn ProgressSink,
) -> Result<FileStatus> {
    let expected = ExpectedChecksum::parse(&entry.checksum, opts.default_algo)?;
    let target = paths::entry_path(record_dir, &entry.filename)?;
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }

    if target.exists() {
        if checksum::verify(&target, expected.algo, &expected.hex)? {
            tracing::debug!(file = %entry.filename, "already verified, skipping");
            return Ok(FileStatus::Skipped);
        }
        // The stale file stays at the final path until the verified artifact
        // renames over it.
        tracing::info!(file = %entry.filename, "existing file failed verification, re-downloading");
    }

    match downloader::download(
        &entry.links.download,
        &target,
        &expected,
        opts.transfer,
        progress,
    ) {
        Ok(outcome) => {
            tracing::info!(
                file = %entry.filename,
                bytes = outcome.total_bytes,
                resumed_from = outcome.resumed_from,
                restarted = outcome.restarted,
                "download verified"
            );
            Ok(FileStatus::Downloaded)
        }
        Err(e) => {
            tracing::warn!(file = %entry.filename, "download failed: {}", e);
            Ok(FileStatus::Failed(e.to_string()))
        }
    }
}

fn status_line(status: &FileStatus) -> String {
    match status {
        FileStatus::Skipped => "already verified, skipped".to_string(),
        FileStatus::Downloaded => "downloaded and verified".to_string(),
        FileStatus::Failed(reason) => format!("failed: {}", reason),
    }
}

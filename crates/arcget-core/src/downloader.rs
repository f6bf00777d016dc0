//! Resumable single-file download with checksum-gated promotion.
//!
//! One transfer streams a GET response into the `.part` artifact, resuming
//! from the artifact's size with a `Range` request when it already exists.
//! The final path only ever appears by renaming a verified artifact.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::io;
use std::path::Path;
use std::str;
use std::time::Duration;

use crate::checksum;
use crate::manifest::ExpectedChecksum;
use crate::progress::ProgressSink;
use crate::storage::{self, PartWriter};

/// Transfer tuning, sourced from config.
#[derive(Debug, Clone, Copy)]
pub struct TransferOptions {
    pub connect_timeout: Duration,
    /// Receive buffer size hint passed to libcurl.
    pub chunk_size: usize,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            chunk_size: 64 * 1024,
        }
    }
}

/// Failure of one file's download attempt. The batch reports it and moves on.
#[derive(Debug)]
pub enum DownloadError {
    /// curl reported a transport failure (connect, DNS, mid-stream drop).
    /// Partial bytes stay in the `.part` artifact so the next run resumes.
    Transfer(curl::Error),
    /// Non-2xx HTTP status for the file GET.
    Http(u32),
    /// The completed artifact did not match the manifest digest. The
    /// artifact has been removed; a retry starts over.
    ChecksumMismatch { expected: String, computed: String },
    /// Local filesystem failure reading or writing the artifact.
    Io(io::Error),
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadError::Transfer(e) => write!(f, "transfer: {}", e),
            DownloadError::Http(code) => write!(f, "HTTP {}", code),
            DownloadError::ChecksumMismatch { expected, computed } => {
                write!(f, "checksum mismatch: expected {}, got {}", expected, computed)
            }
            DownloadError::Io(e) => write!(f, "io: {}", e),
        }
    }
}

impl std::error::Error for DownloadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DownloadError::Transfer(e) => Some(e),
            DownloadError::Io(e) => Some(e),
            DownloadError::Http(_) | DownloadError::ChecksumMismatch { .. } => None,
        }
    }
}

/// How a successful download happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadOutcome {
    /// Offset the transfer continued from (0 for a fresh download).
    pub resumed_from: u64,
    /// True if a resume was attempted but the server sent the full body,
    /// forcing a truncate-and-restart.
    pub restarted: bool,
    /// Final artifact size in bytes.
    pub total_bytes: u64,
}

/// Download `url` to `target`, resuming an existing `.part` artifact if
/// present, and promote it to `target` only after the digest matches.
pub fn download(
    url: &str,
    target: &Path,
    expected: &ExpectedChecksum,
    opts: TransferOptions,
    progress: &dyn ProgressSink,
) -> Result<DownloadOutcome, DownloadError> {
    let temp_path = storage::part_path(target);
    let (part, resume_from) = if temp_path.exists() {
        PartWriter::open_resume(&temp_path).map_err(DownloadError::Io)?
    } else {
        (
            PartWriter::open_fresh(&temp_path).map_err(DownloadError::Io)?,
            0,
        )
    };

    // Shared with the transfer callbacks. Single-threaded by design, so
    // cells are enough.
    let offset = Cell::new(resume_from);
    let status = Cell::new(0u32);
    let content_length = Cell::new(None::<u64>);
    let body_started = Cell::new(false);
    let restarted = Cell::new(false);
    let write_error: RefCell<Option<io::Error>> = RefCell::new(None);

    let mut easy = curl::easy::Easy::new();
    easy.url(url).map_err(DownloadError::Transfer)?;
    easy.follow_location(true).map_err(DownloadError::Transfer)?;
    easy.max_redirections(10).map_err(DownloadError::Transfer)?;
    easy.connect_timeout(opts.connect_timeout)
        .map_err(DownloadError::Transfer)?;
    // Abort if throughput drops below 1 KiB/s for 60s; no hard wall-clock
    // timeout, long transfers are expected.
    easy.low_speed_limit(1024).map_err(DownloadError::Transfer)?;
    easy.low_speed_time(Duration::from_secs(60))
        .map_err(DownloadError::Transfer)?;
    easy.buffer_size(opts.chunk_size)
        .map_err(DownloadError::Transfer)?;
    if resume_from > 0 {
        easy.range(&format!("{}-", resume_from))
            .map_err(DownloadError::Transfer)?;
    }

    let perform_result = {
        let part_ref = &part;
        let mut transfer = easy.transfer();
        transfer
            .header_function(|data| {
                if let Ok(line) = str::from_utf8(data) {
                    let line = line.trim();
                    if let Some(code) = parse_status_line(line) {
                        // A redirect produces a fresh header block; only the
                        // last response's status and length count.
                        status.set(code);
                        content_length.set(None);
                    } else if let Some((name, value)) = line.split_once(':') {
                        if name.trim().eq_ignore_ascii_case("content-length") {
                            if let Ok(n) = value.trim().parse::<u64>() {
                                content_length.set(Some(n));
                            }
                        }
                    }
                }
                true
            })
            .map_err(DownloadError::Transfer)?;
        transfer
            .write_function(|data| {
                // Error response bodies are not file content.
                if !(200..300).contains(&status.get()) {
                    return Ok(data.len());
                }
                if !body_started.replace(true) {
                    // Resumption requires server cooperation: anything but
                    // 206 means the full body follows and appending would
                    // corrupt the artifact.
                    if offset.get() > 0 && status.get() != 206 {
                        tracing::warn!(
                            "server ignored range request (HTTP {}), restarting from 0",
                            status.get()
                        );
                        if let Err(e) = part_ref.truncate() {
                            *write_error.borrow_mut() = Some(e);
                            return Ok(0);
                        }
                        offset.set(0);
                        restarted.set(true);
                    }
                    // Content-Length covers this response only; add the kept
                    // offset so the total reflects the whole file.
                    progress.begin(content_length.get().unwrap_or(0) + offset.get());
                    if offset.get() > 0 {
                        progress.advance(offset.get());
                    }
                }
                match part_ref.write_at(offset.get(), data) {
                    Ok(()) => {
                        offset.set(offset.get() + data.len() as u64);
                        progress.advance(data.len() as u64);
                        Ok(data.len())
                    }
                    Err(e) => {
                        *write_error.borrow_mut() = Some(e);
                        Ok(0)
                    }
                }
            })
            .map_err(DownloadError::Transfer)?;
        transfer.perform()
    };
    progress.finish();

    if let Err(e) = perform_result {
        let err = match write_error.borrow_mut().take() {
            Some(io_err) if e.is_write_error() => DownloadError::Io(io_err),
            _ => DownloadError::Transfer(e),
        };
        // Partial bytes stay in the artifact for the next run; a fresh start
        // that never wrote a byte leaves nothing behind.
        discard_if_untouched(part, resume_from, offset.get());
        return Err(err);
    }

    let code = easy.response_code().map_err(DownloadError::Transfer)? as u32;
    if code < 200 || code >= 300 {
        discard_if_untouched(part, resume_from, offset.get());
        return Err(DownloadError::Http(code));
    }

    let computed = checksum::digest_path(expected.algo, part.path())
        .map_err(|e| DownloadError::Io(io::Error::new(io::ErrorKind::Other, e.to_string())))?;
    if computed != expected.hex {
        part.discard().map_err(DownloadError::Io)?;
        return Err(DownloadError::ChecksumMismatch {
            expected: expected.hex.clone(),
            computed,
        });
    }

    part.sync().map_err(DownloadError::Io)?;
    let total_bytes = offset.get();
    part.finalize(target).map_err(DownloadError::Io)?;

    Ok(DownloadOutcome {
        resumed_from: if restarted.get() { 0 } else { resume_from },
        restarted: restarted.get(),
        total_bytes,
    })
}

/// A fresh start that never wrote a byte must not leave an empty artifact
/// behind; a resumed or partially-written artifact is kept for the next run.
fn discard_if_untouched(part: PartWriter, resume_from: u64, offset: u64) {
    if resume_from == 0 && offset == 0 {
        let _ = part.discard();
    }
}

/// Status code from an `HTTP/<ver> <code> <reason>` line, if this is one.
fn parse_status_line(line: &str) -> Option<u32> {
    let rest = line.strip_prefix("HTTP/")?;
    rest.split_whitespace().nth(1)?.parse().ok()
}

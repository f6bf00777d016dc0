//! Progress reporting capability passed into the downloader.
//!
//! Transfer code reports byte counts through this trait instead of printing;
//! the CLI supplies a printing sink, tests supply `NullProgress`.

/// Observer for batch and transfer progress. All methods default to no-ops so
/// sinks only implement what they display.
pub trait ProgressSink {
    /// A manifest entry is about to be processed.
    fn file_started(&self, _name: &str) {}

    /// Total expected bytes for the current transfer, once known. When a
    /// transfer resumes, the resume offset is included in the total and
    /// immediately reported via `advance`.
    fn begin(&self, _total: u64) {}

    /// The current transfer advanced by `n` bytes.
    fn advance(&self, _n: u64) {}

    /// The current transfer's stream ended (whatever the verdict).
    fn finish(&self) {}

    /// Terminal status line for a manifest entry.
    fn file_done(&self, _name: &str, _line: &str) {}
}

/// Sink that discards all progress events.
pub struct NullProgress;

impl ProgressSink for NullProgress {}

//! Progress reporting for sync runs.
//!
//! Jobs report records fetched, indexed and geocoded through
//! [`ProgressCallback`] without knowing how (or whether) the progress is
//! rendered. The server passes [`null_progress`]; the CLI passes an
//! `indicatif` bar.

use std::sync::Arc;

/// Receives progress updates from a running job.
pub trait ProgressCallback: Send + Sync {
    /// Sets the total units of work, once known.
    fn set_total(&self, total: u64);

    /// Advances progress by `delta` units.
    fn inc(&self, delta: u64);

    /// Replaces the status message.
    fn set_message(&self, msg: String);

    /// Marks the run as finished with a final message.
    fn finish(&self, msg: String);
}

/// Discards every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Returns a shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}

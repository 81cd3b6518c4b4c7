//! Progress reporting. Purely observational; nothing here changes what gets encoded.

use std::sync::{Mutex, PoisonError};

use indicatif::{ProgressBar, ProgressStyle};

/// Receives the number of plaintext bytes encoded so far.
pub trait Progress: Sync {
    /// Called once with the total number of bytes that will be processed.
    fn start(&self, total: u64);
    /// Called with a running total that never decreases.
    fn update(&self, processed: u64);
    fn finish(&self);
}

/// Discards every notification.
#[derive(Debug, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn start(&self, _total: u64) {}
    fn update(&self, _processed: u64) {}
    fn finish(&self) {}
}

/// Terminal progress bar on stderr.
pub struct ConsoleProgress {
    bar: ProgressBar,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner} [{elapsed_precise}] {bar:40.cyan/blue} {bytes}/{total_bytes} ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self { bar }
    }

    /// A bar that never draws, for quiet runs.
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress for ConsoleProgress {
    fn start(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
    }

    fn update(&self, processed: u64) {
        self.bar.set_position(processed);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// Turns per-file increments from any worker into an ordered running total.
pub struct ProgressTracker<'a> {
    sink: &'a dyn Progress,
    processed: Mutex<u64>,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(sink: &'a dyn Progress, total: u64) -> Self {
        sink.start(total);
        Self {
            sink,
            processed: Mutex::new(0),
        }
    }

    pub fn advance(&self, bytes: u64) {
        let mut processed = self
            .processed
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *processed += bytes;
        // Report while holding the lock so notifications arrive in increasing order
        self.sink.update(*processed);
    }

    pub fn finish(&self) {
        self.sink.finish();
    }
}

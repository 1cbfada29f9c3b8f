//! Change debouncing for the file watcher.
//!
//! Editors often emit several events per save (write temp, rename, chmod).
//! Each path is held until it has been quiet for the debounce duration and is
//! then reported once.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Thread-safe per-path debouncer.
pub(crate) struct ChangeDebouncer {
    pending: Mutex<HashMap<PathBuf, Instant>>,
    quiet: Duration,
}

impl ChangeDebouncer {
    pub(crate) fn new(quiet: Duration) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            quiet,
        }
    }

    /// Record a change; a repeat change pushes the deadline back.
    pub(crate) fn record(&self, path: PathBuf) {
        let deadline = Instant::now() + self.quiet;
        self.pending.lock().insert(path, deadline);
    }

    /// Remove and return the paths whose quiet period has elapsed, sorted.
    pub(crate) fn drain_ready(&self) -> Vec<PathBuf> {
        let now = Instant::now();
        let mut pending = self.pending.lock();

        let mut ready: Vec<PathBuf> = pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(path, _)| path.clone())
            .collect();
        for path in &ready {
            pending.remove(path);
        }

        ready.sort();
        ready
    }
}

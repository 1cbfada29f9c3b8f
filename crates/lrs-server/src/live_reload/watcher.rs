//! File watching for live reload.
//!
//! Watches the served directory with `notify`, debounces raw events and
//! broadcasts a reload for each settled batch of changes.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::broadcaster::{ReloadBroadcaster, ReloadEvent};
use super::debouncer::ChangeDebouncer;

/// How often settled changes are checked for.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Watches the served directory and triggers reloads.
pub(crate) struct FileWatcher {
    root: PathBuf,
    ignore: Vec<glob::Pattern>,
    debounce: Duration,
    broadcaster: ReloadBroadcaster,
    /// Notifications stop when the watcher is dropped.
    #[allow(dead_code)]
    watcher: Option<RecommendedWatcher>,
    /// Recorder and ticker; aborted on drop.
    tasks: Vec<JoinHandle<()>>,
}

impl FileWatcher {
    /// Create a watcher for `root`.
    ///
    /// Invalid ignore patterns are skipped with a warning.
    pub(crate) fn new(
        root: PathBuf,
        ignore: &[String],
        debounce: Duration,
        broadcaster: ReloadBroadcaster,
    ) -> Self {
        let ignore = ignore
            .iter()
            .filter_map(|p| match glob::Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    tracing::warn!(pattern = %p, error = %e, "Ignoring invalid watch pattern");
                    None
                }
            })
            .collect();

        Self {
            root,
            ignore,
            debounce,
            broadcaster,
            watcher: None,
            tasks: Vec::new(),
        }
    }

    /// Start watching.
    ///
    /// Spawns the tasks that collect events and broadcast reloads; they stop
    /// when the watcher is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform watcher cannot be created.
    pub(crate) fn start(&mut self) -> Result<(), notify::Error> {
        let (tx, mut rx) = mpsc::channel::<Event>(100);

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                // Callback runs on the notify thread.
                Ok(event) => {
                    let _ = tx.blocking_send(event);
                }
                Err(e) => tracing::warn!(error = %e, "File watcher error"),
            }
        })?;
        watcher.watch(&self.root, RecursiveMode::Recursive)?;
        self.watcher = Some(watcher);

        let debouncer = Arc::new(ChangeDebouncer::new(self.debounce));

        let recorder = Arc::clone(&debouncer);
        let root = self.root.clone();
        let ignore = self.ignore.clone();
        let recording = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                record_event(&event, &root, &ignore, &recorder);
            }
        });

        let broadcaster = self.broadcaster.clone();
        let root = self.root.clone();
        let ticking = tokio::spawn(async move {
            let mut interval = tokio::time::interval(POLL_INTERVAL);
            loop {
                interval.tick().await;
                if let Some(event) = reload_event(&debouncer.drain_ready(), &root) {
                    broadcaster.reload(&event);
                }
            }
        });

        self.tasks = vec![recording, ticking];

        tracing::info!(root = %self.root.display(), "Watching for changes");
        Ok(())
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Record the interesting paths of a raw event.
fn record_event(
    event: &Event,
    root: &Path,
    ignore: &[glob::Pattern],
    debouncer: &ChangeDebouncer,
) {
    if !matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) {
        return;
    }

    for path in &event.paths {
        if is_ignored(path, root, ignore) {
            continue;
        }
        tracing::debug!(path = %path.display(), kind = ?event.kind, "Recorded filesystem event");
        debouncer.record(path.clone());
    }
}

/// Paths outside `root` or matching an ignore pattern don't trigger reloads.
fn is_ignored(path: &Path, root: &Path, patterns: &[glob::Pattern]) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return true;
    };
    let relative = relative.to_string_lossy();
    patterns.iter().any(|p| p.matches(&relative))
}

/// Turn a batch of settled paths into one reload.
///
/// A single change reloads that path so stylesheets can be swapped in place;
/// several changes at once reload everything.
fn reload_event(changed: &[PathBuf], root: &Path) -> Option<ReloadEvent> {
    match changed {
        [] => None,
        [path] => Some(
            url_path(path, root).map_or_else(ReloadEvent::everything, ReloadEvent::for_path),
        ),
        _ => Some(ReloadEvent::everything()),
    }
}

/// URL path under which `file` is served, e.g. `/css/site.css`.
fn url_path(file: &Path, root: &Path) -> Option<String> {
    let relative = file.strip_prefix(root).ok()?;
    let segments: Vec<_> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    Some(format!("/{}", segments.join("/")))
}

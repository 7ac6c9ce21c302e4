//! Diagram source watching.
//!
//! Stands in for the editor widget's change notifications: every save of
//! the source file becomes a content-changed signal. Uses notify for
//! cross-platform file system events.
use std::ffi::OsString;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::warn;

fn hash_text(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

/// Watches one source file and yields its new content after each settled change.
pub struct SourceWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    watch_root: PathBuf,
    target_path: PathBuf,
    target_name: Option<OsString>,
    debounce: Duration,
    pending_since: Option<Instant>,
    last_hash: Option<u64>,
}

impl SourceWatcher {
    /// Create a watcher for `path`. `initial` is the content already loaded,
    /// so a touch that leaves the file unchanged is not reported.
    ///
    /// # Errors
    /// Returns an error if the file watcher cannot be created or the path cannot be watched.
    pub fn new(path: impl AsRef<Path>, debounce: Duration, initial: &str) -> notify::Result<Self> {
        // Event paths from the OS are canonical; match them.
        let target_path = path
            .as_ref()
            .canonicalize()
            .unwrap_or_else(|_| path.as_ref().to_path_buf());
        let target_name = target_path.file_name().map(std::ffi::OsStr::to_os_string);
        let watch_root = watch_root_for(&target_path);

        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        // Editors often save by rename, so watch the directory, not the file.
        watcher.watch(&watch_root, RecursiveMode::NonRecursive)?;

        Ok(Self {
            _watcher: watcher,
            rx,
            watch_root,
            target_path,
            target_name,
            debounce,
            pending_since: None,
            last_hash: Some(hash_text(initial)),
        })
    }

    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    /// Drain pending events and, once the debounce has elapsed, return the
    /// file's content if it differs from the last content returned.
    pub fn take_change(&mut self) -> Option<String> {
        let mut relevant = 0u32;
        while let Ok(event) = self.rx.try_recv() {
            match event {
                Ok(ev) if self.is_relevant(&ev) => relevant += 1,
                Ok(_) => {}
                Err(err) => {
                    crate::perf::log_event("watcher.error", format!("{err}"));
                }
            }
        }
        if relevant > 0 {
            crate::perf::log_event(
                "watcher.poll",
                format!("relevant={relevant} target={}", self.target_path.display()),
            );
            self.pending_since = Some(Instant::now());
        }

        let pending_since = self.pending_since?;
        if pending_since.elapsed() < self.debounce {
            return None;
        }
        self.pending_since = None;
        self.read_if_changed()
    }

    fn read_if_changed(&mut self) -> Option<String> {
        let content = match std::fs::read_to_string(&self.target_path) {
            Ok(content) => content,
            Err(err) => {
                // Mid-save rename windows land here; the next event retries.
                warn!(path = %self.target_path.display(), error = %err, "source unreadable");
                return None;
            }
        };
        let hash = hash_text(&content);
        if self.last_hash == Some(hash) {
            crate::perf::log_event("watcher.unchanged", self.target_path.display().to_string());
            return None;
        }
        self.last_hash = Some(hash);
        Some(content)
    }

    fn is_relevant(&self, event: &Event) -> bool {
        event.paths.iter().any(|path| {
            path == &self.watch_root
                || path == &self.target_path
                || self
                    .target_name
                    .as_ref()
                    .is_some_and(|name| path.file_name().is_some_and(|f| f == name))
        })
    }
}

fn watch_root_for(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

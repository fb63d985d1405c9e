//! Filesystem-change-triggered source refresh (§4.7).
//!
//! One `notify` watcher thread serves every registered file-backed source.
//! `notify` delivers raw, uncoalesced events, so a short debounce map keyed
//! by path absorbs bursts (an editor's save-as-rename-and-rewrite, a
//! multi-file checkout) down to one `push_update` per path per window.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::warn;

use crate::sources::FileSource;

const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

struct WatchedFile {
    source: Arc<FileSource>,
    last_flushed: Option<Instant>,
}

struct Inner {
    debounce: Duration,
    files: Mutex<HashMap<PathBuf, WatchedFile>>,
    // Keeps one `RecommendedWatcher` (and its parent-directory watches) alive
    // for as long as the `FileWatcher` itself is.
    watcher: Mutex<Option<RecommendedWatcher>>,
}

/// Watches the parent directories of every registered file source and
/// triggers a `push_update` on that source when its path is created,
/// modified, or removed.
pub struct FileWatcher {
    inner: Arc<Inner>,
}

impl FileWatcher {
    pub fn new() -> Arc<Self> {
        Self::with_debounce(DEFAULT_DEBOUNCE)
    }

    pub fn with_debounce(debounce: Duration) -> Arc<Self> {
        Arc::new(Self {
            inner: Arc::new(Inner {
                debounce,
                files: Mutex::new(HashMap::new()),
                watcher: Mutex::new(None),
            }),
        })
    }

    /// The process-wide default file watcher.
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<FileWatcher>> = OnceLock::new();
        GLOBAL.get_or_init(FileWatcher::new).clone()
    }

    /// Starts (or reuses) a watch on `source`'s parent directory, and
    /// arranges for matching filesystem events on its path to call
    /// `source.push_update()`. Registering the same path twice is a no-op.
    pub fn watch(&self, source: Arc<FileSource>) {
        let path = source.path().to_path_buf();
        {
            let mut files = self.inner.files.lock().unwrap();
            if files.contains_key(&path) {
                return;
            }
            files.insert(
                path.clone(),
                WatchedFile {
                    source,
                    last_flushed: None,
                },
            );
        }

        let Some(parent) = path.parent().map(Path::to_path_buf) else {
            warn!(path = %path.display(), "file source has no parent directory to watch");
            return;
        };

        let mut guard = self.inner.watcher.lock().unwrap();
        if guard.is_none() {
            let inner = Arc::clone(&self.inner);
            let watcher = notify::recommended_watcher(move |event: notify::Result<Event>| {
                match event {
                    Ok(event) => inner.handle_event(event),
                    Err(err) => warn!(error = %err, "file watcher reported an error"),
                }
            });
            match watcher {
                Ok(watcher) => *guard = Some(watcher),
                Err(err) => {
                    warn!(error = %err, "failed to start file watcher");
                    return;
                }
            }
        }

        if let Some(watcher) = guard.as_mut() {
            if let Err(err) = watcher.watch(&parent, RecursiveMode::NonRecursive) {
                warn!(path = %parent.display(), error = %err, "failed to watch directory");
            }
        }
    }
}

impl Inner {
    fn handle_event(&self, event: Event) {
        match event.kind {
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {}
            // Overflow and anything else (access events, unclassified) are
            // not actionable here.
            _ => return,
        }

        let now = Instant::now();
        let mut files = self.files.lock().unwrap();
        for changed in &event.paths {
            let Some(watched) = files.get_mut(changed) else {
                continue;
            };
            let due = watched
                .last_flushed
                .map(|t| now.duration_since(t) >= self.debounce)
                .unwrap_or(true);
            if !due {
                continue;
            }
            watched.last_flushed = Some(now);
            watched.source.push_update();
        }
    }
}

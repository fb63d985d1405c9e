//! A Java-properties-style file source, read-only from the library's side.
//!
//! This is the source type `FileWatcher` (§4.9) drives: `path()` exposes
//! the backing path so the watcher can register the parent directory.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::properties;
use crate::source::{Snapshot, Source, SourceSubscriber, SourceSubscribers};

pub struct FileSource {
    id: String,
    path: PathBuf,
    subscribers: SourceSubscribers,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            id: format!("file:{}", path.display()),
            path,
            subscribers: SourceSubscribers::default(),
        }
    }

    /// The on-disk path this source reads. Used by `FileWatcher` to derive
    /// which parent directory to watch.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Source for FileSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn snapshot(&self) -> Snapshot {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => properties::parse(&contents),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "file source unavailable");
                Snapshot::new()
            }
        }
    }

    fn register(&self, subscriber: SourceSubscriber) {
        self.subscribers.register(subscriber);
    }

    fn push_update(&self) {
        let snapshot = self.snapshot();
        self.subscribers.notify(&snapshot);
    }
}

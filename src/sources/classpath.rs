//! A read-only source over a compile-time-embedded properties resource.
//!
//! Rust has no classpath; the nearest analogue to "a properties file bundled
//! into a JVM artifact" is a `key=value` blob the caller hands in directly
//! (typically via `include_str!`). This source parses it once at
//! construction and never changes — `push_update` replays the same
//! snapshot.

use crate::properties;
use crate::source::{Snapshot, Source, SourceSubscriber, SourceSubscribers};

pub struct ClasspathSource {
    id: String,
    snapshot: Snapshot,
    subscribers: SourceSubscribers,
}

impl ClasspathSource {
    /// Parses `contents` as a Java-properties-style blob (§4.11). The
    /// resulting mapping never changes; reconstruct the source to pick up
    /// new contents.
    pub fn new(resource_name: impl Into<String>, contents: &str) -> Self {
        Self {
            id: resource_name.into(),
            snapshot: properties::parse(contents),
            subscribers: SourceSubscribers::default(),
        }
    }
}

impl Source for ClasspathSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn snapshot(&self) -> Snapshot {
        self.snapshot.clone()
    }

    fn register(&self, subscriber: SourceSubscriber) {
        self.subscribers.register(subscriber);
    }

    fn push_update(&self) {
        self.subscribers.notify(&self.snapshot);
    }
}

//! Process-environment-backed `Source`.

use crate::source::{Snapshot, Source, SourceSubscriber, SourceSubscribers};

/// Snapshots `std::env::vars()`. Never on-demand: the whole environment is
/// cheap enough to re-read in full on every refresh.
#[derive(Default)]
pub struct EnvSource {
    id: String,
    subscribers: SourceSubscribers,
}

impl EnvSource {
    pub fn new() -> Self {
        Self {
            id: "env".to_string(),
            subscribers: SourceSubscribers::default(),
        }
    }
}

impl Source for EnvSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn snapshot(&self) -> Snapshot {
        std::env::vars().collect()
    }

    fn register(&self, subscriber: SourceSubscriber) {
        self.subscribers.register(subscriber);
    }

    fn push_update(&self) {
        let snapshot = self.snapshot();
        self.subscribers.notify(&snapshot);
    }
}

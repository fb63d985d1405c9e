//! A process-wide, explicitly-settable `key -> value` table.
//!
//! Rust has no JVM-style ambient system-properties namespace, so this source
//! holds its own table behind a lock and exposes `set`/`remove` so a host
//! application can stage overrides before calling `push_update`.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::source::{Snapshot, Source, SourceSubscriber, SourceSubscribers};

pub struct SystemPropertySource {
    id: String,
    table: RwLock<HashMap<String, String>>,
    subscribers: SourceSubscribers,
}

impl SystemPropertySource {
    pub fn new() -> Self {
        Self {
            id: "system".to_string(),
            table: RwLock::new(HashMap::new()),
            subscribers: SourceSubscribers::default(),
        }
    }

    /// Stages a value. Takes effect for consumers on the next `push_update`.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.table.write().insert(key.into(), value.into());
    }

    /// Stages a removal.
    pub fn remove(&self, key: &str) {
        self.table.write().remove(key);
    }
}

impl Default for SystemPropertySource {
    fn default() -> Self {
        Self::new()
    }
}

impl Source for SystemPropertySource {
    fn id(&self) -> &str {
        &self.id
    }

    fn snapshot(&self) -> Snapshot {
        self.table.read().clone()
    }

    fn register(&self, subscriber: SourceSubscriber) {
        self.subscribers.register(subscriber);
    }

    fn push_update(&self) {
        let snapshot = self.snapshot();
        self.subscribers.notify(&snapshot);
    }
}

//! A `Source` paired with a priority, held in the registry's priority-ordered
//! chain (§4.2, §9 — realized as a flat array rather than a linked list).

use std::sync::Arc;

use parking_lot::RwLock;

use crate::source::{Snapshot, Source};

/// Whether a key's diffed transition is a `set` or an `unset`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Set,
    Unset,
}

/// One `(operation, key, value, layer)` transition produced by diffing a
/// layer's new snapshot against its previous one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerDelta {
    pub op: Operation,
    pub key: String,
    pub value: Option<String>,
}

/// Wraps one source, remembers its priority (its index in the chain), and
/// caches the source's last-pushed snapshot so `KeyOwnership`'s
/// owner-relinquish walk and cross-layer lookups never need to re-hit the
/// source's I/O.
pub struct Layer {
    source: Arc<dyn Source>,
    priority: usize,
    last_snapshot: RwLock<Snapshot>,
}

impl Layer {
    pub fn new(source: Arc<dyn Source>, priority: usize) -> Self {
        Self {
            source,
            priority,
            last_snapshot: RwLock::new(Snapshot::new()),
        }
    }

    pub fn priority(&self) -> usize {
        self.priority
    }

    pub fn source(&self) -> &Arc<dyn Source> {
        &self.source
    }

    pub fn source_id(&self) -> &str {
        self.source.id()
    }

    /// This layer's most recently cached value for `key`, used for
    /// cross-layer lookups without touching the source again.
    pub fn cached_value(&self, key: &str) -> Option<String> {
        self.last_snapshot.read().get(key).cloned()
    }

    /// Diffs `new_snapshot` against the cached one, replaces the cache, and
    /// returns every key whose mapping changed. Keys dropped from the
    /// snapshot emit `Unset`; new or changed keys emit `Set`.
    pub fn diff_and_replace(&self, new_snapshot: Snapshot) -> Vec<LayerDelta> {
        let mut previous = self.last_snapshot.write();
        let mut deltas = Vec::new();

        for (key, value) in previous.iter() {
            if !new_snapshot.contains_key(key) {
                deltas.push(LayerDelta {
                    op: Operation::Unset,
                    key: key.clone(),
                    value: None,
                });
            }
            let _ = value;
        }
        for (key, value) in new_snapshot.iter() {
            if previous.get(key) != Some(value) {
                deltas.push(LayerDelta {
                    op: Operation::Set,
                    key: key.clone(),
                    value: Some(value.clone()),
                });
            }
        }

        *previous = new_snapshot;
        deltas
    }
}

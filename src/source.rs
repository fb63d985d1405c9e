//! The `Source` contract and the completion handle used by on-demand sources.
//!
//! A source is the only thing in this crate allowed to originate a value: it
//! owns the snapshot, pushes updates to whoever registered with it, and never
//! propagates its own I/O failures past this boundary (§7, `SourceUnavailable`).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::error::PropsError;

/// A full `key -> value` view of a source at one instant.
pub type Snapshot = HashMap<String, String>;

/// Callback a `Layer` registers with a `Source` to receive future snapshots.
pub type SourceSubscriber = Box<dyn Fn(&Snapshot) + Send + Sync + 'static>;

/// Produces a snapshot on demand and pushes updates to registered
/// subscribers. Implementations must be `Send + Sync`: sources are shared
/// across the scheduler, the file watcher, and whichever thread calls
/// `pushUpdate` directly.
pub trait Source: Send + Sync {
    /// A stable identifier, used in diagnostics and by the scheduler's
    /// idempotent-scheduling table.
    fn id(&self) -> &str;

    /// Returns the source's current key/value mappings. Must not panic;
    /// backing-store errors are reported as an empty map plus a
    /// `tracing::warn!` (§4.1).
    fn snapshot(&self) -> Snapshot;

    /// Registers a subscriber to receive every future `pushUpdate`.
    fn register(&self, subscriber: SourceSubscriber);

    /// Takes a fresh snapshot and delivers it to every registered
    /// subscriber. Idempotent when nothing in the backing store changed:
    /// subscribers still receive the snapshot, but `Layer` will diff it down
    /// to zero ownership updates.
    fn push_update(&self);

    /// Whether this source only tracks keys explicitly requested via
    /// `register_key`. Defaults to `false`.
    fn load_on_demand(&self) -> bool {
        false
    }

    /// Requests that an on-demand source start tracking `key`, returning a
    /// handle that resolves once the key's value (or confirmed absence) is
    /// known. Sources that are not on-demand resolve immediately with
    /// whatever `snapshot()` already reports.
    fn register_key(&self, key: &str) -> CompletionHandle<Option<String>> {
        let handle = CompletionHandle::new();
        handle.complete(Ok(self.snapshot().get(key).cloned()));
        handle
    }
}

/// Shared subscriber bookkeeping for the built-in sources (`sources::*`).
/// Not the epoch-ordered `SubscriberProxy` used by props — a source's push
/// fan-out has no staleness concept, it just replays the latest snapshot to
/// every listener in registration order.
#[derive(Default)]
pub(crate) struct SourceSubscribers(Mutex<Vec<SourceSubscriber>>);

impl SourceSubscribers {
    pub(crate) fn register(&self, subscriber: SourceSubscriber) {
        self.0.lock().push(subscriber);
    }

    pub(crate) fn notify(&self, snapshot: &Snapshot) {
        for subscriber in self.0.lock().iter() {
            subscriber(snapshot);
        }
    }
}

struct CompletionState<T> {
    result: Option<Result<T, PropsError>>,
    callbacks: Vec<Box<dyn FnOnce(&Result<T, PropsError>) + Send>>,
}

/// An explicit completion token for an asynchronous-but-not-`Future` result.
///
/// Modeled this way (§9) because the crate has no async runtime dependency:
/// callers either block on `wait()` or chain continuations with `then()`,
/// both of which work the same whether the value is already available or
/// arrives later from another thread.
pub struct CompletionHandle<T> {
    inner: Arc<(Mutex<CompletionState<T>>, Condvar)>,
}

impl<T> Clone for CompletionHandle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> CompletionHandle<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new((
                Mutex::new(CompletionState {
                    result: None,
                    callbacks: Vec::new(),
                }),
                Condvar::new(),
            )),
        }
    }

    /// Resolves the handle. Only the first call takes effect; later calls
    /// are ignored, matching a completion's single-assignment semantics.
    pub fn complete(&self, result: Result<T, PropsError>)
    where
        T: Clone,
    {
        let (mutex, condvar) = &*self.inner;
        let mut state = mutex.lock();
        if state.result.is_some() {
            return;
        }
        state.result = Some(result);
        let callbacks = std::mem::take(&mut state.callbacks);
        let result_ref = state.result.as_ref().unwrap();
        for cb in callbacks {
            cb(result_ref);
        }
        condvar.notify_all();
    }

    /// Blocks the calling thread until the handle resolves.
    pub fn wait(&self) -> Result<T, PropsError>
    where
        T: Clone,
    {
        let (mutex, condvar) = &*self.inner;
        let mut state = mutex.lock();
        while state.result.is_none() {
            condvar.wait(&mut state);
        }
        state.result.clone().unwrap()
    }

    /// Registers a continuation run when the handle resolves, immediately if
    /// it already has.
    pub fn then<F>(&self, f: F)
    where
        F: FnOnce(&Result<T, PropsError>) + Send + 'static,
    {
        let (mutex, _) = &*self.inner;
        let mut state = mutex.lock();
        if let Some(result) = &state.result {
            f(result);
        } else {
            state.callbacks.push(Box::new(f));
        }
    }
}

impl<T: Send + 'static> Default for CompletionHandle<T> {
    fn default() -> Self {
        Self::new()
    }
}

//! Per-prop multicast with epoch-ordered, staleness-rejecting delivery and
//! panic isolation (§4.4).

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::warn;

use crate::error::{self, PropsError};
use crate::worker_pool::WorkerPool;

type UpdateHandler<T> = Arc<dyn Fn(T) + Send + Sync>;
type ErrorHandler = Arc<dyn Fn(PropsError) + Send + Sync>;

struct HandlerPair<T> {
    update: UpdateHandler<T>,
    error: ErrorHandler,
}

/// Dispatch fans out to `|handlers|` synchronously below this count, and to
/// the shared worker pool at or above it.
const DEFAULT_PARALLEL_THRESHOLD: usize = 4;

/// Fans a prop's value and error events out to every subscriber, rejecting
/// events that arrive out of epoch order and isolating a panicking handler
/// from its peers.
pub struct SubscriberProxy<T> {
    handlers: Mutex<Vec<HandlerPair<T>>>,
    epoch: AtomicU64,
    last_epoch: AtomicU64,
    parallel_threshold: usize,
    pool: Arc<WorkerPool>,
}

impl<T> Default for SubscriberProxy<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SubscriberProxy<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::with_parallel_threshold(DEFAULT_PARALLEL_THRESHOLD)
    }

    pub fn with_parallel_threshold(parallel_threshold: usize) -> Self {
        Self {
            handlers: Mutex::new(Vec::new()),
            epoch: AtomicU64::new(0),
            last_epoch: AtomicU64::new(0),
            parallel_threshold,
            pool: WorkerPool::global(),
        }
    }

    /// The epoch of the most recent event accepted for delivery.
    pub fn current_epoch(&self) -> u64 {
        self.last_epoch.load(Ordering::SeqCst)
    }

    /// Registers a subscriber. `on_update` and `on_error` are paired: a
    /// panic inside `on_update` is caught and routed to `on_error` instead
    /// of propagating to the caller or to other subscribers.
    pub fn subscribe(
        &self,
        on_update: impl Fn(T) + Send + Sync + 'static,
        on_error: impl Fn(PropsError) + Send + Sync + 'static,
    ) {
        self.handlers.lock().push(HandlerPair {
            update: Arc::new(on_update),
            error: Arc::new(on_error),
        });
    }

    /// Assigns the next epoch and delivers `value` to every subscriber,
    /// subject to the staleness rule: if a fresher event's epoch already
    /// landed, this one is dropped for everyone.
    pub fn send_update(&self, value: T) {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.accept(epoch) {
            return;
        }
        let handlers = self.snapshot_handlers();
        self.dispatch(handlers, move |pair| {
            Self::invoke_update(pair, value.clone(), epoch);
        });
    }

    /// Identical epoch/staleness protocol, over the error handlers.
    pub fn handle_error(&self, error: PropsError) {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.accept(epoch) {
            return;
        }
        let handlers = self.snapshot_handlers();
        self.dispatch(handlers, move |pair| {
            Self::invoke_error(pair, error.clone(), epoch);
        });
    }

    /// Bumps `last_epoch` to `max(last_epoch, epoch)` and reports whether
    /// `epoch` is in fact the new maximum (i.e. nothing fresher beat it).
    fn accept(&self, epoch: u64) -> bool {
        self.last_epoch.fetch_max(epoch, Ordering::SeqCst) < epoch
    }

    fn snapshot_handlers(&self) -> Vec<Arc<HandlerPair<T>>> {
        self.handlers
            .lock()
            .iter()
            .map(|pair| {
                Arc::new(HandlerPair {
                    update: pair.update.clone(),
                    error: pair.error.clone(),
                })
            })
            .collect()
    }

    fn dispatch(
        &self,
        handlers: Vec<Arc<HandlerPair<T>>>,
        call: impl Fn(&HandlerPair<T>) + Send + Sync + 'static + Clone,
    ) {
        if handlers.len() < self.parallel_threshold {
            for pair in &handlers {
                call(pair);
            }
        } else {
            for pair in handlers {
                let call = call.clone();
                self.pool.submit(move || call(&pair));
            }
        }
    }

    fn invoke_update(pair: &HandlerPair<T>, value: T, epoch: u64) {
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| (pair.update)(value)));
        if let Err(payload) = result {
            let message = error::panic_message(&*payload);
            warn!(epoch, %message, "subscriber update handler panicked");
            (pair.error)(PropsError::subscriber_panic(message));
        }
    }

    fn invoke_error(pair: &HandlerPair<T>, err: PropsError, epoch: u64) {
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| (pair.error)(err)));
        if let Err(payload) = result {
            let message = error::panic_message(&*payload);
            warn!(epoch, %message, "subscriber error handler panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn monotonic_delivery_drops_stale_events() {
        let proxy: SubscriberProxy<u32> = SubscriberProxy::with_parallel_threshold(usize::MAX);
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let seen2 = seen.clone();
        proxy.subscribe(move |v| seen2.lock().unwrap().push(v), |_| {});

        // Simulate a fresher event's epoch already having landed by
        // directly bumping last_epoch, then sending an older-epoch update.
        proxy.last_epoch.store(5, Ordering::SeqCst);
        proxy.epoch.store(1, Ordering::SeqCst);
        proxy.send_update(99);
        assert!(seen.lock().unwrap().is_empty());

        proxy.epoch.store(10, Ordering::SeqCst);
        proxy.send_update(7);
        assert_eq!(*seen.lock().unwrap(), vec![7]);
    }

    #[test]
    fn panicking_handler_does_not_block_others() {
        let proxy: SubscriberProxy<u32> = SubscriberProxy::with_parallel_threshold(usize::MAX);
        let errors = Arc::new(AtomicUsize::new(0));
        let delivered = Arc::new(AtomicUsize::new(0));

        let errors2 = errors.clone();
        proxy.subscribe(
            |_| panic!("boom"),
            move |_| {
                errors2.fetch_add(1, Ordering::SeqCst);
            },
        );
        let delivered2 = delivered.clone();
        proxy.subscribe(
            move |_| {
                delivered2.fetch_add(1, Ordering::SeqCst);
            },
            |_| {},
        );

        proxy.send_update(1);
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(delivered.load(Ordering::SeqCst), 1);
    }
}

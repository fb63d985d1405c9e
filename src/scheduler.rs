//! Periodic source refresh (§4.7).

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::warn;

use crate::source::Source;
use crate::worker_pool::WorkerPool;

/// Owns a fixed-size worker pool and arranges repeated, reentrancy-safe
/// invocation of `Source::push_update`.
///
/// Lazily-initialized process-wide singletons exist (`global`), but the
/// type is also directly constructible for tests or multi-registry hosts
/// that want a scoped lifetime instead (§9).
pub struct Scheduler {
    pool: Arc<WorkerPool>,
    scheduled: Mutex<HashSet<String>>,
    refreshing: Mutex<HashSet<String>>,
}

impl Scheduler {
    pub fn new(pool_size: usize) -> Arc<Self> {
        Arc::new(Self {
            pool: WorkerPool::new(pool_size),
            scheduled: Mutex::new(HashSet::new()),
            refreshing: Mutex::new(HashSet::new()),
        })
    }

    /// The process-wide default scheduler.
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<Scheduler>> = OnceLock::new();
        GLOBAL.get_or_init(|| Scheduler::new(4)).clone()
    }

    /// Arranges for `source.push_update()` to run every `period`, starting
    /// after `initial_delay`. Idempotent: a source id already scheduled on
    /// this instance is ignored on subsequent calls.
    pub fn schedule(self: &Arc<Self>, source: Arc<dyn Source>, initial_delay: Duration, period: Duration) {
        let id = source.id().to_string();
        {
            let mut scheduled = self.scheduled.lock();
            if !scheduled.insert(id.clone()) {
                return;
            }
        }

        let scheduler = Arc::clone(self);
        std::thread::spawn(move || {
            std::thread::sleep(initial_delay);
            loop {
                scheduler.tick(&id, &source);
                std::thread::sleep(period);
            }
        });
    }

    /// Runs one refresh if `id` is not already mid-refresh, otherwise drops
    /// the tick with a warning (reentrancy guard, §4.7).
    fn tick(self: &Arc<Self>, id: &str, source: &Arc<dyn Source>) {
        {
            let mut refreshing = self.refreshing.lock();
            if refreshing.contains(id) {
                warn!(source_id = id, "dropping overlapping scheduler tick");
                return;
            }
            refreshing.insert(id.to_string());
        }

        let scheduler = Arc::clone(self);
        let id = id.to_string();
        let source = Arc::clone(source);
        self.pool.submit(move || {
            source.push_update();
            scheduler.refreshing.lock().remove(&id);
        });
    }
}

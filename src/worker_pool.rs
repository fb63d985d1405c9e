//! A small fixed-size thread pool shared by `SubscriberProxy` dispatch and
//! `Scheduler` refresh ticks (§5 — "a shared worker pool handles subscriber
//! dispatch and source refresh").
//!
//! No async runtime is pulled in: every job here is either a blocking
//! refresh or a synchronous handler call, so plain OS threads pulling from a
//! channel are enough.

use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct WorkerPool {
    sender: Option<Sender<Job>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    pub fn new(size: usize) -> Arc<Self> {
        let size = size.max(1);
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));
        let mut workers = Vec::with_capacity(size);
        for _ in 0..size {
            let receiver = Arc::clone(&receiver);
            workers.push(std::thread::spawn(move || {
                loop {
                    let job = {
                        let guard = receiver.lock().unwrap();
                        guard.recv()
                    };
                    match job {
                        Ok(job) => job(),
                        Err(_) => break,
                    }
                }
            }));
        }
        Arc::new(Self {
            sender: Some(sender),
            workers: Mutex::new(workers),
        })
    }

    /// The process-wide default pool, lazily built on first use (§9: a
    /// documented, injectable collaborator — not a hidden global; callers
    /// who want a scoped lifetime construct their own via `new`).
    pub fn global() -> Arc<Self> {
        static GLOBAL: std::sync::OnceLock<Arc<WorkerPool>> = std::sync::OnceLock::new();
        GLOBAL.get_or_init(|| WorkerPool::new(num_cpus_hint())).clone()
    }

    pub fn submit(&self, job: impl FnOnce() + Send + 'static) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(Box::new(job));
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.sender = None;
        for handle in self.workers.get_mut().unwrap().drain(..) {
            let _ = handle.join();
        }
    }
}

fn num_cpus_hint() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

//! Fixed-size worker pool draining a shared FIFO of tasks, with a completion
//! barrier over everything submitted so far.

use crate::error::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Condvar, Mutex, RwLock};
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, warn, Span};

type Task = Box<dyn FnOnce() -> Result<()> + Send + 'static>;

struct Shared {
    /// `None` once the queue is shut down; dropping it disconnects the workers.
    sender: RwLock<Option<Sender<Task>>>,
    /// Submitted minus completed. Guarded separately from the channel.
    pending: Mutex<usize>,
    idle: Condvar,
    span: Span,
}

impl Shared {
    fn submit(&self, task: Task) {
        // Count first so a concurrent barrier can never observe zero while the task is queued.
        *self.pending.lock() += 1;
        let accepted = match self.sender.read().as_ref() {
            Some(tx) => tx.send(task).is_ok(),
            None => false,
        };
        if !accepted {
            warn!(parent: &self.span, "work queue is shut down, dropping task");
            self.finish_one();
        }
    }

    fn finish_one(&self) {
        let mut pending = self.pending.lock();
        *pending -= 1;
        if *pending == 0 {
            self.idle.notify_all();
        }
    }

    fn disconnect(&self) {
        self.sender.write().take();
    }
}

/// Cloneable submission handle, safe to move into tasks that schedule more work.
#[derive(Clone)]
pub struct QueueHandle {
    shared: Arc<Shared>,
}

impl QueueHandle {
    /// Enqueue `task` without waiting for a free worker.
    pub fn submit<F>(&self, task: F)
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.shared.submit(Box::new(task));
    }
}

/// A pool of `N` worker threads.
///
/// Tasks run in no particular order relative to each other. A task returning
/// `Err` or panicking is logged and the worker moves on to the next one.
pub struct WorkQueue {
    handle: QueueHandle,
    workers: Vec<JoinHandle<()>>,
}

impl WorkQueue {
    pub fn new(threads: usize) -> io::Result<Self> {
        Self::with_span(threads, Span::none())
    }

    /// Workers enter `span` around every task they run.
    pub fn with_span(threads: usize, span: Span) -> io::Result<Self> {
        let (tx, rx) = unbounded::<Task>();
        let shared = Arc::new(Shared {
            sender: RwLock::new(Some(tx)),
            pending: Mutex::new(0),
            idle: Condvar::new(),
            span,
        });
        let threads = threads.max(1);
        let mut queue = Self { handle: QueueHandle { shared: Arc::clone(&shared) }, workers: Vec::with_capacity(threads) };
        for id in 0..threads {
            let worker_shared = Arc::clone(&shared);
            let tasks = rx.clone();
            let spawned = thread::Builder::new()
                .name(format!("sift-worker-{id}"))
                .spawn(move || worker_loop(id, &tasks, &worker_shared));
            match spawned {
                Ok(handle) => queue.workers.push(handle),
                Err(e) => {
                    error!(parent: &shared.span, worker = id, error = %e, "failed to spawn worker");
                    // Drop stops the workers that did start.
                    return Err(e);
                }
            }
        }
        debug!(parent: &shared.span, threads, "work queue started");
        Ok(queue)
    }

    pub fn handle(&self) -> QueueHandle { self.handle.clone() }

    pub fn submit<F>(&self, task: F)
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.handle.submit(task);
    }

    pub fn size(&self) -> usize { self.workers.len() }

    /// Tasks submitted and not yet finished.
    pub fn pending(&self) -> usize { *self.handle.shared.pending.lock() }

    /// Block until every submitted task has finished, including tasks that
    /// were submitted by other tasks while waiting.
    pub fn await_completion(&self) {
        let shared = &self.handle.shared;
        let mut pending = shared.pending.lock();
        while *pending > 0 {
            shared.idle.wait(&mut pending);
        }
    }

    /// Let the workers drain the queue, then stop and join them.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let shared = &self.handle.shared;
        shared.disconnect();
        if self.workers.is_empty() {
            return;
        }
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                error!(parent: &shared.span, "worker thread exited abnormally");
            }
        }
        debug!(parent: &shared.span, "work queue stopped");
    }
}

impl Drop for WorkQueue {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Runs until the channel is disconnected and drained.
fn worker_loop(id: usize, tasks: &Receiver<Task>, shared: &Shared) {
    for task in tasks.iter() {
        let _entered = shared.span.enter();
        match panic::catch_unwind(AssertUnwindSafe(task)) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(worker = id, error = %e, "task failed"),
            Err(payload) => error!(worker = id, panic = panic_message(&*payload), "task panicked"),
        }
        shared.finish_one();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>")
}

/// Shared flag that long-running tasks poll between stages.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self { Self::default() }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

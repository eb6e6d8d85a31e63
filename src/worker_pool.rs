use std::any::Any;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::debug;

use crate::blocking_queue::BlockingQueue;
use crate::task_future::{self, TaskError, TaskFuture};

type Task = Box<dyn FnOnce() + Send>;

/// Fixed-size pool of OS threads executing submitted closures.
///
/// Tasks are handed to workers through a shared [`BlockingQueue`]; results
/// travel back through the [`TaskFuture`] returned by [`WorkerPool::submit`].
/// The pool makes no ordering promise between tasks - callers that need
/// ordered results must order the futures themselves.
pub struct WorkerPool {
    queue: Arc<BlockingQueue<Task>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Pool with one worker per available hardware execution unit.
    pub fn new() -> Self {
        Self::with_workers(default_worker_count())
    }

    /// Pool with an explicit worker count (clamped to at least one).
    pub fn with_workers(count: usize) -> Self {
        let queue = Arc::new(BlockingQueue::new());
        let workers = (0..count.max(1))
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || worker_loop(&queue))
            })
            .collect::<Vec<_>>();
        debug!("started worker pool with {} threads", workers.len());

        WorkerPool { queue, workers }
    }

    /// Queues `task` for execution on any idle worker and immediately
    /// returns the handle its result will arrive on.
    ///
    /// A panic inside `task` is captured and resolves the future to
    /// [`TaskError::Panicked`]; the worker thread survives. A future that
    /// is never waited on discards the captured outcome, so callers must
    /// drain every future they create.
    pub fn submit<F, R>(&self, task: F) -> TaskFuture<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (promise, future) = task_future::pair();
        self.queue.push(Box::new(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(task))
                .map_err(|cause| TaskError::Panicked(panic_message(cause.as_ref())));
            promise.fulfill(result);
        }));
        future
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Tasks currently waiting for a worker. Advisory snapshot.
    pub fn queued_tasks(&self) -> usize {
        self.queue.len()
    }
}

impl Drop for WorkerPool {
    /// Signals shutdown and joins every worker.
    ///
    /// Shutdown is prompt: tasks still queued when the pool drops are
    /// discarded, and their futures resolve to [`TaskError::Dropped`].
    /// Callers that queued work they care about must wait on those futures
    /// before letting the pool go.
    fn drop(&mut self) {
        self.queue.close();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new()
    }
}

fn worker_loop(queue: &BlockingQueue<Task>) {
    while let Some(task) = queue.pop_blocking() {
        task();
    }
}

fn panic_message(cause: &(dyn Any + Send)) -> String {
    if let Some(message) = cause.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = cause.downcast_ref::<String>() {
        message.clone()
    } else {
        "opaque panic payload".to_string()
    }
}

fn default_worker_count() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

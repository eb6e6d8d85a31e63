use std::mem;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

/// Why a task's result never materialized.
#[derive(Debug, Error, PartialEq)]
pub enum TaskError {
    #[error("task panicked: {0}")]
    Panicked(String),
    #[error("task was dropped before it could run")]
    Dropped,
}

enum Slot<T> {
    Pending,
    Ready(Result<T, TaskError>),
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn complete(&self, result: Result<T, TaskError>) {
        let mut slot = self.lock();
        if let Slot::Pending = *slot {
            *slot = Slot::Ready(result);
            self.ready.notify_one();
        }
    }
}

/// Consumer half of a single-producer/single-consumer completion pair.
///
/// The result is read exactly once: [`TaskFuture::wait`] consumes the
/// handle. Dropping an unread future silently discards whatever the task
/// produced, errors included.
pub struct TaskFuture<T> {
    shared: Arc<Shared<T>>,
}

/// Producer half. Fulfilled exactly once; a promise that goes out of scope
/// unfulfilled resolves its future to [`TaskError::Dropped`] so the waiting
/// consumer can never hang.
pub struct Promise<T> {
    shared: Arc<Shared<T>>,
}

/// Creates a connected promise/future pair.
pub fn pair<T>() -> (Promise<T>, TaskFuture<T>) {
    let shared = Arc::new(Shared {
        slot: Mutex::new(Slot::Pending),
        ready: Condvar::new(),
    });
    (
        Promise {
            shared: Arc::clone(&shared),
        },
        TaskFuture { shared },
    )
}

impl<T> Promise<T> {
    pub fn fulfill(self, result: Result<T, TaskError>) {
        self.shared.complete(result);
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        self.shared.complete(Err(TaskError::Dropped));
    }
}

impl<T> TaskFuture<T> {
    /// Blocks the calling thread until the producer fulfills the promise,
    /// then returns the task's outcome.
    pub fn wait(self) -> Result<T, TaskError> {
        let mut slot = self.shared.lock();
        loop {
            match mem::replace(&mut *slot, Slot::Pending) {
                Slot::Ready(result) => return result,
                Slot::Pending => {
                    slot = self
                        .shared
                        .ready
                        .wait(slot)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_fulfill_then_wait() {
        let (promise, future) = pair();
        promise.fulfill(Ok(13u32));
        assert_eq!(future.wait(), Ok(13));
    }

    #[test]
    fn test_wait_blocks_until_fulfilled() {
        let (promise, future) = pair();

        let producer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            promise.fulfill(Ok("done"));
        });

        assert_eq!(future.wait(), Ok("done"));
        producer.join().unwrap();
    }

    #[test]
    fn test_error_is_passed_through() {
        let (promise, future) = pair::<u32>();
        promise.fulfill(Err(TaskError::Panicked("boom".to_string())));
        assert_eq!(future.wait(), Err(TaskError::Panicked("boom".to_string())));
    }

    #[test]
    fn test_dropped_promise_resolves_the_future() {
        let (promise, future) = pair::<u32>();
        drop(promise);
        assert_eq!(future.wait(), Err(TaskError::Dropped));
    }

    #[test]
    fn test_fulfill_wins_over_drop() {
        let (promise, future) = pair();
        promise.fulfill(Ok(1u32));
        // the Drop impl ran at the end of fulfill and must not overwrite
        assert_eq!(future.wait(), Ok(1));
    }
}

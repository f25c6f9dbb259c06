use std::collections::VecDeque;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A result delivery waiting for the host thread.
pub type PendingCallback = Box<dyn FnOnce() + Send + 'static>;

/// Unbounded FIFO of pending callbacks: many producers, one draining thread.
#[derive(Default)]
pub struct CallbackQueue {
    pending: Mutex<VecDeque<PendingCallback>>,
}

impl CallbackQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // The lock is never held while a callback runs, so a poisoned queue
    // still holds consistent data.
    fn lock(&self) -> MutexGuard<'_, VecDeque<PendingCallback>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a callback. Safe from any thread; never blocks on the consumer.
    pub fn enqueue<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.lock().push_back(Box::new(callback));
    }

    /// Run every callback that was queued when the drain started, in order.
    ///
    /// Callbacks enqueued while draining (including by a callback) wait for
    /// the next drain. A panicking callback is logged and skipped. Returns the
    /// number of callbacks run.
    pub fn drain_once(&self) -> usize {
        let batch = std::mem::take(&mut *self.lock());
        let count = batch.len();
        for (idx, callback) in batch.into_iter().enumerate() {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(callback)) {
                tracing::error!(
                    callback = idx,
                    panic = panic_message(payload.as_ref()),
                    "callback panicked during drain"
                );
            }
        }
        count
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl fmt::Debug for CallbackQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackQueue")
            .field("pending", &self.len())
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn drains_in_fifo_order() {
        let queue = CallbackQueue::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for i in 0..5 {
            let seen = Arc::clone(&seen);
            queue.enqueue(move || seen.lock().unwrap().push(i));
        }
        assert_eq!(queue.len(), 5);
        assert_eq!(queue.drain_once(), 5);
        assert!(queue.is_empty());
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn empty_drain_returns_immediately() {
        let queue = CallbackQueue::new();
        assert_eq!(queue.drain_once(), 0);
    }

    #[test]
    fn callbacks_enqueued_during_drain_wait_for_next_drain() {
        let queue = Arc::new(CallbackQueue::new());
        let hits = Arc::new(Mutex::new(0));

        let inner_queue = Arc::clone(&queue);
        let inner_hits = Arc::clone(&hits);
        queue.enqueue(move || {
            let hits = Arc::clone(&inner_hits);
            inner_queue.enqueue(move || *hits.lock().unwrap() += 1);
        });

        assert_eq!(queue.drain_once(), 1);
        assert_eq!(*hits.lock().unwrap(), 0);
        assert_eq!(queue.drain_once(), 1);
        assert_eq!(*hits.lock().unwrap(), 1);
    }

    #[test]
    fn panicking_callback_does_not_stop_the_drain() {
        let queue = CallbackQueue::new();
        let ran = Arc::new(Mutex::new(false));
        queue.enqueue(|| panic!("host script error"));
        let flag = Arc::clone(&ran);
        queue.enqueue(move || *flag.lock().unwrap() = true);

        assert_eq!(queue.drain_once(), 2);
        assert!(*ran.lock().unwrap());
    }

    #[test]
    fn concurrent_producers_keep_their_own_order() {
        let queue = Arc::new(CallbackQueue::new());
        let seen = Arc::new(Mutex::new(Vec::new()));

        std::thread::scope(|scope| {
            for producer in 0..4 {
                let queue = Arc::clone(&queue);
                let seen = Arc::clone(&seen);
                scope.spawn(move || {
                    for seq in 0..100 {
                        let seen = Arc::clone(&seen);
                        queue.enqueue(move || seen.lock().unwrap().push((producer, seq)));
                    }
                });
            }
        });

        assert_eq!(queue.drain_once(), 400);
        let seen = seen.lock().unwrap();
        for producer in 0..4 {
            let order: Vec<_> = seen
                .iter()
                .filter(|(p, _)| *p == producer)
                .map(|(_, s)| *s)
                .collect();
            assert_eq!(order, (0..100).collect::<Vec<_>>());
        }
    }
}

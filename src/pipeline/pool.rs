use std::collections::VecDeque;
use std::sync::Mutex;
use std::thread;
use tracing::{debug, error};

/// Fixed-width pool of scoped threads draining a shared queue.
///
/// Width bounds the number of concurrent outbound requests for a run.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    width: usize,
}

impl WorkerPool {
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(1),
        }
    }

    /// Run `work` over every item and wait for all of them.
    ///
    /// A panicking item takes down only its worker; the survivors keep
    /// draining the queue. Returns the number of workers that panicked.
    pub fn run<T, F>(&self, items: Vec<T>, work: F) -> usize
    where
        T: Send,
        F: Fn(T) + Sync,
    {
        if items.is_empty() {
            return 0;
        }

        let threads = self.width.min(items.len());
        let queue = Mutex::new(VecDeque::from(items));

        thread::scope(|scope| {
            let handles: Vec<_> = (0..threads)
                .map(|worker| {
                    let queue = &queue;
                    let work = &work;
                    scope.spawn(move || loop {
                        let next = queue
                            .lock()
                            .unwrap_or_else(|poisoned| poisoned.into_inner())
                            .pop_front();
                        match next {
                            Some(item) => work(item),
                            None => {
                                debug!(worker, "queue drained");
                                break;
                            }
                        }
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|h| h.join())
                .filter(|joined| joined.is_err())
                .inspect(|_| error!("worker panicked; remaining items were left to the other workers"))
                .count()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn processes_every_item() {
        let sum = AtomicUsize::new(0);
        let panicked = WorkerPool::new(2).run((1..=10).collect(), |n: usize| {
            sum.fetch_add(n, Ordering::SeqCst);
        });
        assert_eq!(panicked, 0);
        assert_eq!(sum.load(Ordering::SeqCst), 55);
    }

    #[test]
    fn never_exceeds_width() {
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        WorkerPool::new(2).run((0..8).collect(), |_: usize| {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(5));
            active.fetch_sub(1, Ordering::SeqCst);
        });

        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn a_panicking_item_is_contained() {
        let done = AtomicUsize::new(0);
        let panicked = WorkerPool::new(2).run(vec![1, 2, 3, 4, 5, 6], |n: u32| {
            if n == 1 {
                panic!("boom");
            }
            done.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(panicked, 1);
        assert_eq!(done.load(Ordering::SeqCst), 5);
    }
}

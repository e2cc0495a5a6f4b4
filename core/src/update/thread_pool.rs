use parking_lot::{Condvar, Mutex};

/// Scoped worker pool that runs parallel update systems.
///
/// Tasks run on scoped threads, so they may borrow from the caller and are
/// joined before [`scope`](ThreadPool::scope) returns. At most
/// [`num_threads`](ThreadPool::num_threads) tasks run at once; spawning
/// beyond that blocks the spawning thread until a running task finishes.
///
/// # Example
///
/// ```
/// use catalyst_core::ThreadPool;
///
/// let pool = ThreadPool::new(2);
///
/// let mut squares = vec![0u32; 6];
/// pool.scope(|s| {
///     for (i, square) in squares.iter_mut().enumerate() {
///         s.spawn(move || *square = (i * i) as u32);
///     }
/// });
/// assert_eq!(squares, vec![0, 1, 4, 9, 16, 25]);
/// ```
#[derive(Debug)]
pub struct ThreadPool {
    num_threads: usize,
    permits: Permits,
}

impl ThreadPool {
    /// Pool running up to `num_threads` tasks at once, clamped to 1.
    pub fn new(num_threads: usize) -> Self {
        let num_threads = num_threads.max(1);
        Self {
            num_threads,
            permits: Permits::new(num_threads),
        }
    }

    /// One task per available core.
    pub fn default_threads() -> Self {
        Self::new(std::thread::available_parallelism().map_or(1, |n| n.get()))
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Run `f`, letting it spawn tasks, and join every task before returning.
    ///
    /// A panicking task re-raises its panic here. Tasks must not spawn into
    /// the scope they run in. Concurrent scopes on one pool share its limit.
    pub fn scope<'env, F, R>(&'env self, f: F) -> R
    where
        F: for<'scope> FnOnce(&Scope<'scope, 'env>) -> R,
    {
        std::thread::scope(|inner| {
            f(&Scope {
                inner,
                permits: &self.permits,
            })
        })
    }
}

impl Default for ThreadPool {
    fn default() -> Self {
        Self::default_threads()
    }
}

/// Counting gate bounding the number of running tasks.
#[derive(Debug)]
struct Permits {
    available: Mutex<usize>,
    released: Condvar,
}

impl Permits {
    fn new(count: usize) -> Self {
        Self {
            available: Mutex::new(count),
            released: Condvar::new(),
        }
    }

    fn acquire(&self) -> Permit<'_> {
        let mut available = self.available.lock();
        while *available == 0 {
            self.released.wait(&mut available);
        }
        *available -= 1;
        Permit { permits: self }
    }
}

/// Returned to the gate on drop, including when the task panics.
struct Permit<'a> {
    permits: &'a Permits,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        *self.permits.available.lock() += 1;
        self.permits.released.notify_one();
    }
}

/// Handle for spawning tasks inside [`ThreadPool::scope`].
pub struct Scope<'scope, 'env: 'scope> {
    inner: &'scope std::thread::Scope<'scope, 'env>,
    permits: &'scope Permits,
}

impl<'scope, 'env> Scope<'scope, 'env> {
    /// Run `f` on a scoped thread once a slot is free.
    pub fn spawn<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'scope,
    {
        let permit = self.permits.acquire();
        self.inner.spawn(move || {
            let _permit = permit;
            f();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_every_task_runs() {
        let pool = ThreadPool::new(4);
        let finished = AtomicUsize::new(0);
        pool.scope(|s| {
            for _ in 0..10 {
                s.spawn(|| {
                    finished.fetch_add(1, Ordering::Relaxed);
                });
            }
        });
        assert_eq!(finished.load(Ordering::Relaxed), 10);
    }

    #[test]
    fn test_concurrency_is_bounded() {
        let pool = ThreadPool::new(2);
        let running = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        pool.scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(2));
                    running.fetch_sub(1, Ordering::SeqCst);
                });
            }
        });
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(running.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_single_thread_runs_in_spawn_order() {
        let pool = ThreadPool::new(1);
        let order = Mutex::new(Vec::new());
        pool.scope(|s| {
            for i in 0..5 {
                let order = &order;
                s.spawn(move || order.lock().push(i));
            }
        });
        assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_scope_returns_value() {
        assert_eq!(ThreadPool::new(1).scope(|_| 7), 7);
    }

    #[test]
    fn test_thread_count_is_clamped() {
        assert_eq!(ThreadPool::new(0).num_threads(), 1);
        assert!(ThreadPool::default().num_threads() >= 1);
    }
}

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::MAXIMUM_SPIN_COUNT;

struct SignalState {
    set: AtomicBool,
    spin_count: u32,
    parked: Mutex<()>,
    changed: Condvar,
}

/// A resettable binary event.
///
/// One side calls [`set`](Self::set), any number of threads call
/// [`wait`](Self::wait). Waiting spins for the configured count and then
/// blocks on a condition variable. Clones share the same state.
///
/// # Example
///
/// ```
/// use catalyst_core::sync::Signal;
///
/// let signal = Signal::new(false);
/// let remote = signal.clone();
/// std::thread::spawn(move || remote.set());
/// signal.wait();
/// assert!(signal.is_set());
/// ```
#[derive(Clone)]
pub struct Signal {
    state: Arc<SignalState>,
}

impl Signal {
    /// Creates a signal in the given state using [`MAXIMUM_SPIN_COUNT`].
    pub fn new(set: bool) -> Self {
        Self::with_spin_count(set, MAXIMUM_SPIN_COUNT)
    }

    /// Creates a signal that spins `spin_count` times before a waiter parks.
    pub fn with_spin_count(set: bool, spin_count: u32) -> Self {
        Self {
            state: Arc::new(SignalState {
                set: AtomicBool::new(set),
                spin_count,
                parked: Mutex::new(()),
                changed: Condvar::new(),
            }),
        }
    }

    /// Sets the signal and wakes every waiter.
    pub fn set(&self) {
        self.state.set.store(true, Ordering::SeqCst);
        let _parked = self.state.parked.lock();
        self.state.changed.notify_all();
    }

    /// Clears the signal.
    pub fn reset(&self) {
        self.state.set.store(false, Ordering::SeqCst);
    }

    /// Returns `true` if the signal is set (non-blocking).
    pub fn is_set(&self) -> bool {
        self.state.set.load(Ordering::Acquire)
    }

    /// Blocks until the signal is set. Returns immediately if it already is.
    pub fn wait(&self) {
        if self.spin() {
            return;
        }

        let mut parked = self.state.parked.lock();
        while !self.state.set.load(Ordering::SeqCst) {
            self.state.changed.wait(&mut parked);
        }
    }

    /// Blocks until the signal is set or `timeout` elapses.
    ///
    /// Returns `true` if the signal was set, `false` on timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        if self.spin() {
            return true;
        }

        let mut parked = self.state.parked.lock();
        while !self.state.set.load(Ordering::SeqCst) {
            if self
                .state
                .changed
                .wait_until(&mut parked, deadline)
                .timed_out()
            {
                return self.state.set.load(Ordering::SeqCst);
            }
        }
        true
    }

    /// Returns `true` if both values share the same underlying state.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    fn spin(&self) -> bool {
        for _ in 0..self.state.spin_count {
            if self.state.set.load(Ordering::Acquire) {
                return true;
            }
            std::hint::spin_loop();
        }
        self.state.set.load(Ordering::Acquire)
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("set", &self.is_set())
            .field("spin_count", &self.state.spin_count)
            .finish()
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new(false)
    }
}

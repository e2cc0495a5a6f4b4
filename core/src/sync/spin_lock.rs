use std::cell::UnsafeCell;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::{Condvar, Mutex};

use super::MAXIMUM_SPIN_COUNT;

/// A mutual-exclusion lock that spins before blocking.
///
/// `lock()` retries `compare_exchange_weak` on an atomic flag up to the
/// configured spin count. If the lock is still held after that, the thread
/// parks on a condition variable and is woken by the next unlock. Uncontended
/// and briefly contended locks never touch the OS.
///
/// # Example
///
/// ```
/// use catalyst_core::sync::SpinLock;
///
/// let lock = SpinLock::new(Vec::new());
/// lock.lock().push(42);
/// assert_eq!(*lock.lock(), vec![42]);
/// ```
pub struct SpinLock<T> {
    locked: AtomicBool,
    spin_count: u32,
    waiters: AtomicUsize,
    parked: Mutex<()>,
    released: Condvar,
    data: UnsafeCell<T>,
}

// SAFETY: Access to `data` is serialized by the `locked` flag.
// `T: Send` is required because the data can be accessed from different threads.
unsafe impl<T: Send> Send for SpinLock<T> {}
unsafe impl<T: Send> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
    /// Creates a new unlocked lock using [`MAXIMUM_SPIN_COUNT`].
    pub fn new(value: T) -> Self {
        Self::with_spin_count(value, MAXIMUM_SPIN_COUNT)
    }

    /// Creates a new unlocked lock that spins `spin_count` times before parking.
    ///
    /// A spin count of 0 parks immediately on contention.
    pub fn with_spin_count(value: T, spin_count: u32) -> Self {
        Self {
            locked: AtomicBool::new(false),
            spin_count,
            waiters: AtomicUsize::new(0),
            parked: Mutex::new(()),
            released: Condvar::new(),
            data: UnsafeCell::new(value),
        }
    }

    /// Acquires the lock, spinning and then blocking until it is available.
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        loop {
            let mut spins = 0;
            while spins < self.spin_count {
                if self.try_acquire() {
                    return self.guard();
                }
                spins += 1;
                std::hint::spin_loop();
            }

            if self.try_acquire() {
                return self.guard();
            }

            let mut parked = self.parked.lock();
            self.waiters.fetch_add(1, Ordering::SeqCst);
            while self.locked.load(Ordering::SeqCst) {
                self.released.wait(&mut parked);
            }
            self.waiters.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Attempts to acquire the lock without spinning or blocking.
    pub fn try_lock(&self) -> Option<SpinLockGuard<'_, T>> {
        self.locked
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
            .ok()
            .map(|_| self.guard())
    }

    /// Returns `true` if some thread currently holds the lock.
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }

    /// Returns the number of spin iterations before parking.
    pub fn spin_count(&self) -> u32 {
        self.spin_count
    }

    /// Consumes the lock and returns the inner value.
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }

    /// Returns a mutable reference to the inner value.
    ///
    /// Since this requires `&mut self`, no locking is needed.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    fn try_acquire(&self) -> bool {
        self.locked
            .compare_exchange_weak(false, true, Ordering::SeqCst, Ordering::Relaxed)
            .is_ok()
    }

    fn guard(&self) -> SpinLockGuard<'_, T> {
        SpinLockGuard {
            lock: self,
            _not_send: PhantomData,
        }
    }

    fn unlock(&self) {
        self.locked.store(false, Ordering::SeqCst);
        if self.waiters.load(Ordering::SeqCst) > 0 {
            let _parked = self.parked.lock();
            self.released.notify_one();
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for SpinLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.try_lock() {
            Some(guard) => f.debug_struct("SpinLock").field("data", &*guard).finish(),
            None => f
                .debug_struct("SpinLock")
                .field("data", &"<locked>")
                .finish(),
        }
    }
}

impl<T: Default> Default for SpinLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// RAII guard returned by [`SpinLock::lock`]. Releases the lock on drop.
pub struct SpinLockGuard<'a, T> {
    lock: &'a SpinLock<T>,
    // Guards must be released on the thread that acquired them.
    _not_send: PhantomData<*const ()>,
}

// SAFETY: Sharing the guard only hands out `&T`, which is fine when `T: Sync`.
unsafe impl<T: Sync> Sync for SpinLockGuard<'_, T> {}

impl<T> Deref for SpinLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: The guard proves exclusive ownership of the lock.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for SpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: The guard proves exclusive ownership of the lock.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for SpinLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.unlock();
    }
}

impl<T: fmt::Debug> fmt::Debug for SpinLockGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

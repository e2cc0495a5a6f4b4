//! GPU synchronization primitives.
//!
//! Fences synchronize the CPU with the GPU across frames; semaphores order
//! GPU work within a frame (image available → render passes → present).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use catalyst_core::sync::{MAXIMUM_SPIN_COUNT, Signal};

static NEXT_SYNC_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_SYNC_ID.fetch_add(1, Ordering::Relaxed)
}

/// GPU semaphore for ordering operations within a frame.
///
/// One operation signals the semaphore when complete, the next waits on it
/// before starting. The CPU never waits on a semaphore; the pending flag
/// only lets backends validate the chain.
#[derive(Debug, Clone)]
pub struct Semaphore {
    id: u64,
    pending: Arc<AtomicBool>,
}

impl Semaphore {
    /// Create a new unsignaled semaphore.
    pub fn new() -> Self {
        Self {
            id: next_id(),
            pending: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Unique identifier for debugging.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Mark the semaphore as signaled. Called by backends.
    pub fn signal(&self) {
        self.pending.store(true, Ordering::Release);
    }

    /// Consume a pending signal. Returns false if nothing signaled it.
    pub fn consume(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    /// Returns true if a signal is pending.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

impl Default for Semaphore {
    fn default() -> Self {
        Self::new()
    }
}

/// Status of a fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceStatus {
    /// The fence has not yet been signaled.
    Unsignaled,
    /// The fence has been signaled (GPU work complete).
    Signaled,
}

/// CPU-GPU synchronization primitive.
///
/// The GPU (or the backend on its behalf) signals the fence when the work
/// submitted with it completes. Waiting spins briefly and then blocks, so a
/// slow GPU does not burn a CPU core. Clones share the same state.
///
/// # Example
///
/// ```
/// use catalyst_graphics::Fence;
///
/// let fence = Fence::new(false);
/// let gpu = fence.clone();
/// std::thread::spawn(move || gpu.signal());
/// fence.wait();
/// assert!(fence.is_signaled());
/// ```
#[derive(Debug, Clone)]
pub struct Fence {
    id: u64,
    signal: Signal,
}

impl Fence {
    /// Create a fence using the default spin count.
    pub fn new(signaled: bool) -> Self {
        Self::with_spin_count(signaled, MAXIMUM_SPIN_COUNT)
    }

    /// Create a fence that spins `spin_count` times before blocking.
    pub fn with_spin_count(signaled: bool, spin_count: u32) -> Self {
        Self {
            id: next_id(),
            signal: Signal::with_spin_count(signaled, spin_count),
        }
    }

    /// Unique identifier for debugging.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Check the current status of the fence.
    pub fn status(&self) -> FenceStatus {
        if self.signal.is_set() {
            FenceStatus::Signaled
        } else {
            FenceStatus::Unsignaled
        }
    }

    /// Check if the fence is signaled (non-blocking).
    pub fn is_signaled(&self) -> bool {
        self.status() == FenceStatus::Signaled
    }

    /// Wait for the fence to be signaled. Returns immediately if it already is.
    pub fn wait(&self) {
        self.signal.wait();
    }

    /// Wait for the fence with a timeout.
    ///
    /// Returns `true` if the fence was signaled, `false` if the timeout elapsed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.signal.wait_timeout(timeout)
    }

    /// Reset the fence to the unsignaled state.
    ///
    /// Must only be called when no GPU work is pending on this fence.
    pub fn reset(&self) {
        self.signal.reset();
    }

    /// Signal the fence. Called by backends when the GPU work completes.
    pub fn signal(&self) {
        self.signal.set();
    }
}

impl Default for Fence {
    fn default() -> Self {
        Self::new(false)
    }
}

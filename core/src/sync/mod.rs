//! Spin-then-block synchronization primitives.
//!
//! Short critical sections and GPU fences are usually released within a few
//! hundred cycles, so both primitives first spin on an atomic and only park
//! the thread on a condition variable once the spin budget is used up.
//!
//! - [`SpinLock`] - Mutual exclusion around a value
//! - [`Signal`] - Resettable binary event that threads can wait on

mod signal;
mod spin_lock;

pub use signal::Signal;
pub use spin_lock::{SpinLock, SpinLockGuard};

/// Number of spin iterations before a waiting thread parks.
pub const MAXIMUM_SPIN_COUNT: u32 = 1024;

//! # Catalyst Engine Core
//!
//! Engine-wide building blocks shared by the Catalyst subsystems.
//!
//! ## Overview
//!
//! - [`update`] - Fixed update phases and the scheduler that runs systems in them
//! - [`sync`] - Spin-then-block lock and signal primitives
//! - [`profiling`] - Optional Tracy instrumentation macros

pub mod profiling;
pub mod sync;
pub mod update;

pub use sync::{MAXIMUM_SPIN_COUNT, Signal, SpinLock, SpinLockGuard};
pub use update::{SystemExecution, ThreadPool, UpdateContext, UpdatePhase, UpdateScheduler};

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the core subsystem.
pub fn init() {
    log::info!("Catalyst Core v{} initialized", VERSION);
}

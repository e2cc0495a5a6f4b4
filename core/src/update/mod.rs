//! Update phases and the scheduler that drives them.
//!
//! The engine frame is split into fixed, named phases that run in order:
//!
//! ```text
//! Pre → Input → Gameplay → UserInterface → Physics → PreRender → Render → Post
//! ```
//!
//! Systems register into one phase and declare whether they must run on the
//! main thread or may run on a worker thread. Within a phase, parallel systems
//! run concurrently with the main-thread systems; the phase ends only when all
//! of them have returned.

mod phase;
mod scheduler;
mod thread_pool;

pub use phase::UpdatePhase;
pub use scheduler::{SystemExecution, UpdateContext, UpdateScheduler};
pub use thread_pool::{Scope, ThreadPool};

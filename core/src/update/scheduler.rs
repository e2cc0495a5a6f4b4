use std::time::Duration;

use super::{ThreadPool, UpdatePhase};
use crate::profile_scope;

/// Where a system is allowed to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemExecution {
    /// Always runs on the thread that calls [`UpdateScheduler::update`].
    MainThread,
    /// May run on a worker thread, concurrently with other systems of the phase.
    Parallel,
}

/// Per-invocation data handed to every system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateContext {
    /// Phase currently running.
    pub phase: UpdatePhase,
    /// Number of completed frames before this one.
    pub frame: u64,
    /// Time since the previous frame.
    pub delta: Duration,
}

type MainThreadSystem = Box<dyn FnMut(&UpdateContext)>;
type ParallelSystem = Box<dyn FnMut(&UpdateContext) + Send>;

struct Registered<S> {
    name: String,
    system: S,
}

/// Runs registered systems phase by phase.
///
/// The scheduler is owned by the main thread. Main-thread systems may capture
/// non-`Send` state; parallel systems must be `Send`.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use catalyst_core::{UpdatePhase, UpdateScheduler};
///
/// let mut scheduler = UpdateScheduler::new();
/// scheduler.register_main_thread("rendering", UpdatePhase::Render, |ctx| {
///     assert_eq!(ctx.phase, UpdatePhase::Render);
/// });
/// scheduler.update(Duration::from_millis(16));
/// assert_eq!(scheduler.frame(), 1);
/// ```
pub struct UpdateScheduler {
    main_thread: [Vec<Registered<MainThreadSystem>>; UpdatePhase::COUNT],
    parallel: [Vec<Registered<ParallelSystem>>; UpdatePhase::COUNT],
    pool: ThreadPool,
    frame: u64,
}

impl UpdateScheduler {
    /// Creates a scheduler backed by a pool sized to the available cores.
    pub fn new() -> Self {
        Self::with_thread_pool(ThreadPool::default_threads())
    }

    /// Creates a scheduler using the given worker pool.
    pub fn with_thread_pool(pool: ThreadPool) -> Self {
        Self {
            main_thread: std::array::from_fn(|_| Vec::new()),
            parallel: std::array::from_fn(|_| Vec::new()),
            pool,
            frame: 0,
        }
    }

    /// Registers a system that must run on the main thread.
    pub fn register_main_thread<F>(
        &mut self,
        name: impl Into<String>,
        phase: UpdatePhase,
        system: F,
    ) where
        F: FnMut(&UpdateContext) + 'static,
    {
        let name = name.into();
        log::debug!("Registered main-thread system '{}' in {}", name, phase);
        self.main_thread[phase.index()].push(Registered {
            name,
            system: Box::new(system),
        });
    }

    /// Registers a system that may run on a worker thread.
    pub fn register_parallel<F>(&mut self, name: impl Into<String>, phase: UpdatePhase, system: F)
    where
        F: FnMut(&UpdateContext) + Send + 'static,
    {
        let name = name.into();
        log::debug!("Registered parallel system '{}' in {}", name, phase);
        self.parallel[phase.index()].push(Registered {
            name,
            system: Box::new(system),
        });
    }

    /// Runs every system of one phase and waits for all of them.
    pub fn run_phase(&mut self, phase: UpdatePhase, delta: Duration) {
        profile_scope!("update_phase");

        let context = UpdateContext {
            phase,
            frame: self.frame,
            delta,
        };
        let context = &context;
        let parallel = &mut self.parallel[phase.index()];
        let main_thread = &mut self.main_thread[phase.index()];

        if parallel.is_empty() {
            for registered in main_thread.iter_mut() {
                (registered.system)(context);
            }
            return;
        }

        self.pool.scope(|s| {
            for registered in parallel {
                s.spawn(move || (registered.system)(context));
            }
            for registered in main_thread {
                (registered.system)(context);
            }
        });
    }

    /// Runs all phases in order and advances the frame counter.
    pub fn update(&mut self, delta: Duration) {
        for phase in UpdatePhase::ALL {
            self.run_phase(phase, delta);
        }
        self.frame += 1;
        log::trace!("Update frame {} complete", self.frame);
    }

    /// Number of completed frames.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Names and execution modes of the systems registered in `phase`.
    pub fn systems(&self, phase: UpdatePhase) -> Vec<(&str, SystemExecution)> {
        let main_thread = self.main_thread[phase.index()]
            .iter()
            .map(|r| (r.name.as_str(), SystemExecution::MainThread));
        let parallel = self.parallel[phase.index()]
            .iter()
            .map(|r| (r.name.as_str(), SystemExecution::Parallel));
        main_thread.chain(parallel).collect()
    }

    /// Total number of registered systems.
    pub fn system_count(&self) -> usize {
        self.main_thread.iter().map(Vec::len).sum::<usize>()
            + self.parallel.iter().map(Vec::len).sum::<usize>()
    }
}

impl Default for UpdateScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_phases_run_in_order() {
        let mut scheduler = UpdateScheduler::with_thread_pool(ThreadPool::new(2));
        let order = Rc::new(RefCell::new(Vec::new()));

        for phase in UpdatePhase::ALL.iter().rev() {
            let order = Rc::clone(&order);
            scheduler.register_main_thread(phase.name(), *phase, move |ctx| {
                order.borrow_mut().push(ctx.phase);
            });
        }

        scheduler.update(Duration::ZERO);
        assert_eq!(*order.borrow(), UpdatePhase::ALL.to_vec());
    }

    #[test]
    fn test_parallel_systems_finish_within_phase() {
        let mut scheduler = UpdateScheduler::with_thread_pool(ThreadPool::new(4));
        let counter = Arc::new(AtomicU32::new(0));

        for i in 0..4 {
            let counter = Arc::clone(&counter);
            scheduler.register_parallel(format!("worker_{i}"), UpdatePhase::Physics, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        let observed = Rc::new(RefCell::new(0));
        {
            let counter = Arc::clone(&counter);
            let observed = Rc::clone(&observed);
            scheduler.register_main_thread("after_physics", UpdatePhase::PreRender, move |_| {
                *observed.borrow_mut() = counter.load(Ordering::SeqCst);
            });
        }

        scheduler.update(Duration::from_millis(16));
        assert_eq!(*observed.borrow(), 4);
    }

    #[test]
    fn test_context_carries_frame_and_delta() {
        let mut scheduler = UpdateScheduler::with_thread_pool(ThreadPool::new(1));
        let seen = Rc::new(RefCell::new(Vec::new()));
        {
            let seen = Rc::clone(&seen);
            scheduler.register_main_thread("frame_recorder", UpdatePhase::Post, move |ctx| {
                seen.borrow_mut().push((ctx.frame, ctx.delta));
            });
        }

        scheduler.update(Duration::from_millis(5));
        scheduler.update(Duration::from_millis(7));

        assert_eq!(
            *seen.borrow(),
            vec![(0, Duration::from_millis(5)), (1, Duration::from_millis(7))]
        );
        assert_eq!(scheduler.frame(), 2);
    }

    #[test]
    fn test_systems_listing() {
        let mut scheduler = UpdateScheduler::with_thread_pool(ThreadPool::new(1));
        scheduler.register_main_thread("render", UpdatePhase::Render, |_| {});
        scheduler.register_parallel("culling", UpdatePhase::PreRender, |_| {});

        assert_eq!(scheduler.system_count(), 2);
        assert_eq!(
            scheduler.systems(UpdatePhase::Render),
            vec![("render", SystemExecution::MainThread)]
        );
        assert_eq!(
            scheduler.systems(UpdatePhase::PreRender),
            vec![("culling", SystemExecution::Parallel)]
        );
        assert!(scheduler.systems(UpdatePhase::Input).is_empty());
    }
}

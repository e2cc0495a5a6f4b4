use std::time::Duration;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use catalyst_core::{Signal, SpinLock, ThreadPool, UpdatePhase, UpdateScheduler};

// ---------------------------------------------------------------------------
// Synchronization
// ---------------------------------------------------------------------------

fn bench_spin_lock_uncontended(c: &mut Criterion) {
    let lock = SpinLock::new(0u64);
    c.bench_function("spin_lock_uncontended", |b| {
        b.iter(|| {
            *lock.lock() += 1;
            black_box(&lock);
        });
    });
}

fn bench_signal_set_wait(c: &mut Criterion) {
    let signal = Signal::default();
    c.bench_function("signal_set_wait_reset", |b| {
        b.iter(|| {
            signal.set();
            signal.wait();
            signal.reset();
        });
    });
}

// ---------------------------------------------------------------------------
// Update scheduling
// ---------------------------------------------------------------------------

fn bench_update_main_thread_only(c: &mut Criterion) {
    let mut scheduler = UpdateScheduler::with_thread_pool(ThreadPool::new(1));
    for phase in UpdatePhase::ALL {
        scheduler.register_main_thread(phase.name(), phase, |ctx| {
            black_box(ctx.frame);
        });
    }

    c.bench_function("update_8_phases_main_thread", |b| {
        b.iter(|| scheduler.update(black_box(Duration::from_millis(16))));
    });
}

criterion_group!(
    benches,
    bench_spin_lock_uncontended,
    bench_signal_set_wait,
    bench_update_main_thread_only,
);
criterion_main!(benches);

//! Deferred destruction of native objects.
//!
//! The GPU runs one to three frames behind the CPU, so a native object can't
//! be destroyed when its handle is released: a frame still in flight may
//! read it. Destroyed natives are parked on the queue of the frame slot that
//! was current at release time and only handed to the backend once that
//! slot's fence has been waited on again.
//!
//! ```text
//! destroy(handle) during slot 1:
//!   slot 0: [ ]
//!   slot 1: [native]   ◄── queued
//!   slot 2: [ ]
//!
//! next begin_frame() that reuses slot 1:
//!   wait(fence[1]) ──► release_slot(1) ──► backend.destroy(native)
//! ```

use catalyst_core::SpinLock;

use crate::backend::{GpuBackend, NativeHandle};

/// Per-frame-slot queues of natives pending destruction.
///
/// Each queue is held only for a push or a drain, so a [`SpinLock`] guards it.
pub struct DeferredDestructor {
    queues: Vec<SpinLock<Vec<NativeHandle>>>,
}

impl std::fmt::Debug for DeferredDestructor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredDestructor")
            .field("slots", &self.queues.len())
            .field("pending_count", &self.pending_count())
            .finish()
    }
}

impl DeferredDestructor {
    /// Create queues for `frames_in_flight` slots.
    pub fn new(frames_in_flight: usize) -> Self {
        assert!(frames_in_flight > 0, "frames_in_flight must be at least 1");
        Self {
            queues: (0..frames_in_flight).map(|_| SpinLock::new(Vec::new())).collect(),
        }
    }

    /// Queue a native for destruction once `slot` is reused.
    pub fn queue(&self, slot: usize, native: NativeHandle) {
        log::trace!("Deferring destruction of {:?} to slot {}", native, slot);
        self.queues[slot % self.queues.len()].lock().push(native);
    }

    /// Destroy everything queued on `slot`.
    ///
    /// Call only after the slot's fence has been waited on. Returns the number
    /// of natives destroyed.
    pub fn release_slot(&self, slot: usize, backend: &dyn GpuBackend) -> usize {
        let natives: Vec<_> = self.queues[slot % self.queues.len()]
            .lock()
            .drain(..)
            .collect();
        for &native in &natives {
            backend.destroy(native);
        }
        if !natives.is_empty() {
            log::trace!("Released {} deferred natives on slot {}", natives.len(), slot);
        }
        natives.len()
    }

    /// Destroy everything on every slot.
    ///
    /// Call only when the device is idle.
    pub fn flush_all(&self, backend: &dyn GpuBackend) -> usize {
        (0..self.queues.len())
            .map(|slot| self.release_slot(slot, backend))
            .sum()
    }

    /// Number of natives pending destruction.
    pub fn pending_count(&self) -> usize {
        self.queues.iter().map(|q| q.lock().len()).sum()
    }

    /// Number of natives pending on one slot.
    pub fn pending_on(&self, slot: usize) -> usize {
        self.queues[slot % self.queues.len()].lock().len()
    }
}

//! Frame-in-flight synchronization.
//!
//! [`FrameSyncState`] rotates through N frame slots. Each slot owns the
//! fence that tells the CPU when the GPU has finished with the slot's command
//! buffers and resources, and the two semaphores that chain the GPU work of
//! one frame:
//!
//! ```text
//! acquire ──signal──► image_available ──wait──► submit(passes)
//!                                                  │
//!                     render_finished ◄──signal────┘
//!                            │
//!                          wait
//!                            ▼
//!                         present
//! ```
//!
//! With 2 frames in flight, the CPU records frame N+1 while the GPU executes
//! frame N:
//!
//! ```text
//! Slot 0: [Frame 0] ──► [Frame 2] ──► [Frame 4] ──►
//! Slot 1: [Frame 1] ──► [Frame 3] ──► [Frame 5] ──►
//! ```
//!
//! [`begin_frame`](FrameSyncState::begin_frame) waits on the fence of the
//! slot about to be reused before advancing the current framebuffer index,
//! so a slot is never recorded into while the GPU still reads it.

mod sync;

pub use sync::{Fence, FenceStatus, Semaphore};

use std::time::{Duration, Instant};

/// Upper bound on frames in flight.
pub const MAX_FRAMES_IN_FLIGHT: usize = 3;

/// Synchronization objects of one frame-in-flight slot.
#[derive(Debug)]
pub struct FrameSlot {
    fence: Fence,
    image_available: Semaphore,
    render_finished: Semaphore,
}

impl FrameSlot {
    fn new(spin_count: u32) -> Self {
        Self {
            // Unused slots are ready immediately.
            fence: Fence::with_spin_count(true, spin_count),
            image_available: Semaphore::new(),
            render_finished: Semaphore::new(),
        }
    }

    /// Fence signaled when the GPU finishes this slot's work.
    pub fn fence(&self) -> &Fence {
        &self.fence
    }

    /// Semaphore signaled when the swapchain image is ready.
    pub fn image_available(&self) -> &Semaphore {
        &self.image_available
    }

    /// Semaphore signaled when all render passes of the frame finished.
    pub fn render_finished(&self) -> &Semaphore {
        &self.render_finished
    }
}

/// Per-slot fences and semaphores plus the current framebuffer index.
///
/// # Thread Safety
///
/// `FrameSyncState` is owned by the render thread.
#[derive(Debug)]
pub struct FrameSyncState {
    slots: Vec<FrameSlot>,
    current_slot: usize,
    frame_count: u64,
}

impl FrameSyncState {
    /// Create the state for `frames_in_flight` slots.
    ///
    /// # Panics
    ///
    /// Panics if `frames_in_flight` is 0.
    pub fn new(frames_in_flight: usize, spin_count: u32) -> Self {
        assert!(frames_in_flight > 0, "frames_in_flight must be at least 1");

        Self {
            slots: (0..frames_in_flight)
                .map(|_| FrameSlot::new(spin_count))
                .collect(),
            current_slot: 0,
            frame_count: 0,
        }
    }

    /// Begin a new frame.
    ///
    /// Waits for the fence of the slot about to be reused, resets it, and
    /// advances the current framebuffer index to that slot. Returns the index.
    pub fn begin_frame(&mut self) -> usize {
        let next = self.next_slot();
        self.slots[next].fence.wait();
        self.enter_slot(next)
    }

    /// Like [`begin_frame`](Self::begin_frame), but gives up after `timeout`.
    ///
    /// Returns `None` (and leaves the index unchanged) if the slot's fence
    /// did not signal in time.
    pub fn begin_frame_timeout(&mut self, timeout: Duration) -> Option<usize> {
        let next = self.next_slot();
        if !self.slots[next].fence.wait_timeout(timeout) {
            return None;
        }
        Some(self.enter_slot(next))
    }

    /// Release the current slot without submitting any GPU work.
    ///
    /// Used when a frame is abandoned after [`begin_frame`](Self::begin_frame),
    /// so the slot's fence does not stay unsignaled forever.
    pub fn abandon_frame(&mut self) {
        log::trace!(
            "Abandon frame {} (slot {})",
            self.frame_count,
            self.current_slot
        );
        self.slots[self.current_slot].fence.signal();
    }

    /// Index of the slot the current frame records into.
    pub fn current_frame_index(&self) -> usize {
        self.current_slot
    }

    /// Synchronization objects of the current slot.
    pub fn current(&self) -> &FrameSlot {
        &self.slots[self.current_slot]
    }

    /// Synchronization objects of a given slot.
    pub fn slot(&self, index: usize) -> &FrameSlot {
        assert!(index < self.slots.len(), "Invalid slot index");
        &self.slots[index]
    }

    /// Number of frame slots.
    pub fn frames_in_flight(&self) -> usize {
        self.slots.len()
    }

    /// Total number of frames started.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Wait for all in-flight GPU work to complete.
    pub fn wait_idle(&self) {
        log::trace!("Waiting for GPU idle ({} slots)", self.slots.len());
        for slot in &self.slots {
            slot.fence.wait();
        }
    }

    /// Wait for all in-flight GPU work, giving up after `timeout` in total.
    pub fn wait_idle_timeout(&self, timeout: Duration) -> bool {
        let start = Instant::now();
        for slot in &self.slots {
            let elapsed = start.elapsed();
            if elapsed >= timeout || !slot.fence.wait_timeout(timeout - elapsed) {
                return false;
            }
        }
        true
    }

    /// Check if a slot's fence is signaled (non-blocking).
    pub fn is_slot_ready(&self, index: usize) -> bool {
        self.slot(index).fence.is_signaled()
    }

    /// Check if all slots are ready (non-blocking).
    pub fn is_idle(&self) -> bool {
        self.slots.iter().all(|slot| slot.fence.is_signaled())
    }

    fn next_slot(&self) -> usize {
        if self.frame_count == 0 {
            0
        } else {
            (self.current_slot + 1) % self.slots.len()
        }
    }

    fn enter_slot(&mut self, slot: usize) -> usize {
        self.slots[slot].fence.reset();
        self.current_slot = slot;
        self.frame_count += 1;
        log::trace!("Begin frame {} (slot {})", self.frame_count, slot);
        slot
    }
}

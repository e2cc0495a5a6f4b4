//! Profiling support.
//!
//! Re-exports the Tracy macros from [`catalyst_core::profiling`] and adds
//! [`FrameTimings`], the CPU time the rendering system spent on each pass of
//! the last completed frame.
//!
//! ```ignore
//! use catalyst_graphics::profiling::{frame_mark, profile_scope};
//!
//! fn record() {
//!     profile_scope!("record");
//!     // ...
//!     frame_mark!();
//! }
//! ```

pub use catalyst_core::profiling::*;

use std::time::Duration;

use crate::pass::RenderPassStage;

/// CPU time spent recording one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassTiming {
    /// Stage of the pass.
    pub stage: RenderPassStage,
    /// Performance name of the pass.
    pub name: String,
    /// Time spent in [`RenderPass::record`](crate::pass::RenderPass::record).
    pub duration: Duration,
}

/// CPU timings of one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameTimings {
    frame: u64,
    total: Duration,
    passes: Vec<PassTiming>,
}

impl FrameTimings {
    /// Empty timings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start collecting timings for `frame`.
    pub fn begin(&mut self, frame: u64) {
        self.frame = frame;
        self.total = Duration::ZERO;
        self.passes.clear();
    }

    /// Record the time a pass took.
    pub fn record_pass(&mut self, stage: RenderPassStage, name: &str, duration: Duration) {
        self.passes.push(PassTiming {
            stage,
            name: name.to_string(),
            duration,
        });
    }

    /// Set the duration of the whole frame.
    pub fn finish(&mut self, total: Duration) {
        self.total = total;
    }

    /// Frame number the timings belong to.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Duration of the whole frame.
    pub fn total(&self) -> Duration {
        self.total
    }

    /// Pass timings in execution order.
    pub fn passes(&self) -> &[PassTiming] {
        &self.passes
    }

    /// Timing of the pass at `stage`, if it ran.
    pub fn pass(&self, stage: RenderPassStage) -> Option<Duration> {
        self.passes
            .iter()
            .find(|timing| timing.stage == stage)
            .map(|timing| timing.duration)
    }

    /// Summed time of all passes.
    pub fn passes_total(&self) -> Duration {
        self.passes.iter().map(|timing| timing.duration).sum()
    }
}

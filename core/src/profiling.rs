//! Tracy instrumentation for the update loop and the renderer.
//!
//! Build with `--features profiling` and attach the Tracy viewer. Without the
//! feature the macros below compile to nothing, so call sites stay in place
//! in release builds.
//!
//! ```ignore
//! use catalyst_core::profiling::{frame_mark, profile_plot, profile_scope};
//!
//! fn render_frame(passes: usize) {
//!     profile_scope!("render_frame");
//!     profile_plot!("passes", passes);
//!     frame_mark!();
//! }
//! ```
//!
//! Names are string literals: Tracy keeps a static source location per
//! scope and per plot.

#[cfg(feature = "profiling")]
pub use tracy_client::{self, frame_mark as tracy_frame_mark, plot as tracy_plot, span};

// ---------------------------------------------------------------------------
// Enabled
// ---------------------------------------------------------------------------

/// End the current frame in the profiler timeline.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! frame_mark {
    () => {
        $crate::profiling::tracy_frame_mark()
    };
}

/// Open a zone that lasts until the end of the enclosing block.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_scope {
    ($name:literal) => {
        let _zone = $crate::profiling::span!($name);
    };
}

/// Open a zone named after the enclosing function.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_function {
    () => {
        let _zone = $crate::profiling::span!();
    };
}

/// Sample a value onto a named plot.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_plot {
    ($name:literal, $value:expr) => {
        $crate::profiling::tracy_plot!($name, $value as f64)
    };
}

// ---------------------------------------------------------------------------
// Disabled
// ---------------------------------------------------------------------------

#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! frame_mark {
    () => {};
}

#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_scope {
    ($name:literal) => {};
}

#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_function {
    () => {};
}

#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_plot {
    ($name:literal, $value:expr) => {
        let _ = $value;
    };
}

pub use frame_mark;
pub use profile_function;
pub use profile_plot;
pub use profile_scope;

#[cfg(test)]
mod tests {
    #[test]
    fn test_macros_expand_in_function_bodies() {
        profile_function!();
        profile_scope!("update_phase");
        profile_plot!("queued_tasks", 3u32);
        frame_mark!();
    }
}

//! Per-call context handed to passes and pipelines.

use crate::path::RenderingPath;
use crate::resources::GpuResources;
use crate::shader::ShaderLibrary;
use crate::targets::SharedRenderTargetManager;
use crate::types::Resolution;

/// Everything a render pass needs to initialize, record or rebuild.
///
/// The rendering system builds a fresh context for each call, borrowing its
/// own state. Passes never hold on to it.
#[derive(Debug)]
pub struct RenderContext<'a> {
    /// Resource owner, for creating tables and binding resources.
    pub resources: &'a mut GpuResources,
    /// Engine-owned render targets of the current path.
    pub shared_targets: &'a SharedRenderTargetManager,
    /// Compiled shader programs.
    pub shaders: &'a ShaderLibrary,
    /// Current frame-in-flight slot.
    pub frame_index: usize,
    /// Number of frame-in-flight slots.
    pub frames_in_flight: usize,
    /// Output resolution.
    pub resolution: Resolution,
    /// Active rendering path.
    pub rendering_path: RenderingPath,
}

impl RenderContext<'_> {
    /// Resolution divided by `2^shift`.
    pub fn scaled_resolution(&self, shift: u32) -> Resolution {
        self.resolution.scaled(shift)
    }
}

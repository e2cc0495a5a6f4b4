//! Engine-owned render targets shared between passes.
//!
//! Shared targets exist only while the active [`RenderingPath`] needs them.
//! Their handles stay stable across resizes: [`SharedRenderTargetManager::recreate`]
//! swaps the native image behind each handle and rebuilds the render data
//! tables that sample it.
//!
//! ```text
//! Default / PathTracing:
//!   SceneFeatures1..4        full     G-buffer
//!   SceneFeatures1/2Half     half     downsampled G-buffer
//!   Scene / PreviousScene    full     lit scene, last frame's scene
//!   Intermediate..Quarter1/2 quarter  scratch for bloom and blur chains
//! ```

use std::fmt;

use crate::error::GraphicsError;
use crate::path::RenderingPath;
use crate::resources::{GpuResources, RenderTargetHandle};
use crate::types::{Resolution, TextureFormat};

/// Engine-owned render targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SharedRenderTarget {
    SceneFeatures1,
    SceneFeatures2,
    SceneFeatures3,
    SceneFeatures4,
    SceneFeatures1Half,
    SceneFeatures2Half,
    Scene,
    PreviousScene,
    IntermediateRgbaFloat32Quarter1,
    IntermediateRgbaFloat32Quarter2,
}

impl SharedRenderTarget {
    /// Number of shared targets.
    pub const COUNT: usize = 10;

    /// All shared targets.
    pub const ALL: [SharedRenderTarget; Self::COUNT] = [
        Self::SceneFeatures1,
        Self::SceneFeatures2,
        Self::SceneFeatures3,
        Self::SceneFeatures4,
        Self::SceneFeatures1Half,
        Self::SceneFeatures2Half,
        Self::Scene,
        Self::PreviousScene,
        Self::IntermediateRgbaFloat32Quarter1,
        Self::IntermediateRgbaFloat32Quarter2,
    ];

    /// Slot in the manager's table.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Target name.
    pub fn name(self) -> &'static str {
        match self {
            Self::SceneFeatures1 => "SceneFeatures1",
            Self::SceneFeatures2 => "SceneFeatures2",
            Self::SceneFeatures3 => "SceneFeatures3",
            Self::SceneFeatures4 => "SceneFeatures4",
            Self::SceneFeatures1Half => "SceneFeatures1Half",
            Self::SceneFeatures2Half => "SceneFeatures2Half",
            Self::Scene => "Scene",
            Self::PreviousScene => "PreviousScene",
            Self::IntermediateRgbaFloat32Quarter1 => "IntermediateRgbaFloat32Quarter1",
            Self::IntermediateRgbaFloat32Quarter2 => "IntermediateRgbaFloat32Quarter2",
        }
    }

    /// Texture format.
    pub fn format(self) -> TextureFormat {
        match self {
            Self::SceneFeatures1 | Self::SceneFeatures3 | Self::SceneFeatures1Half => {
                TextureFormat::Rgba8Unorm
            }
            Self::SceneFeatures4 => TextureFormat::Rg16Float,
            Self::SceneFeatures2
            | Self::SceneFeatures2Half
            | Self::Scene
            | Self::PreviousScene
            | Self::IntermediateRgbaFloat32Quarter1
            | Self::IntermediateRgbaFloat32Quarter2 => TextureFormat::Rgba32Float,
        }
    }

    /// Resolution shift relative to the output: 0 full, 1 half, 2 quarter.
    pub fn scale_shift(self) -> u32 {
        match self {
            Self::SceneFeatures1Half | Self::SceneFeatures2Half => 1,
            Self::IntermediateRgbaFloat32Quarter1 | Self::IntermediateRgbaFloat32Quarter2 => 2,
            _ => 0,
        }
    }

    /// Resolution of the target for an output resolution.
    pub fn resolution(self, output: Resolution) -> Resolution {
        output.scaled(self.scale_shift())
    }

    /// Returns true if `path` needs this target.
    pub fn is_needed_by(self, path: RenderingPath) -> bool {
        matches!(path, RenderingPath::Default | RenderingPath::PathTracing)
    }
}

impl fmt::Display for SharedRenderTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Creates, switches and recreates the shared render targets.
#[derive(Debug, Default)]
pub struct SharedRenderTargetManager {
    targets: [Option<RenderTargetHandle>; SharedRenderTarget::COUNT],
}

impl SharedRenderTargetManager {
    /// Create a manager with no targets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the targets needed by the initial path.
    pub fn initialize(
        &mut self,
        path: RenderingPath,
        resolution: Resolution,
        resources: &mut GpuResources,
    ) -> Result<(), GraphicsError> {
        self.on_switch_rendering_path(path, resolution, resources)
    }

    /// Destroy targets `path` doesn't need and create the ones it does.
    pub fn on_switch_rendering_path(
        &mut self,
        path: RenderingPath,
        resolution: Resolution,
        resources: &mut GpuResources,
    ) -> Result<(), GraphicsError> {
        for target in SharedRenderTarget::ALL {
            if !target.is_needed_by(path)
                && let Some(handle) = self.targets[target.index()].take()
            {
                resources.destroy_render_target(handle);
                log::trace!("Destroyed shared render target {}", target);
            }
        }

        for target in SharedRenderTarget::ALL {
            let slot = &mut self.targets[target.index()];
            if target.is_needed_by(path) && slot.is_none() {
                let handle =
                    resources.create_render_target(target.resolution(resolution), target.format())?;
                *slot = Some(handle);
                log::trace!("Created shared render target {} as {}", target, handle);
            }
        }
        log::debug!(
            "Shared render targets switched to {} path ({} live)",
            path,
            self.len()
        );
        Ok(())
    }

    /// Resize every live target, keeping its handle.
    ///
    /// Returns the number of render data tables rebuilt.
    pub fn recreate(
        &mut self,
        resolution: Resolution,
        resources: &mut GpuResources,
    ) -> Result<usize, GraphicsError> {
        let mut rebuilt = 0;
        for target in SharedRenderTarget::ALL {
            if let Some(handle) = self.targets[target.index()] {
                rebuilt += resources.recreate_render_target(handle, target.resolution(resolution))?;
            }
        }
        Ok(rebuilt)
    }

    /// Handle of a shared target, if the current path has it.
    pub fn get(&self, target: SharedRenderTarget) -> Option<RenderTargetHandle> {
        self.targets[target.index()]
    }

    /// Number of live shared targets.
    pub fn len(&self) -> usize {
        self.targets.iter().flatten().count()
    }

    /// Returns true if no shared target is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Destroy every live target.
    pub fn terminate(&mut self, resources: &mut GpuResources) {
        for handle in self.targets.iter_mut().filter_map(Option::take) {
            resources.destroy_render_target(handle);
        }
    }
}

//! Shared fixtures for unit tests.

use std::sync::Arc;

use crate::backend::DummyBackend;
use crate::context::RenderContext;
use crate::path::RenderingPath;
use crate::resources::GpuResources;
use crate::shader::{ShaderLibrary, ShaderProgram};
use crate::tables::{DescriptorPoolSizes, ShaderStageFlags};
use crate::targets::SharedRenderTargetManager;
use crate::types::Resolution;

/// Owns everything a [`RenderContext`] borrows.
pub(crate) struct TestContext {
    pub backend: Arc<DummyBackend>,
    pub resources: GpuResources,
    pub shared_targets: SharedRenderTargetManager,
    pub shaders: ShaderLibrary,
    pub frames_in_flight: usize,
}

impl TestContext {
    /// Dummy backend, no shared targets, and the programs "Graphics",
    /// "Compute" and "RayTracing".
    pub fn new(frames_in_flight: usize) -> Self {
        let backend = Arc::new(DummyBackend::new());
        let resources = GpuResources::new(
            backend.clone(),
            frames_in_flight,
            DescriptorPoolSizes::default(),
        )
        .unwrap();

        let mut shaders = ShaderLibrary::new();
        for (name, stages) in [
            ("Graphics", ShaderStageFlags::VERTEX | ShaderStageFlags::FRAGMENT),
            ("Compute", ShaderStageFlags::COMPUTE),
            (
                "RayTracing",
                ShaderStageFlags::RAY_GENERATION
                    | ShaderStageFlags::MISS
                    | ShaderStageFlags::CLOSEST_HIT,
            ),
        ] {
            shaders
                .insert(ShaderProgram::new(name, stages, vec![0x07, 0x23, 0x02, 0x03]))
                .unwrap();
        }

        Self {
            backend,
            resources,
            shared_targets: SharedRenderTargetManager::new(),
            shaders,
            frames_in_flight,
        }
    }

    pub fn context(&mut self, frame_index: usize) -> RenderContext<'_> {
        RenderContext {
            resources: &mut self.resources,
            shared_targets: &self.shared_targets,
            shaders: &self.shaders,
            frame_index,
            frames_in_flight: self.frames_in_flight,
            resolution: Resolution::new(64, 64),
            rendering_path: RenderingPath::Default,
        }
    }
}

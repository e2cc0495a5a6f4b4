//! Pipeline initialization parameters.

use crate::error::GraphicsError;
use crate::resources::{RenderDataTableLayoutHandle, RenderTargetHandle};
use crate::targets::{SharedRenderTarget, SharedRenderTargetManager};

/// A render target named either directly or through the shared manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTargetRef {
    /// A target the caller created.
    Handle(RenderTargetHandle),
    /// An engine-owned target looked up in the [`SharedRenderTargetManager`].
    Shared(SharedRenderTarget),
}

impl RenderTargetRef {
    /// Resolve to a handle.
    ///
    /// Fails with [`GraphicsError::InvalidParameter`] when a shared target
    /// doesn't exist in the current rendering path.
    pub fn resolve(
        &self,
        shared: &SharedRenderTargetManager,
    ) -> Result<RenderTargetHandle, GraphicsError> {
        match *self {
            RenderTargetRef::Handle(handle) => Ok(handle),
            RenderTargetRef::Shared(target) => shared.get(target).ok_or_else(|| {
                GraphicsError::InvalidParameter(format!(
                    "shared render target {target} is not available in the current rendering path"
                ))
            }),
        }
    }
}

impl From<RenderTargetHandle> for RenderTargetRef {
    fn from(handle: RenderTargetHandle) -> Self {
        RenderTargetRef::Handle(handle)
    }
}

impl From<SharedRenderTarget> for RenderTargetRef {
    fn from(target: SharedRenderTarget) -> Self {
        RenderTargetRef::Shared(target)
    }
}

/// Pass-specific configuration handed to [`Pipeline::initialize`](super::Pipeline::initialize).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineParameters {
    /// Depth buffer the pipeline tests and writes.
    pub depth_buffer: Option<RenderTargetRef>,
    /// Disable back-face culling.
    pub double_sided: bool,
    /// Multisample count (a power of two up to 64).
    pub sample_count: u32,
    /// Targets the pipeline samples, bound in order at bindings 0..N of the
    /// per-frame input table.
    pub input_render_targets: Vec<RenderTargetRef>,
    /// Targets the pipeline renders into.
    pub output_render_targets: Vec<RenderTargetRef>,
    /// Extra layouts whose tables the pass binds itself.
    pub render_data_table_layouts: Vec<RenderDataTableLayoutHandle>,
    /// Maximum ray recursion depth (ray tracing only).
    pub ray_recursion_depth: u32,
}

impl PipelineParameters {
    /// Parameters with no targets, single sampling and culling enabled.
    pub fn new() -> Self {
        Self {
            depth_buffer: None,
            double_sided: false,
            sample_count: 1,
            input_render_targets: Vec::new(),
            output_render_targets: Vec::new(),
            render_data_table_layouts: Vec::new(),
            ray_recursion_depth: 1,
        }
    }

    /// Set the depth buffer.
    pub fn with_depth_buffer(mut self, depth: impl Into<RenderTargetRef>) -> Self {
        self.depth_buffer = Some(depth.into());
        self
    }

    /// Set the double-sided flag.
    pub fn with_double_sided(mut self, double_sided: bool) -> Self {
        self.double_sided = double_sided;
        self
    }

    /// Set the sample count.
    pub fn with_sample_count(mut self, count: u32) -> Self {
        self.sample_count = count;
        self
    }

    /// Add an input render target.
    pub fn with_input(mut self, target: impl Into<RenderTargetRef>) -> Self {
        self.input_render_targets.push(target.into());
        self
    }

    /// Add an output render target.
    pub fn with_output(mut self, target: impl Into<RenderTargetRef>) -> Self {
        self.output_render_targets.push(target.into());
        self
    }

    /// Add a render data table layout.
    pub fn with_layout(mut self, layout: RenderDataTableLayoutHandle) -> Self {
        self.render_data_table_layouts.push(layout);
        self
    }

    /// Set the maximum ray recursion depth.
    pub fn with_ray_recursion_depth(mut self, depth: u32) -> Self {
        self.ray_recursion_depth = depth;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), GraphicsError> {
        if !self.sample_count.is_power_of_two() || self.sample_count > 64 {
            return Err(GraphicsError::InvalidParameter(format!(
                "sample count {} is not a power of two up to 64",
                self.sample_count
            )));
        }
        if self.ray_recursion_depth == 0 {
            return Err(GraphicsError::InvalidParameter(
                "ray recursion depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PipelineParameters {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let params = PipelineParameters::new()
            .with_depth_buffer(SharedRenderTarget::SceneFeatures4)
            .with_double_sided(true)
            .with_input(SharedRenderTarget::Scene)
            .with_output(SharedRenderTarget::SceneFeatures1);

        assert!(params.double_sided);
        assert_eq!(
            params.depth_buffer,
            Some(RenderTargetRef::Shared(SharedRenderTarget::SceneFeatures4))
        );
        assert_eq!(params.input_render_targets.len(), 1);
        assert_eq!(params.output_render_targets.len(), 1);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        assert!(PipelineParameters::new().with_sample_count(3).validate().is_err());
        assert!(PipelineParameters::new().with_sample_count(128).validate().is_err());
        assert!(PipelineParameters::new().with_sample_count(4).validate().is_ok());
        assert!(
            PipelineParameters::new()
                .with_ray_recursion_depth(0)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_resolve_missing_shared_target() {
        let shared = SharedRenderTargetManager::new();
        let result = RenderTargetRef::Shared(SharedRenderTarget::Scene).resolve(&shared);
        assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
    }
}

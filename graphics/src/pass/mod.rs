//! Render passes and the stage-indexed pass table.
//!
//! A render pass is a named unit of GPU work made of one or more
//! [`Pipeline`]s. Each pass sits at a fixed [`RenderPassStage`]; the
//! [`RenderPassManager`] executes passes in stage declaration order, which
//! is the only ordering between passes:
//!
//! ```text
//! Shadow ─► SceneFeatures ─► ... ─► DirectLighting ─► ... ─► Bloom ─► ToneMapping ─► ... ─► Screen
//! ```
//!
//! # Lifecycle
//!
//! ```text
//! Unregistered ─register()─► Registered ─initialize()─► Initialized ─record()─┐
//!                                                            ▲                │
//!                                                            └────────────────┘
//! Initialized ─terminate()─► Registered
//! ```

mod manager;
mod stage;

pub use manager::RenderPassManager;
pub use stage::RenderPassStage;

use crate::context::RenderContext;
use crate::error::GraphicsError;
use crate::path::RenderingPath;
use crate::pipeline::Pipeline;

/// A unit of work at a fixed stage of the frame.
///
/// Implementors create their pipelines in [`initialize`](Self::initialize)
/// and record them in [`record`](Self::record). Every pipeline that began
/// recording must have ended it when `record` returns.
///
/// # Example
///
/// ```
/// use catalyst_graphics::{
///     GraphicsError, Pipeline, PipelineParameters, RenderContext, RenderPass, RenderPassStage,
/// };
///
/// struct BloomPass {
///     pipeline: Pipeline,
/// }
///
/// impl RenderPass for BloomPass {
///     fn name(&self) -> &str {
///         "Bloom"
///     }
///
///     fn stage(&self) -> RenderPassStage {
///         RenderPassStage::Bloom
///     }
///
///     fn initialize(&mut self, ctx: &mut RenderContext<'_>) -> Result<(), GraphicsError> {
///         self.pipeline.initialize(ctx, PipelineParameters::new())
///     }
///
///     fn record(&mut self, ctx: &mut RenderContext<'_>) -> Result<(), GraphicsError> {
///         let resolution = ctx.scaled_resolution(1);
///         self.pipeline
///             .begin_recording(ctx)
///             .dispatch(resolution.width.div_ceil(8), resolution.height.div_ceil(8), 1);
///         self.pipeline.end_recording(ctx);
///         Ok(())
///     }
///
///     fn pipelines(&self) -> Vec<&Pipeline> {
///         vec![&self.pipeline]
///     }
///
///     fn pipelines_mut(&mut self) -> Vec<&mut Pipeline> {
///         vec![&mut self.pipeline]
///     }
/// }
/// ```
pub trait RenderPass: Send {
    /// Pass name, used as its performance name.
    fn name(&self) -> &str;

    /// Stage the pass is registered at.
    fn stage(&self) -> RenderPassStage;

    /// Returns false to skip the pass this frame.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Returns true if the pass runs in `path`.
    fn is_included_in(&self, path: RenderingPath) -> bool {
        path.includes_stage(self.stage())
    }

    /// Create pipelines, layouts and tables.
    fn initialize(&mut self, ctx: &mut RenderContext<'_>) -> Result<(), GraphicsError>;

    /// Record this frame's work into the pipelines' current command buffers.
    fn record(&mut self, ctx: &mut RenderContext<'_>) -> Result<(), GraphicsError>;

    /// Release everything created in `initialize`.
    fn terminate(&mut self, ctx: &mut RenderContext<'_>) {
        for pipeline in self.pipelines_mut() {
            pipeline.terminate(ctx);
        }
    }

    /// Render targets were recreated; rebind inputs and drop stale commands.
    fn on_render_targets_recreated(
        &mut self,
        ctx: &mut RenderContext<'_>,
    ) -> Result<(), GraphicsError> {
        for pipeline in self.pipelines_mut() {
            if pipeline.is_initialized() {
                pipeline.rebuild(ctx)?;
            }
        }
        Ok(())
    }

    /// Pipelines owned by the pass.
    fn pipelines(&self) -> Vec<&Pipeline>;

    /// Pipelines owned by the pass, mutably.
    fn pipelines_mut(&mut self) -> Vec<&mut Pipeline>;
}

//! Graphics, compute and ray tracing pipelines.
//!
//! A [`Pipeline`] owns a shader program reference, the render data tables
//! that feed it its input render targets, and one [`CommandBuffer`] per
//! frame-in-flight slot.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized ──initialize()──► Initialized ◄──end_recording()──┐
//!                                    │                            │
//!                                    └──begin_recording()──► Recording
//!
//! Initialized ──terminate()──► Terminated ──initialize()──► Initialized
//! ```
//!
//! A pipeline is terminated when its pass leaves the active rendering path
//! and initialized again when the pass comes back.
//!
//! [`begin_recording`](Pipeline::begin_recording) indexes the command buffer
//! array with the current framebuffer index, so the buffer recorded in slot
//! N is only reused after slot N's fence signaled. Recording takes
//! `&mut self`, which makes a pipeline single-writer.

mod command;
mod params;

pub use command::{Attachment, Command, CommandBuffer, MAX_PUSH_CONSTANT_SIZE};
pub use params::{PipelineParameters, RenderTargetRef};

use std::fmt;

use crate::context::RenderContext;
use crate::error::GraphicsError;
use crate::resources::{RenderDataTableHandle, RenderDataTableLayoutHandle, RenderTargetHandle};
use crate::shader::ShaderProgram;
use crate::tables::{BindingType, RenderDataTableLayoutBinding, ShaderStageFlags};

/// Pipeline variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    /// Rasterization with vertex/fragment stages.
    Graphics,
    /// Compute dispatches.
    Compute,
    /// Ray generation and hit shaders.
    RayTracing,
}

impl PipelineKind {
    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            PipelineKind::Graphics => "Graphics",
            PipelineKind::Compute => "Compute",
            PipelineKind::RayTracing => "RayTracing",
        }
    }

    /// Returns true if a program with `stages` can drive this kind.
    pub fn supports(&self, stages: ShaderStageFlags) -> bool {
        match self {
            PipelineKind::Graphics => stages.intersects(ShaderStageFlags::ALL_GRAPHICS),
            PipelineKind::Compute => stages.contains(ShaderStageFlags::COMPUTE),
            PipelineKind::RayTracing => stages.contains(ShaderStageFlags::RAY_GENERATION),
        }
    }

    /// Stages that read the per-frame input table.
    pub fn input_stages(&self) -> ShaderStageFlags {
        match self {
            PipelineKind::Graphics => ShaderStageFlags::FRAGMENT,
            PipelineKind::Compute => ShaderStageFlags::COMPUTE,
            PipelineKind::RayTracing => {
                ShaderStageFlags::RAY_GENERATION
                    | ShaderStageFlags::CLOSEST_HIT
                    | ShaderStageFlags::MISS
            }
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pipeline lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Uninitialized,
    Initialized,
    Recording,
    Terminated,
}

/// Render targets after resolving [`RenderTargetRef`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedTargets {
    pub depth: Option<RenderTargetHandle>,
    pub inputs: Vec<RenderTargetHandle>,
    pub outputs: Vec<RenderTargetHandle>,
}

/// A shader program plus its per-frame recording state.
#[derive(Debug)]
pub struct Pipeline {
    name: String,
    kind: PipelineKind,
    shader_name: String,
    state: PipelineState,
    parameters: PipelineParameters,
    shader: Option<ShaderProgram>,
    targets: ResolvedTargets,
    command_buffers: Vec<CommandBuffer>,
    input_layout: Option<RenderDataTableLayoutHandle>,
    input_tables: Vec<RenderDataTableHandle>,
    rendering: bool,
}

impl Pipeline {
    /// Create an uninitialized pipeline.
    pub fn new(
        name: impl Into<String>,
        kind: PipelineKind,
        shader_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            shader_name: shader_name.into(),
            state: PipelineState::Uninitialized,
            parameters: PipelineParameters::new(),
            shader: None,
            targets: ResolvedTargets::default(),
            command_buffers: Vec::new(),
            input_layout: None,
            input_tables: Vec::new(),
            rendering: false,
        }
    }

    /// Create a graphics pipeline.
    pub fn graphics(name: impl Into<String>, shader_name: impl Into<String>) -> Self {
        Self::new(name, PipelineKind::Graphics, shader_name)
    }

    /// Create a compute pipeline.
    pub fn compute(name: impl Into<String>, shader_name: impl Into<String>) -> Self {
        Self::new(name, PipelineKind::Compute, shader_name)
    }

    /// Create a ray tracing pipeline.
    pub fn ray_tracing(name: impl Into<String>, shader_name: impl Into<String>) -> Self {
        Self::new(name, PipelineKind::RayTracing, shader_name)
    }

    /// Pipeline name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pipeline kind.
    pub fn kind(&self) -> PipelineKind {
        self.kind
    }

    /// Name of the shader program.
    pub fn shader_name(&self) -> &str {
        &self.shader_name
    }

    /// The shader program, once initialized.
    pub fn shader(&self) -> Option<&ShaderProgram> {
        self.shader.as_ref()
    }

    /// Lifecycle state.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Returns true between `initialize` and `terminate`.
    pub fn is_initialized(&self) -> bool {
        matches!(
            self.state,
            PipelineState::Initialized | PipelineState::Recording
        )
    }

    /// Parameters given to `initialize`.
    pub fn parameters(&self) -> &PipelineParameters {
        &self.parameters
    }

    /// Resolved render targets.
    pub fn targets(&self) -> &ResolvedTargets {
        &self.targets
    }

    /// Layout of the per-frame input tables, when the pipeline has inputs.
    pub fn input_layout(&self) -> Option<RenderDataTableLayoutHandle> {
        self.input_layout
    }

    /// Input table of a frame slot, when the pipeline has inputs.
    pub fn input_table(&self, frame_index: usize) -> Option<RenderDataTableHandle> {
        self.input_tables.get(frame_index).copied()
    }

    /// All per-frame command buffers.
    pub fn command_buffers(&self) -> &[CommandBuffer] {
        &self.command_buffers
    }

    /// Set up the pipeline. Must be called exactly once before recording;
    /// a terminated pipeline may be initialized again.
    ///
    /// Looks up the shader, resolves render targets, creates one command
    /// buffer per frame in flight and, when there are input render targets,
    /// one input table per frame in flight binding them.
    ///
    /// # Panics
    ///
    /// Panics if the pipeline is already initialized.
    pub fn initialize(
        &mut self,
        ctx: &mut RenderContext<'_>,
        parameters: PipelineParameters,
    ) -> Result<(), GraphicsError> {
        assert!(
            !self.is_initialized(),
            "pipeline {} initialized twice",
            self.name
        );
        parameters.validate()?;

        let shader = ctx.shaders.get(&self.shader_name)?;
        if !self.kind.supports(shader.stages()) {
            return Err(GraphicsError::InvalidParameter(format!(
                "shader {} has no {} stages ({:?})",
                self.shader_name,
                self.kind,
                shader.stages()
            )));
        }
        if let Some(layout) = parameters
            .render_data_table_layouts
            .iter()
            .find(|&&layout| ctx.resources.render_data_table_layout(layout).is_none())
        {
            return Err(GraphicsError::InvalidParameter(format!(
                "pipeline {} references destroyed layout {layout}",
                self.name
            )));
        }

        self.shader = Some(shader.clone());
        self.parameters = parameters;
        if let Err(error) = self.create_frame_resources(ctx) {
            self.release_frame_resources(ctx);
            return Err(error);
        }

        self.state = PipelineState::Initialized;
        log::debug!(
            "Initialized {} pipeline {} ({} frames, {} inputs, {} outputs)",
            self.kind,
            self.name,
            self.command_buffers.len(),
            self.targets.inputs.len(),
            self.targets.outputs.len()
        );
        Ok(())
    }

    /// Command buffer of a frame slot.
    ///
    /// # Panics
    ///
    /// Panics if the pipeline is not initialized or the slot is out of range.
    pub fn current_command_buffer(&self, frame_index: usize) -> &CommandBuffer {
        self.assert_initialized();
        assert!(
            frame_index < self.command_buffers.len(),
            "Invalid slot index"
        );
        &self.command_buffers[frame_index]
    }

    /// Start recording into the current frame's command buffer.
    ///
    /// The buffer is cleared. Graphics pipelines with targets begin
    /// rendering into them, and the frame's input table is bound at set 0.
    ///
    /// # Panics
    ///
    /// Panics if the pipeline is not initialized or already recording.
    pub fn begin_recording(&mut self, ctx: &RenderContext<'_>) -> &mut CommandBuffer {
        assert!(
            self.state != PipelineState::Recording,
            "pipeline {} is already recording",
            self.name
        );
        self.assert_initialized();
        let frame_index = ctx.frame_index;
        assert!(
            frame_index < self.command_buffers.len(),
            "Invalid slot index"
        );

        let resources = &*ctx.resources;
        let attachment = |target: RenderTargetHandle| match resources.native(target) {
            Some(native) => Attachment { target, native },
            None => panic!("render target {target} used after destruction"),
        };
        let color: Vec<_> = self.targets.outputs.iter().copied().map(attachment).collect();
        let depth = self.targets.depth.map(attachment);
        let input_table = self.input_tables.get(frame_index).copied();

        self.state = PipelineState::Recording;
        self.rendering =
            self.kind == PipelineKind::Graphics && (!color.is_empty() || depth.is_some());

        let buffer = &mut self.command_buffers[frame_index];
        buffer.reset();
        if self.rendering {
            buffer.begin_rendering(color, depth);
        }
        if let Some(table) = input_table {
            buffer.bind_render_data_table(resources, 0, table);
        }
        buffer
    }

    /// Finish recording the current frame.
    ///
    /// # Panics
    ///
    /// Panics if the pipeline is not recording.
    pub fn end_recording(&mut self, ctx: &RenderContext<'_>) {
        assert!(
            self.state == PipelineState::Recording,
            "pipeline {} is not recording",
            self.name
        );
        if self.rendering {
            self.command_buffers[ctx.frame_index].end_rendering();
            self.rendering = false;
        }
        self.state = PipelineState::Initialized;
    }

    /// Drop what the slot recorded last time it was current, so a pipeline
    /// the pass skips this frame submits nothing.
    pub(crate) fn discard_frame(&mut self, frame_index: usize) {
        if let Some(buffer) = self.command_buffers.get_mut(frame_index) {
            buffer.reset();
        }
    }

    /// Throw away a recording the pass abandoned with an error. The slot's
    /// buffer is cleared and the pipeline can record again next frame.
    pub(crate) fn abort_recording(&mut self, frame_index: usize) {
        if self.state == PipelineState::Recording {
            log::debug!("Aborting recording of pipeline {}", self.name);
            self.state = PipelineState::Initialized;
        }
        self.rendering = false;
        self.discard_frame(frame_index);
    }

    /// Re-resolve render targets, rebind the input tables and drop every
    /// recorded command.
    pub fn rebuild(&mut self, ctx: &mut RenderContext<'_>) -> Result<(), GraphicsError> {
        self.assert_initialized();
        self.targets = self.resolve_targets(ctx)?;

        for &table in &self.input_tables {
            for (binding, &target) in self.targets.inputs.iter().enumerate() {
                ctx.resources.bind_sampled_image(table, binding as u32, 0, target)?;
            }
        }
        for buffer in &mut self.command_buffers {
            buffer.reset();
        }
        self.state = PipelineState::Initialized;
        self.rendering = false;
        log::debug!("Rebuilt pipeline {}", self.name);
        Ok(())
    }

    /// Release owned tables, layouts and command buffers.
    pub fn terminate(&mut self, ctx: &mut RenderContext<'_>) {
        if self.state == PipelineState::Terminated {
            return;
        }
        self.release_frame_resources(ctx);
        self.state = PipelineState::Terminated;
        log::debug!("Terminated pipeline {}", self.name);
    }

    fn assert_initialized(&self) {
        assert!(
            self.is_initialized(),
            "pipeline {} used before initialize (state {:?})",
            self.name,
            self.state
        );
    }

    fn resolve_targets(&self, ctx: &RenderContext<'_>) -> Result<ResolvedTargets, GraphicsError> {
        let shared = ctx.shared_targets;
        let resolve_all = |refs: &[RenderTargetRef]| {
            refs.iter()
                .map(|r| r.resolve(shared))
                .collect::<Result<Vec<_>, _>>()
        };

        let targets = ResolvedTargets {
            depth: self
                .parameters
                .depth_buffer
                .map(|r| r.resolve(shared))
                .transpose()?,
            inputs: resolve_all(&self.parameters.input_render_targets)?,
            outputs: resolve_all(&self.parameters.output_render_targets)?,
        };
        for &target in targets.depth.iter().chain(&targets.inputs).chain(&targets.outputs) {
            if !ctx.resources.is_alive(target) {
                return Err(GraphicsError::InvalidParameter(format!(
                    "pipeline {} references destroyed render target {target}",
                    self.name
                )));
            }
        }
        Ok(targets)
    }

    fn create_frame_resources(&mut self, ctx: &mut RenderContext<'_>) -> Result<(), GraphicsError> {
        self.targets = self.resolve_targets(ctx)?;

        for frame_index in 0..ctx.frames_in_flight {
            let native = ctx.resources.create_command_buffer()?;
            self.command_buffers
                .push(CommandBuffer::new(native, self.kind, frame_index));
        }

        if self.targets.inputs.is_empty() {
            return Ok(());
        }
        let stages = self.kind.input_stages();
        let layout = ctx.resources.create_render_data_table_layout(
            (0..self.targets.inputs.len()).map(|binding| {
                RenderDataTableLayoutBinding::new(binding as u32, BindingType::SampledImage, stages)
            }),
        )?;
        self.input_layout = Some(layout);

        for _ in 0..ctx.frames_in_flight {
            let table = ctx.resources.create_render_data_table(layout)?;
            self.input_tables.push(table);
            for (binding, &target) in self.targets.inputs.iter().enumerate() {
                ctx.resources.bind_sampled_image(table, binding as u32, 0, target)?;
            }
        }
        Ok(())
    }

    fn release_frame_resources(&mut self, ctx: &mut RenderContext<'_>) {
        for table in self.input_tables.drain(..) {
            ctx.resources.destroy_render_data_table(table);
        }
        if let Some(layout) = self.input_layout.take() {
            ctx.resources.destroy_render_data_table_layout(layout);
        }
        for buffer in self.command_buffers.drain(..) {
            ctx.resources.retire_native(buffer.native());
        }
        self.rendering = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestContext;
    use crate::types::{Resolution, TextureFormat};

    #[test]
    fn test_initialize_creates_buffer_per_frame() {
        let mut env = TestContext::new(3);
        let mut pipeline = Pipeline::compute("Luminance", "Compute");
        let mut ctx = env.context(0);
        pipeline
            .initialize(&mut ctx, PipelineParameters::new())
            .unwrap();

        assert_eq!(pipeline.state(), PipelineState::Initialized);
        assert_eq!(pipeline.command_buffers().len(), 3);
        let natives: Vec<_> = (0..3)
            .map(|i| pipeline.current_command_buffer(i).native())
            .collect();
        assert_ne!(natives[0], natives[1]);
        assert_ne!(natives[1], natives[2]);
        assert_ne!(natives[0], natives[2]);
    }

    #[test]
    #[should_panic(expected = "used before initialize")]
    fn test_command_buffer_before_initialize_panics() {
        let pipeline = Pipeline::graphics("Sky", "Graphics");
        pipeline.current_command_buffer(0);
    }

    #[test]
    #[should_panic(expected = "initialized twice")]
    fn test_double_initialize_panics() {
        let mut env = TestContext::new(2);
        let mut pipeline = Pipeline::compute("Bloom", "Compute");
        let mut ctx = env.context(0);
        pipeline
            .initialize(&mut ctx, PipelineParameters::new())
            .unwrap();
        let _ = pipeline.initialize(&mut ctx, PipelineParameters::new());
    }

    #[test]
    fn test_missing_shader() {
        let mut env = TestContext::new(2);
        let mut pipeline = Pipeline::graphics("Sky", "DoesNotExist");
        let result = pipeline.initialize(&mut env.context(0), PipelineParameters::new());
        assert_eq!(
            result,
            Err(GraphicsError::ShaderNotFound("DoesNotExist".to_string()))
        );
        assert_eq!(pipeline.state(), PipelineState::Uninitialized);
    }

    #[test]
    fn test_shader_stage_mismatch() {
        let mut env = TestContext::new(2);
        let mut pipeline = Pipeline::ray_tracing("PathTracing", "Compute");
        let result = pipeline.initialize(&mut env.context(0), PipelineParameters::new());
        assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
    }

    #[test]
    fn test_inputs_get_a_table_per_frame() {
        let mut env = TestContext::new(2);
        let target = env
            .resources
            .create_render_target(Resolution::new(64, 64), TextureFormat::Rgba16Float)
            .unwrap();
        let mut pipeline = Pipeline::graphics("ToneMapping", "Graphics");
        pipeline
            .initialize(
                &mut env.context(0),
                PipelineParameters::new().with_input(target),
            )
            .unwrap();

        let first = pipeline.input_table(0).unwrap();
        let second = pipeline.input_table(1).unwrap();
        assert_ne!(first, second);
        assert_eq!(
            env.resources.bound(first, 0, 0),
            Some(target.into())
        );
        assert!(env.resources.render_data_table(second).unwrap().is_complete());
    }

    #[test]
    fn test_recording_cycle() {
        let mut env = TestContext::new(2);
        let output = env
            .resources
            .create_render_target(Resolution::new(32, 32), TextureFormat::Rgba8Unorm)
            .unwrap();
        let mut pipeline = Pipeline::graphics("Screen", "Graphics");
        pipeline
            .initialize(
                &mut env.context(0),
                PipelineParameters::new().with_output(output),
            )
            .unwrap();

        let ctx = env.context(1);
        pipeline.begin_recording(&ctx).draw(3, 1, 0, 0);
        assert_eq!(pipeline.state(), PipelineState::Recording);
        pipeline.end_recording(&ctx);

        let commands = pipeline.current_command_buffer(1).commands();
        assert!(matches!(commands[0], Command::BeginRendering { .. }));
        assert!(matches!(commands[1], Command::Draw { .. }));
        assert_eq!(commands[2], Command::EndRendering);
        assert!(pipeline.current_command_buffer(0).is_empty());
    }

    #[test]
    #[should_panic(expected = "already recording")]
    fn test_nested_recording_panics() {
        let mut env = TestContext::new(1);
        let mut pipeline = Pipeline::compute("Bloom", "Compute");
        pipeline
            .initialize(&mut env.context(0), PipelineParameters::new())
            .unwrap();
        let ctx = env.context(0);
        pipeline.begin_recording(&ctx);
        pipeline.begin_recording(&ctx);
    }

    #[test]
    fn test_terminate_releases_everything() {
        let mut env = TestContext::new(2);
        let target = env
            .resources
            .create_render_target(Resolution::new(16, 16), TextureFormat::Rgba8Unorm)
            .unwrap();
        let mut pipeline = Pipeline::compute("AmbientOcclusion", "Compute");
        pipeline
            .initialize(
                &mut env.context(0),
                PipelineParameters::new().with_input(target),
            )
            .unwrap();
        assert_eq!(env.resources.table_count(), 2);

        pipeline.terminate(&mut env.context(0));
        assert_eq!(pipeline.state(), PipelineState::Terminated);
        assert_eq!(env.resources.table_count(), 0);

        env.resources.flush_deferred();
        // The render target and the descriptor pool remain.
        assert_eq!(env.backend.live_count(), 2);
    }
}

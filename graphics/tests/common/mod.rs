//! Shared fixtures for rendering system integration tests.
//!
//! Passes here record real commands through their pipelines so the dummy
//! backend sees (and validates) every native object a frame references.

#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;

use catalyst_graphics::{
    DummyBackend, GraphicsError, Pipeline, PipelineKind, PipelineParameters, RenderContext,
    RenderPass, RenderPassStage, RenderingConfiguration, RenderingSystem, Resolution,
    ShaderLibrary, ShaderProgram, ShaderStageFlags,
};

/// Resolution every fixture system starts at.
pub const TEST_RESOLUTION: Resolution = Resolution::new(128, 72);

/// Stages in the order passes recorded them.
pub type RecordLog = Arc<Mutex<Vec<RenderPassStage>>>;

/// Install a test logger once per process.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Register the "Graphics", "Compute" and "RayTracing" programs.
pub fn register_test_shaders(shaders: &mut ShaderLibrary) {
    for (name, stages) in [
        ("Graphics", ShaderStageFlags::VERTEX | ShaderStageFlags::FRAGMENT),
        ("Compute", ShaderStageFlags::COMPUTE),
        (
            "RayTracing",
            ShaderStageFlags::RAY_GENERATION | ShaderStageFlags::MISS | ShaderStageFlags::CLOSEST_HIT,
        ),
    ] {
        shaders
            .insert(ShaderProgram::new(name, stages, vec![0x07, 0x23, 0x02, 0x03]))
            .unwrap();
    }
}

/// A dummy backend and a system configured with it, shaders registered,
/// not yet initialized.
pub fn create_system(
    configuration: RenderingConfiguration,
) -> (Arc<DummyBackend>, RenderingSystem) {
    create_system_with_backend(DummyBackend::new(), configuration)
}

/// Same as [`create_system`] with a preconfigured backend.
pub fn create_system_with_backend(
    backend: DummyBackend,
    configuration: RenderingConfiguration,
) -> (Arc<DummyBackend>, RenderingSystem) {
    init_logging();
    let backend = Arc::new(backend);
    let mut system = RenderingSystem::new(
        backend.clone(),
        configuration.with_resolution(TEST_RESOLUTION),
    )
    .unwrap();
    register_test_shaders(system.shaders_mut());
    (backend, system)
}

// ============================================================================
// Test pass
// ============================================================================

/// A pass with one pipeline that records a draw, dispatch or trace.
pub struct TestPass {
    stage: RenderPassStage,
    pipeline: Pipeline,
    parameters: PipelineParameters,
    log: Option<RecordLog>,
    enabled: bool,
    failures: u32,
}

impl TestPass {
    pub fn new(stage: RenderPassStage, kind: PipelineKind) -> Self {
        let shader = match kind {
            PipelineKind::Graphics => "Graphics",
            PipelineKind::Compute => "Compute",
            PipelineKind::RayTracing => "RayTracing",
        };
        Self {
            stage,
            pipeline: Pipeline::new(stage.name(), kind, shader),
            parameters: PipelineParameters::new(),
            log: None,
            enabled: true,
            failures: 0,
        }
    }

    pub fn compute(stage: RenderPassStage) -> Self {
        Self::new(stage, PipelineKind::Compute)
    }

    pub fn graphics(stage: RenderPassStage) -> Self {
        Self::new(stage, PipelineKind::Graphics)
    }

    pub fn ray_tracing(stage: RenderPassStage) -> Self {
        Self::new(stage, PipelineKind::RayTracing)
    }

    pub fn with_parameters(mut self, parameters: PipelineParameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_log(mut self, log: &RecordLog) -> Self {
        self.log = Some(Arc::clone(log));
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Fail the next `count` recordings midway, with the pipeline recording.
    pub fn failing(mut self, count: u32) -> Self {
        self.failures = count;
        self
    }
}

impl RenderPass for TestPass {
    fn name(&self) -> &str {
        self.stage.name()
    }

    fn stage(&self) -> RenderPassStage {
        self.stage
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn initialize(&mut self, ctx: &mut RenderContext<'_>) -> Result<(), GraphicsError> {
        self.pipeline.initialize(ctx, self.parameters.clone())
    }

    fn record(&mut self, ctx: &mut RenderContext<'_>) -> Result<(), GraphicsError> {
        let resolution = ctx.resolution;
        let kind = self.pipeline.kind();
        let buffer = self.pipeline.begin_recording(ctx);
        match kind {
            PipelineKind::Graphics => buffer.draw(3, 1, 0, 0),
            PipelineKind::Compute => {
                buffer.dispatch(resolution.width.div_ceil(8), resolution.height.div_ceil(8), 1)
            }
            PipelineKind::RayTracing => buffer.trace_rays(resolution.width, resolution.height, 1),
        }
        if self.failures > 0 {
            self.failures -= 1;
            return Err(GraphicsError::Internal(format!("{} failed to record", self.stage.name())));
        }
        self.pipeline.end_recording(ctx);

        if let Some(log) = &self.log {
            log.lock().push(self.stage);
        }
        Ok(())
    }

    fn pipelines(&self) -> Vec<&Pipeline> {
        vec![&self.pipeline]
    }

    fn pipelines_mut(&mut self) -> Vec<&mut Pipeline> {
        vec![&mut self.pipeline]
    }
}

/// The only pipeline of the pass registered at `stage`.
pub fn pipeline_of(system: &RenderingSystem, stage: RenderPassStage) -> &Pipeline {
    system
        .render_passes()
        .get(stage)
        .and_then(|pass| pass.pipelines().into_iter().next())
        .unwrap()
}

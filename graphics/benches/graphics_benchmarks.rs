use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use catalyst_graphics::{
    BindingType, BufferUsage, DescriptorPoolSizes, DummyBackend, GpuResources, GraphicsError,
    Pipeline, PipelineParameters, RenderContext, RenderDataTableLayoutBinding, RenderPass,
    RenderPassStage, RenderingConfiguration, RenderingPath, RenderingSystem, Resolution,
    ShaderProgram, ShaderStageFlags, SharedRenderTarget, TextureFormat,
};

struct DispatchPass {
    stage: RenderPassStage,
    pipeline: Pipeline,
    parameters: PipelineParameters,
}

impl DispatchPass {
    fn new(stage: RenderPassStage) -> Self {
        Self {
            stage,
            pipeline: Pipeline::compute(stage.name(), "Compute"),
            parameters: PipelineParameters::new(),
        }
    }

    fn sampling_scene(mut self) -> Self {
        self.parameters = PipelineParameters::new().with_input(SharedRenderTarget::Scene);
        self
    }
}

impl RenderPass for DispatchPass {
    fn name(&self) -> &str {
        self.stage.name()
    }

    fn stage(&self) -> RenderPassStage {
        self.stage
    }

    fn initialize(&mut self, ctx: &mut RenderContext<'_>) -> Result<(), GraphicsError> {
        self.pipeline.initialize(ctx, self.parameters.clone())
    }

    fn record(&mut self, ctx: &mut RenderContext<'_>) -> Result<(), GraphicsError> {
        let resolution = ctx.resolution;
        self.pipeline.begin_recording(ctx).dispatch(
            resolution.width.div_ceil(8),
            resolution.height.div_ceil(8),
            1,
        );
        self.pipeline.end_recording(ctx);
        Ok(())
    }

    fn pipelines(&self) -> Vec<&Pipeline> {
        vec![&self.pipeline]
    }

    fn pipelines_mut(&mut self) -> Vec<&mut Pipeline> {
        vec![&mut self.pipeline]
    }
}

fn rendering_system(stages: &[RenderPassStage]) -> RenderingSystem {
    let backend = Arc::new(DummyBackend::new());
    let mut system = RenderingSystem::new(
        backend,
        RenderingConfiguration::default().with_resolution(Resolution::new(1920, 1080)),
    )
    .unwrap();
    system
        .shaders_mut()
        .insert(ShaderProgram::new("Compute", ShaderStageFlags::COMPUTE, vec![0u8; 4]))
        .unwrap();
    for &stage in stages {
        system
            .register_render_pass(DispatchPass::new(stage).sampling_scene())
            .unwrap();
    }
    system.initialize().unwrap();
    system
}

// ---------------------------------------------------------------------------
// Frame loop
// ---------------------------------------------------------------------------

fn bench_render_frame_empty(c: &mut Criterion) {
    let mut system = rendering_system(&[]);
    c.bench_function("render_frame_no_passes", |b| {
        b.iter(|| {
            black_box(system.render_frame().unwrap());
        });
    });
}

fn bench_render_frame_default_path(c: &mut Criterion) {
    let stages: Vec<_> = RenderingPath::Default.stages().collect();
    let mut system = rendering_system(&stages);
    c.bench_function("render_frame_default_path_18_passes", |b| {
        b.iter(|| {
            black_box(system.render_frame().unwrap());
        });
    });
}

fn bench_resize(c: &mut Criterion) {
    let mut system = rendering_system(&[RenderPassStage::ToneMapping, RenderPassStage::Bloom]);
    let resolutions = [Resolution::new(1280, 720), Resolution::new(1920, 1080)];
    let mut next = 0;
    c.bench_function("render_frame_with_resize", |b| {
        b.iter(|| {
            system.resize(resolutions[next % 2]).unwrap();
            next += 1;
            black_box(system.render_frame().unwrap());
        });
    });
}

// ---------------------------------------------------------------------------
// Render data tables
// ---------------------------------------------------------------------------

fn bench_table_bind(c: &mut Criterion) {
    let backend = Arc::new(DummyBackend::new());
    let mut resources = GpuResources::new(backend, 2, DescriptorPoolSizes::default()).unwrap();
    let layout = resources
        .create_render_data_table_layout([
            RenderDataTableLayoutBinding::new(0, BindingType::UniformBuffer, ShaderStageFlags::VERTEX),
            RenderDataTableLayoutBinding::new(
                1,
                BindingType::SampledImage,
                ShaderStageFlags::FRAGMENT,
            ),
        ])
        .unwrap();
    let table = resources.create_render_data_table(layout).unwrap();
    let buffers = [
        resources.create_buffer(256, BufferUsage::UNIFORM).unwrap(),
        resources.create_buffer(256, BufferUsage::UNIFORM).unwrap(),
    ];
    let texture = resources
        .create_texture_2d(64, 64, TextureFormat::Rgba8Unorm, 1, None)
        .unwrap();
    resources.bind_sampled_image(table, 1, 0, texture).unwrap();

    let mut next = 0;
    c.bench_function("table_bind_alternating_buffers", |b| {
        b.iter(|| {
            next += 1;
            black_box(resources.bind_uniform_buffer(table, 0, buffers[next % 2]).unwrap());
        });
    });
}

fn bench_layout_create(c: &mut Criterion) {
    let backend = Arc::new(DummyBackend::new());
    let mut resources = GpuResources::new(backend, 2, DescriptorPoolSizes::default()).unwrap();

    c.bench_function("layout_create_destroy_4_bindings", |b| {
        b.iter(|| {
            let layout = resources
                .create_render_data_table_layout([
                    RenderDataTableLayoutBinding::new(
                        0,
                        BindingType::UniformBuffer,
                        ShaderStageFlags::VERTEX,
                    ),
                    RenderDataTableLayoutBinding::new(
                        1,
                        BindingType::CombinedImageSampler,
                        ShaderStageFlags::FRAGMENT,
                    )
                    .with_count(8),
                    RenderDataTableLayoutBinding::new(
                        2,
                        BindingType::StorageBuffer,
                        ShaderStageFlags::COMPUTE,
                    ),
                    RenderDataTableLayoutBinding::new(
                        3,
                        BindingType::Sampler,
                        ShaderStageFlags::FRAGMENT,
                    ),
                ])
                .unwrap();
            resources.destroy_render_data_table_layout(black_box(layout));
        });
    });
}

criterion_group!(
    benches,
    bench_render_frame_empty,
    bench_render_frame_default_path,
    bench_resize,
    bench_table_bind,
    bench_layout_create,
);
criterion_main!(benches);

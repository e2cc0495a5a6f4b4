//! Command buffers recorded by pipelines.
//!
//! Commands capture the native objects they reference at record time, so a
//! command buffer recorded before a render data table was rebuilt still
//! names the old native table. Owners re-record every frame, which picks up
//! the current natives.

use bytemuck::Pod;

use crate::backend::NativeHandle;
use crate::resources::{BufferHandle, GpuResources, RenderDataTableHandle, RenderTargetHandle};
use crate::tables::ShaderStageFlags;

use super::PipelineKind;

/// Largest push constant payload in bytes.
pub const MAX_PUSH_CONSTANT_SIZE: usize = 128;

/// A render target attached for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attachment {
    /// Stable handle of the target.
    pub target: RenderTargetHandle,
    /// Native image at record time.
    pub native: NativeHandle,
}

/// A recorded command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start rendering into the pipeline's output targets.
    BeginRendering {
        color: Vec<Attachment>,
        depth: Option<Attachment>,
    },
    /// Finish rendering.
    EndRendering,
    /// Bind a render data table at `set`.
    BindRenderDataTable {
        set: u32,
        table: RenderDataTableHandle,
        native: NativeHandle,
        version: u64,
    },
    /// Upload push constants.
    PushConstants {
        stages: ShaderStageFlags,
        offset: u32,
        data: Vec<u8>,
    },
    /// Bind a vertex buffer.
    BindVertexBuffer {
        slot: u32,
        buffer: BufferHandle,
        native: NativeHandle,
    },
    /// Bind an index buffer.
    BindIndexBuffer {
        buffer: BufferHandle,
        native: NativeHandle,
    },
    /// Non-indexed draw.
    Draw {
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    },
    /// Indexed draw.
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    },
    /// Compute dispatch.
    Dispatch { x: u32, y: u32, z: u32 },
    /// Ray dispatch.
    TraceRays { width: u32, height: u32, depth: u32 },
}

impl Command {
    /// Native objects the command references.
    pub fn natives(&self) -> Vec<NativeHandle> {
        match self {
            Command::BeginRendering { color, depth } => color
                .iter()
                .chain(depth)
                .map(|attachment| attachment.native)
                .collect(),
            Command::BindRenderDataTable { native, .. }
            | Command::BindVertexBuffer { native, .. }
            | Command::BindIndexBuffer { native, .. } => vec![*native],
            _ => Vec::new(),
        }
    }
}

/// One frame slot's command buffer of a pipeline.
///
/// Recording a command that doesn't belong to the pipeline kind (a draw in
/// a compute pipeline, for example) panics.
#[derive(Debug)]
pub struct CommandBuffer {
    native: NativeHandle,
    kind: PipelineKind,
    frame_index: usize,
    commands: Vec<Command>,
}

impl CommandBuffer {
    pub(crate) fn new(native: NativeHandle, kind: PipelineKind, frame_index: usize) -> Self {
        Self {
            native,
            kind,
            frame_index,
            commands: Vec::new(),
        }
    }

    /// Native command buffer.
    pub fn native(&self) -> NativeHandle {
        self.native
    }

    /// Kind of the owning pipeline.
    pub fn kind(&self) -> PipelineKind {
        self.kind
    }

    /// Frame slot this buffer belongs to.
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// Recorded commands.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Number of recorded commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns true if nothing is recorded.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Native objects referenced by recorded commands.
    pub fn referenced_natives(&self) -> impl Iterator<Item = NativeHandle> + '_ {
        self.commands.iter().flat_map(Command::natives)
    }

    /// Drop all recorded commands.
    pub(crate) fn reset(&mut self) {
        self.commands.clear();
    }

    /// Bind a render data table at `set`, capturing its current native.
    ///
    /// # Panics
    ///
    /// Panics if the table was destroyed.
    pub fn bind_render_data_table(
        &mut self,
        resources: &GpuResources,
        set: u32,
        table: RenderDataTableHandle,
    ) {
        let Some(entry) = resources.render_data_table(table) else {
            panic!("render data table {table} used after destruction");
        };
        self.commands.push(Command::BindRenderDataTable {
            set,
            table,
            native: entry.native(),
            version: entry.version(),
        });
    }

    /// Upload a plain-old-data value as push constants.
    ///
    /// # Panics
    ///
    /// Panics if the payload exceeds [`MAX_PUSH_CONSTANT_SIZE`].
    pub fn push_constants<T: Pod>(&mut self, stages: ShaderStageFlags, offset: u32, value: &T) {
        let data = bytemuck::bytes_of(value);
        assert!(
            offset as usize + data.len() <= MAX_PUSH_CONSTANT_SIZE,
            "push constants exceed {MAX_PUSH_CONSTANT_SIZE} bytes"
        );
        self.commands.push(Command::PushConstants {
            stages,
            offset,
            data: data.to_vec(),
        });
    }

    /// Bind a vertex buffer at `slot`.
    pub fn bind_vertex_buffer(
        &mut self,
        resources: &GpuResources,
        slot: u32,
        buffer: BufferHandle,
    ) {
        self.expect_kind(PipelineKind::Graphics, "vertex buffer binding");
        let native = Self::buffer_native(resources, buffer);
        self.commands.push(Command::BindVertexBuffer {
            slot,
            buffer,
            native,
        });
    }

    /// Bind an index buffer.
    pub fn bind_index_buffer(&mut self, resources: &GpuResources, buffer: BufferHandle) {
        self.expect_kind(PipelineKind::Graphics, "index buffer binding");
        let native = Self::buffer_native(resources, buffer);
        self.commands
            .push(Command::BindIndexBuffer { buffer, native });
    }

    /// Record a non-indexed draw.
    pub fn draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        self.expect_kind(PipelineKind::Graphics, "draw");
        self.commands.push(Command::Draw {
            vertex_count,
            instance_count,
            first_vertex,
            first_instance,
        });
    }

    /// Record an indexed draw.
    pub fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        self.expect_kind(PipelineKind::Graphics, "indexed draw");
        self.commands.push(Command::DrawIndexed {
            index_count,
            instance_count,
            first_index,
            vertex_offset,
            first_instance,
        });
    }

    /// Record a compute dispatch.
    pub fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        self.expect_kind(PipelineKind::Compute, "dispatch");
        self.commands.push(Command::Dispatch { x, y, z });
    }

    /// Record a ray dispatch.
    pub fn trace_rays(&mut self, width: u32, height: u32, depth: u32) {
        self.expect_kind(PipelineKind::RayTracing, "trace rays");
        self.commands.push(Command::TraceRays {
            width,
            height,
            depth,
        });
    }

    pub(crate) fn begin_rendering(&mut self, color: Vec<Attachment>, depth: Option<Attachment>) {
        self.expect_kind(PipelineKind::Graphics, "begin rendering");
        self.commands.push(Command::BeginRendering { color, depth });
    }

    pub(crate) fn end_rendering(&mut self) {
        self.expect_kind(PipelineKind::Graphics, "end rendering");
        self.commands.push(Command::EndRendering);
    }

    fn expect_kind(&self, kind: PipelineKind, what: &str) {
        assert!(
            self.kind == kind,
            "{what} recorded into a {} pipeline",
            self.kind
        );
    }

    fn buffer_native(resources: &GpuResources, buffer: BufferHandle) -> NativeHandle {
        match resources.native(buffer) {
            Some(native) => native,
            None => panic!("buffer {buffer} used after destruction"),
        }
    }
}

//! GPU backend abstraction layer.
//!
//! The rest of the crate never touches native API objects directly. Every
//! native object is an opaque [`NativeHandle`] produced by a [`GpuBackend`];
//! the stable handles handed to engine code live one level up, in
//! [`GpuResources`](crate::resources::GpuResources).
//!
//! # Available Backends
//!
//! - [`DummyBackend`]: software backend that tracks every native object and
//!   validates submissions, used by tests and headless runs.
//!
//! # Architecture
//!
//! Each backend implements [`GpuBackend`], which provides:
//! - Resource creation and destruction
//! - Descriptor pools and native render data tables
//! - Command buffer creation, submission and presentation
//! - Fence and semaphore signaling on behalf of the GPU

pub mod dummy;

pub use dummy::{DummyBackend, DummyStats};

use crate::error::GraphicsError;
use crate::frame::{Fence, Semaphore};
use crate::pipeline::CommandBuffer;
use crate::tables::{BindingType, DescriptorPoolSizes, RenderDataTableLayout};
use crate::types::{
    AccelerationStructureDescriptor, BufferDescriptor, Resolution, SamplerDescriptor,
    TextureDescriptor,
};

/// Opaque native object identifier issued by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeHandle(pub u64);

/// One slot write into a native render data table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorWrite {
    /// Binding index.
    pub binding: u32,
    /// Array element.
    pub element: u32,
    /// Binding type of the slot.
    pub binding_type: BindingType,
    /// Buffer, image or acceleration structure written to the slot.
    pub native: NativeHandle,
    /// Sampler half of a combined image sampler.
    pub sampler: Option<NativeHandle>,
}

/// Work submitted to the graphics queue for one frame.
///
/// The queue waits on `wait` before running the command buffers and signals
/// `signal` once they complete.
#[derive(Debug)]
pub struct Submission<'a> {
    /// Command buffers in execution order.
    pub command_buffers: Vec<&'a CommandBuffer>,
    /// Semaphore signaled by image acquisition.
    pub wait: &'a Semaphore,
    /// Semaphore presentation waits on.
    pub signal: &'a Semaphore,
}

impl Submission<'_> {
    /// Every native object referenced by the submission.
    pub fn referenced_natives(&self) -> Vec<NativeHandle> {
        let mut natives = Vec::new();
        for buffer in &self.command_buffers {
            natives.push(buffer.native());
            natives.extend(buffer.referenced_natives());
        }
        natives
    }
}

/// Trait implemented by GPU backends.
///
/// Backends are shared between the resource layer and the rendering system,
/// so all methods take `&self` and implementations synchronize internally.
pub trait GpuBackend: Send + Sync + 'static {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Create a buffer.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<NativeHandle, GraphicsError>;

    /// Create a texture or render target, optionally uploading mip 0.
    fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
        initial_data: Option<&[u8]>,
    ) -> Result<NativeHandle, GraphicsError>;

    /// Create a sampler.
    fn create_sampler(&self, descriptor: &SamplerDescriptor)
    -> Result<NativeHandle, GraphicsError>;

    /// Create an acceleration structure.
    fn create_acceleration_structure(
        &self,
        descriptor: &AccelerationStructureDescriptor,
    ) -> Result<NativeHandle, GraphicsError>;

    /// Destroy a native object. The GPU must no longer use it.
    fn destroy(&self, native: NativeHandle);

    /// Create a descriptor pool with the given capacity.
    fn create_descriptor_pool(
        &self,
        sizes: &DescriptorPoolSizes,
    ) -> Result<NativeHandle, GraphicsError>;

    /// Destroy a descriptor pool together with every table allocated from it.
    fn destroy_descriptor_pool(&self, pool: NativeHandle);

    /// Allocate a native render data table.
    ///
    /// Fails with [`GraphicsError::DescriptorPoolExhausted`] when the pool
    /// lacks capacity for `layout`.
    fn allocate_descriptor_set(
        &self,
        pool: NativeHandle,
        layout: &RenderDataTableLayout,
    ) -> Result<NativeHandle, GraphicsError>;

    /// Write slots of a native render data table.
    fn write_descriptor_set(
        &self,
        set: NativeHandle,
        writes: &[DescriptorWrite],
    ) -> Result<(), GraphicsError>;

    /// Create a command buffer.
    fn create_command_buffer(&self) -> Result<NativeHandle, GraphicsError>;

    /// Acquire the next swapchain image, signaling `image_available`.
    fn acquire_next_image(&self, image_available: &Semaphore) -> Result<u32, GraphicsError>;

    /// Submit work. `fence` is signaled when the GPU finishes it.
    fn submit(&self, submission: &Submission<'_>, fence: &Fence) -> Result<(), GraphicsError>;

    /// Present a swapchain image after `render_finished` is signaled.
    fn present(&self, image_index: u32, render_finished: &Semaphore)
    -> Result<(), GraphicsError>;

    /// Resize the presentation surface.
    fn resize_surface(&self, resolution: Resolution) -> Result<(), GraphicsError>;

    /// Block until all submitted work completes.
    fn wait_idle(&self);
}

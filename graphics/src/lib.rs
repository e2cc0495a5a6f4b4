//! # Catalyst Graphics
//!
//! Render pass scheduling, pipelines and render data tables for the
//! Catalyst engine.
//!
//! ## Overview
//!
//! ```text
//! RenderingSystem
//!   ├── RenderPassManager ── RenderPass (one per stage) ── Pipeline (1..N)
//!   │                                                        └── CommandBuffer per frame slot
//!   ├── GpuResources ── buffers, textures, render targets, samplers,
//!   │                   acceleration structures, render data tables
//!   ├── SharedRenderTargetManager ── engine-owned targets of the current path
//!   ├── FrameSyncState ── fence + semaphores per frame slot
//!   └── GpuBackend ── DummyBackend
//! ```
//!
//! - [`RenderingSystem`] - Per-frame orchestration: acquire, record, submit, present
//! - [`RenderPassManager`] - Fixed stage-indexed pass table
//! - [`Pipeline`] - Graphics, compute and ray tracing pipelines
//! - [`GpuResources`] - Stable handles to GPU objects, deferred destruction
//! - [`RenderDataTable`] - Resource bindings for shaders (descriptor sets)
//! - [`FrameSyncState`] - Frame-in-flight fences and semaphores
//! - [`DummyBackend`] - Software backend that validates everything it is given

pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod frame;
pub mod pass;
pub mod path;
pub mod pipeline;
pub mod profiling;
pub mod resources;
pub mod shader;
pub mod system;
pub mod tables;
pub mod targets;
pub mod types;

#[cfg(test)]
mod test_support;

pub use backend::{
    DescriptorWrite, DummyBackend, DummyStats, GpuBackend, NativeHandle, Submission,
};
pub use config::RenderingConfiguration;
pub use context::RenderContext;
pub use error::GraphicsError;
pub use frame::{
    Fence, FenceStatus, FrameSlot, FrameSyncState, MAX_FRAMES_IN_FLIGHT, Semaphore,
};
pub use pass::{RenderPass, RenderPassManager, RenderPassStage};
pub use path::RenderingPath;
pub use pipeline::{
    Command, CommandBuffer, Pipeline, PipelineKind, PipelineParameters, PipelineState,
    RenderTargetRef,
};
pub use profiling::FrameTimings;
pub use resources::{
    AccelerationStructureHandle, BufferHandle, GpuResources, RenderDataTableHandle,
    RenderDataTableLayoutHandle, RenderTargetHandle, ResourceHandle, ResourceKind, SamplerHandle,
    TextureHandle,
};
pub use shader::{ShaderLibrary, ShaderProgram};
pub use system::{FrameStatus, RenderingSystem, SurfaceEvent};
pub use tables::{
    BindingResource, BindingType, DescriptorPoolSizes, RenderDataTable, RenderDataTableLayout,
    RenderDataTableLayoutBinding, ShaderStageFlags,
};
pub use targets::{SharedRenderTarget, SharedRenderTargetManager};
pub use types::{
    AccelerationStructureDescriptor, AccelerationStructureLevel, AddressMode, BufferDescriptor,
    BufferUsage, Extent3d, FilterMode, Resolution, SamplerDescriptor, TextureDescriptor,
    TextureDimension, TextureFormat, TextureUsage,
};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the graphics subsystem.
pub fn init() {
    log::info!("Catalyst Graphics v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_dummy_backend() {
        let backend = DummyBackend::new();
        assert_eq!(backend.name(), "Dummy");
    }
}

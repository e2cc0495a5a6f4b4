//! Plain-data creation parameters handed to [`GpuResources`](crate::GpuResources)
//! and forwarded unchanged to the backend.

mod acceleration;
mod buffer;
mod common;
mod sampler;
mod texture;

pub use acceleration::{AccelerationStructureDescriptor, AccelerationStructureLevel};
pub use buffer::{BufferDescriptor, BufferUsage};
pub use common::{Extent3d, Resolution};
pub use sampler::{AddressMode, FilterMode, SamplerDescriptor};
pub use texture::{TextureDescriptor, TextureDimension, TextureFormat, TextureUsage};

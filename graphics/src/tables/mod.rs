//! Render data tables (descriptor sets).
//!
//! A [`RenderDataTableLayout`] describes the slots a shader expects. A
//! [`RenderDataTable`] is one instance of a layout with resource handles
//! bound to its slots, backed by a native table allocated from a
//! [`RenderDataTablePool`].
//!
//! Tables are created and bound through
//! [`GpuResources`](crate::resources::GpuResources), which owns the pool and
//! validates every binding against the layout.

mod layout;
mod pool;
mod table;

pub use layout::{
    BindingType, RenderDataTableLayout, RenderDataTableLayoutBinding, ShaderStageFlags,
};
pub use pool::{DescriptorPoolSizes, RenderDataTablePool};
pub use table::{BindingResource, RenderDataTable};

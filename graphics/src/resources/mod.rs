//! GPU resources.
//!
//! [`GpuResources`] is the single system of record for GPU objects. It hands
//! out stable, copyable handles ([`BufferHandle`], [`TextureHandle`],
//! [`RenderTargetHandle`], ...) and keeps the native objects behind them:
//!
//! - Buffers, 2D/3D/cube textures, render targets, samplers and
//!   acceleration structures
//! - Render data table layouts and render data tables
//!
//! Destruction is deferred: the native object is released only after the
//! fence of the frame slot that was current at destruction time signals
//! (see [`DeferredDestructor`]).
//!
//! Creation, destruction and table binding happen on the render thread,
//! which owns the `GpuResources` (`&mut self`); handles are plain values any
//! thread can copy.

mod deferred;
mod handle;
mod registry;

pub use deferred::DeferredDestructor;
pub use handle::{
    AccelerationStructureHandle, BufferHandle, RenderDataTableHandle,
    RenderDataTableLayoutHandle, RenderTargetHandle, ResourceHandle, ResourceKind, SamplerHandle,
    TextureHandle,
};
pub use registry::ResourceRegistry;

use std::sync::Arc;

use crate::backend::{DescriptorWrite, GpuBackend, NativeHandle};
use crate::error::GraphicsError;
use crate::tables::{
    BindingResource, BindingType, DescriptorPoolSizes, RenderDataTable, RenderDataTableLayout,
    RenderDataTableLayoutBinding, RenderDataTablePool,
};
use crate::types::{
    AccelerationStructureDescriptor, BufferDescriptor, BufferUsage, Resolution,
    SamplerDescriptor, TextureDescriptor, TextureDimension, TextureFormat, TextureUsage,
};

/// Creation parameters kept with each resource.
#[derive(Debug, Clone)]
enum ResourceDescription {
    Buffer(BufferDescriptor),
    Texture(TextureDescriptor),
    Sampler(SamplerDescriptor),
    AccelerationStructure(AccelerationStructureDescriptor),
}

#[derive(Debug, Clone)]
struct ResourceEntry {
    kind: ResourceKind,
    native: NativeHandle,
    description: ResourceDescription,
}

impl ResourceEntry {
    fn buffer_usage(&self) -> BufferUsage {
        match &self.description {
            ResourceDescription::Buffer(descriptor) => descriptor.usage,
            _ => BufferUsage::empty(),
        }
    }

    fn texture_usage(&self) -> TextureUsage {
        match &self.description {
            ResourceDescription::Texture(descriptor) => descriptor.usage,
            _ => TextureUsage::empty(),
        }
    }
}

/// Owner of every GPU resource, layout and render data table.
pub struct GpuResources {
    backend: Arc<dyn GpuBackend>,
    resources: ResourceRegistry<ResourceEntry>,
    layouts: ResourceRegistry<Arc<RenderDataTableLayout>>,
    tables: ResourceRegistry<RenderDataTable>,
    pool: RenderDataTablePool,
    deferred: DeferredDestructor,
    frame_slot: usize,
}

impl std::fmt::Debug for GpuResources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuResources")
            .field("backend", &self.backend.name())
            .field("resources", &self.resources.len())
            .field("layouts", &self.layouts.len())
            .field("tables", &self.tables.len())
            .field("pool", &self.pool)
            .field("deferred", &self.deferred)
            .field("frame_slot", &self.frame_slot)
            .finish()
    }
}

impl GpuResources {
    /// Create the resource owner for `frames_in_flight` slots.
    pub fn new(
        backend: Arc<dyn GpuBackend>,
        frames_in_flight: usize,
        pool_sizes: DescriptorPoolSizes,
    ) -> Result<Self, GraphicsError> {
        let pool = RenderDataTablePool::new(backend.clone(), pool_sizes)?;
        Ok(Self {
            backend,
            resources: ResourceRegistry::new(),
            layouts: ResourceRegistry::new(),
            tables: ResourceRegistry::new(),
            pool,
            deferred: DeferredDestructor::new(frames_in_flight),
            frame_slot: 0,
        })
    }

    /// The backend natives are created on.
    pub fn backend(&self) -> &Arc<dyn GpuBackend> {
        &self.backend
    }

    // ------------------------------------------------------------------
    // Frame slots and deferred destruction
    // ------------------------------------------------------------------

    /// Frame slot destroyed natives are queued on.
    pub fn frame_slot(&self) -> usize {
        self.frame_slot
    }

    /// Make `slot` the current frame slot. Called after its fence was waited.
    pub(crate) fn set_frame_slot(&mut self, slot: usize) {
        self.frame_slot = slot;
    }

    /// Destroy natives queued on `slot`. Its fence must have signaled.
    pub(crate) fn release_frame_slot(&mut self, slot: usize) -> usize {
        self.deferred.release_slot(slot, self.backend.as_ref())
    }

    /// Destroy every queued native. The device must be idle.
    pub(crate) fn flush_deferred(&mut self) -> usize {
        self.deferred.flush_all(self.backend.as_ref())
    }

    /// Create a native command buffer.
    pub(crate) fn create_command_buffer(&mut self) -> Result<NativeHandle, GraphicsError> {
        self.backend.create_command_buffer()
    }

    /// Queue a native owned outside the registry (a command buffer) for
    /// deferred destruction.
    pub(crate) fn retire_native(&mut self, native: NativeHandle) {
        self.deferred.queue(self.frame_slot, native);
    }

    /// Number of natives waiting for their frame slot to come around.
    pub fn pending_destructions(&self) -> usize {
        self.deferred.pending_count()
    }

    /// Destroy everything still alive. The device must be idle.
    pub(crate) fn release_all(&mut self) {
        let tables = self.tables.handles();
        for handle in tables {
            if let Some(table) = self.tables.remove(handle) {
                self.backend.destroy(table.native());
            }
        }
        for handle in self.layouts.handles() {
            self.layouts.remove(handle);
        }
        for handle in self.resources.handles() {
            if let Some(entry) = self.resources.remove(handle) {
                log::trace!("Releasing leftover {} {}", entry.kind, handle);
                self.backend.destroy(entry.native);
            }
        }
        self.flush_deferred();
        self.pool.release();
    }

    // ------------------------------------------------------------------
    // Resource creation
    // ------------------------------------------------------------------

    /// Create a buffer of `size` bytes.
    pub fn create_buffer(
        &mut self,
        size: u64,
        usage: BufferUsage,
    ) -> Result<BufferHandle, GraphicsError> {
        self.create_buffer_with_descriptor(BufferDescriptor::new(size, usage))
    }

    /// Create a buffer from a full descriptor.
    pub fn create_buffer_with_descriptor(
        &mut self,
        descriptor: BufferDescriptor,
    ) -> Result<BufferHandle, GraphicsError> {
        if descriptor.size == 0 {
            return Err(GraphicsError::InvalidParameter(
                "buffer size must be greater than zero".to_string(),
            ));
        }
        let native = self.backend.create_buffer(&descriptor)?;
        let handle = self.insert(
            ResourceKind::Buffer,
            native,
            ResourceDescription::Buffer(descriptor),
        );
        Ok(BufferHandle::new(handle))
    }

    /// Create a sampled 2D texture.
    ///
    /// `initial_data`, when given, must hold exactly mip level 0.
    pub fn create_texture_2d(
        &mut self,
        width: u32,
        height: u32,
        format: TextureFormat,
        mip_levels: u32,
        initial_data: Option<&[u8]>,
    ) -> Result<TextureHandle, GraphicsError> {
        let descriptor = TextureDescriptor::new_2d(width, height, format, Self::texture_usage())
            .with_mip_levels(mip_levels);
        self.create_texture(descriptor, initial_data)
    }

    /// Create a sampled 3D texture.
    pub fn create_texture_3d(
        &mut self,
        width: u32,
        height: u32,
        depth: u32,
        format: TextureFormat,
        initial_data: Option<&[u8]>,
    ) -> Result<TextureHandle, GraphicsError> {
        let descriptor =
            TextureDescriptor::new_3d(width, height, depth, format, Self::texture_usage());
        self.create_texture(descriptor, initial_data)
    }

    /// Create a sampled cube texture with square faces of `size` pixels.
    pub fn create_texture_cube(
        &mut self,
        size: u32,
        format: TextureFormat,
        mip_levels: u32,
        initial_data: Option<&[u8]>,
    ) -> Result<TextureHandle, GraphicsError> {
        let descriptor = TextureDescriptor::new_cube(size, format, Self::texture_usage())
            .with_mip_levels(mip_levels);
        self.create_texture(descriptor, initial_data)
    }

    /// Create a texture from a full descriptor.
    pub fn create_texture(
        &mut self,
        descriptor: TextureDescriptor,
        initial_data: Option<&[u8]>,
    ) -> Result<TextureHandle, GraphicsError> {
        Self::validate_texture(&descriptor)?;
        if let Some(data) = initial_data
            && data.len() as u64 != descriptor.base_level_size()
        {
            return Err(GraphicsError::InvalidParameter(format!(
                "initial data is {} bytes, mip 0 needs {}",
                data.len(),
                descriptor.base_level_size()
            )));
        }

        let kind = match descriptor.dimension {
            TextureDimension::D2 => ResourceKind::Texture2D,
            TextureDimension::D3 => ResourceKind::Texture3D,
            TextureDimension::Cube => ResourceKind::TextureCube,
        };
        let native = self.backend.create_texture(&descriptor, initial_data)?;
        let handle = self.insert(kind, native, ResourceDescription::Texture(descriptor));
        Ok(TextureHandle::new(handle))
    }

    /// Create a render target the size of `resolution`.
    pub fn create_render_target(
        &mut self,
        resolution: Resolution,
        format: TextureFormat,
    ) -> Result<RenderTargetHandle, GraphicsError> {
        let descriptor = Self::render_target_descriptor(resolution, format);
        Self::validate_texture(&descriptor)?;
        let native = self.backend.create_texture(&descriptor, None)?;
        let handle = self.insert(
            ResourceKind::RenderTarget,
            native,
            ResourceDescription::Texture(descriptor),
        );
        Ok(RenderTargetHandle::new(handle))
    }

    /// Create a sampler.
    pub fn create_sampler(
        &mut self,
        descriptor: SamplerDescriptor,
    ) -> Result<SamplerHandle, GraphicsError> {
        let native = self.backend.create_sampler(&descriptor)?;
        let handle = self.insert(
            ResourceKind::Sampler,
            native,
            ResourceDescription::Sampler(descriptor),
        );
        Ok(SamplerHandle::new(handle))
    }

    /// Create an acceleration structure.
    pub fn create_acceleration_structure(
        &mut self,
        descriptor: AccelerationStructureDescriptor,
    ) -> Result<AccelerationStructureHandle, GraphicsError> {
        if descriptor.primitive_count == 0 {
            return Err(GraphicsError::InvalidParameter(
                "acceleration structure needs at least one primitive".to_string(),
            ));
        }
        let native = self.backend.create_acceleration_structure(&descriptor)?;
        let handle = self.insert(
            ResourceKind::AccelerationStructure,
            native,
            ResourceDescription::AccelerationStructure(descriptor),
        );
        Ok(AccelerationStructureHandle::new(handle))
    }

    // ------------------------------------------------------------------
    // Resource destruction
    // ------------------------------------------------------------------

    /// Destroy a buffer.
    ///
    /// # Panics
    ///
    /// Panics if the buffer was already destroyed.
    pub fn destroy_buffer(&mut self, handle: BufferHandle) {
        self.destroy_resource(handle.into());
    }

    /// Destroy a texture.
    ///
    /// # Panics
    ///
    /// Panics if the texture was already destroyed.
    pub fn destroy_texture(&mut self, handle: TextureHandle) {
        self.destroy_resource(handle.into());
    }

    /// Destroy a render target.
    ///
    /// # Panics
    ///
    /// Panics if the render target was already destroyed.
    pub fn destroy_render_target(&mut self, handle: RenderTargetHandle) {
        self.destroy_resource(handle.into());
    }

    /// Destroy a sampler.
    ///
    /// # Panics
    ///
    /// Panics if the sampler was already destroyed.
    pub fn destroy_sampler(&mut self, handle: SamplerHandle) {
        self.destroy_resource(handle.into());
    }

    /// Destroy an acceleration structure.
    ///
    /// # Panics
    ///
    /// Panics if the acceleration structure was already destroyed.
    pub fn destroy_acceleration_structure(&mut self, handle: AccelerationStructureHandle) {
        self.destroy_resource(handle.into());
    }

    /// Replace a render target's native image with one of a new size.
    ///
    /// The handle stays valid. Every render data table referencing the
    /// target is rebuilt; returns how many were.
    ///
    /// # Panics
    ///
    /// Panics if the render target was destroyed.
    pub fn recreate_render_target(
        &mut self,
        handle: RenderTargetHandle,
        resolution: Resolution,
    ) -> Result<usize, GraphicsError> {
        let raw = handle.raw();
        let Some(entry) = self.resources.get(raw) else {
            panic!("render target {handle} used after destruction");
        };
        let format = match &entry.description {
            ResourceDescription::Texture(descriptor) => descriptor.format,
            _ => unreachable!("render targets are described as textures"),
        };

        let descriptor = Self::render_target_descriptor(resolution, format);
        Self::validate_texture(&descriptor)?;
        let native = self.backend.create_texture(&descriptor, None)?;

        let entry = self.resources.get_mut(raw).ok_or_else(|| {
            GraphicsError::Internal(format!("render target {handle} vanished during recreation"))
        })?;
        let old = std::mem::replace(&mut entry.native, native);
        entry.description = ResourceDescription::Texture(descriptor);
        self.deferred.queue(self.frame_slot, old);
        log::debug!("Recreated render target {} at {}", handle, resolution);

        let dependents = self.tables_referencing(raw);
        for &table in &dependents {
            self.rebuild_render_data_table(table)?;
        }
        Ok(dependents.len())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Kind of a live resource.
    pub fn kind(&self, handle: impl Into<ResourceHandle>) -> Option<ResourceKind> {
        self.resources.get(handle.into()).map(|entry| entry.kind)
    }

    /// Returns true if the resource has not been destroyed.
    pub fn is_alive(&self, handle: impl Into<ResourceHandle>) -> bool {
        self.resources.contains(handle.into())
    }

    /// Current native object of a live resource.
    pub fn native(&self, handle: impl Into<ResourceHandle>) -> Option<NativeHandle> {
        self.resources.get(handle.into()).map(|entry| entry.native)
    }

    /// Descriptor of a live texture or render target.
    pub fn texture_descriptor(
        &self,
        handle: impl Into<ResourceHandle>,
    ) -> Option<&TextureDescriptor> {
        match &self.resources.get(handle.into())?.description {
            ResourceDescription::Texture(descriptor) => Some(descriptor),
            _ => None,
        }
    }

    /// Resolution of a live render target.
    pub fn render_target_resolution(&self, handle: RenderTargetHandle) -> Option<Resolution> {
        self.texture_descriptor(handle)
            .map(|descriptor| Resolution::new(descriptor.size.width, descriptor.size.height))
    }

    /// Number of live resources (tables and layouts excluded).
    pub fn live_count(&self) -> usize {
        self.resources.len()
    }

    // ------------------------------------------------------------------
    // Render data tables
    // ------------------------------------------------------------------

    /// Validate `bindings` and create an immutable layout.
    ///
    /// Fails with [`GraphicsError::InvalidLayoutDescription`] on duplicate
    /// binding indices; no layout is produced in that case.
    pub fn create_render_data_table_layout(
        &mut self,
        bindings: impl IntoIterator<Item = RenderDataTableLayoutBinding>,
    ) -> Result<RenderDataTableLayoutHandle, GraphicsError> {
        let layout = RenderDataTableLayout::new(bindings)?;
        let handle = RenderDataTableLayoutHandle::new(self.layouts.insert(Arc::new(layout)));
        log::trace!("Created render data table layout {}", handle);
        Ok(handle)
    }

    /// A live layout.
    pub fn render_data_table_layout(
        &self,
        handle: RenderDataTableLayoutHandle,
    ) -> Option<&Arc<RenderDataTableLayout>> {
        self.layouts.get(handle.raw())
    }

    /// Destroy a layout. Tables created from it stay usable.
    ///
    /// # Panics
    ///
    /// Panics if the layout was already destroyed.
    pub fn destroy_render_data_table_layout(&mut self, handle: RenderDataTableLayoutHandle) {
        assert!(
            self.layouts.remove(handle.raw()).is_some(),
            "render data table layout {handle} destroyed twice"
        );
        log::trace!("Destroyed render data table layout {}", handle);
    }

    /// Allocate a table for `layout` with every slot unbound.
    ///
    /// When the descriptor pool is exhausted it grows once and the
    /// allocation is retried; a second failure is returned.
    pub fn create_render_data_table(
        &mut self,
        layout: RenderDataTableLayoutHandle,
    ) -> Result<RenderDataTableHandle, GraphicsError> {
        let description = self
            .layouts
            .get(layout.raw())
            .cloned()
            .ok_or_else(|| {
                GraphicsError::InvalidParameter(format!("layout {layout} is not alive"))
            })?;
        let native = self.pool.allocate(&description)?;
        let handle = RenderDataTableHandle::new(self.tables.insert(RenderDataTable::new(
            layout,
            description,
            native,
        )));
        log::trace!("Created render data table {} ({:?})", handle, native);
        Ok(handle)
    }

    /// A live table.
    pub fn render_data_table(&self, handle: RenderDataTableHandle) -> Option<&RenderDataTable> {
        self.tables.get(handle.raw())
    }

    /// Destroy a table. Its native is released once the frame slot comes around.
    ///
    /// # Panics
    ///
    /// Panics if the table was already destroyed.
    pub fn destroy_render_data_table(&mut self, handle: RenderDataTableHandle) {
        let Some(table) = self.tables.remove(handle.raw()) else {
            panic!("render data table {handle} destroyed twice");
        };
        self.deferred.queue(self.frame_slot, table.native());
        log::trace!("Destroyed render data table {}", handle);
    }

    /// Bind `resource` to `(binding, element)` of a table.
    ///
    /// Returns `Ok(false)` when the slot already held the same resource.
    /// Fails with [`GraphicsError::BindingMismatch`] if the slot does not
    /// exist, a referenced resource is destroyed, or the resource's kind or
    /// usage does not fit the slot's binding type.
    pub fn bind(
        &mut self,
        table: RenderDataTableHandle,
        binding: u32,
        element: u32,
        resource: impl Into<BindingResource>,
    ) -> Result<bool, GraphicsError> {
        let resource = resource.into();
        let entry = self.tables.get(table.raw()).ok_or_else(|| {
            GraphicsError::BindingMismatch(format!("render data table {table} is not alive"))
        })?;
        let Some(declared) = entry.layout().binding(binding).copied() else {
            return Err(GraphicsError::BindingMismatch(format!(
                "binding {binding} is not declared by the layout"
            )));
        };
        let Some(index) = entry.slot_index(binding, element) else {
            return Err(GraphicsError::BindingMismatch(format!(
                "element {element} out of range for binding {binding} (count {})",
                declared.count
            )));
        };
        if entry.slot(binding, element) == Some(resource) {
            return Ok(false);
        }

        let write = self.descriptor_write(&declared, element, resource)?;
        let native = entry.native();
        self.backend.write_descriptor_set(native, &[write])?;

        let entry = self.tables.get_mut(table.raw()).ok_or_else(|| {
            GraphicsError::Internal(format!("render data table {table} vanished during bind"))
        })?;
        entry.set_slot(index, resource);
        log::trace!(
            "Bound {:?} to {} binding {}[{}]",
            resource,
            table,
            binding,
            element
        );
        Ok(true)
    }

    /// Bind a uniform buffer to element 0 of `binding`.
    pub fn bind_uniform_buffer(
        &mut self,
        table: RenderDataTableHandle,
        binding: u32,
        buffer: BufferHandle,
    ) -> Result<bool, GraphicsError> {
        self.bind(table, binding, 0, buffer)
    }

    /// Bind a storage buffer to element 0 of `binding`.
    pub fn bind_storage_buffer(
        &mut self,
        table: RenderDataTableHandle,
        binding: u32,
        buffer: BufferHandle,
    ) -> Result<bool, GraphicsError> {
        self.bind(table, binding, 0, buffer)
    }

    /// Bind a texture or render target as a sampled image.
    pub fn bind_sampled_image(
        &mut self,
        table: RenderDataTableHandle,
        binding: u32,
        element: u32,
        image: impl Into<ResourceHandle>,
    ) -> Result<bool, GraphicsError> {
        self.bind(table, binding, element, BindingResource::Image(image.into()))
    }

    /// Bind a texture or render target as a storage image.
    pub fn bind_storage_image(
        &mut self,
        table: RenderDataTableHandle,
        binding: u32,
        image: impl Into<ResourceHandle>,
    ) -> Result<bool, GraphicsError> {
        self.bind(table, binding, 0, BindingResource::Image(image.into()))
    }

    /// Bind a sampler to element 0 of `binding`.
    pub fn bind_sampler(
        &mut self,
        table: RenderDataTableHandle,
        binding: u32,
        sampler: SamplerHandle,
    ) -> Result<bool, GraphicsError> {
        self.bind(table, binding, 0, sampler)
    }

    /// Bind an image together with its sampler.
    pub fn bind_combined_image_sampler(
        &mut self,
        table: RenderDataTableHandle,
        binding: u32,
        element: u32,
        image: impl Into<ResourceHandle>,
        sampler: SamplerHandle,
    ) -> Result<bool, GraphicsError> {
        self.bind(
            table,
            binding,
            element,
            BindingResource::CombinedImageSampler(image.into(), sampler),
        )
    }

    /// Bind an acceleration structure to element 0 of `binding`.
    pub fn bind_acceleration_structure(
        &mut self,
        table: RenderDataTableHandle,
        binding: u32,
        acceleration_structure: AccelerationStructureHandle,
    ) -> Result<bool, GraphicsError> {
        self.bind(table, binding, 0, acceleration_structure)
    }

    /// Resource bound at `(binding, element)`.
    pub fn bound(
        &self,
        table: RenderDataTableHandle,
        binding: u32,
        element: u32,
    ) -> Option<BindingResource> {
        self.tables.get(table.raw())?.slot(binding, element)
    }

    /// Tables with at least one slot referencing `handle`.
    pub fn tables_referencing(
        &self,
        handle: impl Into<ResourceHandle>,
    ) -> Vec<RenderDataTableHandle> {
        let handle = handle.into();
        self.tables
            .iter()
            .filter(|(_, table)| table.references(handle))
            .map(|(raw, _)| RenderDataTableHandle::new(raw))
            .collect()
    }

    /// Allocate a fresh native table and rewrite every bound slot.
    ///
    /// The old native is queued for deferred destruction and the table
    /// version is bumped; commands recorded against the old native must be
    /// re-recorded.
    pub fn rebuild_render_data_table(
        &mut self,
        handle: RenderDataTableHandle,
    ) -> Result<(), GraphicsError> {
        let table = self.tables.get(handle.raw()).ok_or_else(|| {
            GraphicsError::InvalidParameter(format!("render data table {handle} is not alive"))
        })?;

        let mut writes = Vec::new();
        for (binding, element, resource) in table.bound() {
            if let Some(declared) = table.layout().binding(binding) {
                writes.push(self.descriptor_write(declared, element, resource)?);
            }
        }

        let native = self.pool.allocate(table.layout())?;
        if let Err(error) = self.backend.write_descriptor_set(native, &writes) {
            self.backend.destroy(native);
            return Err(error);
        }

        let table = self.tables.get_mut(handle.raw()).ok_or_else(|| {
            GraphicsError::Internal(format!("render data table {handle} vanished during rebuild"))
        })?;
        let old = table.replace_native(native);
        let version = table.version();
        self.deferred.queue(self.frame_slot, old);
        log::debug!(
            "Rebuilt render data table {} ({:?} -> {:?}, version {})",
            handle,
            old,
            native,
            version
        );
        Ok(())
    }

    /// Number of live render data tables.
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Number of native descriptor pools created.
    pub fn descriptor_pool_count(&self) -> usize {
        self.pool.pool_count()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn texture_usage() -> TextureUsage {
        TextureUsage::SAMPLED | TextureUsage::TRANSFER_DST | TextureUsage::TRANSFER_SRC
    }

    fn render_target_descriptor(
        resolution: Resolution,
        format: TextureFormat,
    ) -> TextureDescriptor {
        let mut usage = TextureUsage::SAMPLED | TextureUsage::TRANSFER_SRC;
        if format.is_depth_stencil() {
            usage |= TextureUsage::DEPTH_STENCIL_ATTACHMENT;
        } else {
            usage |= TextureUsage::COLOR_ATTACHMENT | TextureUsage::STORAGE;
        }
        TextureDescriptor::new_2d(resolution.width, resolution.height, format, usage)
            .with_label("render target")
    }

    fn validate_texture(descriptor: &TextureDescriptor) -> Result<(), GraphicsError> {
        if descriptor.size.is_empty() {
            return Err(GraphicsError::InvalidParameter(format!(
                "texture size {}x{}x{} has a zero dimension",
                descriptor.size.width, descriptor.size.height, descriptor.size.depth
            )));
        }
        if descriptor.mip_level_count == 0
            || descriptor.mip_level_count > descriptor.max_mip_levels()
        {
            return Err(GraphicsError::InvalidParameter(format!(
                "mip level count {} outside 1..={}",
                descriptor.mip_level_count,
                descriptor.max_mip_levels()
            )));
        }
        Ok(())
    }

    fn insert(
        &mut self,
        kind: ResourceKind,
        native: NativeHandle,
        description: ResourceDescription,
    ) -> ResourceHandle {
        let handle = self.resources.insert(ResourceEntry {
            kind,
            native,
            description,
        });
        log::trace!("Created {} {} ({:?})", kind, handle, native);
        handle
    }

    fn destroy_resource(&mut self, handle: ResourceHandle) {
        let Some(entry) = self.resources.remove(handle) else {
            panic!("resource {handle} destroyed twice or never created");
        };
        self.deferred.queue(self.frame_slot, entry.native);
        log::trace!("Destroyed {} {}", entry.kind, handle);
    }

    fn live_entry(&self, handle: ResourceHandle) -> Result<&ResourceEntry, GraphicsError> {
        self.resources.get(handle).ok_or_else(|| {
            GraphicsError::BindingMismatch(format!("resource {handle} is destroyed"))
        })
    }

    fn descriptor_write(
        &self,
        declared: &RenderDataTableLayoutBinding,
        element: u32,
        resource: BindingResource,
    ) -> Result<DescriptorWrite, GraphicsError> {
        let binding = declared.binding;
        let binding_type = declared.binding_type;
        let mismatch = |kind: ResourceKind| {
            GraphicsError::BindingMismatch(format!(
                "binding {binding} expects {binding_type}, got {kind}"
            ))
        };

        let (primary, sampler) = match (binding_type, resource) {
            (
                BindingType::CombinedImageSampler,
                BindingResource::CombinedImageSampler(image, sampler),
            ) => {
                let sampler_entry = self.live_entry(sampler.into())?;
                if sampler_entry.kind != ResourceKind::Sampler {
                    return Err(mismatch(sampler_entry.kind));
                }
                (image, Some(sampler_entry.native))
            }
            (BindingType::CombinedImageSampler, _) => {
                return Err(GraphicsError::BindingMismatch(format!(
                    "binding {binding} expects {binding_type} with an image and a sampler"
                )));
            }
            (_, BindingResource::CombinedImageSampler(image, _)) => {
                return Err(mismatch(self.live_entry(image)?.kind));
            }
            (_, other) => match other.handles().next() {
                Some(first) => (first, None),
                None => unreachable!("every binding resource has a handle"),
            },
        };

        let entry = self.live_entry(primary)?;
        if !binding_type.accepts(entry.kind) {
            return Err(mismatch(entry.kind));
        }
        let missing_buffer_usage = binding_type.required_buffer_usage() - entry.buffer_usage();
        let missing_texture_usage = binding_type.required_texture_usage() - entry.texture_usage();
        if !missing_buffer_usage.is_empty() || !missing_texture_usage.is_empty() {
            return Err(GraphicsError::BindingMismatch(format!(
                "{} {primary} lacks usage {:?}{:?} required by {binding_type} binding {binding}",
                entry.kind, missing_buffer_usage, missing_texture_usage
            )));
        }

        Ok(DescriptorWrite {
            binding,
            element,
            binding_type,
            native: entry.native,
            sampler,
        })
    }
}

static_assertions::assert_impl_all!(GpuResources: Send, Sync);

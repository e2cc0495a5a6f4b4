//! Render data tables: resource handles bound to layout slots.

use std::sync::Arc;

use crate::backend::NativeHandle;
use crate::resources::{
    AccelerationStructureHandle, BufferHandle, RenderDataTableLayoutHandle, RenderTargetHandle,
    ResourceHandle, SamplerHandle, TextureHandle,
};

use super::RenderDataTableLayout;

/// A resource occupying one table slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingResource {
    /// A uniform or storage buffer.
    Buffer(BufferHandle),
    /// A texture or render target read as a sampled or storage image.
    Image(ResourceHandle),
    /// A standalone sampler.
    Sampler(SamplerHandle),
    /// An image paired with the sampler that reads it.
    CombinedImageSampler(ResourceHandle, SamplerHandle),
    /// A top level acceleration structure.
    AccelerationStructure(AccelerationStructureHandle),
}

impl BindingResource {
    /// The resource handles this slot references.
    pub fn handles(&self) -> impl Iterator<Item = ResourceHandle> + use<> {
        let (first, second) = match *self {
            BindingResource::Buffer(handle) => (handle.into(), None),
            BindingResource::Image(handle) => (handle, None),
            BindingResource::Sampler(handle) => (handle.into(), None),
            BindingResource::CombinedImageSampler(image, sampler) => (image, Some(sampler.into())),
            BindingResource::AccelerationStructure(handle) => (handle.into(), None),
        };
        std::iter::once(first).chain(second)
    }

    /// Returns true if this slot references `handle`.
    pub fn references(&self, handle: ResourceHandle) -> bool {
        self.handles().any(|h| h == handle)
    }
}

impl From<BufferHandle> for BindingResource {
    fn from(handle: BufferHandle) -> Self {
        BindingResource::Buffer(handle)
    }
}

impl From<TextureHandle> for BindingResource {
    fn from(handle: TextureHandle) -> Self {
        BindingResource::Image(handle.into())
    }
}

impl From<RenderTargetHandle> for BindingResource {
    fn from(handle: RenderTargetHandle) -> Self {
        BindingResource::Image(handle.into())
    }
}

impl From<SamplerHandle> for BindingResource {
    fn from(handle: SamplerHandle) -> Self {
        BindingResource::Sampler(handle)
    }
}

impl From<AccelerationStructureHandle> for BindingResource {
    fn from(handle: AccelerationStructureHandle) -> Self {
        BindingResource::AccelerationStructure(handle)
    }
}

/// A layout instance with one optional resource per slot.
///
/// Slots are addressed by `(binding, element)`. The native table changes
/// whenever the table is rebuilt; [`version`](Self::version) counts rebuilds
/// so owners can tell that commands recorded earlier are stale.
#[derive(Debug, Clone)]
pub struct RenderDataTable {
    layout_handle: RenderDataTableLayoutHandle,
    layout: Arc<RenderDataTableLayout>,
    native: NativeHandle,
    slots: Vec<Option<BindingResource>>,
    offsets: Vec<usize>,
    version: u64,
}

impl RenderDataTable {
    pub(crate) fn new(
        layout_handle: RenderDataTableLayoutHandle,
        layout: Arc<RenderDataTableLayout>,
        native: NativeHandle,
    ) -> Self {
        let mut offsets = Vec::with_capacity(layout.len());
        let mut total = 0;
        for binding in layout.bindings() {
            offsets.push(total);
            total += binding.count as usize;
        }

        Self {
            layout_handle,
            layout,
            native,
            slots: vec![None; total],
            offsets,
            version: 0,
        }
    }

    /// Handle of the layout this table was created from.
    pub fn layout_handle(&self) -> RenderDataTableLayoutHandle {
        self.layout_handle
    }

    /// The layout this table was created from.
    pub fn layout(&self) -> &RenderDataTableLayout {
        &self.layout
    }

    /// Current native table.
    pub fn native(&self) -> NativeHandle {
        self.native
    }

    /// Number of rebuilds so far.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Resource bound at `(binding, element)`, if any.
    pub fn slot(&self, binding: u32, element: u32) -> Option<BindingResource> {
        self.slot_index(binding, element)
            .and_then(|index| self.slots[index])
    }

    /// Returns true once every slot of the layout is bound.
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// `(binding, element)` pairs that are still unbound.
    pub fn unbound_slots(&self) -> Vec<(u32, u32)> {
        self.iter_slots()
            .filter(|(_, _, resource)| resource.is_none())
            .map(|(binding, element, _)| (binding, element))
            .collect()
    }

    /// Bound slots as `(binding, element, resource)`.
    pub fn bound(&self) -> impl Iterator<Item = (u32, u32, BindingResource)> + '_ {
        self.iter_slots()
            .filter_map(|(binding, element, resource)| resource.map(|r| (binding, element, r)))
    }

    /// Returns true if any slot references `handle`.
    pub fn references(&self, handle: ResourceHandle) -> bool {
        self.slots
            .iter()
            .flatten()
            .any(|resource| resource.references(handle))
    }

    /// Flattened slot index, or `None` when out of range.
    pub(crate) fn slot_index(&self, binding: u32, element: u32) -> Option<usize> {
        let position = self
            .layout
            .bindings()
            .binary_search_by_key(&binding, |b| b.binding)
            .ok()?;
        if element >= self.layout.bindings()[position].count {
            return None;
        }
        Some(self.offsets[position] + element as usize)
    }

    /// Store `resource` at a slot. Returns false if it was already there.
    pub(crate) fn set_slot(&mut self, index: usize, resource: BindingResource) -> bool {
        let changed = self.slots[index] != Some(resource);
        self.slots[index] = Some(resource);
        changed
    }

    /// Swap in a rebuilt native table and bump the version.
    pub(crate) fn replace_native(&mut self, native: NativeHandle) -> NativeHandle {
        self.version += 1;
        std::mem::replace(&mut self.native, native)
    }

    fn iter_slots(&self) -> impl Iterator<Item = (u32, u32, Option<BindingResource>)> + '_ {
        self.layout
            .bindings()
            .iter()
            .zip(&self.offsets)
            .flat_map(move |(binding, &offset)| {
                (0..binding.count).map(move |element| {
                    (
                        binding.binding,
                        element,
                        self.slots[offset + element as usize],
                    )
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::{BindingType, RenderDataTableLayoutBinding, ShaderStageFlags};

    fn table() -> RenderDataTable {
        let layout = RenderDataTableLayout::new([
            RenderDataTableLayoutBinding::new(
                0,
                BindingType::UniformBuffer,
                ShaderStageFlags::VERTEX,
            ),
            RenderDataTableLayoutBinding::new(
                2,
                BindingType::SampledImage,
                ShaderStageFlags::FRAGMENT,
            )
            .with_count(2),
        ])
        .unwrap();
        RenderDataTable::new(
            RenderDataTableLayoutHandle::new(ResourceHandle::new(0, 0)),
            Arc::new(layout),
            NativeHandle(1),
        )
    }

    #[test]
    fn test_slot_indexing() {
        let table = table();
        assert_eq!(table.slot_index(0, 0), Some(0));
        assert_eq!(table.slot_index(2, 0), Some(1));
        assert_eq!(table.slot_index(2, 1), Some(2));
        assert_eq!(table.slot_index(2, 2), None);
        assert_eq!(table.slot_index(1, 0), None);
    }

    #[test]
    fn test_completeness() {
        let mut table = table();
        assert!(!table.is_complete());
        assert_eq!(table.unbound_slots(), vec![(0, 0), (2, 0), (2, 1)]);

        let buffer = BufferHandle::new(ResourceHandle::new(4, 0));
        let texture = TextureHandle::new(ResourceHandle::new(5, 0));
        assert!(table.set_slot(0, buffer.into()));
        assert!(table.set_slot(1, texture.into()));
        assert!(table.set_slot(2, texture.into()));

        assert!(table.is_complete());
        assert_eq!(table.bound().count(), 3);
        assert!(table.references(texture.into()));
        assert!(!table.references(ResourceHandle::new(9, 0)));
    }

    #[test]
    fn test_rebind_same_resource_is_unchanged() {
        let mut table = table();
        let buffer = BufferHandle::new(ResourceHandle::new(4, 0));
        assert!(table.set_slot(0, buffer.into()));
        assert!(!table.set_slot(0, buffer.into()));
        assert_eq!(table.slot(0, 0), Some(BindingResource::Buffer(buffer)));
    }

    #[test]
    fn test_replace_native_bumps_version() {
        let mut table = table();
        let old = table.replace_native(NativeHandle(2));
        assert_eq!(old, NativeHandle(1));
        assert_eq!(table.native(), NativeHandle(2));
        assert_eq!(table.version(), 1);
    }

    #[test]
    fn test_combined_image_sampler_handles() {
        let image = ResourceHandle::new(1, 0);
        let sampler = SamplerHandle::new(ResourceHandle::new(2, 0));
        let resource = BindingResource::CombinedImageSampler(image, sampler);
        let handles: Vec<_> = resource.handles().collect();
        assert_eq!(handles, vec![image, sampler.into()]);
    }
}

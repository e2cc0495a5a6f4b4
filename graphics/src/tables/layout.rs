//! Render data table layouts.

use bitflags::bitflags;

use crate::error::GraphicsError;
use crate::resources::ResourceKind;
use crate::types::{BufferUsage, TextureUsage};

use super::DescriptorPoolSizes;

/// Type of resource a layout slot accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingType {
    /// Read-only uniform buffer.
    UniformBuffer,
    /// Texture read through a separate sampler.
    SampledImage,
    /// Read-write storage buffer.
    StorageBuffer,
    /// Read-write storage image.
    StorageImage,
    /// Top level acceleration structure for ray queries and tracing.
    AccelerationStructure,
    /// Standalone sampler.
    Sampler,
    /// Texture and sampler bound together.
    CombinedImageSampler,
}

impl BindingType {
    /// All binding types.
    pub const ALL: [BindingType; 7] = [
        BindingType::UniformBuffer,
        BindingType::SampledImage,
        BindingType::StorageBuffer,
        BindingType::StorageImage,
        BindingType::AccelerationStructure,
        BindingType::Sampler,
        BindingType::CombinedImageSampler,
    ];

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            BindingType::UniformBuffer => "UniformBuffer",
            BindingType::SampledImage => "SampledImage",
            BindingType::StorageBuffer => "StorageBuffer",
            BindingType::StorageImage => "StorageImage",
            BindingType::AccelerationStructure => "AccelerationStructure",
            BindingType::Sampler => "Sampler",
            BindingType::CombinedImageSampler => "CombinedImageSampler",
        }
    }

    /// Returns true if a resource of `kind` can occupy a slot of this type.
    ///
    /// For [`CombinedImageSampler`](Self::CombinedImageSampler) this checks
    /// the image half; the sampler half is checked separately.
    pub fn accepts(&self, kind: ResourceKind) -> bool {
        match self {
            BindingType::UniformBuffer | BindingType::StorageBuffer => {
                kind == ResourceKind::Buffer
            }
            BindingType::SampledImage
            | BindingType::StorageImage
            | BindingType::CombinedImageSampler => kind.is_image(),
            BindingType::AccelerationStructure => kind == ResourceKind::AccelerationStructure,
            BindingType::Sampler => kind == ResourceKind::Sampler,
        }
    }

    /// Buffer usage a buffer needs to be bound at a slot of this type.
    pub fn required_buffer_usage(&self) -> BufferUsage {
        match self {
            BindingType::UniformBuffer => BufferUsage::UNIFORM,
            BindingType::StorageBuffer => BufferUsage::STORAGE,
            _ => BufferUsage::empty(),
        }
    }

    /// Texture usage an image needs to be bound at a slot of this type.
    pub fn required_texture_usage(&self) -> TextureUsage {
        match self {
            BindingType::SampledImage | BindingType::CombinedImageSampler => {
                TextureUsage::SAMPLED
            }
            BindingType::StorageImage => TextureUsage::STORAGE,
            _ => TextureUsage::empty(),
        }
    }
}

impl std::fmt::Display for BindingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// Shader stages that can see a binding.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStageFlags: u32 {
        const VERTEX = 1 << 0;
        const TESSELLATION_CONTROL = 1 << 1;
        const TESSELLATION_EVALUATION = 1 << 2;
        const GEOMETRY = 1 << 3;
        const FRAGMENT = 1 << 4;
        const COMPUTE = 1 << 5;
        const RAY_GENERATION = 1 << 6;
        const MISS = 1 << 7;
        const CLOSEST_HIT = 1 << 8;
        const ANY_HIT = 1 << 9;
        const INTERSECTION = 1 << 10;

        /// Every rasterization stage.
        const ALL_GRAPHICS = Self::VERTEX.bits()
            | Self::TESSELLATION_CONTROL.bits()
            | Self::TESSELLATION_EVALUATION.bits()
            | Self::GEOMETRY.bits()
            | Self::FRAGMENT.bits();
        /// Every ray tracing stage.
        const ALL_RAY_TRACING = Self::RAY_GENERATION.bits()
            | Self::MISS.bits()
            | Self::CLOSEST_HIT.bits()
            | Self::ANY_HIT.bits()
            | Self::INTERSECTION.bits();
    }
}

impl Default for ShaderStageFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// One slot description of a [`RenderDataTableLayout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderDataTableLayoutBinding {
    /// Binding index the shader declares.
    pub binding: u32,
    /// Resource type the slot accepts.
    pub binding_type: BindingType,
    /// Array element count.
    pub count: u32,
    /// Stages that read the slot.
    pub stages: ShaderStageFlags,
}

impl RenderDataTableLayoutBinding {
    /// Create a single-element binding.
    pub fn new(binding: u32, binding_type: BindingType, stages: ShaderStageFlags) -> Self {
        Self {
            binding,
            binding_type,
            count: 1,
            stages,
        }
    }

    /// Set the array element count.
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }
}

/// An immutable, validated set of bindings.
///
/// Bindings are stored sorted by binding index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderDataTableLayout {
    bindings: Vec<RenderDataTableLayoutBinding>,
}

impl RenderDataTableLayout {
    /// Validate `bindings` and build a layout.
    ///
    /// Fails with [`GraphicsError::InvalidLayoutDescription`] if two bindings
    /// share an index or a binding has a count of zero.
    pub fn new(
        bindings: impl IntoIterator<Item = RenderDataTableLayoutBinding>,
    ) -> Result<Self, GraphicsError> {
        let mut bindings: Vec<_> = bindings.into_iter().collect();
        bindings.sort_by_key(|b| b.binding);

        for pair in bindings.windows(2) {
            if pair[0].binding == pair[1].binding {
                return Err(GraphicsError::InvalidLayoutDescription(format!(
                    "duplicate binding {}",
                    pair[0].binding
                )));
            }
        }
        if let Some(empty) = bindings.iter().find(|b| b.count == 0) {
            return Err(GraphicsError::InvalidLayoutDescription(format!(
                "binding {} has a count of zero",
                empty.binding
            )));
        }

        Ok(Self { bindings })
    }

    /// Bindings in ascending index order.
    pub fn bindings(&self) -> &[RenderDataTableLayoutBinding] {
        &self.bindings
    }

    /// Look up a binding by index.
    pub fn binding(&self, binding: u32) -> Option<&RenderDataTableLayoutBinding> {
        self.bindings
            .binary_search_by_key(&binding, |b| b.binding)
            .ok()
            .map(|i| &self.bindings[i])
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns true if the layout has no bindings.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Total number of array elements across all bindings.
    pub fn slot_count(&self) -> usize {
        self.bindings.iter().map(|b| b.count as usize).sum()
    }

    /// Pool capacity one table of this layout consumes.
    pub fn pool_requirements(&self) -> DescriptorPoolSizes {
        let mut sizes = DescriptorPoolSizes::zero();
        sizes.max_sets = 1;
        for binding in &self.bindings {
            let count = sizes.count_mut(binding.binding_type);
            *count = count.saturating_add(binding.count);
        }
        sizes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(index: u32, ty: BindingType) -> RenderDataTableLayoutBinding {
        RenderDataTableLayoutBinding::new(index, ty, ShaderStageFlags::FRAGMENT)
    }

    #[test]
    fn test_layout_sorted() {
        let layout = RenderDataTableLayout::new([
            binding(2, BindingType::Sampler),
            binding(0, BindingType::UniformBuffer),
            binding(1, BindingType::SampledImage),
        ])
        .unwrap();

        let indices: Vec<_> = layout.bindings().iter().map(|b| b.binding).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(
            layout.binding(1).unwrap().binding_type,
            BindingType::SampledImage
        );
        assert!(layout.binding(7).is_none());
    }

    #[test]
    fn test_duplicate_binding_rejected() {
        let result = RenderDataTableLayout::new([
            binding(3, BindingType::UniformBuffer),
            binding(3, BindingType::SampledImage),
        ]);
        assert_eq!(
            result,
            Err(GraphicsError::InvalidLayoutDescription(
                "duplicate binding 3".to_string()
            ))
        );
    }

    #[test]
    fn test_zero_count_rejected() {
        let result =
            RenderDataTableLayout::new([binding(0, BindingType::SampledImage).with_count(0)]);
        assert!(matches!(
            result,
            Err(GraphicsError::InvalidLayoutDescription(_))
        ));
    }

    #[test]
    fn test_pool_requirements() {
        let layout = RenderDataTableLayout::new([
            binding(0, BindingType::UniformBuffer),
            binding(1, BindingType::SampledImage).with_count(4),
            binding(2, BindingType::SampledImage),
        ])
        .unwrap();

        let sizes = layout.pool_requirements();
        assert_eq!(sizes.max_sets, 1);
        assert_eq!(sizes.uniform_buffers, 1);
        assert_eq!(sizes.sampled_images, 5);
        assert_eq!(sizes.storage_buffers, 0);
        assert_eq!(layout.slot_count(), 6);
    }

    #[test]
    fn test_pool_requirements_saturate() {
        let layout = RenderDataTableLayout::new([
            binding(0, BindingType::StorageBuffer).with_count(u32::MAX),
            binding(1, BindingType::StorageBuffer).with_count(2),
        ])
        .unwrap();

        let sizes = layout.pool_requirements();
        assert_eq!(sizes.storage_buffers, u32::MAX);
        assert_eq!(layout.slot_count(), u32::MAX as usize + 2);
    }

    #[test]
    fn test_binding_type_accepts() {
        assert!(BindingType::UniformBuffer.accepts(ResourceKind::Buffer));
        assert!(!BindingType::UniformBuffer.accepts(ResourceKind::Texture2D));
        assert!(BindingType::SampledImage.accepts(ResourceKind::RenderTarget));
        assert!(BindingType::SampledImage.accepts(ResourceKind::TextureCube));
        assert!(!BindingType::Sampler.accepts(ResourceKind::Texture2D));
        assert!(
            BindingType::AccelerationStructure.accepts(ResourceKind::AccelerationStructure)
        );
    }
}

//! Descriptor pool sizing and the growable table pool.

use std::sync::Arc;

use crate::backend::{GpuBackend, NativeHandle};
use crate::error::GraphicsError;

use super::{BindingType, RenderDataTableLayout};

/// Capacity of one native descriptor pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorPoolSizes {
    /// Maximum number of tables allocated from the pool.
    pub max_sets: u32,
    pub combined_image_samplers: u32,
    pub sampled_images: u32,
    pub samplers: u32,
    pub uniform_buffers: u32,
    pub storage_buffers: u32,
    pub storage_images: u32,
    pub acceleration_structures: u32,
}

impl DescriptorPoolSizes {
    pub const DEFAULT_MAX_SETS: u32 = 2_048;
    pub const DEFAULT_COMBINED_IMAGE_SAMPLERS: u32 = 8_192;
    pub const DEFAULT_SAMPLED_IMAGES: u32 = 8_192;
    pub const DEFAULT_SAMPLERS: u32 = 32;
    pub const DEFAULT_UNIFORM_BUFFERS: u32 = 256;
    pub const DEFAULT_STORAGE_BUFFERS: u32 = 16;
    pub const DEFAULT_STORAGE_IMAGES: u32 = 32;
    pub const DEFAULT_ACCELERATION_STRUCTURES: u32 = 16;

    /// A pool with no capacity at all.
    pub const fn zero() -> Self {
        Self {
            max_sets: 0,
            combined_image_samplers: 0,
            sampled_images: 0,
            samplers: 0,
            uniform_buffers: 0,
            storage_buffers: 0,
            storage_images: 0,
            acceleration_structures: 0,
        }
    }

    /// The same capacity for every binding type.
    pub const fn uniform(max_sets: u32, per_type: u32) -> Self {
        Self {
            max_sets,
            combined_image_samplers: per_type,
            sampled_images: per_type,
            samplers: per_type,
            uniform_buffers: per_type,
            storage_buffers: per_type,
            storage_images: per_type,
            acceleration_structures: per_type,
        }
    }

    /// Capacity for a binding type.
    pub fn count(&self, binding_type: BindingType) -> u32 {
        match binding_type {
            BindingType::UniformBuffer => self.uniform_buffers,
            BindingType::SampledImage => self.sampled_images,
            BindingType::StorageBuffer => self.storage_buffers,
            BindingType::StorageImage => self.storage_images,
            BindingType::AccelerationStructure => self.acceleration_structures,
            BindingType::Sampler => self.samplers,
            BindingType::CombinedImageSampler => self.combined_image_samplers,
        }
    }

    /// Mutable capacity for a binding type.
    pub fn count_mut(&mut self, binding_type: BindingType) -> &mut u32 {
        match binding_type {
            BindingType::UniformBuffer => &mut self.uniform_buffers,
            BindingType::SampledImage => &mut self.sampled_images,
            BindingType::StorageBuffer => &mut self.storage_buffers,
            BindingType::StorageImage => &mut self.storage_images,
            BindingType::AccelerationStructure => &mut self.acceleration_structures,
            BindingType::Sampler => &mut self.samplers,
            BindingType::CombinedImageSampler => &mut self.combined_image_samplers,
        }
    }

    /// Every capacity doubled (saturating).
    pub fn doubled(&self) -> Self {
        let mut sizes = *self;
        sizes.max_sets = sizes.max_sets.saturating_mul(2);
        for ty in BindingType::ALL {
            let count = sizes.count_mut(ty);
            *count = count.saturating_mul(2);
        }
        sizes
    }

    /// Returns true if no table could ever be allocated.
    pub fn is_empty(&self) -> bool {
        self.max_sets == 0 || BindingType::ALL.iter().all(|&ty| self.count(ty) == 0)
    }

    /// Returns true if `used + request` stays within this capacity.
    pub fn can_fit(&self, used: &Self, request: &Self) -> bool {
        used.max_sets.saturating_add(request.max_sets) <= self.max_sets
            && BindingType::ALL.iter().all(|&ty| {
                used.count(ty).saturating_add(request.count(ty)) <= self.count(ty)
            })
    }

    /// Add `other` to every capacity.
    pub fn add(&mut self, other: &Self) {
        self.max_sets = self.max_sets.saturating_add(other.max_sets);
        for ty in BindingType::ALL {
            let count = self.count_mut(ty);
            *count = count.saturating_add(other.count(ty));
        }
    }

    /// Subtract `other` from every capacity.
    pub fn subtract(&mut self, other: &Self) {
        self.max_sets = self.max_sets.saturating_sub(other.max_sets);
        for ty in BindingType::ALL {
            let count = self.count_mut(ty);
            *count = count.saturating_sub(other.count(ty));
        }
    }
}

impl Default for DescriptorPoolSizes {
    fn default() -> Self {
        Self {
            max_sets: Self::DEFAULT_MAX_SETS,
            combined_image_samplers: Self::DEFAULT_COMBINED_IMAGE_SAMPLERS,
            sampled_images: Self::DEFAULT_SAMPLED_IMAGES,
            samplers: Self::DEFAULT_SAMPLERS,
            uniform_buffers: Self::DEFAULT_UNIFORM_BUFFERS,
            storage_buffers: Self::DEFAULT_STORAGE_BUFFERS,
            storage_images: Self::DEFAULT_STORAGE_IMAGES,
            acceleration_structures: Self::DEFAULT_ACCELERATION_STRUCTURES,
        }
    }
}

/// Allocates native tables, growing when the current pool runs dry.
///
/// Allocation always goes to the newest native pool. When the backend
/// reports [`GraphicsError::DescriptorPoolExhausted`], a new pool with
/// doubled capacities is created and the allocation is retried once.
pub struct RenderDataTablePool {
    backend: Arc<dyn GpuBackend>,
    pools: Vec<NativeHandle>,
    sizes: DescriptorPoolSizes,
}

impl std::fmt::Debug for RenderDataTablePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderDataTablePool")
            .field("pools", &self.pools)
            .field("sizes", &self.sizes)
            .finish_non_exhaustive()
    }
}

impl RenderDataTablePool {
    /// Create the pool with its first native pool.
    pub fn new(
        backend: Arc<dyn GpuBackend>,
        sizes: DescriptorPoolSizes,
    ) -> Result<Self, GraphicsError> {
        if sizes.is_empty() {
            return Err(GraphicsError::InvalidParameter(
                "descriptor pool sizes are empty".to_string(),
            ));
        }
        let first = backend.create_descriptor_pool(&sizes)?;
        Ok(Self {
            backend,
            pools: vec![first],
            sizes,
        })
    }

    /// Allocate a native table for `layout`, growing the pool once if needed.
    pub fn allocate(
        &mut self,
        layout: &RenderDataTableLayout,
    ) -> Result<NativeHandle, GraphicsError> {
        let pool = self.current_pool()?;
        match self.backend.allocate_descriptor_set(pool, layout) {
            Err(GraphicsError::DescriptorPoolExhausted) => {
                self.grow()?;
                let pool = self.current_pool()?;
                self.backend.allocate_descriptor_set(pool, layout)
            }
            result => result,
        }
    }

    /// Number of native pools created so far.
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Capacity of the newest native pool.
    pub fn current_sizes(&self) -> DescriptorPoolSizes {
        self.sizes
    }

    /// Destroy every native pool (and every table allocated from them).
    pub fn release(&mut self) {
        for pool in self.pools.drain(..) {
            self.backend.destroy_descriptor_pool(pool);
        }
    }

    fn current_pool(&self) -> Result<NativeHandle, GraphicsError> {
        self.pools
            .last()
            .copied()
            .ok_or_else(|| GraphicsError::Internal("descriptor pool was released".to_string()))
    }

    fn grow(&mut self) -> Result<(), GraphicsError> {
        let sizes = self.sizes.doubled();
        log::warn!(
            "Descriptor pool exhausted, growing to {} sets (pool #{})",
            sizes.max_sets,
            self.pools.len() + 1
        );
        let pool = self.backend.create_descriptor_pool(&sizes)?;
        self.pools.push(pool);
        self.sizes = sizes;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;
    use crate::tables::{RenderDataTableLayoutBinding, ShaderStageFlags};

    fn layout(samplers: u32) -> RenderDataTableLayout {
        RenderDataTableLayout::new([RenderDataTableLayoutBinding::new(
            0,
            BindingType::SampledImage,
            ShaderStageFlags::FRAGMENT,
        )
        .with_count(samplers)])
        .unwrap()
    }

    #[test]
    fn test_default_sizes() {
        let sizes = DescriptorPoolSizes::default();
        assert_eq!(sizes.max_sets, 2048);
        assert_eq!(sizes.combined_image_samplers, 8192);
        assert_eq!(sizes.sampled_images, 8192);
        assert_eq!(sizes.samplers, 32);
        assert_eq!(sizes.uniform_buffers, 256);
        assert_eq!(sizes.storage_buffers, 16);
        assert_eq!(sizes.storage_images, 32);
        assert_eq!(sizes.acceleration_structures, 16);
    }

    #[test]
    fn test_doubled_and_fit() {
        let sizes = DescriptorPoolSizes::uniform(1, 2);
        let doubled = sizes.doubled();
        assert_eq!(doubled, DescriptorPoolSizes::uniform(2, 4));

        let request = layout(2).pool_requirements();
        assert!(sizes.can_fit(&DescriptorPoolSizes::zero(), &request));
        assert!(!sizes.can_fit(&request, &request));
        assert!(doubled.can_fit(&request, &request));
    }

    #[test]
    fn test_empty_sizes_rejected() {
        let backend = Arc::new(DummyBackend::new());
        let result = RenderDataTablePool::new(backend, DescriptorPoolSizes::zero());
        assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
    }

    #[test]
    fn test_grow_and_retry() {
        let backend = Arc::new(DummyBackend::new());
        let mut pool =
            RenderDataTablePool::new(backend.clone(), DescriptorPoolSizes::uniform(1, 4)).unwrap();

        pool.allocate(&layout(1)).unwrap();
        assert_eq!(pool.pool_count(), 1);

        // The first pool only holds one set.
        pool.allocate(&layout(1)).unwrap();
        assert_eq!(pool.pool_count(), 2);
        assert_eq!(pool.current_sizes().max_sets, 2);
    }

    #[test]
    fn test_exhausted_after_retry_propagates() {
        let backend = Arc::new(DummyBackend::new());
        let mut pool =
            RenderDataTablePool::new(backend.clone(), DescriptorPoolSizes::uniform(4, 1)).unwrap();

        // Needs 3 sampled images: doubling once only gives 2.
        let result = pool.allocate(&layout(3));
        assert_eq!(result, Err(GraphicsError::DescriptorPoolExhausted));
        assert_eq!(pool.pool_count(), 2);
    }

    #[test]
    fn test_release_destroys_pools() {
        let backend = Arc::new(DummyBackend::new());
        let mut pool =
            RenderDataTablePool::new(backend.clone(), DescriptorPoolSizes::default()).unwrap();
        pool.allocate(&layout(1)).unwrap();
        assert_eq!(backend.live_count(), 2);

        pool.release();
        assert_eq!(pool.pool_count(), 0);
        assert_eq!(backend.live_count(), 0);
        assert!(pool.allocate(&layout(1)).is_err());
    }
}

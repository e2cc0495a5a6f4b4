//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't perform actual GPU operations but keeps the books a
//! real driver (and its validation layer) would keep: every live native
//! object, device memory use, descriptor pool capacities, and the state of
//! the semaphores passed between acquire, submit and present. Misuse that a
//! real GPU would turn into corruption or a crash is reported as an error
//! here instead.
//!
//! Failure injection lets tests drive the recoverable paths:
//! - [`with_memory_budget`](DummyBackend::with_memory_budget) makes
//!   allocations fail with [`GraphicsError::OutOfDeviceMemory`],
//! - [`fail_next_acquire`](DummyBackend::fail_next_acquire) and
//!   [`fail_next_present`](DummyBackend::fail_next_present) report an
//!   outdated surface,
//! - [`with_deferred_completion`](DummyBackend::with_deferred_completion)
//!   holds fences until [`complete_pending_work`](DummyBackend::complete_pending_work).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::error::GraphicsError;
use crate::frame::{Fence, Semaphore};
use crate::tables::{DescriptorPoolSizes, RenderDataTableLayout};
use crate::types::{
    AccelerationStructureDescriptor, BufferDescriptor, Resolution, SamplerDescriptor,
    TextureDescriptor, TextureDimension,
};

use super::{DescriptorWrite, GpuBackend, NativeHandle, Submission};

/// Number of swapchain images the dummy surface rotates through.
const SWAPCHAIN_IMAGE_COUNT: u32 = 3;

/// Counters of the work the dummy backend has seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DummyStats {
    pub acquisitions: u64,
    pub submissions: u64,
    pub presents: u64,
    pub commands_executed: u64,
    pub descriptor_writes: u64,
    pub descriptor_pools_created: u64,
    pub destroyed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NativeObject {
    Buffer { size: u64 },
    Texture { size: u64 },
    Sampler,
    AccelerationStructure { size: u64 },
    DescriptorPool,
    DescriptorSet {
        pool: NativeHandle,
        usage: DescriptorPoolSizes,
    },
    CommandBuffer,
}

impl NativeObject {
    fn memory(&self) -> u64 {
        match *self {
            NativeObject::Buffer { size }
            | NativeObject::Texture { size }
            | NativeObject::AccelerationStructure { size } => size,
            _ => 0,
        }
    }
}

#[derive(Debug)]
struct PoolState {
    capacity: DescriptorPoolSizes,
    used: DescriptorPoolSizes,
}

#[derive(Debug)]
struct DummyState {
    objects: HashMap<NativeHandle, NativeObject>,
    pools: HashMap<NativeHandle, PoolState>,
    memory_used: u64,
    pending_fences: Vec<Fence>,
    failing_acquires: u32,
    failing_presents: u32,
    failing_submits: u32,
    next_image: u32,
    surface: Resolution,
    last_submission: Vec<NativeHandle>,
    stats: DummyStats,
}

/// Dummy GPU backend.
#[derive(Debug)]
pub struct DummyBackend {
    next_native: AtomicU64,
    memory_budget: Option<u64>,
    deferred_completion: bool,
    state: Mutex<DummyState>,
}

impl DummyBackend {
    /// Create a new dummy backend that completes all work on submission.
    pub fn new() -> Self {
        Self {
            next_native: AtomicU64::new(1),
            memory_budget: None,
            deferred_completion: false,
            state: Mutex::new(DummyState {
                objects: HashMap::new(),
                pools: HashMap::new(),
                memory_used: 0,
                pending_fences: Vec::new(),
                failing_acquires: 0,
                failing_presents: 0,
                failing_submits: 0,
                next_image: 0,
                surface: Resolution::default(),
                last_submission: Vec::new(),
                stats: DummyStats::default(),
            }),
        }
    }

    /// Fail allocations that would exceed `bytes` of device memory.
    pub fn with_memory_budget(mut self, bytes: u64) -> Self {
        self.memory_budget = Some(bytes);
        self
    }

    /// Hold submitted fences until [`complete_pending_work`](Self::complete_pending_work).
    pub fn with_deferred_completion(mut self) -> Self {
        self.deferred_completion = true;
        self
    }

    /// Finish all submitted work, signaling its fences. Returns the fence count.
    pub fn complete_pending_work(&self) -> usize {
        let fences: Vec<_> = self.state.lock().pending_fences.drain(..).collect();
        for fence in &fences {
            fence.signal();
        }
        fences.len()
    }

    /// Number of submissions whose fence has not been signaled yet.
    pub fn pending_work(&self) -> usize {
        self.state.lock().pending_fences.len()
    }

    /// Make the next `count` acquisitions report an outdated surface.
    pub fn fail_next_acquire(&self, count: u32) {
        self.state.lock().failing_acquires += count;
    }

    /// Make the next `count` presentations report an outdated surface.
    pub fn fail_next_present(&self, count: u32) {
        self.state.lock().failing_presents += count;
    }

    /// Make the next `count` submissions fail with
    /// [`GraphicsError::OutOfDeviceMemory`] before touching any semaphore.
    pub fn fail_next_submit(&self, count: u32) {
        self.state.lock().failing_submits += count;
    }

    /// Number of live native objects.
    pub fn live_count(&self) -> usize {
        self.state.lock().objects.len()
    }

    /// Returns true if `native` has been created and not destroyed.
    pub fn is_live(&self, native: NativeHandle) -> bool {
        self.state.lock().objects.contains_key(&native)
    }

    /// Device memory in use, in bytes.
    pub fn memory_used(&self) -> u64 {
        self.state.lock().memory_used
    }

    /// Work counters.
    pub fn stats(&self) -> DummyStats {
        self.state.lock().stats
    }

    /// Natives referenced by the most recent submission.
    pub fn last_submission(&self) -> Vec<NativeHandle> {
        self.state.lock().last_submission.clone()
    }

    /// Current surface resolution.
    pub fn surface_resolution(&self) -> Resolution {
        self.state.lock().surface
    }

    fn allocate(&self, object: NativeObject) -> Result<NativeHandle, GraphicsError> {
        let mut state = self.state.lock();
        let memory = object.memory();
        if let Some(budget) = self.memory_budget
            && state.memory_used.saturating_add(memory) > budget
        {
            log::error!(
                "DummyBackend: out of device memory ({} + {} > {} bytes)",
                state.memory_used,
                memory,
                budget
            );
            return Err(GraphicsError::OutOfDeviceMemory);
        }

        let native = NativeHandle(self.next_native.fetch_add(1, Ordering::Relaxed));
        state.memory_used += memory;
        state.objects.insert(native, object);
        Ok(native)
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn texture_memory(descriptor: &TextureDescriptor) -> u64 {
    let size = descriptor.size;
    (0..descriptor.mip_level_count.max(1))
        .map(|mip| {
            let width = (size.width >> mip).max(1) as u64;
            let height = (size.height >> mip).max(1) as u64;
            let depth = match descriptor.dimension {
                TextureDimension::D3 => (size.depth >> mip).max(1) as u64,
                TextureDimension::D2 | TextureDimension::Cube => size.depth.max(1) as u64,
            };
            width * height * depth * descriptor.format.texel_size() as u64
        })
        .sum()
}

impl GpuBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy"
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<NativeHandle, GraphicsError> {
        let native = self.allocate(NativeObject::Buffer {
            size: descriptor.size,
        })?;
        log::trace!(
            "DummyBackend: creating buffer {:?} {:?} (size: {})",
            native,
            descriptor.label,
            descriptor.size
        );
        Ok(native)
    }

    fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
        initial_data: Option<&[u8]>,
    ) -> Result<NativeHandle, GraphicsError> {
        let native = self.allocate(NativeObject::Texture {
            size: texture_memory(descriptor),
        })?;
        log::trace!(
            "DummyBackend: creating texture {:?} {:?} ({}x{}x{}, upload: {} bytes)",
            native,
            descriptor.label,
            descriptor.size.width,
            descriptor.size.height,
            descriptor.size.depth,
            initial_data.map_or(0, <[u8]>::len)
        );
        Ok(native)
    }

    fn create_sampler(
        &self,
        descriptor: &SamplerDescriptor,
    ) -> Result<NativeHandle, GraphicsError> {
        let native = self.allocate(NativeObject::Sampler)?;
        log::trace!(
            "DummyBackend: creating sampler {:?} ({:?}, mips {:?}, {:?})",
            native,
            descriptor.filter,
            descriptor.mip_filter,
            descriptor.address_mode
        );
        Ok(native)
    }

    fn create_acceleration_structure(
        &self,
        descriptor: &AccelerationStructureDescriptor,
    ) -> Result<NativeHandle, GraphicsError> {
        let native = self.allocate(NativeObject::AccelerationStructure {
            size: descriptor.estimated_size(),
        })?;
        log::trace!(
            "DummyBackend: creating {:?} acceleration structure {:?} ({} primitives)",
            descriptor.level,
            native,
            descriptor.primitive_count
        );
        Ok(native)
    }

    fn destroy(&self, native: NativeHandle) {
        let mut state = self.state.lock();
        let Some(object) = state.objects.remove(&native) else {
            panic!("native object {native:?} destroyed twice or never created");
        };
        state.memory_used -= object.memory();
        state.stats.destroyed += 1;
        if let NativeObject::DescriptorSet { pool, usage } = object
            && let Some(pool) = state.pools.get_mut(&pool)
        {
            pool.used.subtract(&usage);
        }
        log::trace!("DummyBackend: destroyed {:?}", native);
    }

    fn create_descriptor_pool(
        &self,
        sizes: &DescriptorPoolSizes,
    ) -> Result<NativeHandle, GraphicsError> {
        let native = self.allocate(NativeObject::DescriptorPool)?;
        let mut state = self.state.lock();
        state.pools.insert(
            native,
            PoolState {
                capacity: *sizes,
                used: DescriptorPoolSizes::zero(),
            },
        );
        state.stats.descriptor_pools_created += 1;
        log::trace!(
            "DummyBackend: creating descriptor pool {:?} ({} sets)",
            native,
            sizes.max_sets
        );
        Ok(native)
    }

    fn destroy_descriptor_pool(&self, pool: NativeHandle) {
        let mut state = self.state.lock();
        assert!(
            state.pools.remove(&pool).is_some(),
            "descriptor pool {pool:?} destroyed twice or never created"
        );
        state.objects.remove(&pool);
        let before = state.objects.len();
        state.objects.retain(|_, object| {
            !matches!(object, NativeObject::DescriptorSet { pool: owner, .. } if *owner == pool)
        });
        let freed = (before - state.objects.len()) as u64;
        state.stats.destroyed += freed + 1;
        log::trace!(
            "DummyBackend: destroyed descriptor pool {:?} with {} sets",
            pool,
            freed
        );
    }

    fn allocate_descriptor_set(
        &self,
        pool: NativeHandle,
        layout: &RenderDataTableLayout,
    ) -> Result<NativeHandle, GraphicsError> {
        let request = layout.pool_requirements();
        {
            let mut state = self.state.lock();
            let Some(pool_state) = state.pools.get_mut(&pool) else {
                return Err(GraphicsError::Internal(format!(
                    "unknown descriptor pool {pool:?}"
                )));
            };
            if !pool_state.capacity.can_fit(&pool_state.used, &request) {
                log::debug!("DummyBackend: descriptor pool {:?} exhausted", pool);
                return Err(GraphicsError::DescriptorPoolExhausted);
            }
            pool_state.used.add(&request);
        }

        let native = self.allocate(NativeObject::DescriptorSet {
            pool,
            usage: request,
        })?;
        log::trace!(
            "DummyBackend: allocated descriptor set {:?} from {:?}",
            native,
            pool
        );
        Ok(native)
    }

    fn write_descriptor_set(
        &self,
        set: NativeHandle,
        writes: &[DescriptorWrite],
    ) -> Result<(), GraphicsError> {
        let mut state = self.state.lock();
        if !matches!(
            state.objects.get(&set),
            Some(NativeObject::DescriptorSet { .. })
        ) {
            return Err(GraphicsError::Internal(format!(
                "write to destroyed descriptor set {set:?}"
            )));
        }
        for write in writes {
            for native in std::iter::once(write.native).chain(write.sampler) {
                if !state.objects.contains_key(&native) {
                    return Err(GraphicsError::Internal(format!(
                        "descriptor write to binding {} references destroyed native {native:?}",
                        write.binding
                    )));
                }
            }
        }
        state.stats.descriptor_writes += writes.len() as u64;
        Ok(())
    }

    fn create_command_buffer(&self) -> Result<NativeHandle, GraphicsError> {
        let native = self.allocate(NativeObject::CommandBuffer)?;
        log::trace!("DummyBackend: creating command buffer {:?}", native);
        Ok(native)
    }

    fn acquire_next_image(&self, image_available: &Semaphore) -> Result<u32, GraphicsError> {
        let mut state = self.state.lock();
        state.stats.acquisitions += 1;
        if state.failing_acquires > 0 {
            state.failing_acquires -= 1;
            return Err(GraphicsError::SurfaceOutdated);
        }
        if image_available.is_pending() {
            return Err(GraphicsError::Internal(format!(
                "image-available semaphore {} is already signaled",
                image_available.id()
            )));
        }

        let index = state.next_image;
        state.next_image = (index + 1) % SWAPCHAIN_IMAGE_COUNT;
        image_available.signal();
        log::trace!("DummyBackend: acquired swapchain image {}", index);
        Ok(index)
    }

    fn submit(&self, submission: &Submission<'_>, fence: &Fence) -> Result<(), GraphicsError> {
        let natives = submission.referenced_natives();
        let mut state = self.state.lock();
        if state.failing_submits > 0 {
            state.failing_submits -= 1;
            log::trace!("DummyBackend: rejecting submission");
            return Err(GraphicsError::OutOfDeviceMemory);
        }

        for buffer in &submission.command_buffers {
            if !matches!(
                state.objects.get(&buffer.native()),
                Some(NativeObject::CommandBuffer)
            ) {
                return Err(GraphicsError::Internal(format!(
                    "submitted command buffer {:?} is not live",
                    buffer.native()
                )));
            }
        }
        if let Some(stale) = natives.iter().find(|n| !state.objects.contains_key(n)) {
            return Err(GraphicsError::Internal(format!(
                "submission references destroyed native object {stale:?}"
            )));
        }
        if !submission.wait.consume() {
            return Err(GraphicsError::Internal(format!(
                "submission waits on semaphore {} that was never signaled",
                submission.wait.id()
            )));
        }

        let commands: usize = submission
            .command_buffers
            .iter()
            .map(|buffer| buffer.len())
            .sum();
        log::trace!(
            "DummyBackend: executing {} command buffers ({} commands)",
            submission.command_buffers.len(),
            commands
        );
        state.stats.submissions += 1;
        state.stats.commands_executed += commands as u64;
        state.last_submission = natives;

        submission.signal.signal();
        if self.deferred_completion {
            state.pending_fences.push(fence.clone());
        } else {
            fence.signal();
        }
        Ok(())
    }

    fn present(
        &self,
        image_index: u32,
        render_finished: &Semaphore,
    ) -> Result<(), GraphicsError> {
        let mut state = self.state.lock();
        state.stats.presents += 1;
        if state.failing_presents > 0 {
            state.failing_presents -= 1;
            render_finished.consume();
            return Err(GraphicsError::SurfaceOutdated);
        }
        if image_index >= SWAPCHAIN_IMAGE_COUNT {
            return Err(GraphicsError::InvalidParameter(format!(
                "swapchain image {image_index} out of range"
            )));
        }
        if !render_finished.consume() {
            return Err(GraphicsError::Internal(format!(
                "present waits on semaphore {} that was never signaled",
                render_finished.id()
            )));
        }
        log::trace!("DummyBackend: presented swapchain image {}", image_index);
        Ok(())
    }

    fn resize_surface(&self, resolution: Resolution) -> Result<(), GraphicsError> {
        if resolution.is_empty() {
            return Err(GraphicsError::InvalidParameter(format!(
                "surface resolution {resolution} is empty"
            )));
        }
        let mut state = self.state.lock();
        state.surface = resolution;
        state.next_image = 0;
        log::debug!("DummyBackend: surface resized to {}", resolution);
        Ok(())
    }

    fn wait_idle(&self) {
        let completed = self.complete_pending_work();
        if completed > 0 {
            log::trace!("DummyBackend: idle after completing {} submissions", completed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::{BindingType, RenderDataTableLayoutBinding, ShaderStageFlags};
    use crate::types::{BufferUsage, TextureFormat, TextureUsage};

    #[test]
    fn test_create_and_destroy() {
        let backend = DummyBackend::new();
        let buffer = backend
            .create_buffer(&BufferDescriptor::new(256, BufferUsage::UNIFORM))
            .unwrap();
        assert!(backend.is_live(buffer));
        assert_eq!(backend.memory_used(), 256);

        backend.destroy(buffer);
        assert!(!backend.is_live(buffer));
        assert_eq!(backend.memory_used(), 0);
        assert_eq!(backend.stats().destroyed, 1);
    }

    #[test]
    #[should_panic(expected = "destroyed twice")]
    fn test_double_destroy_panics() {
        let backend = DummyBackend::new();
        let sampler = backend.create_sampler(&SamplerDescriptor::linear()).unwrap();
        backend.destroy(sampler);
        backend.destroy(sampler);
    }

    #[test]
    fn test_memory_budget() {
        let backend = DummyBackend::new().with_memory_budget(1024);
        let descriptor =
            TextureDescriptor::new_2d(16, 16, TextureFormat::Rgba8Unorm, TextureUsage::TRANSFER_DST);
        assert!(backend.create_texture(&descriptor, None).is_ok());
        assert_eq!(
            backend.create_texture(&descriptor, None),
            Err(GraphicsError::OutOfDeviceMemory)
        );
    }

    #[test]
    fn test_texture_memory_counts_mips() {
        let descriptor =
            TextureDescriptor::new_2d(4, 4, TextureFormat::R8Unorm, TextureUsage::empty())
                .with_mip_levels(3);
        assert_eq!(texture_memory(&descriptor), 16 + 4 + 1);
    }

    #[test]
    fn test_destroying_pool_frees_sets() {
        let backend = DummyBackend::new();
        let pool = backend
            .create_descriptor_pool(&DescriptorPoolSizes::default())
            .unwrap();
        let layout = RenderDataTableLayout::new([RenderDataTableLayoutBinding::new(
            0,
            BindingType::UniformBuffer,
            ShaderStageFlags::VERTEX,
        )])
        .unwrap();
        let set = backend.allocate_descriptor_set(pool, &layout).unwrap();

        backend.destroy_descriptor_pool(pool);
        assert!(!backend.is_live(set));
        assert_eq!(backend.live_count(), 0);
    }

    #[test]
    fn test_freed_set_returns_capacity() {
        let backend = DummyBackend::new();
        let pool = backend
            .create_descriptor_pool(&DescriptorPoolSizes::uniform(1, 1))
            .unwrap();
        let layout = RenderDataTableLayout::new([RenderDataTableLayoutBinding::new(
            0,
            BindingType::Sampler,
            ShaderStageFlags::FRAGMENT,
        )])
        .unwrap();

        let set = backend.allocate_descriptor_set(pool, &layout).unwrap();
        assert_eq!(
            backend.allocate_descriptor_set(pool, &layout),
            Err(GraphicsError::DescriptorPoolExhausted)
        );
        backend.destroy(set);
        assert!(backend.allocate_descriptor_set(pool, &layout).is_ok());
    }

    #[test]
    fn test_semaphore_chain() {
        let backend = DummyBackend::new();
        let image_available = Semaphore::new();
        let render_finished = Semaphore::new();
        let fence = Fence::new(false);

        let index = backend.acquire_next_image(&image_available).unwrap();
        let submission = Submission {
            command_buffers: Vec::new(),
            wait: &image_available,
            signal: &render_finished,
        };
        backend.submit(&submission, &fence).unwrap();
        assert!(fence.is_signaled());
        backend.present(index, &render_finished).unwrap();

        // Presenting again without a new submission breaks the chain.
        assert!(matches!(
            backend.present(index, &render_finished),
            Err(GraphicsError::Internal(_))
        ));
    }

    #[test]
    fn test_submit_without_acquire_fails() {
        let backend = DummyBackend::new();
        let submission = Submission {
            command_buffers: Vec::new(),
            wait: &Semaphore::new(),
            signal: &Semaphore::new(),
        };
        assert!(backend.submit(&submission, &Fence::new(false)).is_err());
    }

    #[test]
    fn test_deferred_completion() {
        let backend = DummyBackend::new().with_deferred_completion();
        let image_available = Semaphore::new();
        let fence = Fence::new(false);

        backend.acquire_next_image(&image_available).unwrap();
        let submission = Submission {
            command_buffers: Vec::new(),
            wait: &image_available,
            signal: &Semaphore::new(),
        };
        backend.submit(&submission, &fence).unwrap();
        assert!(!fence.is_signaled());
        assert_eq!(backend.pending_work(), 1);

        assert_eq!(backend.complete_pending_work(), 1);
        assert!(fence.is_signaled());
    }

    #[test]
    fn test_injected_surface_outdated() {
        let backend = DummyBackend::new();
        backend.fail_next_acquire(1);
        let semaphore = Semaphore::new();
        assert_eq!(
            backend.acquire_next_image(&semaphore),
            Err(GraphicsError::SurfaceOutdated)
        );
        assert!(!semaphore.is_pending());
        assert_eq!(backend.acquire_next_image(&semaphore), Ok(0));
    }

    #[test]
    fn test_resize_surface() {
        let backend = DummyBackend::new();
        backend.resize_surface(Resolution::new(640, 480)).unwrap();
        assert_eq!(backend.surface_resolution(), Resolution::new(640, 480));
        assert!(backend.resize_surface(Resolution::new(0, 480)).is_err());
    }
}

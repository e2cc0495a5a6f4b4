//! Rendering system configuration.

use catalyst_core::MAXIMUM_SPIN_COUNT;

use crate::error::GraphicsError;
use crate::frame::MAX_FRAMES_IN_FLIGHT;
use crate::path::RenderingPath;
use crate::tables::DescriptorPoolSizes;
use crate::types::Resolution;

/// Parameters of a [`RenderingSystem`](crate::RenderingSystem).
///
/// # Example
///
/// ```
/// use catalyst_graphics::{RenderingConfiguration, RenderingPath, Resolution};
///
/// let config = RenderingConfiguration::default()
///     .with_frames_in_flight(3)
///     .with_resolution(Resolution::new(1920, 1080))
///     .with_rendering_path(RenderingPath::PathTracing);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderingConfiguration {
    /// Number of frame slots the CPU may record ahead of the GPU.
    pub frames_in_flight: usize,
    /// Initial output resolution.
    pub resolution: Resolution,
    /// Path active after initialization.
    pub initial_rendering_path: RenderingPath,
    /// Capacity of each descriptor pool the render data tables come from.
    pub descriptor_pool: DescriptorPoolSizes,
    /// Spin iterations before a fence wait blocks.
    pub fence_spin_count: u32,
}

impl Default for RenderingConfiguration {
    fn default() -> Self {
        Self {
            frames_in_flight: 2,
            resolution: Resolution::default(),
            initial_rendering_path: RenderingPath::Default,
            descriptor_pool: DescriptorPoolSizes::default(),
            fence_spin_count: MAXIMUM_SPIN_COUNT,
        }
    }
}

impl RenderingConfiguration {
    /// Set the number of frames in flight.
    pub fn with_frames_in_flight(mut self, frames_in_flight: usize) -> Self {
        self.frames_in_flight = frames_in_flight;
        self
    }

    /// Set the output resolution.
    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    /// Set the initial rendering path.
    pub fn with_rendering_path(mut self, path: RenderingPath) -> Self {
        self.initial_rendering_path = path;
        self
    }

    /// Set the descriptor pool capacity.
    pub fn with_descriptor_pool(mut self, sizes: DescriptorPoolSizes) -> Self {
        self.descriptor_pool = sizes;
        self
    }

    /// Set the fence spin count.
    pub fn with_fence_spin_count(mut self, spin_count: u32) -> Self {
        self.fence_spin_count = spin_count;
        self
    }

    /// Check every parameter is in range.
    pub fn validate(&self) -> Result<(), GraphicsError> {
        if !(1..=MAX_FRAMES_IN_FLIGHT).contains(&self.frames_in_flight) {
            return Err(GraphicsError::InvalidParameter(format!(
                "frames in flight must be between 1 and {MAX_FRAMES_IN_FLIGHT}, got {}",
                self.frames_in_flight
            )));
        }
        if self.resolution.is_empty() {
            return Err(GraphicsError::InvalidParameter(format!(
                "resolution {} is empty",
                self.resolution
            )));
        }
        if self.descriptor_pool.is_empty() {
            return Err(GraphicsError::InvalidParameter(
                "descriptor pool sizes are empty".to_string(),
            ));
        }
        Ok(())
    }
}

//! GPU buffer creation parameters.
//!
//! Binding a buffer into a render data table checks the usage it was created
//! with, see [`BindingType::required_buffer_usage`](crate::BindingType::required_buffer_usage).

use bitflags::bitflags;

bitflags! {
    /// What a buffer may be bound or used as.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BufferUsage: u32 {
        const UNIFORM = 1 << 0;
        const STORAGE = 1 << 1;
        const VERTEX = 1 << 2;
        const INDEX = 1 << 3;
        /// Source of a transfer (readback, copies into targets).
        const TRANSFER_SRC = 1 << 4;
        /// Destination of a staging upload.
        const TRANSFER_DST = 1 << 5;
        /// Geometry or instance data consumed by acceleration structure builds.
        const RAY_TRACING_INPUT = 1 << 6;
    }
}

/// Size, usage and optional debug name of a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BufferDescriptor {
    pub label: Option<String>,
    /// Size in bytes; zero is rejected at creation.
    pub size: u64,
    pub usage: BufferUsage,
}

impl BufferDescriptor {
    pub fn new(size: u64, usage: BufferUsage) -> Self {
        Self {
            label: None,
            size,
            usage,
        }
    }

    /// Attach a debug name, shown in backend trace logs.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Whether the buffer can back a render data table binding.
    pub fn is_bindable(&self) -> bool {
        self.usage
            .intersects(BufferUsage::UNIFORM | BufferUsage::STORAGE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bindable_usage() {
        assert!(BufferDescriptor::new(64, BufferUsage::UNIFORM).is_bindable());
        assert!(
            BufferDescriptor::new(64, BufferUsage::STORAGE | BufferUsage::TRANSFER_DST)
                .is_bindable()
        );
        assert!(!BufferDescriptor::new(64, BufferUsage::VERTEX | BufferUsage::INDEX).is_bindable());
    }

    #[test]
    fn test_label() {
        let descriptor = BufferDescriptor::new(16, BufferUsage::UNIFORM).with_label("camera");
        assert_eq!(descriptor.label.as_deref(), Some("camera"));
        assert_eq!(descriptor.size, 16);
    }
}

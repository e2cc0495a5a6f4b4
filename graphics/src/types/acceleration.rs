//! Ray-tracing acceleration structure descriptors.

/// Level of an acceleration structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccelerationStructureLevel {
    /// Geometry-level structure built from triangles.
    BottomLevel,
    /// Scene-level structure built from bottom-level instances.
    TopLevel,
}

/// Descriptor for creating an acceleration structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccelerationStructureDescriptor {
    /// Debug label.
    pub label: Option<String>,
    /// Bottom or top level.
    pub level: AccelerationStructureLevel,
    /// Triangle count for bottom-level, instance count for top-level.
    pub primitive_count: u32,
}

impl AccelerationStructureDescriptor {
    /// Bottom-level structure over `triangle_count` triangles.
    pub fn bottom_level(triangle_count: u32) -> Self {
        Self {
            label: None,
            level: AccelerationStructureLevel::BottomLevel,
            primitive_count: triangle_count,
        }
    }

    /// Top-level structure over `instance_count` instances.
    pub fn top_level(instance_count: u32) -> Self {
        Self {
            label: None,
            level: AccelerationStructureLevel::TopLevel,
            primitive_count: instance_count,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Rough native allocation size used for memory accounting.
    pub fn estimated_size(&self) -> u64 {
        let per_primitive = match self.level {
            AccelerationStructureLevel::BottomLevel => 64,
            AccelerationStructureLevel::TopLevel => 128,
        };
        (self.primitive_count.max(1) as u64) * per_primitive
    }
}

//! Stable resource handles.

use std::fmt;

/// Opaque handle to a GPU-side object owned by [`GpuResources`](super::GpuResources).
///
/// Handles index into a generational arena: a destroyed slot is reused with a
/// bumped generation, so a stale copy never aliases the new occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceHandle {
    /// Index into the arena.
    index: u32,
    /// Generation counter for validation.
    generation: u32,
}

impl ResourceHandle {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Get the arena index of this handle.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Get the generation of this handle.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

macro_rules! typed_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(ResourceHandle);

        impl $name {
            pub(crate) const fn new(handle: ResourceHandle) -> Self {
                Self(handle)
            }

            /// The untyped handle.
            pub fn raw(&self) -> ResourceHandle {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", stringify!($name), self.0)
            }
        }
    };
}

macro_rules! resource_handle {
    ($(#[$meta:meta])* $name:ident) => {
        typed_handle!($(#[$meta])* $name);

        impl From<$name> for ResourceHandle {
            fn from(handle: $name) -> Self {
                handle.0
            }
        }
    };
}

resource_handle!(
    /// Handle to a buffer.
    BufferHandle
);
resource_handle!(
    /// Handle to a 2D, 3D or cube texture.
    TextureHandle
);
resource_handle!(
    /// Handle to a render target. Stays valid across window resizes.
    RenderTargetHandle
);
resource_handle!(
    /// Handle to a sampler.
    SamplerHandle
);
resource_handle!(
    /// Handle to a ray tracing acceleration structure.
    AccelerationStructureHandle
);
typed_handle!(
    /// Handle to a render data table layout.
    RenderDataTableLayoutHandle
);
typed_handle!(
    /// Handle to a render data table.
    RenderDataTableHandle
);

/// Kind of object behind a [`ResourceHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Buffer,
    Texture2D,
    Texture3D,
    TextureCube,
    RenderTarget,
    Sampler,
    AccelerationStructure,
}

impl ResourceKind {
    /// Returns true for kinds that can be read as images.
    pub fn is_image(&self) -> bool {
        matches!(
            self,
            Self::Texture2D | Self::Texture3D | Self::TextureCube | Self::RenderTarget
        )
    }

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Buffer => "Buffer",
            Self::Texture2D => "Texture2D",
            Self::Texture3D => "Texture3D",
            Self::TextureCube => "TextureCube",
            Self::RenderTarget => "RenderTarget",
            Self::Sampler => "Sampler",
            Self::AccelerationStructure => "AccelerationStructure",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_display() {
        let handle = ResourceHandle::new(3, 1);
        assert_eq!(handle.to_string(), "#3v1");
        assert_eq!(BufferHandle::new(handle).to_string(), "BufferHandle#3v1");
    }

    #[test]
    fn test_typed_handle_into_raw() {
        let handle = ResourceHandle::new(7, 0);
        let texture = TextureHandle::new(handle);
        assert_eq!(ResourceHandle::from(texture), handle);
        assert_eq!(texture.raw(), handle);
    }

    #[test]
    fn test_kind_is_image() {
        assert!(ResourceKind::RenderTarget.is_image());
        assert!(ResourceKind::Texture3D.is_image());
        assert!(!ResourceKind::Buffer.is_image());
        assert!(!ResourceKind::Sampler.is_image());
    }
}

//! Graphics error types.

use std::fmt;

use crate::pass::RenderPassStage;

/// Errors that can occur in the rendering core.
///
/// Programming errors (destroying a handle twice, using a pipeline before it
/// is initialized) are not represented here; they panic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphicsError {
    /// Failed to initialize the rendering system.
    InitializationFailed(String),
    /// Failed to create a resource.
    ResourceCreationFailed(String),
    /// The device ran out of memory for an allocation.
    OutOfDeviceMemory,
    /// The GPU device was lost.
    DeviceLost,
    /// An invalid parameter was provided.
    InvalidParameter(String),
    /// A render data table layout was rejected.
    InvalidLayoutDescription(String),
    /// No descriptor pool had room for the requested table.
    DescriptorPoolExhausted,
    /// A resource does not fit the binding it was bound to.
    BindingMismatch(String),
    /// A pipeline referenced a shader that is not in the library.
    ShaderNotFound(String),
    /// A render pass is already registered at this stage.
    StageAlreadyRegistered(RenderPassStage),
    /// Render pass registration is closed after initialization.
    RegistrationClosed,
    /// The surface is outdated and the swapchain must be recreated.
    SurfaceOutdated,
    /// The surface was lost.
    SurfaceLost,
    /// An internal error occurred.
    Internal(String),
}

impl GraphicsError {
    /// Returns true for conditions handled by recreating swapchain resources.
    pub fn requires_recreation(&self) -> bool {
        matches!(self, Self::SurfaceOutdated | Self::SurfaceLost)
    }
}

impl fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitializationFailed(msg) => write!(f, "initialization failed: {msg}"),
            Self::ResourceCreationFailed(msg) => write!(f, "resource creation failed: {msg}"),
            Self::OutOfDeviceMemory => write!(f, "out of device memory"),
            Self::DeviceLost => write!(f, "GPU device lost"),
            Self::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
            Self::InvalidLayoutDescription(msg) => write!(f, "invalid layout description: {msg}"),
            Self::DescriptorPoolExhausted => write!(f, "descriptor pool exhausted"),
            Self::BindingMismatch(msg) => write!(f, "binding mismatch: {msg}"),
            Self::ShaderNotFound(name) => write!(f, "shader not found: {name}"),
            Self::StageAlreadyRegistered(stage) => {
                write!(f, "a render pass is already registered at stage {stage}")
            }
            Self::RegistrationClosed => write!(f, "render pass registration is closed"),
            Self::SurfaceOutdated => write!(f, "surface outdated, needs reconfiguration"),
            Self::SurfaceLost => write!(f, "surface lost, needs recreation"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for GraphicsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphicsError::OutOfDeviceMemory;
        assert_eq!(err.to_string(), "out of device memory");

        let err = GraphicsError::InvalidLayoutDescription("duplicate binding 3".to_string());
        assert_eq!(
            err.to_string(),
            "invalid layout description: duplicate binding 3"
        );

        let err = GraphicsError::StageAlreadyRegistered(RenderPassStage::Bloom);
        assert_eq!(
            err.to_string(),
            "a render pass is already registered at stage Bloom"
        );
    }

    #[test]
    fn test_requires_recreation() {
        assert!(GraphicsError::SurfaceOutdated.requires_recreation());
        assert!(!GraphicsError::DeviceLost.requires_recreation());
    }
}

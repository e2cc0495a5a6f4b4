//! Sampler creation parameters.

/// Texel filter used for magnification, minification and mip selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    #[default]
    Nearest,
    Linear,
}

/// Addressing outside the `[0, 1]` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    #[default]
    ClampToEdge,
    Repeat,
}

/// Sampler state. Samplers are immutable once created and may be shared by
/// any number of render data tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SamplerDescriptor {
    pub filter: FilterMode,
    pub mip_filter: FilterMode,
    pub address_mode: AddressMode,
}

impl SamplerDescriptor {
    /// Trilinear clamp sampler, used for shared render targets.
    pub fn linear() -> Self {
        Self {
            filter: FilterMode::Linear,
            mip_filter: FilterMode::Linear,
            address_mode: AddressMode::ClampToEdge,
        }
    }

    /// Point sampler, used for full-resolution lookups such as the G-buffer.
    pub fn nearest() -> Self {
        Self::default()
    }

    pub fn repeating(mut self) -> Self {
        self.address_mode = AddressMode::Repeat;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(SamplerDescriptor::nearest().filter, FilterMode::Nearest);
        let linear = SamplerDescriptor::linear().repeating();
        assert_eq!(linear.filter, FilterMode::Linear);
        assert_eq!(linear.mip_filter, FilterMode::Linear);
        assert_eq!(linear.address_mode, AddressMode::Repeat);
    }
}

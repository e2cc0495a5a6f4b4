//! Texture and render target creation parameters.

use super::Extent3d;
use bitflags::bitflags;

/// Texel formats understood by the engine.
///
/// The set covers the shared render targets (G-buffer features, HDR scene
/// color, quarter-resolution intermediates) plus the usual asset formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFormat {
    R8Unorm,
    #[default]
    Rgba8Unorm,
    Rgba8Srgb,
    Rg16Float,
    Rgba16Float,
    Rgba32Float,
    Depth32Float,
}

impl TextureFormat {
    pub fn is_depth_stencil(self) -> bool {
        matches!(self, Self::Depth32Float)
    }

    /// Bytes per texel.
    pub fn texel_size(self) -> u32 {
        match self {
            Self::R8Unorm => 1,
            Self::Rgba8Unorm | Self::Rgba8Srgb | Self::Rg16Float | Self::Depth32Float => 4,
            Self::Rgba16Float => 8,
            Self::Rgba32Float => 16,
        }
    }
}

/// Image view type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureDimension {
    #[default]
    D2,
    /// Volume; every mip level halves the depth too.
    D3,
    /// Six array layers sampled by direction.
    Cube,
}

bitflags! {
    /// Image usage. Render data table bindings check these, see
    /// [`BindingType::required_texture_usage`](crate::BindingType::required_texture_usage).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TextureUsage: u32 {
        const SAMPLED = 1 << 0;
        const STORAGE = 1 << 1;
        const COLOR_ATTACHMENT = 1 << 2;
        const DEPTH_STENCIL_ATTACHMENT = 1 << 3;
        const TRANSFER_SRC = 1 << 4;
        const TRANSFER_DST = 1 << 5;
    }
}

/// Creation parameters of a texture or render target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    pub label: Option<String>,
    pub dimension: TextureDimension,
    /// For cube textures `depth` holds the face count.
    pub size: Extent3d,
    pub mip_level_count: u32,
    pub format: TextureFormat,
    pub usage: TextureUsage,
}

impl TextureDescriptor {
    pub fn new_2d(width: u32, height: u32, format: TextureFormat, usage: TextureUsage) -> Self {
        Self {
            label: None,
            dimension: TextureDimension::D2,
            size: Extent3d::new_2d(width, height),
            mip_level_count: 1,
            format,
            usage,
        }
    }

    pub fn new_3d(
        width: u32,
        height: u32,
        depth: u32,
        format: TextureFormat,
        usage: TextureUsage,
    ) -> Self {
        Self {
            dimension: TextureDimension::D3,
            size: Extent3d::new(width, height, depth),
            ..Self::new_2d(width, height, format, usage)
        }
    }

    /// Cube map with square faces of `edge` texels.
    pub fn new_cube(edge: u32, format: TextureFormat, usage: TextureUsage) -> Self {
        Self {
            dimension: TextureDimension::Cube,
            size: Extent3d::new(edge, edge, 6),
            ..Self::new_2d(edge, edge, format, usage)
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_mip_levels(mut self, count: u32) -> Self {
        self.mip_level_count = count;
        self
    }

    /// Size of the upload expected for the top mip level, all layers included.
    pub fn base_level_size(&self) -> u64 {
        let Extent3d {
            width,
            height,
            depth,
        } = self.size;
        u64::from(width) * u64::from(height) * u64::from(depth) * u64::from(self.format.texel_size())
    }

    /// Length of the full mip chain down to 1x1.
    pub fn max_mip_levels(&self) -> u32 {
        u32::BITS - self.size.width.max(self.size.height).max(1).leading_zeros()
    }
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self::new_2d(1, 1, TextureFormat::default(), TextureUsage::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::rgba8(TextureDescriptor::new_2d(4, 4, TextureFormat::Rgba8Unorm, TextureUsage::empty()), 64)]
    #[case::cube(TextureDescriptor::new_cube(2, TextureFormat::Rg16Float, TextureUsage::empty()), 2 * 2 * 6 * 4)]
    #[case::volume(TextureDescriptor::new_3d(2, 2, 2, TextureFormat::Rgba32Float, TextureUsage::empty()), 128)]
    fn test_base_level_size(#[case] descriptor: TextureDescriptor, #[case] expected: u64) {
        assert_eq!(descriptor.base_level_size(), expected);
    }

    #[rstest]
    #[case::single_texel(1, 1, 1)]
    #[case::wide(256, 64, 9)]
    #[case::non_power_of_two(1920, 1080, 11)]
    fn test_max_mip_levels(#[case] width: u32, #[case] height: u32, #[case] expected: u32) {
        let descriptor =
            TextureDescriptor::new_2d(width, height, TextureFormat::Rgba8Unorm, TextureUsage::SAMPLED);
        assert_eq!(descriptor.max_mip_levels(), expected);
    }

    #[test]
    fn test_depth_formats() {
        assert!(TextureFormat::Depth32Float.is_depth_stencil());
        assert!(!TextureFormat::Rgba16Float.is_depth_stencil());
    }
}

use std::fmt;

/// Fixed position of a render pass in the frame. Declaration order is
/// execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RenderPassStage {
    Shadow,
    SceneFeatures,
    Ocean,
    AmbientOcclusion,
    LuminanceLighting,
    DirectLighting,
    IndirectLighting,
    Sky,
    VolumetricLighting,
    PathTracing,
    DepthOfField,
    MotionBlur,
    Bloom,
    ToneMapping,
    FastApproximateAntiAliasing,
    TemporalAntiAliasing,
    PostProcessing,
    UserInterface,
    Screen,
}

impl RenderPassStage {
    /// Number of stages.
    pub const COUNT: usize = 19;

    /// All stages in execution order.
    pub const ALL: [RenderPassStage; Self::COUNT] = [
        Self::Shadow,
        Self::SceneFeatures,
        Self::Ocean,
        Self::AmbientOcclusion,
        Self::LuminanceLighting,
        Self::DirectLighting,
        Self::IndirectLighting,
        Self::Sky,
        Self::VolumetricLighting,
        Self::PathTracing,
        Self::DepthOfField,
        Self::MotionBlur,
        Self::Bloom,
        Self::ToneMapping,
        Self::FastApproximateAntiAliasing,
        Self::TemporalAntiAliasing,
        Self::PostProcessing,
        Self::UserInterface,
        Self::Screen,
    ];

    /// Slot of this stage in the render pass table.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Stage name, also used as the default performance name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Shadow => "Shadow",
            Self::SceneFeatures => "SceneFeatures",
            Self::Ocean => "Ocean",
            Self::AmbientOcclusion => "AmbientOcclusion",
            Self::LuminanceLighting => "LuminanceLighting",
            Self::DirectLighting => "DirectLighting",
            Self::IndirectLighting => "IndirectLighting",
            Self::Sky => "Sky",
            Self::VolumetricLighting => "VolumetricLighting",
            Self::PathTracing => "PathTracing",
            Self::DepthOfField => "DepthOfField",
            Self::MotionBlur => "MotionBlur",
            Self::Bloom => "Bloom",
            Self::ToneMapping => "ToneMapping",
            Self::FastApproximateAntiAliasing => "FastApproximateAntiAliasing",
            Self::TemporalAntiAliasing => "TemporalAntiAliasing",
            Self::PostProcessing => "PostProcessing",
            Self::UserInterface => "UserInterface",
            Self::Screen => "Screen",
        }
    }
}

impl fmt::Display for RenderPassStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_matches_declaration_order() {
        for (i, stage) in RenderPassStage::ALL.iter().enumerate() {
            assert_eq!(stage.index(), i);
        }
        assert!(RenderPassStage::Shadow < RenderPassStage::DirectLighting);
        assert!(RenderPassStage::DirectLighting < RenderPassStage::PostProcessing);
        assert!(RenderPassStage::PostProcessing < RenderPassStage::Screen);
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<_> = RenderPassStage::ALL.iter().map(|s| s.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), RenderPassStage::COUNT);
    }
}

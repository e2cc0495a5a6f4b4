//! Rendering paths.
//!
//! A rendering path selects which render pass stages run. Switching paths
//! terminates the passes of the old path, swaps the shared render targets
//! and initializes the passes of the new one.

use std::fmt;

use crate::pass::RenderPassStage;

/// A named selection of render pass stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderingPath {
    /// Rasterized deferred lighting with the full post-processing chain.
    #[default]
    Default,
    /// Path-traced lighting followed by post-processing.
    PathTracing,
    /// Forward lighting with a reduced post-processing chain.
    Mobile,
    /// Rasterized rendering for head-mounted displays.
    VirtualReality,
    /// Nothing is rendered. Used while the surface is lost.
    None,
}

impl RenderingPath {
    /// All paths.
    pub const ALL: [RenderingPath; 5] = [
        Self::Default,
        Self::PathTracing,
        Self::Mobile,
        Self::VirtualReality,
        Self::None,
    ];

    /// Path name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Default => "Default",
            Self::PathTracing => "PathTracing",
            Self::Mobile => "Mobile",
            Self::VirtualReality => "VirtualReality",
            Self::None => "None",
        }
    }

    /// Returns true if passes at `stage` run in this path.
    pub fn includes_stage(self, stage: RenderPassStage) -> bool {
        use RenderPassStage as S;
        match self {
            Self::Default | Self::VirtualReality => stage != S::PathTracing,
            Self::PathTracing => {
                matches!(stage, S::Shadow | S::PathTracing) || stage >= S::DepthOfField
            }
            Self::Mobile => matches!(
                stage,
                S::SceneFeatures
                    | S::DirectLighting
                    | S::Sky
                    | S::ToneMapping
                    | S::UserInterface
                    | S::Screen
            ),
            Self::None => false,
        }
    }

    /// Stages of this path in execution order.
    pub fn stages(self) -> impl Iterator<Item = RenderPassStage> {
        RenderPassStage::ALL
            .into_iter()
            .filter(move |&stage| self.includes_stage(stage))
    }
}

impl fmt::Display for RenderingPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fixed slice of the engine frame. Declaration order is execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UpdatePhase {
    /// Frame setup before anything reads input.
    Pre,
    /// Input polling and event translation.
    Input,
    /// Game logic.
    Gameplay,
    /// User interface layout and interaction.
    UserInterface,
    /// Physics simulation step.
    Physics,
    /// Culling and render data preparation.
    PreRender,
    /// Command recording, submission and presentation.
    Render,
    /// End-of-frame bookkeeping.
    Post,
}

impl UpdatePhase {
    /// Number of phases.
    pub const COUNT: usize = 8;

    /// All phases in execution order.
    pub const ALL: [UpdatePhase; Self::COUNT] = [
        Self::Pre,
        Self::Input,
        Self::Gameplay,
        Self::UserInterface,
        Self::Physics,
        Self::PreRender,
        Self::Render,
        Self::Post,
    ];

    /// Position of this phase in the frame.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Upper-case name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Pre => "PRE",
            Self::Input => "INPUT",
            Self::Gameplay => "GAMEPLAY",
            Self::UserInterface => "USER_INTERFACE",
            Self::Physics => "PHYSICS",
            Self::PreRender => "PRE_RENDER",
            Self::Render => "RENDER",
            Self::Post => "POST",
        }
    }
}

impl std::fmt::Display for UpdatePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_matches_index() {
        for (i, phase) in UpdatePhase::ALL.iter().enumerate() {
            assert_eq!(phase.index(), i);
        }
    }

    #[test]
    fn test_render_after_pre_render() {
        assert!(UpdatePhase::PreRender < UpdatePhase::Render);
        assert!(UpdatePhase::Render < UpdatePhase::Post);
    }

    #[test]
    fn test_display() {
        assert_eq!(UpdatePhase::UserInterface.to_string(), "USER_INTERFACE");
    }
}

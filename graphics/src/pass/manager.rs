use std::time::Instant;

use crate::context::RenderContext;
use crate::error::GraphicsError;
use crate::path::RenderingPath;
use crate::pipeline::{CommandBuffer, PipelineState};
use crate::profiling::{FrameTimings, profile_scope};

use super::{RenderPass, RenderPassStage};

struct Slot {
    pass: Box<dyn RenderPass>,
    initialized: bool,
    executed: bool,
}

/// Fixed-size table of render passes indexed by [`RenderPassStage`].
///
/// Registration is open until [`seal`](Self::seal); afterwards the table is
/// only read each frame. At most one pass occupies a stage.
pub struct RenderPassManager {
    slots: [Option<Slot>; RenderPassStage::COUNT],
    sealed: bool,
}

impl std::fmt::Debug for RenderPassManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let passes: Vec<_> = self.render_passes().map(|pass| pass.name()).collect();
        f.debug_struct("RenderPassManager")
            .field("passes", &passes)
            .field("sealed", &self.sealed)
            .finish()
    }
}

impl Default for RenderPassManager {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderPassManager {
    /// Create an empty, open table.
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
            sealed: false,
        }
    }

    /// Insert `pass` at its stage.
    ///
    /// Fails with [`GraphicsError::StageAlreadyRegistered`] if the stage is
    /// occupied and [`GraphicsError::RegistrationClosed`] after
    /// [`seal`](Self::seal). The table is unchanged on failure.
    pub fn register(&mut self, pass: Box<dyn RenderPass>) -> Result<(), GraphicsError> {
        if self.sealed {
            return Err(GraphicsError::RegistrationClosed);
        }
        let stage = pass.stage();
        let slot = &mut self.slots[stage.index()];
        if slot.is_some() {
            return Err(GraphicsError::StageAlreadyRegistered(stage));
        }
        log::debug!("Registered render pass {} at stage {}", pass.name(), stage);
        *slot = Some(Slot {
            pass,
            initialized: false,
            executed: false,
        });
        Ok(())
    }

    /// Close registration.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// Returns true once registration is closed.
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Pass at `stage`.
    pub fn get(&self, stage: RenderPassStage) -> Option<&dyn RenderPass> {
        self.slots[stage.index()]
            .as_ref()
            .map(|slot| slot.pass.as_ref())
    }

    /// Pass at `stage`, mutably.
    pub fn get_mut(
        &mut self,
        stage: RenderPassStage,
    ) -> Option<&mut (dyn RenderPass + 'static)> {
        self.slots[stage.index()]
            .as_mut()
            .map(|slot| slot.pass.as_mut())
    }

    /// Returns true if the pass at `stage` is initialized.
    pub fn is_initialized(&self, stage: RenderPassStage) -> bool {
        self.slots[stage.index()]
            .as_ref()
            .is_some_and(|slot| slot.initialized)
    }

    /// Registered passes in stage order.
    pub fn render_passes(&self) -> impl Iterator<Item = &dyn RenderPass> {
        self.slots
            .iter()
            .flatten()
            .map(|slot| slot.pass.as_ref())
    }

    /// Number of registered passes.
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Returns true if no pass is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove the pass at `stage`, terminating it if it was initialized.
    pub fn unregister(
        &mut self,
        stage: RenderPassStage,
        ctx: &mut RenderContext<'_>,
    ) -> Option<Box<dyn RenderPass>> {
        let mut slot = self.slots[stage.index()].take()?;
        if slot.initialized {
            slot.pass.terminate(ctx);
        }
        log::debug!(
            "Unregistered render pass {} from stage {}",
            slot.pass.name(),
            stage
        );
        Some(slot.pass)
    }

    /// Initialize, in stage order, every pass `path` includes that is not
    /// initialized yet.
    pub fn initialize_path(
        &mut self,
        path: RenderingPath,
        ctx: &mut RenderContext<'_>,
    ) -> Result<usize, GraphicsError> {
        let mut initialized = 0;
        for slot in self.slots.iter_mut().flatten() {
            if slot.initialized || !slot.pass.is_included_in(path) {
                continue;
            }
            slot.pass.initialize(ctx)?;
            slot.initialized = true;
            initialized += 1;
            log::debug!(
                "Initialized render pass {} ({})",
                slot.pass.name(),
                slot.pass.stage()
            );
        }
        Ok(initialized)
    }

    /// Record every enabled, initialized pass of `path` in stage order,
    /// timing each one. Returns how many passes ran.
    ///
    /// The first pass error stops the frame. Pipelines of the failing pass
    /// are reset so they can record again next frame.
    ///
    /// # Panics
    ///
    /// Panics if a pass returns `Ok` with a pipeline still recording.
    pub fn execute(
        &mut self,
        path: RenderingPath,
        ctx: &mut RenderContext<'_>,
        timings: &mut FrameTimings,
    ) -> Result<usize, GraphicsError> {
        let mut executed = 0;
        for slot in self.slots.iter_mut().flatten() {
            slot.executed = false;
            let runs = slot.initialized && slot.pass.is_enabled() && slot.pass.is_included_in(path);
            if !runs {
                continue;
            }

            for pipeline in slot.pass.pipelines_mut() {
                if pipeline.is_initialized() {
                    pipeline.discard_frame(ctx.frame_index);
                }
            }

            profile_scope!("render_pass_record");
            let start = Instant::now();
            if let Err(error) = slot.pass.record(ctx) {
                log::error!("Render pass {} failed to record: {}", slot.pass.name(), error);
                for pipeline in slot.pass.pipelines_mut() {
                    if pipeline.is_initialized() {
                        pipeline.abort_recording(ctx.frame_index);
                    }
                }
                return Err(error);
            }
            timings.record_pass(slot.pass.stage(), slot.pass.name(), start.elapsed());

            for pipeline in slot.pass.pipelines() {
                assert!(
                    pipeline.state() != PipelineState::Recording,
                    "render pass {} left pipeline {} recording",
                    slot.pass.name(),
                    pipeline.name()
                );
            }
            slot.executed = true;
            executed += 1;
        }
        Ok(executed)
    }

    /// Non-empty command buffers of `frame_index` recorded by the last
    /// [`execute`](Self::execute), in stage order.
    pub fn recorded_command_buffers(&self, frame_index: usize) -> Vec<&CommandBuffer> {
        self.slots
            .iter()
            .flatten()
            .filter(|slot| slot.executed)
            .flat_map(|slot| slot.pass.pipelines())
            .filter(|pipeline| pipeline.is_initialized())
            .map(|pipeline| pipeline.current_command_buffer(frame_index))
            .filter(|buffer| !buffer.is_empty())
            .collect()
    }

    /// Forget which passes ran, so nothing is submitted twice.
    pub fn clear_executed(&mut self) {
        for slot in self.slots.iter_mut().flatten() {
            slot.executed = false;
        }
    }

    /// Let every initialized pass react to recreated render targets.
    pub fn rebuild_all(&mut self, ctx: &mut RenderContext<'_>) -> Result<(), GraphicsError> {
        for slot in self.slots.iter_mut().flatten() {
            slot.executed = false;
            if slot.initialized {
                slot.pass.on_render_targets_recreated(ctx)?;
            }
        }
        Ok(())
    }

    /// Terminate initialized passes that `path` excludes.
    pub fn terminate_excluded(
        &mut self,
        path: RenderingPath,
        ctx: &mut RenderContext<'_>,
    ) -> usize {
        self.terminate_where(ctx, |pass| !pass.is_included_in(path))
    }

    /// Terminate every initialized pass, in reverse stage order.
    pub fn terminate_all(&mut self, ctx: &mut RenderContext<'_>) -> usize {
        self.terminate_where(ctx, |_| true)
    }

    fn terminate_where(
        &mut self,
        ctx: &mut RenderContext<'_>,
        predicate: impl Fn(&dyn RenderPass) -> bool,
    ) -> usize {
        let mut terminated = 0;
        for slot in self.slots.iter_mut().rev().flatten() {
            if !slot.initialized || !predicate(slot.pass.as_ref()) {
                continue;
            }
            slot.pass.terminate(ctx);
            slot.initialized = false;
            slot.executed = false;
            terminated += 1;
            log::debug!("Terminated render pass {}", slot.pass.name());
        }
        terminated
    }
}

static_assertions::assert_impl_all!(RenderPassManager: Send);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Pipeline, PipelineParameters};
    use crate::test_support::TestContext;

    struct TestPass {
        name: &'static str,
        stage: RenderPassStage,
        pipeline: Pipeline,
        enabled: bool,
    }

    impl TestPass {
        fn new(name: &'static str, stage: RenderPassStage) -> Box<Self> {
            Box::new(Self {
                name,
                stage,
                pipeline: Pipeline::compute(name, "Compute"),
                enabled: true,
            })
        }
    }

    impl RenderPass for TestPass {
        fn name(&self) -> &str {
            self.name
        }

        fn stage(&self) -> RenderPassStage {
            self.stage
        }

        fn is_enabled(&self) -> bool {
            self.enabled
        }

        fn initialize(&mut self, ctx: &mut RenderContext<'_>) -> Result<(), GraphicsError> {
            self.pipeline.initialize(ctx, PipelineParameters::new())
        }

        fn record(&mut self, ctx: &mut RenderContext<'_>) -> Result<(), GraphicsError> {
            self.pipeline.begin_recording(ctx).dispatch(1, 1, 1);
            self.pipeline.end_recording(ctx);
            Ok(())
        }

        fn pipelines(&self) -> Vec<&Pipeline> {
            vec![&self.pipeline]
        }

        fn pipelines_mut(&mut self) -> Vec<&mut Pipeline> {
            vec![&mut self.pipeline]
        }
    }

    #[test]
    fn test_passes_iterate_in_stage_order() {
        let mut manager = RenderPassManager::new();
        manager
            .register(TestPass::new("Bloom", RenderPassStage::Bloom))
            .unwrap();
        manager
            .register(TestPass::new("Shadow", RenderPassStage::Shadow))
            .unwrap();
        manager
            .register(TestPass::new("Lighting", RenderPassStage::DirectLighting))
            .unwrap();

        let names: Vec<_> = manager.render_passes().map(|pass| pass.name()).collect();
        assert_eq!(names, vec!["Shadow", "Lighting", "Bloom"]);
        assert_eq!(manager.len(), 3);
    }

    #[test]
    fn test_duplicate_stage_rejected() {
        let mut manager = RenderPassManager::new();
        manager
            .register(TestPass::new("First", RenderPassStage::Sky))
            .unwrap();
        let result = manager.register(TestPass::new("Second", RenderPassStage::Sky));

        assert_eq!(
            result,
            Err(GraphicsError::StageAlreadyRegistered(RenderPassStage::Sky))
        );
        assert_eq!(manager.get(RenderPassStage::Sky).unwrap().name(), "First");
    }

    #[test]
    fn test_registration_closed_after_seal() {
        let mut manager = RenderPassManager::new();
        manager.seal();
        assert_eq!(
            manager.register(TestPass::new("Sky", RenderPassStage::Sky)),
            Err(GraphicsError::RegistrationClosed)
        );
        assert!(manager.is_empty());
    }

    #[test]
    fn test_execute_skips_disabled_and_excluded() {
        let mut env = TestContext::new(2);
        let mut manager = RenderPassManager::new();
        manager
            .register(TestPass::new("Shadow", RenderPassStage::Shadow))
            .unwrap();
        manager
            .register(TestPass::new("PathTracing", RenderPassStage::PathTracing))
            .unwrap();
        let mut disabled = TestPass::new("Bloom", RenderPassStage::Bloom);
        disabled.enabled = false;
        manager.register(disabled).unwrap();

        let path = RenderingPath::Default;
        assert_eq!(manager.initialize_path(path, &mut env.context(0)).unwrap(), 2);
        assert!(!manager.is_initialized(RenderPassStage::PathTracing));

        let mut timings = FrameTimings::new();
        let executed = manager
            .execute(path, &mut env.context(1), &mut timings)
            .unwrap();
        assert_eq!(executed, 1);
        assert!(timings.pass(RenderPassStage::Shadow).is_some());
        assert_eq!(manager.recorded_command_buffers(1).len(), 1);
        assert!(manager.recorded_command_buffers(0).is_empty());
    }

    #[test]
    fn test_terminate_and_reinitialize() {
        let mut env = TestContext::new(2);
        let mut manager = RenderPassManager::new();
        manager
            .register(TestPass::new("Sky", RenderPassStage::Sky))
            .unwrap();
        manager
            .initialize_path(RenderingPath::Default, &mut env.context(0))
            .unwrap();

        assert_eq!(
            manager.terminate_excluded(RenderingPath::None, &mut env.context(0)),
            1
        );
        assert!(!manager.is_initialized(RenderPassStage::Sky));

        manager
            .initialize_path(RenderingPath::Default, &mut env.context(0))
            .unwrap();
        assert!(manager.is_initialized(RenderPassStage::Sky));

        let pass = manager
            .unregister(RenderPassStage::Sky, &mut env.context(0))
            .unwrap();
        assert_eq!(pass.pipelines()[0].state(), PipelineState::Terminated);
        assert!(manager.is_empty());
    }
}

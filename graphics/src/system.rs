//! The rendering system orchestrator.
//!
//! [`RenderingSystem`] owns every piece of the rendering core and drives one
//! frame per [`render_frame`](RenderingSystem::render_frame):
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ 1. wait fence of the slot being reused, advance frame index,     │
//! │    destroy natives retired the last time the slot was current   │
//! │ 2. apply a pending resize (recreation path)                     │
//! │ 3. acquire swapchain image ──► image_available                    │
//! │ 4. record enabled passes of the current path in stage order      │
//! │ 5. submit: wait image_available, signal render_finished + fence  │
//! │ 6. present: wait render_finished                                 │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! An outdated surface at step 3 or 6 runs the recreation path: wait for
//! the GPU, resize the surface, recreate the shared render targets behind
//! their stable handles (rebuilding the tables that sample them), flush
//! deferred destructions and let every pass rebuild its pipelines.
//!
//! The system runs in [`UpdatePhase::Render`] as a main-thread system.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use catalyst_core::{UpdateContext, UpdatePhase, UpdateScheduler};

use crate::backend::{GpuBackend, Submission};
use crate::config::RenderingConfiguration;
use crate::context::RenderContext;
use crate::error::GraphicsError;
use crate::frame::FrameSyncState;
use crate::pass::{RenderPass, RenderPassManager};
use crate::path::RenderingPath;
use crate::profiling::{FrameTimings, frame_mark, profile_plot, profile_scope};
use crate::resources::GpuResources;
use crate::shader::ShaderLibrary;
use crate::targets::SharedRenderTargetManager;
use crate::types::Resolution;

/// Outcome of one [`RenderingSystem::render_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameStatus {
    /// The frame was submitted and presented.
    Presented,
    /// The surface was outdated; swapchain resources were recreated.
    Recreated,
}

/// Platform surface lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceEvent {
    /// The surface went away (application backgrounded).
    Lost,
    /// The surface is back.
    Gained,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SystemState {
    Created,
    Initialized,
    Terminated,
}

/// State borrowed by a [`RenderContext`].
#[derive(Debug)]
struct RenderState {
    resources: GpuResources,
    shared_targets: SharedRenderTargetManager,
    shaders: ShaderLibrary,
}

impl RenderState {
    fn context(
        &mut self,
        frame_index: usize,
        frames_in_flight: usize,
        resolution: Resolution,
        rendering_path: RenderingPath,
    ) -> RenderContext<'_> {
        RenderContext {
            resources: &mut self.resources,
            shared_targets: &self.shared_targets,
            shaders: &self.shaders,
            frame_index,
            frames_in_flight,
            resolution,
            rendering_path,
        }
    }
}

/// Owner of the render passes, resources and frame synchronization.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use catalyst_graphics::{DummyBackend, FrameStatus, RenderingConfiguration, RenderingSystem};
///
/// let backend = Arc::new(DummyBackend::new());
/// let mut system = RenderingSystem::new(backend, RenderingConfiguration::default()).unwrap();
/// system.initialize().unwrap();
/// assert_eq!(system.render_frame().unwrap(), FrameStatus::Presented);
/// system.terminate();
/// ```
pub struct RenderingSystem {
    backend: Arc<dyn GpuBackend>,
    configuration: RenderingConfiguration,
    render_state: RenderState,
    passes: RenderPassManager,
    frame_sync: FrameSyncState,
    state: SystemState,
    rendering_path: RenderingPath,
    resolution: Resolution,
    pending_resize: Option<Resolution>,
    restore_path: Option<RenderingPath>,
    surface_gained_seen: bool,
    recording_timings: FrameTimings,
    timings: FrameTimings,
}

impl std::fmt::Debug for RenderingSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderingSystem")
            .field("backend", &self.backend.name())
            .field("configuration", &self.configuration)
            .field("render_state", &self.render_state)
            .field("passes", &self.passes)
            .field("frame_sync", &self.frame_sync)
            .field("state", &self.state)
            .field("rendering_path", &self.rendering_path)
            .field("resolution", &self.resolution)
            .field("pending_resize", &self.pending_resize)
            .finish_non_exhaustive()
    }
}

impl RenderingSystem {
    /// Phase the system runs in.
    pub const UPDATE_PHASE: UpdatePhase = UpdatePhase::Render;

    /// Create the system. Passes are registered before
    /// [`initialize`](Self::initialize).
    pub fn new(
        backend: Arc<dyn GpuBackend>,
        configuration: RenderingConfiguration,
    ) -> Result<Self, GraphicsError> {
        configuration.validate()?;
        let resources = GpuResources::new(
            backend.clone(),
            configuration.frames_in_flight,
            configuration.descriptor_pool,
        )?;

        log::info!(
            "Creating rendering system ({} backend, {} frames in flight, {})",
            backend.name(),
            configuration.frames_in_flight,
            configuration.resolution
        );
        Ok(Self {
            backend,
            frame_sync: FrameSyncState::new(
                configuration.frames_in_flight,
                configuration.fence_spin_count,
            ),
            render_state: RenderState {
                resources,
                shared_targets: SharedRenderTargetManager::new(),
                shaders: ShaderLibrary::new(),
            },
            passes: RenderPassManager::new(),
            state: SystemState::Created,
            rendering_path: configuration.initial_rendering_path,
            resolution: configuration.resolution,
            pending_resize: None,
            restore_path: None,
            surface_gained_seen: false,
            recording_timings: FrameTimings::new(),
            timings: FrameTimings::new(),
            configuration,
        })
    }

    // ------------------------------------------------------------------
    // Setup
    // ------------------------------------------------------------------

    /// Shader programs pipelines look up during initialization.
    pub fn shaders_mut(&mut self) -> &mut ShaderLibrary {
        &mut self.render_state.shaders
    }

    /// Register a render pass at its stage.
    ///
    /// Fails with [`GraphicsError::StageAlreadyRegistered`] when the stage is
    /// taken and [`GraphicsError::RegistrationClosed`] after
    /// [`initialize`](Self::initialize).
    pub fn register_render_pass(
        &mut self,
        pass: impl RenderPass + 'static,
    ) -> Result<(), GraphicsError> {
        self.passes.register(Box::new(pass))
    }

    /// Create the shared render targets of the initial path, close pass
    /// registration and initialize the path's passes in stage order.
    ///
    /// # Panics
    ///
    /// Panics if called twice.
    pub fn initialize(&mut self) -> Result<(), GraphicsError> {
        assert!(
            self.state == SystemState::Created,
            "rendering system initialized twice"
        );
        profile_scope!("rendering_initialize");

        self.backend.resize_surface(self.resolution)?;
        self.render_state.shared_targets.initialize(
            self.rendering_path,
            self.resolution,
            &mut self.render_state.resources,
        )?;
        self.passes.seal();

        let mut ctx = self.render_state.context(
            self.frame_sync.current_frame_index(),
            self.frame_sync.frames_in_flight(),
            self.resolution,
            self.rendering_path,
        );
        let initialized = self.passes.initialize_path(self.rendering_path, &mut ctx)?;
        self.state = SystemState::Initialized;

        log::info!(
            "Rendering system initialized: {} path, {} of {} passes active",
            self.rendering_path,
            initialized,
            self.passes.len()
        );
        Ok(())
    }

    /// Register [`tick`](Self::tick) as a main-thread system of
    /// [`UPDATE_PHASE`](Self::UPDATE_PHASE).
    pub fn register_update_system(system: &Rc<RefCell<Self>>, scheduler: &mut UpdateScheduler) {
        let system = Rc::clone(system);
        scheduler.register_main_thread("rendering", Self::UPDATE_PHASE, move |ctx| {
            system.borrow_mut().tick(ctx);
        });
    }

    // ------------------------------------------------------------------
    // Per frame
    // ------------------------------------------------------------------

    /// Render a frame from the update scheduler. Errors are logged.
    pub fn tick(&mut self, ctx: &UpdateContext) {
        debug_assert_eq!(ctx.phase, Self::UPDATE_PHASE);
        if self.state != SystemState::Initialized {
            return;
        }
        if let Err(error) = self.render_frame() {
            log::error!("Frame {} failed: {}", ctx.frame, error);
        }
    }

    /// Render one frame.
    ///
    /// # Panics
    ///
    /// Panics if the system is not initialized.
    pub fn render_frame(&mut self) -> Result<FrameStatus, GraphicsError> {
        assert!(
            self.state == SystemState::Initialized,
            "render_frame called on a rendering system that is not initialized"
        );
        profile_scope!("render_frame");
        let frame_start = Instant::now();

        let frame_index = self.frame_sync.begin_frame();
        self.render_state.resources.set_frame_slot(frame_index);
        let released = self.render_state.resources.release_frame_slot(frame_index);
        if released > 0 {
            log::trace!("Released {} natives of slot {}", released, frame_index);
        }

        if let Some(resolution) = self.pending_resize.take()
            && let Err(error) = self.recreate(resolution)
        {
            self.frame_sync.abandon_frame();
            return Err(error);
        }

        let acquired = self
            .backend
            .acquire_next_image(self.frame_sync.current().image_available());
        let image_index = match acquired {
            Ok(index) => index,
            Err(error) if error.requires_recreation() => {
                log::warn!("Swapchain out of date at acquire: {}", error);
                self.frame_sync.abandon_frame();
                self.recreate(self.resolution)?;
                return Ok(FrameStatus::Recreated);
            }
            Err(error) => {
                self.frame_sync.abandon_frame();
                return Err(error);
            }
        };

        self.recording_timings.begin(self.frame_sync.frame_count());
        let mut ctx = self.render_state.context(
            frame_index,
            self.frame_sync.frames_in_flight(),
            self.resolution,
            self.rendering_path,
        );
        let executed = self
            .passes
            .execute(self.rendering_path, &mut ctx, &mut self.recording_timings);
        if let Err(error) = executed {
            self.drop_frame(true);
            return Err(error);
        }

        let slot = self.frame_sync.current();
        let submission = Submission {
            command_buffers: self.passes.recorded_command_buffers(frame_index),
            wait: slot.image_available(),
            signal: slot.render_finished(),
        };
        log::trace!(
            "Submitting {} command buffers for frame {}",
            submission.command_buffers.len(),
            self.frame_sync.frame_count()
        );
        if let Err(error) = self.backend.submit(&submission, slot.fence()) {
            self.drop_frame(true);
            return Err(error);
        }
        self.passes.clear_executed();

        let presented = self
            .backend
            .present(image_index, self.frame_sync.current().render_finished());
        let status = match presented {
            Ok(()) => FrameStatus::Presented,
            Err(error) if error.requires_recreation() => {
                log::warn!("Swapchain out of date at present: {}", error);
                self.recreate(self.resolution)?;
                FrameStatus::Recreated
            }
            Err(error) => return Err(error),
        };

        self.recording_timings.finish(frame_start.elapsed());
        std::mem::swap(&mut self.timings, &mut self.recording_timings);
        profile_plot!("frame_cpu_ms", self.timings.total().as_secs_f64() * 1000.0);
        frame_mark!();
        Ok(status)
    }

    /// Schedule the recreation path for the next frame.
    pub fn resize(&mut self, resolution: Resolution) -> Result<(), GraphicsError> {
        if resolution.is_empty() {
            return Err(GraphicsError::InvalidParameter(format!(
                "cannot resize to {resolution}"
            )));
        }
        if resolution == self.resolution {
            self.pending_resize = None;
        } else {
            log::debug!("Resize to {} scheduled", resolution);
            self.pending_resize = Some(resolution);
        }
        Ok(())
    }

    /// Switch to another rendering path.
    ///
    /// Terminates the current passes, swaps the shared render targets and
    /// initializes the new path's passes. Does nothing if `path` is active.
    pub fn set_rendering_path(&mut self, path: RenderingPath) -> Result<(), GraphicsError> {
        if path == self.rendering_path {
            return Ok(());
        }
        if self.state != SystemState::Initialized {
            self.rendering_path = path;
            return Ok(());
        }
        profile_scope!("switch_rendering_path");

        self.wait_idle();
        let previous = self.rendering_path;
        let mut ctx = self.render_state.context(
            self.frame_sync.current_frame_index(),
            self.frame_sync.frames_in_flight(),
            self.resolution,
            previous,
        );
        self.passes.terminate_all(&mut ctx);

        self.render_state.shared_targets.on_switch_rendering_path(
            path,
            self.resolution,
            &mut self.render_state.resources,
        )?;
        self.rendering_path = path;

        let mut ctx = self.render_state.context(
            self.frame_sync.current_frame_index(),
            self.frame_sync.frames_in_flight(),
            self.resolution,
            path,
        );
        let initialized = self.passes.initialize_path(path, &mut ctx)?;
        log::info!(
            "Rendering path switched from {} to {} ({} passes active)",
            previous,
            path,
            initialized
        );
        Ok(())
    }

    /// React to the platform surface going away or coming back.
    ///
    /// Losing the surface switches to [`RenderingPath::None`]; gaining it
    /// restores the previous path. Platforms send one gained event at
    /// startup, which is ignored.
    ///
    /// The first gained event is ignored even when a lost event came before
    /// it. In that order the path stays at [`RenderingPath::None`] until a
    /// second gained event arrives or the path is set explicitly.
    pub fn on_surface_event(&mut self, event: SurfaceEvent) -> Result<(), GraphicsError> {
        match event {
            SurfaceEvent::Lost => {
                log::info!("Surface lost while rendering {} path", self.rendering_path);
                if self.rendering_path != RenderingPath::None {
                    self.restore_path = Some(self.rendering_path);
                }
                self.set_rendering_path(RenderingPath::None)
            }
            SurfaceEvent::Gained => {
                if !self.surface_gained_seen {
                    self.surface_gained_seen = true;
                    log::debug!("Ignoring initial surface gained event");
                    return Ok(());
                }
                match self.restore_path.take() {
                    Some(path) => {
                        log::info!("Surface gained, restoring {} path", path);
                        self.set_rendering_path(path)
                    }
                    None => Ok(()),
                }
            }
        }
    }

    /// Wait for the GPU, release passes, shared targets and every
    /// remaining resource.
    pub fn terminate(&mut self) {
        if self.state == SystemState::Terminated {
            return;
        }
        self.wait_idle();

        let mut ctx = self.render_state.context(
            self.frame_sync.current_frame_index(),
            self.frame_sync.frames_in_flight(),
            self.resolution,
            self.rendering_path,
        );
        let terminated = self.passes.terminate_all(&mut ctx);
        self.render_state
            .shared_targets
            .terminate(&mut self.render_state.resources);
        self.render_state.resources.release_all();
        self.state = SystemState::Terminated;

        log::info!(
            "Rendering system terminated after {} frames ({} passes terminated)",
            self.frame_sync.frame_count(),
            terminated
        );
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Resource owner.
    pub fn resources(&self) -> &GpuResources {
        &self.render_state.resources
    }

    /// Resource owner, for creating resources and binding tables.
    pub fn resources_mut(&mut self) -> &mut GpuResources {
        &mut self.render_state.resources
    }

    /// Shader programs.
    pub fn shaders(&self) -> &ShaderLibrary {
        &self.render_state.shaders
    }

    /// Shared render targets of the current path.
    pub fn shared_targets(&self) -> &SharedRenderTargetManager {
        &self.render_state.shared_targets
    }

    /// Registered render passes.
    pub fn render_passes(&self) -> &RenderPassManager {
        &self.passes
    }

    /// Registered render passes, mutably (for toggling pass settings).
    pub fn render_passes_mut(&mut self) -> &mut RenderPassManager {
        &mut self.passes
    }

    /// Frame synchronization state.
    pub fn frame_sync(&self) -> &FrameSyncState {
        &self.frame_sync
    }

    /// The backend.
    pub fn backend(&self) -> &Arc<dyn GpuBackend> {
        &self.backend
    }

    /// Configuration the system was created with.
    pub fn configuration(&self) -> &RenderingConfiguration {
        &self.configuration
    }

    /// Slot the current frame records into.
    pub fn current_frame_index(&self) -> usize {
        self.frame_sync.current_frame_index()
    }

    /// Number of frame slots.
    pub fn frames_in_flight(&self) -> usize {
        self.frame_sync.frames_in_flight()
    }

    /// Number of frames started.
    pub fn frame_count(&self) -> u64 {
        self.frame_sync.frame_count()
    }

    /// Active rendering path.
    pub fn rendering_path(&self) -> RenderingPath {
        self.rendering_path
    }

    /// Output resolution.
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Resolution a resize will switch to on the next frame.
    pub fn pending_resize(&self) -> Option<Resolution> {
        self.pending_resize
    }

    /// Timings of the last presented frame.
    pub fn frame_timings(&self) -> &FrameTimings {
        &self.timings
    }

    /// Returns true between `initialize` and `terminate`.
    pub fn is_initialized(&self) -> bool {
        self.state == SystemState::Initialized
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn wait_idle(&self) {
        self.backend.wait_idle();
        self.frame_sync.wait_idle();
    }

    /// Give the current slot back after a failure between acquire and submit.
    fn drop_frame(&mut self, acquired: bool) {
        if acquired {
            self.frame_sync.current().image_available().consume();
        }
        self.passes.clear_executed();
        self.frame_sync.abandon_frame();
    }

    fn recreate(&mut self, resolution: Resolution) -> Result<(), GraphicsError> {
        profile_scope!("recreate_swapchain_resources");
        log::warn!(
            "Recreating swapchain resources: {} -> {}",
            self.resolution,
            resolution
        );

        // The current slot may be reset without submitted work, so only the
        // backend is waited on here.
        self.backend.wait_idle();
        self.backend.resize_surface(resolution)?;
        self.resolution = resolution;

        let rebuilt = self
            .render_state
            .shared_targets
            .recreate(resolution, &mut self.render_state.resources)?;
        let flushed = self.render_state.resources.flush_deferred();

        let mut ctx = self.render_state.context(
            self.frame_sync.current_frame_index(),
            self.frame_sync.frames_in_flight(),
            resolution,
            self.rendering_path,
        );
        self.passes.rebuild_all(&mut ctx)?;
        log::info!(
            "Recreated swapchain resources at {} ({} tables rebuilt, {} natives flushed)",
            resolution,
            rebuilt,
            flushed
        );
        Ok(())
    }
}

impl Drop for RenderingSystem {
    fn drop(&mut self) {
        // A panic mid-frame leaves the current fence unsignaled.
        if self.state == SystemState::Initialized && !std::thread::panicking() {
            self.terminate();
        }
    }
}

static_assertions::assert_impl_all!(RenderingSystem: Send);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;

    fn system() -> (Arc<DummyBackend>, RenderingSystem) {
        let backend = Arc::new(DummyBackend::new());
        let system = RenderingSystem::new(
            backend.clone(),
            RenderingConfiguration::default().with_resolution(Resolution::new(64, 64)),
        )
        .unwrap();
        (backend, system)
    }

    #[test]
    fn test_invalid_configuration() {
        let backend = Arc::new(DummyBackend::new());
        let result = RenderingSystem::new(
            backend,
            RenderingConfiguration::default().with_frames_in_flight(0),
        );
        assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
    }

    #[test]
    fn test_debug_names_backend() {
        let (_backend, system) = system();
        let formatted = format!("{system:?}");
        assert!(formatted.starts_with("RenderingSystem"));
        assert!(formatted.contains("\"Dummy\""));
        assert!(formatted.contains("RenderPassManager"));
    }

    #[test]
    fn test_frame_without_passes() {
        let (backend, mut system) = system();
        system.initialize().unwrap();
        assert_eq!(system.render_frame().unwrap(), FrameStatus::Presented);
        assert_eq!(system.render_frame().unwrap(), FrameStatus::Presented);

        let stats = backend.stats();
        assert_eq!(stats.submissions, 2);
        assert_eq!(stats.presents, 2);
        assert_eq!(system.frame_count(), 2);
        assert_eq!(system.current_frame_index(), 1);
    }

    #[test]
    fn test_resize_is_applied_next_frame() {
        let (backend, mut system) = system();
        system.initialize().unwrap();
        system.resize(Resolution::new(128, 96)).unwrap();
        assert_eq!(system.resolution(), Resolution::new(64, 64));

        system.render_frame().unwrap();
        assert_eq!(system.resolution(), Resolution::new(128, 96));
        assert_eq!(backend.surface_resolution(), Resolution::new(128, 96));
        assert!(system.resize(Resolution::new(0, 10)).is_err());
    }

    #[test]
    fn test_outdated_acquire_recreates() {
        let (backend, mut system) = system();
        system.initialize().unwrap();
        backend.fail_next_acquire(1);

        assert_eq!(system.render_frame().unwrap(), FrameStatus::Recreated);
        assert_eq!(system.render_frame().unwrap(), FrameStatus::Presented);
    }

    #[test]
    fn test_surface_events() {
        let (_backend, mut system) = system();
        system.initialize().unwrap();

        system.on_surface_event(SurfaceEvent::Gained).unwrap();
        assert_eq!(system.rendering_path(), RenderingPath::Default);

        system.on_surface_event(SurfaceEvent::Lost).unwrap();
        assert_eq!(system.rendering_path(), RenderingPath::None);
        assert!(system.shared_targets().is_empty());

        system.on_surface_event(SurfaceEvent::Gained).unwrap();
        assert_eq!(system.rendering_path(), RenderingPath::Default);
        assert!(!system.shared_targets().is_empty());
    }

    #[test]
    fn test_terminate_releases_everything() {
        let (backend, mut system) = system();
        system.initialize().unwrap();
        system.render_frame().unwrap();
        system.terminate();
        assert_eq!(backend.live_count(), 0);
        assert!(!system.is_initialized());
    }
}

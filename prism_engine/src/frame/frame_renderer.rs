/// Frame orchestrator.
///
/// Drives `Idle -> Waiting -> Acquiring -> Recording -> Submitted ->
/// Presenting -> Idle` once per call to `render_frame`, owning the surface,
/// the frame slots, the per-slot command lists and the pass graph.

use std::sync::Arc;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::graphics_device::{
    AcquireOutcome, CommandList, FrameConfig, FramebufferSizeSource, GpuAllocator,
    GraphicsDevice, PipelineStages, PresentOutcome, SubmitInfo, SurfaceBackend,
};
use crate::frame::frame_sync::{FrameSyncSet, SlotState};
use crate::frame::presentable_surface::{PresentableSurface, RecreateOutcome};
use crate::render_graph::{
    FrameContext, OverlayPass, PassBindingProvider, PassGraph, PresentTarget, SceneGlobals,
    SceneSource,
};
use crate::resource::SlotBuffers;
use crate::{engine_debug, engine_error, engine_info, engine_warn};

/// Consecutive out-of-date acquisitions tolerated within one frame
const MAX_ACQUIRE_ATTEMPTS: u32 = 3;

/// Backend objects the renderer is built from
#[derive(Clone)]
pub struct BackendHandles {
    pub device: Arc<dyn GraphicsDevice>,
    pub allocator: Arc<dyn GpuAllocator>,
    pub surface: Arc<dyn SurfaceBackend>,
    pub size_source: Arc<dyn FramebufferSizeSource>,
}

impl BackendHandles {
    /// Use one backend object for the device, allocator and surface roles
    pub fn from_backend<B>(backend: Arc<B>, size_source: Arc<dyn FramebufferSizeSource>) -> Self
    where
        B: GraphicsDevice + GpuAllocator + SurfaceBackend + 'static,
    {
        Self {
            device: backend.clone(),
            allocator: backend.clone(),
            surface: backend,
            size_source,
        }
    }
}

/// Where the current frame is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    Idle,
    Waiting,
    Acquiring,
    Recording,
    Submitted,
    Presenting,
}

/// Result of one `render_frame` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The frame was submitted and queued for presentation
    Presented { frame_slot: usize, image_index: u32 },
    /// The frame-buffer has zero area; nothing was submitted and the slot
    /// index did not advance
    Deferred,
}

/// Counters since creation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frames_rendered: u64,
    pub submissions: u64,
    pub presents: u64,
    pub swapchain_rebuilds: u64,
    pub deferred_frames: u64,
    pub out_of_date_acquires: u64,
    pub last_frame_draw_calls: u32,
}

pub struct FrameRenderer {
    // Field order is drop order: passes first, surface last
    overlays: Vec<Box<dyn OverlayPass>>,
    graph: PassGraph,
    scene_uniforms: SlotBuffers<SceneGlobals>,
    command_lists: Vec<Box<dyn CommandList>>,
    sync: FrameSyncSet,
    surface: PresentableSurface,
    device: Arc<dyn GraphicsDevice>,
    config: FrameConfig,
    current_slot: usize,
    phase: FramePhase,
    fatal_error: Option<Error>,
    stats: FrameStats,
    last_frame: Option<Instant>,
}

impl FrameRenderer {
    /// Create the surface, the frame slots, per-slot command lists and scene
    /// uniforms, then the pass graph at the surface extent.
    ///
    /// # Panics
    ///
    /// If `config.frames_in_flight < 2`.
    pub fn new(
        backend: BackendHandles,
        provider: Box<dyn PassBindingProvider>,
        config: FrameConfig,
    ) -> Result<Self> {
        let frames = config.frames_in_flight;
        assert!(frames >= 2, "frames in flight must be at least 2, got {}", frames);

        let surface = PresentableSurface::create(
            Arc::clone(&backend.surface),
            Arc::clone(&backend.size_source),
            config.present_mode,
        )?;
        let sync = FrameSyncSet::new(Arc::clone(&backend.device), frames)?;
        let command_lists = (0..frames)
            .map(|_| backend.device.create_command_list())
            .collect::<Result<Vec<_>>>()?;
        let scene_uniforms = SlotBuffers::new(Arc::clone(&backend.allocator), "scene_globals", frames)?;
        let graph = PassGraph::new(
            &backend.allocator,
            provider,
            &config,
            surface.extent(),
            scene_uniforms.buffers(),
        )?;

        engine_info!(
            "prism::renderer",
            "Frame renderer ready: {} frames in flight, {}x{}",
            frames,
            surface.extent().width,
            surface.extent().height
        );

        Ok(Self {
            overlays: Vec::new(),
            graph,
            scene_uniforms,
            command_lists,
            sync,
            surface,
            device: backend.device,
            config,
            current_slot: 0,
            phase: FramePhase::Idle,
            fatal_error: None,
            stats: FrameStats::default(),
            last_frame: None,
        })
    }

    /// Register a pass recorded after the blit
    pub fn add_overlay(&mut self, overlay: Box<dyn OverlayPass>) {
        self.overlays.push(overlay);
    }

    /// Window size changed; rebuild before the next acquisition
    pub fn notify_resized(&mut self) {
        self.surface.mark_needs_rebuild();
    }

    /// Run one full frame.
    ///
    /// Out-of-date and suboptimal surfaces are rebuilt internally. Any error
    /// returned is fatal: the renderer refuses further frames.
    pub fn render_frame(&mut self, scene: &mut dyn SceneSource) -> Result<FrameOutcome> {
        if let Some(fatal) = &self.fatal_error {
            return Err(Error::BackendError(format!(
                "frame loop aborted earlier in {:?}: {}",
                self.phase, fatal
            )));
        }
        match self.run_frame(scene) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                engine_error!("prism::renderer", "Fatal frame error in {:?}: {}", self.phase, e);
                self.fatal_error = Some(e.clone());
                Err(e)
            }
        }
    }

    fn run_frame(&mut self, scene: &mut dyn SceneSource) -> Result<FrameOutcome> {
        if self.surface.framebuffer_size().is_zero_area() {
            self.surface.mark_needs_rebuild();
        }
        if self.surface.needs_rebuild() && self.rebuild()? == RecreateOutcome::Deferred {
            return Ok(self.defer());
        }

        let slot = self.current_slot;
        let signals = self.sync.signals(slot);

        // Idle -> Waiting. A slot left reserved by a deferred frame is reused as is.
        self.phase = FramePhase::Waiting;
        if self.sync.state(slot) == SlotState::Pending {
            self.sync.wait_and_reset(slot, self.config.fence_timeout_ns)?;
        }

        let now = Instant::now();
        let delta = self.last_frame.map_or(0.0, |t| now.duration_since(t).as_secs_f32());
        self.last_frame = Some(now);
        scene.update(delta)?;
        self.scene_uniforms.write(slot, &scene.globals())?;
        self.graph.update(slot, &*scene)?;

        // Waiting -> Acquiring
        self.phase = FramePhase::Acquiring;
        let mut attempts = 0;
        let image_index = loop {
            match self.surface.acquire_next(self.config.acquire_timeout_ns, signals.image_acquired)? {
                AcquireOutcome::Acquired { index, .. } => break index,
                AcquireOutcome::OutOfDate => {
                    self.stats.out_of_date_acquires += 1;
                    attempts += 1;
                    if attempts >= MAX_ACQUIRE_ATTEMPTS {
                        return Err(Error::SurfaceLost);
                    }
                    if self.rebuild()? == RecreateOutcome::Deferred {
                        return Ok(self.defer());
                    }
                }
            }
        };

        // Acquiring -> Recording
        self.phase = FramePhase::Recording;
        let target = PresentTarget {
            image: self.surface.image(image_index),
            view: self.surface.view(image_index),
            extent: self.surface.extent(),
        };
        let cmd = self.command_lists[slot].as_mut();
        cmd.begin()?;
        let draws = {
            let mut ctx = FrameContext {
                frame_slot: slot,
                image_index,
                extent: self.surface.extent(),
                command_list: &mut *cmd,
            };
            ctx.set_full_viewport();
            let draws = self.graph.record(&mut ctx, &*scene, target);
            for overlay in &mut self.overlays {
                overlay.record(&mut ctx, target.image, target.view);
            }
            draws
        };
        cmd.end()?;

        // Recording -> Submitted
        self.device.submit(
            &*cmd,
            &SubmitInfo {
                wait_semaphore: signals.image_acquired,
                wait_stage: PipelineStages::COLOR_ATTACHMENT_OUTPUT,
                signal_semaphore: signals.render_finished,
                signal_fence: signals.in_flight,
            },
        )?;
        self.sync.mark_submitted(slot);
        self.phase = FramePhase::Submitted;
        self.stats.submissions += 1;

        // Submitted -> Presenting
        self.phase = FramePhase::Presenting;
        let presented = self.surface.present(signals.render_finished, image_index)?;
        self.stats.presents += 1;
        if presented != PresentOutcome::Presented {
            engine_debug!("prism::renderer", "Present reported {:?}, rebuilding", presented);
            // The frame already went out; this only prepares the next one
            self.rebuild()?;
        }

        // Presenting -> Idle
        self.current_slot = (slot + 1) % self.config.frames_in_flight;
        self.phase = FramePhase::Idle;
        self.stats.frames_rendered += 1;
        self.stats.last_frame_draw_calls = draws;

        Ok(FrameOutcome::Presented { frame_slot: slot, image_index })
    }

    fn defer(&mut self) -> FrameOutcome {
        self.phase = FramePhase::Idle;
        self.stats.deferred_frames += 1;
        FrameOutcome::Deferred
    }

    /// Rebuild the surface and, when it succeeded, the screen-sized pass images
    fn rebuild(&mut self) -> Result<RecreateOutcome> {
        let outcome = self.surface.recreate()?;
        if outcome == RecreateOutcome::Rebuilt {
            let extent = self.surface.extent();
            self.graph.resize(extent)?;
            for overlay in &mut self.overlays {
                overlay.resize(extent)?;
            }
            self.stats.swapchain_rebuilds += 1;
        }
        Ok(outcome)
    }

    /// Block until the GPU has finished all submitted frames
    pub fn wait_idle(&self) -> Result<()> {
        self.device.wait_idle()
    }

    pub fn current_slot(&self) -> usize {
        self.current_slot
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    /// The error that stopped the frame loop, if any
    pub fn fatal_error(&self) -> Option<&Error> {
        self.fatal_error.as_ref()
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    pub fn surface(&self) -> &PresentableSurface {
        &self.surface
    }

    pub fn frame_sync(&self) -> &FrameSyncSet {
        &self.sync
    }

    pub fn pass_graph(&self) -> &PassGraph {
        &self.graph
    }

    pub fn pass_graph_mut(&mut self) -> &mut PassGraph {
        &mut self.graph
    }

    pub fn scene_uniforms(&self) -> &SlotBuffers<SceneGlobals> {
        &self.scene_uniforms
    }
}

impl Drop for FrameRenderer {
    fn drop(&mut self) {
        if self.fatal_error.as_ref().is_some_and(Error::is_device_loss) {
            engine_warn!("prism::renderer", "Device lost, tearing down without waiting for the GPU");
            return;
        }
        // Nothing may be destroyed while the GPU still uses it
        if let Err(e) = self.device.wait_idle() {
            engine_error!("prism::renderer", "wait_idle failed during teardown: {}", e);
        }
    }
}

#[cfg(test)]
#[path = "frame_renderer_tests.rs"]
mod tests;

/// winit glue for the control thread.
///
/// Creates the window on `resumed`, hands it to a starter that builds the
/// backend and spawns the render loop, then forwards resize and close events
/// into the shared window state.

use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::error::{Error, Result};
use crate::frame::FrameStats;
use crate::graphics_device::Extent2D;
use crate::host::render_loop::RenderLoop;
use crate::host::shared_window_state::SharedWindowState;
use crate::{engine_error, engine_info};

/// Builds the renderer for a freshly created window and starts the render loop
pub type RenderLoopStarter = Box<dyn FnOnce(Arc<Window>, Arc<SharedWindowState>) -> Result<RenderLoop>>;

pub struct WindowEventBridge {
    attributes: WindowAttributes,
    state: Arc<SharedWindowState>,
    starter: Option<RenderLoopStarter>,
    window: Option<Arc<Window>>,
    render_loop: Option<RenderLoop>,
    result: Option<Result<FrameStats>>,
}

impl WindowEventBridge {
    pub fn new(attributes: WindowAttributes, starter: RenderLoopStarter) -> Self {
        Self {
            attributes,
            state: Arc::new(SharedWindowState::new(Extent2D::default())),
            starter: Some(starter),
            window: None,
            render_loop: None,
            result: None,
        }
    }

    pub fn state(&self) -> &Arc<SharedWindowState> {
        &self.state
    }

    /// Run the event loop on the calling thread until the window closes or
    /// the render loop stops. Returns the render loop's final statistics.
    pub fn run(mut self) -> Result<FrameStats> {
        let event_loop = EventLoop::new()
            .map_err(|e| Error::InitializationFailed(format!("failed to create event loop: {}", e)))?;
        event_loop
            .run_app(&mut self)
            .map_err(|e| Error::BackendError(format!("event loop error: {}", e)))?;

        self.finish();
        self.result
            .take()
            .unwrap_or_else(|| Err(Error::InitializationFailed("window was never created".to_string())))
    }

    /// Stop and join the render loop, keeping its result
    fn finish(&mut self) {
        if let Some(render_loop) = self.render_loop.take() {
            self.result = Some(render_loop.stop());
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: Error) {
        engine_error!("prism::window", "{}", error);
        self.state.request_stop();
        self.result = Some(Err(error));
        event_loop.exit();
    }
}

impl ApplicationHandler for WindowEventBridge {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window = match event_loop.create_window(self.attributes.clone()) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.fail(event_loop, Error::InitializationFailed(format!("failed to create window: {}", e)));
                return;
            }
        };
        let size = window.inner_size();
        self.state.set_framebuffer_size(Extent2D::new(size.width, size.height));
        // The initial size is not a resize
        let _ = self.state.poll();
        self.window = Some(Arc::clone(&window));

        let Some(starter) = self.starter.take() else {
            return;
        };
        match starter(window, Arc::clone(&self.state)) {
            Ok(render_loop) => {
                engine_info!("prism::window", "Window {}x{} created, render loop running", size.width, size.height);
                self.render_loop = Some(render_loop);
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::Resized(size) => {
                self.state.set_framebuffer_size(Extent2D::new(size.width, size.height));
            }
            WindowEvent::CloseRequested => {
                self.finish();
                event_loop.exit();
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        // Render thread ended on its own (fatal error)
        if self.render_loop.as_ref().is_some_and(|r| r.is_finished()) {
            self.finish();
            event_loop.exit();
        }
    }
}

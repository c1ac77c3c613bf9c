/// The render thread: runs the frame orchestrator in a loop, polling the
/// shared window state once per frame.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::frame::{FrameOutcome, FrameRenderer, FrameStats};
use crate::host::shared_window_state::SharedWindowState;
use crate::render_graph::SceneSource;
use crate::{engine_error, engine_info};

/// Back-off while the window is minimized
const DEFERRED_FRAME_SLEEP: Duration = Duration::from_millis(16);

pub struct RenderLoop {
    state: Arc<SharedWindowState>,
    handle: Option<JoinHandle<Result<FrameStats>>>,
}

impl RenderLoop {
    /// Move the renderer and scene onto a new render thread and start it.
    ///
    /// The loop ends when `state` stops running or on the first fatal frame
    /// error, which also clears the running flag so the control thread can
    /// shut down.
    pub fn spawn<S>(state: Arc<SharedWindowState>, renderer: FrameRenderer, scene: S) -> Result<Self>
    where
        S: SceneSource + 'static,
    {
        let thread_state = Arc::clone(&state);
        let handle = thread::Builder::new()
            .name("prism-render".to_string())
            .spawn(move || run(thread_state, renderer, scene))
            .map_err(|e| Error::InitializationFailed(format!("failed to spawn render thread: {}", e)))?;

        Ok(Self { state, handle: Some(handle) })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Wait for the render thread to end on its own
    pub fn join(mut self) -> Result<FrameStats> {
        self.join_inner()
    }

    /// Ask the render thread to stop and wait for it
    pub fn stop(mut self) -> Result<FrameStats> {
        self.state.request_stop();
        self.join_inner()
    }

    fn join_inner(&mut self) -> Result<FrameStats> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| Error::BackendError("render thread panicked".to_string()))?,
            None => Err(Error::BackendError("render thread already joined".to_string())),
        }
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.state.request_stop();
            let _ = self.join_inner();
        }
    }
}

fn run<S: SceneSource>(state: Arc<SharedWindowState>, mut renderer: FrameRenderer, mut scene: S) -> Result<FrameStats> {
    engine_info!("prism::render_loop", "Render thread started");

    loop {
        let snapshot = state.poll();
        if !snapshot.running {
            break;
        }
        if snapshot.resized {
            renderer.notify_resized();
        }

        match renderer.render_frame(&mut scene) {
            Ok(FrameOutcome::Presented { .. }) => {}
            Ok(FrameOutcome::Deferred) => thread::sleep(DEFERRED_FRAME_SLEEP),
            Err(e) => {
                engine_error!("prism::render_loop", "Render loop stopped: {}", e);
                state.request_stop();
                return Err(e);
            }
        }
    }

    renderer.wait_idle()?;
    let stats = renderer.stats();
    engine_info!("prism::render_loop", "Render thread stopped after {} frames", stats.frames_rendered);
    Ok(stats)
}

#[cfg(test)]
#[path = "render_loop_tests.rs"]
mod tests;

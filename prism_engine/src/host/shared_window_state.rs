/// Latest window state, shared between the control thread and the render
/// thread.
///
/// The control thread writes on every window event; the render thread reads
/// once per frame with `poll` and never blocks on it for longer than the copy.

use std::sync::{Mutex, MutexGuard};

use crate::graphics_device::{Extent2D, FramebufferSizeSource};

/// Copy of the shared state at one point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSnapshot {
    pub framebuffer_size: Extent2D,
    /// Cleared once to ask the render loop to stop
    pub running: bool,
    /// Set by every size change, cleared by `poll`
    pub resized: bool,
}

#[derive(Debug)]
pub struct SharedWindowState {
    inner: Mutex<WindowSnapshot>,
}

impl SharedWindowState {
    pub fn new(framebuffer_size: Extent2D) -> Self {
        Self {
            inner: Mutex::new(WindowSnapshot {
                framebuffer_size,
                running: true,
                resized: false,
            }),
        }
    }

    // A panic on either thread must not wedge the other one
    fn lock(&self) -> MutexGuard<'_, WindowSnapshot> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record a new frame-buffer size (control thread)
    pub fn set_framebuffer_size(&self, size: Extent2D) {
        let mut state = self.lock();
        if state.framebuffer_size != size {
            state.framebuffer_size = size;
            state.resized = true;
        }
    }

    /// Ask the render loop to stop after its current frame
    pub fn request_stop(&self) {
        self.lock().running = false;
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    /// Current state without clearing the resize flag
    pub fn snapshot(&self) -> WindowSnapshot {
        *self.lock()
    }

    /// Current state, clearing the resize flag (render thread, once per frame)
    pub fn poll(&self) -> WindowSnapshot {
        let mut state = self.lock();
        let snapshot = *state;
        state.resized = false;
        snapshot
    }
}

impl FramebufferSizeSource for SharedWindowState {
    fn framebuffer_size(&self) -> Extent2D {
        self.lock().framebuffer_size
    }
}

#[cfg(test)]
#[path = "shared_window_state_tests.rs"]
mod tests;

/// Tests for RenderLoop against the mock backend

use super::*;
use crate::frame::BackendHandles;
use crate::graphics_device::mock_graphics_device::MockGraphicsDevice;
use crate::graphics_device::{Extent2D, FrameConfig};
use crate::render_graph::test_collaborators::{RecordingBindingProvider, TestScene};
use crate::render_graph::{DrawableModel, SceneGlobals};

/// Scene that drives the window state from inside the frame loop
struct ScriptedScene {
    inner: TestScene,
    state: Arc<SharedWindowState>,
    frame: u32,
    resize_at: u32,
    stop_at: u32,
}

impl SceneSource for ScriptedScene {
    fn update(&mut self, _delta_seconds: f32) -> Result<()> {
        self.frame += 1;
        if self.frame == self.resize_at {
            self.state.set_framebuffer_size(Extent2D::new(1280, 720));
        }
        if self.frame == self.stop_at {
            self.state.request_stop();
        }
        Ok(())
    }

    fn models(&self) -> &[DrawableModel] {
        self.inner.models()
    }

    fn globals(&self) -> SceneGlobals {
        self.inner.globals()
    }
}

fn renderer(device: &Arc<MockGraphicsDevice>, state: &Arc<SharedWindowState>) -> FrameRenderer {
    FrameRenderer::new(
        BackendHandles::from_backend(device.clone(), state.clone()),
        Box::new(RecordingBindingProvider::default()),
        FrameConfig { frames_in_flight: 3, ..FrameConfig::default() },
    )
    .unwrap()
}

#[test]
fn test_runs_until_stopped() {
    let device = MockGraphicsDevice::new();
    let state = Arc::new(SharedWindowState::new(Extent2D::new(800, 600)));
    let scene = ScriptedScene {
        inner: TestScene::with_models(2),
        state: state.clone(),
        frame: 0,
        resize_at: 0,
        stop_at: 20,
    };

    let render_loop = RenderLoop::spawn(state.clone(), renderer(&device, &state), scene).unwrap();
    let stats = render_loop.join().unwrap();

    // The frame that saw the stop request still completes
    assert_eq!(stats.frames_rendered, 20);
    assert_eq!(device.submissions().len(), 20);
    assert_eq!(device.presents().len(), 20);
}

#[test]
fn test_resize_is_picked_up_next_frame() {
    let device = MockGraphicsDevice::new();
    let state = Arc::new(SharedWindowState::new(Extent2D::new(800, 600)));
    let scene = ScriptedScene {
        inner: TestScene::with_models(1),
        state: state.clone(),
        frame: 0,
        resize_at: 5,
        stop_at: 10,
    };

    let stats = RenderLoop::spawn(state.clone(), renderer(&device, &state), scene)
        .unwrap()
        .join()
        .unwrap();

    assert_eq!(stats.swapchain_rebuilds, 1);
    let descs = device.swapchain_descs();
    assert_eq!(descs.len(), 2);
    assert_eq!(descs[1].extent, Extent2D::new(1280, 720));
}

#[test]
fn test_stop_from_control_thread() {
    let device = MockGraphicsDevice::new();
    let state = Arc::new(SharedWindowState::new(Extent2D::new(800, 600)));
    let scene = TestScene::with_models(1);

    let render_loop = RenderLoop::spawn(state.clone(), renderer(&device, &state), scene).unwrap();
    while device.presents().len() < 3 {
        std::thread::yield_now();
    }
    let stats = render_loop.stop().unwrap();

    assert!(stats.frames_rendered >= 3);
    assert!(!state.is_running());
}

#[test]
fn test_fatal_error_clears_running_flag() {
    let device = MockGraphicsDevice::new();
    let state = Arc::new(SharedWindowState::new(Extent2D::new(800, 600)));
    device.fail_next_submit(Error::DeviceLost);

    let result = RenderLoop::spawn(state.clone(), renderer(&device, &state), TestScene::with_models(1))
        .unwrap()
        .join();

    assert_eq!(result, Err(Error::DeviceLost));
    assert!(!state.is_running());
}

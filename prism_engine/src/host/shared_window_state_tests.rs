/// Tests for SharedWindowState

use super::*;
use std::sync::Arc;
use std::thread;

#[test]
fn test_new_is_running_without_resize() {
    let state = SharedWindowState::new(Extent2D::new(800, 600));
    let snapshot = state.snapshot();
    assert!(snapshot.running);
    assert!(!snapshot.resized);
    assert_eq!(state.framebuffer_size(), Extent2D::new(800, 600));
}

#[test]
fn test_resize_flag_cleared_by_poll() {
    let state = SharedWindowState::new(Extent2D::new(800, 600));
    state.set_framebuffer_size(Extent2D::new(1024, 768));

    assert!(state.snapshot().resized);
    let polled = state.poll();
    assert!(polled.resized);
    assert_eq!(polled.framebuffer_size, Extent2D::new(1024, 768));
    assert!(!state.poll().resized);
}

#[test]
fn test_same_size_is_not_a_resize() {
    let state = SharedWindowState::new(Extent2D::new(800, 600));
    state.set_framebuffer_size(Extent2D::new(800, 600));
    assert!(!state.poll().resized);
}

#[test]
fn test_request_stop() {
    let state = SharedWindowState::new(Extent2D::new(1, 1));
    state.request_stop();
    assert!(!state.is_running());
    assert!(!state.poll().running);
}

#[test]
fn test_cross_thread_updates_visible() {
    let state = Arc::new(SharedWindowState::new(Extent2D::new(800, 600)));
    let writer = {
        let state = state.clone();
        thread::spawn(move || {
            for i in 1..=100 {
                state.set_framebuffer_size(Extent2D::new(800 + i, 600));
            }
            state.request_stop();
        })
    };
    writer.join().unwrap();

    let snapshot = state.poll();
    assert_eq!(snapshot.framebuffer_size, Extent2D::new(900, 600));
    assert!(!snapshot.running);
    assert!(snapshot.resized);
}

#[test]
fn test_survives_poisoned_lock() {
    let state = Arc::new(SharedWindowState::new(Extent2D::new(800, 600)));
    let poisoner = state.clone();
    let _ = thread::spawn(move || {
        let _guard = poisoner.inner.lock().unwrap();
        panic!("poison");
    })
    .join();

    state.set_framebuffer_size(Extent2D::new(10, 10));
    assert_eq!(state.framebuffer_size(), Extent2D::new(10, 10));
}

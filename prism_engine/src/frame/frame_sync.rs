/// Frame synchronization set: N independent slots, each with an
/// "image acquired" semaphore, a "render finished" semaphore and a
/// CPU-waitable completion fence.
///
/// Slots live as long as the renderer; swapchain rebuilds do not touch them.

use std::sync::Arc;

use crate::error::Result;
use crate::graphics_device::{FenceHandle, GraphicsDevice, SemaphoreHandle};

/// GPU-side signals of one slot, for submission wiring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSignals {
    pub image_acquired: SemaphoreHandle,
    pub render_finished: SemaphoreHandle,
    pub in_flight: FenceHandle,
}

/// CPU-side bookkeeping of a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Fence owned by the GPU (or pre-signaled); must be waited on before reuse
    Pending,
    /// Waited and reset; the CPU may record into the slot's resources
    Reserved,
}

struct FrameSlot {
    signals: SlotSignals,
    state: SlotState,
}

pub struct FrameSyncSet {
    device: Arc<dyn GraphicsDevice>,
    slots: Vec<FrameSlot>,
}

impl FrameSyncSet {
    /// Create `count` slots with pre-signaled fences.
    ///
    /// # Panics
    ///
    /// If `count < 2`.
    pub fn new(device: Arc<dyn GraphicsDevice>, count: usize) -> Result<Self> {
        assert!(count >= 2, "frames in flight must be at least 2, got {}", count);

        let mut set = Self {
            device,
            slots: Vec::with_capacity(count),
        };
        // Partially built sets are cleaned up by Drop
        for _ in 0..count {
            let image_acquired = set.device.create_semaphore()?;
            let render_finished = match set.device.create_semaphore() {
                Ok(s) => s,
                Err(e) => {
                    set.device.destroy_semaphore(image_acquired);
                    return Err(e);
                }
            };
            let in_flight = match set.device.create_fence(true) {
                Ok(f) => f,
                Err(e) => {
                    set.device.destroy_semaphore(render_finished);
                    set.device.destroy_semaphore(image_acquired);
                    return Err(e);
                }
            };
            set.slots.push(FrameSlot {
                signals: SlotSignals { image_acquired, render_finished, in_flight },
                state: SlotState::Pending,
            });
        }

        crate::engine_debug!("prism::frame_sync", "Created {} frame slots", count);
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn state(&self, slot: usize) -> SlotState {
        self.slots[slot].state
    }

    /// Block until the slot's fence fires, then reset it.
    ///
    /// # Panics
    ///
    /// If the slot was already waited on and not submitted since.
    pub fn wait_and_reset(&mut self, slot: usize, timeout_ns: u64) -> Result<()> {
        let entry = &mut self.slots[slot];
        assert_eq!(
            entry.state,
            SlotState::Pending,
            "frame slot {} waited twice without a submission",
            slot
        );
        self.device.wait_for_fence(entry.signals.in_flight, timeout_ns)?;
        self.device.reset_fence(entry.signals.in_flight)?;
        entry.state = SlotState::Reserved;
        Ok(())
    }

    /// Hand the slot back to the GPU after its fence was submitted
    pub fn mark_submitted(&mut self, slot: usize) {
        let entry = &mut self.slots[slot];
        assert_eq!(
            entry.state,
            SlotState::Reserved,
            "frame slot {} submitted without a wait",
            slot
        );
        entry.state = SlotState::Pending;
    }

    pub fn signals(&self, slot: usize) -> SlotSignals {
        self.slots[slot].signals
    }
}

impl Drop for FrameSyncSet {
    fn drop(&mut self) {
        for slot in self.slots.drain(..) {
            self.device.destroy_fence(slot.signals.in_flight);
            self.device.destroy_semaphore(slot.signals.render_finished);
            self.device.destroy_semaphore(slot.signals.image_acquired);
        }
    }
}

#[cfg(test)]
#[path = "frame_sync_tests.rs"]
mod tests;

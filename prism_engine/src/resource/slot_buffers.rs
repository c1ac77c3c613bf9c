/// One uniform buffer per frame slot.
///
/// The CPU only writes the buffer of a slot whose fence has been waited on,
/// so a buffer is never overwritten while the GPU may still read it.

use std::marker::PhantomData;
use std::sync::Arc;

use bytemuck::Pod;

use crate::error::Result;
use crate::graphics_device::{BufferDesc, BufferHandle, BufferUsage, GpuAllocator};

pub struct SlotBuffers<T: Pod> {
    allocator: Arc<dyn GpuAllocator>,
    buffers: Vec<BufferHandle>,
    _marker: PhantomData<T>,
}

impl<T: Pod> SlotBuffers<T> {
    pub fn new(allocator: Arc<dyn GpuAllocator>, name: &str, slot_count: usize) -> Result<Self> {
        let mut set = Self {
            allocator,
            buffers: Vec::with_capacity(slot_count),
            _marker: PhantomData,
        };
        for slot in 0..slot_count {
            let buffer = set.allocator.create_buffer(&BufferDesc {
                name: format!("{}[{}]", name, slot),
                size: std::mem::size_of::<T>() as u64,
                usage: BufferUsage::Uniform,
            })?;
            set.buffers.push(buffer);
        }
        Ok(set)
    }

    /// Overwrite the buffer of `slot`
    pub fn write(&self, slot: usize, value: &T) -> Result<()> {
        self.allocator.write_buffer(self.buffers[slot], 0, bytemuck::bytes_of(value))
    }

    pub fn buffer(&self, slot: usize) -> BufferHandle {
        self.buffers[slot]
    }

    pub fn buffers(&self) -> &[BufferHandle] {
        &self.buffers
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

impl<T: Pod> Drop for SlotBuffers<T> {
    fn drop(&mut self) {
        for buffer in self.buffers.drain(..) {
            self.allocator.destroy_buffer(buffer);
        }
    }
}

#[cfg(test)]
#[path = "slot_buffers_tests.rs"]
mod tests;

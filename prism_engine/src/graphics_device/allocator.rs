/// GpuAllocator trait - explicit GPU memory capability
///
/// Every component that owns images or buffers receives an allocator handle at
/// construction. There is no global allocator.

use crate::error::Result;
use crate::graphics_device::{
    BufferHandle, Extent2D, ImageAspects, ImageHandle, ImageUsage, ImageViewHandle, TextureFormat,
};

/// Descriptor for a 2D image with one mip level and one layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDesc {
    /// Debug name
    pub name: String,
    pub format: TextureFormat,
    pub extent: Extent2D,
    pub usage: ImageUsage,
    pub aspects: ImageAspects,
}

/// An allocated image and its default view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageAllocation {
    pub image: ImageHandle,
    pub view: ImageViewHandle,
}

/// Buffer usages the frame pipeline allocates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// Host-visible uniform buffer
    Uniform,
    /// Host-visible storage buffer
    Storage,
}

/// Descriptor for a host-visible buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDesc {
    /// Debug name
    pub name: String,
    pub size: u64,
    pub usage: BufferUsage,
}

/// Allocate and free GPU images and buffers
pub trait GpuAllocator: Send + Sync {
    /// Allocate device-local memory for an image and create its view
    fn create_image(&self, desc: &ImageDesc) -> Result<ImageAllocation>;

    /// Destroy the view, the image, and free its memory
    fn destroy_image(&self, allocation: ImageAllocation);

    /// Allocate a persistently mapped, host-visible buffer
    fn create_buffer(&self, desc: &BufferDesc) -> Result<BufferHandle>;

    /// Copy `data` into the mapped buffer memory at `offset`
    fn write_buffer(&self, buffer: BufferHandle, offset: u64, data: &[u8]) -> Result<()>;

    /// Destroy the buffer and free its memory
    fn destroy_buffer(&self, buffer: BufferHandle);
}

/// Images owned by render passes, with their tracked access state.
///
/// The tracked state is the single source of truth for the next barrier:
/// it is updated in the same call that records the barrier and is never
/// re-queried from the GPU.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::graphics_device::{
    CommandList, Extent2D, GpuAllocator, ImageAllocation, ImageDesc, ImageHandle, ImageUsage,
    ImageViewHandle, SubresourceRange, TextureFormat,
};
use crate::resource::transition::{image_barrier, transition_state, ImageState};

/// An allocated image + view and its current access state
pub struct ImageResource {
    allocator: Arc<dyn GpuAllocator>,
    allocation: ImageAllocation,
    name: String,
    format: TextureFormat,
    extent: Extent2D,
    usage: ImageUsage,
    screen_sized: bool,
    state: ImageState,
}

impl ImageResource {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> ImageHandle {
        self.allocation.image
    }

    pub fn view(&self) -> ImageViewHandle {
        self.allocation.view
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    pub fn extent(&self) -> Extent2D {
        self.extent
    }

    pub fn usage(&self) -> ImageUsage {
        self.usage
    }

    /// Whether the image follows the surface extent
    pub fn is_screen_sized(&self) -> bool {
        self.screen_sized
    }

    /// State after the last recorded barrier
    pub fn state(&self) -> ImageState {
        self.state
    }

    /// Whole-image range on the format's aspect
    pub fn range(&self) -> SubresourceRange {
        SubresourceRange::single(self.format.aspect())
    }

    /// Record a barrier to `dst`, preserving contents
    pub fn transition_to(&mut self, cmd: &mut dyn CommandList, dst: ImageState) {
        transition_state(cmd, self.handle(), self.state, dst, self.range());
        self.state = dst;
    }

    /// Record a barrier to `dst`, discarding contents.
    ///
    /// The old layout is `Undefined`; the previous stage/access still form the
    /// source scope so last frame's readers finish before the write.
    pub fn discard_to(&mut self, cmd: &mut dyn CommandList, dst: ImageState) {
        transition_state(cmd, self.handle(), self.state.discarded(), dst, self.range());
        self.state = dst;
    }

    /// Transition several images to `dst` in one barrier command
    pub fn transition_batch(cmd: &mut dyn CommandList, images: &mut [&mut ImageResource], dst: ImageState) {
        Self::record_batch(cmd, images, dst, false);
    }

    /// Discard several images into `dst` in one barrier command
    pub fn discard_batch(cmd: &mut dyn CommandList, images: &mut [&mut ImageResource], dst: ImageState) {
        Self::record_batch(cmd, images, dst, true);
    }

    fn record_batch(cmd: &mut dyn CommandList, images: &mut [&mut ImageResource], dst: ImageState, discard: bool) {
        if images.is_empty() {
            return;
        }
        debug_assert!(dst.layout != crate::graphics_device::ImageLayout::Undefined);

        let barriers: Vec<_> = images
            .iter()
            .map(|image| {
                let src = if discard { image.state.discarded() } else { image.state };
                image_barrier(image.handle(), src, dst, image.range())
            })
            .collect();
        cmd.pipeline_barrier(&barriers);

        for image in images.iter_mut() {
            image.state = dst;
        }
    }

    /// Follow a new surface extent. Contents and tracked state reset to
    /// undefined. Fixed-size images are left untouched.
    ///
    /// Must not be called while a command list referencing the image is pending.
    pub fn resize(&mut self, extent: Extent2D) -> Result<()> {
        if !self.screen_sized || extent == self.extent {
            return Ok(());
        }
        let desc = ImageDesc {
            name: self.name.clone(),
            format: self.format,
            extent,
            usage: self.usage,
            aspects: self.format.aspect(),
        };
        let allocation = self.allocator.create_image(&desc)?;
        let old = std::mem::replace(&mut self.allocation, allocation);
        self.allocator.destroy_image(old);
        self.extent = extent;
        self.state = ImageState::UNDEFINED;
        Ok(())
    }
}

impl Drop for ImageResource {
    fn drop(&mut self) {
        self.allocator.destroy_image(self.allocation);
    }
}

impl std::fmt::Debug for ImageResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageResource")
            .field("name", &self.name)
            .field("image", &self.allocation.image)
            .field("format", &self.format)
            .field("extent", &self.extent)
            .field("state", &self.state)
            .finish()
    }
}

/// Builder for pass-owned images
#[derive(Debug, Clone)]
pub struct ImageResourceBuilder {
    name: String,
    format: TextureFormat,
    usage: ImageUsage,
    extent: Option<Extent2D>,
    screen_sized: bool,
}

impl ImageResourceBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            format: TextureFormat::R8G8B8A8_UNORM,
            usage: ImageUsage::empty(),
            extent: None,
            screen_sized: false,
        }
    }

    pub fn format(mut self, format: TextureFormat) -> Self {
        self.format = format;
        self
    }

    pub fn usage(mut self, usage: ImageUsage) -> Self {
        self.usage |= usage;
        self
    }

    /// Fixed size, not touched by surface rebuilds
    pub fn extent(mut self, extent: Extent2D) -> Self {
        self.extent = Some(extent);
        self.screen_sized = false;
        self
    }

    /// Start at the surface extent and follow it on every rebuild
    pub fn screen_sized(mut self, surface_extent: Extent2D) -> Self {
        self.extent = Some(surface_extent);
        self.screen_sized = true;
        self
    }

    pub fn build(self, allocator: &Arc<dyn GpuAllocator>) -> Result<ImageResource> {
        let extent = self.extent.ok_or_else(|| {
            Error::InvalidResource(format!("image '{}' has no extent", self.name))
        })?;
        if self.usage.is_empty() {
            return Err(Error::InvalidResource(format!("image '{}' has no usage", self.name)));
        }
        let desc = ImageDesc {
            name: self.name.clone(),
            format: self.format,
            extent,
            usage: self.usage,
            aspects: self.format.aspect(),
        };
        let allocation = allocator.create_image(&desc)?;

        Ok(ImageResource {
            allocator: Arc::clone(allocator),
            allocation,
            name: self.name,
            format: self.format,
            extent,
            usage: self.usage,
            screen_sized: self.screen_sized,
            state: ImageState::UNDEFINED,
        })
    }
}

#[cfg(test)]
#[path = "image_resource_tests.rs"]
mod tests;

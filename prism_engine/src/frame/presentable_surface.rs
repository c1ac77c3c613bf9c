/// Presentable surface (swapchain) negotiation, rebuild and acquire/present.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::graphics_device::{
    AcquireOutcome, Extent2D, FramebufferSizeSource, ImageHandle, ImageViewHandle, PresentMode,
    PresentModePreference, PresentOutcome, SemaphoreHandle, SurfaceBackend, SurfaceCapabilities,
    SurfaceFormat, SwapchainDesc,
};
use crate::{engine_debug, engine_info};

/// Result of a rebuild request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecreateOutcome {
    /// A new chain was created
    Rebuilt,
    /// Frame-buffer has zero area; the old chain is untouched
    Deferred,
}

/// Prefer an 8-bit sRGB format, else the first one reported
pub fn choose_surface_format(formats: &[SurfaceFormat]) -> Option<SurfaceFormat> {
    formats
        .iter()
        .copied()
        .find(|f| f.format.is_srgb_8bit())
        .or_else(|| formats.first().copied())
}

/// First supported mode from the preference list, else FIFO (always available)
pub fn choose_present_mode(supported: &[PresentMode], preference: PresentModePreference) -> PresentMode {
    preference
        .candidates()
        .iter()
        .copied()
        .find(|mode| supported.contains(mode))
        .unwrap_or(PresentMode::Fifo)
}

/// `min + 1`, clamped to `max` (`max == 0` means unbounded)
pub fn choose_image_count(caps: &SurfaceCapabilities) -> u32 {
    let count = caps.min_image_count + 1;
    if caps.max_image_count > 0 {
        count.min(caps.max_image_count)
    } else {
        count
    }
}

/// The surface's fixed extent if it dictates one, else the frame-buffer size
/// clamped to the supported range
pub fn choose_extent(caps: &SurfaceCapabilities, framebuffer: Extent2D) -> Extent2D {
    match caps.current_extent {
        Some(extent) => extent,
        None => framebuffer.clamp(caps.min_image_extent, caps.max_image_extent),
    }
}

/// The chain of presentable images and their views
pub struct PresentableSurface {
    backend: Arc<dyn SurfaceBackend>,
    size_source: Arc<dyn FramebufferSizeSource>,
    preference: PresentModePreference,
    images: Vec<ImageHandle>,
    views: Vec<ImageViewHandle>,
    format: SurfaceFormat,
    present_mode: PresentMode,
    extent: Extent2D,
    image_count: u32,
    needs_rebuild: bool,
    alive: bool,
}

impl PresentableSurface {
    /// Negotiate and create the chain at the current frame-buffer size
    pub fn create(
        backend: Arc<dyn SurfaceBackend>,
        size_source: Arc<dyn FramebufferSizeSource>,
        preference: PresentModePreference,
    ) -> Result<Self> {
        let mut surface = Self {
            backend,
            size_source,
            preference,
            images: Vec::new(),
            views: Vec::new(),
            format: SurfaceFormat {
                format: crate::graphics_device::TextureFormat::B8G8R8A8_SRGB,
                color_space: crate::graphics_device::ColorSpace::SrgbNonLinear,
            },
            present_mode: PresentMode::Fifo,
            extent: Extent2D::default(),
            image_count: 0,
            needs_rebuild: false,
            alive: false,
        };

        let framebuffer = surface.size_source.framebuffer_size();
        if framebuffer.is_zero_area() {
            return Err(Error::InitializationFailed(
                "cannot create a surface for a zero-sized frame-buffer".to_string(),
            ));
        }
        surface.build(framebuffer)?;

        engine_info!(
            "prism::surface",
            "Created swapchain: {} images, {}x{}, {:?}, {:?}",
            surface.image_count,
            surface.extent.width,
            surface.extent.height,
            surface.format.format,
            surface.present_mode
        );
        Ok(surface)
    }

    fn build(&mut self, framebuffer: Extent2D) -> Result<()> {
        let support = self.backend.surface_support()?;
        let format = choose_surface_format(&support.formats).ok_or_else(|| {
            Error::InitializationFailed("surface reports no formats".to_string())
        })?;
        let present_mode = choose_present_mode(&support.present_modes, self.preference);
        let image_count = choose_image_count(&support.capabilities);
        let extent = choose_extent(&support.capabilities, framebuffer);
        if extent.is_zero_area() {
            return Err(Error::SurfaceLost);
        }

        let images = self.backend.create_swapchain(&SwapchainDesc {
            image_count,
            format,
            extent,
            present_mode,
        })?;
        self.alive = true;
        self.images = images;

        let mut views = Vec::with_capacity(self.images.len());
        for &image in &self.images {
            match self.backend.create_image_view(image, format.format) {
                Ok(view) => views.push(view),
                Err(e) => {
                    for view in views {
                        self.backend.destroy_image_view(view);
                    }
                    return Err(e);
                }
            }
        }

        self.views = views;
        self.format = format;
        self.present_mode = present_mode;
        self.extent = extent;
        self.image_count = self.images.len() as u32;
        self.needs_rebuild = false;
        Ok(())
    }

    fn teardown(&mut self) {
        for view in self.views.drain(..) {
            self.backend.destroy_image_view(view);
        }
        if self.alive {
            self.backend.destroy_swapchain();
            self.alive = false;
        }
        self.images.clear();
    }

    /// Wait idle, destroy views then the chain, and create a new one.
    ///
    /// Returns `Deferred` without touching anything while the frame-buffer
    /// has zero area; call again once the window is restored.
    pub fn recreate(&mut self) -> Result<RecreateOutcome> {
        let framebuffer = self.size_source.framebuffer_size();
        if framebuffer.is_zero_area() {
            engine_debug!("prism::surface", "Swapchain rebuild deferred: frame-buffer is {}x{}", framebuffer.width, framebuffer.height);
            self.needs_rebuild = true;
            return Ok(RecreateOutcome::Deferred);
        }

        self.backend.wait_idle()?;
        self.teardown();
        self.build(framebuffer)?;

        engine_info!(
            "prism::surface",
            "Rebuilt swapchain: {} images, {}x{}",
            self.image_count,
            self.extent.width,
            self.extent.height
        );
        Ok(RecreateOutcome::Rebuilt)
    }

    /// Next presentable image, or `OutOfDate`.
    ///
    /// A suboptimal image is still returned; the rebuild is scheduled for the
    /// next frame.
    pub fn acquire_next(&mut self, timeout_ns: u64, signal: SemaphoreHandle) -> Result<AcquireOutcome> {
        let outcome = self.backend.acquire_next_image(timeout_ns, signal)?;
        match outcome {
            AcquireOutcome::Acquired { index, suboptimal } => {
                debug_assert!((index as usize) < self.images.len());
                if suboptimal {
                    self.needs_rebuild = true;
                }
            }
            AcquireOutcome::OutOfDate => self.needs_rebuild = true,
        }
        Ok(outcome)
    }

    /// Queue `image_index` for presentation once `wait` fires
    pub fn present(&mut self, wait: SemaphoreHandle, image_index: u32) -> Result<PresentOutcome> {
        let outcome = self.backend.present(wait, image_index)?;
        if outcome != PresentOutcome::Presented {
            self.needs_rebuild = true;
        }
        Ok(outcome)
    }

    /// Set after a suboptimal/out-of-date report or a deferred rebuild
    pub fn needs_rebuild(&self) -> bool {
        self.needs_rebuild
    }

    /// Request a rebuild before the next acquisition (window resized)
    pub fn mark_needs_rebuild(&mut self) {
        self.needs_rebuild = true;
    }

    pub fn image(&self, index: u32) -> ImageHandle {
        self.images[index as usize]
    }

    pub fn view(&self, index: u32) -> ImageViewHandle {
        self.views[index as usize]
    }

    pub fn images(&self) -> &[ImageHandle] {
        &self.images
    }

    pub fn views(&self) -> &[ImageViewHandle] {
        &self.views
    }

    pub fn image_count(&self) -> u32 {
        self.image_count
    }

    pub fn format(&self) -> SurfaceFormat {
        self.format
    }

    pub fn present_mode(&self) -> PresentMode {
        self.present_mode
    }

    pub fn extent(&self) -> Extent2D {
        self.extent
    }

    /// Current frame-buffer size as reported by the window
    pub fn framebuffer_size(&self) -> Extent2D {
        self.size_source.framebuffer_size()
    }
}

impl Drop for PresentableSurface {
    fn drop(&mut self) {
        self.backend.wait_idle().ok();
        self.teardown();
    }
}

#[cfg(test)]
#[path = "presentable_surface_tests.rs"]
mod tests;

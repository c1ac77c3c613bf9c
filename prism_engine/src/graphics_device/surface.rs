/// SurfaceBackend trait - the OS surface and its swapchain

use crate::error::Result;
use crate::graphics_device::{
    Extent2D, ImageHandle, ImageViewHandle, PresentMode, SemaphoreHandle, SurfaceFormat,
    TextureFormat,
};

/// Capabilities reported by the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceCapabilities {
    pub min_image_count: u32,
    /// Zero means "no upper bound"
    pub max_image_count: u32,
    /// `None` when the surface lets the swapchain pick its extent
    pub current_extent: Option<Extent2D>,
    pub min_image_extent: Extent2D,
    pub max_image_extent: Extent2D,
}

/// Everything the surface supports, queried before each (re)creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceSupport {
    pub capabilities: SurfaceCapabilities,
    pub formats: Vec<SurfaceFormat>,
    pub present_modes: Vec<PresentMode>,
}

/// Negotiated swapchain parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainDesc {
    pub image_count: u32,
    pub format: SurfaceFormat,
    pub extent: Extent2D,
    pub present_mode: PresentMode,
}

/// Result of asking for the next presentable image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// Image acquired; `suboptimal` asks for a rebuild before the next frame
    Acquired { index: u32, suboptimal: bool },
    /// The swapchain no longer matches the surface and must be rebuilt
    OutOfDate,
}

/// Result of queueing an image for presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    Suboptimal,
    OutOfDate,
}

/// Presentation half of a backend
///
/// The backend owns at most one swapchain at a time; `create_swapchain` replaces
/// nothing by itself, the caller destroys the previous chain first.
pub trait SurfaceBackend: Send + Sync {
    /// Query capabilities, formats and present modes
    fn surface_support(&self) -> Result<SurfaceSupport>;

    /// Create the swapchain and return its images in presentation-index order
    fn create_swapchain(&self, desc: &SwapchainDesc) -> Result<Vec<ImageHandle>>;

    /// Destroy the current swapchain (its images go with it)
    fn destroy_swapchain(&self);

    /// Create a color view on a swapchain image
    fn create_image_view(&self, image: ImageHandle, format: TextureFormat) -> Result<ImageViewHandle>;

    /// Destroy a view created by `create_image_view`
    fn destroy_image_view(&self, view: ImageViewHandle);

    /// Acquire the next image, signaling `signal` when it is ready for writing
    fn acquire_next_image(&self, timeout_ns: u64, signal: SemaphoreHandle) -> Result<AcquireOutcome>;

    /// Queue `image_index` for presentation once `wait` is signaled
    fn present(&self, wait: SemaphoreHandle, image_index: u32) -> Result<PresentOutcome>;

    /// Block until the presentation queue and device are idle
    fn wait_idle(&self) -> Result<()>;
}

/// Windowing collaborator: reports the current frame-buffer size
pub trait FramebufferSizeSource: Send + Sync {
    fn framebuffer_size(&self) -> Extent2D;
}

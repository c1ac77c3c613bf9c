/// Backend-neutral GPU types: opaque handles, formats, layouts and access masks

use bitflags::bitflags;

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl $name {
            /// The null handle
            pub const NULL: Self = Self(0);

            /// Whether this is the null handle
            pub fn is_null(self) -> bool {
                self.0 == 0
            }
        }
    };
}

define_handle!(
    /// Opaque image handle (offscreen image or swapchain image)
    ImageHandle
);
define_handle!(
    /// Opaque image view handle
    ImageViewHandle
);
define_handle!(
    /// Opaque GPU-GPU signal (binary semaphore)
    SemaphoreHandle
);
define_handle!(
    /// Opaque CPU-waitable signal (fence)
    FenceHandle
);
define_handle!(
    /// Opaque buffer handle
    BufferHandle
);
define_handle!(
    /// Opaque command buffer handle
    CommandBufferHandle
);
define_handle!(
    /// Opaque graphics pipeline handle
    PipelineHandle
);
define_handle!(
    /// Opaque pipeline layout handle
    PipelineLayoutHandle
);
define_handle!(
    /// Opaque descriptor set handle
    DescriptorSetHandle
);

/// 2D size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2D {
    pub width: u32,
    pub height: u32,
}

impl Extent2D {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether either side is zero (minimized window)
    pub fn is_zero_area(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Clamp each side into `[min, max]`
    pub fn clamp(self, min: Extent2D, max: Extent2D) -> Extent2D {
        Extent2D {
            width: self.width.clamp(min.width, max.width.max(min.width)),
            height: self.height.clamp(min.height, max.height.max(min.height)),
        }
    }
}

/// Pixel formats used by the frame pipeline
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    R8G8B8A8_UNORM,
    R8G8B8A8_SRGB,
    B8G8R8A8_UNORM,
    B8G8R8A8_SRGB,
    A2B10G10R10_UNORM,
    R16G16B16A16_SFLOAT,
    R32G32B32A32_SFLOAT,
    D16_UNORM,
    D32_SFLOAT,
    D24_UNORM_S8_UINT,
    /// A format reported by the backend that the engine has no name for
    Other(u32),
}

impl TextureFormat {
    /// 8-bit-per-channel sRGB color formats
    pub fn is_srgb_8bit(self) -> bool {
        matches!(self, TextureFormat::R8G8B8A8_SRGB | TextureFormat::B8G8R8A8_SRGB)
    }

    /// Depth (and depth/stencil) formats
    pub fn is_depth(self) -> bool {
        matches!(
            self,
            TextureFormat::D16_UNORM | TextureFormat::D32_SFLOAT | TextureFormat::D24_UNORM_S8_UINT
        )
    }

    /// Formats carrying a stencil aspect
    pub fn has_stencil(self) -> bool {
        matches!(self, TextureFormat::D24_UNORM_S8_UINT)
    }

    /// Aspect selected by barriers and views on this format
    pub fn aspect(self) -> ImageAspects {
        if self.has_stencil() {
            ImageAspects::DEPTH | ImageAspects::STENCIL
        } else if self.is_depth() {
            ImageAspects::DEPTH
        } else {
            ImageAspects::COLOR
        }
    }
}

/// Color space paired with a surface format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    SrgbNonLinear,
    Other(i32),
}

/// A (format, color space) pair reported by the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceFormat {
    pub format: TextureFormat,
    pub color_space: ColorSpace,
}

/// Presentation mode of the swapchain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresentMode {
    /// No vsync, tearing allowed
    Immediate,
    /// Low-latency triple buffering without tearing
    Mailbox,
    /// Vsync'd queue; always supported
    Fifo,
    /// Vsync'd, tears when late
    FifoRelaxed,
}

/// Image layouts the frame pipeline moves images through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageLayout {
    /// Contents undefined (initial state, or discard on transition)
    Undefined,
    /// Writable color target
    ColorAttachment,
    /// Writable depth target
    DepthAttachment,
    /// Sampled from shaders
    ShaderReadOnly,
    /// Source of a transfer (blit/copy)
    TransferSrc,
    /// Destination of a transfer (blit/copy)
    TransferDst,
    /// Ready to be handed to the presentation engine
    PresentSrc,
}

bitflags! {
    /// Pipeline stages named in barriers and submissions
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PipelineStages: u32 {
        const TOP_OF_PIPE = 1 << 0;
        const VERTEX_SHADER = 1 << 1;
        const EARLY_FRAGMENT_TESTS = 1 << 2;
        const FRAGMENT_SHADER = 1 << 3;
        const LATE_FRAGMENT_TESTS = 1 << 4;
        const COLOR_ATTACHMENT_OUTPUT = 1 << 5;
        const TRANSFER = 1 << 6;
        const BOTTOM_OF_PIPE = 1 << 7;
        const ALL_COMMANDS = 1 << 8;
    }
}

bitflags! {
    /// Memory access kinds named in barriers
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessFlags: u32 {
        const SHADER_READ = 1 << 0;
        const COLOR_ATTACHMENT_READ = 1 << 1;
        const COLOR_ATTACHMENT_WRITE = 1 << 2;
        const DEPTH_STENCIL_ATTACHMENT_READ = 1 << 3;
        const DEPTH_STENCIL_ATTACHMENT_WRITE = 1 << 4;
        const TRANSFER_READ = 1 << 5;
        const TRANSFER_WRITE = 1 << 6;
        const MEMORY_READ = 1 << 7;
        const MEMORY_WRITE = 1 << 8;
    }
}

bitflags! {
    /// Image aspects selected by a subresource range
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageAspects: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

bitflags! {
    /// How an image will be used (drives allocation flags)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageUsage: u32 {
        const COLOR_ATTACHMENT = 1 << 0;
        const DEPTH_ATTACHMENT = 1 << 1;
        const SAMPLED = 1 << 2;
        const TRANSFER_SRC = 1 << 3;
        const TRANSFER_DST = 1 << 4;
    }
}

bitflags! {
    /// Shader stages that can see push constants
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStages: u32 {
        const VERTEX = 1 << 0;
        const FRAGMENT = 1 << 1;
    }
}

/// Mip levels and array layers touched by a barrier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubresourceRange {
    pub aspects: ImageAspects,
    pub base_mip_level: u32,
    pub level_count: u32,
    pub base_array_layer: u32,
    pub layer_count: u32,
}

impl SubresourceRange {
    /// First mip level and first layer of the given aspects
    pub const fn single(aspects: ImageAspects) -> Self {
        Self {
            aspects,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        }
    }

    pub const fn color() -> Self {
        Self::single(ImageAspects::COLOR)
    }

    pub const fn depth() -> Self {
        Self::single(ImageAspects::DEPTH)
    }
}
